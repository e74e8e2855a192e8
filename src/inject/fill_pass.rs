use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dom::dom_model::Document;
use crate::field::field_model::FillInstruction;
use crate::field::selector::synthesize;
use crate::inject::injector::{inject, FillOutcome};
use crate::matcher::matcher::{resolve_instruction, MatchTier};
use crate::matcher::vocabulary::Vocabulary;

/// Per-instruction outcome with the reason code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldResult {
    pub field_name: String,
    pub outcome: FillOutcome,
    /// Selector of the control that was targeted, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<MatchTier>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectionReport {
    pub success_count: usize,
    pub fail_count: usize,
    pub total: usize,
    #[serde(default)]
    pub results: Vec<FieldResult>,
}

impl InjectionReport {
    fn record(&mut self, result: FieldResult) {
        self.total += 1;
        if result.outcome.is_filled() {
            self.success_count += 1;
        } else {
            self.fail_count += 1;
        }
        self.results.push(result);
    }

    pub fn result(&self, field_name: &str) -> Option<&FieldResult> {
        self.results.iter().find(|r| r.field_name == field_name)
    }
}

/// Resolve and fill every instruction in order.
///
/// Each field is isolated: a miss, a refusal or a throwing page only marks
/// that field failed. Running the same batch twice never changes a control
/// the first run filled.
pub fn run_injection(
    doc: &mut Document,
    instructions: &[FillInstruction],
    vocabulary: &Vocabulary,
) -> InjectionReport {
    let mut report = InjectionReport::default();

    for instruction in instructions {
        let Some(candidate) = resolve_instruction(doc, instruction, vocabulary) else {
            debug!(field = %instruction.field_name, "No control matched");
            report.record(FieldResult {
                field_name: instruction.field_name.clone(),
                outcome: FillOutcome::NoMatch,
                selector: None,
                tier: None,
            });
            continue;
        };

        let selector = synthesize(doc, candidate.node);
        let outcome = inject(doc, candidate.node, &instruction.value);
        debug!(
            field = %instruction.field_name,
            selector = %selector,
            tier = ?candidate.tier,
            outcome = ?outcome,
            "Field processed"
        );
        report.record(FieldResult {
            field_name: instruction.field_name.clone(),
            outcome,
            selector: Some(selector),
            tier: Some(candidate.tier),
        });
    }

    info!(
        success = report.success_count,
        failed = report.fail_count,
        total = report.total,
        "Injection pass complete"
    );
    report
}
