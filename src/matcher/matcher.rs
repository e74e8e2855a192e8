use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dom::dom_model::{Document, NodeId};
use crate::field::classifier::exclusion_reason;
use crate::field::field_model::{FieldDescriptor, FillInstruction};
use crate::field::label::{accessible_name, associated_label_texts};
use crate::field::selector::resolve_unique;
use crate::matcher::vocabulary::Vocabulary;

/// Attributes pages use to tag controls for automated tests.
const TEST_ID_ATTRS: &[&str] = &[
    "data-testid",
    "data-test-id",
    "data-test",
    "data-qa",
    "data-cy",
    "data-automation-id",
];

/// Strategy that produced a match, most specific first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    /// Scrape-time selector supplied by the host
    Selector,
    /// name or id equals a keyword
    ExactAttribute,
    /// name or id contains a keyword
    AttributeContains,
    /// placeholder, accessible name or test id contains a keyword
    HintContains,
    /// an associated label starts with (or equals) a keyword
    LabelPrefix,
}

impl MatchTier {
    pub const KEYWORD_TIERS: [MatchTier; 4] = [
        MatchTier::ExactAttribute,
        MatchTier::AttributeContains,
        MatchTier::HintContains,
        MatchTier::LabelPrefix,
    ];

    /// `keyword` must already be lowercased and trimmed.
    fn hits<S: MatchSubject>(&self, subject: &S, keyword: &str) -> bool {
        let attrs = [subject.name(), subject.dom_id()];
        let mut attrs = attrs.iter().flatten().map(|a| a.to_lowercase());
        match self {
            MatchTier::Selector => false,
            MatchTier::ExactAttribute => attrs.any(|a| a == keyword),
            MatchTier::AttributeContains => attrs.any(|a| a.contains(keyword)),
            MatchTier::HintContains => subject
                .hints()
                .iter()
                .any(|h| h.to_lowercase().contains(keyword)),
            MatchTier::LabelPrefix => subject
                .labels()
                .iter()
                .any(|l| l.trim().to_lowercase().starts_with(keyword)),
        }
    }
}

/// A resolved live element and the tier that found it. Never leaves the
/// injection pass that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchCandidate {
    pub node: NodeId,
    pub tier: MatchTier,
}

/// Extra conditions on a match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchConstraints {
    /// Substrings of name/id that disqualify a control in every tier
    pub exclude_patterns: Vec<String>,
}

impl MatchConstraints {
    pub fn excluding(patterns: &[&str]) -> Self {
        Self {
            exclude_patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn rejects<S: MatchSubject>(&self, subject: &S) -> bool {
        let attrs: Vec<String> = [subject.name(), subject.dom_id()]
            .into_iter()
            .flatten()
            .map(str::to_lowercase)
            .collect();
        self.exclude_patterns
            .iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .any(|p| attrs.iter().any(|a| a.contains(&p)))
    }
}

// ============================================================================
// Match subjects
// ============================================================================

/// What the tiers look at. Implemented for live controls and for
/// scrape-time descriptors so both sides match the same way.
pub trait MatchSubject {
    fn name(&self) -> Option<&str>;
    fn dom_id(&self) -> Option<&str>;
    fn hints(&self) -> &[String];
    fn labels(&self) -> &[String];
}

/// Snapshot of the matchable attributes of one live control.
#[derive(Debug, Clone)]
pub struct ControlView {
    pub node: NodeId,
    name: Option<String>,
    dom_id: Option<String>,
    hints: Vec<String>,
    labels: Vec<String>,
}

impl ControlView {
    pub fn read(doc: &Document, node: NodeId) -> Self {
        let mut hints: Vec<String> = doc
            .attr_non_empty(node, "placeholder")
            .map(str::to_string)
            .into_iter()
            .collect();
        hints.extend(accessible_name(doc, node));
        hints.extend(
            TEST_ID_ATTRS
                .iter()
                .filter_map(|attr| doc.attr_non_empty(node, attr))
                .map(str::to_string),
        );

        Self {
            node,
            name: doc.attr_non_empty(node, "name").map(str::to_string),
            dom_id: doc.attr_non_empty(node, "id").map(str::to_string),
            hints,
            labels: associated_label_texts(doc, node),
        }
    }
}

impl MatchSubject for ControlView {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn dom_id(&self) -> Option<&str> {
        self.dom_id.as_deref()
    }

    fn hints(&self) -> &[String] {
        &self.hints
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl MatchSubject for FieldDescriptor {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn dom_id(&self) -> Option<&str> {
        self.dom_id.as_deref()
    }

    fn hints(&self) -> &[String] {
        &[]
    }

    fn labels(&self) -> &[String] {
        std::slice::from_ref(&self.label)
    }
}

// ============================================================================
// Tiered search
// ============================================================================

fn normalize_keywords(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Index of the first subject hit by the strategy chain.
///
/// Tiers run in order; within a tier keywords run in caller order and
/// subjects in slice order. The first hit wins.
pub fn find_tiered<S: MatchSubject>(
    subjects: &[S],
    keywords: &[String],
    constraints: &MatchConstraints,
) -> Option<(usize, MatchTier)> {
    find_tiered_where(subjects, keywords, constraints, |_| true)
}

/// `find_tiered` restricted to subjects accepted by `eligible`.
pub fn find_tiered_where<S: MatchSubject>(
    subjects: &[S],
    keywords: &[String],
    constraints: &MatchConstraints,
    eligible: impl Fn(usize) -> bool,
) -> Option<(usize, MatchTier)> {
    let keywords = normalize_keywords(keywords);
    for tier in MatchTier::KEYWORD_TIERS {
        for keyword in &keywords {
            let hit = subjects.iter().enumerate().position(|(i, s)| {
                eligible(i) && !constraints.rejects(s) && tier.hits(s, keyword)
            });
            if let Some(index) = hit {
                return Some((index, tier));
            }
        }
    }
    None
}

/// Controls that may be matched at all, in document order.
pub fn matchable_controls(doc: &Document) -> Vec<NodeId> {
    doc.elements_by_tag(&["input", "textarea", "select"])
        .into_iter()
        .filter(|n| exclusion_reason(doc, *n).is_none())
        .collect()
}

/// Resolve a keyword list to a live control.
pub fn match_field(
    doc: &Document,
    keywords: &[String],
    constraints: &MatchConstraints,
) -> Option<MatchCandidate> {
    let views: Vec<ControlView> = matchable_controls(doc)
        .into_iter()
        .map(|n| ControlView::read(doc, n))
        .collect();
    find_tiered(&views, keywords, constraints).map(|(index, tier)| MatchCandidate {
        node: views[index].node,
        tier,
    })
}

/// Resolve one fill instruction: its selector first, then keywords from the
/// instruction or the vocabulary.
pub fn resolve_instruction(
    doc: &Document,
    instruction: &FillInstruction,
    vocabulary: &Vocabulary,
) -> Option<MatchCandidate> {
    if let Some(selector) = instruction.selector.as_deref() {
        match resolve_unique(doc, selector) {
            Some(node) if exclusion_reason(doc, node).is_none() => {
                return Some(MatchCandidate {
                    node,
                    tier: MatchTier::Selector,
                });
            }
            Some(node) => debug!(
                field = %instruction.field_name,
                selector,
                reason = ?exclusion_reason(doc, node),
                "Selector target is excluded, falling back to keywords"
            ),
            None => debug!(
                field = %instruction.field_name,
                selector,
                "Selector no longer resolves to one control, falling back to keywords"
            ),
        }
    }

    let rule = vocabulary.rule(&instruction.field_name);
    let keywords = if instruction.keywords.is_empty() {
        rule.keywords
    } else {
        instruction.keywords.clone()
    };
    let constraints = MatchConstraints {
        exclude_patterns: rule.exclude,
    };
    match_field(doc, &keywords, &constraints)
}
