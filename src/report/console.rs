use crate::discovery::discovery::DiscoveryResult;
use crate::inject::fill_pass::InjectionReport;
use crate::inject::injector::FillOutcome;

// ============================================================================
// Console reporter: formatted terminal output
// ============================================================================

/// Format a discovery result as a table.
///
/// Produces output like:
/// ```text
/// === Fields on: Apply now (1 form, 3 fields) ===
///
///   #1  Text      First name *       input[name="first_name"]
///   #2  Select    State              select[name="state"]  [Alabama, California]
/// ```
pub fn format_discovery(result: &DiscoveryResult) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "=== Fields on: {} ({} form{}, {} field{}) ===\n\n",
        if result.page_title.is_empty() { "(untitled)" } else { &result.page_title },
        result.form_count,
        plural(result.form_count),
        result.fields.len(),
        plural(result.fields.len()),
    ));

    let label_width = result
        .fields
        .iter()
        .map(|f| f.label.chars().count() + usize::from(f.required) * 2)
        .max()
        .unwrap_or(0);

    for field in &result.fields {
        let label = if field.required {
            format!("{} *", field.label)
        } else {
            field.label.clone()
        };
        out.push_str(&format!(
            "  #{:<3} {:<9} {:<width$}  {}",
            field.id.0,
            format!("{:?}", field.kind),
            label,
            field.selector,
            width = label_width
        ));
        if let Some(options) = &field.options {
            out.push_str(&format!("  [{}]", options.join(", ")));
        }
        if let Some(value) = &field.current_value {
            out.push_str(&format!("  = {:?}", value));
        }
        out.push('\n');
    }

    out.push_str(&format!("\nFingerprint: {}\n", result.fingerprint));
    out
}

/// Format an injection report with one line per instruction.
pub fn format_injection(report: &InjectionReport) -> String {
    let mut out = String::new();

    for result in &report.results {
        let marker = if result.outcome.is_filled() {
            "\u{2713}"
        } else {
            "\u{2717}"
        };
        out.push_str(&format!(
            "{} {:<18} {:<16}",
            marker,
            result.field_name,
            describe_outcome(&result.outcome)
        ));
        if let Some(selector) = &result.selector {
            out.push_str(&format!(" {}", selector));
        }
        if let Some(tier) = result.tier {
            out.push_str(&format!(" ({:?})", tier));
        }
        out.push('\n');
    }

    out.push_str(&format!(
        "\n=== Filled {} of {} ({} failed) ===\n",
        report.success_count, report.total, report.fail_count
    ));
    out
}

fn describe_outcome(outcome: &FillOutcome) -> String {
    match outcome {
        FillOutcome::Filled => "filled".into(),
        FillOutcome::AlreadyFilled => "already filled".into(),
        FillOutcome::NoMatch => "no match".into(),
        FillOutcome::NoOption => "no option".into(),
        FillOutcome::EmptyValue => "empty value".into(),
        FillOutcome::Unsupported => "unsupported".into(),
        FillOutcome::Failed(detail) => format!("failed: {}", detail),
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}
