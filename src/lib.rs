use crate::{
    discovery::discovery::{DiscoveryResult, discover},
    dom::{dom_model::Document, html::parse_html},
    error::DomError,
    field::field_model::FillInstruction,
    inject::fill_pass::{InjectionReport, run_injection},
    matcher::vocabulary::Vocabulary,
};

pub mod bridge;
pub mod cli;
pub mod discovery;
pub mod dom;
pub mod error;
pub mod field;
pub mod inject;
pub mod matcher;
pub mod profile;
pub mod report;
pub mod trace;

/// Parse an HTML snapshot and run one discovery pass over it.
pub fn discover_html(html: &str) -> Result<DiscoveryResult, DomError> {
    let doc = parse_html(html)?;
    discover(&doc)
}

/// Fill `doc` using the built-in vocabulary.
pub fn fill_document(doc: &mut Document, instructions: &[FillInstruction]) -> InjectionReport {
    run_injection(doc, instructions, &Vocabulary::builtin())
}
