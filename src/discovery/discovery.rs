use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use tracing::{debug, info};

use crate::dom::dom_model::{Document, NodeId};
use crate::error::DomError;
use crate::field::classifier::classify;
use crate::field::field_model::{Classification, FieldDescriptor, FieldId, FieldKind};

/// Everything one scrape reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryResult {
    pub fields: Vec<FieldDescriptor>,
    pub form_count: usize,
    pub page_title: String,
    /// Hash of kind, label and selector per field. Equal fingerprints mean
    /// the same fillable surface; ids are not part of it.
    pub fingerprint: String,
}

/// Inventory every fillable control in the document.
///
/// One query over the whole document (no form scoping), one descriptor per
/// radio group, ids assigned in document order starting at 1.
pub fn discover(doc: &Document) -> Result<DiscoveryResult, DomError> {
    let mut fields = Vec::new();
    let mut seen_groups: HashSet<(Option<NodeId>, String)> = HashSet::new();
    let mut next_id = 1;

    for node in doc.elements_by_tag(&["input", "textarea", "select"]) {
        let mut field = match classify(doc, node)? {
            Classification::Field(field) => field,
            Classification::Excluded(reason) => {
                debug!(node = %node, reason = ?reason, "Control excluded");
                continue;
            }
        };

        // the first visible member stands for the whole radio group
        if field.kind == FieldKind::Radio {
            if let Some(name) = field.name.clone() {
                if !seen_groups.insert((doc.form_owner(node), name)) {
                    continue;
                }
            }
        }

        field.id = FieldId(next_id);
        next_id += 1;
        fields.push(*field);
    }

    let fingerprint = fingerprint(&fields);
    info!(
        fields = fields.len(),
        title = %doc.title(),
        fingerprint = %fingerprint,
        "Discovery pass complete"
    );

    Ok(DiscoveryResult {
        form_count: doc.elements_by_tag(&["form"]).len(),
        page_title: doc.title().to_string(),
        fields,
        fingerprint,
    })
}

/// SHA-1 over `kind|label|selector` per field, hex encoded.
pub fn fingerprint(fields: &[FieldDescriptor]) -> String {
    let mut hasher = Sha1::new();
    for field in fields {
        hasher.update(format!("{:?}|{}|{}\n", field.kind, field.label, field.selector).as_bytes());
    }
    format!("{:x}", hasher.finalize())
}
