use tracing::debug;

use crate::field::field_model::{FieldDescriptor, FillInstruction};
use crate::matcher::matcher::{find_tiered_where, MatchConstraints};
use crate::matcher::vocabulary::Vocabulary;
use crate::profile::profile::Profile;

/// Turn a profile into instructions aimed at scraped descriptors.
///
/// Each profile key is matched against descriptor name, dom id and label
/// with the keyword tiers; a hit pins the instruction to that descriptor's
/// selector and no descriptor is used twice. Keys with no hit, or whose
/// descriptor shares its selector with another, are sent unpinned to be
/// matched live.
pub fn plan_fill(fields: &[FieldDescriptor], profile: &Profile, vocabulary: &Vocabulary) -> Vec<FillInstruction> {
    let mut used = vec![false; fields.len()];
    let mut planned = Vec::new();

    for instruction in profile.instructions(vocabulary) {
        let rule = vocabulary.rule(&instruction.field_name);
        let constraints = MatchConstraints {
            exclude_patterns: rule.exclude,
        };
        let hit = find_tiered_where(fields, &rule.keywords, &constraints, |i| !used[i]);

        match hit {
            Some((index, tier)) => {
                used[index] = true;
                let field = &fields[index];
                debug!(
                    key = %instruction.field_name,
                    field = %field.label,
                    selector = %field.selector,
                    tier = ?tier,
                    "Planned fill"
                );
                let shared = fields.iter().filter(|f| f.selector == field.selector).count() > 1;
                if shared {
                    debug!(key = %instruction.field_name, selector = %field.selector, "Selector is shared, matching live");
                    planned.push(instruction);
                } else {
                    planned.push(instruction.with_selector(field.selector.clone()));
                }
            }
            None => {
                debug!(key = %instruction.field_name, "No scraped field, matching live");
                planned.push(instruction);
            }
        }
    }
    planned
}
