use std::fs;
use std::path::Path;

use serde_yaml::{Mapping, Value};
use tracing::warn;

use crate::error::ProfileError;
use crate::field::field_model::{FillInstruction, FillValue};
use crate::matcher::vocabulary::Vocabulary;

/// Flat key/value record of the user's data, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    entries: Vec<(String, FillValue)>,
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl Profile {
    pub fn from_entries<K: Into<String>, V: Into<FillValue>>(entries: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Parse YAML or JSON. Scalars become text, lists of scalars become
    /// multi-values; nulls, nested maps and blank values are skipped.
    pub fn parse(source: &str, path: &str) -> Result<Self, ProfileError> {
        let mapping: Mapping = serde_yaml::from_str(source).map_err(|e| ProfileError::Yaml {
            path: path.to_string(),
            source: e,
        })?;

        let mut entries = Vec::new();
        for (key, value) in mapping {
            let Some(key) = scalar_text(&key) else {
                warn!(path, "Skipping profile entry with a non-scalar key");
                continue;
            };
            let value = match &value {
                Value::Sequence(items) => FillValue::Many(items.iter().filter_map(scalar_text).collect()),
                Value::Null => continue,
                other => match scalar_text(other) {
                    Some(text) => FillValue::Single(text),
                    None => {
                        warn!(path, key = %key, "Skipping nested profile entry");
                        continue;
                    }
                },
            };
            if !value.is_blank() {
                entries.push((key, value));
            }
        }
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let display = path.display().to_string();
        let source = fs::read_to_string(path).map_err(|e| ProfileError::Io {
            path: display.clone(),
            source: e,
        })?;
        Self::parse(&source, &display)
    }

    pub fn get(&self, key: &str) -> Option<&FillValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One instruction per entry: vocabulary keys first in vocabulary order,
    /// then the remaining keys in file order.
    pub fn instructions(&self, vocabulary: &Vocabulary) -> Vec<FillInstruction> {
        let known: Vec<&str> = vocabulary.keys().collect();
        let mut out: Vec<FillInstruction> = known
            .iter()
            .filter_map(|key| self.get(key).map(|v| FillInstruction::new(key, v.clone())))
            .collect();
        out.extend(
            self.entries
                .iter()
                .filter(|(k, _)| !known.contains(&k.as_str()))
                .map(|(k, v)| FillInstruction::new(k, v.clone())),
        );
        out
    }
}
