use serde::{Deserialize, Serialize};

// ============================================================================
// Discovered fields
// ============================================================================

/// Semantic kind of a discovered control. Native types with no variant of
/// their own collapse to `Text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Text,
    Email,
    Tel,
    Number,
    Date,
    Url,
    TextArea,
    Select,
    Radio,
    Checkbox,
    File,
}

/// Identifier assigned during one discovery pass. Not stable across passes
/// or reloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(pub u32);

/// Native constraint attributes copied off the control.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<String>,
}

impl Validation {
    pub fn is_empty(&self) -> bool {
        *self == Validation::default()
    }
}

/// One discovered input on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub id: FieldId,
    pub kind: FieldKind,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dom_id: Option<String>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<String>,
    /// The only handle that re-locates the element after discovery
    pub selector: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<Validation>,
    /// Caption of the enclosing group. Advisory only, never matched on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Why a control never becomes a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Exclusion {
    NotAControl,
    HiddenType,
    NotFillable,
    Captcha,
    NotVisible,
    Unlabeled,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Field(Box<FieldDescriptor>),
    Excluded(Exclusion),
}

impl Classification {
    pub fn into_field(self) -> Option<FieldDescriptor> {
        match self {
            Classification::Field(field) => Some(*field),
            Classification::Excluded(_) => None,
        }
    }
}

// ============================================================================
// Fill instructions (host -> content)
// ============================================================================

/// A value to fill: one string, or several for multi-selects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FillValue {
    Single(String),
    Many(Vec<String>),
}

impl FillValue {
    /// Single text form. Lists are joined with ", ".
    pub fn as_text(&self) -> String {
        match self {
            FillValue::Single(v) => v.clone(),
            FillValue::Many(vs) => vs.join(", "),
        }
    }

    pub fn first(&self) -> Option<&str> {
        match self {
            FillValue::Single(v) => Some(v.as_str()),
            FillValue::Many(vs) => vs.first().map(String::as_str),
        }
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            FillValue::Single(v) => vec![v.as_str()],
            FillValue::Many(vs) => vs.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.values().iter().all(|v| v.trim().is_empty())
    }
}

impl From<&str> for FillValue {
    fn from(value: &str) -> Self {
        FillValue::Single(value.to_string())
    }
}

impl From<String> for FillValue {
    fn from(value: String) -> Self {
        FillValue::Single(value)
    }
}

/// Host request to fill one logical field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillInstruction {
    /// Logical key from the vocabulary (e.g. `firstName`), not a DOM name
    pub field_name: String,
    pub value: FillValue,
    /// Scrape-time selector of the target descriptor, resolved before any
    /// keyword matching
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    /// Keywords to use instead of the vocabulary entry for `field_name`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

impl FillInstruction {
    pub fn new(field_name: &str, value: impl Into<FillValue>) -> Self {
        Self {
            field_name: field_name.to_string(),
            value: value.into(),
            selector: None,
            keywords: Vec::new(),
        }
    }

    pub fn with_keywords(mut self, keywords: &[&str]) -> Self {
        self.keywords = keywords.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }
}
