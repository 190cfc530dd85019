use serde::{Deserialize, Serialize};

/// The values available along one variant axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSet {
    #[serde(rename = "type")]
    pub variant_type: String,
    pub default: String,
    pub values: Vec<String>,
}

impl VariantSet {
    /// Create a set. The default value is always a member, and values are
    /// kept in first-seen order without duplicates.
    pub fn new(
        variant_type: impl Into<String>,
        default: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let default = default.into();
        let mut set = Self {
            variant_type: variant_type.into(),
            default: default.clone(),
            values: Vec::new(),
        };
        for value in values {
            set.push(value.into());
        }
        if !set.contains(&default) {
            set.values.insert(0, default);
        }
        set
    }

    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }

    /// Append a value unless already present.
    pub fn push(&mut self, value: String) {
        if !self.contains(&value) {
            self.values.push(value);
        }
    }

    pub fn has_same_default(&self, other: &Self) -> bool {
        self.default == other.default
    }
}
