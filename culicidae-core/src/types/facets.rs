/// Facet descriptors for filterable attributes
use super::locale::LocalizedText;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const VECTOR_STATUS_VECTOR: &str = "vector";
pub const VECTOR_STATUS_NON_VECTOR: &str = "non_vector";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetKind {
    Region,
    Disease,
    VectorStatus,
}

impl FacetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacetKind::Region => "region",
            FacetKind::Disease => "disease",
            FacetKind::VectorStatus => "vector_status",
        }
    }

    /// Facet value used for a species' vector flag
    pub fn vector_status_value(is_vector: bool) -> &'static str {
        if is_vector {
            VECTOR_STATUS_VECTOR
        } else {
            VECTOR_STATUS_NON_VECTOR
        }
    }
}

impl fmt::Display for FacetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row of the `filter_options` table: display labels for one facet value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetLabel {
    pub facet: FacetKind,
    pub value: String,
    #[serde(default)]
    pub labels: LocalizedText,
}

impl FacetLabel {
    /// Storage key, unique per facet and value
    pub fn key(&self) -> String {
        format!("{}:{}", self.facet, self.value)
    }
}
