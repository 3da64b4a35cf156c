//! Table row bindings for the catalog entities

use crate::core::Record;
use culicidae_core::{Disease, FacetLabel, Observation, Region, Species};

impl Record for Species {
    fn key(&self) -> String {
        self.id.clone()
    }

    fn embedding(&self) -> Option<&[f32]> {
        if self.vector_embedding.is_empty() {
            None
        } else {
            Some(&self.vector_embedding)
        }
    }
}

impl Record for Disease {
    fn key(&self) -> String {
        self.id.clone()
    }
}

impl Record for Region {
    fn key(&self) -> String {
        self.id.clone()
    }
}

impl Record for Observation {
    fn key(&self) -> String {
        self.id.clone()
    }
}

impl Record for FacetLabel {
    fn key(&self) -> String {
        FacetLabel::key(self)
    }
}
