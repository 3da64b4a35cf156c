/// User observations and the prediction outcome recorded with them
use super::geo::GeoPoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One ranked classifier candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesCandidate {
    pub species_id: String,
    pub confidence: f32,
}

/// How the species of an observation was (or was not) assigned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PredictionStatus {
    /// Species supplied by the submitter
    Manual,
    /// Top prediction met the confidence threshold
    Accepted,
    BelowThreshold,
    /// Predictor answered with a species id the catalog does not know
    UnknownSpecies,
    Unavailable { message: String },
    TimedOut { after_ms: u64 },
}

impl PredictionStatus {
    pub fn assigns_species(&self) -> bool {
        matches!(self, PredictionStatus::Manual | PredictionStatus::Accepted)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: String,
    pub species_id: Option<String>,
    pub location: GeoPoint,
    /// Present only when the pipeline assigned the species
    pub confidence: Option<f32>,
    pub needs_review: bool,
    pub prediction_status: PredictionStatus,
    #[serde(default)]
    pub alternatives: Vec<SpeciesCandidate>,
    #[serde(default)]
    pub region_ids: Vec<String>,
    pub image_path: Option<String>,
    pub observer_name: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
