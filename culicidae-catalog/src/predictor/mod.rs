//! Species classifier boundary

pub mod remote;

pub use remote::RemotePredictor;

use async_trait::async_trait;
use culicidae_core::SpeciesCandidate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classifier answer for one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub species_id: String,
    /// Confidence of the top candidate in [0, 1]
    pub confidence: f32,
    #[serde(default)]
    pub alternatives: Vec<SpeciesCandidate>,
}

impl Prediction {
    pub fn validate(&self) -> Result<(), PredictorError> {
        let in_range = |c: f32| c.is_finite() && (0.0..=1.0).contains(&c);
        if self.species_id.trim().is_empty() {
            return Err(PredictorError::InvalidResponse(
                "empty species id".to_string(),
            ));
        }
        if !in_range(self.confidence) || !self.alternatives.iter().all(|a| in_range(a.confidence)) {
            return Err(PredictorError::InvalidResponse(format!(
                "confidence outside [0, 1] for '{}'",
                self.species_id
            )));
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum PredictorError {
    #[error("Predictor not configured")]
    NotConfigured,

    #[error("Predictor request failed: {0}")]
    Request(String),

    #[error("Invalid predictor response: {0}")]
    InvalidResponse(String),
}

/// Image classifier. Implementations must be safe to call concurrently.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(&self, image: &[u8]) -> Result<Prediction, PredictorError>;
}

/// Stand-in used when no classifier endpoint is configured
#[derive(Debug, Default, Clone)]
pub struct UnavailablePredictor;

#[async_trait]
impl Predictor for UnavailablePredictor {
    async fn predict(&self, _image: &[u8]) -> Result<Prediction, PredictorError> {
        Err(PredictorError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unavailable_predictor() {
        let err = UnavailablePredictor.predict(b"image").await.unwrap_err();
        assert!(matches!(err, PredictorError::NotConfigured));
    }

    #[test]
    fn test_prediction_validation() {
        let mut prediction = Prediction {
            species_id: "aedes-aegypti".to_string(),
            confidence: 0.9,
            alternatives: vec![SpeciesCandidate {
                species_id: "aedes-albopictus".to_string(),
                confidence: 0.05,
            }],
        };
        assert!(prediction.validate().is_ok());

        prediction.confidence = 1.2;
        assert!(prediction.validate().is_err());

        prediction.confidence = f32::NAN;
        assert!(prediction.validate().is_err());

        prediction.confidence = 0.5;
        prediction.species_id = " ".to_string();
        assert!(prediction.validate().is_err());
    }

    #[test]
    fn test_prediction_json_shape() {
        let json = r#"{"species_id": "culex-pipiens", "confidence": 0.42}"#;
        let prediction: Prediction = serde_json::from_str(json).unwrap();
        assert_eq!(prediction.species_id, "culex-pipiens");
        assert!(prediction.alternatives.is_empty());
    }
}
