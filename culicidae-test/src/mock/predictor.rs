//! Scripted predictors
//!
//! Each mock counts its calls so tests can assert whether the pipeline
//! consulted the classifier at all.

use async_trait::async_trait;
use culicidae_catalog::{Prediction, Predictor, PredictorError};
use culicidae_core::SpeciesCandidate;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Always answers with the same prediction
#[derive(Debug)]
pub struct StaticPredictor {
    prediction: Prediction,
    calls: AtomicUsize,
}

impl StaticPredictor {
    pub fn new(species_id: impl Into<String>, confidence: f32) -> Self {
        Self {
            prediction: Prediction {
                species_id: species_id.into(),
                confidence,
                alternatives: Vec::new(),
            },
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_alternative(mut self, species_id: impl Into<String>, confidence: f32) -> Self {
        self.prediction.alternatives.push(SpeciesCandidate {
            species_id: species_id.into(),
            confidence,
        });
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Predictor for StaticPredictor {
    async fn predict(&self, _image: &[u8]) -> Result<Prediction, PredictorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.prediction.clone())
    }
}

/// Fails every request like an unreachable classifier
#[derive(Debug, Default)]
pub struct FailingPredictor {
    calls: AtomicUsize,
}

impl FailingPredictor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Predictor for FailingPredictor {
    async fn predict(&self, _image: &[u8]) -> Result<Prediction, PredictorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(PredictorError::Request("connection refused".to_string()))
    }
}

/// Answers only after `delay`
#[derive(Debug)]
pub struct SlowPredictor {
    inner: StaticPredictor,
    delay: Duration,
}

impl SlowPredictor {
    pub fn new(delay: Duration, species_id: impl Into<String>, confidence: f32) -> Self {
        Self {
            inner: StaticPredictor::new(species_id, confidence),
            delay,
        }
    }

    pub fn call_count(&self) -> usize {
        self.inner.call_count()
    }
}

#[async_trait]
impl Predictor for SlowPredictor {
    async fn predict(&self, image: &[u8]) -> Result<Prediction, PredictorError> {
        tokio::time::sleep(self.delay).await;
        self.inner.predict(image).await
    }
}
