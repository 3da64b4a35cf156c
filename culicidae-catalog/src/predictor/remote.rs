/// HTTP classifier client
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::debug;

use super::{Prediction, Predictor, PredictorError};

pub struct RemotePredictor {
    client: reqwest::Client,
    endpoint: String,
}

impl RemotePredictor {
    /// Client POSTing raw image bytes to `endpoint`. `timeout` bounds the
    /// whole request; the pipeline applies its own deadline on top.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, PredictorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("culicidae/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PredictorError::Request(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Predictor for RemotePredictor {
    async fn predict(&self, image: &[u8]) -> Result<Prediction, PredictorError> {
        debug!(endpoint = %self.endpoint, bytes = image.len(), "requesting prediction");

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec())
            .send()
            .await
            .map_err(|e| PredictorError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| PredictorError::Request(e.to_string()))?;

        let prediction: Prediction = response
            .json()
            .await
            .map_err(|e| PredictorError::InvalidResponse(e.to_string()))?;
        prediction.validate()?;
        Ok(prediction)
    }
}
