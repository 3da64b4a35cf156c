//! Observation ingestion
//!
//! An upload is validated completely before anything is written. Prediction
//! failures never fail a submission: the observation is stored without a
//! species and flagged for review, with the reason kept in
//! `prediction_status`. Store failures do fail it, and the image directory
//! written for it is removed again.

pub mod image;

pub use self::image::{ImageArtifacts, ImageKind};

use crate::cache::{CacheSnapshot, ReferenceCache};
use crate::geo::sort_observations;
use crate::predictor::Predictor;
use crate::query::{Page, Pagination};
use chrono::Utc;
use culicidae_core::config::{PipelineConfig, QueryConfig};
use culicidae_core::{
    CatalogError, CatalogResult, GeoPoint, Observation, PredictionStatus, SpeciesCandidate,
};
use culicidae_storage::{table_names, Gateway, StorageResult, TableHandle};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Raw upload plus caller-supplied metadata
#[derive(Debug, Clone, Default)]
pub struct ObservationSubmission {
    pub image: Vec<u8>,
    /// Manual species assignment; skips prediction when present
    pub species_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub observer_name: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationOutcome {
    pub observation: Observation,
    pub artifacts: ImageArtifacts,
}

impl ObservationOutcome {
    /// Stored without a species, awaiting review
    pub fn is_partial(&self) -> bool {
        self.observation.species_id.is_none() && self.observation.needs_review
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservationQuery {
    pub species_id: Option<String>,
    pub needs_review: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Reviewer changes to a stored observation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservationUpdate {
    /// Confirmed species; clears the review flag
    pub species_id: Option<String>,
    pub notes: Option<String>,
}

/// Species assignment decided for a submission
struct Assignment {
    species_id: Option<String>,
    confidence: Option<f32>,
    status: PredictionStatus,
    alternatives: Vec<SpeciesCandidate>,
}

impl Assignment {
    fn manual(species_id: String) -> Self {
        Self {
            species_id: Some(species_id),
            confidence: None,
            status: PredictionStatus::Manual,
            alternatives: Vec::new(),
        }
    }

    fn unassigned(status: PredictionStatus, alternatives: Vec<SpeciesCandidate>) -> Self {
        Self {
            species_id: None,
            confidence: None,
            status,
            alternatives,
        }
    }
}

fn join_error(err: tokio::task::JoinError) -> CatalogError {
    CatalogError::Io(std::io::Error::other(format!("blocking task failed: {}", err)))
}

async fn remove_artifacts(directory: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(directory).await {
        warn!(dir = %directory.display(), error = %e, "failed to remove image directory");
    }
}

pub struct ObservationPipeline {
    cache: Arc<ReferenceCache>,
    gateway: Gateway,
    predictor: Arc<dyn Predictor>,
    config: PipelineConfig,
    query_config: QueryConfig,
}

impl ObservationPipeline {
    pub fn new(
        cache: Arc<ReferenceCache>,
        gateway: Gateway,
        predictor: Arc<dyn Predictor>,
        config: PipelineConfig,
        query_config: QueryConfig,
    ) -> Self {
        Self {
            cache,
            gateway,
            predictor,
            config,
            query_config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn observations(&self) -> StorageResult<TableHandle<Observation>> {
        self.gateway.open_table(table_names::OBSERVATIONS)
    }

    /// Checks that need no decoding: size, sniffed format, coordinates, manual species
    fn validate(
        &self,
        submission: &ObservationSubmission,
        snapshot: &CacheSnapshot,
    ) -> CatalogResult<(ImageKind, GeoPoint)> {
        let size = submission.image.len();
        if size == 0 {
            return Err(CatalogError::validation("image is empty"));
        }
        if size > self.config.max_image_bytes {
            return Err(CatalogError::validation(format!(
                "image is {} bytes, limit is {}",
                size, self.config.max_image_bytes
            )));
        }

        let kind = ImageKind::detect(&submission.image)
            .ok_or_else(|| CatalogError::validation("unrecognised image format"))?;
        if !kind.is_allowed(&self.config.allowed_formats) {
            return Err(CatalogError::validation(format!(
                "image format '{}' is not allowed",
                kind.name()
            )));
        }

        let point = GeoPoint::new(submission.latitude, submission.longitude)?;

        if let Some(species_id) = submission.species_id.as_deref() {
            if snapshot.species_record(species_id).is_none() {
                return Err(CatalogError::validation(format!(
                    "unknown species '{}'",
                    species_id
                )));
            }
        }

        Ok((kind, point))
    }

    async fn predict(&self, image: &[u8], snapshot: &CacheSnapshot) -> Assignment {
        let timeout = self.config.predictor_timeout();

        let prediction = match tokio::time::timeout(timeout, self.predictor.predict(image)).await {
            Err(_) => {
                let err = CatalogError::PredictionTimeout(timeout);
                warn!(error = %err, "prediction skipped");
                return Assignment::unassigned(
                    PredictionStatus::TimedOut {
                        after_ms: timeout.as_millis() as u64,
                    },
                    Vec::new(),
                );
            }
            Ok(Err(e)) => {
                let err = CatalogError::PredictionUnavailable(e.to_string());
                warn!(error = %err, "prediction skipped");
                return Assignment::unassigned(
                    PredictionStatus::Unavailable {
                        message: e.to_string(),
                    },
                    Vec::new(),
                );
            }
            Ok(Ok(prediction)) => prediction,
        };

        if let Err(e) = prediction.validate() {
            let err = CatalogError::PredictionUnavailable(e.to_string());
            warn!(error = %err, "prediction discarded");
            return Assignment::unassigned(
                PredictionStatus::Unavailable {
                    message: e.to_string(),
                },
                Vec::new(),
            );
        }

        let top = SpeciesCandidate {
            species_id: prediction.species_id.clone(),
            confidence: prediction.confidence,
        };
        let mut candidates = vec![top];
        candidates.extend(prediction.alternatives.iter().cloned());

        if snapshot.species_record(&prediction.species_id).is_none() {
            warn!(species = %prediction.species_id, "predictor returned an unknown species");
            return Assignment::unassigned(PredictionStatus::UnknownSpecies, candidates);
        }
        if prediction.confidence < self.config.confidence_threshold {
            info!(
                species = %prediction.species_id,
                confidence = prediction.confidence,
                threshold = self.config.confidence_threshold,
                "prediction below threshold"
            );
            return Assignment::unassigned(PredictionStatus::BelowThreshold, candidates);
        }

        Assignment {
            species_id: Some(prediction.species_id),
            confidence: Some(prediction.confidence),
            status: PredictionStatus::Accepted,
            alternatives: prediction.alternatives,
        }
    }

    /// Validate, classify, store image variants and persist the observation
    pub async fn submit(&self, submission: ObservationSubmission) -> CatalogResult<ObservationOutcome> {
        let snapshot = self.cache.snapshot()?;
        let (kind, point) = self.validate(&submission, &snapshot)?;

        let ObservationSubmission {
            image,
            species_id,
            observer_name,
            notes,
            ..
        } = submission;
        let image = Arc::new(image);

        let bytes = Arc::clone(&image);
        let decoded = tokio::task::spawn_blocking(move || self::image::decode(&bytes, kind))
            .await
            .map_err(join_error)??;

        let assignment = match species_id {
            Some(species_id) => Assignment::manual(species_id),
            None => self.predict(&image, &snapshot).await,
        };

        let id = Uuid::new_v4().to_string();
        let region_ids = snapshot
            .regions_containing(&point)
            .into_iter()
            .map(|r| r.region.id.clone())
            .collect();

        let directory = self.config.image_root().join(&id);
        let sizes = self.config.thumbnail_sizes.clone();
        let dir = directory.clone();
        let bytes = Arc::clone(&image);
        let written = tokio::task::spawn_blocking(move || {
            self::image::write_artifacts(&dir, &bytes, kind, &decoded, &sizes)
        })
        .await
        .map_err(join_error)?;
        let artifacts = match written {
            Ok(artifacts) => artifacts,
            Err(e) => {
                remove_artifacts(&directory).await;
                return Err(e);
            }
        };

        let needs_review = assignment.species_id.is_none();
        let observation = Observation {
            id,
            species_id: assignment.species_id,
            location: point,
            confidence: assignment.confidence,
            needs_review,
            prediction_status: assignment.status,
            alternatives: assignment.alternatives,
            region_ids,
            image_path: Some(artifacts.original.to_string_lossy().into_owned()),
            observer_name,
            notes,
            created_at: Utc::now(),
        };

        if let Err(e) = self.persist(&observation).await {
            error!(observation = %observation.id, error = %e, "failed to store observation");
            remove_artifacts(&artifacts.directory).await;
            return Err(e);
        }

        info!(
            observation = %observation.id,
            species = ?observation.species_id,
            status = ?observation.prediction_status,
            "observation persisted"
        );
        Ok(ObservationOutcome {
            observation,
            artifacts,
        })
    }

    async fn persist(&self, observation: &Observation) -> CatalogResult<()> {
        let table = self
            .observations()
            .map_err(|e| CatalogError::StoreUnavailable(e.to_string()))?;
        let row = observation.clone();
        tokio::task::spawn_blocking(move || table.insert(&row))
            .await
            .map_err(join_error)?
            .map_err(|e| CatalogError::StoreUnavailable(e.to_string()))
    }

    pub fn observation(&self, id: &str) -> CatalogResult<Observation> {
        self.observations()?
            .get(id)?
            .ok_or_else(|| CatalogError::not_found("observation", id))
    }

    /// Stored observations, newest first
    pub fn list_observations(&self, query: &ObservationQuery) -> CatalogResult<Page<Observation>> {
        let pagination = Pagination::new(query.limit, query.offset, &self.query_config);
        let mut rows = self.observations()?.scan_where(|o| {
            query
                .species_id
                .as_deref()
                .is_none_or(|id| o.species_id.as_deref() == Some(id))
                && query.needs_review.is_none_or(|flag| o.needs_review == flag)
        })?;
        sort_observations(&mut rows);
        Ok(pagination.apply(rows))
    }

    /// Apply a review. Assigning a species marks the observation as reviewed.
    pub async fn update_observation(
        &self,
        id: &str,
        update: ObservationUpdate,
    ) -> CatalogResult<Observation> {
        let mut observation = self.observation(id)?;

        if let Some(species_id) = update.species_id {
            let snapshot = self.cache.snapshot()?;
            if snapshot.species_record(&species_id).is_none() {
                return Err(CatalogError::validation(format!(
                    "unknown species '{}'",
                    species_id
                )));
            }
            observation.species_id = Some(species_id);
            observation.confidence = None;
            observation.needs_review = false;
            observation.prediction_status = PredictionStatus::Manual;
        }
        if let Some(notes) = update.notes {
            observation.notes = Some(notes);
        }

        self.persist(&observation).await?;
        info!(observation = %observation.id, "observation updated");
        Ok(observation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::{MockPredictor, Prediction, PredictorError};
    use culicidae_core::{Disease, FacetLabel, Locale, LocalizedText, Region, RegionGeometry, Species};
    use ::image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
    use std::io::Cursor;
    use std::time::Duration;
    use tempfile::TempDir;

    fn jpeg() -> Vec<u8> {
        let img = ImageBuffer::from_pixel(32, 32, Rgb([200u8, 30, 30]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Jpeg)
            .unwrap();
        out.into_inner()
    }

    fn gateway() -> Gateway {
        let gateway = Gateway::in_memory();
        gateway
            .open_table::<Species>(table_names::SPECIES)
            .unwrap()
            .insert(&Species {
                id: "aedes-aegypti".to_string(),
                scientific_name: "Aedes aegypti".to_string(),
                common_names: LocalizedText::new(),
                vector_embedding: vec![],
                is_vector: true,
                region_ids: vec![],
                disease_ids: vec![],
                metadata: serde_json::Value::Null,
            })
            .unwrap();
        gateway
            .open_table::<Region>(table_names::REGIONS)
            .unwrap()
            .insert(&Region {
                id: "nyc".to_string(),
                names: LocalizedText::new().with(Locale::En, "New York"),
                geometry: RegionGeometry::Polygon(vec![vec![
                    [-75.0, 40.0],
                    [-73.0, 40.0],
                    [-73.0, 41.0],
                    [-75.0, 41.0],
                ]]),
            })
            .unwrap();
        gateway.open_table::<Disease>(table_names::DISEASES).unwrap();
        gateway
            .open_table::<FacetLabel>(table_names::FILTER_OPTIONS)
            .unwrap();
        gateway
    }

    fn pipeline(predictor: MockPredictor, root: &Path) -> ObservationPipeline {
        let gateway = gateway();
        let cache = Arc::new(ReferenceCache::new(Locale::En));
        cache.load(&gateway).unwrap();
        let config = PipelineConfig {
            image_root: Some(root.to_path_buf()),
            predictor_timeout_ms: 200,
            ..Default::default()
        };
        ObservationPipeline::new(
            cache,
            gateway,
            Arc::new(predictor),
            config,
            QueryConfig::default(),
        )
    }

    fn submission() -> ObservationSubmission {
        ObservationSubmission {
            image: jpeg(),
            latitude: 40.7128,
            longitude: -74.0060,
            ..Default::default()
        }
    }

    fn predicting(species_id: &'static str, confidence: f32) -> MockPredictor {
        let mut predictor = MockPredictor::new();
        predictor.expect_predict().times(1).returning(move |_| {
            Ok(Prediction {
                species_id: species_id.to_string(),
                confidence,
                alternatives: vec![],
            })
        });
        predictor
    }

    #[tokio::test]
    async fn test_confident_prediction_is_accepted() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = pipeline(predicting("aedes-aegypti", 0.9), temp_dir.path());

        let outcome = pipeline.submit(submission()).await.unwrap();
        assert!(!outcome.is_partial());
        assert_eq!(outcome.observation.species_id.as_deref(), Some("aedes-aegypti"));
        assert_eq!(outcome.observation.prediction_status, PredictionStatus::Accepted);
        assert_eq!(outcome.observation.region_ids, vec!["nyc"]);
        assert_eq!(outcome.artifacts.files().filter(|p| p.exists()).count(), 3);

        let stored = pipeline.observation(&outcome.observation.id).unwrap();
        assert_eq!(stored, outcome.observation);
    }

    #[tokio::test]
    async fn test_low_confidence_needs_review() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = pipeline(predicting("aedes-aegypti", 0.3), temp_dir.path());

        let outcome = pipeline.submit(submission()).await.unwrap();
        assert!(outcome.is_partial());
        assert_eq!(outcome.observation.prediction_status, PredictionStatus::BelowThreshold);
        assert_eq!(outcome.observation.alternatives[0].species_id, "aedes-aegypti");
        assert_eq!(outcome.artifacts.files().filter(|p| p.exists()).count(), 3);
    }

    #[tokio::test]
    async fn test_unknown_predicted_species_needs_review() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = pipeline(predicting("anopheles-unknown", 0.99), temp_dir.path());

        let outcome = pipeline.submit(submission()).await.unwrap();
        assert!(outcome.is_partial());
        assert_eq!(outcome.observation.prediction_status, PredictionStatus::UnknownSpecies);
    }

    #[tokio::test]
    async fn test_predictor_failure_is_recovered() {
        let temp_dir = TempDir::new().unwrap();
        let mut predictor = MockPredictor::new();
        predictor
            .expect_predict()
            .returning(|_| Err(PredictorError::Request("connection refused".to_string())));
        let pipeline = pipeline(predictor, temp_dir.path());

        let outcome = pipeline.submit(submission()).await.unwrap();
        assert!(outcome.is_partial());
        assert!(matches!(
            outcome.observation.prediction_status,
            PredictionStatus::Unavailable { ref message } if message.contains("connection refused")
        ));
    }

    #[tokio::test]
    async fn test_manual_species_skips_predictor() {
        let temp_dir = TempDir::new().unwrap();
        let mut predictor = MockPredictor::new();
        predictor.expect_predict().never();
        let pipeline = pipeline(predictor, temp_dir.path());

        let outcome = pipeline
            .submit(ObservationSubmission {
                species_id: Some("aedes-aegypti".to_string()),
                ..submission()
            })
            .await
            .unwrap();
        assert_eq!(outcome.observation.prediction_status, PredictionStatus::Manual);
        assert!(!outcome.observation.needs_review);

        let unknown = pipeline
            .submit(ObservationSubmission {
                species_id: Some("culex-nowhere".to_string()),
                ..submission()
            })
            .await;
        assert!(matches!(unknown, Err(CatalogError::Validation(_))));
    }

    #[tokio::test]
    async fn test_invalid_uploads_write_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let mut predictor = MockPredictor::new();
        predictor.expect_predict().never();
        let pipeline = pipeline(predictor, temp_dir.path());

        let cases = vec![
            ObservationSubmission { image: vec![], ..submission() },
            ObservationSubmission { image: b"GIF89a....".to_vec(), ..submission() },
            ObservationSubmission { image: jpeg()[..16].to_vec(), ..submission() },
            ObservationSubmission { latitude: 95.0, ..submission() },
            ObservationSubmission { longitude: f64::NAN, ..submission() },
        ];
        for case in cases {
            assert!(matches!(
                pipeline.submit(case).await,
                Err(CatalogError::Validation(_))
            ));
        }

        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
        assert_eq!(pipeline.list_observations(&ObservationQuery::default()).unwrap().count, 0);
    }

    #[tokio::test]
    async fn test_oversize_and_disallowed_formats() {
        let temp_dir = TempDir::new().unwrap();
        let mut predictor = MockPredictor::new();
        predictor.expect_predict().never();
        let mut pipeline = pipeline(predictor, temp_dir.path());
        pipeline.config.max_image_bytes = 64;

        let err = pipeline.submit(submission()).await.unwrap_err();
        assert!(err.to_string().contains("limit is 64"));

        pipeline.config.max_image_bytes = 1024 * 1024;
        pipeline.config.allowed_formats = vec!["png".to_string()];
        let err = pipeline.submit(submission()).await.unwrap_err();
        assert!(err.to_string().contains("not allowed"));
    }

    #[tokio::test]
    async fn test_list_and_review() {
        let temp_dir = TempDir::new().unwrap();
        let mut predictor = MockPredictor::new();
        let mut calls = 0;
        predictor.expect_predict().times(2).returning(move |_| {
            calls += 1;
            Ok(Prediction {
                species_id: "aedes-aegypti".to_string(),
                confidence: if calls == 1 { 0.95 } else { 0.1 },
                alternatives: vec![],
            })
        });
        let pipeline = pipeline(predictor, temp_dir.path());

        pipeline.submit(submission()).await.unwrap();
        let pending = pipeline.submit(submission()).await.unwrap().observation;

        let review = pipeline
            .list_observations(&ObservationQuery {
                needs_review: Some(true),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(review.count, 1);
        assert_eq!(review.results[0].id, pending.id);

        let updated = pipeline
            .update_observation(
                &pending.id,
                ObservationUpdate {
                    species_id: Some("aedes-aegypti".to_string()),
                    notes: Some("confirmed by lab".to_string()),
                },
            )
            .await
            .unwrap();
        assert!(!updated.needs_review);
        assert_eq!(updated.prediction_status, PredictionStatus::Manual);

        let by_species = pipeline
            .list_observations(&ObservationQuery {
                species_id: Some("aedes-aegypti".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_species.count, 2);

        assert!(matches!(
            pipeline.observation("missing"),
            Err(CatalogError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_predictor_timeout_is_recovered() {
        struct Stalled;

        #[async_trait::async_trait]
        impl Predictor for Stalled {
            async fn predict(&self, _image: &[u8]) -> Result<Prediction, PredictorError> {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Err(PredictorError::NotConfigured)
            }
        }

        let temp_dir = TempDir::new().unwrap();
        let gateway = gateway();
        let cache = Arc::new(ReferenceCache::new(Locale::En));
        cache.load(&gateway).unwrap();
        let pipeline = ObservationPipeline::new(
            cache,
            gateway,
            Arc::new(Stalled),
            PipelineConfig {
                image_root: Some(temp_dir.path().to_path_buf()),
                predictor_timeout_ms: 50,
                ..Default::default()
            },
            QueryConfig::default(),
        );

        let outcome = pipeline.submit(submission()).await.unwrap();
        assert!(outcome.is_partial());
        assert_eq!(
            outcome.observation.prediction_status,
            PredictionStatus::TimedOut { after_ms: 50 }
        );
    }
}
