//! End-to-end catalog behaviour over the fixture dataset

use culicidae_catalog::{
    Catalog, ObservationQuery, ObservationSubmission, Predictor, SpeciesQuery,
    UnavailablePredictor,
};
use culicidae_core::{BoundingBox, CatalogError, EntityType, PredictionStatus};
use culicidae_storage::{table_names, Gateway};
use culicidae_test::fixtures::{self, NYC};
use culicidae_test::{
    init_test_logging, FailingPredictor, FailingTableStore, SlowPredictor, StaticPredictor,
    TestConfig, TestEnvironment,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn memory_catalog(env: &TestEnvironment, predictor: Arc<dyn Predictor>) -> Catalog {
    let catalog = Catalog::with_parts(env.catalog_config(), Gateway::in_memory(), predictor).unwrap();
    catalog.import(&fixtures::reference_dataset()).unwrap();
    catalog
}

fn nyc_upload() -> ObservationSubmission {
    ObservationSubmission {
        image: fixtures::jpeg_bytes(320, 240),
        latitude: NYC.0,
        longitude: NYC.1,
        observer_name: Some("field team".to_string()),
        ..Default::default()
    }
}

fn species_count(catalog: &Catalog, query: &SpeciesQuery) -> usize {
    catalog.query().search_species(query).unwrap().count
}

#[test]
fn test_get_is_idempotent() {
    let env = TestEnvironment::new().unwrap();
    let catalog = memory_catalog(&env, Arc::new(UnavailablePredictor));

    for (entity, id) in [
        (EntityType::Species, "aedes-aegypti"),
        (EntityType::Disease, "dengue"),
        (EntityType::Region, "west-africa"),
    ] {
        let first = catalog.cache().get(entity, id, Some("ru")).unwrap();
        let second = catalog.cache().get(entity, id, Some("ru")).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn test_unsupported_locale_matches_default() {
    let env = TestEnvironment::new().unwrap();
    let catalog = memory_catalog(&env, Arc::new(UnavailablePredictor));
    let cache = catalog.cache();

    let fallback = cache.species("aedes-aegypti", Some("xx-YY")).unwrap();
    let default = cache.species("aedes-aegypti", None).unwrap();
    assert_eq!(fallback, default);
    assert_eq!(default.common_name, "Yellow fever mosquito");

    // No Russian name on file: the English one is used
    let ru = cache.species("toxorhynchites-rutilus", Some("ru")).unwrap();
    assert_eq!(ru.common_name, "Elephant mosquito");

    let facets = cache.list_facets(Some("ru")).unwrap();
    let vector = facets
        .vector_status
        .iter()
        .find(|f| f.value == "vector")
        .unwrap();
    assert_eq!(vector.label, "Переносчик");
    assert_eq!(vector.count, 4);
}

#[test]
fn test_filters_only_narrow() {
    let env = TestEnvironment::new().unwrap();
    let catalog = memory_catalog(&env, Arc::new(UnavailablePredictor));

    let terms = prop::option::of(prop::sample::select(vec![
        "aedes", "Mosquito", "culex", "tiger", "zzz",
    ]));
    let regions = prop::option::of(prop::sample::select(vec![
        "new-york", "west-africa", "fiji", "antarctica", "atlantis",
    ]));
    let diseases = prop::option::of(prop::sample::select(vec![
        "dengue", "malaria", "zika", "plague",
    ]));
    let vector_flags = prop::option::of(any::<bool>());

    proptest!(|(term in terms, region in regions, disease in diseases, is_vector in vector_flags)| {
        let full = SpeciesQuery {
            term: term.map(str::to_string),
            region_id: region.map(str::to_string),
            disease_id: disease.map(str::to_string),
            is_vector,
            limit: Some(200),
            ..Default::default()
        };
        let narrowed = species_count(&catalog, &full);

        let relaxed = [
            SpeciesQuery { term: None, ..full.clone() },
            SpeciesQuery { region_id: None, ..full.clone() },
            SpeciesQuery { disease_id: None, ..full.clone() },
            SpeciesQuery { is_vector: None, ..full.clone() },
        ];
        for query in &relaxed {
            prop_assert!(species_count(&catalog, query) >= narrowed);
        }
    });
}

#[test]
fn test_page_walk_covers_result_set() {
    let env = TestEnvironment::new().unwrap();
    let catalog = memory_catalog(&env, Arc::new(UnavailablePredictor));

    let all: Vec<String> = catalog
        .query()
        .search_species(&SpeciesQuery::default())
        .unwrap()
        .results
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(all.len(), fixtures::species().len());

    for limit in 1..=6 {
        let mut seen = Vec::new();
        let mut offset = 0i64;
        loop {
            let page = catalog
                .query()
                .search_species(&SpeciesQuery {
                    limit: Some(limit),
                    offset: Some(offset),
                    ..Default::default()
                })
                .unwrap();
            assert_eq!(page.count, all.len());
            seen.extend(page.results.into_iter().map(|s| s.id));
            match page.next {
                Some(cursor) => offset = cursor.offset as i64,
                None => break,
            }
        }
        assert_eq!(seen, all, "limit {}", limit);
    }
}

#[test]
fn test_term_with_empty_region_is_empty() {
    let env = TestEnvironment::new().unwrap();
    let catalog = memory_catalog(&env, Arc::new(UnavailablePredictor));

    let page = catalog
        .query()
        .search_species(&SpeciesQuery {
            term: Some("aedes".to_string()),
            region_id: Some("antarctica".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(page.count, 0);
    assert!(page.results.is_empty());
    assert!(page.next.is_none());

    let aedes = catalog
        .query()
        .search_species(&SpeciesQuery {
            term: Some("aedes".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(aedes.count, 2);
}

#[test]
fn test_region_boundaries_are_inclusive() {
    let env = TestEnvironment::new().unwrap();
    let catalog = memory_catalog(&env, Arc::new(UnavailablePredictor));
    let geo = catalog.geo();

    assert_eq!(geo.regions_containing(NYC.0, NYC.1).unwrap(), vec!["new-york"]);
    // Edge and vertex of the New York rectangle
    assert_eq!(geo.regions_containing(40.5, -74.0).unwrap(), vec!["new-york"]);
    assert_eq!(geo.regions_containing(40.95, -73.7).unwrap(), vec!["new-york"]);
    // Inside the hole of West Africa
    assert!(geo.regions_containing(7.5, -0.25).unwrap().is_empty());
    // Mid Pacific
    assert!(geo.regions_containing(0.0, -140.0).unwrap().is_empty());
    // Either side of the antimeridian
    assert_eq!(geo.regions_containing(-17.0, 179.0).unwrap(), vec!["fiji"]);
    assert_eq!(geo.regions_containing(-17.0, -179.0).unwrap(), vec!["fiji"]);
}

#[tokio::test]
async fn test_confident_prediction_is_stored() {
    init_test_logging();
    let env = TestEnvironment::new().unwrap();
    let predictor = Arc::new(StaticPredictor::new("aedes-aegypti", 0.9));
    let catalog = memory_catalog(&env, predictor.clone());

    let outcome = catalog.pipeline().submit(nyc_upload()).await.unwrap();
    let observation = &outcome.observation;
    assert!(!outcome.is_partial());
    assert_eq!(observation.species_id.as_deref(), Some("aedes-aegypti"));
    assert_eq!(observation.confidence, Some(0.9));
    assert!(!observation.needs_review);
    assert_eq!(observation.region_ids, vec!["new-york"]);
    assert_eq!(predictor.call_count(), 1);

    let dir = env.images_dir().join(&observation.id);
    assert!(dir.join("original.jpg").exists());
    assert!(dir.join("224x224.jpg").exists());
    assert!(dir.join("100x100.jpg").exists());

    let thumb = image::open(dir.join("100x100.jpg")).unwrap();
    assert_eq!((thumb.width(), thumb.height()), (100, 100));
}

#[tokio::test]
async fn test_low_confidence_prediction_needs_review() {
    let env = TestEnvironment::new().unwrap();
    let catalog = memory_catalog(&env, Arc::new(StaticPredictor::new("aedes-aegypti", 0.3)));

    let outcome = catalog.pipeline().submit(nyc_upload()).await.unwrap();
    assert!(outcome.is_partial());
    assert_eq!(outcome.observation.species_id, None);
    assert!(outcome.observation.needs_review);
    assert_eq!(
        outcome.observation.prediction_status,
        PredictionStatus::BelowThreshold
    );
    assert_eq!(env.observation_dirs().unwrap().len(), 1);

    let pending = catalog
        .pipeline()
        .list_observations(&ObservationQuery {
            needs_review: Some(true),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(pending.count, 1);
}

#[tokio::test]
async fn test_predictor_outages_are_absorbed() {
    let env = TestEnvironment::with_config(TestConfig {
        predictor_timeout_ms: 50,
        ..Default::default()
    })
    .unwrap();

    let failing = Arc::new(FailingPredictor::new());
    let catalog = memory_catalog(&env, failing.clone());
    let outcome = catalog.pipeline().submit(nyc_upload()).await.unwrap();
    assert!(outcome.is_partial());
    assert!(matches!(
        outcome.observation.prediction_status,
        PredictionStatus::Unavailable { .. }
    ));
    assert_eq!(failing.call_count(), 1);

    let slow = Arc::new(SlowPredictor::new(Duration::from_secs(10), "aedes-aegypti", 0.99));
    let catalog = memory_catalog(&env, slow);
    let outcome = catalog.pipeline().submit(nyc_upload()).await.unwrap();
    assert_eq!(
        outcome.observation.prediction_status,
        PredictionStatus::TimedOut { after_ms: 50 }
    );
}

#[tokio::test]
async fn test_store_failure_removes_artifacts() {
    let env = TestEnvironment::new().unwrap();
    let store = Arc::new(FailingTableStore::new());
    let gateway = Gateway::new(store.clone());
    fixtures::seed_gateway(&gateway).unwrap();
    gateway.ensure_table(table_names::OBSERVATIONS).unwrap();

    let catalog = Catalog::with_parts(
        env.catalog_config(),
        gateway,
        Arc::new(StaticPredictor::new("aedes-aegypti", 0.9)),
    )
    .unwrap();
    catalog.load().unwrap();

    store.fail_writes_to(table_names::OBSERVATIONS);
    let err = catalog.pipeline().submit(nyc_upload()).await.unwrap_err();
    assert!(matches!(err, CatalogError::StoreUnavailable(_)));
    assert!(err.is_retryable());
    assert_eq!(store.rejected_writes(), 1);
    assert!(env.observation_dirs().unwrap().is_empty());

    store.heal();
    catalog.pipeline().submit(nyc_upload()).await.unwrap();
    assert_eq!(env.observation_dirs().unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_submissions_are_independent() {
    let env = TestEnvironment::new().unwrap();
    let catalog = Arc::new(memory_catalog(
        &env,
        Arc::new(StaticPredictor::new("culex-pipiens", 0.95)),
    ));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let catalog = Arc::clone(&catalog);
        handles.push(tokio::spawn(async move {
            catalog.pipeline().submit(nyc_upload()).await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().observation.id);
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);

    let stored = catalog
        .pipeline()
        .list_observations(&ObservationQuery {
            species_id: Some("culex-pipiens".to_string()),
            limit: Some(100),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(stored.count, 8);
}

#[tokio::test]
async fn test_bbox_queries() {
    let env = TestEnvironment::new().unwrap();
    let catalog = memory_catalog(&env, Arc::new(StaticPredictor::new("aedes-aegypti", 0.9)));

    // Rejected before the observations table exists
    let inverted = BoundingBox {
        min_lat: 41.0,
        min_lon: -75.0,
        max_lat: 40.0,
        max_lon: -73.0,
    };
    assert!(matches!(
        catalog.geo().observations_in_bbox(&inverted),
        Err(CatalogError::Validation(_))
    ));
    assert!(!catalog.gateway().has_table(table_names::OBSERVATIONS));

    let stored = catalog.pipeline().submit(nyc_upload()).await.unwrap().observation;

    let nyc = BoundingBox::new(40.0, -75.0, 41.0, -73.0).unwrap();
    let found = catalog.geo().observations_in_bbox(&nyc).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, stored.id);

    // Box edge exactly on the observation
    let edge = BoundingBox::new(NYC.0, NYC.1, 41.0, -73.0).unwrap();
    assert_eq!(catalog.geo().observations_in_bbox(&edge).unwrap().len(), 1);

    let far = BoundingBox::new(-10.0, 100.0, 10.0, 120.0).unwrap();
    assert!(catalog.geo().observations_in_bbox(&far).unwrap().is_empty());

    let in_region = catalog.geo().observations_in_region("new-york", None).unwrap();
    assert_eq!(in_region.len(), 1);
    assert!(catalog
        .geo()
        .observations_in_region("west-africa", None)
        .unwrap()
        .is_empty());
}
