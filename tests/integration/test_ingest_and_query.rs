//! Import, ingest and query against an on-disk database.

use std::num::NonZeroUsize;

use phenomatch::ingest::{import_embeddings, load_cache};
use phenomatch::{
    DistanceMetric, Pipeline, QueryOutcome, QueryService, ReadOnlyStore, VectorDatabase,
};

use crate::common::{ANNOTATIONS, EMBEDDINGS, TestProject};

fn ingested_project() -> TestProject {
    let project = TestProject::new();
    let embeddings = project.add_embeddings("hp.jsonl", EMBEDDINGS);
    let annotations = project.add_annotations("phenotype.hpoa", ANNOTATIONS);
    let settings = project.settings();

    let mut database = VectorDatabase::open(project.db_path()).unwrap();
    let collection = database
        .get_or_create_collection(&settings.collections.embeddings, DistanceMetric::Cosine)
        .unwrap();
    let stats = import_embeddings(&embeddings, collection).unwrap();
    assert_eq!(stats.imported, EMBEDDINGS.len());
    database.persist(&settings.collections.embeddings).unwrap();

    let report = Pipeline::new(&settings, &mut database)
        .ingest(Some(&annotations))
        .unwrap();
    assert_eq!(report.build.committed, 3);
    assert_eq!(report.build.skipped_empty, 1);
    assert!(report.build.is_clean());

    project
}

#[test]
fn test_query_ranks_exact_disease_first() {
    let project = ingested_project();
    let settings = project.settings();

    // Reopen from disk so the query sees only persisted state
    let database = VectorDatabase::open(project.db_path()).unwrap();
    let cache = load_cache(&database, &settings).unwrap();
    let diseases = database
        .get_collection(&settings.collections.disease_embeddings)
        .unwrap();
    let store = ReadOnlyStore::new(diseases);

    let outcome = QueryService::new(&cache, &store)
        .query(&["HP:0001250", "HP:0001263"], NonZeroUsize::new(3).unwrap())
        .unwrap();

    let ranked = outcome.neighbors();
    assert_eq!(ranked.len(), 3);
    assert_eq!(ranked[0].id.as_str(), "OMIM:100");
    assert!(ranked[0].distance.abs() < 1e-6);
    assert_eq!(ranked[1].id.as_str(), "OMIM:300");
    assert_eq!(ranked[2].id.as_str(), "OMIM:200");
    assert!(ranked.windows(2).all(|w| w[0].distance <= w[1].distance));
}

#[test]
fn test_query_with_unknown_terms_is_no_match() {
    let project = ingested_project();
    let settings = project.settings();

    let database = VectorDatabase::open(project.db_path()).unwrap();
    let cache = load_cache(&database, &settings).unwrap();
    let store = ReadOnlyStore::new(
        database
            .get_collection(&settings.collections.disease_embeddings)
            .unwrap(),
    );

    let outcome = QueryService::new(&cache, &store)
        .query(&["HP:9999999", "hp:0001250"], NonZeroUsize::new(5).unwrap())
        .unwrap();
    assert_eq!(outcome, QueryOutcome::NoMatch);
}

#[test]
fn test_ingest_twice_keeps_identical_vectors() {
    let project = ingested_project();
    let settings = project.settings();
    let annotations = project.path().join("phenotype.hpoa");

    let snapshot = |database: &VectorDatabase| {
        database
            .get_collection(&settings.collections.disease_embeddings)
            .unwrap()
            .iter()
            .map(|(id, entry)| (id.to_string(), entry.vector.clone()))
            .collect::<Vec<_>>()
    };

    let mut database = VectorDatabase::open(project.db_path()).unwrap();
    let before = snapshot(&database);
    Pipeline::new(&settings, &mut database)
        .ingest(Some(&annotations))
        .unwrap();
    let after = snapshot(&database);

    assert_eq!(before, after);
    assert_eq!(after.len(), 3);
}

#[test]
fn test_explain_after_ingest() {
    let project = ingested_project();
    let settings = project.settings();
    let annotations = project.path().join("phenotype.hpoa");

    let database = VectorDatabase::open(project.db_path()).unwrap();
    let cache = load_cache(&database, &settings).unwrap();
    let index =
        phenomatch::ingest::load_annotations(&database, &settings, Some(&annotations)).unwrap();
    let store = ReadOnlyStore::new(
        database
            .get_collection(&settings.collections.disease_embeddings)
            .unwrap(),
    );

    let rows = QueryService::new(&cache, &store)
        .explain(&"OMIM:100".into(), &index)
        .unwrap();
    assert_eq!(rows.len(), 2);
    for row in &rows {
        let similarity = row.similarity.unwrap();
        assert!((similarity - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-5);
        assert!(row.label.as_deref().unwrap().starts_with("label of"));
    }
}
