//! Annotation loading from configured files and collections.

use phenomatch::config::AnnotationSource;
use phenomatch::ingest::{import_embeddings, load_annotations};
use phenomatch::vector::Metadata;
use phenomatch::{DistanceMetric, IngestError, Pipeline, PhenomatchError, VectorDatabase};

use crate::common::{ANNOTATIONS, EMBEDDINGS, TestProject};

fn annotation_metadata(disease: &str, phenotype: &str) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("disease".into(), disease.into());
    metadata.insert("phenotype".into(), phenotype.into());
    metadata
}

fn database_with_embeddings(project: &TestProject) -> VectorDatabase {
    let embeddings = project.add_embeddings("hp.jsonl", EMBEDDINGS);
    let mut database = VectorDatabase::open(project.db_path()).unwrap();
    let collection = database
        .get_or_create_collection("ont_hp", DistanceMetric::Cosine)
        .unwrap();
    import_embeddings(&embeddings, collection).unwrap();
    database
}

#[test]
fn test_configured_relative_path_resolves_against_workspace() {
    let project = TestProject::new();
    project.add_annotations("data/phenotype.hpoa", ANNOTATIONS);
    let database = database_with_embeddings(&project);

    let mut settings = project.settings();
    settings.annotations.path = Some("data/phenotype.hpoa".into());

    let index = load_annotations(&database, &settings, None).unwrap();
    assert_eq!(index.disease_count(), 4);
    assert_eq!(index.annotation_count(), 5);
}

#[test]
fn test_missing_file_source_is_an_error() {
    let project = TestProject::new();
    let mut database = database_with_embeddings(&project);
    let settings = project.settings();

    let err = Pipeline::new(&settings, &mut database)
        .ingest(None)
        .unwrap_err();
    assert!(matches!(
        err,
        PhenomatchError::Ingest(IngestError::MissingAnnotationSource)
    ));
}

#[test]
fn test_ingest_from_annotation_collection() {
    let project = TestProject::new();
    let mut database = database_with_embeddings(&project);
    {
        let annotations = database
            .get_or_create_collection("hpoa", DistanceMetric::Cosine)
            .unwrap();
        for (n, (disease, phenotype)) in ANNOTATIONS.iter().enumerate() {
            annotations
                .upsert(
                    &format!("row-{n}"),
                    vec![0.0, 0.0, 1.0],
                    annotation_metadata(disease, phenotype),
                )
                .unwrap();
        }
    }

    let mut settings = project.settings();
    settings.annotations.source = AnnotationSource::Collection;

    let report = Pipeline::new(&settings, &mut database).ingest(None).unwrap();
    assert_eq!(report.diseases, 4);
    assert_eq!(report.build.committed, 3);
    assert_eq!(report.build.skipped_empty, 1);

    let omim_300 = database
        .get_collection("DiseaseAvgEmbeddings")
        .unwrap()
        .get("OMIM:300")
        .unwrap();
    assert_eq!(omim_300.vector, vec![1.0, 0.0, 0.0]);
}

#[test]
fn test_missing_annotation_collection_is_not_empty_result() {
    let project = TestProject::new();
    let mut database = database_with_embeddings(&project);
    let mut settings = project.settings();
    settings.annotations.source = AnnotationSource::Collection;

    let err = Pipeline::new(&settings, &mut database)
        .ingest(None)
        .unwrap_err();
    assert_eq!(err.status_code(), "COLLECTION_NOT_FOUND");
}
