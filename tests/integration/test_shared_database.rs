//! Concurrent readers over a shared database.

use std::num::NonZeroUsize;
use std::thread;

use phenomatch::ingest::{import_embeddings, load_cache};
use phenomatch::{
    DistanceMetric, Pipeline, QueryService, ReadOnlyStore, SharedVectorDatabase, VectorDatabase,
};

use crate::common::{ANNOTATIONS, EMBEDDINGS, TestProject};

#[test]
fn test_parallel_queries_agree() {
    let project = TestProject::new();
    let embeddings = project.add_embeddings("hp.jsonl", EMBEDDINGS);
    let annotations = project.add_annotations("phenotype.hpoa", ANNOTATIONS);
    let settings = project.settings();

    let mut database = VectorDatabase::open(project.db_path()).unwrap();
    import_embeddings(
        &embeddings,
        database
            .get_or_create_collection("ont_hp", DistanceMetric::Cosine)
            .unwrap(),
    )
    .unwrap();
    Pipeline::new(&settings, &mut database)
        .ingest(Some(&annotations))
        .unwrap();

    let shared = SharedVectorDatabase::new(database);
    let cache = load_cache(&shared.read(), &settings).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let shared = shared.clone();
            let cache = cache.clone();
            let collection = settings.collections.disease_embeddings.clone();
            thread::spawn(move || {
                let guard = shared.read();
                let store = ReadOnlyStore::new(guard.get_collection(&collection).unwrap());
                QueryService::new(&cache, &store)
                    .query(&["HP:0000478"], NonZeroUsize::new(2).unwrap())
                    .unwrap()
            })
        })
        .collect();

    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(outcomes.windows(2).all(|w| w[0] == w[1]));

    let ranked = outcomes[0].neighbors();
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].id.as_str(), "OMIM:200");
    // OMIM:100 and OMIM:300 are both orthogonal to the query; id breaks the tie
    assert_eq!(ranked[1].id.as_str(), "OMIM:100");
}
