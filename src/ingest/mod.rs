//! Loading sources into the vector database and building disease vectors.

pub mod import;
pub mod pipeline;

pub use import::{
    ImportStats, import_annotations_file, import_embeddings, import_embeddings_from_reader,
};
pub use pipeline::{IngestReport, PHENOTYPE_TAG, Pipeline, load_annotations, load_cache};
