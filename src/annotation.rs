//! Disease to phenotype annotation index.
//!
//! Built once from raw annotation rows, either a delimited HPOA-style file or
//! a collection whose entries carry `disease`/`phenotype` metadata. Malformed
//! rows are skipped and counted; they never fail the build.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use tracing::{debug, info};

use crate::error::{IngestError, IngestResult};
use crate::types::{AnnotationRecord, DiseaseId, PhenotypeId};
use crate::vector::{Collection, metadata_str};

/// Minimum number of fields a delimited row must carry.
pub const MIN_FIELDS: usize = 4;

const DISEASE_FIELD: usize = 0;
const PHENOTYPE_FIELD: usize = 3;

/// Immutable mapping from disease to the set of its annotated phenotypes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationIndex {
    diseases: BTreeMap<DiseaseId, BTreeSet<PhenotypeId>>,
    skipped_rows: usize,
}

impl AnnotationIndex {
    /// Builds the index from well-formed records. Duplicate pairs collapse.
    pub fn from_records(records: impl IntoIterator<Item = AnnotationRecord>) -> Self {
        let mut builder = Builder::default();
        for record in records {
            builder.accept(record.disease, record.phenotype);
        }
        builder.finish()
    }

    /// Builds the index from raw field rows.
    ///
    /// Field 0 is the disease id and field 3 the phenotype id. Rows with
    /// fewer than [`MIN_FIELDS`] fields or a blank id are skipped.
    pub fn from_rows<I, R, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        let mut builder = Builder::default();
        for row in rows {
            let fields = row.as_ref();
            if fields.len() < MIN_FIELDS {
                debug!("Skipping annotation row with {} fields", fields.len());
                builder.skip();
                continue;
            }
            builder.accept_raw(
                fields[DISEASE_FIELD].as_ref(),
                fields[PHENOTYPE_FIELD].as_ref(),
            );
        }
        builder.finish()
    }

    /// Parses tab-delimited annotation text.
    ///
    /// Blank lines and `#` comment lines are ignored; the first remaining
    /// line is the header and is skipped.
    pub fn parse_delimited(text: &str) -> Self {
        let rows = text
            .lines()
            .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
            .skip(1)
            .map(|line| line.trim_end_matches('\r').split('\t').collect::<Vec<_>>());
        Self::from_rows(rows)
    }

    /// Reads and parses a delimited annotation file.
    pub fn from_file(path: impl AsRef<Path>) -> IngestResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| IngestError::SourceRead {
            path: path.to_path_buf(),
            source,
        })?;
        let index = Self::parse_delimited(&text);
        info!(
            "Loaded {} diseases ({} annotations, {} skipped rows) from {}",
            index.disease_count(),
            index.annotation_count(),
            index.skipped_rows(),
            path.display()
        );
        Ok(index)
    }

    /// Builds the index from a collection whose metadata carries
    /// `disease` and `phenotype` fields.
    pub fn from_collection(collection: &Collection) -> Self {
        let mut builder = Builder::default();
        for metadata in collection.scan().metadatas {
            match (
                metadata_str(metadata, "disease"),
                metadata_str(metadata, "phenotype"),
            ) {
                (Some(disease), Some(phenotype)) => {
                    builder.accept(DiseaseId::new(disease), PhenotypeId::new(phenotype));
                }
                _ => builder.skip(),
            }
        }
        let index = builder.finish();
        info!(
            "Loaded {} diseases ({} annotations, {} skipped entries) from collection '{}'",
            index.disease_count(),
            index.annotation_count(),
            index.skipped_rows(),
            collection.name()
        );
        index
    }

    pub fn phenotypes(&self, disease: &str) -> Option<&BTreeSet<PhenotypeId>> {
        self.diseases.get(disease)
    }

    /// Diseases in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (&DiseaseId, &BTreeSet<PhenotypeId>)> {
        self.diseases.iter()
    }

    pub fn disease_count(&self) -> usize {
        self.diseases.len()
    }

    /// Number of distinct (disease, phenotype) pairs.
    pub fn annotation_count(&self) -> usize {
        self.diseases.values().map(BTreeSet::len).sum()
    }

    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    pub fn is_empty(&self) -> bool {
        self.diseases.is_empty()
    }
}

#[derive(Default)]
struct Builder {
    diseases: BTreeMap<DiseaseId, BTreeSet<PhenotypeId>>,
    skipped_rows: usize,
}

impl Builder {
    fn accept_raw(&mut self, disease: &str, phenotype: &str) {
        if disease.trim().is_empty() || phenotype.trim().is_empty() {
            debug!("Skipping annotation row with blank disease or phenotype");
            self.skip();
            return;
        }
        self.accept(DiseaseId::from(disease), PhenotypeId::from(phenotype));
    }

    fn accept(&mut self, disease: DiseaseId, phenotype: PhenotypeId) {
        self.diseases.entry(disease).or_default().insert(phenotype);
    }

    fn skip(&mut self) {
        self.skipped_rows += 1;
    }

    fn finish(self) -> AnnotationIndex {
        AnnotationIndex {
            diseases: self.diseases,
            skipped_rows: self.skipped_rows,
        }
    }
}
