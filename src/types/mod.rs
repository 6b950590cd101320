use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Identifier of a phenotype ontology term (e.g. `HP:0000118`).
///
/// Compared by exact string equality; no case folding or prefix normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhenotypeId(String);

/// Identifier of a disease record (e.g. `OMIM:619340`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiseaseId(String);

/// A single embedding as produced by the upstream model.
pub type EmbeddingVector = Vec<f32>;

macro_rules! string_id {
    ($name:ident) => {
        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(PhenotypeId);
string_id!(DiseaseId);

/// One (disease, phenotype) annotation pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnnotationRecord {
    pub disease: DiseaseId,
    pub phenotype: PhenotypeId,
}

impl AnnotationRecord {
    pub fn new(disease: impl Into<DiseaseId>, phenotype: impl Into<PhenotypeId>) -> Self {
        Self {
            disease: disease.into(),
            phenotype: phenotype.into(),
        }
    }
}
