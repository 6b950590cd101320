//! Layered configuration for phenomatch.
//!
//! Sources, lowest priority first:
//! - Default values
//! - `.phenomatch/settings.toml`, searched upward from the working directory
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `PHENO_` and use double
//! underscores to separate nested levels:
//! - `PHENO_DB_PATH=/data/vectors` sets `db_path`
//! - `PHENO_SEARCH__TOP_K=25` sets `search.top_k`
//! - `PHENO_COLLECTIONS__EMBEDDINGS=ont_hp_v2` sets `collections.embeddings`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::vector::DistanceMetric;

const CONFIG_DIR: &str = ".phenomatch";
const CONFIG_FILE: &str = "settings.toml";
const ENV_PREFIX: &str = "PHENO_";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Vector database directory, relative to the workspace root
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Workspace root directory (where .phenomatch is located)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    /// Global debug mode
    #[serde(default)]
    pub debug: bool,

    /// Collection names
    #[serde(default)]
    pub collections: CollectionsConfig,

    /// Query settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Where disease annotations come from
    #[serde(default)]
    pub annotations: AnnotationsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct CollectionsConfig {
    /// Phenotype embeddings, entries carry `original_id` metadata
    #[serde(default = "default_embeddings_collection")]
    pub embeddings: String,

    /// Annotation rows with `disease` and `phenotype` metadata
    #[serde(default = "default_annotations_collection")]
    pub annotations: String,

    /// Phenotype vectors keyed by term id, tagged `HP`
    #[serde(default = "default_phenotype_collection")]
    pub phenotype_embeddings: String,

    /// Averaged disease vectors, tagged `disease`
    #[serde(default = "default_disease_collection")]
    pub disease_embeddings: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SearchConfig {
    /// Distance metric for newly created collections
    #[serde(default)]
    pub metric: DistanceMetric,

    /// Default number of diseases returned by a query
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationSource {
    /// Tab-delimited HPOA-style file
    #[default]
    File,
    /// Collection named by `collections.annotations`
    Collection,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AnnotationsConfig {
    #[serde(default)]
    pub source: AnnotationSource,

    /// Annotation file used when `source = "file"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_version() -> u32 {
    1
}
fn default_db_path() -> PathBuf {
    PathBuf::from(".phenomatch/db")
}
fn default_embeddings_collection() -> String {
    "ont_hp".to_string()
}
fn default_annotations_collection() -> String {
    "hpoa".to_string()
}
fn default_phenotype_collection() -> String {
    "HPtoEmbeddings".to_string()
}
fn default_disease_collection() -> String {
    "DiseaseAvgEmbeddings".to_string()
}
fn default_top_k() -> usize {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            db_path: default_db_path(),
            workspace_root: None,
            debug: false,
            collections: CollectionsConfig::default(),
            search: SearchConfig::default(),
            annotations: AnnotationsConfig::default(),
        }
    }
}

impl Default for CollectionsConfig {
    fn default() -> Self {
        Self {
            embeddings: default_embeddings_collection(),
            annotations: default_annotations_collection(),
            phenotype_embeddings: default_phenotype_collection(),
            disease_embeddings: default_disease_collection(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            metric: DistanceMetric::default(),
            top_k: default_top_k(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));

        Self::figment(&config_path)
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                if settings.workspace_root.is_none() {
                    settings.workspace_root = Self::workspace_root();
                }
                settings
            })
    }

    /// Load configuration from a specific file
    ///
    /// Relative paths resolve against the directory holding the config
    /// directory, i.e. `<root>` for `<root>/.phenomatch/settings.toml`.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        let path = path.as_ref();
        Self::figment(path)
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                if settings.workspace_root.is_none() {
                    settings.workspace_root = path
                        .parent()
                        .and_then(Path::parent)
                        .filter(|root| !root.as_os_str().is_empty())
                        .map(Path::to_path_buf);
                }
                settings
            })
    }

    fn figment(config_path: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            // Double underscore separates nested levels, single underscore
            // stays part of the field name.
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
    }

    /// Find `.phenomatch/settings.toml` from the current directory upward
    fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Get the workspace root directory (where .phenomatch is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .find(|ancestor| ancestor.join(CONFIG_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Database directory, resolved against the workspace root when relative
    pub fn resolved_db_path(&self) -> PathBuf {
        match &self.workspace_root {
            Some(root) if self.db_path.is_relative() => root.join(&self.db_path),
            _ => self.db_path.clone(),
        }
    }

    /// Annotation file, resolved like [`Settings::resolved_db_path`]
    pub fn resolved_annotations_path(&self) -> Option<PathBuf> {
        let path = self.annotations.path.as_ref()?;
        Some(match &self.workspace_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.clone(),
        })
    }

    /// Check if configuration is properly initialized
    pub fn check_init() -> Result<(), String> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));

        if !config_path.exists() {
            return Err("No configuration file found".to_string());
        }

        match std::fs::read_to_string(&config_path) {
            Ok(content) => {
                if let Err(e) = toml::from_str::<Settings>(&content) {
                    return Err(format!(
                        "Configuration file is corrupted: {e}\nRun 'phenomatch init --force' to regenerate."
                    ));
                }
            }
            Err(e) => {
                return Err(format!("Cannot read configuration file: {e}"));
            }
        }

        Ok(())
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file with comments under `dir`
    pub fn init_config_file(
        dir: impl AsRef<Path>,
        force: bool,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = dir.as_ref().join(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let template = r#"# phenomatch configuration

# Version of the configuration schema
version = 1

# Vector database directory (relative to the workspace root)
db_path = ".phenomatch/db"

# Verbose logging
debug = false

[collections]
# Phenotype embeddings; entries need an "original_id" metadata field
embeddings = "ont_hp"

# Annotation rows with "disease" and "phenotype" metadata
# (used when annotations.source = "collection")
annotations = "hpoa"

# Written by 'phenomatch ingest'
phenotype_embeddings = "HPtoEmbeddings"
disease_embeddings = "DiseaseAvgEmbeddings"

[search]
# Distance metric for new collections: "cosine", "l2" or "ip"
metric = "cosine"

# Number of diseases returned by 'phenomatch query'
top_k = 10

[annotations]
# "file" (tab-delimited phenotype.hpoa) or "collection"
source = "file"

# path = "data/phenotype.hpoa"
"#;

        std::fs::write(&config_path, template)?;
        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.db_path, PathBuf::from(".phenomatch/db"));
        assert_eq!(settings.collections.embeddings, "ont_hp");
        assert_eq!(settings.collections.disease_embeddings, "DiseaseAvgEmbeddings");
        assert_eq!(settings.search.metric, DistanceMetric::Cosine);
        assert_eq!(settings.search.top_k, 10);
        assert_eq!(settings.annotations.source, AnnotationSource::File);
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let toml_content = r#"
version = 2
debug = true

[collections]
embeddings = "ont_hp_v2"

[search]
metric = "l2"
top_k = 3

[annotations]
source = "collection"
"#;
        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.version, 2);
        assert!(settings.debug);
        assert_eq!(settings.collections.embeddings, "ont_hp_v2");
        // Unset collection names keep their defaults
        assert_eq!(settings.collections.annotations, "hpoa");
        assert_eq!(settings.search.metric, DistanceMetric::L2);
        assert_eq!(settings.search.top_k, 3);
        assert_eq!(settings.annotations.source, AnnotationSource::Collection);
    }

    #[test]
    fn test_unknown_metric_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");
        fs::write(&config_path, "[search]\nmetric = \"manhattan\"\n").unwrap();

        assert!(Settings::load_from(&config_path).is_err());
    }

    #[test]
    fn test_save_settings() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("settings.toml");

        let mut settings = Settings::default();
        settings.search.top_k = 42;
        settings.annotations.path = Some(PathBuf::from("data/phenotype.hpoa"));

        settings.save(&config_path).unwrap();

        let loaded = Settings::load_from(&config_path).unwrap();
        assert_eq!(loaded.search.top_k, 42);
        assert_eq!(
            loaded.annotations.path,
            Some(PathBuf::from("data/phenotype.hpoa"))
        );
    }

    #[test]
    fn test_init_template_parses() {
        let temp_dir = TempDir::new().unwrap();
        let path = Settings::init_config_file(temp_dir.path(), false).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let parsed: Settings = toml::from_str(&content).unwrap();
        assert_eq!(parsed.collections, CollectionsConfig::default());

        assert!(Settings::init_config_file(temp_dir.path(), false).is_err());
        assert!(Settings::init_config_file(temp_dir.path(), true).is_ok());
    }

    #[test]
    fn test_resolved_paths() {
        let mut settings = Settings {
            workspace_root: Some(PathBuf::from("/work")),
            ..Default::default()
        };
        settings.annotations.path = Some(PathBuf::from("data/phenotype.hpoa"));
        assert_eq!(settings.resolved_db_path(), PathBuf::from("/work/.phenomatch/db"));
        assert_eq!(
            settings.resolved_annotations_path(),
            Some(PathBuf::from("/work/data/phenotype.hpoa"))
        );

        settings.db_path = PathBuf::from("/abs/db");
        assert_eq!(settings.resolved_db_path(), PathBuf::from("/abs/db"));
    }

    #[test]
    fn test_load_from_resolves_against_config_workspace() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = Settings::init_config_file(temp_dir.path(), false).unwrap();
        fs::write(
            &config_path,
            "db_path = \"store/db\"\n[annotations]\npath = \"data/phenotype.hpoa\"\n",
        )
        .unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.workspace_root.as_deref(), Some(temp_dir.path()));
        assert_eq!(settings.resolved_db_path(), temp_dir.path().join("store/db"));
        assert_eq!(
            settings.resolved_annotations_path(),
            Some(temp_dir.path().join("data/phenotype.hpoa"))
        );

        fs::write(&config_path, "workspace_root = \"/elsewhere\"\n").unwrap();
        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.workspace_root, Some(PathBuf::from("/elsewhere")));
    }

    #[test]
    fn test_layered_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_dir = temp_dir.path().join(CONFIG_DIR);
        fs::create_dir_all(&config_dir).unwrap();
        let config_path = config_dir.join(CONFIG_FILE);

        let toml_content = r#"
[collections]
phenotype_embeddings = "FromFile"

[search]
metric = "ip"
"#;
        fs::write(&config_path, toml_content).unwrap();

        // Environment variables override the config file
        unsafe {
            std::env::set_var("PHENO_COLLECTIONS__PHENOTYPE_EMBEDDINGS", "FromEnv");
            std::env::set_var("PHENO_COLLECTIONS__DISEASE_EMBEDDINGS", "Diseases2");
        }

        let settings = Settings::load_from(&config_path).unwrap();

        unsafe {
            std::env::remove_var("PHENO_COLLECTIONS__PHENOTYPE_EMBEDDINGS");
            std::env::remove_var("PHENO_COLLECTIONS__DISEASE_EMBEDDINGS");
        }

        assert_eq!(settings.collections.phenotype_embeddings, "FromEnv");
        assert_eq!(settings.collections.disease_embeddings, "Diseases2");
        // Config file value is used when no env var is set
        assert_eq!(settings.search.metric, DistanceMetric::Ip);
    }
}
