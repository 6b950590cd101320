#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use phenomatch::Settings;
use tempfile::TempDir;

/// Temporary workspace with its own database directory.
pub struct TestProject {
    pub dir: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn add_file(&self, path: &str, content: &str) -> PathBuf {
        let file_path = self.dir.path().join(path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(&file_path, content).expect("Failed to write file");
        file_path
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("db")
    }

    /// Default settings rooted in this project.
    pub fn settings(&self) -> Settings {
        Settings {
            db_path: self.db_path(),
            workspace_root: Some(self.dir.path().to_path_buf()),
            ..Settings::default()
        }
    }

    /// Writes a JSON-lines embedding file from `(id, vector)` pairs.
    pub fn add_embeddings(&self, path: &str, entries: &[(&str, &[f32])]) -> PathBuf {
        let content: String = entries
            .iter()
            .map(|(id, vector)| {
                let line = serde_json::json!({
                    "id": id,
                    "embedding": vector,
                    "metadata": { "original_id": id, "label": format!("label of {id}") },
                });
                format!("{line}\n")
            })
            .collect();
        self.add_file(path, &content)
    }

    /// Writes a tab-delimited annotation file with a comment block and header.
    pub fn add_annotations(&self, path: &str, rows: &[(&str, &str)]) -> PathBuf {
        let mut content = String::from(
            "#description: \"test annotations\"\n\
             database_id\tdisease_name\tqualifier\thpo_id\treference\n",
        );
        for (disease, phenotype) in rows {
            content.push_str(&format!("{disease}\tname\t\t{phenotype}\tPMID:1\n"));
        }
        self.add_file(path, &content)
    }
}

/// Small fixture: three orthogonal-ish phenotype axes and three diseases.
pub const EMBEDDINGS: &[(&str, &[f32])] = &[
    ("HP:0001250", &[1.0, 0.0, 0.0]),
    ("HP:0001263", &[0.0, 1.0, 0.0]),
    ("HP:0000478", &[0.0, 0.0, 1.0]),
    ("HP:0000118", &[1.0, 1.0, 0.0]),
];

pub const ANNOTATIONS: &[(&str, &str)] = &[
    ("OMIM:100", "HP:0001250"),
    ("OMIM:100", "HP:0001263"),
    ("OMIM:200", "HP:0000478"),
    ("OMIM:300", "HP:0001250"),
    ("OMIM:400", "HP:9999999"),
];
