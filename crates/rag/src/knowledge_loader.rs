//! Scheme knowledge loader
//!
//! Loads scheme corpora from YAML/JSON files. A corpus carries the records
//! used for primary searches, optional fresher records used for freshness
//! lookups, and the date the corpus was last refreshed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use udyami_core::SchemeRecord;

use crate::{RagError, Result};

/// Corpus bundled with the crate
const BUILTIN_CORPUS: &str = include_str!("../data/schemes.yaml");

/// Scheme corpus file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemeCorpus {
    /// Version for format compatibility
    #[serde(default)]
    pub version: Option<String>,
    /// When the records were last verified
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub schemes: Vec<SchemeRecord>,
    /// Recently revised or newly announced records
    #[serde(default)]
    pub updates: Vec<SchemeRecord>,
}

impl SchemeCorpus {
    pub fn len(&self) -> usize {
        self.schemes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemes.is_empty()
    }

    /// Fold another corpus in; the later refresh date wins
    pub fn extend(&mut self, other: SchemeCorpus) {
        self.schemes.extend(other.schemes);
        self.updates.extend(other.updates);
        self.updated_at = match (self.updated_at, other.updated_at) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        if self.version.is_none() {
            self.version = other.version;
        }
    }
}

/// Loader for scheme corpus files
pub struct KnowledgeLoader;

impl KnowledgeLoader {
    /// Seed corpus shipped with the crate
    pub fn builtin() -> Result<SchemeCorpus> {
        Self::from_yaml(BUILTIN_CORPUS)
    }

    pub fn from_yaml(content: &str) -> Result<SchemeCorpus> {
        serde_yaml::from_str(content).map_err(|e| RagError::Index(format!("YAML parse error: {}", e)))
    }

    pub fn from_json(content: &str) -> Result<SchemeCorpus> {
        serde_json::from_str(content).map_err(|e| RagError::Index(format!("JSON parse error: {}", e)))
    }

    /// Load a file, or every YAML/JSON file in a directory
    pub fn load(path: &Path) -> Result<SchemeCorpus> {
        if path.is_dir() {
            Self::load_directory(path)
        } else {
            Self::load_file(path)
        }
    }

    /// Load a single corpus file
    pub fn load_file(path: &Path) -> Result<SchemeCorpus> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RagError::Index(format!("Failed to read {}: {}", path.display(), e)))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let corpus = match extension {
            "json" => Self::from_json(&content)?,
            _ => Self::from_yaml(&content)?,
        };

        tracing::info!(
            file = %path.display(),
            schemes = corpus.schemes.len(),
            updates = corpus.updates.len(),
            "Loaded scheme corpus"
        );
        Ok(corpus)
    }

    /// Load and merge every YAML/JSON file in a directory
    ///
    /// Unreadable files are logged and skipped; a missing directory is an
    /// error.
    pub fn load_directory(dir: &Path) -> Result<SchemeCorpus> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| RagError::Index(format!("Failed to read directory {}: {}", dir.display(), e)))?;

        let mut paths: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| matches!(p.extension().and_then(|e| e.to_str()), Some("yaml" | "yml" | "json")))
            .collect();
        paths.sort();

        let mut corpus = SchemeCorpus::default();
        for path in paths {
            match Self::load_file(&path) {
                Ok(file) => corpus.extend(file),
                Err(e) => {
                    tracing::error!(file = %path.display(), error = %e, "Failed to load scheme corpus file");
                },
            }
        }

        tracing::info!(
            directory = %dir.display(),
            total_schemes = corpus.schemes.len(),
            "Scheme corpus loading complete"
        );
        Ok(corpus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use udyami_core::SchemeCategory;

    #[test]
    fn test_builtin_corpus_parses() {
        let corpus = KnowledgeLoader::builtin().unwrap();
        assert!(corpus.len() >= 10);
        assert!(corpus.updated_at.is_some());
        assert!(!corpus.updates.is_empty());
        let cgtmse = corpus.schemes.iter().find(|s| s.name == "CGTMSE").unwrap();
        assert_eq!(cgtmse.category, Some(SchemeCategory::CreditLinked));
        assert!(cgtmse.eligibility.collateral_free);
    }

    #[test]
    fn test_load_directory_merges_files() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.yaml"),
            "updated_at: \"2024-01-01T00:00:00Z\"\nschemes:\n  - name: Alpha\n    authority: State\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("b.json"),
            r#"{"updated_at": "2025-01-01T00:00:00Z", "schemes": [{"name": "Beta", "authority": "Centre"}]}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let corpus = KnowledgeLoader::load(dir.path()).unwrap();
        let names: Vec<_> = corpus.schemes.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta"]);
        assert_eq!(corpus.updated_at.unwrap().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_bad_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "schemes: [[[").unwrap();
        assert!(matches!(KnowledgeLoader::load_file(&path), Err(RagError::Index(_))));
        assert!(KnowledgeLoader::load(&dir.path().join("missing")).is_err());
    }
}
