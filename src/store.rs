//! Durable question-to-query example storage.

use std::collections::BTreeMap;
use std::path::{ Path, PathBuf };
use serde_json::Value;
use log::{ info, warn };

use crate::error::Result;

/// Durable mapping from question text to its verified JSON query.
///
/// The full mapping is rewritten to disk on every mutation; a missing or
/// malformed file degrades to an empty store instead of failing the caller.
pub struct ExampleStore {
    path: PathBuf,
    examples: BTreeMap<String, Value>,
}

impl ExampleStore {
    /// Load the store from `path`. Never fails: any read or parse problem is
    /// logged and yields an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let examples = match std::fs::read_to_string(&path) {
            Ok(text) =>
                match serde_json::from_str::<BTreeMap<String, Value>>(&text) {
                    Ok(map) => {
                        info!("Loaded {} examples from {}", map.len(), path.display());
                        map
                    }
                    Err(e) => {
                        warn!(
                            "Invalid JSON in {}: {}. Starting with empty examples",
                            path.display(),
                            e
                        );
                        BTreeMap::new()
                    }
                }
            Err(_) => {
                info!("{} not found, starting with empty examples", path.display());
                BTreeMap::new()
            }
        };
        Self { path, examples }
    }

    /// Insert or overwrite the entry for `question`, then rewrite the full
    /// mapping to disk before returning.
    pub fn upsert(&mut self, question: &str, query: &Value) -> Result<()> {
        self.examples.insert(question.to_string(), query.clone());
        self.persist()
    }

    pub fn get(&self, question: &str) -> Option<&Value> {
        self.examples.get(question)
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn examples(&self) -> &BTreeMap<String, Value> {
        &self.examples
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&self.examples)?)?;
        Ok(())
    }
}
