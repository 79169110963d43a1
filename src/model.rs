use std::collections::BTreeMap;
use std::path::PathBuf;

/// A parsed `KEY=VALUE` entry from a `.env` file or input buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub value: String,
    pub line: u32,
}

/// The outcome of reading one dotenv file for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvFile {
    pub path: PathBuf,
    pub required: bool,
    /// `false` only when the file was missing and not required.
    pub found: bool,
    /// Unique keys in first-seen order, holding the last assigned value.
    pub entries: Vec<Entry>,
}

impl EnvFile {
    pub(crate) fn missing(path: PathBuf) -> Self {
        Self {
            path,
            required: false,
            found: false,
            entries: Vec::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|entry| (entry.key.clone(), entry.value.clone()))
            .collect()
    }
}

/// A single environment variable lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvLookup {
    pub name: String,
    pub required: bool,
    /// Empty when the variable is unset.
    pub value: String,
    pub present: bool,
}
