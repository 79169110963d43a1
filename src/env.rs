use std::collections::BTreeMap;

use crate::error::Error;
use crate::model::EnvLookup;

/// Where environment variables are read from.
///
/// The provider only ever reads, so both variants are safe to share across
/// concurrent requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEnv {
    kind: SourceEnvKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SourceEnvKind {
    /// Read through [`std::env::var_os`] at lookup time.
    Process,
    /// Read from a fixed in-memory map.
    Memory(BTreeMap<String, String>),
}

impl Default for SourceEnv {
    fn default() -> Self {
        Self::process()
    }
}

impl SourceEnv {
    /// Read variables from the current process environment.
    pub fn process() -> Self {
        Self {
            kind: SourceEnvKind::Process,
        }
    }

    /// Read variables from an in-memory map instead of the process.
    pub fn from_memory(map: BTreeMap<String, String>) -> Self {
        Self {
            kind: SourceEnvKind::Memory(map),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::from_memory(
            pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    /// Value of `name`, or `None` when it is not set.
    ///
    /// Non-UTF-8 process values are converted lossily.
    pub fn var(&self, name: &str) -> Option<String> {
        match &self.kind {
            SourceEnvKind::Process => {
                std::env::var_os(name).map(|value| value.to_string_lossy().into_owned())
            }
            SourceEnvKind::Memory(map) => map.get(name).cloned(),
        }
    }

    /// Look up `name`, failing when it is required but unset or empty.
    pub fn lookup(&self, name: &str, required: bool) -> Result<EnvLookup, Error> {
        let found = self.var(name);
        let present = found.is_some();
        let value = found.unwrap_or_default();

        if required && value.is_empty() {
            return Err(Error::RequiredValueMissing {
                name: name.to_owned(),
            });
        }

        Ok(EnvLookup {
            name: name.to_owned(),
            required,
            value,
            present,
        })
    }
}
