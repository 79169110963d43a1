use crate::env::SourceEnv;
use crate::error::Error;
use crate::loader::{DEFAULT_PATH, EnvFileLoader};
use crate::model::Entry;

use super::diagnostics::Diagnostics;
use super::schema::{Attribute, DescriptionKind, Schema, ValueType};
use super::value::Value;

/// A read-only data source served by the provider.
///
/// Implementations are stateless: everything a read needs arrives in the
/// request and everything it produces goes back in the returned value.
pub trait DataSource: Send + Sync {
    /// Appended to the provider name to form the type name, e.g. `file`.
    fn type_suffix(&self) -> &'static str;

    fn schema(&self) -> Schema;

    fn validate(&self, config: &Value) -> Diagnostics;

    fn read(&self, config: &Value) -> ReadResult;
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReadResult {
    /// New state, absent when the read failed outright.
    pub state: Option<Value>,
    pub diagnostics: Diagnostics,
}

impl ReadResult {
    fn failed(diagnostics: Diagnostics) -> Self {
        Self {
            state: None,
            diagnostics,
        }
    }
}

/// `env_file`: reads a dotenv file into a sensitive string map.
#[derive(Debug, Clone, Default)]
pub struct FileDataSource {
    /// Resolves `$NAME` references the file does not define itself.
    env: SourceEnv,
}

impl FileDataSource {
    pub fn new(env: SourceEnv) -> Self {
        Self { env }
    }
}

/// Configuration of one `env_file` read.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileConfig {
    pub path: Option<String>,
    pub required: Option<bool>,
}

impl FileConfig {
    pub fn from_value(config: &Value) -> Result<Self, Diagnostics> {
        let diagnostics = check_config(config);
        if diagnostics.has_error() {
            return Err(diagnostics);
        }

        let mut diagnostics = Diagnostics::default();
        for name in ["path", "required"] {
            if attribute(config, name).is_unknown() {
                diagnostics.attribute_error(
                    name,
                    "Unknown Configuration Value",
                    format!("The value of {name:?} is not known yet."),
                );
            }
        }
        if diagnostics.has_error() {
            return Err(diagnostics);
        }

        Ok(Self {
            path: attribute(config, "path").as_str().map(str::to_owned),
            required: attribute(config, "required").as_bool(),
        })
    }
}

/// State written back after a read.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FileState {
    path: String,
    required: bool,
    result: Vec<Entry>,
}

impl FileState {
    fn into_value(self) -> Value {
        Value::object([
            ("path", Value::String(self.path)),
            ("required", Value::Bool(self.required)),
            (
                "result",
                Value::Map(
                    self.result
                        .into_iter()
                        .map(|entry| (entry.key, Value::String(entry.value)))
                        .collect(),
                ),
            ),
        ])
    }
}

static NULL: Value = Value::Null;

fn attribute<'a>(config: &'a Value, name: &str) -> &'a Value {
    config.get(name).unwrap_or(&NULL)
}

/// Type checks that hold whether or not values are known yet.
fn check_config(config: &Value) -> Diagnostics {
    let mut diagnostics = Diagnostics::default();
    if !matches!(config, Value::Map(_)) {
        diagnostics.error(
            "Invalid Configuration",
            "The data source configuration must be an object.",
        );
        return diagnostics;
    }

    match attribute(config, "path") {
        Value::Null | Value::Unknown | Value::String(_) => {}
        _ => diagnostics.attribute_error("path", "Invalid Attribute Type", "Expected a string."),
    }
    match attribute(config, "required") {
        Value::Null | Value::Unknown | Value::Bool(_) => {}
        _ => diagnostics.attribute_error("required", "Invalid Attribute Type", "Expected a bool."),
    }
    diagnostics
}

impl DataSource for FileDataSource {
    fn type_suffix(&self) -> &'static str {
        "file"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with_description(
                "Use this data source to read environment variables from a file.",
                DescriptionKind::Markdown,
            )
            .with_attribute(
                Attribute::optional_computed("path", ValueType::String).markdown(
                    "Path to the file with the environment variables. Defaults to `.env`.",
                ),
            )
            .with_attribute(
                Attribute::optional_computed("required", ValueType::Bool).markdown(
                    "Whether the file is required. When `false`, a missing file produces \
                     a warning and an empty result instead of an error.",
                ),
            )
            .with_attribute(
                Attribute::computed("result", ValueType::map_of(ValueType::String))
                    .sensitive()
                    .markdown("The environment variables read from the file."),
            )
    }

    fn validate(&self, config: &Value) -> Diagnostics {
        check_config(config)
    }

    fn read(&self, config: &Value) -> ReadResult {
        let config = match FileConfig::from_value(config) {
            Ok(config) => config,
            Err(diagnostics) => return ReadResult::failed(diagnostics),
        };
        read_file(config, &self.env)
    }
}

fn read_file(config: FileConfig, env: &SourceEnv) -> ReadResult {
    let mut diagnostics = Diagnostics::default();

    let path = match config.path.filter(|path| !path.is_empty()) {
        Some(path) => path,
        None => {
            tracing::warn!(default = DEFAULT_PATH, "path not set, using default");
            diagnostics.attribute_warning(
                "path",
                "Path Not Set",
                format!("No path configured, reading {DEFAULT_PATH:?}."),
            );
            DEFAULT_PATH.to_owned()
        }
    };
    let required = config.required.unwrap_or(false);

    let loaded = EnvFileLoader::new()
        .path(&path)
        .required(required)
        .env(env.clone())
        .load();
    let result = match loaded {
        Ok(file) if !file.found => {
            tracing::warn!(%path, "dotenv file not found, returning empty result");
            diagnostics.attribute_warning(
                "path",
                "File Not Found",
                format!("File {path:?} not found, returning empty result"),
            );
            Vec::new()
        }
        Ok(file) => file.entries,
        Err(Error::NotFound { .. }) => {
            diagnostics.attribute_error(
                "path",
                "File Not Found",
                format!("File {path:?} not found"),
            );
            Vec::new()
        }
        Err(err @ Error::Io { .. }) => {
            diagnostics.error("Failed To Open File", err.to_string());
            return ReadResult::failed(diagnostics);
        }
        Err(err) => {
            diagnostics.error("Failed To Parse File", err.to_string());
            return ReadResult::failed(diagnostics);
        }
    };

    let state = FileState {
        path,
        required,
        result,
    };
    ReadResult {
        state: Some(state.into_value()),
        diagnostics,
    }
}
