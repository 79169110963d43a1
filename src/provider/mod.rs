//! The `env` provider: its identity, schema and the data sources and
//! functions it serves, independent of the wire protocol.

pub mod data_source;
pub mod diagnostics;
pub mod function;
pub mod schema;
pub mod value;

use crate::env::SourceEnv;

use data_source::{DataSource, FileDataSource, ReadResult};
use diagnostics::{Diagnostics, FunctionError};
use function::{Function, GetenvFunction};
use schema::{DescriptionKind, Schema};
use value::Value;

/// Short name used in type names and `provider::env::` function calls.
pub const PROVIDER_NAME: &str = "env";

/// Registry address, as used in `TF_REATTACH_PROVIDERS`.
pub const PROVIDER_ADDRESS: &str = "registry.terraform.io/marcozac/env";

pub struct EnvProvider {
    data_sources: Vec<Box<dyn DataSource>>,
    functions: Vec<Box<dyn Function>>,
}

impl Default for EnvProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EnvProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvProvider")
            .field("data_sources", &self.data_source_names().collect::<Vec<_>>())
            .field(
                "functions",
                &self.functions().map(|function| function.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl EnvProvider {
    /// Provider reading the process environment.
    pub fn new() -> Self {
        Self::with_env(SourceEnv::process())
    }

    /// Provider whose `getenv` and dotenv expansion read from `env`.
    pub fn with_env(env: SourceEnv) -> Self {
        Self {
            data_sources: vec![Box::new(FileDataSource::new(env.clone()))],
            functions: vec![Box::new(GetenvFunction::new(env))],
        }
    }

    pub fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    /// The provider block takes no configuration.
    pub fn schema(&self) -> Schema {
        Schema::new().with_description(
            "A provider for interacting with environment variables.",
            DescriptionKind::Plain,
        )
    }

    pub fn validate_config(&self, _config: &Value) -> Diagnostics {
        Diagnostics::default()
    }

    pub fn configure(&self, terraform_version: &str, _config: &Value) -> Diagnostics {
        tracing::debug!(terraform_version, "configuring provider");
        Diagnostics::default()
    }

    /// Full type name of a data source, e.g. `env_file`.
    pub fn type_name(&self, data_source: &dyn DataSource) -> String {
        format!("{PROVIDER_NAME}_{}", data_source.type_suffix())
    }

    pub fn data_source_names(&self) -> impl Iterator<Item = String> + '_ {
        self.data_sources
            .iter()
            .map(|data_source| self.type_name(data_source.as_ref()))
    }

    pub fn data_sources(&self) -> impl Iterator<Item = (String, &dyn DataSource)> + '_ {
        self.data_sources
            .iter()
            .map(|data_source| (self.type_name(data_source.as_ref()), data_source.as_ref()))
    }

    pub fn data_source(&self, type_name: &str) -> Option<&dyn DataSource> {
        self.data_sources()
            .find(|(name, _)| name == type_name)
            .map(|(_, data_source)| data_source)
    }

    pub fn functions(&self) -> impl Iterator<Item = &dyn Function> + '_ {
        self.functions.iter().map(|function| function.as_ref())
    }

    pub fn function(&self, name: &str) -> Option<&dyn Function> {
        self.functions().find(|function| function.name() == name)
    }

    pub fn validate_data_source(&self, type_name: &str, config: &Value) -> Diagnostics {
        match self.data_source(type_name) {
            Some(data_source) => data_source.validate(config),
            None => unknown_data_source(type_name),
        }
    }

    pub fn read_data_source(&self, type_name: &str, config: &Value) -> ReadResult {
        match self.data_source(type_name) {
            Some(data_source) => data_source.read(config),
            None => ReadResult {
                state: None,
                diagnostics: unknown_data_source(type_name),
            },
        }
    }

    pub fn call_function(&self, name: &str, arguments: &[Value]) -> Result<Value, FunctionError> {
        let function = self
            .function(name)
            .ok_or_else(|| FunctionError::new(format!("Function {name:?} not found")))?;
        function.call(arguments)
    }
}

fn unknown_data_source(type_name: &str) -> Diagnostics {
    let mut diagnostics = Diagnostics::default();
    diagnostics.error(
        "Data Source Type Not Found",
        format!("No data source named {type_name:?} is configured in the provider."),
    );
    diagnostics
}
