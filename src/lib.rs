//! Terraform provider `env`.
//!
//! Serves two things over plugin protocol 6: the `getenv` function, which
//! reads a single environment variable, and the `env_file` data source, which
//! parses a dotenv file into a sensitive string map.
//!
//! The dotenv parser and loader are usable on their own through
//! [`parse_str`] and [`EnvFileLoader`]; nothing here writes to the process
//! environment.

pub mod config;
pub mod logging;
pub mod provider;
pub mod server;

mod env;
mod error;
mod loader;
mod model;
mod parser;

pub use config::ServeOptions;
pub use env::SourceEnv;
pub use error::{Error, ParseError, ParseErrorKind, ServeError};
pub use loader::{DEFAULT_PATH, EnvFileLoader, read_file};
pub use model::{Entry, EnvFile, EnvLookup};
pub use parser::{parse_bytes, parse_bytes_with_env, parse_str, parse_str_with_env};
pub use provider::EnvProvider;
pub use server::serve;
