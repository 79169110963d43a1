use std::path::{Path, PathBuf};

use crate::env::SourceEnv;
use crate::error::Error;
use crate::model::EnvFile;
use crate::parser::parse_bytes_with_env;

/// File read when no path is configured.
pub const DEFAULT_PATH: &str = ".env";

/// Read a whole file, separating a missing file from other I/O failures.
pub fn read_file(path: impl AsRef<Path>) -> Result<Vec<u8>, Error> {
    let path = path.as_ref();
    std::fs::read(path).map_err(|err| Error::from_io(path.to_path_buf(), err))
}

/// Builder-style loader for a single dotenv file.
#[derive(Debug, Clone)]
pub struct EnvFileLoader {
    path: PathBuf,
    required: bool,
    env: SourceEnv,
}

impl Default for EnvFileLoader {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_PATH),
            required: false,
            env: SourceEnv::process(),
        }
    }
}

impl EnvFileLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = path.as_ref().to_path_buf();
        self
    }

    /// When `false`, a missing file yields an empty [`EnvFile`] instead of
    /// [`Error::NotFound`].
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Where `$NAME` references not defined earlier in the file resolve.
    /// Defaults to the process environment.
    pub fn env(mut self, env: SourceEnv) -> Self {
        self.env = env;
        self
    }

    pub fn load(&self) -> Result<EnvFile, Error> {
        let bytes = match read_file(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.is_not_found() && !self.required => {
                tracing::debug!(path = %self.path.display(), "optional dotenv file not found");
                return Ok(EnvFile::missing(self.path.clone()));
            }
            Err(err) => return Err(err),
        };

        let entries = parse_bytes_with_env(&bytes, &self.env)?;
        tracing::debug!(
            path = %self.path.display(),
            entries = entries.len(),
            "loaded dotenv file"
        );

        Ok(EnvFile {
            path: self.path.clone(),
            required: self.required,
            found: true,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseErrorKind;

    fn write_env(dir: &tempfile::TempDir, content: &str) -> PathBuf {
        let path = dir.path().join(".env");
        std::fs::write(&path, content).expect("failed to write test file");
        path
    }

    #[test]
    fn defaults_to_dotenv_in_working_directory() {
        let loader = EnvFileLoader::new();
        assert_eq!(loader.path, PathBuf::from(".env"));
        assert!(!loader.required);
    }

    #[test]
    fn loads_entries_in_file_order() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_env(&dir, "B=2\nA=1\n");

        let file = EnvFileLoader::new()
            .path(&path)
            .required(true)
            .load()
            .expect("load should succeed");

        assert!(file.found);
        assert!(file.required);
        assert_eq!(file.path, path);
        assert_eq!(file.len(), 2);
        assert_eq!(file.entries[0].key, "B");
        assert_eq!(file.get("A"), Some("1"));
    }

    #[test]
    fn missing_optional_file_is_empty() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("missing.env");

        let file = EnvFileLoader::new()
            .path(&missing)
            .load()
            .expect("load should succeed");

        assert!(!file.found);
        assert!(file.is_empty());
    }

    #[test]
    fn missing_required_file_is_not_found() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("missing.env");

        let err = EnvFileLoader::new()
            .path(&missing)
            .required(true)
            .load()
            .expect_err("expected not found");

        match err {
            Error::NotFound { path } => assert_eq!(path, missing),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn directory_is_an_io_error_even_when_optional() {
        let dir = tempfile::tempdir().expect("temp dir");

        let err = EnvFileLoader::new()
            .path(dir.path())
            .load()
            .expect_err("expected I/O error");

        assert!(matches!(err, Error::Io { .. }), "unexpected error: {err:?}");
    }

    #[test]
    fn malformed_file_returns_parse_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_env(&dir, "A=ok\nBAD LINE\n");

        let err = EnvFileLoader::new()
            .path(path)
            .load()
            .expect_err("expected parse error");

        match err {
            Error::Parse(parse_err) => {
                assert_eq!(parse_err.kind, ParseErrorKind::InvalidSyntax);
                assert_eq!(parse_err.line, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn expands_references_from_configured_env() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_env(&dir, "USER_NAME=$LOADER_USER\nGREETING=\"hi ${USER_NAME}\"\n");

        let file = EnvFileLoader::new()
            .path(path)
            .env(SourceEnv::from_pairs([("LOADER_USER", "ada")]))
            .load()
            .expect("load should succeed");

        assert_eq!(file.get("USER_NAME"), Some("ada"));
        assert_eq!(file.get("GREETING"), Some("hi ada"));
    }

    #[test]
    fn repeated_loads_are_identical() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_env(&dir, "A=1\nB=\"two\"\n");
        let loader = EnvFileLoader::new().path(path);

        let first = loader.load().expect("first load");
        let second = loader.load().expect("second load");
        assert_eq!(first, second);
    }
}
