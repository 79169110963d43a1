use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Errors produced while reading dotenv files or looking up variables.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("file {} not found", .path.display())]
    NotFound { path: PathBuf },
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("invalid UTF-8 input: {0}")]
    InvalidEncoding(#[from] std::str::Utf8Error),
    #[error("environment variable {name:?} not found")]
    RequiredValueMissing { name: String },
}

impl Error {
    pub(crate) fn from_io(path: PathBuf, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }

    /// Whether this is a missing-file error, the only one a caller may tolerate.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("parse error at line {line}, column {column}: {kind}")]
pub struct ParseError {
    pub line: u32,
    pub column: u32,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub(crate) fn new(line: u32, column: u32, kind: ParseErrorKind) -> Self {
        Self { line, column, kind }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    InvalidSyntax,
    MissingKey,
    InvalidKey,
    UnterminatedQuote,
}

impl Display for ParseErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSyntax => write!(f, "invalid syntax"),
            Self::MissingKey => write!(f, "missing key"),
            Self::InvalidKey => write!(f, "invalid key"),
            Self::UnterminatedQuote => write!(f, "unterminated quote"),
        }
    }
}

/// Failures that stop the plugin server from starting or serving.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error(
        "This binary is a plugin. These are not meant to be executed directly.\n\
         Please execute the program that consumes these plugins, which will\n\
         load any plugins automatically"
    )]
    NotLaunchedAsPlugin,
    #[error("no supported plugin protocol version in {offered:?}, expected 6")]
    UnsupportedProtocol { offered: String },
    #[error("invalid plugin port range {min}..={max}")]
    InvalidPortRange { min: u16, max: u16 },
    #[error("failed to bind plugin listener: {0}")]
    Bind(#[source] std::io::Error),
    #[error("failed to write handshake: {0}")]
    Handshake(#[source] std::io::Error),
    #[error("failed to generate server certificate: {0}")]
    Certificate(#[from] rcgen::Error),
    #[error(transparent)]
    Transport(#[from] tonic::transport::Error),
    #[error("failed to encode reattach configuration: {0}")]
    Reattach(#[from] serde_json::Error),
}
