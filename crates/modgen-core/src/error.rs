//! Error types for modgen

use crate::location::Location;
use std::path::PathBuf;
use thiserror::Error;

/// modgen error type
///
/// Every variant is fatal for the whole run: the pipeline never hands a
/// partial translation unit to the synthesizer and never leaves a partially
/// generated module behind.
#[derive(Error, Debug)]
pub enum Error {
    /// The external preprocessor is missing, failed, or the input is unreadable
    #[error("Preprocessing failed: {message}{}", format_stderr(.stderr))]
    Preprocess { message: String, stderr: String },

    /// The syntax tree contains an error or missing node
    #[error("{location}: syntax error near `{snippet}`")]
    Syntax { location: Location, snippet: String },

    /// A function-typed node could not be reduced to a signature
    #[error("{location}: malformed declaration: {reason}")]
    MalformedDeclaration { location: Location, reason: String },

    /// A declaration form the extractor does not model
    #[error("{location}: unsupported construct: {construct}")]
    UnsupportedConstruct { location: Location, construct: String },

    /// Two occurrences of the same function with incompatible signatures
    #[error("conflicting declarations of `{name}`: `{first}` vs `{second}`")]
    ConflictingDeclaration {
        name: String,
        first: String,
        second: String,
    },

    /// A generated file would overwrite a file this tool did not produce
    #[error("Refusing to overwrite {}: not generated by modgen", .path.display())]
    OutputConflict { path: PathBuf },

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Wrap an IO error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

fn format_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\n{}", trimmed)
    }
}

/// Result type alias for modgen
pub type Result<T> = std::result::Result<T, Error>;
