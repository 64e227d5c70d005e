use std::{fmt, io};

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by configuration loading, the FASTQ codec, or the pipeline
/// coordinator. Each variant carries enough context to format a complete
/// message without re-reading external state.
#[derive(Debug)]
pub enum Error {
    /// A descriptor named an unknown operation, was missing a required key,
    /// or configured an invalid combination (e.g. more than one
    /// non-thread-safe operation).
    Config(String),
    /// Failure opening, reading, writing, or closing a file or child
    /// process. `path` is the offending file, when known.
    Io { path: Option<String>, source: io::Error },
    /// A FASTQ record ended before all four lines were read.
    TruncatedRecord { path: String },
    /// A secondary error observed while unwinding after a prior failure.
    /// Chains onto the original so neither is silently dropped.
    Chained { first: Box<Error>, then: Box<Error> },
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        Error::Io { path: Some(path.into()), source }
    }

    pub fn io_unpathed(source: io::Error) -> Self {
        Error::Io { path: None, source }
    }

    pub fn truncated(path: impl Into<String>) -> Self {
        Error::TruncatedRecord { path: path.into() }
    }

    /// Chains `then` onto `self` so a close-time error encountered while
    /// unwinding from an earlier error is reported, not discarded.
    pub fn chain(self, then: Error) -> Error {
        Error::Chained { first: Box::new(self), then: Box::new(then) }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "configuration error: {msg}"),
            Error::Io { path: Some(path), source } => write!(f, "{path}: {source}"),
            Error::Io { path: None, source } => write!(f, "{source}"),
            Error::TruncatedRecord { path } => {
                write!(f, "{path}: FASTQ record truncated before all four lines were read")
            }
            Error::Chained { first, then } => write!(f, "{first}\nthen: {then}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(source: io::Error) -> Self {
        Error::io_unpathed(source)
    }
}
