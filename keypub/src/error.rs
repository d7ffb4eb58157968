use std::path::PathBuf;

/// Errors that decide how a run ends.
///
/// Everything else is reported through `anyhow` and ends the run with
/// status 1.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The pending preamble is gone by the time we assemble.
    #[error("Pending preamble {0:?} is missing or unreadable")]
    MissingPreamble(PathBuf),
    /// A file that should have been created can't be read.
    #[error("{0:?} is missing or unreadable")]
    Unreadable(PathBuf),
    /// The key service exported nothing.
    #[error("Exported key material {0:?} is empty")]
    EmptyExport(PathBuf),
    /// No certificate matches the key identifier.
    #[error("No key matching {0:?} found")]
    KeyNotFound(String),
    /// More than one certificate matches the key identifier.
    #[error("Key identifier {0:?} matches more than one key")]
    AmbiguousKey(String),
    /// The certificate has no usable signing key with secrets.
    #[error("Key {0} has no usable secret signing key")]
    NoSigningKey(String),
    /// An external program reported failure.
    #[error("{} failed{}", .tool,
            .status.map(|s| format!(" with exit status {}", s))
            .unwrap_or_default())]
    ToolFailed {
        tool: String,
        status: Option<i32>,
    },
    /// An upload destination without a host part.
    #[error("Malformed upload destination {0:?}; expected USER@HOST:DIR")]
    InvalidDestination(String),
    /// The output file would overwrite one of the run's temporary
    /// files.
    #[error("Output file {0:?} clashes with a temporary file of this run")]
    OutputClash(PathBuf),
}

impl Error {
    /// Returns the process exit status for this error.
    pub fn exit_status(&self) -> i32 {
        match self {
            Error::ToolFailed { status: Some(s), .. } if *s != 0 => *s,
            _ => 1,
        }
    }
}

/// Maps any error to the process exit status.
pub fn exit_status(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<Error>())
        .map(Error::exit_status)
        .unwrap_or(1)
}
