use std::io;

use crate::text::config::ConfigFingerprint;

/// Crate wide result type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by vocabulary, model, index and persistence operations.
///
/// Out-of-vocabulary tokens are never an error: they are dropped while
/// vectorizing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Two artifacts were produced under different text configurations.
    #[error("incompatible text configuration: expected fingerprint {expected}, found {found}")]
    IncompatibleConfig {
        expected: ConfigFingerprint,
        found: ConfigFingerprint,
    },

    /// A weighting, pruning or scoring parameter is out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A persisted index is malformed or was written by an unsupported version.
    #[error("corrupt persisted state: {0}")]
    CorruptPersistedState(String),

    /// Reading or writing a persisted index failed.
    #[error("i/o failure: {0}")]
    IoFailure(#[from] io::Error),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidParameter(msg.into())
    }

    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        Error::CorruptPersistedState(msg.into())
    }
}
