//! The small error type reserved for failures outside of diagnostics.
//!
//! Most lexical/syntactic/semantic failures are reported as [`crate::Diagnostic`]
//! records and recovered from locally. `CcError` exists only for the
//! handful of operations that can fail before any translation-unit state
//! exists to attach a diagnostic to: opening an
//! include file, restoring a stream checkpoint that was never saved, and
//! internal consistency failures.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum CcError {
    #[error("cannot open '{path}': {message}")]
    Io { path: String, message: String },

    #[error("no saved stream state to restore")]
    NoSavedState,

    #[error("internal compiler error: {0}")]
    Internal(String),
}

pub type CcResult<T> = Result<T, CcError>;

impl CcError {
    pub fn io(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Io { path: path.into(), message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
