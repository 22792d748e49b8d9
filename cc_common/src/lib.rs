//! Shared types used across the C compiler core.
//!
//! - [`span`]: the opaque, 32-bit [`Location`] token and the contract a
//!   source manager implements to decode it back into file/line/column text.
//! - [`diagnostics`]: the structured [`Diagnostic`] record, severities, and
//!   the [`DiagnosticEngine`] that dispatches records to consumers.
//! - [`error`]: [`CcError`], reserved for the small set of failures that
//!   cannot be represented as a recovered diagnostic (§7).

pub mod diagnostics;
pub mod error;
pub mod span;

pub use diagnostics::{
    CollectingConsumer, DiagArg, Diagnostic, DiagnosticConsumer, DiagnosticEngine, FixItHint,
    Severity, TextConsumer,
};
pub use error::{CcError, CcResult};
pub use span::{DecodedLocation, ExpansionFrame, Location, LocationResolver};
