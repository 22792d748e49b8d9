//! The source manager: ingests files/string buffers/stdin, runs translation
//! phases 1-2, resolves `#include` search paths, and backs every
//! [`cc_common::Location`] token minted during compilation with the data a
//! [`cc_common::LocationResolver`] needs to decode it.

pub mod cursor;
pub mod manager;
pub mod options;
pub mod phases;
pub mod stream;

pub use cursor::Cursor;
pub use manager::SourceManager;
pub use options::CompilerOptions;
pub use stream::{Stream, StreamId, StreamKind};
