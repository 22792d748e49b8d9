//! The opaque [`Location`] token and the decode contract a source manager
//! implements for it.
//!
//! A `Location` is a 32-bit value a source manager can turn back into
//! `(file, line, column)` plus the surrounding source line and the chain of
//! macro-expansion/include contexts that produced it (the "location tree").
//! `cc_common` only defines the token and the trait; `cc_source` owns the
//! table that actually backs the encoding, so diagnostics can be built and
//! passed around without pulling in the source manager itself.

use std::fmt;

/// An opaque, encoded source location. `Location::NONE` means "no location".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Location(pub u32);

impl Location {
    pub const NONE: Location = Location(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<loc:{}>", self.0)
    }
}

/// One frame of the chain leading from a use site back to its origin:
/// a file inclusion or a macro expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpansionFrame {
    Include { file: String, line: u32, column: u32 },
    Macro { name: String },
}

/// A fully decoded location, as rendered by a text diagnostic consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLocation {
    pub file_name: String,
    pub line: u32,
    pub column: u32,
    pub line_text: String,
    /// Outermost frame first: "in file included from ..." / "in expansion of macro ...".
    pub expansion_chain: Vec<ExpansionFrame>,
}

/// Implemented by the source manager: the only thing a diagnostic consumer
/// needs to turn a [`Location`] into user-facing text.
pub trait LocationResolver {
    fn decode(&self, loc: Location) -> Option<DecodedLocation>;
}
