//! Options an external driver builds and hands to the source
//! manager/lexer/parser. No file or environment parsing happens here — a
//! driver is responsible for turning `-I`, `-D`, command-line flags, or a
//! config file into this struct before compilation starts.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerOptions {
    /// Whether trigraph sequences (`??=`, `??(`, ...) are replaced during
    /// translation phase 1. Off by default, as in most modern compilers.
    pub trigraphs: bool,
    /// Directories searched for `#include "..."`, checked before `angled`.
    pub quote_include_paths: Vec<String>,
    /// Directories searched for `#include <...>`.
    pub angled_include_paths: Vec<String>,
    /// `(name, replacement)` pairs predefined as if by a leading `#define`.
    pub predefined_macros: Vec<(String, String)>,
    /// Stop reporting non-fatal diagnostics after this many errors. `None`
    /// means unbounded.
    pub error_limit: Option<usize>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            trigraphs: false,
            quote_include_paths: Vec::new(),
            angled_include_paths: Vec::new(),
            predefined_macros: Vec::new(),
            error_limit: None,
        }
    }
}

impl CompilerOptions {
    pub fn with_trigraphs(mut self, enabled: bool) -> Self {
        self.trigraphs = enabled;
        self
    }

    pub fn with_quote_include_path(mut self, path: impl Into<String>) -> Self {
        self.quote_include_paths.push(path.into());
        self
    }

    pub fn with_angled_include_path(mut self, path: impl Into<String>) -> Self {
        self.angled_include_paths.push(path.into());
        self
    }

    pub fn with_predefined_macro(mut self, name: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.predefined_macros.push((name.into(), replacement.into()));
        self
    }

    pub fn with_error_limit(mut self, limit: usize) -> Self {
        self.error_limit = Some(limit);
        self
    }
}
