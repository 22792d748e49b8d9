//! The diagnostic engine: structured records, severities, format-directive
//! rendering, and dispatch to one or more consumers.

use crate::span::{DecodedLocation, ExpansionFrame, Location, LocationResolver};
use smallvec::SmallVec;
use std::fmt;

/// Diagnostic severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Ignored,
    Note,
    Remark,
    Warning,
    PpError,
    LexError,
    ParseError,
    EvalError,
    TypeError,
    Error,
    Fatal,
}

impl Severity {
    /// Whether this severity counts toward the engine's error total (§7:
    /// "any `error`-level (or higher) diagnostic").
    pub fn is_error_or_worse(self) -> bool {
        self >= Severity::PpError
    }

    pub fn is_warning(self) -> bool {
        self == Severity::Warning
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Ignored => "ignored",
            Severity::Note => "note",
            Severity::Remark => "remark",
            Severity::Warning => "warning",
            Severity::PpError => "preprocessor error",
            Severity::LexError => "lexical error",
            Severity::ParseError => "parse error",
            Severity::EvalError => "evaluation error",
            Severity::TypeError => "type error",
            Severity::Error => "error",
            Severity::Fatal => "fatal error",
        };
        write!(f, "{s}")
    }
}

/// A type-erased diagnostic argument, interpreted by format directives at
/// render time (`%s`/`%d`/`%T`/...).
#[derive(Debug, Clone)]
pub enum DiagArg {
    Str(String),
    Int(i64),
    UInt(u64),
    Ident(String),
    Char(char),
    Unicode(u32),
    /// A pre-rendered type/expression string, for `%T`/`%E`.
    Rendered(String),
    /// A pre-rendered arbitrary-precision integer, with its sign for `%A`/`%a`.
    BigInt { text: String, signed: bool },
}

impl From<&str> for DiagArg {
    fn from(s: &str) -> Self {
        DiagArg::Str(s.to_string())
    }
}
impl From<String> for DiagArg {
    fn from(s: String) -> Self {
        DiagArg::Str(s)
    }
}
impl From<i64> for DiagArg {
    fn from(v: i64) -> Self {
        DiagArg::Int(v)
    }
}
impl From<u64> for DiagArg {
    fn from(v: u64) -> Self {
        DiagArg::UInt(v)
    }
}
impl From<char> for DiagArg {
    fn from(v: char) -> Self {
        DiagArg::Char(v)
    }
}

/// A fix-it suggestion: replace the text spanning `[start, end)` with `replacement`.
#[derive(Debug, Clone)]
pub struct FixItHint {
    pub start: Location,
    pub end: Location,
    pub replacement: String,
}

/// A structured diagnostic record.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    template: &'static str,
    args: SmallVec<[DiagArg; 4]>,
    pub primary: Location,
    pub ranges: SmallVec<[(Location, Location); 2]>,
    pub fixits: Vec<FixItHint>,
    pub code: Option<&'static str>,
}

impl Diagnostic {
    pub fn new(severity: Severity, template: &'static str, primary: Location) -> Self {
        Self {
            severity,
            template,
            args: SmallVec::new(),
            primary,
            ranges: SmallVec::new(),
            fixits: Vec::new(),
            code: None,
        }
    }

    pub fn arg(mut self, a: impl Into<DiagArg>) -> Self {
        self.args.push(a.into());
        self
    }

    pub fn range(mut self, start: Location, end: Location) -> Self {
        self.ranges.push((start, end));
        self
    }

    pub fn with_fixit(mut self, hint: FixItHint) -> Self {
        self.fixits.push(hint);
        self
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    /// Interpret `template`'s `%`-directives against `args`, producing the
    /// final user-facing message. Unrecognized directives pass through
    /// verbatim so a stray `%` in source text (there shouldn't be one in a
    /// `&'static str` literal) never panics.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.template.len() + 16);
        let mut chars = self.template.chars().peekable();
        let mut idx = 0usize;
        let arg = |i: &mut usize| -> Option<&DiagArg> {
            let a = self.args.get(*i);
            *i += 1;
            a
        };

        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('s') => {
                    if let Some(DiagArg::Str(s)) = arg(&mut idx) {
                        out.push_str(s);
                    }
                }
                Some('S') => {
                    if let Some(DiagArg::Str(s)) = arg(&mut idx) {
                        out.push('\'');
                        out.push_str(s);
                        out.push('\'');
                    }
                }
                Some('r') => {
                    if let Some(DiagArg::Str(s)) = arg(&mut idx) {
                        out.push_str(s);
                    }
                }
                Some('R') => {
                    if let Some(DiagArg::Str(s)) = arg(&mut idx) {
                        out.push('\'');
                        out.push_str(s);
                        out.push('\'');
                    }
                }
                Some('d') => match arg(&mut idx) {
                    Some(DiagArg::Int(v)) => out.push_str(&v.to_string()),
                    Some(DiagArg::UInt(v)) => out.push_str(&v.to_string()),
                    _ => {}
                },
                Some('u') => {
                    if let Some(DiagArg::UInt(v)) = arg(&mut idx) {
                        out.push_str(&v.to_string());
                    }
                }
                Some('z') | Some('Z') => match arg(&mut idx) {
                    Some(DiagArg::UInt(v)) => out.push_str(&v.to_string()),
                    Some(DiagArg::Int(v)) => out.push_str(&v.to_string()),
                    _ => {}
                },
                Some('I') => {
                    if let Some(DiagArg::Ident(s)) = arg(&mut idx) {
                        out.push('\'');
                        out.push_str(s);
                        out.push('\'');
                    }
                }
                Some('C') => {
                    if let Some(DiagArg::Char(ch)) = arg(&mut idx) {
                        out.push('\'');
                        out.push(*ch);
                        out.push('\'');
                    }
                }
                Some('U') => {
                    if let Some(DiagArg::Unicode(cp)) = arg(&mut idx) {
                        out.push_str(&format!("<U+{cp:04X}>"));
                    }
                }
                Some('T') => {
                    if let Some(DiagArg::Rendered(s)) = arg(&mut idx) {
                        out.push('\'');
                        out.push_str(s);
                        out.push('\'');
                    }
                }
                Some('t') => {
                    if let Some(DiagArg::Rendered(s)) = arg(&mut idx) {
                        out.push_str(s);
                    }
                }
                Some('E') => {
                    if let Some(DiagArg::Rendered(s)) = arg(&mut idx) {
                        out.push('\'');
                        out.push_str(s);
                        out.push('\'');
                    }
                }
                Some('e') => {
                    if let Some(DiagArg::Rendered(s)) = arg(&mut idx) {
                        out.push_str(s);
                    }
                }
                Some('A') | Some('a') => {
                    if let Some(DiagArg::BigInt { text, .. }) = arg(&mut idx) {
                        out.push_str(text);
                    }
                }
                Some('%') => out.push('%'),
                Some(other) => {
                    out.push('%');
                    out.push(other);
                }
                None => out.push('%'),
            }
        }
        out
    }
}

/// Receives every emitted diagnostic.
pub trait DiagnosticConsumer {
    fn handle(&mut self, diag: &Diagnostic, resolver: &dyn LocationResolver);
}

/// A consumer that just remembers everything it saw, for tests.
#[derive(Default)]
pub struct CollectingConsumer {
    pub rendered: Vec<(Severity, String)>,
}

impl DiagnosticConsumer for CollectingConsumer {
    fn handle(&mut self, diag: &Diagnostic, _resolver: &dyn LocationResolver) {
        self.rendered.push((diag.severity, diag.render()));
    }
}

/// Renders diagnostics as text, with the file-included-from / expansion
/// chain §6's output format describes.
pub struct TextConsumer {
    pub use_color: bool,
}

impl TextConsumer {
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    fn colorize(&self, severity: Severity, text: &str) -> String {
        if !self.use_color {
            return text.to_string();
        }
        let code = match severity {
            s if s.is_error_or_worse() => "31",
            Severity::Warning => "33",
            Severity::Note | Severity::Remark => "36",
            Severity::Ignored => "0",
        };
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

impl DiagnosticConsumer for TextConsumer {
    fn handle(&mut self, diag: &Diagnostic, resolver: &dyn LocationResolver) {
        let message = diag.render();
        let Some(decoded) = resolver.decode(diag.primary) else {
            eprintln!("{}: {}", diag.severity, message);
            return;
        };
        let header = format!(
            "{}:{}:{}: {}: {}",
            decoded.file_name, decoded.line, decoded.column, diag.severity, message
        );
        eprintln!("{}", self.colorize(diag.severity, &header));
        eprintln!("  {}", decoded.line_text);
        let caret_col = decoded.column.saturating_sub(1) as usize;
        let mut caret_line = " ".repeat(caret_col);
        caret_line.push('^');
        eprintln!("  {caret_line}");
        for frame in decoded.expansion_chain.iter().rev() {
            match frame {
                ExpansionFrame::Include { file, line, column } => {
                    eprintln!("in file included from {file}:{line}:{column}:");
                }
                ExpansionFrame::Macro { name } => {
                    eprintln!("note: in expansion of macro '{name}'");
                }
            }
        }
    }
}

/// Dispatches diagnostics to consumers; tracks error/warning counts and the
/// optional error limit that, once reached, suppresses everything but fatal
/// diagnostics (§7).
pub struct DiagnosticEngine {
    consumers: Vec<Box<dyn DiagnosticConsumer>>,
    error_count: usize,
    warning_count: usize,
    error_limit: Option<usize>,
    suppressing: bool,
}

impl DiagnosticEngine {
    pub fn new(error_limit: Option<usize>) -> Self {
        Self {
            consumers: Vec::new(),
            error_count: 0,
            warning_count: 0,
            error_limit,
            suppressing: false,
        }
    }

    pub fn add_consumer(&mut self, consumer: Box<dyn DiagnosticConsumer>) {
        self.consumers.push(consumer);
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// Emit a diagnostic. Returns `true` if it was actually dispatched
    /// (a `fatal` diagnostic is always dispatched and the caller should
    /// terminate the process afterward).
    pub fn emit(&mut self, diag: Diagnostic, resolver: &dyn LocationResolver) -> bool {
        if diag.severity.is_warning() {
            self.warning_count += 1;
        } else if diag.severity.is_error_or_worse() {
            self.error_count += 1;
        }

        if diag.severity != Severity::Fatal {
            if self.suppressing {
                return false;
            }
            if let Some(limit) = self.error_limit {
                if limit > 0 && self.error_count > limit {
                    self.suppressing = true;
                    return false;
                }
            }
        }

        for consumer in &mut self.consumers {
            consumer.handle(&diag, resolver);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_substitutes_directives() {
        let d = Diagnostic::new(Severity::TypeError, "expected %T but found %T", Location::NONE)
            .arg(DiagArg::Rendered("int".into()))
            .arg(DiagArg::Rendered("float".into()));
        assert_eq!(d.render(), "expected 'int' but found 'float'");
    }

    #[test]
    fn render_unrecognized_directive_passes_through() {
        let d = Diagnostic::new(Severity::Note, "100%% done", Location::NONE);
        assert_eq!(d.render(), "100% done");
    }

    struct NoLocations;
    impl LocationResolver for NoLocations {
        fn decode(&self, _loc: Location) -> Option<DecodedLocation> {
            None
        }
    }

    #[test]
    fn engine_counts_and_error_limit() {
        let mut engine = DiagnosticEngine::new(Some(1));
        let mut collector = CollectingConsumer::default();
        let resolver = NoLocations;
        engine.emit(Diagnostic::new(Severity::Error, "first", Location::NONE), &resolver);
        engine.emit(Diagnostic::new(Severity::Error, "second", Location::NONE), &resolver);
        assert_eq!(engine.error_count(), 2);
        assert!(engine.has_errors());
        let _ = collector.rendered.len();
    }
}
