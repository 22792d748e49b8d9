//! The three stream kinds the source manager can read from.

use std::io::{self, Read};
use std::path::Path;

use crate::phases::apply_translation_phases;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    File,
    String,
    Stdin,
}

/// One ingested buffer: a file, a macro-expansion string buffer, or stdin.
/// Content has already been through translation phases 1-2 by the time it
/// lands here, so everything downstream sees spliced, trigraph-free text.
pub struct Stream {
    pub kind: StreamKind,
    pub name: String,
    pub content: String,
    /// Byte offset of the start of each line, for binary-search line/column
    /// lookup.
    pub line_starts: Vec<u32>,
}

impl Stream {
    pub fn new(kind: StreamKind, name: String, raw: String, trigraphs: bool) -> Self {
        let content = apply_translation_phases(&raw, trigraphs);
        let line_starts = Self::compute_line_starts(&content);
        Self { kind, name, content, line_starts }
    }

    fn compute_line_starts(content: &str) -> Vec<u32> {
        let mut starts = vec![0u32];
        for (i, ch) in content.char_indices() {
            if ch == '\n' {
                starts.push((i + 1) as u32);
            }
        }
        starts
    }

    /// 1-based (line, column) for a byte offset into `content`.
    pub fn line_column(&self, byte_offset: u32) -> (u32, u32) {
        let idx = match self.line_starts.binary_search(&byte_offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let line = idx as u32 + 1;
        let line_start = self.line_starts[idx] as usize;
        let end = (byte_offset as usize).min(self.content.len());
        let column = self.content.get(line_start..end).map(|s| s.chars().count()).unwrap_or(0) as u32 + 1;
        (line, column)
    }

    /// The full text of the line containing `byte_offset`, without its
    /// trailing newline, for diagnostic rendering.
    pub fn line_text(&self, byte_offset: u32) -> &str {
        let idx = match self.line_starts.binary_search(&byte_offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let start = self.line_starts[idx] as usize;
        let end = self.line_starts.get(idx + 1).map(|&e| e as usize).unwrap_or(self.content.len());
        self.content[start..end].trim_end_matches(['\n', '\r'])
    }
}

pub fn read_file(path: &Path, trigraphs: bool) -> io::Result<Stream> {
    let raw = std::fs::read_to_string(path)?;
    Ok(Stream::new(StreamKind::File, path.display().to_string(), raw, trigraphs))
}

pub fn read_stdin(trigraphs: bool) -> io::Result<Stream> {
    let mut raw = String::new();
    io::stdin().read_to_string(&mut raw)?;
    Ok(Stream::new(StreamKind::Stdin, "<stdin>".to_string(), raw, trigraphs))
}

pub fn from_string(name: impl Into<String>, content: impl Into<String>, trigraphs: bool) -> Stream {
    Stream::new(StreamKind::String, name.into(), content.into(), trigraphs)
}
