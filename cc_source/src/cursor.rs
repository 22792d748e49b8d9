//! A buffered character cursor over one active stream, with lookahead and
//! backtracking support. A lookahead-buffer-of-`(char, byte_len)` approach,
//! generalized to mint
//! [`cc_common::Location`] tokens through the owning [`SourceManager`]
//! instead of carrying its own line/column state.

use std::collections::VecDeque;

use cc_common::Location;

use crate::manager::SourceManager;
use crate::stream::StreamId;

pub struct Cursor<'a> {
    mgr: &'a mut SourceManager,
    stream_id: StreamId,
    byte_position: usize,
    lookahead: VecDeque<(char, usize)>,
    saved: Vec<CursorState>,
}

#[derive(Clone)]
struct CursorState {
    byte_position: usize,
    lookahead: VecDeque<(char, usize)>,
}

impl<'a> Cursor<'a> {
    pub fn new(mgr: &'a mut SourceManager, stream_id: StreamId) -> Self {
        Self { mgr, stream_id, byte_position: 0, lookahead: VecDeque::with_capacity(8), saved: Vec::new() }
    }

    fn content(&self) -> &str {
        &self.mgr.stream(self.stream_id).content
    }

    pub fn current(&mut self) -> Option<char> {
        self.peek(0)
    }

    pub fn peek(&mut self, n: usize) -> Option<char> {
        while self.lookahead.len() <= n {
            if !self.fill_lookahead() {
                return None;
            }
        }
        self.lookahead.get(n).map(|(ch, _)| *ch)
    }

    fn fill_lookahead(&mut self) -> bool {
        let consumed: usize = self.lookahead.iter().map(|(_, len)| len).sum();
        let pos = self.byte_position + consumed;
        let content = self.content();
        if pos >= content.len() {
            return false;
        }
        if let Some(ch) = content[pos..].chars().next() {
            self.lookahead.push_back((ch, ch.len_utf8()));
            true
        } else {
            false
        }
    }

    pub fn advance(&mut self) -> Option<char> {
        if self.lookahead.is_empty() && !self.fill_lookahead() {
            return None;
        }
        let (ch, byte_len) = self.lookahead.pop_front()?;
        self.byte_position += byte_len;
        Some(ch)
    }

    pub fn advance_while<F: FnMut(char) -> bool>(&mut self, mut predicate: F) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current() {
            if !predicate(ch) {
                break;
            }
            result.push(ch);
            self.advance();
        }
        result
    }

    pub fn skip_while<F: FnMut(char) -> bool>(&mut self, mut predicate: F) -> usize {
        let mut count = 0;
        while let Some(ch) = self.current() {
            if !predicate(ch) {
                break;
            }
            self.advance();
            count += 1;
        }
        count
    }

    pub fn is_at_end(&mut self) -> bool {
        self.current().is_none()
    }

    pub fn byte_position(&self) -> usize {
        self.byte_position
    }

    pub fn slice_from(&self, start_byte_pos: usize) -> &str {
        &self.content()[start_byte_pos..self.byte_position]
    }

    pub fn match_str(&mut self, s: &str) -> bool {
        for (i, expected) in s.chars().enumerate() {
            if self.peek(i) != Some(expected) {
                return false;
            }
        }
        for _ in 0..s.chars().count() {
            self.advance();
        }
        true
    }

    pub fn save(&mut self) {
        self.saved.push(CursorState { byte_position: self.byte_position, lookahead: self.lookahead.clone() });
    }

    pub fn restore(&mut self) -> cc_common::CcResult<()> {
        match self.saved.pop() {
            Some(state) => {
                self.byte_position = state.byte_position;
                self.lookahead = state.lookahead;
                Ok(())
            }
            None => Err(cc_common::CcError::NoSavedState),
        }
    }

    pub fn discard_saved(&mut self) -> cc_common::CcResult<()> {
        self.saved.pop().map(|_| ()).ok_or(cc_common::CcError::NoSavedState)
    }

    /// Mint a [`Location`] for the current byte position.
    pub fn here(&mut self) -> Location {
        let stream_id = self.stream_id;
        let pos = self.byte_position as u32;
        self.mgr.mint_location(stream_id, pos)
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    /// The name and 1-based line number of the stream at the current
    /// position, for `__FILE__`/`__LINE__`. Reads through the same `mgr`
    /// borrow the cursor already holds, so it needs no separate access to
    /// the source manager.
    pub fn current_file_and_line(&self) -> (&str, u32) {
        let stream = self.mgr.stream(self.stream_id);
        let (line, _col) = stream.line_column(self.byte_position as u32);
        (stream.name.as_str(), line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::CompilerOptions;

    #[test]
    fn peek_does_not_advance() {
        let mut mgr = SourceManager::new(CompilerOptions::default());
        let id = mgr.add_main_string("t.c", "abc");
        let mut cursor = Cursor::new(&mut mgr, id);
        assert_eq!(cursor.peek(0), Some('a'));
        assert_eq!(cursor.peek(2), Some('c'));
        assert_eq!(cursor.current(), Some('a'));
    }

    #[test]
    fn save_and_restore_roundtrip() {
        let mut mgr = SourceManager::new(CompilerOptions::default());
        let id = mgr.add_main_string("t.c", "hello");
        let mut cursor = Cursor::new(&mut mgr, id);
        cursor.advance();
        cursor.save();
        cursor.advance();
        cursor.advance();
        assert_eq!(cursor.current(), Some('l'));
        cursor.restore().unwrap();
        assert_eq!(cursor.current(), Some('e'));
    }

    #[test]
    fn restore_without_save_errors() {
        let mut mgr = SourceManager::new(CompilerOptions::default());
        let id = mgr.add_main_string("t.c", "x");
        let mut cursor = Cursor::new(&mut mgr, id);
        assert!(cursor.restore().is_err());
    }

    #[test]
    fn match_str_advances_only_on_success() {
        let mut mgr = SourceManager::new(CompilerOptions::default());
        let id = mgr.add_main_string("t.c", "int x;");
        let mut cursor = Cursor::new(&mut mgr, id);
        assert!(!cursor.match_str("void"));
        assert_eq!(cursor.current(), Some('i'));
        assert!(cursor.match_str("int"));
        assert_eq!(cursor.current(), Some(' '));
    }
}
