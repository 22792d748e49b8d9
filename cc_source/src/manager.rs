//! Owns every stream, the include stack, and the location table backing
//! the opaque [`Location`] tokens `cc_common` defines. Grounded on xcc's
//! `SourceMgr`: a flat vector of streams plus an include stack of indices
//! into it, and a `LocTree` of macro-expansion/include frames threaded
//! through each minted location.

use std::path::{Path, PathBuf};

use cc_common::{DecodedLocation, ExpansionFrame, Location, LocationResolver};

use crate::options::CompilerOptions;
use crate::stream::{self, Stream, StreamId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TreeId(u32);

/// One frame of the location tree: either "this location is inside an
/// `#include`d file, included from here" or "this location is the product
/// of expanding this macro".
enum TreeNode {
    Include { parent: Option<TreeId>, from_stream: StreamId, from_offset: u32 },
    Macro { parent: Option<TreeId>, name: String },
}

impl TreeNode {
    fn parent(&self) -> Option<TreeId> {
        match self {
            TreeNode::Include { parent, .. } => *parent,
            TreeNode::Macro { parent, .. } => *parent,
        }
    }
}

struct LocationRecord {
    stream: StreamId,
    byte_offset: u32,
    tree: Option<TreeId>,
}

pub struct SourceManager {
    options: CompilerOptions,
    streams: Vec<Stream>,
    include_stack: Vec<StreamId>,
    tree_nodes: Vec<TreeNode>,
    locations: Vec<LocationRecord>,
    current_tree: Option<TreeId>,
}

impl SourceManager {
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            options,
            streams: Vec::new(),
            include_stack: Vec::new(),
            tree_nodes: Vec::new(),
            locations: vec![LocationRecord { stream: StreamId(0), byte_offset: 0, tree: None }],
            current_tree: None,
        }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn stream(&self, id: StreamId) -> &Stream {
        &self.streams[id.0 as usize]
    }

    pub fn current_stream_id(&self) -> Option<StreamId> {
        self.include_stack.last().copied()
    }

    fn push_stream(&mut self, stream: Stream) -> StreamId {
        let id = StreamId(self.streams.len() as u32);
        self.streams.push(stream);
        id
    }

    pub fn add_main_file(&mut self, path: &Path) -> std::io::Result<StreamId> {
        let s = stream::read_file(path, self.options.trigraphs)?;
        let id = self.push_stream(s);
        self.include_stack.push(id);
        Ok(id)
    }

    pub fn add_main_stdin(&mut self) -> std::io::Result<StreamId> {
        let s = stream::read_stdin(self.options.trigraphs)?;
        let id = self.push_stream(s);
        self.include_stack.push(id);
        Ok(id)
    }

    pub fn add_main_string(&mut self, name: impl Into<String>, content: impl Into<String>) -> StreamId {
        let s = stream::from_string(name, content, self.options.trigraphs);
        let id = self.push_stream(s);
        self.include_stack.push(id);
        id
    }

    /// Resolve `#include "name"` / `#include <name>` against the quote and
    /// angled search paths (§4.2): quote form checks the including file's
    /// own directory first, then falls through to the same angled list.
    pub fn resolve_include(&self, name: &str, angled: bool, including: Option<StreamId>) -> Option<PathBuf> {
        if !angled {
            if let Some(id) = including {
                let from = Path::new(&self.stream(id).name);
                if let Some(dir) = from.parent() {
                    let candidate = dir.join(name);
                    if candidate.is_file() {
                        return Some(candidate);
                    }
                }
            }
            for dir in &self.options.quote_include_paths {
                let candidate = Path::new(dir).join(name);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
        for dir in &self.options.angled_include_paths {
            let candidate = Path::new(dir).join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }

    /// Begin translation phases 1-4 on `path`, recursively, per §5.1.1.2
    /// phase 4. Pushes a new `Include` tree frame and stream.
    pub fn begin_include(&mut self, path: &Path, from_offset: u32) -> std::io::Result<StreamId> {
        let from_stream = self.current_stream_id().expect("begin_include with no active stream");
        let s = stream::read_file(path, self.options.trigraphs)?;
        let id = self.push_stream(s);
        let tree = TreeId(self.tree_nodes.len() as u32);
        self.tree_nodes.push(TreeNode::Include { parent: self.current_tree, from_stream, from_offset });
        self.current_tree = Some(tree);
        self.include_stack.push(id);
        Ok(id)
    }

    pub fn end_include(&mut self) {
        self.include_stack.pop();
        if let Some(tree) = self.current_tree {
            self.current_tree = self.tree_nodes[tree.0 as usize].parent();
        }
    }

    /// Begin a macro expansion frame; every location minted until
    /// [`SourceManager::end_macro`] carries this frame in its chain.
    pub fn begin_macro(&mut self, name: impl Into<String>) {
        let tree = TreeId(self.tree_nodes.len() as u32);
        self.tree_nodes.push(TreeNode::Macro { parent: self.current_tree, name: name.into() });
        self.current_tree = Some(tree);
    }

    pub fn end_macro(&mut self) {
        if let Some(tree) = self.current_tree {
            self.current_tree = self.tree_nodes[tree.0 as usize].parent();
        }
    }

    /// Mint an opaque [`Location`] for `byte_offset` in `stream`, tagged
    /// with the currently active location-tree frame.
    pub fn mint_location(&mut self, stream: StreamId, byte_offset: u32) -> Location {
        let idx = self.locations.len() as u32;
        self.locations.push(LocationRecord { stream, byte_offset, tree: self.current_tree });
        Location(idx)
    }

    fn build_chain(&self, mut tree: Option<TreeId>) -> Vec<ExpansionFrame> {
        let mut chain = Vec::new();
        while let Some(id) = tree {
            let node = &self.tree_nodes[id.0 as usize];
            match node {
                TreeNode::Include { parent, from_stream, from_offset } => {
                    let s = &self.streams[from_stream.0 as usize];
                    let (line, column) = s.line_column(*from_offset);
                    chain.push(ExpansionFrame::Include { file: s.name.clone(), line, column });
                    tree = *parent;
                }
                TreeNode::Macro { parent, name } => {
                    chain.push(ExpansionFrame::Macro { name: name.clone() });
                    tree = *parent;
                }
            }
        }
        chain
    }
}

impl LocationResolver for SourceManager {
    fn decode(&self, loc: Location) -> Option<DecodedLocation> {
        if loc.is_none() {
            return None;
        }
        let record = self.locations.get(loc.0 as usize)?;
        let s = self.streams.get(record.stream.0 as usize)?;
        let (line, column) = s.line_column(record.byte_offset);
        Some(DecodedLocation {
            file_name: s.name.clone(),
            line,
            column,
            line_text: s.line_text(record.byte_offset).to_string(),
            expansion_chain: self.build_chain(record.tree),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_roundtrips_line_and_column() {
        let mut mgr = SourceManager::new(CompilerOptions::default());
        let id = mgr.add_main_string("t.c", "int x;\nint y;\n");
        let loc = mgr.mint_location(id, 8);
        let decoded = mgr.decode(loc).unwrap();
        assert_eq!(decoded.line, 2);
        assert_eq!(decoded.column, 1);
        assert_eq!(decoded.line_text, "int y;");
    }

    #[test]
    fn none_location_decodes_to_none() {
        let mgr = SourceManager::new(CompilerOptions::default());
        assert!(mgr.decode(Location::NONE).is_none());
    }

    #[test]
    fn macro_frame_appears_in_expansion_chain() {
        let mut mgr = SourceManager::new(CompilerOptions::default());
        let id = mgr.add_main_string("t.c", "FOO\n");
        mgr.begin_macro("FOO");
        let loc = mgr.mint_location(id, 0);
        mgr.end_macro();
        let decoded = mgr.decode(loc).unwrap();
        assert_eq!(decoded.expansion_chain.len(), 1);
        assert!(matches!(&decoded.expansion_chain[0], ExpansionFrame::Macro { name } if name == "FOO"));
    }
}
