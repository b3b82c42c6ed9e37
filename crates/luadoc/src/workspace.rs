//
// workspace.rs
//
// Parsed files of a project, stable node handles and node equivalence
//

use std::borrow::Cow;
use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use url::Url;

use crate::syntax::{parse, NodeId, NodeKind, SyntaxTree, TextRange};
use crate::utf16;

/// Interned file identity. Survives re-parses of the same URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FileId(u32);

impl FileId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to a node of one parse of one file.
///
/// Re-parsing the file bumps its generation, which makes older handles stale.
/// Replacing a node keeps the generation: the rest of the tree is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodeRef {
    pub file: FileId,
    pub generation: u32,
    pub node: NodeId,
}

/// Parse-independent pointer to a node: the same declaration in a rebuilt
/// tree gets an equal pointer as long as its text did not move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodePtr {
    pub file: FileId,
    pub kind: NodeKind,
    pub range: TextRange,
}

#[derive(Debug)]
struct SourceFile {
    url: Url,
    tree: SyntaxTree,
    generation: u32,
}

/// All files known to the analysis, keyed by URL.
#[derive(Debug, Default)]
pub struct Workspace {
    files: Vec<Option<SourceFile>>,
    ids: HashMap<Url, FileId>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `text` and store it under `url`, replacing any previous parse.
    pub fn set_file(&mut self, url: Url, text: &str) -> FileId {
        self.insert_tree(url, parse(text))
    }

    /// Store an already parsed tree (used when files are parsed in parallel).
    pub fn insert_tree(&mut self, url: Url, tree: SyntaxTree) -> FileId {
        if let Some(&id) = self.ids.get(&url) {
            let slot = &mut self.files[id.index()];
            let generation = slot.as_ref().map_or(0, |f| f.generation + 1);
            log::trace!("Re-parsed {} (generation {})", url, generation);
            *slot = Some(SourceFile {
                url,
                tree,
                generation,
            });
            return id;
        }
        let id = FileId(self.files.len() as u32);
        self.ids.insert(url.clone(), id);
        self.files.push(Some(SourceFile {
            url,
            tree,
            generation: 0,
        }));
        id
    }

    pub fn remove_file(&mut self, url: &Url) -> Option<FileId> {
        let id = self.ids.remove(url)?;
        self.files[id.index()] = None;
        Some(id)
    }

    pub fn file_id(&self, url: &Url) -> Option<FileId> {
        self.ids.get(url).copied()
    }

    pub fn url(&self, file: FileId) -> Option<&Url> {
        self.source(file).map(|f| &f.url)
    }

    /// Live files in insertion order.
    pub fn files(&self) -> impl Iterator<Item = FileId> + '_ {
        self.files
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_some())
            .map(|(i, _)| FileId(i as u32))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn source(&self, file: FileId) -> Option<&SourceFile> {
        self.files.get(file.index()).and_then(|f| f.as_ref())
    }

    pub fn tree(&self, file: FileId) -> Option<&SyntaxTree> {
        self.source(file).map(|f| &f.tree)
    }

    /// Handle for `node` in the current parse of `file`.
    pub fn node_ref(&self, file: FileId, node: NodeId) -> Option<NodeRef> {
        let source = self.source(file)?;
        source.tree.is_alive(node).then_some(NodeRef {
            file,
            generation: source.generation,
            node,
        })
    }

    /// The tree a handle points into, or `None` if the handle is stale or detached.
    pub fn tree_of(&self, r: NodeRef) -> Option<&SyntaxTree> {
        let source = self.source(r.file)?;
        (source.generation == r.generation && source.tree.is_alive(r.node)).then_some(&source.tree)
    }

    pub fn is_alive(&self, r: NodeRef) -> bool {
        self.tree_of(r).is_some()
    }

    pub fn kind(&self, r: NodeRef) -> Option<NodeKind> {
        self.tree_of(r).map(|t| t.kind(r.node))
    }

    pub fn range(&self, r: NodeRef) -> Option<TextRange> {
        self.tree_of(r).map(|t| t.range(r.node))
    }

    pub fn text(&self, r: NodeRef) -> Option<Cow<'_, str>> {
        self.tree_of(r).map(|t| t.text(r.node))
    }

    pub fn ptr(&self, r: NodeRef) -> Option<NodePtr> {
        let tree = self.tree_of(r)?;
        Some(NodePtr {
            file: r.file,
            kind: tree.kind(r.node),
            range: tree.range(r.node),
        })
    }

    /// Two handles designate the same declaration.
    ///
    /// Identical handles are always equivalent; otherwise both must be live
    /// and point at the same kind and span of the same file.
    pub fn are_equivalent(&self, a: NodeRef, b: NodeRef) -> bool {
        if a == b {
            return true;
        }
        match (self.ptr(a), self.ptr(b)) {
            (Some(pa), Some(pb)) => pa == pb,
            _ => false,
        }
    }

    /// Replace the node behind `old` with `donor_node` from a standalone tree.
    pub fn replace(&mut self, old: NodeRef, donor: &SyntaxTree, donor_node: NodeId) -> Result<NodeRef> {
        let source = self
            .files
            .get_mut(old.file.index())
            .and_then(|f| f.as_mut())
            .ok_or_else(|| anyhow!("file {:?} is not part of the workspace", old.file))?;
        if source.generation != old.generation {
            return Err(anyhow!(
                "stale node handle for {} (generation {} != {})",
                source.url,
                old.generation,
                source.generation
            ));
        }
        let node = source
            .tree
            .replace(old.node, donor, donor_node)
            .with_context(|| format!("failed to replace node in {}", source.url))?;
        Ok(NodeRef {
            file: old.file,
            generation: source.generation,
            node,
        })
    }

    /// Byte offset of a 0-based line and UTF-16 column.
    pub fn offset_at(&self, file: FileId, line: u32, utf16_col: u32) -> Option<usize> {
        let contents = self.tree(file)?.contents();
        let line = line as usize;
        if line >= contents.len_lines() {
            return None;
        }
        let line_text = contents.line(line).to_string();
        let col = utf16::utf16_column_to_byte_offset(&line_text, utf16_col);
        Some(contents.line_to_byte(line) + col)
    }

    /// 0-based line and UTF-16 column of a byte offset.
    pub fn line_col(&self, file: FileId, offset: usize) -> Option<(u32, u32)> {
        let contents = self.tree(file)?.contents();
        if offset > contents.len_bytes() {
            return None;
        }
        let line = contents.byte_to_line(offset);
        let line_text = contents.line(line).to_string();
        let col = utf16::byte_offset_to_utf16_column(&line_text, offset - contents.line_to_byte(line));
        Some((line as u32, col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(name: &str) -> Url {
        Url::parse(&format!("file:///project/{name}")).unwrap()
    }

    fn first_ref(ws: &Workspace, file: FileId) -> NodeRef {
        let tree = ws.tree(file).unwrap();
        let node = tree
            .find_descendant_of_kind(tree.root(), NodeKind::ClassNameRef)
            .unwrap();
        ws.node_ref(file, node).unwrap()
    }

    #[test]
    fn test_set_file_reuses_id_and_bumps_generation() {
        let mut ws = Workspace::new();
        let a = ws.set_file(url("a.lua"), "---@type Foo");
        let old = first_ref(&ws, a);
        let again = ws.set_file(url("a.lua"), "---@type Foo");
        assert_eq!(a, again);
        assert_eq!(ws.len(), 1);

        let new = first_ref(&ws, a);
        assert_eq!(new.generation, old.generation + 1);
        assert!(!ws.is_alive(old));
        assert_eq!(ws.text(old), None);
        assert_eq!(ws.text(new).as_deref(), Some("Foo"));
    }

    #[test]
    fn test_equivalence_across_rebuilds_uses_pointers() {
        let mut ws = Workspace::new();
        let a = ws.set_file(url("a.lua"), "---@type Foo");
        let old = first_ref(&ws, a);
        let ptr = ws.ptr(old).unwrap();
        ws.set_file(url("a.lua"), "---@type Foo");

        let rebuilt = first_ref(&ws, a);
        assert_ne!(rebuilt, old);
        assert_eq!(ws.ptr(rebuilt), Some(ptr));
        assert!(ws.are_equivalent(rebuilt, first_ref(&ws, a)));
        // Stale handles are only equivalent to themselves
        assert!(ws.are_equivalent(old, old));
        assert!(!ws.are_equivalent(old, rebuilt));
    }

    #[test]
    fn test_nodes_in_different_files_are_not_equivalent() {
        let mut ws = Workspace::new();
        let a = ws.set_file(url("a.lua"), "---@type Foo");
        let b = ws.set_file(url("b.lua"), "---@type Foo");
        assert!(!ws.are_equivalent(first_ref(&ws, a), first_ref(&ws, b)));
    }

    #[test]
    fn test_replace_rejects_stale_handle() {
        let mut ws = Workspace::new();
        let a = ws.set_file(url("a.lua"), "---@type Foo");
        let old = first_ref(&ws, a);
        ws.set_file(url("a.lua"), "---@type Foo");

        let donor = parse("---@type Bar");
        let donor_node = donor
            .find_descendant_of_kind(donor.root(), NodeKind::ClassNameRef)
            .unwrap();
        let err = ws.replace(old, &donor, donor_node).unwrap_err();
        assert!(err.to_string().contains("stale"));
    }

    #[test]
    fn test_replace_keeps_generation() {
        let mut ws = Workspace::new();
        let a = ws.set_file(url("a.lua"), "---@type Foo");
        let old = first_ref(&ws, a);
        let donor = parse("---@type LongerName");
        let donor_node = donor
            .find_descendant_of_kind(donor.root(), NodeKind::ClassNameRef)
            .unwrap();
        let new = ws.replace(old, &donor, donor_node).unwrap();
        assert_eq!(new.generation, old.generation);
        assert_eq!(ws.text(new).as_deref(), Some("LongerName"));
        assert!(!ws.is_alive(old));
        let tree = ws.tree(a).unwrap();
        assert_eq!(tree.text(tree.root()), "---@type LongerName");
    }

    #[test]
    fn test_remove_file() {
        let mut ws = Workspace::new();
        let a = ws.set_file(url("a.lua"), "---@type Foo");
        let r = first_ref(&ws, a);
        assert_eq!(ws.remove_file(&url("a.lua")), Some(a));
        assert!(ws.is_empty());
        assert!(!ws.is_alive(r));
        assert_eq!(ws.files().count(), 0);
    }

    #[test]
    fn test_offsets_and_line_columns() {
        let mut ws = Workspace::new();
        let a = ws.set_file(url("a.lua"), "local s = 'é'\n---@type Foo\n");
        let offset = ws.offset_at(a, 1, 9).unwrap();
        let tree = ws.tree(a).unwrap();
        let leaf = tree.leaf_at_offset(offset).unwrap();
        assert_eq!(tree.kind(leaf), NodeKind::ClassNameRef);
        assert_eq!(ws.line_col(a, offset), Some((1, 9)));
        // Closing quote after the 2-byte 'é'
        assert_eq!(ws.line_col(a, 13), Some((0, 12)));
        assert_eq!(ws.offset_at(a, 10, 0), None);
    }
}
