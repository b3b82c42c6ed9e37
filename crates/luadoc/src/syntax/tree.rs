//
// syntax/tree.rs
//
// Arena-backed syntax tree with structural replacement
//

use std::borrow::Cow;

use anyhow::{anyhow, bail, Result};
use ropey::Rope;
use serde::Serialize;

use super::kind::NodeKind;

/// Index of a node inside one `SyntaxTree` arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Half-open byte range into the file contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Cursor-style containment: an offset right after the last byte still touches the range.
    pub fn touches(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }

    fn shifted(self, delta: isize) -> Self {
        Self {
            start: (self.start as isize + delta) as usize,
            end: (self.end as isize + delta) as usize,
        }
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    range: TextRange,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Only set for leaf kinds
    text: Option<String>,
    detached: bool,
}

/// A parsed file or fragment.
///
/// Nodes are never removed from the arena. `replace` detaches the old subtree
/// and appends the grafted one, so `NodeId`s stay valid (though possibly detached)
/// for the lifetime of the tree.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    nodes: Vec<NodeData>,
    root: NodeId,
    contents: Rope,
    revision: u64,
}

impl SyntaxTree {
    pub(crate) fn with_text(text: &str) -> Self {
        let root = NodeData {
            kind: NodeKind::File,
            range: TextRange::new(0, text.len()),
            parent: None,
            children: Vec::new(),
            text: None,
            detached: false,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            contents: Rope::from_str(text),
            revision: 0,
        }
    }

    pub(crate) fn add_node(&mut self, parent: NodeId, kind: NodeKind, range: TextRange) -> NodeId {
        self.push(Some(parent), kind, range, None)
    }

    pub(crate) fn add_leaf(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        range: TextRange,
        text: &str,
    ) -> NodeId {
        self.push(Some(parent), kind, range, Some(text.to_string()))
    }

    fn push(
        &mut self,
        parent: Option<NodeId>,
        kind: NodeKind,
        range: TextRange,
        text: Option<String>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            kind,
            range,
            parent,
            children: Vec::new(),
            text,
            detached: false,
        });
        if let Some(parent) = parent {
            self.nodes[parent.index()].children.push(id);
        }
        id
    }

    pub(crate) fn set_end(&mut self, id: NodeId, end: usize) {
        self.nodes[id.index()].range.end = end;
    }

    /// Move `child` to be the first child of `owner`, extending `owner` to cover it.
    pub(crate) fn adopt_first(&mut self, owner: NodeId, child: NodeId) {
        if let Some(old_parent) = self.nodes[child.index()].parent {
            self.nodes[old_parent.index()].children.retain(|&c| c != child);
        }
        self.nodes[child.index()].parent = Some(owner);
        let child_start = self.nodes[child.index()].range.start;
        let data = &mut self.nodes[owner.index()];
        data.children.insert(0, child);
        data.range.start = data.range.start.min(child_start);
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn contents(&self) -> &Rope {
        &self.contents
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.index()].kind
    }

    pub fn range(&self, id: NodeId) -> TextRange {
        self.nodes[id.index()].range
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    /// True if `id` belongs to this arena and has not been replaced away.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.nodes.get(id.index()).is_some_and(|n| !n.detached)
    }

    pub fn leaf_text(&self, id: NodeId) -> Option<&str> {
        self.nodes[id.index()].text.as_deref()
    }

    /// Source text covered by a node.
    pub fn text(&self, id: NodeId) -> Cow<'_, str> {
        if let Some(text) = self.leaf_text(id) {
            return Cow::Borrowed(text);
        }
        let range = self.range(id);
        let start = self.contents.byte_to_char(range.start);
        let end = self.contents.byte_to_char(range.end);
        Cow::Owned(self.contents.slice(start..end).to_string())
    }

    /// Strict ancestors, innermost first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&n| self.parent(n))
    }

    /// Nearest strict ancestor whose kind satisfies `pred`.
    pub fn parent_of_kind(&self, id: NodeId, pred: impl Fn(NodeKind) -> bool) -> Option<NodeId> {
        self.ancestors(id).find(|&n| pred(self.kind(n)))
    }

    /// Strict descendants in document (pre-)order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    pub fn descendants_of_kind(&self, id: NodeId, kind: NodeKind) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&n| self.kind(n) == kind)
            .collect()
    }

    pub fn find_descendant_of_kind(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.descendants(id).into_iter().find(|&n| self.kind(n) == kind)
    }

    /// Deepest leaf touching `offset`, if any.
    pub fn leaf_at_offset(&self, offset: usize) -> Option<NodeId> {
        let mut node = self.root;
        loop {
            let children = self.children(node);
            let inside = children
                .iter()
                .copied()
                .find(|&c| {
                    let r = self.range(c);
                    r.start <= offset && offset < r.end
                })
                .or_else(|| children.iter().copied().find(|&c| self.range(c).touches(offset)));
            match inside {
                Some(child) => node = child,
                None => break,
            }
        }
        self.kind(node).is_leaf().then_some(node)
    }

    // ========================================================================
    // Replacement
    // ========================================================================

    /// Replace `old` with a copy of `donor_node` (and its subtree) from `donor`.
    ///
    /// The old subtree is detached, later nodes are shifted by the length delta,
    /// ancestors grow or shrink, and the file contents are edited in the same step.
    /// Returns the id of the grafted node.
    pub fn replace(&mut self, old: NodeId, donor: &SyntaxTree, donor_node: NodeId) -> Result<NodeId> {
        if !self.is_alive(old) {
            bail!("cannot replace node {:?}: it is not part of the live tree", old);
        }
        if !donor.is_alive(donor_node) {
            bail!("cannot graft donor node {:?}: it is not part of the donor tree", donor_node);
        }
        let parent = self
            .parent(old)
            .ok_or_else(|| anyhow!("cannot replace the root node of a tree"))?;

        let old_range = self.range(old);
        let donor_range = donor.range(donor_node);
        let new_text = donor.text(donor_node).into_owned();
        let delta = new_text.len() as isize - old_range.len() as isize;

        let start_char = self.contents.byte_to_char(old_range.start);
        let end_char = self.contents.byte_to_char(old_range.end);
        self.contents.remove(start_char..end_char);
        self.contents.insert(start_char, &new_text);

        let position = self
            .children(parent)
            .iter()
            .position(|&c| c == old)
            .ok_or_else(|| anyhow!("node {:?} is missing from its parent's children", old))?;
        self.nodes[parent.index()].children.remove(position);
        self.detach(old);

        for data in self.nodes.iter_mut().filter(|n| !n.detached) {
            if data.range.start >= old_range.end {
                data.range = data.range.shifted(delta);
            } else if data.range.start <= old_range.start && data.range.end >= old_range.end {
                data.range.end = (data.range.end as isize + delta) as usize;
            }
        }

        let base = old_range.start as isize - donor_range.start as isize;
        let grafted = self.graft(donor, donor_node, parent, base);
        self.nodes[parent.index()].children.insert(position, grafted);
        self.revision += 1;

        log::trace!(
            "Replaced {:?} {:?} with {:?} (revision {})",
            self.kind(grafted),
            old_range,
            self.range(grafted),
            self.revision
        );
        Ok(grafted)
    }

    fn detach(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            let data = &mut self.nodes[node.index()];
            data.detached = true;
            stack.extend(data.children.iter().copied());
        }
        self.nodes[id.index()].parent = None;
    }

    fn graft(&mut self, donor: &SyntaxTree, donor_node: NodeId, parent: NodeId, base: isize) -> NodeId {
        let data = &donor.nodes[donor_node.index()];
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            kind: data.kind,
            range: data.range.shifted(base),
            parent: Some(parent),
            children: Vec::new(),
            text: data.text.clone(),
            detached: false,
        });
        for &child in &data.children {
            let grafted = self.graft(donor, child, id, base);
            self.nodes[id.index()].children.push(grafted);
        }
        id
    }
}
