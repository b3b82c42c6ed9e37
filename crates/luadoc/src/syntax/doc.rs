//
// syntax/doc.rs
//
// Accessors for doc comments owned by functions and the tags inside them.
//

use super::kind::NodeKind;
use super::tree::{NodeId, SyntaxTree};

/// The doc comment a function owns, if any.
///
/// A comment is owned when the parser attached it in front of the function
/// (the comment ended on the line right above it). An owned comment is the
/// first child and starts where the function starts; a comment at the top of
/// the body does not.
pub fn owned_comment(tree: &SyntaxTree, owner: NodeId) -> Option<NodeId> {
    if !tree.kind(owner).is_comment_owner() {
        return None;
    }
    let owner_start = tree.range(owner).start;
    tree.children(owner)
        .first()
        .copied()
        .filter(|&c| tree.kind(c) == NodeKind::DocComment && tree.range(c).start == owner_start)
}

/// Nodes of `kind` inside `comment`, in declaration order.
pub fn find_tags(tree: &SyntaxTree, comment: NodeId, kind: NodeKind) -> Vec<NodeId> {
    tree.descendants_of_kind(comment, kind)
}

/// The `Name` leaf declared by a tag or generic def.
pub fn tag_name_node(tree: &SyntaxTree, tag: NodeId) -> Option<NodeId> {
    tree.children(tag)
        .iter()
        .copied()
        .find(|&c| tree.kind(c) == NodeKind::Name)
}

pub fn tag_name(tree: &SyntaxTree, tag: NodeId) -> Option<&str> {
    tag_name_node(tree, tag).and_then(|n| tree.leaf_text(n))
}

/// Iterate the doc comments of a tree in document order.
pub fn doc_comments(tree: &SyntaxTree) -> Vec<NodeId> {
    tree.descendants_of_kind(tree.root(), NodeKind::DocComment)
}
