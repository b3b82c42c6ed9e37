//
// reference/scope_walker.rs
//
// Lexical lookup of `@generic` parameters through enclosing functions
//

use crate::syntax::{doc, NodeId, NodeKind, SyntaxTree};

/// Find the `GenericDef` named `name` visible from `from`.
///
/// Walks the enclosing functions innermost first and checks the doc comment
/// each one owns. Within one comment the first declaration wins.
pub fn find_generic_def(tree: &SyntaxTree, from: NodeId, name: &str) -> Option<NodeId> {
    let mut cursor = tree.parent_of_kind(from, NodeKind::is_func_body_owner);
    while let Some(func) = cursor {
        if let Some(def) = generic_def_in(tree, func, name) {
            log::trace!(
                "Generic '{}' found on {:?} at {:?}",
                name,
                tree.kind(func),
                tree.range(func)
            );
            return Some(def);
        }
        cursor = tree.parent_of_kind(func, NodeKind::is_func_body_owner);
    }
    None
}

/// `GenericDef` named `name` in the doc comment owned by `func`.
pub fn generic_def_in(tree: &SyntaxTree, func: NodeId, name: &str) -> Option<NodeId> {
    let comment = doc::owned_comment(tree, func)?;
    doc::find_tags(tree, comment, NodeKind::GenericDef)
        .into_iter()
        .find(|&def| doc::tag_name(tree, def) == Some(name))
}
