//
// reference/mod.rs
//
// References from doc annotations to their declarations
//

pub mod class_name;
pub mod scope_walker;

pub use class_name::ClassNameReference;

use anyhow::Result;
use serde::Serialize;

use crate::index::{SearchContext, TypeDefIndex};
use crate::syntax::TextRange;
use crate::workspace::{NodeRef, Workspace};

/// Everything a reference needs to resolve: the trees, the symbol table and
/// the scope the lookup is allowed to see.
#[derive(Clone, Copy)]
pub struct ResolveContext<'a> {
    pub workspace: &'a Workspace,
    pub types: &'a dyn TypeDefIndex,
    pub search: &'a SearchContext,
}

/// A completion candidate offered by a reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupElement {
    pub label: String,
}

/// Capability set an IDE feature uses on a reference site.
pub trait Reference {
    /// The node the reference is bound to.
    fn element(&self) -> NodeRef;

    /// Span of the reference relative to the start of its element.
    fn range_in_element(&self, workspace: &Workspace) -> TextRange;

    fn resolve(&self, cx: ResolveContext<'_>) -> Option<NodeRef>;

    /// True iff the reference resolves to a node equivalent to `candidate`.
    fn is_reference_to(&self, cx: ResolveContext<'_>, candidate: NodeRef) -> bool {
        self.resolve(cx)
            .is_some_and(|target| cx.workspace.are_equivalent(candidate, target))
    }

    /// Replace the bound node with one spelling `new_name` and rebind to it.
    fn handle_element_rename(&mut self, workspace: &mut Workspace, new_name: &str) -> Result<NodeRef>;

    fn variants(&self, cx: ResolveContext<'_>) -> Vec<LookupElement>;
}
