//
// reference/class_name.rs
//
// Reference from a type name in a doc annotation to its declaration
//

use std::borrow::Cow;

use anyhow::{anyhow, Result};

use super::{scope_walker, LookupElement, Reference, ResolveContext};
use crate::syntax::{parse, NodeKind, TextRange};
use crate::workspace::{NodeRef, Workspace};

/// A `ClassNameRef` leaf seen as a reference.
///
/// Holds nothing but the bound node; every query recomputes from the tree and
/// the symbol table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassNameReference {
    element: NodeRef,
}

impl ClassNameReference {
    /// Bind to `element` if it is a live `ClassNameRef`.
    pub fn new(workspace: &Workspace, element: NodeRef) -> Option<Self> {
        (workspace.kind(element) == Some(NodeKind::ClassNameRef)).then_some(Self { element })
    }

    /// The referenced type name as written.
    pub fn name<'w>(&self, workspace: &'w Workspace) -> Option<Cow<'w, str>> {
        workspace.text(self.element)
    }
}

impl Reference for ClassNameReference {
    fn element(&self) -> NodeRef {
        self.element
    }

    fn range_in_element(&self, workspace: &Workspace) -> TextRange {
        workspace
            .range(self.element)
            .map_or(TextRange::default(), |r| TextRange::new(0, r.len()))
    }

    /// Global type declarations first, then `@generic` parameters of the
    /// enclosing functions. A global name shadows a generic of the same name.
    fn resolve(&self, cx: ResolveContext<'_>) -> Option<NodeRef> {
        let tree = cx.workspace.tree_of(self.element)?;
        let name = tree.text(self.element.node);

        if let Some(def) = cx.types.find_type_def(&name, cx.search) {
            log::trace!("Resolved type '{}' to global declaration {:?}", name, def);
            return Some(def);
        }

        let def = scope_walker::find_generic_def(tree, self.element.node, &name);
        if def.is_none() {
            log::trace!("Type '{}' is unresolved", name);
        }
        cx.workspace.node_ref(self.element.file, def?)
    }

    fn handle_element_rename(&mut self, workspace: &mut Workspace, new_name: &str) -> Result<NodeRef> {
        let fragment = format!("---@type {new_name}");
        let donor = parse(&fragment);
        let donor_node = donor
            .find_descendant_of_kind(donor.root(), NodeKind::ClassNameRef)
            .ok_or_else(|| anyhow!("synthesized fragment {:?} contains no type name reference", fragment))?;
        let new = workspace.replace(self.element, &donor, donor_node)?;
        self.element = new;
        Ok(new)
    }

    fn variants(&self, _cx: ResolveContext<'_>) -> Vec<LookupElement> {
        Vec::new()
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::index::{SearchContext, TypeDefIndex, TypeIndex};
    use proptest::prelude::*;
    use url::Url;

    fn type_name() -> impl Strategy<Value = String> {
        "[A-Z][A-Za-z0-9_]{0,10}"
    }

    fn build(files: &[String]) -> (Workspace, TypeIndex) {
        let mut ws = Workspace::new();
        let index = TypeIndex::default();
        for (i, text) in files.iter().enumerate() {
            let url = Url::parse(&format!("file:///p/{i}.lua")).unwrap();
            let id = ws.set_file(url, text);
            index.index_file(&ws, id);
        }
        (ws, index)
    }

    fn first_ref(ws: &Workspace, file_index: usize) -> ClassNameReference {
        let file = ws.files().nth(file_index).unwrap();
        let tree = ws.tree(file).unwrap();
        let node = tree
            .find_descendant_of_kind(tree.root(), NodeKind::ClassNameRef)
            .unwrap();
        ClassNameReference::new(ws, ws.node_ref(file, node).unwrap()).unwrap()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// A global declaration always wins over a same-named generic in scope.
        #[test]
        fn prop_global_precedence(name in type_name(), depth in 1usize..5) {
            let mut body = format!("---@type {name}\nlocal x\n");
            for _ in 0..depth {
                body = format!("---@generic {name}\nlocal function f()\n{body}end\n");
            }
            let (ws, index) = build(&[body, format!("---@class {name}")]);
            let search = SearchContext::project();
            let cx = ResolveContext { workspace: &ws, types: &index, search: &search };
            let r = first_ref(&ws, 0);
            let target = r.resolve(cx).unwrap();
            prop_assert_eq!(ws.kind(target), Some(NodeKind::TagClass));
        }

        /// The generic of the outermost function is found however deep the reference sits.
        #[test]
        fn prop_generic_walk_up(name in type_name(), depth in 1usize..8) {
            let mut body = format!("---@type {name}\nlocal x\n");
            for _ in 0..depth {
                body = format!("local function f()\n{body}end\n");
            }
            body = format!("---@generic {name}\nfunction outer()\n{body}end\n");
            let (ws, index) = build(&[body]);
            let search = SearchContext::project();
            let cx = ResolveContext { workspace: &ws, types: &index, search: &search };
            let target = first_ref(&ws, 0).resolve(cx).unwrap();
            prop_assert_eq!(ws.kind(target), Some(NodeKind::GenericDef));
            let text = ws.text(target);
            prop_assert_eq!(text.as_deref(), Some(name.as_str()));
        }

        #[test]
        fn prop_range_and_variants(name in type_name()) {
            let (ws, index) = build(&[format!("---@return {name}|nil")]);
            let search = SearchContext::project();
            let cx = ResolveContext { workspace: &ws, types: &index, search: &search };
            let r = first_ref(&ws, 0);
            prop_assert_eq!(r.range_in_element(&ws), TextRange::new(0, name.len()));
            prop_assert!(r.variants(cx).is_empty());
        }

        /// After a rename the reference spells the new name and resolves by it.
        #[test]
        fn prop_rename_rebinds(from in type_name(), to in type_name()) {
            let (mut ws, index) = build(&[
                format!("---@param x {from}[]\nlocal function f(x) end"),
                format!("---@class {to}"),
            ]);
            let mut r = first_ref(&ws, 0);
            r.handle_element_rename(&mut ws, &to).unwrap();
            let renamed = r.name(&ws);
            prop_assert_eq!(renamed.as_deref(), Some(to.as_str()));
            prop_assert_eq!(r.range_in_element(&ws), TextRange::new(0, to.len()));

            let search = SearchContext::project();
            let cx = ResolveContext { workspace: &ws, types: &index, search: &search };
            let decl = index.find_type_def(&to, &search).unwrap();
            prop_assert!(r.is_reference_to(cx, decl));
        }
    }
}
