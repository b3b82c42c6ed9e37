//
// features.rs
//
// Editor features built on type name references: go to definition, find
// usages, rename and unresolved name reporting
//

use std::collections::BTreeSet;

use anyhow::{anyhow, bail, Result};
use serde::Serialize;

use crate::reference::{ClassNameReference, Reference};
use crate::state::{ProjectState, BUILTIN_URL};
use crate::syntax::{doc, parse, NodeKind, TextRange};
use crate::workspace::{FileId, NodeRef, Workspace};

/// Where a definition lives, ready for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationTarget {
    pub url: String,
    /// Span of the declaring node
    pub full_range: TextRange,
    /// Span of the declared name
    pub focus_range: TextRange,
    /// 0-based line of the declared name
    pub line: u32,
    /// 0-based UTF-16 column of the declared name
    pub column: u32,
    pub kind: NodeKind,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenameOutcome {
    /// Usages rebound to their new nodes
    pub references: Vec<NodeRef>,
    /// The renamed declaration name, if the reference resolved
    pub declaration: Option<NodeRef>,
    /// Files whose text changed, in id order
    pub files: Vec<FileId>,
}

/// The type name reference under `offset`, if any.
pub fn reference_at(state: &ProjectState, file: FileId, offset: usize) -> Option<ClassNameReference> {
    let tree = state.workspace.tree(file)?;
    let leaf = tree.leaf_at_offset(offset)?;
    ClassNameReference::new(&state.workspace, state.workspace.node_ref(file, leaf)?)
}

/// The declaration whose name is under `offset` (`@class`, `@alias` or `@generic`).
pub fn declaration_at(state: &ProjectState, file: FileId, offset: usize) -> Option<NodeRef> {
    let tree = state.workspace.tree(file)?;
    let leaf = tree.leaf_at_offset(offset)?;
    if tree.kind(leaf) != NodeKind::Name {
        return None;
    }
    let owner = tree.parent(leaf)?;
    if !is_declaration(tree.kind(owner)) || doc::tag_name_node(tree, owner) != Some(leaf) {
        return None;
    }
    state.workspace.node_ref(file, owner)
}

fn is_declaration(kind: NodeKind) -> bool {
    kind.is_type_declaration() || kind == NodeKind::GenericDef
}

pub fn goto_definition(state: &ProjectState, file: FileId, offset: usize) -> Option<NavigationTarget> {
    let reference = reference_at(state, file, offset)?;
    let target = reference.resolve(state.cx())?;
    navigation_target(&state.workspace, target)
}

pub fn navigation_target(workspace: &Workspace, target: NodeRef) -> Option<NavigationTarget> {
    let tree = workspace.tree_of(target)?;
    let name_node = doc::tag_name_node(tree, target.node);
    let focus_range = name_node.map_or(tree.range(target.node), |n| tree.range(n));
    let (line, column) = workspace.line_col(target.file, focus_range.start)?;
    Some(NavigationTarget {
        url: workspace.url(target.file)?.to_string(),
        full_range: tree.range(target.node),
        focus_range,
        line,
        column,
        kind: tree.kind(target.node),
        name: name_node.map(|n| tree.text(n).into_owned()).unwrap_or_default(),
    })
}

/// Every type name reference in the workspace that resolves to `target`,
/// in file then document order.
pub fn find_usages(state: &ProjectState, target: NodeRef) -> Vec<NodeRef> {
    let cx = state.cx();
    let mut usages = Vec::new();
    for file in state.workspace.files() {
        let Some(tree) = state.workspace.tree(file) else {
            continue;
        };
        for node in tree.descendants_of_kind(tree.root(), NodeKind::ClassNameRef) {
            let Some(reference) = state
                .workspace
                .node_ref(file, node)
                .and_then(|r| ClassNameReference::new(&state.workspace, r))
            else {
                continue;
            };
            if reference.is_reference_to(cx, target) {
                usages.push(reference.element());
            }
        }
    }
    log::debug!("Found {} usage(s) of {:?}", usages.len(), target);
    usages
}

/// Type name references in `file` that resolve to nothing.
pub fn unresolved_references(state: &ProjectState, file: FileId) -> Vec<NodeRef> {
    let Some(tree) = state.workspace.tree(file) else {
        return Vec::new();
    };
    let cx = state.cx();
    tree.descendants_of_kind(tree.root(), NodeKind::ClassNameRef)
        .into_iter()
        .filter_map(|node| state.workspace.node_ref(file, node))
        .filter_map(|r| ClassNameReference::new(&state.workspace, r))
        .filter(|reference| reference.resolve(cx).is_none())
        .map(|reference| reference.element())
        .collect()
}

/// Rename the type at `offset`, either from a reference or from its declaration.
///
/// A resolved name is renamed everywhere: every usage and the declared name.
/// An unresolved reference renames only itself. Touched files are re-indexed.
pub fn rename(state: &mut ProjectState, file: FileId, offset: usize, new_name: &str) -> Result<RenameOutcome> {
    validate_type_name(new_name)?;

    let (origin, target) = if let Some(reference) = reference_at(state, file, offset) {
        (Some(reference), reference.resolve(state.cx()))
    } else if let Some(decl) = declaration_at(state, file, offset) {
        (None, Some(decl))
    } else {
        bail!("no type name at offset {offset}");
    };

    let mut outcome = RenameOutcome::default();
    let mut touched = BTreeSet::new();

    let Some(target) = target else {
        // Unresolved: the reference stands alone
        if let Some(mut reference) = origin {
            outcome.references.push(reference.handle_element_rename(&mut state.workspace, new_name)?);
            touched.insert(reference.element().file);
        }
        return Ok(finish(state, outcome, touched));
    };

    if state.workspace.url(target.file).is_some_and(|u| u.as_str() == BUILTIN_URL) {
        bail!("cannot rename builtin type");
    }

    let usages = find_usages(state, target);
    for usage in usages {
        let mut reference = ClassNameReference::new(&state.workspace, usage)
            .ok_or_else(|| anyhow!("usage {:?} is no longer a type name reference", usage))?;
        outcome.references.push(reference.handle_element_rename(&mut state.workspace, new_name)?);
        touched.insert(usage.file);
    }

    outcome.declaration = Some(rename_declaration(&mut state.workspace, target, new_name)?);
    touched.insert(target.file);
    Ok(finish(state, outcome, touched))
}

fn finish(state: &ProjectState, mut outcome: RenameOutcome, touched: BTreeSet<FileId>) -> RenameOutcome {
    for &file in &touched {
        state.reindex(file);
    }
    outcome.files = touched.into_iter().collect();
    log::debug!(
        "Renamed {} reference(s) across {} file(s)",
        outcome.references.len(),
        outcome.files.len()
    );
    outcome
}

/// Replace the name leaf of a declaration with one synthesized from a tag.
fn rename_declaration(workspace: &mut Workspace, decl: NodeRef, new_name: &str) -> Result<NodeRef> {
    let tree = workspace
        .tree_of(decl)
        .ok_or_else(|| anyhow!("declaration {:?} is stale", decl))?;
    let kind = tree.kind(decl.node);
    let name_node = doc::tag_name_node(tree, decl.node)
        .ok_or_else(|| anyhow!("declaration {:?} has no name", decl))?;
    let name_ref = workspace
        .node_ref(decl.file, name_node)
        .ok_or_else(|| anyhow!("declaration name of {:?} is not live", decl))?;

    let tag = match kind {
        NodeKind::TagClass => "class",
        NodeKind::TagAlias => "alias",
        NodeKind::GenericDef => "generic",
        other => bail!("{:?} does not declare a type", other),
    };
    let fragment = format!("---@{tag} {new_name}");
    let donor = parse(&fragment);
    let donor_name = donor
        .find_descendant_of_kind(donor.root(), kind)
        .and_then(|owner| doc::tag_name_node(&donor, owner))
        .ok_or_else(|| anyhow!("synthesized fragment {:?} declares no name", fragment))?;
    workspace.replace(name_ref, &donor, donor_name)
}

/// A new name must read back as exactly one type name.
fn validate_type_name(name: &str) -> Result<()> {
    let fragment = format!("---@type {name}");
    let tree = parse(&fragment);
    let refs = tree.descendants_of_kind(tree.root(), NodeKind::ClassNameRef);
    match refs.as_slice() {
        [only] if tree.text(*only) == name => Ok(()),
        _ => bail!("'{name}' is not a valid type name"),
    }
}
