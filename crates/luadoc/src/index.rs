//
// index.rs
//
// Project-wide index of declared type names (`@class`, `@alias`)
//

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use indexmap::IndexMap;
use serde::Serialize;

use crate::syntax::{doc, NodeKind};
use crate::workspace::{FileId, NodeRef, Workspace};

// ============================================================================
// Search context
// ============================================================================

/// Which files a lookup may see.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SearchScope {
    /// Every indexed file
    #[default]
    Project,
    /// Only declarations from these files
    Files(HashSet<FileId>),
}

/// Caller-supplied context for symbol lookups.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchContext {
    pub scope: SearchScope,
}

impl SearchContext {
    pub fn project() -> Self {
        Self::default()
    }

    pub fn files(files: impl IntoIterator<Item = FileId>) -> Self {
        Self {
            scope: SearchScope::Files(files.into_iter().collect()),
        }
    }

    pub fn contains(&self, file: FileId) -> bool {
        match &self.scope {
            SearchScope::Project => true,
            SearchScope::Files(files) => files.contains(&file),
        }
    }
}

/// Exact-name lookup of global type declarations.
///
/// Implementations must be idempotent and free of observable side effects
/// (metrics aside).
pub trait TypeDefIndex {
    fn find_type_def(&self, name: &str, context: &SearchContext) -> Option<NodeRef>;
}

// ============================================================================
// Configuration & metrics
// ============================================================================

#[derive(Debug, Clone)]
pub struct TypeIndexConfig {
    /// Maximum files to index
    pub max_files: usize,
}

impl Default for TypeIndexConfig {
    fn default() -> Self {
        Self { max_files: 5000 }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TypeIndexMetrics {
    /// Lookups that found a declaration
    pub hits: u64,
    /// Lookups that found nothing in scope
    pub misses: u64,
    /// Declarations inserted
    pub insertions: u64,
    /// Declarations dropped because their file was re-indexed or removed
    pub invalidations: u64,
}

// ============================================================================
// Index
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: String,
    pub kind: NodeKind,
    pub node: NodeRef,
}

#[derive(Debug, Default)]
struct IndexInner {
    /// Declarations by name, ordered by `FileId` then position
    by_name: IndexMap<String, Vec<TypeDecl>>,
    /// Names each file contributed
    by_file: HashMap<FileId, Vec<String>>,
}

/// In-memory `TypeDefIndex` fed from parsed files.
///
/// Uses RwLock for interior mutability so analysis threads can share it.
#[derive(Debug, Default)]
pub struct TypeIndex {
    inner: RwLock<IndexInner>,
    version: AtomicU64,
    config: TypeIndexConfig,
    metrics: RwLock<TypeIndexMetrics>,
}

impl TypeIndex {
    pub fn new(config: TypeIndexConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Monotonic counter bumped on every mutation.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// (Re)index every type declaration of `file`.
    ///
    /// Returns the number of declarations indexed. Files past `max_files`
    /// are skipped.
    pub fn index_file(&self, workspace: &Workspace, file: FileId) -> usize {
        let Some(tree) = workspace.tree(file) else {
            self.remove_file(file);
            return 0;
        };

        let mut decls = Vec::new();
        for comment in doc::doc_comments(tree) {
            for &tag in tree.children(comment) {
                if !tree.kind(tag).is_type_declaration() {
                    continue;
                }
                let (Some(name), Some(node)) = (doc::tag_name(tree, tag), workspace.node_ref(file, tag)) else {
                    continue;
                };
                decls.push(TypeDecl {
                    name: name.to_string(),
                    kind: tree.kind(tag),
                    node,
                });
            }
        }

        let Ok(mut inner) = self.inner.write() else {
            return 0;
        };
        if !inner.by_file.contains_key(&file) && inner.by_file.len() >= self.config.max_files {
            log::warn!(
                "Type index limit reached ({} files); not indexing {:?}",
                self.config.max_files,
                workspace.url(file)
            );
            return 0;
        }

        let invalidated = Self::drop_file(&mut inner, file);
        let count = decls.len();
        let mut names = Vec::with_capacity(count);
        for decl in decls {
            names.push(decl.name.clone());
            // Ordered by file registration, then document order, whatever the edit history
            let entries = inner.by_name.entry(decl.name.clone()).or_default();
            let at = entries.partition_point(|d| d.node.file <= file);
            entries.insert(at, decl);
        }
        inner.by_file.insert(file, names);
        drop(inner);

        if let Ok(mut metrics) = self.metrics.write() {
            metrics.invalidations += invalidated as u64;
            metrics.insertions += count as u64;
        }
        self.version.fetch_add(1, Ordering::SeqCst);
        log::debug!(
            "Indexed {} type declaration(s) from {:?}",
            count,
            workspace.url(file)
        );
        count
    }

    pub fn remove_file(&self, file: FileId) {
        let Ok(mut inner) = self.inner.write() else {
            return;
        };
        let invalidated = Self::drop_file(&mut inner, file);
        inner.by_file.remove(&file);
        drop(inner);
        if invalidated > 0 {
            if let Ok(mut metrics) = self.metrics.write() {
                metrics.invalidations += invalidated as u64;
            }
        }
        self.version.fetch_add(1, Ordering::SeqCst);
    }

    fn drop_file(inner: &mut IndexInner, file: FileId) -> usize {
        let Some(names) = inner.by_file.get(&file).cloned() else {
            return 0;
        };
        let mut dropped = 0;
        for name in names {
            if let Some(decls) = inner.by_name.get_mut(&name) {
                let before = decls.len();
                decls.retain(|d| d.node.file != file);
                dropped += before - decls.len();
                if decls.is_empty() {
                    inner.by_name.shift_remove(&name);
                }
            }
        }
        dropped
    }

    /// All declarations of `name`, earliest registered file first.
    pub fn declarations(&self, name: &str) -> Vec<TypeDecl> {
        self.inner
            .read()
            .ok()
            .and_then(|inner| inner.by_name.get(name).cloned())
            .unwrap_or_default()
    }

    /// Number of distinct declared names.
    pub fn len(&self) -> usize {
        self.inner.read().map(|i| i.by_name.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn indexed_files(&self) -> usize {
        self.inner.read().map(|i| i.by_file.len()).unwrap_or(0)
    }

    pub fn metrics(&self) -> TypeIndexMetrics {
        self.metrics.read().map(|m| m.clone()).unwrap_or_default()
    }
}

impl TypeDefIndex for TypeIndex {
    fn find_type_def(&self, name: &str, context: &SearchContext) -> Option<NodeRef> {
        let found = self.inner.read().ok().and_then(|inner| {
            inner
                .by_name
                .get(name)?
                .iter()
                .find(|d| context.contains(d.node.file))
                .map(|d| d.node)
        });

        if let Ok(mut metrics) = self.metrics.write() {
            if found.is_some() {
                metrics.hits += 1;
            } else {
                metrics.misses += 1;
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn url(name: &str) -> Url {
        Url::parse(&format!("file:///project/{name}")).unwrap()
    }

    fn indexed(files: &[(&str, &str)]) -> (Workspace, TypeIndex, Vec<FileId>) {
        let mut ws = Workspace::new();
        let index = TypeIndex::default();
        let ids: Vec<FileId> = files.iter().map(|(n, t)| ws.set_file(url(n), t)).collect();
        for &id in &ids {
            index.index_file(&ws, id);
        }
        (ws, index, ids)
    }

    #[test]
    fn test_finds_class_and_alias() {
        let (ws, index, _) = indexed(&[("a.lua", "---@class Foo\nlocal Foo = {}\n---@alias Id string")]);
        let ctx = SearchContext::project();
        let foo = index.find_type_def("Foo", &ctx).unwrap();
        assert_eq!(ws.kind(foo), Some(NodeKind::TagClass));
        let id = index.find_type_def("Id", &ctx).unwrap();
        assert_eq!(ws.kind(id), Some(NodeKind::TagAlias));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_exact_name_match_only() {
        let (_, index, _) = indexed(&[("a.lua", "---@class Foo")]);
        let ctx = SearchContext::project();
        assert!(index.find_type_def("foo", &ctx).is_none());
        assert!(index.find_type_def("Fo", &ctx).is_none());
        assert!(index.find_type_def("", &ctx).is_none());
        let metrics = index.metrics();
        assert_eq!(metrics.misses, 3);
        assert_eq!(metrics.hits, 0);
    }

    #[test]
    fn test_first_declaration_wins() {
        let (_, index, ids) = indexed(&[("a.lua", "---@class Foo"), ("b.lua", "---@class Foo")]);
        let found = index.find_type_def("Foo", &SearchContext::project()).unwrap();
        assert_eq!(found.file, ids[0]);
        assert_eq!(index.declarations("Foo").len(), 2);
    }

    #[test]
    fn test_reindex_keeps_declaration_order() {
        let (mut ws, index, ids) = indexed(&[
            ("a.lua", "---@class Foo"),
            ("b.lua", "---@class Foo\n---@alias Foo string"),
        ]);
        ws.set_file(url("a.lua"), "local x = 1\n---@class Foo");
        index.index_file(&ws, ids[0]);

        let found = index.find_type_def("Foo", &SearchContext::project()).unwrap();
        assert_eq!(found.file, ids[0]);
        let kinds: Vec<_> = index
            .declarations("Foo")
            .iter()
            .map(|d| (d.node.file, d.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (ids[0], NodeKind::TagClass),
                (ids[1], NodeKind::TagClass),
                (ids[1], NodeKind::TagAlias),
            ]
        );

        // Re-indexing the later file does not move it ahead either
        index.index_file(&ws, ids[1]);
        assert_eq!(index.find_type_def("Foo", &SearchContext::project()).unwrap().file, ids[0]);
    }

    #[test]
    fn test_scope_restricts_files() {
        let (_, index, ids) = indexed(&[("a.lua", "---@class Foo"), ("b.lua", "---@class Foo")]);
        let found = index.find_type_def("Foo", &SearchContext::files([ids[1]])).unwrap();
        assert_eq!(found.file, ids[1]);
        assert!(index
            .find_type_def("Foo", &SearchContext::files(std::iter::empty()))
            .is_none());
    }

    #[test]
    fn test_reindex_replaces_file_entries() {
        let (mut ws, index, ids) = indexed(&[("a.lua", "---@class Foo")]);
        ws.set_file(url("a.lua"), "---@class Bar");
        index.index_file(&ws, ids[0]);
        let ctx = SearchContext::project();
        assert!(index.find_type_def("Foo", &ctx).is_none());
        let bar = index.find_type_def("Bar", &ctx).unwrap();
        assert!(ws.is_alive(bar));
        assert_eq!(index.metrics().invalidations, 1);
    }

    #[test]
    fn test_remove_file() {
        let (_, index, ids) = indexed(&[("a.lua", "---@class Foo"), ("b.lua", "---@class Bar")]);
        let before = index.version();
        index.remove_file(ids[0]);
        assert!(index.version() > before);
        assert!(index.find_type_def("Foo", &SearchContext::project()).is_none());
        assert!(index.find_type_def("Bar", &SearchContext::project()).is_some());
        assert_eq!(index.indexed_files(), 1);
    }

    #[test]
    fn test_generic_defs_are_not_global() {
        let (_, index, _) = indexed(&[("a.lua", "---@generic T\nfunction f() end")]);
        assert!(index.is_empty());
    }

    #[test]
    fn test_max_files_limit() {
        let mut ws = Workspace::new();
        let index = TypeIndex::new(TypeIndexConfig { max_files: 1 });
        let a = ws.set_file(url("a.lua"), "---@class A");
        let b = ws.set_file(url("b.lua"), "---@class B");
        assert_eq!(index.index_file(&ws, a), 1);
        assert_eq!(index.index_file(&ws, b), 0);
        // Re-indexing an already indexed file is still allowed
        assert_eq!(index.index_file(&ws, a), 1);
        assert!(index.find_type_def("B", &SearchContext::project()).is_none());
    }
}
