//! Integration tests for type name resolution over projects on disk.
//!
//! Run with: `cargo test -p luadoc --test workspace_resolution`

use std::path::Path;

use luadoc::config::AnalysisConfig;
use luadoc::features::{declaration_at, find_usages, goto_definition, rename, unresolved_references};
use luadoc::index::{SearchContext, TypeDefIndex};
use luadoc::reference::{ClassNameReference, Reference};
use luadoc::state::{path_to_url, ProjectState};
use luadoc::syntax::NodeKind;
use luadoc::workspace::FileId;

// ============================================================================
// Test Helpers
// ============================================================================

fn write(dir: &Path, rel: &str, text: &str) {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, text).unwrap();
}

fn load(dir: &Path) -> ProjectState {
    let mut state = ProjectState::default();
    state.load_directory(dir).unwrap();
    state
}

fn file(state: &ProjectState, dir: &Path, rel: &str) -> FileId {
    let path = dir.canonicalize().unwrap().join(rel);
    state.file_for_path(&path).unwrap()
}

fn text(state: &ProjectState, file: FileId) -> String {
    let tree = state.workspace.tree(file).unwrap();
    tree.text(tree.root()).into_owned()
}

fn offset(state: &ProjectState, file: FileId, needle: &str) -> usize {
    text(state, file).find(needle).unwrap()
}

const SHAPES: &str = "\
---@class Shape
---@field area fun(self: Shape): number
local Shape = {}

---@class Circle : Shape
---@field radius number
local Circle = {}
";

const UTIL: &str = "\
---@generic T
---@param list T[]
---@param pred fun(item: T): boolean
---@return T[]
local function filter(list, pred)
  local out = {}
  for _, item in ipairs(list) do
    ---@type T
    local current = item
    if pred(current) then
      out[#out + 1] = current
    end
  end
  return out
end

---@param shapes Shape[]
---@return Circle[]
function circles(shapes)
  return filter(shapes, function(s) return s.radius ~= nil end)
end
";

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_project_references_resolve_across_files() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "shapes.lua", SHAPES);
    write(dir.path(), "lib/util.lua", UTIL);
    write(dir.path(), "node_modules/ignored.lua", "---@type Ghost");

    let state = load(dir.path());
    let util = file(&state, dir.path(), "lib/util.lua");
    assert!(unresolved_references(&state, util).is_empty());
    assert!(state
        .file_for_path(&dir.path().canonicalize().unwrap().join("node_modules/ignored.lua"))
        .is_none());

    let shape = goto_definition(&state, util, offset(&state, util, "Shape[]")).unwrap();
    assert!(shape.url.ends_with("/shapes.lua"));
    assert_eq!(shape.kind, NodeKind::TagClass);
    assert_eq!((shape.line, shape.column), (0, 10));

    // `T` inside the loop body walks up to `filter`
    let t = goto_definition(&state, util, offset(&state, util, "@type T") + 6).unwrap();
    assert_eq!(t.kind, NodeKind::GenericDef);
    assert_eq!((t.line, t.column), (0, 12));
}

#[test]
fn test_usages_and_rename_across_files() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "shapes.lua", SHAPES);
    write(dir.path(), "lib/util.lua", UTIL);
    let mut state = load(dir.path());
    let shapes = file(&state, dir.path(), "shapes.lua");
    let util = file(&state, dir.path(), "lib/util.lua");

    let decl = declaration_at(&state, shapes, offset(&state, shapes, "Shape")).unwrap();
    let usages = find_usages(&state, decl);
    // fun(self: Shape), Circle : Shape, Shape[]
    assert_eq!(usages.len(), 3);

    let shape = offset(&state, util, "Shape[]");
    let outcome = rename(&mut state, util, shape, "Figure").unwrap();
    assert_eq!(outcome.references.len(), 3);
    assert_eq!(outcome.files, {
        let mut files = vec![shapes, util];
        files.sort();
        files
    });
    assert!(text(&state, shapes).starts_with("---@class Figure\n---@field area fun(self: Figure): number"));
    assert!(text(&state, shapes).contains("---@class Circle : Figure"));
    assert!(text(&state, util).contains("---@param shapes Figure[]"));

    let search = SearchContext::project();
    assert!(state.index.find_type_def("Shape", &search).is_none());
    let figure = state.index.find_type_def("Figure", &search).unwrap();
    assert_eq!(find_usages(&state, figure).len(), 3);
}

#[test]
fn test_edit_makes_old_handles_stale() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.lua", "---@class A\n---@type A\nlocal a");
    let mut state = load(dir.path());
    let a = file(&state, dir.path(), "a.lua");

    let tree = state.workspace.tree(a).unwrap();
    let node = tree.find_descendant_of_kind(tree.root(), NodeKind::ClassNameRef).unwrap();
    let reference = ClassNameReference::new(&state.workspace, state.workspace.node_ref(a, node).unwrap()).unwrap();
    assert!(reference.resolve(state.cx()).is_some());

    let url = path_to_url(&dir.path().canonicalize().unwrap().join("a.lua")).unwrap();
    state.update_file(url.clone(), "---@class B\n---@type A\nlocal a");
    assert_eq!(reference.resolve(state.cx()), None);
    assert_eq!(unresolved_references(&state, a).len(), 1);

    state.remove_file(&url);
    assert!(unresolved_references(&state, a).is_empty());
    assert!(state.index.find_type_def("B", &SearchContext::project()).is_none());
}

#[test]
fn test_scoped_search_without_builtins() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.lua", "---@class Item");
    write(
        dir.path(),
        "b.lua",
        "---@generic Item\n---@param x Item\nfunction f(x) end\n---@type string",
    );

    let mut state = ProjectState::new(AnalysisConfig {
        load_builtins: false,
        ..AnalysisConfig::default()
    });
    state.load_directory(dir.path()).unwrap();
    let b = file(&state, dir.path(), "b.lua");
    let item = offset(&state, b, "x Item") + 2;

    assert_eq!(goto_definition(&state, b, item).unwrap().kind, NodeKind::TagClass);
    state.search = SearchContext::files([b]);
    assert_eq!(goto_definition(&state, b, item).unwrap().kind, NodeKind::GenericDef);

    let names: Vec<_> = unresolved_references(&state, b)
        .into_iter()
        .map(|r| state.workspace.text(r).unwrap().into_owned())
        .collect();
    assert_eq!(names, vec!["string"]);
}
