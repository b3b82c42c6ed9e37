//! Deterministic fixture project generator for benchmarks and tests.
//!
//! Generates synthetic Lua projects with a controlled number of files,
//! declared classes, annotated functions and nesting depth of generic
//! functions. No randomness, so benchmarks are reproducible.

use std::fmt::Write;
use std::path::Path;
use tempfile::TempDir;

/// Configuration for generating a fixture project.
#[derive(Debug, Clone)]
pub struct FixtureConfig {
    pub file_count: usize,
    pub classes_per_file: usize,
    pub functions_per_file: usize,
    /// Nesting depth of the closures inside each generic function
    pub generic_depth: usize,
    /// Type annotations per function that name a class from another file
    pub cross_file_refs: usize,
}

impl FixtureConfig {
    /// 10 files, 3 classes and 5 functions each.
    pub fn small() -> Self {
        Self {
            file_count: 10,
            classes_per_file: 3,
            functions_per_file: 5,
            generic_depth: 2,
            cross_file_refs: 1,
        }
    }

    /// 50 files, 5 classes and 10 functions each.
    pub fn medium() -> Self {
        Self {
            file_count: 50,
            classes_per_file: 5,
            functions_per_file: 10,
            generic_depth: 4,
            cross_file_refs: 2,
        }
    }

    /// 200 files, 10 classes and 20 functions each.
    pub fn large() -> Self {
        Self {
            file_count: 200,
            classes_per_file: 10,
            functions_per_file: 20,
            generic_depth: 6,
            cross_file_refs: 3,
        }
    }
}

/// Name of class `class_i` declared in file `index`.
pub fn class_name(index: usize, class_i: usize) -> String {
    format!("Class_{index}_{class_i}")
}

/// Generate the content of a single Lua file deterministically.
///
/// Each function declares a generic `T`, refers to it from the innermost
/// nested closure, and names classes of the following file.
pub fn generate_lua_file_content(index: usize, config: &FixtureConfig) -> String {
    let mut content = String::new();

    for class_i in 0..config.classes_per_file {
        writeln!(content, "---@class {}", class_name(index, class_i)).unwrap();
        writeln!(content, "---@field id integer").unwrap();
        writeln!(content, "local {} = {{}}", class_name(index, class_i)).unwrap();
        content.push('\n');
    }

    let next = (index + 1) % config.file_count.max(1);
    for func_i in 0..config.functions_per_file {
        writeln!(content, "---@generic T").unwrap();
        for ref_i in 0..config.cross_file_refs {
            let class_i = (func_i + ref_i) % config.classes_per_file.max(1);
            writeln!(content, "---@param p{} {}", ref_i, class_name(next, class_i)).unwrap();
        }
        writeln!(content, "---@return T|nil").unwrap();
        writeln!(content, "function func_{}_{}(value)", index, func_i).unwrap();

        let mut indent = String::from("    ");
        for _ in 0..config.generic_depth {
            writeln!(content, "{indent}local inner = function()").unwrap();
            indent.push_str("    ");
        }
        writeln!(content, "{indent}---@type T").unwrap();
        writeln!(content, "{indent}local x = value").unwrap();
        for _ in 0..config.generic_depth {
            indent.truncate(indent.len() - 4);
            writeln!(content, "{indent}end").unwrap();
        }
        writeln!(content, "end").unwrap();
        content.push('\n');
    }

    content
}

/// Create a temporary fixture project from the given configuration.
///
/// The directory is cleaned up when the `TempDir` is dropped.
pub fn create_fixture_workspace(config: &FixtureConfig) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory for fixture workspace");
    write_fixture_workspace(temp_dir.path(), config);
    temp_dir
}

/// Write fixture files into an existing directory.
pub fn write_fixture_workspace(dir: &Path, config: &FixtureConfig) {
    for i in 0..config.file_count {
        let content = generate_lua_file_content(i, config);
        let filename = format!("file_{}.lua", i);
        let filepath = dir.join(&filename);
        std::fs::write(&filepath, &content)
            .unwrap_or_else(|e| panic!("Failed to write fixture file {}: {}", filename, e));
    }
}
