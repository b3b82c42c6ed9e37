//
// state.rs
//
// Project state: parsed files, the type index and the analysis settings
//

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use rayon::prelude::*;
use url::Url;
use walkdir::WalkDir;

use crate::config::{should_skip_directory, AnalysisConfig};
use crate::index::{SearchContext, TypeIndex};
use crate::perf::TimingGuard;
use crate::reference::ResolveContext;
use crate::syntax::{parse, SyntaxTree};
use crate::workspace::{FileId, Workspace};

/// URL of the virtual file declaring the builtin types
pub const BUILTIN_URL: &str = "luadoc:builtin.lua";

const BUILTIN_TYPES: &[&str] = &[
    "nil", "boolean", "number", "integer", "string", "table", "function", "userdata", "thread", "any", "void",
    "self",
];

/// Source text of the builtin prelude.
pub fn builtin_source() -> String {
    BUILTIN_TYPES
        .iter()
        .map(|name| format!("---@class {name}\n"))
        .collect()
}

/// All state the analysis features work on
#[derive(Debug)]
pub struct ProjectState {
    pub workspace: Workspace,
    pub index: TypeIndex,
    pub config: AnalysisConfig,
    pub search: SearchContext,
}

impl Default for ProjectState {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

impl ProjectState {
    pub fn new(config: AnalysisConfig) -> Self {
        let mut state = Self {
            workspace: Workspace::new(),
            index: TypeIndex::new(config.index_config()),
            config,
            search: SearchContext::project(),
        };
        if state.config.load_builtins {
            if let Ok(url) = Url::parse(BUILTIN_URL) {
                state.open_file(url, &builtin_source());
            }
        }
        state
    }

    pub fn cx(&self) -> ResolveContext<'_> {
        ResolveContext {
            workspace: &self.workspace,
            types: &self.index,
            search: &self.search,
        }
    }

    pub fn open_file(&mut self, url: Url, text: &str) -> FileId {
        self.insert_tree(url, parse(text))
    }

    /// Re-parse a known file. Handles into its previous parse become stale.
    pub fn update_file(&mut self, url: Url, text: &str) -> FileId {
        log::trace!("Updating {}", url);
        self.open_file(url, text)
    }

    pub fn insert_tree(&mut self, url: Url, tree: SyntaxTree) -> FileId {
        let file = self.workspace.insert_tree(url, tree);
        self.index.index_file(&self.workspace, file);
        file
    }

    pub fn remove_file(&mut self, url: &Url) -> Option<FileId> {
        let file = self.workspace.remove_file(url)?;
        self.index.remove_file(file);
        log::debug!("Removed {}", url);
        Some(file)
    }

    /// Refresh the index entries of `file` after an in-place tree edit.
    pub fn reindex(&self, file: FileId) {
        self.index.index_file(&self.workspace, file);
    }

    /// Scan `root`, parse every matching file in parallel and add it.
    ///
    /// Returns the number of files loaded.
    pub fn load_directory(&mut self, root: &Path) -> Result<usize> {
        let _guard = TimingGuard::new("load_directory");
        let files = scan_directory(root, &self.config)?;
        let parsed = parse_files(files);
        let count = parsed.len();
        for (url, tree) in parsed {
            self.insert_tree(url, tree);
        }
        log::info!("Loaded {} file(s) from {}", count, root.display());
        Ok(count)
    }

    pub fn file_for_path(&self, path: &Path) -> Option<FileId> {
        let url = path_to_url(path).ok()?;
        self.workspace.file_id(&url)
    }
}

/// A discovered source file with its contents
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub url: Url,
    pub text: String,
}

/// Discover source files under `root` (or `root` itself if it is a file).
///
/// Skips ignored directories, files with other extensions and files over
/// the size limit. Results are sorted by path.
pub fn scan_directory(root: &Path, config: &AnalysisConfig) -> Result<Vec<ScannedFile>> {
    let root = root
        .canonicalize()
        .with_context(|| format!("cannot access {}", root.display()))?;

    let mut files = Vec::new();
    let walker = WalkDir::new(&root).into_iter().filter_entry(|entry| {
        entry.depth() == 0
            || !entry.file_type().is_dir()
            || !entry.file_name().to_str().is_some_and(should_skip_directory)
    });

    for entry in walker.filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() || !config.matches_extension(entry.path()) {
            continue;
        }
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        if size > config.max_file_size_bytes {
            log::warn!(
                "Skipping {} ({} bytes exceeds limit of {})",
                entry.path().display(),
                size,
                config.max_file_size_bytes
            );
            continue;
        }
        let path = entry.into_path();
        let Ok(text) = std::fs::read_to_string(&path) else {
            log::debug!("Skipping unreadable file {}", path.display());
            continue;
        };
        let url = path_to_url(&path)?;
        files.push(ScannedFile { path, url, text });
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    log::debug!("Discovered {} file(s) under {}", files.len(), root.display());
    Ok(files)
}

/// Parse files in parallel, keeping their order.
pub fn parse_files(files: Vec<ScannedFile>) -> Vec<(Url, SyntaxTree)> {
    files
        .into_par_iter()
        .map(|file| {
            let tree = parse(&file.text);
            (file.url, tree)
        })
        .collect()
}

pub fn path_to_url(path: &Path) -> Result<Url> {
    Url::from_file_path(path).map_err(|_| anyhow!("not an absolute path: {}", path.display()))
}
