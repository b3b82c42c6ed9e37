//
// config.rs
//
// Analysis configuration
//

use std::path::Path;

use anyhow::{Context, Result};

use crate::index::TypeIndexConfig;

/// Settings for loading and analysing a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Whether the builtin type prelude is declared
    pub load_builtins: bool,
    /// Maximum number of files in the type index
    pub max_files: usize,
    /// Files larger than this are skipped during discovery
    pub max_file_size_bytes: u64,
    /// File extensions (without the dot) picked up during discovery
    pub extensions: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            load_builtins: true,
            max_files: 5000,
            max_file_size_bytes: 512 * 1024,
            extensions: vec!["lua".to_string()],
        }
    }
}

impl AnalysisConfig {
    pub fn index_config(&self) -> TypeIndexConfig {
        TypeIndexConfig {
            max_files: self.max_files,
        }
    }

    /// Whether `path` has one of the configured extensions (case-insensitive).
    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }
}

/// Read the `luadoc` section of a settings object.
///
/// Returns `None` when the section is absent. Missing or mistyped fields keep
/// their defaults.
pub fn parse_analysis_config(settings: &serde_json::Value) -> Option<AnalysisConfig> {
    let section = settings.get("luadoc")?;
    let mut config = AnalysisConfig::default();

    if let Some(v) = section.get("loadBuiltins").and_then(|v| v.as_bool()) {
        config.load_builtins = v;
    }
    if let Some(v) = section.get("maxFiles").and_then(|v| v.as_u64()) {
        config.max_files = v as usize;
    }
    if let Some(v) = section.get("maxFileSizeBytes").and_then(|v| v.as_u64()) {
        config.max_file_size_bytes = v;
    }
    if let Some(list) = section.get("extensions").and_then(|v| v.as_array()) {
        let extensions: Vec<String> = list
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.trim_start_matches('.').to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if !extensions.is_empty() {
            config.extensions = extensions;
        }
    }

    log::debug!("Parsed analysis config: {:?}", config);
    Some(config)
}

/// Load a JSON settings file. A file without a `luadoc` section yields defaults.
pub fn load_config_file(path: &Path) -> Result<AnalysisConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let settings: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("invalid JSON in {}", path.display()))?;
    Ok(parse_analysis_config(&settings).unwrap_or_default())
}

/// Directories never descended into during discovery
pub fn should_skip_directory(name: &str) -> bool {
    matches!(
        name,
        ".git" | ".svn" | ".hg" | "node_modules" | ".luarocks" | "lua_modules" | ".vscode" | ".idea" | "target"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert!(config.load_builtins);
        assert_eq!(config.max_files, 5000);
        assert_eq!(config.max_file_size_bytes, 524288);
        assert_eq!(config.extensions, vec!["lua"]);
        assert_eq!(config.index_config().max_files, 5000);
    }

    #[test]
    fn test_missing_section() {
        assert_eq!(parse_analysis_config(&json!({ "other": {} })), None);
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config = parse_analysis_config(&json!({ "luadoc": { "maxFiles": 10 } })).unwrap();
        assert_eq!(config.max_files, 10);
        assert!(config.load_builtins);
        assert_eq!(config.extensions, vec!["lua"]);
    }

    #[test]
    fn test_full_section() {
        let config = parse_analysis_config(&json!({
            "luadoc": {
                "loadBuiltins": false,
                "maxFiles": 3,
                "maxFileSizeBytes": 100,
                "extensions": [".lua", "luau", ""]
            }
        }))
        .unwrap();
        assert!(!config.load_builtins);
        assert_eq!(config.max_file_size_bytes, 100);
        assert_eq!(config.extensions, vec!["lua", "luau"]);
    }

    #[test]
    fn test_mistyped_fields_are_ignored() {
        let config = parse_analysis_config(&json!({
            "luadoc": { "loadBuiltins": "no", "maxFiles": -1, "extensions": [] }
        }))
        .unwrap();
        assert_eq!(config, AnalysisConfig::default());
    }

    #[test]
    fn test_matches_extension() {
        let config = AnalysisConfig::default();
        assert!(config.matches_extension(Path::new("a/b.lua")));
        assert!(config.matches_extension(Path::new("B.LUA")));
        assert!(!config.matches_extension(Path::new("b.luac")));
        assert!(!config.matches_extension(Path::new("lua")));
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("luadoc.json");
        std::fs::write(&path, r#"{ "luadoc": { "loadBuiltins": false } }"#).unwrap();
        assert!(!load_config_file(&path).unwrap().load_builtins);

        std::fs::write(&path, "{}").unwrap();
        assert_eq!(load_config_file(&path).unwrap(), AnalysisConfig::default());

        std::fs::write(&path, "not json").unwrap();
        let err = load_config_file(&path).unwrap_err();
        assert!(err.to_string().contains("invalid JSON"));
        assert!(load_config_file(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_should_skip_directory() {
        assert!(should_skip_directory(".git"));
        assert!(should_skip_directory("lua_modules"));
        assert!(should_skip_directory("target"));
        assert!(!should_skip_directory("src"));
        assert!(!should_skip_directory("lua"));
    }
}
