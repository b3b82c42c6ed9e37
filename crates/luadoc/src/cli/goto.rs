// cli/goto.rs - `luadoc goto` subcommand
//
// Loads a project and prints where the type name at a position is declared.
// Positions are 1-based `file:line:column`, columns counted in UTF-16 units.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};

use crate::cli::analysis_stats::load_config;
use crate::features::{goto_definition, NavigationTarget};
use crate::state::ProjectState;

#[derive(Debug, PartialEq, Eq)]
pub struct GotoArgs {
    pub path: PathBuf,
    pub file: PathBuf,
    pub line: u32,
    pub column: u32,
    pub json: bool,
    pub config: Option<PathBuf>,
}

/// Expected usage: `luadoc goto <path> <file>:<line>:<col> [--json] [--config <file>]`
pub fn parse_args(args: &mut impl Iterator<Item = String>) -> Result<GotoArgs, String> {
    let mut positional = Vec::new();
    let mut json = false;
    let mut config = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--json" => json = true,
            "--config" => {
                let file = args
                    .next()
                    .ok_or_else(|| "--config requires a file path".to_string())?;
                config = Some(PathBuf::from(file));
            }
            other if other.starts_with('-') => {
                return Err(format!("Unknown flag: '{}'", other));
            }
            _ => positional.push(arg),
        }
    }

    let [path, location] = <[String; 2]>::try_from(positional)
        .map_err(|_| "Expected <path> and <file>:<line>:<col>".to_string())?;
    let (file, line, column) = parse_location(&location)?;

    Ok(GotoArgs {
        path: PathBuf::from(path),
        file,
        line,
        column,
        json,
        config,
    })
}

/// Split `file:line:col`. The file part may itself contain colons.
fn parse_location(location: &str) -> Result<(PathBuf, u32, u32), String> {
    let mut parts = location.rsplitn(3, ':');
    let (Some(col), Some(line), Some(file)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("Invalid location '{}'; expected <file>:<line>:<col>", location));
    };
    let parse_pos = |s: &str, what: &str| -> Result<u32, String> {
        match s.parse::<u32>() {
            Ok(n) if n >= 1 => Ok(n),
            _ => Err(format!("Invalid {} '{}' in '{}'", what, s, location)),
        }
    };
    if file.is_empty() {
        return Err(format!("Missing file in '{}'", location));
    }
    Ok((PathBuf::from(file), parse_pos(line, "line")?, parse_pos(col, "column")?))
}

pub fn run_goto(args: &GotoArgs) -> Result<Option<NavigationTarget>> {
    let config = load_config(args.config.as_deref())?;
    let mut state = ProjectState::new(config);
    state.load_directory(&args.path)?;

    let file_path = if args.file.is_absolute() {
        args.file.clone()
    } else {
        args.path.join(&args.file)
    };
    let file_path = file_path
        .canonicalize()
        .with_context(|| format!("cannot access {}", file_path.display()))?;
    let file = state
        .file_for_path(&file_path)
        .ok_or_else(|| anyhow!("{} is not part of the project", file_path.display()))?;
    let offset = state
        .workspace
        .offset_at(file, args.line - 1, args.column - 1)
        .ok_or_else(|| anyhow!("line {} is past the end of {}", args.line, file_path.display()))?;

    Ok(goto_definition(&state, file, offset))
}

pub fn print_target(target: Option<&NavigationTarget>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&target)?);
        return Ok(());
    }
    match target {
        Some(t) => println!("{}:{}:{} {:?} {}", t.url, t.line + 1, t.column + 1, t.kind, t.name),
        None => println!("No definition found"),
    }
    Ok(())
}
