//! Command-line interface for tutorlint.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::analysis;
use crate::report;
use crate::settings::Settings;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_VIOLATIONS: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Educational static analysis for beginner Python programs.
///
/// tutorlint builds a symbol model of each submission and checks it
/// against course coding conventions: file handling, functions, data
/// structures, library usage, exception handling and basic commands.
#[derive(Parser)]
#[command(name = "tutorlint")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyse files or directories of Python submissions
    #[command(visible_alias = "check")]
    Lint(LintArgs),
    /// Write a default settings file
    Init(InitArgs),
}

/// Arguments for the lint command.
#[derive(Parser)]
pub struct LintArgs {
    /// Paths to check (files or directories)
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Path to a settings YAML file (default: auto-discover)
    #[arg(short, long)]
    pub settings: Option<PathBuf>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Categories to run (comma-separated); overrides the settings file
    #[arg(short, long)]
    pub categories: Option<String>,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "tutorlint.yaml")]
    pub output: PathBuf,
}

/// Collect Python files under the given paths. Directories are walked
/// recursively, hidden directories skipped.
fn collect_files(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        for entry in WalkDir::new(path).follow_links(true).into_iter().filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            !(e.file_type().is_dir() && name.starts_with('.'))
        }) {
            let entry = entry?;
            if entry.file_type().is_file() {
                let ext = entry.path().extension().and_then(|e| e.to_str());
                if ext == Some("py") {
                    files.push(entry.path().to_path_buf());
                }
            }
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

/// Run the lint command.
pub fn run_lint(args: &LintArgs) -> anyhow::Result<i32> {
    if args.format != "pretty" && args.format != "json" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty' or 'json'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    let mut settings = match &args.settings {
        Some(path) => match Settings::parse_file(path) {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("Error parsing settings: {}", e);
                return Ok(EXIT_ERROR);
            }
        },
        None => Settings::discover()?,
    };

    if let Some(categories) = &args.categories {
        settings.categories = categories
            .split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
    }

    let files = collect_files(&args.paths)?;
    if files.is_empty() {
        eprintln!("Warning: no Python files to analyse");
        return Ok(EXIT_SUCCESS);
    }

    let results = analysis::analyse_batch(&settings, &files);

    match args.format.as_str() {
        "json" => report::write_json(&results)?,
        _ => report::write_pretty(&results),
    }

    let total_defects: usize = results.iter().map(|r| r.defect_count()).sum();
    if total_defects == 0 {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_VIOLATIONS)
    }
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.output.exists() {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            std::fs::create_dir_all(parent)?;
        }
    }

    std::fs::write(&args.output, Settings::template())?;

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to match your course conventions", args.output.display());
    println!("  2. Run: tutorlint lint <submissions> --settings {}", args.output.display());

    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_files_walks_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.py"), "x = 1\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not python").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("b.py"), "y = 2\n").unwrap();

        let files = collect_files(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.extension().unwrap() == "py"));
    }

    #[test]
    fn test_collect_files_skips_hidden_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".venv")).unwrap();
        std::fs::write(dir.path().join(".venv").join("hidden.py"), "z = 3\n").unwrap();
        std::fs::write(dir.path().join("visible.py"), "x = 1\n").unwrap();

        let files = collect_files(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(files.len(), 1);
    }
}
