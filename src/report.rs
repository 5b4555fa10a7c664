//! Output formatting for analysis results.
//!
//! Two formats:
//! - Pretty: colored terminal output grouped per file and category, with
//!   an explicit OK line for clean categories
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::Serialize;

use crate::violations::{FileResults, Severity, Violation};

// =============================================================================
// JSON format
// =============================================================================

#[derive(Serialize)]
struct JsonReport<'a> {
    version: &'a str,
    files: Vec<JsonFile>,
    total_defects: usize,
}

#[derive(Serialize)]
struct JsonFile {
    path: String,
    categories: Vec<JsonCategory>,
}

#[derive(Serialize)]
struct JsonCategory {
    category: String,
    violations: Vec<JsonViolation>,
}

#[derive(Serialize)]
struct JsonViolation {
    code: String,
    line: usize,
    status: bool,
    severity: String,
    message: String,
}

/// Write all results as a JSON document to stdout.
pub fn write_json(results: &[FileResults]) -> anyhow::Result<()> {
    let files = results
        .iter()
        .map(|file| JsonFile {
            path: file.path.clone(),
            categories: file
                .categories
                .iter()
                .map(|(category, violations)| JsonCategory {
                    category: category.as_str().to_string(),
                    violations: violations.iter().map(violation_to_json).collect(),
                })
                .collect(),
        })
        .collect();

    let report = JsonReport {
        version: env!("CARGO_PKG_VERSION"),
        files,
        total_defects: results.iter().map(|r| r.defect_count()).sum(),
    };

    let json = serde_json::to_string_pretty(&report)?;
    println!("{}", json);
    Ok(())
}

fn violation_to_json(v: &Violation) -> JsonViolation {
    JsonViolation {
        code: v.rule.as_str().to_string(),
        line: v.line,
        status: v.status,
        severity: v.severity().to_string(),
        message: v.message(),
    }
}

// =============================================================================
// Pretty format
// =============================================================================

/// Write human-readable results to stdout.
pub fn write_pretty(results: &[FileResults]) {
    println!();
    print!("  ");
    print!("{}", "tutorlint".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));

    for file in results {
        println!();
        println!("  {}", "=".repeat(60).dimmed());
        println!("  {}", file.path.blue());
        println!();

        for (category, violations) in &file.categories {
            let defects: Vec<&Violation> = violations.iter().filter(|v| !v.status).collect();
            if defects.is_empty() {
                println!("  {}: {}", category.title().bold(), "OK".green());
                continue;
            }

            println!("  {}:", category.title().bold());
            let mut sorted = defects;
            sorted.sort_by_key(|v| v.line);
            for violation in sorted {
                write_severity_tag(&violation.severity());
                if violation.line > 0 {
                    print!("{}", format!("line {:<4}", violation.line).dimmed());
                } else {
                    print!("{}", "         ".dimmed());
                }
                println!(" {}", violation.message());
            }
        }
    }

    println!();
    let total: usize = results.iter().map(|r| r.defect_count()).sum();
    if total == 0 {
        println!("  {}", "No violations detected.".green());
    } else {
        let plural = if total != 1 { "s" } else { "" };
        println!("  {}", format!("{} violation{} found.", total, plural).red());
    }
    println!();
}

fn write_severity_tag(severity: &Severity) {
    match severity {
        Severity::Error => print!("    {} ", "ERROR".red()),
        Severity::Warning => print!("    {} ", "WARN ".yellow()),
        Severity::Info => print!("    {} ", "INFO ".blue()),
    }
}
