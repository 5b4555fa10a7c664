//! Per-file analysis orchestration.
//!
//! The model owns the checker instances and the per-file lifecycle: parse,
//! link, resolve symbols (including locally-imported sibling files), run
//! the selected checkers in their fixed order, and collect results per
//! category. All state is rebuilt per file; one bad file never aborts a
//! batch.

use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::ast::{Ast, Links};
use crate::checkers::{default_checkers, Checker, FileContext};
use crate::parser::PythonParser;
use crate::settings::Settings;
use crate::violations::{Category, FileResults, Rule, Sink, Violation};

use super::records::SymbolTable;
use super::resolver::SymbolResolver;

/// Analysis driver for one file at a time.
pub struct Model {
    settings: Settings,
    checkers: Vec<Box<dyn Checker>>,
}

impl Model {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            checkers: default_checkers(),
        }
    }

    /// Analyse one file on disk.
    pub fn analyse_file(&mut self, path: &Path) -> FileResults {
        let label = path.display().to_string();
        match fs::read_to_string(path) {
            Ok(source) => self.analyse_source(&source, path.parent(), &label),
            Err(_) => {
                let mut results = FileResults::new(&label);
                results.categories.push((
                    Category::AnalysisError,
                    vec![Violation {
                        rule: Rule::ToolError,
                        args: vec![label.clone()],
                        line: 0,
                        status: false,
                    }],
                ));
                results
            }
        }
    }

    /// Analyse source text. `dir` is the containing directory, used to
    /// resolve locally-imported sibling files.
    pub fn analyse_source(&mut self, source: &str, dir: Option<&Path>, label: &str) -> FileResults {
        let mut results = FileResults::new(label);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run_checks(source, dir)));
        match outcome {
            Ok(categories) => results.categories = categories,
            Err(_) => {
                // Partially-built checker state is unusable after a
                // panic; start the components over.
                self.checkers = default_checkers();
                results.categories.push((
                    Category::AnalysisError,
                    vec![Violation {
                        rule: Rule::ToolError,
                        args: vec![label.to_string()],
                        line: 0,
                        status: false,
                    }],
                ));
            }
        }
        results
    }

    fn run_checks(&mut self, source: &str, dir: Option<&Path>) -> Vec<(Category, Vec<Violation>)> {
        let parsed = match PythonParser::parse(source) {
            Ok(parsed) if !parsed.has_errors => parsed,
            _ => {
                return vec![(
                    Category::FileError,
                    vec![Violation {
                        rule: Rule::SyntaxError,
                        args: Vec::new(),
                        line: 0,
                        status: false,
                    }],
                )];
            }
        };

        let links = Links::build(&parsed.ast);
        let symbols = self.pre_analyse(&parsed.ast, &links, dir);

        let settings = self.settings.clone();
        let selected = settings.selected_categories();
        let ctx = FileContext {
            ast: &parsed.ast,
            links: &links,
            source,
            symbols: &symbols,
            settings: &settings,
        };

        let mut sink = Sink::new(&settings.ignored_checks);
        let mut categories = Vec::new();
        for checker in &mut self.checkers {
            if !selected.contains(&checker.category()) {
                continue;
            }
            checker.visit(&ctx, &mut sink);
            checker.finalize(&ctx, &mut sink);
            categories.push((checker.category(), sink.drain()));
            checker.reset();
        }
        categories
    }

    /// Resolve the file's own symbols, then merge the function tables of
    /// locally-imported sibling files (`import helper` next to
    /// `helper.py`). Sibling parse failures are swallowed: that file is
    /// simply not merged, so the caller's diagnostics stay its own.
    fn pre_analyse(&self, ast: &Ast, links: &Links, dir: Option<&Path>) -> SymbolTable {
        let mut table = SymbolResolver::new().resolve(ast, links);
        let dir = match dir {
            Some(dir) => dir,
            None => return table,
        };

        let mut imported: Vec<String> = table.imports.keys().cloned().collect();
        imported.sort();

        for name in imported {
            let path = dir.join(format!("{}.py", name));
            if !path.is_file() {
                continue;
            }
            let content = match fs::read_to_string(&path) {
                Ok(content) => content,
                Err(_) => continue,
            };
            let parsed = match PythonParser::parse(&content) {
                Ok(parsed) if !parsed.has_errors => parsed,
                _ => continue,
            };
            let lib_links = Links::build(&parsed.ast);
            let lib_table = SymbolResolver::with_library(&name).resolve(&parsed.ast, &lib_links);

            for (key, record) in lib_table.functions {
                // Never overwrite a local definition.
                table.functions.entry(key).or_insert(record);
            }
            table.linked_libraries.push(name);
        }
        table
    }
}

/// Analyse a batch of files, one model per file, in parallel. Results are
/// sorted by path for deterministic output.
pub fn analyse_batch(settings: &Settings, paths: &[PathBuf]) -> Vec<FileResults> {
    let mut results: Vec<FileResults> = paths
        .par_iter()
        .map(|path| Model::new(settings.clone()).analyse_file(path))
        .collect();
    results.sort_by(|a, b| a.path.cmp(&b.path));
    results
}
