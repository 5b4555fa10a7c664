//! File and library structure checks: imports, header comments and
//! top-level call discipline.

use crate::ast::query::nearest_ancestor;
use crate::ast::{NodeId, NodeKind, SCOPE_KINDS};
use crate::violations::{Category, Rule, Sink};

use super::{Checker, FileContext};

pub struct StructureChecker;

impl StructureChecker {
    pub fn new() -> Self {
        Self
    }

    fn check_import_scope(&self, ctx: &FileContext, sink: &mut Sink, node: NodeId, name: &str) {
        if nearest_ancestor(ctx.ast, ctx.links, node, SCOPE_KINDS, &[]).is_some() {
            sink.report(
                Rule::LocalImport,
                &[name.to_string()],
                ctx.ast.line(node),
                false,
            );
        }
    }

    /// Header comments within the first N lines of the file. All
    /// configured keywords must appear.
    fn check_header_comments(&self, ctx: &FileContext, sink: &mut Sink) {
        let n = ctx.settings.header_lines;
        let keywords = &ctx.settings.header_keywords;
        if keywords.is_empty() {
            return;
        }

        let mut missing: Vec<&String> = keywords.iter().collect();
        for line in ctx.source.lines().take(n) {
            missing.retain(|keyword| !line.contains(keyword.as_str()));
            if missing.is_empty() {
                break;
            }
        }
        sink.report(
            Rule::MissingHeaderComments,
            &[n.to_string()],
            1,
            missing.is_empty(),
        );
    }

    fn check_duplicate_imports(&self, ctx: &FileContext, sink: &mut Sink) {
        let mut keys: Vec<&String> = ctx.symbols.imports.keys().collect();
        keys.sort();
        for key in keys {
            let records = &ctx.symbols.imports[key];
            if records.len() < 2 {
                continue;
            }
            let mut tail: Vec<_> = records.iter().collect();
            tail.sort_by_key(|r| r.line);
            for record in tail.into_iter().skip(1) {
                let rule = if record.from_import {
                    Rule::DuplicateFromImport
                } else {
                    Rule::DuplicateImport
                };
                sink.report(rule, &[record.name.clone()], record.line, false);
            }
        }
    }

    /// Top-level call discipline: a single entry-point call is expected.
    fn check_top_level_calls(&self, ctx: &FileContext, sink: &mut Sink) {
        let ast = ctx.ast;
        let body = match ast.kind(ast.root()) {
            NodeKind::Module { body } => body.clone(),
            _ => return,
        };

        let mut call_count = 0usize;
        for stmt in body {
            let value = match ast.kind(stmt) {
                NodeKind::Expr { value } => *value,
                _ => continue,
            };
            let func = match ast.kind(value) {
                NodeKind::Call { func, .. } => *func,
                _ => continue,
            };
            call_count += 1;

            if let Some(name) = ast.name_of(func) {
                if ctx.symbols.functions.contains_key(name) && call_count > 1 {
                    sink.report(
                        Rule::ExtraEntryCall,
                        &[name.to_string(), call_count.to_string()],
                        ast.line(stmt),
                        false,
                    );
                }
            } else if let NodeKind::Attribute { value: base, attr } = ast.kind(func) {
                if let Some(base_name) = ast.name_of(*base) {
                    sink.report(
                        Rule::AttributeEntryCall,
                        &[base_name.to_string(), attr.clone()],
                        ast.line(stmt),
                        false,
                    );
                }
            }
        }
    }
}

impl Default for StructureChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl Checker for StructureChecker {
    fn category(&self) -> Category {
        Category::Library
    }

    fn visit(&mut self, ctx: &FileContext, sink: &mut Sink) {
        let ast = ctx.ast;
        for node in ast.walk(ast.root()) {
            match ast.kind(node) {
                NodeKind::Import { names } => {
                    for import in names.clone() {
                        self.check_import_scope(ctx, sink, node, &import.name);
                    }
                }
                NodeKind::ImportFrom { module, .. } => {
                    let module = module.clone();
                    self.check_import_scope(ctx, sink, node, &module);
                }
                _ => {}
            }
        }
    }

    fn finalize(&mut self, ctx: &FileContext, sink: &mut Sink) {
        self.check_header_comments(ctx, sink);
        self.check_duplicate_imports(ctx, sink);
        self.check_top_level_calls(ctx, sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::resolver::SymbolResolver;
    use crate::ast::Links;
    use crate::parser::PythonParser;
    use crate::settings::Settings;
    use crate::violations::Violation;

    fn run(source: &str) -> Vec<Violation> {
        let parsed = PythonParser::parse(source).unwrap();
        let links = Links::build(&parsed.ast);
        let symbols = SymbolResolver::new().resolve(&parsed.ast, &links);
        let settings = Settings::default();
        let ctx = FileContext {
            ast: &parsed.ast,
            links: &links,
            source,
            symbols: &symbols,
            settings: &settings,
        };
        let mut sink = Sink::new(&[]);
        let mut checker = StructureChecker::new();
        checker.visit(&ctx, &mut sink);
        checker.finalize(&ctx, &mut sink);
        sink.drain()
    }

    fn defects(violations: &[Violation], rule: Rule) -> usize {
        violations
            .iter()
            .filter(|v| v.rule == rule && !v.status)
            .count()
    }

    #[test]
    fn test_duplicate_import() {
        let violations = run("import os\nimport os\n");
        assert_eq!(defects(&violations, Rule::DuplicateImport), 1);
    }

    #[test]
    fn test_duplicate_from_import() {
        let violations = run("import os\nfrom os import path\n");
        assert_eq!(defects(&violations, Rule::DuplicateFromImport), 1);
    }

    #[test]
    fn test_import_inside_function() {
        let violations = run("def f():\n    import os\n    return os.name\n");
        assert_eq!(defects(&violations, Rule::LocalImport), 1);
    }

    #[test]
    fn test_header_comments_present() {
        let source = "# Author: A. Student\n# Date: 2024-01-31\nx = 1\n";
        let violations = run(source);
        assert_eq!(defects(&violations, Rule::MissingHeaderComments), 0);
        assert!(violations
            .iter()
            .any(|v| v.rule == Rule::MissingHeaderComments && v.status));
    }

    #[test]
    fn test_header_comments_missing() {
        let violations = run("x = 1\n");
        assert_eq!(defects(&violations, Rule::MissingHeaderComments), 1);
    }

    #[test]
    fn test_second_top_level_call_flagged() {
        let violations = run(
            "def main():\n    return 0\n\ndef extra():\n    return 1\n\nmain()\nextra()\n",
        );
        assert_eq!(defects(&violations, Rule::ExtraEntryCall), 1);
    }

    #[test]
    fn test_attribute_call_at_top_level() {
        let violations = run("import helpers\nhelpers.run()\n");
        assert_eq!(defects(&violations, Rule::AttributeEntryCall), 1);
    }

    #[test]
    fn test_single_entry_call_passes() {
        let violations = run("def main():\n    return 0\n\nmain()\n");
        assert_eq!(defects(&violations, Rule::ExtraEntryCall), 0);
    }
}
