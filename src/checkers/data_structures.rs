//! Data-structure checks: class usage and definition conventions.

use crate::ast::query::{dotted_name_parts, nearest_ancestor};
use crate::ast::{NodeId, NodeKind, NodeTag, SCOPE_KINDS};
use crate::violations::{Category, Rule, Sink};

use super::{Checker, FileContext};

pub struct DataStructureChecker;

impl DataStructureChecker {
    pub fn new() -> Self {
        Self
    }

    fn check_assign(&self, ctx: &FileContext, sink: &mut Sink, node: NodeId) {
        let ast = ctx.ast;
        let (targets, value) = match ast.kind(node) {
            NodeKind::Assign { targets, value } => (targets.clone(), *value),
            _ => return,
        };

        // Class attribute poked directly through the class name.
        for &target in &targets {
            if ast.tag(target) != NodeTag::Attribute {
                continue;
            }
            if let Ok(parts) = dotted_name_parts(ast, target, 0) {
                if let Some(root) = parts.first() {
                    if ctx.symbols.classes.contains_key(root) {
                        sink.report(
                            Rule::ClassUsedDirectly,
                            &[parts.join(".")],
                            ast.line(target),
                            false,
                        );
                    }
                }
            }
        }

        // `obj = CLASS` without parentheses never constructs anything.
        if let Some(name) = ast.name_of(value) {
            let qualified = nearest_ancestor(ast, ctx.links, node, SCOPE_KINDS, &[])
                .and_then(|parent| match ast.kind(parent) {
                    NodeKind::FunctionDef { name: p, .. } | NodeKind::ClassDef { name: p, .. } => {
                        Some(format!("{}.{}", p, name))
                    }
                    _ => None,
                });
            let known = ctx.symbols.classes.contains_key(name)
                || qualified
                    .map(|q| ctx.symbols.classes.contains_key(&q))
                    .unwrap_or(false);
            if known {
                sink.report(
                    Rule::MissingObjectParens,
                    &[name.to_string()],
                    ast.line(node),
                    false,
                );
            }
        }
    }

    fn check_class_def(&self, ctx: &FileContext, sink: &mut Sink, node: NodeId, name: &str) {
        let ast = ctx.ast;
        let line = ast.line(node);

        let nested = ast.col(node) > 0
            || nearest_ancestor(ast, ctx.links, node, SCOPE_KINDS, &[]).is_some();
        if nested {
            sink.report(Rule::NestedClass, &[name.to_string()], line, false);
        }

        if name != name.to_uppercase() {
            sink.report(
                Rule::ClassNameNotUppercase,
                &[name.to_string()],
                line,
                false,
            );
        }
    }
}

impl Default for DataStructureChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl Checker for DataStructureChecker {
    fn category(&self) -> Category {
        Category::DataStructure
    }

    fn visit(&mut self, ctx: &FileContext, sink: &mut Sink) {
        let ast = ctx.ast;
        for node in ast.walk(ast.root()) {
            match ast.kind(node) {
                NodeKind::Assign { .. } => self.check_assign(ctx, sink, node),
                NodeKind::ClassDef { name, .. } => {
                    let name = name.clone();
                    self.check_class_def(ctx, sink, node, &name);
                }
                _ => {}
            }
        }
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
        let mut checker = DataStructureChecker::new();
        checker.visit(&ctx, &mut sink);
        sink.drain()
    }

    fn defects(violations: &[Violation], rule: Rule) -> usize {
        violations
            .iter()
            .filter(|v| v.rule == rule && !v.status)
            .count()
    }

    #[test]
    fn test_class_attribute_used_directly() {
        let violations = run(
            "class ROW:\n    count = 0\n\ndef main():\n    ROW.count = 5\n    return None\n",
        );
        assert_eq!(defects(&violations, Rule::ClassUsedDirectly), 1);
    }

    #[test]
    fn test_object_creation_without_parens() {
        let violations = run("class ROW:\n    pass\n\ndef main():\n    item = ROW\n    return item\n");
        assert_eq!(defects(&violations, Rule::MissingObjectParens), 1);
    }

    #[test]
    fn test_object_creation_with_parens_passes() {
        let violations =
            run("class ROW:\n    pass\n\ndef main():\n    item = ROW()\n    return item\n");
        assert_eq!(defects(&violations, Rule::MissingObjectParens), 0);
    }

    #[test]
    fn test_nested_class_flagged() {
        let violations = run("def f():\n    class INNER:\n        pass\n    return INNER\n");
        assert_eq!(defects(&violations, Rule::NestedClass), 1);
    }

    #[test]
    fn test_lowercase_class_name_flagged() {
        let violations = run("class Row:\n    pass\n");
        assert_eq!(defects(&violations, Rule::ClassNameNotUppercase), 1);
    }

    #[test]
    fn test_uppercase_top_level_class_passes() {
        let violations = run("class ROW:\n    pass\n");
        assert_eq!(defects(&violations, Rule::NestedClass), 0);
        assert_eq!(defects(&violations, Rule::ClassNameNotUppercase), 0);
    }
}
