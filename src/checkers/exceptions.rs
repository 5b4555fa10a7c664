//! Exception-handling checks: try/except shape and exception handling
//! around file operations.

use crate::ast::query::{dotted_name, nearest_ancestor};
use crate::ast::{NodeId, NodeKind, NodeTag, FUNC_KINDS};
use crate::violations::{Category, Rule, Sink};

use super::{Checker, FileContext};

/// Read/write attribute names on file handles.
const FILE_OPERATIONS: &[&str] = &["read", "readline", "readlines", "write", "writelines"];

pub struct ExceptionChecker;

impl ExceptionChecker {
    pub fn new() -> Self {
        Self
    }

    /// Is the node inside a `try`, without crossing a function boundary?
    fn has_exception_handling(&self, ctx: &FileContext, node: NodeId) -> bool {
        nearest_ancestor(ctx.ast, ctx.links, node, &[NodeTag::Try], FUNC_KINDS).is_some()
    }

    fn check_try(&self, ctx: &FileContext, sink: &mut Sink, node: NodeId) {
        let ast = ctx.ast;
        let handlers = match ast.kind(node) {
            NodeKind::Try { handlers, .. } => handlers.clone(),
            _ => return,
        };

        sink.report(
            Rule::TryWithoutExcept,
            &[],
            ast.line(node),
            !handlers.is_empty(),
        );

        let count = handlers.len();
        for (index, &handler) in handlers.iter().enumerate() {
            let bare = matches!(ast.kind(handler), NodeKind::ExceptHandler { typ: None, .. });
            // A bare catch-all as the final branch of several is
            // conventional.
            if bare && count > 1 && index == count - 1 {
                continue;
            }
            sink.report(Rule::ExceptWithoutType, &[], ast.line(handler), !bare);
        }
    }

    fn check_open_call(&self, ctx: &FileContext, sink: &mut Sink, node: NodeId, func: NodeId) {
        if ctx.ast.name_of(func) == Some("open") {
            sink.report(
                Rule::OpenWithoutTry,
                &[],
                ctx.ast.line(node),
                self.has_exception_handling(ctx, node),
            );
        }
    }

    fn check_attribute(&self, ctx: &FileContext, sink: &mut Sink, node: NodeId, attr: &str) {
        let rule = if FILE_OPERATIONS.contains(&attr) {
            Rule::FileOperationWithoutTry
        } else if attr == "close" {
            Rule::CloseWithoutTry
        } else {
            return;
        };

        let name = match dotted_name(ctx.ast, node, 0) {
            Ok(name) => name,
            Err(_) => return,
        };
        sink.report(
            rule,
            &[name],
            ctx.ast.line(node),
            self.has_exception_handling(ctx, node),
        );
    }

    /// Iterating a file handle reads the file; it needs handling too.
    fn check_for_loop(&self, ctx: &FileContext, sink: &mut Sink, node: NodeId) {
        let ast = ctx.ast;
        let (target, iter) = match ast.kind(node) {
            NodeKind::For { target, iter, .. } => (*target, *iter),
            _ => return,
        };

        let iter_name = match ast.tag(iter) {
            NodeTag::Name | NodeTag::Attribute => match dotted_name(ast, iter, 0) {
                Ok(name) => name,
                Err(_) => return,
            },
            NodeTag::Call => match ast.kind(iter) {
                NodeKind::Call { func, args, .. }
                    if ast.name_of(*func) == Some("enumerate") && !args.is_empty() =>
                {
                    match dotted_name(ast, args[0], 0) {
                        Ok(name) => name,
                        Err(_) => return,
                    }
                }
                _ => return,
            },
            _ => return,
        };

        let is_handle = ctx
            .symbols
            .open_handles
            .iter()
            .any(|handle| handle.name == iter_name);
        if !is_handle {
            return;
        }

        let description = match ast.name_of(target) {
            Some(target_name) => format!("for {} in {}", target_name, iter_name),
            None => "for ... in ...".to_string(),
        };
        sink.report(
            Rule::FileIterationWithoutTry,
            &[description],
            ast.line(node),
            self.has_exception_handling(ctx, node),
        );
    }
}

impl Default for ExceptionChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl Checker for ExceptionChecker {
    fn category(&self) -> Category {
        Category::ExceptionHandling
    }

    fn visit(&mut self, ctx: &FileContext, sink: &mut Sink) {
        let ast = ctx.ast;
        for node in ast.walk(ast.root()) {
            match ast.kind(node) {
                NodeKind::Try { .. } => self.check_try(ctx, sink, node),
                NodeKind::Call { func, .. } => self.check_open_call(ctx, sink, node, *func),
                NodeKind::Attribute { attr, .. } => {
                    let attr = attr.clone();
                    self.check_attribute(ctx, sink, node, &attr);
                }
                NodeKind::For { .. } => self.check_for_loop(ctx, sink, node),
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
        let mut checker = ExceptionChecker::new();
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
    fn test_try_without_except() {
        let violations = run("try:\n    x = 1\nfinally:\n    pass\n");
        assert_eq!(defects(&violations, Rule::TryWithoutExcept), 1);
    }

    #[test]
    fn test_try_with_except_passes() {
        let violations = run("try:\n    x = 1\nexcept ValueError:\n    pass\n");
        assert_eq!(defects(&violations, Rule::TryWithoutExcept), 0);
    }

    #[test]
    fn test_single_bare_except_flagged() {
        let violations = run("try:\n    x = 1\nexcept:\n    pass\n");
        assert_eq!(defects(&violations, Rule::ExceptWithoutType), 1);
    }

    #[test]
    fn test_final_bare_except_of_many_exempt() {
        let violations = run(
            "try:\n    x = 1\nexcept ValueError:\n    pass\nexcept:\n    pass\n",
        );
        assert_eq!(defects(&violations, Rule::ExceptWithoutType), 0);
    }

    #[test]
    fn test_bare_except_in_middle_flagged() {
        let violations = run(
            "try:\n    x = 1\nexcept:\n    pass\nexcept ValueError:\n    pass\n",
        );
        assert_eq!(defects(&violations, Rule::ExceptWithoutType), 1);
    }

    #[test]
    fn test_open_without_try() {
        let violations = run("def f():\n    fh = open(\"a.txt\")\n    return fh\n");
        assert_eq!(defects(&violations, Rule::OpenWithoutTry), 1);
    }

    #[test]
    fn test_open_inside_try_passes() {
        let violations = run(
            "def f():\n    try:\n        fh = open(\"a.txt\")\n    except OSError:\n        return None\n    return fh\n",
        );
        assert_eq!(defects(&violations, Rule::OpenWithoutTry), 0);
    }

    #[test]
    fn test_try_in_caller_does_not_count() {
        // The function boundary stops the ancestor search.
        let violations = run(
            "def f():\n    fh = open(\"a.txt\")\n    return fh\n\ndef main():\n    try:\n        fh = f()\n    except OSError:\n        return None\n    return fh\n",
        );
        assert_eq!(defects(&violations, Rule::OpenWithoutTry), 1);
    }

    #[test]
    fn test_read_without_try() {
        let violations = run("def f(fh):\n    return fh.read()\n");
        assert_eq!(defects(&violations, Rule::FileOperationWithoutTry), 1);
    }

    #[test]
    fn test_close_without_try() {
        let violations = run("def f(fh):\n    fh.close()\n    return None\n");
        assert_eq!(defects(&violations, Rule::CloseWithoutTry), 1);
    }

    #[test]
    fn test_iterating_open_handle_without_try() {
        let violations = run(
            "def f():\n    fh = open(\"a.txt\")\n    for line in fh:\n        print(line)\n    fh.close()\n    return None\n",
        );
        assert_eq!(defects(&violations, Rule::FileIterationWithoutTry), 1);
    }

    #[test]
    fn test_iterating_enumerate_handle() {
        let violations = run(
            "def f():\n    fh = open(\"a.txt\")\n    for i, line in enumerate(fh):\n        print(line)\n    fh.close()\n    return None\n",
        );
        assert_eq!(defects(&violations, Rule::FileIterationWithoutTry), 1);
    }
}
