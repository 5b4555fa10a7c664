//! Basic-command checks: naming, discouraged commands, unreachable code
//! and non-terminating loops.

use lazy_static::lazy_static;
use regex::Regex;

use crate::ast::query::{dotted_name, is_always_true, nearest_ancestor, nearest_descendant};
use crate::ast::{NodeId, NodeKind, NodeTag};
use crate::violations::{Category, Rule, Sink};

use super::{Checker, FileContext};

lazy_static! {
    /// Valid identifiers: letters, digits and underscore, not starting
    /// with a digit.
    static ref VALID_NAME: Regex = Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").unwrap();
}

pub struct BasicsChecker;

impl BasicsChecker {
    pub fn new() -> Self {
        Self
    }

    fn check_valid_name(&self, sink: &mut Sink, name: &str, line: usize) {
        if name.is_empty() {
            return;
        }
        sink.report(
            Rule::InvalidName,
            &[name.to_string()],
            line,
            VALID_NAME.is_match(name),
        );
    }

    /// Statements following a terminating command are unreachable.
    fn check_unreachable(&self, ctx: &FileContext, sink: &mut Sink, stmt: NodeId, command: &str) {
        sink.report(
            Rule::UnreachableCode,
            &[command.to_string()],
            ctx.ast.line(stmt),
            ctx.links.next_sibling(stmt).is_none(),
        );
    }

    fn check_call(&self, ctx: &FileContext, sink: &mut Sink, node: NodeId, func: NodeId) {
        let ast = ctx.ast;
        if let Some(name) = ast.name_of(func) {
            if ctx.settings.discouraged_commands.iter().any(|c| c == name) {
                sink.report(
                    Rule::DiscouragedCommand,
                    &[name.to_string()],
                    ast.line(node),
                    false,
                );
            }
            if name == "exit" || name == "quit" {
                if let Some(stmt) = nearest_ancestor(ast, ctx.links, node, &[NodeTag::Expr], &[]) {
                    self.check_unreachable(ctx, sink, stmt, name);
                }
            }
        } else if let Ok(dotted) = dotted_name(ast, func, 0) {
            if dotted == "sys.exit" {
                if let Some(stmt) = nearest_ancestor(ast, ctx.links, node, &[NodeTag::Expr], &[]) {
                    self.check_unreachable(ctx, sink, stmt, "sys.exit");
                }
            }
        }
    }

    fn check_while(&self, ctx: &FileContext, sink: &mut Sink, node: NodeId, test: NodeId) {
        let ast = ctx.ast;
        let breaks_out = nearest_descendant(
            ast,
            node,
            &[NodeTag::Break, NodeTag::Return, NodeTag::Raise],
            &[],
        )
        .is_some();
        sink.report(
            Rule::InfiniteLoop,
            &[],
            ast.line(node),
            !is_always_true(ast, test) || breaks_out,
        );
    }
}

impl Default for BasicsChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl Checker for BasicsChecker {
    fn category(&self) -> Category {
        Category::Basic
    }

    fn visit(&mut self, ctx: &FileContext, sink: &mut Sink) {
        let ast = ctx.ast;
        for node in ast.walk(ast.root()) {
            let line = ast.line(node);
            match ast.kind(node) {
                NodeKind::Call { func, .. } => self.check_call(ctx, sink, node, *func),
                NodeKind::While { test, .. } => self.check_while(ctx, sink, node, *test),
                NodeKind::For { target, .. } => match ast.kind(*target) {
                    NodeKind::Tuple { elts } => {
                        for &elt in elts {
                            if let Some(name) = ast.name_of(elt) {
                                self.check_valid_name(sink, name, line);
                            }
                        }
                    }
                    NodeKind::Name { id } => self.check_valid_name(sink, id, line),
                    _ => {}
                },
                NodeKind::Assign { targets, .. } => {
                    for &target in targets {
                        if let Some(name) = ast.name_of(target) {
                            self.check_valid_name(sink, name, line);
                        }
                    }
                }
                NodeKind::FunctionDef { name, params, .. } => {
                    self.check_valid_name(sink, name, line);
                    for param in params.pos_args.iter().chain(params.kwonly_args.iter()) {
                        self.check_valid_name(sink, param, line);
                    }
                }
                NodeKind::ClassDef { name, .. } => self.check_valid_name(sink, name, line),
                NodeKind::With { items, .. } => {
                    for item in items {
                        if let Some(alias) = item.alias {
                            if let Some(name) = ast.name_of(alias) {
                                self.check_valid_name(sink, name, line);
                            }
                        }
                    }
                }
                NodeKind::ExceptHandler {
                    name: Some(name), ..
                } => self.check_valid_name(sink, name, line),
                NodeKind::Import { names } | NodeKind::ImportFrom { names, .. } => {
                    for import in names {
                        if let Some(alias) = &import.alias {
                            self.check_valid_name(sink, alias, line);
                        }
                    }
                }
                NodeKind::Return { .. } => self.check_unreachable(ctx, sink, node, "return"),
                NodeKind::Break => self.check_unreachable(ctx, sink, node, "break"),
                NodeKind::Continue => self.check_unreachable(ctx, sink, node, "continue"),
                NodeKind::Raise { .. } => self.check_unreachable(ctx, sink, node, "raise"),
                _ => {}
            }
        }
    }
}
