//! File-handling checks: left-open handles, closing discipline and file
//! operations crossing function boundaries.

use crate::ast::query::{dotted_name, nearest_ancestor};
use crate::ast::{NodeId, NodeKind, NodeTag, FUNC_KINDS};
use crate::violations::{Category, Rule, Sink};

use super::{Checker, FileContext};

/// Read/write attribute names on file handles.
const FILE_OPERATIONS: &[&str] = &["read", "readline", "readlines", "write", "writelines"];

/// One observed `handle.close` site.
struct CloseSite {
    name: String,
    node: NodeId,
    line: usize,
}

pub struct FileHandlingChecker {
    closed: Vec<CloseSite>,
}

impl FileHandlingChecker {
    pub fn new() -> Self {
        Self { closed: Vec::new() }
    }

    fn check_close(&mut self, ctx: &FileContext, sink: &mut Sink, node: NodeId, value: NodeId) {
        let ast = ctx.ast;
        let name = match dotted_name(ast, value, 0) {
            Ok(name) => name,
            Err(_) => return,
        };
        let line = ast.line(node);

        if nearest_ancestor(ast, ctx.links, node, &[NodeTag::ExceptHandler], &[]).is_some() {
            sink.report(Rule::CloseInExcept, &[name.clone()], line, false);
        }
        // `handle.close` without the call parentheses closes nothing.
        if nearest_ancestor(ast, ctx.links, node, &[NodeTag::Call], &[]).is_none() {
            sink.report(
                Rule::CloseWithoutCall,
                &[name.clone(), "close".to_string()],
                line,
                false,
            );
        }

        self.closed.push(CloseSite { name, node, line });
    }

    /// A read/write through a handle should live in the same function as
    /// the matching open and close.
    fn check_same_function(
        &self,
        ctx: &FileContext,
        sink: &mut Sink,
        node: NodeId,
        value: NodeId,
        attr: &str,
    ) {
        let ast = ctx.ast;
        let func = match nearest_ancestor(ast, ctx.links, node, FUNC_KINDS, &[]) {
            Some(func) => func,
            None => return,
        };
        let name = match ast.name_of(value) {
            Some(name) => name.to_string(),
            None => return,
        };
        let line = ast.line(node);

        let mut has_open = false;
        let mut has_close = false;
        for candidate in ast.walk(func) {
            match ast.kind(candidate) {
                NodeKind::With { .. } if ast.line(candidate) <= line => {
                    has_open = true;
                    has_close = true;
                    break;
                }
                NodeKind::Attribute { value, attr } if attr == "close" => {
                    if ast.name_of(*value) == Some(name.as_str()) {
                        has_close = true;
                    }
                }
                NodeKind::Assign { targets, value } => {
                    let target_matches = targets
                        .first()
                        .and_then(|t| ast.name_of(*t))
                        .map(|t| t == name)
                        .unwrap_or(false);
                    if target_matches {
                        if let NodeKind::Call { func, .. } = ast.kind(*value) {
                            if ast.name_of(*func) == Some("open") {
                                has_open = true;
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        if !(has_open && has_close) {
            sink.report(
                Rule::FileOperationElsewhere,
                &[name, attr.to_string()],
                line,
                false,
            );
        }
    }
}

impl Default for FileHandlingChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl Checker for FileHandlingChecker {
    fn category(&self) -> Category {
        Category::FileHandling
    }

    fn visit(&mut self, ctx: &FileContext, sink: &mut Sink) {
        let ast = ctx.ast;
        for node in ast.walk(ast.root()) {
            match ast.kind(node) {
                NodeKind::Attribute { value, attr } => {
                    if attr == "close" {
                        self.check_close(ctx, sink, node, *value);
                    } else if FILE_OPERATIONS.contains(&attr.as_str()) {
                        self.check_same_function(ctx, sink, node, *value, attr);
                    }
                }
                NodeKind::With { items, .. } => {
                    for item in items {
                        if let NodeKind::Call { func, .. } = ast.kind(item.context) {
                            if ast.name_of(*func) == Some("open") {
                                sink.report(
                                    Rule::WithOpenUsed,
                                    &["with open".to_string()],
                                    ast.line(node),
                                    false,
                                );
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Pair closes to opens: same name, same nearest enclosing function,
    /// close line at or after the open line, last match wins. Anything
    /// unmatched is left open.
    fn finalize(&mut self, ctx: &FileContext, sink: &mut Sink) {
        let ast = ctx.ast;
        let mut handles = ctx.symbols.open_handles.clone();

        for close in &self.closed {
            let close_scope = nearest_ancestor(ast, ctx.links, close.node, FUNC_KINDS, &[]);
            let mut matched: Option<usize> = None;
            for (index, handle) in handles.iter().enumerate() {
                if handle.name == close.name
                    && close.line >= handle.line
                    && nearest_ancestor(ast, ctx.links, handle.node, FUNC_KINDS, &[])
                        == close_scope
                {
                    matched = Some(index);
                }
            }
            if let Some(index) = matched {
                handles[index].closed_at = close.line;
            }
        }

        for handle in handles.iter().filter(|h| h.closed_at == 0) {
            sink.report(Rule::FileLeftOpen, &[handle.name.clone()], handle.line, false);
        }
    }

    fn reset(&mut self) {
        self.closed.clear();
    }
}
