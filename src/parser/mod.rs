//! Parser boundary: tree-sitter-python to the typed AST.
//!
//! Parsing itself is delegated to the off-the-shelf tree-sitter grammar;
//! this module lowers the concrete syntax tree into the crate's arena AST.
//! Lowering is total: constructs the analysers have no interest in become
//! generic nodes that still expose their children, so traversal never
//! dead-ends. Comments and punctuation are dropped.

use once_cell::sync::Lazy;
use thiserror::Error;
use tree_sitter::{Language, Node as TsNode, Parser};

use crate::ast::{
    Ast, ConstValue, ImportName, Keyword, NodeId, NodeKind, Parameters, Pos, WithItem,
};

static PYTHON: Lazy<Language> = Lazy::new(|| tree_sitter_python::LANGUAGE.into());

/// Parse failure at the tree-sitter boundary.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("tree-sitter failed to produce a parse tree")]
    NoTree,
    #[error("failed to configure the Python grammar: {0}")]
    Language(String),
}

/// Result of parsing one file.
pub struct Parsed {
    pub ast: Ast,
    /// The grammar recovered from one or more syntax errors. The tree is
    /// still usable but the file should be reported as unparseable.
    pub has_errors: bool,
}

/// Parser for Python submissions.
pub struct PythonParser;

impl PythonParser {
    /// Parse source text and lower it into the typed AST.
    pub fn parse(source: &str) -> Result<Parsed, ParseError> {
        let mut parser = Parser::new();
        parser
            .set_language(&PYTHON)
            .map_err(|e| ParseError::Language(e.to_string()))?;

        let tree = parser.parse(source, None).ok_or(ParseError::NoTree)?;
        let has_errors = tree.root_node().has_error();

        let mut lowerer = Lowerer {
            source: source.as_bytes(),
            ast: Ast::new(),
        };
        let root = lowerer.lower_module(tree.root_node());
        let mut ast = lowerer.ast;
        ast.set_root(root);

        Ok(Parsed { ast, has_errors })
    }
}

struct Lowerer<'s> {
    source: &'s [u8],
    ast: Ast,
}

impl Lowerer<'_> {
    fn text(&self, node: TsNode) -> String {
        node.utf8_text(self.source).unwrap_or("").to_string()
    }

    fn pos(&self, node: TsNode) -> Pos {
        let start = node.start_position();
        Pos::new(start.row + 1, start.column)
    }

    fn add(&mut self, kind: NodeKind, node: TsNode) -> NodeId {
        let pos = self.pos(node);
        self.ast.add(kind, pos)
    }

    fn named_children<'t>(&self, node: TsNode<'t>) -> Vec<TsNode<'t>> {
        let mut cursor = node.walk();
        node.named_children(&mut cursor)
            .filter(|n| n.kind() != "comment")
            .collect()
    }

    fn lower_module(&mut self, root: TsNode) -> NodeId {
        let body = self.lower_statements(root);
        self.add(NodeKind::Module { body }, root)
    }

    /// Lower the statement children of a module or block node.
    fn lower_statements(&mut self, node: TsNode) -> Vec<NodeId> {
        self.named_children(node)
            .into_iter()
            .filter_map(|child| self.lower_statement(child))
            .collect()
    }

    /// Lower the suite of a compound statement (field `body` when present).
    fn lower_body(&mut self, node: TsNode, field: &str) -> Vec<NodeId> {
        if let Some(block) = node.child_by_field_name(field) {
            return self.lower_statements(block);
        }
        let blocks: Vec<TsNode> = self
            .named_children(node)
            .into_iter()
            .filter(|n| n.kind() == "block")
            .collect();
        match blocks.last() {
            Some(block) => self.lower_statements(*block),
            None => Vec::new(),
        }
    }

    fn lower_statement(&mut self, node: TsNode) -> Option<NodeId> {
        let lowered = match node.kind() {
            "comment" => return None,
            "import_statement" => {
                let names = self.lower_import_names(node);
                self.add(NodeKind::Import { names }, node)
            }
            "import_from_statement" | "future_import_statement" => {
                let module = node
                    .child_by_field_name("module_name")
                    .map(|m| self.text(m))
                    .unwrap_or_else(|| "__future__".to_string());
                let mut names = Vec::new();
                let mut cursor = node.walk();
                for name in node.children_by_field_name("name", &mut cursor) {
                    names.push(self.lower_import_alias(name));
                }
                if names.is_empty()
                    && self
                        .named_children(node)
                        .iter()
                        .any(|n| n.kind() == "wildcard_import")
                {
                    names.push(ImportName {
                        name: "*".to_string(),
                        alias: None,
                    });
                }
                self.add(NodeKind::ImportFrom { module, names }, node)
            }
            "global_statement" => {
                let names = self
                    .named_children(node)
                    .iter()
                    .map(|n| self.text(*n))
                    .collect();
                self.add(NodeKind::GlobalStmt { names }, node)
            }
            "expression_statement" => {
                let child = self.named_children(node).into_iter().next()?;
                match child.kind() {
                    "assignment" => self.lower_assignment(child)?,
                    "augmented_assignment" => self.lower_augmented(child)?,
                    _ => {
                        let value = self.lower_expression(child);
                        self.add(NodeKind::Expr { value }, node)
                    }
                }
            }
            "return_statement" => {
                let value = self
                    .named_children(node)
                    .into_iter()
                    .next()
                    .map(|v| self.lower_expression(v));
                self.add(NodeKind::Return { value }, node)
            }
            "raise_statement" => {
                let exc = self
                    .named_children(node)
                    .into_iter()
                    .next()
                    .map(|v| self.lower_expression(v));
                self.add(NodeKind::Raise { exc }, node)
            }
            "pass_statement" => self.add(NodeKind::Pass, node),
            "break_statement" => self.add(NodeKind::Break, node),
            "continue_statement" => self.add(NodeKind::Continue, node),
            "if_statement" => self.lower_if(node),
            "while_statement" => {
                let test = self.lower_field_expr(node, "condition");
                let body = self.lower_body(node, "body");
                let orelse = self.lower_else_clauses(node);
                self.add(NodeKind::While { test, body, orelse }, node)
            }
            "for_statement" => {
                let target = self.lower_field_expr(node, "left");
                let iter = self.lower_field_expr(node, "right");
                let body = self.lower_body(node, "body");
                let orelse = self.lower_else_clauses(node);
                self.add(
                    NodeKind::For {
                        target,
                        iter,
                        body,
                        orelse,
                    },
                    node,
                )
            }
            "try_statement" => self.lower_try(node),
            "with_statement" => self.lower_with(node),
            "function_definition" => self.lower_function(node, Vec::new()),
            "class_definition" => self.lower_class(node, Vec::new()),
            "decorated_definition" => self.lower_decorated(node)?,
            _ => {
                // delete/assert/match/nonlocal and anything the grammar
                // grows later: keep the children visible.
                let children = self
                    .named_children(node)
                    .into_iter()
                    .map(|c| self.lower_expression(c))
                    .collect();
                self.add(NodeKind::Other { children }, node)
            }
        };
        Some(lowered)
    }

    fn lower_import_names(&mut self, node: TsNode) -> Vec<ImportName> {
        self.named_children(node)
            .into_iter()
            .map(|child| self.lower_import_alias(child))
            .collect()
    }

    fn lower_import_alias(&mut self, node: TsNode) -> ImportName {
        if node.kind() == "aliased_import" {
            let name = node
                .child_by_field_name("name")
                .map(|n| self.text(n))
                .unwrap_or_default();
            let alias = node.child_by_field_name("alias").map(|n| self.text(n));
            ImportName { name, alias }
        } else {
            ImportName {
                name: self.text(node),
                alias: None,
            }
        }
    }

    /// Flatten chained assignments (`a = b = value`) into one target list.
    fn lower_assignment(&mut self, node: TsNode) -> Option<NodeId> {
        let mut targets = Vec::new();
        let mut current = node;
        loop {
            let left = current.child_by_field_name("left")?;
            targets.push(self.lower_expression(left));
            match current.child_by_field_name("right") {
                Some(right) if right.kind() == "assignment" => current = right,
                Some(right) => {
                    let value = self.lower_expression(right);
                    return Some(self.add(NodeKind::Assign { targets, value }, node));
                }
                // Bare annotation (`x: int`): nothing is assigned.
                None => {
                    return Some(self.add(NodeKind::Other { children: targets }, node));
                }
            }
        }
    }

    fn lower_augmented(&mut self, node: TsNode) -> Option<NodeId> {
        let target = self.lower_expression(node.child_by_field_name("left")?);
        let value = self.lower_expression(node.child_by_field_name("right")?);
        let op = node
            .child_by_field_name("operator")
            .map(|o| self.text(o))
            .unwrap_or_default();
        Some(self.add(NodeKind::AugAssign { target, op, value }, node))
    }

    fn lower_if(&mut self, node: TsNode) -> NodeId {
        let test = self.lower_field_expr(node, "condition");
        let body = self.lower_body(node, "consequence");

        // elif chains nest: each elif becomes an If in the else branch.
        let mut cursor = node.walk();
        let clauses: Vec<TsNode> = node
            .children_by_field_name("alternative", &mut cursor)
            .collect();
        let orelse = self.lower_elif_chain(&clauses);
        self.add(NodeKind::If { test, body, orelse }, node)
    }

    fn lower_elif_chain(&mut self, clauses: &[TsNode]) -> Vec<NodeId> {
        match clauses.split_first() {
            None => Vec::new(),
            Some((clause, rest)) => match clause.kind() {
                "elif_clause" => {
                    let test = self.lower_field_expr(*clause, "condition");
                    let body = self.lower_body(*clause, "consequence");
                    let orelse = self.lower_elif_chain(rest);
                    vec![self.add(NodeKind::If { test, body, orelse }, *clause)]
                }
                _ => self.lower_body(*clause, "body"),
            },
        }
    }

    fn lower_else_clauses(&mut self, node: TsNode) -> Vec<NodeId> {
        match node.child_by_field_name("alternative") {
            Some(clause) => self.lower_body(clause, "body"),
            None => Vec::new(),
        }
    }

    fn lower_try(&mut self, node: TsNode) -> NodeId {
        let body = self.lower_body(node, "body");
        let mut handlers = Vec::new();
        let mut orelse = Vec::new();
        let mut finalbody = Vec::new();

        for child in self.named_children(node) {
            match child.kind() {
                "except_clause" | "except_group_clause" => {
                    handlers.push(self.lower_except(child));
                }
                "else_clause" => orelse = self.lower_body(child, "body"),
                "finally_clause" => finalbody = self.lower_body(child, "body"),
                _ => {}
            }
        }

        self.add(
            NodeKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            },
            node,
        )
    }

    fn lower_except(&mut self, node: TsNode) -> NodeId {
        let mut typ = None;
        let mut name = None;
        let mut body = Vec::new();

        for child in self.named_children(node) {
            match child.kind() {
                "block" => body = self.lower_statements(child),
                "as_pattern" => {
                    if let Some(expr) = self.named_children(child).into_iter().next() {
                        typ = Some(self.lower_expression(expr));
                    }
                    name = child.child_by_field_name("alias").map(|a| self.text(a));
                }
                _ => typ = Some(self.lower_expression(child)),
            }
        }

        self.add(NodeKind::ExceptHandler { typ, name, body }, node)
    }

    fn lower_with(&mut self, node: TsNode) -> NodeId {
        let mut items = Vec::new();
        for child in self.named_children(node) {
            if child.kind() != "with_clause" {
                continue;
            }
            for item in self.named_children(child) {
                if item.kind() != "with_item" {
                    continue;
                }
                let value = match item.child_by_field_name("value") {
                    Some(v) => v,
                    None => continue,
                };
                if value.kind() == "as_pattern" {
                    let context = self
                        .named_children(value)
                        .into_iter()
                        .next()
                        .map(|c| self.lower_expression(c));
                    let alias = value.child_by_field_name("alias").map(|a| {
                        let id = self.text(a);
                        self.add(NodeKind::Name { id }, a)
                    });
                    if let Some(context) = context {
                        items.push(WithItem { context, alias });
                    }
                } else {
                    let context = self.lower_expression(value);
                    items.push(WithItem {
                        context,
                        alias: None,
                    });
                }
            }
        }
        let body = self.lower_body(node, "body");
        self.add(NodeKind::With { items, body }, node)
    }

    fn lower_function(&mut self, node: TsNode, decorators: Vec<NodeId>) -> NodeId {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n))
            .unwrap_or_default();
        let params = node
            .child_by_field_name("parameters")
            .map(|p| self.lower_parameters(p))
            .unwrap_or_default();
        let body = self.lower_body(node, "body");
        let is_async = node.child(0).map(|c| c.kind() == "async").unwrap_or(false);
        self.add(
            NodeKind::FunctionDef {
                name,
                params,
                body,
                decorators,
                is_async,
            },
            node,
        )
    }

    fn lower_class(&mut self, node: TsNode, decorators: Vec<NodeId>) -> NodeId {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n))
            .unwrap_or_default();
        let bases = node
            .child_by_field_name("superclasses")
            .map(|s| {
                self.named_children(s)
                    .into_iter()
                    .map(|b| self.lower_expression(b))
                    .collect()
            })
            .unwrap_or_default();
        let body = self.lower_body(node, "body");
        self.add(
            NodeKind::ClassDef {
                name,
                bases,
                body,
                decorators,
            },
            node,
        )
    }

    fn lower_decorated(&mut self, node: TsNode) -> Option<NodeId> {
        let mut decorators = Vec::new();
        for child in self.named_children(node) {
            if child.kind() == "decorator" {
                if let Some(expr) = self.named_children(child).into_iter().next() {
                    decorators.push(self.lower_expression(expr));
                }
            }
        }
        let definition = node.child_by_field_name("definition")?;
        match definition.kind() {
            "function_definition" => Some(self.lower_function(definition, decorators)),
            "class_definition" => Some(self.lower_class(definition, decorators)),
            _ => self.lower_statement(definition),
        }
    }

    fn lower_parameters(&mut self, node: TsNode) -> Parameters {
        let mut params = Parameters::default();
        let mut keyword_only = false;

        for child in self.named_children(node) {
            match child.kind() {
                "identifier" => {
                    let name = self.text(child);
                    if keyword_only {
                        params.kwonly_args.push(name);
                    } else {
                        params.pos_args.push(name);
                    }
                }
                "typed_parameter" => {
                    if let Some(inner) = self.named_children(child).into_iter().next() {
                        match inner.kind() {
                            "identifier" => {
                                let name = self.text(inner);
                                if keyword_only {
                                    params.kwonly_args.push(name);
                                } else {
                                    params.pos_args.push(name);
                                }
                            }
                            "list_splat_pattern" => {
                                params.has_vararg = true;
                                keyword_only = true;
                            }
                            "dictionary_splat_pattern" => params.has_kwarg = true,
                            _ => {}
                        }
                    }
                }
                "default_parameter" | "typed_default_parameter" => {
                    let name = child
                        .child_by_field_name("name")
                        .map(|n| self.text(n))
                        .unwrap_or_default();
                    if keyword_only {
                        params.kwonly_args.push(name);
                    } else {
                        params.pos_args.push(name);
                        params.default_count += 1;
                    }
                }
                "list_splat_pattern" => {
                    params.has_vararg = true;
                    keyword_only = true;
                }
                "keyword_separator" => keyword_only = true,
                "dictionary_splat_pattern" => params.has_kwarg = true,
                // positional_separator ("/") changes binding rules only.
                _ => {}
            }
        }
        params
    }

    fn lower_field_expr(&mut self, node: TsNode, field: &str) -> NodeId {
        match node.child_by_field_name(field) {
            Some(child) => self.lower_expression(child),
            None => self.add(NodeKind::Other { children: vec![] }, node),
        }
    }

    fn lower_expression(&mut self, node: TsNode) -> NodeId {
        match node.kind() {
            "identifier" => {
                let id = self.text(node);
                self.add(NodeKind::Name { id }, node)
            }
            "attribute" => {
                let value = self.lower_field_expr(node, "object");
                let attr = node
                    .child_by_field_name("attribute")
                    .map(|a| self.text(a))
                    .unwrap_or_default();
                self.add(NodeKind::Attribute { value, attr }, node)
            }
            "subscript" => {
                let value = self.lower_field_expr(node, "value");
                let index = self.lower_field_expr(node, "subscript");
                self.add(NodeKind::Subscript { value, index }, node)
            }
            "call" => self.lower_call(node),
            "binary_operator" => {
                let left = self.lower_field_expr(node, "left");
                let right = self.lower_field_expr(node, "right");
                let op = node
                    .child_by_field_name("operator")
                    .map(|o| self.text(o))
                    .unwrap_or_default();
                self.add(NodeKind::BinOp { left, op, right }, node)
            }
            "boolean_operator" => {
                let left = self.lower_field_expr(node, "left");
                let right = self.lower_field_expr(node, "right");
                let op = node
                    .child_by_field_name("operator")
                    .map(|o| self.text(o))
                    .unwrap_or_default();
                self.add(
                    NodeKind::BoolOp {
                        op,
                        values: vec![left, right],
                    },
                    node,
                )
            }
            "not_operator" => {
                let operand = self.lower_field_expr(node, "argument");
                self.add(
                    NodeKind::UnaryOp {
                        op: "not".to_string(),
                        operand,
                    },
                    node,
                )
            }
            "unary_operator" => {
                let operand = self.lower_field_expr(node, "argument");
                let op = node
                    .child_by_field_name("operator")
                    .map(|o| self.text(o))
                    .unwrap_or_default();
                self.add(NodeKind::UnaryOp { op, operand }, node)
            }
            "comparison_operator" => {
                let operands = self.named_children(node);
                let mut lowered: Vec<NodeId> = operands
                    .into_iter()
                    .map(|o| self.lower_expression(o))
                    .collect();
                if lowered.is_empty() {
                    self.add(NodeKind::Other { children: vec![] }, node)
                } else {
                    let left = lowered.remove(0);
                    self.add(
                        NodeKind::Compare {
                            left,
                            comparators: lowered,
                        },
                        node,
                    )
                }
            }
            "conditional_expression" => {
                let parts = self.named_children(node);
                if parts.len() == 3 {
                    let body = self.lower_expression(parts[0]);
                    let test = self.lower_expression(parts[1]);
                    let orelse = self.lower_expression(parts[2]);
                    self.add(NodeKind::IfExp { test, body, orelse }, node)
                } else {
                    let children = parts
                        .into_iter()
                        .map(|p| self.lower_expression(p))
                        .collect();
                    self.add(NodeKind::Other { children }, node)
                }
            }
            "lambda" => {
                let body = self.lower_field_expr(node, "body");
                self.add(NodeKind::Lambda { body }, node)
            }
            "tuple" | "expression_list" | "tuple_pattern" | "pattern_list" => {
                let elts = self.lower_all_children(node);
                self.add(NodeKind::Tuple { elts }, node)
            }
            "list" | "list_pattern" => {
                let elts = self.lower_all_children(node);
                self.add(NodeKind::List { elts }, node)
            }
            "set" => {
                let elts = self.lower_all_children(node);
                self.add(NodeKind::Set { elts }, node)
            }
            "dictionary" => {
                let mut items = Vec::new();
                for child in self.named_children(node) {
                    match child.kind() {
                        "pair" => {
                            items.push(self.lower_field_expr(child, "key"));
                            items.push(self.lower_field_expr(child, "value"));
                        }
                        _ => items.push(self.lower_expression(child)),
                    }
                }
                self.add(NodeKind::Dict { items }, node)
            }
            "string" | "concatenated_string" => {
                let value = ConstValue::Str(self.text(node));
                self.add(NodeKind::Constant { value }, node)
            }
            "integer" => {
                let value = ConstValue::Int(self.text(node));
                self.add(NodeKind::Constant { value }, node)
            }
            "float" => {
                let value = ConstValue::Float(self.text(node));
                self.add(NodeKind::Constant { value }, node)
            }
            "true" => self.add(
                NodeKind::Constant {
                    value: ConstValue::Bool(true),
                },
                node,
            ),
            "false" => self.add(
                NodeKind::Constant {
                    value: ConstValue::Bool(false),
                },
                node,
            ),
            "none" => self.add(
                NodeKind::Constant {
                    value: ConstValue::NoneLit,
                },
                node,
            ),
            "ellipsis" => self.add(
                NodeKind::Constant {
                    value: ConstValue::Ellipsis,
                },
                node,
            ),
            "parenthesized_expression" | "await" => match self.named_children(node).first() {
                Some(inner) => self.lower_expression(*inner),
                None => self.add(NodeKind::Other { children: vec![] }, node),
            },
            "yield" => self.lower_yield(node),
            "list_splat" | "list_splat_pattern" => {
                let value = match self.named_children(node).first() {
                    Some(inner) => self.lower_expression(*inner),
                    None => self.add(NodeKind::Other { children: vec![] }, node),
                };
                self.add(NodeKind::Starred { value }, node)
            }
            _ => {
                let children = self.lower_all_children(node);
                self.add(NodeKind::Other { children }, node)
            }
        }
    }

    fn lower_all_children(&mut self, node: TsNode) -> Vec<NodeId> {
        self.named_children(node)
            .into_iter()
            .map(|c| self.lower_expression(c))
            .collect()
    }

    fn lower_call(&mut self, node: TsNode) -> NodeId {
        let func = self.lower_field_expr(node, "function");
        let mut args = Vec::new();
        let mut keywords = Vec::new();

        if let Some(arguments) = node.child_by_field_name("arguments") {
            for child in self.named_children(arguments) {
                match child.kind() {
                    "keyword_argument" => {
                        let name = child.child_by_field_name("name").map(|n| self.text(n));
                        let value = self.lower_field_expr(child, "value");
                        keywords.push(Keyword { name, value });
                    }
                    "dictionary_splat" => {
                        let value = match self.named_children(child).first() {
                            Some(inner) => self.lower_expression(*inner),
                            None => self.add(NodeKind::Other { children: vec![] }, child),
                        };
                        keywords.push(Keyword { name: None, value });
                    }
                    _ => args.push(self.lower_expression(child)),
                }
            }
        }

        self.add(
            NodeKind::Call {
                func,
                args,
                keywords,
            },
            node,
        )
    }

    fn lower_yield(&mut self, node: TsNode) -> NodeId {
        let mut cursor = node.walk();
        let is_from = node
            .children(&mut cursor)
            .any(|c| !c.is_named() && c.kind() == "from");
        let value = self
            .named_children(node)
            .into_iter()
            .next()
            .map(|v| self.lower_expression(v));

        if is_from {
            let value = match value {
                Some(v) => v,
                None => self.add(NodeKind::Other { children: vec![] }, node),
            };
            self.add(NodeKind::YieldFrom { value }, node)
        } else {
            self.add(NodeKind::Yield { value }, node)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeTag;

    fn parse(source: &str) -> Parsed {
        PythonParser::parse(source).unwrap()
    }

    fn tags(parsed: &Parsed) -> Vec<NodeTag> {
        let ast = &parsed.ast;
        ast.walk(ast.root()).map(|id| ast.tag(id)).collect()
    }

    #[test]
    fn test_module_statements() {
        let parsed = parse("x = 1\ny = 2\n");
        let ast = &parsed.ast;
        assert!(!parsed.has_errors);
        match ast.kind(ast.root()) {
            NodeKind::Module { body } => assert_eq!(body.len(), 2),
            other => panic!("expected module, got {:?}", other.tag()),
        }
    }

    #[test]
    fn test_assignment_lowering() {
        let parsed = parse("count = 0\n");
        let ast = &parsed.ast;
        let assign = ast
            .walk(ast.root())
            .find(|id| ast.tag(*id) == NodeTag::Assign)
            .unwrap();
        match ast.kind(assign) {
            NodeKind::Assign { targets, value } => {
                assert_eq!(targets.len(), 1);
                assert_eq!(ast.name_of(targets[0]), Some("count"));
                assert!(matches!(ast.kind(*value), NodeKind::Constant { .. }));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_chained_assignment_flattens_targets() {
        let parsed = parse("a = b = 1\n");
        let ast = &parsed.ast;
        let assign = ast
            .walk(ast.root())
            .find(|id| ast.tag(*id) == NodeTag::Assign)
            .unwrap();
        match ast.kind(assign) {
            NodeKind::Assign { targets, .. } => assert_eq!(targets.len(), 2),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_function_parameters() {
        let parsed = parse("def f(a, b, c=1, *args, kw=None, **extra):\n    return a\n");
        let ast = &parsed.ast;
        let func = ast
            .walk(ast.root())
            .find(|id| ast.tag(*id) == NodeTag::FunctionDef)
            .unwrap();
        match ast.kind(func) {
            NodeKind::FunctionDef { name, params, .. } => {
                assert_eq!(name, "f");
                assert_eq!(params.pos_args, vec!["a", "b", "c"]);
                assert_eq!(params.default_count, 1);
                assert_eq!(params.kwonly_args, vec!["kw"]);
                assert!(params.has_vararg);
                assert!(params.has_kwarg);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_try_except_lowering() {
        let parsed = parse(
            "try:\n    x = 1\nexcept ValueError as e:\n    pass\nexcept:\n    pass\nfinally:\n    pass\n",
        );
        let ast = &parsed.ast;
        let try_stmt = ast
            .walk(ast.root())
            .find(|id| ast.tag(*id) == NodeTag::Try)
            .unwrap();
        match ast.kind(try_stmt) {
            NodeKind::Try {
                body,
                handlers,
                finalbody,
                ..
            } => {
                assert_eq!(body.len(), 1);
                assert_eq!(handlers.len(), 2);
                assert_eq!(finalbody.len(), 1);

                match ast.kind(handlers[0]) {
                    NodeKind::ExceptHandler { typ, name, .. } => {
                        assert!(typ.is_some());
                        assert_eq!(name.as_deref(), Some("e"));
                    }
                    _ => unreachable!(),
                }
                match ast.kind(handlers[1]) {
                    NodeKind::ExceptHandler { typ, .. } => assert!(typ.is_none()),
                    _ => unreachable!(),
                }
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_call_with_keywords() {
        let parsed = parse("open(\"data.txt\", mode=\"r\")\n");
        let ast = &parsed.ast;
        let call = ast
            .walk(ast.root())
            .find(|id| ast.tag(*id) == NodeTag::Call)
            .unwrap();
        match ast.kind(call) {
            NodeKind::Call {
                func,
                args,
                keywords,
            } => {
                assert_eq!(ast.name_of(*func), Some("open"));
                assert_eq!(args.len(), 1);
                assert_eq!(keywords.len(), 1);
                assert_eq!(keywords[0].name.as_deref(), Some("mode"));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_attribute_chain() {
        let parsed = parse("handle.close()\n");
        let ast = &parsed.ast;
        let attr = ast
            .walk(ast.root())
            .find(|id| ast.tag(*id) == NodeTag::Attribute)
            .unwrap();
        match ast.kind(attr) {
            NodeKind::Attribute { attr, .. } => assert_eq!(attr, "close"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_imports() {
        let parsed = parse("import os\nimport sys as system\nfrom pathlib import Path\n");
        let ast = &parsed.ast;
        let mut imports = Vec::new();
        for id in ast.walk(ast.root()) {
            match ast.kind(id) {
                NodeKind::Import { names } => imports.extend(names.iter().cloned()),
                NodeKind::ImportFrom { module, .. } => imports.push(ImportName {
                    name: module.clone(),
                    alias: None,
                }),
                _ => {}
            }
        }
        let names: Vec<&str> = imports.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["os", "sys", "pathlib"]);
        assert_eq!(imports[1].alias.as_deref(), Some("system"));
    }

    #[test]
    fn test_syntax_error_flag() {
        let parsed = parse("def broken(:\n");
        assert!(parsed.has_errors);
    }

    #[test]
    fn test_elif_nests_in_orelse() {
        let parsed = parse("if a:\n    pass\nelif b:\n    pass\nelse:\n    pass\n");
        let ast = &parsed.ast;
        let outer = ast
            .walk(ast.root())
            .find(|id| ast.tag(*id) == NodeTag::If)
            .unwrap();
        match ast.kind(outer) {
            NodeKind::If { orelse, .. } => {
                assert_eq!(orelse.len(), 1);
                assert_eq!(ast.tag(orelse[0]), NodeTag::If);
                match ast.kind(orelse[0]) {
                    NodeKind::If { orelse: inner, .. } => assert_eq!(inner.len(), 1),
                    _ => unreachable!(),
                }
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_with_statement_alias() {
        let parsed = parse("with open(\"f.txt\") as fh:\n    pass\n");
        let ast = &parsed.ast;
        let with = ast
            .walk(ast.root())
            .find(|id| ast.tag(*id) == NodeTag::With)
            .unwrap();
        match ast.kind(with) {
            NodeKind::With { items, .. } => {
                assert_eq!(items.len(), 1);
                assert_eq!(ast.tag(items[0].context), NodeTag::Call);
                let alias = items[0].alias.unwrap();
                assert_eq!(ast.name_of(alias), Some("fh"));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_yield_forms() {
        let parsed = parse("def g():\n    yield 1\n    yield from other()\n");
        let all = tags(&parsed);
        assert!(all.contains(&NodeTag::Yield));
        assert!(all.contains(&NodeTag::YieldFrom));
    }
}
