//! Function checks: entry point, nesting, globals, recursion, call arity,
//! return discipline and module element order.

use std::collections::HashMap;

use crate::ast::query::{dotted_name_parts, nearest_ancestor};
use crate::ast::{Ast, ConstValue, Keyword, Links, NodeId, NodeKind, NodeTag, FUNC_KINDS, SCOPE_KINDS};
use crate::violations::{Category, Rule, Sink};

use super::{Checker, FileContext};

/// Method names denied inside classes; `*` matches everything. The
/// settings allowlist overrides this.
const DENIED_METHODS: &[&str] = &["*"];

pub struct FunctionChecker {
    /// Self-recursive call sites per qualified function key.
    recursive_calls: HashMap<String, Vec<usize>>,
}

impl FunctionChecker {
    pub fn new() -> Self {
        Self {
            recursive_calls: HashMap::new(),
        }
    }

    fn check_return_stmt(&self, ctx: &FileContext, sink: &mut Sink, node: NodeId) {
        let ast = ctx.ast;
        let line = ast.line(node);

        // A return whose parent is not the function body sits in the
        // middle of the function.
        let mid_function = ctx
            .links
            .parent(node)
            .map(|p| ast.tag(p) != NodeTag::FunctionDef)
            .unwrap_or(false);
        if mid_function {
            sink.defect(Rule::MidFunctionReturn, line);
        }

        let value = match ast.kind(node) {
            NodeKind::Return { value } => *value,
            _ => return,
        };
        let value = match value {
            Some(v) => v,
            None => {
                sink.defect(Rule::ReturnWithoutValue, line);
                return;
            }
        };

        match ast.kind(value) {
            // Keyword constants and containers read as deliberate values.
            NodeKind::Constant {
                value: ConstValue::Bool(_) | ConstValue::NoneLit | ConstValue::Ellipsis,
            } => {}
            NodeKind::Tuple { .. } => sink.defect(Rule::ReturnMultipleValues, line),
            NodeKind::Name { .. }
            | NodeKind::List { .. }
            | NodeKind::Dict { .. }
            | NodeKind::Set { .. }
            | NodeKind::Attribute { .. }
            | NodeKind::Call { .. } => {}
            NodeKind::Constant { .. } => sink.defect(Rule::ReturnConstant, line),
            _ => sink.defect(Rule::ReturnExpression, line),
        }
    }

    /// The function body must end in a return (or a trailing yield).
    fn check_function_end(&self, ctx: &FileContext, sink: &mut Sink, node: NodeId, name: &str) {
        let allowed = &ctx.settings.missing_return_allowed;
        if allowed.iter().any(|a| a == "*" || a == name) {
            return;
        }
        let body = match ctx.ast.kind(node) {
            NodeKind::FunctionDef { body, .. } => body,
            _ => return,
        };
        let ends_well = body.last().map(|&last| {
            match ctx.ast.kind(last) {
                NodeKind::Return { .. } => true,
                NodeKind::Expr { value } => matches!(
                    ctx.ast.tag(*value),
                    NodeTag::Yield | NodeTag::YieldFrom
                ),
                _ => false,
            }
        });
        if ends_well != Some(true) {
            sink.report(
                Rule::MissingReturn,
                &[name.to_string()],
                ctx.ast.line(node),
                false,
            );
        }
    }

    fn check_nested_function(&self, ctx: &FileContext, sink: &mut Sink, node: NodeId, name: &str) {
        let ast = ctx.ast;
        let nested = ast.col(node) > 0
            || nearest_ancestor(ast, ctx.links, node, SCOPE_KINDS, &[]).is_some();
        if !nested {
            return;
        }

        let allowed = &ctx.settings.allowed_method_names;
        let name_allowed = allowed.iter().any(|a| a == "*" || a == name);
        let name_denied = DENIED_METHODS.contains(&"*") || DENIED_METHODS.contains(&name);
        let inside_class =
            nearest_ancestor(ast, ctx.links, node, &[NodeTag::ClassDef], &[]).is_some();

        if (!name_allowed && name_denied) || !inside_class {
            sink.report(
                Rule::NestedFunction,
                &[name.to_string()],
                ast.line(node),
                false,
            );
        }
    }

    fn check_call(
        &mut self,
        ctx: &FileContext,
        sink: &mut Sink,
        node: NodeId,
        func: NodeId,
        args: &[NodeId],
        keywords: &[Keyword],
    ) {
        let ast = ctx.ast;
        let callee = match call_name(ast, func) {
            Some(name) => name,
            None => return,
        };

        // Direct self-recursion: the callee names the nearest enclosing
        // function. Recorded here, reported in finalize.
        if let Some(enclosing) = nearest_ancestor(ast, ctx.links, node, FUNC_KINDS, &[]) {
            if let NodeKind::FunctionDef { name, .. } = ast.kind(enclosing) {
                if *name == callee {
                    let key = qualified_key(ast, ctx.links, enclosing, name);
                    self.recursive_calls
                        .entry(key)
                        .or_default()
                        .push(ast.line(node));
                }
            }
        }

        self.check_parameters(ctx, sink, node, &callee, args, keywords);
    }

    fn check_parameters(
        &self,
        ctx: &FileContext,
        sink: &mut Sink,
        node: NodeId,
        callee: &str,
        args: &[NodeId],
        keywords: &[Keyword],
    ) {
        let record = match ctx.symbols.functions.get(callee) {
            Some(record) => record,
            None => return,
        };
        let params = &record.params;
        let line = ctx.ast.line(node);

        let expected = params.pos_args.len();
        let given = args.len();
        let required = expected.saturating_sub(params.default_count);

        if given < required {
            sink.report(
                Rule::TooFewArguments,
                &[callee.to_string(), expected.to_string(), given.to_string()],
                line,
                false,
            );
        } else if !params.has_vararg && given > expected {
            sink.report(
                Rule::TooManyArguments,
                &[callee.to_string(), expected.to_string(), given.to_string()],
                line,
                false,
            );
        }

        if !params.has_kwarg {
            for keyword in keywords {
                if let Some(name) = &keyword.name {
                    let known = params.pos_args.iter().any(|p| p == name)
                        || params.kwonly_args.iter().any(|p| p == name);
                    if !known {
                        sink.report(
                            Rule::InvalidKeywordArgument,
                            &[callee.to_string(), name.clone()],
                            line,
                            false,
                        );
                    }
                }
            }
        }
    }

    /// Assigning an attribute onto a known function object.
    fn check_function_attribute(
        &self,
        ctx: &FileContext,
        sink: &mut Sink,
        targets: &[NodeId],
    ) {
        let ast = ctx.ast;
        for &target in targets {
            if ast.tag(target) != NodeTag::Attribute {
                continue;
            }
            if let Ok(parts) = dotted_name_parts(ast, target, 0) {
                if let Some(root) = parts.first() {
                    if ctx.symbols.functions.contains_key(root) {
                        sink.report(
                            Rule::FunctionAttribute,
                            &[parts.join(".")],
                            ast.line(target),
                            false,
                        );
                    }
                }
            }
        }
    }

    fn check_yield(&self, ctx: &FileContext, sink: &mut Sink, node: NodeId, keyword: &str) {
        let ast = ctx.ast;
        if let Some(enclosing) = nearest_ancestor(ast, ctx.links, node, FUNC_KINDS, &[]) {
            if let NodeKind::FunctionDef { name, .. } = ast.kind(enclosing) {
                sink.report(
                    Rule::YieldUsed,
                    &[keyword.to_string(), name.clone()],
                    ast.line(node),
                    false,
                );
            }
        }
    }

    /// Module-body element order: docstring, imports, constants, classes,
    /// helper functions, the entry-point definition, the entry call.
    fn check_element_order(&self, ctx: &FileContext, sink: &mut Sink) {
        let ast = ctx.ast;
        let main = ctx.settings.main_function.as_str();

        struct Elem<'a> {
            tags: &'a [NodeTag],
            required: Vec<&'a str>,
            denied: Vec<&'a str>,
            docstring: bool,
        }
        let order = [
            Elem {
                tags: &[NodeTag::Expr],
                required: vec![],
                denied: vec![],
                docstring: true,
            },
            Elem {
                tags: &[NodeTag::Import, NodeTag::ImportFrom],
                required: vec![],
                denied: vec![],
                docstring: false,
            },
            Elem {
                tags: &[NodeTag::Assign],
                required: vec![],
                denied: vec![],
                docstring: false,
            },
            Elem {
                tags: &[NodeTag::ClassDef],
                required: vec![],
                denied: vec![],
                docstring: false,
            },
            Elem {
                tags: &[NodeTag::FunctionDef],
                required: vec![],
                denied: vec![main],
                docstring: false,
            },
            Elem {
                tags: &[NodeTag::FunctionDef],
                required: vec![main],
                denied: vec![],
                docstring: false,
            },
            Elem {
                tags: &[NodeTag::Expr],
                required: vec![main],
                denied: vec![],
                docstring: false,
            },
        ];

        let body = match ast.kind(ast.root()) {
            NodeKind::Module { body } => body.clone(),
            _ => return,
        };

        let mut cur = 0;
        'items: for item in body {
            for (offset, elem) in order[cur..].iter().enumerate() {
                if !elem.tags.contains(&ast.tag(item)) {
                    continue;
                }
                if elem.docstring {
                    if is_docstring(ast, item) {
                        // Only one docstring is allowed; move past it.
                        cur = cur + offset + 1;
                        continue 'items;
                    }
                    continue;
                }
                if element_name_valid(ast, item, &elem.required, &elem.denied) {
                    cur += offset;
                    continue 'items;
                }
            }
            sink.defect(Rule::ElementOrder, ast.line(item));
        }
    }
}

impl Default for FunctionChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl Checker for FunctionChecker {
    fn category(&self) -> Category {
        Category::Function
    }

    fn visit(&mut self, ctx: &FileContext, sink: &mut Sink) {
        let ast = ctx.ast;
        for node in ast.walk(ast.root()) {
            match ast.kind(node) {
                NodeKind::Assign { targets, .. } => {
                    self.check_function_attribute(ctx, sink, targets);
                }
                NodeKind::GlobalStmt { names } => {
                    for name in names {
                        sink.report(Rule::GlobalVariable, &[name.clone()], ast.line(node), false);
                    }
                }
                NodeKind::Return { .. } => self.check_return_stmt(ctx, sink, node),
                NodeKind::Call {
                    func,
                    args,
                    keywords,
                } => {
                    let (func, args, keywords) = (*func, args.clone(), keywords.clone());
                    self.check_call(ctx, sink, node, func, &args, &keywords);
                }
                NodeKind::FunctionDef { name, .. } => {
                    let name = name.clone();
                    self.check_function_end(ctx, sink, node, &name);
                    self.check_nested_function(ctx, sink, node, &name);
                }
                NodeKind::Yield { .. } => self.check_yield(ctx, sink, node, "yield"),
                NodeKind::YieldFrom { .. } => self.check_yield(ctx, sink, node, "yield from"),
                _ => {}
            }
        }
    }

    fn finalize(&mut self, ctx: &FileContext, sink: &mut Sink) {
        // Entry point must exist once anything is called at the top level.
        let main = &ctx.settings.main_function;
        if !ctx.symbols.calls.is_empty() && !ctx.symbols.functions.contains_key(main) {
            sink.report(Rule::MissingEntryPoint, &[main.clone()], 0, false);
        }

        self.check_element_order(ctx, sink);

        let mut globals: Vec<_> = ctx.symbols.globals.values().collect();
        globals.sort_by_key(|g| g.line);
        for global in globals {
            sink.report(Rule::GlobalVariable, &[global.name.clone()], global.line, false);
        }

        let mut shadowed: Vec<_> = ctx.symbols.shadowed.values().collect();
        shadowed.sort_by_key(|s| s.line);
        for shadow in shadowed {
            sink.report(
                Rule::ShadowedConstant,
                &[shadow.name.clone()],
                shadow.line,
                false,
            );
        }

        // Recursion verdict per function: a clean function is a positive
        // finding, every recorded self-call a defect.
        let mut keys: Vec<_> = ctx.symbols.functions.iter().collect();
        keys.sort_by(|a, b| a.0.cmp(b.0));
        for (key, record) in keys {
            match self.recursive_calls.get(key) {
                None => sink.report(Rule::RecursiveCall, &[], record.line, true),
                Some(lines) => {
                    for &line in lines {
                        sink.report(Rule::RecursiveCall, &[], line, false);
                    }
                }
            }
        }
    }

    fn reset(&mut self) {
        self.recursive_calls.clear();
    }
}

/// Callee name of a call: a bare name, or one attribute step on a bare
/// name (`obj.method`). Anything deeper is out of reach of the per-file
/// symbol tables.
fn call_name(ast: &Ast, func: NodeId) -> Option<String> {
    if let Some(name) = ast.name_of(func) {
        return Some(name.to_string());
    }
    if let NodeKind::Attribute { value, attr } = ast.kind(func) {
        if let Some(base) = ast.name_of(*value) {
            return Some(format!("{}.{}", base, attr));
        }
    }
    None
}

/// Qualified key of a function definition, matching the resolver's keys.
fn qualified_key(ast: &Ast, links: &Links, node: NodeId, name: &str) -> String {
    match nearest_ancestor(ast, links, node, SCOPE_KINDS, &[]) {
        Some(parent) => match ast.kind(parent) {
            NodeKind::FunctionDef { name: parent_name, .. }
            | NodeKind::ClassDef { name: parent_name, .. } => {
                format!("{}.{}", parent_name, name)
            }
            _ => name.to_string(),
        },
        None => name.to_string(),
    }
}

fn is_docstring(ast: &Ast, item: NodeId) -> bool {
    if let NodeKind::Expr { value } = ast.kind(item) {
        return matches!(
            ast.kind(*value),
            NodeKind::Constant {
                value: ConstValue::Str(_)
            }
        );
    }
    false
}

/// First name or identifier found in the element, validated against the
/// required/denied name lists.
fn element_name_valid(ast: &Ast, item: NodeId, required: &[&str], denied: &[&str]) -> bool {
    if required.is_empty() && denied.is_empty() {
        return true;
    }
    let mut found = "";
    for node in ast.walk(item) {
        match ast.kind(node) {
            NodeKind::FunctionDef { name, .. } | NodeKind::ClassDef { name, .. } => {
                found = name.as_str();
                break;
            }
            NodeKind::Name { id } => {
                found = id.as_str();
                break;
            }
            _ => {}
        }
    }
    if !required.is_empty() && !required.contains(&found) {
        return false;
    }
    if denied.contains(&found) {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::resolver::SymbolResolver;
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
        let mut checker = FunctionChecker::new();
        checker.visit(&ctx, &mut sink);
        checker.finalize(&ctx, &mut sink);
        checker.reset();
        sink.drain()
    }

    fn defects(violations: &[Violation], rule: Rule) -> usize {
        violations
            .iter()
            .filter(|v| v.rule == rule && !v.status)
            .count()
    }

    #[test]
    fn test_recursive_call_flagged() {
        let violations = run(
            "def fact(n):\n    if n < 2:\n        return 1\n    return fact(n - 1) * n\n",
        );
        assert_eq!(defects(&violations, Rule::RecursiveCall), 1);
    }

    #[test]
    fn test_recursion_free_function_is_positive() {
        let violations = run("def add(a, b):\n    return a + b\n");
        assert_eq!(defects(&violations, Rule::RecursiveCall), 0);
        assert!(violations
            .iter()
            .any(|v| v.rule == Rule::RecursiveCall && v.status));
    }

    #[test]
    fn test_missing_entry_point() {
        let violations = run("def helper():\n    return 1\n\nhelper()\n");
        assert_eq!(defects(&violations, Rule::MissingEntryPoint), 1);
    }

    #[test]
    fn test_entry_point_present_not_flagged() {
        let violations = run("def main():\n    return 0\n\nmain()\n");
        assert_eq!(defects(&violations, Rule::MissingEntryPoint), 0);
    }

    #[test]
    fn test_no_top_level_calls_no_entry_complaint() {
        let violations = run("def helper():\n    return 1\n");
        assert_eq!(defects(&violations, Rule::MissingEntryPoint), 0);
    }

    #[test]
    fn test_global_variable_flagged() {
        let violations = run("total = 0\ntotal = 1\n");
        assert_eq!(defects(&violations, Rule::GlobalVariable), 1);
    }

    #[test]
    fn test_constant_not_flagged_as_global() {
        let violations = run("LIMIT = 10\n");
        assert_eq!(defects(&violations, Rule::GlobalVariable), 0);
    }

    #[test]
    fn test_global_keyword_flagged() {
        let violations = run("def f():\n    global counter\n    counter = 1\n    return counter\n");
        assert!(defects(&violations, Rule::GlobalVariable) >= 1);
    }

    #[test]
    fn test_too_few_arguments() {
        let violations = run("def add(a, b):\n    return a + b\n\ndef main():\n    return add(1)\n");
        assert_eq!(defects(&violations, Rule::TooFewArguments), 1);
    }

    #[test]
    fn test_defaults_relax_arity() {
        let violations =
            run("def add(a, b=2):\n    return a + b\n\ndef main():\n    return add(1)\n");
        assert_eq!(defects(&violations, Rule::TooFewArguments), 0);
    }

    #[test]
    fn test_too_many_arguments() {
        let violations =
            run("def add(a, b):\n    return a + b\n\ndef main():\n    return add(1, 2, 3)\n");
        assert_eq!(defects(&violations, Rule::TooManyArguments), 1);
    }

    #[test]
    fn test_invalid_keyword_argument() {
        let violations =
            run("def add(a, b):\n    return a + b\n\ndef main():\n    return add(1, c=2)\n");
        assert_eq!(defects(&violations, Rule::InvalidKeywordArgument), 1);
    }

    #[test]
    fn test_nested_function_flagged() {
        let violations = run(
            "def outer():\n    def inner():\n        return 1\n    return inner()\n",
        );
        assert_eq!(defects(&violations, Rule::NestedFunction), 1);
    }

    #[test]
    fn test_init_method_allowed() {
        let violations = run(
            "class ITEM:\n    def __init__(self):\n        self.value = 0\n",
        );
        assert_eq!(defects(&violations, Rule::NestedFunction), 0);
    }

    #[test]
    fn test_missing_return_at_end() {
        let violations = run("def f(x):\n    y = x + 1\n");
        assert_eq!(defects(&violations, Rule::MissingReturn), 1);
    }

    #[test]
    fn test_mid_function_return() {
        let violations = run(
            "def f(x):\n    if x:\n        return 1\n    return 2\n",
        );
        assert_eq!(defects(&violations, Rule::MidFunctionReturn), 1);
    }

    #[test]
    fn test_return_constant_flagged() {
        let violations = run("def f():\n    return 42\n");
        assert_eq!(defects(&violations, Rule::ReturnConstant), 1);
    }

    #[test]
    fn test_return_none_keyword_accepted() {
        let violations = run("def f():\n    return None\n");
        assert_eq!(defects(&violations, Rule::ReturnConstant), 0);
        assert_eq!(defects(&violations, Rule::ReturnExpression), 0);
    }

    #[test]
    fn test_return_expression_flagged() {
        let violations = run("def f(a, b):\n    return a + b\n");
        assert_eq!(defects(&violations, Rule::ReturnExpression), 1);
    }

    #[test]
    fn test_element_order_violation() {
        // A top-level assignment after function definitions is out of
        // order.
        let violations = run("def main():\n    return 0\n\nx = 1\n");
        assert_eq!(defects(&violations, Rule::ElementOrder), 1);
    }

    #[test]
    fn test_canonical_order_passes() {
        let source = "\"\"\"Module docstring.\"\"\"\nimport os\n\nMAX = 10\n\nclass ROW:\n    pass\n\ndef helper():\n    return 1\n\ndef main():\n    return helper()\n\nmain()\n";
        let violations = run(source);
        assert_eq!(defects(&violations, Rule::ElementOrder), 0);
    }

    #[test]
    fn test_shadowed_constant_reported() {
        let violations = run("LIMIT = 5\n\ndef f():\n    LIMIT = 3\n    return LIMIT\n");
        assert_eq!(defects(&violations, Rule::ShadowedConstant), 1);
    }

    #[test]
    fn test_yield_noted() {
        let violations = run("def gen():\n    yield 1\n");
        assert_eq!(defects(&violations, Rule::YieldUsed), 1);
    }
}
