//! Pre-analysis: the single-pass symbol resolver.
//!
//! One walk over the linked tree produces the per-file symbol tables:
//! imports, classes and functions under qualified keys, module-top-level
//! calls, opened file handles, and the global/constant classification of
//! every module-level assignment target.
//!
//! Constant promotion is a small state machine per target name:
//!
//! ```text
//! {no info} --literal assign--> tentative --2nd assign/mutation--> global
//!                               tentative --lock()--------------> constant
//! ```
//!
//! A container mutation through an attribute, subscript, augmented
//! assignment or a known mutating method call proves non-constant intent
//! and promotes the base name. An assignment to the same name inside a
//! nested scope is local shadowing, not mutation, and goes to a separate
//! table.

use std::collections::HashMap;

use crate::ast::query::{dotted_name, is_literal_like, nearest_ancestor};
use crate::ast::{Ast, Links, NodeId, NodeKind, NodeTag, SCOPE_KINDS};

use super::records::{
    CallRecord, ClassRecord, FileHandle, FunctionRecord, GlobalVariable, ImportRecord, SymbolTable,
};

/// List/dict/set methods that mutate their receiver. A call through one of
/// these on a tentative constant promotes it to a global.
static MUTATING_METHODS: phf::Set<&'static str> = phf::phf_set! {
    "append", "extend", "insert", "remove", "pop", "clear", "sort",
    "reverse", "update", "add", "discard", "popitem", "setdefault",
};

/// The name of the open-file primitive.
const OPEN_PRIMITIVE: &str = "open";

/// Single-pass symbol resolver. Create one per file (or per imported
/// sibling file, with [`SymbolResolver::with_library`]).
#[derive(Default)]
pub struct SymbolResolver {
    library: Option<String>,
    imports: HashMap<String, Vec<ImportRecord>>,
    classes: HashMap<String, ClassRecord>,
    functions: HashMap<String, FunctionRecord>,
    globals: HashMap<String, GlobalVariable>,
    tentative: HashMap<String, GlobalVariable>,
    constants: HashMap<String, GlobalVariable>,
    shadowed: HashMap<String, GlobalVariable>,
    calls: HashMap<String, CallRecord>,
    open_handles: Vec<FileHandle>,
}

impl SymbolResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Library-qualified mode for re-analysing an imported sibling file:
    /// every class/function/import key is prefixed with `"library."`.
    pub fn with_library(library: &str) -> Self {
        Self {
            library: Some(library.to_string()),
            ..Self::default()
        }
    }

    /// Run the pass over a linked tree and lock remaining tentative
    /// constants. Consumes the resolver.
    pub fn resolve(mut self, ast: &Ast, links: &Links) -> SymbolTable {
        for node in ast.walk(ast.root()) {
            match ast.kind(node) {
                NodeKind::Import { names } => {
                    for name in names {
                        self.store_import(ast, node, &name.name, false);
                    }
                }
                NodeKind::ImportFrom { module, .. } => {
                    self.store_import(ast, node, module, true);
                }
                NodeKind::ClassDef { name, .. } => {
                    self.store_class(ast, links, node, name);
                }
                NodeKind::FunctionDef { name, params, .. } => {
                    self.store_function(ast, links, node, name, params.clone());
                }
                NodeKind::Assign { targets, value } => {
                    self.store_assign(ast, links, targets, *value);
                }
                NodeKind::AugAssign { target, .. } => {
                    self.store_aug_assign(ast, links, *target);
                }
                NodeKind::Call { func, .. } => {
                    self.store_call(ast, links, node, *func);
                }
                _ => {}
            }
        }
        self.lock();
        self.into_table()
    }

    /// Move every still-tentative name into the constants table: nothing
    /// in the file mutated them, so they are genuinely one-shot literals.
    fn lock(&mut self) {
        for (name, record) in self.tentative.drain() {
            self.constants.insert(name, record);
        }
    }

    fn into_table(self) -> SymbolTable {
        SymbolTable {
            imports: self.imports,
            classes: self.classes,
            functions: self.functions,
            globals: self.globals,
            constants: self.constants,
            shadowed: self.shadowed,
            calls: self.calls,
            open_handles: self.open_handles,
            linked_libraries: Vec::new(),
        }
    }

    fn qualify(&self, ast: &Ast, links: &Links, node: NodeId, name: &str) -> String {
        let mut key = name.to_string();
        if let Some(parent) = nearest_ancestor(ast, links, node, SCOPE_KINDS, &[]) {
            if let Some(parent_name) = scope_name(ast, parent) {
                key = format!("{}.{}", parent_name, key);
            }
        }
        if let Some(library) = &self.library {
            key = format!("{}.{}", library, key);
        }
        key
    }

    fn store_import(&mut self, ast: &Ast, node: NodeId, name: &str, from_import: bool) {
        let mut key = name.to_string();
        if let Some(library) = &self.library {
            key = format!("{}.{}", library, key);
        }
        self.imports
            .entry(key.clone())
            .or_default()
            .push(ImportRecord {
                name: key,
                line: ast.line(node),
                node,
                from_import,
            });
    }

    fn store_class(&mut self, ast: &Ast, links: &Links, node: NodeId, name: &str) {
        let key = self.qualify(ast, links, node, name);
        self.classes.insert(
            key,
            ClassRecord {
                name: name.to_string(),
                line: ast.line(node),
                node,
            },
        );
    }

    fn store_function(
        &mut self,
        ast: &Ast,
        links: &Links,
        node: NodeId,
        name: &str,
        params: crate::ast::Parameters,
    ) {
        let key = self.qualify(ast, links, node, name);
        // A second definition with the same key overwrites silently.
        self.functions.insert(
            key,
            FunctionRecord {
                name: name.to_string(),
                line: ast.line(node),
                node,
                params,
            },
        );
    }

    fn at_module_scope(&self, ast: &Ast, links: &Links, node: NodeId) -> bool {
        ast.col(node) == 0 || nearest_ancestor(ast, links, node, SCOPE_KINDS, &[]).is_none()
    }

    fn store_assign(&mut self, ast: &Ast, links: &Links, targets: &[NodeId], value: NodeId) {
        for &target in targets {
            match ast.tag(target) {
                NodeTag::Name => {
                    let name = ast.name_of(target).unwrap_or_default().to_string();
                    self.classify_target(ast, links, target, &name, value);
                }
                NodeTag::Tuple => {
                    if let NodeKind::Tuple { elts } = ast.kind(target) {
                        for &elt in elts.clone().iter() {
                            if let Some(name) = ast.name_of(elt) {
                                let name = name.to_string();
                                self.classify_target(ast, links, target, &name, value);
                            }
                        }
                    }
                }
                NodeTag::Attribute | NodeTag::Subscript => {
                    // Mutation through the container: the base name cannot
                    // be a constant.
                    self.promote_base(ast, target);
                }
                _ => {}
            }
        }
    }

    fn classify_target(
        &mut self,
        ast: &Ast,
        links: &Links,
        target: NodeId,
        name: &str,
        value: NodeId,
    ) {
        if name.is_empty() || self.globals.contains_key(name) {
            return;
        }

        let module_scope = self.at_module_scope(ast, links, target);

        if self.tentative.contains_key(name) {
            if module_scope {
                // Second assignment proves the name is mutated.
                if let Some(record) = self.tentative.remove(name) {
                    self.globals.insert(name.to_string(), record);
                }
            } else {
                // Local use of the same name shadows the would-be
                // constant; it is not a proof of global mutation.
                self.shadowed.insert(
                    name.to_string(),
                    GlobalVariable {
                        name: name.to_string(),
                        line: ast.line(target),
                        node: target,
                    },
                );
            }
            return;
        }

        if module_scope {
            let record = GlobalVariable {
                name: name.to_string(),
                line: ast.line(target),
                node: target,
            };
            if is_literal_like(ast, value) {
                self.tentative.insert(name.to_string(), record);
            } else {
                self.globals.insert(name.to_string(), record);
            }
        }
    }

    /// Promote the base name of an attribute/subscript expression if it is
    /// currently tentative.
    fn promote_base(&mut self, ast: &Ast, node: NodeId) {
        let base = match dotted_name(ast, base_expr(ast, node), 0) {
            Ok(name) => name,
            Err(_) => return,
        };
        let root = match base.split('.').next() {
            Some(root) => root.to_string(),
            None => return,
        };
        if let Some(record) = self.tentative.remove(&root) {
            self.globals.insert(root, record);
        }
    }

    fn store_aug_assign(&mut self, ast: &Ast, links: &Links, target: NodeId) {
        match ast.tag(target) {
            NodeTag::Name => {
                if !self.at_module_scope(ast, links, target) {
                    return;
                }
                let name = ast.name_of(target).unwrap_or_default().to_string();
                if let Some(record) = self.tentative.remove(&name) {
                    self.globals.insert(name, record);
                }
            }
            NodeTag::Attribute | NodeTag::Subscript => self.promote_base(ast, target),
            _ => {}
        }
    }

    fn store_call(&mut self, ast: &Ast, links: &Links, call: NodeId, func: NodeId) {
        // Mutating method on a tentative constant.
        if let NodeKind::Attribute { value, attr } = ast.kind(func) {
            if MUTATING_METHODS.contains(attr.as_str()) {
                if let Some(receiver) = ast.name_of(*value) {
                    let receiver = receiver.to_string();
                    if let Some(record) = self.tentative.remove(&receiver) {
                        self.globals.insert(receiver, record);
                    }
                }
            }
        }

        // Module-top-level calls by bare name.
        if let Some(name) = ast.name_of(func) {
            if self.at_module_scope(ast, links, call) {
                self.calls.insert(
                    name.to_string(),
                    CallRecord {
                        name: name.to_string(),
                        line: ast.line(call),
                        node: call,
                    },
                );
            }

            // Opened file handles: an open() call as the right-hand side
            // of an assignment turns the target names into handles.
            if name == OPEN_PRIMITIVE {
                if let Some(parent) = links.parent(call) {
                    if let NodeKind::Assign { targets, .. } = ast.kind(parent) {
                        for &target in targets.clone().iter() {
                            if let Ok(handle_name) = dotted_name(ast, target, 0) {
                                self.open_handles.push(FileHandle {
                                    name: handle_name,
                                    line: ast.line(target),
                                    node: call,
                                    closed_at: 0,
                                });
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Name of a class or function scope node.
fn scope_name(ast: &Ast, id: NodeId) -> Option<&str> {
    match ast.kind(id) {
        NodeKind::FunctionDef { name, .. } | NodeKind::ClassDef { name, .. } => Some(name),
        _ => None,
    }
}

/// Innermost value expression of an attribute/subscript chain root.
fn base_expr(ast: &Ast, node: NodeId) -> NodeId {
    let mut current = node;
    loop {
        match ast.kind(current) {
            NodeKind::Attribute { value, .. } | NodeKind::Subscript { value, .. } => {
                current = *value
            }
            _ => return current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::PythonParser;

    fn resolve(source: &str) -> SymbolTable {
        let parsed = PythonParser::parse(source).unwrap();
        let links = Links::build(&parsed.ast);
        SymbolResolver::new().resolve(&parsed.ast, &links)
    }

    #[test]
    fn test_one_shot_literal_locks_as_constant() {
        let table = resolve("MAX_ROWS = 10\n");
        assert!(table.constants.contains_key("MAX_ROWS"));
        assert!(!table.globals.contains_key("MAX_ROWS"));
    }

    #[test]
    fn test_second_assignment_promotes_to_global() {
        let table = resolve("count = 0\ncount = 1\n");
        assert!(table.globals.contains_key("count"));
        assert!(!table.constants.contains_key("count"));
    }

    #[test]
    fn test_non_literal_value_is_global_immediately() {
        let table = resolve("rows = load_rows()\n");
        assert!(table.globals.contains_key("rows"));
    }

    #[test]
    fn test_subscript_assignment_promotes_base() {
        let table = resolve("pair = (1, 2)\npair[0] = 5\n");
        assert!(table.globals.contains_key("pair"));
        assert!(!table.constants.contains_key("pair"));
    }

    #[test]
    fn test_augmented_assignment_promotes() {
        let table = resolve("total = 0\ntotal += 1\n");
        assert!(table.globals.contains_key("total"));
    }

    #[test]
    fn test_mutating_method_promotes_receiver() {
        let table = resolve("values = (1, 2)\nvalues.append(3)\n");
        assert!(table.globals.contains_key("values"));
    }

    #[test]
    fn test_non_mutating_method_keeps_constant() {
        let table = resolve("GREETING = \"hi\"\nGREETING.upper()\n");
        assert!(table.constants.contains_key("GREETING"));
    }

    #[test]
    fn test_nested_assignment_shadows_instead_of_promoting() {
        let table = resolve("LIMIT = 5\n\ndef worker():\n    LIMIT = 3\n    return LIMIT\n");
        assert!(table.constants.contains_key("LIMIT"));
        assert!(table.shadowed.contains_key("LIMIT"));
        assert!(!table.globals.contains_key("LIMIT"));
    }

    #[test]
    fn test_tuple_unpacking_targets() {
        let table = resolve("a, b = 1, 2\n");
        assert!(table.constants.contains_key("a"));
        assert!(table.constants.contains_key("b"));
    }

    #[test]
    fn test_qualified_function_keys() {
        let table = resolve(
            "class PARSER:\n    def feed(self, line):\n        return line\n\ndef top():\n    return 1\n",
        );
        assert!(table.functions.contains_key("PARSER.feed"));
        assert!(table.functions.contains_key("top"));
        assert!(table.classes.contains_key("PARSER"));
    }

    #[test]
    fn test_library_prefix() {
        let parsed = PythonParser::parse("def helper():\n    return 1\n").unwrap();
        let links = Links::build(&parsed.ast);
        let table = SymbolResolver::with_library("toolbox").resolve(&parsed.ast, &links);
        assert!(table.functions.contains_key("toolbox.helper"));
    }

    #[test]
    fn test_imports_accumulate_in_order() {
        let table = resolve("import os\nimport os\nfrom os import path\n");
        let records = table.imports.get("os").unwrap();
        assert_eq!(records.len(), 3);
        assert!(!records[0].from_import);
        assert!(records[2].from_import);
        assert!(records[0].line < records[1].line);
    }

    #[test]
    fn test_top_level_calls_only() {
        let table = resolve("def main():\n    helper()\n\nmain()\n");
        assert!(table.calls.contains_key("main"));
        assert!(!table.calls.contains_key("helper"));
    }

    #[test]
    fn test_open_creates_file_handle() {
        let table = resolve("def read():\n    fh = open(\"data.txt\")\n    return fh\n");
        assert_eq!(table.open_handles.len(), 1);
        assert_eq!(table.open_handles[0].name, "fh");
        assert_eq!(table.open_handles[0].closed_at, 0);
    }

    #[test]
    fn test_global_keyword_does_not_panic() {
        let table = resolve("def f():\n    global counter\n    counter = 1\n");
        // counter is assigned only inside a function; nothing recorded.
        assert!(!table.globals.contains_key("counter"));
        assert!(!table.constants.contains_key("counter"));
    }
}
