//! tutorlint - educational static analysis for beginner Python programs.
//!
//! tutorlint parses Python submissions with tree-sitter, builds a per-file
//! symbol model (imports, classes, functions, globals and constants,
//! top-level calls, open file handles) and runs a fixed set of rule
//! checkers against the model and the tree, producing pass/fail findings
//! keyed by rule code and line number.
//!
//! # Architecture
//!
//! - `parser`: tree-sitter boundary, lowers the grammar's tree into the
//!   crate's typed AST
//! - `ast`: arena AST, parent/sibling link table, search primitives
//! - `analysis`: symbol resolution (with constant promotion and sibling
//!   file merging) and the per-file orchestration model
//! - `checkers`: the six rule-checker categories
//! - `violations`: rule catalogue, messages, result types
//! - `report`: output formatting (pretty, JSON)
//! - `settings`: YAML settings
//!
//! # Adding a New Checker
//!
//! Implement the `checkers::Checker` trait and register the instance in
//! `checkers::default_checkers`.

pub mod analysis;
pub mod ast;
pub mod checkers;
pub mod cli;
pub mod parser;
pub mod report;
pub mod settings;
pub mod violations;

pub use analysis::{analyse_batch, Model, SymbolResolver, SymbolTable};
pub use ast::{Ast, Links, NodeId, NodeKind, NodeTag};
pub use checkers::{Checker, FileContext};
pub use parser::PythonParser;
pub use settings::Settings;
pub use violations::{Category, FileResults, Rule, Severity, Violation};
