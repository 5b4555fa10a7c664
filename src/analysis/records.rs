//! Symbol-table row types produced by pre-analysis.

use std::collections::HashMap;

use crate::ast::{NodeId, Parameters};

/// One recorded import. Multiple records with the same name accumulate in
/// insertion order; duplicate-import detection consumes the tail.
#[derive(Debug, Clone)]
pub struct ImportRecord {
    pub name: String,
    pub line: usize,
    pub node: NodeId,
    /// `from module import ...` rather than `import module`.
    pub from_import: bool,
}

/// A class definition, keyed by its qualified name.
#[derive(Debug, Clone)]
pub struct ClassRecord {
    pub name: String,
    pub line: usize,
    pub node: NodeId,
}

/// A function definition, keyed by its qualified name.
#[derive(Debug, Clone)]
pub struct FunctionRecord {
    pub name: String,
    pub line: usize,
    pub node: NodeId,
    pub params: Parameters,
}

/// A module-level variable, either still tentative (one-shot literal so
/// far) or confirmed mutable. Which table it lives in carries the state.
#[derive(Debug, Clone)]
pub struct GlobalVariable {
    pub name: String,
    pub line: usize,
    pub node: NodeId,
}

/// A call whose call expression sits at the top level of the module.
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub name: String,
    pub line: usize,
    pub node: NodeId,
}

/// An opened file handle. `closed_at` stays 0 until a matching close is
/// found.
#[derive(Debug, Clone)]
pub struct FileHandle {
    pub name: String,
    pub line: usize,
    pub node: NodeId,
    pub closed_at: usize,
}

/// All symbol tables for one analysed file. Built by the resolver, read by
/// the checkers, cleared before the next file.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    pub imports: HashMap<String, Vec<ImportRecord>>,
    pub classes: HashMap<String, ClassRecord>,
    pub functions: HashMap<String, FunctionRecord>,
    /// Confirmed mutable globals.
    pub globals: HashMap<String, GlobalVariable>,
    /// Names locked as one-shot constants.
    pub constants: HashMap<String, GlobalVariable>,
    /// Nested-scope assignments that shadow a would-be constant.
    pub shadowed: HashMap<String, GlobalVariable>,
    /// Module-top-level calls.
    pub calls: HashMap<String, CallRecord>,
    /// File handles opened through assignment of an `open(...)` call.
    pub open_handles: Vec<FileHandle>,
    /// Sibling modules whose symbols were merged in.
    pub linked_libraries: Vec<String>,
}
