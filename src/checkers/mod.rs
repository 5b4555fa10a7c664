//! Rule checkers.
//!
//! Each category is an independent component implementing [`Checker`]:
//! a full tree traversal (`visit`), an optional finalize step that runs
//! once the traversal and symbol tables are complete, and a reset between
//! files. Checkers consume the symbol tables read-only; findings go
//! through the shared [`Sink`].

mod basics;
mod data_structures;
mod exceptions;
mod file_handling;
mod functions;
mod structure;

pub use basics::BasicsChecker;
pub use data_structures::DataStructureChecker;
pub use exceptions::ExceptionChecker;
pub use file_handling::FileHandlingChecker;
pub use functions::FunctionChecker;
pub use structure::StructureChecker;

use crate::analysis::records::SymbolTable;
use crate::ast::{Ast, Links};
use crate::settings::Settings;
use crate::violations::{Category, Sink};

/// Everything a checker may read while analysing one file.
pub struct FileContext<'a> {
    pub ast: &'a Ast,
    pub links: &'a Links,
    pub source: &'a str,
    pub symbols: &'a SymbolTable,
    pub settings: &'a Settings,
}

/// A rule-checker component. Per file the orchestrator drives the cycle
/// `visit -> finalize -> drain -> reset`; implementations must not retain
/// state past the reset.
pub trait Checker {
    fn category(&self) -> Category;

    /// Full traversal of the tree, dispatching on node kinds.
    fn visit(&mut self, ctx: &FileContext, sink: &mut Sink);

    /// Runs after `visit` with the complete symbol tables.
    fn finalize(&mut self, _ctx: &FileContext, _sink: &mut Sink) {}

    /// Clear per-file mutable state.
    fn reset(&mut self) {}
}

/// The fixed, ordered list of category checkers.
pub fn default_checkers() -> Vec<Box<dyn Checker>> {
    vec![
        Box::new(BasicsChecker::new()),
        Box::new(FunctionChecker::new()),
        Box::new(FileHandlingChecker::new()),
        Box::new(DataStructureChecker::new()),
        Box::new(StructureChecker::new()),
        Box::new(ExceptionChecker::new()),
    ]
}
