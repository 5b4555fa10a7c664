//! Symbol resolution and analysis orchestration.
//!
//! ```text
//! source ──▶ PythonParser ──▶ Ast ──▶ Links ──▶ SymbolResolver ──▶ SymbolTable
//!                                                   │ (sibling .py files
//!                                                   ▼  re-resolved, merged)
//!                                       Model drives the checkers
//!                                       visit → finalize → drain → reset
//! ```
//!
//! The [`model::Model`] owns the per-file lifecycle; [`resolver::SymbolResolver`]
//! produces the tables; [`records`] defines their row types.

pub mod model;
pub mod records;
pub mod resolver;

pub use model::{analyse_batch, Model};
pub use records::SymbolTable;
pub use resolver::SymbolResolver;
