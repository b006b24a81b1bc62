mod analyzer;
mod scope;

pub use analyzer::{AnalyzeError, Analyzer, ErrorKind, Side};
pub use scope::{Scope, Symbol, SymbolId, SymbolTable, VarType};
