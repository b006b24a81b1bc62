use serde::Serialize;
use tracing::info;

pub mod ast;
pub mod backend;
pub mod collections;
pub mod compiler;
pub mod error;
pub mod lexer;
pub mod nonterminal;
pub mod parser;

pub use ast::{Ast, AstNode};
pub use backend::Image;
pub use collections::Tree;
pub use compiler::SymbolTable;
pub use error::{Diagnostic, Error, Severity, SpannedError};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{CstNode, Parser};

/// Everything one compilation produced. Stages after the first error are skipped, so the
/// later artifacts are only present when every stage before them succeeded.
#[derive(Debug, Default, Serialize)]
pub struct CompilationResult {
    pub tokens: Vec<Token>,
    pub cst: Option<Tree<CstNode>>,
    pub ast: Option<Ast>,
    pub symbols: Option<SymbolTable>,
    pub code: Option<Image>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompilationResult {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }
}

/// Runs every stage over `source`. Problems in the program end up in the diagnostics of
/// the result; `Err` is reserved for faults of the compiler itself.
pub fn compile(source: &str) -> Result<CompilationResult, Error> {
    let mut result = CompilationResult::default();

    let tokens = match Lexer::new(source).lex(&mut result.diagnostics) {
        Ok(tokens) => tokens,
        Err(e) => {
            result.diagnostics.push(e.into());
            return Ok(result);
        }
    };

    info!(tokens = tokens.len(), "lex completed successfully");
    result.tokens = tokens.clone();

    let (cst, parsed) = parser::parse(tokens);

    if let Err(e) = parsed {
        result.cst = Some(cst);
        result.diagnostics.push(e.into());
        return Ok(result);
    }

    info!(nodes = cst.len(), "parse completed successfully");

    let mut tree = ast::lower(&cst)?;
    result.cst = Some(cst);

    let mut analyzer = compiler::Analyzer::new(&mut tree);
    let analyzed = analyzer.analyze();
    let symbols = analyzer.into_symbols();

    match analyzed {
        Ok(warnings) => result.diagnostics.extend(warnings),
        Err(SpannedError {
            kind: compiler::ErrorKind::Internal(e),
            ..
        }) => return Err(e.into()),
        Err(e) => {
            result.diagnostics.push(e.into());
            result.ast = Some(tree);
            result.symbols = Some(symbols);
            return Ok(result);
        }
    }

    info!(symbols = symbols.symbols().count(), "semantic analysis completed successfully");

    match backend::generate(&tree, &symbols) {
        Ok(image) => {
            info!("code generation completed successfully");
            result.code = Some(image);
        }
        Err(SpannedError {
            kind: backend::ErrorKind::Internal(e),
            ..
        }) => return Err(e.into()),
        Err(e) => result.diagnostics.push(e.into()),
    }

    result.ast = Some(tree);
    result.symbols = Some(symbols);

    Ok(result)
}
