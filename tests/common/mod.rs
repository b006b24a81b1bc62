#[cfg(test)]
#[allow(dead_code)]
mod tests {
    use std::fs;

    use chronc::{
        ast::{self, Ast},
        compiler::{Analyzer, SymbolTable},
        error::Diagnostic,
        lexer::{Lexer, Token},
        parser, CompilationResult,
    };

    pub fn source(name: &str) -> String {
        fs::read_to_string(format!("tests/source/{name}.txt")).unwrap()
    }

    pub fn compile(name: &str) -> CompilationResult {
        compile_source(&source(name))
    }

    pub fn compile_source(source: &str) -> CompilationResult {
        chronc::compile(source).unwrap()
    }

    pub fn lex(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
        let mut diagnostics = vec![];
        let tokens = Lexer::new(source).lex(&mut diagnostics).unwrap();

        (tokens, diagnostics)
    }

    /// Lowers a program that is known to parse.
    pub fn lower(source: &str) -> Ast {
        let (tokens, _) = lex(source);
        let (cst, parsed) = parser::parse(tokens);

        parsed.unwrap();
        ast::lower(&cst).unwrap()
    }

    pub fn analyze(source: &str) -> (Ast, SymbolTable, Vec<Diagnostic>) {
        let mut ast = lower(source);
        let mut analyzer = Analyzer::new(&mut ast);
        let warnings = analyzer.analyze().unwrap();
        let symbols = analyzer.into_symbols();

        (ast, symbols, warnings)
    }

    /// Diagnostics as `SEVERITY line message`.
    pub fn messages(result: &CompilationResult) -> Vec<String> {
        result
            .diagnostics
            .iter()
            .map(|d| format!("{} {} {}", d.severity, d.line, d.message))
            .collect()
    }

    pub fn hex(bytes: &[u8]) -> String {
        bytes
            .iter()
            .map(|byte| format!("{byte:02X}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The instruction part of an image, up to and including the final `BRK`.
    pub fn code(result: &CompilationResult) -> String {
        let image = result.code.as_ref().unwrap();
        let end = image
            .disassemble()
            .last()
            .map(|instruction| instruction.address + 1)
            .unwrap();

        hex(&image.bytes()[..end])
    }
}

#[cfg(test)]
pub use tests::*;
