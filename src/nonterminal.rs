use std::fmt::Display;

use serde::Serialize;

use crate::lexer::Span;

/// Grammar productions of the concrete tree followed by the meta constructs that only
/// appear in the abstract tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NonterminalKind {
    Program,
    Statement,
    StatementList,
    Expr,
    IntExpr,
    StringExpr,
    BooleanExpr,
    CharList,
    VarDecl,
    Type,
    Id,
    Char,
    Space,
    Digit,
    Boolean,
    Op,

    Block,
    While,
    If,
    Declaration,
    Assignment,
    String,
    Print,
    Add,
    Subtract,
    Equal,
}

impl NonterminalKind {
    pub fn name(self) -> &'static str {
        match self {
            NonterminalKind::Program => "<Program>",
            NonterminalKind::Statement => "<Stmt>",
            NonterminalKind::StatementList => "<StmtList>",
            NonterminalKind::Expr => "<Expr>",
            NonterminalKind::IntExpr => "<IntExpr>",
            NonterminalKind::StringExpr => "<StringExpr>",
            NonterminalKind::BooleanExpr => "<BoolExpr>",
            NonterminalKind::CharList => "<CharList>",
            NonterminalKind::VarDecl => "<VarDecl>",
            NonterminalKind::Type => "<Type>",
            NonterminalKind::Id => "<Id>",
            NonterminalKind::Char => "<Char>",
            NonterminalKind::Space => "<Space>",
            NonterminalKind::Digit => "<Digit>",
            NonterminalKind::Boolean => "<Bool>",
            NonterminalKind::Op => "<Op>",
            NonterminalKind::Block => "{}",
            NonterminalKind::While => "while",
            NonterminalKind::If => "if",
            NonterminalKind::Declaration => "decl",
            NonterminalKind::Assignment => "=",
            NonterminalKind::String => "string",
            NonterminalKind::Print => "print",
            NonterminalKind::Add => "+",
            NonterminalKind::Subtract => "-",
            NonterminalKind::Equal => "==",
        }
    }
}

impl Display for NonterminalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Nonterminal {
    pub kind: NonterminalKind,
    pub span: Span,
}

impl Nonterminal {
    pub fn new(kind: NonterminalKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn is(&self, kind: NonterminalKind) -> bool {
        self.kind == kind
    }
}

impl Display for Nonterminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)
    }
}
