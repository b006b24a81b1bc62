use std::{collections::VecDeque, fmt::Display};

use serde::Serialize;
use tracing::trace;

use crate::{
    collections::Tree,
    error::{IntoSpanned, SpannedError},
    lexer::{Span, Token, TokenKind},
    nonterminal::{Nonterminal, NonterminalKind},
};

/// Payload of a concrete syntax tree node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CstNode {
    Nonterminal(Nonterminal),
    Token(Token),
}

impl CstNode {
    pub fn is_token(&self, kind: TokenKind) -> bool {
        matches!(self, CstNode::Token(t) if t.is(kind))
    }

    pub fn span(&self) -> Span {
        match self {
            CstNode::Nonterminal(n) => n.span,
            CstNode::Token(t) => t.span,
        }
    }
}

impl Display for CstNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CstNode::Nonterminal(n) => n.fmt(f),
            CstNode::Token(t) => t.fmt(f),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("expected {expected}, found {}", actual.name())]
    UnexpectedToken { expected: TokenKind, actual: Token },
    #[error("invalid {production} starting with {}", actual.name())]
    InvalidProduction {
        production: NonterminalKind,
        actual: Token,
    },
    #[error("expected {0}, found end of input")]
    UnexpectedEof(TokenKind),
    #[error("program too large for the 256 byte image")]
    TooDeep,
}

pub type ParseError = SpannedError<ErrorKind>;

type Result<T> = std::result::Result<T, ParseError>;

type Production = fn(&mut Parser) -> Result<()>;

/// Open productions allowed at once. Lists are walked in a loop, so only nested blocks and
/// operator chains count towards it.
pub const MAX_NESTING: usize = 256;

/// Recursive descent parser. Every production pushes its own node before it runs, so
/// the finished tree mirrors the derivation one to one, epsilon tails included.
pub struct Parser {
    tokens: VecDeque<Token>,
    last_span: Span,
    nesting: usize,
    cst: Tree<CstNode>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: VecDeque::from(tokens),
            last_span: Span::default(),
            nesting: 0,
            cst: Tree::new(),
        }
    }

    pub fn into_cst(self) -> Tree<CstNode> {
        self.cst
    }

    /// Number of tokens not consumed by the parse.
    pub fn remaining(&self) -> usize {
        self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.front()
    }

    fn test(&self, kind: TokenKind) -> bool {
        matches!(self.peek(), Some(token) if token.is(kind))
    }

    fn span(&self) -> Span {
        self.peek().map(|t| t.span).unwrap_or(self.last_span)
    }

    fn current(&self, expected: TokenKind) -> Result<&Token> {
        self.peek()
            .ok_or_else(|| ErrorKind::UnexpectedEof(expected).at(self.last_span))
    }

    fn found(&self, description: &str) {
        if let Some(token) = self.peek() {
            trace!(line = token.span.line, "found {}, parsing {description}", token.name());
        }
    }

    fn expect(&mut self, expected: TokenKind) -> Result<()> {
        trace!(line = self.span().line, "looking for {expected}");

        let token = self.current(expected)?;

        if !token.is(expected) {
            return Err(ErrorKind::UnexpectedToken {
                expected,
                actual: token.clone(),
            }
            .at(token.span));
        }

        if let Some(token) = self.tokens.pop_front() {
            self.last_span = token.span;
            self.cst.add(CstNode::Token(token));
        }

        Ok(())
    }

    fn invalid(&self, production: NonterminalKind) -> ParseError {
        match self.peek() {
            Some(token) => ErrorKind::InvalidProduction {
                production,
                actual: token.clone(),
            }
            .at(token.span),
            None => ErrorKind::UnexpectedEof(TokenKind::EofSign).at(self.last_span),
        }
    }

    fn open(&mut self, kind: NonterminalKind) {
        let span = self.span();

        self.cst
            .descend(CstNode::Nonterminal(Nonterminal::new(kind, span)));
    }

    fn parse(&mut self, kind: NonterminalKind, production: Production) -> Result<()> {
        if self.nesting >= MAX_NESTING {
            return Err(ErrorKind::TooDeep.at(self.span()));
        }

        self.nesting += 1;
        self.open(kind);
        production(self)?;
        self.cst.ascend();
        self.nesting -= 1;

        Ok(())
    }

    /// Closes the epsilon tail of a right recursive list opened `tails` levels deep.
    fn close_list(&mut self, tails: usize, description: &str) {
        self.found(description);
        self.cst.add(CstNode::Token(Token::epsilon()));

        for _ in 0..tails {
            self.cst.ascend();
        }
    }

    /// Parses a whole program. The end of file marker is not part of the grammar and is
    /// left in the token queue.
    pub fn parse_program(&mut self) -> Result<()> {
        self.parse(NonterminalKind::Program, Self::program)
    }

    fn program(&mut self) -> Result<()> {
        self.parse(NonterminalKind::Statement, Self::statement)
    }

    fn statement(&mut self) -> Result<()> {
        let kind = self.peek().map(|t| t.kind);

        match kind {
            Some(TokenKind::Print) => {
                self.found("'print ( <Expr> )'");
                self.expect(TokenKind::Print)?;
                self.expect(TokenKind::OpenParen)?;
                self.parse(NonterminalKind::Expr, Self::expr)?;
                self.expect(TokenKind::CloseParen)
            }
            Some(TokenKind::Type) => {
                self.found("'<VarDecl>'");
                self.parse(NonterminalKind::VarDecl, Self::var_decl)
            }
            Some(TokenKind::OpenBrace) => {
                self.found("'{ <StmtList> }'");
                self.expect(TokenKind::OpenBrace)?;
                self.parse(NonterminalKind::StatementList, Self::statement_list)?;
                self.expect(TokenKind::CloseBrace)
            }
            Some(kind @ (TokenKind::While | TokenKind::If)) => {
                self.found("'<BoolExpr> { <StmtList> }'");
                self.expect(kind)?;
                self.parse(NonterminalKind::BooleanExpr, Self::boolean_expr)?;
                self.expect(TokenKind::OpenBrace)?;
                self.parse(NonterminalKind::StatementList, Self::statement_list)?;
                self.expect(TokenKind::CloseBrace)
            }
            // Anything else can only be an assignment, so the identifier match reports it.
            _ => {
                self.found("'<Id> = <Expr>'");
                self.parse(NonterminalKind::Id, Self::id)?;
                self.expect(TokenKind::Equals)?;
                self.parse(NonterminalKind::Expr, Self::expr)
            }
        }
    }

    fn statement_list(&mut self) -> Result<()> {
        let mut tails = 0;

        // The end of file marker also ends the list so that the closing brace is reported
        // as missing.
        while !self.test(TokenKind::CloseBrace) && !self.test(TokenKind::EofSign) {
            self.parse(NonterminalKind::Statement, Self::statement)?;
            self.open(NonterminalKind::StatementList);
            tails += 1;
        }

        self.close_list(tails, "end of '<StmtList>'");
        Ok(())
    }

    fn expr(&mut self) -> Result<()> {
        match self.peek().map(|t| t.kind) {
            Some(TokenKind::Digit) => {
                self.found("'<IntExpr>'");
                self.parse(NonterminalKind::IntExpr, Self::int_expr)
            }
            Some(TokenKind::Quote) => {
                self.found("'<StringExpr>'");
                self.parse(NonterminalKind::StringExpr, Self::string_expr)
            }
            Some(TokenKind::Id) => {
                self.found("'<Id>'");
                self.parse(NonterminalKind::Id, Self::id)
            }
            Some(TokenKind::OpenParen | TokenKind::Boolean) => {
                self.found("'<BoolExpr>'");
                self.parse(NonterminalKind::BooleanExpr, Self::boolean_expr)
            }
            _ => Err(self.invalid(NonterminalKind::Expr)),
        }
    }

    fn int_expr(&mut self) -> Result<()> {
        self.parse(NonterminalKind::Digit, Self::digit)?;

        if self.test(TokenKind::Op) {
            self.found("'<Op> <Expr>'");
            self.parse(NonterminalKind::Op, Self::op)?;
            self.parse(NonterminalKind::Expr, Self::expr)?;
        }

        Ok(())
    }

    fn string_expr(&mut self) -> Result<()> {
        self.expect(TokenKind::Quote)?;
        self.parse(NonterminalKind::CharList, Self::char_list)?;
        self.expect(TokenKind::Quote)
    }

    fn boolean_expr(&mut self) -> Result<()> {
        match self.peek().map(|t| t.kind) {
            Some(TokenKind::OpenParen) => {
                self.found("'( <Expr> == <Expr> )'");
                self.expect(TokenKind::OpenParen)?;
                self.parse(NonterminalKind::Expr, Self::expr)?;
                self.expect(TokenKind::DoubleEquals)?;
                self.parse(NonterminalKind::Expr, Self::expr)?;
                self.expect(TokenKind::CloseParen)
            }
            Some(TokenKind::Boolean) => {
                self.found("'<Bool>'");
                self.parse(NonterminalKind::Boolean, Self::boolean)
            }
            _ => Err(self.invalid(NonterminalKind::BooleanExpr)),
        }
    }

    fn char_list(&mut self) -> Result<()> {
        let mut tails = 0;

        loop {
            match self.peek().map(|t| t.kind) {
                Some(TokenKind::Char) => self.parse(NonterminalKind::Char, Self::char)?,
                Some(TokenKind::Space) => self.parse(NonterminalKind::Space, Self::space)?,
                _ => break,
            }

            self.open(NonterminalKind::CharList);
            tails += 1;
        }

        self.close_list(tails, "end of '<CharList>'");
        Ok(())
    }

    fn var_decl(&mut self) -> Result<()> {
        self.parse(NonterminalKind::Type, Self::type_name)?;
        self.parse(NonterminalKind::Id, Self::id)
    }

    fn type_name(&mut self) -> Result<()> {
        self.expect(TokenKind::Type)
    }

    fn id(&mut self) -> Result<()> {
        self.expect(TokenKind::Id)
    }

    fn char(&mut self) -> Result<()> {
        self.expect(TokenKind::Char)
    }

    fn space(&mut self) -> Result<()> {
        self.expect(TokenKind::Space)
    }

    fn digit(&mut self) -> Result<()> {
        self.expect(TokenKind::Digit)
    }

    fn boolean(&mut self) -> Result<()> {
        self.expect(TokenKind::Boolean)
    }

    fn op(&mut self) -> Result<()> {
        self.expect(TokenKind::Op)
    }
}

/// Parses `tokens` into a concrete syntax tree. On failure the partial tree built up to
/// the error is returned alongside it.
pub fn parse(tokens: Vec<Token>) -> (Tree<CstNode>, std::result::Result<(), ParseError>) {
    let mut parser = Parser::new(tokens);
    let result = parser.parse_program();

    if result.is_ok() {
        trace!(unconsumed = parser.remaining(), "parsed program");
    }

    (parser.into_cst(), result)
}
