use std::fmt::Display;

use serde::Serialize;

use crate::{
    collections::{NodeId, Tree},
    compiler::SymbolId,
    error::InternalError,
    lexer::{Span, Token, TokenKind},
    nonterminal::{Nonterminal, NonterminalKind},
    parser::CstNode,
};

/// An identifier resolved by the semantic analyzer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolRef {
    pub id: SymbolId,
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AstNode {
    Meta(Nonterminal),
    Token(Token),
    Symbol(SymbolRef),
}

impl AstNode {
    pub fn span(&self) -> Span {
        match self {
            AstNode::Meta(n) => n.span,
            AstNode::Token(t) => t.span,
            AstNode::Symbol(s) => s.span,
        }
    }

    pub fn is_meta(&self, kind: NonterminalKind) -> bool {
        matches!(self, AstNode::Meta(n) if n.is(kind))
    }
}

impl Display for AstNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AstNode::Meta(n) => n.fmt(f),
            AstNode::Token(t) => t.fmt(f),
            AstNode::Symbol(s) => write!(f, "{}", s.name),
        }
    }
}

pub type Ast = Tree<AstNode>;

type Result<T> = std::result::Result<T, InternalError>;

fn malformed(what: &str, node: &CstNode) -> InternalError {
    InternalError(format!("malformed {what} at {node} ({})", node.span()))
}

struct Lowering<'a> {
    cst: &'a Tree<CstNode>,
}

impl<'a> Lowering<'a> {
    fn child(&self, id: NodeId, index: usize) -> Result<NodeId> {
        self.cst
            .child(id, index)
            .ok_or_else(|| malformed("tree", self.cst.value(id)))
    }

    fn line(&self, id: NodeId) -> Span {
        self.cst.first_leaf(id).span()
    }

    fn leaf(&self, id: NodeId) -> Ast {
        let mut tree = Tree::new();

        match self.cst.value(id) {
            CstNode::Token(token) => tree.add(AstNode::Token(token.clone())),
            CstNode::Nonterminal(n) => tree.add(AstNode::Meta(*n)),
        };

        tree
    }

    fn meta(&self, kind: NonterminalKind, id: NodeId, children: Vec<Ast>) -> Ast {
        let mut tree = Tree::new();
        let root = tree.add(AstNode::Meta(Nonterminal::new(kind, self.line(id))));

        for child in children {
            tree.graft(root, child);
        }

        tree
    }

    fn lower(&self, id: NodeId) -> Result<Ast> {
        match self.cst.value(id) {
            CstNode::Nonterminal(n) => match n.kind {
                NonterminalKind::Statement => self.statement(id),
                NonterminalKind::IntExpr => self.int_expr(id),
                NonterminalKind::StringExpr => self.string_expr(id),
                NonterminalKind::BooleanExpr => self.boolean_expr(id),
                NonterminalKind::StatementList
                | NonterminalKind::CharList
                | NonterminalKind::VarDecl
                | NonterminalKind::Op => Err(malformed("position of", self.cst.value(id))),
                // Single child wrappers such as <Program>, <Expr>, <Id> or <Digit>.
                _ => self.lower(self.child(id, 0)?),
            },
            CstNode::Token(_) => Ok(self.leaf(id)),
        }
    }

    fn statement(&self, id: NodeId) -> Result<Ast> {
        let first = self.child(id, 0)?;

        match self.cst.value(first) {
            CstNode::Token(t) if t.is(TokenKind::Print) => {
                let expr = self.lower(self.child(id, 2)?)?;
                Ok(self.meta(NonterminalKind::Print, id, vec![expr]))
            }
            CstNode::Nonterminal(n) if n.is(NonterminalKind::Id) => {
                let left = self.lower(first)?;
                let right = self.lower(self.child(id, 2)?)?;

                Ok(self.meta(NonterminalKind::Assignment, id, vec![left, right]))
            }
            CstNode::Nonterminal(n) if n.is(NonterminalKind::VarDecl) => {
                let ty = self.lower(self.child(first, 0)?)?;
                let name = self.lower(self.child(first, 1)?)?;

                Ok(self.meta(NonterminalKind::Declaration, first, vec![ty, name]))
            }
            CstNode::Token(t) if t.is(TokenKind::OpenBrace) => {
                let statements = self.flatten(self.child(id, 1)?)?;
                Ok(self.meta(NonterminalKind::Block, id, statements))
            }
            CstNode::Token(t) if t.is(TokenKind::While) || t.is(TokenKind::If) => {
                let kind = if t.is(TokenKind::While) {
                    NonterminalKind::While
                } else {
                    NonterminalKind::If
                };
                let condition = self.lower(self.child(id, 1)?)?;
                let block = self.meta(
                    NonterminalKind::Block,
                    id,
                    self.flatten(self.child(id, 3)?)?,
                );

                Ok(self.meta(kind, id, vec![condition, block]))
            }
            node => Err(malformed("statement", node)),
        }
    }

    fn int_expr(&self, id: NodeId) -> Result<Ast> {
        let digit = self.lower(self.child(id, 0)?)?;

        let Some(op) = self.cst.child(id, 1) else {
            return Ok(digit);
        };

        let kind = match self.cst.first_leaf(op) {
            CstNode::Token(t) if t.value == "+" => NonterminalKind::Add,
            CstNode::Token(t) if t.value == "-" => NonterminalKind::Subtract,
            node => return Err(malformed("operator", node)),
        };
        let right = self.lower(self.child(id, 2)?)?;

        Ok(self.meta(kind, id, vec![digit, right]))
    }

    fn string_expr(&self, id: NodeId) -> Result<Ast> {
        let chars = self.flatten(self.child(id, 1)?)?;
        Ok(self.meta(NonterminalKind::String, id, chars))
    }

    fn boolean_expr(&self, id: NodeId) -> Result<Ast> {
        let first = self.child(id, 0)?;

        match self.cst.value(first) {
            CstNode::Token(t) if t.is(TokenKind::OpenParen) => {
                let left = self.lower(self.child(id, 1)?)?;
                let right = self.lower(self.child(id, 3)?)?;

                Ok(self.meta(NonterminalKind::Equal, id, vec![left, right]))
            }
            CstNode::Nonterminal(n) if n.is(NonterminalKind::Boolean) => self.lower(first),
            node => Err(malformed("boolean expression", node)),
        }
    }

    /// Walks a right recursive `X List | ε` spine into a flat list.
    fn flatten(&self, mut id: NodeId) -> Result<Vec<Ast>> {
        let mut items = vec![];

        loop {
            let head = self.child(id, 0)?;

            if self.cst.value(head).is_token(TokenKind::Epsilon) {
                return Ok(items);
            }

            items.push(self.lower(head)?);
            id = self.child(id, 1)?;
        }
    }
}

/// Lowers a concrete syntax tree that parsed without errors.
pub fn lower(cst: &Tree<CstNode>) -> std::result::Result<Ast, InternalError> {
    let root = cst
        .root()
        .ok_or_else(|| InternalError("empty concrete syntax tree".to_string()))?;

    Lowering { cst }.lower(root)
}
