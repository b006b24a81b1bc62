use tracing::{debug, trace};

use crate::{
    ast::{Ast, AstNode, SymbolRef},
    collections::NodeId,
    compiler::scope::{SymbolTable, VarType},
    error::{Diagnostic, InternalError, IntoSpanned, SpannedError},
    lexer::{Span, TokenKind},
    nonterminal::NonterminalKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("variable already declared: {0}")]
    AlreadyDeclared(String),
    #[error("undeclared variable: {0}")]
    Undeclared(String),
    #[error("type mismatch: cannot assign {right} to {left}")]
    TypeMismatch { left: VarType, right: VarType },
    #[error("cannot add or subtract {ty} ({side} operand)")]
    InvalidArithmetic { ty: VarType, side: Side },
    #[error("cannot compare {ty} ({side} operand)")]
    InvalidComparison { ty: VarType, side: Side },
    #[error("cannot compare different types: {left} and {right}")]
    ComparisonMismatch { left: VarType, right: VarType },
    #[error("nested == is unsupported")]
    NestedEqual,
    #[error(transparent)]
    Internal(#[from] InternalError),
}

pub type AnalyzeError = SpannedError<ErrorKind>;

type Result<T> = std::result::Result<T, AnalyzeError>;

fn internal(message: impl Into<String>, span: Span) -> AnalyzeError {
    ErrorKind::Internal(InternalError(message.into())).at(span)
}

/// Type checks an abstract syntax tree and resolves its identifiers. Every identifier leaf
/// is replaced by an [`AstNode::Symbol`] pointing into the symbol table.
pub struct Analyzer<'a> {
    ast: &'a mut Ast,
    symbols: SymbolTable,
}

impl<'a> Analyzer<'a> {
    pub fn new(ast: &'a mut Ast) -> Self {
        Self {
            ast,
            symbols: SymbolTable::new(),
        }
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn into_symbols(self) -> SymbolTable {
        self.symbols
    }

    /// Runs the analysis and returns the unused/uninitialized variable warnings.
    pub fn analyze(&mut self) -> Result<Vec<Diagnostic>> {
        let root = self
            .ast
            .root()
            .ok_or_else(|| internal("empty abstract syntax tree", Span::default()))?;

        // A bare statement still gets a scope of its own.
        if !self.ast.value(root).is_meta(NonterminalKind::Block) {
            self.symbols.enter_scope();
        }

        self.node(root)?;

        Ok(self.symbols.check())
    }

    fn child(&self, id: NodeId, index: usize) -> Result<NodeId> {
        self.ast.child(id, index).ok_or_else(|| {
            internal(
                format!("{} is missing child {index}", self.ast.value(id)),
                self.ast.value(id).span(),
            )
        })
    }

    fn label(&self) -> &str {
        self.symbols
            .current()
            .map(|scope| scope.label.as_str())
            .unwrap_or("")
    }

    fn node(&mut self, id: NodeId) -> Result<Option<VarType>> {
        let node = self.ast.value(id).clone();

        Ok(match node {
            AstNode::Meta(meta) => match meta.kind {
                NonterminalKind::Block => {
                    self.block(id)?;
                    None
                }
                NonterminalKind::While | NonterminalKind::If => {
                    trace!(line = meta.span.line, "{} checking {}", self.label(), meta);
                    self.node(self.child(id, 0)?)?;
                    self.node(self.child(id, 1)?)?;
                    None
                }
                NonterminalKind::Declaration => {
                    self.declaration(id)?;
                    None
                }
                NonterminalKind::Assignment => Some(self.assignment(id)?),
                NonterminalKind::String => Some(VarType::String),
                NonterminalKind::Print => self.node(self.child(id, 0)?)?,
                NonterminalKind::Add | NonterminalKind::Subtract => Some(self.arithmetic(id)?),
                NonterminalKind::Equal => Some(self.equal(id)?),
                kind => return Err(internal(format!("unexpected {kind}"), meta.span)),
            },
            AstNode::Token(token) => match token.kind {
                TokenKind::Digit => Some(VarType::Int),
                TokenKind::Boolean => Some(VarType::Boolean),
                TokenKind::Id => Some(self.identifier(id)?),
                _ => return Err(internal(format!("unexpected {}", token.name()), token.span)),
            },
            AstNode::Symbol(symbol) => {
                return Err(internal(
                    format!("identifier {} analyzed twice", symbol.name),
                    symbol.span,
                ))
            }
        })
    }

    fn typed(&mut self, id: NodeId) -> Result<VarType> {
        match self.node(id)? {
            Some(ty) => Ok(ty),
            None => Err(internal(
                format!("{} has no value", self.ast.value(id)),
                self.ast.value(id).span(),
            )),
        }
    }

    fn block(&mut self, id: NodeId) -> Result<()> {
        let span = self.ast.value(id).span();

        self.symbols.enter_scope();
        trace!(line = span.line, "'{}' entering block, creating scope", self.label());

        for child in self.ast.children(id).to_vec() {
            self.node(child)?;
        }

        trace!(
            line = self.ast.last_leaf(id).span().line,
            "'{}' leaving block, leaving scope",
            self.label()
        );
        self.symbols.leave_scope();

        Ok(())
    }

    fn declaration(&mut self, id: NodeId) -> Result<()> {
        let ty_node = self.child(id, 0)?;
        let name_node = self.child(id, 1)?;

        let ty = match self.ast.value(ty_node) {
            AstNode::Token(t) if t.is(TokenKind::Type) => VarType::from_name(&t.value),
            _ => None,
        }
        .ok_or_else(|| internal("declaration without a type", self.ast.value(id).span()))?;

        let (name, span) = match self.ast.value(name_node) {
            AstNode::Token(t) if t.is(TokenKind::Id) => (t.value.clone(), t.span),
            node => {
                return Err(internal(
                    format!("declaration of {node} is not an identifier"),
                    node.span(),
                ))
            }
        };

        debug!(line = span.line, "{} declaration: adding symbol '{name}' of type '{ty}'", self.label());

        let symbol = self
            .symbols
            .declare(&name, ty, span)
            .ok_or_else(|| ErrorKind::AlreadyDeclared(name.clone()).at(span))?;

        *self.ast.value_mut(name_node) = AstNode::Symbol(SymbolRef {
            id: symbol,
            name,
            span,
        });

        Ok(())
    }

    fn assignment(&mut self, id: NodeId) -> Result<VarType> {
        let left = self.child(id, 0)?;
        let right = self.child(id, 1)?;
        let span = self.ast.value(left).span();

        let right_ty = self.typed(right)?;
        let left_ty = self.typed(left)?;

        debug!(line = span.line, "{} assignment: '{right_ty}' to '{left_ty}'", self.label());

        if left_ty != right_ty {
            return Err(ErrorKind::TypeMismatch {
                left: left_ty,
                right: right_ty,
            }
            .at(span));
        }

        if let AstNode::Symbol(symbol) = self.ast.value(left) {
            let symbol = symbol.id;
            self.symbols.symbol_mut(symbol).assigned = true;
        }

        Ok(left_ty)
    }

    fn arithmetic(&mut self, id: NodeId) -> Result<VarType> {
        for (index, side) in [(0, Side::Left), (1, Side::Right)] {
            let operand = self.child(id, index)?;
            let span = self.ast.value(operand).span();
            let ty = self.typed(operand)?;

            debug!(line = span.line, "{} op: checking {side} operand", self.label());

            if ty != VarType::Int {
                return Err(ErrorKind::InvalidArithmetic { ty, side }.at(span));
            }
        }

        Ok(VarType::Int)
    }

    fn equal(&mut self, id: NodeId) -> Result<VarType> {
        let left = self.child(id, 0)?;
        let right = self.child(id, 1)?;
        let span = self.ast.value(left).span();

        for operand in [left, right] {
            if self.ast.value(operand).is_meta(NonterminalKind::Equal) {
                return Err(ErrorKind::NestedEqual.at(self.ast.value(operand).span()));
            }
        }

        let mut types = [VarType::Int; 2];

        for (slot, (operand, side)) in [(left, Side::Left), (right, Side::Right)]
            .into_iter()
            .enumerate()
        {
            let ty = self.typed(operand)?;

            debug!(line = span.line, "{} equals: checking {side} type", self.label());

            if ty == VarType::String {
                return Err(ErrorKind::InvalidComparison { ty, side }.at(span));
            }

            types[slot] = ty;
        }

        let [left_ty, right_ty] = types;

        if left_ty != right_ty {
            return Err(ErrorKind::ComparisonMismatch {
                left: left_ty,
                right: right_ty,
            }
            .at(span));
        }

        Ok(VarType::Boolean)
    }

    fn identifier(&mut self, id: NodeId) -> Result<VarType> {
        let (name, span) = match self.ast.value(id) {
            AstNode::Token(t) => (t.value.clone(), t.span),
            node => return Err(internal(format!("{node} is not an identifier"), node.span())),
        };

        trace!(line = span.line, "{} id: checking existence of '{name}'", self.label());

        let symbol = self
            .symbols
            .lookup(&name)
            .ok_or_else(|| ErrorKind::Undeclared(name.clone()).at(span))?;

        self.symbols.symbol_mut(symbol).used = true;
        let ty = self.symbols.symbol(symbol).ty;

        *self.ast.value_mut(id) = AstNode::Symbol(SymbolRef {
            id: symbol,
            name,
            span,
        });

        Ok(ty)
    }
}
