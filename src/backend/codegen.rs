use tracing::debug;

use crate::{
    ast::{Ast, AstNode},
    backend::{
        code::{Address, Code, Image, JumpTable, StaticTable, SCRATCH},
        opcode::Op,
    },
    collections::NodeId,
    compiler::{SymbolId, SymbolTable},
    error::{InternalError, IntoSpanned, SpannedError},
    lexer::{Span, TokenKind},
    nonterminal::NonterminalKind,
};

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("subtraction unsupported")]
    SubtractUnsupported,
    #[error("more than 10 jump entries unsupported")]
    TooManyJumps,
    #[error("program too large for the 256 byte image")]
    TooLarge,
    #[error(transparent)]
    Internal(#[from] InternalError),
}

pub type CodegenError = SpannedError<ErrorKind>;

type Result<T> = std::result::Result<T, CodegenError>;

const PRINT_INT: u8 = 0x01;
const PRINT_STRING: u8 = 0x02;

const fn scratch() -> Address {
    Address::Absolute(SCRATCH)
}

fn internal(message: impl Into<String>, span: Span) -> CodegenError {
    ErrorKind::Internal(InternalError(message.into())).at(span)
}

/// Generates machine code for an analyzed tree. All state lives in the generator, so
/// generating twice from the same tree yields the same image.
pub struct Generator<'a> {
    ast: &'a Ast,
    symbols: &'a SymbolTable,
    code: Code,
    statics: StaticTable,
    jumps: JumpTable,
}

impl<'a> Generator<'a> {
    pub fn new(ast: &'a Ast, symbols: &'a SymbolTable) -> Self {
        Self {
            ast,
            symbols,
            code: Code::new(),
            statics: StaticTable::new(),
            jumps: JumpTable::new(),
        }
    }

    pub fn generate(mut self) -> Result<Image> {
        let root = self
            .ast
            .root()
            .ok_or_else(|| internal("empty abstract syntax tree", Span::default()))?;

        self.node(root)?;
        self.code.emit(Op::Brk);

        debug!(
            code = self.code.address(),
            statics = self.statics.len(),
            jumps = self.jumps.len(),
            heap = self.code.heap().len(),
            "backpatching {}",
            self.code
        );

        let span = self.ast.last_leaf(root).span();

        self.code
            .image(&self.statics, &self.jumps)
            .map_err(|kind| kind.at(span))
    }

    fn child(&self, id: NodeId, index: usize) -> Result<NodeId> {
        let node = self.ast.value(id);

        self.ast
            .child(id, index)
            .ok_or_else(|| internal(format!("{node} is missing child {index}"), node.span()))
    }

    fn unexpected(&self, id: NodeId) -> CodegenError {
        let node = self.ast.value(id);
        internal(format!("cannot generate code for {node}"), node.span())
    }

    fn node(&mut self, id: NodeId) -> Result<()> {
        let ast = self.ast;

        match ast.value(id) {
            AstNode::Meta(meta) => match meta.kind {
                NonterminalKind::Block => {
                    for &child in ast.children(id) {
                        self.node(child)?;
                    }

                    Ok(())
                }
                NonterminalKind::While => self.while_loop(id),
                NonterminalKind::If => self.if_block(id),
                NonterminalKind::Declaration => self.declaration(id),
                NonterminalKind::Assignment => self.assignment(id),
                NonterminalKind::String => {
                    let address = self.string(id)?;
                    self.code.emit_const(Op::LdaConst, address);
                    Ok(())
                }
                NonterminalKind::Print => self.print(id),
                NonterminalKind::Add => self.add(id),
                NonterminalKind::Subtract => Err(ErrorKind::SubtractUnsupported.at(meta.span)),
                NonterminalKind::Equal => self.equal(id),
                _ => Err(self.unexpected(id)),
            },
            AstNode::Token(token) => match token.kind {
                TokenKind::Digit => {
                    let value = self.digit(id)?;
                    self.code.emit_const(Op::LdaConst, value);
                    Ok(())
                }
                TokenKind::Boolean => {
                    self.boolean(token.value == "true");
                    Ok(())
                }
                _ => Err(self.unexpected(id)),
            },
            AstNode::Symbol(_) => {
                let address = self.variable(id)?;
                self.code.emit_address(Op::LdaMem, address);
                Ok(())
            }
        }
    }

    /// Emits `BNE` to a fresh placeholder, closed again by [`Generator::resolve_forward`].
    fn branch_forward(&mut self, id: NodeId) -> Result<()> {
        let span = self.ast.value(id).span();
        let jump = self
            .jumps
            .add(self.code.address())
            .map_err(|kind| kind.at(span))?;

        debug!(jump, origin = self.code.address(), "jump entry J{jump}");
        self.code.emit_jump(Op::Bne, jump);

        Ok(())
    }

    fn resolve_forward(&mut self, id: NodeId) -> Result<()> {
        let span = self.ast.value(id).span();
        let target = self.code.address();
        let jump = self
            .jumps
            .resolve_last(target)
            .map_err(|kind| kind.at(span))?;

        debug!(jump, target, distance = ?self.jumps.entry(jump).distance, "resolved J{jump}");

        Ok(())
    }

    fn if_block(&mut self, id: NodeId) -> Result<()> {
        self.node(self.child(id, 0)?)?;
        self.branch_forward(id)?;
        self.node(self.child(id, 1)?)?;
        self.resolve_forward(id)
    }

    fn while_loop(&mut self, id: NodeId) -> Result<()> {
        let start = self.code.address();

        self.node(self.child(id, 0)?)?;
        self.branch_forward(id)?;
        self.node(self.child(id, 1)?)?;

        // Force a mismatch so the branch back to the condition is always taken.
        self.code.emit_const(Op::LdaConst, 0x00);
        self.code.emit_address(Op::StaMem, scratch());
        self.code.emit_const(Op::LdxConst, 0x01);
        self.code.emit_address(Op::CpxMem, scratch());

        // Two's complement distance from the end of the branch back to `start`.
        let back = self.code.address() + 2 - start;
        let distance = 256usize
            .checked_sub(back)
            .and_then(|distance| u8::try_from(distance).ok())
            .ok_or_else(|| ErrorKind::TooLarge.at(self.ast.value(id).span()))?;

        self.code.emit_const(Op::Bne, distance);
        self.resolve_forward(id)
    }

    fn declaration(&mut self, id: NodeId) -> Result<()> {
        let ast = self.ast;
        let name = self.child(id, 1)?;
        let AstNode::Symbol(symbol) = ast.value(name) else {
            return Err(self.unexpected(name));
        };

        let entry = self
            .statics
            .add(symbol.id, self.symbols.symbol(symbol.id))
            .map_err(|err| ErrorKind::Internal(err).at(symbol.span))?;

        debug!(
            line = symbol.span.line,
            "static entry {} for {}",
            StaticTable::label(entry),
            self.symbols.symbol(symbol.id).id()
        );

        self.code.emit_const(Op::LdaConst, 0x00);
        self.code.emit_address(Op::StaMem, Address::Static(entry));

        Ok(())
    }

    fn assignment(&mut self, id: NodeId) -> Result<()> {
        let left = self.child(id, 0)?;

        self.node(self.child(id, 1)?)?;

        let address = self.variable(left)?;
        self.code.emit_address(Op::StaMem, address);

        Ok(())
    }

    fn print(&mut self, id: NodeId) -> Result<()> {
        let ast = self.ast;
        let child = self.child(id, 0)?;

        match ast.value(child) {
            AstNode::Symbol(symbol) if self.is_pointer(symbol.id) => {
                let address = self.variable(child)?;

                self.code.emit_const(Op::LdxConst, PRINT_STRING);
                self.code.emit_address(Op::LdyMem, address);
                self.code.emit(Op::Sys);
            }
            AstNode::Meta(meta) if meta.is(NonterminalKind::String) => {
                let address = self.string(child)?;

                self.code.emit_const(Op::LdaConst, address);
                self.code.emit_address(Op::StaMem, scratch());
                self.code.emit_const(Op::LdxConst, PRINT_STRING);
                self.code.emit_address(Op::LdyMem, scratch());
                self.code.emit(Op::Sys);
            }
            // An equality leaves its result in the flag only, so this prints its right side.
            _ => {
                self.node(child)?;

                self.code.emit_const(Op::LdxConst, PRINT_INT);
                self.code.emit_address(Op::StaMem, scratch());
                self.code.emit_address(Op::LdyMem, scratch());
                self.code.emit(Op::Sys);
            }
        }

        Ok(())
    }

    /// The grammar only allows a digit on the left of `+`.
    fn add(&mut self, id: NodeId) -> Result<()> {
        let left = self.child(id, 0)?;
        let right = self.child(id, 1)?;
        let value = self.digit(left)?;

        self.node(right)?;

        self.code.emit_address(Op::StaMem, scratch());
        self.code.emit_const(Op::LdaConst, value);
        self.code.emit_address(Op::AdcMem, scratch());

        Ok(())
    }

    fn equal(&mut self, id: NodeId) -> Result<()> {
        self.node(self.child(id, 0)?)?;
        self.code.emit_address(Op::StaMem, scratch());
        self.code.emit_address(Op::LdxMem, scratch());

        self.node(self.child(id, 1)?)?;
        self.code.emit_address(Op::StaMem, scratch());
        self.code.emit_address(Op::CpxMem, scratch());

        Ok(())
    }

    /// Sets both the accumulator and the compare flag.
    fn boolean(&mut self, value: bool) {
        self.code.emit_const(Op::LdaConst, value as u8);
        self.code.emit_address(Op::StaMem, scratch());
        self.code.emit_const(Op::LdxConst, 0x01);
        self.code.emit_address(Op::CpxMem, scratch());
    }

    fn digit(&self, id: NodeId) -> Result<u8> {
        match self.ast.value(id) {
            AstNode::Token(token) if token.is(TokenKind::Digit) => token
                .value
                .parse::<i8>()
                .map(|value| value as u8)
                .map_err(|_| self.unexpected(id)),
            _ => Err(self.unexpected(id)),
        }
    }

    fn string(&mut self, id: NodeId) -> Result<u8> {
        let ast = self.ast;
        let node = ast.value(id);
        let value = ast
            .children(id)
            .iter()
            .map(|&child| ast.value(child).to_string())
            .collect::<String>();

        let address = self.code.add_string(&value).map_err(|kind| kind.at(node.span()))?;

        debug!(line = node.span().line, address, "heap string \"{value}\"");

        Ok(address)
    }

    /// String variables hold the heap address of their value.
    fn is_pointer(&self, symbol: SymbolId) -> bool {
        self.statics
            .get(symbol)
            .is_some_and(|entry| self.statics.entry(entry).pointer)
    }

    fn variable(&self, id: NodeId) -> Result<Address> {
        match self.ast.value(id) {
            AstNode::Symbol(symbol) => self
                .statics
                .get(symbol.id)
                .map(Address::Static)
                .ok_or_else(|| {
                    internal(
                        format!("variable {} used before allocation", symbol.name),
                        symbol.span,
                    )
                }),
            _ => Err(self.unexpected(id)),
        }
    }
}

/// Generates the memory image for an analyzed tree.
pub fn generate(ast: &Ast, symbols: &SymbolTable) -> std::result::Result<Image, CodegenError> {
    Generator::new(ast, symbols).generate()
}
