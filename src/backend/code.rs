use std::fmt::Display;

use serde::Serialize;

use crate::{
    backend::{codegen::ErrorKind, opcode::Op},
    compiler::{Symbol, SymbolId, VarType},
    error::InternalError,
};

pub const IMAGE_SIZE: usize = 256;

/// Shared temporary cell, the last byte of the image.
pub const SCRATCH: u16 = 0x00FF;

/// Jump placeholders are encoded as `J0` to `J9`.
pub const MAX_JUMPS: usize = 10;

pub type StaticId = usize;
pub type JumpId = usize;

/// A byte of emitted code which may still be waiting for backpatching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeByte {
    Byte(u8),
    /// Low byte of a static variable address.
    Static(StaticId),
    /// High byte of a static variable address, always zero once patched.
    StaticHigh(StaticId),
    Jump(JumpId),
}

impl Display for CodeByte {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodeByte::Byte(byte) => write!(f, "{byte:02X}"),
            CodeByte::Static(id) => write!(f, "T{:X}", (id >> 8) & 0xF),
            CodeByte::StaticHigh(id) => write!(f, "{:02X}", id & 0xFF),
            CodeByte::Jump(id) => write!(f, "J{id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Address {
    Absolute(u16),
    Static(StaticId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StaticEntry {
    pub symbol: SymbolId,
    pub name: String,
    pub offset: usize,
    /// The variable holds the heap address of a string.
    pub pointer: bool,
}

#[derive(Debug, Default)]
pub struct StaticTable {
    entries: Vec<StaticEntry>,
}

impl StaticTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn add(&mut self, id: SymbolId, symbol: &Symbol) -> Result<StaticId, InternalError> {
        if self.get(id).is_some() {
            return Err(InternalError(format!(
                "symbol {} allocated twice",
                symbol.id()
            )));
        }

        self.entries.push(StaticEntry {
            symbol: id,
            name: symbol.name.clone(),
            offset: self.entries.len(),
            pointer: symbol.ty == VarType::String,
        });

        Ok(self.entries.len() - 1)
    }

    pub fn get(&self, symbol: SymbolId) -> Option<StaticId> {
        self.entries.iter().position(|entry| entry.symbol == symbol)
    }

    pub fn entry(&self, id: StaticId) -> &StaticEntry {
        &self.entries[id]
    }

    /// Temporary address shown before backpatching, e.g. `T001`.
    pub fn label(id: StaticId) -> String {
        format!("T{id:03X}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JumpEntry {
    pub origin: usize,
    pub distance: Option<u8>,
}

/// Forward branches of one generation. Open entries form a stack so nested blocks
/// resolve innermost first.
#[derive(Debug, Default)]
pub struct JumpTable {
    entries: Vec<JumpEntry>,
    pending: Vec<JumpId>,
}

impl JumpTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Opens a branch whose opcode starts at `origin`.
    pub fn add(&mut self, origin: usize) -> Result<JumpId, ErrorKind> {
        if self.entries.len() >= MAX_JUMPS {
            return Err(ErrorKind::TooManyJumps);
        }

        self.entries.push(JumpEntry {
            origin,
            distance: None,
        });
        self.pending.push(self.entries.len() - 1);

        Ok(self.entries.len() - 1)
    }

    /// Closes the innermost open branch so that it lands on `target`.
    pub fn resolve_last(&mut self, target: usize) -> Result<JumpId, ErrorKind> {
        let id = self
            .pending
            .pop()
            .ok_or_else(|| InternalError("no open jump to resolve".to_string()))?;
        let entry = &mut self.entries[id];

        // Distance counts from the byte after the two byte branch.
        let distance = target
            .checked_sub(entry.origin + 2)
            .ok_or_else(|| InternalError(format!("jump J{id} resolved backwards")))?;

        entry.distance = Some(u8::try_from(distance).map_err(|_| ErrorKind::TooLarge)?);

        Ok(id)
    }

    pub fn entry(&self, id: JumpId) -> &JumpEntry {
        &self.entries[id]
    }
}

/// Instructions grow upwards from address zero while strings grow downwards from the top
/// of the image.
#[derive(Debug)]
pub struct Code {
    bytes: Vec<CodeByte>,
    heap: Vec<u8>,
    heap_address: usize,
}

impl Default for Code {
    fn default() -> Self {
        Self {
            bytes: vec![],
            heap: vec![],
            heap_address: IMAGE_SIZE - 1,
        }
    }
}

impl Code {
    pub fn new() -> Self {
        Self::default()
    }

    /// Address of the next emitted byte.
    pub fn address(&self) -> usize {
        self.bytes.len()
    }

    pub fn bytes(&self) -> &[CodeByte] {
        &self.bytes
    }

    pub fn heap(&self) -> &[u8] {
        &self.heap
    }

    pub fn push(&mut self, byte: CodeByte) {
        self.bytes.push(byte);
    }

    pub fn emit(&mut self, op: Op) {
        self.push(CodeByte::Byte(op.into()));
    }

    pub fn emit_const(&mut self, op: Op, value: u8) {
        self.emit(op);
        self.push(CodeByte::Byte(value));
    }

    pub fn emit_address(&mut self, op: Op, address: Address) {
        self.emit(op);

        match address {
            Address::Absolute(address) => {
                let [low, high] = address.to_le_bytes();

                self.push(CodeByte::Byte(low));
                self.push(CodeByte::Byte(high));
            }
            Address::Static(id) => {
                self.push(CodeByte::Static(id));
                self.push(CodeByte::StaticHigh(id));
            }
        }
    }

    pub fn emit_jump(&mut self, op: Op, id: JumpId) {
        self.emit(op);
        self.push(CodeByte::Jump(id));
    }

    /// Stores a null terminated string below the previous one and returns its address.
    pub fn add_string(&mut self, value: &str) -> Result<u8, ErrorKind> {
        self.heap_address = self
            .heap_address
            .checked_sub(value.len() + 1)
            .ok_or(ErrorKind::TooLarge)?;

        let mut bytes = value.bytes().collect::<Vec<_>>();
        bytes.push(0);
        bytes.extend_from_slice(&self.heap);
        self.heap = bytes;

        u8::try_from(self.heap_address).map_err(|_| ErrorKind::TooLarge)
    }

    /// Resolves every placeholder. Static variables are laid out directly after the
    /// instructions in allocation order.
    pub fn backpatch(&self, statics: &StaticTable, jumps: &JumpTable) -> Result<Vec<u8>, ErrorKind> {
        let base = self.bytes.len();

        self.bytes
            .iter()
            .map(|byte| match *byte {
                CodeByte::Byte(byte) => Ok(byte),
                CodeByte::Static(id) => {
                    u8::try_from(base + statics.entry(id).offset).map_err(|_| ErrorKind::TooLarge)
                }
                CodeByte::StaticHigh(_) => Ok(0),
                CodeByte::Jump(id) => jumps.entry(id).distance.ok_or_else(|| {
                    ErrorKind::Internal(InternalError(format!("jump J{id} never resolved")))
                }),
            })
            .collect()
    }

    /// Lays out the final image: instructions, zero padding, heap and a terminating zero.
    pub fn image(&self, statics: &StaticTable, jumps: &JumpTable) -> Result<Image, ErrorKind> {
        if self.bytes.len() + statics.len() + self.heap.len() > IMAGE_SIZE - 1 {
            return Err(ErrorKind::TooLarge);
        }

        let mut bytes = self.backpatch(statics, jumps)?;

        bytes.resize(IMAGE_SIZE - 1 - self.heap.len(), 0);
        bytes.extend_from_slice(&self.heap);
        bytes.push(0);

        Ok(Image(bytes))
    }
}

impl Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bytes = self
            .bytes
            .iter()
            .map(|byte| byte.to_string())
            .collect::<Vec<_>>();

        write!(f, "{}", bytes.join(" "))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub address: usize,
    pub op: Op,
    pub operands: Vec<u8>,
}

impl Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02X}  {:02X}", self.address, u8::from(self.op))?;

        for operand in &self.operands {
            write!(f, " {operand:02X}")?;
        }

        let padding = 3 * (2 - self.operands.len());

        match (self.op, self.operands.as_slice()) {
            (Op::LdaConst | Op::LdxConst | Op::LdyConst, [value]) => {
                write!(f, "{:padding$}  {} #${value:02X}", "", self.op)
            }
            (_, [low, high]) => write!(f, "{:padding$}  {} ${high:02X}{low:02X}", "", self.op),
            (_, [distance]) => write!(f, "{:padding$}  {} ${distance:02X}", "", self.op),
            _ => write!(f, "{:padding$}  {}", "", self.op),
        }
    }
}

/// The finished 256 byte memory image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Image(Vec<u8>);

impl Image {
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decodes instructions from address zero up to and including the first `BRK`.
    pub fn disassemble(&self) -> Vec<Instruction> {
        let mut instructions = vec![];
        let mut address = 0;

        while let Some(&byte) = self.0.get(address) {
            let Ok(op) = Op::try_from(byte) else {
                break;
            };
            let end = (address + 1 + op.operand_len()).min(self.0.len());

            instructions.push(Instruction {
                address,
                op,
                operands: self.0[address + 1..end].to_vec(),
            });

            if op == Op::Brk {
                break;
            }

            address = end;
        }

        instructions
    }
}

impl Display for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bytes = self
            .0
            .iter()
            .map(|byte| format!("{byte:02X}"))
            .collect::<Vec<_>>();

        write!(f, "{}", bytes.join(" "))
    }
}
