mod code;
mod codegen;
mod opcode;

pub use code::{
    Address, Code, CodeByte, Image, Instruction, JumpTable, StaticTable, IMAGE_SIZE, MAX_JUMPS,
    SCRATCH,
};
pub use codegen::{generate, CodegenError, ErrorKind, Generator};
pub use opcode::Op;
