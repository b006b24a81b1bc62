use std::fmt::Display;

use num_enum::{IntoPrimitive, TryFromPrimitive};

#[derive(TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Brk = 0x00,
    AdcMem = 0x6D,
    StaMem = 0x8D,
    LdyConst = 0xA0,
    LdxConst = 0xA2,
    LdaConst = 0xA9,
    LdyMem = 0xAC,
    LdaMem = 0xAD,
    LdxMem = 0xAE,
    Bne = 0xD0,
    CpxMem = 0xEC,
    Sys = 0xFF,
}

impl Op {
    /// Number of operand bytes following the opcode.
    pub fn operand_len(self) -> usize {
        match self {
            Op::Brk | Op::Sys => 0,
            Op::LdaConst | Op::LdxConst | Op::LdyConst | Op::Bne => 1,
            Op::AdcMem | Op::StaMem | Op::LdaMem | Op::LdxMem | Op::LdyMem | Op::CpxMem => 2,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Op::Brk => "BRK",
            Op::AdcMem => "ADC",
            Op::StaMem => "STA",
            Op::LdyConst | Op::LdyMem => "LDY",
            Op::LdxConst | Op::LdxMem => "LDX",
            Op::LdaConst | Op::LdaMem => "LDA",
            Op::Bne => "BNE",
            Op::CpxMem => "CPX",
            Op::Sys => "SYS",
        }
    }
}

impl Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}
