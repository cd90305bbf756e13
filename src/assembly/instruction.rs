use std::fmt;

use crate::{
    assembly::OpCode,
    metadata::{token::Token, types::MemberRef},
};

/// A resolved instruction operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// No operand
    None,
    /// `ldstr` literal, resolved from the `#US` heap
    String(String),
    /// A `MemberRef` target, resolved to its declaring type and name
    Member(MemberRef),
    /// Any other metadata token, left unresolved
    Token(Token),
    /// Raw little-endian operand bytes for immediates, branch targets and switch tables
    Bytes(Vec<u8>),
}

impl Operand {
    /// Encoded size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Operand::None => 0,
            Operand::String(_) | Operand::Member(_) | Operand::Token(_) => 4,
            Operand::Bytes(bytes) => bytes.len(),
        }
    }

    /// The literal of an `ldstr` operand.
    #[must_use]
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Operand::String(value) => Some(value),
            _ => None,
        }
    }

    /// The target of a resolved `MemberRef` operand.
    #[must_use]
    pub fn as_member(&self) -> Option<&MemberRef> {
        match self {
            Operand::Member(member) => Some(member),
            _ => None,
        }
    }
}

/// One CIL instruction as held by a [`crate::metadata::method::MethodBody`].
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Byte offset of the instruction inside the method's code
    pub offset: u32,
    /// The opcode
    pub opcode: OpCode,
    /// The operand
    pub operand: Operand,
}

impl Instruction {
    /// Create a new instruction.
    #[must_use]
    pub fn new(offset: u32, opcode: OpCode, operand: Operand) -> Instruction {
        Instruction {
            offset,
            opcode,
            operand,
        }
    }

    /// A `nop` at `offset`.
    #[must_use]
    pub fn nop(offset: u32) -> Instruction {
        Instruction::new(offset, OpCode::NOP, Operand::None)
    }

    /// Encoded size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.opcode.size() + self.operand.size()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IL_{:04x}: {}", self.offset, self.opcode)?;
        match &self.operand {
            Operand::None => Ok(()),
            Operand::String(value) => write!(f, " {value:?}"),
            Operand::Member(member) => write!(f, " {member}"),
            Operand::Token(token) => write!(f, " {token}"),
            Operand::Bytes(bytes) => {
                for byte in bytes {
                    write!(f, " {byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}
