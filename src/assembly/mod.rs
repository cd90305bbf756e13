//! CIL instruction decoding.
//!
//! Method bodies are decoded into [`Instruction`]s whose operands are resolved against the
//! image's metadata through an [`OperandResolver`]: `ldstr` literals become
//! [`Operand::String`] and `MemberRef` targets become [`Operand::Member`]. The writer uses
//! the unresolved [`RawInstruction`] form to compare an edited body with the original bytes.

mod decoder;
mod instruction;
mod opcodes;

pub use decoder::{
    decode_raw, decode_raw_stream, decode_stream, resolve, OperandResolver, RawInstruction,
};
pub use instruction::{Instruction, Operand};
pub use opcodes::{CilInstruction, OpCode, OperandType, INSTRUCTIONS, INSTRUCTIONS_FE};
