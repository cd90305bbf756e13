//! CIL opcode table (ECMA-335 III).
//!
//! One table per encoding page: [`INSTRUCTIONS`] for single-byte opcodes `0x00..=0xE0` and
//! [`INSTRUCTIONS_FE`] for the `0xFE`-prefixed page. Reserved slots carry an empty mnemonic.

use std::fmt;

/// Encoding of an instruction operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandType {
    /// No operand present
    None,
    /// Signed 8-bit integer (also short branch targets)
    Int8,
    /// Unsigned 8-bit integer
    UInt8,
    /// Unsigned 16-bit integer
    UInt16,
    /// Signed 32-bit integer (also long branch targets)
    Int32,
    /// Signed 64-bit integer
    Int64,
    /// 32-bit floating point
    Float32,
    /// 64-bit floating point
    Float64,
    /// Metadata token reference
    Token,
    /// Switch table operand
    Switch,
}

impl OperandType {
    /// Size in bytes of this operand type, `None` for the variable-size switch table.
    #[must_use]
    pub fn size(&self) -> Option<usize> {
        match self {
            OperandType::None => Some(0),
            OperandType::Int8 | OperandType::UInt8 => Some(1),
            OperandType::UInt16 => Some(2),
            OperandType::Int32 | OperandType::Float32 | OperandType::Token => Some(4),
            OperandType::Int64 | OperandType::Float64 => Some(8),
            OperandType::Switch => None,
        }
    }
}

/// Static description of one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CilInstruction {
    /// Mnemonic, empty for reserved encodings
    pub instr: &'static str,
    /// Operand encoding
    pub op_type: OperandType,
}

const fn op(instr: &'static str, op_type: OperandType) -> CilInstruction {
    CilInstruction { instr, op_type }
}

const RESERVED: CilInstruction = op("", OperandType::None);

use OperandType as O;

/// Single-byte opcodes `0x00..=0xE0`.
pub static INSTRUCTIONS: [CilInstruction; 0xE1] = [
    // 0x00
    op("nop", O::None),
    op("break", O::None),
    op("ldarg.0", O::None),
    op("ldarg.1", O::None),
    op("ldarg.2", O::None),
    op("ldarg.3", O::None),
    op("ldloc.0", O::None),
    op("ldloc.1", O::None),
    op("ldloc.2", O::None),
    op("ldloc.3", O::None),
    op("stloc.0", O::None),
    op("stloc.1", O::None),
    op("stloc.2", O::None),
    op("stloc.3", O::None),
    op("ldarg.s", O::UInt8),
    op("ldarga.s", O::UInt8),
    // 0x10
    op("starg.s", O::UInt8),
    op("ldloc.s", O::UInt8),
    op("ldloca.s", O::UInt8),
    op("stloc.s", O::UInt8),
    op("ldnull", O::None),
    op("ldc.i4.m1", O::None),
    op("ldc.i4.0", O::None),
    op("ldc.i4.1", O::None),
    op("ldc.i4.2", O::None),
    op("ldc.i4.3", O::None),
    op("ldc.i4.4", O::None),
    op("ldc.i4.5", O::None),
    op("ldc.i4.6", O::None),
    op("ldc.i4.7", O::None),
    op("ldc.i4.8", O::None),
    op("ldc.i4.s", O::Int8),
    // 0x20
    op("ldc.i4", O::Int32),
    op("ldc.i8", O::Int64),
    op("ldc.r4", O::Float32),
    op("ldc.r8", O::Float64),
    RESERVED,
    op("dup", O::None),
    op("pop", O::None),
    op("jmp", O::Token),
    op("call", O::Token),
    op("calli", O::Token),
    op("ret", O::None),
    op("br.s", O::Int8),
    op("brfalse.s", O::Int8),
    op("brtrue.s", O::Int8),
    op("beq.s", O::Int8),
    op("bge.s", O::Int8),
    // 0x30
    op("bgt.s", O::Int8),
    op("ble.s", O::Int8),
    op("blt.s", O::Int8),
    op("bne.un.s", O::Int8),
    op("bge.un.s", O::Int8),
    op("bgt.un.s", O::Int8),
    op("ble.un.s", O::Int8),
    op("blt.un.s", O::Int8),
    op("br", O::Int32),
    op("brfalse", O::Int32),
    op("brtrue", O::Int32),
    op("beq", O::Int32),
    op("bge", O::Int32),
    op("bgt", O::Int32),
    op("ble", O::Int32),
    op("blt", O::Int32),
    // 0x40
    op("bne.un", O::Int32),
    op("bge.un", O::Int32),
    op("bgt.un", O::Int32),
    op("ble.un", O::Int32),
    op("blt.un", O::Int32),
    op("switch", O::Switch),
    op("ldind.i1", O::None),
    op("ldind.u1", O::None),
    op("ldind.i2", O::None),
    op("ldind.u2", O::None),
    op("ldind.i4", O::None),
    op("ldind.u4", O::None),
    op("ldind.i8", O::None),
    op("ldind.i", O::None),
    op("ldind.r4", O::None),
    op("ldind.r8", O::None),
    // 0x50
    op("ldind.ref", O::None),
    op("stind.ref", O::None),
    op("stind.i1", O::None),
    op("stind.i2", O::None),
    op("stind.i4", O::None),
    op("stind.i8", O::None),
    op("stind.r4", O::None),
    op("stind.r8", O::None),
    op("add", O::None),
    op("sub", O::None),
    op("mul", O::None),
    op("div", O::None),
    op("div.un", O::None),
    op("rem", O::None),
    op("rem.un", O::None),
    op("and", O::None),
    // 0x60
    op("or", O::None),
    op("xor", O::None),
    op("shl", O::None),
    op("shr", O::None),
    op("shr.un", O::None),
    op("neg", O::None),
    op("not", O::None),
    op("conv.i1", O::None),
    op("conv.i2", O::None),
    op("conv.i4", O::None),
    op("conv.i8", O::None),
    op("conv.r4", O::None),
    op("conv.r8", O::None),
    op("conv.u4", O::None),
    op("conv.u8", O::None),
    op("callvirt", O::Token),
    // 0x70
    op("cpobj", O::Token),
    op("ldobj", O::Token),
    op("ldstr", O::Token),
    op("newobj", O::Token),
    op("castclass", O::Token),
    op("isinst", O::Token),
    op("conv.r.un", O::None),
    RESERVED,
    RESERVED,
    op("unbox", O::Token),
    op("throw", O::None),
    op("ldfld", O::Token),
    op("ldflda", O::Token),
    op("stfld", O::Token),
    op("ldsfld", O::Token),
    op("ldsflda", O::Token),
    // 0x80
    op("stsfld", O::Token),
    op("stobj", O::Token),
    op("conv.ovf.i1.un", O::None),
    op("conv.ovf.i2.un", O::None),
    op("conv.ovf.i4.un", O::None),
    op("conv.ovf.i8.un", O::None),
    op("conv.ovf.u1.un", O::None),
    op("conv.ovf.u2.un", O::None),
    op("conv.ovf.u4.un", O::None),
    op("conv.ovf.u8.un", O::None),
    op("conv.ovf.i.un", O::None),
    op("conv.ovf.u.un", O::None),
    op("box", O::Token),
    op("newarr", O::Token),
    op("ldlen", O::None),
    op("ldelema", O::Token),
    // 0x90
    op("ldelem.i1", O::None),
    op("ldelem.u1", O::None),
    op("ldelem.i2", O::None),
    op("ldelem.u2", O::None),
    op("ldelem.i4", O::None),
    op("ldelem.u4", O::None),
    op("ldelem.i8", O::None),
    op("ldelem.i", O::None),
    op("ldelem.r4", O::None),
    op("ldelem.r8", O::None),
    op("ldelem.ref", O::None),
    op("stelem.i", O::None),
    op("stelem.i1", O::None),
    op("stelem.i2", O::None),
    op("stelem.i4", O::None),
    op("stelem.i8", O::None),
    // 0xA0
    op("stelem.r4", O::None),
    op("stelem.r8", O::None),
    op("stelem.ref", O::None),
    op("ldelem", O::Token),
    op("stelem", O::Token),
    op("unbox.any", O::Token),
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    // 0xB0
    RESERVED,
    RESERVED,
    RESERVED,
    op("conv.ovf.i1", O::None),
    op("conv.ovf.u1", O::None),
    op("conv.ovf.i2", O::None),
    op("conv.ovf.u2", O::None),
    op("conv.ovf.i4", O::None),
    op("conv.ovf.u4", O::None),
    op("conv.ovf.i8", O::None),
    op("conv.ovf.u8", O::None),
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    // 0xC0
    RESERVED,
    RESERVED,
    op("refanyval", O::Token),
    op("ckfinite", O::None),
    RESERVED,
    RESERVED,
    op("mkrefany", O::Token),
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    RESERVED,
    // 0xD0
    op("ldtoken", O::Token),
    op("conv.u2", O::None),
    op("conv.u1", O::None),
    op("conv.i", O::None),
    op("conv.ovf.i", O::None),
    op("conv.ovf.u", O::None),
    op("add.ovf", O::None),
    op("add.ovf.un", O::None),
    op("mul.ovf", O::None),
    op("mul.ovf.un", O::None),
    op("sub.ovf", O::None),
    op("sub.ovf.un", O::None),
    op("endfinally", O::None),
    op("leave", O::Int32),
    op("leave.s", O::Int8),
    op("stind.i", O::None),
    // 0xE0
    op("conv.u", O::None),
];

/// Two-byte opcodes `0xFE 0x00..=0x1E`.
pub static INSTRUCTIONS_FE: [CilInstruction; 0x1F] = [
    // 0xFE 0x00
    op("arglist", O::None),
    op("ceq", O::None),
    op("cgt", O::None),
    op("cgt.un", O::None),
    op("clt", O::None),
    op("clt.un", O::None),
    op("ldftn", O::Token),
    op("ldvirtftn", O::Token),
    RESERVED,
    op("ldarg", O::UInt16),
    op("ldarga", O::UInt16),
    op("starg", O::UInt16),
    op("ldloc", O::UInt16),
    op("ldloca", O::UInt16),
    op("stloc", O::UInt16),
    op("localloc", O::None),
    // 0xFE 0x10
    RESERVED,
    op("endfilter", O::None),
    op("unaligned.", O::UInt8),
    op("volatile.", O::None),
    op("tail.", O::None),
    op("initobj", O::Token),
    op("constrained.", O::Token),
    op("cpblk", O::None),
    op("initblk", O::None),
    op("no.", O::UInt8),
    op("rethrow", O::None),
    RESERVED,
    op("sizeof", O::Token),
    op("refanytype", O::None),
    op("readonly.", O::None),
];

/// An opcode value. Two-byte opcodes are stored as `0xFE00 | second_byte`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpCode(u16);

impl OpCode {
    /// `nop`
    pub const NOP: OpCode = OpCode(0x00);
    /// `pop`
    pub const POP: OpCode = OpCode(0x26);
    /// `call`
    pub const CALL: OpCode = OpCode(0x28);
    /// `ret`
    pub const RET: OpCode = OpCode(0x2A);
    /// `br.s`
    pub const BR_S: OpCode = OpCode(0x2B);
    /// `ldc.i4.s`
    pub const LDC_I4_S: OpCode = OpCode(0x1F);
    /// `callvirt`
    pub const CALLVIRT: OpCode = OpCode(0x6F);
    /// `ldstr`
    pub const LDSTR: OpCode = OpCode(0x72);

    /// Look up a defined opcode by its encoded value.
    #[must_use]
    pub fn from_value(value: u16) -> Option<OpCode> {
        let opcode = OpCode(value);
        opcode.info().map(|_| opcode)
    }

    /// The encoded value.
    #[must_use]
    pub fn value(&self) -> u16 {
        self.0
    }

    /// `true` for `0xFE`-prefixed opcodes.
    #[must_use]
    pub fn is_prefixed(&self) -> bool {
        self.0 >> 8 == 0xFE
    }

    /// Static information, `None` for reserved or out-of-range values.
    #[must_use]
    pub fn info(&self) -> Option<&'static CilInstruction> {
        let entry = match self.0 >> 8 {
            0x00 => INSTRUCTIONS.get(usize::from(self.0)),
            0xFE => INSTRUCTIONS_FE.get(usize::from(self.0 & 0xFF)),
            _ => None,
        }?;

        if entry.instr.is_empty() {
            None
        } else {
            Some(entry)
        }
    }

    /// Mnemonic, `"??"` for undefined values.
    #[must_use]
    pub fn mnemonic(&self) -> &'static str {
        self.info().map_or("??", |info| info.instr)
    }

    /// Operand encoding.
    #[must_use]
    pub fn operand_type(&self) -> OperandType {
        self.info().map_or(OperandType::None, |info| info.op_type)
    }

    /// Size of the opcode itself in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        if self.is_prefixed() {
            2
        } else {
            1
        }
    }

    /// Encoded opcode bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.is_prefixed() {
            vec![0xFE, (self.0 & 0xFF) as u8]
        } else {
            vec![self.0 as u8]
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl fmt::Debug for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpCode({} 0x{:02x})", self.mnemonic(), self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_shape() {
        assert_eq!(INSTRUCTIONS[0x00].instr, "nop");
        assert_eq!(INSTRUCTIONS[0x28].instr, "call");
        assert_eq!(INSTRUCTIONS[0x45].op_type, OperandType::Switch);
        assert_eq!(INSTRUCTIONS[0x72].instr, "ldstr");
        assert_eq!(INSTRUCTIONS[0x8F].instr, "ldelema");
        assert_eq!(INSTRUCTIONS[0xA5].instr, "unbox.any");
        assert_eq!(INSTRUCTIONS[0xB3].instr, "conv.ovf.i1");
        assert_eq!(INSTRUCTIONS[0xC2].instr, "refanyval");
        assert_eq!(INSTRUCTIONS[0xD0].instr, "ldtoken");
        assert_eq!(INSTRUCTIONS[0xDD].op_type, OperandType::Int32);
        assert_eq!(INSTRUCTIONS[0xE0].instr, "conv.u");

        assert_eq!(INSTRUCTIONS_FE[0x06].instr, "ldftn");
        assert_eq!(INSTRUCTIONS_FE[0x12].op_type, OperandType::UInt8);
        assert_eq!(INSTRUCTIONS_FE[0x1C].instr, "sizeof");
        assert_eq!(INSTRUCTIONS_FE[0x1E].instr, "readonly.");
    }

    #[test]
    fn operand_sizes() {
        let token_opcodes = [
            0x27, 0x28, 0x29, 0x6F, 0x70, 0x71, 0x72, 0x73, 0x74, 0x75, 0x79, 0x7B, 0x7C, 0x7D,
            0x7E, 0x7F, 0x80, 0x81, 0x8C, 0x8D, 0x8F, 0xA3, 0xA4, 0xA5, 0xC2, 0xC6, 0xD0,
        ];
        for value in token_opcodes {
            assert_eq!(
                OpCode(value).operand_type(),
                OperandType::Token,
                "opcode 0x{value:02x}"
            );
        }

        for value in 0x2B..=0x37 {
            assert_eq!(OpCode(value).operand_type(), OperandType::Int8);
        }
        for value in 0x38..=0x44 {
            assert_eq!(OpCode(value).operand_type(), OperandType::Int32);
        }
        for value in 0xFE09..=0xFE0E {
            assert_eq!(OpCode(value).operand_type(), OperandType::UInt16);
        }
    }

    #[test]
    fn reserved() {
        for value in [0x24, 0x77, 0x78, 0xA6, 0xB2, 0xBB, 0xC1, 0xC4, 0xC7, 0xCF, 0xE1, 0xFF] {
            assert!(OpCode::from_value(value).is_none(), "opcode 0x{value:02x}");
        }
        for value in [0xFE08, 0xFE10, 0xFE1B, 0xFE1F, 0xFD00] {
            assert!(OpCode::from_value(value).is_none(), "opcode 0x{value:04x}");
        }
    }

    #[test]
    fn opcode_helpers() {
        assert_eq!(OpCode::LDSTR.mnemonic(), "ldstr");
        assert_eq!(OpCode::CALL.to_string(), "call");
        assert_eq!(OpCode::NOP.size(), 1);
        assert_eq!(OpCode::NOP.to_bytes(), vec![0x00]);

        let ceq = OpCode::from_value(0xFE01).unwrap();
        assert!(ceq.is_prefixed());
        assert_eq!(ceq.size(), 2);
        assert_eq!(ceq.to_bytes(), vec![0xFE, 0x01]);
        assert_eq!(format!("{ceq:?}"), "OpCode(ceq 0xfe01)");
    }
}
