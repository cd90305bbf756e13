use crate::{
    assembly::{Instruction, OpCode, Operand, OperandType, INSTRUCTIONS, INSTRUCTIONS_FE},
    file::parser::Parser,
    metadata::{tables::TableId, token::Token, types::MemberRef},
    Result,
};

/// Resolves the metadata tokens that instruction operands refer to.
pub trait OperandResolver {
    /// Resolve an `ldstr` token to its `#US` literal.
    ///
    /// # Errors
    /// Returns an error if the token does not point at a valid `#US` entry.
    fn user_string(&self, token: Token) -> Result<String>;

    /// Resolve a `MemberRef` token. `None` leaves the operand as a plain token.
    fn member_ref(&self, token: Token) -> Option<MemberRef>;
}

/// An instruction exactly as encoded, with its operand bytes unresolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawInstruction<'a> {
    /// Byte offset inside the method's code
    pub offset: u32,
    /// The opcode
    pub opcode: OpCode,
    /// Operand bytes, including the count of a switch table
    pub operand: &'a [u8],
}

impl RawInstruction<'_> {
    /// Encoded size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.opcode.size() + self.operand.len()
    }

    /// The metadata token operand, if the opcode takes one.
    #[must_use]
    pub fn token(&self) -> Option<Token> {
        if self.opcode.operand_type() != OperandType::Token {
            return None;
        }

        let bytes: [u8; 4] = self.operand.try_into().ok()?;
        Some(Token::new(u32::from_le_bytes(bytes)))
    }
}

/// Decode the next instruction without resolving its operand.
///
/// ## Arguments
/// * 'parser' - Positioned at the first opcode byte; offsets are taken from its position
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for reserved opcodes and [`crate::Error::OutOfBounds`]
/// if an operand runs past the end of the code.
pub fn decode_raw<'a>(parser: &mut Parser<'a>) -> Result<RawInstruction<'a>> {
    let offset = u32::try_from(parser.pos())
        .map_err(|_| malformed_error!("Instruction offset exceeds u32"))?;
    let first_byte = parser.read_le::<u8>()?;

    let (cil_instruction, opcode) = match first_byte {
        0xFE => {
            let second_byte = parser.read_le::<u8>()?;

            match INSTRUCTIONS_FE.get(second_byte as usize) {
                Some(instr) => (instr, 0xFE00 | u16::from(second_byte)),
                None => return Err(malformed_error!("Invalid opcode: FE {:02X}", second_byte)),
            }
        }
        _ => match INSTRUCTIONS.get(first_byte as usize) {
            Some(instr) => (instr, u16::from(first_byte)),
            None => return Err(malformed_error!("Invalid opcode: {:X}", first_byte)),
        },
    };

    if cil_instruction.instr.is_empty() {
        return Err(malformed_error!("Reserved opcode: {:04X}", opcode));
    }

    let Some(opcode) = OpCode::from_value(opcode) else {
        return Err(malformed_error!("Reserved opcode: {:04X}", opcode));
    };

    let operand = match cil_instruction.op_type.size() {
        Some(size) => parser.read_bytes(size)?,
        None => {
            let start = parser.pos();
            let case_count = parser.read_le::<u32>()? as usize;
            let table_size = case_count
                .checked_mul(4)
                .ok_or_else(|| malformed_error!("Switch table too large - {}", case_count))?;
            parser.advance_by(table_size)?;

            &parser.data()[start..parser.pos()]
        }
    };

    Ok(RawInstruction {
        offset,
        opcode,
        operand,
    })
}

/// Decode a complete code stream without resolving operands.
///
/// # Errors
/// Same as [`decode_raw`].
pub fn decode_raw_stream(code: &[u8]) -> Result<Vec<RawInstruction<'_>>> {
    let mut parser = Parser::new(code);
    let mut instructions = Vec::new();

    while parser.has_more_data() {
        instructions.push(decode_raw(&mut parser)?);
    }

    Ok(instructions)
}

/// Resolve the operand of a raw instruction.
///
/// `ldstr` operands must resolve to a `#US` literal. `MemberRef` tokens become
/// [`Operand::Member`] when the resolver knows them; every other token stays an
/// [`Operand::Token`].
///
/// # Errors
/// Returns an error if an `ldstr` operand does not resolve.
pub fn resolve(raw: &RawInstruction<'_>, resolver: &impl OperandResolver) -> Result<Instruction> {
    let operand = match raw.token() {
        Some(token) if raw.opcode == OpCode::LDSTR => {
            if !token.is_user_string() {
                return Err(malformed_error!(
                    "ldstr at IL_{:04x} references non-string token {}",
                    raw.offset,
                    token
                ));
            }
            Operand::String(resolver.user_string(token)?)
        }
        Some(token) if token.table() == TableId::MemberRef.token_type() => resolver
            .member_ref(token)
            .map_or(Operand::Token(token), Operand::Member),
        Some(token) => Operand::Token(token),
        None if raw.operand.is_empty() => Operand::None,
        None => Operand::Bytes(raw.operand.to_vec()),
    };

    Ok(Instruction::new(raw.offset, raw.opcode, operand))
}

/// Decode and resolve a complete code stream.
///
/// ## Arguments
/// * 'code' - The IL bytes of one method body, without header
/// * 'resolver' - Source of `#US` literals and `MemberRef` targets
///
/// # Errors
/// Returns an error for reserved opcodes, truncated operands or unresolvable `ldstr` tokens.
pub fn decode_stream(code: &[u8], resolver: &impl OperandResolver) -> Result<Vec<Instruction>> {
    decode_raw_stream(code)?
        .iter()
        .map(|raw| resolve(raw, resolver))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::Error;

    struct MapResolver {
        strings: HashMap<u32, String>,
        members: HashMap<u32, MemberRef>,
    }

    impl MapResolver {
        fn new() -> MapResolver {
            let mut strings = HashMap::new();
            strings.insert(0x7000_0001, "SGVsbG8=".to_string());

            let mut members = HashMap::new();
            members.insert(
                0x0A00_0001,
                MemberRef::new(Token(0x0A00_0001), "System.Convert", "FromBase64String"),
            );

            MapResolver { strings, members }
        }
    }

    impl OperandResolver for MapResolver {
        fn user_string(&self, token: Token) -> Result<String> {
            self.strings
                .get(&token.value())
                .cloned()
                .ok_or(Error::OutOfBounds)
        }

        fn member_ref(&self, token: Token) -> Option<MemberRef> {
            self.members.get(&token.value()).cloned()
        }
    }

    #[test]
    fn ldstr_call() {
        #[rustfmt::skip]
        let code = [
            0x72, 0x01, 0x00, 0x00, 0x70, // ldstr
            0x28, 0x01, 0x00, 0x00, 0x0A, // call FromBase64String
            0x28, 0x02, 0x00, 0x00, 0x0A, // call (unknown member)
            0x28, 0x01, 0x00, 0x00, 0x06, // call MethodDef
            0x26,                         // pop
            0x2A,                         // ret
        ];

        let instructions = decode_stream(&code, &MapResolver::new()).unwrap();
        assert_eq!(instructions.len(), 6);

        assert_eq!(instructions[0].opcode, OpCode::LDSTR);
        assert_eq!(instructions[0].operand.as_string(), Some("SGVsbG8="));

        let member = instructions[1].operand.as_member().unwrap();
        assert_eq!(member.declaring_type, "System.Convert");
        assert_eq!(member.name, "FromBase64String");
        assert_eq!(instructions[1].offset, 5);

        assert_eq!(instructions[2].operand, Operand::Token(Token(0x0A00_0002)));
        assert_eq!(instructions[3].operand, Operand::Token(Token(0x0600_0001)));
        assert_eq!(instructions[4].opcode, OpCode::POP);
        assert_eq!(instructions[5].offset, 21);
    }

    #[test]
    fn immediates() {
        #[rustfmt::skip]
        let code = [
            0x1F, 0x05,                   // ldc.i4.s 5
            0x20, 0x01, 0x02, 0x03, 0x04, // ldc.i4
            0x2B, 0x00,                   // br.s
            0xFE, 0x0C, 0x01, 0x00,       // ldloc 1
            0xFE, 0x01,                   // ceq
            0x45, 0x02, 0x00, 0x00, 0x00, // switch (2 targets)
            0x00, 0x00, 0x00, 0x00,
            0x01, 0x00, 0x00, 0x00,
            0x2A,
        ];

        let instructions = decode_stream(&code, &MapResolver::new()).unwrap();
        assert_eq!(instructions.len(), 7);
        assert_eq!(instructions[0].operand, Operand::Bytes(vec![0x05]));
        assert_eq!(instructions[1].operand.size(), 4);
        assert_eq!(instructions[3].opcode.value(), 0xFE0C);
        assert_eq!(instructions[3].size(), 4);
        assert_eq!(instructions[4].operand, Operand::None);
        assert_eq!(instructions[5].size(), 13);
        assert_eq!(instructions[6].offset, 28);

        let raw = decode_raw_stream(&code).unwrap();
        let total: usize = raw.iter().map(RawInstruction::size).sum();
        assert_eq!(total, code.len());
    }

    #[test]
    fn reserved_and_truncated() {
        assert!(decode_raw_stream(&[0x24]).is_err());
        assert!(decode_raw_stream(&[0xFE, 0x08]).is_err());
        assert!(decode_raw_stream(&[0xFE]).is_err());
        assert!(decode_raw_stream(&[0xE1]).is_err());
        assert!(decode_raw_stream(&[0x72, 0x01, 0x00]).is_err());
        assert!(decode_raw_stream(&[0x45, 0x02, 0x00, 0x00, 0x00, 0x00]).is_err());
        assert!(decode_raw_stream(&[0x45, 0xFF, 0xFF, 0xFF, 0xFF]).is_err());
    }

    #[test]
    fn unresolved_ldstr() {
        let code = [0x72, 0x02, 0x00, 0x00, 0x70, 0x2A];
        assert!(decode_stream(&code, &MapResolver::new()).is_err());

        let code = [0x72, 0x01, 0x00, 0x00, 0x0A, 0x2A];
        assert!(decode_stream(&code, &MapResolver::new()).is_err());
    }

    #[test]
    fn raw_token() {
        let code = [0x28, 0x01, 0x00, 0x00, 0x0A, 0x2A];
        let raw = decode_raw_stream(&code).unwrap();

        assert_eq!(raw[0].token(), Some(Token(0x0A00_0001)));
        assert_eq!(raw[0].size(), 5);
        assert_eq!(raw[1].token(), None);
    }
}
