//! Applies scanner matches to the module.

use serde::Serialize;

use crate::{
    assembly::{Instruction, OpCode, Operand},
    deobfuscation::{
        decode::decode_base64_text,
        scanner::{scan_with, Match, TargetSignature},
    },
    metadata::{module::Module, token::Token},
};

/// A literal that was decoded and patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedPair {
    /// The base64 text as found in the literal
    pub encoded: String,
    /// The plaintext now held by the literal
    pub decoded: String,
    /// The method containing the literal
    pub method: Token,
    /// IL offset of the neutralized call
    pub offset: u32,
}

/// A match that was left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchFailure {
    /// The literal text, if the match still pointed at one
    pub encoded: Option<String>,
    /// Why the match was not applied
    pub cause: String,
    /// The method containing the match
    pub method: Token,
    /// IL offset of the call
    pub offset: u32,
}

/// Outcome of a patch run, in scan order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PatchReport {
    /// Literals that were decoded
    pub decoded: Vec<DecodedPair>,
    /// Matches that could not be applied
    pub failures: Vec<PatchFailure>,
}

impl PatchReport {
    /// `true` if nothing was decoded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decoded.is_empty()
    }
}

/// Decode and patch every match against `System.Convert::FromBase64String`.
///
/// See [`patch_with`].
#[must_use]
pub fn patch(module: &mut Module, matches: Vec<Match>) -> PatchReport {
    patch_with(module, matches, &TargetSignature::default())
}

/// Decode and patch every match.
///
/// Each match is checked against the current model first; a match whose positions no longer
/// hold `ldstr; call <target>` is reported as a failure and left alone. A literal that does not
/// decode is logged and left alone. Otherwise the literal receives the plaintext and the call
/// becomes a `nop` at the same offset.
#[must_use]
pub fn patch_with(module: &mut Module, matches: Vec<Match>, target: &TargetSignature) -> PatchReport {
    let mut report = PatchReport::default();

    for found in matches {
        let (instructions, encoded) = match locate(module, &found, target) {
            Ok(located) => located,
            Err(cause) => {
                log::warn!(
                    "Skipping stale match in {} at IL_{:04x}: {}",
                    found.method_token,
                    found.call_offset,
                    cause
                );
                report.failures.push(PatchFailure {
                    encoded: None,
                    cause: cause.to_string(),
                    method: found.method_token,
                    offset: found.call_offset,
                });
                continue;
            }
        };

        match decode_base64_text(&encoded) {
            Ok(decoded) => {
                log::debug!(
                    "Decoded {:?} -> {:?} in {} at IL_{:04x}",
                    encoded,
                    decoded,
                    found.method_token,
                    found.call_offset
                );

                instructions[found.literal_index].operand = Operand::String(decoded.clone());
                let call = &mut instructions[found.call_index];
                call.opcode = OpCode::NOP;
                call.operand = Operand::None;

                report.decoded.push(DecodedPair {
                    encoded,
                    decoded,
                    method: found.method_token,
                    offset: found.call_offset,
                });
            }
            Err(cause) => {
                log::error!("Failed to decode Base64 string {encoded}: {cause}");
                report.failures.push(PatchFailure {
                    encoded: Some(encoded),
                    cause: cause.to_string(),
                    method: found.method_token,
                    offset: found.call_offset,
                });
            }
        }
    }

    report
}

/// Scan `module` and patch everything found.
#[must_use]
pub fn decode_module(module: &mut Module) -> PatchReport {
    let target = TargetSignature::default();
    let matches = scan_with(module, &target);

    patch_with(module, matches, &target)
}

/// Check `found` against the current model and return the body with the literal text.
fn locate<'m>(
    module: &'m mut Module,
    found: &Match,
    target: &TargetSignature,
) -> Result<(&'m mut Vec<Instruction>, String), &'static str> {
    let Some(method) = module
        .types_mut()
        .get_mut(found.type_index)
        .and_then(|ty| ty.methods.get_mut(found.method_index))
    else {
        return Err("method no longer exists");
    };

    if method.token != found.method_token {
        return Err("method position holds a different method");
    }

    let Some(body) = method.body.as_mut() else {
        return Err("method has no body");
    };

    if found.literal_index.checked_add(1) != Some(found.call_index) {
        return Err("call does not directly follow the literal");
    }

    let instructions = &mut body.instructions;
    let (Some(literal), Some(call)) = (
        instructions.get(found.literal_index),
        instructions.get(found.call_index),
    ) else {
        return Err("instruction index out of range");
    };

    if literal.opcode != OpCode::LDSTR {
        return Err("literal is no longer an ldstr");
    }
    let Operand::String(encoded) = &literal.operand else {
        return Err("literal has no string operand");
    };
    if !target.matches(call) {
        return Err("call no longer targets the decoder");
    }
    let encoded = encoded.clone();

    Ok((instructions, encoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        deobfuscation::scan,
        metadata::{
            method::{Method, MethodBody},
            types::{MemberRef, TypeDef},
        },
    };

    fn from_base64(offset: u32) -> Instruction {
        Instruction::new(
            offset,
            OpCode::CALL,
            Operand::Member(MemberRef::new(
                Token(0x0A00_0001),
                "System.Convert",
                "FromBase64String",
            )),
        )
    }

    fn ldstr(offset: u32, value: &str) -> Instruction {
        Instruction::new(offset, OpCode::LDSTR, Operand::String(value.to_string()))
    }

    fn module(instructions: Vec<Instruction>) -> Module {
        Module::new(vec![TypeDef::new(
            Token(0x0200_0002),
            "Demo",
            "Program",
            vec![Method::new(
                Token(0x0600_0001),
                "Main",
                Some(MethodBody::from_instructions(instructions)),
            )],
        )])
    }

    fn instructions(module: &Module) -> &[Instruction] {
        &module.types()[0].methods[0]
            .body
            .as_ref()
            .unwrap()
            .instructions
    }

    #[test]
    fn decodes_hello() {
        let mut module = module(vec![
            ldstr(0, "SGVsbG8="),
            from_base64(5),
            Instruction::new(10, OpCode::POP, Operand::None),
        ]);

        let report = decode_module(&mut module);

        assert_eq!(report.decoded.len(), 1);
        assert_eq!(report.decoded[0].encoded, "SGVsbG8=");
        assert_eq!(report.decoded[0].decoded, "Hello");
        assert_eq!(report.decoded[0].offset, 5);
        assert!(report.failures.is_empty());

        let patched = instructions(&module);
        assert_eq!(patched[0].opcode, OpCode::LDSTR);
        assert_eq!(patched[0].operand.as_string(), Some("Hello"));
        assert_eq!(patched[1], Instruction::nop(5));
        assert_eq!(patched[2].opcode, OpCode::POP);
    }

    #[test]
    fn invalid_literal_is_untouched() {
        let original = vec![ldstr(0, "not-base64!!"), from_base64(5)];
        let mut module = module(original.clone());

        let report = decode_module(&mut module);

        assert!(report.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].encoded.as_deref(), Some("not-base64!!"));
        assert_eq!(instructions(&module), original.as_slice());
    }

    #[test]
    fn failures_do_not_stop_the_batch() {
        let mut module = module(vec![
            ldstr(0, "!!"),
            from_base64(5),
            ldstr(10, "//4="),
            from_base64(15),
            ldstr(20, "V29ybGQ="),
            from_base64(25),
        ]);

        let report = decode_module(&mut module);

        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.decoded.len(), 1);
        assert_eq!(report.decoded[0].decoded, "World");
        assert_eq!(instructions(&module)[5].opcode, OpCode::NOP);
    }

    #[test]
    fn stale_matches_are_rejected() {
        let mut module = module(vec![ldstr(0, "SGk="), from_base64(5)]);
        let matches = scan(&module);
        assert_eq!(matches.len(), 1);

        module.types_mut()[0].methods[0]
            .body
            .as_mut()
            .unwrap()
            .instructions
            .insert(1, Instruction::nop(5));

        let report = patch(&mut module, matches);
        assert!(report.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].encoded.is_none());
        assert_eq!(instructions(&module)[0].operand.as_string(), Some("SGk="));
    }

    #[test]
    fn literal_without_text_is_reported() {
        let mut module = module(vec![ldstr(0, "SGk="), from_base64(5)]);
        let matches = scan(&module);

        module.types_mut()[0].methods[0]
            .body
            .as_mut()
            .unwrap()
            .instructions[0]
            .operand = Operand::Token(Token(0x7000_0001));

        let report = patch(&mut module, matches);
        assert!(report.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].cause, "literal has no string operand");
        assert_eq!(report.failures[0].offset, 5);
        assert_eq!(instructions(&module)[1].opcode, OpCode::CALL);
    }

    #[test]
    fn out_of_range_match() {
        let mut module = module(vec![ldstr(0, "SGk="), from_base64(5)]);
        let mut found = scan(&module)[0];
        found.type_index = 3;

        let report = patch(&mut module, vec![found]);
        assert_eq!(report.failures.len(), 1);
    }

    #[test]
    fn empty_module() {
        let mut module = Module::new(Vec::new());
        let report = decode_module(&mut module);

        assert!(report.is_empty());
        assert!(report.failures.is_empty());
    }
}
