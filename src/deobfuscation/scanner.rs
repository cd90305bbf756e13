//! Finds `ldstr "<base64>"; call <decoder>` pairs in method bodies.

use crate::{
    assembly::{Instruction, OpCode, Operand},
    metadata::{module::Module, token::Token},
};

/// The decode call the scanner looks for, matched by declaring type full name and member
/// name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSignature {
    /// Full name of the declaring type
    pub declaring_type: String,
    /// Member name
    pub name: String,
}

impl Default for TargetSignature {
    /// `System.Convert::FromBase64String`
    fn default() -> Self {
        TargetSignature::new("System.Convert", "FromBase64String")
    }
}

impl TargetSignature {
    /// Create a new target signature.
    #[must_use]
    pub fn new(declaring_type: &str, name: &str) -> TargetSignature {
        TargetSignature {
            declaring_type: declaring_type.to_string(),
            name: name.to_string(),
        }
    }

    /// `true` if `instruction` is a `call` to this target.
    #[must_use]
    pub fn matches(&self, instruction: &Instruction) -> bool {
        instruction.opcode == OpCode::CALL
            && instruction
                .operand
                .as_member()
                .is_some_and(|member| member.is(&self.declaring_type, &self.name))
    }
}

/// A literal and the decode call right after it.
///
/// The indices address [`Module::types`], [`crate::metadata::types::TypeDef::methods`] and
/// the body's instruction list. They stay valid only while the module is not mutated at those
/// positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    /// Index of the declaring type
    pub type_index: usize,
    /// Index of the method inside its type
    pub method_index: usize,
    /// Index of the `ldstr`
    pub literal_index: usize,
    /// Index of the call
    pub call_index: usize,
    /// Token of the method, for reporting
    pub method_token: Token,
    /// IL offset of the call, for reporting
    pub call_offset: u32,
}

/// `true` for an `ldstr` with a resolved literal.
pub(crate) fn is_literal(instruction: &Instruction) -> bool {
    instruction.opcode == OpCode::LDSTR && matches!(instruction.operand, Operand::String(_))
}

/// Scan for calls to `System.Convert::FromBase64String`.
#[must_use]
pub fn scan(module: &Module) -> Vec<Match> {
    scan_with(module, &TargetSignature::default())
}

/// Scan for calls to `target` whose argument is the literal loaded right before them.
///
/// Types, methods and instructions are visited in declaration order. A call that opens a body
/// has nothing before it and is skipped.
#[must_use]
pub fn scan_with(module: &Module, target: &TargetSignature) -> Vec<Match> {
    let mut found = Vec::new();

    for (type_index, ty) in module.types().iter().enumerate() {
        for (method_index, method) in ty.methods.iter().enumerate() {
            let Some(body) = &method.body else {
                continue;
            };

            let mut previous: Option<(usize, &Instruction)> = None;
            for (index, instruction) in body.instructions.iter().enumerate() {
                if target.matches(instruction) {
                    match previous {
                        Some((literal_index, literal)) if is_literal(literal) => {
                            found.push(Match {
                                type_index,
                                method_index,
                                literal_index,
                                call_index: index,
                                method_token: method.token,
                                call_offset: instruction.offset,
                            });
                        }
                        Some(_) => {}
                        None => log::debug!(
                            "{}::{} calls {}::{} at IL_{:04x} with nothing before it",
                            ty.full_name(),
                            method.name,
                            target.declaring_type,
                            target.name,
                            instruction.offset
                        ),
                    }
                }

                previous = Some((index, instruction));
            }
        }
    }

    found
}
