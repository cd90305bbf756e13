//! Turns the differences between a module and its image into byte edits.
//!
//! Only two edits exist. An instruction replaced by `nop` keeps its width and is filled with
//! `0x00`. An `ldstr` whose text changed rewrites its `#US` entry in place. Everything else
//! is a conflict, resolved according to [`WriterOptions`].

use std::collections::{BTreeMap, HashSet};

use crate::{
    assembly::{decode_raw_stream, resolve, Instruction, OpCode, Operand, RawInstruction},
    cilassembly::{EditSite, WriteSummary, WriterOptions},
    metadata::{
        cilassemblyview::CilAssemblyView, module::Module, streams::UserStrings, token::Token,
    },
    Error::{OutOfBounds, WriteError},
    Result,
};

/// One instruction overwritten by `nop` bytes.
struct NopEdit {
    /// File offset of the instruction
    offset: usize,
    /// Encoded width of the original instruction
    width: usize,
    /// String edit of the literal right before, if any
    guard: Option<usize>,
    /// Method and IL offset, for the summary
    site: EditSite,
}

/// A `#US` entry receiving new text.
struct StringEdit {
    /// Heap offset of the entry
    slot: u32,
    text: String,
    location: String,
}

/// What the previous instruction of a body turned into.
#[derive(Clone, Copy)]
enum Previous {
    Other,
    Literal(usize),
    DroppedLiteral,
}

/// All edits of a module, collected before anything is written.
#[derive(Default)]
pub(crate) struct EditPlan {
    nops: Vec<NopEdit>,
    strings: Vec<StringEdit>,
    /// `#US` entries still referenced by an unchanged `ldstr`
    kept_slots: HashSet<u32>,
    /// Edits dropped so far in lenient mode
    dropped: usize,
}

impl EditPlan {
    /// Report a conflict: an error in strict mode, a warning and a dropped edit otherwise.
    fn conflict(&mut self, options: &WriterOptions, message: String) -> Result<()> {
        if options.strict {
            Err(WriteError(message))
        } else {
            log::warn!("{message}; edit dropped");
            self.dropped += 1;
            Ok(())
        }
    }

    /// Diff every body of `module` against the bytes behind `view`.
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteError`] for the first conflict in strict mode, or an error
    /// if an original body cannot be decoded again.
    pub(crate) fn collect(
        module: &Module,
        view: &CilAssemblyView<'_>,
        options: &WriterOptions,
    ) -> Result<EditPlan> {
        let mut plan = EditPlan::default();

        for (ty, method) in module.methods() {
            let Some(body) = &method.body else {
                continue;
            };
            let location = format!("{}::{}", ty.full_name(), method.name);

            let Some(code_offset) = body.code_offset() else {
                plan.conflict(options, format!("{location} has no body in the image"))?;
                continue;
            };

            let code = view.file().data_slice(code_offset, body.header.size_code)?;
            let original = decode_raw_stream(code)?;

            if original.len() != body.instructions.len() {
                plan.conflict(
                    options,
                    format!(
                        "{location} changed its instruction count ({} -> {})",
                        original.len(),
                        body.instructions.len()
                    ),
                )?;
                continue;
            }

            if let Some((raw, _)) = original
                .iter()
                .zip(&body.instructions)
                .find(|(raw, edited)| raw.offset != edited.offset)
            {
                plan.conflict(
                    options,
                    format!("{location} moved the instruction at IL_{:04x}", raw.offset),
                )?;
                continue;
            }

            plan.collect_body(
                &location,
                method.token,
                code_offset,
                &original,
                &body.instructions,
                view,
                options,
            )?;
        }

        Ok(plan)
    }

    fn collect_body(
        &mut self,
        location: &str,
        method: Token,
        code_offset: usize,
        original: &[RawInstruction<'_>],
        edited: &[Instruction],
        view: &CilAssemblyView<'_>,
        options: &WriterOptions,
    ) -> Result<()> {
        let mut previous = Previous::Other;

        for (raw, instruction) in original.iter().zip(edited) {
            let resolved = resolve(raw, view)?;
            let literal_slot = raw
                .token()
                .filter(|_| raw.opcode == OpCode::LDSTR)
                .map(|token| token.row());

            previous = if resolved == *instruction {
                if let Some(slot) = literal_slot {
                    self.kept_slots.insert(slot);
                }
                Previous::Other
            } else if instruction.opcode == OpCode::NOP && instruction.operand == Operand::None {
                match previous {
                    Previous::DroppedLiteral => {
                        log::warn!(
                            "{location}: keeping IL_{:04x} because the literal before it was not rewritten",
                            raw.offset
                        );
                        self.dropped += 1;
                    }
                    Previous::Literal(index) => self.push_nop(method, code_offset, raw, Some(index)),
                    Previous::Other => self.push_nop(method, code_offset, raw, None),
                }
                Previous::Other
            } else if let (Some(slot), OpCode::LDSTR, Operand::String(text)) =
                (literal_slot, instruction.opcode, &instruction.operand)
            {
                self.strings.push(StringEdit {
                    slot,
                    text: text.clone(),
                    location: format!("{location} IL_{:04x}", raw.offset),
                });
                Previous::Literal(self.strings.len() - 1)
            } else {
                self.conflict(
                    options,
                    format!(
                        "{location}: unsupported edit of {} at IL_{:04x}",
                        resolved.opcode, raw.offset
                    ),
                )?;

                match literal_slot {
                    Some(slot) => {
                        self.kept_slots.insert(slot);
                        Previous::DroppedLiteral
                    }
                    None => Previous::Other,
                }
            };
        }

        Ok(())
    }

    fn push_nop(
        &mut self,
        method: Token,
        code_offset: usize,
        raw: &RawInstruction<'_>,
        guard: Option<usize>,
    ) {
        self.nops.push(NopEdit {
            offset: code_offset + raw.offset as usize,
            width: raw.size(),
            guard,
            site: EditSite {
                method,
                offset: raw.offset,
            },
        });
    }

    /// Apply the plan to `out`, a copy of the image bytes, and report what was written.
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteError`] for the first conflict in strict mode, or
    /// [`crate::Error::OutOfBounds`] if an edit falls outside `out`.
    pub(crate) fn apply(
        mut self,
        view: &CilAssemblyView<'_>,
        out: &mut [u8],
        options: &WriterOptions,
    ) -> Result<WriteSummary> {
        let mut by_slot: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        for (index, edit) in self.strings.iter().enumerate() {
            by_slot.entry(edit.slot).or_default().push(index);
        }

        let mut dropped = vec![false; self.strings.len()];
        let mut written = 0_usize;

        for (slot, indices) in by_slot {
            let first = &self.strings[indices[0]];

            let rejection = if self.kept_slots.contains(&slot) {
                Some(format!(
                    "{}: #US entry 0x{:x} is shared with an unchanged ldstr",
                    first.location, slot
                ))
            } else if let Some(other) = indices
                .iter()
                .map(|index| &self.strings[*index])
                .find(|edit| edit.text != first.text)
            {
                Some(format!(
                    "{} and {} write different texts to #US entry 0x{:x}",
                    first.location, other.location, slot
                ))
            } else {
                write_user_string(view, out, slot, &first.text)?
                    .map(|message| format!("{}: {}", first.location, message))
            };

            match rejection {
                Some(message) => {
                    self.conflict(options, message)?;
                    for index in indices {
                        dropped[index] = true;
                    }
                }
                None => written += 1,
            }
        }

        let mut neutralized = Vec::with_capacity(self.nops.len());
        for nop in &self.nops {
            if nop.guard.is_some_and(|index| dropped[index]) {
                log::warn!(
                    "{} IL_{:04x}: keeping the call because the literal before it was not rewritten",
                    nop.site.method,
                    nop.site.offset
                );
                self.dropped += 1;
                continue;
            }

            let target = out
                .get_mut(nop.offset..nop.offset + nop.width)
                .ok_or(OutOfBounds)?;
            target.fill(OpCode::NOP.value() as u8);
            neutralized.push(nop.site);
        }

        log::debug!(
            "Rewrote {} #US entries, neutralized {} instructions, dropped {} edits",
            written,
            neutralized.len(),
            self.dropped
        );
        Ok(WriteSummary {
            strings_rewritten: written,
            neutralized,
            dropped: self.dropped,
        })
    }
}

/// Rewrite the `#US` entry at `slot` in place. Returns a rejection message if the text does
/// not fit.
fn write_user_string(
    view: &CilAssemblyView<'_>,
    out: &mut [u8],
    slot: u32,
    text: &str,
) -> Result<Option<String>> {
    let (Some(userstrings), Some(heap_offset)) = (view.userstrings(), view.userstrings_offset())
    else {
        return Err(malformed_error!("ldstr rewrite without a #US heap"));
    };

    let entry = userstrings.entry(slot as usize)?;
    let encoded = UserStrings::encode(text)?;
    if encoded.len() > entry.slot_len() {
        return Ok(Some(format!(
            "{} bytes do not fit #US entry 0x{:x} of {} bytes",
            encoded.len(),
            slot,
            entry.slot_len()
        )));
    }

    let start = heap_offset + entry.offset;
    let target = out
        .get_mut(start..start + entry.slot_len())
        .ok_or(OutOfBounds)?;
    target[..encoded.len()].copy_from_slice(&encoded);
    target[encoded.len()..].fill(0);

    Ok(None)
}
