//! Serializes an edited [`Module`] back into a PE image.
//!
//! The writer never rebuilds the image. It copies the original bytes and patches them in
//! place, which is enough for the edits the deobfuscation passes make:
//!
//! - an instruction replaced by `nop` is overwritten with `0x00` bytes over its full original
//!   width, so branch offsets and exception ranges stay valid;
//! - an `ldstr` whose text changed gets its `#US` entry rewritten in place. The new entry must
//!   fit the old slot and the rest of the slot is zero-filled so the heap stays walkable.
//!
//! Any other change is a conflict. With the default [`WriterOptions`] each conflict is logged
//! and its edit dropped; with [`WriterOptions::strict`] the first conflict is an error. The
//! [`WriteSummary`] returned by [`Module::write`] tells which edits made it into the image.
//!
//! # Examples
//!
//! ```rust,no_run
//! use cilb64::{deobfuscation, Module, WriterOptions};
//! use std::path::Path;
//!
//! let mut module = Module::from_file(Path::new("sample.exe"))?;
//! deobfuscation::decode_module(&mut module);
//! let summary = module.write(Path::new("sample_decoded.exe"), &WriterOptions::strict())?;
//! println!("{} calls neutralized", summary.neutralized.len());
//! # Ok::<(), cilb64::Error>(())
//! ```

mod output;
mod plan;

use std::path::Path;

use serde::Serialize;

pub use output::Output;

use crate::{
    metadata::{cilassemblyview::CilAssemblyView, module::Module, token::Token},
    Error::{NotSupported, WriteError},
    Result,
};
use plan::EditPlan;

/// How the writer treats edits it cannot express.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterOptions {
    /// Fail on the first conflict instead of dropping the edit
    pub strict: bool,
}

impl WriterOptions {
    /// Options that turn every conflict into [`crate::Error::WriteError`].
    #[must_use]
    pub fn strict() -> WriterOptions {
        WriterOptions { strict: true }
    }
}

/// An instruction the writer overwrote with `nop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EditSite {
    /// The method holding the instruction
    pub method: Token,
    /// IL offset of the instruction
    pub offset: u32,
}

/// What a serialization pass put into the image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    /// `#US` entries rewritten
    pub strings_rewritten: usize,
    /// Instructions overwritten with `nop`, in method order
    pub neutralized: Vec<EditSite>,
    /// Edits dropped in lenient mode
    pub dropped: usize,
}

impl WriteSummary {
    /// `true` if the output is byte-identical to the input.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings_rewritten == 0 && self.neutralized.is_empty()
    }

    /// `true` if the instruction at `offset` in `method` was overwritten.
    #[must_use]
    pub fn is_neutralized(&self, method: Token, offset: u32) -> bool {
        self.neutralized
            .iter()
            .any(|site| site.method == method && site.offset == offset)
    }
}

impl Module {
    /// Serialize the module into a new image.
    ///
    /// # Errors
    /// See [`Module::serialize`].
    pub fn to_bytes(&self, options: &WriterOptions) -> Result<Vec<u8>> {
        self.serialize(options).map(|(bytes, _)| bytes)
    }

    /// Serialize the module into a new image, along with what was written.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] for modules without a backing image,
    /// [`crate::Error::WriteError`] for conflicts in strict mode, or a parsing error if the
    /// original image can no longer be read.
    pub fn serialize(&self, options: &WriterOptions) -> Result<(Vec<u8>, WriteSummary)> {
        let Some(file) = self.file() else {
            return Err(NotSupported);
        };

        let view = CilAssemblyView::from_file(file)?;
        if view.cor20header().is_strong_name_signed() {
            log::warn!("Image is strong-name signed; the signature will not match the output");
        }

        let plan = EditPlan::collect(self, &view, options)?;
        let mut out = file.data().to_vec();
        let summary = plan.apply(&view, &mut out, options)?;

        Ok((out, summary))
    }

    /// Serialize the module and write it to `path`.
    ///
    /// Nothing is written when no edit made it into the image; the returned summary is empty
    /// in that case and `path` is left untouched.
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteError`] if `path` is the file the module was loaded from
    /// or cannot be written, plus everything [`Module::serialize`] returns.
    pub fn write(&self, path: &Path, options: &WriterOptions) -> Result<WriteSummary> {
        if let Some(source) = self.source() {
            if same_file(source, path) {
                return Err(WriteError(format!(
                    "Refusing to overwrite the input file {}",
                    path.display()
                )));
            }
        }

        let (bytes, summary) = self.serialize(options)?;
        if summary.is_empty() {
            log::info!(
                "No edits left to apply ({} dropped); not writing {}",
                summary.dropped,
                path.display()
            );
            return Ok(summary);
        }

        let mut output = Output::create(path, bytes.len() as u64)?;
        output.write_at(0, &bytes)?;
        output.finalize()?;

        Ok(summary)
    }
}

fn same_file(left: &Path, right: &Path) -> bool {
    match (left.canonicalize(), right.canonicalize()) {
        (Ok(left), Ok(right)) => left == right,
        _ => left == right,
    }
}
