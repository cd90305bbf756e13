//! Methods and their bodies.
//!
//! A [`Method`] carries its definition row data and, when it has IL, a [`MethodBody`] whose
//! instruction list is the mutable surface the deobfuscation passes work on.

mod body;
mod types;

pub use body::MethodBodyHeader;
pub use types::*;

use crate::{assembly::Instruction, metadata::token::Token};

/// A decoded method body.
#[derive(Debug, Clone)]
pub struct MethodBody {
    /// The parsed header
    pub header: MethodBodyHeader,
    /// File offset of the header, `None` for bodies that only exist in memory
    pub file_offset: Option<usize>,
    /// Instructions in stream order
    pub instructions: Vec<Instruction>,
}

impl MethodBody {
    /// A body that only exists in memory.
    ///
    /// Instruction offsets are taken as given; the header is derived from the last one.
    #[must_use]
    pub fn from_instructions(instructions: Vec<Instruction>) -> MethodBody {
        let size_code = instructions
            .last()
            .map_or(0, |last| last.offset as usize + last.size());

        MethodBody {
            header: MethodBodyHeader::synthetic(size_code),
            file_offset: None,
            instructions,
        }
    }

    /// File offset of the first IL byte, if the body is backed by an image.
    #[must_use]
    pub fn code_offset(&self) -> Option<usize> {
        self.file_offset
            .map(|offset| offset + self.header.size_header)
    }
}

/// A method definition.
#[derive(Debug, Clone)]
pub struct Method {
    /// `MethodDef` token
    pub token: Token,
    /// Method name
    pub name: String,
    /// RVA of the body, 0 if there is none
    pub rva: u32,
    /// Raw `MethodImplAttributes`
    pub impl_flags: u32,
    /// Raw `MethodAttributes`
    pub flags: u32,
    /// The body, present for IL methods whose body could be decoded
    pub body: Option<MethodBody>,
}

impl Method {
    /// An in-memory IL method.
    #[must_use]
    pub fn new(token: Token, name: &str, body: Option<MethodBody>) -> Method {
        Method {
            token,
            name: name.to_string(),
            rva: 0,
            impl_flags: 0,
            flags: 0,
            body,
        }
    }

    /// `true` if the method has a decoded IL body.
    #[must_use]
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// `true` if the definition row says an IL body should exist at `rva`.
    #[must_use]
    pub fn expects_il_body(&self) -> bool {
        self.rva != 0
            && MethodImplCodeType::from_impl_flags(self.impl_flags) == MethodImplCodeType::IL
            && !MethodModifiers::from_bits_truncate(self.flags)
                .intersects(MethodModifiers::ABSTRACT | MethodModifiers::PINVOKE_IMPL)
    }
}
