//! # cilb64 Prelude
//!
//! The types needed to load a module, deobfuscate it and write the result.
//!
//! ```rust,no_run
//! use cilb64::prelude::*;
//!
//! let mut module = Module::from_file("sample.exe".as_ref())?;
//! let report = decode_module(&mut module);
//! println!("Number of decoded strings: {}", report.decoded.len());
//! # Ok::<(), cilb64::Error>(())
//! ```

pub use crate::{
    assembly::{Instruction, OpCode, Operand},
    deobfuscation::{
        decode_base64_text, decode_module, patch, scan, scan_with, DecodeError, DecodedPair,
        Match, PatchFailure, PatchReport, TargetSignature,
    },
    metadata::{
        method::{Method, MethodBody},
        token::Token,
        types::{MemberRef, TypeDef},
    },
    EditSite, Error, File, Module, Result, WriteSummary, WriterOptions,
};
