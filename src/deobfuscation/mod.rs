//! Base64 string literal deobfuscation.
//!
//! Obfuscators commonly hide string literals as
//!
//! ```text
//! ldstr "SGVsbG8="
//! call  uint8[] System.Convert::FromBase64String(string)
//! ```
//!
//! The pass runs in two phases over a [`Module`](crate::Module):
//!
//! 1. [`scan`] walks every method body and records each literal that is immediately
//!    followed by the decode call. The module is not touched.
//! 2. [`patch`] decodes each recorded literal. On success the literal receives the plaintext
//!    and the call becomes a `nop`; failures are logged and leave the code as it was.
//!
//! [`decode_module`] runs both. Writing the result back to disk is the job of
//! [`Module::write`](crate::Module::write).
//!
//! # Examples
//!
//! ```rust,no_run
//! use cilb64::{deobfuscation, Module, WriterOptions};
//! use std::path::Path;
//!
//! let mut module = Module::from_file(Path::new("sample.exe"))?;
//! let report = deobfuscation::decode_module(&mut module);
//!
//! for pair in &report.decoded {
//!     println!("{} -> {}", pair.encoded, pair.decoded);
//! }
//! if !report.is_empty() {
//!     module.write(Path::new("sample_decoded.exe"), &WriterOptions::default())?;
//! }
//! # Ok::<(), cilb64::Error>(())
//! ```

mod decode;
mod patcher;
mod scanner;

pub use decode::{decode_base64_text, DecodeError};
pub use patcher::{decode_module, patch, patch_with, DecodedPair, PatchFailure, PatchReport};
pub use scanner::{scan, scan_with, Match, TargetSignature};
