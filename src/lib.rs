// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]
// - 'file/physical.rs' uses mmap to map a file into memory
// - 'cilassembly/output.rs' uses mmap to write the output file

//! # cilb64
//!
//! Static deobfuscation of base64-encoded string literals in .NET assemblies.
//!
//! Many obfuscators hide string constants by storing them base64-encoded and decoding them at
//! runtime:
//!
//! ```text
//! ldstr "SGVsbG8="
//! call  uint8[] System.Convert::FromBase64String(string)
//! ```
//!
//! `cilb64` loads the assembly, finds every such pair, puts the plaintext back into the
//! literal, turns the call into a `nop` and writes a patched copy of the binary. The binary is
//! never executed.
//!
//! ## Features
//!
//! - **Memory-mapped loading** - PE parsing through `goblin`, metadata parsing without copies
//! - **Narrow metadata model** - `Module → TypeDef → Method → MethodBody → Instruction`
//! - **Collect then apply** - matches are gathered before anything is mutated
//! - **Patch in place** - the output keeps the original layout; only changed bytes differ
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cilb64::prelude::*;
//! use std::path::Path;
//!
//! let mut module = Module::from_file(Path::new("obfuscated.exe"))?;
//! let report = decode_module(&mut module);
//!
//! for pair in &report.decoded {
//!     println!("{:<40} {}", pair.encoded, pair.decoded);
//! }
//! println!("Number of decoded strings: {}", report.decoded.len());
//!
//! if !report.is_empty() {
//!     module.write(Path::new("obfuscated_decoded.exe"), &WriterOptions::default())?;
//! }
//! # Ok::<(), cilb64::Error>(())
//! ```
//!
//! ## Logging
//!
//! The library emits records through the `log` facade: conflicts dropped by the writer and
//! undecodable method bodies as warnings, literals that fail to decode as errors. Configure a
//! logger such as `env_logger` in the application to see them.
//!
//! ## Development and Testing
//!
//! ```bash
//! cargo test
//! cargo bench --bench scan
//! cargo +nightly fuzz run module --release
//! ```

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust,no_run
/// use cilb64::prelude::*;
///
/// let mut module = Module::from_file("sample.exe".as_ref())?;
/// let matches = scan(&module);
/// let report = patch(&mut module, matches);
/// # Ok::<(), cilb64::Error>(())
/// ```
pub mod prelude;

/// CIL instruction decoding based on ECMA-335
///
/// - [`assembly::Instruction`] - One instruction of a method body
/// - [`assembly::OpCode`] - Opcode with mnemonic and operand encoding
/// - [`assembly::Operand`] - Resolved operand
/// - [`assembly::decode_stream`] - Decode and resolve a complete code stream
///
/// # Examples
///
/// ```rust,no_run
/// use cilb64::{assembly::decode_raw_stream, assembly::OpCode};
///
/// let bytecode = &[0x00, 0x2A]; // nop, ret
/// let instructions = decode_raw_stream(bytecode)?;
///
/// assert_eq!(instructions[0].opcode, OpCode::NOP);
/// assert_eq!(instructions[1].opcode.mnemonic(), "ret");
/// # Ok::<(), cilb64::Error>(())
/// ```
pub mod assembly;

/// Serialization of an edited module back into a PE image
pub mod cilassembly;

/// The base64 literal scanner and patcher
pub mod deobfuscation;

/// Parsing of CIL metadata based on ECMA-335, and the module model built from it
pub mod metadata;

/// `cilb64` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `cilb64` Error type
///
/// # Example
///
/// ```rust,no_run
/// use cilb64::{Error, Module};
/// match Module::from_file(std::path::Path::new("sample.exe")) {
///     Ok(module) => println!("Loaded {} types", module.types().len()),
///     Err(Error::NotSupported) => println!("File format not supported"),
///     Err(Error::Malformed { message, .. }) => println!("Malformed: {}", message),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
pub use error::Error;

/// The loaded module, the entry point for scanning, patching and writing.
pub use metadata::module::Module;

/// Options for [`Module::write`] and [`Module::to_bytes`], and what a write applied.
pub use cilassembly::{EditSite, WriteSummary, WriterOptions};

/// Metadata streams and heaps for direct access to ECMA-335 data structures.
pub use metadata::streams::{StreamHeader, Strings, TablesHeader, UserStrings};

/// Low-level file and memory parsing utilities.
///
/// # Example
///
/// ```rust,no_run
/// use cilb64::{Parser, assembly::decode_raw};
/// let code = [0x2A]; // ret
/// let mut parser = Parser::new(&code);
/// let instr = decode_raw(&mut parser)?;
/// assert_eq!(instr.opcode.mnemonic(), "ret");
/// # Ok::<(), cilb64::Error>(())
/// ```
pub use file::{parser::Parser, File};
