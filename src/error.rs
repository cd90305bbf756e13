use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Loading, metadata resolution and serialization all report through this enum. Per-literal
/// decode failures during patching are not fatal and use
/// [`crate::deobfuscation::DecodeError`] instead.
///
/// # Error Categories
///
/// ## File Parsing Errors
/// - [`Error::Malformed`] - Corrupted or invalid file structure
/// - [`Error::OutOfBounds`] - Attempted to read beyond file boundaries
/// - [`Error::NotSupported`] - Unsupported file format or operation
/// - [`Error::Empty`] - Empty input provided
/// - [`Error::RecursionLimit`] - Nesting depth exceeded while resolving names
///
/// ## I/O and External Errors
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::GoblinErr`] - PE parsing errors from goblin crate
///
/// ## Serialization Errors
/// - [`Error::WriteError`] - An edit could not be expressed in the output image
///
/// # Examples
///
/// ```rust,no_run
/// use cilb64::{Error, Module};
/// use std::path::Path;
///
/// match Module::from_file(Path::new("sample.exe")) {
///     Ok(module) => println!("{} types", module.types().len()),
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed file: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The file is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing the file.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// This file type or operation is not supported.
    ///
    /// Returned for images without the structures the tool needs, and when trying to
    /// serialize a module that has no backing image.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),

    /// Error from the goblin crate during PE parsing.
    #[error("{0}")]
    GoblinErr(#[from] goblin::error::Error),

    /// Recursion limit reached.
    ///
    /// Nested type references are resolved recursively; a cyclic or absurdly deep chain stops
    /// here. The associated value shows the limit that was reached.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    /// The writer could not express a model edit in the output image.
    ///
    /// Only raised in strict mode; the lenient writer logs and drops the edit instead.
    #[error("Write failed - {0}")]
    WriteError(String),
}
