//! Metadata streams: the stream directory, the two string heaps the loader resolves names
//! and literals from, and the tables stream header.

mod streamheader;
mod strings;
mod tablesheader;
mod userstrings;

pub use streamheader::{StreamHeader, KNOWN_STREAMS};
pub use strings::Strings;
pub use tablesheader::TablesHeader;
pub use userstrings::{needs_special_handling, write_compressed_uint, UserStringEntry, UserStrings};
