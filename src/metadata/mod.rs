//! Metadata parsing and the resolved module model.
//!
//! The raw layers follow ECMA-335 closely: the CLR header ([`cor20header`]), the metadata root
//! ([`root`]), heaps and the tables stream ([`streams`]) and the rows of the leading tables
//! ([`tables`]). [`cilassemblyview::CilAssemblyView`] ties them together for one image, and
//! [`module::Module`] is the mutable `Module → TypeDef → Method → MethodBody` model built from
//! it.
//!
//! # Examples
//!
//! ```rust,no_run
//! use cilb64::Module;
//!
//! let module = Module::from_file("tests/samples/crackme.exe".as_ref())?;
//! println!("Types: {}", module.types().len());
//! println!("Methods: {}", module.methods().count());
//! # Ok::<(), cilb64::Error>(())
//! ```

/// Raw view over the headers, heaps and tables of an image
pub mod cilassemblyview;
/// Implementation of the Header of CIL
pub mod cor20header;
/// Methods and their bodies
pub mod method;
/// The loaded module
pub mod module;
/// Implementation of the root metadata structure
pub mod root;
/// Metadata streams
pub mod streams;
/// Metadata tables
pub mod tables;
/// Commonly used metadata token type
pub mod token;
/// Resolved types and member references
pub mod types;
