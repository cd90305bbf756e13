//! Raw, read-only view over the metadata of a loaded image.
//!
//! [`CilAssemblyView`] locates the CLR header, the metadata root and the streams the loader
//! needs, and resolves the tokens instruction operands refer to. It borrows the [`File`] and
//! is rebuilt whenever it is needed: by the loader when the [`crate::Module`] is created and
//! by the writer when the module is serialized.

use crate::{
    assembly::OperandResolver,
    file::File,
    metadata::{
        cor20header::Cor20Header,
        method::MethodBodyHeader,
        root::Root,
        streams::{Strings, TablesHeader, UserStrings},
        tables::{MemberRefRaw, TableId, TypeDefRaw, TypeRefRaw},
        token::Token,
        types::{full_name, MemberRef},
    },
    Error::{OutOfBounds, RecursionLimit},
    Result,
};

/// Deepest `TypeRef` nesting that is followed when building a type name.
const MAX_NESTING_DEPTH: usize = 64;

/// A method body located in the image.
pub struct RawMethodBody<'a> {
    /// File offset of the body header
    pub offset: usize,
    /// Parsed header
    pub header: MethodBodyHeader,
    /// The IL code, without header
    pub code: &'a [u8],
}

/// Read-only access to the headers, heaps and tables of an image.
pub struct CilAssemblyView<'a> {
    file: &'a File,
    cor20header: Cor20Header,
    metadata_root: Root,
    metadata_offset: usize,
    tables: TablesHeader<'a>,
    strings: Strings<'a>,
    userstrings: Option<UserStrings<'a>>,
    userstrings_offset: Option<usize>,
}

impl<'a> CilAssemblyView<'a> {
    /// Locate the metadata of `file`.
    ///
    /// The first stream with a given name wins. The tables and `#Strings` streams are
    /// required; `#US` is optional.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the CLR header, the metadata root or a required
    /// stream is missing or invalid, and [`crate::Error::OutOfBounds`] if any of them lies
    /// outside the file.
    pub fn from_file(file: &'a File) -> Result<CilAssemblyView<'a>> {
        let (clr_rva, clr_size) = file.clr()?;
        let clr_offset = file.rva_to_offset(clr_rva)?;
        let cor20header = Cor20Header::read(file.data_slice(clr_offset, clr_size)?)?;

        let metadata_offset = file.rva_to_offset(cor20header.meta_data_rva as usize)?;
        let metadata = file.data_slice(metadata_offset, cor20header.meta_data_size as usize)?;
        let metadata_root = Root::read(metadata)?;

        let stream_data = |names: &[&str]| -> Result<Option<(usize, &'a [u8])>> {
            let Some(header) = metadata_root.stream(names) else {
                return Ok(None);
            };

            let start = header.offset as usize;
            let end = start
                .checked_add(header.size as usize)
                .filter(|end| *end <= metadata.len())
                .ok_or(OutOfBounds)?;

            Ok(Some((metadata_offset + start, &metadata[start..end])))
        };

        let Some((_, tables_data)) = stream_data(&["#~", "#-"])? else {
            return Err(malformed_error!("Metadata has no tables stream"));
        };
        let Some((_, strings_data)) = stream_data(&["#Strings"])? else {
            return Err(malformed_error!("Metadata has no #Strings stream"));
        };

        let (userstrings, userstrings_offset) = match stream_data(&["#US"])? {
            Some((offset, data)) => (Some(UserStrings::from(data)?), Some(offset)),
            None => (None, None),
        };

        Ok(CilAssemblyView {
            file,
            cor20header,
            metadata_root,
            metadata_offset,
            tables: TablesHeader::from(tables_data)?,
            strings: Strings::from(strings_data)?,
            userstrings,
            userstrings_offset,
        })
    }

    /// The underlying file.
    #[must_use]
    pub fn file(&self) -> &'a File {
        self.file
    }

    /// The CLR runtime header.
    #[must_use]
    pub fn cor20header(&self) -> &Cor20Header {
        &self.cor20header
    }

    /// The metadata root with its stream directory.
    #[must_use]
    pub fn metadata_root(&self) -> &Root {
        &self.metadata_root
    }

    /// File offset of the metadata root.
    #[must_use]
    pub fn metadata_offset(&self) -> usize {
        self.metadata_offset
    }

    /// The tables stream.
    #[must_use]
    pub fn tables(&self) -> &TablesHeader<'a> {
        &self.tables
    }

    /// The `#Strings` heap.
    #[must_use]
    pub fn strings(&self) -> &Strings<'a> {
        &self.strings
    }

    /// The `#US` heap, if the image has one.
    #[must_use]
    pub fn userstrings(&self) -> Option<&UserStrings<'a>> {
        self.userstrings.as_ref()
    }

    /// File offset of the `#US` heap.
    #[must_use]
    pub fn userstrings_offset(&self) -> Option<usize> {
        self.userstrings_offset
    }

    /// Locate and check the method body at `rva`.
    ///
    /// # Errors
    /// Returns an error if the RVA is unmapped or the body header is invalid or truncated.
    pub fn method_body(&self, rva: u32) -> Result<RawMethodBody<'a>> {
        let offset = self.file.rva_to_offset(rva as usize)?;
        let data = self.file.data().get(offset..).ok_or(OutOfBounds)?;

        let header = MethodBodyHeader::from(data)?;
        let code = &data[header.size_header..header.size()];

        Ok(RawMethodBody {
            offset,
            header,
            code,
        })
    }

    /// `Namespace.Name` of a `TypeDef` row.
    ///
    /// # Errors
    /// Returns an error if the row or its names cannot be read.
    pub fn typedef_name(&self, rid: u32) -> Result<String> {
        let table = self
            .tables
            .table::<TypeDefRaw>()
            .ok_or_else(|| malformed_error!("TypeDef table is missing"))?;
        let row = table.get(rid)?;

        Ok(full_name(
            self.strings.get(row.type_namespace as usize)?,
            self.strings.get(row.type_name as usize)?,
        ))
    }

    /// Full name of a `TypeRef` row; nested references are joined with `/`.
    ///
    /// # Errors
    /// Returns [`crate::Error::RecursionLimit`] for nesting cycles, or an error if a row or
    /// name cannot be read.
    pub fn typeref_name(&self, rid: u32) -> Result<String> {
        self.typeref_name_at_depth(rid, 0)
    }

    fn typeref_name_at_depth(&self, rid: u32, depth: usize) -> Result<String> {
        if depth >= MAX_NESTING_DEPTH {
            return Err(RecursionLimit(MAX_NESTING_DEPTH));
        }

        let table = self
            .tables
            .table::<TypeRefRaw>()
            .ok_or_else(|| malformed_error!("TypeRef table is missing"))?;
        let row = table.get(rid)?;

        let name = full_name(
            self.strings.get(row.type_namespace as usize)?,
            self.strings.get(row.type_name as usize)?,
        );

        let scope = row.resolution_scope;
        if scope.tag == TableId::TypeRef && !scope.is_null() {
            let enclosing = self.typeref_name_at_depth(scope.row, depth + 1)?;
            Ok(format!("{enclosing}/{name}"))
        } else {
            Ok(name)
        }
    }

    /// Resolve a `MemberRef` token. Members whose parent is not a `TypeDef` or `TypeRef`
    /// (`ModuleRef`, `MethodDef`, `TypeSpec`) yield `None`.
    ///
    /// # Errors
    /// Returns an error if the row, its parent or its name cannot be read.
    pub fn resolve_member_ref(&self, token: Token) -> Result<Option<MemberRef>> {
        if token.table() != TableId::MemberRef.token_type() {
            return Ok(None);
        }

        let table = self
            .tables
            .table::<MemberRefRaw>()
            .ok_or_else(|| malformed_error!("MemberRef table is missing"))?;
        let row = table.get(token.row())?;

        let declaring_type = match row.class.tag {
            TableId::TypeRef => self.typeref_name(row.class.row)?,
            TableId::TypeDef => self.typedef_name(row.class.row)?,
            _ => return Ok(None),
        };
        let name = self.strings.get(row.name as usize)?;

        Ok(Some(MemberRef::new(token, &declaring_type, name)))
    }
}

impl OperandResolver for CilAssemblyView<'_> {
    fn user_string(&self, token: Token) -> Result<String> {
        let Some(userstrings) = &self.userstrings else {
            return Err(malformed_error!("ldstr {} without a #US heap", token));
        };

        userstrings.get(token.row() as usize)
    }

    fn member_ref(&self, token: Token) -> Option<MemberRef> {
        match self.resolve_member_ref(token) {
            Ok(member) => member,
            Err(error) => {
                log::debug!("Leaving {} unresolved: {}", token, error);
                None
            }
        }
    }
}
