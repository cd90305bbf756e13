//! The loaded module: types, methods and decoded bodies.
//!
//! [`Module`] is the mutable model the deobfuscation passes work on. When it is loaded from an
//! image it keeps the backing [`File`], so the writer can later diff every body against the
//! original bytes and serialize the edits.

use std::path::{Path, PathBuf};

use crate::{
    assembly::decode_stream,
    file::File,
    metadata::{
        cilassemblyview::CilAssemblyView,
        method::{Method, MethodBody},
        streams::TablesHeader,
        tables::{MethodDefRaw, MethodPtrRaw, TableId, TypeDefRaw},
        types::TypeDef,
    },
    Result,
};

/// A .NET module reduced to what the deobfuscation passes need.
///
/// # Examples
///
/// ```rust,no_run
/// use cilb64::Module;
/// use std::path::Path;
///
/// let module = Module::from_file(Path::new("sample.exe"))?;
/// for ty in module.types() {
///     for method in ty.methods.iter().filter(|m| m.has_body()) {
///         println!("{}::{}", ty.full_name(), method.name);
///     }
/// }
/// # Ok::<(), cilb64::Error>(())
/// ```
pub struct Module {
    source: Option<PathBuf>,
    file: Option<File>,
    types: Vec<TypeDef>,
}

impl Module {
    /// Load a module from disk. The file is memory-mapped read-only.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a valid .NET image.
    pub fn from_file(path: &Path) -> Result<Module> {
        let file = File::from_file(path)?;

        let mut module = Self::load(file)?;
        module.source = Some(path.to_path_buf());
        Ok(module)
    }

    /// Load a module from a buffer.
    ///
    /// # Errors
    /// Returns an error if the data is not a valid .NET image.
    pub fn from_mem(data: Vec<u8>) -> Result<Module> {
        let file = File::from_mem(data)?;

        Self::load(file)
    }

    /// An in-memory module without a backing image. It can be scanned and patched but not
    /// written.
    #[must_use]
    pub fn new(types: Vec<TypeDef>) -> Module {
        Module {
            source: None,
            file: None,
            types,
        }
    }

    fn load(file: File) -> Result<Module> {
        let types = {
            let view = CilAssemblyView::from_file(&file)?;
            load_types(&view)?
        };

        Ok(Module {
            source: None,
            file: Some(file),
            types,
        })
    }

    /// Types in `TypeDef` table order.
    #[must_use]
    pub fn types(&self) -> &[TypeDef] {
        &self.types
    }

    /// Mutable access to the types, for instruction edits.
    pub fn types_mut(&mut self) -> &mut [TypeDef] {
        &mut self.types
    }

    /// The path this module was loaded from.
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// The backing image, `None` for in-memory modules.
    #[must_use]
    pub fn file(&self) -> Option<&File> {
        self.file.as_ref()
    }

    /// Iterate over all methods of all types.
    pub fn methods(&self) -> impl Iterator<Item = (&TypeDef, &Method)> {
        self.types
            .iter()
            .flat_map(|ty| ty.methods.iter().map(move |method| (ty, method)))
    }
}

fn load_types(view: &CilAssemblyView<'_>) -> Result<Vec<TypeDef>> {
    let tables = view.tables();
    let Some(typedefs) = tables.table::<TypeDefRaw>() else {
        return Ok(Vec::new());
    };

    let rows: Vec<TypeDefRaw> = typedefs.iter().collect::<Result<_>>()?;

    // Method list indices address MethodPtr when it is present, MethodDef otherwise.
    let list_len = if tables.has_table(TableId::MethodPtr) {
        tables.rows(TableId::MethodPtr)
    } else {
        tables.rows(TableId::MethodDef)
    };

    let mut types = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let start = row.method_list.clamp(1, list_len + 1);
        let end = rows
            .get(index + 1)
            .map_or(list_len + 1, |next| next.method_list.clamp(1, list_len + 1));

        let mut ty = TypeDef::new(
            row.token,
            view.strings().get(row.type_namespace as usize)?,
            view.strings().get(row.type_name as usize)?,
            Vec::new(),
        );

        if end < start {
            log::warn!(
                "{} has a method list running backwards ({} > {})",
                ty.full_name(),
                start,
                end
            );
        }

        for list_index in start..end {
            let rid = resolve_method_rid(tables, list_index)?;
            ty.methods.push(load_method(view, &ty, rid)?);
        }

        types.push(ty);
    }

    Ok(types)
}

fn resolve_method_rid(tables: &TablesHeader<'_>, list_index: u32) -> Result<u32> {
    match tables.table::<MethodPtrRaw>() {
        Some(method_ptr) => Ok(method_ptr.get(list_index)?.method),
        None => Ok(list_index),
    }
}

fn load_method(view: &CilAssemblyView<'_>, ty: &TypeDef, rid: u32) -> Result<Method> {
    let Some(methoddefs) = view.tables().table::<MethodDefRaw>() else {
        return Err(malformed_error!("MethodDef table is missing"));
    };
    let row = methoddefs.get(rid)?;

    let mut method = Method::new(row.token, view.strings().get(row.name as usize)?, None);
    method.rva = row.rva;
    method.impl_flags = row.impl_flags;
    method.flags = row.flags;

    if method.expects_il_body() {
        match load_body(view, row.rva) {
            Ok(body) => method.body = Some(body),
            Err(error) => log::warn!(
                "Skipping body of {}::{} ({}): {}",
                ty.full_name(),
                method.name,
                method.token,
                error
            ),
        }
    }

    Ok(method)
}

fn load_body(view: &CilAssemblyView<'_>, rva: u32) -> Result<MethodBody> {
    let raw = view.method_body(rva)?;

    Ok(MethodBody {
        instructions: decode_stream(raw.code, view)?,
        header: raw.header,
        file_offset: Some(raw.offset),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::{OpCode, Operand},
        test::{CraftedAssembly, CraftedMethod, CraftedType, Il, CONVERT_FROM_BASE64},
        Error,
    };

    #[test]
    fn crafted_sample() {
        let module = Module::from_mem(CraftedAssembly::sample().build()).unwrap();

        let names: Vec<String> = module.types().iter().map(TypeDef::full_name).collect();
        assert_eq!(names, ["<Module>", "Demo.Program"]);
        assert!(module.types()[0].methods.is_empty());
        assert!(module.file().is_some());
        assert!(module.source().is_none());

        let program = &module.types()[1];
        let methods: Vec<&str> = program.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(methods, ["Main", "Broken", "Run", "Greet"]);

        let main = program.methods[0].body.as_ref().unwrap();
        assert!(main.file_offset.is_some());
        assert_eq!(main.instructions.len(), 4);
        assert_eq!(main.instructions[0].operand.as_string(), Some("SGVsbG8="));
        assert_eq!(main.instructions[1].opcode, OpCode::CALL);
        assert_eq!(main.instructions[1].offset, 5);
        assert!(main.instructions[1]
            .operand
            .as_member()
            .unwrap()
            .is("System.Convert", "FromBase64String"));
        assert_eq!(main.instructions[2].opcode, OpCode::POP);

        assert!(!program.methods[2].has_body());
        assert_eq!(module.methods().count(), 4);
    }

    #[test]
    fn method_ptr_indirection() {
        let module =
            Module::from_mem(CraftedAssembly::sample().with_method_ptr().build()).unwrap();

        let program = &module.types()[1];
        let methods: Vec<&str> = program.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(methods, ["Main", "Broken", "Run", "Greet"]);

        let greet = program.methods[3].body.as_ref().unwrap();
        assert_eq!(greet.instructions[0].operand.as_string(), Some("plain"));
    }

    #[test]
    fn multiple_types() {
        let assembly = CraftedAssembly::sample().with_type(CraftedType::new(
            "",
            "Helpers",
            vec![CraftedMethod::fat(
                "Decode",
                vec![
                    Il::ldstr("V29ybGQ="),
                    Il::Call(CONVERT_FROM_BASE64),
                    Il::Pop,
                    Il::Ret,
                ],
            )],
        ));
        let module = Module::from_mem(assembly.build()).unwrap();

        assert_eq!(module.types().len(), 3);
        let helpers = &module.types()[2];
        assert_eq!(helpers.full_name(), "Helpers");
        assert_eq!(helpers.methods.len(), 1);

        let body = helpers.methods[0].body.as_ref().unwrap();
        assert!(body.header.is_fat);
        assert_eq!(body.header.size_header, 12);
        assert_eq!(body.instructions[0].operand.as_string(), Some("V29ybGQ="));
    }

    #[test]
    fn broken_body_is_skipped() {
        let assembly = CraftedAssembly::new().with_type(CraftedType::new(
            "Demo",
            "Odd",
            vec![
                CraftedMethod::new("Reserved", vec![Il::Raw(vec![0x24]), Il::Ret]),
                CraftedMethod::new("Fine", vec![Il::Nop, Il::Ret]),
            ],
        ));
        let module = Module::from_mem(assembly.build()).unwrap();

        let odd = &module.types()[1];
        assert!(!odd.methods[0].has_body());
        assert_eq!(odd.methods[1].body.as_ref().unwrap().instructions.len(), 2);
    }

    #[test]
    fn in_memory() {
        let mut module = Module::new(vec![TypeDef::new(
            crate::metadata::token::Token(0x0200_0002),
            "Demo",
            "Program",
            vec![Method::new(
                crate::metadata::token::Token(0x0600_0001),
                "Main",
                Some(MethodBody::from_instructions(vec![])),
            )],
        )]);

        assert!(module.file().is_none());
        module.types_mut()[0].methods[0]
            .body
            .as_mut()
            .unwrap()
            .instructions
            .push(crate::assembly::Instruction::new(0, OpCode::NOP, Operand::None));
        assert_eq!(module.types()[0].methods[0].body.as_ref().unwrap().instructions.len(), 1);
    }

    #[test]
    fn invalid_input() {
        assert!(matches!(Module::from_mem(Vec::new()), Err(Error::Empty)));
        assert!(Module::from_mem(vec![0x4D, 0x5A, 0x00, 0x01]).is_err());
        assert!(matches!(
            Module::from_file(Path::new("does/not/exist.exe")),
            Err(Error::FileError(_))
        ));
    }
}
