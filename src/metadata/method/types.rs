//! Flag types for method definitions and method body headers.

use bitflags::bitflags;

/// Bitmask for `CODE_TYPE` extraction
pub const METHOD_IMPL_CODE_TYPE_MASK: u32 = 0x0003;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Method implementation code type flags
    pub struct MethodImplCodeType: u32 {
        /// Method impl is IL
        const IL = 0x0000;
        /// Method impl is native
        const NATIVE = 0x0001;
        /// Method impl is OPTIL
        const OPTIL = 0x0002;
        /// Method impl is provided by the runtime
        const RUNTIME = 0x0003;
    }
}

impl MethodImplCodeType {
    /// Extract code type from raw implementation flags
    #[must_use]
    pub fn from_impl_flags(flags: u32) -> Self {
        Self::from_bits_truncate(flags & METHOD_IMPL_CODE_TYPE_MASK)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Method attribute bits that decide whether a body can exist
    pub struct MethodModifiers: u32 {
        /// Method has no implementation
        const ABSTRACT = 0x0400;
        /// Implementation is forwarded through P/Invoke
        const PINVOKE_IMPL = 0x2000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Method body header flags (ECMA-335 II.25.4.4)
    pub struct MethodBodyFlags: u16 {
        /// Tiny method header, code size in the upper 6 bits
        const TINY_FORMAT = 0x2;
        /// Fat method header
        const FAT_FORMAT = 0x3;
        /// Extra data sections follow the code
        const MORE_SECTS = 0x8;
        /// Locals are zero-initialized
        const INIT_LOCALS = 0x10;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Method data section flags (ECMA-335 II.25.4.5)
    pub struct SectionFlags: u8 {
        /// Exception handling data
        const EHTABLE = 0x1;
        /// Reserved, must be 0
        const OPT_ILTABLE = 0x2;
        /// Fat data section layout
        const FAT_FORMAT = 0x40;
        /// Another data section follows
        const MORE_SECTS = 0x80;
    }
}
