//! Metadata tables.
//!
//! Only the rows the loader needs are modelled: `TypeRef`, `TypeDef`, `MethodPtr`,
//! `MethodDef` and `MemberRef`. The other tables that precede `MemberRef` are sized but never
//! read, so the row data of everything after `MemberRef` is ignored entirely.

mod codedindex;
mod memberref;
mod methoddef;
mod methodptr;
mod tableid;
mod tableinfo;
mod typedef;
mod typeref;
mod types;

pub use codedindex::{CodedIndex, CodedIndexType};
pub use memberref::MemberRefRaw;
pub use methoddef::MethodDefRaw;
pub use methodptr::MethodPtrRaw;
pub use tableid::TableId;
pub use tableinfo::{TableInfo, TableRowInfo};
pub use typedef::TypeDefRaw;
pub use typeref::TypeRefRaw;
pub use types::{MetadataTable, RowReadable};
