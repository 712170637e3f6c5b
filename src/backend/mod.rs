//! Backend module: the host side every decoder consumes
//!
//! Decoders never own the inspected process. They see it only through the
//! [`Inspector`] capability: raw memory reads at an address plus layout reflection
//! from a [`TypeTable`].
//!
//! # Components
//!
//! - [`Inspector`] - Host capability trait (memory reads, type lookup)
//! - [`TypeTable`] / [`TypeHandle`] - Layout reflection: sizes, members, template arguments, enumerants
//! - [`MockTarget`] - In-memory stopped process, used by tests and the snapshot CLI
//! - [`Snapshot`] - JSON description of a stopped process, loaded into a [`MockTarget`]
//!
//! # Example
//!
//! ```ignore
//! use ns_formatters::backend::{Inspector, Snapshot};
//!
//! let loaded = Snapshot::load("dump.json")?.build()?;
//! for root in &loaded.roots {
//!     println!("{} @ {:?}", root.name(), root.address());
//! }
//! let bytes = loaded.target.read_memory(0x1000, 16)?;
//! ```

pub mod inspector;
pub mod mock_target;
pub mod snapshot;
pub mod type_table;

pub use inspector::{decode_unsigned, sign_extend, Inspector, ReadStats};
pub use mock_target::{MockMemory, MockTarget, ToBytes};
pub use snapshot::{LoadedSnapshot, Snapshot};
pub use type_table::{
    share_type_table, BaseClassDef, EnumDef, EnumVariant, FieldLocation, MemberDef,
    PrimitiveDef, SharedTypeTable, StructDef, TemplateArg, TypeDef, TypeHandle, TypeId,
    TypeTable, DEFAULT_POINTER_SIZE,
};
