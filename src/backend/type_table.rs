//! Layout reflection for the inspected process
//!
//! Types live in one flat table and refer to each other by [`TypeId`], so a tree
//! node can hold pointers to its own type and a template instantiation can name
//! its arguments without boxing. The table answers the layout questions decoders
//! ask: byte sizes, member offsets (through bases and anonymous members),
//! template type arguments, enumerants and lookup by runtime name.
//!
//! [`TypeHandle`] pairs a shared table with an id and is what values carry around.

use std::collections::HashMap;
use std::sync::Arc;

/// Bound on typedef chains and nested anonymous-member searches
const MAX_RESOLVE_DEPTH: usize = 20;

/// Default pointer width of the inspected process in bytes
pub const DEFAULT_POINTER_SIZE: u64 = 8;

/// Index of a type in its [`TypeTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TypeId(pub u32);

impl TypeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub enum TypeDef {
    Primitive(PrimitiveDef),
    Pointer(TypeId),
    Reference(TypeId),
    /// Fixed-size array; `count` is `None` for flexible trailing arrays
    Array { element: TypeId, count: Option<u64> },
    Struct(StructDef),
    Union(StructDef),
    Enum(EnumDef),
    Typedef { name: String, underlying: TypeId },
    Const(TypeId),
    Volatile(TypeId),
    Void,
    /// Allocated with [`TypeTable::allocate`] but not defined yet
    Placeholder,
}

impl TypeDef {
    /// Name under which the type can be looked up
    pub fn name(&self) -> Option<&str> {
        match self {
            TypeDef::Struct(s) | TypeDef::Union(s) => s.name.as_deref(),
            TypeDef::Enum(e) => e.name.as_deref(),
            TypeDef::Typedef { name, .. } => Some(name),
            TypeDef::Primitive(p) => Some(p.name()),
            _ => None,
        }
    }

    /// The aliased type for typedefs and qualifiers
    fn alias_of(&self) -> Option<TypeId> {
        match self {
            TypeDef::Typedef { underlying, .. } => Some(*underlying),
            TypeDef::Const(inner) | TypeDef::Volatile(inner) => Some(*inner),
            _ => None,
        }
    }
}

/// Built-in scalar types, sized for the LP64 data model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveDef {
    Bool,
    Char,
    SignedChar,
    UnsignedChar,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    Float,
    Double,
}

/// Spelling and byte size of every primitive
const PRIMITIVES: &[(PrimitiveDef, &str, u64)] = &[
    (PrimitiveDef::Bool, "bool", 1),
    (PrimitiveDef::Char, "char", 1),
    (PrimitiveDef::SignedChar, "signed char", 1),
    (PrimitiveDef::UnsignedChar, "unsigned char", 1),
    (PrimitiveDef::Short, "short", 2),
    (PrimitiveDef::UnsignedShort, "unsigned short", 2),
    (PrimitiveDef::Int, "int", 4),
    (PrimitiveDef::UnsignedInt, "unsigned int", 4),
    (PrimitiveDef::Long, "long", 8),
    (PrimitiveDef::UnsignedLong, "unsigned long", 8),
    (PrimitiveDef::LongLong, "long long", 8),
    (PrimitiveDef::UnsignedLongLong, "unsigned long long", 8),
    (PrimitiveDef::Float, "float", 4),
    (PrimitiveDef::Double, "double", 8),
];

impl PrimitiveDef {
    fn entry(self) -> (&'static str, u64) {
        PRIMITIVES
            .iter()
            .find(|(p, _, _)| *p == self)
            .map(|(_, name, size)| (*name, *size))
            .unwrap_or(("?", 0))
    }

    pub fn size(self) -> u64 {
        self.entry().1
    }

    pub fn name(self) -> &'static str {
        self.entry().0
    }

    /// Look up a primitive by its C spelling
    pub fn from_name(name: &str) -> Option<Self> {
        PRIMITIVES
            .iter()
            .find(|(_, spelling, _)| *spelling == name)
            .map(|(p, _, _)| *p)
    }

    /// Signed integers and floats; plain `char` is treated as signed
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            PrimitiveDef::Char
                | PrimitiveDef::SignedChar
                | PrimitiveDef::Short
                | PrimitiveDef::Int
                | PrimitiveDef::Long
                | PrimitiveDef::LongLong
                | PrimitiveDef::Float
                | PrimitiveDef::Double
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, PrimitiveDef::Float | PrimitiveDef::Double)
    }

    pub fn is_char(self) -> bool {
        matches!(
            self,
            PrimitiveDef::Char | PrimitiveDef::SignedChar | PrimitiveDef::UnsignedChar
        )
    }
}

/// Record layout shared by structs, classes and unions
#[derive(Debug, Clone)]
pub struct StructDef {
    /// Full name, template arguments included (`nsHybridArray<int, 4>`)
    pub name: Option<String>,
    pub size: u64,
    pub members: Vec<MemberDef>,
    pub is_class: bool,
    /// Template type arguments in declaration order
    pub template_args: Vec<TemplateArg>,
    pub bases: Vec<BaseClassDef>,
}

impl StructDef {
    pub fn new(name: Option<String>, size: u64, is_class: bool) -> Self {
        Self {
            name,
            size,
            members: Vec::new(),
            is_class,
            template_args: Vec::new(),
            bases: Vec::new(),
        }
    }

    pub fn with_member(mut self, name: impl Into<String>, offset: u64, type_id: TypeId) -> Self {
        self.members.push(MemberDef {
            name: name.into(),
            offset,
            type_id,
        });
        self
    }

    pub fn with_template_type(mut self, name: impl Into<String>, type_id: TypeId) -> Self {
        self.template_args.push(TemplateArg {
            name: name.into(),
            type_id,
        });
        self
    }

    pub fn with_base(mut self, type_id: TypeId, offset: u64) -> Self {
        self.bases.push(BaseClassDef { type_id, offset });
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }
}

/// A data member; an empty name marks an anonymous struct or union
#[derive(Debug, Clone)]
pub struct MemberDef {
    pub name: String,
    pub offset: u64,
    pub type_id: TypeId,
}

#[derive(Debug, Clone)]
pub struct BaseClassDef {
    pub type_id: TypeId,
    pub offset: u64,
}

/// A template type argument (`T` in `nsDynamicArray<T>`)
#[derive(Debug, Clone)]
pub struct TemplateArg {
    pub name: String,
    pub type_id: TypeId,
}

#[derive(Debug, Clone)]
pub struct EnumDef {
    pub name: Option<String>,
    pub size: u64,
    pub variants: Vec<EnumVariant>,
}

impl EnumDef {
    pub fn new(name: Option<String>, size: u64) -> Self {
        Self {
            name,
            size,
            variants: Vec::new(),
        }
    }

    pub fn with_variant(mut self, name: impl Into<String>, value: i64) -> Self {
        self.variants.push(EnumVariant {
            name: name.into(),
            value,
        });
        self
    }

    /// First enumerant with the given value
    pub fn find_variant(&self, value: i64) -> Option<&EnumVariant> {
        self.variants.iter().find(|v| v.value == value)
    }
}

#[derive(Debug, Clone)]
pub struct EnumVariant {
    pub name: String,
    pub value: i64,
}

/// Where a member lives, relative to the start of the type it was looked up in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLocation {
    pub offset: u64,
    pub type_id: TypeId,
}

/// All types known for one inspected process
#[derive(Debug)]
pub struct TypeTable {
    types: Vec<TypeDef>,
    by_name: HashMap<String, Vec<TypeId>>,
    pointer_size: u64,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeTable {
    pub fn new() -> Self {
        Self::with_pointer_size(DEFAULT_POINTER_SIZE)
    }

    /// Table for a process with the given pointer width
    pub fn with_pointer_size(pointer_size: u64) -> Self {
        Self {
            types: Vec::new(),
            by_name: HashMap::new(),
            pointer_size,
        }
    }

    pub fn pointer_size(&self) -> u64 {
        self.pointer_size
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Reserve an id so that self-referential types can be built
    pub fn allocate(&mut self) -> TypeId {
        self.types.push(TypeDef::Placeholder);
        TypeId(self.types.len() as u32 - 1)
    }

    /// Fill in a reserved id. Ids this table never handed out are ignored.
    pub fn define(&mut self, id: TypeId, def: TypeDef) {
        let Some(slot) = self.types.get_mut(id.index()) else {
            tracing::warn!("Ignoring definition for unknown {:?}", id);
            return;
        };
        if let Some(name) = def.name() {
            self.by_name.entry(name.to_string()).or_default().push(id);
        }
        *slot = def;
    }

    pub fn insert(&mut self, def: TypeDef) -> TypeId {
        let id = self.allocate();
        self.define(id, def);
        id
    }

    pub fn get(&self, id: TypeId) -> Option<&TypeDef> {
        self.types.get(id.index())
    }

    /// First defined type registered under `name`
    pub fn find_type(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name)?.iter().copied().find(|id| {
            !matches!(self.get(*id), None | Some(TypeDef::Placeholder))
        })
    }

    /// Follow typedefs and cv-qualifiers to the type they name
    pub fn strip_aliases(&self, id: TypeId) -> TypeId {
        let mut current = id;
        for _ in 0..MAX_RESOLVE_DEPTH {
            match self.get(current).and_then(TypeDef::alias_of) {
                Some(next) => current = next,
                None => break,
            }
        }
        current
    }

    /// Size in bytes; `None` for placeholders and unresolvable chains
    pub fn type_size(&self, id: TypeId) -> Option<u64> {
        let mut id = self.strip_aliases(id);
        let mut multiplier = 1u64;
        for _ in 0..MAX_RESOLVE_DEPTH {
            let size = match self.get(id)? {
                TypeDef::Primitive(p) => p.size(),
                TypeDef::Pointer(_) | TypeDef::Reference(_) => self.pointer_size,
                TypeDef::Struct(s) | TypeDef::Union(s) => s.size,
                TypeDef::Enum(e) => e.size,
                TypeDef::Void => 0,
                TypeDef::Array { element, count } => {
                    multiplier = multiplier.checked_mul(count.unwrap_or(0))?;
                    id = self.strip_aliases(*element);
                    continue;
                }
                TypeDef::Placeholder => return None,
                TypeDef::Typedef { .. } | TypeDef::Const(_) | TypeDef::Volatile(_) => {
                    id = self.strip_aliases(id);
                    continue;
                }
            };
            return size.checked_mul(multiplier);
        }
        None
    }

    /// Name as a debugger would print it (`int*`, `char[16]`, `union nsVariant::Data`)
    pub fn type_name(&self, id: TypeId) -> String {
        self.name_at_depth(id, 0)
    }

    fn name_at_depth(&self, id: TypeId, depth: usize) -> String {
        if depth > MAX_RESOLVE_DEPTH {
            return "<recursive>".to_string();
        }
        let inner = |t: &TypeId| self.name_at_depth(*t, depth + 1);
        match self.get(id) {
            None => format!("<invalid:{}>", id.0),
            Some(TypeDef::Primitive(p)) => p.name().to_string(),
            Some(TypeDef::Pointer(t)) => format!("{}*", inner(t)),
            Some(TypeDef::Reference(t)) => format!("{}&", inner(t)),
            Some(TypeDef::Array { element, count }) => match count {
                Some(n) => format!("{}[{}]", inner(element), n),
                None => format!("{}[]", inner(element)),
            },
            Some(TypeDef::Struct(s)) => s.display_name().to_string(),
            Some(TypeDef::Union(s)) => format!("union {}", s.display_name()),
            Some(TypeDef::Enum(e)) => e.name.clone().unwrap_or_else(|| "<anonymous enum>".to_string()),
            Some(TypeDef::Typedef { name, .. }) => name.clone(),
            Some(TypeDef::Const(t)) => format!("const {}", inner(t)),
            Some(TypeDef::Volatile(t)) => format!("volatile {}", inner(t)),
            Some(TypeDef::Void) => "void".to_string(),
            Some(TypeDef::Placeholder) => "<placeholder>".to_string(),
        }
    }

    /// The record behind `id`, through aliases
    pub fn struct_def(&self, id: TypeId) -> Option<&StructDef> {
        match self.get(self.strip_aliases(id))? {
            TypeDef::Struct(s) | TypeDef::Union(s) => Some(s),
            _ => None,
        }
    }

    /// The enumeration behind `id`, through aliases
    pub fn enum_def(&self, id: TypeId) -> Option<&EnumDef> {
        match self.get(self.strip_aliases(id))? {
            TypeDef::Enum(e) => Some(e),
            _ => None,
        }
    }

    /// Look a member up by name. Direct members win; after that anonymous
    /// members and base classes are searched in declaration order.
    pub fn find_member(&self, id: TypeId, name: &str) -> Option<FieldLocation> {
        self.find_member_within(id, name, 0)
    }

    fn find_member_within(&self, id: TypeId, name: &str, depth: usize) -> Option<FieldLocation> {
        if depth > MAX_RESOLVE_DEPTH {
            return None;
        }
        let record = self.struct_def(id)?;
        if let Some(m) = record.members.iter().find(|m| m.name == name) {
            return Some(FieldLocation {
                offset: m.offset,
                type_id: m.type_id,
            });
        }

        let anonymous = record
            .members
            .iter()
            .filter(|m| m.name.is_empty())
            .map(|m| (m.offset, m.type_id));
        let bases = record.bases.iter().map(|b| (b.offset, b.type_id));
        anonymous.chain(bases).find_map(|(offset, nested)| {
            self.find_member_within(nested, name, depth + 1)
                .map(|found| FieldLocation {
                    offset: offset + found.offset,
                    type_id: found.type_id,
                })
        })
    }

    pub fn template_argument(&self, id: TypeId, index: usize) -> Option<TypeId> {
        self.struct_def(id)?
            .template_args
            .get(index)
            .map(|arg| arg.type_id)
    }

    pub fn pointee(&self, id: TypeId) -> Option<TypeId> {
        match self.get(self.strip_aliases(id))? {
            TypeDef::Pointer(t) | TypeDef::Reference(t) => Some(*t),
            _ => None,
        }
    }
}

// ==================== TypeHandle ====================

/// A type together with the table it belongs to. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct TypeHandle {
    table: Arc<TypeTable>,
    id: TypeId,
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Arc::ptr_eq(&self.table, &other.table)
    }
}

impl TypeHandle {
    pub fn new(table: Arc<TypeTable>, id: TypeId) -> Self {
        Self { table, id }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn table(&self) -> &Arc<TypeTable> {
        &self.table
    }

    pub fn def(&self) -> Option<&TypeDef> {
        self.table.get(self.id)
    }

    pub fn type_name(&self) -> String {
        self.table.type_name(self.id)
    }

    pub fn size(&self) -> Option<u64> {
        self.table.type_size(self.id)
    }

    /// The type behind typedefs and qualifiers
    pub fn underlying(&self) -> TypeHandle {
        self.with_id(self.table.strip_aliases(self.id))
    }

    /// Declared members, for records
    pub fn members(&self) -> Option<&[MemberDef]> {
        self.table.struct_def(self.id).map(|s| s.members.as_slice())
    }

    pub fn member_type(&self, member: &MemberDef) -> TypeHandle {
        self.with_id(member.type_id)
    }

    /// Offset and type of a member, inherited and anonymous ones included
    pub fn find_member(&self, name: &str) -> Option<(u64, TypeHandle)> {
        let loc = self.table.find_member(self.id, name)?;
        Some((loc.offset, self.with_id(loc.type_id)))
    }

    pub fn template_argument(&self, index: usize) -> Option<TypeHandle> {
        self.table
            .template_argument(self.id, index)
            .map(|id| self.with_id(id))
    }

    pub fn enum_def(&self) -> Option<&EnumDef> {
        self.table.enum_def(self.id)
    }

    pub fn primitive(&self) -> Option<PrimitiveDef> {
        match self.underlying().def() {
            Some(TypeDef::Primitive(p)) => Some(*p),
            _ => None,
        }
    }

    pub fn is_primitive(&self) -> bool {
        self.primitive().is_some()
    }

    pub fn is_pointer_or_reference(&self) -> bool {
        self.table.pointee(self.id).is_some()
    }

    pub fn pointee(&self) -> Option<TypeHandle> {
        self.table.pointee(self.id).map(|id| self.with_id(id))
    }

    pub fn element_type(&self) -> Option<TypeHandle> {
        match self.underlying().def() {
            Some(TypeDef::Array { element, .. }) => Some(self.with_id(*element)),
            _ => None,
        }
    }

    pub fn array_count(&self) -> Option<u64> {
        match self.underlying().def() {
            Some(TypeDef::Array { count, .. }) => *count,
            _ => None,
        }
    }

    /// Look up another type of the same process by name
    pub fn find_type(&self, name: &str) -> Option<TypeHandle> {
        self.table.find_type(name).map(|id| self.with_id(id))
    }

    fn with_id(&self, id: TypeId) -> TypeHandle {
        TypeHandle::new(Arc::clone(&self.table), id)
    }
}

/// A type table shared between the host and every value it produced
pub type SharedTypeTable = Arc<TypeTable>;

pub fn share_type_table(table: TypeTable) -> SharedTypeTable {
    Arc::new(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_spellings() {
        assert_eq!(PrimitiveDef::UnsignedShort.size(), 2);
        assert_eq!(PrimitiveDef::Double.name(), "double");
        assert_eq!(PrimitiveDef::from_name("unsigned char"), Some(PrimitiveDef::UnsignedChar));
        assert_eq!(PrimitiveDef::from_name("nsUInt8"), None);
        assert!(PrimitiveDef::Char.is_signed() && PrimitiveDef::Char.is_char());
        assert!(!PrimitiveDef::UnsignedLong.is_signed());
    }

    #[test]
    fn test_lookup_skips_placeholders() {
        let mut table = TypeTable::new();
        let pending = table.allocate();
        assert!(table.find_type("nsVec2").is_none());
        assert_eq!(table.type_size(pending), None);

        table.define(
            pending,
            TypeDef::Struct(StructDef::new(Some("nsVec2".to_string()), 8, false)),
        );
        assert_eq!(table.find_type("nsVec2"), Some(pending));

        // Out-of-range ids are dropped
        table.define(TypeId(99), TypeDef::Void);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_sizes_and_names_for_32_bit_target() {
        let mut table = TypeTable::with_pointer_size(4);
        let ch = table.insert(TypeDef::Primitive(PrimitiveDef::Char));
        let cch = table.insert(TypeDef::Const(ch));
        let ptr = table.insert(TypeDef::Pointer(cch));
        let buf = table.insert(TypeDef::Array {
            element: ptr,
            count: Some(3),
        });
        let grid = table.insert(TypeDef::Array {
            element: buf,
            count: Some(2),
        });

        assert_eq!(table.type_name(ptr), "const char*");
        assert_eq!(table.type_size(ptr), Some(4));
        assert_eq!(table.type_name(grid), "const char*[3][2]");
        assert_eq!(table.type_size(grid), Some(24));
        assert_eq!(table.pointee(ptr), Some(cch));
    }

    #[test]
    fn test_typedef_chain() {
        let mut table = TypeTable::new();
        let int = table.insert(TypeDef::Primitive(PrimitiveDef::Int));
        let i32_alias = table.insert(TypeDef::Typedef {
            name: "nsInt32".to_string(),
            underlying: int,
        });
        let cv = table.insert(TypeDef::Volatile(i32_alias));

        assert_eq!(table.type_name(i32_alias), "nsInt32");
        assert_eq!(table.strip_aliases(cv), int);
        assert_eq!(table.type_size(cv), Some(4));
    }

    #[test]
    fn test_self_referential_node() {
        let mut table = TypeTable::new();
        let node = table.allocate();
        let node_ptr = table.insert(TypeDef::Pointer(node));
        table.define(
            node,
            TypeDef::Struct(
                StructDef::new(Some("nsListBase<int>::ListElement".to_string()), 24, false)
                    .with_member("m_pPrev", 0, node_ptr)
                    .with_member("m_pNext", 8, node_ptr),
            ),
        );

        assert_eq!(table.type_name(node_ptr), "nsListBase<int>::ListElement*");
        assert_eq!(
            table.find_member(node, "m_pNext"),
            Some(FieldLocation {
                offset: 8,
                type_id: node_ptr
            })
        );
    }

    #[test]
    fn test_members_found_through_bases_and_anonymous_unions() {
        let mut table = TypeTable::new();
        let u32_id = table.insert(TypeDef::Primitive(PrimitiveDef::UnsignedInt));
        let base = table.insert(TypeDef::Struct(
            StructDef::new(Some("nsArrayBase<int>".to_string()), 8, false)
                .with_member("m_uiCount", 0, u32_id)
                .with_member("m_uiCapacity", 4, u32_id),
        ));
        let anon = table.insert(TypeDef::Union(
            StructDef::new(None, 4, false).with_member("m_uiUserData", 0, u32_id),
        ));
        let small = table.insert(TypeDef::Struct(
            StructDef::new(Some("nsSmallArray<int, 4>".to_string()), 32, false)
                .with_base(base, 0)
                .with_member("", 12, anon),
        ));

        let offset = |name| table.find_member(small, name).map(|l| l.offset);
        assert_eq!(offset("m_uiCapacity"), Some(4));
        assert_eq!(offset("m_uiUserData"), Some(12));
        assert_eq!(offset("m_pElements"), None);
        assert_eq!(table.type_name(anon), "union <anonymous>");
    }

    #[test]
    fn test_handle_navigation() {
        let mut table = TypeTable::new();
        let float = table.insert(TypeDef::Primitive(PrimitiveDef::Float));
        let vec = table.insert(TypeDef::Struct(
            StructDef::new(Some("nsVec3Template<float>".to_string()), 12, false)
                .with_member("x", 0, float)
                .with_member("y", 4, float)
                .with_member("z", 8, float)
                .with_template_type("Type", float),
        ));
        let alias = table.insert(TypeDef::Typedef {
            name: "nsVec3".to_string(),
            underlying: vec,
        });

        let handle = TypeHandle::new(share_type_table(table), alias);
        assert_eq!(handle.type_name(), "nsVec3");
        assert_eq!(handle.underlying().id(), vec);
        assert_eq!(handle.members().map(|m| m.len()), Some(3));
        assert_eq!(handle.template_argument(0).map(|t| t.id()), Some(float));
        assert!(handle.template_argument(1).is_none());

        let (offset, z) = handle.find_member("z").unwrap();
        assert_eq!(offset, 8);
        assert!(z.is_primitive());
        assert_eq!(handle.find_type("float"), Some(z));
    }
}
