//! Test data builders for creating inspected processes
//!
//! Every layout below mirrors the engine's 64-bit memory layout closely enough for
//! the decoders; fields the decoders never read are left out.

use std::collections::HashMap;

use ns_formatters::backend::{
    EnumDef, MockMemory, MockTarget, PrimitiveDef, StructDef, ToBytes, TypeDef, TypeHandle,
    TypeId, TypeTable,
};
use ns_formatters::{FormatContext, FormatterSettings, Inspector, Value};

/// A built process plus the value under test
pub struct Fixture {
    pub target: MockTarget,
    pub value: Value,
}

impl Fixture {
    pub fn new(target: MockTarget, name: &str, address: u64, ty: TypeId) -> Self {
        let value = Value::at(name, address, TypeHandle::new(target.type_table(), ty));
        Self { target, value }
    }

    pub fn cx<'a>(&'a self, settings: &'a FormatterSettings) -> FormatContext<'a> {
        FormatContext::new(&self.target, settings)
    }

    /// Another value of a named type in the same process
    pub fn value_at(&self, name: &str, address: u64, type_name: &str) -> Value {
        let ty = self
            .target
            .find_type(type_name)
            .unwrap_or_else(|| panic!("type {} not declared", type_name));
        Value::at(name, address, ty)
    }
}

/// Builder for type tables and mapped memory
pub struct TargetBuilder {
    table: TypeTable,
    memory: MockMemory,
    primitives: HashMap<&'static str, TypeId>,
}

impl TargetBuilder {
    pub fn new() -> Self {
        Self {
            table: TypeTable::new(),
            memory: MockMemory::new(),
            primitives: HashMap::new(),
        }
    }

    pub fn prim(&mut self, prim: PrimitiveDef) -> TypeId {
        if let Some(id) = self.primitives.get(prim.name()) {
            return *id;
        }
        let id = self.table.insert(TypeDef::Primitive(prim));
        self.primitives.insert(prim.name(), id);
        id
    }

    pub fn pointer(&mut self, to: TypeId) -> TypeId {
        self.table.insert(TypeDef::Pointer(to))
    }

    pub fn void_ptr(&mut self) -> TypeId {
        let void = self.table.insert(TypeDef::Void);
        self.pointer(void)
    }

    pub fn array(&mut self, of: TypeId, count: u64) -> TypeId {
        self.table.insert(TypeDef::Array {
            element: of,
            count: Some(count),
        })
    }

    /// Reserve an id for a self-referential type
    pub fn declare(&mut self) -> TypeId {
        self.table.allocate()
    }

    pub fn define(&mut self, id: TypeId, def: TypeDef) {
        self.table.define(id, def);
    }

    pub fn insert(&mut self, def: TypeDef) -> TypeId {
        self.table.insert(def)
    }

    pub fn record(&mut self, def: StructDef) -> TypeId {
        self.table.insert(TypeDef::Struct(def))
    }

    pub fn typedef(&mut self, name: &str, underlying: TypeId) -> TypeId {
        self.table.insert(TypeDef::Typedef {
            name: name.to_string(),
            underlying,
        })
    }

    pub fn region(&mut self, address: u64, size: usize) -> &mut Self {
        self.memory.add_region(address, size);
        self
    }

    pub fn write<T: ToBytes>(&mut self, address: u64, value: T) -> &mut Self {
        assert!(
            self.memory.write_value(address, value),
            "write outside mapped memory at 0x{:X}",
            address
        );
        self
    }

    pub fn write_bytes(&mut self, address: u64, bytes: &[u8]) -> &mut Self {
        assert!(
            self.memory.write(address, bytes),
            "write outside mapped memory at 0x{:X}",
            address
        );
        self
    }

    pub fn build(self) -> MockTarget {
        MockTarget::new(self.table).with_memory(self.memory)
    }

    pub fn fixture(self, name: &str, address: u64, ty: TypeId) -> Fixture {
        Fixture::new(self.build(), name, address, ty)
    }

    // ==================== Shared layouts ====================

    /// `nsStringView { const char* m_pStart; nsUInt32 m_uiElementCount; }`
    pub fn string_view_type(&mut self) -> TypeId {
        let ch = self.prim(PrimitiveDef::Char);
        let ch_ptr = self.pointer(ch);
        let u32_id = self.prim(PrimitiveDef::UnsignedInt);
        self.record(
            StructDef::new(Some("nsStringView".to_string()), 16, true)
                .with_member("m_pStart", 0, ch_ptr)
                .with_member("m_uiElementCount", 8, u32_id),
        )
    }

    /// `nsVec3Template<float>` plus the `nsVec3` typedef
    pub fn vec3_type(&mut self) -> TypeId {
        let float = self.prim(PrimitiveDef::Float);
        let vec = self.record(
            StructDef::new(Some("nsVec3Template<float>".to_string()), 12, true)
                .with_member("x", 0, float)
                .with_member("y", 4, float)
                .with_member("z", 8, float)
                .with_template_type("Type", float),
        );
        self.typedef("nsVec3", vec)
    }
}

impl Default for TargetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ==================== Strings ====================

/// Inline buffer of the test hybrid string, in characters
pub const STRING_INLINE: usize = 16;
pub const STRING_ADDR: u64 = 0x1000;
pub const STRING_STATIC_DATA: u64 = STRING_ADDR + 24;
pub const HEAP_ADDR: u64 = 0x8000;

/// `nsHybridString<16>` holding `text` plus its terminator; inline when it fits
pub fn hybrid_string(text: &str) -> Fixture {
    let mut b = TargetBuilder::new();
    let ch = b.prim(PrimitiveDef::Char);
    let ch_ptr = b.pointer(ch);
    let u32_id = b.prim(PrimitiveDef::UnsignedInt);
    let alloc = b.void_ptr();
    let storage = b.array(ch, STRING_INLINE as u64);
    let data = b.record(
        StructDef::new(Some("nsHybridArray<char, 16>".to_string()), 40, true)
            .with_member("m_pElements", 0, ch_ptr)
            .with_member("m_uiCount", 8, u32_id)
            .with_member("m_uiCapacity", 12, u32_id)
            .with_member("m_pAllocator", 16, alloc)
            .with_member("m_StaticData", 24, storage)
            .with_template_type("T", ch),
    );
    let string = b.record(
        StructDef::new(Some("nsHybridString<16>".to_string()), 40, true).with_member("m_Data", 0, data),
    );

    let mut bytes = text.as_bytes().to_vec();
    if !bytes.is_empty() {
        bytes.push(0);
    }
    let count = bytes.len();

    b.region(STRING_ADDR, 40).region(HEAP_ADDR, 256);
    b.write(STRING_ADDR + 8, count as u32)
        .write(STRING_ADDR + 16, 0xA110Cu64);
    if count <= STRING_INLINE {
        b.write(STRING_ADDR + 12, STRING_INLINE as u32)
            .write(STRING_ADDR, STRING_STATIC_DATA)
            .write_bytes(STRING_STATIC_DATA, &bytes);
    } else {
        b.write(STRING_ADDR + 12, 256u32)
            .write(STRING_ADDR, HEAP_ADDR)
            .write_bytes(HEAP_ADDR, &bytes);
    }
    b.fixture("str", STRING_ADDR, string)
}

/// `nsStringView` over `text` (no terminator); a null view when `text` is empty
pub fn string_view(text: &str) -> Fixture {
    let mut b = TargetBuilder::new();
    let view = b.string_view_type();
    b.region(STRING_ADDR, 16).region(HEAP_ADDR, 256);
    if !text.is_empty() {
        b.write(STRING_ADDR, HEAP_ADDR)
            .write(STRING_ADDR + 8, text.len() as u32)
            .write_bytes(HEAP_ADDR, text.as_bytes());
    }
    b.fixture("view", STRING_ADDR, view)
}

// ==================== Arrays ====================

pub const ARRAY_ADDR: u64 = 0x1000;
pub const ARRAY_STATIC_DATA: u64 = ARRAY_ADDR + 24;

/// `nsHybridArray<int, 4>`; the elements go inline when `capacity` fits the buffer
pub fn hybrid_array(capacity: u32, values: &[i32]) -> Fixture {
    let mut b = TargetBuilder::new();
    let int = b.prim(PrimitiveDef::Int);
    let int_ptr = b.pointer(int);
    let u32_id = b.prim(PrimitiveDef::UnsignedInt);
    let alloc = b.void_ptr();
    let storage = b.array(int, 4);
    let array = b.record(
        StructDef::new(Some("nsHybridArray<int, 4>".to_string()), 40, true)
            .with_member("m_pElements", 0, int_ptr)
            .with_member("m_uiCount", 8, u32_id)
            .with_member("m_uiCapacity", 12, u32_id)
            .with_member("m_pAllocator", 16, alloc)
            .with_member("m_StaticData", 24, storage)
            .with_template_type("T", int),
    );

    let source = if capacity <= 4 { ARRAY_STATIC_DATA } else { HEAP_ADDR };
    b.region(ARRAY_ADDR, 40).region(HEAP_ADDR, 256);
    b.write(ARRAY_ADDR, source)
        .write(ARRAY_ADDR + 8, values.len() as u32)
        .write(ARRAY_ADDR + 12, capacity);
    for (i, v) in values.iter().enumerate() {
        b.write(source + i as u64 * 4, *v);
    }
    b.fixture("arr", ARRAY_ADDR, array)
}

/// `nsStaticArray<int, 4>` with a raw stored count
pub fn static_array(count: u32, values: &[i32]) -> Fixture {
    let mut b = TargetBuilder::new();
    let int = b.prim(PrimitiveDef::Int);
    let u32_id = b.prim(PrimitiveDef::UnsignedInt);
    let storage = b.array(int, 4);
    let array = b.record(
        StructDef::new(Some("nsStaticArray<int, 4>".to_string()), 24, true)
            .with_member("m_uiCount", 0, u32_id)
            .with_member("m_uiCapacity", 4, u32_id)
            .with_member("m_Data", 8, storage)
            .with_template_type("T", int),
    );
    b.region(ARRAY_ADDR, 24);
    b.write(ARRAY_ADDR, count).write(ARRAY_ADDR + 4, 4u32);
    for (i, v) in values.iter().enumerate() {
        b.write(ARRAY_ADDR + 8 + i as u64 * 4, *v);
    }
    b.fixture("arr", ARRAY_ADDR, array)
}

// ==================== Ring Buffer ====================

pub const RING_ADDR: u64 = 0x1000;
pub const RING_STATIC_DATA: u64 = RING_ADDR + 16;

/// `nsStaticRingBuffer<int, N>` with `slots` inline slots
pub fn ring_buffer_type(b: &mut TargetBuilder, slots: u64) -> TypeId {
    let int = b.prim(PrimitiveDef::Int);
    let int_ptr = b.pointer(int);
    let u32_id = b.prim(PrimitiveDef::UnsignedInt);
    let storage = b.array(int, slots);
    b.record(
        StructDef::new(
            Some(format!("nsStaticRingBuffer<int, {}>", slots)),
            16 + slots * 4,
            true,
        )
        .with_member("m_pElements", 0, int_ptr)
        .with_member("m_uiCount", 8, u32_id)
        .with_member("m_uiFirstElement", 12, u32_id)
        .with_member("m_StaticData", 16, storage)
        .with_template_type("T", int),
    )
}

/// `nsStaticRingBuffer<int, 4>`; physical slot `i` holds `100 + i`
pub fn ring_buffer(first: u32, count: u32) -> Fixture {
    let mut b = TargetBuilder::new();
    let ring = ring_buffer_type(&mut b, 4);
    b.region(RING_ADDR, 32);
    b.write(RING_ADDR, RING_STATIC_DATA)
        .write(RING_ADDR + 8, count)
        .write(RING_ADDR + 12, first);
    for slot in 0..4u64 {
        b.write(RING_STATIC_DATA + slot * 4, 100 + slot as i32);
    }
    b.fixture("ring", RING_ADDR, ring)
}

// ==================== Hash Table ====================

pub const TABLE_ADDR: u64 = 0x1000;
pub const ENTRIES_ADDR: u64 = 0x4000;
pub const FLAGS_ADDR: u64 = 0x6000;
pub const ENTRY_TYPE: &str = "nsHashTableBase<int, int>::Entry";

pub const SECOND_TABLE_ADDR: u64 = 0x1800;
pub const SECOND_ENTRIES_ADDR: u64 = 0x7000;
pub const SECOND_FLAGS_ADDR: u64 = 0x7800;
pub const HASH_TABLE_TYPE: &str = "nsHashTable<int, int>";

fn hash_table_type(b: &mut TargetBuilder) -> TypeId {
    let int = b.prim(PrimitiveDef::Int);
    let u32_id = b.prim(PrimitiveDef::UnsignedInt);
    let u32_ptr = b.pointer(u32_id);
    let alloc = b.void_ptr();
    let entry = b.record(
        StructDef::new(Some(ENTRY_TYPE.to_string()), 8, false)
            .with_member("key", 0, int)
            .with_member("value", 4, int),
    );
    let entry_ptr = b.pointer(entry);
    b.record(
        StructDef::new(Some(HASH_TABLE_TYPE.to_string()), 32, true)
            .with_member("m_pEntries", 0, entry_ptr)
            .with_member("m_pEntryFlags", 8, u32_ptr)
            .with_member("m_uiCount", 16, u32_id)
            .with_member("m_uiCapacity", 20, u32_id)
            .with_member("m_pAllocator", 24, alloc)
            .with_template_type("K", int)
            .with_template_type("V", int),
    )
}

/// Table header at `table`, slot array at `entries`, flag words at `flags`
fn write_hash_table(
    b: &mut TargetBuilder,
    (table, entries, flags): (u64, u64, u64),
    capacity: u32,
    occupied: &[u64],
    deleted: &[u64],
) {
    let words = (capacity as usize).div_ceil(16).max(1);
    b.region(table, 32)
        .region(entries, (capacity as usize * 8).max(8))
        .region(flags, words * 4);
    b.write(table, entries)
        .write(table + 8, flags)
        .write(table + 16, occupied.len() as u32)
        .write(table + 20, capacity);
    for slot in 0..u64::from(capacity) {
        b.write(entries + slot * 8, slot as i32)
            .write(entries + slot * 8 + 4, slot as i32 * 10);
    }

    let mut flag_words = vec![0u32; words];
    for (slots, flag) in [(occupied, 1u32), (deleted, 2u32)] {
        for &slot in slots {
            flag_words[(slot / 16) as usize] |= flag << ((slot % 16) * 2);
        }
    }
    for (i, word) in flag_words.into_iter().enumerate() {
        b.write(flags + i as u64 * 4, word);
    }
}

/// `nsHashTable<int, int>`. Slot `s` holds `key = s, value = 10 * s`; `occupied`
/// slots get flag 1, `deleted` slots get flag 2.
pub fn hash_table(capacity: u32, occupied: &[u64], deleted: &[u64]) -> Fixture {
    let mut b = TargetBuilder::new();
    let table = hash_table_type(&mut b);
    write_hash_table(&mut b, (TABLE_ADDR, ENTRIES_ADDR, FLAGS_ADDR), capacity, occupied, deleted);
    b.fixture("table", TABLE_ADDR, table)
}

/// Two capacity-32 tables in one process; the fixture value is the first, the
/// second lives at [`SECOND_TABLE_ADDR`]
pub fn two_hash_tables(first: &[u64], second: &[u64]) -> Fixture {
    let mut b = TargetBuilder::new();
    let table = hash_table_type(&mut b);
    write_hash_table(&mut b, (TABLE_ADDR, ENTRIES_ADDR, FLAGS_ADDR), 32, first, &[]);
    write_hash_table(
        &mut b,
        (SECOND_TABLE_ADDR, SECOND_ENTRIES_ADDR, SECOND_FLAGS_ADDR),
        32,
        second,
        &[],
    );
    b.fixture("table", TABLE_ADDR, table)
}

// ==================== Map ====================

pub const MAP_ADDR: u64 = 0x2000;
pub const NIL_ADDR: u64 = MAP_ADDR + 8;
pub const NODES_ADDR: u64 = 0x3000;
pub const NODE_STRIDE: u64 = 0x40;
pub const MAP_NODE_TYPE: &str = "nsMapBase<int, int, nsCompareHelper<int>>::Node";

pub const SECOND_MAP_ADDR: u64 = 0x2800;
pub const SECOND_NODES_ADDR: u64 = 0x5000;
pub const MAP_TYPE: &str = "nsMap<int, int, nsCompareHelper<int>>";

/// Address of the node holding the `i`-th smallest key
pub fn map_node_addr(i: usize) -> u64 {
    NODES_ADDR + i as u64 * NODE_STRIDE
}

fn map_type(b: &mut TargetBuilder) -> TypeId {
    let int = b.prim(PrimitiveDef::Int);
    let u32_id = b.prim(PrimitiveDef::UnsignedInt);
    let alloc = b.void_ptr();
    let node = b.declare();
    let node_ptr = b.pointer(node);
    let links = b.array(node_ptr, 2);
    b.define(
        node,
        TypeDef::Struct(
            StructDef::new(Some(MAP_NODE_TYPE.to_string()), 40, false)
                .with_member("m_pParent", 0, node_ptr)
                .with_member("m_pLink", 8, links)
                .with_member("m_uiLevel", 24, u32_id)
                .with_member("m_Key", 28, int)
                .with_member("m_Value", 32, int),
        ),
    );
    b.record(
        StructDef::new(Some(MAP_TYPE.to_string()), 64, true)
            .with_member("m_pRoot", 0, node_ptr)
            .with_member("m_NilNode", 8, node)
            .with_member("m_uiCount", 48, u32_id)
            .with_member("m_pAllocator", 56, alloc)
            .with_template_type("KeyType", int)
            .with_template_type("ValueType", int),
    )
}

/// Map header at `map_addr` with its nil node embedded, nodes from `nodes_addr`
/// in key order
fn write_map(
    b: &mut TargetBuilder,
    (map_addr, nodes_addr): (u64, u64),
    keys: &[i32],
    self_parented_root: bool,
    stored_count: Option<u32>,
) {
    let nil = map_addr + 8;
    b.region(map_addr, 64)
        .region(nodes_addr, (keys.len().max(1)) * NODE_STRIDE as usize);
    // Nil node links to itself
    b.write(nil, nil).write(nil + 8, nil).write(nil + 16, nil);

    struct Placement<'k> {
        keys: &'k [i32],
        nil: u64,
        nodes_addr: u64,
    }

    fn place(b: &mut TargetBuilder, p: &Placement<'_>, lo: usize, hi: usize, parent: u64) -> u64 {
        if lo >= hi {
            return p.nil;
        }
        let mid = (lo + hi) / 2;
        let addr = p.nodes_addr + mid as u64 * NODE_STRIDE;
        let left = place(b, p, lo, mid, addr);
        let right = place(b, p, mid + 1, hi, addr);
        b.write(addr, parent)
            .write(addr + 8, left)
            .write(addr + 16, right)
            .write(addr + 24, 1u32)
            .write(addr + 28, p.keys[mid])
            .write(addr + 32, p.keys[mid] * 2);
        addr
    }

    let placement = Placement {
        keys,
        nil,
        nodes_addr,
    };
    let root = place(b, &placement, 0, keys.len(), nil);
    if self_parented_root && root != nil {
        b.write(root, root);
    }
    b.write(map_addr, root)
        .write(map_addr + 48, stored_count.unwrap_or(keys.len() as u32));
}

/// `nsMap<int, int>` holding `keys` (sorted ascending) in a balanced tree, value
/// `key * 2`. The root's parent is the nil node, or the root itself when
/// `self_parented_root` is set. `stored_count` overrides `m_uiCount`.
pub fn map(keys: &[i32], self_parented_root: bool, stored_count: Option<u32>) -> Fixture {
    let mut b = TargetBuilder::new();
    let map = map_type(&mut b);
    write_map(&mut b, (MAP_ADDR, NODES_ADDR), keys, self_parented_root, stored_count);
    b.fixture("map", MAP_ADDR, map)
}

/// Two maps in one process; the fixture value is the first, the second lives at
/// [`SECOND_MAP_ADDR`] with nodes from [`SECOND_NODES_ADDR`]
pub fn two_maps(first: &[i32], second: &[i32]) -> Fixture {
    let mut b = TargetBuilder::new();
    let map = map_type(&mut b);
    write_map(&mut b, (MAP_ADDR, NODES_ADDR), first, false, None);
    write_map(&mut b, (SECOND_MAP_ADDR, SECOND_NODES_ADDR), second, false, None);
    b.fixture("map", MAP_ADDR, map)
}

// ==================== List ====================

pub const LIST_ADDR: u64 = 0x1000;
pub const LIST_NODES_ADDR: u64 = 0x5000;

/// `nsList<int>` with nodes linked from the `m_First` sentinel to `m_Last`
pub fn list(values: &[i32]) -> Fixture {
    let mut b = TargetBuilder::new();
    let int = b.prim(PrimitiveDef::Int);
    let u32_id = b.prim(PrimitiveDef::UnsignedInt);
    let alloc = b.void_ptr();
    let node = b.declare();
    let node_ptr = b.pointer(node);
    b.define(
        node,
        TypeDef::Struct(
            StructDef::new(Some("nsListBase<int>::ListElement".to_string()), 24, false)
                .with_member("m_pPrev", 0, node_ptr)
                .with_member("m_pNext", 8, node_ptr)
                .with_member("m_Data", 16, int),
        ),
    );
    let list = b.record(
        StructDef::new(Some("nsList<int>".to_string()), 64, true)
            .with_member("m_First", 0, node)
            .with_member("m_Last", 24, node)
            .with_member("m_uiCount", 48, u32_id)
            .with_member("m_pAllocator", 56, alloc)
            .with_template_type("T", int),
    );

    let first = LIST_ADDR;
    let last = LIST_ADDR + 24;
    b.region(LIST_ADDR, 64)
        .region(LIST_NODES_ADDR, values.len().max(1) * 32);
    let node_addr = |i: usize| LIST_NODES_ADDR + i as u64 * 32;
    let mut prev = first;
    for (i, v) in values.iter().enumerate() {
        let addr = node_addr(i);
        let next = if i + 1 < values.len() { node_addr(i + 1) } else { last };
        b.write(addr, prev).write(addr + 8, next).write(addr + 16, *v);
        prev = addr;
    }
    let head = if values.is_empty() { last } else { node_addr(0) };
    b.write(first + 8, head)
        .write(last, prev)
        .write(LIST_ADDR + 48, values.len() as u32);
    b.fixture("list", LIST_ADDR, list)
}

// ==================== Deque ====================

pub const DEQUE_ADDR: u64 = 0x1000;
pub const CHUNKS_ADDR: u64 = 0x6000;
pub const CHUNK0_ADDR: u64 = 0x10000;
pub const CHUNK1_ADDR: u64 = 0x20000;

fn deque_layout(b: &mut TargetBuilder, element: TypeId, name: &str) -> TypeId {
    let u32_id = b.prim(PrimitiveDef::UnsignedInt);
    let alloc = b.void_ptr();
    let elem_ptr = b.pointer(element);
    let chunk_ptr = b.pointer(elem_ptr);
    b.record(
        StructDef::new(Some(name.to_string()), 24, true)
            .with_member("m_pChunks", 0, chunk_ptr)
            .with_member("m_uiCount", 8, u32_id)
            .with_member("m_uiFirstElement", 12, u32_id)
            .with_member("m_pAllocator", 16, alloc)
            .with_template_type("T", element),
    )
}

/// `nsDeque<int>` starting at logical offset `first`, spread over two 4 KiB chunks
pub fn int_deque(first: u32, values: &[i32]) -> Fixture {
    let mut b = TargetBuilder::new();
    let int = b.prim(PrimitiveDef::Int);
    let deque = deque_layout(&mut b, int, "nsDeque<int>");

    b.region(DEQUE_ADDR, 24)
        .region(CHUNKS_ADDR, 16)
        .region(CHUNK0_ADDR, 4096)
        .region(CHUNK1_ADDR, 4096);
    b.write(DEQUE_ADDR, CHUNKS_ADDR)
        .write(DEQUE_ADDR + 8, values.len() as u32)
        .write(DEQUE_ADDR + 12, first)
        .write(CHUNKS_ADDR, CHUNK0_ADDR)
        .write(CHUNKS_ADDR + 8, CHUNK1_ADDR);
    for (i, v) in values.iter().enumerate() {
        let real = u64::from(first) + i as u64;
        let chunk = if real < 1024 { CHUNK0_ADDR } else { CHUNK1_ADDR };
        b.write(chunk + (real % 1024) * 4, *v);
    }
    b.fixture("deque", DEQUE_ADDR, deque)
}

/// `nsDeque<Blob>` whose element is 4096 bytes large, holding `count` elements
pub fn blob_deque(count: u32) -> Fixture {
    let mut b = TargetBuilder::new();
    let int = b.prim(PrimitiveDef::Int);
    let blob = b.record(StructDef::new(Some("Blob".to_string()), 4096, false).with_member("id", 0, int));
    let deque = deque_layout(&mut b, blob, "nsDeque<Blob>");

    b.region(DEQUE_ADDR, 24).region(CHUNKS_ADDR, 16);
    b.write(DEQUE_ADDR, CHUNKS_ADDR)
        .write(DEQUE_ADDR + 8, count)
        .write(CHUNKS_ADDR, CHUNK0_ADDR);
    b.fixture("deque", DEQUE_ADDR, deque)
}

// ==================== Variant ====================

pub const VARIANT_ADDR: u64 = 0x1000;
pub const SHARED_ADDR: u64 = 0x7000;
pub const SHARED_PAYLOAD_ADDR: u64 = 0x7100;
pub const RTTI_ADDR: u64 = 0x7200;
pub const RTTI_NAME_ADDR: u64 = 0x7300;

pub const TAG_INVALID: u8 = 0;
pub const TAG_INT32: u8 = 6;
pub const TAG_VECTOR3: u8 = 14;
pub const TAG_LAST_STANDARD: u8 = 39;
pub const TAG_TYPED_OBJECT: u8 = 40;

/// An 8-byte reflected type that fits the inline payload of a typed object
pub const PAIR_TYPE: &str = "nsIntPair";

/// How the payload of the test variant is stored
pub enum VariantPayload<'a> {
    /// Bytes placed in the inline union
    Inline(&'a [u8]),
    /// Bytes placed behind the shared pointer
    Shared(&'a [u8]),
    /// Inline bytes (at most 8) of a runtime-typed object named `type_name`
    TypedObject { bytes: &'a [u8], type_name: &'a str },
}

/// `nsVariant` with type tag `tag`
pub fn variant(tag: u8, payload: VariantPayload<'_>) -> Fixture {
    let mut b = TargetBuilder::new();
    let int = b.prim(PrimitiveDef::Int);
    let uchar = b.prim(PrimitiveDef::UnsignedChar);
    let bool_id = b.prim(PrimitiveDef::Bool);
    b.typedef("nsInt32", int);
    b.vec3_type();
    b.record(
        StructDef::new(Some(PAIR_TYPE.to_string()), 8, true)
            .with_member("first", 0, int)
            .with_member("second", 4, int),
    );
    let view = b.string_view_type();

    b.insert(TypeDef::Enum(
        EnumDef::new(Some("nsVariantType::Enum".to_string()), 1)
            .with_variant("Invalid", i64::from(TAG_INVALID))
            .with_variant("Bool", 1)
            .with_variant("Int32", i64::from(TAG_INT32))
            .with_variant("Vector3", i64::from(TAG_VECTOR3))
            .with_variant("LastStandardType", i64::from(TAG_LAST_STANDARD))
            .with_variant("TypedObject", i64::from(TAG_TYPED_OBJECT)),
    ));

    let rtti = b.record(StructDef::new(Some("nsRTTI".to_string()), 16, true).with_member("m_sTypeName", 0, view));
    let rtti_ptr = b.pointer(rtti);
    let raw_ptr = b.void_ptr();
    let shared = b.record(
        StructDef::new(Some("nsVariant::SharedData".to_string()), 16, true)
            .with_member("m_Ptr", 0, raw_ptr)
            .with_member("m_pType", 8, rtti_ptr),
    );
    let shared_ptr = b.pointer(shared);
    let inline_bytes = b.array(uchar, 8);
    let inlined = b.record(
        StructDef::new(Some("nsVariant::InlinedStruct".to_string()), 16, false)
            .with_member("m_Data", 0, inline_bytes)
            .with_member("m_pType", 8, rtti_ptr),
    );
    let raw = b.array(uchar, 16);
    let data = b.insert(TypeDef::Union(
        StructDef::new(Some("nsVariant::Data".to_string()), 16, false)
            .with_member("m_Data", 0, raw)
            .with_member("shared", 0, shared_ptr)
            .with_member("inlined", 0, inlined),
    ));
    let variant = b.record(
        StructDef::new(Some("nsVariant".to_string()), 24, true)
            .with_member("m_Data", 0, data)
            .with_member("m_uiType", 16, uchar)
            .with_member("m_bIsShared", 17, bool_id),
    );

    b.region(VARIANT_ADDR, 24)
        .region(SHARED_ADDR, 0x400);
    b.write(VARIANT_ADDR + 16, tag);
    match payload {
        VariantPayload::Inline(bytes) => {
            b.write_bytes(VARIANT_ADDR, bytes);
        }
        VariantPayload::Shared(bytes) => {
            b.write(VARIANT_ADDR + 17, 1u8)
                .write(VARIANT_ADDR, SHARED_ADDR)
                .write(SHARED_ADDR, SHARED_PAYLOAD_ADDR)
                .write_bytes(SHARED_PAYLOAD_ADDR, bytes);
        }
        VariantPayload::TypedObject { bytes, type_name } => {
            b.write_bytes(VARIANT_ADDR, bytes)
                .write(VARIANT_ADDR + 8, RTTI_ADDR)
                .write(RTTI_ADDR, RTTI_NAME_ADDR)
                .write(RTTI_ADDR + 8, type_name.len() as u32)
                .write_bytes(RTTI_NAME_ADDR, type_name.as_bytes());
        }
    }
    b.fixture("var", VARIANT_ADDR, variant)
}

/// Little-endian bytes of three floats
pub fn vec3_bytes(x: f32, y: f32, z: f32) -> Vec<u8> {
    [x, y, z].iter().flat_map(|f| f.to_le_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_table_builder_sets_flags() {
        let fixture = hash_table(32, &[0, 17], &[1]);
        let word0 = fixture.target.read_unsigned(FLAGS_ADDR, 4).unwrap();
        let word1 = fixture.target.read_unsigned(FLAGS_ADDR + 4, 4).unwrap();
        assert_eq!(word0, 0b1001);
        assert_eq!(word1, 0b0100);
    }
}
