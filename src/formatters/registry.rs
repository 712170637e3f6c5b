//! Type name to decoder classification
//!
//! Recognized types form a closed set of [`ShapeKind`]s. A type name is matched
//! once against a static pattern table; after that the decoder and summary are
//! chosen by matching on the enum.

use super::array::{ArrayKind, ArrayProvider};
use super::deque::DequeProvider;
use super::enums::{bitflags_summary, enum_summary, EnumProvider};
use super::hash_table::{entry_summary, HashTableProvider};
use super::list::ListProvider;
use super::map::{map_node_summary, set_node_summary, MapProvider};
use super::math::{
    angle_summary, color_summary, plane_summary, time_summary, uuid_summary, vec2_summary,
    vec3_summary, vec4_summary, MatrixProvider,
};
use super::ring_buffer::RingBufferProvider;
use super::strings::{
    hashed_string_summary, hybrid_string_summary, string_iterator_summary, string_view_summary,
    HashedStringProvider, HybridStringProvider, StringViewProvider,
};
use super::variant::{variant_summary, VariantProvider};
use super::{SummaryFn, SyntheticProvider};
use crate::types::Value;

/// Every engine type shape with a dedicated decoder or summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    HybridString,
    StringView,
    HashedString,
    StringIterator,
    Array(ArrayKind),
    RingBuffer,
    HashTable,
    HashTableEntry,
    /// Maps and sets share the tree decoder
    Map,
    MapNode,
    SetNode,
    List,
    Deque,
    Enum,
    Bitflags,
    Vec2,
    Vec3,
    Vec4,
    Quat,
    Plane,
    Color,
    Time,
    Angle,
    Uuid,
    Mat3,
    Mat4,
    Variant,
}

/// How a registry entry matches a type name
#[derive(Debug, Clone, Copy)]
enum Pattern {
    /// The whole name
    Exact(&'static str),
    /// `Name<...>`
    Template(&'static str),
    /// `Name<...>::Nested`
    Nested(&'static str, &'static str),
}

impl Pattern {
    fn matches(&self, name: &str) -> bool {
        match *self {
            Pattern::Exact(exact) => name == exact,
            Pattern::Template(base) => {
                template_suffix(name, base).is_some_and(|rest| rest.is_empty())
            }
            Pattern::Nested(base, nested) => template_suffix(name, base)
                .and_then(|rest| rest.strip_prefix("::"))
                .is_some_and(|rest| rest == nested),
        }
    }
}

/// For `base<...>rest`, return `rest`. Angle brackets must balance.
fn template_suffix<'a>(name: &'a str, base: &str) -> Option<&'a str> {
    let args = name.strip_prefix(base)?.strip_prefix('<')?;
    let mut depth = 1usize;
    for (i, c) in args.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&args[i + 1..]);
                }
            }
            _ => {}
        }
    }
    None
}

const PATTERNS: &[(Pattern, ShapeKind)] = &[
    (Pattern::Template("nsHybridString"), ShapeKind::HybridString),
    (Pattern::Exact("nsStringBuilder"), ShapeKind::HybridString),
    (Pattern::Exact("nsStringView"), ShapeKind::StringView),
    (Pattern::Exact("nsHashedString"), ShapeKind::HashedString),
    (Pattern::Exact("nsStringIterator"), ShapeKind::StringIterator),
    (Pattern::Exact("nsStringReverseIterator"), ShapeKind::StringIterator),
    (Pattern::Template("nsDynamicArray"), ShapeKind::Array(ArrayKind::Dynamic)),
    (Pattern::Template("nsHybridArray"), ShapeKind::Array(ArrayKind::Hybrid)),
    (Pattern::Template("nsSmallArray"), ShapeKind::Array(ArrayKind::Small)),
    (Pattern::Template("nsStaticArray"), ShapeKind::Array(ArrayKind::Static)),
    (Pattern::Template("nsArrayPtr"), ShapeKind::Array(ArrayKind::Pointer)),
    (Pattern::Exact("nsByteArrayPtr"), ShapeKind::Array(ArrayKind::Pointer)),
    (Pattern::Exact("nsConstByteArrayPtr"), ShapeKind::Array(ArrayKind::Pointer)),
    (Pattern::Template("nsStaticRingBuffer"), ShapeKind::RingBuffer),
    (Pattern::Template("nsHashTable"), ShapeKind::HashTable),
    (Pattern::Template("nsHashSet"), ShapeKind::HashTable),
    (Pattern::Nested("nsHashTableBase", "Entry"), ShapeKind::HashTableEntry),
    (Pattern::Template("nsMap"), ShapeKind::Map),
    (Pattern::Template("nsSet"), ShapeKind::Map),
    (Pattern::Nested("nsMapBase", "Node"), ShapeKind::MapNode),
    (Pattern::Nested("nsSetBase", "Node"), ShapeKind::SetNode),
    (Pattern::Template("nsList"), ShapeKind::List),
    (Pattern::Template("nsDeque"), ShapeKind::Deque),
    (Pattern::Template("nsEnum"), ShapeKind::Enum),
    (Pattern::Template("nsBitflags"), ShapeKind::Bitflags),
    (Pattern::Template("nsVec2Template"), ShapeKind::Vec2),
    (Pattern::Template("nsVec3Template"), ShapeKind::Vec3),
    (Pattern::Template("nsVec4Template"), ShapeKind::Vec4),
    (Pattern::Template("nsQuatTemplate"), ShapeKind::Quat),
    (Pattern::Template("nsPlaneTemplate"), ShapeKind::Plane),
    (Pattern::Exact("nsColor"), ShapeKind::Color),
    (Pattern::Exact("nsColorGammaUB"), ShapeKind::Color),
    (Pattern::Exact("nsColorLinearUB"), ShapeKind::Color),
    (Pattern::Exact("nsTime"), ShapeKind::Time),
    (Pattern::Exact("nsAngle"), ShapeKind::Angle),
    (Pattern::Exact("nsUuid"), ShapeKind::Uuid),
    (Pattern::Exact("nsMat3"), ShapeKind::Mat3),
    (Pattern::Template("nsMat3Template"), ShapeKind::Mat3),
    (Pattern::Exact("nsMat4"), ShapeKind::Mat4),
    (Pattern::Template("nsMat4Template"), ShapeKind::Mat4),
    (Pattern::Exact("nsVariant"), ShapeKind::Variant),
];

impl ShapeKind {
    /// Classify a type name
    pub fn classify(type_name: &str) -> Option<Self> {
        let name = type_name.trim();
        PATTERNS
            .iter()
            .find(|(pattern, _)| pattern.matches(name))
            .map(|(_, kind)| *kind)
    }

    /// Classify a value by its type name, then by the name behind typedefs and
    /// qualifiers
    pub fn of_value(value: &Value) -> Option<Self> {
        let handle = value.type_handle()?;
        Self::classify(&handle.type_name())
            .or_else(|| Self::classify(&handle.underlying().type_name()))
    }

    /// A fresh synthetic child provider, for shapes that expose children
    pub fn provider(self) -> Option<Box<dyn SyntheticProvider>> {
        let provider: Box<dyn SyntheticProvider> = match self {
            ShapeKind::HybridString => Box::new(HybridStringProvider::new()),
            ShapeKind::StringView => Box::new(StringViewProvider::new()),
            ShapeKind::HashedString => Box::new(HashedStringProvider::new()),
            ShapeKind::Array(kind) => Box::new(ArrayProvider::new(kind)),
            ShapeKind::RingBuffer => Box::new(RingBufferProvider::new()),
            ShapeKind::HashTable => Box::new(HashTableProvider::new()),
            ShapeKind::Map => Box::new(MapProvider::new()),
            ShapeKind::List => Box::new(ListProvider::new()),
            ShapeKind::Deque => Box::new(DequeProvider::new()),
            ShapeKind::Enum => Box::new(EnumProvider::new()),
            ShapeKind::Mat3 => Box::new(MatrixProvider::new(3)),
            ShapeKind::Mat4 => Box::new(MatrixProvider::new(4)),
            ShapeKind::Variant => Box::new(VariantProvider::new()),
            _ => return None,
        };
        Some(provider)
    }

    /// The one-line summary function, for shapes that have one
    pub fn summary(self) -> Option<SummaryFn> {
        let summary: SummaryFn = match self {
            ShapeKind::HybridString => hybrid_string_summary,
            ShapeKind::StringView => string_view_summary,
            ShapeKind::HashedString => hashed_string_summary,
            ShapeKind::StringIterator => string_iterator_summary,
            ShapeKind::HashTableEntry => entry_summary,
            ShapeKind::MapNode => map_node_summary,
            ShapeKind::SetNode => set_node_summary,
            ShapeKind::Enum => enum_summary,
            ShapeKind::Bitflags => bitflags_summary,
            ShapeKind::Vec2 => vec2_summary,
            ShapeKind::Vec3 => vec3_summary,
            ShapeKind::Vec4 | ShapeKind::Quat => vec4_summary,
            ShapeKind::Plane => plane_summary,
            ShapeKind::Color => color_summary,
            ShapeKind::Time => time_summary,
            ShapeKind::Angle => angle_summary,
            ShapeKind::Uuid => uuid_summary,
            ShapeKind::Variant => variant_summary,
            _ => return None,
        };
        Some(summary)
    }
}
