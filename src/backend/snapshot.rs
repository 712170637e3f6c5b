//! Snapshot files: a stopped process captured as JSON
//!
//! A snapshot holds the layout reflection, the mapped memory and the list of root
//! values to display. Loading one yields a [`MockTarget`] plus the roots, which is
//! what the command-line front end renders.
//!
//! Type references are plain names. A trailing `*` makes a pointer and a trailing
//! `[N]` makes an array, so only records, enums and typedefs need to be declared.
//! Primitive names (`int`, `unsigned char`, ...) resolve without a declaration.
//!
//! ```json
//! {
//!   "pointer_size": 8,
//!   "types": [
//!     { "kind": "struct", "name": "nsStringView", "size": 16,
//!       "members": [ { "name": "m_pStart", "offset": 0, "type": "char*" },
//!                    { "name": "m_uiElementCount", "offset": 8, "type": "unsigned int" } ] }
//!   ],
//!   "regions": [ { "address": 4096, "hex": "68656c6c6f" } ],
//!   "roots": [ { "name": "view", "address": 8192, "type": "nsStringView" } ]
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::mock_target::{MockMemory, MockTarget};
use super::type_table::{EnumDef, PrimitiveDef, StructDef, TypeDef, TypeHandle, TypeId, TypeTable};
use super::DEFAULT_POINTER_SIZE;
use crate::error::{FormatterError, Result};
use crate::types::Value;

/// On-disk snapshot document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub pointer_size: Option<u64>,
    pub types: Vec<TypeDecl>,
    pub regions: Vec<RegionDecl>,
    pub roots: Vec<RootDecl>,
}

/// A declared type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeDecl {
    Struct(RecordDecl),
    Union(RecordDecl),
    Enum {
        name: String,
        size: u64,
        #[serde(default)]
        variants: Vec<VariantDecl>,
    },
    Typedef {
        name: String,
        underlying: String,
    },
}

impl TypeDecl {
    fn name(&self) -> &str {
        match self {
            TypeDecl::Struct(r) | TypeDecl::Union(r) => &r.name,
            TypeDecl::Enum { name, .. } | TypeDecl::Typedef { name, .. } => name,
        }
    }
}

/// A struct or union declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordDecl {
    pub name: String,
    pub size: u64,
    #[serde(default)]
    pub members: Vec<MemberDecl>,
    /// Template type arguments, in declaration order
    #[serde(default)]
    pub template_args: Vec<String>,
    #[serde(default)]
    pub bases: Vec<BaseDecl>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberDecl {
    /// Empty for anonymous members
    #[serde(default)]
    pub name: String,
    pub offset: u64,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseDecl {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub offset: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantDecl {
    pub name: String,
    pub value: i64,
}

/// A mapped memory region, contents as a hex string
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionDecl {
    pub address: u64,
    #[serde(default)]
    pub hex: String,
    /// Zero-filled size, used when `hex` is empty
    #[serde(default)]
    pub size: Option<usize>,
}

/// A value to display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootDecl {
    pub name: String,
    pub address: u64,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// A loaded snapshot: the simulated process and the values to show
#[derive(Debug)]
pub struct LoadedSnapshot {
    pub target: MockTarget,
    pub roots: Vec<Value>,
}

impl Snapshot {
    /// Parse a snapshot from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| FormatterError::Snapshot(format!("Failed to parse snapshot: {}", e)))
    }

    /// Read and parse a snapshot file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Build the type table, memory and root values
    pub fn build(&self) -> Result<LoadedSnapshot> {
        let (table, named) = self.build_types()?;
        let table = std::sync::Arc::new(table);

        let mut memory = MockMemory::new();
        for region in &self.regions {
            let bytes = if region.hex.is_empty() {
                vec![0u8; region.size.unwrap_or(0)]
            } else {
                decode_hex(&region.hex)?
            };
            memory.add_region_with(region.address, bytes);
        }

        let roots = self
            .roots
            .iter()
            .map(|root| {
                let id = named
                    .get(root.type_name.trim())
                    .copied()
                    .ok_or_else(|| FormatterError::MissingType(root.type_name.clone()))?;
                Ok(Value::at(
                    root.name.clone(),
                    root.address,
                    TypeHandle::new(table.clone(), id),
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            "Loaded snapshot: {} types, {} regions, {} roots",
            table.len(),
            memory.region_count(),
            roots.len()
        );

        Ok(LoadedSnapshot {
            target: MockTarget::from_shared(table).with_memory(memory),
            roots,
        })
    }

    fn build_types(&self) -> Result<(TypeTable, HashMap<String, TypeId>)> {
        let mut builder = TableBuilder {
            table: TypeTable::with_pointer_size(self.pointer_size.unwrap_or(DEFAULT_POINTER_SIZE)),
            named: HashMap::new(),
        };

        // Allocate first so declarations can reference each other in any order
        for decl in &self.types {
            let id = builder.table.allocate();
            if builder.named.insert(decl.name().to_string(), id).is_some() {
                return Err(FormatterError::Snapshot(format!(
                    "Type '{}' declared twice",
                    decl.name()
                )));
            }
        }

        for decl in &self.types {
            let id = builder.named[decl.name()];
            let def = match decl {
                TypeDecl::Struct(record) => TypeDef::Struct(builder.record(record)?),
                TypeDecl::Union(record) => TypeDef::Union(builder.record(record)?),
                TypeDecl::Enum {
                    name,
                    size,
                    variants,
                } => TypeDef::Enum(
                    variants
                        .iter()
                        .fold(EnumDef::new(Some(name.clone()), *size), |e, v| {
                            e.with_variant(v.name.clone(), v.value)
                        }),
                ),
                TypeDecl::Typedef { name, underlying } => TypeDef::Typedef {
                    name: name.clone(),
                    underlying: builder.resolve(underlying)?,
                },
            };
            builder.table.define(id, def);
        }

        for root in &self.roots {
            builder.resolve(&root.type_name)?;
        }

        Ok((builder.table, builder.named))
    }
}

struct TableBuilder {
    table: TypeTable,
    named: HashMap<String, TypeId>,
}

impl TableBuilder {
    fn record(&mut self, decl: &RecordDecl) -> Result<StructDef> {
        let mut def = StructDef::new(Some(decl.name.clone()), decl.size, false);
        for member in &decl.members {
            let ty = self.resolve(&member.type_name)?;
            def = def.with_member(member.name.clone(), member.offset, ty);
        }
        for (i, arg) in decl.template_args.iter().enumerate() {
            let ty = self.resolve(arg)?;
            def = def.with_template_type(format!("T{}", i), ty);
        }
        for base in &decl.bases {
            let ty = self.resolve(&base.type_name)?;
            def = def.with_base(ty, base.offset);
        }
        Ok(def)
    }

    /// Resolve a type spelling, creating pointer, array and primitive types on demand
    fn resolve(&mut self, spelling: &str) -> Result<TypeId> {
        let spelling = spelling.trim();
        if let Some(&id) = self.named.get(spelling) {
            return Ok(id);
        }

        let id = if let Some(inner) = spelling.strip_suffix('*') {
            let pointee = self.resolve(inner)?;
            self.table.insert(TypeDef::Pointer(pointee))
        } else if let Some((inner, count)) = parse_array_suffix(spelling) {
            let element = self.resolve(inner)?;
            self.table.insert(TypeDef::Array {
                element,
                count: Some(count),
            })
        } else if spelling == "void" {
            self.table.insert(TypeDef::Void)
        } else if let Some(prim) = PrimitiveDef::from_name(spelling) {
            self.table.insert(TypeDef::Primitive(prim))
        } else {
            return Err(FormatterError::Snapshot(format!(
                "Unknown type '{}'",
                spelling
            )));
        };

        self.named.insert(spelling.to_string(), id);
        Ok(id)
    }
}

fn parse_array_suffix(spelling: &str) -> Option<(&str, u64)> {
    let body = spelling.strip_suffix(']')?;
    let open = body.rfind('[')?;
    let count = body[open + 1..].trim().parse().ok()?;
    Some((&body[..open], count))
}

/// Decode a hex string, ignoring whitespace
pub fn decode_hex(text: &str) -> Result<Vec<u8>> {
    let digits: Vec<u8> = text
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if digits.len() % 2 != 0 {
        return Err(FormatterError::Snapshot(
            "Hex data has an odd number of digits".to_string(),
        ));
    }
    digits
        .chunks(2)
        .map(|pair| {
            let hi = (pair[0] as char).to_digit(16);
            let lo = (pair[1] as char).to_digit(16);
            match (hi, lo) {
                (Some(hi), Some(lo)) => Ok((hi * 16 + lo) as u8),
                _ => Err(FormatterError::Snapshot(format!(
                    "Invalid hex digits '{}{}'",
                    pair[0] as char, pair[1] as char
                ))),
            }
        })
        .collect()
}
