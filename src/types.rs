//! Core data types for the formatter layer
//!
//! This module contains the typed-value handle every decoder works with and the
//! memory-view primitives built on top of it.
//!
//! # Main Types
//!
//! - [`Value`] - A named (data, type) pair in the inspected process
//! - [`ValueType`] - A reflected type, or an array view synthesized over a byte range
//! - [`ValueData`] - Where the bytes of a value come from (memory, synthesized bytes, text)
//! - [`ScalarValue`] - A decoded primitive
//!
//! # Primitives
//!
//! - [`Value::field`] - typed child lookup by name (inherited and anonymous members included)
//! - [`Value::child_at_offset`] - offset-based child construction
//! - [`Value::element_array`] - reinterpretation of a byte range as `count` elements
//! - [`Inspector::read_memory`] - raw byte-range capture at an address
//!
//! All primitives are fallible. Decoders propagate with `?` internally and degrade at
//! their public entry points.

use crate::backend::inspector::{decode_unsigned, sign_extend, Inspector};
use crate::backend::type_table::TypeHandle;
use crate::error::{FormatterError, Result};

/// The type of a [`Value`]
#[derive(Debug, Clone, PartialEq)]
pub enum ValueType {
    /// A type from the type table
    Type(TypeHandle),
    /// A contiguous view of `count` elements, synthesized without a table entry
    Array { element: TypeHandle, count: u64 },
    /// Synthesized value with no layout (text labels, null)
    Opaque(&'static str),
}

impl ValueType {
    /// Size in bytes, if known
    pub fn size(&self) -> Option<u64> {
        match self {
            ValueType::Type(handle) => handle.size(),
            ValueType::Array { element, count } => element.size().map(|s| s * count),
            ValueType::Opaque(_) => None,
        }
    }

    /// Display name of the type
    pub fn name(&self) -> String {
        match self {
            ValueType::Type(handle) => handle.type_name(),
            ValueType::Array { element, count } => format!("{}[{}]", element.type_name(), count),
            ValueType::Opaque(name) => (*name).to_string(),
        }
    }

    /// The table handle, for non-synthesized types
    pub fn handle(&self) -> Option<&TypeHandle> {
        match self {
            ValueType::Type(handle) => Some(handle),
            _ => None,
        }
    }
}

/// Where the bytes of a value live
#[derive(Debug, Clone, PartialEq)]
pub enum ValueData {
    /// In the inspected process, at this address
    Memory(u64),
    /// Synthesized bytes (for example a tag reinterpreted as an enum)
    Bytes(Vec<u8>),
    /// Synthesized text
    Text(String),
    /// No data at all
    Null,
}

/// A decoded primitive
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalarValue {
    Bool(bool),
    Char(u8),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
}

impl std::fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarValue::Bool(b) => write!(f, "{}", b),
            ScalarValue::Char(c) if c.is_ascii_graphic() || *c == b' ' => {
                write!(f, "{} '{}'", c, *c as char)
            }
            ScalarValue::Char(c) => write!(f, "{}", c),
            ScalarValue::Unsigned(v) => write!(f, "{}", v),
            ScalarValue::Signed(v) => write!(f, "{}", v),
            ScalarValue::Float(v) => write!(f, "{}", v),
        }
    }
}

/// A typed view over bytes of the inspected process
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    name: String,
    ty: ValueType,
    data: ValueData,
}

impl Value {
    /// A value of a table type located in memory
    pub fn at(name: impl Into<String>, address: u64, ty: TypeHandle) -> Self {
        Self {
            name: name.into(),
            ty: ValueType::Type(ty),
            data: ValueData::Memory(address),
        }
    }

    /// A synthesized array view of `count` elements located in memory
    pub fn array_at(name: impl Into<String>, address: u64, element: TypeHandle, count: u64) -> Self {
        Self {
            name: name.into(),
            ty: ValueType::Array { element, count },
            data: ValueData::Memory(address),
        }
    }

    /// A value of a table type backed by synthesized bytes
    pub fn from_bytes(name: impl Into<String>, ty: TypeHandle, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            ty: ValueType::Type(ty),
            data: ValueData::Bytes(bytes),
        }
    }

    /// A synthesized text value
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ValueType::Opaque("const char*"),
            data: ValueData::Text(text.into()),
        }
    }

    /// A null value
    pub fn null(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ValueType::Opaque("nullptr_t"),
            data: ValueData::Null,
        }
    }

    /// Rename the value (used for `[i]` labels and structural names)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &ValueType {
        &self.ty
    }

    pub fn data(&self) -> &ValueData {
        &self.data
    }

    /// Table handle of this value's type (None for synthesized arrays and opaque values)
    pub fn type_handle(&self) -> Option<&TypeHandle> {
        self.ty.handle()
    }

    pub fn type_name(&self) -> String {
        self.ty.name()
    }

    /// Load address, if the value lives in memory
    pub fn address(&self) -> Option<u64> {
        match self.data {
            ValueData::Memory(address) => Some(address),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.data, ValueData::Null)
    }

    pub fn is_pointer(&self) -> bool {
        self.type_handle()
            .is_some_and(|h| h.is_pointer_or_reference())
    }

    /// Size in bytes, if known
    pub fn byte_size(&self) -> Option<u64> {
        self.ty.size()
    }

    fn required_type(&self) -> Result<&TypeHandle> {
        self.type_handle().ok_or_else(|| {
            FormatterError::TypeMismatch(format!(
                "'{}' of type {} has no layout",
                self.name,
                self.type_name()
            ))
        })
    }

    /// Read all bytes of the value
    pub fn bytes(&self, cx: &dyn Inspector) -> Result<Vec<u8>> {
        match &self.data {
            ValueData::Memory(address) => {
                let size = self.byte_size().ok_or_else(|| {
                    FormatterError::TypeMismatch(format!("size of {} unknown", self.type_name()))
                })?;
                cx.read_memory(*address, size as usize)
            }
            ValueData::Bytes(bytes) => Ok(bytes.clone()),
            ValueData::Text(text) => Ok(text.as_bytes().to_vec()),
            ValueData::Null => Err(FormatterError::TypeMismatch(format!(
                "'{}' is null",
                self.name
            ))),
        }
    }

    /// Read the value as an unsigned integer (pointers, enums and integers up to 8 bytes)
    pub fn as_unsigned(&self, cx: &dyn Inspector) -> Result<u64> {
        let size = self.byte_size().unwrap_or(0);
        if size == 0 || size > 8 {
            return Err(FormatterError::TypeMismatch(format!(
                "{} is not an integer",
                self.type_name()
            )));
        }
        Ok(decode_unsigned(&self.bytes(cx)?))
    }

    /// Read the value as a signed integer
    pub fn as_signed(&self, cx: &dyn Inspector) -> Result<i64> {
        let size = self.byte_size().unwrap_or(0) as usize;
        Ok(sign_extend(self.as_unsigned(cx)?, size))
    }

    /// Decode the value as a primitive
    pub fn scalar(&self, cx: &dyn Inspector) -> Result<ScalarValue> {
        let handle = self.required_type()?;
        if let Some(prim) = handle.primitive() {
            let bytes = self.bytes(cx)?;
            let raw = decode_unsigned(&bytes);
            let size = bytes.len();
            return Ok(if prim.is_float() {
                match size {
                    4 => ScalarValue::Float(f64::from(f32::from_bits(raw as u32))),
                    _ => ScalarValue::Float(f64::from_bits(raw)),
                }
            } else if prim == crate::backend::PrimitiveDef::Bool {
                ScalarValue::Bool(raw != 0)
            } else if prim.is_char() {
                ScalarValue::Char(raw as u8)
            } else if prim.is_signed() {
                ScalarValue::Signed(sign_extend(raw, size))
            } else {
                ScalarValue::Unsigned(raw)
            });
        }
        if handle.enum_def().is_some() {
            return Ok(ScalarValue::Signed(self.as_signed(cx)?));
        }
        if handle.is_pointer_or_reference() {
            return Ok(ScalarValue::Unsigned(self.as_unsigned(cx)?));
        }
        Err(FormatterError::TypeMismatch(format!(
            "{} is not a scalar",
            self.type_name()
        )))
    }

    /// Read the value as a float (any numeric primitive converts)
    pub fn as_f64(&self, cx: &dyn Inspector) -> Result<f64> {
        Ok(match self.scalar(cx)? {
            ScalarValue::Bool(b) => f64::from(u8::from(b)),
            ScalarValue::Char(c) => f64::from(c),
            ScalarValue::Unsigned(v) => v as f64,
            ScalarValue::Signed(v) => v as f64,
            ScalarValue::Float(v) => v,
        })
    }

    /// Follow a pointer to the value it points at
    pub fn dereference(&self, cx: &dyn Inspector) -> Result<Value> {
        let pointee = self.required_type()?.pointee().ok_or_else(|| {
            FormatterError::TypeMismatch(format!("{} is not a pointer", self.type_name()))
        })?;
        let address = self.as_unsigned(cx)?;
        if address == 0 {
            return Err(FormatterError::MemoryAccess {
                address,
                message: format!("'{}' is a null pointer", self.name),
            });
        }
        Ok(Value::at(format!("*{}", self.name), address, pointee))
    }

    /// Look up a member by name. Pointers are followed first, the way a debugger
    /// resolves `ptr->member`.
    pub fn field(&self, cx: &dyn Inspector, name: &str) -> Result<Value> {
        if self.is_pointer() {
            return self.dereference(cx)?.field(cx, name);
        }
        let handle = self.required_type()?;
        let (offset, member_ty) = handle
            .find_member(name)
            .ok_or_else(|| FormatterError::missing_field(handle.type_name(), name))?;
        self.sub_value(name, offset, member_ty)
    }

    /// Get the `index`-th declared member
    pub fn member_at(&self, index: usize) -> Result<Value> {
        let handle = self.required_type()?;
        let member = handle
            .members()
            .and_then(|m| m.get(index))
            .ok_or_else(|| FormatterError::missing_field(handle.type_name(), format!("#{}", index)))?;
        let member_ty = handle.member_type(member);
        self.sub_value(&member.name, member.offset, member_ty)
    }

    fn sub_value(&self, name: &str, offset: u64, ty: TypeHandle) -> Result<Value> {
        match &self.data {
            ValueData::Memory(address) => Ok(Value::at(name, address + offset, ty)),
            ValueData::Bytes(bytes) => {
                let size = ty.size().unwrap_or(0) as usize;
                let start = offset as usize;
                let slice = bytes.get(start..start + size).ok_or_else(|| {
                    FormatterError::CorruptLayout(format!(
                        "member '{}' outside of {} synthesized bytes",
                        name,
                        bytes.len()
                    ))
                })?;
                Ok(Value::from_bytes(name, ty, slice.to_vec()))
            }
            _ => Err(FormatterError::TypeMismatch(format!(
                "'{}' has no addressable members",
                self.name
            ))),
        }
    }

    /// Address that offsets are measured from: the pointee for pointers, the value
    /// itself otherwise
    pub fn base_address(&self, cx: &dyn Inspector) -> Result<u64> {
        if self.is_pointer() {
            return self.as_unsigned(cx);
        }
        self.address().ok_or_else(|| {
            FormatterError::TypeMismatch(format!("'{}' does not live in memory", self.name))
        })
    }

    /// Create a child of type `ty` at `offset` bytes from [`Value::base_address`]
    pub fn child_at_offset(
        &self,
        cx: &dyn Inspector,
        label: impl Into<String>,
        offset: u64,
        ty: TypeHandle,
    ) -> Result<Value> {
        let base = self.base_address(cx)?;
        Ok(Value::at(label, base.wrapping_add(offset), ty))
    }

    /// View `count` elements starting at [`Value::base_address`]. No bounds checking
    /// is done against the real allocation; callers clamp `count` first.
    pub fn element_array(
        &self,
        cx: &dyn Inspector,
        label: impl Into<String>,
        element: TypeHandle,
        count: u64,
    ) -> Result<Value> {
        let base = self.base_address(cx)?;
        Ok(Value::array_at(label, base, element, count))
    }
}
