//! `nsVariant` decoder
//!
//! A variant stores a type tag (`m_uiType`), a shared flag (`m_bIsShared`) and a
//! union `m_Data`. Inline payloads live in the union itself; shared payloads are
//! reached through `m_Data.shared->m_Ptr`. The tag's enumerant name picks the
//! concrete payload type.

use std::collections::HashMap;
use std::sync::LazyLock;

use super::strings::string_view_text;
use super::{logged, read_field, summary_or_error, FormatContext, SyntheticProvider};
use crate::backend::TypeHandle;
use crate::error::{FormatterError, Result, ResultExt};
use crate::types::Value;

/// Name of the tag enumeration in the inspected program
pub const VARIANT_TYPE_ENUM: &str = "nsVariantType::Enum";

/// Tag enumerant that carries no payload
pub const INVALID_TAG: &str = "Invalid";

/// Tag enumerant whose payload type is named at runtime
pub const TYPED_OBJECT_TAG: &str = "TypedObject";

/// Tag enumerant name to payload type name. Read-only configuration data.
pub static VARIANT_TARGET_TYPES: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| {
        HashMap::from([
            ("Bool", "bool"),
            ("Int8", "nsInt8"),
            ("UInt8", "nsUInt8"),
            ("Int16", "nsInt16"),
            ("UInt16", "nsUInt16"),
            ("Int32", "nsInt32"),
            ("UInt32", "nsUInt32"),
            ("Int64", "nsInt64"),
            ("UInt64", "nsUInt64"),
            ("Float", "float"),
            ("Double", "double"),
            ("Color", "nsColor"),
            ("Vector2", "nsVec2"),
            ("Vector3", "nsVec3"),
            ("Vector4", "nsVec4"),
            ("Vector2I", "nsVec2I32"),
            ("Vector3I", "nsVec3I32"),
            ("Vector4I", "nsVec4I32"),
            ("Vector2U", "nsVec2U32"),
            ("Vector3U", "nsVec3U32"),
            ("Vector4U", "nsVec4U32"),
            ("Quaternion", "nsQuat"),
            ("Matrix3", "nsMat3"),
            ("Matrix4", "nsMat4"),
            ("Transform", "nsTransform"),
            ("String", "nsString"),
            ("StringView", "nsStringView"),
            ("DataBuffer", "nsDataBuffer"),
            ("Time", "nsTime"),
            ("Uuid", "nsUuid"),
            ("Angle", "nsAngle"),
            ("ColorGamma", "nsColorGammaUB"),
            ("HashedString", "nsHashedString"),
            ("TempHashedString", "nsTempHashedString"),
            ("VariantArray", "nsVariantArray"),
            ("VariantDictionary", "nsVariantDictionary"),
            ("TypedPointer", "nsTypedPointer"),
        ])
    });

/// How the payload of a variant is interpreted
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// The tag names a known payload type
    Known(Value),
    /// The tag is `Invalid`
    Null,
    /// The tag is `TypedObject` and the runtime type was found
    TypedObject(Value),
    /// Anything else: the raw union
    Raw(Value),
}

impl Payload {
    pub fn into_value(self) -> Value {
        match self {
            Payload::Known(v) | Payload::TypedObject(v) => v.with_name("Value"),
            Payload::Null => Value::null(INVALID_TAG),
            Payload::Raw(v) => v,
        }
    }
}

#[derive(Debug, Clone)]
struct VariantLayout {
    tag: u64,
    tag_name: Option<String>,
    tag_type: Option<TypeHandle>,
    tag_field: Value,
    is_shared: bool,
    shared_field: Option<Value>,
    data: Value,
}

impl VariantLayout {
    fn read(cx: &FormatContext<'_>, value: &Value) -> Result<Self> {
        let tag_field = value.field(cx.target, "m_uiType")?;
        let tag = tag_field.as_unsigned(cx.target)?;
        let shared_field = value.field(cx.target, "m_bIsShared")?;
        let is_shared = shared_field.as_unsigned(cx.target)? != 0;

        let tag_type = cx.target.find_type(VARIANT_TYPE_ENUM);
        let tag_name = tag_type
            .as_ref()
            .and_then(|t| t.enum_def())
            .and_then(|def| def.variants.iter().find(|v| v.value as u64 == tag))
            .map(|v| v.name.clone());

        Ok(Self {
            tag,
            tag_name,
            tag_type,
            tag_field,
            is_shared,
            shared_field: Some(shared_field),
            data: value.field(cx.target, "m_Data")?,
        })
    }

    /// Tag reinterpreted as the tag enumeration, or the raw field
    fn tag_value(&self) -> Value {
        match &self.tag_type {
            Some(ty) => {
                let size = ty.size().unwrap_or(4).min(8) as usize;
                Value::from_bytes("Type", ty.clone(), self.tag.to_le_bytes()[..size].to_vec())
            }
            None => self.tag_field.clone().with_name("Type"),
        }
    }

    fn tag_text(&self) -> String {
        self.tag_name.clone().unwrap_or_else(|| self.tag.to_string())
    }

    fn payload_address(&self, cx: &FormatContext<'_>) -> Result<u64> {
        if self.is_shared {
            read_field(cx, &self.data.field(cx.target, "shared")?, "m_Ptr")
        } else {
            self.data.address().ok_or_else(|| {
                FormatterError::TypeMismatch("variant data is not in memory".to_string())
            })
        }
    }

    fn typed_object_type(&self, cx: &FormatContext<'_>) -> Result<TypeHandle> {
        let holder = if self.is_shared { "shared" } else { "inlined" };
        let rtti = self
            .data
            .field(cx.target, holder)?
            .field(cx.target, "m_pType")?;
        let name_view = rtti.field(cx.target, "m_sTypeName")?;
        let name = string_view_text(cx, &name_view)?
            .ok_or_else(|| FormatterError::MissingType("<unnamed>".to_string()))?;
        cx.target
            .find_type(&name)
            .ok_or(FormatterError::MissingType(name))
    }

    fn payload(&self, cx: &FormatContext<'_>) -> Result<Payload> {
        let Some(tag_name) = self.tag_name.as_deref() else {
            return Ok(Payload::Raw(self.data.clone()));
        };

        if let Some(target) = VARIANT_TARGET_TYPES.get(tag_name) {
            let address = self.payload_address(cx)?;
            return Ok(match cx.target.find_type(target) {
                Some(ty) => Payload::Known(Value::at("Value", address, ty)),
                None => {
                    tracing::debug!("Variant payload type {} not found", target);
                    Payload::Raw(self.data.clone())
                }
            });
        }

        match tag_name {
            INVALID_TAG => Ok(Payload::Null),
            TYPED_OBJECT_TAG => {
                let address = self.payload_address(cx)?;
                let ty = self
                    .typed_object_type(cx)
                    .context("resolving typed object")?;
                Ok(Payload::TypedObject(Value::at("Value", address, ty)))
            }
            _ => Ok(Payload::Raw(self.data.clone())),
        }
    }
}

/// Decode the payload of a variant
pub fn variant_payload(cx: &FormatContext<'_>, value: &Value) -> Result<Payload> {
    VariantLayout::read(cx, value)?.payload(cx)
}

/// Children: `Type`, `Value`, `m_bIsShared`
#[derive(Debug, Clone, Default)]
pub struct VariantProvider {
    layout: Option<VariantLayout>,
    payload: Option<Value>,
}

impl VariantProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SyntheticProvider for VariantProvider {
    fn update(&mut self, cx: &FormatContext<'_>, value: &Value) {
        self.layout = logged(VariantLayout::read(cx, value), "VariantProvider::update");
        self.payload = self.layout.as_ref().map(|layout| {
            logged(layout.payload(cx), "variant payload")
                .unwrap_or_else(|| Payload::Raw(layout.data.clone()))
                .into_value()
        });
    }

    fn num_children(&self) -> usize {
        3
    }

    fn child_at_index(&mut self, _cx: &FormatContext<'_>, index: usize) -> Option<Value> {
        let layout = self.layout.as_ref()?;
        match index {
            0 => Some(layout.tag_value()),
            1 => self.payload.clone(),
            2 => layout.shared_field.clone(),
            _ => None,
        }
    }
}

/// `(Tag) payload`, the payload part omitted when it renders empty
pub fn variant_summary(cx: &FormatContext<'_>, value: &Value) -> String {
    summary_or_error(
        VariantLayout::read(cx, value).map(|layout| {
            let tag = format!("({})", layout.tag_text());
            let payload = logged(layout.payload(cx), "variant_summary payload")
                .unwrap_or_else(|| Payload::Raw(layout.data.clone()));
            let rendered = match &payload {
                Payload::Known(v) | Payload::TypedObject(v) | Payload::Raw(v) => {
                    crate::render::display_text(cx, v)
                }
                Payload::Null => String::new(),
            };
            if rendered.is_empty() {
                tag
            } else {
                format!("{} {}", tag, rendered)
            }
        }),
        "variant_summary",
    )
}
