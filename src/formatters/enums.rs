//! `nsEnum<T>` and `nsBitflags<T>`
//!
//! Both wrap a raw integer in `m_Value`; the enumerants come from the nested
//! `T::Enum` type, looked up by name.

use super::{read_field, summary_or_error, FormatContext, SyntheticProvider};
use crate::backend::{EnumDef, TypeHandle};
use crate::error::{FormatterError, Result};
use crate::types::Value;

/// Find `T::Enum` for the wrapper's first template argument
fn nested_enum(value: &Value) -> Result<TypeHandle> {
    let wrapper = value
        .type_handle()
        .ok_or_else(|| FormatterError::TypeMismatch(format!("{} has no layout", value.name())))?;
    let struct_type = wrapper.underlying().template_argument(0).ok_or_else(|| {
        FormatterError::TypeMismatch(format!("{} has no template argument", wrapper.type_name()))
    })?;
    let name = format!("{}::Enum", struct_type.type_name());
    wrapper
        .find_type(&name)
        .filter(|t| t.enum_def().is_some())
        .ok_or(FormatterError::MissingType(name))
}

/// `Name (value)` or `? (value)`
pub fn enum_text(def: &EnumDef, value: u64) -> String {
    match def.variants.iter().find(|v| v.value as u64 == value) {
        Some(variant) => format!("{} ({})", variant.name, value),
        None => format!("? ({})", value),
    }
}

/// `A | B (value)` using single-bit enumerants, `None (0)` when no known bit is set
pub fn bitflags_text(def: &EnumDef, value: u64) -> String {
    let names: Vec<&str> = def
        .variants
        .iter()
        .filter(|v| {
            let bit = v.value as u64;
            bit.is_power_of_two() && value & bit != 0
        })
        .map(|v| v.name.as_str())
        .collect();
    if names.is_empty() {
        "None (0)".to_string()
    } else {
        format!("{} ({})", names.join(" | "), value)
    }
}

fn wrapped_enum_text(cx: &FormatContext<'_>, value: &Value) -> Result<String> {
    let raw = read_field(cx, value, "m_Value")?;
    let text = match nested_enum(value) {
        Ok(ty) => match ty.enum_def() {
            Some(def) => enum_text(def, raw),
            None => format!("? ({})", raw),
        },
        Err(e) => {
            tracing::debug!("enum without enumerants: {}", e);
            format!("? ({})", raw)
        }
    };
    Ok(text)
}

/// Single child `Value` holding the enumerant text
#[derive(Debug, Clone, Default)]
pub struct EnumProvider {
    text: Option<String>,
}

impl EnumProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SyntheticProvider for EnumProvider {
    fn update(&mut self, cx: &FormatContext<'_>, value: &Value) {
        self.text = Some(
            super::logged(wrapped_enum_text(cx, value), "EnumProvider::update")
                .unwrap_or_else(|| "?".to_string()),
        );
    }

    fn num_children(&self) -> usize {
        1
    }

    fn child_at_index(&mut self, _cx: &FormatContext<'_>, index: usize) -> Option<Value> {
        match index {
            0 => self.text.as_ref().map(|t| Value::text("Value", t.clone())),
            _ => None,
        }
    }
}

pub fn enum_summary(cx: &FormatContext<'_>, value: &Value) -> String {
    summary_or_error(wrapped_enum_text(cx, value), "enum_summary")
}

pub fn bitflags_summary(cx: &FormatContext<'_>, value: &Value) -> String {
    summary_or_error(
        nested_enum(value).and_then(|ty| {
            let raw = read_field(cx, value, "m_Value")?;
            let def = ty
                .enum_def()
                .ok_or_else(|| FormatterError::MissingType(ty.type_name()))?;
            Ok(bitflags_text(def, raw))
        }),
        "bitflags_summary",
    )
}
