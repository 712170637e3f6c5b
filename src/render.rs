//! Value-to-text rendering
//!
//! [`display_text`] produces the one-line text a debugger would show next to a
//! value: the registered summary when the type has one, otherwise the primitive
//! value. [`ValueRenderer`] expands values into an indented tree using the
//! registered synthetic providers, falling back to declared members.

use std::fmt::Write as _;

use crate::backend::{Inspector, TypeDef, TypeHandle};
use crate::config::FormatterSettings;
use crate::error::{FormatterError, Result};
use crate::formatters::{
    collect_children, logged, FormatContext, ShapeKind, ERROR_SUMMARY,
};
use crate::types::{ScalarValue, Value, ValueData, ValueType};

/// Summary if registered, else the primitive value, else an empty string
pub fn display_text(cx: &FormatContext<'_>, value: &Value) -> String {
    if let Some(summary) = ShapeKind::of_value(value).and_then(ShapeKind::summary) {
        return summary(cx, value);
    }
    match value_text(cx, value) {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!("cannot display '{}': {}", value.name(), e);
            ERROR_SUMMARY.to_string()
        }
    }
}

fn value_text(cx: &FormatContext<'_>, value: &Value) -> Result<String> {
    match value.data() {
        ValueData::Text(text) => return Ok(format!("\"{}\"", text)),
        ValueData::Null => return Ok("nullptr".to_string()),
        _ => {}
    }
    let handle = match value.ty() {
        ValueType::Type(handle) => handle.underlying(),
        _ => return Ok(String::new()),
    };

    if handle.is_pointer_or_reference() {
        return Ok(format!("0x{:x}", value.as_unsigned(cx.target)?));
    }
    if let Some(def) = handle.enum_def() {
        let raw = value.as_signed(cx.target)?;
        return Ok(match def.find_variant(raw) {
            Some(variant) => variant.name.clone(),
            None => raw.to_string(),
        });
    }
    if handle.is_primitive() {
        return Ok(match value.scalar(cx.target)? {
            ScalarValue::Float(v) => float_text(v),
            other => other.to_string(),
        });
    }
    Ok(String::new())
}

/// Floats always carry a decimal point so they read as floats
fn float_text(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

/// Renders values as an indented tree
pub struct ValueRenderer<'a> {
    cx: FormatContext<'a>,
    max_depth: usize,
}

impl<'a> ValueRenderer<'a> {
    pub fn new(target: &'a dyn Inspector, settings: &'a FormatterSettings, max_depth: usize) -> Self {
        Self {
            cx: FormatContext::new(target, settings),
            max_depth,
        }
    }

    pub fn context(&self) -> &FormatContext<'a> {
        &self.cx
    }

    /// Render `value` and its children, one line per value
    pub fn render(&self, value: &Value) -> String {
        let mut out = String::new();
        self.render_into(&mut out, value, 0);
        out
    }

    fn render_into(&self, out: &mut String, value: &Value, depth: usize) {
        let indent = "  ".repeat(depth);
        let text = display_text(&self.cx, value);
        if text.is_empty() {
            let _ = writeln!(out, "{}{} ({})", indent, value.name(), value.type_name());
        } else {
            let _ = writeln!(
                out,
                "{}{} ({}) = {}",
                indent,
                value.name(),
                value.type_name(),
                text
            );
        }

        if depth >= self.max_depth {
            return;
        }
        for child in self.children(value) {
            self.render_into(out, &child, depth + 1);
        }
    }

    /// Children of a value: synthetic children for registered shapes, elements
    /// for array views, declared members for other records. Pointers are leaves.
    pub fn children(&self, value: &Value) -> Vec<Value> {
        if let Some(mut provider) = ShapeKind::of_value(value).and_then(ShapeKind::provider) {
            return collect_children(provider.as_mut(), &self.cx, value)
                .into_iter()
                .flatten()
                .collect();
        }
        match value.ty() {
            ValueType::Array { element, count } => {
                logged(self.array_elements(value, element, *count), "array view").unwrap_or_default()
            }
            ValueType::Type(handle) => {
                logged(self.members(value, handle), "record members").unwrap_or_default()
            }
            ValueType::Opaque(_) => Vec::new(),
        }
    }

    fn array_elements(&self, value: &Value, element: &TypeHandle, count: u64) -> Result<Vec<Value>> {
        let Some(base) = value.address() else {
            return Ok(Vec::new());
        };
        let window = crate::formatters::view::ElementWindow::new(base, element.clone())?;
        let shown = self.cx.settings.clamp_children(count) as u64;
        Ok((0..shown)
            .map(|i| window.element(format!("[{}]", i), i))
            .collect())
    }

    fn members(&self, value: &Value, handle: &TypeHandle) -> Result<Vec<Value>> {
        let record = handle.underlying();
        if let Some(count) = record.array_count() {
            let element = record.element_type().ok_or_else(|| {
                FormatterError::TypeMismatch(format!("{} has no element type", record.type_name()))
            })?;
            return self.array_elements(value, &element, count);
        }
        if !matches!(record.def(), Some(TypeDef::Struct(_) | TypeDef::Union(_))) {
            return Ok(Vec::new());
        }
        let Some(address) = value.address() else {
            return Ok(Vec::new());
        };
        Ok(record
            .members()
            .unwrap_or_default()
            .iter()
            .map(|member| {
                Value::at(
                    member.name.clone(),
                    address + member.offset,
                    record.member_type(member),
                )
            })
            .collect())
    }
}
