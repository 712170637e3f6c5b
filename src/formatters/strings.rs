//! String decoders
//!
//! - `nsHybridString<N>` / `nsStringBuilder`: small-buffer strings. The content is
//!   inline while the element count fits in the local buffer and on the heap
//!   otherwise.
//! - `nsStringView`: a start pointer and an element count.
//! - `nsHashedString`: a pointer into the global string table.
//! - `nsStringIterator` / `nsStringReverseIterator`: a cursor into UTF-8 text.

use super::view::{element_size, inline_capacity, uses_inline_storage};
use super::{
    logged, read_field, summary_or_error, FormatContext, SyntheticProvider, EMPTY_SUMMARY,
};
use crate::backend::TypeHandle;
use crate::error::{FormatterError, Result};
use crate::types::Value;

/// Decode captured string bytes, dropping a single trailing terminator
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = match bytes.split_last() {
        Some((0, rest)) => rest,
        _ => bytes,
    };
    String::from_utf8_lossy(bytes).into_owned()
}

fn quoted(text: &str) -> String {
    format!("\"{}\"", text)
}

fn pointee_of(value: &Value) -> Result<TypeHandle> {
    value
        .type_handle()
        .and_then(|t| t.pointee())
        .ok_or_else(|| FormatterError::TypeMismatch(format!("{} is not a pointer", value.name())))
}

// ==================== Hybrid String ====================

/// Resolved storage of a small-buffer string
#[derive(Debug, Clone)]
struct HybridStringLayout {
    /// Address of the first character, inline or heap
    source: u64,
    /// Element count after the corruption guard
    count: u64,
    element: TypeHandle,
    count_field: Value,
    allocator: Option<Value>,
}

impl HybridStringLayout {
    fn read(cx: &FormatContext<'_>, value: &Value) -> Result<Self> {
        let data = value.field(cx.target, "m_Data")?;
        let elements = data.field(cx.target, "m_pElements")?;
        let element = pointee_of(&elements)?;
        let count_field = data.field(cx.target, "m_uiCount")?;
        let count = cx.settings.guard_count(count_field.as_unsigned(cx.target)?);

        let storage = data.field(cx.target, "m_StaticData")?;
        let local = inline_capacity(storage.byte_size().unwrap_or(0), element_size(&element)?);
        let source = if uses_inline_storage(count, local) {
            storage.base_address(cx.target)?
        } else {
            elements.as_unsigned(cx.target)?
        };

        Ok(Self {
            source,
            count,
            element,
            count_field,
            allocator: logged(data.field(cx.target, "m_pAllocator"), "string allocator"),
        })
    }

    fn contents(&self) -> Value {
        Value::array_at("contents", self.source, self.element.clone(), self.count)
    }

    fn text(&self, cx: &FormatContext<'_>) -> Result<Option<String>> {
        if self.count == 0 {
            return Ok(None);
        }
        let shown = self.count.min(cx.settings.max_string_length as u64);
        let size = shown * element_size(&self.element)?;
        let bytes = cx.target.read_memory(self.source, size as usize)?;
        Ok(Some(decode_text(&bytes)))
    }
}

/// Children: `contents`, `m_uiCount`, `m_pAllocator`
#[derive(Debug, Clone, Default)]
pub struct HybridStringProvider {
    layout: Option<HybridStringLayout>,
}

impl HybridStringProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Address the content is read from after the last update
    pub fn content_address(&self) -> Option<u64> {
        self.layout.as_ref().map(|l| l.source)
    }
}

impl SyntheticProvider for HybridStringProvider {
    fn update(&mut self, cx: &FormatContext<'_>, value: &Value) {
        self.layout = logged(HybridStringLayout::read(cx, value), "HybridStringProvider::update");
    }

    fn num_children(&self) -> usize {
        3
    }

    fn child_at_index(&mut self, _cx: &FormatContext<'_>, index: usize) -> Option<Value> {
        let layout = self.layout.as_ref()?;
        match index {
            0 => Some(layout.contents()),
            1 => Some(layout.count_field.clone()),
            2 => layout.allocator.clone(),
            _ => None,
        }
    }
}

/// `"<empty>"` or the quoted text
pub fn hybrid_string_summary(cx: &FormatContext<'_>, value: &Value) -> String {
    summary_or_error(
        HybridStringLayout::read(cx, value)
            .and_then(|layout| layout.text(cx))
            .map(|text| text.map(|t| quoted(&t)).unwrap_or_else(|| EMPTY_SUMMARY.to_string())),
        "hybrid_string_summary",
    )
}

// ==================== String View ====================

#[derive(Debug, Clone)]
struct StringViewLayout {
    start: u64,
    count: u64,
    element: TypeHandle,
}

impl StringViewLayout {
    /// `None` for a null or empty view
    fn read(cx: &FormatContext<'_>, value: &Value) -> Result<Option<Self>> {
        let start_field = value.field(cx.target, "m_pStart")?;
        let start = start_field.as_unsigned(cx.target)?;
        let count = read_field(cx, value, "m_uiElementCount")?;
        if start == 0 || count == 0 {
            return Ok(None);
        }
        Ok(Some(Self {
            start,
            count,
            element: pointee_of(&start_field)?,
        }))
    }

    fn text(&self, cx: &FormatContext<'_>, limit: u64) -> Result<String> {
        let shown = self.count.min(limit);
        let size = shown * element_size(&self.element)?;
        let bytes = cx.target.read_memory(self.start, size as usize)?;
        Ok(decode_text(&bytes))
    }
}

/// Read the text of a string view, `None` when it is empty
pub fn string_view_text(cx: &FormatContext<'_>, value: &Value) -> Result<Option<String>> {
    match StringViewLayout::read(cx, value)? {
        Some(layout) => layout.text(cx, cx.settings.max_string_length as u64).map(Some),
        None => Ok(None),
    }
}

/// Single child: `contents`, clamped to the element ceiling
#[derive(Debug, Clone, Default)]
pub struct StringViewProvider {
    layout: Option<StringViewLayout>,
}

impl StringViewProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SyntheticProvider for StringViewProvider {
    fn update(&mut self, cx: &FormatContext<'_>, value: &Value) {
        self.layout = logged(StringViewLayout::read(cx, value), "StringViewProvider::update").flatten();
    }

    fn num_children(&self) -> usize {
        1
    }

    fn child_at_index(&mut self, cx: &FormatContext<'_>, index: usize) -> Option<Value> {
        let layout = self.layout.as_ref().filter(|_| index == 0)?;
        let count = cx.settings.clamp_children(layout.count) as u64;
        Some(Value::array_at("contents", layout.start, layout.element.clone(), count))
    }
}

/// `"<empty>"` or the quoted text
pub fn string_view_summary(cx: &FormatContext<'_>, value: &Value) -> String {
    summary_or_error(
        string_view_text(cx, value)
            .map(|text| text.map(|t| quoted(&t)).unwrap_or_else(|| EMPTY_SUMMARY.to_string())),
        "string_view_summary",
    )
}

// ==================== Hashed String ====================

fn hashed_string_parts(cx: &FormatContext<'_>, value: &Value) -> Result<(Value, Value)> {
    let element = value.field(cx.target, "m_Data")?.field(cx.target, "m_pElement")?;
    let key = element.field(cx.target, "m_Key")?;
    let string = element
        .field(cx.target, "m_Value")?
        .field(cx.target, "m_sString")?;
    Ok((string, key))
}

/// Children: `m_sString`, `m_Key`
#[derive(Debug, Clone, Default)]
pub struct HashedStringProvider {
    parts: Option<(Value, Value)>,
}

impl HashedStringProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SyntheticProvider for HashedStringProvider {
    fn update(&mut self, cx: &FormatContext<'_>, value: &Value) {
        self.parts = logged(hashed_string_parts(cx, value), "HashedStringProvider::update");
    }

    fn num_children(&self) -> usize {
        2
    }

    fn child_at_index(&mut self, _cx: &FormatContext<'_>, index: usize) -> Option<Value> {
        let (string, key) = self.parts.as_ref()?;
        match index {
            0 => Some(string.clone()),
            1 => Some(key.clone()),
            _ => None,
        }
    }
}

/// Summary of the referenced string
pub fn hashed_string_summary(cx: &FormatContext<'_>, value: &Value) -> String {
    match logged(hashed_string_parts(cx, value), "hashed_string_summary") {
        Some((string, _)) => hybrid_string_summary(cx, &string),
        None => super::ERROR_SUMMARY.to_string(),
    }
}

// ==================== String Iterator ====================

/// Longest UTF-8 sequence
const MAX_UTF8_LEN: u64 = 4;

/// Length of the first UTF-8 character in `bytes`: stops at the next lead byte
fn first_char_len(bytes: &[u8]) -> usize {
    bytes
        .iter()
        .skip(1)
        .position(|b| b & 0xC0 != 0x80)
        .map(|p| p + 1)
        .unwrap_or(bytes.len())
}

fn iterator_char(cx: &FormatContext<'_>, value: &Value) -> Result<Option<char>> {
    let current = read_field(cx, value, "m_pCurPtr")?;
    let end = read_field(cx, value, "m_pEndPtr")?;
    let size = end.saturating_sub(current).min(MAX_UTF8_LEN);
    if size == 0 {
        return Ok(None);
    }
    let bytes = cx.target.read_memory(current, size as usize)?;
    let len = first_char_len(&bytes);
    let text = std::str::from_utf8(&bytes[..len]).map_err(|e| {
        FormatterError::CorruptLayout(format!("invalid UTF-8 at 0x{:X}: {}", current, e))
    })?;
    Ok(text.chars().next())
}

/// The character under the cursor in single quotes, `"<empty>"` at the end
pub fn string_iterator_summary(cx: &FormatContext<'_>, value: &Value) -> String {
    summary_or_error(
        iterator_char(cx, value).map(|c| match c {
            Some(c) => format!("'{}'", c),
            None => EMPTY_SUMMARY.to_string(),
        }),
        "string_iterator_summary",
    )
}
