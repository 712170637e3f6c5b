//! `nsDeque<T>` decoder
//!
//! Elements live in fixed-size chunks reached through an array of chunk pointers.
//! The chunk size is recomputed from the element size instead of trusting the
//! stored field.

use super::view::{deque_location, element_size, ElementWindow};
use super::{index_label, logged, named_fields, read_field, FormatContext, SyntheticProvider};
use crate::backend::TypeHandle;
use crate::error::{FormatterError, Result};
use crate::types::Value;

const FIELDS: &[&str] = &["m_uiCount", "m_pAllocator"];

#[derive(Debug, Clone)]
struct DequeStorage {
    first_element: u64,
    chunk_capacity: u64,
    /// Array of chunk pointers
    chunks: ElementWindow,
    element: TypeHandle,
}

#[derive(Debug, Clone)]
struct DequeSnapshot {
    fields: Vec<Option<Value>>,
    count: usize,
    storage: Option<DequeStorage>,
}

/// Children: `m_uiCount`, `m_pAllocator`, then the elements in logical order
#[derive(Debug, Clone, Default)]
pub struct DequeProvider {
    snapshot: Option<DequeSnapshot>,
}

impl DequeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Elements per chunk after the last update
    pub fn chunk_capacity(&self) -> Option<u64> {
        let storage = self.snapshot.as_ref()?.storage.as_ref()?;
        Some(storage.chunk_capacity)
    }

    fn storage(cx: &FormatContext<'_>, value: &Value) -> Result<DequeStorage> {
        let chunks_ptr = value.field(cx.target, "m_pChunks")?;
        let chunk_type = chunks_ptr.type_handle().and_then(|t| t.pointee()).ok_or_else(|| {
            FormatterError::TypeMismatch("m_pChunks is not a pointer".to_string())
        })?;
        let element = value
            .type_handle()
            .and_then(|t| t.underlying().template_argument(0))
            .or_else(|| chunk_type.pointee())
            .ok_or_else(|| {
                FormatterError::TypeMismatch(format!("{} has no element type", value.type_name()))
            })?;

        Ok(DequeStorage {
            first_element: read_field(cx, value, "m_uiFirstElement")?,
            chunk_capacity: cx.settings.deque_chunk_capacity(element_size(&element)?),
            chunks: ElementWindow::new(chunks_ptr.as_unsigned(cx.target)?, chunk_type)?,
            element,
        })
    }

    /// Without readable chunk bookkeeping the deque shows its fields and no elements
    fn snapshot(cx: &FormatContext<'_>, value: &Value) -> DequeSnapshot {
        let fields = named_fields(cx, value, FIELDS);
        let storage = logged(Self::storage(cx, value), "deque storage");
        let count = match storage {
            Some(_) => logged(read_field(cx, value, "m_uiCount"), "deque count")
                .map(|count| cx.settings.clamp_children(cx.settings.guard_count(count)))
                .unwrap_or(0),
            None => 0,
        };
        DequeSnapshot {
            fields,
            count,
            storage,
        }
    }

    fn element(s: &DequeStorage, cx: &FormatContext<'_>, logical: u64) -> Result<Value> {
        let location = deque_location(s.first_element, logical, s.chunk_capacity);
        let chunk = cx.target.read_pointer(s.chunks.address_of(location.chunk))?;
        if chunk == 0 {
            return Err(FormatterError::MemoryAccess {
                address: s.chunks.address_of(location.chunk),
                message: format!("chunk {} is not allocated", location.chunk),
            });
        }
        let window = ElementWindow::new(chunk, s.element.clone())?;
        Ok(window.element(index_label(logical), location.offset))
    }
}

impl SyntheticProvider for DequeProvider {
    fn update(&mut self, cx: &FormatContext<'_>, value: &Value) {
        self.snapshot = Some(Self::snapshot(cx, value));
    }

    fn num_children(&self) -> usize {
        self.snapshot
            .as_ref()
            .map(|s| s.fields.len() + s.count)
            .unwrap_or(0)
    }

    fn child_at_index(&mut self, cx: &FormatContext<'_>, index: usize) -> Option<Value> {
        let s = self.snapshot.as_ref()?;
        if index < s.fields.len() {
            return s.fields[index].clone();
        }
        let logical = index - s.fields.len();
        if logical >= s.count {
            return None;
        }
        let storage = s.storage.as_ref()?;
        logged(Self::element(storage, cx, logical as u64), "DequeProvider::child_at_index")
    }
}
