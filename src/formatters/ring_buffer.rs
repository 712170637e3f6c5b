//! `nsStaticRingBuffer<T, N>` decoder
//!
//! Elements live in a fixed inline buffer of `N` slots. Logical element `i` sits in
//! physical slot `(m_uiFirstElement + i) % N` but is always labelled `[i]`.

use super::view::{element_size, inline_capacity, ring_slot, ElementWindow};
use super::{index_label, logged, named_fields, read_field, FormatContext, SyntheticProvider};
use crate::error::{FormatterError, Result};
use crate::types::Value;

const FIELDS: &[&str] = &["m_uiCount", "m_uiFirstElement"];

#[derive(Debug, Clone)]
struct RingStorage {
    first_element: u64,
    capacity: u64,
    window: ElementWindow,
}

#[derive(Debug, Clone)]
struct RingSnapshot {
    fields: Vec<Option<Value>>,
    count: usize,
    storage: Option<RingStorage>,
}

/// Children: `m_uiCount`, `m_uiFirstElement`, then the elements in logical order
#[derive(Debug, Clone, Default)]
pub struct RingBufferProvider {
    snapshot: Option<RingSnapshot>,
}

impl RingBufferProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Physical slot backing logical element `index`
    pub fn physical_slot(&self, index: usize) -> Option<u64> {
        let storage = self.snapshot.as_ref()?.storage.as_ref()?;
        ring_slot(storage.first_element, index as u64, storage.capacity)
    }

    fn storage(cx: &FormatContext<'_>, value: &Value) -> Result<RingStorage> {
        let element = value
            .type_handle()
            .and_then(|t| t.underlying().template_argument(0))
            .ok_or_else(|| {
                FormatterError::TypeMismatch(format!("{} has no element type", value.type_name()))
            })?;
        let storage = value.field(cx.target, "m_StaticData")?;
        let capacity = inline_capacity(storage.byte_size().unwrap_or(0), element_size(&element)?);
        if capacity == 0 {
            return Err(FormatterError::CorruptLayout(
                "ring buffer has no storage".to_string(),
            ));
        }

        let base = match value.field(cx.target, "m_pElements") {
            Ok(ptr) => ptr.as_unsigned(cx.target)?,
            Err(_) => storage.base_address(cx.target)?,
        };

        Ok(RingStorage {
            first_element: read_field(cx, value, "m_uiFirstElement")?,
            capacity,
            window: ElementWindow::new(base, element)?,
        })
    }

    /// Without usable storage the buffer shows its fields and no elements
    fn snapshot(cx: &FormatContext<'_>, value: &Value) -> RingSnapshot {
        let fields = named_fields(cx, value, FIELDS);
        let storage = logged(Self::storage(cx, value), "ring buffer storage");
        let count = match storage {
            Some(_) => logged(read_field(cx, value, "m_uiCount"), "ring buffer count")
                .map(|count| cx.settings.clamp_children(cx.settings.guard_count(count)))
                .unwrap_or(0),
            None => 0,
        };
        RingSnapshot {
            fields,
            count,
            storage,
        }
    }
}

impl SyntheticProvider for RingBufferProvider {
    fn update(&mut self, cx: &FormatContext<'_>, value: &Value) {
        self.snapshot = Some(Self::snapshot(cx, value));
    }

    fn num_children(&self) -> usize {
        self.snapshot
            .as_ref()
            .map(|s| s.fields.len() + s.count)
            .unwrap_or(0)
    }

    fn child_at_index(&mut self, _cx: &FormatContext<'_>, index: usize) -> Option<Value> {
        let s = self.snapshot.as_ref()?;
        if index < s.fields.len() {
            return s.fields[index].clone();
        }
        let logical = index - s.fields.len();
        if logical >= s.count {
            return None;
        }
        let storage = s.storage.as_ref()?;
        let slot = ring_slot(storage.first_element, logical as u64, storage.capacity)?;
        Some(storage.window.element(index_label(logical as u64), slot))
    }
}
