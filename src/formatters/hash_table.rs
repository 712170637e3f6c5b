//! `nsHashTable<K, V>` / `nsHashSet<K>` decoder
//!
//! Entries live in a flat slot array. A side array of 32-bit words holds 2 flag
//! bits per slot; bit 0 marks an occupied slot. On update every physical slot is
//! visited and occupied ones are compacted into a list, in ascending slot order,
//! up to `max_hash_entries`.

use super::view::{compact_valid_slots, ElementWindow};
use super::{
    index_label, logged, named_fields, read_field, summary_or_error, FormatContext,
    SyntheticProvider,
};
use crate::error::{FormatterError, Result};
use crate::types::Value;

const FIELDS: &[&str] = &["m_uiCount", "m_uiCapacity", "m_pAllocator"];

#[derive(Debug, Clone)]
struct TableSnapshot {
    fields: Vec<Option<Value>>,
    count: usize,
    /// Occupied physical slots, in the order they are shown
    slots: Vec<u64>,
    entries: Option<ElementWindow>,
}

/// Children: `m_uiCount`, `m_uiCapacity`, `m_pAllocator`, then occupied entries
#[derive(Debug, Clone, Default)]
pub struct HashTableProvider {
    snapshot: Option<TableSnapshot>,
}

impl HashTableProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Physical slots of the compacted entries
    pub fn occupied_slots(&self) -> &[u64] {
        self.snapshot.as_ref().map(|s| s.slots.as_slice()).unwrap_or(&[])
    }

    fn pointer_window(cx: &FormatContext<'_>, value: &Value, name: &str) -> Result<ElementWindow> {
        let ptr = value.field(cx.target, name)?;
        let pointee = ptr.type_handle().and_then(|t| t.pointee()).ok_or_else(|| {
            FormatterError::TypeMismatch(format!("{} is not a pointer", name))
        })?;
        ElementWindow::new(ptr.as_unsigned(cx.target)?, pointee)
    }

    /// Occupied slots found before the scan ran out of capacity, budget or
    /// readable flag words
    fn scan(cx: &FormatContext<'_>, value: &Value) -> Result<Vec<u64>> {
        let flags = Self::pointer_window(cx, value, "m_pEntryFlags")?;
        let capacity = cx.settings.guard_count(read_field(cx, value, "m_uiCapacity")?);
        let slots = compact_valid_slots(capacity, cx.settings.max_hash_entries, |word| {
            cx.target
                .read_unsigned(flags.address_of(word), flags.element_size as usize)
        });
        tracing::trace!(
            "Hash table at {:?}: {} of {} slots occupied",
            value.address(),
            slots.len(),
            capacity
        );
        Ok(slots)
    }

    fn snapshot(cx: &FormatContext<'_>, value: &Value) -> TableSnapshot {
        let fields = named_fields(cx, value, FIELDS);
        let entries = logged(Self::pointer_window(cx, value, "m_pEntries"), "hash table entries");
        let slots = match entries {
            Some(_) => logged(Self::scan(cx, value), "hash table flags").unwrap_or_default(),
            None => Vec::new(),
        };
        let count = logged(read_field(cx, value, "m_uiCount"), "hash table count")
            .map(|count| cx.settings.clamp_children(cx.settings.guard_count(count)))
            .unwrap_or(0);
        TableSnapshot {
            fields,
            count,
            slots,
            entries,
        }
    }
}

impl SyntheticProvider for HashTableProvider {
    fn update(&mut self, cx: &FormatContext<'_>, value: &Value) {
        self.snapshot = Some(Self::snapshot(cx, value));
    }

    /// May exceed the compacted list on a corrupt table; those children are absent
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
        let slot = *s.slots.get(logical)?;
        let entries = s.entries.as_ref()?;
        Some(entries.element(index_label(logical as u64), slot))
    }
}

fn entry_text(cx: &FormatContext<'_>, value: &Value, name: &str) -> Result<String> {
    let member = value.field(cx.target, name)?;
    Ok(crate::render::display_text(cx, &member))
}

/// `key = K, value = V` for a table entry
pub fn entry_summary(cx: &FormatContext<'_>, value: &Value) -> String {
    summary_or_error(
        entry_text(cx, value, "key").and_then(|key| {
            let val = entry_text(cx, value, "value")?;
            Ok(format!("key = {}, value = {}", key, val))
        }),
        "hash_table::entry_summary",
    )
}
