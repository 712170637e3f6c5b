//! Index and offset arithmetic for the container decoders
//!
//! Everything here is a pure function of layout parameters, so it can be exercised
//! without an inspected process.

use crate::backend::TypeHandle;
use crate::error::{FormatterError, Result};
use crate::types::Value;

/// A run of same-typed elements starting at `base`
#[derive(Debug, Clone, PartialEq)]
pub struct ElementWindow {
    pub base: u64,
    pub element: TypeHandle,
    pub element_size: u64,
}

impl ElementWindow {
    pub fn new(base: u64, element: TypeHandle) -> Result<Self> {
        let element_size = element_size(&element)?;
        Ok(Self {
            base,
            element,
            element_size,
        })
    }

    /// Byte offset of physical slot `slot`
    pub fn offset_for(&self, slot: u64) -> u64 {
        slot.wrapping_mul(self.element_size)
    }

    /// Address of physical slot `slot`
    pub fn address_of(&self, slot: u64) -> u64 {
        self.base.wrapping_add(self.offset_for(slot))
    }

    /// The element at physical slot `slot`, labelled `label`
    pub fn element(&self, label: impl Into<String>, slot: u64) -> Value {
        Value::at(label, self.address_of(slot), self.element.clone())
    }
}

/// Size of an element type; zero-sized or unsized types cannot be indexed
pub fn element_size(element: &TypeHandle) -> Result<u64> {
    match element.size() {
        Some(size) if size > 0 => Ok(size),
        _ => Err(FormatterError::TypeMismatch(format!(
            "element type {} has no size",
            element.type_name()
        ))),
    }
}

/// Number of whole elements that fit in an inline buffer
pub fn inline_capacity(storage_bytes: u64, element_size: u64) -> u64 {
    storage_bytes.checked_div(element_size).unwrap_or(0)
}

/// Small-buffer discriminant: data is inline iff the discriminating value (count for
/// strings, capacity for arrays) fits in the inline buffer
pub fn uses_inline_storage(discriminant: u64, inline_capacity: u64) -> bool {
    discriminant <= inline_capacity
}

/// Physical slot of logical element `index` in a ring buffer
pub fn ring_slot(first_element: u64, index: u64, capacity: u64) -> Option<u64> {
    if capacity == 0 {
        return None;
    }
    Some(((first_element % capacity) + (index % capacity)) % capacity)
}

/// Number of elements per deque chunk
pub fn chunk_capacity(element_size: u64, page_size: u64, min_elements: u64) -> u64 {
    match page_size.checked_div(element_size) {
        Some(per_page) => per_page.max(min_elements),
        None => min_elements,
    }
    .max(1)
}

/// Where a deque element lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DequeLocation {
    pub chunk: u64,
    pub offset: u64,
}

/// Location of logical element `index` of a deque
pub fn deque_location(first_element: u64, index: u64, chunk_capacity: u64) -> DequeLocation {
    let chunk_capacity = chunk_capacity.max(1);
    let real = first_element.wrapping_add(index);
    DequeLocation {
        chunk: real / chunk_capacity,
        offset: real % chunk_capacity,
    }
}

/// Hash table flags: 2 bits per slot, 16 slots per 32-bit word
pub const SLOTS_PER_FLAG_WORD: u64 = 16;

/// Index of the flag word holding `slot`
pub fn flag_word_index(slot: u64) -> u64 {
    slot / SLOTS_PER_FLAG_WORD
}

/// The 2-bit flag of `slot` extracted from its word
pub fn slot_flags(word: u64, slot: u64) -> u8 {
    ((word >> ((slot % SLOTS_PER_FLAG_WORD) * 2)) & 3) as u8
}

/// Bit 0 marks an occupied slot
pub fn flag_is_valid(flags: u8) -> bool {
    flags & 1 == 1
}

/// Collect occupied slot indices in ascending physical order, stopping after
/// `limit` entries. `read_word` is asked for flag words by index and is called
/// once per word. A failed word read ends the scan; the slots found before it
/// are kept.
pub fn compact_valid_slots<F>(capacity: u64, limit: usize, mut read_word: F) -> Vec<u64>
where
    F: FnMut(u64) -> Result<u64>,
{
    let mut slots = Vec::new();
    let mut cached: Option<(u64, u64)> = None;
    for slot in 0..capacity {
        if slots.len() >= limit {
            break;
        }
        let word_index = flag_word_index(slot);
        let word = match cached {
            Some((index, word)) if index == word_index => word,
            _ => match read_word(word_index) {
                Ok(word) => {
                    cached = Some((word_index, word));
                    word
                }
                Err(e) => {
                    tracing::debug!("Flag word {} unreadable, stopping scan: {}", word_index, e);
                    break;
                }
            },
        };
        if flag_is_valid(slot_flags(word, slot)) {
            slots.push(slot);
        }
    }
    slots
}
