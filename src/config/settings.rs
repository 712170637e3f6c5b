//! Safety ceilings applied by every decoder
//!
//! Counts, capacities and links are read from a stopped process and cannot be
//! trusted. These limits bound what a decoder will display or walk. The defaults
//! are the documented ceilings; a config file can lower or raise them.

use serde::{Deserialize, Serialize};

/// Maximum number of elements shown for flat containers
pub const DEFAULT_MAX_CHILDREN: usize = 256;

/// Maximum number of link steps in a single tree or list walk
pub const DEFAULT_MAX_TREE_STEPS: usize = 1000;

/// Maximum number of compacted hash table entries
pub const DEFAULT_MAX_HASH_ENTRIES: usize = 255;

/// Maximum number of characters shown in a string summary (display only)
pub const DEFAULT_MAX_STRING_LENGTH: usize = 1024;

/// Element counts above this are treated as garbage and shown as zero
pub const DEFAULT_CORRUPT_COUNT_THRESHOLD: u64 = 0x1000_0000;

/// Map counts above this are treated as garbage
pub const DEFAULT_CORRUPT_MAP_COUNT_THRESHOLD: u64 = 0xff00_0000;

/// Byte size a deque chunk is sized for
pub const DEFAULT_DEQUE_PAGE_SIZE: u64 = 4096;

/// Smallest number of elements in a deque chunk
pub const DEFAULT_DEQUE_MIN_CHUNK_ELEMENTS: u64 = 32;

/// Limits used by the synthetic providers and summaries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatterSettings {
    /// Displayed element ceiling for arrays, tables, lists and maps
    pub max_children: usize,

    /// Step budget for tree successor searches and list walks
    pub max_tree_steps: usize,

    /// Compacted entry ceiling for hash tables
    pub max_hash_entries: usize,

    /// Character ceiling for string summaries
    pub max_string_length: usize,

    /// Counts (and hash table capacities) above this show as empty
    pub corrupt_count_threshold: u64,

    /// Map counts above this collapse the map to its count field
    pub corrupt_map_count_threshold: u64,

    /// Deque chunk sizing: `max(min_chunk_elements, page_size / element_size)`
    pub deque_page_size: u64,
    pub deque_min_chunk_elements: u64,
}

impl Default for FormatterSettings {
    fn default() -> Self {
        Self {
            max_children: DEFAULT_MAX_CHILDREN,
            max_tree_steps: DEFAULT_MAX_TREE_STEPS,
            max_hash_entries: DEFAULT_MAX_HASH_ENTRIES,
            max_string_length: DEFAULT_MAX_STRING_LENGTH,
            corrupt_count_threshold: DEFAULT_CORRUPT_COUNT_THRESHOLD,
            corrupt_map_count_threshold: DEFAULT_CORRUPT_MAP_COUNT_THRESHOLD,
            deque_page_size: DEFAULT_DEQUE_PAGE_SIZE,
            deque_min_chunk_elements: DEFAULT_DEQUE_MIN_CHUNK_ELEMENTS,
        }
    }
}

impl FormatterSettings {
    /// Create settings with the documented defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero out a count that is past the corruption threshold
    pub fn guard_count(&self, count: u64) -> u64 {
        if count > self.corrupt_count_threshold {
            tracing::debug!("Ignoring implausible count 0x{:X}", count);
            0
        } else {
            count
        }
    }

    /// Clamp a count to the displayed element ceiling
    pub fn clamp_children(&self, count: u64) -> usize {
        count.min(self.max_children as u64) as usize
    }

    /// Number of elements per deque chunk for the given element size
    pub fn deque_chunk_capacity(&self, element_size: u64) -> u64 {
        crate::formatters::view::chunk_capacity(
            element_size,
            self.deque_page_size,
            self.deque_min_chunk_elements,
        )
    }

    /// Bring out-of-range values back to something usable
    pub fn sanitized(mut self) -> Self {
        if self.deque_min_chunk_elements == 0 {
            tracing::warn!("deque_min_chunk_elements must be positive, using default");
            self.deque_min_chunk_elements = DEFAULT_DEQUE_MIN_CHUNK_ELEMENTS;
        }
        if self.max_tree_steps == 0 {
            tracing::warn!("max_tree_steps must be positive, using default");
            self.max_tree_steps = DEFAULT_MAX_TREE_STEPS;
        }
        self
    }
}
