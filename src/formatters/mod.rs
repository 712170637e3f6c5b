//! Synthetic child providers and summaries for engine types
//!
//! Every decoder follows the same contract. The host constructs a provider for a
//! recognized type, calls [`SyntheticProvider::update`] with the value to show, then
//! asks for [`SyntheticProvider::num_children`] and individual children on demand.
//! Summaries are plain functions producing a one-line description.
//!
//! Providers never let a failure escape. Internally they work with
//! [`Result`](crate::error::Result); at the public boundary a failure becomes an
//! absent child, a zero count, or an `<error>` summary, and the cause is logged at
//! `debug` level.
//!
//! # Modules
//!
//! - [`view`] - Pure index/offset arithmetic shared by the decoders
//! - [`strings`] - Small-buffer strings, string views, hashed strings, iterators
//! - [`array`] - Dynamic, hybrid, small, static arrays and array pointers
//! - [`ring_buffer`] - Fixed-capacity ring buffers
//! - [`hash_table`] - Open-addressed hash tables and sets
//! - [`map`] - Red-black tree maps and sets
//! - [`list`] - Doubly linked lists
//! - [`deque`] - Chunked deques
//! - [`variant`] - The tagged variant
//! - [`enums`] - Wrapped enums and bitflags
//! - [`math`] - Vectors, matrices, colours, angles, UUIDs
//! - [`registry`] - Type name to decoder classification

pub mod array;
pub mod deque;
pub mod enums;
pub mod hash_table;
pub mod list;
pub mod map;
pub mod math;
pub mod registry;
pub mod ring_buffer;
pub mod strings;
pub mod variant;
pub mod view;

pub use registry::ShapeKind;

use crate::backend::Inspector;
use crate::config::FormatterSettings;
use crate::error::Result;
use crate::types::Value;

/// Summary returned when a summary cannot be computed
pub const ERROR_SUMMARY: &str = "<error>";

/// Summary returned for containers with no content
pub const EMPTY_SUMMARY: &str = "<empty>";

/// Everything a decoder may consult: the inspected process and the limits
#[derive(Clone, Copy)]
pub struct FormatContext<'a> {
    pub target: &'a dyn Inspector,
    pub settings: &'a FormatterSettings,
}

impl<'a> FormatContext<'a> {
    pub fn new(target: &'a dyn Inspector, settings: &'a FormatterSettings) -> Self {
        Self { target, settings }
    }
}

impl std::fmt::Debug for FormatContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatContext")
            .field("settings", self.settings)
            .finish_non_exhaustive()
    }
}

/// A synthetic child provider
///
/// A provider may be updated again with a different value of the same type.
/// Every query answers against the most recent update only.
pub trait SyntheticProvider {
    /// Recompute the cached layout snapshot for `value`
    fn update(&mut self, cx: &FormatContext<'_>, value: &Value);

    /// Number of logical children
    fn num_children(&self) -> usize;

    /// The `index`-th logical child, or `None` if there is no such child
    fn child_at_index(&mut self, cx: &FormatContext<'_>, index: usize) -> Option<Value>;
}

/// A one-line summary function
pub type SummaryFn = fn(&FormatContext<'_>, &Value) -> String;

/// Log a failed decode step and turn it into an absent result
pub(crate) fn logged<T>(result: Result<T>, what: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!("{}: {}", what, e);
            None
        }
    }
}

/// Log a failed summary and turn it into `<error>`
pub(crate) fn summary_or_error(result: Result<String>, what: &str) -> String {
    logged(result, what).unwrap_or_else(|| ERROR_SUMMARY.to_string())
}

/// Label for a logical element index
pub(crate) fn index_label(index: u64) -> String {
    format!("[{}]", index)
}

/// Look up structural fields by name. A missing field only hides that child.
pub(crate) fn named_fields(cx: &FormatContext<'_>, value: &Value, names: &[&str]) -> Vec<Option<Value>> {
    names
        .iter()
        .map(|name| logged(value.field(cx.target, name), "structural field"))
        .collect()
}

/// Read an unsigned member of `value`
pub(crate) fn read_field(cx: &FormatContext<'_>, value: &Value, name: &str) -> Result<u64> {
    value.field(cx.target, name)?.as_unsigned(cx.target)
}

/// Run a provider against a value and collect all of its children
pub fn collect_children(
    provider: &mut dyn SyntheticProvider,
    cx: &FormatContext<'_>,
    value: &Value,
) -> Vec<Option<Value>> {
    provider.update(cx, value);
    (0..provider.num_children())
        .map(|i| provider.child_at_index(cx, i))
        .collect()
}
