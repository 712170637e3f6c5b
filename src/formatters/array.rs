//! Array family: dynamic, hybrid, small, static arrays and array pointers
//!
//! All variants reduce to the same windowed shape: a few structural fields first,
//! then up to `max_children` elements read from one data source. They differ only
//! in which fields they show and where the elements live.

use super::view::{inline_capacity, uses_inline_storage, ElementWindow};
use super::{index_label, logged, named_fields, read_field, FormatContext, SyntheticProvider};
use crate::backend::TypeHandle;
use crate::error::{FormatterError, Result};
use crate::types::Value;

/// Which array layout a provider decodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayKind {
    /// `nsDynamicArray<T>`: always the heap pointer
    Dynamic,
    /// `nsHybridArray<T, N>`: inline buffer while the capacity fits in it
    Hybrid,
    /// `nsSmallArray<T, N>`: inline buffer while the capacity fits in it
    Small,
    /// `nsStaticArray<T, N>`: always the embedded buffer
    Static,
    /// `nsArrayPtr<T>` and the byte array pointers: a non-owning range
    Pointer,
}

impl ArrayKind {
    /// Structural fields shown before the elements
    pub fn field_names(self) -> &'static [&'static str] {
        match self {
            ArrayKind::Dynamic | ArrayKind::Hybrid => &["m_uiCount", "m_uiCapacity", "m_pAllocator"],
            ArrayKind::Small => &["m_uiCount", "m_uiCapacity", "m_uiUserData"],
            ArrayKind::Static => &["m_uiCount", "m_uiCapacity"],
            ArrayKind::Pointer => &["m_uiCount"],
        }
    }

    fn count_field(self) -> &'static str {
        "m_uiCount"
    }
}

#[derive(Debug, Clone)]
struct ArraySnapshot {
    fields: Vec<Option<Value>>,
    count: usize,
    window: Option<ElementWindow>,
}

/// Synthetic provider for the array family
#[derive(Debug, Clone)]
pub struct ArrayProvider {
    kind: ArrayKind,
    snapshot: Option<ArraySnapshot>,
}

impl ArrayProvider {
    pub fn new(kind: ArrayKind) -> Self {
        Self {
            kind,
            snapshot: None,
        }
    }

    pub fn kind(&self) -> ArrayKind {
        self.kind
    }

    /// The resolved element source, if any (for inspection in tests)
    pub fn element_base(&self) -> Option<u64> {
        self.snapshot
            .as_ref()
            .and_then(|s| s.window.as_ref())
            .map(|w| w.base)
    }

    fn element_type(&self, cx: &FormatContext<'_>, value: &Value, pointer_field: &str) -> Result<TypeHandle> {
        let declared = value.type_handle().and_then(|t| t.underlying().template_argument(0));
        match declared {
            Some(ty) => Ok(ty),
            None => value
                .field(cx.target, pointer_field)?
                .type_handle()
                .and_then(|t| t.pointee())
                .ok_or_else(|| {
                    FormatterError::TypeMismatch(format!(
                        "cannot determine element type of {}",
                        value.type_name()
                    ))
                }),
        }
    }

    fn window(&self, cx: &FormatContext<'_>, value: &Value) -> Result<ElementWindow> {
        match self.kind {
            ArrayKind::Dynamic => {
                let elements = value.field(cx.target, "m_pElements")?;
                let element = elements.type_handle().and_then(|t| t.pointee()).ok_or_else(|| {
                    FormatterError::TypeMismatch("m_pElements is not a pointer".to_string())
                })?;
                ElementWindow::new(elements.as_unsigned(cx.target)?, element)
            }
            ArrayKind::Hybrid | ArrayKind::Small => {
                let element = self.element_type(cx, value, "m_pElements")?;
                let size = super::view::element_size(&element)?;
                let storage = value.field(cx.target, "m_StaticData")?;
                let local = inline_capacity(storage.byte_size().unwrap_or(0), size);
                let capacity = read_field(cx, value, "m_uiCapacity")?;
                if uses_inline_storage(capacity, local) {
                    ElementWindow::new(storage.base_address(cx.target)?, element)
                } else {
                    let heap = value.field(cx.target, "m_pElements")?.as_unsigned(cx.target)?;
                    ElementWindow::new(heap, element)
                }
            }
            ArrayKind::Static => {
                let element = self.element_type(cx, value, "m_pElements")?;
                let data = value.field(cx.target, "m_Data")?;
                ElementWindow::new(data.base_address(cx.target)?, element)
            }
            ArrayKind::Pointer => {
                let element = self.element_type(cx, value, "m_pPtr")?;
                let ptr = value.field(cx.target, "m_pPtr")?.as_unsigned(cx.target)?;
                ElementWindow::new(ptr, element)
            }
        }
    }

    /// Structural fields survive an unreadable count or element source; those
    /// only cost the elements.
    fn snapshot(&self, cx: &FormatContext<'_>, value: &Value) -> ArraySnapshot {
        let fields = named_fields(cx, value, self.kind.field_names());
        let count = logged(read_field(cx, value, self.kind.count_field()), "array count")
            .map(|count| cx.settings.clamp_children(cx.settings.guard_count(count)))
            .unwrap_or(0);
        let window = if count == 0 {
            None
        } else {
            logged(self.window(cx, value), "array element source")
        };
        ArraySnapshot {
            fields,
            count: if window.is_some() { count } else { 0 },
            window,
        }
    }
}

impl SyntheticProvider for ArrayProvider {
    fn update(&mut self, cx: &FormatContext<'_>, value: &Value) {
        self.snapshot = Some(self.snapshot(cx, value));
    }

    fn num_children(&self) -> usize {
        self.snapshot
            .as_ref()
            .map(|s| s.fields.len() + s.count)
            .unwrap_or(0)
    }

    fn child_at_index(&mut self, _cx: &FormatContext<'_>, index: usize) -> Option<Value> {
        let snapshot = self.snapshot.as_ref()?;
        let fields = snapshot.fields.len();
        if index < fields {
            return snapshot.fields[index].clone();
        }
        let element = index - fields;
        if element >= snapshot.count {
            return None;
        }
        let window = snapshot.window.as_ref()?;
        Some(window.element(index_label(element as u64), element as u64))
    }
}
