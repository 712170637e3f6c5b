//! `nsList<T>` decoder
//!
//! Nodes are reached from the `m_First` sentinel through `m_pNext`. The walk is
//! collected on update and bounded by both the element ceiling and the step budget.

use super::{index_label, logged, read_field, FormatContext, SyntheticProvider};
use crate::error::{FormatterError, Result};
use crate::types::Value;

#[derive(Debug, Clone)]
struct ListSnapshot {
    count_field: Option<Value>,
    elements: Vec<Value>,
}

/// Children: `m_uiCount`, then the elements in list order
#[derive(Debug, Clone, Default)]
pub struct ListProvider {
    snapshot: Option<ListSnapshot>,
}

impl ListProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append elements until the count, the end sentinel or the step budget
    fn walk(cx: &FormatContext<'_>, value: &Value, elements: &mut Vec<Value>) -> Result<()> {
        let element = value
            .type_handle()
            .and_then(|t| t.underlying().template_argument(0))
            .ok_or_else(|| {
                FormatterError::TypeMismatch(format!("{} has no element type", value.type_name()))
            })?;
        let count = cx.settings.guard_count(read_field(cx, value, "m_uiCount")?);
        let count = cx.settings.clamp_children(count);

        let end = value.field(cx.target, "m_Last").ok().and_then(|v| v.address());
        let mut node = value.field(cx.target, "m_First")?.field(cx.target, "m_pNext")?;
        let mut steps = cx.settings.max_tree_steps;

        while elements.len() < count {
            let address = node.as_unsigned(cx.target)?;
            if address == 0 || Some(address) == end {
                break;
            }
            if steps == 0 {
                tracing::debug!("List walk stopped after {} steps", cx.settings.max_tree_steps);
                break;
            }
            steps -= 1;

            let data = node.field(cx.target, "m_Data")?;
            let data_address = data.address().ok_or_else(|| {
                FormatterError::TypeMismatch("list node is not in memory".to_string())
            })?;
            elements.push(Value::at(
                index_label(elements.len() as u64),
                data_address,
                element.clone(),
            ));
            node = node.field(cx.target, "m_pNext")?;
        }
        Ok(())
    }

    /// A broken link ends the list; the elements before it are kept
    fn snapshot(cx: &FormatContext<'_>, value: &Value) -> ListSnapshot {
        let mut elements = Vec::new();
        logged(Self::walk(cx, value, &mut elements), "list walk");
        ListSnapshot {
            count_field: logged(value.field(cx.target, "m_uiCount"), "list count"),
            elements,
        }
    }
}

impl SyntheticProvider for ListProvider {
    fn update(&mut self, cx: &FormatContext<'_>, value: &Value) {
        self.snapshot = Some(Self::snapshot(cx, value));
    }

    fn num_children(&self) -> usize {
        self.snapshot
            .as_ref()
            .map(|s| 1 + s.elements.len())
            .unwrap_or(0)
    }

    fn child_at_index(&mut self, _cx: &FormatContext<'_>, index: usize) -> Option<Value> {
        let s = self.snapshot.as_ref()?;
        match index {
            0 => s.count_field.clone(),
            i => s.elements.get(i - 1).cloned(),
        }
    }
}
