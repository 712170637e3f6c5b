//! `nsMap<K, V>` / `nsSet<K>` decoder
//!
//! The maps are red-black trees with intrusive links. Every absent child edge
//! points at a dedicated nil node embedded in the container, recognised only by
//! its address. The in-order sequence is produced with an iterative successor
//! search, no recursion and no extra memory, and every walk is capped by the step
//! budget so a corrupt or cyclic tree still terminates.
//!
//! The provider remembers the last node it returned. Asking for index `i + 1`
//! right after index `i` costs a single successor step; any other access pattern
//! walks again from the leftmost node.

use super::{logged, read_field, summary_or_error, FormatContext, SyntheticProvider};
use crate::backend::{Inspector, TypeHandle};
use crate::error::{FormatterError, Result};
use crate::types::Value;

/// Which child link to follow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left = 0,
    Right = 1,
}

/// Link access for an intrusive binary tree, with nodes named by address
pub trait TreeLinks {
    fn child(&self, node: u64, side: Side) -> Result<u64>;
    fn parent(&self, node: u64) -> Result<u64>;
}

/// Bounded in-order navigation over [`TreeLinks`]
#[derive(Debug)]
pub struct TreeWalker<'a, L: TreeLinks + ?Sized> {
    links: &'a L,
    nil: u64,
    max_steps: usize,
}

impl<'a, L: TreeLinks + ?Sized> TreeWalker<'a, L> {
    pub fn new(links: &'a L, nil: u64, max_steps: usize) -> Self {
        Self {
            links,
            nil,
            max_steps,
        }
    }

    fn is_end(&self, node: u64) -> bool {
        node == self.nil || node == 0
    }

    fn descend_left(&self, mut node: u64) -> Result<u64> {
        let mut steps = self.max_steps;
        loop {
            let left = self.links.child(node, Side::Left)?;
            if self.is_end(left) {
                return Ok(node);
            }
            if steps == 0 {
                return Err(FormatterError::StepBudgetExceeded(self.max_steps));
            }
            steps -= 1;
            node = left;
        }
    }

    /// First node in order, `None` for an empty tree
    pub fn leftmost(&self, root: u64) -> Result<Option<u64>> {
        if self.is_end(root) {
            return Ok(None);
        }
        self.descend_left(root).map(Some)
    }

    /// Next node in order, `None` after the last one
    pub fn successor(&self, node: u64) -> Result<Option<u64>> {
        let right = self.links.child(node, Side::Right)?;
        if !self.is_end(right) {
            return self.descend_left(right).map(Some);
        }

        // Climb while we are a right child; the first ancestor reached from its
        // left side is next.
        let mut current = node;
        let mut steps = self.max_steps;
        loop {
            let parent = self.links.parent(current)?;
            if self.is_end(parent) || parent == current {
                return Ok(None);
            }
            if self.links.child(parent, Side::Left)? == current {
                return Ok(Some(parent));
            }
            if self.links.child(parent, Side::Right)? != current {
                return Err(FormatterError::CorruptLayout(format!(
                    "node 0x{:X} is not a child of its parent 0x{:X}",
                    current, parent
                )));
            }
            if self.links.parent(parent)? == parent {
                return Ok(None);
            }
            if steps == 0 {
                return Err(FormatterError::StepBudgetExceeded(self.max_steps));
            }
            steps -= 1;
            current = parent;
        }
    }
}

/// Tree links read from process memory through the node layout
#[derive(Debug, Clone, Copy)]
pub struct NodeLayout {
    parent_offset: u64,
    links_offset: u64,
    pointer_size: u64,
}

impl NodeLayout {
    /// Resolve `m_pParent` and `m_pLink[2]` on the node type
    pub fn resolve(node: &TypeHandle) -> Result<Self> {
        let (parent_offset, _) = node
            .find_member("m_pParent")
            .ok_or_else(|| FormatterError::missing_field(node.type_name(), "m_pParent"))?;
        let (links_offset, _) = node
            .find_member("m_pLink")
            .ok_or_else(|| FormatterError::missing_field(node.type_name(), "m_pLink"))?;
        Ok(Self {
            parent_offset,
            links_offset,
            pointer_size: node.table().pointer_size(),
        })
    }

    pub fn bind<'a>(&self, target: &'a dyn Inspector) -> MemoryLinks<'a> {
        MemoryLinks {
            layout: *self,
            target,
        }
    }
}

/// [`TreeLinks`] over an inspected process
pub struct MemoryLinks<'a> {
    layout: NodeLayout,
    target: &'a dyn Inspector,
}

impl TreeLinks for MemoryLinks<'_> {
    fn child(&self, node: u64, side: Side) -> Result<u64> {
        let offset = self.layout.links_offset + side as u64 * self.layout.pointer_size;
        self.target.read_pointer(node.wrapping_add(offset))
    }

    fn parent(&self, node: u64) -> Result<u64> {
        self.target
            .read_pointer(node.wrapping_add(self.layout.parent_offset))
    }
}

/// Where the tree lives; `nil` terminates every branch
#[derive(Debug, Clone)]
struct MapTree {
    root: u64,
    nil: u64,
    node_type: TypeHandle,
    layout: NodeLayout,
}

impl MapTree {
    fn resolve(cx: &FormatContext<'_>, value: &Value) -> Result<Self> {
        let root_ptr = value.field(cx.target, "m_pRoot")?;
        let node_type = root_ptr.type_handle().and_then(|t| t.pointee()).ok_or_else(|| {
            FormatterError::TypeMismatch("m_pRoot is not a pointer".to_string())
        })?;
        let nil = value.field(cx.target, "m_NilNode")?.address().ok_or_else(|| {
            FormatterError::TypeMismatch("nil node is not in memory".to_string())
        })?;
        Ok(Self {
            root: root_ptr.as_unsigned(cx.target)?,
            nil,
            layout: NodeLayout::resolve(&node_type)?,
            node_type,
        })
    }

    /// Node of entry `index`, one successor step from `last` when it is the
    /// previous entry
    fn node_at(&self, cx: &FormatContext<'_>, last: Option<(usize, u64)>, index: usize) -> Result<Option<u64>> {
        let links = self.layout.bind(cx.target);
        let walker = TreeWalker::new(&links, self.nil, cx.settings.max_tree_steps);

        let (mut node, steps) = match last {
            Some((last_index, last_node)) if last_index + 1 == index => (Some(last_node), 1),
            _ => (walker.leftmost(self.root)?, index),
        };
        for _ in 0..steps {
            match node {
                Some(n) => node = walker.successor(n)?,
                None => break,
            }
        }
        Ok(node)
    }
}

#[derive(Debug, Clone)]
struct MapSnapshot {
    count_field: Option<Value>,
    /// Entries shown; zero when the stored count is implausible or the tree
    /// cannot be located
    entries: usize,
    tree: Option<MapTree>,
}

/// Children: `m_uiCount`, then the entries in key order
#[derive(Debug, Clone, Default)]
pub struct MapProvider {
    snapshot: Option<MapSnapshot>,
    /// Last returned entry index and node address
    last: Option<(usize, u64)>,
}

impl MapProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(cx: &FormatContext<'_>, value: &Value) -> MapSnapshot {
        let count_field = logged(value.field(cx.target, "m_uiCount"), "map count field");
        let tree = logged(MapTree::resolve(cx, value), "map tree");
        let entries = match tree {
            Some(_) => logged(read_field(cx, value, "m_uiCount"), "map count")
                .map(|count| {
                    if count > cx.settings.corrupt_map_count_threshold {
                        tracing::debug!("Ignoring implausible map count 0x{:X}", count);
                        0
                    } else {
                        cx.settings.clamp_children(count)
                    }
                })
                .unwrap_or(0),
            None => 0,
        };
        MapSnapshot {
            count_field,
            entries,
            tree,
        }
    }
}

impl SyntheticProvider for MapProvider {
    fn update(&mut self, cx: &FormatContext<'_>, value: &Value) {
        self.last = None;
        self.snapshot = Some(Self::snapshot(cx, value));
    }

    fn num_children(&self) -> usize {
        self.snapshot.as_ref().map(|s| 1 + s.entries).unwrap_or(0)
    }

    fn child_at_index(&mut self, cx: &FormatContext<'_>, index: usize) -> Option<Value> {
        let s = self.snapshot.as_ref()?;
        if index == 0 {
            return s.count_field.clone();
        }
        let entry = index - 1;
        if entry >= s.entries {
            return None;
        }
        let tree = s.tree.as_ref()?;
        let node = logged(tree.node_at(cx, self.last, entry), "MapProvider::child_at_index")??;
        let child = Value::at(super::index_label(entry as u64), node, tree.node_type.clone());
        self.last = Some((entry, node));
        Some(child)
    }
}

fn member_text(cx: &FormatContext<'_>, value: &Value, name: &str) -> Result<String> {
    let member = value.field(cx.target, name)?;
    Ok(crate::render::display_text(cx, &member))
}

/// `key = K, value = V` for a map node
pub fn map_node_summary(cx: &FormatContext<'_>, value: &Value) -> String {
    summary_or_error(
        member_text(cx, value, "m_Key").and_then(|key| {
            let val = member_text(cx, value, "m_Value")?;
            Ok(format!("key = {}, value = {}", key, val))
        }),
        "map_node_summary",
    )
}

/// The key of a set node
pub fn set_node_summary(cx: &FormatContext<'_>, value: &Value) -> String {
    summary_or_error(member_text(cx, value, "m_Key"), "set_node_summary")
}
