//! Date hierarchy tree built from a chat export.
//!
//! Three fixed levels below the root: year, month, day. Node values are
//! message counts. Parents with many low-value children get a synthetic
//! "others" bucket so outer rings stay readable. The tree is immutable once
//! built; filtering happens through an external exclusion set keyed by
//! [`NodeId`], never by mutating the tree.

use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, NaiveDate};

use crate::loader::Message;

/// Upper bound on root children (years) before overflow grouping.
const ROOT_MAX_CHILDREN: usize = 5;
/// Upper bound on children for a node holding its parent's full value.
const BASE_MAX_CHILDREN: usize = 35;
/// Lower bound on children kept visible regardless of value share.
const MIN_VISIBLE_CHILDREN: usize = 5;

/// Handle to a node in a [`DateTree`]. Identity, not the node name, is what
/// the exclusion set and all lookups key on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Which level of the date hierarchy a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateLevel {
    Root,
    Year,
    Month,
    Day,
    /// Synthetic bucket grouping low-value siblings.
    Others,
}

/// One bucket in the date hierarchy.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub name: String,
    pub value: f64,
    pub parent: Option<NodeId>,
    /// Primary children in chronological order.
    pub children: Vec<NodeId>,
    /// Overflow buckets, rendered after the primary children.
    pub aggregated_children: Vec<NodeId>,
    pub date_level: DateLevel,
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty() && self.aggregated_children.is_empty()
    }
}

/// Arena-backed date tree with a single "Total" root.
#[derive(Debug)]
pub struct DateTree {
    nodes: Vec<TreeNode>,
    root: NodeId,
}

impl DateTree {
    /// Build the tree from a message list.
    ///
    /// Messages without a parseable date are skipped. An empty (or fully
    /// unparseable) input yields a root with no children, which consumers
    /// treat as "no data".
    pub fn build(messages: &[Message]) -> Self {
        let mut buckets: BTreeMap<i32, BTreeMap<u32, BTreeMap<u32, u64>>> = BTreeMap::new();
        let mut skipped = 0usize;

        for message in messages {
            match message.naive_date() {
                Some(date) => {
                    *buckets
                        .entry(date.year())
                        .or_default()
                        .entry(date.month())
                        .or_default()
                        .entry(date.day())
                        .or_default() += 1;
                }
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            tracing::warn!(skipped, "messages without a parseable date were ignored");
        }

        let total: u64 = buckets
            .values()
            .flat_map(|months| months.values())
            .flat_map(|days| days.values())
            .sum();

        let mut tree = Self {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        tree.push(TreeNode {
            name: "Total".to_string(),
            value: total as f64,
            parent: None,
            children: Vec::new(),
            aggregated_children: Vec::new(),
            date_level: DateLevel::Root,
        });

        for (year, months) in &buckets {
            let year_value: u64 = months.values().flat_map(|days| days.values()).sum();
            let year_id = tree.push_child(tree.root, year.to_string(), year_value, DateLevel::Year);

            for (month, days) in months {
                let month_value: u64 = days.values().sum();
                let month_id =
                    tree.push_child(year_id, format!("{month:02}"), month_value, DateLevel::Month);

                for (day, count) in days {
                    tree.push_child(month_id, day.to_string(), *count, DateLevel::Day);
                }
            }
        }

        tree.aggregate_overflow();
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Walk the parent chain, nearest ancestor first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.node(id).parent, move |&p| self.node(p).parent)
    }

    /// True when the node or any ancestor is in `disabled`. Disabling a
    /// node therefore covers its whole subtree without listing the
    /// descendants individually.
    pub fn effectively_disabled(&self, disabled: &HashSet<NodeId>, id: NodeId) -> bool {
        disabled.contains(&id) || self.ancestors(id).any(|a| disabled.contains(&a))
    }

    /// All day-level nodes in the subtree, traversing overflow buckets too.
    pub fn day_leaves(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_day_leaves(id, &mut out);
        out
    }

    fn collect_day_leaves(&self, id: NodeId, out: &mut Vec<NodeId>) {
        let node = self.node(id);
        if node.date_level == DateLevel::Day {
            out.push(id);
            return;
        }
        for &child in node.children.iter().chain(node.aggregated_children.iter()) {
            self.collect_day_leaves(child, out);
        }
    }

    /// Calendar date of a day leaf, reconstructed from its year and month
    /// ancestors. Overflow buckets in between do not break the lookup.
    pub fn leaf_date(&self, id: NodeId) -> Option<NaiveDate> {
        let node = self.node(id);
        if node.date_level != DateLevel::Day {
            return None;
        }
        let day: u32 = node.name.parse().ok()?;

        let mut year: Option<i32> = None;
        let mut month: Option<u32> = None;
        for ancestor in self.ancestors(id) {
            let ancestor = self.node(ancestor);
            match ancestor.date_level {
                DateLevel::Month if month.is_none() => month = ancestor.name.parse().ok(),
                DateLevel::Year if year.is_none() => year = ancestor.name.parse().ok(),
                _ => {}
            }
        }

        NaiveDate::from_ymd_opt(year?, month?, day)
    }

    /// Child (primary or overflow bucket) with the given name.
    pub fn child_by_name(&self, id: NodeId, name: &str) -> Option<NodeId> {
        let node = self.node(id);
        node.children
            .iter()
            .chain(node.aggregated_children.iter())
            .copied()
            .find(|&child| self.node(child).name == name)
    }

    /// Stable `/`-joined name path below the root, e.g. `2024/01/5`.
    /// Used to round-trip an exclusion set through the hosting application.
    pub fn path_key(&self, id: NodeId) -> String {
        let mut names: Vec<&str> = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id);
            if node.parent.is_some() {
                names.push(node.name.as_str());
            }
            current = node.parent;
        }
        names.reverse();
        names.join("/")
    }

    /// Inverse of [`path_key`](Self::path_key).
    pub fn node_at_path(&self, path: &str) -> Option<NodeId> {
        if path.is_empty() {
            return None;
        }
        let mut current = self.root;
        for segment in path.split('/') {
            current = self.child_by_name(current, segment)?;
        }
        Some(current)
    }

    fn push(&mut self, node: TreeNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn push_child(&mut self, parent: NodeId, name: String, value: u64, level: DateLevel) -> NodeId {
        let id = self.push(TreeNode {
            name,
            value: value as f64,
            parent: Some(parent),
            children: Vec::new(),
            aggregated_children: Vec::new(),
            date_level: level,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Group overflow children into "others" buckets, top-down.
    fn aggregate_overflow(&mut self) {
        let mut queue = vec![self.root];
        while let Some(id) = queue.pop() {
            queue.extend(self.nodes[id.0].children.iter().copied());
            self.aggregate_children(id);
        }
    }

    /// Dynamic child cap: the root always shows at most five years; other
    /// nodes scale with their share of the parent's value.
    fn child_cap(&self, id: NodeId) -> usize {
        let node = &self.nodes[id.0];
        match node.parent {
            None => ROOT_MAX_CHILDREN,
            Some(parent) => {
                let parent_value = self.nodes[parent.0].value;
                let share = if parent_value > 0.0 {
                    node.value / parent_value
                } else {
                    0.0
                };
                MIN_VISIBLE_CHILDREN
                    + ((BASE_MAX_CHILDREN - MIN_VISIBLE_CHILDREN) as f64 * share) as usize
            }
        }
    }

    fn aggregate_children(&mut self, id: NodeId) {
        let cap = self.child_cap(id);
        let children = self.nodes[id.0].children.clone();
        // An "others" bucket only pays off once it replaces at least two
        // children.
        if children.len() <= cap + 1 {
            return;
        }

        let mut by_value = children.clone();
        by_value.sort_by(|a, b| {
            self.nodes[b.0]
                .value
                .partial_cmp(&self.nodes[a.0].value)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let keep = cap.saturating_sub(1);
        // Bucket members stay ordered by descending value.
        let overflow: Vec<NodeId> = by_value[keep..].to_vec();
        let overflow_set: HashSet<NodeId> = overflow.iter().copied().collect();
        let overflow_value: f64 = overflow.iter().map(|n| self.nodes[n.0].value).sum();

        let primary: Vec<NodeId> = children
            .iter()
            .copied()
            .filter(|child| !overflow_set.contains(child))
            .collect();

        if overflow_value <= 0.0 {
            // Nothing worth a bucket; the zero-value overflow simply drops
            // out of the rendered children.
            self.nodes[id.0].children = primary;
            return;
        }

        let others = self.push(TreeNode {
            name: format!("{} others", overflow.len()),
            value: overflow_value,
            parent: Some(id),
            children: overflow.clone(),
            aggregated_children: Vec::new(),
            date_level: DateLevel::Others,
        });
        for member in &overflow {
            self.nodes[member.0].parent = Some(others);
        }
        self.nodes[id.0].children = primary;
        self.nodes[id.0].aggregated_children.push(others);
    }
}
