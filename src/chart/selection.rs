//! Mutable exclusion set over the date tree.
//!
//! The only stateful part of the chart engine. Every mutation leaves
//! `filtered_value` consistent with the set before returning and notifies
//! registered observers at most once with the final set. Disabling a node
//! implicitly disables its whole subtree ("effectively disabled"); the
//! descendants are never added to the set individually.

use std::collections::HashSet;

use anyhow::Result;

use crate::chart::tree::{DateTree, NodeId};

/// Notification emitted after a mutation.
#[derive(Debug)]
pub enum SelectionEvent<'a> {
    /// The exclusion set changed; carries the final set.
    SelectionChanged(&'a HashSet<NodeId>),
    /// The derived aggregate changed; carries the new value.
    FilteredValueChanged(f64),
}

type ObserverFn = Box<dyn FnMut(&SelectionEvent<'_>) -> Result<()>>;

/// Exclusion set plus the derived "filtered" aggregate.
pub struct SelectionState {
    disabled: HashSet<NodeId>,
    filtered_value: f64,
    observers: Vec<ObserverFn>,
}

impl SelectionState {
    /// Fresh state with nothing disabled; the filtered value starts at the
    /// full root total.
    pub fn new(tree: &DateTree) -> Self {
        let mut state = Self {
            disabled: HashSet::new(),
            filtered_value: 0.0,
            observers: Vec::new(),
        };
        state.filtered_value = state.enabled_sum(tree, tree.root());
        state
    }

    pub fn disabled(&self) -> &HashSet<NodeId> {
        &self.disabled
    }

    /// Root value remaining after exclusions.
    pub fn filtered_value(&self) -> f64 {
        self.filtered_value
    }

    /// Direct membership only; see [`is_effectively_disabled`](Self::is_effectively_disabled)
    /// for the cascading rule.
    pub fn is_disabled(&self, id: NodeId) -> bool {
        self.disabled.contains(&id)
    }

    /// True when the node or any ancestor is in the exclusion set. This is
    /// the rule layout exclusion and statistics use.
    pub fn is_effectively_disabled(&self, tree: &DateTree, id: NodeId) -> bool {
        tree.effectively_disabled(&self.disabled, id)
    }

    /// Register an observer. A failing observer is logged and skipped; it
    /// never blocks later observers or the mutation itself.
    pub fn add_observer(
        &mut self,
        observer: impl FnMut(&SelectionEvent<'_>) -> Result<()> + 'static,
    ) {
        self.observers.push(Box::new(observer));
    }

    /// Flip one node's membership.
    pub fn toggle(&mut self, tree: &DateTree, id: NodeId) {
        if !self.disabled.remove(&id) {
            self.disabled.insert(id);
        }
        self.after_mutation(tree);
    }

    /// Add a batch of nodes to the set. One notification for the whole
    /// batch; a no-op batch fires none.
    pub fn disable_many(&mut self, tree: &DateTree, nodes: impl IntoIterator<Item = NodeId>) {
        let mut changed = false;
        for id in nodes {
            changed |= self.disabled.insert(id);
        }
        if changed {
            self.after_mutation(tree);
        }
    }

    /// Remove a batch of nodes from the set.
    pub fn enable_many(&mut self, tree: &DateTree, nodes: impl IntoIterator<Item = NodeId>) {
        let mut changed = false;
        for id in nodes {
            changed |= self.disabled.remove(&id);
        }
        if changed {
            self.after_mutation(tree);
        }
    }

    /// Replace the set with the given nodes wholesale.
    pub fn disable_all(&mut self, tree: &DateTree, nodes: impl IntoIterator<Item = NodeId>) {
        self.set_disabled(tree, nodes.into_iter().collect());
    }

    /// Clear the set. Calling this twice is a no-op the second time.
    pub fn enable_all(&mut self, tree: &DateTree) {
        self.set_disabled(tree, HashSet::new());
    }

    /// Replace the set from an external source. Only signals a change when
    /// the sets actually differ.
    pub fn set_disabled(&mut self, tree: &DateTree, nodes: HashSet<NodeId>) {
        if nodes == self.disabled {
            return;
        }
        self.disabled = nodes;
        self.after_mutation(tree);
    }

    /// Stable path keys for the current set, for host-side persistence.
    pub fn disabled_paths(&self, tree: &DateTree) -> Vec<String> {
        let mut paths: Vec<String> = self
            .disabled
            .iter()
            .map(|&id| tree.path_key(id))
            .collect();
        paths.sort();
        paths
    }

    /// Restore a set saved with [`disabled_paths`](Self::disabled_paths).
    /// Paths that no longer resolve (the tree was rebuilt from different
    /// data) are ignored.
    pub fn set_disabled_paths(&mut self, tree: &DateTree, paths: &[String]) {
        let nodes: HashSet<NodeId> = paths
            .iter()
            .filter_map(|path| tree.node_at_path(path))
            .collect();
        self.set_disabled(tree, nodes);
    }

    /// Sum of enabled leaf values, stopping descent at disabled subtrees.
    fn enabled_sum(&self, tree: &DateTree, id: NodeId) -> f64 {
        if self.disabled.contains(&id) {
            return 0.0;
        }
        let node = tree.node(id);
        if node.is_leaf() {
            return node.value;
        }
        node.children
            .iter()
            .chain(node.aggregated_children.iter())
            .map(|&child| self.enabled_sum(tree, child))
            .sum()
    }

    /// Recompute the aggregate and fan out notifications. Runs after every
    /// set change, so callers always observe a consistent pair.
    fn after_mutation(&mut self, tree: &DateTree) {
        let previous = self.filtered_value;
        self.filtered_value = self.enabled_sum(tree, tree.root());
        let value = self.filtered_value;
        let value_changed = (value - previous).abs() > f64::EPSILON;

        // Observers are taken out for the duration of the fan-out so the
        // final set can be borrowed for the event payload.
        let mut observers = std::mem::take(&mut self.observers);
        for observer in observers.iter_mut() {
            if let Err(err) = observer(&SelectionEvent::SelectionChanged(&self.disabled)) {
                tracing::error!(%err, "selection observer failed");
            }
            if value_changed {
                if let Err(err) = observer(&SelectionEvent::FilteredValueChanged(value)) {
                    tracing::error!(%err, "selection observer failed");
                }
            }
        }
        self.observers = observers;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::tree::DateLevel;
    use crate::loader::Message;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn messages(specs: &[(&str, usize)]) -> Vec<Message> {
        specs
            .iter()
            .flat_map(|(day, count)| {
                (0..*count).map(move |_| Message::at(&format!("{day}T12:00:00")))
            })
            .collect()
    }

    fn example_tree() -> DateTree {
        DateTree::build(&messages(&[
            ("2024-01-05", 4),
            ("2024-02-10", 6),
            ("2023-12-09", 5),
        ]))
    }

    /// Brute-force reference: sum of day leaves that are not effectively
    /// disabled.
    fn leaf_sum(tree: &DateTree, state: &SelectionState) -> f64 {
        tree.day_leaves(tree.root())
            .into_iter()
            .filter(|&leaf| !state.is_effectively_disabled(tree, leaf))
            .map(|leaf| tree.node(leaf).value)
            .sum()
    }

    #[test]
    fn test_initial_value_is_root_total() {
        let tree = example_tree();
        let state = SelectionState::new(&tree);
        assert_eq!(state.filtered_value(), 15.0);
        assert!(state.disabled().is_empty());
    }

    #[test]
    fn test_toggle_updates_filtered_value() {
        let tree = example_tree();
        let mut state = SelectionState::new(&tree);

        let y2024 = tree.child_by_name(tree.root(), "2024").unwrap();
        let jan = tree.child_by_name(y2024, "01").unwrap();

        state.toggle(&tree, jan);
        assert!(state.is_disabled(jan));
        assert_eq!(state.filtered_value(), 11.0);
        assert_eq!(state.filtered_value(), leaf_sum(&tree, &state));

        state.toggle(&tree, jan);
        assert!(!state.is_disabled(jan));
        assert_eq!(state.filtered_value(), 15.0);
    }

    #[test]
    fn test_effective_disable_cascades() {
        let tree = example_tree();
        let mut state = SelectionState::new(&tree);

        let y2024 = tree.child_by_name(tree.root(), "2024").unwrap();
        state.toggle(&tree, y2024);

        // Every descendant is effectively disabled without being a member.
        for leaf in tree.day_leaves(y2024) {
            assert!(state.is_effectively_disabled(&tree, leaf));
            assert!(!state.is_disabled(leaf));
        }
        assert_eq!(state.filtered_value(), 5.0);
        assert_eq!(state.filtered_value(), leaf_sum(&tree, &state));

        // The other year is untouched.
        let y2023 = tree.child_by_name(tree.root(), "2023").unwrap();
        assert!(!state.is_effectively_disabled(&tree, y2023));
    }

    #[test]
    fn test_aggregate_consistency_under_bulk_ops() {
        let tree = example_tree();
        let mut state = SelectionState::new(&tree);

        let leaves = tree.day_leaves(tree.root());
        state.disable_many(&tree, leaves.iter().copied());
        assert_eq!(state.filtered_value(), 0.0);
        assert_eq!(state.filtered_value(), leaf_sum(&tree, &state));

        state.enable_many(&tree, leaves.iter().copied().take(1));
        assert_eq!(state.filtered_value(), leaf_sum(&tree, &state));

        state.enable_all(&tree);
        assert_eq!(state.filtered_value(), 15.0);
    }

    #[test]
    fn test_enable_all_idempotent() {
        let tree = example_tree();
        let mut state = SelectionState::new(&tree);

        let notifications = Rc::new(RefCell::new(0usize));
        let seen = Rc::clone(&notifications);
        state.add_observer(move |event| {
            if matches!(event, SelectionEvent::SelectionChanged(_)) {
                *seen.borrow_mut() += 1;
            }
            Ok(())
        });

        let y2024 = tree.child_by_name(tree.root(), "2024").unwrap();
        state.toggle(&tree, y2024);
        assert_eq!(*notifications.borrow(), 1);

        state.enable_all(&tree);
        assert_eq!(*notifications.borrow(), 2);

        // Second clear is a no-op: no extra notification.
        state.enable_all(&tree);
        assert_eq!(*notifications.borrow(), 2);
    }

    #[test]
    fn test_set_disabled_detects_no_change() {
        let tree = example_tree();
        let mut state = SelectionState::new(&tree);

        let count = Rc::new(RefCell::new(0usize));
        let seen = Rc::clone(&count);
        state.add_observer(move |_| {
            *seen.borrow_mut() += 1;
            Ok(())
        });

        let y2024 = tree.child_by_name(tree.root(), "2024").unwrap();
        let set: HashSet<NodeId> = [y2024].into_iter().collect();

        state.set_disabled(&tree, set.clone());
        let after_first = *count.borrow();
        assert!(after_first > 0);

        state.set_disabled(&tree, set);
        assert_eq!(*count.borrow(), after_first);
    }

    #[test]
    fn test_observer_failure_isolated() {
        let tree = example_tree();
        let mut state = SelectionState::new(&tree);

        let second_ran = Rc::new(RefCell::new(false));
        state.add_observer(|_| Err(anyhow::anyhow!("observer broke")));
        let seen = Rc::clone(&second_ran);
        state.add_observer(move |_| {
            *seen.borrow_mut() = true;
            Ok(())
        });

        let y2024 = tree.child_by_name(tree.root(), "2024").unwrap();
        state.toggle(&tree, y2024);

        assert!(*second_ran.borrow());
        // State stayed consistent despite the failure.
        assert_eq!(state.filtered_value(), 5.0);
    }

    #[test]
    fn test_value_event_fires_per_value_change() {
        let tree = example_tree();
        let mut state = SelectionState::new(&tree);

        let value_events = Rc::new(RefCell::new(0usize));
        let seen = Rc::clone(&value_events);
        state.add_observer(move |event| {
            if matches!(event, SelectionEvent::FilteredValueChanged(_)) {
                *seen.borrow_mut() += 1;
            }
            Ok(())
        });

        // Disabling then re-enabling the same leaf twice: two value changes.
        let leaf = tree.day_leaves(tree.root())[0];
        state.toggle(&tree, leaf);
        state.toggle(&tree, leaf);
        assert_eq!(*value_events.borrow(), 2);
    }

    #[test]
    fn test_path_round_trip() {
        let tree = example_tree();
        let mut state = SelectionState::new(&tree);

        let y2024 = tree.child_by_name(tree.root(), "2024").unwrap();
        let jan = tree.child_by_name(y2024, "01").unwrap();
        state.disable_many(&tree, [jan, y2024]);

        let paths = state.disabled_paths(&tree);
        assert_eq!(paths, ["2024", "2024/01"]);

        let mut restored = SelectionState::new(&tree);
        restored.set_disabled_paths(&tree, &paths);
        assert_eq!(restored.disabled(), state.disabled());
        assert_eq!(restored.filtered_value(), state.filtered_value());

        // Unknown paths are ignored rather than failing.
        let mut partial = SelectionState::new(&tree);
        partial.set_disabled_paths(
            &tree,
            &["2024/01".to_string(), "1999/01/1".to_string()],
        );
        assert_eq!(partial.disabled().len(), 1);
    }

    #[test]
    fn test_disable_all_given_set() {
        let tree = example_tree();
        let mut state = SelectionState::new(&tree);

        let months: Vec<NodeId> = tree
            .day_leaves(tree.root())
            .into_iter()
            .filter_map(|leaf| tree.node(leaf).parent)
            .filter(|&id| tree.node(id).date_level == DateLevel::Month)
            .collect();
        state.disable_all(&tree, months);
        assert_eq!(state.filtered_value(), 0.0);
    }
}
