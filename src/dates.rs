//! Calendar lookups over the date tree.
//!
//! Built once from the same message list as the tree, then read-only. Bulk
//! filter operations translate a date predicate (day, month, year, weekend,
//! range) into the set of day-leaf nodes for
//! [`SelectionState`](crate::chart::selection::SelectionState) to mutate;
//! dates with no messages simply contribute nothing.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;

use crate::chart::tree::{DateTree, NodeId};
use crate::loader::Message;

/// Day and message counts under the current filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterStats {
    pub total_days: usize,
    pub enabled_days: usize,
    pub disabled_days: usize,
    pub total_messages: u64,
    pub enabled_messages: u64,
    pub disabled_messages: u64,
    /// Share of messages still enabled, 0..=100. Zero when there are no
    /// messages at all.
    pub enabled_percentage: f64,
}

/// Calendar date to tree-node index.
pub struct DateIndex {
    date_to_node: HashMap<NaiveDate, NodeId>,
    messages_by_date: HashMap<NaiveDate, u64>,
    available_dates: BTreeSet<NaiveDate>,
}

impl DateIndex {
    /// Build the index. Messages with unparseable dates are skipped, the
    /// same rule the tree builder applies.
    pub fn build(messages: &[Message], tree: &DateTree) -> Self {
        let mut messages_by_date: HashMap<NaiveDate, u64> = HashMap::new();
        let mut available_dates = BTreeSet::new();

        for message in messages {
            if let Some(date) = message.naive_date() {
                *messages_by_date.entry(date).or_default() += 1;
                available_dates.insert(date);
            }
        }

        // Day leaves only; synthetic buckets never enter the map.
        let mut date_to_node = HashMap::new();
        for leaf in tree.day_leaves(tree.root()) {
            if let Some(date) = tree.leaf_date(leaf) {
                date_to_node.insert(date, leaf);
            }
        }

        Self {
            date_to_node,
            messages_by_date,
            available_dates,
        }
    }

    /// Day leaf for a calendar date, if any messages fell on it.
    pub fn node_for_date(&self, date: NaiveDate) -> Option<NodeId> {
        self.date_to_node.get(&date).copied()
    }

    pub fn message_count(&self, date: NaiveDate) -> u64 {
        self.messages_by_date.get(&date).copied().unwrap_or(0)
    }

    /// All dates with at least one message, ascending.
    pub fn available_dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.available_dates.iter().copied()
    }

    pub fn available_years(&self) -> Vec<i32> {
        let years: BTreeSet<i32> = self.available_dates.iter().map(|d| d.year()).collect();
        years.into_iter().collect()
    }

    pub fn available_months(&self, year: i32) -> Vec<u32> {
        let months: BTreeSet<u32> = self
            .available_dates
            .iter()
            .filter(|d| d.year() == year)
            .map(|d| d.month())
            .collect();
        months.into_iter().collect()
    }

    /// Earliest and latest message dates.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((
            *self.available_dates.first()?,
            *self.available_dates.last()?,
        ))
    }

    /// Day leaves for one month.
    pub fn nodes_for_month(&self, year: i32, month: u32) -> Vec<NodeId> {
        self.available_dates
            .iter()
            .filter(|d| d.year() == year && d.month() == month)
            .filter_map(|&d| self.node_for_date(d))
            .collect()
    }

    /// Day leaves for one year.
    pub fn nodes_for_year(&self, year: i32) -> Vec<NodeId> {
        self.available_dates
            .iter()
            .filter(|d| d.year() == year)
            .filter_map(|&d| self.node_for_date(d))
            .collect()
    }

    /// Day leaves falling on a Saturday or Sunday.
    pub fn nodes_for_weekends(&self) -> Vec<NodeId> {
        self.available_dates
            .iter()
            .filter(|d| matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
            .filter_map(|&d| self.node_for_date(d))
            .collect()
    }

    /// Day leaves in an inclusive date range, iterating day by day. An
    /// inverted range yields nothing.
    pub fn nodes_for_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<NodeId> {
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter_map(|d| self.node_for_date(d))
            .collect()
    }

    /// Day and message counts under the given exclusion set. A day counts
    /// as disabled when its leaf is effectively disabled.
    pub fn statistics(&self, tree: &DateTree, disabled: &HashSet<NodeId>) -> FilterStats {
        let total_days = self.available_dates.len();
        let total_messages: u64 = self.messages_by_date.values().sum();

        let mut disabled_days = 0usize;
        let mut disabled_messages = 0u64;
        for &date in &self.available_dates {
            let off = self
                .node_for_date(date)
                .is_some_and(|node| tree.effectively_disabled(disabled, node));
            if off {
                disabled_days += 1;
                disabled_messages += self.message_count(date);
            }
        }

        let enabled_messages = total_messages - disabled_messages;
        FilterStats {
            total_days,
            enabled_days: total_days - disabled_days,
            disabled_days,
            total_messages,
            enabled_messages,
            disabled_messages,
            enabled_percentage: if total_messages > 0 {
                enabled_messages as f64 / total_messages as f64 * 100.0
            } else {
                0.0
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::selection::SelectionState;

    fn messages(specs: &[(&str, usize)]) -> Vec<Message> {
        specs
            .iter()
            .flat_map(|(day, count)| {
                (0..*count).map(move |_| Message::at(&format!("{day}T12:00:00")))
            })
            .collect()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fixture() -> (Vec<Message>, DateTree) {
        // 2024-01-06 is a Saturday, 2024-01-07 a Sunday.
        let msgs = messages(&[
            ("2024-01-05", 4),
            ("2024-01-06", 1),
            ("2024-01-07", 2),
            ("2024-02-13", 6),
            ("2023-12-09", 5),
        ]);
        let tree = DateTree::build(&msgs);
        (msgs, tree)
    }

    #[test]
    fn test_lookup_and_counts() {
        let (msgs, tree) = fixture();
        let index = DateIndex::build(&msgs, &tree);

        assert_eq!(index.message_count(date(2024, 1, 5)), 4);
        assert_eq!(index.message_count(date(2024, 1, 1)), 0);
        assert!(index.available_dates().any(|d| d == date(2023, 12, 9)));
        assert!(index.available_dates().all(|d| d != date(2023, 12, 10)));

        let node = index.node_for_date(date(2024, 2, 13)).unwrap();
        assert_eq!(tree.node(node).value, 6.0);
        assert_eq!(tree.leaf_date(node), Some(date(2024, 2, 13)));

        assert!(index.node_for_date(date(2025, 1, 1)).is_none());
    }

    #[test]
    fn test_navigation_queries() {
        let (msgs, tree) = fixture();
        let index = DateIndex::build(&msgs, &tree);

        assert_eq!(index.available_years(), [2023, 2024]);
        assert_eq!(index.available_months(2024), [1, 2]);
        assert_eq!(index.available_months(2022), Vec::<u32>::new());
        assert_eq!(
            index.date_range(),
            Some((date(2023, 12, 9), date(2024, 2, 13)))
        );
    }

    #[test]
    fn test_bulk_node_translation() {
        let (msgs, tree) = fixture();
        let index = DateIndex::build(&msgs, &tree);

        assert_eq!(index.nodes_for_month(2024, 1).len(), 3);
        assert_eq!(index.nodes_for_month(2024, 3).len(), 0);
        assert_eq!(index.nodes_for_year(2024).len(), 4);
        assert_eq!(index.nodes_for_year(2023).len(), 1);

        let weekends = index.nodes_for_weekends();
        assert_eq!(weekends.len(), 3); // Jan 6, Jan 7, Dec 9 (Saturday)

        // Inclusive range, absent days skipped.
        let range = index.nodes_for_range(date(2024, 1, 5), date(2024, 2, 13));
        assert_eq!(range.len(), 4);
        assert!(index
            .nodes_for_range(date(2024, 3, 1), date(2024, 1, 1))
            .is_empty());
    }

    #[test]
    fn test_statistics() {
        let (msgs, tree) = fixture();
        let index = DateIndex::build(&msgs, &tree);
        let mut selection = SelectionState::new(&tree);

        let stats = index.statistics(&tree, selection.disabled());
        assert_eq!(stats.total_days, 5);
        assert_eq!(stats.enabled_days, 5);
        assert_eq!(stats.total_messages, 18);
        assert_eq!(stats.enabled_percentage, 100.0);

        // Disabling the 2024 *year* node cascades to its days.
        let y2024 = tree.child_by_name(tree.root(), "2024").unwrap();
        selection.toggle(&tree, y2024);

        let stats = index.statistics(&tree, selection.disabled());
        assert_eq!(stats.disabled_days, 4);
        assert_eq!(stats.enabled_days, 1);
        assert_eq!(stats.disabled_messages, 13);
        assert_eq!(stats.enabled_messages, 5);
        assert!((stats.enabled_percentage - 5.0 / 18.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_statistics_empty_input() {
        let msgs: Vec<Message> = Vec::new();
        let tree = DateTree::build(&msgs);
        let index = DateIndex::build(&msgs, &tree);
        let selection = SelectionState::new(&tree);

        let stats = index.statistics(&tree, selection.disabled());
        assert_eq!(stats, FilterStats::default());
    }

    #[test]
    fn test_weekend_and_range_feed_selection() {
        let (msgs, tree) = fixture();
        let index = DateIndex::build(&msgs, &tree);
        let mut selection = SelectionState::new(&tree);

        selection.disable_many(&tree, index.nodes_for_weekends());
        // Weekend messages: 1 + 2 + 5 = 8 of 18.
        assert_eq!(selection.filtered_value(), 10.0);

        selection.enable_many(&tree, index.nodes_for_range(date(2023, 12, 1), date(2023, 12, 31)));
        assert_eq!(selection.filtered_value(), 15.0);
    }
}
