//! Ordering of issues inside a column and resolution of drop targets.

use std::cmp::Ordering;

use super::models::{Issue, IssueColumn};

/// Where a dragged card was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    /// Dropped on the column itself: append at the end.
    Column,
    /// Dropped on a card: take that card's index among the column's other cards.
    Card(usize),
}

impl DropTarget {
    pub fn from_index(index: Option<usize>) -> Self {
        match index {
            Some(i) => Self::Card(i),
            None => Self::Column,
        }
    }

    /// Insertion index in a list of `len` cards. Out-of-range card indexes clamp to the end.
    pub fn resolve_index(self, len: usize) -> usize {
        match self {
            Self::Column => len,
            Self::Card(index) => index.min(len),
        }
    }
}

/// Total order within a column: position first, then id.
pub fn compare_in_column(a: &Issue, b: &Issue) -> Ordering {
    a.position
        .total_cmp(&b.position)
        .then_with(|| a.id.cmp(&b.id))
}

pub fn sort_column(issues: &mut [Issue]) {
    issues.sort_by(compare_in_column);
}

/// The issues of `column`, sorted, without `excluded`.
pub fn column_without(issues: &[Issue], column: IssueColumn, excluded: Option<i64>) -> Vec<Issue> {
    let mut list: Vec<Issue> = issues
        .iter()
        .filter(|i| i.column == column && Some(i.id) != excluded)
        .cloned()
        .collect();
    sort_column(&mut list);
    list
}

/// Positions of the cards around insertion `index` of a sorted column.
pub fn neighbors(list: &[Issue], index: usize) -> (Option<f64>, Option<f64>) {
    let above = index
        .checked_sub(1)
        .and_then(|i| list.get(i))
        .map(|i| i.position);
    let below = list.get(index).map(|i| i.position);
    (above, below)
}

/// Insert `issue` into an already sorted column, keeping it sorted.
pub fn insert_sorted(list: &mut Vec<Issue>, issue: Issue) {
    let at = list
        .binary_search_by(|other| compare_in_column(other, &issue))
        .unwrap_or_else(|i| i);
    list.insert(at, issue);
}
