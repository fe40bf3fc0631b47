//! Board analytics: how the issues of a project are spread out.

use serde::{Deserialize, Serialize};

use super::models::{Issue, IssueColumn, Priority};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnCount {
    pub column: IssueColumn,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriorityCount {
    pub priority: Priority,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoardStats {
    pub project_id: i64,
    pub total: usize,
    pub by_column: Vec<ColumnCount>,
    pub by_priority: Vec<PriorityCount>,
    /// Share of issues in `done`, 0-100. Zero for an empty board.
    pub completion_percent: f64,
}

impl BoardStats {
    pub fn compute(project_id: i64, issues: &[Issue]) -> Self {
        let by_column: Vec<ColumnCount> = IssueColumn::ALL
            .iter()
            .map(|&column| ColumnCount {
                column,
                count: issues.iter().filter(|i| i.column == column).count(),
            })
            .collect();
        let by_priority = Priority::ALL
            .iter()
            .map(|&priority| PriorityCount {
                priority,
                count: issues.iter().filter(|i| i.priority == priority).count(),
            })
            .collect();

        let total = issues.len();
        let done = issues
            .iter()
            .filter(|i| i.column == IssueColumn::Done)
            .count();
        let completion_percent = if total == 0 {
            0.0
        } else {
            done as f64 / total as f64 * 100.0
        };

        Self {
            project_id,
            total,
            by_column,
            by_priority,
            completion_percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(id: i64, column: IssueColumn, priority: Priority) -> Issue {
        Issue {
            id,
            project_id: 1,
            title: String::new(),
            description: String::new(),
            column,
            position: id as f64 * 1000.0,
            priority,
            labels: Vec::new(),
            sprint_id: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn empty_board_has_zero_completion() {
        let stats = BoardStats::compute(1, &[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.completion_percent, 0.0);
        assert_eq!(stats.by_column.len(), IssueColumn::ALL.len());
        assert!(stats.by_column.iter().all(|c| c.count == 0));
    }

    #[test]
    fn counts_columns_and_priorities() {
        let issues = vec![
            issue(1, IssueColumn::Todo, Priority::High),
            issue(2, IssueColumn::Done, Priority::High),
            issue(3, IssueColumn::Done, Priority::Low),
            issue(4, IssueColumn::InProgress, Priority::Medium),
        ];
        let stats = BoardStats::compute(1, &issues);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.completion_percent, 50.0);

        let done = stats
            .by_column
            .iter()
            .find(|c| c.column == IssueColumn::Done)
            .unwrap();
        assert_eq!(done.count, 2);

        let high = stats
            .by_priority
            .iter()
            .find(|p| p.priority == Priority::High)
            .unwrap();
        assert_eq!(high.count, 2);
    }
}
