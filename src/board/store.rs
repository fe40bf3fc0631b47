//! Storage interface for the board.
//!
//! Implementations: [`MemoryStore`](super::memory::MemoryStore) for tests
//! and throwaway runs, [`SqliteStore`](super::db::SqliteStore) for real use.

use async_trait::async_trait;

use super::models::*;
use crate::errors::Result;

/// CRUD access to projects, issues, sprints and settings.
///
/// Writes are last-write-wins; concurrent movers of the same issue are not
/// reconciled.
#[async_trait]
pub trait IssueStore: Send + Sync {
    async fn create_project(&self, name: &str, description: &str) -> Result<Project>;

    async fn list_projects(&self) -> Result<Vec<Project>>;

    async fn get_project(&self, id: i64) -> Result<Option<Project>>;

    /// Insert an issue at the end of its column.
    async fn create_issue(&self, new: NewIssue) -> Result<Issue>;

    async fn get_issue(&self, id: i64) -> Result<Option<Issue>>;

    /// All issues of a project, in no particular order.
    async fn list_issues(&self, project_id: i64) -> Result<Vec<Issue>>;

    async fn update_issue(&self, id: i64, update: IssueUpdate) -> Result<Issue>;

    /// Persist a new `(column, position)` pair for an issue.
    async fn move_issue(&self, id: i64, column: IssueColumn, position: f64) -> Result<Issue>;

    /// Rewrite several positions at once (column rebalancing).
    async fn set_positions(&self, positions: &[(i64, f64)]) -> Result<()>;

    /// Returns false when the issue did not exist.
    async fn delete_issue(&self, id: i64) -> Result<bool>;

    async fn create_sprint(&self, new: NewSprint) -> Result<Sprint>;

    async fn list_sprints(&self, project_id: i64) -> Result<Vec<Sprint>>;

    /// Put an issue in a sprint, or take it out with `None`.
    async fn assign_sprint(&self, issue_id: i64, sprint_id: Option<i64>) -> Result<Issue>;

    async fn get_setting(&self, key: &str) -> Result<Option<String>>;

    async fn set_setting(&self, key: &str, value: &str) -> Result<()>;
}

/// Assemble the board view from a project's issues.
pub async fn load_board<S: IssueStore + ?Sized>(store: &S, project_id: i64) -> Result<BoardView> {
    let project = store
        .get_project(project_id)
        .await?
        .ok_or(crate::errors::BoardError::ProjectNotFound { id: project_id })?;
    let issues = store.list_issues(project_id).await?;

    let columns = IssueColumn::ALL
        .iter()
        .map(|&column| ColumnView {
            name: column,
            issues: super::ordering::column_without(&issues, column, None),
        })
        .collect();

    Ok(BoardView { project, columns })
}
