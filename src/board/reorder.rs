//! Drag-and-drop moves: optimistic local update, remote confirmation,
//! rollback to the last-known-good state on failure.
//!
//! ```text
//!   plan()  ──>  begin()  ──>  commit()
//!                  │              ├── store ok    → Committed
//!                  │              └── store error → RolledBack (snapshot restored, reload)
//!                  └── local columns already show the move (Pending)
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::models::{Issue, IssueColumn};
use super::ordering::{self, DropTarget};
use super::position::PositionAllocator;
use super::store::IssueStore;
use crate::errors::{BoardError, Result};

/// A completed drag: which issue, which column, where in it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveRequest {
    pub issue_id: i64,
    pub column: IssueColumn,
    pub target: DropTarget,
}

impl MoveRequest {
    pub fn new(issue_id: i64, column: IssueColumn, target: DropTarget) -> Self {
        Self {
            issue_id,
            column,
            target,
        }
    }

    /// Drop on the column body: append at the end.
    pub fn to_end(issue_id: i64, column: IssueColumn) -> Self {
        Self::new(issue_id, column, DropTarget::Column)
    }
}

/// Everything decided about a move before any state changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedMove {
    pub issue_id: i64,
    pub from_column: IssueColumn,
    pub to_column: IssueColumn,
    /// Index among the target column's issues, the moved one excluded.
    pub index: usize,
    pub above: Option<f64>,
    pub below: Option<f64>,
    pub position: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MovePhase {
    Pending,
    Committed,
    RolledBack,
}

/// An optimistic move awaiting confirmation from the store.
#[derive(Debug)]
pub struct MoveTransaction {
    id: Uuid,
    planned: PlannedMove,
    snapshot: Vec<(IssueColumn, Vec<Issue>)>,
    phase: MovePhase,
}

impl MoveTransaction {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> MovePhase {
        self.phase
    }

    pub fn planned(&self) -> &PlannedMove {
        &self.planned
    }

    fn finish(&mut self, phase: MovePhase) {
        debug_assert_eq!(self.phase, MovePhase::Pending, "transaction finished twice");
        self.phase = phase;
    }
}

/// Result of a committed or rolled-back move.
#[derive(Debug, Clone, Serialize)]
pub struct MoveOutcome {
    pub transaction_id: Uuid,
    pub phase: MovePhase,
    pub planned: PlannedMove,
    /// The issue as persisted; `None` after a rollback.
    pub issue: Option<Issue>,
    /// Why persistence failed, after a rollback.
    pub error: Option<String>,
}

impl MoveOutcome {
    pub fn is_committed(&self) -> bool {
        self.phase == MovePhase::Committed
    }
}

/// Local view of one project's board that applies moves optimistically.
pub struct ReorderCoordinator<S: IssueStore + ?Sized> {
    store: Arc<S>,
    project_id: i64,
    allocator: PositionAllocator,
    auto_rebalance: bool,
    columns: BTreeMap<IssueColumn, Vec<Issue>>,
}

impl<S: IssueStore + ?Sized> ReorderCoordinator<S> {
    /// Fetch the project's issues from the store.
    pub async fn load(
        store: Arc<S>,
        project_id: i64,
        allocator: PositionAllocator,
    ) -> Result<Self> {
        if store.get_project(project_id).await?.is_none() {
            return Err(BoardError::ProjectNotFound { id: project_id });
        }
        let mut coordinator = Self {
            store,
            project_id,
            allocator,
            auto_rebalance: true,
            columns: BTreeMap::new(),
        };
        coordinator.reload().await?;
        Ok(coordinator)
    }

    /// Whether an exhausted gap triggers a rebalance of the target column.
    pub fn with_auto_rebalance(mut self, enabled: bool) -> Self {
        self.auto_rebalance = enabled;
        self
    }

    pub fn project_id(&self) -> i64 {
        self.project_id
    }

    /// Issues of a column in display order.
    pub fn column(&self, column: IssueColumn) -> &[Issue] {
        self.columns.get(&column).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn board(&self) -> &BTreeMap<IssueColumn, Vec<Issue>> {
        &self.columns
    }

    fn find(&self, issue_id: i64) -> Option<&Issue> {
        self.columns
            .values()
            .flat_map(|list| list.iter())
            .find(|i| i.id == issue_id)
    }

    /// Replace local state with the store's.
    pub async fn reload(&mut self) -> Result<()> {
        let issues = self.store.list_issues(self.project_id).await?;
        let mut columns: BTreeMap<IssueColumn, Vec<Issue>> =
            IssueColumn::ALL.iter().map(|&c| (c, Vec::new())).collect();
        for issue in issues {
            columns.entry(issue.column).or_default().push(issue);
        }
        for list in columns.values_mut() {
            ordering::sort_column(list);
        }
        self.columns = columns;
        Ok(())
    }

    /// Decide the target index and new position of a move.
    pub fn plan(&self, request: &MoveRequest) -> Result<PlannedMove> {
        let issue = self
            .find(request.issue_id)
            .ok_or(BoardError::IssueNotFound {
                id: request.issue_id,
            })?;

        let list = ordering::column_without(
            self.column(request.column),
            request.column,
            Some(request.issue_id),
        );
        let index = request.target.resolve_index(list.len());
        let (above, below) = ordering::neighbors(&list, index);
        let position = self.allocator.try_allocate(above, below)?;

        debug!(
            issue_id = request.issue_id,
            column = %request.column,
            index,
            ?above,
            ?below,
            position,
            "planned move"
        );

        Ok(PlannedMove {
            issue_id: request.issue_id,
            from_column: issue.column,
            to_column: request.column,
            index,
            above,
            below,
            position,
        })
    }

    /// Apply a planned move locally and open a pending transaction.
    pub fn begin(&mut self, planned: PlannedMove) -> Result<MoveTransaction> {
        let mut affected = vec![planned.from_column];
        if planned.to_column != planned.from_column {
            affected.push(planned.to_column);
        }
        let snapshot = affected
            .into_iter()
            .map(|c| (c, self.column(c).to_vec()))
            .collect();

        let source = self.columns.entry(planned.from_column).or_default();
        let at = source
            .iter()
            .position(|i| i.id == planned.issue_id)
            .ok_or(BoardError::IssueNotFound {
                id: planned.issue_id,
            })?;
        let mut issue = source.remove(at);
        issue.column = planned.to_column;
        issue.position = planned.position;
        ordering::insert_sorted(self.columns.entry(planned.to_column).or_default(), issue);

        Ok(MoveTransaction {
            id: Uuid::new_v4(),
            planned,
            snapshot,
            phase: MovePhase::Pending,
        })
    }

    /// Persist a pending move. A store failure rolls the local state back and
    /// reloads it from the store; it is reported in the outcome, not as an error.
    pub async fn commit(&mut self, mut tx: MoveTransaction) -> Result<MoveOutcome> {
        let planned = tx.planned.clone();
        match self
            .store
            .move_issue(planned.issue_id, planned.to_column, planned.position)
            .await
        {
            Ok(persisted) => {
                if let Some(local) = self
                    .columns
                    .get_mut(&persisted.column)
                    .and_then(|list| list.iter_mut().find(|i| i.id == persisted.id))
                {
                    *local = persisted.clone();
                }
                tx.finish(MovePhase::Committed);
                info!(
                    tx = %tx.id,
                    issue_id = planned.issue_id,
                    from = %planned.from_column,
                    to = %planned.to_column,
                    position = planned.position,
                    "move committed"
                );
                Ok(MoveOutcome {
                    transaction_id: tx.id,
                    phase: tx.phase,
                    planned,
                    issue: Some(persisted),
                    error: None,
                })
            }
            Err(err) => {
                warn!(
                    tx = %tx.id,
                    issue_id = planned.issue_id,
                    error = %err,
                    "move failed to persist, rolling back"
                );
                for (column, issues) in std::mem::take(&mut tx.snapshot) {
                    self.columns.insert(column, issues);
                }
                if let Err(reload_err) = self.reload().await {
                    warn!(
                        tx = %tx.id,
                        error = %reload_err,
                        "reload after rollback failed, keeping last-known-good snapshot"
                    );
                }
                tx.finish(MovePhase::RolledBack);
                Ok(MoveOutcome {
                    transaction_id: tx.id,
                    phase: tx.phase,
                    planned,
                    issue: None,
                    error: Some(err.to_string()),
                })
            }
        }
    }

    /// Plan, apply and persist a move. An exhausted gap is fixed by
    /// rebalancing the target column when auto-rebalance is on.
    pub async fn move_issue(&mut self, request: &MoveRequest) -> Result<MoveOutcome> {
        let planned = match self.plan(request) {
            Err(BoardError::PositionExhausted { above, below }) if self.auto_rebalance => {
                warn!(
                    column = %request.column,
                    ?above,
                    ?below,
                    "position gap exhausted, rebalancing column"
                );
                self.rebalance(request.column).await?;
                self.plan(request)?
            }
            other => other?,
        };
        let tx = self.begin(planned)?;
        self.commit(tx).await
    }

    /// Renumber a column with evenly spaced positions and persist them.
    pub async fn rebalance(&mut self, column: IssueColumn) -> Result<Vec<Issue>> {
        let positions = self
            .allocator
            .rebalanced_positions(self.column(column).len());
        let updates: Vec<(i64, f64)> = self
            .column(column)
            .iter()
            .zip(positions)
            .map(|(issue, position)| (issue.id, position))
            .collect();

        if let Err(err) = self.store.set_positions(&updates).await {
            warn!(column = %column, error = %err, "rebalance failed to persist");
            self.reload().await?;
            return Err(err);
        }

        let list = self.columns.entry(column).or_default();
        for (issue, &(_, position)) in list.iter_mut().zip(&updates) {
            issue.position = position;
        }
        info!(
            project_id = self.project_id,
            column = %column,
            count = updates.len(),
            "column rebalanced"
        );
        Ok(list.clone())
    }
}
