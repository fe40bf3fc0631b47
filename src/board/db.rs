use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::models::*;
use super::position::PositionAllocator;
use super::store::IssueStore;
use crate::errors::BoardError;

const ISSUE_COLUMNS: &str = concat!(
    "id, project_id, title, description, column_name, position, priority, ",
    "labels, sprint_id, created_at, updated_at"
);

const SPRINT_COLUMNS: &str = "id, project_id, name, goal, status, start_date, end_date, created_at";

/// Async-safe handle to the board database.
///
/// Wraps `BoardDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, so synchronous SQLite I/O
/// never ties up async worker threads.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<BoardDb>>,
}

impl DbHandle {
    pub fn new(db: BoardDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> crate::errors::Result<R>
    where
        F: FnOnce(&BoardDb) -> crate::errors::Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db.lock().map_err(|_| BoardError::LockPoisoned)?;
            f(&guard)
        })
        .await
        .context("DB task panicked")?
    }
}

pub struct BoardDb {
    conn: Connection,
    allocator: PositionAllocator,
}

impl BoardDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path, allocator: PositionAllocator) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let db = Self { conn, allocator };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self {
            conn,
            allocator: PositionAllocator::default(),
        };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        self.run_migrations().context("Failed to run migrations")?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS projects (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS sprints (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                    name TEXT NOT NULL,
                    goal TEXT NOT NULL DEFAULT '',
                    status TEXT NOT NULL DEFAULT 'planned',
                    start_date TEXT,
                    end_date TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS issues (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                    title TEXT NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    column_name TEXT NOT NULL DEFAULT 'backlog',
                    position REAL NOT NULL DEFAULT 0,
                    priority TEXT NOT NULL DEFAULT 'medium',
                    labels TEXT NOT NULL DEFAULT '[]',
                    sprint_id INTEGER REFERENCES sprints(id) ON DELETE SET NULL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS settings (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE INDEX IF NOT EXISTS idx_issues_project ON issues(project_id);
                CREATE INDEX IF NOT EXISTS idx_issues_column ON issues(project_id, column_name, position);
                CREATE INDEX IF NOT EXISTS idx_sprints_project ON sprints(project_id);
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    // ── Project CRUD ──────────────────────────────────────────────────

    pub fn create_project(&self, name: &str, description: &str) -> Result<Project> {
        self.conn
            .execute(
                "INSERT INTO projects (name, description) VALUES (?1, ?2)",
                params![name, description],
            )
            .context("Failed to insert project")?;
        let id = self.conn.last_insert_rowid();
        self.get_project(id)?
            .context("Project not found after insert")
    }

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, description, created_at FROM projects ORDER BY id")
            .context("Failed to prepare list_projects")?;
        let rows = stmt
            .query_map([], project_from_row)
            .context("Failed to query projects")?;
        let mut projects = Vec::new();
        for row in rows {
            projects.push(row.context("Failed to read project row")?);
        }
        Ok(projects)
    }

    pub fn get_project(&self, id: i64) -> Result<Option<Project>> {
        self.conn
            .query_row(
                "SELECT id, name, description, created_at FROM projects WHERE id = ?1",
                params![id],
                project_from_row,
            )
            .optional()
            .context("Failed to query project")
    }

    // ── Issue CRUD ────────────────────────────────────────────────────

    /// Insert an issue after the last card of its column.
    pub fn create_issue(&self, new: &NewIssue) -> Result<Issue> {
        let last: Option<f64> = self
            .conn
            .query_row(
                "SELECT MAX(position) FROM issues WHERE project_id = ?1 AND column_name = ?2",
                params![new.project_id, new.column.as_str()],
                |row| row.get(0),
            )
            .context("Failed to get max position")?;
        let position = self.allocator.try_allocate(last, None)?;
        let labels = serde_json::to_string(&new.labels).context("Failed to encode labels")?;

        self.conn
            .execute(
                "INSERT INTO issues (project_id, title, description, column_name, position, priority, labels)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    new.project_id,
                    new.title,
                    new.description,
                    new.column.as_str(),
                    position,
                    new.priority.as_str(),
                    labels
                ],
            )
            .context("Failed to insert issue")?;
        let id = self.conn.last_insert_rowid();
        self.get_issue(id)?.context("Issue not found after insert")
    }

    pub fn list_issues(&self, project_id: i64) -> Result<Vec<Issue>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {ISSUE_COLUMNS} FROM issues WHERE project_id = ?1 ORDER BY column_name, position, id"
            ))
            .context("Failed to prepare list_issues")?;
        let rows = stmt
            .query_map(params![project_id], IssueRow::from_row)
            .context("Failed to query issues")?;
        let mut issues = Vec::new();
        for row in rows {
            let r = row.context("Failed to read issue row")?;
            issues.push(r.into_issue()?);
        }
        Ok(issues)
    }

    pub fn get_issue(&self, id: i64) -> Result<Option<Issue>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id = ?1"),
                params![id],
                IssueRow::from_row,
            )
            .optional()
            .context("Failed to query issue")?;
        row.map(IssueRow::into_issue).transpose()
    }

    pub fn update_issue(&self, id: i64, update: &IssueUpdate) -> Result<Issue> {
        // Use unchecked_transaction so all updates are atomic.
        // DbHandle's Mutex already guarantees single-threaded access.
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;

        if let Some(t) = &update.title {
            tx.execute(
                "UPDATE issues SET title = ?1, updated_at = datetime('now') WHERE id = ?2",
                params![t, id],
            )
            .context("Failed to update issue title")?;
        }
        if let Some(d) = &update.description {
            tx.execute(
                "UPDATE issues SET description = ?1, updated_at = datetime('now') WHERE id = ?2",
                params![d, id],
            )
            .context("Failed to update issue description")?;
        }
        if let Some(p) = &update.priority {
            tx.execute(
                "UPDATE issues SET priority = ?1, updated_at = datetime('now') WHERE id = ?2",
                params![p.as_str(), id],
            )
            .context("Failed to update issue priority")?;
        }
        if let Some(l) = &update.labels {
            let labels = serde_json::to_string(l).context("Failed to encode labels")?;
            tx.execute(
                "UPDATE issues SET labels = ?1, updated_at = datetime('now') WHERE id = ?2",
                params![labels, id],
            )
            .context("Failed to update issue labels")?;
        }

        tx.commit().context("Failed to commit issue update")?;
        self.get_issue(id)?.context("Issue not found after update")
    }

    pub fn move_issue(&self, id: i64, column: IssueColumn, position: f64) -> Result<Issue> {
        self.conn
            .execute(
                "UPDATE issues SET column_name = ?1, position = ?2, updated_at = datetime('now') WHERE id = ?3",
                params![column.as_str(), position, id],
            )
            .context("Failed to move issue")?;
        self.get_issue(id)?.context("Issue not found after move")
    }

    /// Rewrite positions in one transaction; returns the ids that matched no row.
    pub fn set_positions(&self, positions: &[(i64, f64)]) -> Result<Vec<i64>> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;
        let mut missing = Vec::new();
        for &(id, position) in positions {
            let changed = tx
                .execute(
                    "UPDATE issues SET position = ?1, updated_at = datetime('now') WHERE id = ?2",
                    params![position, id],
                )
                .context("Failed to update issue position")?;
            if changed == 0 {
                missing.push(id);
            }
        }
        if missing.is_empty() {
            tx.commit().context("Failed to commit positions")?;
        } else {
            tx.rollback().context("Failed to roll back positions")?;
        }
        Ok(missing)
    }

    pub fn delete_issue(&self, id: i64) -> Result<bool> {
        let count = self
            .conn
            .execute("DELETE FROM issues WHERE id = ?1", params![id])
            .context("Failed to delete issue")?;
        Ok(count > 0)
    }

    pub fn assign_sprint(&self, issue_id: i64, sprint_id: Option<i64>) -> Result<Issue> {
        self.conn
            .execute(
                "UPDATE issues SET sprint_id = ?1, updated_at = datetime('now') WHERE id = ?2",
                params![sprint_id, issue_id],
            )
            .context("Failed to assign sprint")?;
        self.get_issue(issue_id)?
            .context("Issue not found after sprint assignment")
    }

    // ── Sprints ───────────────────────────────────────────────────────

    pub fn create_sprint(&self, new: &NewSprint) -> Result<Sprint> {
        self.conn
            .execute(
                "INSERT INTO sprints (project_id, name, goal, status, start_date, end_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    new.project_id,
                    new.name,
                    new.goal,
                    new.status.as_str(),
                    new.start_date.map(format_date),
                    new.end_date.map(format_date)
                ],
            )
            .context("Failed to insert sprint")?;
        let id = self.conn.last_insert_rowid();
        self.get_sprint(id)?.context("Sprint not found after insert")
    }

    pub fn get_sprint(&self, id: i64) -> Result<Option<Sprint>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {SPRINT_COLUMNS} FROM sprints WHERE id = ?1"),
                params![id],
                SprintRow::from_row,
            )
            .optional()
            .context("Failed to query sprint")?;
        row.map(SprintRow::into_sprint).transpose()
    }

    pub fn list_sprints(&self, project_id: i64) -> Result<Vec<Sprint>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {SPRINT_COLUMNS} FROM sprints WHERE project_id = ?1 ORDER BY id"
            ))
            .context("Failed to prepare list_sprints")?;
        let rows = stmt
            .query_map(params![project_id], SprintRow::from_row)
            .context("Failed to query sprints")?;
        let mut sprints = Vec::new();
        for row in rows {
            sprints.push(row.context("Failed to read sprint row")?.into_sprint()?);
        }
        Ok(sprints)
    }

    // ── Settings ──────────────────────────────────────────────────────

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to query setting")
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value],
            )
            .context("Failed to upsert setting")?;
        Ok(())
    }
}

// ── Row mapping ───────────────────────────────────────────────────────

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_date(value: Option<String>) -> Result<Option<NaiveDate>> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .with_context(|| format!("Invalid date in database: {}", s))
        })
        .transpose()
}

struct IssueRow {
    id: i64,
    project_id: i64,
    title: String,
    description: String,
    column_name: String,
    position: f64,
    priority: String,
    labels: String,
    sprint_id: Option<i64>,
    created_at: String,
    updated_at: String,
}

impl IssueRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            project_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            column_name: row.get(4)?,
            position: row.get(5)?,
            priority: row.get(6)?,
            labels: row.get(7)?,
            sprint_id: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    fn into_issue(self) -> Result<Issue> {
        Ok(Issue {
            id: self.id,
            project_id: self.project_id,
            title: self.title,
            description: self.description,
            column: IssueColumn::from_str(&self.column_name)?,
            position: self.position,
            priority: Priority::from_str(&self.priority)?,
            labels: serde_json::from_str(&self.labels).context("Invalid labels in database")?,
            sprint_id: self.sprint_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

struct SprintRow {
    id: i64,
    project_id: i64,
    name: String,
    goal: String,
    status: String,
    start_date: Option<String>,
    end_date: Option<String>,
    created_at: String,
}

impl SprintRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            project_id: row.get(1)?,
            name: row.get(2)?,
            goal: row.get(3)?,
            status: row.get(4)?,
            start_date: row.get(5)?,
            end_date: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    fn into_sprint(self) -> Result<Sprint> {
        Ok(Sprint {
            id: self.id,
            project_id: self.project_id,
            name: self.name,
            goal: self.goal,
            status: SprintStatus::from_str(&self.status)?,
            start_date: parse_date(self.start_date)?,
            end_date: parse_date(self.end_date)?,
            created_at: self.created_at,
        })
    }
}

// ── IssueStore adapter ────────────────────────────────────────────────

/// [`IssueStore`] backed by SQLite.
#[derive(Clone)]
pub struct SqliteStore {
    db: DbHandle,
}

impl SqliteStore {
    pub fn new(db: BoardDb) -> Self {
        Self {
            db: DbHandle::new(db),
        }
    }

    pub fn open(path: &Path, allocator: PositionAllocator) -> Result<Self> {
        Ok(Self::new(BoardDb::new(path, allocator)?))
    }
}

/// Lift an anyhow error from the SQL layer, keeping typed board errors intact.
fn db_err(err: anyhow::Error) -> BoardError {
    match err.downcast::<BoardError>() {
        Ok(board) => board,
        Err(other) => BoardError::Database(other),
    }
}

fn require_project(db: &BoardDb, id: i64) -> crate::errors::Result<()> {
    match db.get_project(id).map_err(db_err)? {
        Some(_) => Ok(()),
        None => Err(BoardError::ProjectNotFound { id }),
    }
}

fn require_issue(db: &BoardDb, id: i64) -> crate::errors::Result<Issue> {
    db.get_issue(id)
        .map_err(db_err)?
        .ok_or(BoardError::IssueNotFound { id })
}

#[async_trait]
impl IssueStore for SqliteStore {
    async fn create_project(
        &self,
        name: &str,
        description: &str,
    ) -> crate::errors::Result<Project> {
        let name = name.to_string();
        let description = description.to_string();
        self.db
            .call(move |db| db.create_project(&name, &description).map_err(db_err))
            .await
    }

    async fn list_projects(&self) -> crate::errors::Result<Vec<Project>> {
        self.db.call(|db| db.list_projects().map_err(db_err)).await
    }

    async fn get_project(&self, id: i64) -> crate::errors::Result<Option<Project>> {
        self.db.call(move |db| db.get_project(id).map_err(db_err)).await
    }

    async fn create_issue(&self, new: NewIssue) -> crate::errors::Result<Issue> {
        self.db
            .call(move |db| {
                require_project(db, new.project_id)?;
                db.create_issue(&new).map_err(db_err)
            })
            .await
    }

    async fn get_issue(&self, id: i64) -> crate::errors::Result<Option<Issue>> {
        self.db.call(move |db| db.get_issue(id).map_err(db_err)).await
    }

    async fn list_issues(&self, project_id: i64) -> crate::errors::Result<Vec<Issue>> {
        self.db
            .call(move |db| db.list_issues(project_id).map_err(db_err))
            .await
    }

    async fn update_issue(&self, id: i64, update: IssueUpdate) -> crate::errors::Result<Issue> {
        self.db
            .call(move |db| {
                require_issue(db, id)?;
                db.update_issue(id, &update).map_err(db_err)
            })
            .await
    }

    async fn move_issue(
        &self,
        id: i64,
        column: IssueColumn,
        position: f64,
    ) -> crate::errors::Result<Issue> {
        self.db
            .call(move |db| {
                require_issue(db, id)?;
                db.move_issue(id, column, position).map_err(db_err)
            })
            .await
    }

    async fn set_positions(&self, positions: &[(i64, f64)]) -> crate::errors::Result<()> {
        let positions = positions.to_vec();
        self.db
            .call(move |db| {
                let missing = db.set_positions(&positions).map_err(db_err)?;
                match missing.first() {
                    Some(&id) => Err(BoardError::IssueNotFound { id }),
                    None => Ok(()),
                }
            })
            .await
    }

    async fn delete_issue(&self, id: i64) -> crate::errors::Result<bool> {
        self.db.call(move |db| db.delete_issue(id).map_err(db_err)).await
    }

    async fn create_sprint(&self, new: NewSprint) -> crate::errors::Result<Sprint> {
        new.validate()?;
        self.db
            .call(move |db| {
                require_project(db, new.project_id)?;
                db.create_sprint(&new).map_err(db_err)
            })
            .await
    }

    async fn list_sprints(&self, project_id: i64) -> crate::errors::Result<Vec<Sprint>> {
        self.db
            .call(move |db| db.list_sprints(project_id).map_err(db_err))
            .await
    }

    async fn assign_sprint(
        &self,
        issue_id: i64,
        sprint_id: Option<i64>,
    ) -> crate::errors::Result<Issue> {
        self.db
            .call(move |db| {
                let issue = require_issue(db, issue_id)?;
                if let Some(id) = sprint_id {
                    let sprint = db
                        .get_sprint(id)
                        .map_err(db_err)?
                        .ok_or(BoardError::SprintNotFound { id })?;
                    if sprint.project_id != issue.project_id {
                        return Err(BoardError::BadRequest(format!(
                            "Sprint belongs to project {}, issue to project {}",
                            sprint.project_id, issue.project_id
                        )));
                    }
                }
                db.assign_sprint(issue_id, sprint_id).map_err(db_err)
            })
            .await
    }

    async fn get_setting(&self, key: &str) -> crate::errors::Result<Option<String>> {
        let key = key.to_string();
        self.db.call(move |db| db.get_setting(&key).map_err(db_err)).await
    }

    async fn set_setting(&self, key: &str, value: &str) -> crate::errors::Result<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.db
            .call(move |db| db.set_setting(&key, &value).map_err(db_err))
            .await
    }
}
