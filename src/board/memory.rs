//! In-memory [`IssueStore`], keyed by identifier.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::models::*;
use super::position::PositionAllocator;
use super::store::IssueStore;
use crate::errors::{BoardError, Result};

#[derive(Default)]
struct MemoryState {
    projects: BTreeMap<i64, Project>,
    issues: BTreeMap<i64, Issue>,
    sprints: BTreeMap<i64, Sprint>,
    settings: HashMap<String, String>,
    next_id: i64,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn issue_mut(&mut self, id: i64) -> Result<&mut Issue> {
        self.issues
            .get_mut(&id)
            .ok_or(BoardError::IssueNotFound { id })
    }
}

pub struct MemoryStore {
    state: Mutex<MemoryState>,
    allocator: PositionAllocator,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(PositionAllocator::default())
    }
}

impl MemoryStore {
    pub fn new(allocator: PositionAllocator) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            allocator,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state.lock().map_err(|_| BoardError::LockPoisoned)
    }
}

#[async_trait]
impl IssueStore for MemoryStore {
    async fn create_project(&self, name: &str, description: &str) -> Result<Project> {
        let mut state = self.lock()?;
        let project = Project {
            id: state.next_id(),
            name: name.to_string(),
            description: description.to_string(),
            created_at: now_timestamp(),
        };
        state.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        Ok(self.lock()?.projects.values().cloned().collect())
    }

    async fn get_project(&self, id: i64) -> Result<Option<Project>> {
        Ok(self.lock()?.projects.get(&id).cloned())
    }

    async fn create_issue(&self, new: NewIssue) -> Result<Issue> {
        let mut state = self.lock()?;
        if !state.projects.contains_key(&new.project_id) {
            return Err(BoardError::ProjectNotFound { id: new.project_id });
        }
        let last = state
            .issues
            .values()
            .filter(|i| i.project_id == new.project_id && i.column == new.column)
            .map(|i| i.position)
            .max_by(f64::total_cmp);
        let position = self.allocator.try_allocate(last, None)?;

        let now = now_timestamp();
        let issue = Issue {
            id: state.next_id(),
            project_id: new.project_id,
            title: new.title,
            description: new.description,
            column: new.column,
            position,
            priority: new.priority,
            labels: new.labels,
            sprint_id: None,
            created_at: now.clone(),
            updated_at: now,
        };
        state.issues.insert(issue.id, issue.clone());
        Ok(issue)
    }

    async fn get_issue(&self, id: i64) -> Result<Option<Issue>> {
        Ok(self.lock()?.issues.get(&id).cloned())
    }

    async fn list_issues(&self, project_id: i64) -> Result<Vec<Issue>> {
        Ok(self
            .lock()?
            .issues
            .values()
            .filter(|i| i.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn update_issue(&self, id: i64, update: IssueUpdate) -> Result<Issue> {
        let mut state = self.lock()?;
        let issue = state.issue_mut(id)?;
        update.apply(issue);
        issue.updated_at = now_timestamp();
        Ok(issue.clone())
    }

    async fn move_issue(&self, id: i64, column: IssueColumn, position: f64) -> Result<Issue> {
        let mut state = self.lock()?;
        let issue = state.issue_mut(id)?;
        issue.column = column;
        issue.position = position;
        issue.updated_at = now_timestamp();
        Ok(issue.clone())
    }

    async fn set_positions(&self, positions: &[(i64, f64)]) -> Result<()> {
        let mut state = self.lock()?;
        // Validate first so a missing id leaves every position untouched.
        if let Some(&(id, _)) = positions.iter().find(|(id, _)| !state.issues.contains_key(id)) {
            return Err(BoardError::IssueNotFound { id });
        }
        let now = now_timestamp();
        for &(id, position) in positions {
            let issue = state.issue_mut(id)?;
            issue.position = position;
            issue.updated_at = now.clone();
        }
        Ok(())
    }

    async fn delete_issue(&self, id: i64) -> Result<bool> {
        Ok(self.lock()?.issues.remove(&id).is_some())
    }

    async fn create_sprint(&self, new: NewSprint) -> Result<Sprint> {
        new.validate()?;
        let mut state = self.lock()?;
        if !state.projects.contains_key(&new.project_id) {
            return Err(BoardError::ProjectNotFound { id: new.project_id });
        }
        let sprint = Sprint {
            id: state.next_id(),
            project_id: new.project_id,
            name: new.name,
            goal: new.goal,
            status: new.status,
            start_date: new.start_date,
            end_date: new.end_date,
            created_at: now_timestamp(),
        };
        state.sprints.insert(sprint.id, sprint.clone());
        Ok(sprint)
    }

    async fn list_sprints(&self, project_id: i64) -> Result<Vec<Sprint>> {
        Ok(self
            .lock()?
            .sprints
            .values()
            .filter(|s| s.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn assign_sprint(&self, issue_id: i64, sprint_id: Option<i64>) -> Result<Issue> {
        let mut state = self.lock()?;
        let sprint_project = match sprint_id {
            Some(id) => Some(
                state
                    .sprints
                    .get(&id)
                    .map(|s| s.project_id)
                    .ok_or(BoardError::SprintNotFound { id })?,
            ),
            None => None,
        };
        let issue = state.issue_mut(issue_id)?;
        if let Some(project_id) = sprint_project {
            if project_id != issue.project_id {
                return Err(BoardError::BadRequest(format!(
                    "Sprint belongs to project {}, issue to project {}",
                    project_id, issue.project_id
                )));
            }
        }
        issue.sprint_id = sprint_id;
        issue.updated_at = now_timestamp();
        Ok(issue.clone())
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.settings.get(key).cloned())
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?
            .settings
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_project() -> (MemoryStore, Project) {
        let store = MemoryStore::default();
        let project = store.create_project("Vangraph", "").await.unwrap();
        (store, project)
    }

    #[tokio::test]
    async fn create_issue_appends_to_column() {
        let (store, project) = store_with_project().await;
        let first = store
            .create_issue(NewIssue::new(project.id, "First", IssueColumn::Todo))
            .await
            .unwrap();
        let second = store
            .create_issue(NewIssue::new(project.id, "Second", IssueColumn::Todo))
            .await
            .unwrap();
        let other = store
            .create_issue(NewIssue::new(project.id, "Elsewhere", IssueColumn::Done))
            .await
            .unwrap();
        assert_eq!(first.position, 1000.0);
        assert_eq!(second.position, 2000.0);
        assert_eq!(other.position, 1000.0);
    }

    #[tokio::test]
    async fn create_issue_requires_project() {
        let store = MemoryStore::default();
        let err = store
            .create_issue(NewIssue::new(99, "Orphan", IssueColumn::Todo))
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::ProjectNotFound { id: 99 }));
    }

    #[tokio::test]
    async fn move_and_delete_issue() {
        let (store, project) = store_with_project().await;
        let issue = store
            .create_issue(NewIssue::new(project.id, "Card", IssueColumn::Backlog))
            .await
            .unwrap();
        let moved = store
            .move_issue(issue.id, IssueColumn::Done, 42.0)
            .await
            .unwrap();
        assert_eq!(moved.column, IssueColumn::Done);
        assert_eq!(moved.position, 42.0);

        assert!(store.delete_issue(issue.id).await.unwrap());
        assert!(!store.delete_issue(issue.id).await.unwrap());
        assert!(store.get_issue(issue.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_positions_is_all_or_nothing() {
        let (store, project) = store_with_project().await;
        let issue = store
            .create_issue(NewIssue::new(project.id, "Card", IssueColumn::Todo))
            .await
            .unwrap();
        let err = store
            .set_positions(&[(issue.id, 5.0), (12345, 6.0)])
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::IssueNotFound { id: 12345 }));
        let unchanged = store.get_issue(issue.id).await.unwrap().unwrap();
        assert_eq!(unchanged.position, 1000.0);
    }

    #[tokio::test]
    async fn assign_sprint_checks_project() {
        let (store, project) = store_with_project().await;
        let other = store.create_project("Other", "").await.unwrap();
        let issue = store
            .create_issue(NewIssue::new(project.id, "Card", IssueColumn::Todo))
            .await
            .unwrap();
        let foreign = store
            .create_sprint(NewSprint {
                project_id: other.id,
                name: "Foreign".into(),
                goal: String::new(),
                status: SprintStatus::Planned,
                start_date: None,
                end_date: None,
            })
            .await
            .unwrap();

        let err = store.assign_sprint(issue.id, Some(foreign.id)).await.unwrap_err();
        assert!(matches!(err, BoardError::BadRequest(_)));

        let err = store.assign_sprint(issue.id, Some(777)).await.unwrap_err();
        assert!(matches!(err, BoardError::SprintNotFound { id: 777 }));

        let cleared = store.assign_sprint(issue.id, None).await.unwrap();
        assert_eq!(cleared.sprint_id, None);
    }

    #[tokio::test]
    async fn settings_round_trip() {
        let store = MemoryStore::default();
        assert_eq!(store.get_setting("theme").await.unwrap(), None);
        store.set_setting("theme", "dark").await.unwrap();
        store.set_setting("theme", "light").await.unwrap();
        assert_eq!(
            store.get_setting("theme").await.unwrap().as_deref(),
            Some("light")
        );
    }
}
