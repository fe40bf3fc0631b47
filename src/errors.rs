//! Typed error hierarchy for Vangraph.
//!
//! `BoardError` covers the board subsystem end to end: store lookups,
//! request validation, position allocation and database failures. The HTTP
//! layer maps it onto status codes in `board::api`.

use thiserror::Error;

/// Errors from the board store, coordinator and API.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Project {id} not found")]
    ProjectNotFound { id: i64 },

    #[error("Issue {id} not found")]
    IssueNotFound { id: i64 },

    #[error("Sprint {id} not found")]
    SprintNotFound { id: i64 },

    #[error("Invalid column: {0}")]
    InvalidColumn(String),

    #[error("Invalid priority: {0}")]
    InvalidPriority(String),

    #[error("Invalid sprint status: {0}")]
    InvalidSprintStatus(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// No representable position sorts strictly between the two neighbors.
    #[error("No position left between {above:?} and {below:?}; rebalance the column")]
    PositionExhausted {
        above: Option<f64>,
        below: Option<f64>,
    },

    /// Baseline must be finite, step finite and positive.
    #[error("Invalid position settings: baseline {baseline}, step {step}")]
    InvalidAllocator { baseline: f64, step: f64 },

    #[error("Database error: {0}")]
    Database(#[source] anyhow::Error),

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BoardError {
    /// True for the lookup failures that map to "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ProjectNotFound { .. } | Self::IssueNotFound { .. } | Self::SprintNotFound { .. }
        )
    }
}

pub type Result<T, E = BoardError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_not_found_carries_id() {
        let err = BoardError::ProjectNotFound { id: 42 };
        match &err {
            BoardError::ProjectNotFound { id } => assert_eq!(*id, 42),
            _ => panic!("Expected ProjectNotFound"),
        }
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn not_found_variants_are_classified() {
        assert!(BoardError::ProjectNotFound { id: 1 }.is_not_found());
        assert!(BoardError::IssueNotFound { id: 1 }.is_not_found());
        assert!(BoardError::SprintNotFound { id: 1 }.is_not_found());
        assert!(!BoardError::LockPoisoned.is_not_found());
        assert!(!BoardError::BadRequest("x".into()).is_not_found());
    }

    #[test]
    fn position_exhausted_mentions_neighbors() {
        let err = BoardError::PositionExhausted {
            above: Some(1.0),
            below: None,
        };
        let msg = err.to_string();
        assert!(msg.contains("Some(1.0)"));
        assert!(msg.contains("rebalance"));
    }

    #[test]
    fn database_error_keeps_source() {
        use std::error::Error as _;
        let err = BoardError::Database(anyhow::anyhow!("disk full"));
        assert!(err.source().is_some());
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn converts_from_anyhow() {
        let err: BoardError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, BoardError::Other(_)));
    }
}
