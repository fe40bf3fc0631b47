//! Fractional positions for ordering cards within a column.
//!
//! A new card gets a position that sorts strictly between its two neighbors,
//! so a move only ever rewrites the moved card. Positions are `f64`: repeated
//! bisection of one gap eventually runs out of precision, which
//! [`PositionAllocator::try_allocate`] detects and reports as
//! [`BoardError::PositionExhausted`]. The cure is to renumber the column with
//! [`PositionAllocator::rebalanced_positions`].

use crate::errors::{BoardError, Result};

/// Position given to the first card of an empty column.
pub const DEFAULT_BASELINE: f64 = 1000.0;

/// Gap left when appending or prepending a card.
pub const DEFAULT_STEP: f64 = 1000.0;

/// Computes positions from the neighbors of an insertion point.
///
/// `baseline` is finite and `step` is finite and positive, so appended cards
/// always sort after the last one and a rebalance keeps the column's order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionAllocator {
    baseline: f64,
    step: f64,
}

impl Default for PositionAllocator {
    fn default() -> Self {
        Self {
            baseline: DEFAULT_BASELINE,
            step: DEFAULT_STEP,
        }
    }
}

impl PositionAllocator {
    pub fn new(baseline: f64, step: f64) -> Result<Self> {
        if !baseline.is_finite() || !step.is_finite() || step <= 0.0 {
            return Err(BoardError::InvalidAllocator { baseline, step });
        }
        Ok(Self { baseline, step })
    }

    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Position for a card inserted below `above` and above `below`.
    ///
    /// `None` for `above` means "insert at start", `None` for `below` means
    /// "insert at end". Never fails and never renumbers; once a gap is
    /// exhausted the result may compare equal to a neighbor.
    pub fn allocate(&self, above: Option<f64>, below: Option<f64>) -> f64 {
        match (above, below) {
            (None, None) => self.baseline,
            (None, Some(b)) => b - self.step,
            (Some(a), None) => a + self.step,
            (Some(a), Some(b)) => a / 2.0 + b / 2.0,
        }
    }

    /// Like [`allocate`](Self::allocate), but rejects a result that does not
    /// sort strictly between the neighbors.
    pub fn try_allocate(&self, above: Option<f64>, below: Option<f64>) -> Result<f64> {
        let position = self.allocate(above, below);
        let fits = position.is_finite()
            && above.is_none_or(|a| a < position)
            && below.is_none_or(|b| position < b);
        if fits {
            Ok(position)
        } else {
            Err(BoardError::PositionExhausted { above, below })
        }
    }

    /// Evenly spaced positions for `count` cards: `baseline`, `baseline + step`, ...
    pub fn rebalanced_positions(&self, count: usize) -> Vec<f64> {
        (0..count)
            .map(|i| self.baseline + self.step * i as f64)
            .collect()
    }
}

/// [`PositionAllocator::allocate`] with the default baseline and step.
pub fn allocate_position(above: Option<f64>, below: Option<f64>) -> f64 {
    PositionAllocator::default().allocate(above, below)
}
