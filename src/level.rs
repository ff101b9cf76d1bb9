//! A capacity-bounded, ordered collection of runs.
//!
//! Runs are kept newest-first: a freshly sealed run is prepended to
//! the front, so front-to-back iteration visits runs from most to
//! least recent. The level holds no merge policy of its own — when
//! and how runs are consolidated is decided entirely by the engine.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::run::Run;

/// One level of the LSM hierarchy.
pub struct Level {
    /// Maximum number of runs this level may hold (the tree fanout).
    max_runs: usize,

    /// Capacity in entries of each run at this level.
    max_run_size: usize,

    /// Resident runs, newest at the front.
    runs: VecDeque<Arc<Run>>,
}

impl Level {
    /// Creates an empty level holding up to `max_runs` runs of
    /// `max_run_size` entries each.
    pub fn new(max_runs: usize, max_run_size: usize) -> Self {
        Self {
            max_runs,
            max_run_size,
            runs: VecDeque::new(),
        }
    }

    /// Pushes a freshly sealed run to the front (newest position).
    pub fn prepend(&mut self, run: Arc<Run>) {
        debug_assert!(self.runs.len() < self.max_runs, "level over capacity");
        self.runs.push_front(run);
    }

    /// Number of free run slots.
    pub fn remaining(&self) -> usize {
        self.max_runs - self.runs.len()
    }

    /// Iterates resident runs front-to-back (newest to oldest).
    pub fn runs(&self) -> impl Iterator<Item = &Arc<Run>> {
        self.runs.iter()
    }

    /// Drops every run. Backing files are deleted as the last
    /// reference to each run goes away.
    pub fn clear(&mut self) {
        self.runs.clear();
    }

    /// Number of resident runs.
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Returns `true` if the level holds no runs.
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Capacity in entries of each run at this level.
    pub fn max_run_size(&self) -> usize {
        self.max_run_size
    }

    /// Maximum number of runs this level may hold.
    pub fn max_runs(&self) -> usize {
        self.max_runs
    }
}
