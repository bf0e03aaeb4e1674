//! Dynamic recorder - (time, state) trajectories of a simulation
//!
//! Snapshots are stored in one flat buffer (row-major, one row per
//! reporting step), so growth is amortized by `Vec`. In last-only mode the
//! recorder keeps a single row that is overwritten in place.

use crate::ensemble::{allocate_sync_ensembles, Ensembles};
use crate::order::global_order;
use crate::simulation::RunStatus;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Output dynamic of one simulate call. Owned by the caller.
///
/// Timestamps are strictly increasing and every snapshot has `width()`
/// values.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SyncDynamic {
    /// Values per snapshot (oscillator count).
    width: usize,

    /// Timestamp per snapshot.
    times: Vec<f64>,

    /// Flat snapshot storage.
    states: Vec<f64>,

    /// Terminal condition of the run that produced this dynamic.
    status: RunStatus,
}

impl SyncDynamic {
    pub(crate) fn new(width: usize) -> Self {
        Self {
            width,
            times: Vec::new(),
            states: Vec::new(),
            status: RunStatus::Created,
        }
    }

    /// Number of recorded snapshots.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// True when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Values per snapshot.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Terminal condition of the producing run.
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// All timestamps.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Timestamp of snapshot `index`.
    pub fn time(&self, index: usize) -> Option<f64> {
        self.times.get(index).copied()
    }

    /// Snapshot `index`.
    pub fn state(&self, index: usize) -> Option<&[f64]> {
        (index < self.len()).then(|| &self.states[index * self.width..(index + 1) * self.width])
    }

    /// Final snapshot.
    pub fn last(&self) -> Option<(f64, &[f64])> {
        let index = self.len().checked_sub(1)?;
        Some((self.times[index], self.state(index)?))
    }

    /// Iterate (time, snapshot) pairs in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = (f64, &[f64])> {
        self.times
            .iter()
            .copied()
            .zip(self.states.chunks_exact(self.width.max(1)))
    }

    /// Value of oscillator `index` at every recorded step.
    pub fn series(&self, index: usize) -> Vec<f64> {
        if index >= self.width {
            return Vec::new();
        }
        self.states.iter().skip(index).step_by(self.width).copied().collect()
    }

    /// Copy of all snapshots, one `Vec` per reporting step.
    pub fn output(&self) -> Vec<Vec<f64>> {
        self.iter().map(|(_, s)| s.to_vec()).collect()
    }

    /// Global order parameter of every snapshot.
    pub fn orders(&self) -> Vec<f64> {
        self.iter().map(|(_, s)| global_order(s)).collect()
    }

    /// Ensembles of snapshot `index`, or of the final snapshot when `None`.
    pub fn allocate_sync_ensembles(&self, tolerance: f64, index: Option<usize>) -> Ensembles {
        let index = index.unwrap_or_else(|| self.len().saturating_sub(1));
        self.state(index)
            .map(|s| allocate_sync_ensembles(s, tolerance))
            .unwrap_or_default()
    }

    fn push(&mut self, time: f64, state: &[f64]) {
        debug_assert_eq!(state.len(), self.width);
        debug_assert!(self.times.last().map_or(true, |&last| time > last));
        self.times.push(time);
        self.states.extend_from_slice(state);
    }

    fn overwrite(&mut self, time: f64, state: &[f64]) {
        if self.times.is_empty() {
            self.push(time, state);
        } else {
            self.times[0] = time;
            self.states.copy_from_slice(state);
        }
    }
}

/// Records reporting steps into a [`SyncDynamic`].
#[derive(Debug)]
pub(crate) struct DynamicRecorder {
    collect: bool,
    dynamic: SyncDynamic,
}

impl DynamicRecorder {
    pub(crate) fn new(width: usize, collect: bool, expected_steps: usize) -> Self {
        let mut dynamic = SyncDynamic::new(width);
        if collect {
            dynamic.times.reserve(expected_steps);
            dynamic.states.reserve(expected_steps.saturating_mul(width));
        }
        Self { collect, dynamic }
    }

    /// Append in full-history mode, replace in last-only mode.
    pub(crate) fn record(&mut self, time: f64, state: &[f64]) {
        if self.collect {
            self.dynamic.push(time, state);
        } else {
            self.dynamic.overwrite(time, state);
        }
    }

    pub(crate) fn finish(mut self, status: RunStatus) -> SyncDynamic {
        self.dynamic.status = status;
        self.dynamic
    }
}
