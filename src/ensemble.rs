//! Ensemble allocation - clusters of synchronous oscillators

use std::collections::VecDeque;

use crate::order::circular_distance;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Partition of oscillator indices into synchronous ensembles.
///
/// Every index of the snapshot appears in exactly one ensemble. Ensembles
/// are ascending internally and ordered by their smallest index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ensembles {
    clusters: Vec<Vec<usize>>,
}

impl Ensembles {
    /// Wrap already-partitioned clusters, normalizing their order.
    pub(crate) fn from_clusters(mut clusters: Vec<Vec<usize>>) -> Self {
        clusters.retain(|c| !c.is_empty());
        for cluster in &mut clusters {
            cluster.sort_unstable();
        }
        clusters.sort_by_key(|c| c[0]);
        Self { clusters }
    }

    /// Number of ensembles.
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    /// True when no oscillators were allocated.
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Ensemble at position `index`.
    pub fn get(&self, index: usize) -> Option<&[usize]> {
        self.clusters.get(index).map(Vec::as_slice)
    }

    /// Iterate over ensembles.
    pub fn iter(&self) -> impl Iterator<Item = &[usize]> {
        self.clusters.iter().map(Vec::as_slice)
    }

    /// Ensemble sizes in order.
    pub fn sizes(&self) -> Vec<usize> {
        self.clusters.iter().map(Vec::len).collect()
    }

    /// Ensemble containing an oscillator.
    pub fn ensemble_of(&self, oscillator: usize) -> Option<usize> {
        self.clusters
            .iter()
            .position(|c| c.binary_search(&oscillator).is_ok())
    }

    /// Total number of allocated oscillators.
    pub fn oscillator_count(&self) -> usize {
        self.clusters.iter().map(Vec::len).sum()
    }

    /// Take the clusters.
    pub fn into_inner(self) -> Vec<Vec<usize>> {
        self.clusters
    }
}

impl<'a> IntoIterator for &'a Ensembles {
    type Item = &'a Vec<usize>;
    type IntoIter = std::slice::Iter<'a, Vec<usize>>;

    fn into_iter(self) -> Self::IntoIter {
        self.clusters.iter()
    }
}

/// Allocate ensembles from a phase snapshot.
///
/// Two oscillators are related when their circular phase distance is below
/// `tolerance`; ensembles are the connected components of that relation.
/// Singletons are kept.
pub fn allocate_sync_ensembles(phases: &[f64], tolerance: f64) -> Ensembles {
    let size = phases.len();
    let mut visited = vec![false; size];
    let mut clusters = Vec::new();
    let mut queue = VecDeque::new();

    for start in 0..size {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        queue.push_back(start);
        let mut cluster = Vec::new();

        while let Some(current) = queue.pop_front() {
            cluster.push(current);
            for next in 0..size {
                if !visited[next] && circular_distance(phases[current], phases[next]) < tolerance {
                    visited[next] = true;
                    queue.push_back(next);
                }
            }
        }

        clusters.push(cluster);
    }

    Ensembles::from_clusters(clusters)
}

/// Last complete activity period of one output series.
#[derive(Clone, Copy, Debug)]
struct ActivityWindow {
    start: usize,
    end: usize,
}

impl ActivityWindow {
    /// Scan backwards for the most recent excursion above `threshold`. An
    /// excursion still in progress at the end of the series is skipped.
    fn last(series: &[f64], threshold: f64) -> Option<Self> {
        let mut stop = series.len().checked_sub(1)?;
        if series[stop] > threshold {
            while series[stop] > threshold && stop > 0 {
                stop -= 1;
            }
            if stop == 0 {
                return None;
            }
        }

        let mut end = None;
        for t in (1..=stop).rev() {
            match end {
                None if series[t] > threshold => end = Some(t),
                Some(end) if series[t] < threshold => return Some(Self { start: t, end }),
                _ => {}
            }
        }
        end.map(|end| Self { start: 0, end })
    }

    fn center(&self) -> f64 {
        self.start as f64 + (self.end - self.start) as f64 / 2.0
    }
}

/// Allocate ensembles from per-oscillator output series by the timing of
/// their last activity period.
///
/// An oscillator joins the first ensemble whose window contains the centre
/// of its own last excursion above `threshold`; the window is the founder's
/// centre ± `tolerance` times its excursion length. Oscillators that never
/// complete an excursion become singletons.
pub fn allocate_activity_ensembles<S: AsRef<[f64]>>(
    series: &[S],
    tolerance: f64,
    threshold: f64,
) -> Ensembles {
    let mut clusters: Vec<Vec<usize>> = Vec::new();
    let mut windows: Vec<(f64, f64)> = Vec::new();
    let mut silent = Vec::new();

    for (index, values) in series.iter().enumerate() {
        let Some(activity) = ActivityWindow::last(values.as_ref(), threshold) else {
            silent.push(index);
            continue;
        };
        let center = activity.center();

        match windows.iter().position(|&(lo, hi)| lo < center && center < hi) {
            Some(ensemble) => clusters[ensemble].push(index),
            None => {
                let reducer = (activity.end - activity.start) as f64 * tolerance;
                windows.push((center - reducer, center + reducer));
                clusters.push(vec![index]);
            }
        }
    }

    clusters.extend(silent.into_iter().map(|index| vec![index]));
    Ensembles::from_clusters(clusters)
}
