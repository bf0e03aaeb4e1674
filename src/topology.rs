//! Topology builder - oscillator connectivity from layouts and data
//!
//! Connectivity is stored as sorted adjacency lists with an optional parallel
//! weight list. Radius-based topologies are built from Euclidean distances
//! between data points; the hierarchical builder grows the radius until the
//! graph has no more connected components than requested.

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::config::ConnectionType;
use crate::error::{SyncError, SyncResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Topology tag of a network. Part of the network identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TopologyKind {
    AllToAll,
    GridFour,
    GridEight,
    ListBidir,
    None,
    /// Static radius over data points.
    Radius,
    /// Radius grown toward a target cluster count.
    Hierarchical,
}

impl From<ConnectionType> for TopologyKind {
    fn from(connection: ConnectionType) -> Self {
        match connection {
            ConnectionType::AllToAll => Self::AllToAll,
            ConnectionType::GridFour => Self::GridFour,
            ConnectionType::GridEight => Self::GridEight,
            ConnectionType::ListBidir => Self::ListBidir,
            ConnectionType::None => Self::None,
        }
    }
}

/// Symmetric connectivity over oscillator indices.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Connectivity {
    /// Neighbour indices per oscillator, ascending, no self links.
    neighbors: Vec<Vec<usize>>,

    /// Edge weights parallel to `neighbors`. `None` means unit strength.
    weights: Option<Vec<Vec<f64>>>,

    /// Topology tag.
    kind: TopologyKind,
}

impl Connectivity {
    /// Build an enumerated layout.
    ///
    /// Grid layouts require a square oscillator count.
    pub fn from_type(size: usize, connection: ConnectionType) -> SyncResult<Self> {
        if size == 0 {
            return Err(SyncError::InvalidConfig("size must be > 0"));
        }

        let neighbors = match connection {
            ConnectionType::AllToAll => (0..size)
                .map(|i| (0..size).filter(|&j| j != i).collect())
                .collect(),
            ConnectionType::ListBidir => (0..size)
                .map(|i| {
                    let mut list = Vec::with_capacity(2);
                    if i > 0 {
                        list.push(i - 1);
                    }
                    if i + 1 < size {
                        list.push(i + 1);
                    }
                    list
                })
                .collect(),
            ConnectionType::GridFour | ConnectionType::GridEight => {
                let side = grid_side(size)?;
                let diagonal = connection == ConnectionType::GridEight;
                (0..size).map(|i| grid_neighbors(i, side, diagonal)).collect()
            }
            ConnectionType::None => vec![Vec::new(); size],
        };

        Ok(Self {
            neighbors,
            weights: None,
            kind: connection.into(),
        })
    }

    /// Connect two oscillators iff their points are within `radius`.
    ///
    /// With `weighted`, strength falls linearly from 1.0 for the closest
    /// connected pair to 0.5 for the farthest one.
    pub fn build_static(points: &[Vec<f64>], radius: f64, weighted: bool) -> SyncResult<Self> {
        validate_points(points)?;
        if !(radius > 0.0 && radius.is_finite()) {
            return Err(SyncError::InvalidConfig("radius must be > 0"));
        }

        let size = points.len();
        let mut neighbors = vec![Vec::new(); size];
        let mut distances = vec![Vec::new(); size];
        let mut min_distance = f64::INFINITY;
        let mut max_distance = 0.0f64;

        for i in 0..size {
            for j in (i + 1)..size {
                let distance = euclidean(&points[i], &points[j]);
                if distance <= radius {
                    neighbors[i].push(j);
                    neighbors[j].push(i);
                    distances[i].push(distance);
                    distances[j].push(distance);
                    min_distance = min_distance.min(distance);
                    max_distance = max_distance.max(distance);
                }
            }
        }

        // Rows fill in ascending order: smaller indices arrive from earlier
        // outer iterations before a row's own inner loop runs.
        let weights = weighted.then(|| {
            let span = max_distance - min_distance;
            distances
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|&d| {
                            if span > 0.0 {
                                1.0 - 0.5 * (d - min_distance) / span
                            } else {
                                1.0
                            }
                        })
                        .collect()
                })
                .collect()
        });

        Ok(Self {
            neighbors,
            weights,
            kind: TopologyKind::Radius,
        })
    }

    /// Number of oscillators.
    pub fn size(&self) -> usize {
        self.neighbors.len()
    }

    /// Topology tag.
    pub fn kind(&self) -> TopologyKind {
        self.kind
    }

    /// True when edges carry distance weights.
    pub fn is_weighted(&self) -> bool {
        self.weights.is_some()
    }

    /// Neighbours of an oscillator, ascending.
    #[inline]
    pub fn neighbors(&self, index: usize) -> &[usize] {
        &self.neighbors[index]
    }

    /// Weights parallel to [`Connectivity::neighbors`], if weighted.
    #[inline]
    pub fn weights(&self, index: usize) -> Option<&[f64]> {
        self.weights.as_ref().map(|w| w[index].as_slice())
    }

    /// Number of neighbours.
    #[inline]
    pub fn degree(&self, index: usize) -> usize {
        self.neighbors[index].len()
    }

    /// Check whether two oscillators are coupled.
    pub fn has_connection(&self, i: usize, j: usize) -> bool {
        self.neighbors
            .get(i)
            .is_some_and(|list| list.binary_search(&j).is_ok())
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.neighbors.iter().map(Vec::len).sum::<usize>() / 2
    }

    /// Divisor of the coupling sum of oscillator `index`.
    ///
    /// Fully-connected layouts use the global oscillator count, all other
    /// layouts the degree. Isolated oscillators return 0.
    pub fn normalization(&self, index: usize) -> f64 {
        match self.kind {
            TopologyKind::AllToAll => self.size() as f64,
            _ => self.degree(index) as f64,
        }
    }

    /// Connected components, each ascending, ordered by smallest member.
    pub fn components(&self) -> Vec<Vec<usize>> {
        let size = self.size();
        let mut visited = vec![false; size];
        let mut components = Vec::new();
        let mut queue = VecDeque::new();

        for start in 0..size {
            if visited[start] {
                continue;
            }
            visited[start] = true;
            queue.push_back(start);
            let mut component = Vec::new();

            while let Some(current) = queue.pop_front() {
                component.push(current);
                for &next in &self.neighbors[current] {
                    if !visited[next] {
                        visited[next] = true;
                        queue.push_back(next);
                    }
                }
            }

            component.sort_unstable();
            components.push(component);
        }

        components
    }

    /// Number of connected components.
    pub fn component_count(&self) -> usize {
        self.components().len()
    }

    fn with_kind(mut self, kind: TopologyKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Outcome of hierarchical radius growth.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HierarchicalTopology {
    /// Final connectivity.
    pub connectivity: Connectivity,
    /// Radius of the final connectivity.
    pub radius: f64,
    /// Growth iterations performed (graph builds).
    pub iterations: usize,
    /// Component count of the final connectivity.
    pub components: usize,
}

/// Grow a radius topology until it has at most `target` components.
///
/// The starting radius is the mean distance from each point to its
/// `initial_neighbors` nearest neighbours. Each iteration rebuilds the graph
/// from scratch. The radius never exceeds the data diameter, so a single
/// component is always reachable; running out of `max_iterations` first
/// reports [`SyncError::HierarchyNotReached`].
pub fn build_hierarchical(
    points: &[Vec<f64>],
    target: usize,
    initial_neighbors: usize,
    growth_fraction: f64,
    max_iterations: usize,
) -> SyncResult<HierarchicalTopology> {
    validate_points(points)?;
    if target == 0 {
        return Err(SyncError::InvalidConfig("target cluster count must be > 0"));
    }
    if !(growth_fraction > 0.0 && growth_fraction.is_finite()) {
        return Err(SyncError::InvalidConfig("growth_fraction must be > 0"));
    }

    let diameter = diameter(points);
    let mut radius = average_neighbor_distance(points, initial_neighbors);
    if radius <= 0.0 {
        radius = smallest_positive_distance(points).unwrap_or(1.0);
    }

    let mut last_components = points.len();
    for iteration in 1..=max_iterations {
        let connectivity = Connectivity::build_static(points, radius, false)?;
        let components = connectivity.component_count();
        debug!(iteration, radius, components, target, "hierarchical growth");

        if components <= target {
            return Ok(HierarchicalTopology {
                connectivity: connectivity.with_kind(TopologyKind::Hierarchical),
                radius,
                iterations: iteration,
                components,
            });
        }

        last_components = components;
        radius += radius * growth_fraction;
        if diameter > 0.0 {
            radius = radius.min(diameter);
        }
    }

    warn!(
        target,
        components = last_components,
        max_iterations,
        "hierarchical growth exhausted its iteration bound"
    );
    Err(SyncError::HierarchyNotReached {
        target,
        components: last_components,
        iterations: max_iterations,
    })
}

/// Mean over all points of the mean distance to their `k` nearest neighbours.
pub fn average_neighbor_distance(points: &[Vec<f64>], k: usize) -> f64 {
    let size = points.len();
    if size < 2 || k == 0 {
        return 0.0;
    }
    let k = k.min(size - 1);

    let total: f64 = (0..size)
        .map(|i| {
            let mut distances: Vec<f64> = (0..size)
                .filter(|&j| j != i)
                .map(|j| euclidean(&points[i], &points[j]))
                .collect();
            distances.sort_by(f64::total_cmp);
            distances[..k].iter().sum::<f64>() / k as f64
        })
        .sum();

    total / size as f64
}

/// Euclidean distance between two points of equal dimension.
#[inline]
pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

fn diameter(points: &[Vec<f64>]) -> f64 {
    let mut max = 0.0f64;
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            max = max.max(euclidean(&points[i], &points[j]));
        }
    }
    max
}

fn smallest_positive_distance(points: &[Vec<f64>]) -> Option<f64> {
    let mut min: Option<f64> = None;
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            let d = euclidean(&points[i], &points[j]);
            if d > 0.0 && min.map_or(true, |m| d < m) {
                min = Some(d);
            }
        }
    }
    min
}

pub(crate) fn validate_points(points: &[Vec<f64>]) -> SyncResult<()> {
    let first = points.first().ok_or(SyncError::EmptyInput("sample"))?;
    if first.is_empty() {
        return Err(SyncError::EmptyInput("point dimension"));
    }
    for point in points {
        if point.len() != first.len() {
            return Err(SyncError::dim_mismatch(first.len(), point.len()));
        }
        if point.iter().any(|v| !v.is_finite()) {
            return Err(SyncError::InvalidConfig("points must be finite"));
        }
    }
    Ok(())
}

fn grid_side(size: usize) -> SyncResult<usize> {
    let side = (size as f64).sqrt().round() as usize;
    if side * side != size {
        return Err(SyncError::InvalidConfig(
            "grid connections require a square oscillator count",
        ));
    }
    Ok(side)
}

fn grid_neighbors(index: usize, side: usize, diagonal: bool) -> Vec<usize> {
    let row = (index / side) as isize;
    let col = (index % side) as isize;
    let side = side as isize;
    let mut list = Vec::with_capacity(if diagonal { 8 } else { 4 });

    for dr in -1isize..=1 {
        for dc in -1isize..=1 {
            if dr == 0 && dc == 0 {
                continue;
            }
            if !diagonal && dr != 0 && dc != 0 {
                continue;
            }
            let (r, c) = (row + dr, col + dc);
            if r >= 0 && r < side && c >= 0 && c < side {
                list.push((r * side + c) as usize);
            }
        }
    }

    list
}
