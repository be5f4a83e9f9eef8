//! Start-frame selection and greedy nearest-neighbour chaining
//!
//! The sequencer takes exclusive ownership of the distance matrix. Instead of
//! a masked minimum it poisons `(last, visited)` cells with `+inf` and
//! re-queries the row, so the matrix is consumed by the time a full ordering
//! exists and is dropped on return.

use tracing::{instrument, debug, info, trace};
use crate::common::{Result, ReconstructError};
use crate::distance_matrix::{DiagonalPolicy, DistanceMatrix};

/// How the first frame of the chain is chosen
///
/// Both variants pick the frame with the highest mean distance to the rest
/// (the most isolated frame, a proxy for a sequence endpoint), lowest index on
/// ties. They differ only in how the mean treats the `+inf` diagonal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartHeuristic {
    /// Average over the `n - 1` other frames
    #[default]
    MostIsolated,
    /// Average the `+inf` self-distance in as well; every mean is infinite so
    /// the tie-break always selects frame 0
    IncludeDiagonal,
}

impl StartHeuristic {
    fn diagonal_policy(self) -> DiagonalPolicy {
        match self {
            StartHeuristic::MostIsolated => DiagonalPolicy::Exclude,
            StartHeuristic::IncludeDiagonal => DiagonalPolicy::Include,
        }
    }
}

/// Output of the sequencer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequenced {
    pub ordering: Vec<usize>,
    pub start_frame: usize,
}

/// Pick the chain's first frame
///
/// Returns 0 for an empty matrix.
#[instrument(skip(matrix), fields(frames = matrix.len()))]
pub fn select_start(matrix: &DistanceMatrix, heuristic: StartHeuristic) -> usize {
    let policy = heuristic.diagonal_policy();
    let mut best: Option<(usize, f64)> = None;

    for i in 0..matrix.len() {
        let mean = matrix.row_mean(i, policy);
        match best {
            Some((_, current)) if mean <= current => {}
            _ => best = Some((i, mean)),
        }
    }

    let (start, mean) = best.unwrap_or((0, 0.0));
    debug!("Start frame {} has mean distance {:.3} ({:?})", start, mean, heuristic);
    start
}

/// Chain every frame into an ordering, nearest unvisited neighbour first
///
/// When a row has no finite distance left to an unplaced frame, the chain
/// continues at the lowest-index unplaced frame, so every frame is placed.
///
/// # Errors
/// * `EmptyInput` - If the matrix covers no frames
#[instrument(skip(matrix), fields(frames = matrix.len()))]
pub fn sequence(mut matrix: DistanceMatrix, heuristic: StartHeuristic) -> Result<Sequenced> {
    let n = matrix.len();
    if n == 0 {
        return Err(ReconstructError::EmptyInput);
    }

    let start_frame = select_start(&matrix, heuristic);
    info!("Chosen starting frame: {}", start_frame);

    let mut visited = vec![false; n];
    let mut ordering = Vec::with_capacity(n);
    visited[start_frame] = true;
    ordering.push(start_frame);

    while ordering.len() < n {
        let last = ordering[ordering.len() - 1];
        let next = loop {
            let (candidate, distance) = matrix.row_argmin(last).ok_or_else(|| {
                ReconstructError::internal_error(format!("Row {} is empty", last))
            })?;

            // Nothing finite left in this row: continue from the lowest unplaced frame
            if !distance.is_finite() {
                let fallback = visited.iter().position(|&placed| !placed).ok_or_else(|| {
                    ReconstructError::internal_error("No unplaced frame left")
                })?;
                debug!("No finite distance from frame {}; continuing at frame {}", last, fallback);
                break fallback;
            }

            if !visited[candidate] {
                break candidate;
            }
            matrix.poison(last, candidate);
        };

        trace!("Frame {} -> {}", last, next);
        visited[next] = true;
        ordering.push(next);
    }

    Ok(Sequenced { ordering, start_frame })
}
