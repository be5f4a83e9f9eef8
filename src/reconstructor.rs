//! Reconstructor - the full frame-ordering pipeline
//!
//! Stages run strictly in order and never re-enter an earlier one:
//! matrix build, sequencing, smoothing, direction resolution. Any error aborts
//! the run; there is no partial result.

use tracing::{instrument, debug, info};
use crate::{
    common::{GrayFrame, Result, ReconstructError},
    direction::{resolve_direction, continuity_score, Direction},
    distance_matrix::{DistanceMatrix, Parallelism},
    sequencer::{sequence, StartHeuristic},
    smoother::smooth,
};

/// Pipeline progress, logged as each stage completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineStage {
    Unbuilt,
    MatrixBuilt,
    Sequenced,
    Smoothed,
    DirectionResolved,
    Final,
}

/// Settings for a reconstruction run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconstructConfig {
    pub start_heuristic: StartHeuristic,
    pub parallelism: Parallelism,
    /// Run the single-pass local smoother after sequencing
    pub smoothing: bool,
    /// Pick forward or reverse playback by continuity score
    pub resolve_direction: bool,
}

impl Default for ReconstructConfig {
    fn default() -> Self {
        Self {
            start_heuristic: StartHeuristic::MostIsolated,
            parallelism: Parallelism::Parallel,
            smoothing: true,
            resolve_direction: true,
        }
    }
}

/// Result of a reconstruction run
#[derive(Debug, Clone, PartialEq)]
pub struct Reconstruction {
    /// Permutation of `0..n`; position k holds the input index of output frame k
    pub ordering: Vec<usize>,
    pub start_frame: usize,
    pub swaps: usize,
    pub direction: Direction,
    pub forward_score: f64,
    pub reverse_score: f64,
}

/// Runs the reconstruction pipeline over decoded grayscale frames
#[derive(Debug, Clone, Default)]
pub struct Reconstructor {
    config: ReconstructConfig,
}

impl Reconstructor {
    pub fn new(config: ReconstructConfig) -> Self {
        debug!("Created Reconstructor with config: {:?}", config);
        Self { config }
    }

    pub fn config(&self) -> &ReconstructConfig {
        &self.config
    }

    /// Reconstruct the temporal order of `frames`
    ///
    /// # Errors
    /// * `EmptyInput` - If `frames` is empty
    /// * `ShapeMismatch` - If the frames don't all share one resolution
    #[instrument(skip(self, frames), fields(frame_count = frames.len()))]
    pub fn reconstruct(&self, frames: &[GrayFrame]) -> Result<Reconstruction> {
        if frames.is_empty() {
            return Err(ReconstructError::EmptyInput);
        }

        let mut stage = PipelineStage::Unbuilt;
        info!("Reconstructing order of {} frames", frames.len());

        let matrix = DistanceMatrix::build(frames, self.config.parallelism)?;
        advance(&mut stage, PipelineStage::MatrixBuilt);

        let sequenced = sequence(matrix, self.config.start_heuristic)?;
        let mut ordering = sequenced.ordering;
        advance(&mut stage, PipelineStage::Sequenced);

        let swaps = if self.config.smoothing {
            smooth(&mut ordering, frames)?
        } else {
            0
        };
        advance(&mut stage, PipelineStage::Smoothed);

        let (direction, forward_score, reverse_score) = if self.config.resolve_direction {
            let report = resolve_direction(&mut ordering, frames)?;
            (report.direction, report.forward_score, report.reverse_score)
        } else {
            let score = continuity_score(ordering.iter().copied(), frames)?;
            (Direction::Forward, score, score)
        };
        advance(&mut stage, PipelineStage::DirectionResolved);

        advance(&mut stage, PipelineStage::Final);
        info!("Reconstruction complete: start={}, swaps={}, direction={:?}",
              sequenced.start_frame, swaps, direction);

        Ok(Reconstruction {
            ordering,
            start_frame: sequenced.start_frame,
            swaps,
            direction,
            forward_score,
            reverse_score,
        })
    }
}

fn advance(stage: &mut PipelineStage, next: PipelineStage) {
    debug_assert!(next > *stage, "Pipeline stage {:?} cannot follow {:?}", next, stage);
    debug!("Pipeline stage: {:?} -> {:?}", stage, next);
    *stage = next;
}

/// Reconstruct with default settings, returning only the ordering
pub fn reconstruct_order(frames: &[GrayFrame]) -> Result<Vec<usize>> {
    Reconstructor::default()
        .reconstruct(frames)
        .map(|reconstruction| reconstruction.ordering)
}
