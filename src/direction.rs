//! Global direction disambiguation
//!
//! A nearest-neighbour chain has no notion of which end came first. The
//! resolver scores the ordering and its reverse by total adjacent distance and
//! flips the ordering only when the reverse is strictly smoother.

use tracing::{instrument, info};
use crate::common::{GrayFrame, Result};
use crate::similarity::frame_sse;

/// Playback direction chosen for the final ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Reversed,
}

impl Direction {
    pub fn is_reversed(self) -> bool {
        self == Direction::Reversed
    }
}

/// Scores behind a direction decision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionReport {
    pub direction: Direction,
    pub forward_score: f64,
    pub reverse_score: f64,
}

/// Squared-error total along an ordering, kept as integers until reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Continuity {
    squared_error: u128,
    pixels: usize,
}

impl Continuity {
    fn measure<I>(ordering: I, frames: &[GrayFrame]) -> Result<Self>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut continuity = Self::default();
        let mut previous: Option<usize> = None;

        for current in ordering {
            if let Some(prev) = previous {
                continuity.squared_error += frame_sse(frames, prev, current)? as u128;
                continuity.pixels = frames[current].pixel_count();
            }
            previous = Some(current);
        }

        Ok(continuity)
    }

    /// Sum of adjacent mean squared errors
    fn score(&self) -> f64 {
        if self.pixels == 0 {
            0.0
        } else {
            self.squared_error as f64 / self.pixels as f64
        }
    }
}

/// Sum of distances between temporally adjacent frames; lower is smoother
///
/// Orderings with fewer than two frames score 0.
///
/// # Arguments
/// * `ordering` - Frame indices in playback order
/// * `frames` - The frames the indices refer to
///
/// # Errors
/// * `InternalError` - If the ordering references a frame that doesn't exist
/// * `ShapeMismatch` - If adjacent frames differ in shape
pub fn continuity_score<I>(ordering: I, frames: &[GrayFrame]) -> Result<f64>
where
    I: IntoIterator<Item = usize>,
{
    Ok(Continuity::measure(ordering, frames)?.score())
}

/// Reverse `ordering` in place if its reverse has a strictly lower score
///
/// The two directions are compared on exact squared-error totals, so a
/// symmetric tie always keeps the forward order.
#[instrument(skip(ordering, frames), fields(len = ordering.len()))]
pub fn resolve_direction(ordering: &mut [usize], frames: &[GrayFrame]) -> Result<DirectionReport> {
    let forward = Continuity::measure(ordering.iter().copied(), frames)?;
    let reverse = Continuity::measure(ordering.iter().rev().copied(), frames)?;
    let (forward_score, reverse_score) = (forward.score(), reverse.score());

    let direction = if reverse.squared_error < forward.squared_error {
        ordering.reverse();
        info!("Reversed order for smoother continuity ({:.3} < {:.3})", reverse_score, forward_score);
        Direction::Reversed
    } else {
        info!("Forward order chosen ({:.3} <= {:.3})", forward_score, reverse_score);
        Direction::Forward
    };

    Ok(DirectionReport { direction, forward_score, reverse_score })
}
