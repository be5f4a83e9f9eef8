//! Single-pass local smoothing of an ordering
//!
//! One left-to-right sweep over interior positions. At each position the
//! frame after `curr` is moved in front of it when it continues `prev` more
//! smoothly. The sweep is not repeated, and a swap at `i` feeds the swapped
//! value into the comparison at `i + 1`.

use tracing::{instrument, debug, trace};
use crate::common::{GrayFrame, Result};
use crate::similarity::frame_sse;

/// Repair local misplacements in `ordering`, returning the number of swaps
///
/// Orderings shorter than three frames have no interior positions and are
/// left untouched.
///
/// # Errors
/// * `InternalError` - If the ordering references a frame that doesn't exist
/// * `ShapeMismatch` - If compared frames differ in shape
#[instrument(skip(ordering, frames), fields(len = ordering.len()))]
pub fn smooth(ordering: &mut [usize], frames: &[GrayFrame]) -> Result<usize> {
    let mut swaps = 0;

    for i in 1..ordering.len().saturating_sub(1) {
        let (prev, curr, next) = (ordering[i - 1], ordering[i], ordering[i + 1]);

        // Both pairs share a pixel count, so the exact sums decide
        let skip_error = frame_sse(frames, prev, next)?;
        let current_error = frame_sse(frames, prev, curr)?;

        if skip_error < current_error {
            trace!("Swapping frames {} and {} at position {} ({} < {})",
                   curr, next, i, skip_error, current_error);
            ordering.swap(i, i + 1);
            swaps += 1;
        }
    }

    debug!("Smoothing pass made {} swaps", swaps);
    Ok(swaps)
}
