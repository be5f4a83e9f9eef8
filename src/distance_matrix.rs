//! Pairwise distance matrix over all frames
//!
//! The matrix is the dominant cost of the pipeline: `n(n-1)/2` metric
//! evaluations, no sampling. Each unordered pair is computed exactly once and
//! mirrored; the diagonal holds `+inf` so self-matches never win a minimum.

use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;
use tracing::{instrument, debug, info};
use crate::common::{GrayFrame, Result, ReconstructError};
use crate::similarity::mse_unchecked;

/// Log matrix-build progress every this many rows
const PROGRESS_INTERVAL: usize = 250;

/// How the matrix builder schedules its pair computations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parallelism {
    /// Upper-triangle rows are computed on the rayon thread pool
    #[default]
    Parallel,
    /// All pairs are computed on the calling thread
    Sequential,
}

/// Whether a row mean counts the `+inf` diagonal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagonalPolicy {
    Exclude,
    Include,
}

/// Dense n x n matrix of frame dissimilarities
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    data: Array2<f64>,
}

impl DistanceMatrix {
    /// Build the matrix from a set of equal-shaped frames
    ///
    /// # Arguments
    /// * `frames` - Grayscale frames, all of the same shape
    /// * `parallelism` - Whether rows are computed on the rayon pool
    ///
    /// # Errors
    /// * `EmptyInput` - If `frames` is empty
    /// * `ShapeMismatch` - If any frame differs in shape from frame 0
    #[instrument(skip(frames), fields(frame_count = frames.len()))]
    pub fn build(frames: &[GrayFrame], parallelism: Parallelism) -> Result<Self> {
        let first = frames.first().ok_or(ReconstructError::EmptyInput)?;
        let expected = first.dimensions();

        for (index, frame) in frames.iter().enumerate() {
            if frame.dimensions() != expected {
                return Err(ReconstructError::ShapeMismatch {
                    index,
                    expected,
                    found: frame.dimensions(),
                });
            }
        }

        let n = frames.len();
        info!("Building {}x{} distance matrix ({} pairs, {:?})",
              n, n, n * n.saturating_sub(1) / 2, parallelism);

        // Each task owns row i's upper triangle, so no pair is shared.
        let upper_row = |i: usize| -> Vec<f64> {
            let row: Vec<f64> = ((i + 1)..n)
                .map(|j| mse_unchecked(&frames[i], &frames[j]))
                .collect();
            if i % PROGRESS_INTERVAL == 0 {
                debug!("Computed distances for row {}/{}", i, n);
            }
            row
        };

        let upper: Vec<Vec<f64>> = match parallelism {
            Parallelism::Parallel => (0..n).into_par_iter().map(upper_row).collect(),
            Parallelism::Sequential => (0..n).map(upper_row).collect(),
        };

        let mut matrix = Self::unfilled(n);
        for (i, row) in upper.into_iter().enumerate() {
            for (offset, value) in row.into_iter().enumerate() {
                matrix.set_pair(i, i + 1 + offset, value);
            }
        }

        Ok(matrix)
    }

    /// Build a matrix from an arbitrary distance function
    ///
    /// `distance` is evaluated once per unordered pair `i < j` and mirrored.
    pub fn from_fn(n: usize, mut distance: impl FnMut(usize, usize) -> f64) -> Self {
        let mut matrix = Self::unfilled(n);
        for i in 0..n {
            for j in (i + 1)..n {
                matrix.set_pair(i, j, distance(i, j));
            }
        }
        matrix
    }

    /// Build a matrix from explicit rows
    ///
    /// The diagonal is overwritten with `+inf`.
    ///
    /// # Errors
    /// * `InvalidConfig` - If the rows are not square, hold a non-finite
    ///   off-diagonal distance, or are not symmetric
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let n = rows.len();
        if let Some(bad) = rows.iter().position(|row| row.len() != n) {
            return Err(ReconstructError::config_error(format!(
                "Row {} has {} entries, expected {}", bad, rows[bad].len(), n
            )));
        }

        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let mut data = Array2::from_shape_vec((n, n), flat)
            .map_err(|e| ReconstructError::config_error(format!("Bad distance rows: {}", e)))?;
        data.diag_mut().fill(f64::INFINITY);

        // The sequencer reserves +inf for the diagonal and poisoned cells
        if let Some(((i, j), value)) = data
            .indexed_iter()
            .find(|&((i, j), value)| i != j && !value.is_finite())
        {
            return Err(ReconstructError::config_error(format!(
                "Distance ({}, {}) is {}, expected a finite value", i, j, value
            )));
        }

        let matrix = Self { data };
        if !matrix.is_symmetric() {
            return Err(ReconstructError::config_error("Distance rows are not symmetric"));
        }
        Ok(matrix)
    }

    fn unfilled(n: usize) -> Self {
        Self {
            data: Array2::from_elem((n, n), f64::INFINITY),
        }
    }

    fn set_pair(&mut self, i: usize, j: usize, value: f64) {
        self.data[[i, j]] = value;
        self.data[[j, i]] = value;
    }

    /// Number of frames the matrix covers
    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Distance between frames `i` and `j`
    ///
    /// # Panics
    /// Panics if either index is out of range
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[[i, j]]
    }

    /// All distances from frame `i`, including the `+inf` diagonal entry
    ///
    /// # Panics
    /// Panics if `i` is out of range
    pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
        self.data.row(i)
    }

    /// Poison a single cell so it never wins a row minimum again
    ///
    /// Only the `(i, j)` cell changes, so the matrix stops being symmetric.
    pub(crate) fn poison(&mut self, i: usize, j: usize) {
        self.data[[i, j]] = f64::INFINITY;
    }

    /// Index of the smallest entry in row `i`, lowest index on ties
    pub(crate) fn row_argmin(&self, i: usize) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (j, &value) in self.row(i).iter().enumerate() {
            match best {
                Some((_, current)) if value >= current => {}
                _ => best = Some((j, value)),
            }
        }
        best
    }

    /// Mean distance from frame `i` to the others
    ///
    /// With `DiagonalPolicy::Exclude` the mean is over the `n - 1` other frames
    /// (0.0 when `n == 1`). With `Include` the `+inf` diagonal is averaged in
    /// and the result is always `+inf`.
    pub fn row_mean(&self, i: usize, policy: DiagonalPolicy) -> f64 {
        let row = self.row(i);
        let n = self.len();
        match policy {
            DiagonalPolicy::Include => row.sum() / n as f64,
            DiagonalPolicy::Exclude => {
                if n < 2 {
                    return 0.0;
                }
                let sum: f64 = row
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != i)
                    .map(|(_, &value)| value)
                    .sum();
                sum / (n - 1) as f64
            }
        }
    }

    /// True when every off-diagonal pair mirrors and the diagonal is `+inf`
    pub fn is_symmetric(&self) -> bool {
        self.data.diag().iter().all(|&d| d == f64::INFINITY) && self.data == self.data.t()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_frames(values: &[u8]) -> Vec<GrayFrame> {
        values.iter().map(|&v| GrayFrame::filled(4, 4, v)).collect()
    }

    #[test]
    fn test_build_empty_input() {
        let result = DistanceMatrix::build(&[], Parallelism::Sequential);
        assert!(matches!(result, Err(ReconstructError::EmptyInput)));
    }

    #[test]
    fn test_build_single_frame() {
        let matrix = DistanceMatrix::build(&uniform_frames(&[5]), Parallelism::Parallel).unwrap();
        assert_eq!(matrix.len(), 1);
        assert_eq!(matrix.get(0, 0), f64::INFINITY);
        assert!(matrix.is_symmetric());
    }

    #[test]
    fn test_build_known_values() {
        let matrix = DistanceMatrix::build(&uniform_frames(&[0, 10, 30]), Parallelism::Sequential).unwrap();
        assert_eq!(matrix.get(0, 1), 100.0);
        assert_eq!(matrix.get(1, 0), 100.0);
        assert_eq!(matrix.get(0, 2), 900.0);
        assert_eq!(matrix.get(1, 2), 400.0);
        for i in 0..3 {
            assert_eq!(matrix.get(i, i), f64::INFINITY);
        }
        assert!(matrix.is_symmetric());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let frames: Vec<GrayFrame> = (0..23u8)
            .map(|k| {
                let data = (0..16u8).map(|p| k.wrapping_mul(37).wrapping_add(p * 11)).collect();
                GrayFrame::new(4, 4, data).unwrap()
            })
            .collect();

        let parallel = DistanceMatrix::build(&frames, Parallelism::Parallel).unwrap();
        let sequential = DistanceMatrix::build(&frames, Parallelism::Sequential).unwrap();
        assert_eq!(parallel, sequential);
        assert!(parallel.is_symmetric());
    }

    #[test]
    fn test_build_shape_mismatch() {
        let frames = vec![
            GrayFrame::filled(4, 4, 0),
            GrayFrame::filled(4, 4, 1),
            GrayFrame::filled(2, 8, 1),
        ];

        match DistanceMatrix::build(&frames, Parallelism::Parallel).unwrap_err() {
            ReconstructError::ShapeMismatch { index, expected, found } => {
                assert_eq!(index, 2);
                assert_eq!(expected, (4, 4));
                assert_eq!(found, (2, 8));
            }
            other => panic!("Expected ShapeMismatch, got: {:?}", other),
        }
    }

    #[test]
    fn test_from_fn_evaluates_each_pair_once() {
        let mut calls = 0;
        let matrix = DistanceMatrix::from_fn(5, |i, j| {
            calls += 1;
            (j - i) as f64
        });
        assert_eq!(calls, 10);
        assert_eq!(matrix.get(4, 1), 3.0);
        assert!(matrix.is_symmetric());
    }

    #[test]
    fn test_from_rows_validation() {
        let ok = DistanceMatrix::from_rows(vec![
            vec![0.0, 1.0, 2.0],
            vec![1.0, 0.0, 3.0],
            vec![2.0, 3.0, 0.0],
        ])
        .unwrap();
        assert_eq!(ok.get(1, 1), f64::INFINITY);
        assert_eq!(ok.get(2, 1), 3.0);

        let ragged = DistanceMatrix::from_rows(vec![vec![0.0, 1.0], vec![1.0]]);
        assert!(matches!(ragged, Err(ReconstructError::InvalidConfig { .. })));

        let asymmetric = DistanceMatrix::from_rows(vec![vec![0.0, 1.0], vec![2.0, 0.0]]);
        assert!(matches!(asymmetric, Err(ReconstructError::InvalidConfig { .. })));
    }

    #[test]
    fn test_from_rows_rejects_non_finite_distances() {
        let infinite = DistanceMatrix::from_rows(vec![
            vec![0.0, f64::INFINITY, 1.0],
            vec![f64::INFINITY, 0.0, 2.0],
            vec![1.0, 2.0, 0.0],
        ]);
        assert!(matches!(infinite, Err(ReconstructError::InvalidConfig { .. })));

        let nan = DistanceMatrix::from_rows(vec![vec![0.0, f64::NAN], vec![f64::NAN, 0.0]]);
        assert!(matches!(nan, Err(ReconstructError::InvalidConfig { .. })));

        // Only the diagonal may be infinite, and it is overwritten anyway
        let diagonal = DistanceMatrix::from_rows(vec![
            vec![f64::INFINITY, 3.0],
            vec![3.0, f64::NAN],
        ])
        .unwrap();
        assert_eq!(diagonal.get(1, 1), f64::INFINITY);
    }

    #[test]
    fn test_row_view() {
        let matrix = DistanceMatrix::from_fn(3, |i, j| (i + j) as f64);
        let row = matrix.row(1);
        assert_eq!(row.len(), 3);
        assert_eq!(row.to_vec(), vec![1.0, f64::INFINITY, 3.0]);
    }

    #[test]
    fn test_row_mean_policies() {
        let matrix = DistanceMatrix::from_rows(vec![
            vec![0.0, 2.0, 4.0],
            vec![2.0, 0.0, 6.0],
            vec![4.0, 6.0, 0.0],
        ])
        .unwrap();

        assert_eq!(matrix.row_mean(0, DiagonalPolicy::Exclude), 3.0);
        assert_eq!(matrix.row_mean(2, DiagonalPolicy::Exclude), 5.0);
        assert_eq!(matrix.row_mean(1, DiagonalPolicy::Include), f64::INFINITY);

        let single = DistanceMatrix::from_fn(1, |_, _| 0.0);
        assert_eq!(single.row_mean(0, DiagonalPolicy::Exclude), 0.0);
    }

    #[test]
    fn test_row_argmin_lowest_index_on_ties() {
        let matrix = DistanceMatrix::from_rows(vec![
            vec![0.0, 5.0, 1.0, 1.0],
            vec![5.0, 0.0, 2.0, 2.0],
            vec![1.0, 2.0, 0.0, 1.0],
            vec![1.0, 2.0, 1.0, 0.0],
        ])
        .unwrap();

        assert_eq!(matrix.row_argmin(0), Some((2, 1.0)));
        assert_eq!(matrix.row_argmin(1), Some((2, 2.0)));
        assert_eq!(matrix.row_argmin(3), Some((0, 1.0)));
    }

    #[test]
    fn test_poison_breaks_only_one_cell() {
        let mut matrix = DistanceMatrix::from_fn(3, |i, j| (i + j) as f64);
        matrix.poison(0, 1);
        assert_eq!(matrix.get(0, 1), f64::INFINITY);
        assert_eq!(matrix.get(1, 0), 1.0);
        assert!(!matrix.is_symmetric());
    }
}
