//! Test cases and test utility functions.
//!

use rand::{thread_rng, Rng};
use tempfile::NamedTempFile;

use crate::{matrix::EventMatrix, traits::TabularTsvSerialize};

// Random density defaults
//
// Densities are drawn uniformly from [0, MAX_DENSITY), and a fraction of
// them are set to zero, since real density matrices are sparse.
pub const MAX_DENSITY: f64 = 10.0;
pub const ZERO_FRACTION: f64 = 0.3;

/// Build labels `{prefix}0`, `{prefix}1`, ...
pub fn labels(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{}{}", prefix, i)).collect()
}

/// Draw one random density; `missing_fraction` of them are the missing
/// sentinel.
pub fn random_density(missing_fraction: f64) -> f64 {
    let mut rng = thread_rng();
    if rng.gen_bool(missing_fraction) {
        crate::matrix::MISSING_SENTINEL
    } else if rng.gen_bool(ZERO_FRACTION) {
        0.0
    } else {
        rng.gen_range(0.0..MAX_DENSITY)
    }
}

/// Build a random [`EventMatrix`] of `nevents` events over `npositions`
/// positions labelled `pos0`, `pos1`, ...
///
/// Every event has at least one strictly positive density in its first
/// position, so no row is dropped at a zero threshold.
pub fn random_event_matrix(nevents: usize, npositions: usize, missing_fraction: f64) -> EventMatrix {
    let mut rng = thread_rng();
    let rows = (0..nevents)
        .map(|_| {
            let mut row: Vec<f64> = (0..npositions)
                .map(|_| random_density(missing_fraction))
                .collect();
            if let Some(first) = row.first_mut() {
                *first = rng.gen_range(1.0..MAX_DENSITY);
            }
            row
        })
        .collect();
    EventMatrix::from_raw_rows(labels("event", nevents), labels("pos", npositions), rows)
        .expect("random event matrix has a consistent shape")
}

/// The 2 event × 3 position density matrix `[[0, 2, 2], [4, 0, 4]]`.
pub fn density_test_case_01() -> EventMatrix {
    EventMatrix::from_raw_rows(
        labels("event", 2),
        labels("pos", 3),
        vec![vec![0.0, 2.0, 2.0], vec![4.0, 0.0, 4.0]],
    )
    .expect("test case has a consistent shape")
}

/// Write `matrix` to a temporary TSV file.
pub fn temp_matrix_file(matrix: &EventMatrix) -> NamedTempFile {
    let file = NamedTempFile::new().expect("could not create temporary file");
    matrix
        .to_tsv_file(Some(file.path()), None)
        .expect("could not write temporary density matrix");
    file
}
