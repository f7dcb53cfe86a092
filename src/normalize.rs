//! Density normalization: PDFs, subtraction, and divergence between a
//! signal (IP) and control (input) density matrix.
//!
//! There are two normalization families here:
//!
//!  1. **Per-event shape** ([`calculate_pdf`] and everything built on it).
//!     Each event's densities are turned into a probability distribution
//!     over positions, so events with very different coverage become
//!     comparable. Events missing from one side of a comparison are filled
//!     with the uniform distribution, `1 / num_positions`.
//!
//!  2. **Absolute magnitude** ([`entropy_of_reads`]). Densities are shifted
//!     by a pseudocount shared by both matrices and scaled to reads per
//!     million; rows are *not* normalized. Events missing from one side are
//!     filled with the pseudocount.
//!
//! Both families join signal and control through [`align`], which takes
//! the fill policy as an [`AlignmentFill`].

use tracing::debug;

use crate::error::RbpMapsError;
use crate::matrix::{EventMatrix, Profile};
use ndarray::{Array2, Axis};

/// The divisor used to express shifted densities as reads per million.
pub const READS_PER_MILLION: f64 = 1_000_000.0;

/// How to fill an event row that is present on one side of a signal/control
/// comparison but not the other.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AlignmentFill {
    /// The uniform distribution over positions, `1 / num_positions`.
    Uniform,
    /// A fixed constant.
    Constant(f64),
}

impl AlignmentFill {
    /// The fill value for a matrix with `npositions` columns.
    pub fn value(&self, npositions: usize) -> f64 {
        match self {
            AlignmentFill::Uniform => 1.0 / npositions as f64,
            AlignmentFill::Constant(value) => *value,
        }
    }
}

/// Signal and control matrices with identical, aligned rows.
#[derive(Clone, Debug, PartialEq)]
pub struct AlignedPair {
    pub signal: EventMatrix,
    pub control: EventMatrix,
}

impl AlignedPair {
    /// Compute the per-event, per-position divergence `p·log2(p/q)`, where
    /// `p` is the signal cell and `q` is the control cell.
    pub fn divergence(&self) -> EventMatrix {
        self.signal
            .zip_present(&self.control, |p, q| p * (p / q).log2())
    }

    /// Subtract control from signal, per event and per position.
    pub fn difference(&self) -> EventMatrix {
        self.signal.zip_present(&self.control, |p, q| p - q)
    }
}

/// Find the smallest strictly positive value across all `matrices`.
///
/// This is the pseudocount added to every cell before normalization. It is
/// a single pass over each matrix.
pub fn pseudocount<'a>(
    matrices: impl IntoIterator<Item = &'a EventMatrix>,
) -> Result<f64, RbpMapsError> {
    matrices
        .into_iter()
        .filter_map(|matrix| matrix.min_positive())
        .min_by(|a, b| a.total_cmp(b))
        .ok_or(RbpMapsError::DegenerateInput)
}

/// Convert a density matrix into a row-stochastic PDF matrix.
///
/// Rows whose summed density does not exceed `min_density_threshold` are
/// dropped. The global minimum positive density of the remaining rows is
/// added to every present cell, and each row is divided by its new sum, so
/// every row sums to one and every present cell is strictly positive.
///
/// # Errors
///
/// Returns [`RbpMapsError::NegativeDensity`] if a present density is
/// negative, and [`RbpMapsError::DegenerateInput`] if no strictly positive
/// value survives the threshold.
pub fn calculate_pdf(
    density: &EventMatrix,
    min_density_threshold: f64,
) -> Result<EventMatrix, RbpMapsError> {
    density.ensure_nonnegative()?;
    let (filtered, dropped) = density.filter_by_density(min_density_threshold);
    let pseudocount = pseudocount([&filtered])?;
    debug!(
        events = filtered.nevents(),
        dropped, pseudocount, "calculating PDF"
    );
    let shifted = filtered.map_present(|x| x + pseudocount);
    Ok(row_normalize(&shifted))
}

/// Identical to [`calculate_pdf`].
pub fn normalize(
    density: &EventMatrix,
    min_density_threshold: f64,
) -> Result<EventMatrix, RbpMapsError> {
    calculate_pdf(density, min_density_threshold)
}

/// Divide every row by the sum of its present cells.
fn row_normalize(matrix: &EventMatrix) -> EventMatrix {
    let sums = matrix.row_sums();
    let mut values = matrix.values().clone();
    for (mut row, sum) in values.axis_iter_mut(Axis(0)).zip(sums.iter()) {
        row.mapv_inplace(|x| x.map(|x| x / sum));
    }
    matrix.with_values(values)
}

/// Join `signal` and `control` on event identity.
///
/// The output rows are the signal events in their original order, followed
/// by control-only events in control order. An event absent from one side
/// gets a whole row of `fill`; missing cells within a present row stay
/// missing.
///
/// # Errors
///
/// Returns [`RbpMapsError::PositionMismatch`] if the two matrices have
/// different position axes.
pub fn align(
    signal: &EventMatrix,
    control: &EventMatrix,
    fill: AlignmentFill,
) -> Result<AlignedPair, RbpMapsError> {
    signal.ensure_same_positions(control)?;
    let npositions = signal.npositions();
    let fill_value = Some(fill.value(npositions));

    let events: Vec<String> = signal
        .events()
        .chain(control.events().filter(|e| signal.event_index(e).is_none()))
        .map(String::from)
        .collect();

    let side = |matrix: &EventMatrix| -> Array2<Option<f64>> {
        let mut values = Array2::from_elem((events.len(), npositions), fill_value);
        for (index, event) in events.iter().enumerate() {
            if let Some(row) = matrix.row(event) {
                values.row_mut(index).assign(&row);
            }
        }
        values
    };
    let signal_values = side(signal);
    let control_values = side(control);

    let positions = signal.positions().to_vec();
    Ok(AlignedPair {
        signal: EventMatrix::new(events.clone(), positions.clone(), signal_values)?,
        control: EventMatrix::new(events, positions, control_values)?,
    })
}

/// Normalize `signal` and `control` to PDFs, and subtract the mean control
/// PDF from the mean signal PDF.
pub fn normalize_and_subtract(
    signal: &EventMatrix,
    control: &EventMatrix,
    min_density_threshold: f64,
) -> Result<Profile, RbpMapsError> {
    signal.ensure_same_positions(control)?;
    let pdf = calculate_pdf(signal, min_density_threshold)?;
    let control_pdf = calculate_pdf(control, min_density_threshold)?;
    Ok(pdf.column_means().difference(&control_pdf.column_means()))
}

/// Normalize `signal` and `control` to PDFs, align them by event, and
/// subtract control from signal per event and per position.
pub fn normalize_and_per_region_subtract(
    signal: &EventMatrix,
    control: &EventMatrix,
    min_density_threshold: f64,
) -> Result<EventMatrix, RbpMapsError> {
    Ok(aligned_pdfs(signal, control, min_density_threshold)?.difference())
}

/// The per-event, per-position KL divergence terms `p·log2(p/q)` between
/// the signal and control PDFs.
///
/// This is not aggregated; use [`EventMatrix::column_means`] for the
/// per-position average.
pub fn kl_divergence(
    signal: &EventMatrix,
    control: &EventMatrix,
    min_density_threshold: f64,
) -> Result<EventMatrix, RbpMapsError> {
    Ok(aligned_pdfs(signal, control, min_density_threshold)?.divergence())
}

/// Normalize `signal` and `control` to PDFs and align them with the
/// uniform fill.
pub fn aligned_pdfs(
    signal: &EventMatrix,
    control: &EventMatrix,
    min_density_threshold: f64,
) -> Result<AlignedPair, RbpMapsError> {
    signal.ensure_same_positions(control)?;
    let pdf = calculate_pdf(signal, min_density_threshold)?;
    let control_pdf = calculate_pdf(control, min_density_threshold)?;
    align(&pdf, &control_pdf, AlignmentFill::Uniform)
}

/// The per-event, per-position divergence terms `p·log2(p/q)` between
/// signal and control densities in reads-per-million space.
///
/// Unlike [`kl_divergence`], rows are not normalized to distributions. Both
/// matrices are filtered by `min_density_threshold`, shifted by one
/// pseudocount found jointly over both, and divided by
/// [`READS_PER_MILLION`]. Events absent from one side are filled with the
/// pseudocount.
pub fn entropy_of_reads(
    signal: &EventMatrix,
    control: &EventMatrix,
    min_density_threshold: f64,
) -> Result<EventMatrix, RbpMapsError> {
    signal.ensure_same_positions(control)?;
    signal.ensure_nonnegative()?;
    control.ensure_nonnegative()?;
    let (signal, _) = signal.filter_by_density(min_density_threshold);
    let (control, _) = control.filter_by_density(min_density_threshold);
    let pseudocount = pseudocount([&signal, &control])?;
    debug!(pseudocount, "calculating entropy of reads");

    let scale = |x: f64| (x + pseudocount) / READS_PER_MILLION;
    let signal = signal.map_present(scale);
    let control = control.map_present(scale);

    Ok(align(&signal, &control, AlignmentFill::Constant(pseudocount))?.divergence())
}
