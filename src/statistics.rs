//! Trimmed per-position summaries of an event matrix.
//!
//! [`EventStatistics`] holds everything a plotting collaborator needs to draw
//! one line of an RBP map: the per-position mean, standard error, and
//! standard deviation over events after symmetric trimming, the ± error band,
//! and (once computed, see [`crate::significance`]) per-position
//! significance against a background.

use num_traits::Float;
use serde::Serialize;
use std::iter::Sum;

use crate::error::{RbpMapsError, UndefinedStatistic};
use crate::io::tsv::serialize_missing;
use crate::matrix::EventMatrix;

/// Calculate the mean.
pub fn mean<F: Float + Sum>(numbers: &[F]) -> Option<F> {
    if numbers.is_empty() {
        return None;
    }
    let sum: F = numbers.iter().copied().sum();
    Some(sum / F::from(numbers.len())?)
}

/// Calculate the sample standard deviation (one delta degree of freedom).
pub fn sample_std<F: Float + Sum>(numbers: &[F]) -> Option<F> {
    if numbers.len() < 2 {
        return None;
    }
    let mean = mean(numbers)?;
    let squares: F = numbers.iter().map(|x| (*x - mean).powi(2)).sum();
    Some((squares / F::from(numbers.len() - 1)?).sqrt())
}

/// Calculate the standard error of the mean.
pub fn standard_error<F: Float + Sum>(numbers: &[F]) -> Option<F> {
    let std = sample_std(numbers)?;
    Some(std / F::from(numbers.len())?.sqrt())
}

/// The number of values dropped from *each* end of `n` sorted values so
/// that a `confidence` fraction remains.
pub fn drop_count(n: usize, confidence: f64) -> usize {
    let drop_fraction = (1.0 - confidence) / 2.0;
    (n as f64 * drop_fraction).floor() as usize
}

/// Sort `numbers` and return the slice left after dropping
/// [`drop_count`] values from both ends.
pub fn trim<F: Float>(numbers: &mut [F], confidence: f64) -> &[F] {
    numbers.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = numbers.len();
    let drop = drop_count(n, confidence);
    if drop == 0 {
        return numbers;
    }
    if 2 * drop >= n {
        return &[];
    }
    &numbers[drop..n - drop]
}

/// Per-position summary of an event matrix, and the significance of that
/// summary against a background.
#[derive(Clone, Debug)]
pub struct EventStatistics {
    pub(crate) event_matrix: EventMatrix,
    confidence: f64,
    means: Vec<Option<f64>>,
    sems: Vec<Option<f64>>,
    stds: Vec<Option<f64>>,
    error_pos: Vec<Option<f64>>,
    error_neg: Vec<Option<f64>>,
    pub(crate) ks_pvalues: Vec<Option<f64>>,
    pub(crate) mannwhitneyu_pvalues: Vec<Option<f64>>,
    pub(crate) z_scores: Vec<Result<f64, UndefinedStatistic>>,
}

impl EventStatistics {
    /// Summarize `event_matrix`, keeping a `confidence` fraction of the
    /// present values at each position.
    ///
    /// For each position, missing values are dropped, the rest are sorted,
    /// and `floor((1 - confidence) / 2 * n)` values are removed from each
    /// end before computing the mean, standard error, and standard deviation.
    ///
    /// # Errors
    ///
    /// Returns [`RbpMapsError::InvalidConfidence`] unless `0 < confidence <= 1`.
    pub fn new(event_matrix: EventMatrix, confidence: f64) -> Result<Self, RbpMapsError> {
        if !(confidence > 0.0 && confidence <= 1.0) {
            return Err(RbpMapsError::InvalidConfidence(confidence));
        }
        let npositions = event_matrix.npositions();
        let mut means = Vec::with_capacity(npositions);
        let mut sems = Vec::with_capacity(npositions);
        let mut stds = Vec::with_capacity(npositions);

        for position in 0..npositions {
            let mut column = event_matrix.column_values(position);
            let kept = trim(&mut column, confidence);
            means.push(mean(kept));
            sems.push(standard_error(kept));
            stds.push(sample_std(kept));
        }

        let bound = |sign: f64| -> Vec<Option<f64>> {
            means
                .iter()
                .zip(sems.iter())
                .map(|(mean, sem)| Some(mean.as_ref()? + sign * sem.as_ref()?))
                .collect()
        };
        let error_pos = bound(1.0);
        let error_neg = bound(-1.0);

        Ok(Self {
            event_matrix,
            confidence,
            means,
            sems,
            stds,
            error_pos,
            error_neg,
            ks_pvalues: Vec::new(),
            mannwhitneyu_pvalues: Vec::new(),
            z_scores: Vec::new(),
        })
    }

    /// The event matrix these statistics summarize.
    pub fn event_matrix(&self) -> &EventMatrix {
        &self.event_matrix
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn num_events(&self) -> usize {
        self.event_matrix.nevents()
    }

    /// Whether this line has too few events to be drawn at full intensity.
    pub fn is_dim(&self, min_event_threshold: usize) -> bool {
        self.num_events() <= min_event_threshold
    }

    pub fn positions(&self) -> &[String] {
        self.event_matrix.positions()
    }

    pub fn means(&self) -> &[Option<f64>] {
        &self.means
    }

    pub fn sems(&self) -> &[Option<f64>] {
        &self.sems
    }

    pub fn stds(&self) -> &[Option<f64>] {
        &self.stds
    }

    /// The upper error boundary, `mean + sem`.
    pub fn error_pos(&self) -> &[Option<f64>] {
        &self.error_pos
    }

    /// The lower error boundary, `mean - sem`.
    pub fn error_neg(&self) -> &[Option<f64>] {
        &self.error_neg
    }

    /// `-log10(p)` of the two-sample KS test at each position, empty until
    /// [`EventStatistics::calculate_ks`] is called.
    pub fn ks_pvalues(&self) -> &[Option<f64>] {
        &self.ks_pvalues
    }

    /// One-sided Mann-Whitney U p-values at each position, empty until
    /// [`EventStatistics::calculate_mannwhitneyu`] is called.
    pub fn mannwhitneyu_pvalues(&self) -> &[Option<f64>] {
        &self.mannwhitneyu_pvalues
    }

    /// Z-scores against a background at each position, empty until
    /// [`EventStatistics::calculate_zscore`] is called.
    pub fn z_scores(&self) -> &[Result<f64, UndefinedStatistic>] {
        &self.z_scores
    }

    /// All z-scores, or the first undefined one as an error.
    pub fn try_z_scores(&self) -> Result<Vec<f64>, RbpMapsError> {
        self.z_scores
            .iter()
            .map(|z| z.clone().map_err(RbpMapsError::from))
            .collect()
    }

    /// One row per position, for tabular output.
    pub fn summary_rows(&self) -> Vec<PositionSummary> {
        (0..self.positions().len())
            .map(|i| PositionSummary {
                position: self.positions()[i].clone(),
                mean: self.means[i],
                sem: self.sems[i],
                std: self.stds[i],
                error_pos: self.error_pos[i],
                error_neg: self.error_neg[i],
                ks_neg_log10_pvalue: self.ks_pvalues.get(i).copied().flatten(),
                mannwhitneyu_pvalue: self.mannwhitneyu_pvalues.get(i).copied().flatten(),
                z_score: self.z_scores.get(i).and_then(|z| z.as_ref().ok().copied()),
            })
            .collect()
    }
}

/// The statistics of one position. Missing values are written as
/// [`crate::io::DEFAULT_TSV`]'s missing value string.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PositionSummary {
    pub position: String,
    #[serde(serialize_with = "serialize_missing")]
    pub mean: Option<f64>,
    #[serde(serialize_with = "serialize_missing")]
    pub sem: Option<f64>,
    #[serde(serialize_with = "serialize_missing")]
    pub std: Option<f64>,
    #[serde(serialize_with = "serialize_missing")]
    pub error_pos: Option<f64>,
    #[serde(serialize_with = "serialize_missing")]
    pub error_neg: Option<f64>,
    #[serde(serialize_with = "serialize_missing")]
    pub ks_neg_log10_pvalue: Option<f64>,
    #[serde(serialize_with = "serialize_missing")]
    pub mannwhitneyu_pvalue: Option<f64>,
    #[serde(serialize_with = "serialize_missing")]
    pub z_score: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utilities::{labels, random_event_matrix};

    const TOLERANCE: f64 = 1e-12;

    fn column_matrix(values: Vec<f64>) -> EventMatrix {
        let n = values.len();
        EventMatrix::from_raw_rows(
            labels("event", n),
            labels("pos", 1),
            values.into_iter().map(|x| vec![x]).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_mean_empty() {
        let numbers: Vec<f64> = vec![];
        assert_eq!(mean(&numbers), None);
        assert_eq!(sample_std(&numbers), None);
    }

    #[test]
    fn test_sample_std() {
        let numbers = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        // population std is 2, the sample std is 2 * sqrt(8/7)
        let expected = 2.0 * (8.0_f64 / 7.0).sqrt();
        assert!((sample_std(&numbers).unwrap() - expected).abs() < TOLERANCE);
        let sem = standard_error(&numbers).unwrap();
        assert!((sem - expected / 8.0_f64.sqrt()).abs() < TOLERANCE);
    }

    #[test]
    fn test_sample_std_single_value() {
        assert_eq!(sample_std(&[3.0]), None);
        assert_eq!(mean(&[3.0]), Some(3.0));
    }

    #[test]
    fn test_drop_count() {
        assert_eq!(drop_count(6, 0.5), 1);
        assert_eq!(drop_count(100, 0.95), 2);
        assert_eq!(drop_count(1000, 1.0), 0);
        assert_eq!(drop_count(3, 0.5), 0);
    }

    #[test]
    fn test_trim() {
        let mut numbers = vec![100.0, 3.0, 1.0, 5.0, 2.0, 4.0];
        assert_eq!(trim(&mut numbers, 0.5), &[2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_trimmed_mean_outlier() {
        let m = column_matrix(vec![1.0, 2.0, 3.0, 4.0, 5.0, 100.0]);
        let stats = EventStatistics::new(m, 0.5).unwrap();
        assert_eq!(stats.means()[0], Some(3.5));
        let expected_std = sample_std(&[2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(stats.stds()[0], Some(expected_std));
    }

    #[test]
    fn test_full_confidence_is_untrimmed() {
        let m = random_event_matrix(101, 12, 0.1);
        let stats = EventStatistics::new(m.clone(), 1.0).unwrap();
        for position in 0..m.npositions() {
            let column = m.column_values(position);
            let mut sorted = column.clone();
            sorted.sort_by(|a, b| a.total_cmp(b));
            assert_eq!(stats.means()[position], mean(&sorted));
            assert_eq!(stats.sems()[position], standard_error(&sorted));
            assert_eq!(stats.stds()[position], sample_std(&sorted));
        }
    }

    #[test]
    fn test_error_boundaries() {
        let m = random_event_matrix(30, 5, 0.0);
        let stats = EventStatistics::new(m, 0.95).unwrap();
        for i in 0..5 {
            let mean = stats.means()[i].unwrap();
            let sem = stats.sems()[i].unwrap();
            assert_eq!(stats.error_pos()[i], Some(mean + sem));
            assert_eq!(stats.error_neg()[i], Some(mean - sem));
        }
    }

    #[test]
    fn test_missing_values_excluded() {
        let m = column_matrix(vec![-1.0, 2.0, 4.0, -1.0]);
        let stats = EventStatistics::new(m, 1.0).unwrap();
        assert_eq!(stats.means()[0], Some(3.0));
    }

    #[test]
    fn test_all_missing_column() {
        let m = column_matrix(vec![-1.0, -1.0]);
        let stats = EventStatistics::new(m, 1.0).unwrap();
        assert_eq!(stats.means()[0], None);
        assert_eq!(stats.error_pos()[0], None);
    }

    #[test]
    fn test_invalid_confidence() {
        let m = column_matrix(vec![1.0, 2.0]);
        assert!(matches!(
            EventStatistics::new(m.clone(), 0.0),
            Err(RbpMapsError::InvalidConfidence(_))
        ));
        assert!(matches!(
            EventStatistics::new(m, 1.5),
            Err(RbpMapsError::InvalidConfidence(_))
        ));
    }

    #[test]
    fn test_is_dim() {
        let m = column_matrix(vec![1.0, 2.0, 3.0]);
        let stats = EventStatistics::new(m, 1.0).unwrap();
        assert!(stats.is_dim(3));
        assert!(!stats.is_dim(2));
    }
}
