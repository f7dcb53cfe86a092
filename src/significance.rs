//! Position-wise significance of an [`EventStatistics`] line against a
//! background.
//!
//! Each test compares, at every position, the present values of the
//! foreground event matrix against those of a background event matrix:
//!
//!  - [`ks_2samp`]: two-sided two-sample Kolmogorov-Smirnov test. Stored as
//!    `-log10(p)`, so `p = 1` is `0` and tiny p-values are large. A p-value
//!    that underflows to zero becomes `+inf`.
//!  - [`mann_whitney_u`]: Mann-Whitney U test. Stored as the raw one-sided
//!    (foreground greater) p-value.
//!
//! Z-scores compare the trimmed means of two [`EventStatistics`], scaled by
//! the background standard deviation.

use clap::ValueEnum;
use statrs::function::{erf::erfc, factorial::ln_binomial};
use tracing::{debug, warn};

use crate::error::{RbpMapsError, UndefinedStatistic};
use crate::matrix::EventMatrix;
use crate::statistics::EventStatistics;

/// Samples up to this size get the exact KS p-value.
pub const KS_MAX_EXACT_N: usize = 10_000;

/// The smaller Mann-Whitney sample must be at most this size (and the data
/// free of ties) for the exact U distribution to be used.
pub const MWU_MAX_EXACT_N: usize = 8;

/// The result of a two-sample test.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TestResult {
    pub statistic: f64,
    pub pvalue: f64,
}

/// The alternative hypothesis of a rank test, stated for the first sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Alternative {
    TwoSided,
    Greater,
    Less,
}

/// The per-position two-sample tests.
#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
pub enum SignificanceTest {
    /// Two-sided Kolmogorov-Smirnov, reported as -log10(p).
    #[value(name = "ks")]
    KolmogorovSmirnov,
    /// One-sided (foreground greater) Mann-Whitney U, reported as p.
    MannWhitneyU,
}

impl SignificanceTest {
    /// Run this test on one position's foreground and background values,
    /// returning the value stored in the corresponding series. `None` if
    /// either side has no values.
    pub fn run(&self, foreground: &[f64], background: &[f64]) -> Option<f64> {
        match self {
            SignificanceTest::KolmogorovSmirnov => {
                ks_2samp(foreground, background).map(|result| -result.pvalue.log10())
            }
            SignificanceTest::MannWhitneyU => {
                mann_whitney_u(foreground, background, Alternative::Greater)
                    .map(|result| result.pvalue)
            }
        }
    }
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut values = values.to_vec();
    values.sort_by(|a, b| a.total_cmp(b));
    values
}

/// Two-sided two-sample Kolmogorov-Smirnov test.
///
/// The statistic is the largest distance between the two empirical CDFs.
/// The p-value is exact (lattice path counting) when neither sample exceeds
/// [`KS_MAX_EXACT_N`] values. Otherwise it is the limiting Kolmogorov
/// distribution at `D * sqrt(m*n / (m + n))`, not the finite-sample
/// one-sample KS distribution at `round(m*n / (m + n))` that SciPy's
/// asymptotic mode uses; the two agree closely at these sample sizes but
/// are not identical. Returns `None` if either sample is empty.
pub fn ks_2samp(x: &[f64], y: &[f64]) -> Option<TestResult> {
    if x.is_empty() || y.is_empty() {
        return None;
    }
    let (x, y) = (sorted(x), sorted(y));
    let (m, n) = (x.len(), y.len());

    // The empirical CDFs are compared at the end of each run of tied values.
    // Scaled by m*n, F_x - F_y at a point is i*n - j*m.
    let (mut i, mut j, mut scaled_d) = (0, 0, 0);
    while i < m && j < n {
        let value = x[i].min(y[j]);
        while i < m && x[i] <= value {
            i += 1;
        }
        while j < n && y[j] <= value {
            j += 1;
        }
        scaled_d = scaled_d.max((i * n).abs_diff(j * m));
    }
    let statistic = scaled_d as f64 / (m * n) as f64;

    let pvalue = if m.max(n) <= KS_MAX_EXACT_N {
        ks_exact_pvalue(m, n, scaled_d)
    } else {
        let effective_n = ((m * n) as f64 / (m + n) as f64).sqrt();
        kolmogorov_sf(statistic * effective_n)
    };
    Some(TestResult {
        statistic,
        pvalue: pvalue.clamp(0.0, 1.0),
    })
}

/// P(D >= d) for two samples of sizes `m` and `n`, with `d` scaled by `m*n`.
///
/// Sums, over the lattice nodes where a monotone path from (0, 0) to (m, n)
/// first leaves the band `|i*n - j*m| < d`, the probability that a uniformly
/// random path first leaves there. Every term is non-negative, so tiny
/// p-values keep their precision. The share of paths reaching each node
/// without leaving the band is kept as a fraction of all paths to that node.
fn ks_exact_pvalue(m: usize, n: usize, scaled_d: usize) -> f64 {
    if scaled_d == 0 {
        return 1.0;
    }
    let inside = |i: usize, j: usize| (i * n).abs_diff(j * m) < scaled_d;
    let ln_paths = ln_binomial((m + n) as u64, m as u64);
    let mut outside = 0.0;
    let mut previous = vec![0.0; n + 1];
    let mut current = vec![0.0; n + 1];
    for i in 0..=m {
        for j in 0..=n {
            let fraction = if i == 0 && j == 0 {
                1.0
            } else {
                let total = (i + j) as f64;
                let mut fraction = 0.0;
                if i > 0 {
                    fraction += previous[j] * i as f64 / total;
                }
                if j > 0 {
                    fraction += current[j - 1] * j as f64 / total;
                }
                fraction
            };
            current[j] = if inside(i, j) {
                fraction
            } else {
                if fraction > 0.0 {
                    // paths to (i, j), times paths from (i, j) on to (m, n)
                    let ln_through = ln_binomial((i + j) as u64, i as u64)
                        + ln_binomial((m + n - i - j) as u64, (m - i) as u64)
                        - ln_paths;
                    outside += fraction * ln_through.exp();
                }
                0.0
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }
    outside
}

/// The survival function of the Kolmogorov distribution.
fn kolmogorov_sf(lambda: f64) -> f64 {
    if lambda <= 0.0 {
        return 1.0;
    }
    if lambda < 1.18 {
        // Q = 1 - sqrt(2*pi)/lambda * sum exp(-(2k-1)^2 pi^2 / (8 lambda^2))
        let y = -std::f64::consts::PI.powi(2) / (8.0 * lambda * lambda);
        let cdf: f64 = (1..=20)
            .map(|k| {
                let odd = (2 * k - 1) as f64;
                (odd * odd * y).exp()
            })
            .sum::<f64>()
            * (2.0 * std::f64::consts::PI).sqrt()
            / lambda;
        1.0 - cdf
    } else {
        // Q = 2 * sum (-1)^(k-1) exp(-2 k^2 lambda^2)
        let mut sum = 0.0;
        let mut sign = 1.0;
        for k in 1..=100 {
            let k = k as f64;
            let term = (-2.0 * k * k * lambda * lambda).exp();
            sum += sign * term;
            if term < 1e-16 {
                break;
            }
            sign = -sign;
        }
        2.0 * sum
    }
}

/// Mann-Whitney U test of `x` against `y`.
///
/// The statistic is U for `x`. The p-value comes from the exact null
/// distribution of U when the smaller sample has at most
/// [`MWU_MAX_EXACT_N`] values and there are no ties, and otherwise from the
/// normal approximation with tie and continuity corrections. Returns `None`
/// if either sample is empty.
pub fn mann_whitney_u(x: &[f64], y: &[f64], alternative: Alternative) -> Option<TestResult> {
    if x.is_empty() || y.is_empty() {
        return None;
    }
    let (n1, n2) = (x.len(), y.len());
    let n = n1 + n2;

    let mut pooled: Vec<(f64, bool)> = x
        .iter()
        .map(|v| (*v, true))
        .chain(y.iter().map(|v| (*v, false)))
        .collect();
    pooled.sort_by(|a, b| a.0.total_cmp(&b.0));

    // Average ranks over runs of ties.
    let mut rank_sum_x = 0.0;
    let mut tie_term = 0.0;
    let mut start = 0;
    while start < n {
        let mut end = start;
        while end < n && pooled[end].0 == pooled[start].0 {
            end += 1;
        }
        let average_rank = (start + 1 + end) as f64 / 2.0;
        let from_x = pooled[start..end].iter().filter(|(_, is_x)| *is_x).count();
        rank_sum_x += average_rank * from_x as f64;
        let t = (end - start) as f64;
        tie_term += t * t * t - t;
        start = end;
    }

    let u1 = rank_sum_x - (n1 * (n1 + 1)) as f64 / 2.0;
    let u2 = (n1 * n2) as f64 - u1;

    let (u, factor) = match alternative {
        Alternative::Greater => (u1, 1.0),
        Alternative::Less => (u2, 1.0),
        Alternative::TwoSided => (u1.max(u2), 2.0),
    };

    let exact = n1.min(n2) <= MWU_MAX_EXACT_N && tie_term == 0.0;
    let sf = if exact {
        mwu_exact_sf(u, n1.min(n2), n1.max(n2))
    } else {
        let mu = (n1 * n2) as f64 / 2.0;
        let n = n as f64;
        let variance = (n1 * n2) as f64 / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)));
        if variance <= 0.0 {
            // every value is tied
            1.0
        } else {
            let z = (u - mu - 0.5) / variance.sqrt();
            standard_normal_sf(z)
        }
    };

    Some(TestResult {
        statistic: u1,
        pvalue: (sf * factor).clamp(0.0, 1.0),
    })
}

fn standard_normal_sf(z: f64) -> f64 {
    0.5 * erfc(z / std::f64::consts::SQRT_2)
}

/// P(U >= u) under the null, for samples of sizes `m <= n` without ties.
///
/// By symmetry this is P(U <= m*n - u). The frequency of U = k is the
/// number of partitions of k into at most `m` parts of size at most `n`.
/// Below `n + 1` the size bound never binds, so the lower tail is counted
/// purely additively and stays exact however small it is. Longer tails are
/// not small, and are read off the full Gaussian binomial coefficient.
fn mwu_exact_sf(u: f64, m: usize, n: usize) -> f64 {
    let max_u = m * n;
    let first = u.ceil().max(0.0) as usize;
    if first == 0 {
        return 1.0;
    }
    if first > max_u {
        return 0.0;
    }
    let last = max_u - first;
    if last <= n {
        let tail: f64 = partition_counts(m, last).iter().sum();
        (tail.ln() - ln_binomial((m + n) as u64, m as u64)).exp()
    } else {
        let counts = gaussian_binomial_counts(m, n);
        let total: f64 = counts.iter().sum();
        counts[..=last].iter().sum::<f64>() / total
    }
}

/// The number of partitions of each of `0..=max_k` into at most `m` parts.
fn partition_counts(m: usize, max_k: usize) -> Vec<f64> {
    let mut counts = vec![0.0; max_k + 1];
    counts[0] = 1.0;
    for i in 1..=m {
        for k in i..=max_k {
            counts[k] += counts[k - i];
        }
    }
    counts
}

/// The coefficients of `[m + n choose m]_q`, built up as
/// `prod_{i=1..m} (1 - q^(n+i)) / (1 - q^i)`.
fn gaussian_binomial_counts(m: usize, n: usize) -> Vec<f64> {
    let max_u = m * n;
    let mut counts = vec![0.0; max_u + 1];
    counts[0] = 1.0;
    for i in 1..=m {
        // multiply by (1 - q^(n+i))
        for k in (n + i..=max_u).rev() {
            counts[k] -= counts[k - n - i];
        }
        // divide by (1 - q^i)
        for k in i..=max_u {
            counts[k] += counts[k - i];
        }
    }
    counts
}

impl EventStatistics {
    /// Run `test` at each position against `background` and return the
    /// per-position series.
    fn position_tests(
        &self,
        background: &EventMatrix,
        test: SignificanceTest,
    ) -> Result<Vec<Option<f64>>, RbpMapsError> {
        self.event_matrix.ensure_same_positions(background)?;
        let series = (0..self.event_matrix.npositions())
            .map(|position| {
                let foreground = self.event_matrix.column_values(position);
                let background = background.column_values(position);
                let value = test.run(&foreground, &background);
                debug!(position, ?test, ?value, "position test");
                value
            })
            .collect();
        Ok(series)
    }

    /// Compute the `-log10(p)` of a two-sample KS test between this line's
    /// events and `background` at each position.
    pub fn calculate_ks(&mut self, background: &EventMatrix) -> Result<(), RbpMapsError> {
        self.ks_pvalues = self.position_tests(background, SignificanceTest::KolmogorovSmirnov)?;
        Ok(())
    }

    /// Compute the one-sided (this line greater) Mann-Whitney U p-value
    /// against `background` at each position.
    pub fn calculate_mannwhitneyu(&mut self, background: &EventMatrix) -> Result<(), RbpMapsError> {
        self.mannwhitneyu_pvalues =
            self.position_tests(background, SignificanceTest::MannWhitneyU)?;
        Ok(())
    }

    /// Compute `test` against `background` and store it in the matching
    /// series.
    pub fn calculate_and_set_significance(
        &mut self,
        background: &EventMatrix,
        test: SignificanceTest,
    ) -> Result<(), RbpMapsError> {
        match test {
            SignificanceTest::KolmogorovSmirnov => self.calculate_ks(background),
            SignificanceTest::MannWhitneyU => self.calculate_mannwhitneyu(background),
        }
    }

    /// Compute `(mean - background mean) / background std` at each position.
    ///
    /// A position where the background standard deviation is zero, or where
    /// a mean or standard deviation is undefined, stores an
    /// [`UndefinedStatistic`]; the other positions are still computed. The
    /// undefined positions are also returned.
    pub fn calculate_zscore(
        &mut self,
        background: &EventStatistics,
    ) -> Result<Vec<UndefinedStatistic>, RbpMapsError> {
        self.event_matrix
            .ensure_same_positions(&background.event_matrix)?;

        let z_scores: Vec<Result<f64, UndefinedStatistic>> = self
            .positions()
            .iter()
            .enumerate()
            .map(|(i, position)| {
                let missing = || UndefinedStatistic::MissingValue(position.clone());
                let mean = self.means()[i].ok_or_else(missing)?;
                let background_mean = background.means()[i].ok_or_else(missing)?;
                let background_std = background.stds()[i].ok_or_else(missing)?;
                if background_std == 0.0 {
                    return Err(UndefinedStatistic::ZeroBackgroundDeviation(
                        position.clone(),
                    ));
                }
                Ok((mean - background_mean) / background_std)
            })
            .collect();

        let undefined: Vec<UndefinedStatistic> = z_scores
            .iter()
            .filter_map(|z| z.as_ref().err().cloned())
            .collect();
        for issue in &undefined {
            warn!("z-score undefined: {}", issue);
        }
        self.z_scores = z_scores;
        Ok(undefined)
    }
}
