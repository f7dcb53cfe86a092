//! Implementations of the `rbpmaps` subcommands.
//!
//! Each command reads its density matrices, runs one core operation, writes
//! the result as TSV, and returns a [`Report`] of anything the user should
//! know about (e.g. how many events the density threshold removed).

use std::path::PathBuf;

use tracing::info;

use crate::{
    prelude::*,
    reporting::{CommandOutput, Report},
};

#[cfg(feature = "dev-commands")]
use crate::test_utilities::random_event_matrix;

/// The divergence to compute between signal and control.
#[derive(Clone, Copy, Debug)]
pub enum Divergence {
    /// KL divergence terms between per-event PDFs.
    KullbackLeibler,
    /// Divergence terms in reads-per-million space.
    EntropyOfReads,
}

fn read_matrix(path: &PathBuf) -> Result<EventMatrix, RbpMapsError> {
    let matrix = read_event_matrix(path)?;
    info!(
        path = %path.display(),
        events = matrix.nevents(),
        positions = matrix.npositions(),
        "read density matrix"
    );
    Ok(matrix)
}

/// Add an issue if `threshold` drops any of the events of `matrix`.
fn report_dropped(report: &mut Report, label: &str, matrix: &EventMatrix, threshold: f64) {
    let (_, dropped) = matrix.filter_by_density(threshold);
    if dropped > 0 {
        report.add_issue(format!(
            "{} of {} {} events were removed because their summed density was ≤ {}",
            dropped,
            matrix.nevents(),
            label,
            threshold
        ))
    }
}

/// Add an issue for events that pass the threshold on only one side, since
/// these are compared against a fill value rather than real data.
fn report_unaligned(report: &mut Report, signal: &EventMatrix, control: &EventMatrix, threshold: f64) {
    let (signal, _) = signal.filter_by_density(threshold);
    let (control, _) = control.filter_by_density(threshold);
    let signal_only = signal
        .events()
        .filter(|e| control.event_index(e).is_none())
        .count();
    let control_only = control
        .events()
        .filter(|e| signal.event_index(e).is_none())
        .count();
    if signal_only > 0 || control_only > 0 {
        report.add_issue(format!(
            "{} events are only in the signal and {} only in the control; \
             their missing side was filled",
            signal_only, control_only
        ))
    }
}

/// Normalize a density matrix into per-event PDFs.
pub fn rbpmaps_normalize(
    input: &PathBuf,
    threshold: f64,
    output: Option<&PathBuf>,
) -> Result<CommandOutput<()>, RbpMapsError> {
    let density = read_matrix(input)?;
    let mut report = Report::new();
    report_dropped(&mut report, "input", &density, threshold);

    let pdf = normalize(&density, threshold)?;
    let header = vec![format!("rbpmaps normalize --threshold {}", threshold)];
    pdf.to_tsv_file(output, Some(header))?;
    Ok(CommandOutput::new((), report))
}

/// Subtract the normalized control from the normalized signal, either as
/// mean profiles or per event.
pub fn rbpmaps_subtract(
    signal: &PathBuf,
    control: &PathBuf,
    threshold: f64,
    per_event: bool,
    output: Option<&PathBuf>,
) -> Result<CommandOutput<()>, RbpMapsError> {
    let signal = read_matrix(signal)?;
    let control = read_matrix(control)?;
    let mut report = Report::new();
    report_dropped(&mut report, "signal", &signal, threshold);
    report_dropped(&mut report, "control", &control, threshold);

    let header = vec![format!(
        "rbpmaps subtract --threshold {}{}",
        threshold,
        if per_event { " --per-event" } else { "" }
    )];
    if per_event {
        report_unaligned(&mut report, &signal, &control, threshold);
        let subtracted = normalize_and_per_region_subtract(&signal, &control, threshold)?;
        subtracted.to_tsv_file(output, Some(header))?;
    } else {
        let subtracted = normalize_and_subtract(&signal, &control, threshold)?;
        subtracted.to_tsv_file(output, Some(header))?;
    }
    Ok(CommandOutput::new((), report))
}

/// Compute per-event divergence terms between signal and control, written
/// either as the full matrix or as the mean over events.
pub fn rbpmaps_divergence(
    signal: &PathBuf,
    control: &PathBuf,
    threshold: f64,
    divergence: Divergence,
    mean: bool,
    output: Option<&PathBuf>,
) -> Result<CommandOutput<()>, RbpMapsError> {
    let signal = read_matrix(signal)?;
    let control = read_matrix(control)?;
    let mut report = Report::new();
    report_dropped(&mut report, "signal", &signal, threshold);
    report_dropped(&mut report, "control", &control, threshold);
    report_unaligned(&mut report, &signal, &control, threshold);

    let (name, terms) = match divergence {
        Divergence::KullbackLeibler => ("kl", kl_divergence(&signal, &control, threshold)?),
        Divergence::EntropyOfReads => ("entropy", entropy_of_reads(&signal, &control, threshold)?),
    };
    let header = vec![format!(
        "rbpmaps {} --threshold {}{}",
        name,
        threshold,
        if mean { " --mean" } else { "" }
    )];
    if mean {
        terms.column_means().to_tsv_file(output, Some(header))?;
    } else {
        terms.to_tsv_file(output, Some(header))?;
    }
    Ok(CommandOutput::new((), report))
}

/// Options for [`rbpmaps_stats`] that only apply with a background.
#[derive(Clone, Debug, Default)]
pub struct BackgroundOptions {
    pub background: Option<PathBuf>,
    pub test: Option<SignificanceTest>,
    pub zscore: bool,
}

/// Summarize an event matrix per position, optionally testing it against a
/// background event matrix.
pub fn rbpmaps_stats(
    input: &PathBuf,
    confidence: f64,
    min_events: usize,
    background: &BackgroundOptions,
    output: Option<&PathBuf>,
) -> Result<CommandOutput<EventStatistics>, RbpMapsError> {
    let events = read_matrix(input)?;
    let mut report = Report::new();
    let mut statistics = EventStatistics::new(events, confidence)?;
    if statistics.is_dim(min_events) {
        report.add_issue(format!(
            "only {} events (minimum {}); this line should be drawn dimmed",
            statistics.num_events(),
            min_events
        ));
    }

    if let Some(path) = &background.background {
        let background_events = read_matrix(path)?;
        if let Some(test) = background.test {
            statistics.calculate_and_set_significance(&background_events, test)?;
        }
        if background.zscore {
            let background_statistics = EventStatistics::new(background_events, confidence)?;
            let undefined = statistics.calculate_zscore(&background_statistics)?;
            for issue in undefined {
                report.add_issue(format!("z-score is undefined: {}", issue));
            }
        }
    } else if background.test.is_some() || background.zscore {
        report.add_issue("significance was requested without a background; skipped".to_string());
    }

    let header = vec![format!("rbpmaps stats --confidence {}", confidence)];
    statistics.to_tsv_file(output, Some(header))?;
    Ok(CommandOutput::new(statistics, report))
}

/// Write a random density matrix, for testing.
#[cfg(feature = "dev-commands")]
pub fn rbpmaps_random_matrix(
    nevents: usize,
    npositions: usize,
    missing_fraction: f64,
    output: Option<&PathBuf>,
) -> Result<CommandOutput<()>, RbpMapsError> {
    let matrix = random_event_matrix(nevents, npositions, missing_fraction);
    matrix.to_tsv_file(output, None)?;
    Ok(CommandOutput::new((), Report::new()))
}
