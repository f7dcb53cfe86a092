//! TSV Serializing helpers, functionality, etc.

use lazy_static::lazy_static;
use serde::Serializer;
use std::io::Write;
use std::path::PathBuf;

use super::OutputFile;
use crate::error::RbpMapsError;
use crate::matrix::{EventMatrix, Profile};
use crate::statistics::EventStatistics;
use crate::traits::{TabularTsvSerialize, TsvSerialize};

lazy_static! {
    /// The standard TSV configuration, which prints missing values as `NA`.
    pub static ref DEFAULT_TSV: TsvConfig = TsvConfig {
        no_value_string: "NA".to_string(),
    };
}

/// This is an extensible type to handle common
/// TSV output configurations, e.g. what to print
/// for missing values.
pub struct TsvConfig {
    pub no_value_string: String,
}

impl TsvSerialize for Option<f64> {
    fn to_tsv(&self, config: &TsvConfig) -> String {
        self.map_or(config.no_value_string.clone(), |x| x.to_string())
    }
}

/// Serialize an optional value for a `csv` writer, writing missing values
/// as [`DEFAULT_TSV`] does.
pub(crate) fn serialize_missing<S: Serializer>(
    value: &Option<f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(value) => serializer.serialize_f64(*value),
        None => serializer.serialize_str(&DEFAULT_TSV.no_value_string),
    }
}

impl<U: TsvSerialize> TsvSerialize for Vec<U> {
    fn to_tsv(&self, config: &TsvConfig) -> String {
        self.iter()
            .map(|x| x.to_tsv(config))
            .collect::<Vec<_>>()
            .join("\t")
    }
}

impl TsvSerialize for EventMatrix {
    /// The header line (`event` and the position labels), then one line per
    /// event.
    fn to_tsv(&self, config: &TsvConfig) -> String {
        let mut lines = Vec::with_capacity(self.nevents() + 1);
        lines.push(format!("event\t{}", self.positions().join("\t")));
        for (event, row) in self.events().zip(self.values().outer_iter()) {
            let values = row.to_vec().to_tsv(config);
            lines.push(format!("{}\t{}", event, values));
        }
        lines.join("\n")
    }
}

impl TsvSerialize for Profile {
    /// One `position\tvalue` line per position, after a header line.
    fn to_tsv(&self, config: &TsvConfig) -> String {
        let mut lines = Vec::with_capacity(self.len() + 1);
        lines.push("position\tvalue".to_string());
        for (position, value) in self.positions().iter().zip(self.values().iter()) {
            lines.push(format!("{}\t{}", position, value.to_tsv(config)));
        }
        lines.join("\n")
    }
}

fn write_tsv<T: TsvSerialize>(
    table: &T,
    output: Option<impl Into<PathBuf>>,
    header: Option<Vec<String>>,
) -> Result<(), RbpMapsError> {
    let output = output.map_or(OutputFile::new_stdout(header.clone()), |file| {
        OutputFile::new(file, header)
    });
    let mut writer = output.writer()?;
    writeln!(writer, "{}", table.to_tsv(&DEFAULT_TSV))?;
    writer.flush()?;
    Ok(())
}

impl TabularTsvSerialize for EventMatrix {
    fn to_tsv_file(
        &self,
        output: Option<impl Into<PathBuf>>,
        header: Option<Vec<String>>,
    ) -> Result<(), RbpMapsError> {
        write_tsv(self, output, header)
    }
}

impl TabularTsvSerialize for Profile {
    fn to_tsv_file(
        &self,
        output: Option<impl Into<PathBuf>>,
        header: Option<Vec<String>>,
    ) -> Result<(), RbpMapsError> {
        write_tsv(self, output, header)
    }
}

impl TabularTsvSerialize for EventStatistics {
    /// One row per position of [`crate::statistics::PositionSummary`],
    /// with a header row of field names. Missing values are `NA`.
    fn to_tsv_file(
        &self,
        output: Option<impl Into<PathBuf>>,
        header: Option<Vec<String>>,
    ) -> Result<(), RbpMapsError> {
        let output = output.map_or(OutputFile::new_stdout(header.clone()), |file| {
            OutputFile::new(file, header)
        });
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(output.writer()?);
        for row in self.summary_rows() {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}
