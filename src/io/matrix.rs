//! Parsing of density matrix TSV files.
//!
//! A density matrix file has a header line, whose first field names the
//! event column and whose remaining fields are the position labels, then
//! one line per event:
//!
//! ```text
//! event   -300    -299    ...
//! exon_1  0.0     1.2     ...
//! exon_2  -1      0.4     ...
//! ```
//!
//! Lines starting with `#` are skipped. `-1`, `NA`, `nan` and empty fields
//! are missing values. Files may be gzip-compressed.

use std::path::PathBuf;

use super::InputFile;
use crate::error::RbpMapsError;
use crate::matrix::EventMatrix;

/// Parse one field of a density matrix into a raw density, where NaN marks
/// a missing value.
pub fn parse_density(field: &str) -> Result<f64, RbpMapsError> {
    let field = field.trim();
    match field {
        "" | "NA" | "na" | "nan" | "NaN" | "." => Ok(f64::NAN),
        _ => Ok(field.parse::<f64>()?),
    }
}

/// Read a density matrix TSV file into an [`EventMatrix`].
pub fn read_event_matrix(filepath: impl Into<PathBuf>) -> Result<EventMatrix, RbpMapsError> {
    let input_file = InputFile::new(filepath);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .comment(Some(b'#'))
        .has_headers(true)
        .flexible(true)
        .from_reader(input_file.reader()?);

    let header = reader.headers()?.clone();
    let positions: Vec<String> = header.iter().skip(1).map(String::from).collect();
    if positions.is_empty() {
        return Err(RbpMapsError::InvalidMatrixFile(format!(
            "{} has no position columns",
            input_file.filepath.display()
        )));
    }

    let mut events = Vec::new();
    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let mut fields = record.iter();
        let event = fields.next().ok_or_else(|| {
            RbpMapsError::InvalidMatrixFile("empty line in density matrix".to_string())
        })?;
        let row = fields.map(parse_density).collect::<Result<Vec<_>, _>>()?;
        if row.len() != positions.len() {
            return Err(RbpMapsError::RaggedMatrix {
                expected: positions.len(),
                found: row.len(),
            });
        }
        events.push(event.to_string());
        rows.push(row);
    }
    EventMatrix::from_raw_rows(events, positions, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utilities::{random_event_matrix, temp_matrix_file};
    use std::io::Write;

    #[test]
    fn test_parse_density() {
        assert_eq!(parse_density("1.5").unwrap(), 1.5);
        assert_eq!(parse_density("-1").unwrap(), -1.0);
        assert!(parse_density("NA").unwrap().is_nan());
        assert!(parse_density("").unwrap().is_nan());
        assert!(matches!(
            parse_density("abc"),
            Err(RbpMapsError::ParseFloatError(_))
        ));
    }

    #[test]
    fn test_read_event_matrix() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# produced upstream").unwrap();
        writeln!(file, "event\t-1\t0\t1").unwrap();
        writeln!(file, "exon_1\t0\t1.5\t-1").unwrap();
        writeln!(file, "exon_2\tNA\t2\t3").unwrap();
        file.flush().unwrap();

        let m = read_event_matrix(file.path()).unwrap();
        assert_eq!(m.positions(), &["-1", "0", "1"]);
        assert_eq!(m.events().collect::<Vec<_>>(), vec!["exon_1", "exon_2"]);
        assert_eq!(m.get("exon_1", 1), Some(1.5));
        assert_eq!(m.get("exon_1", 2), None);
        assert_eq!(m.get("exon_2", 0), None);
    }

    #[test]
    fn test_read_ragged() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "event\t0\t1").unwrap();
        writeln!(file, "exon_1\t0").unwrap();
        file.flush().unwrap();
        assert!(matches!(
            read_event_matrix(file.path()),
            Err(RbpMapsError::RaggedMatrix { expected: 2, found: 1 })
        ));
    }

    #[test]
    fn test_written_matrix_reads_back() {
        let m = random_event_matrix(10, 4, 0.2);
        let file = temp_matrix_file(&m);
        let read = read_event_matrix(file.path()).unwrap();
        assert_eq!(read.positions(), m.positions());
        assert_eq!(read.nevents(), m.nevents());
        for (a, b) in read.values().iter().zip(m.values().iter()) {
            assert_eq!(a.is_some(), b.is_some());
        }
    }
}
