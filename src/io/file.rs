//! Input/Output file handling with [`InputFile`] and [`OutputFile`].
//!
//! These types abstract over reading/writing both plaintext and gzip-compressed
//! input/output.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::Write;
use std::io::{self, BufWriter};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// Check if a file is a gzipped by looking for the magic numbers
fn is_gzipped_file(file_path: &Path) -> io::Result<bool> {
    let mut file = File::open(file_path)?;
    let mut buffer = [0; 2];
    match file.read_exact(&mut buffer) {
        Ok(()) => Ok(buffer == [0x1f, 0x8b]),
        // files shorter than the magic number are plaintext
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Represents an input file.
///
/// This abstracts how data is read in, allowing for both plaintext and
/// gzip-compressed input to be read through a common interface.
#[derive(Clone, Debug)]
pub struct InputFile {
    pub filepath: PathBuf,
}

impl InputFile {
    /// Constructs a new `InputFile`.
    ///
    /// # Arguments
    ///
    /// * `filepath` - The path to the file. Gzip-compressed files are detected
    /// by their magic number and uncompressed automatically.
    pub fn new(filepath: impl Into<PathBuf>) -> Self {
        Self {
            filepath: filepath.into(),
        }
    }

    /// Opens the file and returns a buffered reader.
    pub fn reader(&self) -> io::Result<BufReader<Box<dyn Read>>> {
        let file = File::open(&self.filepath)?;
        let reader: Box<dyn Read> = if is_gzipped_file(&self.filepath)? {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };
        Ok(BufReader::new(reader))
    }
}

enum OutputDestination {
    File(PathBuf),
    Stdout,
}

/// Represents an output file.
///
/// This abstracts writing both plaintext and gzip-compressed files.
pub struct OutputFile {
    destination: OutputDestination,
    pub header: Option<Vec<String>>,
}

impl OutputFile {
    /// Constructs a new `OutputFile`.
    ///
    /// # Arguments
    ///
    /// * `filepath` - The path to the file. If the file extension is `.gz`,
    /// `OutputFile` will write gzip-compressed output.
    /// * `header` - Optional comment lines written (prefixed with `#`) before
    /// any data.
    pub fn new(filepath: impl Into<PathBuf>, header: Option<Vec<String>>) -> Self {
        Self {
            destination: OutputDestination::File(filepath.into()),
            header,
        }
    }

    /// Constructs a new [`OutputFile`] for standard output.
    pub fn new_stdout(header: Option<Vec<String>>) -> Self {
        Self {
            destination: OutputDestination::Stdout,
            header,
        }
    }

    /// Opens the file and returns a writer, writing the header if one is set.
    pub fn writer(&self) -> io::Result<Box<dyn Write>> {
        let mut writer: Box<dyn Write> = match &self.destination {
            OutputDestination::File(path) => {
                let is_gzip = path.extension().map_or(false, |ext| ext == "gz");
                if is_gzip {
                    Box::new(BufWriter::new(GzEncoder::new(
                        File::create(path)?,
                        Compression::default(),
                    )))
                } else {
                    Box::new(BufWriter::new(File::create(path)?))
                }
            }
            OutputDestination::Stdout => Box::new(BufWriter::new(io::stdout())),
        };
        if let Some(entries) = &self.header {
            for entry in entries {
                writeln!(writer, "#{}", entry)?;
            }
        }
        Ok(writer)
    }
}
