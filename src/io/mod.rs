//! Types and methods for reading density matrices and writing results.

pub mod file;
pub mod matrix;
pub mod tsv;

pub use file::{InputFile, OutputFile};
pub use matrix::read_event_matrix;
pub use tsv::{TsvConfig, DEFAULT_TSV};
