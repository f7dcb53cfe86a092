//! Traits used by the rbpmaps library.
//!

use std::path::PathBuf;

use crate::{error::RbpMapsError, io::TsvConfig};

/// Defines how to serialize something to TSV.
pub trait TsvSerialize {
    /// Serialize something to a TSV [`String`].
    fn to_tsv(&self, config: &TsvConfig) -> String;
}

/// The [`TabularTsvSerialize`] trait defines how to write a whole table
/// (a matrix, a profile, or per-position statistics) to a TSV file.
pub trait TabularTsvSerialize {
    /// Write the TSV version of this table to `output`, or standard output
    /// if `None`. `header` lines are written first as `#` comments.
    fn to_tsv_file(
        &self,
        output: Option<impl Into<PathBuf>>,
        header: Option<Vec<String>>,
    ) -> Result<(), RbpMapsError>;
}
