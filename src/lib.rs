//! # rbpmaps
//!
//! Normalization and statistics for RNA-binding protein (RBP) maps.
//!
//! An RBP map shows, for a set of genomic events (e.g. exons included upon
//! knockdown of the protein), the average binding density of the protein
//! at each position around those events, compared against a size-matched
//! input (background) control. This library covers the numerical core:
//!
//!  1. [`normalize`]: turn raw event × position density matrices into
//!     per-event probability distributions, and compare signal against
//!     control by subtraction or divergence.
//!
//!  2. [`statistics`]: trimmed per-position mean, standard error, and
//!     standard deviation of an event matrix.
//!
//!  3. [`significance`]: per-position KS and Mann-Whitney U tests, and
//!     z-scores, of one set of events against a background set.
//!
//! Reading raw alignments and drawing the maps are left to other tools;
//! matrices come in and go out as [`EventMatrix`](matrix::EventMatrix)
//! values, or as TSV files through [`io`].

pub mod commands;
pub mod error;
pub mod io;
pub mod matrix;
pub mod normalize;
pub mod reporting;
pub mod significance;
pub mod statistics;
pub mod test_utilities;
pub mod traits;

pub mod prelude {
    pub use crate::error::{RbpMapsError, UndefinedStatistic};
    pub use crate::io::read_event_matrix;
    pub use crate::matrix::{EventMatrix, Profile, MISSING_SENTINEL};
    pub use crate::normalize::{
        align, calculate_pdf, entropy_of_reads, kl_divergence, normalize,
        normalize_and_per_region_subtract, normalize_and_subtract, AlignmentFill,
    };
    pub use crate::significance::{Alternative, SignificanceTest};
    pub use crate::statistics::EventStatistics;
    pub use crate::traits::TabularTsvSerialize;
}
