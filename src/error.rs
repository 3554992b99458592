//! Error types for the MODE and LDE optimizers.
//!
//! Structured error handling via `thiserror`, with helper methods for
//! error categorization. Everything here is reported at construction or
//! configuration time; once an optimizer runs, it is a pure computation.

use thiserror::Error;

/// Errors that can occur while configuring or driving an optimizer.
#[derive(Debug, Error)]
pub enum OptError {
    /// The limit vectors disagree on the decision-space dimension.
    #[error("decision space has {nlower} lower limits but {nupper} upper limits")]
    LimitCountMismatch {
        /// Number of lower limits supplied
        nlower: usize,
        /// Number of upper limits supplied
        nupper: usize,
    },

    /// A coordinate's interval is inverted.
    #[error("inverted interval for coordinate {coord}: lower {lower} exceeds upper {upper}")]
    InvertedInterval {
        /// Index of the inverted coordinate
        coord: usize,
        /// The lower limit value
        lower: f64,
        /// The upper limit value
        upper: f64,
    },

    /// The population cannot supply the four distinct slots the donor
    /// draw needs.
    #[error("population of {popsize} cannot supply 4 distinct donor slots")]
    PopulationTooSmall {
        /// The rejected population size
        popsize: usize,
    },

    /// A problem needs at least one objective dimension.
    #[error("number of objectives must be >= 1, got {nobj}")]
    NoObjectives {
        /// The invalid objective count
        nobj: usize,
    },

    /// The integer mask has the wrong dimension.
    #[error("integer mask dimension mismatch: expected {expected}, got {got}")]
    IntMaskDimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension provided
        got: usize,
    },

    /// A matrix handed to `tell_all` has the wrong shape.
    #[error("value matrix shape mismatch: expected {expected_rows}x{expected_cols}, got {rows}x{cols}")]
    ValueShapeMismatch {
        /// Expected number of rows (nobj + ncon)
        expected_rows: usize,
        /// Expected number of columns (popsize)
        expected_cols: usize,
        /// Actual number of rows
        rows: usize,
        /// Actual number of columns
        cols: usize,
    },

    /// The initial guess or sigma vector has the wrong dimension.
    #[error("{name} dimension mismatch: expected {expected}, got {got}")]
    GuessDimensionMismatch {
        /// Name of the offending input
        name: &'static str,
        /// Expected dimension
        expected: usize,
        /// Actual dimension provided
        got: usize,
    },
}

/// A specialized `Result` type for optimizer operations.
pub type Result<T> = std::result::Result<T, OptError>;

impl OptError {
    /// Returns `true` if this is a decision-space error.
    ///
    /// This includes `LimitCountMismatch` and `InvertedInterval`.
    pub fn is_bounds_error(&self) -> bool {
        matches!(
            self,
            OptError::LimitCountMismatch { .. } | OptError::InvertedInterval { .. }
        )
    }

    /// Returns `true` if this is a configuration error.
    ///
    /// This includes `PopulationTooSmall` and `NoObjectives`.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            OptError::PopulationTooSmall { .. } | OptError::NoObjectives { .. }
        )
    }

    /// Returns `true` if this is a dimension mismatch between supplied
    /// inputs.
    ///
    /// This includes `IntMaskDimensionMismatch`, `ValueShapeMismatch`, and
    /// `GuessDimensionMismatch`.
    pub fn is_dimension_error(&self) -> bool {
        matches!(
            self,
            OptError::IntMaskDimensionMismatch { .. }
                | OptError::ValueShapeMismatch { .. }
                | OptError::GuessDimensionMismatch { .. }
        )
    }
}
