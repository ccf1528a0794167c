use std::fmt;

use thiserror::Error;

use crate::frame::apply::Arity;

/// The three axes a [`Selection`](crate::Selection) can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectAxis {
    Rows,
    Columns,
    Wavelengths,
}

impl fmt::Display for SelectAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectAxis::Rows => write!(f, "rows"),
            SelectAxis::Columns => write!(f, "columns"),
            SelectAxis::Wavelengths => write!(f, "wavelengths"),
        }
    }
}

/// Errors raised while building, slicing, combining or reducing a frame.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
    #[error("wavelength axis has {got} values but the matrix has {expected} columns")]
    WavelengthLenMismatch { expected: usize, got: usize },

    #[error("metadata has {got} rows but the matrix has {expected} rows")]
    MetadataRowMismatch { expected: usize, got: usize },

    #[error("wavelength {0} is repeated or not a number")]
    DuplicateWavelength(f64),

    #[error("row {row} has {got} values, expected {expected}")]
    RaggedRows {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("metadata column '{column}' has {got} values, expected {expected}")]
    MetadataShape {
        column: String,
        expected: usize,
        got: usize,
    },

    #[error("metadata column '{0}' appears more than once")]
    DuplicateColumn(String),

    #[error("row label '{0}' appears more than once")]
    DuplicateLabel(String),

    #[error("label '{label}' not found on {axis}")]
    LabelNotFound { axis: SelectAxis, label: String },

    #[error("position {position} is out of bounds for {axis} of length {len}")]
    PositionOutOfBounds {
        axis: SelectAxis,
        position: i64,
        len: usize,
    },

    #[error("invalid selector on {axis}: {reason}")]
    InvalidSelector { axis: SelectAxis, reason: String },

    #[error("matrix of shape {right:?} cannot be broadcast to shape {left:?}")]
    ShapeMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },

    #[error("reduction returned {got} for slice {slice}, but {expected} for slice 0")]
    RaggedReduction {
        slice: usize,
        expected: Arity,
        got: Arity,
    },

    #[error("unknown reduction: {0}")]
    UnknownReduction(String),

    #[error("invalid arguments for reduction '{name}': {reason}")]
    InvalidReductionArgs { name: String, reason: String },

    #[error("axis {0} does not exist, expected 0 or 1")]
    InvalidAxis(usize),

    #[error("spectrum {index} does not share the wavelength axis of spectrum 0")]
    SpectrumAxisMismatch { index: usize },

    #[error("invalid metadata records: {0}")]
    InvalidRecords(String),
}

pub type Result<T> = std::result::Result<T, FrameError>;
