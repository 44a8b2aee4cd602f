//! FILENAME: core/olap-kernel/src/error.rs
//! PURPOSE: Contract violations reported by the key types.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("Invalid bit key size: {size}")]
    InvalidSize { size: i64 },

    #[error("Bit key position {pos} exceeds the maximum {max}")]
    PositionOutOfRange { pos: usize, max: usize },

    #[error("Axis {axis} out of range for cell key of arity {arity}")]
    AxisOutOfRange { axis: usize, arity: usize },

    #[error("Arity mismatch: expected {expected} ordinals, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    #[error("Axis {axis} has zero extent")]
    ZeroExtent { axis: usize },

    #[error("Cell count overflows the ordinal range")]
    CellCountOverflow,
}

pub type KeyResult<T> = Result<T, KeyError>;
