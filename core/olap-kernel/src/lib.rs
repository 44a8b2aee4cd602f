//! FILENAME: core/olap-kernel/src/lib.rs
//! Cell-addressing kernel for the OLAP engine.
//!
//! The types here are opaque, hashable keys for the layers above (segment
//! cache, SQL generation, result materialization). They only address and
//! compare cells; they never compute values.
//!
//! Modules:
//! - `bit_key`: Which columns constrain a cached aggregate (subset/union tests)
//! - `cell_key`: Per-axis ordinals of one cell in a result grid
//! - `modulos`: Linear ordinal <-> per-axis position conversion
//! - `error`: Contract violations reported to the caller

pub mod bit_key;
pub mod cell_key;
pub mod error;
pub mod modulos;

pub use bit_key::{BitKey, BitKeyTier, SetPositions, MAX_POSITION, MID_CAPACITY, SMALL_CAPACITY};
pub use cell_key::{CellKey, CellKeyLayout, MAX_SPECIALIZED_ARITY};
pub use error::{KeyError, KeyResult};
pub use modulos::{Modulos, ModulosLayout, MAX_SPECIALIZED_AXES};
