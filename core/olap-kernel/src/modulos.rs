//! FILENAME: core/olap-kernel/src/modulos.rs
//! PURPOSE: Mixed-radix mapping between a linear cell ordinal and per-axis positions.
//! CONTEXT: A result grid with axis extents e0..e(n-1) stores its cells in a
//! flat array of Π ei slots. Axis 0 varies fastest:
//!
//!   ordinal = pos[0] + pos[1]*e0 + pos[2]*e0*e1 + ...
//!
//! `create` picks a hand-unrolled layout for up to three axes and the generic
//! cumulative-product algorithm otherwise. `create_many` always uses the
//! generic algorithm so the unrolled paths can be checked against it.
//!
//! Ordinals outside `[0, cell_count)` and position vectors of the wrong
//! length are caller errors. Out-of-range ordinals wrap (the last axis is
//! taken modulo its extent) identically in every layout.

use log::trace;
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};

use crate::cell_key::CellKey;
use crate::error::{KeyError, KeyResult};

/// Largest axis count with an unrolled layout.
pub const MAX_SPECIALIZED_AXES: usize = 3;

const INLINE_AXES: usize = 8;

type AxisVec = SmallVec<[usize; INLINE_AXES]>;

/// Internal layout of a Modulos (introspection only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModulosLayout {
    Zero,
    One,
    Two,
    Three,
    Many,
}

#[derive(Debug, Clone)]
enum Repr {
    Zero,
    One(usize),
    Two(usize, usize),
    Three(usize, usize, usize),
    /// `modulos[i]` is the product of the extents of axes `0..i`, so
    /// `modulos[0] == 1` and `modulos[n]` is the cell count.
    Many { modulos: AxisVec },
}

/// Ordinal/position converter for one result shape. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct Modulos {
    extents: AxisVec,
    cell_count: usize,
    repr: Repr,
}

impl Modulos {
    /// Builds a converter using the fastest layout for the axis count.
    pub fn create(extents: &[usize]) -> KeyResult<Modulos> {
        let cell_count = Self::validate(extents)?;
        let repr = match *extents {
            [] => Repr::Zero,
            [e0] => Repr::One(e0),
            [e0, e1] => Repr::Two(e0, e1),
            [e0, e1, e2] => Repr::Three(e0, e1, e2),
            _ => Self::generic_repr(extents),
        };
        let modulos = Modulos {
            extents: SmallVec::from_slice(extents),
            cell_count,
            repr,
        };
        trace!("modulos: extents {:?} use {:?} layout", extents, modulos.layout());
        Ok(modulos)
    }

    /// Builds a converter that always uses the generic algorithm.
    pub fn create_many(extents: &[usize]) -> KeyResult<Modulos> {
        let cell_count = Self::validate(extents)?;
        trace!("modulos: extents {:?} forced to generic layout", extents);
        Ok(Modulos {
            extents: SmallVec::from_slice(extents),
            cell_count,
            repr: Self::generic_repr(extents),
        })
    }

    /// Checks every extent is positive and returns the cell count.
    fn validate(extents: &[usize]) -> KeyResult<usize> {
        extents
            .iter()
            .enumerate()
            .try_fold(1usize, |count, (axis, &extent)| {
                if extent == 0 {
                    return Err(KeyError::ZeroExtent { axis });
                }
                count.checked_mul(extent).ok_or(KeyError::CellCountOverflow)
            })
    }

    fn generic_repr(extents: &[usize]) -> Repr {
        let mut modulos: AxisVec = SmallVec::with_capacity(extents.len() + 1);
        let mut product = 1;
        modulos.push(product);
        for &extent in extents {
            product *= extent;
            modulos.push(product);
        }
        Repr::Many { modulos }
    }

    pub fn layout(&self) -> ModulosLayout {
        match self.repr {
            Repr::Zero => ModulosLayout::Zero,
            Repr::One(_) => ModulosLayout::One,
            Repr::Two(..) => ModulosLayout::Two,
            Repr::Three(..) => ModulosLayout::Three,
            Repr::Many { .. } => ModulosLayout::Many,
        }
    }

    pub fn axis_count(&self) -> usize {
        self.extents.len()
    }

    pub fn extents(&self) -> &[usize] {
        &self.extents
    }

    /// Number of cells in the grid (1 for a zero-axis grid).
    pub fn cell_count(&self) -> usize {
        self.cell_count
    }

    /// Decomposes an ordinal into one position per axis.
    pub fn get_cell_pos(&self, ordinal: usize) -> Vec<usize> {
        let mut pos = vec![0; self.axis_count()];
        self.get_cell_pos_into(ordinal, &mut pos);
        pos
    }

    /// Decomposes an ordinal into a caller-provided buffer.
    ///
    /// # Panics
    /// Panics if `pos.len()` differs from the axis count.
    pub fn get_cell_pos_into(&self, ordinal: usize, pos: &mut [usize]) {
        assert_eq!(
            pos.len(),
            self.axis_count(),
            "position buffer length must equal the axis count"
        );
        match &self.repr {
            Repr::Zero => {}
            Repr::One(e0) => {
                pos[0] = ordinal % e0;
            }
            Repr::Two(e0, e1) => {
                pos[0] = ordinal % e0;
                pos[1] = (ordinal / e0) % e1;
            }
            Repr::Three(e0, e1, e2) => {
                pos[0] = ordinal % e0;
                let rest = ordinal / e0;
                pos[1] = rest % e1;
                pos[2] = (rest / e1) % e2;
            }
            Repr::Many { modulos } => {
                for (axis, slot) in pos.iter_mut().enumerate() {
                    *slot = (ordinal % modulos[axis + 1]) / modulos[axis];
                }
            }
        }
    }

    /// Composes per-axis positions into a linear ordinal.
    ///
    /// # Panics
    /// Panics if `pos.len()` differs from the axis count.
    pub fn get_cell_ordinal(&self, pos: &[usize]) -> usize {
        assert_eq!(
            pos.len(),
            self.axis_count(),
            "position vector length must equal the axis count"
        );
        match &self.repr {
            Repr::Zero => 0,
            Repr::One(_) => pos[0],
            Repr::Two(e0, _) => pos[1] * e0 + pos[0],
            Repr::Three(e0, e1, _) => (pos[2] * e1 + pos[1]) * e0 + pos[0],
            Repr::Many { modulos } => pos
                .iter()
                .zip(modulos.iter())
                .map(|(p, m)| p * m)
                .sum(),
        }
    }

    /// Decomposes an ordinal straight into a CellKey.
    pub fn get_cell_key(&self, ordinal: usize) -> CellKey {
        let mut pos: AxisVec = smallvec![0; self.axis_count()];
        self.get_cell_pos_into(ordinal, &mut pos);
        CellKey::from_ordinals(&pos)
    }

    /// Composes the ordinal addressed by a CellKey.
    pub fn get_cell_key_ordinal(&self, key: &CellKey) -> KeyResult<usize> {
        if key.size() != self.axis_count() {
            return Err(KeyError::ArityMismatch {
                expected: self.axis_count(),
                actual: key.size(),
            });
        }
        Ok(self.get_cell_ordinal(key.ordinals()))
    }
}

impl PartialEq for Modulos {
    fn eq(&self, other: &Self) -> bool {
        self.extents == other.extents
    }
}

impl Eq for Modulos {}

impl TryFrom<Vec<usize>> for Modulos {
    type Error = KeyError;

    fn try_from(extents: Vec<usize>) -> Result<Self, Self::Error> {
        Modulos::create(&extents)
    }
}

impl From<Modulos> for Vec<usize> {
    fn from(modulos: Modulos) -> Self {
        modulos.extents.to_vec()
    }
}
