//! FILENAME: core/olap-kernel/src/cell_key.rs
//! PURPOSE: Fixed-arity coordinate of one cell in a multidimensional result.
//! CONTEXT: A CellKey holds one ordinal per axis. Result materializers create
//! millions of these, so small arities get inline fixed-size layouts and
//! larger ones fall back to a generic vector layout. Equality and hashing
//! only look at the ordinals, never at the layout.
//!
//! The zero-arity key has no axes and therefore nothing to mutate. Every
//! request for one yields the same shared constant (`CellKey::zero()`).

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{KeyError, KeyResult};

/// Largest arity with a dedicated inline layout.
pub const MAX_SPECIALIZED_ARITY: usize = 4;

/// Ordinals the generic layout keeps inline before spilling to the heap.
const INLINE_ORDINALS: usize = 8;

static ZERO_KEY: CellKey = CellKey::ZERO;

/// Internal layout of a CellKey (introspection only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKeyLayout {
    Zero,
    One,
    Two,
    Three,
    Four,
    Many,
}

#[derive(Debug, Clone)]
enum Repr {
    Zero,
    One([usize; 1]),
    Two([usize; 2]),
    Three([usize; 3]),
    Four([usize; 4]),
    Many(SmallVec<[usize; INLINE_ORDINALS]>),
}

/// Per-axis ordinals identifying one cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "Vec<usize>", from = "Vec<usize>")]
pub struct CellKey {
    repr: Repr,
}

impl CellKey {
    /// The zero-dimensional key.
    pub const ZERO: CellKey = CellKey { repr: Repr::Zero };

    /// Returns the process-wide zero-dimensional key.
    pub fn zero() -> &'static CellKey {
        &ZERO_KEY
    }

    /// Creates a zero-filled key of the given arity.
    pub fn new_cell_key(arity: usize) -> CellKey {
        let repr = match arity {
            0 => Repr::Zero,
            1 => Repr::One([0; 1]),
            2 => Repr::Two([0; 2]),
            3 => Repr::Three([0; 3]),
            4 => Repr::Four([0; 4]),
            _ => Repr::Many(SmallVec::from_elem(0, arity)),
        };
        CellKey { repr }
    }

    /// Creates a key whose arity and initial ordinals come from `ordinals`.
    pub fn from_ordinals(ordinals: &[usize]) -> CellKey {
        let repr = match *ordinals {
            [] => Repr::Zero,
            [a] => Repr::One([a]),
            [a, b] => Repr::Two([a, b]),
            [a, b, c] => Repr::Three([a, b, c]),
            [a, b, c, d] => Repr::Four([a, b, c, d]),
            _ => Repr::Many(SmallVec::from_slice(ordinals)),
        };
        CellKey { repr }
    }

    /// Creates a zero-filled key that always uses the generic layout, even for
    /// arities that have an inline layout.
    pub fn new_many_cell_key(arity: usize) -> CellKey {
        CellKey {
            repr: Repr::Many(SmallVec::from_elem(0, arity)),
        }
    }

    pub fn layout(&self) -> CellKeyLayout {
        match self.repr {
            Repr::Zero => CellKeyLayout::Zero,
            Repr::One(_) => CellKeyLayout::One,
            Repr::Two(_) => CellKeyLayout::Two,
            Repr::Three(_) => CellKeyLayout::Three,
            Repr::Four(_) => CellKeyLayout::Four,
            Repr::Many(_) => CellKeyLayout::Many,
        }
    }

    /// Number of axes.
    pub fn size(&self) -> usize {
        self.ordinals().len()
    }

    /// Borrowed view of the ordinals.
    pub fn ordinals(&self) -> &[usize] {
        match &self.repr {
            Repr::Zero => &[],
            Repr::One(o) => o,
            Repr::Two(o) => o,
            Repr::Three(o) => o,
            Repr::Four(o) => o,
            Repr::Many(o) => o,
        }
    }

    fn ordinals_mut(&mut self) -> &mut [usize] {
        match &mut self.repr {
            Repr::Zero => &mut [],
            Repr::One(o) => o,
            Repr::Two(o) => o,
            Repr::Three(o) => o,
            Repr::Four(o) => o,
            Repr::Many(o) => o,
        }
    }

    pub fn get_axis(&self, axis: usize) -> KeyResult<usize> {
        self.ordinals()
            .get(axis)
            .copied()
            .ok_or(KeyError::AxisOutOfRange { axis, arity: self.size() })
    }

    pub fn set_axis(&mut self, axis: usize, value: usize) -> KeyResult<()> {
        let arity = self.size();
        match self.ordinals_mut().get_mut(axis) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(KeyError::AxisOutOfRange { axis, arity }),
        }
    }

    /// Returns a copy of the ordinals.
    pub fn get_ordinals(&self) -> Vec<usize> {
        self.ordinals().to_vec()
    }

    /// Replaces all ordinals. The key is left untouched on `ArityMismatch`.
    pub fn set_ordinals(&mut self, values: &[usize]) -> KeyResult<()> {
        let target = self.ordinals_mut();
        if values.len() != target.len() {
            return Err(KeyError::ArityMismatch {
                expected: target.len(),
                actual: values.len(),
            });
        }
        target.copy_from_slice(values);
        Ok(())
    }

    /// Returns an independent clone.
    pub fn copy(&self) -> CellKey {
        self.clone()
    }

    /// Linear offset `Σ ordinal[i] * axis_multipliers[i]`.
    ///
    /// Fails with `CellCountOverflow` if the offset does not fit in `usize`.
    pub fn get_offset(&self, axis_multipliers: &[usize]) -> KeyResult<usize> {
        let ordinals = self.ordinals();
        if axis_multipliers.len() != ordinals.len() {
            return Err(KeyError::ArityMismatch {
                expected: ordinals.len(),
                actual: axis_multipliers.len(),
            });
        }
        ordinals
            .iter()
            .zip(axis_multipliers)
            .try_fold(0usize, |offset, (ordinal, multiplier)| {
                ordinal
                    .checked_mul(*multiplier)
                    .and_then(|term| offset.checked_add(term))
                    .ok_or(KeyError::CellCountOverflow)
            })
    }
}

impl PartialEq for CellKey {
    fn eq(&self, other: &Self) -> bool {
        self.ordinals() == other.ordinals()
    }
}

impl Eq for CellKey {}

impl Hash for CellKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ordinals().hash(state);
    }
}

impl From<Vec<usize>> for CellKey {
    fn from(ordinals: Vec<usize>) -> Self {
        CellKey::from_ordinals(&ordinals)
    }
}

impl From<CellKey> for Vec<usize> {
    fn from(key: CellKey) -> Self {
        key.get_ordinals()
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, ordinal) in self.ordinals().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", ordinal)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_by_arity() {
        assert_eq!(CellKey::new_cell_key(0).layout(), CellKeyLayout::Zero);
        assert_eq!(CellKey::new_cell_key(1).layout(), CellKeyLayout::One);
        assert_eq!(CellKey::new_cell_key(2).layout(), CellKeyLayout::Two);
        assert_eq!(CellKey::new_cell_key(3).layout(), CellKeyLayout::Three);
        assert_eq!(CellKey::new_cell_key(4).layout(), CellKeyLayout::Four);
        assert_eq!(CellKey::new_cell_key(5).layout(), CellKeyLayout::Many);
        assert_eq!(CellKey::new_many_cell_key(2).layout(), CellKeyLayout::Many);
    }

    #[test]
    fn test_new_key_is_zero_filled() {
        for arity in 0..12 {
            let key = CellKey::new_cell_key(arity);
            assert_eq!(key.size(), arity);
            assert_eq!(key.get_ordinals(), vec![0; arity]);
        }
    }

    #[test]
    fn test_set_axes_then_rebuild_from_ordinals() {
        for arity in 1..10 {
            let mut key = CellKey::new_cell_key(arity);
            for axis in 0..arity {
                key.set_axis(axis, axis * 10 + 1).unwrap();
            }
            let rebuilt = CellKey::from_ordinals(&key.get_ordinals());
            assert_eq!(rebuilt, key);
            assert_eq!(rebuilt.get_axis(arity - 1).unwrap(), (arity - 1) * 10 + 1);
        }
    }

    #[test]
    fn test_axis_out_of_range() {
        let mut key = CellKey::new_cell_key(3);
        assert_eq!(
            key.get_axis(3).unwrap_err(),
            KeyError::AxisOutOfRange { axis: 3, arity: 3 }
        );
        assert!(key.set_axis(7, 1).is_err());
        assert_eq!(key.get_ordinals(), vec![0, 0, 0]);
    }

    #[test]
    fn test_zero_key_is_shared() {
        assert!(std::ptr::eq(CellKey::zero(), CellKey::zero()));
        assert_eq!(CellKey::new_cell_key(0), *CellKey::zero());
        assert_eq!(CellKey::from_ordinals(&[]), CellKey::ZERO);
        assert_eq!(CellKey::from_ordinals(&[]).layout(), CellKeyLayout::Zero);
    }

    #[test]
    fn test_zero_key_rejects_mutation() {
        let mut key = CellKey::new_cell_key(0);
        assert_eq!(
            key.set_axis(0, 1).unwrap_err(),
            KeyError::AxisOutOfRange { axis: 0, arity: 0 }
        );
        assert!(key.get_axis(0).is_err());
        assert!(key.set_ordinals(&[1]).is_err());
        assert!(key.set_ordinals(&[]).is_ok());
        assert_eq!(key, CellKey::ZERO);
    }

    #[test]
    fn test_set_ordinals_length_checked() {
        let mut key = CellKey::new_cell_key(2);
        assert_eq!(
            key.set_ordinals(&[1, 2, 3]).unwrap_err(),
            KeyError::ArityMismatch { expected: 2, actual: 3 }
        );
        assert!(key.set_ordinals(&[1]).is_err());
        assert_eq!(key.get_ordinals(), vec![0, 0]);
        key.set_ordinals(&[4, 5]).unwrap();
        assert_eq!(key.get_ordinals(), vec![4, 5]);
    }

    #[test]
    fn test_copy_is_independent() {
        let mut original = CellKey::from_ordinals(&[1, 2, 3, 4, 5, 6]);
        let mut copy = original.copy();
        copy.set_axis(0, 99).unwrap();
        assert_eq!(original.get_axis(0).unwrap(), 1);
        original.set_axis(5, 42).unwrap();
        assert_eq!(copy.get_axis(5).unwrap(), 6);
    }

    #[test]
    fn test_equality_across_layouts() {
        for arity in 0..8 {
            let mut fast = CellKey::new_cell_key(arity);
            let mut generic = CellKey::new_many_cell_key(arity);
            assert_eq!(fast, generic);
            for axis in 0..arity {
                fast.set_axis(axis, axis + 3).unwrap();
                generic.set_axis(axis, axis + 3).unwrap();
            }
            assert_eq!(fast, generic);
            assert_eq!(generic, fast);
        }
        assert_ne!(CellKey::new_cell_key(2), CellKey::new_cell_key(3));
    }

    #[test]
    fn test_get_offset() {
        let key = CellKey::from_ordinals(&[3, 2, 1]);
        assert_eq!(key.get_offset(&[1, 4, 12]).unwrap(), 23);
        assert!(key.get_offset(&[1, 4]).is_err());
        assert_eq!(CellKey::ZERO.get_offset(&[]).unwrap(), 0);
    }

    #[test]
    fn test_get_offset_overflow() {
        let key = CellKey::from_ordinals(&[usize::MAX, 2]);
        assert_eq!(
            key.get_offset(&[2, 1]).unwrap_err(),
            KeyError::CellCountOverflow
        );
        let key = CellKey::from_ordinals(&[usize::MAX, 1]);
        assert_eq!(
            key.get_offset(&[1, 1]).unwrap_err(),
            KeyError::CellCountOverflow
        );
        assert_eq!(key.get_offset(&[1, 0]).unwrap(), usize::MAX);
    }

    #[test]
    fn test_display_and_serde() {
        let key = CellKey::from_ordinals(&[3, 0, 7]);
        assert_eq!(key.to_string(), "(3, 0, 7)");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "[3,0,7]");
        let back: CellKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}
