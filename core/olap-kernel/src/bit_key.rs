//! FILENAME: core/olap-kernel/src/bit_key.rs
//! PURPOSE: Growable bit set keyed by column position.
//! CONTEXT: A BitKey records which columns (or attributes) take part in an
//! aggregate request. The segment cache uses it as part of its keys and runs
//! subset/union tests on it when batching grouping sets.
//!
//! Storage comes in three tiers chosen from the declared capacity:
//! - `Small`: one word, capacities 0..=64
//! - `Mid128`: two words, capacities 65..=128
//! - `Big`: a word array sized to the capacity
//!
//! The tier is never observable through equality, ordering, hashing or the
//! set operations. Two keys with the same on-positions are equal whatever
//! capacity they were built with.
//!
//! Writing a position beyond the current storage grows the key into the
//! smallest tier that holds it, up to `MAX_POSITION`. Clearing or reading
//! such a position is a no-op / `false`.
//!
//! Keys serialize as the ascending list of set positions, so equal keys give
//! equal bytes whatever their tier.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use log::trace;
use serde::{Deserialize, Serialize};

use crate::error::{KeyError, KeyResult};

/// Largest capacity stored in the single-word tier.
pub const SMALL_CAPACITY: usize = 64;

/// Largest capacity stored in the two-word tier.
pub const MID_CAPACITY: usize = 128;

/// Highest position a key can hold. Declared capacities above
/// `MAX_POSITION + 1` are clamped to it.
pub const MAX_POSITION: usize = (1 << 24) - 1;

const WORD_BITS: usize = 64;

// ============================================================================
// REPRESENTATION
// ============================================================================

/// Storage tier of a BitKey. Only useful for introspection in tests and
/// diagnostics; behavior never depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BitKeyTier {
    Small,
    Mid128,
    Big,
}

#[derive(Debug, Clone)]
enum Repr {
    Small(u64),
    Mid128([u64; 2]),
    Big(Box<[u64]>),
}

impl Repr {
    fn for_capacity(capacity: usize) -> Repr {
        let capacity = capacity.min(MAX_POSITION + 1);
        if capacity <= SMALL_CAPACITY {
            Repr::Small(0)
        } else if capacity <= MID_CAPACITY {
            Repr::Mid128([0; 2])
        } else {
            Repr::Big(vec![0; capacity.div_ceil(WORD_BITS)].into_boxed_slice())
        }
    }

    fn for_words(word_count: usize) -> Repr {
        Repr::for_capacity(word_count.saturating_mul(WORD_BITS))
    }

    fn tier(&self) -> BitKeyTier {
        match self {
            Repr::Small(_) => BitKeyTier::Small,
            Repr::Mid128(_) => BitKeyTier::Mid128,
            Repr::Big(_) => BitKeyTier::Big,
        }
    }

    fn words(&self) -> &[u64] {
        match self {
            Repr::Small(word) => std::slice::from_ref(word),
            Repr::Mid128(words) => words,
            Repr::Big(words) => words,
        }
    }

    fn words_mut(&mut self) -> &mut [u64] {
        match self {
            Repr::Small(word) => std::slice::from_mut(word),
            Repr::Mid128(words) => words,
            Repr::Big(words) => words,
        }
    }
}

#[inline]
fn word_index(pos: usize) -> usize {
    pos / WORD_BITS
}

#[inline]
fn bit_mask(pos: usize) -> u64 {
    1u64 << (pos % WORD_BITS)
}

// ============================================================================
// BIT KEY
// ============================================================================

/// A set of column positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "Vec<usize>", try_from = "Vec<usize>")]
pub struct BitKey {
    repr: Repr,
}

impl BitKey {
    /// Creates an empty key for the given declared capacity.
    ///
    /// Fails with `InvalidSize` when `size` is negative.
    pub fn make_bit_key(size: i64) -> KeyResult<BitKey> {
        let capacity = usize::try_from(size).map_err(|_| KeyError::InvalidSize { size })?;
        Ok(BitKey::new(capacity))
    }

    /// Creates an empty key able to hold positions `0..capacity` without growing.
    pub fn new(capacity: usize) -> BitKey {
        let repr = Repr::for_capacity(capacity);
        trace!("bit key: capacity {} uses {:?} storage", capacity, repr.tier());
        BitKey { repr }
    }

    /// Creates a key with the given positions set.
    ///
    /// # Panics
    /// Panics if a position exceeds `MAX_POSITION`.
    pub fn from_positions<I: IntoIterator<Item = usize>>(positions: I) -> BitKey {
        positions.into_iter().collect()
    }

    /// Returns a key of the same tier with no positions set.
    pub fn empty_copy(&self) -> BitKey {
        BitKey {
            repr: Repr::for_words(self.repr.words().len()),
        }
    }

    /// Returns an independent clone.
    pub fn copy(&self) -> BitKey {
        self.clone()
    }

    pub fn tier(&self) -> BitKeyTier {
        self.repr.tier()
    }

    /// Number of positions the current storage holds without growing.
    pub fn capacity(&self) -> usize {
        self.repr.words().len() * WORD_BITS
    }

    // ------------------------------------------------------------------------
    // Single-position operations
    // ------------------------------------------------------------------------

    /// Turns a position on, growing the storage if needed.
    ///
    /// # Panics
    /// Panics if `pos` exceeds `MAX_POSITION`.
    pub fn set_by_pos(&mut self, pos: usize) {
        assert!(
            pos <= MAX_POSITION,
            "bit key position {} exceeds MAX_POSITION ({})",
            pos,
            MAX_POSITION
        );
        let index = word_index(pos);
        if index >= self.repr.words().len() {
            self.grow_to_hold(pos);
        }
        self.repr.words_mut()[index] |= bit_mask(pos);
    }

    pub fn clear_by_pos(&mut self, pos: usize) {
        if let Some(word) = self.repr.words_mut().get_mut(word_index(pos)) {
            *word &= !bit_mask(pos);
        }
    }

    pub fn is_set_by_pos(&self, pos: usize) -> bool {
        self.repr
            .words()
            .get(word_index(pos))
            .map_or(false, |word| word & bit_mask(pos) != 0)
    }

    /// Sets or clears a position. Setting follows `set_by_pos`.
    pub fn set(&mut self, pos: usize, value: bool) {
        if value {
            self.set_by_pos(pos);
        } else {
            self.clear_by_pos(pos);
        }
    }

    /// Turns every position off. The tier is kept.
    pub fn clear(&mut self) {
        self.repr.words_mut().fill(0);
    }

    fn grow_to_hold(&mut self, pos: usize) {
        let mut grown = Repr::for_capacity(pos + 1);
        let old = self.repr.words();
        grown.words_mut()[..old.len()].copy_from_slice(old);
        trace!(
            "bit key: position {} promotes {:?} storage to {:?}",
            pos,
            self.repr.tier(),
            grown.tier()
        );
        self.repr = grown;
    }

    // ------------------------------------------------------------------------
    // Whole-set queries
    // ------------------------------------------------------------------------

    /// Words up to and including the highest non-zero word.
    fn significant_words(&self) -> &[u64] {
        let words = self.repr.words();
        let len = words.iter().rposition(|&w| w != 0).map_or(0, |i| i + 1);
        &words[..len]
    }

    pub fn is_empty(&self) -> bool {
        self.repr.words().iter().all(|&w| w == 0)
    }

    /// Number of positions set.
    pub fn cardinality(&self) -> usize {
        self.repr.words().iter().map(|w| w.count_ones() as usize).sum()
    }

    /// True if every position set in `other` is also set in `self`.
    pub fn is_super_set_of(&self, other: &BitKey) -> bool {
        let mine = self.repr.words();
        other
            .repr
            .words()
            .iter()
            .enumerate()
            .all(|(i, &theirs)| theirs & !mine.get(i).copied().unwrap_or(0) == 0)
    }

    /// True if the two keys share at least one position.
    pub fn intersects(&self, other: &BitKey) -> bool {
        self.repr
            .words()
            .iter()
            .zip(other.repr.words())
            .any(|(a, b)| a & b != 0)
    }

    /// Returns the first set position at or after `from`.
    pub fn next_set_bit(&self, from: usize) -> Option<usize> {
        let words = self.repr.words();
        let mut index = word_index(from);
        let mut word = words.get(index)? & (u64::MAX << (from % WORD_BITS));
        loop {
            if word != 0 {
                return Some(index * WORD_BITS + word.trailing_zeros() as usize);
            }
            index += 1;
            word = *words.get(index)?;
        }
    }

    /// Iterates the set positions in ascending order.
    pub fn iter(&self) -> SetPositions<'_> {
        let words = self.repr.words();
        SetPositions {
            words,
            index: 0,
            current: words.first().copied().unwrap_or(0),
        }
    }

    // ------------------------------------------------------------------------
    // Set algebra
    // ------------------------------------------------------------------------

    /// Union of both keys, in the tier of the wider operand.
    pub fn or(&self, other: &BitKey) -> BitKey {
        self.combine(other, |a, b| a | b)
    }

    /// Intersection of both keys, in the tier of the wider operand.
    pub fn and(&self, other: &BitKey) -> BitKey {
        self.combine(other, |a, b| a & b)
    }

    /// Positions of `self` that are not set in `other`.
    pub fn and_not(&self, other: &BitKey) -> BitKey {
        self.combine(other, |a, b| a & !b)
    }

    fn combine(&self, other: &BitKey, op: impl Fn(u64, u64) -> u64) -> BitKey {
        let (a, b) = (self.repr.words(), other.repr.words());
        let mut repr = Repr::for_words(a.len().max(b.len()));
        for (i, word) in repr.words_mut().iter_mut().enumerate() {
            *word = op(a.get(i).copied().unwrap_or(0), b.get(i).copied().unwrap_or(0));
        }
        BitKey { repr }
    }
}

impl Default for BitKey {
    fn default() -> Self {
        BitKey::new(0)
    }
}

impl PartialEq for BitKey {
    fn eq(&self, other: &Self) -> bool {
        self.significant_words() == other.significant_words()
    }
}

impl Eq for BitKey {}

impl Hash for BitKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant_words().hash(state);
    }
}

impl Ord for BitKey {
    /// Orders keys as unsigned integers whose bit `i` is position `i`.
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (self.significant_words(), other.significant_words());
        a.len()
            .cmp(&b.len())
            .then_with(|| a.iter().rev().cmp(b.iter().rev()))
    }
}

impl PartialOrd for BitKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromIterator<usize> for BitKey {
    fn from_iter<I: IntoIterator<Item = usize>>(positions: I) -> Self {
        let mut key = BitKey::new(0);
        for pos in positions {
            key.set_by_pos(pos);
        }
        key
    }
}

impl TryFrom<Vec<usize>> for BitKey {
    type Error = KeyError;

    fn try_from(positions: Vec<usize>) -> Result<Self, Self::Error> {
        if let Some(&pos) = positions.iter().find(|&&pos| pos > MAX_POSITION) {
            return Err(KeyError::PositionOutOfRange { pos, max: MAX_POSITION });
        }
        Ok(positions.into_iter().collect())
    }
}

impl From<BitKey> for Vec<usize> {
    fn from(key: BitKey) -> Self {
        key.iter().collect()
    }
}

impl fmt::Display for BitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, pos) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", pos)?;
        }
        write!(f, "}}")
    }
}

impl<'a> IntoIterator for &'a BitKey {
    type Item = usize;
    type IntoIter = SetPositions<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the set positions of a BitKey.
pub struct SetPositions<'a> {
    words: &'a [u64],
    index: usize,
    current: u64,
}

impl Iterator for SetPositions<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        loop {
            if self.current != 0 {
                let bit = self.current.trailing_zeros() as usize;
                self.current &= self.current - 1;
                return Some(self.index * WORD_BITS + bit);
            }
            self.index += 1;
            self.current = *self.words.get(self.index)?;
        }
    }
}
