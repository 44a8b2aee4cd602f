//! FILENAME: core/olap-kernel/tests/common/mod.rs
//! Fixtures shared by the integration tests: every representation of the
//! same logical key, so a check can run once per variant.

#![allow(dead_code)]

use olap_kernel::{BitKey, CellKey, Modulos};

/// Declared capacities covering all three BitKey tiers and their boundaries.
pub const CAPACITIES: [usize; 8] = [0, 1, 64, 65, 128, 129, 400, 1024];

/// One key per capacity, each with `positions` set.
pub fn bit_keys_with(positions: &[usize]) -> Vec<BitKey> {
    CAPACITIES
        .iter()
        .map(|&capacity| {
            let mut key = BitKey::new(capacity);
            for &pos in positions {
                key.set_by_pos(pos);
            }
            key
        })
        .collect()
}

/// The specialized and the generic CellKey for the same ordinals.
pub fn cell_keys_with(ordinals: &[usize]) -> Vec<CellKey> {
    let mut generic = CellKey::new_many_cell_key(ordinals.len());
    generic.set_ordinals(ordinals).unwrap();
    vec![CellKey::from_ordinals(ordinals), generic]
}

/// `create` and `create_many` for the same extents.
pub fn modulos_pair(extents: &[usize]) -> (Modulos, Modulos) {
    (
        Modulos::create(extents).unwrap(),
        Modulos::create_many(extents).unwrap(),
    )
}
