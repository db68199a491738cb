//! Position hashing. Each square with a stack of two or more pieces contributes
//! a keyed FNV fold of its height and buried colors, which is XOR-ed into a running
//! value when the square changes. The board-wide bitmaps and side to move are
//! folded on top when the full hash is requested.

use lazy_static::lazy_static;
use rand::{Rng, SeedableRng};

pub const FNV_BASIS: u64 = 14695981039346656037;
pub const FNV_PRIME: u64 = 1099511628211;

lazy_static! {
    static ref SQUARE_BASIS: [u64; 64] = {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0x7a3);
        std::array::from_fn(|_| rng.gen::<u64>() >> 1)
    };
}

#[inline]
pub fn hash8(basis: u64, byte: u8) -> u64 {
    (basis ^ byte as u64).wrapping_mul(FNV_PRIME)
}

#[inline]
pub fn hash64(basis: u64, word: u64) -> u64 {
    let mut h = basis;
    h = (h ^ (word & 0xff)).wrapping_mul(FNV_PRIME);
    h = (h ^ ((word >> 8) & 0xff)).wrapping_mul(FNV_PRIME);
    h = (h ^ ((word >> 16) & 0xff)).wrapping_mul(FNV_PRIME);
    h = (h ^ (word >> 24)).wrapping_mul(FNV_PRIME);
    h
}

/// Contribution of a single square. Zero for empty squares and single pieces.
#[inline]
pub fn square_hash(index: usize, height: u8, stack: u64) -> u64 {
    if height <= 1 {
        0
    } else {
        hash64(hash8(SQUARE_BASIS[index], height), stack)
    }
}

pub fn full_hash(
    square_hashes: u64,
    white: u64,
    black: u64,
    standing: u64,
    caps: u64,
    to_move: u8,
) -> u64 {
    let mut h = FNV_BASIS ^ square_hashes;
    h = hash64(h, white);
    h = hash64(h, black);
    h = hash64(h, standing);
    h = hash64(h, caps);
    hash8(h, to_move)
}
