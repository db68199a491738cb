use std::fmt;

use arrayvec::ArrayVec;
use lazy_static::lazy_static;

use crate::position::MAX_BOARD_SIZE;

lazy_static! {
    static ref CONSTANTS: [Constants; MAX_BOARD_SIZE + 1] =
        std::array::from_fn(|size| Constants::precompute(size as u8));
}

/// Edge masks for one board size.
///
/// Square `(x, y)` lives at bit `y * size + x`. `left` is the `x == 0` file,
/// `top` is the `y == size - 1` rank.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Constants {
    pub size: u8,
    pub left: u64,
    pub right: u64,
    pub top: u64,
    pub bottom: u64,
    pub edge: u64,
    pub mask: u64,
}

impl Constants {
    /// Shared constants for board size `size`. Panics if `size > 8`.
    #[inline]
    pub fn for_size(size: u8) -> &'static Constants {
        &CONSTANTS[size as usize]
    }

    fn precompute(size: u8) -> Self {
        if size == 0 {
            return Constants {
                size,
                left: 0,
                right: 0,
                top: 0,
                bottom: 0,
                edge: 0,
                mask: 0,
            };
        }
        let size_u64 = size as u64;
        let mut left = 0;
        for y in 0..size_u64 {
            left |= 1 << (y * size_u64);
        }
        let right = left << (size_u64 - 1);
        let bottom = (1 << size_u64) - 1;
        let top = bottom << (size_u64 * (size_u64 - 1));
        let mask = low_bits((size_u64 * size_u64) as u32);
        Constants {
            size,
            left,
            right,
            top,
            bottom,
            edge: left | right | top | bottom,
            mask,
        }
    }

    /// Expands `seed` one step in each cardinal direction, staying inside `within`
    #[inline]
    pub fn grow(&self, within: u64, seed: u64) -> u64 {
        let size = self.size as u32;
        let mut next = seed;
        next |= (seed << 1) & !self.left;
        next |= (seed >> 1) & !self.right;
        next |= seed >> size;
        next |= seed << size;
        next & within & self.mask
    }

    pub fn flood(&self, within: u64, mut seed: u64) -> u64 {
        loop {
            let next = self.grow(within, seed);
            if next == seed {
                return next;
            }
            seed = next;
        }
    }

    /// Every connected component of `bits` with at least two squares.
    pub fn flood_groups(&self, bits: u64, out: &mut ArrayVec<u64, 32>) {
        let mut seen = 0;
        for bit in BitIter::new(bits).map(|i| 1 << i) {
            if seen & bit != 0 {
                continue;
            }
            let group = self.flood(bits, bit);
            if group != bit {
                out.push(group);
            }
            seen |= group;
        }
    }

    /// Bounding box `(width, height)` of a connected component
    pub fn dimensions(&self, bits: u64) -> (u8, u8) {
        if bits == 0 {
            return (0, 0);
        }
        let size = self.size;
        let columns = (0..size).map(|x| bits & (self.left << x) != 0);
        let rows = (0..size).rev().map(|y| bits & (self.bottom << (y * size)) != 0);
        (contiguous_run(columns), contiguous_run(rows))
    }

    pub fn square_mask(&self, x: u8, y: u8) -> u64 {
        debug_assert!(x < self.size && y < self.size);
        1 << (y as u32 * self.size as u32 + x as u32)
    }
}

/// Length of the first run of `true` values
fn contiguous_run(iter: impl Iterator<Item = bool>) -> u8 {
    iter.skip_while(|hit| !hit).take_while(|hit| *hit).count() as u8
}

#[inline]
pub fn popcount(bits: u64) -> u32 {
    bits.count_ones()
}

#[inline]
pub fn low_bits(n: u32) -> u64 {
    if n >= 64 {
        u64::MAX
    } else {
        (1 << n) - 1
    }
}

/// Iterates over the indices of the set bits, lowest first
#[derive(Clone, Copy)]
pub struct BitIter {
    bits: u64,
}

impl BitIter {
    pub fn new(bits: u64) -> Self {
        BitIter { bits }
    }
}

impl Iterator for BitIter {
    type Item = u8;

    fn next(&mut self) -> Option<Self::Item> {
        if self.bits == 0 {
            None
        } else {
            let i = self.bits.trailing_zeros() as u8;
            self.bits &= self.bits - 1;
            Some(i)
        }
    }
}

impl fmt::Debug for Constants {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Constants for {}s:", self.size)?;
        for (name, bits) in [
            ("left", self.left),
            ("right", self.right),
            ("top", self.top),
            ("bottom", self.bottom),
        ] {
            writeln!(f, "{}:", name)?;
            write_bits(f, self.size, bits)?;
        }
        Ok(())
    }
}

/// Draws a mask with the top rank first
pub fn write_bits(f: &mut impl fmt::Write, size: u8, bits: u64) -> fmt::Result {
    for y in (0..size).rev() {
        for x in 0..size {
            let bit = bits & (1 << (y as u32 * size as u32 + x as u32)) != 0;
            f.write_char(if bit { '1' } else { '.' })?;
        }
        f.write_char('\n')?;
    }
    Ok(())
}
