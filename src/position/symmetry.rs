//! The 8 symmetries of the square board. Tak is invariant under all of them,
//! so transformed positions have the same game-theoretic value.

use crate::position::bitboard::BitIter;
use crate::position::{Direction, Move, Position, Square};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Symmetry {
    Identity,
    FlipX,
    FlipY,
    Transpose,
    AntiTranspose,
    RotateClockwise,
    Rotate180,
    RotateCounterClockwise,
}

impl Symmetry {
    pub const ALL: [Symmetry; 8] = [
        Symmetry::Identity,
        Symmetry::FlipX,
        Symmetry::FlipY,
        Symmetry::Transpose,
        Symmetry::AntiTranspose,
        Symmetry::RotateClockwise,
        Symmetry::Rotate180,
        Symmetry::RotateCounterClockwise,
    ];

    pub fn inverse(self) -> Symmetry {
        match self {
            Symmetry::RotateClockwise => Symmetry::RotateCounterClockwise,
            Symmetry::RotateCounterClockwise => Symmetry::RotateClockwise,
            other => other,
        }
    }

    /// Applies the linear part of the transformation to a vector
    fn apply_vector(self, dx: i8, dy: i8) -> (i8, i8) {
        match self {
            Symmetry::Identity => (dx, dy),
            Symmetry::FlipX => (-dx, dy),
            Symmetry::FlipY => (dx, -dy),
            Symmetry::Transpose => (dy, dx),
            Symmetry::AntiTranspose => (-dy, -dx),
            Symmetry::RotateClockwise => (dy, -dx),
            Symmetry::Rotate180 => (-dx, -dy),
            Symmetry::RotateCounterClockwise => (-dy, dx),
        }
    }

    pub fn square(self, square: Square, size: u8) -> Square {
        let n = size - 1;
        let (x, y) = (square.x, square.y);
        let (x, y) = match self {
            Symmetry::Identity => (x, y),
            Symmetry::FlipX => (n - x, y),
            Symmetry::FlipY => (x, n - y),
            Symmetry::Transpose => (y, x),
            Symmetry::AntiTranspose => (n - y, n - x),
            Symmetry::RotateClockwise => (y, n - x),
            Symmetry::Rotate180 => (n - x, n - y),
            Symmetry::RotateCounterClockwise => (n - y, x),
        };
        Square::new(x, y)
    }

    pub fn direction(self, direction: Direction) -> Direction {
        let (dx, dy) = direction.delta();
        let (dx, dy) = self.apply_vector(dx, dy);
        Direction::from_delta(dx, dy).unwrap_or(direction)
    }

    pub fn transform_move(self, mv: Move, size: u8) -> Move {
        match mv {
            Move::Place(role, square) => Move::Place(role, self.square(square, size)),
            Move::Slide(square, direction, drops) => {
                Move::Slide(self.square(square, size), self.direction(direction), drops)
            }
        }
    }

    fn bitmap(self, bits: u64, size: u8) -> u64 {
        BitIter::new(bits)
            .map(|i| {
                let square = self.square(Square::from_index(i, size), size);
                1 << square.index(size)
            })
            .fold(0, |acc, bit| acc | bit)
    }
}

impl Position {
    pub fn transform(&self, symmetry: Symmetry) -> Position {
        if symmetry == Symmetry::Identity {
            return self.clone();
        }
        let size = self.size();
        let mut transformed = self.clone();
        transformed.white = symmetry.bitmap(self.white, size);
        transformed.black = symmetry.bitmap(self.black, size);
        transformed.standing = symmetry.bitmap(self.standing, size);
        transformed.caps = symmetry.bitmap(self.caps, size);
        for square in self.squares() {
            let i = square.index(size);
            let j = symmetry.square(square, size).index(size);
            transformed.height[j] = self.height[i];
            transformed.stacks[j] = self.stacks[i];
        }
        transformed.rebuild_caches();
        transformed
    }

    /// Every distinct transformation of the position, with the symmetry producing it
    pub fn symmetries(&self) -> Vec<(Symmetry, Position)> {
        let mut seen = Vec::with_capacity(8);
        let mut out = Vec::with_capacity(8);
        for symmetry in Symmetry::ALL {
            let transformed = self.transform(symmetry);
            let hash = transformed.hash();
            if !seen.contains(&hash) {
                seen.push(hash);
                out.push((symmetry, transformed));
            }
        }
        out
    }

    /// The smallest hash among all transformations of the position
    pub fn canonical_hash(&self) -> u64 {
        Symmetry::ALL
            .iter()
            .map(|&symmetry| self.transform(symmetry).hash())
            .min()
            .unwrap_or_else(|| self.hash())
    }
}
