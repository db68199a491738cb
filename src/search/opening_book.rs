//! Weighted opening moves, keyed by position hash.
//!
//! Every line is stored under all symmetries of each position, so a single
//! lookup finds a move regardless of board orientation.

use std::collections::HashMap;
use std::{error, fmt};

use rand::Rng;

use crate::position::{Move, Position, Symmetry};

#[derive(Debug)]
pub struct BookError {
    pub line: usize,
    pub mv: String,
    pub cause: String,
}

impl fmt::Display for BookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: move `{}`: {}", self.line, self.mv, self.cause)
    }
}

impl error::Error for BookError {}

#[derive(Clone, Debug, Default)]
pub struct OpeningBook {
    size: u8,
    book: HashMap<u64, Vec<(Move, u32)>>,
}

impl OpeningBook {
    /// Builds a book from lines of space-separated PTN moves, each played from the start position
    pub fn build<S: AsRef<str>>(size: u8, lines: &[S]) -> Result<Self, BookError> {
        let mut book: HashMap<u64, Vec<(Move, u32)>> = HashMap::new();
        for (line_number, line) in lines.iter().enumerate() {
            let mut position = Position::start_position(size);
            for word in line.as_ref().split_whitespace() {
                let book_error = |cause: String| BookError {
                    line: line_number,
                    mv: word.to_string(),
                    cause,
                };
                let mv = Move::from_string(word, size).map_err(|err| book_error(err.to_string()))?;
                let next = position
                    .do_move(&mv)
                    .map_err(|err| book_error(err.to_string()))?;

                for symmetry in Symmetry::ALL {
                    let transformed = position.transform(symmetry);
                    let transformed_move = symmetry.transform_move(mv, size);
                    let children = book.entry(transformed.hash()).or_default();
                    match children.iter_mut().find(|(child, _)| *child == transformed_move) {
                        Some((_, weight)) => *weight += 1,
                        None => children.push((transformed_move, 1)),
                    }
                }
                position = next;
            }
        }
        Ok(OpeningBook { size, book })
    }

    pub fn size(&self) -> u8 {
        self.size
    }

    pub fn len(&self) -> usize {
        self.book.len()
    }

    pub fn is_empty(&self) -> bool {
        self.book.is_empty()
    }

    /// The book moves for `position`, with their weights
    pub fn moves(&self, position: &Position) -> &[(Move, u32)] {
        self.book
            .get(&position.hash())
            .map(|children| children.as_slice())
            .unwrap_or_default()
    }

    /// Picks a book move with probability proportional to its weight
    pub fn get_move<R: Rng>(&self, position: &Position, rng: &mut R) -> Option<Move> {
        if position.size() != self.size {
            return None;
        }
        let children = self.moves(position);
        let total: u32 = children.iter().map(|(_, weight)| weight).sum();
        if total == 0 {
            return None;
        }
        let mut pick = rng.gen_range(0..total);
        for &(mv, weight) in children {
            if pick < weight {
                return Some(mv);
            }
            pick -= weight;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::{Role, Square};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn symmetric_openings_are_found_test() {
        let book = OpeningBook::build(5, &["a1 e5 c3", "a1 a5"]).unwrap();
        let mut rng = SmallRng::seed_from_u64(0);

        let start = Position::start_position(5);
        let corners: Vec<Move> = Square::corners(5)
            .iter()
            .map(|&square| Move::Place(Role::Flat, square))
            .collect();
        assert_eq!(book.moves(&start).len(), 4);
        for _ in 0..10 {
            let mv = book.get_move(&start, &mut rng).unwrap();
            assert!(corners.contains(&mv));
        }

        // Mirrored first move
        let mirrored = start
            .do_move(&Move::Place(Role::Flat, Square::new(4, 4)))
            .unwrap();
        let reply = book.get_move(&mirrored, &mut rng).unwrap();
        assert!(mirrored.do_move(&reply).is_ok());
        assert_eq!(book.moves(&mirrored).iter().map(|(_, w)| w).sum::<u32>(), 4);
    }

    #[test]
    fn unknown_position_test() {
        let book = OpeningBook::build(5, &["a1 e5"]).unwrap();
        let position = Position::from_tps("x5/x5/x5/x5/1,2,x3 1 2").unwrap();
        assert!(book.get_move(&position, &mut SmallRng::seed_from_u64(0)).is_none());
    }

    #[test]
    fn bad_line_is_an_error_test() {
        let err = OpeningBook::build(5, &["a1 e5", "a1 Cb2"]).unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.mv, "Cb2");
    }

    #[test]
    fn lines_for_another_size_test() {
        let lines = vec!["a1 f6 c3".to_string()];
        let err = OpeningBook::build(5, lines.as_slice()).unwrap_err();
        assert_eq!(err.mv, "f6");

        let book = OpeningBook::build(6, lines.as_slice()).unwrap();
        let mut rng = SmallRng::seed_from_u64(0);
        assert!(book.get_move(&Position::start_position(6), &mut rng).is_some());
        assert!(book.get_move(&Position::start_position(5), &mut rng).is_none());
    }
}
