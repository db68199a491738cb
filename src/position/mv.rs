use std::error;
use std::fmt;

use crate::position::utils::{Direction, Role, Square};
use crate::position::MAX_BOARD_SIZE;

/// Drop counts of a slide, packed 4 bits per step with the first drop in the lowest nibble.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Default)]
pub struct Drops(u32);

impl Drops {
    /// Returns `None` if there are no drops, more than 8 drops, or any drop is outside `1..=8`
    pub fn new(drops: &[u8]) -> Option<Self> {
        if drops.is_empty() || drops.len() > MAX_BOARD_SIZE {
            return None;
        }
        let mut out = Drops(0);
        for &drop in drops.iter().rev() {
            if drop == 0 || drop as usize > MAX_BOARD_SIZE {
                return None;
            }
            out = out.prepend(drop);
        }
        Some(out)
    }

    pub fn single(count: u8) -> Self {
        debug_assert!((1..=8).contains(&count));
        Drops(count as u32)
    }

    pub const fn from_raw(raw: u32) -> Self {
        Drops(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    /// A new sequence starting with `first`, followed by `self`
    pub fn prepend(self, first: u8) -> Self {
        Drops((self.0 << 4) | first as u32)
    }

    /// Number of squares travelled
    pub fn len(self) -> u8 {
        (32 - self.0.leading_zeros()).div_ceil(4) as u8
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn first(self) -> u8 {
        (self.0 & 0xf) as u8
    }

    pub fn last(self) -> u8 {
        match self.len() {
            0 => 0,
            len => ((self.0 >> (4 * (len as u32 - 1))) & 0xf) as u8,
        }
    }

    /// Total number of pieces carried
    pub fn carry(self) -> u8 {
        self.iter().sum()
    }

    pub fn iter(self) -> DropsIter {
        DropsIter(self.0)
    }

    /// Whether all drops fit within `steps` squares
    #[inline]
    pub fn fits_in(self, steps: u8) -> bool {
        steps >= 8 || self.0 >> (4 * steps as u32) == 0
    }
}

pub struct DropsIter(u32);

impl Iterator for DropsIter {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.0 == 0 {
            None
        } else {
            let drop = (self.0 & 0xf) as u8;
            self.0 >>= 4;
            Some(drop)
        }
    }
}

/// A move in Tak. Whether it is legal depends on the position it is played in.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Move {
    Place(Role, Square),
    Slide(Square, Direction, Drops),
}

impl Move {
    pub fn origin(self) -> Square {
        match self {
            Move::Place(_, square) => square,
            Move::Slide(square, _, _) => square,
        }
    }

    /// The square the move ends on
    pub fn destination(self) -> Square {
        match self {
            Move::Place(_, square) => square,
            Move::Slide(square, direction, drops) => {
                let (dx, dy) = direction.delta();
                let len = drops.len() as i8;
                Square::new(
                    (square.x as i8 + dx * len) as u8,
                    (square.y as i8 + dy * len) as u8,
                )
            }
        }
    }

    pub fn is_placement(self) -> bool {
        matches!(self, Move::Place(..))
    }

    /// Parses a move in PTN notation. Trailing annotations (`?`, `!`, `'`, `"`) are ignored.
    pub fn from_string(input: &str, size: u8) -> Result<Self, pgn_traits::Error> {
        let trimmed = input.trim_end_matches(&['?', '!', '\'', '"'][..]);
        if trimmed.len() < 2 {
            return Err(pgn_traits::Error::new_parse_error(format!(
                "Input move \"{}\" too short.",
                input
            )));
        }
        if !trimmed.is_ascii() {
            return Err(pgn_traits::Error::new_parse_error(format!(
                "Input move \"{}\" contained non-ascii characters.",
                input
            )));
        }
        let bytes = trimmed.as_bytes();
        let mut pos = 0;

        let carry = if bytes[0].is_ascii_digit() {
            pos += 1;
            Some(bytes[0] - b'0')
        } else {
            None
        };

        let role = match bytes[pos] {
            b'F' => Some(Role::Flat),
            b'S' => Some(Role::Wall),
            b'C' => Some(Role::Cap),
            _ => None,
        };
        if role.is_some() {
            pos += 1;
        }

        let square_str = trimmed.get(pos..pos + 2).ok_or_else(|| {
            pgn_traits::Error::new_parse_error(format!("Missing square in move \"{}\"", input))
        })?;
        let square = Square::parse_square(square_str, size)?;
        pos += 2;

        let Some(direction_char) = trimmed[pos..].chars().next() else {
            if carry.is_some() {
                return Err(pgn_traits::Error::new_parse_error(format!(
                    "Move \"{}\" has a carry count but no direction",
                    input
                )));
            }
            return Ok(Move::Place(role.unwrap_or(Role::Flat), square));
        };
        if role.is_some() {
            return Err(pgn_traits::Error::new_parse_error(format!(
                "Placement \"{}\" has trailing characters",
                input
            )));
        }
        let direction = Direction::parse(direction_char).ok_or_else(|| {
            pgn_traits::Error::new_parse_error(format!(
                "Couldn't parse direction '{}' in move \"{}\"",
                direction_char, input
            ))
        })?;
        pos += 1;

        let carry = carry.unwrap_or(1);
        if carry == 0 || carry > size {
            return Err(pgn_traits::Error::new_parse_error(format!(
                "Illegal carry {} in move \"{}\"",
                carry, input
            )));
        }

        let mut drops = trimmed[pos..]
            .chars()
            .map(|ch| ch.to_digit(10).map(|d| d as u8))
            .collect::<Option<Vec<u8>>>()
            .ok_or_else(|| {
                pgn_traits::Error::new_parse_error(format!(
                    "Couldn't parse move \"{}\": found non-integer when expecting number of pieces to drop",
                    input
                ))
            })?;
        let dropped: u32 = drops.iter().map(|&drop| drop as u32).sum();
        if dropped < carry as u32 {
            drops.push(carry - dropped as u8);
        } else if dropped > carry as u32 {
            return Err(pgn_traits::Error::new_parse_error(format!(
                "Move \"{}\" drops {} pieces but only carries {}",
                input, dropped, carry
            )));
        }
        let drops = Drops::new(&drops).ok_or_else(|| {
            pgn_traits::Error::new_parse_error(format!("Invalid drop counts in move \"{}\"", input))
        })?;
        Ok(Move::Slide(square, direction, drops))
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Place(role, square) => match role {
                Role::Cap => write!(f, "C{}", square),
                Role::Flat => write!(f, "{}", square),
                Role::Wall => write!(f, "S{}", square),
            },
            Move::Slide(square, direction, drops) => {
                let carry = drops.carry();
                if carry == 1 {
                    write!(f, "{}{}", square, direction.to_char())?;
                } else {
                    write!(f, "{}{}{}", carry, square, direction.to_char())?;
                }
                // Omit drop counts if all stones are dropped immediately
                if drops.len() > 1 {
                    for drop in drops.iter() {
                        write!(f, "{}", drop)?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// Reasons a move cannot be applied to a position
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveError {
    OffBoard,
    Occupied,
    NoReserve,
    IllegalSlide,
    IllegalOpening,
}

impl fmt::Display for MoveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveError::OffBoard => write!(f, "square is outside the board"),
            MoveError::Occupied => write!(f, "square is occupied"),
            MoveError::NoReserve => write!(f, "no pieces of that kind left in reserve"),
            MoveError::IllegalSlide => write!(f, "illegal slide"),
            MoveError::IllegalOpening => write!(f, "illegal opening move"),
        }
    }
}

impl error::Error for MoveError {}
