use std::{fmt, ops};

use board_game_traits::Color;

use crate::position::Direction::*;
use crate::position::Piece::{BlackCap, BlackFlat, BlackWall, WhiteCap, WhiteFlat, WhiteWall};
use crate::position::Role::{Cap, Flat, Wall};

/// One of the 3 piece roles in Tak. The same as piece, but without different variants for each color.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Role {
    Flat = 0,
    Wall = 1,
    Cap = 2,
}

impl Role {
    pub fn disc(self) -> usize {
        self as u16 as usize
    }

    /// Flats and capstones count towards roads, walls do not
    pub fn is_road(self) -> bool {
        self != Wall
    }
}

/// One of the 6 game pieces in Tak. Each piece has one variant for each color.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Piece {
    WhiteFlat = 0,
    BlackFlat = 1,
    WhiteWall = 2,
    BlackWall = 3,
    WhiteCap = 4,
    BlackCap = 5,
}

impl Piece {
    pub fn from_role_color(role: Role, color: Color) -> Self {
        match (role, color) {
            (Flat, Color::White) => WhiteFlat,
            (Wall, Color::White) => WhiteWall,
            (Cap, Color::White) => WhiteCap,
            (Flat, Color::Black) => BlackFlat,
            (Wall, Color::Black) => BlackWall,
            (Cap, Color::Black) => BlackCap,
        }
    }

    pub fn role(self) -> Role {
        match self {
            WhiteFlat | BlackFlat => Flat,
            WhiteWall | BlackWall => Wall,
            WhiteCap | BlackCap => Cap,
        }
    }

    pub fn color(self) -> Color {
        match self {
            WhiteFlat | WhiteWall | WhiteCap => Color::White,
            BlackFlat | BlackWall | BlackCap => Color::Black,
        }
    }

    pub fn is_road_piece(self) -> bool {
        self.role().is_road()
    }

    pub fn flip_color(self) -> Self {
        Piece::from_role_color(self.role(), !self.color())
    }
}

impl ops::Not for Piece {
    type Output = Self;

    fn not(self) -> Self::Output {
        self.flip_color()
    }
}

/// One of the four cardinal directions on the board.
/// North moves towards higher ranks, East towards higher files.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Direction {
    North = 0,
    West = 1,
    East = 2,
    South = 3,
}

impl Direction {
    pub const ALL: [Direction; 4] = [North, West, East, South];

    pub fn reverse(self) -> Direction {
        match self {
            North => South,
            West => East,
            East => West,
            South => North,
        }
    }

    pub fn parse(ch: char) -> Option<Self> {
        match ch {
            '+' => Some(North),
            '<' => Some(West),
            '>' => Some(East),
            '-' => Some(South),
            _ => None,
        }
    }

    pub fn to_char(self) -> char {
        match self {
            North => '+',
            West => '<',
            East => '>',
            South => '-',
        }
    }

    /// `(dx, dy)` of a single step
    pub fn delta(self) -> (i8, i8) {
        match self {
            North => (0, 1),
            West => (-1, 0),
            East => (1, 0),
            South => (0, -1),
        }
    }

    pub fn from_delta(dx: i8, dy: i8) -> Option<Self> {
        match (dx, dy) {
            (0, 1) => Some(North),
            (-1, 0) => Some(West),
            (1, 0) => Some(East),
            (0, -1) => Some(South),
            _ => None,
        }
    }
}

/// A location on the board, where `(0, 0)` is `a1`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Square {
    pub x: u8,
    pub y: u8,
}

impl Square {
    pub const fn new(x: u8, y: u8) -> Self {
        Square { x, y }
    }

    pub fn from_index(index: u8, size: u8) -> Self {
        debug_assert!(index < size * size);
        Square {
            x: index % size,
            y: index / size,
        }
    }

    #[inline]
    pub fn index(self, size: u8) -> usize {
        self.y as usize * size as usize + self.x as usize
    }

    pub fn corners(size: u8) -> [Self; 4] {
        let last = size - 1;
        [
            Square::new(0, 0),
            Square::new(last, 0),
            Square::new(0, last),
            Square::new(last, last),
        ]
    }

    /// Takes `steps` steps in `direction`, or returns `None` if that leaves the board
    pub fn go_direction(self, direction: Direction, steps: u8, size: u8) -> Option<Self> {
        let (dx, dy) = direction.delta();
        let x = self.x as i16 + dx as i16 * steps as i16;
        let y = self.y as i16 + dy as i16 * steps as i16;
        if (0..size as i16).contains(&x) && (0..size as i16).contains(&y) {
            Some(Square::new(x as u8, y as u8))
        } else {
            None
        }
    }

    pub fn parse_square(input: &str, size: u8) -> Result<Self, pgn_traits::Error> {
        let mut chars = input.chars();
        let (Some(file), Some(rank), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(pgn_traits::Error::new_parse_error(format!(
                "Couldn't parse square \"{}\"",
                input
            )));
        };
        if !('a'..='h').contains(&file) || !('1'..='8').contains(&rank) {
            return Err(pgn_traits::Error::new_parse_error(format!(
                "Couldn't parse square \"{}\"",
                input
            )));
        }
        let square = Square::new(file as u8 - b'a', rank as u8 - b'1');
        if square.x >= size || square.y >= size {
            return Err(pgn_traits::Error::new_parse_error(format!(
                "Square {} is outside the {}x{} board",
                input, size, size
            )));
        }
        Ok(square)
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.x) as char, self.y + 1)
    }
}

/// The contents of a square on the board, consisting of zero or more pieces.
///
/// Pieces are indexed from the top, so `get(0)` is the controlling piece.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Hash)]
pub struct Stack {
    pub(crate) top_stone: Option<Piece>,
    /// Bit `i` is set if the piece `i + 1` below the top is black
    pub(crate) below: u64,
    pub(crate) height: u8,
}

impl Stack {
    pub fn get(&self, i: u8) -> Option<Piece> {
        if i >= self.height {
            None
        } else if i == 0 {
            self.top_stone
        } else if i <= 64 && self.below & (1 << (i - 1)) != 0 {
            Some(BlackFlat)
        } else {
            Some(WhiteFlat)
        }
    }

    pub fn top_stone(&self) -> Option<Piece> {
        self.top_stone
    }

    pub fn is_empty(&self) -> bool {
        self.height == 0
    }

    pub fn len(&self) -> u8 {
        self.height
    }

    /// Pieces from top to bottom
    pub fn iter(&self) -> impl Iterator<Item = Piece> + '_ {
        (0..self.height).filter_map(move |i| self.get(i))
    }
}

/// Formats a color as the digit used in TPS
pub fn color_digit(color: Color) -> char {
    match color {
        Color::White => '1',
        Color::Black => '2',
    }
}
