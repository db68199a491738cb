//! Tak positions, move application and game-over detection, along with all required data types.

use std::fmt;

use arrayvec::ArrayVec;
use board_game_traits::{Color, GameResult};

use bitboard::{low_bits, popcount, BitIter, Constants};

pub mod bitboard;
mod move_gen;
pub mod mv;
pub mod symmetry;
pub mod tps;
pub mod utils;
mod zobrist;

pub use mv::{Drops, Move, MoveError};
pub use symmetry::Symmetry;
pub use utils::{Direction, Piece, Role, Square, Stack};

pub const MAX_BOARD_SIZE: usize = 8;

pub const fn starting_stones(size: u8) -> u8 {
    match size {
        3 => 10,
        4 => 15,
        5 => 21,
        6 => 30,
        7 => 40,
        8 => 50,
        _ => 0,
    }
}

pub const fn starting_capstones(size: u8) -> u8 {
    match size {
        5 => 1,
        6 => 1,
        7 => 1,
        8 => 2,
        _ => 0,
    }
}

/// Board size and the reserves each player starts with
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct BoardConfig {
    pub size: u8,
    pub pieces: u8,
    pub capstones: u8,
}

impl BoardConfig {
    /// Standard reserves for `size`. Panics on sizes outside `3..=8`.
    pub fn new(size: u8) -> Self {
        Self::with_pieces(size, starting_stones(size), starting_capstones(size))
    }

    pub fn with_pieces(size: u8, pieces: u8, capstones: u8) -> Self {
        assert!(
            (3..=MAX_BOARD_SIZE as u8).contains(&size),
            "Unsupported size {}",
            size
        );
        BoardConfig {
            size,
            pieces,
            capstones,
        }
    }

    pub fn constants(&self) -> &'static Constants {
        Constants::for_size(self.size)
    }
}

/// Connected components of road pieces with at least two squares, for each player
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupAnalysis {
    pub white_groups: ArrayVec<u64, 32>,
    pub black_groups: ArrayVec<u64, 32>,
}

impl GroupAnalysis {
    pub fn groups(&self, color: Color) -> &[u64] {
        match color {
            Color::White => &self.white_groups,
            Color::Black => &self.black_groups,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum WinReason {
    Road,
    Flats,
    Resignation,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct WinDetails {
    pub over: bool,
    pub reason: Option<WinReason>,
    /// `None` for draws and unfinished games
    pub winner: Option<Color>,
    pub white_flats: u32,
    pub black_flats: u32,
}

impl WinDetails {
    pub fn resignation(winner: Color, position: &Position) -> Self {
        let (white_flats, black_flats) = position.flat_counts();
        WinDetails {
            over: true,
            reason: Some(WinReason::Resignation),
            winner: Some(winner),
            white_flats,
            black_flats,
        }
    }

    pub fn game_result(&self) -> Option<GameResult> {
        if !self.over {
            None
        } else {
            Some(self.winner.map_or(GameResult::Draw, win_for))
        }
    }
}

pub fn win_for(color: Color) -> GameResult {
    match color {
        Color::White => GameResult::WhiteWin,
        Color::Black => GameResult::BlackWin,
    }
}

/// A complete game state.
///
/// Board contents are stored as top-piece bitmaps plus per-square heights, with
/// the colors of buried pieces packed into one word per square. Bit `j` of
/// `stacks[i]` is set if the piece `j + 1` below the top of square `i` is black.
#[derive(Clone)]
pub struct Position {
    config: BoardConfig,
    ply: u16,
    white_stones: u8,
    black_stones: u8,
    white_caps: u8,
    black_caps: u8,
    white: u64,
    black: u64,
    standing: u64,
    caps: u64,
    height: [u8; 64],
    stacks: [u64; 64],
    square_hashes: u64,
    analysis: GroupAnalysis,
}

impl Position {
    pub fn new(config: BoardConfig) -> Self {
        Position {
            config,
            ply: 0,
            white_stones: config.pieces,
            black_stones: config.pieces,
            white_caps: config.capstones,
            black_caps: config.capstones,
            white: 0,
            black: 0,
            standing: 0,
            caps: 0,
            height: [0; 64],
            stacks: [0; 64],
            square_hashes: 0,
            analysis: GroupAnalysis::default(),
        }
    }

    pub fn start_position(size: u8) -> Self {
        Self::new(BoardConfig::new(size))
    }

    pub fn config(&self) -> BoardConfig {
        self.config
    }

    pub fn size(&self) -> u8 {
        self.config.size
    }

    pub fn constants(&self) -> &'static Constants {
        self.config.constants()
    }

    pub fn to_move(&self) -> Color {
        if self.ply % 2 == 0 {
            Color::White
        } else {
            Color::Black
        }
    }

    /// Number of plies played
    pub fn move_number(&self) -> usize {
        self.ply as usize
    }

    pub fn white_stones(&self) -> u8 {
        self.white_stones
    }

    pub fn black_stones(&self) -> u8 {
        self.black_stones
    }

    pub fn white_caps(&self) -> u8 {
        self.white_caps
    }

    pub fn black_caps(&self) -> u8 {
        self.black_caps
    }

    pub fn stones_left(&self, color: Color) -> u8 {
        match color {
            Color::White => self.white_stones,
            Color::Black => self.black_stones,
        }
    }

    pub fn caps_left(&self, color: Color) -> u8 {
        match color {
            Color::White => self.white_caps,
            Color::Black => self.black_caps,
        }
    }

    pub fn white(&self) -> u64 {
        self.white
    }

    pub fn black(&self) -> u64 {
        self.black
    }

    pub fn standing(&self) -> u64 {
        self.standing
    }

    pub fn caps(&self) -> u64 {
        self.caps
    }

    pub fn occupied(&self) -> u64 {
        self.white | self.black
    }

    /// Squares whose top piece belongs to `color`
    pub fn controlled_by(&self, color: Color) -> u64 {
        match color {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }

    /// Flats and capstones controlled by `color`
    pub fn road_pieces(&self, color: Color) -> u64 {
        self.controlled_by(color) & !self.standing
    }

    pub fn height(&self, index: usize) -> u8 {
        self.height[index]
    }

    /// Colors of the buried pieces of a square, see `Position`
    pub fn stack_bits(&self, index: usize) -> u64 {
        self.stacks[index] & low_bits(self.height[index].saturating_sub(1) as u32)
    }

    pub fn analysis(&self) -> &GroupAnalysis {
        &self.analysis
    }

    fn top_at_index(&self, i: usize) -> Option<Piece> {
        let bit = 1 << i;
        let color = if self.white & bit != 0 {
            Color::White
        } else if self.black & bit != 0 {
            Color::Black
        } else {
            return None;
        };
        let role = if self.standing & bit != 0 {
            Role::Wall
        } else if self.caps & bit != 0 {
            Role::Cap
        } else {
            Role::Flat
        };
        Some(Piece::from_role_color(role, color))
    }

    pub fn top(&self, x: u8, y: u8) -> Option<Piece> {
        self.top_at_index(Square::new(x, y).index(self.size()))
    }

    pub fn top_at(&self, square: Square) -> Option<Piece> {
        self.top_at_index(square.index(self.size()))
    }

    pub fn at(&self, x: u8, y: u8) -> Stack {
        let i = Square::new(x, y).index(self.size());
        Stack {
            top_stone: self.top_at_index(i),
            below: self.stack_bits(i),
            height: self.height[i],
        }
    }

    pub fn hash(&self) -> u64 {
        zobrist::full_hash(
            self.square_hashes,
            self.white,
            self.black,
            self.standing,
            self.caps,
            self.ply as u8 % 2 + 1,
        )
    }

    /// Structural equality, ignoring cached data
    pub fn equal(&self, other: &Position) -> bool {
        let squares = self.size() as usize * self.size() as usize;
        self.config == other.config
            && self.ply == other.ply
            && self.white_stones == other.white_stones
            && self.black_stones == other.black_stones
            && self.white_caps == other.white_caps
            && self.black_caps == other.black_caps
            && self.white == other.white
            && self.black == other.black
            && self.standing == other.standing
            && self.caps == other.caps
            && self.height[..squares] == other.height[..squares]
            && (0..squares).all(|i| self.stack_bits(i) == other.stack_bits(i))
    }

    /// Recomputes the road groups. Must be called after the bitmaps change.
    fn analyze(&mut self) {
        let constants = self.constants();
        self.analysis.white_groups.clear();
        self.analysis.black_groups.clear();
        constants.flood_groups(
            self.white & !self.standing,
            &mut self.analysis.white_groups,
        );
        constants.flood_groups(
            self.black & !self.standing,
            &mut self.analysis.black_groups,
        );
    }

    /// Recomputes the hash and group caches from the board contents
    pub(crate) fn rebuild_caches(&mut self) {
        self.square_hashes = 0;
        for i in 0..self.size() as usize * self.size() as usize {
            self.stacks[i] = self.stack_bits(i);
            self.square_hashes ^= zobrist::square_hash(i, self.height[i], self.stacks[i]);
        }
        self.analyze();
    }

    pub fn do_move(&self, mv: &Move) -> Result<Position, MoveError> {
        let mut next = self.clone();
        self.move_preallocated(mv, &mut next)?;
        Ok(next)
    }

    /// Applies `mv`, writing the resulting position into `next`.
    /// On error, the contents of `next` are unspecified.
    pub fn move_preallocated(&self, mv: &Move, next: &mut Position) -> Result<(), MoveError> {
        next.clone_from(self);
        next.ply += 1;
        match *mv {
            Move::Place(role, square) => self.place(role, square, next)?,
            Move::Slide(square, direction, drops) => {
                if self.ply < 2 {
                    return Err(MoveError::IllegalOpening);
                }
                self.slide(square, direction, drops, next)?
            }
        }
        next.analyze();
        Ok(())
    }

    /// Gives the turn to the opponent without changing the board
    pub fn pass_preallocated(&self, next: &mut Position) {
        next.clone_from(self);
        next.ply += 1;
    }

    fn place(&self, role: Role, square: Square, next: &mut Position) -> Result<(), MoveError> {
        let mut color = self.to_move();
        if self.ply < 2 {
            if role != Role::Flat {
                return Err(MoveError::IllegalOpening);
            }
            color = !color;
        }
        let size = self.size();
        if square.x >= size || square.y >= size {
            return Err(MoveError::OffBoard);
        }
        let i = square.index(size);
        let bit = 1 << i;
        if self.occupied() & bit != 0 {
            return Err(MoveError::Occupied);
        }

        let reserve = match (role, color) {
            (Role::Cap, Color::White) => &mut next.white_caps,
            (Role::Cap, Color::Black) => &mut next.black_caps,
            (_, Color::White) => &mut next.white_stones,
            (_, Color::Black) => &mut next.black_stones,
        };
        if *reserve == 0 {
            return Err(MoveError::NoReserve);
        }
        *reserve -= 1;

        match role {
            Role::Cap => next.caps |= bit,
            Role::Wall => next.standing |= bit,
            Role::Flat => (),
        }
        match color {
            Color::White => next.white |= bit,
            Color::Black => next.black |= bit,
        }
        next.height[i] = 1;
        next.stacks[i] = 0;
        Ok(())
    }

    fn slide(
        &self,
        square: Square,
        direction: Direction,
        drops: Drops,
        next: &mut Position,
    ) -> Result<(), MoveError> {
        let size = self.size();
        if square.x >= size || square.y >= size {
            return Err(MoveError::OffBoard);
        }
        if drops.is_empty() || drops.iter().any(|drop| drop == 0) {
            return Err(MoveError::IllegalSlide);
        }
        let mut carry = drops.iter().map(|drop| drop as u32).sum::<u32>();
        let i = square.index(size);
        if carry > size as u32 || carry > self.height[i] as u32 {
            return Err(MoveError::IllegalSlide);
        }
        let top = match self.top_at_index(i) {
            Some(piece) if piece.color() == self.to_move() => piece,
            _ => return Err(MoveError::IllegalSlide),
        };

        // Bit 0 is the top piece, bit `k` the piece `k` below it
        let stack = (self.stacks[i] << 1) | (top.color() == Color::Black) as u64;

        let bit = 1u64 << i;
        next.caps &= !bit;
        next.standing &= !bit;
        if self.height[i] as u32 == carry {
            next.white &= !bit;
            next.black &= !bit;
        } else if stack & (1 << carry) == 0 {
            next.white |= bit;
            next.black &= !bit;
        } else {
            next.black |= bit;
            next.white &= !bit;
        }
        next.square_hashes ^= zobrist::square_hash(i, next.height[i], next.stacks[i]);
        next.stacks[i] = next.stacks[i].checked_shr(carry).unwrap_or(0);
        next.height[i] -= carry as u8;
        next.square_hashes ^= zobrist::square_hash(i, next.height[i], next.stacks[i]);

        let mut current = square;
        for drop in drops.iter() {
            let drop = drop as u32;
            current = current
                .go_direction(direction, 1, size)
                .ok_or(MoveError::IllegalSlide)?;
            if drop > carry {
                return Err(MoveError::IllegalSlide);
            }
            let d = current.index(size);
            let dest_bit = 1u64 << d;
            if next.caps & dest_bit != 0 {
                return Err(MoveError::IllegalSlide);
            }
            if next.standing & dest_bit != 0 {
                if carry != 1 || top.role() != Role::Cap {
                    return Err(MoveError::IllegalSlide);
                }
                next.standing &= !dest_bit;
            }

            next.square_hashes ^= zobrist::square_hash(d, next.height[d], next.stacks[d]);
            if next.white & dest_bit != 0 {
                next.stacks[d] <<= 1;
            } else if next.black & dest_bit != 0 {
                next.stacks[d] = (next.stacks[d] << 1) | 1;
            }
            let dropped_below = (stack >> (carry - drop + 1)) & low_bits(drop - 1);
            next.stacks[d] = (next.stacks[d] << (drop - 1)) | dropped_below;
            next.height[d] += drop as u8;
            next.square_hashes ^= zobrist::square_hash(d, next.height[d], next.stacks[d]);

            if stack & (1 << (carry - drop)) != 0 {
                next.black |= dest_bit;
                next.white &= !dest_bit;
            } else {
                next.white |= dest_bit;
                next.black &= !dest_bit;
            }
            carry -= drop;
            if carry == 0 {
                match top.role() {
                    Role::Cap => next.caps |= dest_bit,
                    Role::Wall => next.standing |= dest_bit,
                    Role::Flat => (),
                }
            }
        }
        Ok(())
    }

    /// Whether `self` can only have been reached from `parent` by a move that cannot be undone
    pub fn is_irreversible_from(&self, parent: &Position) -> bool {
        let reserves = |p: &Position| {
            p.white_stones as u32 + p.black_stones as u32 + p.white_caps as u32 + p.black_caps as u32
        };
        reserves(self) != reserves(parent) || popcount(self.standing) != popcount(parent.standing)
    }

    pub fn has_road(&self, color: Color) -> bool {
        let c = self.constants();
        self.analysis.groups(color).iter().any(|&group| {
            (group & c.left != 0 && group & c.right != 0)
                || (group & c.top != 0 && group & c.bottom != 0)
        })
    }

    /// The player with a road, if any. If both players have one, the player who just moved wins.
    pub fn road_winner(&self) -> Option<Color> {
        match (self.has_road(Color::White), self.has_road(Color::Black)) {
            (true, true) => Some(!self.to_move()),
            (true, false) => Some(Color::White),
            (false, true) => Some(Color::Black),
            (false, false) => None,
        }
    }

    /// Number of flats on top of a stack, for each player
    pub fn flat_counts(&self) -> (u32, u32) {
        let non_flats = self.standing | self.caps;
        (
            popcount(self.white & !non_flats),
            popcount(self.black & !non_flats),
        )
    }

    fn out_of_pieces(&self, color: Color) -> bool {
        self.stones_left(color) == 0 && self.caps_left(color) == 0
    }

    pub fn is_board_full(&self) -> bool {
        self.occupied() == self.constants().mask
    }

    pub fn game_over(&self) -> Option<GameResult> {
        if let Some(winner) = self.road_winner() {
            return Some(win_for(winner));
        }
        if !self.is_board_full()
            && !self.out_of_pieces(Color::White)
            && !self.out_of_pieces(Color::Black)
        {
            return None;
        }
        let (white_flats, black_flats) = self.flat_counts();
        Some(match white_flats.cmp(&black_flats) {
            std::cmp::Ordering::Greater => GameResult::WhiteWin,
            std::cmp::Ordering::Less => GameResult::BlackWin,
            std::cmp::Ordering::Equal => GameResult::Draw,
        })
    }

    pub fn win_details(&self) -> WinDetails {
        let (white_flats, black_flats) = self.flat_counts();
        let result = self.game_over();
        let reason = result.map(|_| {
            if self.road_winner().is_some() {
                WinReason::Road
            } else {
                WinReason::Flats
            }
        });
        WinDetails {
            over: result.is_some(),
            reason,
            winner: match result {
                Some(GameResult::WhiteWin) => Some(Color::White),
                Some(GameResult::BlackWin) => Some(Color::Black),
                _ => None,
            },
            white_flats,
            black_flats,
        }
    }

    /// Whether the side to move can complete a road with a single move
    pub fn has_winning_move(&self, moves: &mut Vec<Move>, scratch: &mut Position) -> bool {
        if self.game_over().is_some() {
            return false;
        }
        let mover = self.to_move();
        moves.clear();
        self.generate_moves(moves);
        moves
            .iter()
            .any(|mv| self.move_preallocated(mv, scratch).is_ok() && scratch.has_road(mover))
    }

    /// Counts the leaf positions `depth` plies ahead, not expanding finished games
    pub fn perft(&self, depth: u16) -> u64 {
        if depth == 0 {
            return 1;
        }
        if self.game_over().is_some() {
            return 0;
        }
        let mut moves = vec![];
        self.generate_moves(&mut moves);
        if depth == 1 {
            return moves.len() as u64;
        }
        let mut child = self.clone();
        moves
            .iter()
            .map(|mv| match self.move_preallocated(mv, &mut child) {
                Ok(()) => child.perft(depth - 1),
                Err(_) => 0,
            })
            .sum()
    }

    /// Indices of the squares on this board
    pub fn squares(&self) -> impl Iterator<Item = Square> {
        let size = self.size();
        BitIter::new(self.constants().mask).map(move |i| Square::from_index(i, size))
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_tps())
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = self.size();
        for y in (0..size).rev() {
            write!(f, "{} ", y + 1)?;
            for x in 0..size {
                let stack = self.at(x, y);
                let cell: String = stack
                    .iter()
                    .collect::<Vec<_>>()
                    .into_iter()
                    .rev()
                    .map(|piece| match piece {
                        Piece::WhiteFlat => '1',
                        Piece::BlackFlat => '2',
                        Piece::WhiteWall => 'w',
                        Piece::BlackWall => 'b',
                        Piece::WhiteCap => 'W',
                        Piece::BlackCap => 'B',
                    })
                    .collect();
                write!(f, "[{:>6}]", cell)?;
            }
            writeln!(f)?;
        }
        write!(f, "  ")?;
        for x in 0..size {
            write!(f, "    {}   ", (b'a' + x) as char)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:?} to move, reserves {}/{} white, {}/{} black",
            self.to_move(),
            self.white_stones,
            self.white_caps,
            self.black_stones,
            self.black_caps
        )
    }
}
