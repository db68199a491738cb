//! Annotated PTN moves and whitespace-separated move lists, such as
//! `1. a1 e5 2. c3 Cc4?! 3. c4-`

use std::fmt;
use std::str::FromStr;

use crate::position::{Move, Position};

pub const POSSIBLE_MOVE_ANNOTATIONS: [&str; 5] = ["''", "'", "!", "?", "\""];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtnMove {
    pub mv: Move,
    pub annotations: Vec<&'static str>,
}

impl PtnMove {
    /// Parses a single move, keeping any trailing annotations
    pub fn parse(input: &str, size: u8) -> Result<Self, pgn_traits::Error> {
        let mut move_string = input;
        let mut annotations = vec![];
        while let Some(annotation) = POSSIBLE_MOVE_ANNOTATIONS
            .iter()
            .find(|annotation| move_string.ends_with(*annotation))
        {
            move_string = &move_string[..move_string.len() - annotation.len()];
            annotations.insert(0, *annotation);
        }
        let mv = Move::from_string(move_string, size)?;
        Ok(PtnMove { mv, annotations })
    }
}

impl fmt::Display for PtnMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mv)?;
        for annotation in self.annotations.iter() {
            write!(f, "{}", annotation)?;
        }
        Ok(())
    }
}

/// A sequence of moves played from a start position
#[derive(Debug, Clone)]
pub struct MoveLine {
    pub moves: Vec<PtnMove>,
    /// The start position followed by the position after each move
    pub positions: Vec<Position>,
}

impl MoveLine {
    pub fn last_position(&self) -> &Position {
        // `positions` always contains the start position
        &self.positions[self.positions.len() - 1]
    }
}

/// Parses and plays a move list. Move numbers (`1.`, `12...`) and
/// game results are skipped, illegal moves are an error.
pub fn parse_move_line(start: &Position, line: &str) -> Result<MoveLine, pgn_traits::Error> {
    let mut moves = vec![];
    let mut positions = vec![start.clone()];
    for word in line.split_whitespace() {
        if let Some(num_string) = word.strip_suffix("...").or_else(|| word.strip_suffix('.')) {
            u64::from_str(num_string).map_err(|err| {
                pgn_traits::Error::new_caused_by(
                    pgn_traits::ErrorKind::ParseError,
                    format!("Bad move number \"{}\"", word),
                    err,
                )
            })?;
            continue;
        }
        if ["R-0", "0-R", "F-0", "0-F", "1-0", "0-1", "1/2-1/2"].contains(&word) {
            continue;
        }
        let position = &positions[positions.len() - 1];
        let ptn_move = PtnMove::parse(word, position.size())?;
        let next = position.do_move(&ptn_move.mv).map_err(|err| {
            pgn_traits::Error::new(
                pgn_traits::ErrorKind::IllegalMove,
                format!("Illegal move {}: {}", word, err),
            )
        })?;
        if position.game_over().is_some() {
            return Err(pgn_traits::Error::new(
                pgn_traits::ErrorKind::IllegalMove,
                format!("Move {} played after the game ended", word),
            ));
        }
        positions.push(next);
        moves.push(ptn_move);
    }
    Ok(MoveLine { moves, positions })
}
