//! Static evaluation of positions.
//!
//! Values are integers from the perspective of the side to move. Decided games
//! score close to `MAX_EVAL` or `MIN_EVAL`, offset by the move number so that faster
//! wins are preferred.

use std::io;

use board_game_traits::{Color, GameResult};
use lazy_static::lazy_static;

use crate::position::{Position, MAX_BOARD_SIZE};

pub mod value_eval;
pub mod weights;

pub use value_eval::WeightedEvaluator;
pub use weights::{Feature, UnknownFeature, Weights};

pub const MAX_EVAL: i64 = 1 << 30;
pub const MIN_EVAL: i64 = -MAX_EVAL;
/// Values beyond this are proven results
pub const WIN_THRESHOLD: i64 = MAX_EVAL - 1_000_000;

lazy_static! {
    static ref DEFAULT_EVALUATORS: Vec<WeightedEvaluator> = (3..=MAX_BOARD_SIZE as u8)
        .map(WeightedEvaluator::default_for_size)
        .collect();
}

/// A pluggable static evaluation function
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, position: &Position) -> i64;

    /// Writes a human-readable breakdown of the evaluation
    fn explain(&self, position: &Position, out: &mut dyn io::Write) -> io::Result<()> {
        writeln!(out, "score\t{}", self.evaluate(position))
    }
}

impl<F: Fn(&Position) -> i64 + Send + Sync> Evaluator for F {
    fn evaluate(&self, position: &Position) -> i64 {
        self(position)
    }
}

/// Evaluates with the default weights for the position's size
pub fn evaluate(position: &Position) -> i64 {
    default_evaluator(position.size()).evaluate(position)
}

pub fn explain_score(position: &Position, out: &mut dyn io::Write) -> io::Result<()> {
    default_evaluator(position.size()).explain(position, out)
}

pub fn default_evaluator(size: u8) -> &'static WeightedEvaluator {
    &DEFAULT_EVALUATORS[size as usize - 3]
}

/// Value of a decided game, from the perspective of the side to move.
/// Offset by the number of full moves, so that both sides see the same magnitude.
pub fn terminal_value(position: &Position, result: GameResult) -> i64 {
    let moves = position.move_number() as i64 / 2;
    match (result, position.to_move()) {
        (GameResult::Draw, _) => 0,
        (GameResult::WhiteWin, Color::White) | (GameResult::BlackWin, Color::Black) => {
            MAX_EVAL - moves
        }
        _ => MIN_EVAL + moves,
    }
}

/// Whether `value` is a proven win or loss
pub fn is_decisive(value: i64) -> bool {
    value.abs() > WIN_THRESHOLD
}
