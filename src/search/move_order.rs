//! Staged move ordering: transposition table move, principal variation move,
//! the killer moves of the ply, then the remaining moves by history score.

use std::cmp::Reverse;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

use crate::position::{Move, Position, MAX_BOARD_SIZE};

const NUM_SQUARES: usize = MAX_BOARD_SIZE * MAX_BOARD_SIZE;

/// Ordering state shared by every node of one engine
pub struct MoveOrdering {
    pub(crate) rng: SmallRng,
    /// Beta cutoff credit per destination square
    pub(crate) history: [u64; NUM_SQUARES],
    /// The two most recent cutoff moves per ply, newest first
    killers: Vec<[Option<Move>; 2]>,
    /// Fixed tie-break per square, higher towards the center
    heat: [u8; NUM_SQUARES],
    no_sort: bool,
    /// Generated moves that failed to apply
    pub(crate) illegal_moves: u64,
}

impl MoveOrdering {
    pub fn new(size: u8, rng: SmallRng, no_sort: bool) -> Self {
        let mut heat = [0; NUM_SQUARES];
        for y in 0..size {
            for x in 0..size {
                let from_edge = x.min(y).min(size - 1 - x).min(size - 1 - y);
                heat[y as usize * size as usize + x as usize] = from_edge + 1;
            }
        }
        MoveOrdering {
            rng,
            history: [0; NUM_SQUARES],
            killers: vec![],
            heat,
            no_sort,
            illegal_moves: 0,
        }
    }

    pub fn credit(&mut self, position: &Position, mv: Move, depth: u8) {
        let i = mv.destination().index(position.size());
        self.history[i] = self.history[i].saturating_add(depth as u64 * depth as u64);
    }

    pub fn store_killer(&mut self, mv: Move, ply: usize) {
        if ply >= self.killers.len() {
            self.killers.resize(ply + 1, [None; 2]);
        }
        let slots = &mut self.killers[ply];
        if slots[0] != Some(mv) {
            slots[1] = slots[0];
            slots[0] = Some(mv);
        }
    }

    fn killers(&self, ply: usize) -> [Option<Move>; 2] {
        self.killers.get(ply).copied().unwrap_or([None; 2])
    }

    /// Clears the history scores and the killer moves
    pub fn clear_history(&mut self) {
        self.history = [0; NUM_SQUARES];
        self.killers.clear();
    }

    fn order(&mut self, position: &Position, moves: &mut [Move], ply: usize) {
        if ply == 0 {
            moves.shuffle(&mut self.rng);
        } else if !self.no_sort {
            let size = position.size();
            let (history, heat) = (&self.history, &self.heat);
            moves.sort_by_key(|mv| {
                let i = mv.destination().index(size);
                Reverse((history[i], heat[i]))
            });
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Stage {
    TtMove,
    PvMove,
    Killer(usize),
    Generate,
    Generated(usize),
}

/// Yields the moves of a single node, applying each to `child`
pub struct MovePicker {
    stage: Stage,
    tt_move: Option<Move>,
    pv_move: Option<Move>,
    /// Killers that were yielded, to be skipped among the generated moves
    killers: [Option<Move>; 2],
    ply: usize,
}

impl MovePicker {
    pub fn new(tt_move: Option<Move>, pv_move: Option<Move>, ply: usize) -> Self {
        MovePicker {
            stage: Stage::TtMove,
            tt_move,
            pv_move,
            killers: [None; 2],
            ply,
        }
    }

    /// Returns the next move, with `child` set to the position after it.
    /// `moves` is scratch space owned by the node.
    pub fn next(
        &mut self,
        ordering: &mut MoveOrdering,
        position: &Position,
        moves: &mut Vec<Move>,
        child: &mut Position,
    ) -> Option<Move> {
        loop {
            match self.stage {
                Stage::TtMove => {
                    self.stage = Stage::PvMove;
                    if let Some(mv) = self.tt_move {
                        if position.move_preallocated(&mv, child).is_ok() {
                            return Some(mv);
                        }
                        self.tt_move = None;
                    }
                }
                Stage::PvMove => {
                    self.stage = Stage::Killer(0);
                    if let Some(mv) = self.pv_move.filter(|mv| Some(*mv) != self.tt_move) {
                        if position.move_preallocated(&mv, child).is_ok() {
                            return Some(mv);
                        }
                    }
                    self.pv_move = None;
                }
                Stage::Killer(slot) => {
                    if slot == 0 {
                        self.killers = ordering.killers(self.ply);
                    }
                    self.stage = if slot == 0 {
                        Stage::Killer(1)
                    } else {
                        Stage::Generate
                    };
                    if let Some(mv) = self.killers[slot] {
                        if Some(mv) != self.tt_move
                            && Some(mv) != self.pv_move
                            && position.move_preallocated(&mv, child).is_ok()
                        {
                            return Some(mv);
                        }
                        self.killers[slot] = None;
                    }
                }
                Stage::Generate => {
                    self.stage = Stage::Generated(0);
                    moves.clear();
                    position.generate_moves(moves);
                    ordering.order(position, moves, self.ply);
                }
                Stage::Generated(i) => {
                    let mv = *moves.get(i)?;
                    self.stage = Stage::Generated(i + 1);
                    if Some(mv) == self.tt_move
                        || Some(mv) == self.pv_move
                        || self.killers.contains(&Some(mv))
                    {
                        continue;
                    }
                    match position.move_preallocated(&mv, child) {
                        Ok(()) => return Some(mv),
                        Err(err) => {
                            ordering.illegal_moves += 1;
                            log::debug!("Generated illegal move {} in {:?}: {}", mv, position, err);
                        }
                    }
                }
            }
        }
    }
}
