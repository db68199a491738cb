use lazy_static::lazy_static;

use crate::position::{Direction, Drops, Move, Position, Role, Square, MAX_BOARD_SIZE};

lazy_static! {
    /// For each carry `h`, every ordered way of dropping exactly `h` pieces,
    /// by increasing first drop.
    static ref DROP_TABLE: Vec<Vec<Drops>> = {
        let mut table: Vec<Vec<Drops>> = vec![vec![]; MAX_BOARD_SIZE + 1];
        for carry in 1..=MAX_BOARD_SIZE {
            let mut compositions = vec![];
            for first in 1..carry {
                for rest in table[carry - first].iter() {
                    compositions.push(rest.prepend(first as u8));
                }
            }
            compositions.push(Drops::single(carry as u8));
            table[carry] = compositions;
        }
        table
    };
}

pub(crate) fn drop_compositions(carry: u8) -> &'static [Drops] {
    &DROP_TABLE[carry as usize]
}

impl Position {
    /// Appends every legal move to `moves`
    pub fn generate_moves(&self, moves: &mut Vec<Move>) {
        let size = self.size();
        let opening = self.move_number() < 2;
        // The opening plies place the opponent's flats
        let placer = if opening {
            !self.to_move()
        } else {
            self.to_move()
        };
        let has_flat = self.stones_left(placer) > 0;
        let has_cap = self.caps_left(self.to_move()) > 0;
        let own = self.controlled_by(self.to_move());

        for x in 0..size {
            for y in 0..size {
                let square = Square::new(x, y);
                let i = square.index(size);
                let height = self.height(i);
                if height == 0 {
                    if has_flat {
                        moves.push(Move::Place(Role::Flat, square));
                    }
                    if !opening {
                        if has_flat {
                            moves.push(Move::Place(Role::Wall, square));
                        }
                        if has_cap {
                            moves.push(Move::Place(Role::Cap, square));
                        }
                    }
                    continue;
                }
                if opening || own & (1 << i) == 0 {
                    continue;
                }
                let carry = height.min(size);
                let is_cap = self.caps() & (1 << i) != 0;
                for direction in [
                    Direction::West,
                    Direction::East,
                    Direction::South,
                    Direction::North,
                ] {
                    let (steps, crush) = self.open_steps(square, direction, is_cap);
                    if steps == 0 && !crush {
                        continue;
                    }
                    for carried in 1..=carry {
                        moves.extend(
                            drop_compositions(carried)
                                .iter()
                                .filter(|drops| {
                                    drops.fits_in(steps)
                                        || (crush
                                            && drops.len() == steps + 1
                                            && drops.last() == 1)
                                })
                                .map(|&drops| Move::Slide(square, direction, drops)),
                        );
                    }
                }
            }
        }
    }

    /// Number of squares a slide can travel before hitting the edge, a capstone or a wall,
    /// and whether a capstone can go one step further to crush that wall
    fn open_steps(&self, square: Square, direction: Direction, is_cap: bool) -> (u8, bool) {
        let size = self.size();
        let blockers = self.standing() | self.caps();
        let mut steps = 0;
        let mut current = square;
        while let Some(next) = current.go_direction(direction, 1, size) {
            let bit = 1u64 << next.index(size);
            if blockers & bit != 0 {
                return (steps, is_cap && self.standing() & bit != 0);
            }
            steps += 1;
            current = next;
        }
        (steps, false)
    }

    /// Clears `scratch`, fills it with the legal moves and returns them
    pub fn all_moves<'a>(&self, scratch: &'a mut Vec<Move>) -> &'a [Move] {
        scratch.clear();
        self.generate_moves(scratch);
        scratch
    }
}
