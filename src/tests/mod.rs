#[cfg(test)]
mod position_tests;
#[cfg(test)]
mod search_tests;

#[cfg(test)]
use crate::position::{Move, Position};
#[cfg(test)]
use rand::rngs::StdRng;
#[cfg(test)]
use rand::seq::SliceRandom;
#[cfg(test)]
use rand::SeedableRng;

/// Plays `move_strings` from `position`, checking that each move is generated as legal
#[cfg(test)]
fn do_moves_and_check_validity(position: &Position, move_strings: &[&str]) -> Position {
    let mut position = position.clone();
    let mut moves = vec![];
    for mv_string in move_strings.iter() {
        let mv = Move::from_string(mv_string, position.size()).unwrap();
        position.generate_moves(&mut moves);
        assert!(
            moves.contains(&mv),
            "Move {} was not among legal moves: {:?}\n{:?}",
            mv,
            moves,
            position
        );
        position = position.do_move(&mv).unwrap();
        moves.clear();
    }
    position
}

/// Every position of a random game, stopping early if the game ends
#[cfg(test)]
fn random_game(size: u8, seed: u64, max_plies: usize) -> Vec<Position> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut game = vec![Position::start_position(size)];
    let mut moves = vec![];
    while game.len() <= max_plies {
        let position = &game[game.len() - 1];
        if position.game_over().is_some() {
            break;
        }
        moves.clear();
        position.generate_moves(&mut moves);
        let mv = *moves.choose(&mut rng).unwrap();
        let next = position.do_move(&mv).unwrap();
        game.push(next);
    }
    game
}

/// The last position of a random game that has not ended after `plies` moves
#[cfg(test)]
fn random_position(size: u8, seed: u64, plies: usize) -> Position {
    (seed..)
        .map(|seed| random_game(size, seed, plies))
        .find(|game| game.len() == plies + 1 && game[plies].game_over().is_none())
        .unwrap()
        .pop()
        .unwrap()
}
