use board_game_traits::{Color, GameResult};

use crate::position::bitboard::popcount;
use crate::position::Piece::*;
use crate::position::{
    BoardConfig, Direction, Drops, Move, MoveError, Piece, Position, Role, Square, Symmetry,
    WinReason,
};
use crate::tests::{do_moves_and_check_validity, random_game};

fn square(name: &str, size: u8) -> Square {
    Square::parse_square(name, size).unwrap()
}

#[test]
fn first_moves_place_opponent_flats_test() {
    let position = Position::start_position(5);
    let position = do_moves_and_check_validity(&position, &["a1", "e5"]);

    assert_eq!(position.top(0, 0), Some(BlackFlat));
    assert_eq!(position.top(4, 4), Some(WhiteFlat));
    assert_eq!(position.white_stones(), 20);
    assert_eq!(position.black_stones(), 20);
    assert_eq!(position.to_move(), Color::White);
    assert_eq!(position.move_number(), 2);
}

#[test]
fn illegal_opening_moves_test() {
    let position = Position::start_position(5);
    let a1 = Square::new(0, 0);
    assert_eq!(
        position.do_move(&Move::Place(Role::Wall, a1)).err(),
        Some(MoveError::IllegalOpening)
    );
    assert_eq!(
        position.do_move(&Move::Place(Role::Cap, a1)).err(),
        Some(MoveError::IllegalOpening)
    );

    let position = position.do_move(&Move::Place(Role::Flat, a1)).unwrap();
    assert_eq!(
        position
            .do_move(&Move::Slide(a1, Direction::North, Drops::single(1)))
            .err(),
        Some(MoveError::IllegalOpening)
    );

    let mut moves = vec![];
    position.generate_moves(&mut moves);
    assert_eq!(moves.len(), 24);
    assert!(moves
        .iter()
        .all(|mv| matches!(mv, Move::Place(Role::Flat, _))));
}

#[test]
fn placement_errors_test() {
    let position = do_moves_and_check_validity(&Position::start_position(5), &["a1", "e5"]);
    assert_eq!(
        position.do_move(&Move::from_string("a1", 5).unwrap()).err(),
        Some(MoveError::Occupied)
    );
    let position = do_moves_and_check_validity(&position, &["Cc3", "Cc2"]);
    assert_eq!(
        position.do_move(&Move::from_string("Cd4", 5).unwrap()).err(),
        Some(MoveError::NoReserve)
    );
    // No capstones on 4x4
    let position = do_moves_and_check_validity(&Position::start_position(4), &["a1", "d4"]);
    assert_eq!(
        position.do_move(&Move::from_string("Cb2", 4).unwrap()).err(),
        Some(MoveError::NoReserve)
    );
}

#[test]
fn off_board_moves_test() {
    let position = do_moves_and_check_validity(&Position::start_position(5), &["a1", "e5"]);
    assert_eq!(
        position
            .do_move(&Move::Place(Role::Flat, Square::new(5, 0)))
            .err(),
        Some(MoveError::OffBoard)
    );
    assert_eq!(
        position
            .do_move(&Move::Slide(
                Square::new(0, 7),
                Direction::South,
                Drops::single(1)
            ))
            .err(),
        Some(MoveError::OffBoard)
    );
}

#[test]
fn no_flat_placements_without_flats_test() {
    let position = Position::new(BoardConfig::with_pieces(5, 3, 1));
    let position =
        do_moves_and_check_validity(&position, &["a1", "e5", "a3", "e3", "c1", "c5"]);
    assert_eq!(position.stones_left(Color::White), 0);
    assert_eq!(position.caps_left(Color::White), 1);
    assert_eq!(position.game_over(), None);

    let mut moves = vec![];
    position.generate_moves(&mut moves);
    for mv in moves.iter() {
        assert!(position.do_move(mv).is_ok(), "{} is illegal", mv);
        assert!(!matches!(mv, Move::Place(Role::Flat | Role::Wall, _)));
    }
    // A capstone on each of the 19 empty squares, and the slides of a3, c1 and e5
    assert_eq!(moves.len(), 19 + 3 + 3 + 2);
    assert_eq!(
        position.do_move(&Move::from_string("b2", 5).unwrap()).err(),
        Some(MoveError::NoReserve)
    );

    // Black is also down to its capstone after any slide
    let mut replies = vec![];
    for mv in moves.iter() {
        let child = position.do_move(mv).unwrap();
        replies.clear();
        child.generate_moves(&mut replies);
        for reply in replies.iter() {
            assert!(child.do_move(reply).is_ok(), "{} is illegal after {}", reply, mv);
        }
    }
}

#[test]
fn slide_errors_test() {
    let position = Position::from_tps("x5/x5/x5/x,2C,x3/x,1,1S,21,x 1 5").unwrap();
    let play = |move_string: &str| position.do_move(&Move::from_string(move_string, 5).unwrap());

    // Onto a capstone
    assert_eq!(play("b1+").err(), Some(MoveError::IllegalSlide));
    // Onto a wall without a capstone
    assert_eq!(play("b1>").err(), Some(MoveError::IllegalSlide));
    // Off the board
    assert_eq!(play("b1-").err(), Some(MoveError::IllegalSlide));
    // Carrying more than the stack
    assert_eq!(play("2b1<").err(), Some(MoveError::IllegalSlide));
    // Opponent's stack
    assert_eq!(play("b2-").err(), Some(MoveError::IllegalSlide));
    // The wall moves onto the stack
    assert!(play("c1>").is_ok());
    assert!(play("2d1<").is_err());
    assert!(play("2d1+11").is_ok());
}

#[test]
fn capstone_crushes_wall_test() {
    let position = Position::from_tps("x5/x5/x5/x,2S,x3/x,1C,x3 1 3").unwrap();
    let crushed = do_moves_and_check_validity(&position, &["b1+"]);

    let b2 = crushed.at(1, 1);
    assert_eq!(b2.len(), 2);
    assert_eq!(b2.get(0), Some(WhiteCap));
    assert_eq!(b2.get(1), Some(BlackFlat));
    assert_eq!(crushed.standing(), 0);
    assert!(crushed.at(1, 0).is_empty());
}

#[test]
fn crush_needs_lone_capstone_test() {
    let position = Position::from_tps("x5/x5/x5/x,2S,x3/x,21C,x3 1 5").unwrap();
    let mut moves = vec![];
    position.generate_moves(&mut moves);

    assert!(moves.contains(&Move::from_string("b1+", 5).unwrap()));
    assert!(!moves.contains(&Move::from_string("2b1+", 5).unwrap()));
    assert_eq!(
        position.do_move(&Move::from_string("2b1+", 5).unwrap()).err(),
        Some(MoveError::IllegalSlide)
    );
}

#[test]
fn slide_drops_bottom_pieces_first_test() {
    let position = Position::from_tps("x5/x5/x5/x5/2121,x4 1 5").unwrap();
    let position = do_moves_and_check_validity(&position, &["3a1>21"]);

    let a1 = position.at(0, 0);
    assert_eq!(a1.iter().collect::<Vec<_>>(), vec![BlackFlat]);
    let b1 = position.at(1, 0);
    assert_eq!(b1.iter().collect::<Vec<_>>(), vec![BlackFlat, WhiteFlat]);
    let c1 = position.at(2, 0);
    assert_eq!(c1.iter().collect::<Vec<_>>(), vec![WhiteFlat]);
    assert_eq!(position.to_tps(), "x5/x5/x5/x5/2,12,1,x2 2 5");
}

#[test]
fn white_road_test() {
    let position = Position::from_tps("x4,1/x4,1/x3,2,1/x3,2,1/2,x3,1 1 6").unwrap();
    assert!(position.has_road(Color::White));
    assert!(!position.has_road(Color::Black));
    assert_eq!(position.game_over(), Some(GameResult::WhiteWin));

    let details = position.win_details();
    assert!(details.over);
    assert_eq!(details.reason, Some(WinReason::Road));
    assert_eq!(details.winner, Some(Color::White));
    assert_eq!(details.game_result(), Some(GameResult::WhiteWin));
}

#[test]
fn walls_do_not_count_for_roads_test() {
    let position = Position::from_tps("x4,1/x4,1/x3,2,1S/x3,2,1/2,x3,1 1 6").unwrap();
    assert!(!position.has_road(Color::White));
    assert_eq!(position.game_over(), None);

    let position = Position::from_tps("x4,1/x4,1/x3,2,1C/x3,2,1/2,x3,1 1 6").unwrap();
    assert!(position.has_road(Color::White));
}

#[test]
fn double_road_goes_to_mover_test() {
    // Black to move, so white made the last move
    let position = Position::from_tps("1,1,1,1,1/x5/x5/x5/2,2,2,2,2 2 6").unwrap();
    assert_eq!(position.road_winner(), Some(Color::White));
    assert_eq!(position.game_over(), Some(GameResult::WhiteWin));

    let position = Position::from_tps("1,1,1,1,1/x5/x5/x5/2,2,2,2,2 1 7").unwrap();
    assert_eq!(position.game_over(), Some(GameResult::BlackWin));
}

#[test]
fn road_made_by_slide_test() {
    let position = Position::from_tps("x5/x5/x5/x4,21/1,1,1,1,x 1 6").unwrap();
    assert_eq!(position.game_over(), None);
    let position = do_moves_and_check_validity(&position, &["e2-"]);
    assert_eq!(position.game_over(), Some(GameResult::WhiteWin));
}

#[test]
fn full_board_flat_win_test() {
    let position =
        Position::from_tps("1,2,1,2,1/2,1,2,1,2/1,2,1,2,1/2,1,2,1,2/1,2,1,2,1 1 14").unwrap();
    assert!(position.is_board_full());
    assert_eq!(position.flat_counts(), (13, 12));
    assert_eq!(position.game_over(), Some(GameResult::WhiteWin));
    let details = position.win_details();
    assert_eq!(details.reason, Some(WinReason::Flats));
    assert_eq!((details.white_flats, details.black_flats), (13, 12));
}

#[test]
fn full_board_walls_do_not_count_test() {
    let position =
        Position::from_tps("1,2,1,2,1/2,1,2,1,2/1,2,1S,2,1/2,1,2,1,2/1,2,1,2,1 1 14").unwrap();
    assert_eq!(position.flat_counts(), (12, 12));
    assert_eq!(position.game_over(), Some(GameResult::Draw));
    assert_eq!(position.win_details().winner, None);
}

#[test]
fn out_of_pieces_ends_game_test() {
    let position = Position::new(BoardConfig::with_pieces(3, 2, 0));
    let position = do_moves_and_check_validity(&position, &["a1", "c3"]);
    assert_eq!(position.game_over(), None);

    let position = do_moves_and_check_validity(&position, &["b2"]);
    assert_eq!(position.stones_left(Color::White), 0);
    assert_eq!(position.game_over(), Some(GameResult::WhiteWin));
    assert_eq!(position.win_details().reason, Some(WinReason::Flats));
}

#[test]
fn transpositions_have_same_hash_test() {
    let start = Position::start_position(5);
    let first = do_moves_and_check_validity(&start, &["a1", "e5", "b1", "d5", "c1"]);
    let second = do_moves_and_check_validity(&start, &["a1", "e5", "c1", "d5", "b1"]);
    assert_eq!(first.hash(), second.hash());
    assert!(first.equal(&second));

    let third = do_moves_and_check_validity(&start, &["a1", "e5", "c1", "d5", "b2"]);
    assert_ne!(first.hash(), third.hash());
    assert!(!first.equal(&third));
}

#[test]
fn hash_includes_side_to_move_test() {
    let white = Position::from_tps("x5/x5/x2,1,x2/x5/2,x4 1 3").unwrap();
    let black = Position::from_tps("x5/x5/x2,1,x2/x5/2,x4 2 3").unwrap();
    assert_ne!(white.hash(), black.hash());
}

#[test]
fn passing_only_changes_side_to_move_test() {
    let position = Position::from_tps("x5/x5/x2,1,x2/x5/2,x4 1 3").unwrap();
    let mut passed = position.clone();
    position.pass_preallocated(&mut passed);
    assert_eq!(passed.to_move(), Color::Black);
    assert_eq!(passed.occupied(), position.occupied());
    assert_eq!(
        passed.hash(),
        Position::from_tps("x5/x5/x2,1,x2/x5/2,x4 2 3").unwrap().hash()
    );
}

#[test]
fn winning_move_is_found_test() {
    let position = Position::from_tps("x5/x5/x5/2,2,x3/1,1,1,1,x 1 5").unwrap();
    let mut moves = vec![];
    let mut scratch = position.clone();
    assert!(position.has_winning_move(&mut moves, &mut scratch));

    let blocked = do_moves_and_check_validity(&position, &["b3"]);
    let blocked = do_moves_and_check_validity(&blocked, &["Se1"]);
    assert!(!blocked.has_winning_move(&mut moves, &mut scratch));
}

#[test]
fn irreversible_moves_test() {
    let position = Position::from_tps("x5/x5/x5/x5/1,x3,2 1 3").unwrap();
    let slid = do_moves_and_check_validity(&position, &["a1>"]);
    assert!(!slid.is_irreversible_from(&position));
    let placed = do_moves_and_check_validity(&position, &["c3"]);
    assert!(placed.is_irreversible_from(&position));
}

fn check_invariants(position: &Position) {
    let config = position.config();
    let size = position.size();
    assert_eq!(position.white() & position.black(), 0);
    assert_eq!(position.standing() & position.caps(), 0);
    assert_eq!(
        (position.standing() | position.caps()) & !position.occupied(),
        0
    );

    let mut stones = [0u32; 2];
    let mut caps = [0u32; 2];
    for square in position.squares() {
        let index = square.index(size);
        let stack = position.at(square.x, square.y);
        assert_eq!(stack.len(), position.height(index));
        assert_eq!(stack.is_empty(), position.occupied() & (1 << index) == 0);
        for (i, piece) in stack.iter().enumerate() {
            if i > 0 {
                assert_eq!(piece.role(), Role::Flat, "Buried {:?} in {:?}", piece, position);
            }
            let color = (piece.color() == Color::Black) as usize;
            match piece.role() {
                Role::Cap => caps[color] += 1,
                _ => stones[color] += 1,
            }
        }
    }
    assert_eq!(
        stones[0] + position.white_stones() as u32,
        config.pieces as u32
    );
    assert_eq!(
        stones[1] + position.black_stones() as u32,
        config.pieces as u32
    );
    assert_eq!(caps[0] + position.white_caps() as u32, config.capstones as u32);
    assert_eq!(caps[1] + position.black_caps() as u32, config.capstones as u32);
    assert_eq!(popcount(position.caps()), caps[0] + caps[1]);
}

#[test]
fn random_games_keep_invariants_test() {
    for size in 3..=8 {
        for seed in 0..5 {
            let game = random_game(size, seed * 100 + size as u64, 200);
            for (ply, position) in game.iter().enumerate() {
                check_invariants(position);
                assert_eq!(position.move_number(), ply);

                let reloaded = Position::from_tps(&position.to_tps()).unwrap();
                assert!(
                    reloaded.equal(position),
                    "{} reloaded as {}",
                    position.to_tps(),
                    reloaded.to_tps()
                );
                assert_eq!(reloaded.hash(), position.hash());
            }
            for position in game[..game.len() - 1].iter() {
                assert_eq!(position.game_over(), None);
            }
        }
    }
}

#[test]
fn generated_moves_are_legal_test() {
    let game = random_game(6, 7, 80);
    let mut moves = vec![];
    for position in game.iter() {
        moves.clear();
        position.generate_moves(&mut moves);
        for mv in moves.iter() {
            let next = position
                .do_move(mv)
                .unwrap_or_else(|err| panic!("{} failed in {:?}: {}", mv, position, err));
            assert_eq!(next.to_move(), !position.to_move());
        }
    }
}

#[test]
fn symmetries_test() {
    let game = random_game(5, 3, 30);
    let position = &game[game.len() - 1];
    let canonical = position.canonical_hash();
    let mut moves = vec![];
    position.generate_moves(&mut moves);

    for symmetry in Symmetry::ALL {
        let transformed = position.transform(symmetry);
        check_invariants(&transformed);
        assert_eq!(transformed.canonical_hash(), canonical);
        assert!(transformed
            .transform(symmetry.inverse())
            .equal(position));
        assert_eq!(transformed.flat_counts(), position.flat_counts());

        for mv in moves.iter() {
            let transformed_move = symmetry.transform_move(*mv, 5);
            let child = transformed.do_move(&transformed_move).unwrap();
            assert!(child.equal(&position.do_move(mv).unwrap().transform(symmetry)));
        }
    }
}

#[test]
fn start_position_has_one_symmetry_class_test() {
    let position = Position::start_position(6);
    assert_eq!(position.symmetries().len(), 1);

    let position = do_moves_and_check_validity(&position, &["a1"]);
    assert_eq!(position.symmetries().len(), 4);
}

#[test]
fn symmetry_maps_squares_test() {
    let a1 = square("a1", 5);
    assert_eq!(Symmetry::FlipX.square(a1, 5), square("e1", 5));
    assert_eq!(Symmetry::FlipY.square(a1, 5), square("a5", 5));
    assert_eq!(Symmetry::Rotate180.square(a1, 5), square("e5", 5));
    assert_eq!(Symmetry::Transpose.square(square("b1", 5), 5), square("a2", 5));
    for symmetry in Symmetry::ALL {
        let b4 = square("b4", 5);
        assert_eq!(symmetry.inverse().square(symmetry.square(b4, 5), 5), b4);
    }
}

#[test]
fn piece_helpers_test() {
    assert_eq!(Piece::from_role_color(Role::Cap, Color::Black), BlackCap);
    assert_eq!(!WhiteWall, BlackWall);
    assert!(WhiteCap.is_road_piece());
    assert!(!BlackWall.is_road_piece());
}
