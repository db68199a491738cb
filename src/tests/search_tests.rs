use std::sync::Arc;
use std::time::{Duration, Instant};

use board_game_traits::GameResult;

use crate::evaluation::{is_decisive, Evaluator, WIN_THRESHOLD};
use crate::position::{Move, Position, Role, Square, Symmetry};
use crate::search::{MinimaxAi, MinimaxConfig, OpeningBook, SearchContext};
use crate::tests::{do_moves_and_check_validity, random_position};

fn search(position: &Position, depth: u8) -> (Vec<Move>, i64) {
    let mut ai = MinimaxAi::new(MinimaxConfig::new(position.size()).depth(depth).seed(1));
    let (pv, value, _) = ai.analyze(&SearchContext::new(), position);
    (pv, value)
}

/// A position where neither side can make a road within four plies
fn opening_position() -> Position {
    do_moves_and_check_validity(
        &Position::start_position(5),
        &["a1", "e5", "c3", "c4", "d3", "b3"],
    )
}

fn check_pv_legality(position: &Position, pv: &[Move]) -> Position {
    let mut current = position.clone();
    for mv in pv {
        assert!(
            current.game_over().is_none(),
            "PV {:?} continues after the game ended",
            pv
        );
        current = current
            .do_move(mv)
            .unwrap_or_else(|err| panic!("Illegal move {} in pv {:?}: {}", mv, pv, err));
    }
    current
}

#[test]
fn finds_road_in_one_test() {
    let position = Position::from_tps("x5/x5/x5/x5/1,1,1,1,x 1 5").unwrap();
    let (pv, value) = search(&position, 2);
    assert!(value > WIN_THRESHOLD, "value {}", value);
    let after = position.do_move(&pv[0]).unwrap();
    assert_eq!(after.game_over(), Some(GameResult::WhiteWin));
}

#[test]
fn blocks_road_in_one_test() {
    let position = Position::from_tps("x5/x5/x5/2,2,x3/1,1,1,1,x 2 5").unwrap();
    let (pv, value) = search(&position, 2);
    assert!(!is_decisive(value), "value {} for {:?}", value, pv);

    let after = position.do_move(&pv[0]).unwrap();
    let mut moves = vec![];
    let mut scratch = after.clone();
    assert!(
        !after.has_winning_move(&mut moves, &mut scratch),
        "{} does not stop the road",
        pv[0]
    );
}

#[test]
fn finds_road_in_two_test() {
    // d1 threatens both e1 and d5
    let position = Position::from_tps("2,x4/x3,1,x/x3,1,x/x3,1,x/1,1,1,x2 1 7").unwrap();
    let (pv, value) = search(&position, 3);
    assert!(value > WIN_THRESHOLD, "value {} for {:?}", value, pv);
    let end = check_pv_legality(&position, &pv);
    assert_eq!(end.game_over(), Some(GameResult::WhiteWin));
}

#[test]
fn decisive_iterations_end_the_game_test() {
    let position = Position::from_tps("2,x4/x3,1,x/x3,1,x/x3,1,x/1,1,1,x2 1 7").unwrap();
    let mut ai = MinimaxAi::new(MinimaxConfig::new(5).depth(4).seed(3));
    let (_, _, stats) = ai.analyze(&SearchContext::new(), &position);
    for iteration in stats.iterations.iter() {
        let end = check_pv_legality(&position, &iteration.pv);
        if is_decisive(iteration.value) {
            assert!(end.game_over().is_some(), "{:?}", iteration.pv);
        }
    }
}

#[test]
fn pv_is_legal_test() {
    for seed in 0..4 {
        let position = random_position(5, seed, 14);
        let (pv, value) = search(&position, 3);
        assert!(!pv.is_empty());
        check_pv_legality(&position, &pv);
        assert!(value.abs() <= crate::evaluation::MAX_EVAL);
    }
}

#[test]
fn search_is_deterministic_test() {
    let position = random_position(6, 2, 20);
    let config = MinimaxConfig::new(6).depth(3).seed(42);
    let mut first = MinimaxAi::new(config.clone());
    let mut second = MinimaxAi::new(config);
    let (pv1, value1, stats1) = first.analyze(&SearchContext::new(), &position);
    let (pv2, value2, stats2) = second.analyze(&SearchContext::new(), &position);
    assert_eq!(pv1, pv2);
    assert_eq!(value1, value2);
    assert_eq!(stats1.visited, stats2.visited);
}

#[test]
fn table_is_reused_between_searches_test() {
    let position = opening_position();
    let mut ai = MinimaxAi::new(MinimaxConfig::new(5).depth(3).seed(5));
    let (_, _, first) = ai.analyze(&SearchContext::new(), &position);
    let (pv, _, second) = ai.analyze(&SearchContext::new(), &position);
    assert!(second.tt_hits > first.tt_hits);
    assert!(second.evaluated < first.evaluated);
    check_pv_legality(&position, &pv);

    ai.new_game();
    let (_, _, third) = ai.analyze(&SearchContext::new(), &position);
    assert!(third.evaluated > second.evaluated);
}

#[test]
fn cancelled_search_returns_a_move_test() {
    let position = random_position(6, 6, 16);
    let mut ai = MinimaxAi::new(MinimaxConfig::new(6).seed(7));
    let ctx = SearchContext::new();
    ctx.cancel();
    let (pv, _, stats) = ai.analyze(&ctx, &position);
    assert!(!pv.is_empty());
    assert_eq!(stats.depth, 1);
    assert!(position.do_move(&pv[0]).is_ok());
}

#[test]
fn expired_deadline_returns_a_move_test() {
    let position = random_position(5, 8, 10);
    let mut ai = MinimaxAi::new(MinimaxConfig::new(5).seed(7));
    let ctx = SearchContext::with_deadline(Instant::now());
    let mv = ai.get_move(&ctx, &position).unwrap();
    assert!(position.do_move(&mv).is_ok());
}

#[test]
fn cancel_from_other_thread_test() {
    let position = random_position(6, 9, 12);
    let mut ai = MinimaxAi::new(MinimaxConfig::new(6).seed(7));
    let ctx = SearchContext::with_timeout(Duration::from_secs(60));
    let cancel = ctx.cancel_handle();
    let handle = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        cancel.store(true, std::sync::atomic::Ordering::Relaxed);
    });
    let start = Instant::now();
    let (pv, _, _) = ai.analyze(&ctx, &position);
    handle.join().unwrap();
    assert!(start.elapsed() < Duration::from_secs(30));
    check_pv_legality(&position, &pv);
}

#[test]
fn max_evals_limits_search_test() {
    let position = random_position(5, 10, 12);
    let mut ai = MinimaxAi::new(MinimaxConfig::new(5).max_evals(300).seed(11));
    let (pv, _, stats) = ai.analyze(&SearchContext::new(), &position);
    assert!(!pv.is_empty());
    assert!(stats.depth >= 1);
    assert!(stats.evaluated < 600, "{} evaluations", stats.evaluated);
}

#[test]
fn stats_are_collected_test() {
    let position = opening_position();
    let mut ai = MinimaxAi::new(MinimaxConfig::new(5).depth(4).seed(13));
    let (_, _, stats) = ai.analyze(&SearchContext::new(), &position);
    assert_eq!(stats.depth, 4);
    assert_eq!(stats.iterations.len(), 4);
    assert_eq!(stats.illegal_moves, 0);
    assert!(stats.cutoffs > 0);
    assert!(stats.visited >= stats.iterations[3].visited);
    for (i, iteration) in stats.iterations.iter().enumerate() {
        assert_eq!(iteration.depth as usize, i + 1);
    }
}

#[test]
fn game_over_has_empty_pv_test() {
    let position = Position::from_tps("x4,1/x4,1/x3,2,1/x3,2,1/2,x3,1 2 6").unwrap();
    let (pv, value) = search(&position, 3);
    assert!(pv.is_empty());
    assert!(value < -WIN_THRESHOLD);
}

#[test]
fn opening_plays_corner_test() {
    let start = Position::start_position(6);
    let (pv, value) = search(&start, 3);
    assert_eq!(pv, vec![Move::Place(Role::Flat, Square::new(0, 0))]);
    assert_eq!(value, 0);

    let position = do_moves_and_check_validity(&start, &["a1"]);
    let (pv, _) = search(&position, 3);
    assert_eq!(pv[0], Move::Place(Role::Flat, Square::new(5, 0)));
}

#[test]
fn book_moves_are_played_test() {
    let book = OpeningBook::build(5, &["a1 e5 c3", "e1 a5 c3"]).unwrap();
    let mut ai = MinimaxAi::new(MinimaxConfig::new(5).precise(true).depth(2).seed(3));
    ai.set_book(Arc::new(book));

    let start = Position::start_position(5);
    let corners = Square::corners(5).map(|square| Move::Place(Role::Flat, square));
    let (pv, value, _) = ai.analyze(&SearchContext::new(), &start);
    assert_eq!(pv.len(), 1);
    assert!(corners.contains(&pv[0]));
    assert_eq!(value, 0);

    let position = do_moves_and_check_validity(&start, &["a1", "e5"]);
    let (pv, _, _) = ai.analyze(&SearchContext::new(), &position);
    assert_eq!(pv, vec![Move::from_string("c3", 5).unwrap()]);
}

#[test]
fn engine_follows_board_size_test() {
    let mut ai = MinimaxAi::new(MinimaxConfig::new(5).depth(2).seed(1));
    let position = Position::from_tps("x6/x6/x6/x6/x6/1,2,x4 1 2").unwrap();
    let (pv, _, stats) = ai.analyze(&SearchContext::new(), &position);
    assert!(!pv.is_empty());
    check_pv_legality(&position, &pv);
    assert_eq!(stats.illegal_moves, 0);
    assert_eq!(ai.config().size, 6);
    assert_eq!(ai.evaluate(&position), crate::evaluation::evaluate(&position));

    let position = opening_position();
    let (pv, _, _) = ai.analyze(&SearchContext::new(), &position);
    check_pv_legality(&position, &pv);
    assert_eq!(ai.config().size, 5);
}

fn constant_evaluator() -> Arc<dyn Evaluator> {
    Arc::new(|_: &Position| 1000i64)
}

#[test]
fn threefold_repetition_is_a_draw_test() {
    let start = Position::from_tps("x5/x5/x5/x5/1,x3,2 1 3").unwrap();
    let mut game = vec![start.clone()];
    for mv in ["a1>", "e1<", "b1<", "d1>", "a1>", "e1<", "b1<"] {
        let next = do_moves_and_check_validity(&game[game.len() - 1], &[mv]);
        game.push(next);
    }

    let config = MinimaxConfig::new(5)
        .depth(1)
        .seed(1)
        .evaluator(constant_evaluator());

    // Every other move leaves white with a position worth 1000
    let mut ai = MinimaxAi::new(config.clone());
    let (pv, value, _) = ai.analyze_game(&SearchContext::new(), &game);
    assert_eq!(pv[0], Move::from_string("d1>", 5).unwrap());
    assert_eq!(value, 0);

    // Without the first cycle, the position only occurs twice
    let mut ai = MinimaxAi::new(config);
    let (_, value, _) = ai.analyze_game(&SearchContext::new(), &game[4..]);
    assert_eq!(value, -1000);
}

#[test]
fn placements_reset_repetitions_test() {
    let start = Position::from_tps("x5/x5/x5/x5/1,x3,2 1 3").unwrap();
    let mut game = vec![start];
    for mv in ["a1>", "e1<", "b1<", "d1>", "c3", "c4", "a1>", "e1<", "b1<"] {
        let next = do_moves_and_check_validity(&game[game.len() - 1], &[mv]);
        game.push(next);
    }
    let mut ai = MinimaxAi::new(
        MinimaxConfig::new(5)
            .depth(1)
            .seed(1)
            .evaluator(constant_evaluator()),
    );
    let (_, value, _) = ai.analyze_game(&SearchContext::new(), &game);
    assert_eq!(value, -1000);
}

#[test]
fn analyze_all_returns_symmetric_ties_test() {
    let start = Position::start_position(5);
    let mut ai = MinimaxAi::new(MinimaxConfig::new(5).depth(1).precise(true).seed(2));
    let (pvs, _, _) = ai.analyze_all(&SearchContext::new(), &start);

    let first_moves: Vec<Move> = pvs.iter().map(|pv| pv[0]).collect();
    for (i, mv) in first_moves.iter().enumerate() {
        assert!(start.do_move(mv).is_ok());
        assert!(!first_moves[..i].contains(mv), "{} returned twice", mv);
    }
    for symmetry in Symmetry::ALL {
        let image = symmetry.transform_move(first_moves[0], 5);
        assert!(
            first_moves.contains(&image),
            "{} missing from {:?}",
            image,
            first_moves
        );
    }
}

#[test]
fn symmetry_dedup_searches_fewer_nodes_test() {
    let start = Position::start_position(5);
    let config = MinimaxConfig::new(5).depth(2).precise(true).seed(2);
    let mut plain = MinimaxAi::new(config.clone());
    let mut dedup = MinimaxAi::new(config.dedup_symmetry(true));

    let (pv1, value1, stats1) = plain.analyze(&SearchContext::new(), &start);
    let (pv2, value2, stats2) = dedup.analyze(&SearchContext::new(), &start);
    assert!(stats2.visited < stats1.visited);
    assert_eq!(value1, value2);
    check_pv_legality(&start, &pv1);
    check_pv_legality(&start, &pv2);
}

#[test]
fn pruning_options_keep_results_legal_test() {
    let position = random_position(6, 14, 24);
    for config in [
        MinimaxConfig::new(6).multi_cut(true),
        MinimaxConfig::new(6).no_null_move(true),
        MinimaxConfig::new(6).no_extend_forces(true).no_reduce_slides(true),
        MinimaxConfig::new(6).no_sort(true),
        MinimaxConfig::new(6).precise(true),
    ] {
        let mut ai = MinimaxAi::new(config.depth(3).seed(15));
        let (pv, value, stats) = ai.analyze(&SearchContext::new(), &position);
        assert!(!pv.is_empty());
        assert!(value.abs() <= crate::evaluation::MAX_EVAL);
        assert_eq!(stats.illegal_moves, 0);
        check_pv_legality(&position, &pv);
    }
}

#[test]
fn custom_evaluator_is_used_test() {
    let position = random_position(5, 16, 10);
    let ai = MinimaxAi::new(MinimaxConfig::new(5).evaluator(constant_evaluator()));
    assert_eq!(ai.evaluate(&position), 1000);
    let mut out = vec![];
    ai.explain_score(&position, &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "score\t1000\n");
}
