use std::fs;
use std::io;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use board_game_traits::{Color, GameResult};

use taksearch::evaluation;
use taksearch::position::{Move, Position};
use taksearch::ptn;
use taksearch::search::{self, MinimaxAi, MinimaxConfig, OpeningBook, SearchContext};

fn main() {
    println!("play [size]: Play against the engine through the command line");
    println!("tps [depth]: Analyze a position, provided from a tps string");
    println!("line <size>: Analyze the position after a move list, such as \"1. a1 e5 2. c3 c4\"");
    println!("explain: Print the evaluation of a position, provided from a tps string");
    println!("perft <depth>: Count the positions reachable from a tps string");
    println!("book <file>: Use an opening book of PTN lines when playing");
    let mut book_lines: Vec<String> = vec![];
    loop {
        let Some(input) = read_line() else {
            break;
        };
        let words = input.split_whitespace().collect::<Vec<_>>();
        if words.is_empty() {
            continue;
        }
        let arg = |i: usize| words.get(i).and_then(|word| u8::from_str(word).ok());
        match words[0] {
            "play" => match arg(1).unwrap_or(5) {
                size @ 3..=8 => play_human(Position::start_position(size), &book_lines),
                size => println!("Unsupported size {}", size),
            },
            "tps" => {
                if let Some(position) = read_tps() {
                    analyze_position(&position, arg(1).unwrap_or(0));
                }
            }
            "line" => match arg(1).unwrap_or(5) {
                size @ 3..=8 => analyze_line(size),
                size => println!("Unsupported size {}", size),
            },
            "explain" => {
                if let Some(position) = read_tps() {
                    println!("{}", position);
                    if let Err(err) = evaluation::explain_score(&position, &mut io::stdout()) {
                        println!("Error: {}", err);
                    }
                }
            }
            "perft" => {
                let depth = arg(1).unwrap_or(4) as u16;
                if let Some(position) = read_tps() {
                    perft(&position, depth);
                }
            }
            "book" => match words.get(1).map(fs::read_to_string) {
                Some(Ok(contents)) => {
                    book_lines = contents
                        .lines()
                        .filter(|line| !line.trim().is_empty())
                        .map(str::to_string)
                        .collect();
                    println!("Read {} opening lines", book_lines.len());
                }
                Some(Err(err)) => println!("Error: {}", err),
                None => println!("Expected a file name"),
            },
            "quit" => break,
            s => println!("Unknown option \"{}\"", s),
        }
    }
}

fn read_line() -> Option<String> {
    let mut input = String::new();
    match io::stdin().read_line(&mut input) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(input),
    }
}

fn read_tps() -> Option<Position> {
    println!("Enter TPS");
    let input = read_line()?;
    match Position::from_tps(input.trim()) {
        Ok(position) => Some(position),
        Err(err) => {
            println!("Invalid TPS: {}", err);
            None
        }
    }
}

fn analyze_line(size: u8) {
    println!("Enter move list");
    let Some(input) = read_line() else {
        return;
    };
    match ptn::parse_move_line(&Position::start_position(size), &input) {
        Ok(line) => {
            let mut ai = MinimaxAi::new(MinimaxConfig::new(size).debug(1));
            let ctx = SearchContext::with_timeout(Duration::from_secs(10));
            let (pv, value, stats) = ai.analyze_game(&ctx, &line.positions);
            println!("{}", line.last_position());
            print_result(&pv, value, &stats);
        }
        Err(err) => println!("Error: {}", err),
    }
}

fn analyze_position(position: &Position, depth: u8) {
    println!("TPS {}", position.to_tps());
    println!("{}", position);
    if let Some(result) = position.game_over() {
        println!("Game is over: {:?}", result);
        return;
    }
    let config = MinimaxConfig::new(position.size()).depth(depth).debug(1);
    let ctx = if depth == 0 {
        SearchContext::with_timeout(Duration::from_secs(10))
    } else {
        SearchContext::new()
    };
    let mut ai = MinimaxAi::new(config);
    let (pv, value, stats) = ai.analyze(&ctx, position);
    print_result(&pv, value, &stats);
}

fn print_result(pv: &[Move], value: i64, stats: &search::Stats) {
    for iteration in stats.iterations.iter() {
        println!(
            "depth {}: {} {}, {} nodes, {} evaluated, {:.2}s",
            iteration.depth,
            iteration.value,
            search::format_pv(&iteration.pv),
            iteration.visited,
            iteration.evaluated,
            iteration.elapsed.as_secs_f32()
        );
    }
    println!(
        "Best line: {} ({}), {} tt hits, {} cutoffs, {:.2}s",
        search::format_pv(pv),
        value,
        stats.tt_hits,
        stats.cutoffs,
        stats.elapsed.as_secs_f32()
    );
}

fn perft(position: &Position, max_depth: u16) {
    for depth in 0..=max_depth {
        let start_time = Instant::now();
        let result = position.perft(depth);
        println!(
            "{}: {}, {:.2}s, {:.1} Mnps",
            depth,
            result,
            start_time.elapsed().as_secs_f32(),
            result as f32 / start_time.elapsed().as_micros().max(1) as f32
        );
    }
}

/// Play a game against the engine through stdin. The human plays black.
fn play_human(mut position: Position, book_lines: &[String]) {
    let mut ai = MinimaxAi::new(MinimaxConfig::new(position.size()));
    if !book_lines.is_empty() {
        match OpeningBook::build(position.size(), book_lines) {
            Ok(book) => ai.set_book(Arc::new(book)),
            Err(err) => println!("Not using the opening book: {}", err),
        }
    }
    let mut game = vec![position.clone()];
    let mut legal_moves = vec![];
    while position.game_over().is_none() {
        println!("Position:\n{}", position);
        let mv = if position.to_move() == Color::Black {
            println!("Type your move in PTN (c3, 2b2>11):");
            position.generate_moves(&mut legal_moves);
            // Loop until the user enters a valid move
            loop {
                let Some(input) = read_line() else {
                    return;
                };
                match Move::from_string(input.trim(), position.size()) {
                    Ok(mv) if legal_moves.contains(&mv) => break mv,
                    Ok(mv) => println!("Move {} is illegal! Try again: ", mv),
                    Err(error) => println!("{}, try again.", error),
                }
            }
        } else {
            let ctx = SearchContext::with_timeout(Duration::from_secs(5));
            let (pv, value, _) = ai.analyze_game(&ctx, &game);
            let Some(&mv) = pv.first() else {
                break;
            };
            println!("Computer played {} with score {}", mv, value);
            mv
        };
        legal_moves.clear();
        match position.do_move(&mv) {
            Ok(next) => position = next,
            Err(err) => {
                println!("Error: {}", err);
                return;
            }
        }
        game.push(position.clone());
    }
    match position.game_over() {
        Some(GameResult::WhiteWin) => println!("White won! Board:\n{}", position),
        Some(GameResult::BlackWin) => println!("Black won! Board:\n{}", position),
        Some(GameResult::Draw) => println!("The game was drawn! Board:\n{}", position),
        None => (),
    }
}
