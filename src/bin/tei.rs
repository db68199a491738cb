//! Text engine interface: a UCI-style protocol for tournament drivers.
//!
//! Searches run on a separate thread, so that `stop` can interrupt them.

use std::fs;
use std::io::{self, BufRead};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use board_game_traits::Color;
use clap::{Arg, Command};

use taksearch::position::{Move, Position};
use taksearch::search::{self, MinimaxAi, MinimaxConfig, OpeningBook, SearchContext};

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// A search running in the background, which hands back the engine when done
struct RunningSearch {
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<MinimaxAi>,
}

struct Engine {
    config: MinimaxConfig,
    ai: Option<MinimaxAi>,
    search: Option<RunningSearch>,
    position: Option<Position>,
    /// Every position of the current game, for repetition detection
    game: Vec<Position>,
    /// Opening lines in PTN, built into a book for each new board size
    book_lines: Vec<String>,
}

impl Engine {
    /// Waits for any running search to hand back the engine
    fn join(&mut self) {
        if let Some(search) = self.search.take() {
            match search.handle.join() {
                Ok(ai) => self.ai = Some(ai),
                Err(_) => log::error!("Search thread panicked"),
            }
        }
    }

    fn engine(&mut self) -> &mut MinimaxAi {
        self.join();
        let ai = match self.ai.take() {
            Some(ai) => ai,
            None => self.new_ai(),
        };
        self.ai.insert(ai)
    }

    fn new_ai(&self) -> MinimaxAi {
        let mut ai = MinimaxAi::new(self.config.clone());
        if !self.book_lines.is_empty() {
            match OpeningBook::build(self.config.size, self.book_lines.as_slice()) {
                Ok(book) => {
                    log::info!(
                        "Opening book with {} positions for size {}",
                        book.len(),
                        self.config.size
                    );
                    ai.set_book(Arc::new(book));
                }
                Err(err) => log::warn!("No opening book for size {}: {}", self.config.size, err),
            }
        }
        ai
    }

    /// Switches to a new board size, discarding the engine built for the old one
    fn set_size(&mut self, size: u8) {
        if size != self.config.size {
            self.config.size = size;
            self.ai = None;
        }
    }

    fn stop(&mut self) {
        if let Some(search) = self.search.as_ref() {
            search.cancel.store(true, Ordering::Relaxed);
        }
        self.join();
    }
}

pub fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = Command::new("taksearch tei")
        .version("0.1")
        .arg(
            Arg::new("logfile")
                .short('l')
                .long("logfile")
                .env("LOGFILE")
                .value_name("taksearch.log")
                .help("Name of debug logfile")
                .num_args(1),
        )
        .arg(
            Arg::new("tableMem")
                .long("table-mem")
                .env("TABLE_MEM")
                .help("Transposition table size in megabytes")
                .num_args(1)
                .default_value("16")
                .value_parser(clap::value_parser!(u64).range(1..=65536)),
        )
        .arg(
            Arg::new("book")
                .long("book")
                .env("BOOK")
                .value_name("book.txt")
                .help("Opening book, with one line of space-separated PTN moves per opening")
                .num_args(1),
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .env("DEBUG")
                .help("Search logging verbosity, from 0 to 3")
                .num_args(1)
                .default_value("1")
                .value_parser(clap::value_parser!(u8).range(0..=3)),
        )
        .get_matches();

    let log_dispatcher = fern::Dispatch::new().format(|out, message, record| {
        out.finish(format_args!(
            "{}[{}][{}] {}",
            chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
            record.target(),
            record.level(),
            message
        ))
    });
    if let Some(log_file) = matches.get_one::<String>("logfile") {
        log_dispatcher
            .chain(
                fern::Dispatch::new()
                    .level(log::LevelFilter::Debug)
                    .chain(fern::log_file(log_file)?),
            )
            .chain(
                fern::Dispatch::new()
                    .level(log::LevelFilter::Warn)
                    .chain(io::stderr()),
            )
            .apply()?
    } else {
        log_dispatcher
            .level(log::LevelFilter::Warn)
            .chain(io::stderr())
            .apply()?
    }

    let table_mem = matches.get_one::<u64>("tableMem").copied().unwrap_or(16) as usize;
    let debug = matches.get_one::<u8>("debug").copied().unwrap_or(1);
    let book_lines = match matches.get_one::<String>("book") {
        Some(path) => fs::read_to_string(path)?
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect(),
        None => vec![],
    };

    let mut lines = io::stdin().lock().lines();
    for line in lines.by_ref() {
        if line?.trim() == "tei" {
            break;
        }
    }
    println!("id name taksearch");
    println!("id author taksearch developers");
    println!("teiok");

    let mut engine = Engine {
        config: MinimaxConfig::new(5).table_mem(table_mem << 20).debug(debug),
        ai: None,
        search: None,
        position: None,
        game: vec![],
        book_lines,
    };

    for line in lines {
        let line = line?;
        log::debug!("> {}", line);
        let mut words = line.split_whitespace();
        match words.next() {
            Some("quit") => break,
            Some("isready") => println!("readyok"),
            Some("stop") => engine.stop(),
            Some("teinewgame") => {
                engine.stop();
                match words.next().and_then(|word| u8::from_str(word).ok()) {
                    Some(size @ 3..=8) => {
                        engine.set_size(size);
                        engine.engine().new_game();
                        engine.position = None;
                        engine.game.clear();
                    }
                    _ => println!("info string Unsupported size in \"{}\"", line),
                }
            }
            Some("position") => {
                engine.stop();
                match parse_position_string(&line, engine.config.size) {
                    Ok(game) => {
                        engine.set_size(game[0].size());
                        engine.position = game.last().cloned();
                        engine.game = game;
                    }
                    Err(err) => println!("info string {}", err),
                }
            }
            Some("go") => {
                engine.stop();
                let Some(position) = engine.position.clone() else {
                    println!("info string Received go without a position");
                    continue;
                };
                let Some(limits) = parse_go_string(&line, &position) else {
                    println!("info string Invalid go command \"{}\"", line);
                    continue;
                };
                let game = engine.game.clone();
                let mut ai = match engine.ai.take() {
                    Some(ai) => ai,
                    None => engine.new_ai(),
                };
                let ctx = match limits {
                    Limits::Time(movetime) => {
                        ai.set_depth(0);
                        SearchContext::with_timeout(movetime)
                    }
                    Limits::Depth(depth) => {
                        ai.set_depth(depth);
                        SearchContext::new()
                    }
                };
                let cancel = ctx.cancel_handle();
                let handle = thread::spawn(move || {
                    let start_time = Instant::now();
                    let (pv, value, stats) = ai.analyze_game(&ctx, &game);
                    println!(
                        "info depth {} score cp {} nodes {} time {} pv {}",
                        stats.depth,
                        value,
                        stats.visited,
                        start_time.elapsed().as_millis(),
                        search::format_pv(&pv)
                    );
                    match pv.first() {
                        Some(mv) => println!("bestmove {}", mv),
                        None => println!("info string Game is already over"),
                    }
                    ai
                });
                engine.search = Some(RunningSearch { cancel, handle });
            }
            Some(s) => println!("info string Unknown command \"{}\"", s),
            None => (),
        }
    }
    engine.stop();
    Ok(())
}

enum Limits {
    Time(Duration),
    Depth(u8),
}

/// Parses `position startpos|tps <tps> [moves ...]` into every position of the game
fn parse_position_string(line: &str, size: u8) -> Result<Vec<Position>, String> {
    let mut words_iter = line.split_whitespace();
    words_iter.next(); // position
    let start = match words_iter.next() {
        Some("startpos") => Position::start_position(size),
        Some("tps") => {
            let tps: String = (&mut words_iter).take(3).collect::<Vec<_>>().join(" ");
            Position::from_tps(&tps).map_err(|err| err.to_string())?
        }
        _ => return Err("Expected \"startpos\" or \"tps\" to specify position.".to_string()),
    };

    let mut game = vec![start];
    match words_iter.next() {
        Some("moves") => {
            for move_string in words_iter {
                let position = &game[game.len() - 1];
                let mv = Move::from_string(move_string, position.size())
                    .map_err(|err| err.to_string())?;
                let next = position
                    .do_move(&mv)
                    .map_err(|err| format!("Illegal move {}: {}", move_string, err))?;
                game.push(next);
            }
        }
        Some(s) => return Err(format!("Expected \"moves\" in \"{}\", got \"{}\".", line, s)),
        None => (),
    }
    Ok(game)
}

fn parse_go_string(line: &str, position: &Position) -> Option<Limits> {
    let mut words = line.split_whitespace().skip(1).peekable();
    match words.peek().copied() {
        Some("movetime") => {
            words.next();
            let msecs = u64::from_str(words.next()?).ok()?;
            Some(Limits::Time(Duration::from_millis(msecs)))
        }
        Some("depth") => {
            words.next();
            Some(Limits::Depth(u8::from_str(words.next()?).ok()?))
        }
        Some("wtime") | Some("btime") | Some("winc") | Some("binc") => {
            let mut white_time = Duration::default();
            let mut white_inc = Duration::default();
            let mut black_time = Duration::default();
            let mut black_inc = Duration::default();

            while let Some(word) = words.next() {
                let time = Duration::from_millis(words.next()?.parse().ok()?);
                match word {
                    "wtime" => white_time = time,
                    "winc" => white_inc = time,
                    "btime" => black_time = time,
                    "binc" => black_inc = time,
                    _ => return None,
                }
            }

            let max_time = match position.to_move() {
                Color::White => white_time / 20 + white_inc / 2,
                Color::Black => black_time / 20 + black_inc / 2,
            };
            Some(Limits::Time(max_time.max(Duration::from_millis(10))))
        }
        _ => None,
    }
}
