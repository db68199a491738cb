//! A Tak AI based on iterative deepening alpha-beta search.
//!
//! The search is single-threaded. Run several `MinimaxAi`s for parallel games;
//! the precomputed tables they read are shared.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use std::{fmt, io, mem};

use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::evaluation::{
    is_decisive, terminal_value, Evaluator, WeightedEvaluator, MAX_EVAL, MIN_EVAL,
};
use crate::position::{Move, Position, Role, Square};

use self::move_order::{MoveOrdering, MovePicker};
use self::tt::{Bound, TranspositionTable};

pub mod context;
pub mod move_order;
pub mod opening_book;
pub mod tt;

pub use context::SearchContext;
pub use opening_book::{BookError, OpeningBook};

pub const DEFAULT_TABLE_MEM: usize = 16 << 20;
/// Iteration limit when no depth is configured
pub const MAX_SEARCH_DEPTH: u8 = 64;
/// Frames reserved for forced-move extensions beyond the nominal depth
const EXTENSION_FRAMES: usize = 8;

const NULL_MOVE_REDUCTION: u8 = 2;
/// Static evaluations this large mean a road threat is on the board
const FORCED_EVAL: i64 = 1 << 19;
/// Null moves are skipped when the side to move has this few stones left
const NULL_MOVE_MIN_STONES: u8 = 3;

const MULTI_CUT_MOVES: usize = 6;
const MULTI_CUT_THRESHOLD: usize = 3;
const MULTI_CUT_REDUCTION: u8 = 2;

/// Root moves within this much of the best value count as equally good
const TIE_EPSILON: i64 = 10;

#[derive(Clone)]
pub struct MinimaxConfig {
    pub size: u8,
    /// Maximum depth. 0 searches until the deadline or evaluation budget runs out.
    pub depth: u8,
    /// Maximum number of leaf evaluations. 0 is unlimited.
    pub max_evals: u64,
    /// 0 seeds from the wall clock
    pub seed: u64,
    /// 0 is silent, 1 logs every iteration, 2 every root move, 3 table statistics
    pub debug: u8,
    pub no_sort: bool,
    /// Transposition table size in bytes. 0 uses `DEFAULT_TABLE_MEM`.
    pub table_mem: usize,
    pub no_null_move: bool,
    pub no_extend_forces: bool,
    pub no_reduce_slides: bool,
    pub multi_cut: bool,
    pub dedup_symmetry: bool,
    /// Disables every pruning that may change the exact value of the search
    pub precise: bool,
    /// Defaults to the weighted evaluator for `size`
    pub evaluator: Option<Arc<dyn Evaluator>>,
}

impl Default for MinimaxConfig {
    fn default() -> Self {
        MinimaxConfig {
            size: 5,
            depth: 0,
            max_evals: 0,
            seed: 0,
            debug: 0,
            no_sort: false,
            table_mem: DEFAULT_TABLE_MEM,
            no_null_move: false,
            no_extend_forces: false,
            no_reduce_slides: false,
            multi_cut: false,
            dedup_symmetry: false,
            precise: false,
            evaluator: None,
        }
    }
}

impl MinimaxConfig {
    pub fn new(size: u8) -> Self {
        MinimaxConfig {
            size,
            ..Self::default()
        }
    }

    pub fn depth(mut self, depth: u8) -> Self {
        self.depth = depth;
        self
    }

    pub fn max_evals(mut self, max_evals: u64) -> Self {
        self.max_evals = max_evals;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn debug(mut self, debug: u8) -> Self {
        self.debug = debug;
        self
    }

    pub fn table_mem(mut self, table_mem: usize) -> Self {
        self.table_mem = table_mem;
        self
    }

    pub fn no_sort(mut self, no_sort: bool) -> Self {
        self.no_sort = no_sort;
        self
    }

    pub fn no_null_move(mut self, no_null_move: bool) -> Self {
        self.no_null_move = no_null_move;
        self
    }

    pub fn no_extend_forces(mut self, no_extend_forces: bool) -> Self {
        self.no_extend_forces = no_extend_forces;
        self
    }

    pub fn no_reduce_slides(mut self, no_reduce_slides: bool) -> Self {
        self.no_reduce_slides = no_reduce_slides;
        self
    }

    pub fn multi_cut(mut self, multi_cut: bool) -> Self {
        self.multi_cut = multi_cut;
        self
    }

    pub fn dedup_symmetry(mut self, dedup_symmetry: bool) -> Self {
        self.dedup_symmetry = dedup_symmetry;
        self
    }

    pub fn precise(mut self, precise: bool) -> Self {
        self.precise = precise;
        self
    }

    pub fn evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }
}

impl fmt::Debug for MinimaxConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MinimaxConfig")
            .field("size", &self.size)
            .field("depth", &self.depth)
            .field("max_evals", &self.max_evals)
            .field("seed", &self.seed)
            .field("debug", &self.debug)
            .field("no_sort", &self.no_sort)
            .field("table_mem", &self.table_mem)
            .field("no_null_move", &self.no_null_move)
            .field("no_extend_forces", &self.no_extend_forces)
            .field("no_reduce_slides", &self.no_reduce_slides)
            .field("multi_cut", &self.multi_cut)
            .field("dedup_symmetry", &self.dedup_symmetry)
            .field("precise", &self.precise)
            .field("custom_evaluator", &self.evaluator.is_some())
            .finish()
    }
}

/// Statistics for one completed iteration
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IterationInfo {
    pub depth: u8,
    pub value: i64,
    pub pv: Vec<Move>,
    pub elapsed: Duration,
    pub visited: u64,
    pub evaluated: u64,
    pub tt_hits: u64,
    pub cutoffs: u64,
    pub null_cuts: u64,
    pub multi_cuts: u64,
    pub extensions: u64,
}

/// Counters for a whole `analyze` call
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    /// Deepest completed iteration
    pub depth: u8,
    pub visited: u64,
    pub evaluated: u64,
    pub tt_hits: u64,
    pub cutoffs: u64,
    pub null_cuts: u64,
    pub multi_cuts: u64,
    pub extensions: u64,
    pub reductions: u64,
    pub illegal_moves: u64,
    pub elapsed: Duration,
    pub iterations: Vec<IterationInfo>,
}

/// The search ran out of time or evaluations
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Aborted;

/// Scratch space for one ply of the search
struct Frame {
    child: Position,
    /// Null move and threat probes
    probe: Position,
    probe_child: Position,
    moves: Vec<Move>,
    probe_moves: Vec<Move>,
    defense_moves: Vec<Move>,
    /// Best line found from this node
    pv: Vec<Move>,
}

impl Frame {
    fn new(position: &Position) -> Self {
        Frame {
            child: position.clone(),
            probe: position.clone(),
            probe_child: position.clone(),
            moves: Vec::with_capacity(256),
            probe_moves: Vec::with_capacity(256),
            defense_moves: Vec::with_capacity(256),
            pv: vec![],
        }
    }
}

/// A position on the current game and search path
#[derive(Clone, Copy, Debug)]
struct PathEntry {
    hash: u64,
    /// Whether the move into this position cannot be undone
    irreversible: bool,
    /// The move into this position, if it was made by the search
    mv: Option<Move>,
}

/// A searched root move, with its value and line
#[derive(Clone, Debug)]
struct RootMove {
    value: i64,
    pv: Vec<Move>,
}

pub struct MinimaxAi {
    config: MinimaxConfig,
    evaluator: Arc<dyn Evaluator>,
    table: TranspositionTable,
    ordering: MoveOrdering,
    book: Option<Arc<OpeningBook>>,
    stats: Stats,
    frames: Vec<Frame>,
    path: Vec<PathEntry>,
    root_moves: Vec<RootMove>,
    root_seen: Vec<u64>,
    /// Cleared during the first iteration, which always completes
    interruptible: bool,
}

impl MinimaxAi {
    pub fn new(config: MinimaxConfig) -> Self {
        let seed = if config.seed == 0 {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|time| time.as_nanos() as u64)
                .unwrap_or(1)
        } else {
            config.seed
        };
        let table_mem = if config.table_mem == 0 {
            DEFAULT_TABLE_MEM
        } else {
            config.table_mem
        };
        let evaluator = config.evaluator.clone().unwrap_or_else(|| {
            Arc::new(WeightedEvaluator::default_for_size(config.size)) as Arc<dyn Evaluator>
        });
        MinimaxAi {
            evaluator,
            table: TranspositionTable::new(table_mem),
            ordering: MoveOrdering::new(config.size, SmallRng::seed_from_u64(seed), config.no_sort),
            book: None,
            stats: Stats::default(),
            frames: vec![],
            path: vec![],
            root_moves: vec![],
            root_seen: vec![],
            interruptible: true,
            config,
        }
    }

    pub fn config(&self) -> &MinimaxConfig {
        &self.config
    }

    /// Rebuilds the size-dependent state for another board size, forgetting earlier searches
    fn resize(&mut self, size: u8) {
        log::info!("Switching from size {} to size {}", self.config.size, size);
        self.config.size = size;
        if self.config.evaluator.is_none() {
            self.evaluator = Arc::new(WeightedEvaluator::default_for_size(size));
        }
        self.ordering = MoveOrdering::new(size, self.ordering.rng.clone(), self.config.no_sort);
        self.table.clear();
    }

    /// Maximum depth of the following searches. 0 searches until the deadline.
    pub fn set_depth(&mut self, depth: u8) {
        self.config.depth = depth;
    }

    pub fn set_book(&mut self, book: Arc<OpeningBook>) {
        self.book = Some(book);
    }

    /// Forgets everything learned from earlier searches
    pub fn new_game(&mut self) {
        self.table.clear();
        self.ordering.clear_history();
    }

    pub fn evaluate(&self, position: &Position) -> i64 {
        self.evaluator.evaluate(position)
    }

    pub fn explain_score(&self, position: &Position, out: &mut dyn io::Write) -> io::Result<()> {
        self.evaluator.explain(position, out)
    }

    /// Searches `position`, returning the principal variation, its value
    /// for the side to move and search statistics.
    /// The principal variation is empty only if the game is over.
    pub fn analyze(&mut self, ctx: &SearchContext, position: &Position) -> (Vec<Move>, i64, Stats) {
        let (mut pvs, value, stats) =
            self.iterate(ctx, std::slice::from_ref(position), false);
        (pvs.swap_remove(0), value, stats)
    }

    /// Like `analyze`, with `game` holding every position of the game so far,
    /// ending with the position to search. Earlier positions count for repetitions.
    pub fn analyze_game(&mut self, ctx: &SearchContext, game: &[Position]) -> (Vec<Move>, i64, Stats) {
        assert!(!game.is_empty(), "Cannot analyze an empty game");
        let (mut pvs, value, stats) = self.iterate(ctx, game, false);
        (pvs.swap_remove(0), value, stats)
    }

    /// Like `analyze`, but returns a line for every root move within a small margin of the best
    pub fn analyze_all(
        &mut self,
        ctx: &SearchContext,
        position: &Position,
    ) -> (Vec<Vec<Move>>, i64, Stats) {
        self.iterate(ctx, std::slice::from_ref(position), true)
    }

    pub fn get_move(&mut self, ctx: &SearchContext, position: &Position) -> Option<Move> {
        let (pv, _, _) = self.analyze(ctx, position);
        pv.first().copied()
    }

    fn iterate(
        &mut self,
        ctx: &SearchContext,
        game: &[Position],
        all_moves: bool,
    ) -> (Vec<Vec<Move>>, i64, Stats) {
        let start_time = Instant::now();
        let mut ctx = ctx.clone();
        let position = &game[game.len() - 1];
        if position.size() != self.config.size {
            self.resize(position.size());
        }

        self.stats = Stats::default();
        self.ordering.illegal_moves = 0;
        self.table.new_search();
        self.path.clear();
        for (i, game_position) in game.iter().enumerate() {
            self.path.push(PathEntry {
                hash: game_position.hash(),
                irreversible: i == 0 || game_position.is_irreversible_from(&game[i - 1]),
                mv: None,
            });
        }

        if let Some(result) = position.game_over() {
            return (vec![vec![]], terminal_value(position, result), self.finish(start_time));
        }
        if let Some(mv) = self.book_move(position) {
            log::info!("Book move {}", mv);
            return (vec![vec![mv]], 0, self.finish(start_time));
        }

        let max_depth = if self.config.depth == 0 {
            MAX_SEARCH_DEPTH
        } else {
            self.config.depth
        };
        let mut frames = mem::take(&mut self.frames);
        let needed = max_depth as usize + 1 + EXTENSION_FRAMES;
        if frames.len() < needed {
            frames.resize_with(needed, || Frame::new(position));
        }

        let mut best: Option<(Vec<Vec<Move>>, i64)> = None;
        let mut previous_pv: Vec<Move> = vec![];
        for depth in 1..=max_depth {
            self.interruptible = depth > 1;
            let frame_count = depth as usize + 1 + EXTENSION_FRAMES;
            let result = self.search_root(
                &mut ctx,
                &mut frames[..frame_count],
                position,
                depth,
                &previous_pv,
                all_moves,
            );
            let Ok(value) = result else {
                log::debug!("Iteration {} aborted", depth);
                break;
            };

            let mut pv = frames[0].pv.clone();
            self.extend_pv(position, &mut pv, depth as usize + 2);
            let elapsed = start_time.elapsed();
            self.stats.depth = depth;
            self.stats.iterations.push(IterationInfo {
                depth,
                value,
                pv: pv.clone(),
                elapsed,
                visited: self.stats.visited,
                evaluated: self.stats.evaluated,
                tt_hits: self.stats.tt_hits,
                cutoffs: self.stats.cutoffs,
                null_cuts: self.stats.null_cuts,
                multi_cuts: self.stats.multi_cuts,
                extensions: self.stats.extensions,
            });
            if self.config.debug >= 1 {
                log::info!(
                    "depth={} value={} pv={} visited={} evaluated={} tt_hits={} time={}ms",
                    depth,
                    value,
                    format_pv(&pv),
                    self.stats.visited,
                    self.stats.evaluated,
                    self.stats.tt_hits,
                    elapsed.as_millis()
                );
            }

            let mut pvs = vec![pv.clone()];
            if all_moves {
                let mut ties: Vec<&RootMove> = self
                    .root_moves
                    .iter()
                    .filter(|root_move| root_move.value > value - TIE_EPSILON)
                    .filter(|root_move| root_move.pv.first() != pv.first())
                    .collect();
                ties.sort_by_key(|root_move| -root_move.value);
                pvs.extend(ties.into_iter().map(|root_move| root_move.pv.clone()));
            }
            best = Some((pvs, value));
            previous_pv = pv;

            if is_decisive(value) || ctx.is_expired() || self.evals_exhausted() {
                break;
            }
        }
        self.frames = frames;

        if self.config.debug >= 3 {
            log::info!(
                "Transposition table: {}/{} entries used",
                self.table.used_entries(),
                self.table.capacity()
            );
        }
        let stats = self.finish(start_time);
        // The first iteration cannot be aborted
        let (pvs, value) = best.unwrap_or_else(|| (vec![vec![]], 0));
        (pvs, value, stats)
    }

    fn finish(&mut self, start_time: Instant) -> Stats {
        self.stats.illegal_moves = self.ordering.illegal_moves;
        if self.stats.illegal_moves > 0 {
            log::warn!(
                "{} generated moves failed to apply",
                self.stats.illegal_moves
            );
        }
        self.stats.elapsed = start_time.elapsed();
        mem::take(&mut self.stats)
    }

    fn book_move(&mut self, position: &Position) -> Option<Move> {
        let book = self.book.as_ref()?;
        book.get_move(position, &mut self.ordering.rng)
    }

    /// During the first two plies, the first empty corner
    fn opening_corner(&self, position: &Position) -> Option<Move> {
        if self.config.precise || position.move_number() >= 2 {
            return None;
        }
        Square::corners(position.size())
            .into_iter()
            .find(|&corner| position.top_at(corner).is_none())
            .map(|corner| Move::Place(Role::Flat, corner))
    }

    fn evals_exhausted(&self) -> bool {
        self.config.max_evals > 0 && self.stats.evaluated >= self.config.max_evals
    }

    fn check_abort(&mut self, ctx: &mut SearchContext) -> Result<(), Aborted> {
        if self.interruptible && (ctx.is_cancelled() || self.evals_exhausted()) {
            Err(Aborted)
        } else {
            Ok(())
        }
    }

    fn leaf(&mut self, position: &Position) -> i64 {
        self.stats.evaluated += 1;
        match position.game_over() {
            Some(result) => terminal_value(position, result),
            None => self.evaluator.evaluate(position),
        }
    }

    /// Whether the current position has occurred three times since the last irreversible move
    fn is_repetition(&self) -> bool {
        let Some((current, history)) = self.path.split_last() else {
            return false;
        };
        if current.irreversible {
            return false;
        }
        let mut count = 1;
        for entry in history.iter().rev() {
            if entry.hash == current.hash {
                count += 1;
                if count >= 3 {
                    return true;
                }
            }
            if entry.irreversible {
                break;
            }
        }
        false
    }

    fn search_root(
        &mut self,
        ctx: &mut SearchContext,
        frames: &mut [Frame],
        position: &Position,
        depth: u8,
        pv_hint: &[Move],
        all_moves: bool,
    ) -> Result<i64, Aborted> {
        let Some((frame, rest)) = frames.split_first_mut() else {
            return Ok(self.leaf(position));
        };
        frame.pv.clear();
        self.stats.visited += 1;
        self.root_moves.clear();
        self.root_seen.clear();

        if let Some(mv) = self.opening_corner(position) {
            frame.pv.push(mv);
            return Ok(0);
        }

        let hash = position.hash();
        let tt_move = self.table.get(hash).and_then(|entry| entry.best_move);
        if tt_move.is_some() {
            self.stats.tt_hits += 1;
        }
        let mut picker = MovePicker::new(tt_move, pv_hint.first().copied(), 0);
        let mut alpha = MIN_EVAL;
        let mut best_value = MIN_EVAL - 1;
        let mut best_move = None;

        while let Some(mv) = picker.next(&mut self.ordering, position, &mut frame.moves, &mut frame.child) {
            if self.config.dedup_symmetry {
                let canonical = frame.child.canonical_hash();
                if self.root_seen.contains(&canonical) {
                    continue;
                }
                self.root_seen.push(canonical);
            }
            let window_alpha = if all_moves {
                (best_value - TIE_EPSILON - 1).max(MIN_EVAL)
            } else {
                alpha
            };
            let hint = continuation(pv_hint, mv);
            let value = self.search_child(
                ctx,
                rest,
                position,
                &frame.child,
                mv,
                depth - 1,
                window_alpha,
                MAX_EVAL,
                1,
                hint,
            )?;
            let child_pv = rest.first().map(|child| child.pv.as_slice()).unwrap_or_default();
            if self.config.debug >= 2 {
                log::debug!("{}: {} {}", mv, value, format_pv(child_pv));
            }
            if all_moves {
                let mut pv = vec![mv];
                pv.extend_from_slice(child_pv);
                self.root_moves.push(RootMove { value, pv });
            }
            if value > best_value {
                best_value = value;
                best_move = Some(mv);
                alpha = alpha.max(value);
                frame.pv.clear();
                frame.pv.push(mv);
                frame.pv.extend_from_slice(child_pv);
            }
        }

        if best_move.is_some() {
            self.table.insert(hash, depth, best_value, Bound::Exact, best_move);
        }
        Ok(best_value)
    }

    /// Searches `child`, reached by `mv` from `parent`, and returns its value for the parent
    #[allow(clippy::too_many_arguments)]
    fn search_child(
        &mut self,
        ctx: &mut SearchContext,
        frames: &mut [Frame],
        parent: &Position,
        child: &Position,
        mv: Move,
        depth: u8,
        alpha: i64,
        beta: i64,
        ply: usize,
        pv_hint: &[Move],
    ) -> Result<i64, Aborted> {
        self.path.push(PathEntry {
            hash: child.hash(),
            irreversible: child.is_irreversible_from(parent),
            mv: Some(mv),
        });
        let result = self.negamax(ctx, frames, child, depth, -beta, -alpha, ply, pv_hint);
        self.path.pop();
        result.map(|value| -value)
    }

    /// Fail-hard negamax. The current position is the last entry of `self.path`.
    #[allow(clippy::too_many_arguments)]
    fn negamax(
        &mut self,
        ctx: &mut SearchContext,
        frames: &mut [Frame],
        position: &Position,
        depth: u8,
        mut alpha: i64,
        beta: i64,
        ply: usize,
        pv_hint: &[Move],
    ) -> Result<i64, Aborted> {
        let Some((frame, rest)) = frames.split_first_mut() else {
            return Ok(self.leaf(position).clamp(alpha, beta));
        };
        frame.pv.clear();
        self.check_abort(ctx)?;
        self.stats.visited += 1;

        if self.is_repetition() {
            return Ok(0i64.clamp(alpha, beta));
        }
        if let Some(result) = position.game_over() {
            self.stats.evaluated += 1;
            return Ok(terminal_value(position, result).clamp(alpha, beta));
        }

        let hash = position.hash();
        let entry = self.table.get(hash).copied();
        if let Some(entry) = entry {
            self.stats.tt_hits += 1;
            if entry.cuts(depth, alpha, beta) {
                return Ok(entry.value.clamp(alpha, beta));
            }
        }

        if depth == 0 {
            let value = self.leaf(position);
            return Ok(value.clamp(alpha, beta));
        }

        if let Some(mv) = self.opening_corner(position) {
            frame.pv.push(mv);
            return Ok(0i64.clamp(alpha, beta));
        }

        if self.null_move_allowed(position, depth) {
            let eval = self.leaf(position);
            if eval >= beta && eval.abs() < FORCED_EVAL {
                position.pass_preallocated(&mut frame.probe);
                self.path.push(PathEntry {
                    hash: frame.probe.hash(),
                    irreversible: true,
                    mv: None,
                });
                let result = self.negamax(
                    ctx,
                    rest,
                    &frame.probe,
                    depth - 1 - NULL_MOVE_REDUCTION,
                    -beta,
                    -beta + 1,
                    ply + 1,
                    &[],
                );
                self.path.pop();
                if -result? >= beta {
                    self.stats.null_cuts += 1;
                    return Ok(beta);
                }
            }
        }

        let tt_move = entry.and_then(|entry| entry.best_move);

        if self.config.multi_cut
            && !self.config.precise
            && ply >= 2
            && pv_hint.is_empty()
            && depth > MULTI_CUT_REDUCTION + 1
        {
            let mut picker = MovePicker::new(tt_move, None, ply);
            let mut cuts = 0;
            for _ in 0..MULTI_CUT_MOVES {
                let Some(mv) =
                    picker.next(&mut self.ordering, position, &mut frame.moves, &mut frame.child)
                else {
                    break;
                };
                let value = self.search_child(
                    ctx,
                    rest,
                    position,
                    &frame.child,
                    mv,
                    depth - 1 - MULTI_CUT_REDUCTION,
                    alpha,
                    beta,
                    ply + 1,
                    &[],
                )?;
                if value >= beta {
                    cuts += 1;
                    if cuts >= MULTI_CUT_THRESHOLD {
                        self.stats.multi_cuts += 1;
                        return Ok(beta);
                    }
                }
            }
        }

        let forced = if depth == 1 && !self.config.no_extend_forces && rest.len() >= 2 {
            single_defense(position, frame)
        } else {
            None
        };

        let mut picker = MovePicker::new(tt_move, pv_hint.first().copied(), ply);
        let mut best_move = None;
        while let Some(mv) = picker.next(&mut self.ordering, position, &mut frame.moves, &mut frame.child) {
            let mut child_depth = depth - 1;
            if forced == Some(mv) {
                child_depth += 1;
                self.stats.extensions += 1;
            } else if child_depth >= 1 && self.is_trivial_slide(mv, &frame.child) {
                child_depth -= 1;
                self.stats.reductions += 1;
            }
            let value = self.search_child(
                ctx,
                rest,
                position,
                &frame.child,
                mv,
                child_depth,
                alpha,
                beta,
                ply + 1,
                continuation(pv_hint, mv),
            )?;
            if value > alpha {
                alpha = value;
                best_move = Some(mv);
                frame.pv.clear();
                frame.pv.push(mv);
                if let Some(child) = rest.first() {
                    frame.pv.extend_from_slice(&child.pv);
                }
            }
            if alpha >= beta {
                self.stats.cutoffs += 1;
                self.ordering.credit(position, mv, depth);
                self.ordering.store_killer(mv, ply);
                self.table.insert(hash, depth, beta, Bound::Lower, Some(mv));
                return Ok(beta);
            }
        }

        let bound = if best_move.is_some() {
            Bound::Exact
        } else {
            Bound::Upper
        };
        self.table
            .insert(hash, depth, alpha, bound, best_move.or(tt_move));
        Ok(alpha)
    }

    fn null_move_allowed(&self, position: &Position, depth: u8) -> bool {
        !self.config.precise
            && !self.config.no_null_move
            && depth > NULL_MOVE_REDUCTION
            && position.move_number() >= 2
            && position.stones_left(position.to_move()) >= NULL_MOVE_MIN_STONES
            // No two null moves in a row
            && self.path.last().is_some_and(|entry| entry.mv.is_some())
    }

    /// A single-piece slide undoing the side to move's previous slide,
    /// into a position the table already knows
    fn is_trivial_slide(&self, mv: Move, child: &Position) -> bool {
        if self.config.precise || self.config.no_reduce_slides {
            return false;
        }
        let Move::Slide(origin, direction, drops) = mv else {
            return false;
        };
        if drops.len() != 1 || self.path.len() < 2 {
            return false;
        }
        let Some(previous @ Move::Slide(previous_origin, previous_direction, previous_drops)) =
            self.path[self.path.len() - 2].mv
        else {
            return false;
        };
        previous_drops == drops
            && previous_direction == direction.reverse()
            && previous.destination() == origin
            && mv.destination() == previous_origin
            && self.table.get(child.hash()).is_some()
    }

    /// Appends the table's best moves to `pv`, up to `limit` moves
    fn extend_pv(&self, position: &Position, pv: &mut Vec<Move>, limit: usize) {
        let mut current = position.clone();
        for mv in pv.iter() {
            match current.do_move(mv) {
                Ok(next) => current = next,
                Err(err) => {
                    debug_assert!(false, "Illegal move {} in pv: {}", mv, err);
                    return;
                }
            }
        }
        let mut seen = vec![current.hash()];
        while pv.len() < limit && current.game_over().is_none() {
            let Some(mv) = self.table.get(current.hash()).and_then(|entry| entry.best_move) else {
                break;
            };
            let Ok(next) = current.do_move(&mv) else {
                break;
            };
            if seen.contains(&next.hash()) {
                break;
            }
            seen.push(next.hash());
            pv.push(mv);
            current = next;
        }
    }
}

/// The part of `pv` following `mv`, if `pv` starts with it
fn continuation(pv: &[Move], mv: Move) -> &[Move] {
    match pv.split_first() {
        Some((first, tail)) if *first == mv => tail,
        _ => &[],
    }
}

/// If the opponent threatens to win next move and exactly one move stops it, that move
fn single_defense(position: &Position, frame: &mut Frame) -> Option<Move> {
    position.pass_preallocated(&mut frame.probe);
    if !frame
        .probe
        .has_winning_move(&mut frame.probe_moves, &mut frame.probe_child)
    {
        return None;
    }
    frame.defense_moves.clear();
    position.generate_moves(&mut frame.defense_moves);
    let mut defense = None;
    for &mv in frame.defense_moves.iter() {
        if position.move_preallocated(&mv, &mut frame.probe).is_err() {
            continue;
        }
        if frame
            .probe
            .has_winning_move(&mut frame.probe_moves, &mut frame.probe_child)
        {
            continue;
        }
        if defense.is_some() {
            return None;
        }
        defense = Some(mv);
    }
    defense
}

pub fn format_pv(pv: &[Move]) -> String {
    pv.iter()
        .map(|mv| mv.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
