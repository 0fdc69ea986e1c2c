use cozy_chess::{Board, Color, Move};
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::board::{format_uci, Applied, Rules};
use crate::search::eval::{self, other, piece_value, Evaluator, StaticEvaluator, DRAW_SCORE, MATE_SCORE};
use crate::search::time::TimeControl;
use crate::search::tt::{Bound, Entry, PositionCache};

/// Window bound wider than any reachable score.
pub const INFINITY: i32 = 1_000_000;

const CLOCK_CHECK_INTERVAL: u64 = 64;

/// The search was cancelled (deadline, node limit or explicit stop). Every
/// move it had applied has already been undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("search aborted")]
pub struct Aborted;

#[derive(Debug, Clone, Copy)]
pub struct SearchParams {
    /// Plies searched below each root move.
    pub depth: u32,
    pub movetime: Option<Duration>,
    pub max_nodes: Option<u64>,
    pub use_cache: bool,
    pub order_moves: bool,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self { depth: 3, movetime: None, max_nodes: None, use_cache: true, order_moves: true }
    }
}

/// A root move with its score from the mover's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredMove {
    pub mv: Move,
    pub uci: String,
    pub score: i32,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SearchStats {
    pub nodes: u64,
    pub cache_hits: u64,
    pub eval_fallbacks: u64,
    pub skipped_moves: u64,
}

pub struct Searcher {
    cache: PositionCache,
    evaluator: Arc<dyn Evaluator>,
    time: TimeControl,
    node_limit: u64,
    use_cache: bool,
    order_moves: bool,
    stats: SearchStats,
}

impl Default for Searcher {
    fn default() -> Self {
        Self {
            cache: PositionCache::default(),
            evaluator: Arc::new(StaticEvaluator),
            time: TimeControl::default(),
            node_limit: u64::MAX,
            use_cache: true,
            order_moves: true,
            stats: SearchStats::default(),
        }
    }
}

/// Flip a White-positive score to the point of view of `side`.
pub fn orient(score: i32, side: Color) -> i32 {
    if side == Color::White { score } else { -score }
}

// Pulls a terminal mate score `ply` points towards zero; draws stay at zero.
fn mate_at_ply(score: i32, ply: i32) -> i32 {
    match score {
        MATE_SCORE => MATE_SCORE - ply,
        s if s == -MATE_SCORE => -(MATE_SCORE - ply),
        s => s,
    }
}

/// Best first; ties keep generation order.
pub fn sort_ranked(moves: &mut [ScoredMove]) {
    moves.sort_by(|a, b| b.score.cmp(&a.score));
}

// Captures by victim value, then promotions; quiet moves keep generator order.
fn order_moves(board: &Board, moves: &mut [Move]) {
    let them = board.colors(other(board.side_to_move()));
    moves.sort_by_key(|m| {
        let victim = if them.has(m.to) { board.piece_on(m.to).map(piece_value).unwrap_or(0) } else { 0 };
        let promo = m.promotion.map(piece_value).unwrap_or(0);
        -(victim + promo)
    });
}

impl Searcher {
    pub fn with_evaluator(evaluator: Arc<dyn Evaluator>) -> Self {
        Self { evaluator, ..Self::default() }
    }

    pub fn set_evaluator(&mut self, evaluator: Arc<dyn Evaluator>) { self.evaluator = evaluator; }
    pub fn evaluator_name(&self) -> &str { self.evaluator.name() }

    pub fn cache(&self) -> &PositionCache { &self.cache }
    pub fn clear_cache(&mut self) { self.cache.clear(); }
    pub fn set_cache_capacity(&mut self, entries: usize) { self.cache.set_capacity_entries(entries); }

    pub fn set_use_cache(&mut self, on: bool) { self.use_cache = on; }
    pub fn set_order_moves(&mut self, on: bool) { self.order_moves = on; }

    pub fn stats(&self) -> SearchStats { self.stats }

    /// Handle whose `stop()` abandons the running search.
    pub fn stop_handle(&self) -> TimeControl { self.time.clone() }

    /// Starts a new search episode: fresh cache, counters and clock.
    pub fn begin(&mut self, params: &SearchParams) {
        self.cache.clear();
        self.stats = SearchStats::default();
        self.time.restart(params.movetime);
        self.node_limit = params.max_nodes.unwrap_or(u64::MAX);
        self.use_cache = params.use_cache;
        self.order_moves = params.order_moves;
    }

    fn tick(&mut self) -> Result<(), Aborted> {
        self.stats.nodes += 1;
        if self.time.is_stopped() || self.stats.nodes > self.node_limit { return Err(Aborted); }
        if self.stats.nodes % CLOCK_CHECK_INTERVAL == 0 && self.time.check_time() { return Err(Aborted); }
        Ok(())
    }

    fn leaf<R: Rules + ?Sized>(&mut self, pos: &R, ply: i32) -> i32 {
        if let Some(score) = eval::terminal_score(pos) {
            return mate_at_ply(score, ply);
        }
        match self.evaluator.evaluate(pos.board()) {
            Ok(score) => score,
            Err(e) => {
                self.stats.eval_fallbacks += 1;
                debug!("{} evaluator failed, using static score: {e:#}", self.evaluator.name());
                eval::eval_cp(pos.board())
            }
        }
    }

    /// Minimax with alpha-beta pruning. Scores are White positive;
    /// `maximizing` is true when the side to move wants a higher score.
    pub fn alphabeta<R: Rules + ?Sized>(
        &mut self,
        pos: &mut R,
        depth: u32,
        alpha: i32,
        beta: i32,
        maximizing: bool,
    ) -> Result<i32, Aborted> {
        self.minimax(pos, depth, alpha, beta, maximizing, 0)
    }

    fn minimax<R: Rules + ?Sized>(
        &mut self,
        pos: &mut R,
        depth: u32,
        mut alpha: i32,
        mut beta: i32,
        maximizing: bool,
        ply: i32,
    ) -> Result<i32, Aborted> {
        self.tick()?;
        if depth == 0 { return Ok(self.leaf(pos, ply)); }

        let key = if self.use_cache { Some(pos.fingerprint()) } else { None };
        if let Some(fp) = key.as_deref() {
            if let Some(score) = self.cache.probe(fp, depth, maximizing, alpha, beta) {
                self.stats.cache_hits += 1;
                return Ok(score);
            }
        }

        let mut moves = pos.legal_moves();
        if moves.is_empty() {
            if !pos.is_check() { return Ok(DRAW_SCORE); }
            // nearer mates score further from zero
            let mate = MATE_SCORE - ply;
            return Ok(if maximizing { -mate } else { mate });
        }
        if self.order_moves { order_moves(pos.board(), &mut moves); }

        let (orig_alpha, orig_beta) = (alpha, beta);
        let mut best = if maximizing { -INFINITY } else { INFINITY };
        let mut searched = false;
        for mv in moves {
            let mut child = match Applied::new(&mut *pos, mv) {
                Ok(c) => c,
                Err(e) => {
                    self.stats.skipped_moves += 1;
                    debug!("skipping move rejected by rules engine: {e}");
                    continue;
                }
            };
            let score = self.minimax(&mut *child, depth - 1, alpha, beta, !maximizing, ply + 1)?;
            drop(child);
            searched = true;
            if maximizing {
                best = best.max(score);
                alpha = alpha.max(best);
            } else {
                best = best.min(score);
                beta = beta.min(best);
            }
            if beta <= alpha { break; }
        }
        if !searched { return Ok(self.leaf(pos, ply)); }

        if let Some(fp) = key {
            let bound = if best <= orig_alpha {
                Bound::Upper
            } else if best >= orig_beta {
                Bound::Lower
            } else {
                Bound::Exact
            };
            self.cache.put(fp, depth, maximizing, Entry { score: best, bound });
        }
        Ok(best)
    }

    /// Scores every legal root move with a full window, best first from the
    /// mover's point of view. Starts a new episode.
    pub fn search_root<R: Rules + ?Sized>(
        &mut self,
        pos: &mut R,
        params: &SearchParams,
    ) -> Result<Vec<ScoredMove>, Aborted> {
        self.begin(params);
        let side = pos.side_to_move();
        let depth = params.depth;
        let mut moves = pos.legal_moves();
        if self.order_moves { order_moves(pos.board(), &mut moves); }

        let mut ranked = Vec::with_capacity(moves.len());
        for mv in moves {
            if self.time.check_time() { return Err(Aborted); }
            let uci = format_uci(pos.board(), mv);
            let mut child = match Applied::new(&mut *pos, mv) {
                Ok(c) => c,
                Err(e) => {
                    self.stats.skipped_moves += 1;
                    debug!("skipping root move rejected by rules engine: {e}");
                    continue;
                }
            };
            let maximizing = child.side_to_move() == Color::White;
            let score = self.minimax(&mut *child, depth, -INFINITY, INFINITY, maximizing, 1)?;
            drop(child);
            ranked.push(ScoredMove { mv, uci, score: orient(score, side) });
        }
        sort_ranked(&mut ranked);
        debug!(
            "root search depth {} nodes {} cache_hits {} elapsed {:?}",
            depth, self.stats.nodes, self.stats.cache_hits, self.time.elapsed()
        );
        Ok(ranked)
    }

    /// One-ply static ranking; never aborts.
    pub fn rank_one_ply<R: Rules + ?Sized>(&mut self, pos: &mut R) -> Vec<ScoredMove> {
        let side = pos.side_to_move();
        let mut ranked = Vec::new();
        for mv in pos.legal_moves() {
            let uci = format_uci(pos.board(), mv);
            let child = match Applied::new(&mut *pos, mv) {
                Ok(c) => c,
                Err(_) => {
                    self.stats.skipped_moves += 1;
                    continue;
                }
            };
            self.stats.nodes += 1;
            let score = eval::evaluate(&*child);
            drop(child);
            ranked.push(ScoredMove { mv, uci, score: orient(score, side) });
        }
        sort_ranked(&mut ranked);
        ranked
    }
}
