//! Move selection: opening book, time-boxed search with a one-ply fallback,
//! and weighted choice among the best candidates.

use anyhow::Context;
use cozy_chess::Move;
use log::{debug, info, warn};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::board::{format_uci, Applied, BoardError, Rules};
use crate::book::OpeningBook;
use crate::error::EngineError;
use crate::search::alphabeta::{Aborted, ScoredMove, SearchParams, SearchStats, Searcher};
use crate::search::eval::{Evaluator, StaticEvaluator};
use crate::search::noise;

pub mod lifecycle;

pub use lifecycle::{EvaluatorConfig, InitStatus, Lifecycle, Status};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Plies searched below each root move.
    pub depth: u32,
    /// Default deadline for the search phase.
    pub time_budget_ms: u64,
    pub top_k: usize,
    /// Chance of playing a book move when the book has one.
    pub book_probability: f64,
    pub use_book: bool,
    /// Fixed RNG seed for reproducible games.
    pub seed: Option<u64>,
    pub cache_entries: usize,
    pub max_nodes: Option<u64>,
    pub order_moves: bool,
    pub evaluator: EvaluatorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            depth: 3,
            time_budget_ms: 3000,
            top_k: 3,
            book_probability: 0.8,
            use_book: true,
            seed: None,
            cache_entries: 1 << 16,
            max_nodes: None,
            order_moves: true,
            evaluator: EvaluatorConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let cfg: Self = serde_json::from_str(json).context("parse engine config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("read engine config: {}", path.as_ref().display()))?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.top_k == 0 {
            return Err(EngineError::Config("top_k must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.book_probability) {
            return Err(EngineError::Config(format!("book_probability {} outside 0..=1", self.book_probability)));
        }
        if self.cache_entries == 0 {
            return Err(EngineError::Config("cache_entries must be at least 1".into()));
        }
        Ok(())
    }

    pub fn time_budget(&self) -> Duration { Duration::from_millis(self.time_budget_ms) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveSource {
    Book,
    Search,
    /// The search ran out of time; picked from a one-ply static ranking.
    Fallback,
    /// The selected move was rejected; picked uniformly at random.
    Random,
    /// No legal move.
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveChoice {
    /// UCI text, empty when there is no legal move.
    pub uci: String,
    pub source: MoveSource,
    /// Score of the chosen move from the mover's point of view.
    pub score: Option<i32>,
}

impl MoveChoice {
    fn none() -> Self { Self { uci: String::new(), source: MoveSource::None, score: None } }
}

// Holds the thinking flag for the duration of one move request.
struct Thinking<'a>(&'a AtomicBool);

impl<'a> Thinking<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, EngineError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).map_err(|_| EngineError::Busy)?;
        Ok(Self(flag))
    }
}

impl Drop for Thinking<'_> {
    fn drop(&mut self) { self.0.store(false, Ordering::Release); }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One game's move selector. Owns its cache, RNG and readiness state; the
/// opening book may be shared between engines.
pub struct Engine {
    config: EngineConfig,
    book: Arc<OpeningBook>,
    searcher: Mutex<Searcher>,
    thinking: AtomicBool,
    lifecycle: Lifecycle,
    rng: Mutex<SmallRng>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::build(EngineConfig::default(), Arc::new(OpeningBook::builtin()))
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_book(config, Arc::new(OpeningBook::builtin()))
    }

    pub fn with_book(config: EngineConfig, book: Arc<OpeningBook>) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self::build(config, book))
    }

    fn build(config: EngineConfig, book: Arc<OpeningBook>) -> Self {
        let mut searcher = Searcher::default();
        searcher.set_cache_capacity(config.cache_entries);
        searcher.set_order_moves(config.order_moves);
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self {
            config,
            book,
            searcher: Mutex::new(searcher),
            thinking: AtomicBool::new(false),
            lifecycle: Lifecycle::new(),
            rng: Mutex::new(rng),
        }
    }

    pub fn config(&self) -> &EngineConfig { &self.config }
    pub fn book(&self) -> &Arc<OpeningBook> { &self.book }

    pub fn initialize(&self) -> InitStatus { self.lifecycle.initialize(&self.config.evaluator) }

    /// Like [`Engine::initialize`], also handing load progress to `progress`.
    pub fn initialize_with_progress<F: FnMut(u8)>(&self, progress: F) -> InitStatus {
        self.lifecycle.initialize_with_progress(&self.config.evaluator, progress)
    }

    pub fn status(&self) -> InitStatus { self.lifecycle.status() }

    pub fn is_thinking(&self) -> bool { self.thinking.load(Ordering::Acquire) }

    /// Counters of the last search.
    pub fn last_stats(&self) -> SearchStats { lock(&self.searcher).stats() }

    /// Drops cached scores. Rejected with `Busy` while a move is being computed.
    pub fn clear_cache(&self) -> Result<(), EngineError> {
        let _thinking = Thinking::acquire(&self.thinking)?;
        lock(&self.searcher).clear_cache();
        Ok(())
    }

    /// Releases the cache and the learned evaluator and returns to idle; safe
    /// to call repeatedly. Only a running search is waited for: a request
    /// still in its book or selection phase completes on the evaluator it
    /// already holds.
    pub fn dispose(&self) {
        lock(&self.searcher).clear_cache();
        self.lifecycle.dispose();
        debug!("engine disposed");
    }

    /// Best move as UCI text; empty when the side to move has no legal move.
    pub fn find_best_move<R: Rules + ?Sized>(&self, pos: &mut R, budget: Option<Duration>) -> Result<String, EngineError> {
        Ok(self.choose_move(pos, budget)?.uci)
    }

    /// Picks a move for the side to move. `pos` is left exactly as it was
    /// handed in. `budget` overrides the configured search deadline.
    pub fn choose_move<R: Rules + ?Sized>(
        &self,
        pos: &mut R,
        budget: Option<Duration>,
    ) -> Result<MoveChoice, EngineError> {
        self.choose_move_with(pos, budget, None)
    }

    /// [`Engine::choose_move`] with the configured search depth replaced by
    /// `depth` for this request only.
    pub fn choose_move_with<R: Rules + ?Sized>(
        &self,
        pos: &mut R,
        budget: Option<Duration>,
        depth: Option<u32>,
    ) -> Result<MoveChoice, EngineError> {
        let _thinking = Thinking::acquire(&self.thinking)?;
        let legal = pos.legal_moves();
        if legal.is_empty() {
            debug!("no legal moves in {}", pos.fingerprint());
            return Ok(MoveChoice::none());
        }
        let mut rng = lock(&self.rng);

        if self.config.use_book {
            if let Some(mv) = self.book.lookup(pos) {
                let uci = format_uci(pos.board(), mv);
                if rng.gen_bool(self.config.book_probability) {
                    info!("book move {uci}");
                    return Ok(MoveChoice { uci, source: MoveSource::Book, score: None });
                }
                debug!("book move {uci} skipped");
            }
        }

        let mut searcher = lock(&self.searcher);
        let evaluator: Arc<dyn Evaluator> = self.lifecycle.evaluator().unwrap_or_else(|| Arc::new(StaticEvaluator));
        searcher.set_evaluator(evaluator);
        let params = SearchParams {
            depth: depth.unwrap_or(self.config.depth),
            movetime: Some(budget.unwrap_or_else(|| self.config.time_budget())),
            max_nodes: self.config.max_nodes,
            use_cache: true,
            order_moves: self.config.order_moves,
        };
        let (ranked, source) = match searcher.search_root(pos, &params) {
            Ok(ranked) => (ranked, MoveSource::Search),
            Err(Aborted) => {
                info!("search abandoned after {} nodes, ranking one ply", searcher.stats().nodes);
                (searcher.rank_one_ply(pos), MoveSource::Fallback)
            }
        };
        drop(searcher);

        let picked: Option<ScoredMove> = noise::choose_weighted(&ranked, self.config.top_k, &mut *rng);
        let Some(pick) = picked else {
            warn!("no move survived ranking, picking at random");
            return Ok(random_choice(pos, &legal, &mut *rng));
        };
        let rejected = match Applied::new(&mut *pos, pick.mv) {
            Ok(_undo) => None,
            Err(e) => Some(e),
        };
        if let Some(e) = rejected {
            warn!("selected move {} rejected ({e}), picking at random", pick.uci);
            return Ok(random_choice(pos, &legal, &mut *rng));
        }
        debug!("chose {} ({:?}, score {})", pick.uci, source, pick.score);
        Ok(MoveChoice { uci: pick.uci, source, score: Some(pick.score) })
    }

    /// Chooses a move and plays it on `pos`.
    pub fn play_move<R: Rules + ?Sized>(&self, pos: &mut R, budget: Option<Duration>) -> Result<MoveChoice, EngineError> {
        let choice = self.choose_move(pos, budget)?;
        if choice.source == MoveSource::None {
            return Ok(choice);
        }
        let mv = pos
            .legal_moves()
            .into_iter()
            .find(|&m| format_uci(pos.board(), m) == choice.uci)
            .ok_or_else(|| BoardError::IllegalMove { mv: choice.uci.clone(), fen: pos.fingerprint() })?;
        pos.apply_move(mv)?;
        Ok(choice)
    }
}

fn random_choice<R: Rules + ?Sized, G: Rng + ?Sized>(pos: &R, legal: &[Move], rng: &mut G) -> MoveChoice {
    match noise::choose_uniform(legal, rng) {
        Some(mv) => MoveChoice { uci: format_uci(pos.board(), mv), source: MoveSource::Random, score: None },
        None => MoveChoice::none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Position;
    use pretty_assertions::assert_eq;

    #[test]
    fn config_defaults_fill_missing_fields() {
        let cfg = EngineConfig::from_json_str(r#"{"depth": 2, "seed": 9}"#).unwrap();
        assert_eq!(cfg, EngineConfig { depth: 2, seed: Some(9), ..EngineConfig::default() });
        assert!(EngineConfig::from_json_str(r#"{"book_probability": 1.5}"#).is_err());
        assert!(EngineConfig::from_json_str(r#"{"top_k": 0}"#).is_err());
    }

    #[test]
    fn busy_flag_rejects_second_request() {
        let engine = Engine::default();
        let held = Thinking::acquire(&engine.thinking).unwrap();
        let mut pos = Position::startpos();
        assert!(matches!(engine.choose_move(&mut pos, None), Err(EngineError::Busy)));
        assert!(matches!(engine.clear_cache(), Err(EngineError::Busy)));
        drop(held);
        assert!(!engine.is_thinking());
        assert!(engine.clear_cache().is_ok());
    }

    #[test]
    fn depth_override_keeps_the_engine_book() {
        let start = Position::startpos().fingerprint();
        let mut book = OpeningBook::default();
        book.insert(start, "b1c3");
        let cfg = EngineConfig { book_probability: 1.0, seed: Some(2), ..EngineConfig::default() };
        let engine = Engine::with_book(cfg, Arc::new(book)).unwrap();
        let mut pos = Position::startpos();
        let choice = engine.choose_move_with(&mut pos, None, Some(0)).unwrap();
        assert_eq!(choice, MoveChoice { uci: "b1c3".into(), source: MoveSource::Book, score: None });
    }

    #[test]
    fn play_move_advances_the_game() {
        let cfg = EngineConfig { depth: 1, use_book: false, seed: Some(1), ..EngineConfig::default() };
        let engine = Engine::new(cfg).unwrap();
        let mut pos = Position::startpos();
        let choice = engine.play_move(&mut pos, None).unwrap();
        assert_eq!(choice.source, MoveSource::Search);
        assert_eq!(pos.ply(), 1);
    }
}
