use anyhow::Result;
use clap::Parser;
use rookie::board::{Position, Rules};
use rookie::engine::{Engine, EngineConfig};
use rookie::search::alphabeta::{SearchParams, Searcher};
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(name = "rookie-bench", version, about = "Benchmark Rookie search speed")]
struct Args {
    /// FEN string or 'startpos'
    #[arg(long, default_value = "startpos")]
    fen: String,

    /// Plies searched below each root move
    #[arg(long, default_value_t = 3)]
    depth: u32,

    /// Movetime in milliseconds (0 = no deadline)
    #[arg(long, default_value_t = 0)]
    movetime: u64,

    /// Disable the position cache
    #[arg(long, default_value_t = false)]
    no_cache: bool,

    /// Disable captures-first move ordering
    #[arg(long, default_value_t = false)]
    no_order: bool,

    /// Also time full move selections (book off)
    #[arg(long, default_value_t = 0)]
    selections: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut pos = if args.fen == "startpos" { Position::startpos() } else { Position::from_fen(&args.fen)? };

    let mut s = Searcher::default();
    let p = SearchParams {
        depth: args.depth,
        movetime: (args.movetime > 0).then(|| Duration::from_millis(args.movetime)),
        max_nodes: None,
        use_cache: !args.no_cache,
        order_moves: !args.no_order,
    };

    let t0 = Instant::now();
    let res = s.search_root(&mut pos, &p);
    let dt = t0.elapsed();
    let stats = s.stats();
    let nps = if dt.as_secs_f64() > 0.0 { stats.nodes as f64 / dt.as_secs_f64() } else { 0.0 };
    match res {
        Ok(ranked) => {
            let best = ranked.first().map(|m| format!("{} {}", m.uci, m.score)).unwrap_or_else(|| "(none)".to_string());
            println!(
                "best={} moves={} nodes={} cache_hits={} elapsed={:.3}s nps={:.1}",
                best, ranked.len(), stats.nodes, stats.cache_hits, dt.as_secs_f64(), nps
            );
        }
        Err(e) => println!("{} nodes={} elapsed={:.3}s nps={:.1}", e, stats.nodes, dt.as_secs_f64(), nps),
    }

    if args.selections > 0 {
        let cfg = EngineConfig { depth: p.depth, use_book: false, seed: Some(1), ..EngineConfig::default() };
        let engine = Engine::new(cfg)?;
        let t0 = Instant::now();
        for _ in 0..args.selections {
            engine.find_best_move(&mut pos, None)?;
        }
        let per = t0.elapsed() / args.selections as u32;
        println!("selections={} per_move={:?} fen={}", args.selections, per, pos.fingerprint());
    }
    Ok(())
}
