use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rookie::board::{piece_char, Position, Rules};
use rookie::book::{resolve_move, OpeningBook};
use rookie::engine::{Engine, EngineConfig, Status};
use rookie::uci::UciEngine;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use cozy_chess::{Color, File, Move, Rank, Square};

#[derive(Parser, Debug)]
#[command(author, version, about = "Rookie: a small alpha-beta chess move selector", long_about = None)]
struct Args {
    /// Speak UCI on stdin/stdout
    #[arg(long)]
    uci: bool,

    /// Starting FEN position
    #[arg(long)]
    fen: Option<String>,

    /// Play a game against the engine as 'w' or 'b'
    #[arg(long)]
    play: Option<String>,

    /// Engine config JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// Opening book JSON (`[{"fen": ..., "move": ...}]`) replacing the built-in book
    #[arg(long)]
    book: Option<PathBuf>,

    /// Dense NNUE file (PIENNUE1)
    #[arg(long)]
    network: Option<PathBuf>,

    /// Plies searched below each root move
    #[arg(long)]
    depth: Option<u32>,

    /// Time budget per move in milliseconds
    #[arg(long)]
    movetime: Option<u64>,

    /// RNG seed for reproducible play
    #[arg(long)]
    seed: Option<u64>,
}

fn parse_color(color_str: &str) -> Result<Color> {
    match color_str.to_lowercase().as_str() {
        "w" | "white" => Ok(Color::White),
        "b" | "black" => Ok(Color::Black),
        _ => bail!("Invalid color: use 'w' or 'b'"),
    }
}

// Brings the evaluator up, drawing load progress when a network is configured.
fn initialize(engine: &Engine) -> Result<()> {
    let status = if engine.config().evaluator.network.is_some() {
        let pb = ProgressBar::new(100);
        pb.set_style(
            ProgressStyle::with_template("{msg} [{bar:40}] {pos}%")
                .context("progress template")?
                .progress_chars("=> "),
        );
        pb.set_message("loading network");
        let status = engine.initialize_with_progress(|p| pb.set_position(p as u64));
        pb.finish_and_clear();
        status
    } else {
        engine.initialize()
    };
    if status.status == Status::Error {
        eprintln!("evaluator unavailable, using static evaluation: {}", status.error.unwrap_or_default());
    }
    Ok(())
}

fn print_board(pos: &Position) {
    println!();
    for &rank in Rank::ALL.iter().rev() {
        let row: String = File::ALL
            .iter()
            .map(|&file| match pos.piece_at(Square::new(file, rank)) {
                Some((color, piece)) => piece_char(color, piece),
                None => '.',
            })
            .collect();
        println!("{} {}", rank as usize + 1, row);
    }
    println!("  abcdefgh");
}

fn get_human_move(pos: &Position) -> Result<Move> {
    loop {
        print!("Enter your move (e.g., e2e4 or Nf3): ");
        io::stdout().flush()?;
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            bail!("stdin closed");
        }
        let input = input.trim();
        match resolve_move(pos.board(), input) {
            Some(mv) => return Ok(mv),
            None => println!("Illegal or unreadable move!"),
        }
    }
}

fn play(engine: &Engine, mut pos: Position, human: Color) -> Result<()> {
    loop {
        print_board(&pos);
        if pos.is_game_over() {
            if pos.is_checkmate() {
                let winner = if pos.side_to_move() == Color::White { "Black" } else { "White" };
                println!("\nCheckmate! {winner} wins!");
            } else {
                println!("\nDraw.");
            }
            return Ok(());
        }
        if pos.side_to_move() == human {
            let mv = get_human_move(&pos)?;
            pos.apply_move(mv)?;
        } else {
            let t0 = Instant::now();
            let choice = engine.play_move(&mut pos, None)?;
            println!("Engine plays {} ({:?}, {:?}) in {:?}", choice.uci, choice.source, choice.score, t0.elapsed());
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EngineConfig::load_json(path)?,
        None => EngineConfig::default(),
    };
    if let Some(d) = args.depth { config.depth = d; }
    if let Some(t) = args.movetime { config.time_budget_ms = t; }
    if args.seed.is_some() { config.seed = args.seed; }
    if let Some(net) = &args.network {
        config.evaluator.network = Some(net.clone());
    }
    let book = match &args.book {
        Some(path) => OpeningBook::load_json(path)?,
        None => OpeningBook::builtin(),
    };
    let engine = Engine::with_book(config, Arc::new(book))?;
    initialize(&engine)?;

    if args.uci {
        UciEngine::new(engine).run_loop()?;
        return Ok(());
    }

    let pos = match &args.fen {
        Some(fen) => Position::from_fen(fen)?,
        None => Position::startpos(),
    };

    if let Some(side) = &args.play {
        let human = parse_color(side)?;
        let result = play(&engine, pos, human);
        engine.dispose();
        return result;
    }

    let mut pos = pos;
    let t0 = Instant::now();
    let choice = engine.choose_move(&mut pos, None)?;
    if choice.uci.is_empty() {
        println!("no legal move");
    } else {
        println!("{} ({:?}, score {:?}, {:?})", choice.uci, choice.source, choice.score, t0.elapsed());
    }
    engine.dispose();
    Ok(())
}
