use log::{debug, warn};
use std::io::{self, BufRead, Write};
use std::time::Duration;

use crate::board::Position;
use crate::engine::Engine;
use crate::error::EngineError;

/// Minimal UCI front end over one [`Engine`].
pub struct UciEngine {
    pos: Position,
    engine: Engine,
}

impl Default for UciEngine {
    fn default() -> Self { Self::new(Engine::default()) }
}

fn with_moves(mut pos: Position, moves: &[&str]) -> Option<Position> {
    for mv in moves {
        if let Err(e) = pos.make_move_uci(mv) {
            warn!("ignoring position command: {e}");
            return None;
        }
    }
    Some(pos)
}

impl UciEngine {
    pub fn new(engine: Engine) -> Self { Self { pos: Position::startpos(), engine } }

    pub fn position(&self) -> &Position { &self.pos }

    fn cmd_uci<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "id name Rookie {}", env!("CARGO_PKG_VERSION"))?;
        writeln!(out, "id author Rookie Team")?;
        writeln!(out, "uciok")
    }

    fn cmd_isready<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let st = self.engine.initialize();
        debug!("evaluator status {:?} ({}%)", st.status, st.progress);
        writeln!(out, "readyok")
    }

    fn cmd_ucinewgame(&mut self) {
        self.pos = Position::startpos();
        if let Err(e) = self.engine.clear_cache() {
            warn!("ucinewgame: {e}");
        }
    }

    fn cmd_position(&mut self, args: &str) {
        // 'position startpos [moves ...]' | 'position fen <6 fields> [moves ...]'
        let tokens: Vec<&str> = args.split_whitespace().collect();
        let (base, rest) = match tokens.first() {
            Some(&"startpos") => (Some(Position::startpos()), &tokens[1..]),
            Some(&"fen") if tokens.len() >= 7 => {
                let fen = tokens[1..7].join(" ");
                match Position::from_fen(&fen) {
                    Ok(p) => (Some(p), &tokens[7..]),
                    Err(e) => {
                        warn!("ignoring position command: {e}");
                        (None, &tokens[7..])
                    }
                }
            }
            _ => (None, &tokens[..0]),
        };
        let Some(base) = base else { return };
        let moves = match rest.split_first() {
            Some((&"moves", moves)) => moves,
            _ => &[],
        };
        if let Some(pos) = with_moves(base, moves) {
            self.pos = pos;
        }
    }

    fn cmd_go<W: Write>(&mut self, args: &str, out: &mut W) -> io::Result<()> {
        let mut depth = None;
        let mut budget = None;
        let mut tokens = args.split_whitespace();
        while let Some(tok) = tokens.next() {
            match tok {
                "depth" => {
                    depth = tokens.next().and_then(|s| s.parse::<u32>().ok());
                }
                "movetime" => {
                    if let Some(t) = tokens.next().and_then(|s| s.parse::<u64>().ok()) {
                        budget = Some(Duration::from_millis(t));
                    }
                }
                _ => {}
            }
        }
        match self.engine.choose_move_with(&mut self.pos, budget, depth).map(|c| c.uci) {
            Ok(mv) if !mv.is_empty() => writeln!(out, "bestmove {mv}"),
            Ok(_) => writeln!(out, "bestmove 0000"),
            Err(EngineError::Busy) => Ok(()),
            Err(e) => {
                warn!("go failed: {e}");
                writeln!(out, "bestmove 0000")
            }
        }
    }

    /// Handles one command line; returns false on `quit`.
    pub fn handle_line<W: Write>(&mut self, line: &str, out: &mut W) -> io::Result<bool> {
        let line = line.trim();
        match line {
            "" | "stop" => {}
            "uci" => self.cmd_uci(out)?,
            "isready" => self.cmd_isready(out)?,
            "ucinewgame" => self.cmd_ucinewgame(),
            "quit" => return Ok(false),
            "go" => self.cmd_go("", out)?,
            _ => {
                if let Some(rest) = line.strip_prefix("position ") {
                    self.cmd_position(rest);
                } else if let Some(rest) = line.strip_prefix("go ") {
                    self.cmd_go(rest, out)?;
                } else {
                    debug!("unknown command: {line}");
                }
            }
        }
        out.flush()?;
        Ok(true)
    }

    pub fn run_loop(&mut self) -> io::Result<()> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        for line in stdin.lock().lines() {
            let line = line?;
            if !self.handle_line(&line, &mut stdout.lock())? { break; }
        }
        self.engine.dispose();
        Ok(())
    }
}
