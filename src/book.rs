//! Opening book keyed by exact position fingerprint.
//!
//! The built-in book is written as named opening lines; replaying each line
//! from the start position maps every position along it to the next move.
//! Lookups are exact-match only, so a transposition into a book position with
//! different move counters is a miss.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use cozy_chess::{Board, Move, Piece, Square};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::board::{format_uci, parse_uci, Applied, Position, Rules};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChessOpening {
    pub name: String,
    pub moves: Vec<String>,
}

/// One explicit book entry: a FEN and a move in UCI or SAN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookEntry {
    pub fen: String,
    #[serde(rename = "move")]
    pub mv: String,
}

fn line(name: &str, moves: &[&str]) -> ChessOpening {
    ChessOpening { name: name.to_string(), moves: moves.iter().map(|m| m.to_string()).collect() }
}

/// Lines of the built-in book. Earlier lines win when two share a position.
pub fn get_chess_openings() -> Vec<ChessOpening> {
    vec![
        line("Ruy Lopez", &["e2e4", "e7e5", "g1f3", "b8c6", "f1b5"]),
        line("Sicilian Defense", &["e2e4", "c7c5", "g1f3", "d7d6"]),
        line("French Defense", &["e2e4", "e7e6", "d2d4", "d7d5"]),
        line("Queen's Gambit", &["c2c4", "d7d5", "d2d4", "e7e6"]),
        line("Nimzo-Indian Defense", &["g1f3", "g8f6", "c2c4", "e7e6", "b1c3", "f8b4"]),
        line("Caro-Kann Defense", &["e2e4", "c7c6", "d2d4", "d7d5", "b1c3"]),
    ]
}

#[derive(Debug, Clone, Default)]
pub struct OpeningBook {
    entries: HashMap<String, String>,
}

impl OpeningBook {
    pub fn builtin() -> Self {
        Self::from_openings(&get_chess_openings())
    }

    pub fn from_openings(openings: &[ChessOpening]) -> Self {
        let mut book = Self::default();
        for opening in openings {
            let mut pos = Position::startpos();
            for mv in &opening.moves {
                book.entries.entry(pos.fingerprint()).or_insert_with(|| mv.clone());
                if let Err(e) = pos.make_move_uci(mv) {
                    warn!("opening {:?} stops early: {e}", opening.name);
                    break;
                }
            }
        }
        book
    }

    pub fn from_entries<I: IntoIterator<Item = BookEntry>>(entries: I) -> Self {
        let mut book = Self::default();
        book.extend(entries);
        book
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: Vec<BookEntry> = serde_json::from_str(json).context("parse opening book JSON")?;
        Ok(Self::from_entries(entries))
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(&path)
            .with_context(|| format!("read opening book: {}", path.as_ref().display()))?;
        Self::from_json_str(&text)
    }

    /// Adds or replaces entries.
    pub fn extend<I: IntoIterator<Item = BookEntry>>(&mut self, entries: I) {
        for e in entries {
            self.entries.insert(e.fen, e.mv);
        }
    }

    pub fn insert(&mut self, fen: impl Into<String>, mv: impl Into<String>) -> Option<String> {
        self.entries.insert(fen.into(), mv.into())
    }

    pub fn get(&self, fen: &str) -> Option<&str> {
        self.entries.get(fen).map(String::as_str)
    }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Book move for the current position, checked against the rules engine
    /// by applying and undoing it. Entries that don't resolve to a legal move
    /// are treated as a miss.
    pub fn lookup<R: Rules + ?Sized>(&self, pos: &mut R) -> Option<Move> {
        let fen = pos.fingerprint();
        let text = self.entries.get(&fen)?;
        let Some(mv) = resolve_move(pos.board(), text) else {
            debug!("book move {text:?} does not resolve in {fen}");
            return None;
        };
        match Applied::new(&mut *pos, mv) {
            Ok(_undo_on_drop) => Some(mv),
            Err(e) => {
                debug!("book move {text:?} rejected: {e}");
                None
            }
        }
    }
}

/// Resolves UCI or SAN text against the legal moves of `board`.
pub fn resolve_move(board: &Board, text: &str) -> Option<Move> {
    parse_uci(board, text).or_else(|| parse_san(board, text))
}

fn san_piece(c: char) -> Option<Piece> {
    match c {
        'N' => Some(Piece::Knight),
        'B' => Some(Piece::Bishop),
        'R' => Some(Piece::Rook),
        'Q' => Some(Piece::Queen),
        'K' => Some(Piece::King),
        _ => None,
    }
}

/// Standard algebraic notation: `e4`, `Nf3`, `exd5`, `Nbd7`, `e8=Q+`, `O-O`.
pub fn parse_san(board: &Board, san: &str) -> Option<Move> {
    let san = san.trim().trim_end_matches(['+', '#', '!', '?']);
    let mut legal: Vec<Move> = Vec::new();
    board.generate_moves(|ml| {
        legal.extend(ml);
        false
    });

    let castle_file = match san {
        "O-O" | "0-0" => Some('g'),
        "O-O-O" | "0-0-0" => Some('c'),
        _ => None,
    };
    if let Some(file) = castle_file {
        let king = board.king(board.side_to_move());
        let target = format!("{king}{file}{}", &king.to_string()[1..]);
        return legal.into_iter().find(|&m| {
            board.piece_on(m.from) == Some(Piece::King) && format_uci(board, m) == target
        });
    }

    let (body, promotion) = match san.split_once('=') {
        Some((body, p)) => (body, Some(san_piece(p.chars().next()?)?)),
        None => (san, None),
    };
    let mut chars: Vec<char> = body.chars().filter(|&c| c != 'x').collect();
    let piece = match chars.first().copied().and_then(san_piece) {
        Some(p) => {
            chars.remove(0);
            p
        }
        None => Piece::Pawn,
    };
    if chars.len() < 2 {
        return None;
    }
    let dest: String = chars[chars.len() - 2..].iter().collect();
    let dest: Square = dest.parse().ok()?;
    let hints = &chars[..chars.len() - 2];

    let mut found = legal.into_iter().filter(|&m| {
        if board.piece_on(m.from) != Some(piece) || m.promotion != promotion {
            return false;
        }
        if board.color_on(m.to) == board.color_on(m.from) {
            return false;
        }
        if m.to != dest {
            return false;
        }
        let from = m.from.to_string();
        hints.iter().all(|&h| from.contains(h))
    });
    let mv = found.next()?;
    // ambiguous SAN resolves to nothing
    if found.next().is_some() {
        return None;
    }
    Some(mv)
}
