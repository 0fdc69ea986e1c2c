//! Rules-engine boundary.
//!
//! Search and evaluation only ever touch a position through [`Rules`]; the
//! cozy-chess backed [`Position`] is the implementation shipped with the
//! crate, tests substitute their own.

pub mod cozy;

use cozy_chess::{Board, Color, File, Move, Piece, Square};
use std::ops::{Deref, DerefMut};
use thiserror::Error;

pub use cozy::Position;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("FEN error in {fen:?}: {reason}")]
    Fen { fen: String, reason: String },
    #[error("illegal move {mv} in {fen}")]
    IllegalMove { mv: String, fen: String },
}

/// Capabilities the move selector needs from a chess rules engine.
pub trait Rules {
    /// Read-only snapshot of the current board, used by evaluators.
    fn board(&self) -> &Board;

    /// Plays `mv` if it is legal in the current position.
    fn apply_move(&mut self, mv: Move) -> Result<(), BoardError>;

    /// Takes back the most recently applied move.
    fn undo_move(&mut self) -> Option<Move>;

    fn legal_moves(&self) -> Vec<Move>;

    /// Legal moves whose origin is `square`.
    fn legal_moves_from(&self, square: Square) -> Vec<Move>;

    /// Stalemate, fifty-move rule, threefold repetition or insufficient material.
    fn is_draw(&self) -> bool;

    /// Canonical position key (FEN).
    fn fingerprint(&self) -> String;

    fn is_check(&self) -> bool {
        !self.board().checkers().is_empty()
    }

    fn is_checkmate(&self) -> bool {
        self.is_check() && self.legal_moves().is_empty()
    }

    fn is_game_over(&self) -> bool {
        self.is_checkmate() || self.is_draw()
    }

    fn side_to_move(&self) -> Color {
        self.board().side_to_move()
    }

    fn piece_at(&self, square: Square) -> Option<(Color, Piece)> {
        let board = self.board();
        Some((board.color_on(square)?, board.piece_on(square)?))
    }
}

/// A move applied to a position for as long as the guard lives.
///
/// Dropping the guard undoes the move, so early returns and unwinding out of
/// a search leave the position exactly as it was found.
pub struct Applied<'a, R: Rules + ?Sized> {
    pos: &'a mut R,
}

impl<'a, R: Rules + ?Sized> Applied<'a, R> {
    pub fn new(pos: &'a mut R, mv: Move) -> Result<Self, BoardError> {
        pos.apply_move(mv)?;
        Ok(Self { pos })
    }
}

impl<R: Rules + ?Sized> Deref for Applied<'_, R> {
    type Target = R;
    fn deref(&self) -> &R {
        self.pos
    }
}

impl<R: Rules + ?Sized> DerefMut for Applied<'_, R> {
    fn deref_mut(&mut self) -> &mut R {
        self.pos
    }
}

impl<R: Rules + ?Sized> Drop for Applied<'_, R> {
    fn drop(&mut self) {
        self.pos.undo_move();
    }
}

fn is_castle(board: &Board, mv: Move) -> bool {
    board.piece_on(mv.from) == Some(Piece::King)
        && board.color_on(mv.to) == board.color_on(mv.from)
}

fn promotion_char(piece: Piece) -> char {
    match piece {
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        _ => 'q',
    }
}

/// Standard UCI text for a legal move of `board`.
///
/// cozy-chess encodes castling as the king capturing its own rook; this turns
/// it back into the two-square king move (`e1g1`).
pub fn format_uci(board: &Board, mv: Move) -> String {
    let mut to = mv.to;
    if is_castle(board, mv) {
        let file = if (mv.to.file() as usize) > (mv.from.file() as usize) { File::G } else { File::C };
        to = Square::new(file, mv.from.rank());
    }
    let mut out = format!("{}{}", mv.from, to);
    if let Some(p) = mv.promotion {
        out.push(promotion_char(p));
    }
    out
}

/// Resolves UCI text against the legal moves of `board`.
pub fn parse_uci(board: &Board, text: &str) -> Option<Move> {
    let text = text.trim().to_ascii_lowercase();
    if !(4..=5).contains(&text.len()) {
        return None;
    }
    let mut found = None;
    board.generate_moves(|moves| {
        for m in moves {
            if format_uci(board, m) == text || m.to_string() == text {
                found = Some(m);
                break;
            }
        }
        found.is_some()
    });
    found
}

/// FEN of `board`, writing the en-passant square only when a pawn can
/// actually capture there.
pub fn fen(board: &Board) -> String {
    let mut out = String::with_capacity(90);
    for rank in (0..8).rev() {
        let mut empty = 0;
        for file in 0..8 {
            let sq = Square::new(File::index(file), cozy_chess::Rank::index(rank));
            match (board.color_on(sq), board.piece_on(sq)) {
                (Some(color), Some(piece)) => {
                    if empty > 0 {
                        out.push(char::from(b'0' + empty));
                        empty = 0;
                    }
                    out.push(piece_char(color, piece));
                }
                _ => empty += 1,
            }
        }
        if empty > 0 {
            out.push(char::from(b'0' + empty));
        }
        if rank > 0 {
            out.push('/');
        }
    }

    out.push(' ');
    out.push(if board.side_to_move() == Color::White { 'w' } else { 'b' });

    out.push(' ');
    let mut castling = String::new();
    for (color, short, long) in [(Color::White, 'K', 'Q'), (Color::Black, 'k', 'q')] {
        let rights = board.castle_rights(color);
        if rights.short.is_some() {
            castling.push(short);
        }
        if rights.long.is_some() {
            castling.push(long);
        }
    }
    if castling.is_empty() {
        castling.push('-');
    }
    out.push_str(&castling);

    out.push(' ');
    match en_passant_target(board) {
        Some(sq) => out.push_str(&sq.to_string()),
        None => out.push('-'),
    }

    out.push_str(&format!(" {} {}", board.halfmove_clock(), board.fullmove_number()));
    out
}

fn en_passant_target(board: &Board) -> Option<Square> {
    let file = board.en_passant()?;
    let rank = if board.side_to_move() == Color::White {
        cozy_chess::Rank::Sixth
    } else {
        cozy_chess::Rank::Third
    };
    let target = Square::new(file, rank);
    let mut capturable = false;
    board.generate_moves(|moves| {
        if moves.piece == Piece::Pawn && moves.to.has(target) {
            capturable = true;
        }
        capturable
    });
    capturable.then_some(target)
}

pub fn piece_char(color: Color, piece: Piece) -> char {
    let c = match piece {
        Piece::Pawn => 'p',
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::King => 'k',
    };
    if color == Color::White { c.to_ascii_uppercase() } else { c }
}
