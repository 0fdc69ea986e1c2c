use super::{fen, parse_uci, BoardError, Rules};
use cozy_chess::{Board as CozyBoard, Move, Piece, Square};

/// Game position backed by cozy-chess, with a make/unmake stack.
#[derive(Clone, Debug)]
pub struct Position {
    board: CozyBoard,
    stack: Vec<(CozyBoard, Move)>,
}

impl Default for Position {
    fn default() -> Self {
        Self::startpos()
    }
}

impl Position {
    pub fn startpos() -> Self {
        Self { board: CozyBoard::default(), stack: Vec::with_capacity(128) }
    }

    pub fn from_fen(fen: &str) -> Result<Self, BoardError> {
        CozyBoard::from_fen(fen, false)
            .map(|board| Self { board, stack: Vec::with_capacity(128) })
            .map_err(|e| BoardError::Fen { fen: fen.to_string(), reason: format!("{e:?}") })
    }

    pub fn make_move_uci(&mut self, mv_uci: &str) -> Result<(), BoardError> {
        match parse_uci(&self.board, mv_uci) {
            Some(m) => self.apply_move(m),
            None => Err(BoardError::IllegalMove { mv: mv_uci.to_string(), fen: self.fingerprint() }),
        }
    }

    pub fn set_from_start_and_moves(moves: &[String]) -> Result<Self, BoardError> {
        let mut pos = Self::startpos();
        for m in moves {
            pos.make_move_uci(m)?;
        }
        Ok(pos)
    }

    pub fn legal_moves_count(&self) -> usize {
        let mut ct = 0usize;
        self.board.generate_moves(|moves| {
            ct += moves.len();
            false
        });
        ct
    }

    /// Number of applied moves that can still be undone.
    pub fn ply(&self) -> usize {
        self.stack.len()
    }

    fn is_repetition(&self) -> bool {
        let key = self.board.hash();
        let window = self.board.halfmove_clock() as usize;
        let seen = self
            .stack
            .iter()
            .rev()
            .take(window)
            .filter(|(prev, _)| prev.hash() == key)
            .count();
        seen >= 2
    }

    fn is_stalemate(&self) -> bool {
        self.board.checkers().is_empty() && self.legal_moves_count() == 0
    }
}

fn is_light(sq: Square) -> bool {
    (sq.file() as usize + sq.rank() as usize) % 2 == 1
}

fn insufficient_material(board: &CozyBoard) -> bool {
    let heavy = board.pieces(Piece::Pawn) | board.pieces(Piece::Rook) | board.pieces(Piece::Queen);
    if !heavy.is_empty() {
        return false;
    }
    let knights = board.pieces(Piece::Knight);
    let bishops = board.pieces(Piece::Bishop);
    if knights.len() + bishops.len() <= 1 {
        return true;
    }
    if !knights.is_empty() {
        return false;
    }
    let light = bishops.into_iter().filter(|&sq| is_light(sq)).count();
    light == 0 || light == bishops.len() as usize
}

impl Rules for Position {
    fn board(&self) -> &CozyBoard {
        &self.board
    }

    fn apply_move(&mut self, mv: Move) -> Result<(), BoardError> {
        if !self.board.is_legal(mv) {
            return Err(BoardError::IllegalMove { mv: mv.to_string(), fen: self.fingerprint() });
        }
        let prev = self.board.clone();
        self.board.play_unchecked(mv);
        self.stack.push((prev, mv));
        Ok(())
    }

    fn undo_move(&mut self) -> Option<Move> {
        let (prev, mv) = self.stack.pop()?;
        self.board = prev;
        Some(mv)
    }

    fn legal_moves(&self) -> Vec<Move> {
        let mut out = Vec::with_capacity(64);
        self.board.generate_moves(|moves| {
            out.extend(moves);
            false
        });
        out
    }

    fn legal_moves_from(&self, square: Square) -> Vec<Move> {
        let mut out = Vec::new();
        self.board.generate_moves_for(square.bitboard(), |moves| {
            out.extend(moves);
            false
        });
        out
    }

    fn is_draw(&self) -> bool {
        self.board.halfmove_clock() >= 100
            || self.is_stalemate()
            || insufficient_material(&self.board)
            || self.is_repetition()
    }

    fn fingerprint(&self) -> String {
        fen(&self.board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_then_undo_restores_fingerprint() {
        let mut pos = Position::startpos();
        let before = pos.fingerprint();
        for mv in pos.legal_moves() {
            pos.apply_move(mv).unwrap();
            assert_ne!(pos.fingerprint(), before);
            assert_eq!(pos.undo_move(), Some(mv));
            assert_eq!(pos.fingerprint(), before);
        }
        assert_eq!(pos.ply(), 0);
        assert_eq!(pos.undo_move(), None);
    }

    #[test]
    fn illegal_move_is_rejected_without_side_effects() {
        let mut pos = Position::startpos();
        let before = pos.fingerprint();
        let bogus = Move { from: Square::E2, to: Square::E5, promotion: None };
        assert!(matches!(pos.apply_move(bogus), Err(BoardError::IllegalMove { .. })));
        assert_eq!(pos.fingerprint(), before);
        assert_eq!(pos.ply(), 0);
    }

    #[test]
    fn threefold_repetition_is_a_draw() {
        let mut pos = Position::startpos();
        for _ in 0..2 {
            for mv in ["g1f3", "g8f6", "f3g1", "f6g8"] {
                pos.make_move_uci(mv).unwrap();
            }
        }
        assert!(pos.is_draw());
    }

    #[test]
    fn insufficient_material_cases() {
        let kk = Position::from_fen("8/8/4k3/8/8/3K4/8/8 w - - 0 1").unwrap();
        assert!(kk.is_draw());
        let knight = Position::from_fen("8/8/4k3/8/8/3KN3/8/8 w - - 0 1").unwrap();
        assert!(knight.is_draw());
        let rook = Position::from_fen("8/8/4k3/8/8/3KR3/8/8 w - - 0 1").unwrap();
        assert!(!rook.is_draw());
    }

    #[test]
    fn legal_moves_from_square() {
        let pos = Position::startpos();
        assert_eq!(pos.legal_moves_from(Square::G1).len(), 2);
        assert_eq!(pos.legal_moves_from(Square::E1).len(), 0);
    }
}
