use cozy_chess::{
    get_bishop_moves, get_king_moves, get_knight_moves, get_pawn_attacks, get_rook_moves, BitBoard, Board, Color,
    File, Piece, Rank, Square,
};
use crate::board::Rules;

const PAWN: i32 = 100;
const KNIGHT: i32 = 320;
const BISHOP: i32 = 330;
const ROOK: i32 = 500;
const QUEEN: i32 = 900;
const KING: i32 = 20_000;

pub const MOBILITY_WEIGHT: i32 = 10;
pub const CENTER_BONUS: i32 = 30;
pub const KING_SAFETY_WEIGHT: i32 = 50;

// Mate scoring helpers
pub const MATE_SCORE: i32 = 10_000;
pub const DRAW_SCORE: i32 = 0;

const CENTER: [Square; 4] = [Square::D4, Square::E4, Square::D5, Square::E5];

/// A position scorer. Scores are centipawns from White's point of view and
/// are only asked for positions that are not already decided.
pub trait Evaluator: Send + Sync {
    fn name(&self) -> &str;
    fn evaluate(&self, board: &Board) -> anyhow::Result<i32>;
}

/// Material, mobility, centre occupancy and king safety.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticEvaluator;

impl Evaluator for StaticEvaluator {
    fn name(&self) -> &str { "static" }

    fn evaluate(&self, board: &Board) -> anyhow::Result<i32> {
        Ok(eval_cp(board))
    }
}

pub(crate) fn other(color: Color) -> Color {
    if color == Color::White { Color::Black } else { Color::White }
}

pub fn piece_value(piece: Piece) -> i32 {
    match piece {
        Piece::Pawn => PAWN,
        Piece::Knight => KNIGHT,
        Piece::Bishop => BISHOP,
        Piece::Rook => ROOK,
        Piece::Queen => QUEEN,
        Piece::King => KING,
    }
}

fn count_piece(board: &Board, color: Color, piece: Piece) -> i32 {
    let bb = board.colors(color) & board.pieces(piece);
    bb.len() as i32
}

// Side-agnostic material in centipawns: positive means White has more material.
pub fn material_eval_cp_side_agnostic(board: &Board) -> i32 {
    let w = Color::White;
    let b = Color::Black;
    (count_piece(board, w, Piece::Pawn) - count_piece(board, b, Piece::Pawn)) * PAWN
        + (count_piece(board, w, Piece::Knight) - count_piece(board, b, Piece::Knight)) * KNIGHT
        + (count_piece(board, w, Piece::Bishop) - count_piece(board, b, Piece::Bishop)) * BISHOP
        + (count_piece(board, w, Piece::Rook) - count_piece(board, b, Piece::Rook)) * ROOK
        + (count_piece(board, w, Piece::Queen) - count_piece(board, b, Piece::Queen)) * QUEEN
        + (count_piece(board, w, Piece::King) - count_piece(board, b, Piece::King)) * KING
}

/// Legal move count of the side to move, always added whoever is to move.
pub fn mobility_cp(board: &Board) -> i32 {
    let mut ct = 0i32;
    board.generate_moves(|moves| {
        ct += moves.len() as i32;
        false
    });
    ct * MOBILITY_WEIGHT
}

pub fn center_cp(board: &Board) -> i32 {
    CENTER
        .iter()
        .filter_map(|&sq| board.color_on(sq))
        .map(|c| if c == Color::White { CENTER_BONUS } else { -CENTER_BONUS })
        .sum()
}

fn attacked_by(board: &Board, color: Color, occupied: BitBoard) -> BitBoard {
    let ours = board.colors(color);
    let mut attacks = get_king_moves(board.king(color));
    for sq in ours & board.pieces(Piece::Pawn) {
        attacks = attacks | get_pawn_attacks(sq, color);
    }
    for sq in ours & board.pieces(Piece::Knight) {
        attacks = attacks | get_knight_moves(sq);
    }
    for sq in ours & (board.pieces(Piece::Bishop) | board.pieces(Piece::Queen)) {
        attacks = attacks | get_bishop_moves(sq, occupied);
    }
    for sq in ours & (board.pieces(Piece::Rook) | board.pieces(Piece::Queen)) {
        attacks = attacks | get_rook_moves(sq, occupied);
    }
    attacks
}

fn shield_pawns(board: &Board, color: Color, king: Square) -> i32 {
    let rank = king.rank() as i32 + if color == Color::White { 1 } else { -1 };
    if !(0..8).contains(&rank) { return 0; }
    let pawns = board.colors(color) & board.pieces(Piece::Pawn);
    let kf = king.file() as i32;
    (kf - 1..=kf + 1)
        .filter(|f| (0..8).contains(f))
        .filter(|&f| pawns.has(Square::new(File::index(f as usize), Rank::index(rank as usize))))
        .count() as i32
}

/// Unweighted king safety for `color`: safe king steps, plus two per shield
/// pawn on the rank in front of the king, minus two per enemy piece the king
/// could take.
pub fn king_safety(board: &Board, color: Color) -> i32 {
    let enemy = other(color);
    let king = board.king(color);
    let occupied = (board.colors(Color::White) | board.colors(Color::Black)) & !king.bitboard();
    let danger = attacked_by(board, enemy, occupied);
    let steps = get_king_moves(king) & !board.colors(color) & !danger;
    let capturable = (steps & board.colors(enemy)).len() as i32;
    steps.len() as i32 + 2 * shield_pawns(board, color, king) - 2 * capturable
}

/// Static evaluation of a non-terminal position, White positive.
pub fn eval_cp(board: &Board) -> i32 {
    material_eval_cp_side_agnostic(board)
        + mobility_cp(board)
        + center_cp(board)
        + KING_SAFETY_WEIGHT * (king_safety(board, Color::White) - king_safety(board, Color::Black))
}

/// Checkmate and draw overrides; `None` while the game is still going.
pub fn terminal_score<R: Rules + ?Sized>(pos: &R) -> Option<i32> {
    if pos.legal_moves().is_empty() {
        if !pos.is_check() { return Some(DRAW_SCORE); }
        return Some(if pos.side_to_move() == Color::White { -MATE_SCORE } else { MATE_SCORE });
    }
    if pos.is_draw() { return Some(DRAW_SCORE); }
    None
}

/// Static evaluation with terminal overrides.
pub fn evaluate<R: Rules + ?Sized>(pos: &R) -> i32 {
    terminal_score(pos).unwrap_or_else(|| eval_cp(pos.board()))
}

/// Like [`evaluate`], delegating live positions to `evaluator` and falling
/// back to the static score when it fails. The flag reports the fallback.
pub fn evaluate_with<R: Rules + ?Sized>(pos: &R, evaluator: &dyn Evaluator) -> (i32, bool) {
    if let Some(score) = terminal_score(pos) {
        return (score, false);
    }
    match evaluator.evaluate(pos.board()) {
        Ok(score) => (score, false),
        Err(_) => (eval_cp(pos.board()), true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Position;

    #[test]
    fn startpos_is_mobility_only() {
        let white = Position::startpos();
        assert_eq!(evaluate(&white), 20 * MOBILITY_WEIGHT);
        let black = Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0 1").unwrap();
        assert_eq!(evaluate(&black), 20 * MOBILITY_WEIGHT);
    }

    #[test]
    fn king_safety_counts_shield_and_steps() {
        let board = Board::default();
        // boxed in, d2/e2/f2 shield
        assert_eq!(king_safety(&board, Color::White), 6);
        // lone kings: eight free steps on an open board, no shield
        let open = Board::from_fen("8/8/8/3k4/8/8/4K3/8 w - - 0 1", false).unwrap();
        assert_eq!(king_safety(&open, Color::White), 8);
    }

    #[test]
    fn king_may_not_step_into_attack() {
        // e1 king; black rook on d8 covers the d-file, black queen on f8 the f-file
        let board = Board::from_fen("3r1q1k/8/8/8/8/8/8/4K3 w - - 0 1", false).unwrap();
        // only e2 is left
        assert_eq!(king_safety(&board, Color::White), 1);
    }

    #[test]
    fn center_bonus_follows_colour() {
        let board = Board::from_fen("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1", false).unwrap();
        assert_eq!(center_cp(&board), 0);
        let board = Board::from_fen("4k3/8/8/8/3PP3/8/8/4K3 w - - 0 1", false).unwrap();
        assert_eq!(center_cp(&board), 2 * CENTER_BONUS);
    }
}
