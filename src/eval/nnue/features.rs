use cozy_chess::{
    get_bishop_moves, get_king_moves, get_knight_moves, get_pawn_attacks, get_rook_moves, BitBoard, Board, Color,
    Piece, Square,
};

const PIECE_ORDER: [Piece; 6] = [Piece::Pawn, Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen, Piece::King];

// Order of the four centre-control pairs in the extended encoding.
const CENTER: [Square; 4] = [Square::E4, Square::D4, Square::E5, Square::D5];

const ONE_HOT_DIM: usize = 64 * 12;

/// Input encodings a dense network may be trained on, identified by width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureSet {
    /// White then Black piece counts in pawn..king order.
    PieceCounts,
    /// 768 square/piece one-hots (a8 first, `PNBRQKpnbrqk` per square),
    /// followed by per-type material, centre attackers, king attackers and
    /// the side to move's legal move count. Unused tail slots stay zero.
    Extended,
}

impl FeatureSet {
    pub const PIECE_COUNTS_DIM: usize = 12;
    pub const EXTENDED_DIM: usize = 896;

    pub fn for_input_dim(dim: usize) -> Option<Self> {
        match dim {
            Self::PIECE_COUNTS_DIM => Some(Self::PieceCounts),
            Self::EXTENDED_DIM => Some(Self::Extended),
            _ => None,
        }
    }

    pub fn dim(self) -> usize {
        match self {
            Self::PieceCounts => Self::PIECE_COUNTS_DIM,
            Self::Extended => Self::EXTENDED_DIM,
        }
    }

    pub fn encode(self, board: &Board) -> Vec<f32> {
        let mut out = vec![0f32; self.dim()];
        match self {
            Self::PieceCounts => piece_counts(board, &mut out),
            Self::Extended => extended(board, &mut out),
        }
        out
    }
}

fn piece_counts(board: &Board, out: &mut [f32]) {
    for (i, &p) in PIECE_ORDER.iter().enumerate() {
        out[i] = (board.pieces(p) & board.colors(Color::White)).len() as f32;
        out[6 + i] = (board.pieces(p) & board.colors(Color::Black)).len() as f32;
    }
}

/// Pieces of `color` attacking `sq`.
pub fn attackers(board: &Board, color: Color, sq: Square) -> BitBoard {
    let ours = board.colors(color);
    let occupied = board.colors(Color::White) | board.colors(Color::Black);
    let them = if color == Color::White { Color::Black } else { Color::White };
    let diag = board.pieces(Piece::Bishop) | board.pieces(Piece::Queen);
    let ortho = board.pieces(Piece::Rook) | board.pieces(Piece::Queen);
    ours & ((get_pawn_attacks(sq, them) & board.pieces(Piece::Pawn))
        | (get_knight_moves(sq) & board.pieces(Piece::Knight))
        | (get_king_moves(sq) & board.pieces(Piece::King))
        | (get_bishop_moves(sq, occupied) & diag)
        | (get_rook_moves(sq, occupied) & ortho))
}

fn extended(board: &Board, out: &mut [f32]) {
    for sq in board.colors(Color::White) | board.colors(Color::Black) {
        let (Some(piece), Some(color)) = (board.piece_on(sq), board.color_on(sq)) else { continue };
        let row = 7 - sq.rank() as usize;
        let col = sq.file() as usize;
        let kind = PIECE_ORDER.iter().position(|&p| p == piece).unwrap_or(0);
        let channel = if color == Color::White { kind } else { 6 + kind };
        out[(row * 8 + col) * 12 + channel] = 1.0;
    }

    let mut idx = ONE_HOT_DIM;
    for &p in &PIECE_ORDER {
        out[idx] = (board.pieces(p) & board.colors(Color::White)).len() as f32;
        out[idx + 1] = (board.pieces(p) & board.colors(Color::Black)).len() as f32;
        idx += 2;
    }
    for &sq in &CENTER {
        out[idx] = attackers(board, Color::White, sq).len() as f32;
        out[idx + 1] = attackers(board, Color::Black, sq).len() as f32;
        idx += 2;
    }
    out[idx] = attackers(board, Color::Black, board.king(Color::White)).len() as f32;
    out[idx + 1] = attackers(board, Color::White, board.king(Color::Black)).len() as f32;
    idx += 2;

    let mut moves = 0usize;
    board.generate_moves(|ml| {
        moves += ml.len();
        false
    });
    let slot = if board.side_to_move() == Color::White { idx } else { idx + 1 };
    out[slot] = moves as f32;
}
