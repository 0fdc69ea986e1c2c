use crate::board::{Applied, Rules};

// Make/unmake perft through the rules boundary (no cloning)
pub fn perft<R: Rules + ?Sized>(pos: &mut R, depth: u32) -> u64 {
    if depth == 0 { return 1; }
    let moves = pos.legal_moves();
    if depth == 1 { return moves.len() as u64; }
    let mut nodes = 0u64;
    for mv in moves {
        if let Ok(mut child) = Applied::new(&mut *pos, mv) {
            nodes += perft(&mut *child, depth - 1);
        }
    }
    nodes
}
