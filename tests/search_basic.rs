use pretty_assertions::assert_eq;
use rookie::board::{Position, Rules};
use rookie::search::alphabeta::{ScoredMove, SearchParams, Searcher, INFINITY};
use rookie::search::eval::{self, MATE_SCORE};

fn root(fen: &str, params: SearchParams) -> (Vec<ScoredMove>, Position) {
    let mut pos = Position::from_fen(fen).expect("valid fen");
    let before = pos.fingerprint();
    let ranked = Searcher::default().search_root(&mut pos, &params).expect("no deadline");
    assert_eq!(pos.fingerprint(), before, "search must undo every move");
    (ranked, pos)
}

#[test]
fn eval_material_startpos_is_zero() {
    let b = cozy_chess::Board::default();
    assert_eq!(eval::material_eval_cp_side_agnostic(&b), 0);
}

#[test]
fn evaluation_is_deterministic() {
    let pos = Position::from_fen("r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3").unwrap();
    assert_eq!(eval::evaluate(&pos), eval::evaluate(&pos));
}

#[test]
fn checkmate_and_draw_overrides() {
    let mated_white = Position::from_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3").unwrap();
    assert_eq!(eval::evaluate(&mated_white), -MATE_SCORE);
    let mated_black = Position::from_fen("R5k1/5ppp/8/8/8/8/8/6K1 b - - 1 1").unwrap();
    assert_eq!(eval::evaluate(&mated_black), MATE_SCORE);
    let fifty = Position::from_fen("4k3/8/8/8/8/8/4P3/4K2R w K - 100 80").unwrap();
    assert_eq!(eval::evaluate(&fifty), 0);
}

#[test]
fn search_prefers_winning_queen_capture() {
    let (ranked, _) = root("k7/8/8/8/8/8/3qQ3/7K w - - 0 1", SearchParams { depth: 1, ..SearchParams::default() });
    assert_eq!(ranked[0].uci, "e2d2", "expected Qe2xd2 first, got {:?}", ranked[0]);
}

#[test]
fn search_finds_back_rank_mate() {
    let (ranked, _) = root("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1", SearchParams { depth: 2, ..SearchParams::default() });
    assert_eq!(ranked[0].uci, "a1a8");
    assert!(ranked[0].score > MATE_SCORE - 10);
}

#[test]
fn black_scores_are_from_blacks_side() {
    // black to move can take a free queen
    let (ranked, _) = root("k7/8/8/8/8/8/3qQ3/7K b - - 0 1", SearchParams { depth: 1, ..SearchParams::default() });
    assert_eq!(ranked[0].uci, "d2e2");
    assert!(ranked[0].score > 0);
}

#[test]
fn every_root_move_is_ranked_best_first() {
    let (ranked, pos) = root(
        "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3",
        SearchParams { depth: 2, ..SearchParams::default() },
    );
    assert_eq!(ranked.len(), pos.legal_moves().len());
    assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn cache_does_not_change_results() {
    let fen = "r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4";
    let with = SearchParams { depth: 2, ..SearchParams::default() };
    let without = SearchParams { use_cache: false, ..with };
    let (a, _) = root(fen, with);
    let (b, _) = root(fen, without);
    assert_eq!(a, b);

    // same searcher, cache cleared between runs
    let mut pos = Position::from_fen(fen).unwrap();
    let mut s = Searcher::default();
    let first = s.search_root(&mut pos, &with).unwrap();
    assert!(!s.cache().is_empty());
    s.clear_cache();
    assert!(s.cache().is_empty());
    let second = s.search_root(&mut pos, &with).unwrap();
    assert_eq!(first, second);
}

#[test]
fn move_ordering_does_not_change_scores() {
    let fen = "r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4";
    let ordered = SearchParams { depth: 2, ..SearchParams::default() };
    let (mut a, _) = root(fen, ordered);
    let (mut b, _) = root(fen, SearchParams { order_moves: false, ..ordered });
    a.sort_by(|x, y| x.uci.cmp(&y.uci));
    b.sort_by(|x, y| x.uci.cmp(&y.uci));
    assert_eq!(a, b);
}

#[test]
fn root_moves_are_searched_at_the_full_depth() {
    let fen = "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3";
    let (ranked, mut pos) = root(fen, SearchParams { depth: 2, ..SearchParams::default() });
    for scored in ranked.iter().take(3) {
        pos.apply_move(scored.mv).unwrap();
        // black replies, white answers, then the leaf
        let below = Searcher::default().alphabeta(&mut pos, 2, -INFINITY, INFINITY, false).unwrap();
        pos.undo_move();
        assert_eq!(scored.score, below, "{}", scored.uci);
    }
    assert_eq!(pos.fingerprint(), fen);
}

#[test]
fn nearer_mate_outranks_slower_mate() {
    // Qa8# and Qg7# mate at once; Qa7 Kg8 Qg7# takes three plies
    let (ranked, _) = root("7k/8/6K1/8/8/8/8/Q7 w - - 0 1", SearchParams { depth: 2, ..SearchParams::default() });
    assert!(["a1a8", "a1g7"].contains(&ranked[0].uci.as_str()), "got {:?}", ranked[0]);
    assert_eq!(ranked[0].score, MATE_SCORE - 1);
    let slow = ranked.iter().find(|m| m.uci == "a1a7").expect("a1a7 is legal");
    assert_eq!(slow.score, MATE_SCORE - 3);
}
