use rayon::prelude::*;
use rookie::board::{parse_uci, Position, Rules};
use rookie::book::OpeningBook;
use rookie::engine::{Engine, EngineConfig, MoveSource};
use std::sync::Arc;

const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";

fn config(seed: u64) -> EngineConfig {
    EngineConfig { depth: 1, seed: Some(seed), ..EngineConfig::default() }
}

#[test]
fn book_is_used_about_eighty_percent_of_the_time() {
    let book = Arc::new(OpeningBook::builtin());
    let n = 1000u64;
    let choices: Vec<_> = (0..n)
        .into_par_iter()
        .map(|seed| {
            let engine = Engine::with_book(config(seed), Arc::clone(&book)).unwrap();
            let mut pos = Position::from_fen(AFTER_E4).unwrap();
            let choice = engine.choose_move(&mut pos, None).unwrap();
            assert_eq!(pos.fingerprint(), AFTER_E4);
            choice
        })
        .collect();

    let from_book: Vec<_> = choices.iter().filter(|c| c.source == MoveSource::Book).collect();
    assert!(from_book.iter().all(|c| c.uci == "e7e5"));
    assert!(choices.iter().filter(|c| c.source != MoveSource::Book).all(|c| c.source == MoveSource::Search));
    let share = from_book.len() as f64 / n as f64;
    assert!((0.74..=0.86).contains(&share), "book share {share:.3}");
}

#[test]
fn repeated_calls_on_one_engine() {
    let engine = Engine::new(config(2024)).unwrap();
    let mut pos = Position::from_fen(AFTER_E4).unwrap();
    let n = 500;
    let mut e5 = 0;
    for _ in 0..n {
        let mv = engine.find_best_move(&mut pos, None).unwrap();
        assert!(parse_uci(pos.board(), &mv).is_some());
        if mv == "e7e5" {
            e5 += 1;
        }
    }
    // the search may pick e7e5 on its own, so only the lower side is tight
    let share = e5 as f64 / n as f64;
    assert!(share > 0.72, "e7e5 share {share:.3}");
}

#[test]
fn gate_extremes() {
    let always = Engine::new(EngineConfig { book_probability: 1.0, ..config(1) }).unwrap();
    let never = Engine::new(EngineConfig { book_probability: 0.0, ..config(1) }).unwrap();
    let off = Engine::new(EngineConfig { use_book: false, ..config(1) }).unwrap();
    for _ in 0..20 {
        let mut pos = Position::from_fen(AFTER_E4).unwrap();
        assert_eq!(always.choose_move(&mut pos, None).unwrap().source, MoveSource::Book);
        assert_eq!(never.choose_move(&mut pos, None).unwrap().source, MoveSource::Search);
        assert_eq!(off.choose_move(&mut pos, None).unwrap().source, MoveSource::Search);
    }
}

#[test]
fn transposed_position_is_a_book_miss() {
    let engine = Engine::new(EngineConfig { book_probability: 1.0, ..config(1) }).unwrap();
    // same placement as after 1.e4 but a later move number
    let mut pos = Position::from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 9").unwrap();
    assert_eq!(engine.choose_move(&mut pos, None).unwrap().source, MoveSource::Search);
}

#[test]
fn illegal_book_entries_fall_through_to_search() {
    let mut book = OpeningBook::default();
    book.insert(AFTER_E4, "e2e4");
    let engine = Engine::with_book(EngineConfig { book_probability: 1.0, ..config(3) }, Arc::new(book)).unwrap();
    let mut pos = Position::from_fen(AFTER_E4).unwrap();
    let choice = engine.choose_move(&mut pos, None).unwrap();
    assert_eq!(choice.source, MoveSource::Search);
    assert!(parse_uci(pos.board(), &choice.uci).is_some());
}
