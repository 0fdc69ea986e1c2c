use cozy_chess::Board;
use rookie::eval::nnue::{FeatureSet, Network, NetworkMeta};
use rookie::search::eval::Evaluator;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

fn tmp(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(name)
}

#[test]
fn header_only_file_is_rejected() {
    let path = tmp("nnue_header_only.nnue");
    let mut f = File::create(&path).unwrap();
    f.write_all(b"PIENNUE1").unwrap();
    f.write_all(&1u32.to_le_bytes()).unwrap();
    f.write_all(&12u32.to_le_bytes()).unwrap();
    f.write_all(&256u32.to_le_bytes()).unwrap();
    f.write_all(&1u32.to_le_bytes()).unwrap();
    drop(f);
    let err = Network::load(&path).unwrap_err();
    assert!(format!("{err:#}").contains("truncated"), "{err:#}");
}

#[test]
fn extended_network_round_trips_through_a_file() {
    // one hidden unit counting the side to move's mobility
    let meta = NetworkMeta { version: 2, input_dim: 896, hidden_dim: 1, output_dim: 1 };
    let mut w1 = vec![0.0; 896];
    w1[790] = 1.0;
    w1[791] = -1.0;
    let net = Network::from_parts(meta, w1, vec![100.0], vec![1.0], vec![-100.0]).unwrap();
    let path = tmp("nnue_extended.nnue");
    net.save(&path).unwrap();

    let loaded = Network::load(&path).unwrap().with_output_scale(10.0);
    assert_eq!(loaded.meta, meta);
    assert_eq!(loaded.feature_set(), Some(FeatureSet::Extended));
    assert_eq!(loaded.name(), "nnue");
    assert_eq!(loaded.evaluate(&Board::default()).unwrap(), 200);
    let black = Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0 1", false).unwrap();
    assert_eq!(loaded.evaluate(&black).unwrap(), -200);
}
