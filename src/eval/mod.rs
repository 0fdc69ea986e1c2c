pub mod nnue;
