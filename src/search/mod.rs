pub mod alphabeta;
pub mod eval;
pub mod noise;
pub mod time;
pub mod tt;
