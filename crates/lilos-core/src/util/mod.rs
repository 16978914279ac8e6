pub mod deterministic;
pub mod pool;
pub mod terms;
