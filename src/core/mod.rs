pub mod dedup;
pub mod engine;
pub mod expander;
pub mod fallback;
pub mod interleave;
pub mod scheduler;
pub mod scoring;

pub use engine::{Phase, RunStats, SearchEngine, SearchReport, SearchRequest};
