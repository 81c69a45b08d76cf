pub mod auto_schedule;
pub mod clustering;
pub mod discovery;
pub mod engine;
pub mod freshness;
pub mod gaps;
pub mod insights;
pub mod prediction;
pub mod scoring;
pub mod similarity;

pub use engine::{CurationEngine, CurationOutcome, EngineSettings};
