pub mod performance_advisor;

pub use performance_advisor::{HttpPerformanceAdvisor, NoopAdvisor, PerformanceAdvisor};
