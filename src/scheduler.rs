pub mod daemon;
pub mod gating;
pub mod rules;

pub use daemon::{RuleDaemon, spawn_rule_daemon};
pub use gating::should_run;
pub use rules::{BatchExecution, RuleExecution, RuleRunStatus, RuleScheduler};
