//! DAO trait definitions
//!
//! One focused trait per collaborator the curation core consumes or owns.

mod content;
mod engagement;
mod profile;
mod rule;
mod scheduling;
mod template;

pub use content::ContentDao;
pub use engagement::EngagementDao;
pub use profile::ProfileDao;
pub use rule::RuleDao;
pub use scheduling::SchedulingDao;
pub use template::TemplateDao;
