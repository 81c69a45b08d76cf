pub mod memory;
pub mod postgres;
pub mod traits;

use std::sync::Arc;

pub use memory::InMemoryStore;
pub use postgres::PgCurationDao;
pub use traits::{ContentDao, EngagementDao, ProfileDao, RuleDao, SchedulingDao, TemplateDao};

/// Every store handle the curation core needs, behind trait objects.
#[derive(Clone)]
pub struct Stores {
    pub content: Arc<dyn ContentDao>,
    pub engagement: Arc<dyn EngagementDao>,
    pub profiles: Arc<dyn ProfileDao>,
    pub scheduling: Arc<dyn SchedulingDao>,
    pub rules: Arc<dyn RuleDao>,
    pub templates: Arc<dyn TemplateDao>,
}

impl Stores {
    /// Uses one backend for every concern.
    pub fn from_backend<T>(backend: Arc<T>) -> Self
    where
        T: ContentDao + EngagementDao + ProfileDao + SchedulingDao + RuleDao + TemplateDao + 'static,
    {
        Self {
            content: backend.clone(),
            engagement: backend.clone(),
            profiles: backend.clone(),
            scheduling: backend.clone(),
            rules: backend.clone(),
            templates: backend,
        }
    }
}
