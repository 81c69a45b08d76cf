//! Shareable curation templates: visibility-checked CRUD, on-demand use and
//! duplication. Templates carry no run state or interval gating.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::curation::{CurationEngine, CurationOutcome};
use crate::observability::metrics::Metrics;
use crate::store::dao::TemplateDao;
use crate::store::models::{CurationSource, CurationTemplate, TemplateDraft};
use crate::util::error::CurationError;

pub const DEFAULT_PUBLIC_LIMIT: usize = 20;
/// Public templates merged into an owner listing.
const LISTED_PUBLIC_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateUse {
    pub template_id: Uuid,
    pub template_name: String,
    #[serde(flatten)]
    pub outcome: CurationOutcome,
}

#[derive(Clone)]
pub struct TemplateLibrary {
    templates: Arc<dyn TemplateDao>,
    engine: CurationEngine,
    metrics: Arc<Metrics>,
}

impl TemplateLibrary {
    pub fn new(engine: CurationEngine, metrics: Arc<Metrics>) -> Self {
        Self {
            templates: Arc::clone(&engine.stores().templates),
            engine,
            metrics,
        }
    }

    /// # Errors
    /// `Validation` for out-of-range configuration.
    pub async fn create(&self, owner_id: Uuid, draft: TemplateDraft) -> Result<CurationTemplate> {
        draft.validate()?;
        let now = Utc::now();
        let template = CurationTemplate {
            id: Uuid::new_v4(),
            owner_id,
            name: draft.name,
            description: draft.description,
            is_public: draft.is_public,
            criteria: draft.criteria,
            actions: draft.actions,
            use_count: 0,
            last_used: None,
            created_at: now,
            updated_at: now,
        };
        self.templates
            .insert_template(&template)
            .await
            .context("failed to insert curation template")?;
        info!(owner_id = %owner_id, template_id = %template.id, public = template.is_public, "curation template created");
        Ok(template)
    }

    /// The owner's templates, followed by other owners' public templates when
    /// `include_public` is set.
    pub async fn list_for_owner(&self, owner_id: Uuid, include_public: bool) -> Result<Vec<CurationTemplate>> {
        let mut templates = self
            .templates
            .list_owner_templates(owner_id)
            .await
            .context("failed to list owner templates")?;
        if include_public {
            let public = self
                .templates
                .list_public_templates(LISTED_PUBLIC_LIMIT)
                .await
                .context("failed to list public templates")?;
            templates.extend(public.into_iter().filter(|template| template.owner_id != owner_id));
        }
        Ok(templates)
    }

    pub async fn list_public(&self, limit: usize) -> Result<Vec<CurationTemplate>> {
        self.templates
            .list_public_templates(limit)
            .await
            .context("failed to list public templates")
    }

    /// # Errors
    /// `NotFound` when absent or private to another owner.
    pub async fn get_visible(&self, viewer: Uuid, template_id: Uuid) -> Result<CurationTemplate> {
        self.templates
            .get_template(template_id)
            .await
            .context("failed to load curation template")?
            .filter(|template| template.is_visible_to(viewer))
            .ok_or_else(|| CurationError::template_not_found(template_id).into())
    }

    /// Visible but foreign templates are `Forbidden`; invisible ones `NotFound`.
    async fn ensure_owned(&self, owner_id: Uuid, template_id: Uuid) -> Result<()> {
        let template = self.get_visible(owner_id, template_id).await?;
        if template.owner_id != owner_id {
            return Err(CurationError::Forbidden {
                entity: "template",
                id: template_id,
            }
            .into());
        }
        Ok(())
    }

    /// # Errors
    /// `Validation`, `NotFound` or `Forbidden`.
    pub async fn update(&self, owner_id: Uuid, template_id: Uuid, draft: TemplateDraft) -> Result<CurationTemplate> {
        draft.validate()?;
        self.ensure_owned(owner_id, template_id).await?;
        let updated = self
            .templates
            .update_template_config(template_id, owner_id, &draft, Utc::now())
            .await
            .context("failed to update curation template")?
            .ok_or(CurationError::template_not_found(template_id))?;
        info!(owner_id = %owner_id, template_id = %template_id, "curation template updated");
        Ok(updated)
    }

    /// # Errors
    /// `NotFound` or `Forbidden`.
    pub async fn delete(&self, owner_id: Uuid, template_id: Uuid) -> Result<()> {
        self.ensure_owned(owner_id, template_id).await?;
        let deleted = self
            .templates
            .delete_template(template_id, owner_id)
            .await
            .context("failed to delete curation template")?;
        if !deleted {
            return Err(CurationError::template_not_found(template_id).into());
        }
        info!(owner_id = %owner_id, template_id = %template_id, "curation template deleted");
        Ok(())
    }

    /// Runs the template's configuration for `owner_id` and bumps its usage.
    ///
    /// # Errors
    /// `NotFound` when not visible; discovery and store failures.
    pub async fn use_template(&self, owner_id: Uuid, template_id: Uuid) -> Result<TemplateUse> {
        let template = self.get_visible(owner_id, template_id).await?;
        let outcome = self
            .engine
            .run_configured(
                owner_id,
                &template.criteria,
                &template.actions,
                Some(CurationSource::Template(template.id)),
            )
            .await
            .with_context(|| format!("failed to apply curation template {template_id}"))?;

        self.templates
            .record_template_use(template_id, Utc::now())
            .await
            .context("failed to record template use")?;
        self.metrics.templates_used.inc();
        info!(
            owner_id = %owner_id,
            template_id = %template_id,
            curated = outcome.curated,
            "curation template applied"
        );

        Ok(TemplateUse {
            template_id,
            template_name: template.name,
            outcome,
        })
    }

    /// Copies a visible template into a new private one owned by `owner_id`.
    ///
    /// # Errors
    /// `NotFound` when not visible.
    pub async fn duplicate(
        &self,
        owner_id: Uuid,
        template_id: Uuid,
        name: Option<String>,
    ) -> Result<CurationTemplate> {
        let source = self.get_visible(owner_id, template_id).await?;
        let name = name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| format!("{} (Copy)", source.name));
        let copy = self
            .create(
                owner_id,
                TemplateDraft {
                    name,
                    description: source.description,
                    is_public: false,
                    criteria: source.criteria,
                    actions: source.actions,
                },
            )
            .await?;
        info!(owner_id = %owner_id, source_id = %template_id, template_id = %copy.id, "curation template duplicated");
        Ok(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::NoopAdvisor;
    use crate::curation::EngineSettings;
    use crate::store::dao::{InMemoryStore, Stores};
    use crate::store::models::{CurationActions, CurationCriteria};
    use crate::util::error::{ErrorKind, classify_error};

    fn library() -> (TemplateLibrary, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let metrics = Arc::new(Metrics::standalone().expect("metrics"));
        let engine = CurationEngine::new(
            Stores::from_backend(store.clone()),
            Arc::new(NoopAdvisor),
            Arc::clone(&metrics),
            EngineSettings::default(),
        );
        (TemplateLibrary::new(engine, metrics), store)
    }

    fn draft(name: &str, is_public: bool) -> TemplateDraft {
        TemplateDraft {
            name: name.into(),
            description: Some("weekly highlights".into()),
            is_public,
            criteria: CurationCriteria::default(),
            actions: CurationActions::default(),
        }
    }

    #[tokio::test]
    async fn private_templates_are_invisible_to_others() {
        let (library, _) = library();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let private = library.create(owner, draft("mine", false)).await.expect("create");

        let error = library
            .use_template(stranger, private.id)
            .await
            .expect_err("invisible");
        assert_eq!(classify_error(&error), ErrorKind::NotFound);
        assert!(library.get_visible(owner, private.id).await.is_ok());
    }

    #[tokio::test]
    async fn public_templates_can_be_used_but_not_edited_by_others() {
        let (library, _) = library();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let shared = library.create(owner, draft("shared", true)).await.expect("create");

        let used = library.use_template(stranger, shared.id).await.expect("use");
        assert_eq!(used.template_name, "shared");
        assert_eq!(used.outcome.curated, 0);

        let again = library.get_visible(stranger, shared.id).await.expect("visible");
        assert_eq!(again.use_count, 1);
        assert!(again.last_used.is_some());

        let error = library
            .update(stranger, shared.id, draft("hijack", true))
            .await
            .expect_err("forbidden");
        assert_eq!(classify_error(&error), ErrorKind::Forbidden);
        let error = library.delete(stranger, shared.id).await.expect_err("forbidden");
        assert_eq!(classify_error(&error), ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn duplicate_creates_private_copy_for_caller() {
        let (library, _) = library();
        let owner = Uuid::new_v4();
        let caller = Uuid::new_v4();
        let shared = library.create(owner, draft("Evergreen picks", true)).await.expect("create");

        let copy = library.duplicate(caller, shared.id, None).await.expect("duplicate");
        assert_eq!(copy.name, "Evergreen picks (Copy)");
        assert_eq!(copy.owner_id, caller);
        assert!(!copy.is_public);
        assert_eq!(copy.criteria, shared.criteria);
        assert_eq!(copy.use_count, 0);

        let named = library
            .duplicate(caller, shared.id, Some("My picks".into()))
            .await
            .expect("duplicate");
        assert_eq!(named.name, "My picks");
    }

    #[tokio::test]
    async fn listing_merges_public_templates_once() {
        let (library, _) = library();
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        library.create(owner, draft("own public", true)).await.expect("create");
        library.create(owner, draft("own private", false)).await.expect("create");
        library.create(other, draft("foreign public", true)).await.expect("create");
        library.create(other, draft("foreign private", false)).await.expect("create");

        let own_only = library.list_for_owner(owner, false).await.expect("list");
        assert_eq!(own_only.len(), 2);

        let with_public = library.list_for_owner(owner, true).await.expect("list");
        let names: Vec<&str> = with_public.iter().map(|template| template.name.as_str()).collect();
        assert_eq!(names.len(), 3);
        assert!(names.contains(&"foreign public"));
        assert!(!names.contains(&"foreign private"));

        assert_eq!(library.list_public(DEFAULT_PUBLIC_LIMIT).await.expect("public").len(), 2);
    }
}
