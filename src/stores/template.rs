use super::{Resettable, StoreStatus, Tracked, reject_locally, run_tracked};
use crate::api::ApiClient;
use crate::services;
use crate::types::{
    ProjectId, Result, Template, TemplateApplication, TemplateDraft, TemplateId, TemplateUpdate,
};
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct TemplateState {
    pub templates: Vec<Template>,
    pub selected_template: Option<Template>,
    pub categories: Vec<String>,
    pub status: StoreStatus,
}

impl TemplateState {
    pub fn loading(&self) -> bool {
        self.status.loading()
    }

    pub fn error(&self) -> Option<&str> {
        self.status.error()
    }

    /// Templates in one category
    pub fn by_category(&self, category: &str) -> Vec<Template> {
        self.templates
            .iter()
            .filter(|t| t.category == category)
            .cloned()
            .collect()
    }

    /// Most used templates first, at most `limit`. Ties keep list order.
    pub fn popular(&self, limit: usize) -> Vec<Template> {
        let mut sorted = self.templates.clone();
        sorted.sort_by(|a, b| b.usage_count.cmp(&a.usage_count));
        sorted.truncate(limit);
        sorted
    }
}

impl Tracked for TemplateState {
    fn status(&self) -> &StoreStatus {
        &self.status
    }
    fn status_mut(&mut self) -> &mut StoreStatus {
        &mut self.status
    }
}

/// Test-case template library
#[derive(Clone)]
pub struct TemplateStore {
    client: ApiClient,
    state: Arc<RwLock<TemplateState>>,
}

impl TemplateStore {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            state: Arc::new(RwLock::new(TemplateState::default())),
        }
    }

    pub fn snapshot(&self) -> TemplateState {
        self.state.read().clone()
    }

    pub fn templates(&self) -> Vec<Template> {
        self.state.read().templates.clone()
    }

    pub fn selected_template(&self) -> Option<Template> {
        self.state.read().selected_template.clone()
    }

    pub fn templates_by_category(&self, category: &str) -> Vec<Template> {
        self.state.read().by_category(category)
    }

    pub fn popular_templates(&self, limit: usize) -> Vec<Template> {
        self.state.read().popular(limit)
    }

    pub(crate) fn resetter(&self) -> Arc<dyn Resettable> {
        self.state.clone()
    }

    pub async fn fetch_templates(&self, category: Option<&str>) -> Result<Vec<Template>> {
        let client = self.client.clone();
        let category = category.map(str::to_string);
        let work = async move {
            Ok(services::templates::list(&client, category.as_deref())
                .await?
                .into_data())
        };
        run_tracked(&self.state, "fetch_templates", work, replace_list).await
    }

    pub async fn fetch_template(&self, id: TemplateId) -> Result<Template> {
        let client = self.client.clone();
        let work = async move { Ok(services::templates::get(&client, id).await?.into_data()) };
        run_tracked(&self.state, "fetch_template", work, |s, template: Template| {
            s.selected_template = Some(template.clone());
            template
        })
        .await
    }

    pub async fn create_template(&self, draft: TemplateDraft) -> Result<Template> {
        if draft.name.trim().is_empty() {
            return Err(reject_locally(&self.state, "Template name is required"));
        }
        let client = self.client.clone();
        let work = async move { Ok(services::templates::create(&client, &draft).await?.into_data()) };
        run_tracked(&self.state, "create_template", work, |s, template: Template| {
            s.templates.push(template.clone());
            template
        })
        .await
    }

    pub async fn update_template(&self, id: TemplateId, update: TemplateUpdate) -> Result<Template> {
        let client = self.client.clone();
        let work = async move {
            Ok(services::templates::update(&client, id, &update)
                .await?
                .into_data())
        };
        run_tracked(&self.state, "update_template", work, |s, template: Template| {
            if let Some(slot) = s.templates.iter_mut().find(|t| t.id == id) {
                *slot = template.clone();
            }
            if s.selected_template.as_ref().is_some_and(|t| t.id == id) {
                s.selected_template = Some(template.clone());
            }
            template
        })
        .await
    }

    pub async fn delete_template(&self, id: TemplateId) -> Result<()> {
        let client = self.client.clone();
        let work = async move {
            services::templates::delete(&client, id).await?;
            Ok(())
        };
        run_tracked(&self.state, "delete_template", work, |s, ()| {
            s.templates.retain(|t| t.id != id);
            if s.selected_template.as_ref().is_some_and(|t| t.id == id) {
                s.selected_template = None;
            }
        })
        .await
    }

    /// Apply a template to a project and bump its local usage count.
    ///
    /// The project's cached suites are left alone here; use
    /// [`AppContext::apply_template`](crate::AppContext::apply_template) to
    /// drop them too.
    pub async fn apply_template(&self, id: TemplateId, project_id: ProjectId) -> Result<TemplateApplication> {
        let client = self.client.clone();
        let work = async move {
            Ok(services::templates::apply(&client, id, project_id)
                .await?
                .into_data())
        };
        run_tracked(&self.state, "apply_template", work, |s, applied: TemplateApplication| {
            for template in s.templates.iter_mut().filter(|t| t.id == id) {
                template.usage_count += 1;
            }
            if let Some(selected) = s.selected_template.as_mut().filter(|t| t.id == id) {
                selected.usage_count += 1;
            }
            applied
        })
        .await
    }

    pub async fn search_templates(&self, query: &str, category: Option<&str>) -> Result<Vec<Template>> {
        let query = query.trim().to_string();
        if query.is_empty() {
            return Err(reject_locally(&self.state, "Search query is required"));
        }
        let client = self.client.clone();
        let category = category.map(str::to_string);
        let work = async move {
            Ok(services::templates::search(&client, &query, category.as_deref())
                .await?
                .into_data())
        };
        run_tracked(&self.state, "search_templates", work, replace_list).await
    }

    pub async fn fetch_categories(&self) -> Result<Vec<String>> {
        let client = self.client.clone();
        let work = async move { Ok(services::templates::categories(&client).await?.into_data()) };
        run_tracked(&self.state, "fetch_categories", work, |s, categories: Vec<String>| {
            s.categories = categories.clone();
            categories
        })
        .await
    }

    pub fn clear_selected_template(&self) {
        self.state.write().selected_template = None;
    }

    pub fn clear_error(&self) {
        self.state.write().status.clear_error();
    }
}

fn replace_list(state: &mut TemplateState, templates: Vec<Template>) -> Vec<Template> {
    state.templates = templates.clone();
    templates
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn template(id: TemplateId, category: &str, usage_count: u64) -> Template {
        serde_json::from_value(json!({
            "id": id,
            "name": format!("template {}", id),
            "category": category,
            "usage_count": usage_count
        }))
        .unwrap()
    }

    #[test]
    fn test_popular_sorted_and_capped() {
        let state = TemplateState {
            templates: vec![
                template(1, "functional", 3),
                template(2, "security", 10),
                template(3, "functional", 7),
                template(4, "performance", 7),
            ],
            ..Default::default()
        };

        let ids: Vec<_> = state.popular(3).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 3, 4]);
        assert_eq!(state.popular(10).len(), 4);
        assert!(state.popular(0).is_empty());
    }

    #[test]
    fn test_by_category() {
        let state = TemplateState {
            templates: vec![template(1, "functional", 0), template(2, "security", 0)],
            ..Default::default()
        };
        assert_eq!(state.by_category("security").len(), 1);
        assert!(state.by_category("api").is_empty());
    }
}
