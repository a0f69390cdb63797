//! services/api/src/forum/categories.rs
//!
//! The category taxonomy. Categories may nest under a parent; only direct
//! self-parenting is rejected.

use chrono::Utc;
use forum_core::domain::{Category, Identifier, Role};
use forum_core::ports::ForumStore;
use forum_core::text::category_slug;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::forum::views::{CategoryDetail, CategoryView};
use crate::forum::JOIN_CONCURRENCY;

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
    pub order: Option<i32>,
    pub is_active: Option<bool>,
    pub parent_category: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub order: Option<i32>,
    pub is_active: Option<bool>,
    /// Absent leaves the parent alone; `null` detaches the category.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<Uuid>)]
    pub parent_category: Option<Option<Uuid>>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<Uuid>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Uuid>::deserialize(deserializer).map(Some)
}

fn slug_for(name: &str) -> ApiResult<String> {
    let slug = category_slug(name.trim());
    if slug.trim_matches('-').is_empty() {
        return Err(ApiError::Validation(
            "Category name must contain letters or digits".to_string(),
        ));
    }
    Ok(slug)
}

#[derive(Clone)]
pub struct CategoryRepository {
    store: Arc<dyn ForumStore>,
}

impl CategoryRepository {
    pub fn new(store: Arc<dyn ForumStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, key: &Identifier) -> ApiResult<Category> {
        match key {
            Identifier::ById(id) => self.store.find_category(*id).await?,
            Identifier::BySlug(slug) => self.store.find_category_by_slug(slug).await?,
        }
        .ok_or_else(|| ApiError::NotFound(format!("Category {} not found", key)))
    }

    async fn with_counts(&self, categories: Vec<Category>) -> ApiResult<Vec<CategoryView>> {
        let views: Vec<CategoryView> = stream::iter(categories)
            .map(|category| {
                let store = self.store.clone();
                async move {
                    let count = store.count_topics_in_category(category.id).await?;
                    Ok::<_, ApiError>(CategoryView::new(&category, count))
                }
            })
            .buffered(JOIN_CONCURRENCY)
            .try_collect()
            .await?;
        Ok(views)
    }

    pub async fn list_categories(&self, include_inactive: bool) -> ApiResult<Vec<CategoryView>> {
        let categories = self.store.list_categories(include_inactive).await?;
        self.with_counts(categories).await
    }

    pub async fn get_category(&self, key: &Identifier) -> ApiResult<CategoryDetail> {
        let category = self.resolve(key).await?;
        let topic_count = self.store.count_topics_in_category(category.id).await?;
        let children = self.store.list_child_categories(category.id).await?;
        Ok(CategoryDetail {
            category: CategoryView::new(&category, topic_count),
            subcategories: self.with_counts(children).await?,
        })
    }

    async fn require_parent(&self, parent: Uuid) -> ApiResult<Category> {
        self.store
            .find_category(parent)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Parent category {} not found", parent)))
    }

    pub async fn create_category(&self, auth: &AuthUser, input: NewCategory) -> ApiResult<CategoryView> {
        auth.require_role(Role::Teacher)?;
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(ApiError::Validation("Category name is required".to_string()));
        }
        let slug = slug_for(&name)?;
        if self.store.find_category_by_slug(&slug).await?.is_some() {
            return Err(ApiError::Conflict(
                "A category with this name already exists".to_string(),
            ));
        }
        if let Some(parent) = input.parent_category {
            if self.require_parent(parent).await?.parent_category.is_some() {
                return Err(ApiError::Validation(
                    "Subcategories can only be created under a top-level category".to_string(),
                ));
            }
        }

        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4(),
            name,
            description: input.description,
            slug,
            order: input.order.unwrap_or(0),
            is_active: input.is_active.unwrap_or(true),
            parent_category: input.parent_category,
            created_by: auth.id,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_category(&category).await?;
        info!("Category '{}' created by {}", category.slug, auth.id);
        Ok(CategoryView::new(&category, 0))
    }

    pub async fn update_category(
        &self,
        auth: &AuthUser,
        key: &Identifier,
        update: CategoryUpdate,
    ) -> ApiResult<CategoryView> {
        auth.require_role(Role::Teacher)?;
        let mut category = self.resolve(key).await?;

        if let Some(name) = update.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ApiError::Validation("Category name is required".to_string()));
            }
            if name != category.name {
                let slug = slug_for(&name)?;
                if let Some(existing) = self.store.find_category_by_slug(&slug).await? {
                    if existing.id != category.id {
                        return Err(ApiError::Conflict(
                            "A category with this name already exists".to_string(),
                        ));
                    }
                }
                category.slug = slug;
                category.name = name;
            }
        }
        if update.description.is_some() {
            category.description = update.description;
        }
        if let Some(order) = update.order {
            category.order = order;
        }
        if let Some(is_active) = update.is_active {
            category.is_active = is_active;
        }
        match update.parent_category {
            Some(Some(parent)) if parent == category.id => {
                return Err(ApiError::Validation(
                    "A category cannot be its own parent".to_string(),
                ));
            }
            Some(Some(parent)) => {
                self.require_parent(parent).await?;
                category.parent_category = Some(parent);
            }
            Some(None) => category.parent_category = None,
            None => {}
        }

        category.updated_at = Utc::now();
        self.store.update_category(&category).await?;
        let topic_count = self.store.count_topics_in_category(category.id).await?;
        Ok(CategoryView::new(&category, topic_count))
    }

    pub async fn delete_category(&self, auth: &AuthUser, key: &Identifier) -> ApiResult<()> {
        auth.require_role(Role::Teacher)?;
        let category = self.resolve(key).await?;
        if !self.store.list_child_categories(category.id).await?.is_empty() {
            return Err(ApiError::Conflict(
                "Cannot delete a category that has subcategories".to_string(),
            ));
        }
        if self.store.count_topics_in_category(category.id).await? > 0 {
            return Err(ApiError::Conflict(
                "Cannot delete a category that contains topics".to_string(),
            ));
        }
        self.store.delete_category(category.id).await?;
        info!("Category '{}' deleted by {}", category.slug, auth.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_field_distinguishes_absent_from_null() {
        let absent: CategoryUpdate = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.parent_category, None);
        let cleared: CategoryUpdate = serde_json::from_str(r#"{"parentCategory": null}"#).unwrap();
        assert_eq!(cleared.parent_category, Some(None));
        let id = Uuid::new_v4();
        let set: CategoryUpdate =
            serde_json::from_str(&format!(r#"{{"parentCategory": "{}"}}"#, id)).unwrap();
        assert_eq!(set.parent_category, Some(Some(id)));
    }

    #[test]
    fn names_without_alphanumerics_are_rejected() {
        assert!(slug_for("!!!").is_err());
        assert_eq!(slug_for("General").unwrap(), "general");
    }
}
