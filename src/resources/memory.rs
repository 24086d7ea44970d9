//! In-memory resource provider.

use anyhow::anyhow;
use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::RwLock;

use crate::resources::types::{ResourceContent, ResourceItem, ResourceTemplate};
use crate::resources::{ResourcePage, ResourceProvider};

/// A [`ResourceProvider`] backed by maps in memory.
///
/// Resources and templates keep their insertion order, which makes listing
/// (and therefore pagination) stable. Adding a resource under an existing
/// URI replaces it in place without changing its position.
#[derive(Default)]
pub struct InMemoryResourceProvider {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    resources: IndexMap<String, ResourceItem>,
    contents: IndexMap<String, ResourceContent>,
    templates: IndexMap<String, ResourceTemplate>,
}

impl InMemoryResourceProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resource together with its content, keyed by the resource
    /// URI.
    pub async fn add_resource(&self, resource: ResourceItem, content: ResourceContent) {
        let mut inner = self.inner.write().await;
        let uri = resource.uri.clone();
        inner.resources.insert(uri.clone(), resource);
        inner.contents.insert(uri, content);
    }

    /// Adds a resource template, keyed by its URI template.
    pub async fn add_template(&self, template: ResourceTemplate) {
        let mut inner = self.inner.write().await;
        inner
            .templates
            .insert(template.uri_template.clone(), template);
    }

    /// Removes a resource and its content. Returns whether it existed.
    pub async fn remove_resource(&self, uri: &str) -> bool {
        let mut inner = self.inner.write().await;
        inner.contents.shift_remove(uri);
        inner.resources.shift_remove(uri).is_some()
    }

    /// Number of resources held.
    pub async fn resource_count(&self) -> usize {
        self.inner.read().await.resources.len()
    }
}

#[async_trait]
impl ResourceProvider for InMemoryResourceProvider {
    async fn list_resources(
        &self,
        cursor: Option<&str>,
        limit: usize,
    ) -> anyhow::Result<ResourcePage> {
        let inner = self.inner.read().await;
        let start = match cursor {
            // Resume after the cursor URI; an unknown cursor reads as
            // past-the-end and yields an empty page.
            Some(cursor) => inner
                .resources
                .get_index_of(cursor)
                .map_or(inner.resources.len(), |index| index + 1),
            None => 0,
        };
        let resources: Vec<ResourceItem> = inner
            .resources
            .values()
            .skip(start)
            .take(limit)
            .cloned()
            .collect();
        let has_more = start + resources.len() < inner.resources.len();
        let next_cursor = if has_more {
            resources.last().map(|item| item.uri.clone())
        } else {
            None
        };
        Ok(ResourcePage {
            resources,
            next_cursor,
        })
    }

    async fn read_resource(&self, uri: &str) -> anyhow::Result<Vec<ResourceContent>> {
        let inner = self.inner.read().await;
        inner
            .contents
            .get(uri)
            .cloned()
            .map(|content| vec![content])
            .ok_or_else(|| anyhow!("Resource not found: {uri}"))
    }

    async fn list_resource_templates(&self) -> anyhow::Result<Vec<ResourceTemplate>> {
        let inner = self.inner.read().await;
        Ok(inner.templates.values().cloned().collect())
    }

    async fn resource_exists(&self, uri: &str) -> anyhow::Result<bool> {
        Ok(self.inner.read().await.resources.contains_key(uri))
    }
}

impl std::fmt::Debug for InMemoryResourceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryResourceProvider")
            .finish_non_exhaustive()
    }
}
