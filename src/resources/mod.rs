//! Resource feature: addressable, subscribable data exposed to the peer.
//!
//! The server answers `resources/list`, `resources/read`,
//! `resources/templates/list`, `resources/subscribe` and
//! `resources/unsubscribe` by delegating to a [`ResourceProvider`]. Hosts
//! supply their own provider (a database-backed one, typically) or use the
//! bundled [`InMemoryResourceProvider`].
//!
//! Listing is paginated: the cursor is the URI of the last resource on the
//! previous page, and the next page resumes immediately after it. A page
//! carries a `nextCursor` only when more resources remain.

pub mod memory;
pub mod types;

use async_trait::async_trait;

pub use memory::InMemoryResourceProvider;
pub use types::{ResourceContent, ResourceItem, ResourceTemplate};

/// One page of resources from [`ResourceProvider::list_resources`].
#[derive(Debug, Clone, Default)]
pub struct ResourcePage {
    /// The resources on this page, in the provider's stable order.
    pub resources: Vec<ResourceItem>,
    /// Cursor for the next page; `None` on the last page.
    pub next_cursor: Option<String>,
}

/// Supplies resources to the server.
///
/// Implementations are free to hit databases or other backends, so every
/// operation is async and fallible. Provider failures are reported to the
/// peer as internal errors; a missing resource is signalled separately by
/// the handlers via [`resource_exists`](Self::resource_exists), which maps
/// to the dedicated not-found error code.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Lists up to `limit` resources, resuming after `cursor` when given.
    ///
    /// An unknown cursor yields an empty page rather than an error.
    ///
    /// # Errors
    ///
    /// Returns any backend failure.
    async fn list_resources(
        &self,
        cursor: Option<&str>,
        limit: usize,
    ) -> anyhow::Result<ResourcePage>;

    /// Reads the contents of one resource.
    ///
    /// # Errors
    ///
    /// Fails when the resource does not exist or the backend cannot
    /// produce its contents.
    async fn read_resource(&self, uri: &str) -> anyhow::Result<Vec<ResourceContent>>;

    /// Lists all resource templates.
    ///
    /// # Errors
    ///
    /// Returns any backend failure.
    async fn list_resource_templates(&self) -> anyhow::Result<Vec<ResourceTemplate>>;

    /// Whether a resource with this URI exists.
    ///
    /// # Errors
    ///
    /// Returns any backend failure.
    async fn resource_exists(&self, uri: &str) -> anyhow::Result<bool>;
}
