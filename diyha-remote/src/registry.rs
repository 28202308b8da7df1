use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::num::NonZeroU64;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::category::Category;
use crate::util::http::{InvalidUrlError, Url};

/// Id the server assigned to this node's record within a category.
///
/// Zero is the server-side "no record" value and is never a valid id.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(NonZeroU64);

impl ResourceId {
    pub fn new(id: u64) -> Option<Self> {
        NonZeroU64::new(id).map(Self)
    }

    pub fn get(&self) -> u64 {
        self.0.get()
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<ResourceId> for u64 {
    fn from(value: ResourceId) -> Self {
        value.get()
    }
}

#[derive(Debug, Error)]
#[error("category {0} is not configured")]
pub struct NotConfiguredError(pub Category);

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("category {0} is not configured")]
    NotConfigured(Category),

    #[error("identity for category {0} is not resolved")]
    UnresolvedIdentity(Category),

    #[error(transparent)]
    InvalidUrl(#[from] InvalidUrlError),
}

impl From<NotConfiguredError> for RegistryError {
    fn from(NotConfiguredError(category): NotConfiguredError) -> Self {
        RegistryError::NotConfigured(category)
    }
}

#[derive(Debug, Clone)]
struct Endpoint {
    base_path: String,
    url: Url,
    resource_id: Option<ResourceId>,
}

/// Public view of one configured category.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct EndpointStatus {
    pub base_path: String,
    pub url: Url,
    pub resource_id: Option<ResourceId>,
}

/// Per-category URLs and resource ids of this node on the server.
///
/// URLs are written at configuration time and ids by the resolver; the
/// lock lets publishers read concurrently once a category is resolved.
#[derive(Debug, Default)]
pub struct EndpointRegistry {
    endpoints: RwLock<BTreeMap<Category, Endpoint>>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every category configured at its default path.
    pub fn with_defaults(server_address: &Url) -> Result<Self, RegistryError> {
        let mut endpoints = BTreeMap::new();
        for category in Category::ALL {
            let base_path = category.default_path();
            let url = server_address.join_path(base_path)?;
            endpoints.insert(
                category,
                Endpoint {
                    base_path: base_path.to_string(),
                    url,
                    resource_id: None,
                },
            );
        }

        Ok(Self {
            endpoints: RwLock::new(endpoints),
        })
    }

    /// Register `category` at `server_address + base_path`.
    ///
    /// Configuring a category again replaces its URL. A resource id that was
    /// already resolved is kept.
    pub async fn configure(
        &self,
        server_address: &Url,
        category: Category,
        base_path: &str,
    ) -> Result<Url, RegistryError> {
        let url = server_address.join_path(base_path)?;

        let mut endpoints = self.endpoints.write().await;
        let resource_id = endpoints.get(&category).and_then(|e| e.resource_id);
        endpoints.insert(
            category,
            Endpoint {
                base_path: base_path.to_string(),
                url: url.clone(),
                resource_id,
            },
        );
        debug!(%category, %url, "configured endpoint");

        Ok(url)
    }

    /// Listing URL of `category`.
    pub async fn url_for(&self, category: Category) -> Result<Url, NotConfiguredError> {
        let endpoints = self.endpoints.read().await;
        endpoints
            .get(&category)
            .map(|e| e.url.clone())
            .ok_or(NotConfiguredError(category))
    }

    /// Detail URL of this node's record in `category`.
    pub async fn detail_url_for(&self, category: Category) -> Result<Url, RegistryError> {
        self.detail_for(category).await.map(|(url, _)| url)
    }

    pub async fn resource_id(&self, category: Category) -> Option<ResourceId> {
        let endpoints = self.endpoints.read().await;
        endpoints.get(&category).and_then(|e| e.resource_id)
    }

    pub async fn categories(&self) -> Vec<Category> {
        self.endpoints.read().await.keys().copied().collect()
    }

    pub async fn snapshot(&self) -> BTreeMap<Category, EndpointStatus> {
        let endpoints = self.endpoints.read().await;
        endpoints
            .iter()
            .map(|(category, e)| {
                (
                    *category,
                    EndpointStatus {
                        base_path: e.base_path.clone(),
                        url: e.url.clone(),
                        resource_id: e.resource_id,
                    },
                )
            })
            .collect()
    }

    /// Detail URL and resource id read under one lock.
    pub(crate) async fn detail_for(
        &self,
        category: Category,
    ) -> Result<(Url, ResourceId), RegistryError> {
        let endpoints = self.endpoints.read().await;
        let endpoint = endpoints
            .get(&category)
            .ok_or(RegistryError::NotConfigured(category))?;
        let id = endpoint
            .resource_id
            .ok_or(RegistryError::UnresolvedIdentity(category))?;
        let url = endpoint.url.join_path(&format!("/{id}"))?;

        Ok((url, id))
    }

    /// Record the resolved id of `category`, returning the previous one.
    pub(crate) async fn bind(
        &self,
        category: Category,
        id: ResourceId,
    ) -> Result<Option<ResourceId>, NotConfiguredError> {
        let mut endpoints = self.endpoints.write().await;
        let endpoint = endpoints
            .get_mut(&category)
            .ok_or(NotConfiguredError(category))?;

        let previous = endpoint.resource_id.replace(id);
        if let Some(previous) = previous
            && previous != id
        {
            warn!(%category, %previous, %id, "resource id changed on the server");
        }

        Ok(previous)
    }
}
