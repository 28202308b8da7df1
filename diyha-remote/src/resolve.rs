use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{Span, debug, field, instrument};

use crate::category::Category;
use crate::registry::{EndpointRegistry, NotConfiguredError, ResourceId};
use crate::request::RequestFailure;
use crate::util::http::{Client, Url};
use crate::util::types::Hostname;

#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("category {0} is not configured")]
    NotConfigured(Category),

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("request timed out")]
    Timeout,

    #[error("server replied with status {0}")]
    HttpStatus(u16),

    #[error("bad directory response: {0}")]
    BadResponse(String),

    #[error("no {category} entry named '{name}' on the server")]
    NotFound { category: Category, name: Hostname },
}

impl From<RequestFailure> for ResolutionError {
    fn from(failure: RequestFailure) -> Self {
        match failure {
            RequestFailure::ConnectionFailed(msg) => ResolutionError::ConnectionFailed(msg),
            RequestFailure::Timeout => ResolutionError::Timeout,
            RequestFailure::HttpStatus(code) => ResolutionError::HttpStatus(code),
        }
    }
}

impl From<NotConfiguredError> for ResolutionError {
    fn from(NotConfiguredError(category): NotConfiguredError) -> Self {
        ResolutionError::NotConfigured(category)
    }
}

/// One record of a category listing. Other fields the server sends are
/// ignored.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub id: u64,
}

/// Finds the records this node owns on the server by matching its
/// hostname against each category listing.
#[derive(Debug, Clone)]
pub struct Resolver {
    client: Client,
    registry: Arc<EndpointRegistry>,
    identity: Hostname,
}

impl Resolver {
    pub fn new(client: Client, registry: Arc<EndpointRegistry>, identity: Hostname) -> Self {
        Self {
            client,
            registry,
            identity,
        }
    }

    pub fn identity(&self) -> &Hostname {
        &self.identity
    }

    /// Look up this node in the `category` listing and bind the matching id.
    ///
    /// The first entry whose name equals the local identity wins. On any
    /// failure the registry keeps whatever id it had before the call; on
    /// success a previously resolved id is overwritten by the fresh match.
    #[instrument(
        name = "resolve",
        level = "debug",
        skip(self),
        fields(identity = %self.identity, id = field::Empty)
    )]
    pub async fn resolve(&self, category: Category) -> Result<ResourceId, ResolutionError> {
        // A missing category is a wiring mistake, surface it as is
        let url = self.registry.url_for(category).await?;

        let id = self.lookup(category, &url).await?;
        self.registry.bind(category, id).await?;

        Span::current().record("id", id.get());
        Ok(id)
    }

    /// Resolve every configured category in turn.
    pub async fn resolve_all(&self) -> Vec<(Category, Result<ResourceId, ResolutionError>)> {
        let mut results = Vec::new();
        for category in self.registry.categories().await {
            results.push((category, self.resolve(category).await));
        }
        results
    }

    #[instrument(level = "debug", skip_all, fields(url = %url), err(level = "debug"))]
    async fn lookup(&self, category: Category, url: &Url) -> Result<ResourceId, ResolutionError> {
        let entries = self.fetch_directory(url).await?;
        debug!("server listed {} entries", entries.len());

        let entry = entries
            .into_iter()
            .find(|entry| entry.name == *self.identity)
            .ok_or_else(|| ResolutionError::NotFound {
                category,
                name: self.identity.clone(),
            })?;

        ResourceId::new(entry.id).ok_or_else(|| {
            ResolutionError::BadResponse(format!("entry '{}' has the reserved id 0", entry.name))
        })
    }

    async fn fetch_directory(&self, url: &Url) -> Result<Vec<DirectoryEntry>, ResolutionError> {
        let response = self.client.get(url).await.map_err(RequestFailure::from)?;
        let body = response.text().await.map_err(RequestFailure::from)?;

        serde_json::from_str(&body).map_err(|e| ResolutionError::BadResponse(e.to_string()))
    }
}
