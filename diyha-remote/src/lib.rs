/*
This crate is home to everything related to the inventory server that
tracks the node we're running on.

It discovers the resource ids the server assigned to this node, one per
category, and publishes the node's current state to the per-resource
detail URLs built from them.
*/

mod category;
mod config;
mod publish;
mod registry;
mod request;
mod resolve;

#[cfg(test)]
mod test_support;

pub use category::{Category, ParseCategoryError};
pub use config::{RemoteConfig, RequestConfig};
pub use publish::{PublishError, Publisher, StatePayload};
pub use registry::{
    EndpointRegistry, EndpointStatus, NotConfiguredError, RegistryError, ResourceId,
};
pub use request::RequestMetrics;
pub use resolve::{DirectoryEntry, ResolutionError, Resolver};

use diyha_util as util;
