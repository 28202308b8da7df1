use std::time::Duration;

use crate::util::http::{Client, Url};

/// Inventory server configuration
#[derive(Clone, Debug)]
pub struct RemoteConfig {
    pub server_address: Url,
    pub request: RequestConfig,
}

impl RemoteConfig {
    /// HTTP client honoring the configured request timeout.
    pub fn client(&self) -> Client {
        Client::new(Some(self.request.timeout))
    }
}

#[derive(Clone, Debug)]
pub struct RequestConfig {
    /// Maximum time to wait for a single HTTP request to complete.
    pub timeout: Duration,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5_000),
        }
    }
}
