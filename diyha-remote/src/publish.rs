use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{Span, field, instrument};

use crate::category::Category;
use crate::registry::{EndpointRegistry, RegistryError};
use crate::request::{RequestCounters, RequestFailure, RequestMetrics};
use crate::util::http::{Client, InvalidUrlError, Url};

/// Current values of one category, as field name to JSON value.
pub type StatePayload = serde_json::Map<String, Value>;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("category {0} is not configured")]
    NotConfigured(Category),

    #[error("identity for category {0} is not resolved")]
    IdentityUnresolved(Category),

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("request timed out")]
    Timeout,

    #[error("server replied with status {0}")]
    HttpStatus(u16),

    #[error(transparent)]
    InvalidUrl(#[from] InvalidUrlError),
}

impl From<RequestFailure> for PublishError {
    fn from(failure: RequestFailure) -> Self {
        match failure {
            RequestFailure::ConnectionFailed(msg) => PublishError::ConnectionFailed(msg),
            RequestFailure::Timeout => PublishError::Timeout,
            RequestFailure::HttpStatus(code) => PublishError::HttpStatus(code),
        }
    }
}

impl From<RegistryError> for PublishError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotConfigured(category) => PublishError::NotConfigured(category),
            RegistryError::UnresolvedIdentity(category) => {
                PublishError::IdentityUnresolved(category)
            }
            RegistryError::InvalidUrl(err) => PublishError::InvalidUrl(err),
        }
    }
}

/// Pushes this node's state to its detail URLs with idempotent PUTs.
///
/// A failed publish is reported and dropped, retrying is up to the caller.
#[derive(Debug)]
pub struct Publisher {
    client: Client,
    registry: Arc<EndpointRegistry>,
    counters: RequestCounters,
}

impl Publisher {
    pub fn new(client: Client, registry: Arc<EndpointRegistry>) -> Self {
        Self {
            client,
            registry,
            counters: RequestCounters::default(),
        }
    }

    /// Stamp `payload` with the resolved id of `category` and PUT it to the
    /// category's detail URL.
    ///
    /// Fails fast, without touching the payload or the network, while the
    /// category identity is unresolved.
    #[instrument(
        name = "publish",
        level = "debug",
        skip(self, payload),
        fields(id = field::Empty, success_rate = field::Empty)
    )]
    pub async fn publish(
        &self,
        category: Category,
        payload: &mut StatePayload,
    ) -> Result<(), PublishError> {
        let (url, id) = self.registry.detail_for(category).await?;
        Span::current().record("id", id.get());

        payload.insert("id".to_string(), Value::from(id.get()));

        let res = self.send(&url, payload).await;
        match res {
            Ok(_) => self.counters.record_success(),
            Err(_) => self.counters.record_failure(),
        }
        Span::current().record("success_rate", self.metrics().success_rate());

        res
    }

    /// Returns current request metrics including success and error counts.
    pub fn metrics(&self) -> RequestMetrics {
        self.counters.metrics()
    }

    #[instrument(level = "debug", skip_all, fields(url = %url), err(level = "debug"))]
    async fn send(&self, url: &Url, payload: &StatePayload) -> Result<(), PublishError> {
        // The response body carries nothing we need
        self.client
            .put(url, payload)
            .await
            .map_err(RequestFailure::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ResourceId;
    use crate::test_support::{capture_logs, closed_port_url, silent_server_url};
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::time::Duration;

    fn payload(value: Value) -> StatePayload {
        match value {
            Value::Object(map) => map,
            _ => panic!("payload must be an object"),
        }
    }

    async fn publisher_for(server_url: &str, resolved: Option<u64>) -> Publisher {
        let server = Url::parse(server_url).unwrap();
        let registry = Arc::new(EndpointRegistry::with_defaults(&server).unwrap());
        if let Some(id) = resolved {
            for category in Category::ALL {
                registry
                    .bind(category, ResourceId::new(id).unwrap())
                    .await
                    .unwrap();
            }
        }
        Publisher::new(Client::default(), registry)
    }

    #[tokio::test]
    async fn test_unresolved_identity_fails_without_a_request() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let publisher = publisher_for(&server.url(), None).await;
        let mut info = payload(json!({"cpu": 12.5}));
        let err = publisher
            .publish(Category::Status, &mut info)
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::IdentityUnresolved(Category::Status)));
        assert_eq!(info, payload(json!({"cpu": 12.5})));
        assert_eq!(publisher.metrics().total_requests(), 0);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unconfigured_category() {
        let publisher = Publisher::new(Client::default(), Arc::new(EndpointRegistry::new()));
        let err = publisher
            .publish(Category::Control, &mut StatePayload::new())
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::NotConfigured(Category::Control)));
    }

    #[tokio::test]
    async fn test_puts_the_stamped_payload_to_the_detail_url() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/server/status/3")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({
                "id": 3,
                "cpu": 12.5,
                "disk": {"free": 1024}
            })))
            .with_status(200)
            .with_body("not inspected")
            .create_async()
            .await;

        let publisher = publisher_for(&server.url(), Some(3)).await;
        let mut info = payload(json!({"cpu": 12.5, "disk": {"free": 1024}}));
        publisher
            .publish(Category::Status, &mut info)
            .await
            .unwrap();

        // The caller's payload carries the injected id
        assert_eq!(info.get("id"), Some(&json!(3)));
        assert_eq!(publisher.metrics().success_count, 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_overwrites_a_caller_supplied_id() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/motion/8")
            .match_body(Matcher::Json(json!({"id": 8, "motion": true})))
            .with_status(204)
            .create_async()
            .await;

        let publisher = publisher_for(&server.url(), Some(8)).await;
        let mut info = payload(json!({"id": 1, "motion": true}));
        publisher
            .publish(Category::Motion, &mut info)
            .await
            .unwrap();

        assert_eq!(info.get("id"), Some(&json!(8)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_is_returned() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/server/status/3")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;

        let publisher = publisher_for(&server.url(), Some(3)).await;
        let err = publisher
            .publish(Category::Status, &mut payload(json!({"cpu": 99.0})))
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::HttpStatus(500)));
        let metrics = publisher.metrics();
        assert_eq!(metrics.error_count, 1);
        assert_eq!(metrics.success_rate(), 0.0);

        // Dropped, not retried
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_is_logged_at_debug() {
        let mut server = Server::new_async().await;
        server
            .mock("PUT", "/server/status/3")
            .with_status(500)
            .create_async()
            .await;

        let publisher = publisher_for(&server.url(), Some(3)).await;
        let (logs, _guard) = capture_logs();
        let res = publisher
            .publish(Category::Status, &mut payload(json!({"cpu": 99.0})))
            .await;

        assert!(res.is_err());
        let logs = logs.contents();
        assert!(
            logs.lines().any(|line| line.contains("DEBUG")
                && line.contains("error=server replied with status 500")),
            "missing debug event in: {logs}"
        );
    }

    #[tokio::test]
    async fn test_not_modified_is_not_an_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/motion/5")
            .match_body(Matcher::Json(json!({"id": 5, "motion": false})))
            .with_status(304)
            .create_async()
            .await;

        let publisher = publisher_for(&server.url(), Some(5)).await;
        let res = publisher
            .publish(Category::Motion, &mut payload(json!({"motion": false})))
            .await;

        assert!(res.is_ok());
        assert_eq!(publisher.metrics().success_count, 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_error_is_returned() {
        let mut server = Server::new_async().await;
        server
            .mock("PUT", "/environment/4")
            .with_status(404)
            .create_async()
            .await;

        let publisher = publisher_for(&server.url(), Some(4)).await;
        let err = publisher
            .publish(Category::Environment, &mut payload(json!({"celsius": 21})))
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::HttpStatus(404)));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let publisher = publisher_for(&closed_port_url().await, Some(2)).await;
        let err = publisher
            .publish(Category::Asset, &mut StatePayload::new())
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::ConnectionFailed(_)), "{err}");
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = Url::parse(&silent_server_url().await).unwrap();
        let registry = Arc::new(EndpointRegistry::with_defaults(&server).unwrap());
        registry
            .bind(Category::Control, ResourceId::new(6).unwrap())
            .await
            .unwrap();
        let client = Client::new(Some(Duration::from_millis(200)));
        let publisher = Publisher::new(client, registry);

        let err = publisher
            .publish(Category::Control, &mut payload(json!({"mode": "away"})))
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::Timeout), "{err}");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_publishes_share_the_registry() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/motion/5")
            .with_status(200)
            .expect(8)
            .create_async()
            .await;

        let publisher = Arc::new(publisher_for(&server.url(), Some(5)).await);
        let mut tasks = Vec::new();
        for i in 0..8 {
            let publisher = Arc::clone(&publisher);
            tasks.push(tokio::spawn(async move {
                let mut info = payload(json!({"motion": i % 2 == 0}));
                publisher.publish(Category::Motion, &mut info).await
            }));
        }

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(publisher.metrics().success_count, 8);
        mock.assert_async().await;
    }
}
