use std::sync::atomic::{AtomicU64, Ordering};

use crate::util::http::ClientError;

/// Network-level outcome of a failed request.
#[derive(Debug)]
pub(crate) enum RequestFailure {
    ConnectionFailed(String),
    Timeout,
    HttpStatus(u16),
}

impl From<ClientError> for RequestFailure {
    fn from(err: ClientError) -> Self {
        if err.is_timeout() {
            return RequestFailure::Timeout;
        }

        match err {
            ClientError::Response(status) => RequestFailure::HttpStatus(status.as_u16()),
            err => RequestFailure::ConnectionFailed(err.to_string()),
        }
    }
}

/// Outcome counts of the state PUTs sent by a publisher.
#[derive(Debug, Clone, Copy)]
pub struct RequestMetrics {
    /// PUTs the server accepted.
    pub success_count: u64,
    /// PUTs rejected with a 4xx/5xx status or lost to a network failure.
    pub error_count: u64,
}

impl RequestMetrics {
    pub fn total_requests(&self) -> u64 {
        self.success_count + self.error_count
    }

    /// Accepted PUTs as a percentage of all PUTs sent, 0.0 before the
    /// first one.
    pub fn success_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            0.0
        } else {
            (self.success_count as f64 / total as f64) * 100.0
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct RequestCounters {
    success_count: AtomicU64,
    error_count: AtomicU64,
}

impl RequestCounters {
    pub fn record_success(&self) {
        self.success_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn metrics(&self) -> RequestMetrics {
        RequestMetrics {
            success_count: self.success_count.load(Ordering::Relaxed),
            error_count: self.error_count.load(Ordering::Relaxed),
        }
    }
}
