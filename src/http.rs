//! Blocking HTTP transport for revocation and timestamp exchanges.
//!
//! CRLs are fetched with GET, OCSP requests and RFC3161 timestamp queries are
//! POSTed. Every request is issued synchronously with an explicit timeout; the
//! [`HttpTransport`] trait lets callers inject their own transport (for
//! cancellation, proxies, or tests).

use std::io::Read;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Content type of an OCSP request body.
pub const OCSP_REQUEST_CONTENT_TYPE: &str = "application/ocsp-request";

/// Content type of an RFC3161 timestamp query body.
pub const TIMESTAMP_QUERY_CONTENT_TYPE: &str = "application/timestamp-query";

/// HTTP transport configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Timeout applied to each request (connect + read)
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// User-Agent header
    pub user_agent: String,
    /// Maximum accepted response body size in bytes
    pub max_response_size: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("pdf_pades/", env!("CARGO_PKG_VERSION")).to_string(),
            max_response_size: 10 * 1024 * 1024,
        }
    }
}

impl HttpConfig {
    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the maximum response body size.
    pub fn with_max_response_size(mut self, max_response_size: u64) -> Self {
        self.max_response_size = max_response_size;
        self
    }
}

/// A blocking HTTP client capable of the two exchanges PAdES needs.
pub trait HttpTransport: Send + Sync {
    /// Issue a GET request and return the full response body.
    fn get(&self, url: &str) -> Result<Vec<u8>>;

    /// POST `body` with the given content type and return the full response body.
    fn post(&self, url: &str, content_type: &str, body: &[u8]) -> Result<Vec<u8>>;
}

/// Default [`HttpTransport`] backed by `ureq`.
pub struct UreqTransport {
    agent: ureq::Agent,
    max_response_size: u64,
}

impl UreqTransport {
    /// Create a transport from the given configuration.
    pub fn new(config: &HttpConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build();
        Self {
            agent,
            max_response_size: config.max_response_size,
        }
    }

    fn read_body(&self, url: &str, response: ureq::Response) -> Result<Vec<u8>> {
        let status = response.status();
        if !(200..300).contains(&status) {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status,
            });
        }

        read_limited(url, response.into_reader(), self.max_response_size)
    }
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqTransport")
            .field("max_response_size", &self.max_response_size)
            .finish()
    }
}

impl HttpTransport for UreqTransport {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        log::debug!("GET {}", url);
        let response = self.agent.get(url).call().map_err(|e| map_ureq_error(url, e))?;
        self.read_body(url, response)
    }

    fn post(&self, url: &str, content_type: &str, body: &[u8]) -> Result<Vec<u8>> {
        log::debug!("POST {} ({}, {} bytes)", url, content_type, body.len());
        let response = self
            .agent
            .post(url)
            .set("Content-Type", content_type)
            .send_bytes(body)
            .map_err(|e| map_ureq_error(url, e))?;
        self.read_body(url, response)
    }
}

/// Read at most `limit` bytes; a longer body is an error, never truncated.
fn read_limited(url: &str, reader: impl Read, limit: u64) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    reader
        .take(limit.saturating_add(1))
        .read_to_end(&mut body)
        .map_err(|e| Error::Http {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    if body.len() as u64 > limit {
        return Err(Error::ResponseTooLarge {
            url: url.to_string(),
            limit,
        });
    }
    Ok(body)
}

fn map_ureq_error(url: &str, err: ureq::Error) -> Error {
    match err {
        ureq::Error::Status(status, _) => Error::HttpStatus {
            url: url.to_string(),
            status,
        },
        // ureq::Error is large; keep only its description
        other => Error::Http {
            url: url.to_string(),
            reason: other.to_string(),
        },
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}
