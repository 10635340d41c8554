//! Configuration for PAdES signing.

use serde::{Deserialize, Serialize};

use crate::http::HttpConfig;
use crate::signatures::DigestAlgorithm;

/// Default number of bytes reserved on top of the probe signature size.
///
/// Timestamp tokens vary in size between requests, the slack absorbs that.
pub const DEFAULT_SIZE_SLACK: usize = 2048;

/// Signing configuration shared by all handlers created from one builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningConfig {
    /// Digest algorithm used for the CMS message digest and RSA signature.
    pub digest_algorithm: DigestAlgorithm,

    /// Bytes added to the probe signature size when reserving `/Contents`.
    pub size_slack: usize,

    /// HTTP transport settings for CRL, OCSP and timestamp requests.
    pub http: HttpConfig,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SigningConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            digest_algorithm: DigestAlgorithm::Sha256,
            size_slack: DEFAULT_SIZE_SLACK,
            http: HttpConfig::default(),
        }
    }

    /// Set the digest algorithm.
    pub fn with_digest_algorithm(mut self, digest_algorithm: DigestAlgorithm) -> Self {
        self.digest_algorithm = digest_algorithm;
        self
    }

    /// Set the slack reserved on top of the probe signature size.
    pub fn with_size_slack(mut self, size_slack: usize) -> Self {
        self.size_slack = size_slack;
        self
    }

    /// Set the HTTP transport settings.
    pub fn with_http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_config_default() {
        let config = SigningConfig::default();
        assert_eq!(config.digest_algorithm, DigestAlgorithm::Sha256);
        assert_eq!(config.size_slack, 2048);
    }

    #[test]
    fn test_signing_config_builder() {
        let config = SigningConfig::new()
            .with_digest_algorithm(DigestAlgorithm::Sha512)
            .with_size_slack(4096);
        assert_eq!(config.digest_algorithm, DigestAlgorithm::Sha512);
        assert_eq!(config.size_slack, 4096);
    }
}
