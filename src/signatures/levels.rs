//! PAdES conformance level builders (ETSI TS 103 172).
//!
//! Each level lists the inputs it requires; `build()` checks them in order and
//! fails with [`Error::MissingField`] naming the first one missing.
//!
//! | Level | Adds |
//! |-------|------|
//! | B     | private key, certificate, CA certificate |
//! | T     | signature timestamp server |
//! | LT    | CRL distribution points and OCSP servers |
//! | LTA   | document timestamp server |

use std::sync::Arc;

use rsa::RsaPrivateKey;
use x509_cert::Certificate;

use super::doc_timestamp::DocTimestampHandler;
use super::pades::{PadesConfig, PadesHandler};
use super::revocation::RevocationCollector;
use super::signer::CadesSigner;
use super::timestamp::TimestampClient;
use super::types::DigestAlgorithm;
use crate::config::SigningConfig;
use crate::error::{Error, Result};
use crate::http::{HttpTransport, UreqTransport};

fn require<T>(value: Option<T>, field: &'static str) -> Result<T> {
    value.ok_or(Error::MissingField(field))
}

fn require_url(value: Option<String>, field: &'static str) -> Result<String> {
    match value {
        Some(url) if !url.is_empty() => Ok(url),
        _ => Err(Error::MissingField(field)),
    }
}

fn require_list(values: Vec<String>, field: &'static str) -> Result<Vec<String>> {
    if values.is_empty() {
        return Err(Error::MissingField(field));
    }
    Ok(values)
}

struct HandlerParts {
    private_key: RsaPrivateKey,
    certificate: Certificate,
    ca_certificate: Certificate,
    timestamp_server_url: Option<String>,
    crl_distribution_points: Vec<String>,
    ocsp_servers: Vec<String>,
    config: SigningConfig,
    transport: Arc<dyn HttpTransport>,
}

fn resolve(
    config: Option<SigningConfig>,
    transport: Option<Arc<dyn HttpTransport>>,
) -> (SigningConfig, Arc<dyn HttpTransport>) {
    let config = config.unwrap_or_default();
    let transport = transport.unwrap_or_else(|| Arc::new(UreqTransport::new(&config.http)));
    (config, transport)
}

fn make_handler(parts: HandlerParts) -> Result<PadesHandler> {
    let mut signer = CadesSigner::new(parts.private_key, parts.certificate, Some(parts.ca_certificate))?
        .with_digest_algorithm(parts.config.digest_algorithm)
        .with_size_slack(parts.config.size_slack);
    if let Some(url) = parts.timestamp_server_url {
        signer = signer.with_timestamp(TimestampClient::new(url, parts.transport.clone()));
    }

    let revocation =
        RevocationCollector::new(parts.transport, parts.crl_distribution_points, parts.ocsp_servers);
    Ok(PadesHandler::new(Arc::new(PadesConfig::new(signer, revocation, parts.config))))
}

/// PAdES B-Level: basic CAdES signature.
#[derive(Clone, Default)]
pub struct PadesLevelB {
    /// Signer's RSA private key
    pub private_key: Option<RsaPrivateKey>,
    /// Signer's certificate
    pub certificate: Option<Certificate>,
    /// Issuer of the signer's certificate
    pub ca_certificate: Option<Certificate>,
    /// Signing settings; defaults apply when unset
    pub config: Option<SigningConfig>,
    /// HTTP transport; a `ureq` transport is created when unset
    pub transport: Option<Arc<dyn HttpTransport>>,
}

impl PadesLevelB {
    /// Use the given signing settings.
    pub fn with_config(mut self, config: SigningConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use the given HTTP transport.
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the handler.
    pub fn build(self) -> Result<PadesHandler> {
        let private_key = require(self.private_key, "PrivateKey")?;
        let certificate = require(self.certificate, "Certificate")?;
        let ca_certificate = require(self.ca_certificate, "CaCert")?;
        let (config, transport) = resolve(self.config, self.transport);

        log::debug!("Building PAdES B-Level handler");
        make_handler(HandlerParts {
            private_key,
            certificate,
            ca_certificate,
            timestamp_server_url: None,
            crl_distribution_points: Vec::new(),
            ocsp_servers: Vec::new(),
            config,
            transport,
        })
    }
}

/// PAdES T-Level: B-Level plus a signature timestamp.
#[derive(Clone, Default)]
pub struct PadesLevelT {
    /// Signer's RSA private key
    pub private_key: Option<RsaPrivateKey>,
    /// Signer's certificate
    pub certificate: Option<Certificate>,
    /// Issuer of the signer's certificate
    pub ca_certificate: Option<Certificate>,
    /// TSA for the signature timestamp
    pub certificate_timestamp_server_url: Option<String>,
    /// Signing settings; defaults apply when unset
    pub config: Option<SigningConfig>,
    /// HTTP transport; a `ureq` transport is created when unset
    pub transport: Option<Arc<dyn HttpTransport>>,
}

impl PadesLevelT {
    /// Use the given signing settings.
    pub fn with_config(mut self, config: SigningConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use the given HTTP transport.
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the handler.
    pub fn build(self) -> Result<PadesHandler> {
        let private_key = require(self.private_key, "PrivateKey")?;
        let certificate = require(self.certificate, "Certificate")?;
        let ca_certificate = require(self.ca_certificate, "CaCert")?;
        let timestamp_url =
            require_url(self.certificate_timestamp_server_url, "CertificateTimestampServerURL")?;
        let (config, transport) = resolve(self.config, self.transport);

        log::debug!("Building PAdES T-Level handler, TSA {}", timestamp_url);
        make_handler(HandlerParts {
            private_key,
            certificate,
            ca_certificate,
            timestamp_server_url: Some(timestamp_url),
            crl_distribution_points: Vec::new(),
            ocsp_servers: Vec::new(),
            config,
            transport,
        })
    }
}

/// PAdES LT-Level: T-Level plus revocation evidence in the DSS.
#[derive(Clone, Default)]
pub struct PadesLevelLT {
    /// Signer's RSA private key
    pub private_key: Option<RsaPrivateKey>,
    /// Signer's certificate
    pub certificate: Option<Certificate>,
    /// Issuer of the signer's certificate
    pub ca_certificate: Option<Certificate>,
    /// TSA for the signature timestamp
    pub certificate_timestamp_server_url: Option<String>,
    /// CRL URLs fetched with GET
    pub crl_distribution_points: Vec<String>,
    /// OCSP responder URLs
    pub ocsp_servers: Vec<String>,
    /// Signing settings; defaults apply when unset
    pub config: Option<SigningConfig>,
    /// HTTP transport; a `ureq` transport is created when unset
    pub transport: Option<Arc<dyn HttpTransport>>,
}

impl PadesLevelLT {
    /// Use the given signing settings.
    pub fn with_config(mut self, config: SigningConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use the given HTTP transport.
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the handler.
    pub fn build(self) -> Result<PadesHandler> {
        let private_key = require(self.private_key, "PrivateKey")?;
        let certificate = require(self.certificate, "Certificate")?;
        let ca_certificate = require(self.ca_certificate, "CaCert")?;
        let timestamp_url =
            require_url(self.certificate_timestamp_server_url, "CertificateTimestampServerURL")?;
        let crl_distribution_points = require_list(self.crl_distribution_points, "CLRDistributionPoints")?;
        let ocsp_servers = require_list(self.ocsp_servers, "OCSPServers")?;
        let (config, transport) = resolve(self.config, self.transport);

        log::debug!(
            "Building PAdES LT-Level handler, {} CRL and {} OCSP endpoints",
            crl_distribution_points.len(),
            ocsp_servers.len()
        );
        make_handler(HandlerParts {
            private_key,
            certificate,
            ca_certificate,
            timestamp_server_url: Some(timestamp_url),
            crl_distribution_points,
            ocsp_servers,
            config,
            transport,
        })
    }
}

/// PAdES LTA-Level: LT-Level plus a document timestamp.
///
/// `build` returns the signature handler and a second handler that the
/// caller applies as an extra signature over the signed document.
#[derive(Clone, Default)]
pub struct PadesLevelLTA {
    /// Signer's RSA private key
    pub private_key: Option<RsaPrivateKey>,
    /// Signer's certificate
    pub certificate: Option<Certificate>,
    /// Issuer of the signer's certificate
    pub ca_certificate: Option<Certificate>,
    /// TSA for the signature timestamp
    pub certificate_timestamp_server_url: Option<String>,
    /// CRL URLs fetched with GET
    pub crl_distribution_points: Vec<String>,
    /// OCSP responder URLs
    pub ocsp_servers: Vec<String>,
    /// TSA for the document timestamp
    pub timestamp_server_url: Option<String>,
    /// Signing settings; defaults apply when unset
    pub config: Option<SigningConfig>,
    /// HTTP transport; a `ureq` transport is created when unset
    pub transport: Option<Arc<dyn HttpTransport>>,
}

impl PadesLevelLTA {
    /// Use the given signing settings.
    pub fn with_config(mut self, config: SigningConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use the given HTTP transport.
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the signature handler and the document timestamp handler.
    pub fn build(self) -> Result<(PadesHandler, DocTimestampHandler)> {
        let private_key = require(self.private_key, "PrivateKey")?;
        let certificate = require(self.certificate, "Certificate")?;
        let ca_certificate = require(self.ca_certificate, "CaCert")?;
        let timestamp_url =
            require_url(self.certificate_timestamp_server_url, "CertificateTimestampServerURL")?;
        let crl_distribution_points = require_list(self.crl_distribution_points, "CLRDistributionPoints")?;
        let ocsp_servers = require_list(self.ocsp_servers, "OCSPServers")?;
        let doc_timestamp_url = require_url(self.timestamp_server_url, "TimestampServerURL")?;
        let (config, transport) = resolve(self.config, self.transport);

        let doc_timestamp = DocTimestampHandler::new(
            TimestampClient::new(doc_timestamp_url, transport.clone()),
            DigestAlgorithm::Sha512,
        )
        .with_size_slack(config.size_slack);

        log::debug!("Building PAdES LTA-Level handlers");
        let handler = make_handler(HandlerParts {
            private_key,
            certificate,
            ca_certificate,
            timestamp_server_url: Some(timestamp_url),
            crl_distribution_points,
            ocsp_servers,
            config,
            transport,
        })?;
        Ok((handler, doc_timestamp))
    }
}
