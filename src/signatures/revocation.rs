//! Revocation evidence collection for PAdES-LT.
//!
//! Once the signature bytes are final, CRLs and OCSP responses are fetched
//! for the signing certificate and returned as one batch for the DSS.

use std::sync::Arc;

use super::dss::DssCerts;
use super::ocsp::{self, OcspCertStatus};
use crate::error::{Error, Result};
use crate::http::{HttpTransport, OCSP_REQUEST_CONTENT_TYPE};

/// Fetches revocation evidence from configured CRL and OCSP endpoints.
#[derive(Clone)]
pub struct RevocationCollector {
    transport: Arc<dyn HttpTransport>,
    crl_urls: Vec<String>,
    ocsp_urls: Vec<String>,
}

impl RevocationCollector {
    /// Create a collector for the given endpoints.
    pub fn new(transport: Arc<dyn HttpTransport>, crl_urls: Vec<String>, ocsp_urls: Vec<String>) -> Self {
        Self {
            transport,
            crl_urls,
            ocsp_urls,
        }
    }

    /// Whether any endpoint is configured.
    pub fn has_endpoints(&self) -> bool {
        !self.crl_urls.is_empty() || !self.ocsp_urls.is_empty()
    }

    /// Collect evidence for `certificate`, issued by `ca_certificate`.
    ///
    /// Endpoints are queried in order. The first failure aborts the whole
    /// collection; nothing is returned for a partial run. OCSP needs the
    /// issuer, so it is skipped without a CA certificate.
    pub fn collect(&self, certificate: &[u8], ca_certificate: Option<&[u8]>) -> Result<DssCerts> {
        let mut batch = DssCerts::default();

        for url in &self.crl_urls {
            batch.crls.push(self.fetch_crl(url)?);
        }

        match ca_certificate {
            Some(ca) => {
                for url in &self.ocsp_urls {
                    batch.ocsps.push(self.fetch_ocsp(url, certificate, ca)?);
                }
            },
            None if !self.ocsp_urls.is_empty() => {
                log::warn!("No CA certificate configured, skipping OCSP collection");
            },
            None => {},
        }

        batch.certs.push(certificate.to_vec());
        if let Some(ca) = ca_certificate {
            batch.certs.push(ca.to_vec());
        }

        log::info!(
            "Collected revocation evidence: {} CRLs, {} OCSP responses",
            batch.crls.len(),
            batch.ocsps.len()
        );
        Ok(batch)
    }

    fn fetch_crl(&self, url: &str) -> Result<Vec<u8>> {
        let body = self.transport.get(url)?;
        x509_parser::parse_x509_crl(&body)
            .map_err(|e| Error::Crl(format!("{} did not return a CRL: {}", url, e)))?;
        log::debug!("Fetched {} byte CRL from {}", body.len(), url);
        Ok(body)
    }

    fn fetch_ocsp(&self, url: &str, certificate: &[u8], ca_certificate: &[u8]) -> Result<Vec<u8>> {
        let request = ocsp::build_request(certificate, ca_certificate)?;
        let body = self.transport.post(url, OCSP_REQUEST_CONTENT_TYPE, &request)?;

        match ocsp::check_response(&body, certificate, ca_certificate)? {
            OcspCertStatus::Good => log::debug!("OCSP responder {} reports the certificate good", url),
            OcspCertStatus::Revoked => log::warn!("OCSP responder {} reports the certificate revoked", url),
            OcspCertStatus::Unknown => log::warn!("OCSP responder {} does not know the certificate", url),
        }
        Ok(body)
    }
}

impl std::fmt::Debug for RevocationCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevocationCollector")
            .field("crl_urls", &self.crl_urls)
            .field("ocsp_urls", &self.ocsp_urls)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const CA: &[u8] = include_bytes!("../../tests/fixtures/pades/ca.der");
    const SIGNER: &[u8] = include_bytes!("../../tests/fixtures/pades/signer.der");
    const CRL: &[u8] = include_bytes!("../../tests/fixtures/pades/crl_empty.der");
    const OCSP_GOOD: &[u8] = include_bytes!("../../tests/fixtures/pades/ocsp_signer_good.der");

    struct MapTransport(HashMap<&'static str, &'static [u8]>);

    impl MapTransport {
        fn body(&self, url: &str) -> Result<Vec<u8>> {
            self.0.get(url).map(|b| b.to_vec()).ok_or_else(|| Error::HttpStatus {
                url: url.to_string(),
                status: 404,
            })
        }
    }

    impl HttpTransport for MapTransport {
        fn get(&self, url: &str) -> Result<Vec<u8>> {
            self.body(url)
        }

        fn post(&self, url: &str, content_type: &str, _body: &[u8]) -> Result<Vec<u8>> {
            assert_eq!(content_type, OCSP_REQUEST_CONTENT_TYPE);
            self.body(url)
        }
    }

    fn transport() -> Arc<dyn HttpTransport> {
        Arc::new(MapTransport(HashMap::from([
            ("http://crl.test/ca.crl", CRL),
            ("http://ocsp.test", OCSP_GOOD),
            ("http://crl.test/garbage.crl", &b"not a crl"[..]),
        ])))
    }

    #[test]
    fn test_collect_batch() {
        let collector = RevocationCollector::new(
            transport(),
            vec!["http://crl.test/ca.crl".to_string()],
            vec!["http://ocsp.test".to_string()],
        );
        let batch = collector.collect(SIGNER, Some(CA)).unwrap();
        assert_eq!(batch.crls, vec![CRL.to_vec()]);
        assert_eq!(batch.ocsps, vec![OCSP_GOOD.to_vec()]);
        assert_eq!(batch.certs, vec![SIGNER.to_vec(), CA.to_vec()]);
    }

    #[test]
    fn test_crl_fetch_failure_aborts() {
        let collector = RevocationCollector::new(
            transport(),
            vec!["http://crl.test/ca.crl".to_string(), "http://crl.test/missing.crl".to_string()],
            vec![],
        );
        let err = collector.collect(SIGNER, Some(CA)).unwrap_err();
        assert!(matches!(err, Error::HttpStatus { status: 404, .. }));
    }

    #[test]
    fn test_unparseable_crl_aborts() {
        let collector =
            RevocationCollector::new(transport(), vec!["http://crl.test/garbage.crl".to_string()], vec![]);
        assert!(matches!(collector.collect(SIGNER, Some(CA)), Err(Error::Crl(_))));
    }

    #[test]
    fn test_ocsp_skipped_without_ca() {
        let collector = RevocationCollector::new(transport(), vec![], vec!["http://ocsp.test".to_string()]);
        let batch = collector.collect(SIGNER, None).unwrap();
        assert!(batch.ocsps.is_empty());
        assert_eq!(batch.certs.len(), 1);
    }
}
