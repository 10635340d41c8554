//! RFC 3161 timestamp client.
//!
//! Builds a `TimeStampReq` for a precomputed hash, POSTs it to the TSA and
//! checks the returned token against the request before handing back its DER.

use std::sync::Arc;

use der::asn1::{OctetString, Uint};
use der::{Decode, Encode};
use spki::AlgorithmIdentifierOwned;

use super::rfc3161::{self, MessageImprint, TimeStampReq, TimeStampResp};
use super::types::DigestAlgorithm;
use crate::error::{Error, Result};
use crate::http::{HttpTransport, TIMESTAMP_QUERY_CONTENT_TYPE};

/// Client for one timestamp authority.
#[derive(Clone)]
pub struct TimestampClient {
    url: String,
    transport: Arc<dyn HttpTransport>,
}

impl TimestampClient {
    /// Create a client for the TSA at `url`.
    pub fn new(url: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            url: url.into(),
            transport,
        }
    }

    /// TSA endpoint.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Build a request for `hashed_message` with certReq set.
    pub fn build_request(
        hash_algorithm: DigestAlgorithm,
        hashed_message: &[u8],
        nonce: u64,
    ) -> Result<TimeStampReq> {
        Ok(TimeStampReq {
            version: 1,
            message_imprint: MessageImprint {
                hash_algorithm: AlgorithmIdentifierOwned {
                    oid: hash_algorithm.oid(),
                    parameters: None,
                },
                hashed_message: OctetString::new(hashed_message.to_vec())?,
            },
            req_policy: None,
            nonce: Some(Uint::new(&nonce.to_be_bytes())?),
            cert_req: true,
            extensions: None,
        })
    }

    /// Hash `data` and timestamp the hash.
    pub fn timestamp(&self, hash_algorithm: DigestAlgorithm, data: &[u8]) -> Result<Vec<u8>> {
        self.request(hash_algorithm, &hash_algorithm.digest(data))
    }

    /// Request a token for a precomputed hash.
    ///
    /// Returns the DER of the TimeStampToken (a CMS `ContentInfo`) exactly as
    /// issued, ready to embed.
    pub fn request(&self, hash_algorithm: DigestAlgorithm, hashed_message: &[u8]) -> Result<Vec<u8>> {
        let request = Self::build_request(hash_algorithm, hashed_message, rand::random::<u64>())?;
        let body = request.to_der()?;

        log::debug!(
            "Requesting {} timestamp from {} ({} byte query)",
            hash_algorithm.name(),
            self.url,
            body.len()
        );
        let response = self.transport.post(&self.url, TIMESTAMP_QUERY_CONTENT_TYPE, &body)?;

        let token = check_response(&request, &response)?;
        log::info!("Received {} byte timestamp token from {}", token.len(), self.url);
        Ok(token)
    }
}

impl std::fmt::Debug for TimestampClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimestampClient").field("url", &self.url).finish()
    }
}

/// Decode a TSA response and check it answers `request`.
///
/// The status must be granted, the TSTInfo imprint must equal the request's
/// and the request nonce must be echoed back.
pub fn check_response(request: &TimeStampReq, response: &[u8]) -> Result<Vec<u8>> {
    let response = TimeStampResp::from_der(response)
        .map_err(|e| Error::Timestamp(format!("invalid TimeStampResp: {}", e)))?;
    let token = response.into_granted_token()?;

    let signed_data = rfc3161::token_signed_data(&token)?;
    let tst_info = rfc3161::token_tst_info(&signed_data)?;

    if !tst_info.message_imprint.matches(&request.message_imprint) {
        return Err(Error::Timestamp("token message imprint does not match the request".to_string()));
    }
    if let Some(expected) = &request.nonce {
        match &tst_info.nonce {
            Some(found) if same_integer(found.as_bytes(), expected.as_bytes()) => {},
            Some(_) => return Err(Error::Timestamp("token nonce does not match the request".to_string())),
            None => return Err(Error::Timestamp("token does not echo the request nonce".to_string())),
        }
    }

    Ok(token.to_der()?)
}

fn same_integer(a: &[u8], b: &[u8]) -> bool {
    fn trim(bytes: &[u8]) -> &[u8] {
        let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
        &bytes[start..]
    }
    trim(a) == trim(b)
}
