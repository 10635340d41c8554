//! `ETSI.RFC3161` document timestamp handler.
//!
//! Used as the second signature of PAdES-LTA: `/Contents` holds a bare
//! RFC 3161 TimeStampToken over the document's byte range.

use super::digest::DigestAccumulator;
use super::dss::DocumentSecurity;
use super::handler::SignatureHandler;
use super::rfc3161;
use super::signer::{copy_into_reserved, SIZE_PROBE};
use super::timestamp::TimestampClient;
use super::types::{DigestAlgorithm, PdfSignature, SignatureSubFilter, SignatureValidationResult};
use super::verifier::{decode_signed_data, embedded_certificates, find_signer_certificate, only_signer, verify_signer_info};
use crate::config::DEFAULT_SIZE_SLACK;
use crate::error::{Error, Result};

/// Document timestamp handler.
#[derive(Debug, Clone)]
pub struct DocTimestampHandler {
    client: TimestampClient,
    hash_algorithm: DigestAlgorithm,
    signature_size: Option<usize>,
    size_slack: usize,
    reserved: Option<usize>,
}

impl DocTimestampHandler {
    /// Create a handler timestamping with `client` over `hash_algorithm`.
    pub fn new(client: TimestampClient, hash_algorithm: DigestAlgorithm) -> Self {
        Self {
            client,
            hash_algorithm,
            signature_size: None,
            size_slack: DEFAULT_SIZE_SLACK,
            reserved: None,
        }
    }

    /// Reserve exactly `size` bytes instead of probing the TSA.
    pub fn with_signature_size(mut self, size: usize) -> Self {
        self.signature_size = Some(size);
        self
    }

    /// Set the slack added to a probed token size.
    pub fn with_size_slack(mut self, size_slack: usize) -> Self {
        self.size_slack = size_slack;
        self
    }

    /// Hash algorithm of the message imprint.
    pub fn hash_algorithm(&self) -> DigestAlgorithm {
        self.hash_algorithm
    }

    /// `/Contents` size frozen by the last `init_signature`.
    pub fn reserved_size(&self) -> Option<usize> {
        self.reserved
    }
}

impl SignatureHandler for DocTimestampHandler {
    fn init_signature(&mut self, sig: &mut PdfSignature) -> Result<()> {
        let reserved = match self.signature_size {
            Some(size) => size,
            None => self.client.timestamp(self.hash_algorithm, SIZE_PROBE)?.len() + self.size_slack,
        };

        sig.set_names(SignatureSubFilter::Rfc3161);
        sig.reference = None;
        sig.contents = vec![0u8; reserved];
        self.reserved = Some(reserved);

        log::info!("Initialised document timestamp, reserved {} bytes for /Contents", reserved);
        Ok(())
    }

    fn sign(&mut self, sig: &mut PdfSignature, digest: &DigestAccumulator) -> Result<()> {
        let reserved = self.reserved.ok_or(Error::NotInitialized)?;
        if sig.contents.len() != reserved {
            return Err(Error::ContentsSizeChanged {
                expected: reserved,
                found: sig.contents.len(),
            });
        }

        let token = self.client.timestamp(self.hash_algorithm, digest.as_bytes())?;
        sig.contents = copy_into_reserved(&token, reserved)?;
        Ok(())
    }

    fn validate_ex(
        &self,
        sig: &PdfSignature,
        digest: &DigestAccumulator,
        _reader: Option<&dyn DocumentSecurity>,
    ) -> Result<SignatureValidationResult> {
        let signed_data = decode_signed_data(&sig.contents)?;
        let tst_content = rfc3161::token_content(&signed_data)?;
        let tst_info = rfc3161::token_tst_info(&signed_data)?;

        let certificates = embedded_certificates(&signed_data);
        let signer_info = only_signer(&signed_data)?;
        let tsa = find_signer_certificate(&signer_info.sid, &certificates)?;
        verify_signer_info(signer_info, tsa, &tst_content)?;

        let imprint = &tst_info.message_imprint;
        let algorithm = DigestAlgorithm::from_oid(&imprint.hash_algorithm.oid).ok_or_else(|| {
            Error::SignatureInvalid(format!(
                "unsupported imprint algorithm {}",
                imprint.hash_algorithm.oid
            ))
        })?;
        if imprint.hashed_message.as_bytes() != algorithm.digest(digest.as_bytes()).as_slice() {
            return Err(Error::DigestMismatch);
        }

        log::info!("Document timestamp verified ({})", algorithm.name());
        Ok(SignatureValidationResult {
            is_signed: true,
            is_verified: true,
            ..Default::default()
        })
    }

    fn is_applicable(&self, sig: &PdfSignature) -> bool {
        SignatureSubFilter::Rfc3161.matches(sig)
    }
}
