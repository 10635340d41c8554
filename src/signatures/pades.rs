//! The PAdES signature handler.
//!
//! [`PadesHandler`] ties the CAdES signer, the revocation collector and the
//! validator together behind [`SignatureHandler`]. Handlers are produced by
//! the level builders in [`levels`](super::levels).

use std::sync::Arc;

use super::digest::DigestAccumulator;
use super::dss::{signature_fingerprint, DocumentSecurity, Dss};
use super::handler::SignatureHandler;
use super::revocation::RevocationCollector;
use super::signer::CadesSigner;
use super::types::{PdfSignature, SignatureSubFilter, SignatureValidationResult};
use super::verifier::Validator;
use crate::config::SigningConfig;
use crate::error::{Error, Result};

/// Immutable configuration shared by every handler built from one builder.
#[derive(Debug)]
pub struct PadesConfig {
    signer: CadesSigner,
    revocation: RevocationCollector,
    signing: SigningConfig,
}

impl PadesConfig {
    /// Bundle a signer, its revocation endpoints and the signing settings.
    pub fn new(signer: CadesSigner, revocation: RevocationCollector, signing: SigningConfig) -> Self {
        Self {
            signer,
            revocation,
            signing,
        }
    }

    /// CAdES signer.
    pub fn signer(&self) -> &CadesSigner {
        &self.signer
    }

    /// Revocation endpoints.
    pub fn revocation(&self) -> &RevocationCollector {
        &self.revocation
    }

    /// Signing settings.
    pub fn signing(&self) -> &SigningConfig {
        &self.signing
    }
}

/// `ETSI.CAdES.detached` signature handler for PAdES levels B to LTA.
#[derive(Debug)]
pub struct PadesHandler {
    config: Arc<PadesConfig>,
    dss: Option<Dss>,
    reserved: Option<usize>,
    validator: Validator,
}

impl PadesHandler {
    /// Create a handler over a frozen configuration.
    pub fn new(config: Arc<PadesConfig>) -> Self {
        Self {
            config,
            dss: None,
            reserved: None,
            validator: Validator::new(),
        }
    }

    /// Shared configuration.
    pub fn config(&self) -> &Arc<PadesConfig> {
        &self.config
    }

    /// `/Contents` size frozen by the last `init_signature`.
    pub fn reserved_size(&self) -> Option<usize> {
        self.reserved
    }

    /// DSS built by the last signing attempt.
    pub fn dss(&self) -> Option<&Dss> {
        self.dss.as_ref()
    }

    /// Hand the DSS over to the document writer.
    pub fn take_dss(&mut self) -> Option<Dss> {
        self.dss.take()
    }
}

impl SignatureHandler for PadesHandler {
    fn init_signature(&mut self, sig: &mut PdfSignature) -> Result<()> {
        let reserved = self.config.signer.estimate_size()?;

        sig.set_names(SignatureSubFilter::CadesDetached);
        sig.reference = None;
        sig.contents = vec![0u8; reserved];
        self.dss = Some(Dss::new());
        self.reserved = Some(reserved);

        log::info!("Initialised PAdES signature, reserved {} bytes for /Contents", reserved);
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

        let signer = &self.config.signer;
        let contents = signer.sign(digest.as_bytes(), reserved)?;
        let batch = self
            .config
            .revocation
            .collect(signer.certificate_der(), signer.ca_certificate_der())?;

        let fingerprint = signature_fingerprint(&contents);
        self.dss
            .get_or_insert_with(Dss::new)
            .add_signature_evidence(fingerprint.clone(), batch);
        sig.contents = contents;

        log::info!("Signed {} bytes, VRI key {}", digest.len(), fingerprint);
        Ok(())
    }

    fn validate_ex(
        &self,
        sig: &PdfSignature,
        digest: &DigestAccumulator,
        reader: Option<&dyn DocumentSecurity>,
    ) -> Result<SignatureValidationResult> {
        self.validator.validate_ex(&sig.contents, digest, reader)
    }

    fn is_applicable(&self, sig: &PdfSignature) -> bool {
        self.validator.is_applicable(sig)
    }
}

/// `ETSI.CAdES.detached` handler without credentials.
///
/// Used by document readers to validate existing PAdES signatures. Signing
/// through it fails with [`Error::NotInitialized`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PadesValidationHandler {
    validator: Validator,
}

impl PadesValidationHandler {
    /// Create a validation-only handler.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SignatureHandler for PadesValidationHandler {
    fn init_signature(&mut self, _sig: &mut PdfSignature) -> Result<()> {
        Err(Error::NotInitialized)
    }

    fn sign(&mut self, _sig: &mut PdfSignature, _digest: &DigestAccumulator) -> Result<()> {
        Err(Error::NotInitialized)
    }

    fn validate_ex(
        &self,
        sig: &PdfSignature,
        digest: &DigestAccumulator,
        reader: Option<&dyn DocumentSecurity>,
    ) -> Result<SignatureValidationResult> {
        self.validator.validate_ex(&sig.contents, digest, reader)
    }

    fn is_applicable(&self, sig: &PdfSignature) -> bool {
        self.validator.is_applicable(sig)
    }
}
