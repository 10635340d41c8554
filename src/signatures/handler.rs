//! The signature handler contract.

use super::digest::DigestAccumulator;
use super::dss::DocumentSecurity;
use super::types::{PdfSignature, SignatureValidationResult};
use crate::error::Result;

/// Capability implemented by every signature handler.
///
/// The document writer drives signing:
///
/// 1. [`init_signature`](Self::init_signature) sets `/Filter`, `/SubFilter`
///    and a zero-filled `/Contents` whose length is frozen from then on;
/// 2. the writer lays out the file, computes the ByteRange and feeds the
///    covered bytes into a [`new_digest`](Self::new_digest) accumulator;
/// 3. [`sign`](Self::sign) fills `/Contents` in place.
///
/// The document reader drives validation through
/// [`validate`](Self::validate) / [`validate_ex`](Self::validate_ex).
pub trait SignatureHandler {
    /// Prepare `sig` for signing and reserve space for `/Contents`.
    fn init_signature(&mut self, sig: &mut PdfSignature) -> Result<()>;

    /// Create a fresh digest accumulator for one signing or validation attempt.
    fn new_digest(&self, _sig: &PdfSignature) -> DigestAccumulator {
        DigestAccumulator::new()
    }

    /// Produce the final `/Contents` over the accumulated bytes.
    fn sign(&mut self, sig: &mut PdfSignature, digest: &DigestAccumulator) -> Result<()>;

    /// Validate `sig` against the accumulated bytes.
    fn validate(
        &self,
        sig: &PdfSignature,
        digest: &DigestAccumulator,
    ) -> Result<SignatureValidationResult> {
        self.validate_ex(sig, digest, None)
    }

    /// Validate `sig`, consulting the reader's DSS for revocation evidence.
    fn validate_ex(
        &self,
        sig: &PdfSignature,
        digest: &DigestAccumulator,
        reader: Option<&dyn DocumentSecurity>,
    ) -> Result<SignatureValidationResult>;

    /// Whether this handler understands `sig`.
    fn is_applicable(&self, sig: &PdfSignature) -> bool;
}
