//! Digital signature types and data structures.
//!
//! This module defines the core types shared by the PAdES handlers.

use der::oid::ObjectIdentifier;
use der::Decode;
use pkcs1::DecodeRsaPrivateKey;
use pkcs8::{DecodePrivateKey, EncodePrivateKey};
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use x509_cert::Certificate;

use crate::error::{Error, Result};

/// `/Filter` value of every signature this crate produces.
pub const FILTER_ADOBE_PPKLITE: &str = "Adobe.PPKLite";

/// SHA-1: 1.3.14.3.2.26
pub const OID_SHA1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.14.3.2.26");
/// SHA-256: 2.16.840.1.101.3.4.2.1
pub const OID_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1");
/// SHA-512: 2.16.840.1.101.3.4.2.3
pub const OID_SHA512: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.3");

/// rsaEncryption: 1.2.840.113549.1.1.1
pub const OID_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
/// sha1WithRSAEncryption: 1.2.840.113549.1.1.5
pub const OID_SHA1_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.5");
/// sha256WithRSAEncryption: 1.2.840.113549.1.1.11
pub const OID_SHA256_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");
/// sha512WithRSAEncryption: 1.2.840.113549.1.1.13
pub const OID_SHA512_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.13");

/// Digest algorithm used for signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// SHA-1 (deprecated, but still common in legacy PDFs)
    Sha1,
    /// SHA-256 (recommended)
    #[default]
    Sha256,
    /// SHA-512
    Sha512,
}

impl DigestAlgorithm {
    /// Get the OID for this digest algorithm.
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            DigestAlgorithm::Sha1 => OID_SHA1,
            DigestAlgorithm::Sha256 => OID_SHA256,
            DigestAlgorithm::Sha512 => OID_SHA512,
        }
    }

    /// Look up the algorithm for a digest OID.
    pub fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        [DigestAlgorithm::Sha1, DigestAlgorithm::Sha256, DigestAlgorithm::Sha512]
            .into_iter()
            .find(|alg| alg.oid() == *oid)
    }

    /// OID of RSA PKCS#1 v1.5 with this digest.
    pub fn rsa_signature_oid(&self) -> ObjectIdentifier {
        match self {
            DigestAlgorithm::Sha1 => OID_SHA1_WITH_RSA,
            DigestAlgorithm::Sha256 => OID_SHA256_WITH_RSA,
            DigestAlgorithm::Sha512 => OID_SHA512_WITH_RSA,
        }
    }

    /// Digest implied by an RSA signature algorithm OID.
    ///
    /// Plain `rsaEncryption` carries no digest; `fallback` is returned for it.
    pub fn from_rsa_signature_oid(oid: &ObjectIdentifier, fallback: Option<Self>) -> Option<Self> {
        if *oid == OID_RSA_ENCRYPTION {
            return fallback;
        }
        [DigestAlgorithm::Sha1, DigestAlgorithm::Sha256, DigestAlgorithm::Sha512]
            .into_iter()
            .find(|alg| alg.rsa_signature_oid() == *oid)
    }

    /// Get the name of this algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "SHA-1",
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha512 => "SHA-512",
        }
    }

    /// RSA PKCS#1 v1.5 padding scheme for this digest.
    pub fn pkcs1v15_scheme(&self) -> rsa::Pkcs1v15Sign {
        match self {
            DigestAlgorithm::Sha1 => rsa::Pkcs1v15Sign::new::<Sha1>(),
            DigestAlgorithm::Sha256 => rsa::Pkcs1v15Sign::new::<Sha256>(),
            DigestAlgorithm::Sha512 => rsa::Pkcs1v15Sign::new::<Sha512>(),
        }
    }

    /// Hash `data` with this algorithm.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
            DigestAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            DigestAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

/// Signature sub-filter type (signature encoding).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureSubFilter {
    /// ETSI.CAdES.detached - PAdES CAdES signature
    CadesDetached,
    /// ETSI.RFC3161 - Document timestamp token
    Rfc3161,
}

impl SignatureSubFilter {
    /// Get the PDF name for this sub-filter.
    pub fn as_pdf_name(&self) -> &'static str {
        match self {
            SignatureSubFilter::CadesDetached => "ETSI.CAdES.detached",
            SignatureSubFilter::Rfc3161 => "ETSI.RFC3161",
        }
    }

    /// Parse a PDF name into a sub-filter type.
    pub fn from_pdf_name(name: &str) -> Option<Self> {
        match name {
            "ETSI.CAdES.detached" => Some(SignatureSubFilter::CadesDetached),
            "ETSI.RFC3161" => Some(SignatureSubFilter::Rfc3161),
            _ => None,
        }
    }

    /// Check whether `sig` carries `/Filter /Adobe.PPKLite` and this sub-filter.
    ///
    /// Both names must be present.
    pub fn matches(&self, sig: &PdfSignature) -> bool {
        match (sig.filter.as_deref(), sig.sub_filter.as_deref()) {
            (Some(filter), Some(sub_filter)) => {
                filter == FILTER_ADOBE_PPKLITE && sub_filter == self.as_pdf_name()
            },
            _ => false,
        }
    }
}

/// The signature fields of a PDF signature dictionary handled here.
///
/// The surrounding document model owns the dictionary; handlers only touch
/// these fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdfSignature {
    /// `/Filter` name
    pub filter: Option<String>,
    /// `/SubFilter` name
    pub sub_filter: Option<String>,
    /// `/Contents` raw bytes (DER signature, zero padded to a fixed length)
    pub contents: Vec<u8>,
    /// `/Reference` entries, owned by the document writer
    pub reference: Option<Vec<u8>>,
}

impl PdfSignature {
    /// Create an empty signature record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `/Filter` and `/SubFilter`.
    pub fn set_names(&mut self, sub_filter: SignatureSubFilter) {
        self.filter = Some(FILTER_ADOBE_PPKLITE.to_string());
        self.sub_filter = Some(sub_filter.as_pdf_name().to_string());
    }
}

/// Signing credentials containing certificate and private key.
#[derive(Clone)]
pub struct SigningCredentials {
    /// DER-encoded X.509 certificate
    pub certificate: Vec<u8>,
    /// DER-encoded private key (PKCS#8 format)
    pub private_key: Vec<u8>,
    /// Issuing CA certificate (DER-encoded)
    pub ca_certificate: Option<Vec<u8>>,
}

impl SigningCredentials {
    /// Create new signing credentials from raw components.
    pub fn new(certificate: Vec<u8>, private_key: Vec<u8>) -> Self {
        Self {
            certificate,
            private_key,
            ca_certificate: None,
        }
    }

    /// Attach the issuing CA certificate.
    pub fn with_ca_certificate(mut self, ca_certificate: Vec<u8>) -> Self {
        self.ca_certificate = Some(ca_certificate);
        self
    }

    /// Load credentials from a PEM certificate and a PEM private key.
    ///
    /// The key may be PKCS#8 (`PRIVATE KEY`) or PKCS#1 (`RSA PRIVATE KEY`).
    pub fn from_pem(cert_pem: &str, key_pem: &str) -> Result<Self> {
        let (_, pem) = x509_parser::pem::parse_x509_pem(cert_pem.as_bytes())
            .map_err(|e| Error::InvalidCertificate(format!("bad PEM: {}", e)))?;
        if pem.label != "CERTIFICATE" {
            return Err(Error::InvalidCertificate(format!(
                "expected CERTIFICATE PEM block, found {}",
                pem.label
            )));
        }

        let key = if key_pem.contains("BEGIN RSA PRIVATE KEY") {
            RsaPrivateKey::from_pkcs1_pem(key_pem).map_err(|e| Error::InvalidKey(e.to_string()))?
        } else {
            RsaPrivateKey::from_pkcs8_pem(key_pem).map_err(|e| Error::InvalidKey(e.to_string()))?
        };
        let private_key = key
            .to_pkcs8_der()
            .map_err(|e| Error::InvalidKey(e.to_string()))?
            .as_bytes()
            .to_vec();

        Ok(Self::new(pem.contents, private_key))
    }

    /// Decode the RSA private key.
    pub fn rsa_private_key(&self) -> Result<RsaPrivateKey> {
        RsaPrivateKey::from_pkcs8_der(&self.private_key)
            .or_else(|_| RsaPrivateKey::from_pkcs1_der(&self.private_key))
            .map_err(|e| Error::InvalidKey(e.to_string()))
    }

    /// Decode the signing certificate.
    pub fn x509_certificate(&self) -> Result<Certificate> {
        Certificate::from_der(&self.certificate)
            .map_err(|e| Error::InvalidCertificate(e.to_string()))
    }

    /// Decode the CA certificate, if any.
    pub fn x509_ca_certificate(&self) -> Result<Option<Certificate>> {
        self.ca_certificate
            .as_deref()
            .map(|der| {
                Certificate::from_der(der).map_err(|e| Error::InvalidCertificate(e.to_string()))
            })
            .transpose()
    }
}

impl std::fmt::Debug for SigningCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningCredentials")
            .field("certificate", &format!("{} bytes", self.certificate.len()))
            .field("private_key", &"[REDACTED]")
            .field("ca_certificate", &self.ca_certificate.as_ref().map(|c| c.len()))
            .finish()
    }
}

/// Outcome of validating one signature.
///
/// Evidence problems (missing VRI entry, OCSP or CRL failures) are reported
/// here; a signature that cannot be decoded or whose value does not verify is
/// reported as an [`Error`] instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureValidationResult {
    /// The signature decoded and names a signer
    pub is_signed: bool,
    /// The signature value verifies over the signed bytes
    pub is_verified: bool,
    /// A VRI entry exists for this signature
    pub is_vri_found: bool,
    /// The VRI entry holds OCSP responses
    pub is_ocsps_found: bool,
    /// All OCSP responses parsed, matched and report the certificate good
    pub is_verified_by_ocsps: bool,
    /// The VRI entry holds CRLs
    pub is_crls_found: bool,
    /// All CRLs parsed and none lists a relevant certificate
    pub is_verified_by_crls: bool,
    /// Evidence-level failure messages, in the order found
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_algorithm_names() {
        assert_eq!(DigestAlgorithm::Sha256.name(), "SHA-256");
        assert_eq!(DigestAlgorithm::Sha1.name(), "SHA-1");
        assert_eq!(DigestAlgorithm::Sha512.name(), "SHA-512");
    }

    #[test]
    fn test_digest_algorithm_oid_lookup() {
        for alg in [DigestAlgorithm::Sha1, DigestAlgorithm::Sha256, DigestAlgorithm::Sha512] {
            assert_eq!(DigestAlgorithm::from_oid(&alg.oid()), Some(alg));
        }
        let md5 = ObjectIdentifier::new_unwrap("1.2.840.113549.2.5");
        assert_eq!(DigestAlgorithm::from_oid(&md5), None);
    }

    #[test]
    fn test_rsa_signature_oid_lookup() {
        assert_eq!(
            DigestAlgorithm::from_rsa_signature_oid(&OID_SHA256_WITH_RSA, None),
            Some(DigestAlgorithm::Sha256)
        );
        assert_eq!(
            DigestAlgorithm::from_rsa_signature_oid(&OID_RSA_ENCRYPTION, Some(DigestAlgorithm::Sha512)),
            Some(DigestAlgorithm::Sha512)
        );
        assert_eq!(DigestAlgorithm::from_rsa_signature_oid(&OID_RSA_ENCRYPTION, None), None);
    }

    #[test]
    fn test_digest_lengths() {
        assert_eq!(DigestAlgorithm::Sha1.digest(b"abc").len(), 20);
        assert_eq!(DigestAlgorithm::Sha256.digest(b"abc").len(), 32);
        assert_eq!(DigestAlgorithm::Sha512.digest(b"abc").len(), 64);
    }

    #[test]
    fn test_sub_filter_names() {
        assert_eq!(SignatureSubFilter::CadesDetached.as_pdf_name(), "ETSI.CAdES.detached");
        assert_eq!(
            SignatureSubFilter::from_pdf_name("ETSI.RFC3161"),
            Some(SignatureSubFilter::Rfc3161)
        );
        assert_eq!(SignatureSubFilter::from_pdf_name("adbe.pkcs7.detached"), None);
    }

    #[test]
    fn test_sub_filter_matches_requires_both_names() {
        let mut sig = PdfSignature::new();
        assert!(!SignatureSubFilter::CadesDetached.matches(&sig));

        sig.sub_filter = Some("ETSI.CAdES.detached".to_string());
        assert!(!SignatureSubFilter::CadesDetached.matches(&sig));

        sig.set_names(SignatureSubFilter::CadesDetached);
        assert!(SignatureSubFilter::CadesDetached.matches(&sig));
        assert!(!SignatureSubFilter::Rfc3161.matches(&sig));

        sig.filter = Some("Adobe.PPKMS".to_string());
        assert!(!SignatureSubFilter::CadesDetached.matches(&sig));
    }

    #[test]
    fn test_signing_credentials_debug() {
        let creds = SigningCredentials::new(vec![1, 2, 3], vec![4, 5, 6]);
        let debug = format!("{:?}", creds);
        assert!(debug.contains("[REDACTED]"));
        assert!(debug.contains("3 bytes"));
    }

    #[test]
    fn test_signing_credentials_bad_key() {
        let creds = SigningCredentials::new(vec![], vec![0x30, 0x00]);
        assert!(matches!(creds.rsa_private_key(), Err(Error::InvalidKey(_))));
    }
}
