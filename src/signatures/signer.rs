//! Detached CAdES signature construction.
//!
//! A [`CadesSigner`] produces the DER `ContentInfo` placed in a PAdES
//! signature's `/Contents`:
//!
//! - detached `SignedData` over the signed byte range (id-data, no eContent);
//! - signer identified by issuer and serial number, with the leaf and CA
//!   certificates embedded;
//! - content-type, message-digest and ESS signing-certificate signed attributes;
//! - RSA PKCS#1 v1.5 signature over the signed attributes;
//! - optionally, an RFC 3161 token over the message digest as an unsigned
//!   attribute.
//!
//! Sizing is two-phase: [`CadesSigner::estimate_size`] signs a probe payload
//! to decide how many bytes `/Contents` reserves, and [`CadesSigner::sign`]
//! fills exactly that many bytes or fails.

use cms::builder::{SignedDataBuilder, SignerInfoBuilder};
use cms::cert::{CertificateChoices, IssuerAndSerialNumber};
use cms::content_info::ContentInfo;
use cms::signed_data::{EncapsulatedContentInfo, SignedData, SignerIdentifier, SignerInfo, SignerInfos};
use der::asn1::{ObjectIdentifier, OctetString, SetOfVec};
use der::{Any, Decode, Encode, Sequence};
use rsa::pkcs1v15::SigningKey;
use rsa::RsaPrivateKey;
use sha1::{Digest, Sha1};
use sha2::{Sha256, Sha512};
use signature::Keypair;
use spki::{AlgorithmIdentifierOwned, DynSignatureAlgorithmIdentifier, EncodePublicKey};
use x509_cert::attr::Attribute;
use x509_cert::Certificate;

use super::rfc3161::OID_TIMESTAMP_TOKEN_ATTR;
use super::timestamp::TimestampClient;
use super::types::{DigestAlgorithm, SigningCredentials};
use crate::config::DEFAULT_SIZE_SLACK;
use crate::error::{Error, Result};

/// Payload signed to measure the signature size before the real content exists.
pub const SIZE_PROBE: &[u8] = b"calculate the Contents field size";

/// id-data: 1.2.840.113549.1.7.1
pub const OID_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");
/// id-contentType: 1.2.840.113549.1.9.3
pub const OID_CONTENT_TYPE: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.3");
/// id-messageDigest: 1.2.840.113549.1.9.4
pub const OID_MESSAGE_DIGEST: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.4");
/// id-aa-signingCertificate: 1.2.840.113549.1.9.16.2.12
pub const OID_SIGNING_CERTIFICATE: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.2.12");

/// ```text
/// ESSCertID ::= SEQUENCE {
///     certHash      Hash,
///     issuerSerial  IssuerSerial OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct EssCertId {
    /// SHA-1 of the certificate DER
    pub cert_hash: OctetString,
    /// issuer and serial, not emitted here
    #[asn1(optional = "true")]
    pub issuer_serial: Option<Any>,
}

/// ```text
/// SigningCertificate ::= SEQUENCE {
///     certs     SEQUENCE OF ESSCertID,
///     policies  SEQUENCE OF PolicyInformation OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct SigningCertificate {
    /// signer certificate first
    pub certs: Vec<EssCertId>,
    /// policies, not emitted here
    #[asn1(optional = "true")]
    pub policies: Option<Any>,
}

pub(crate) fn signing_error(e: impl std::fmt::Display) -> Error {
    Error::Signing(e.to_string())
}

/// Copy `der` into a zero-filled buffer of exactly `reserved` bytes.
///
/// Never truncates: a DER value longer than `reserved` is a capacity error.
pub fn copy_into_reserved(der: &[u8], reserved: usize) -> Result<Vec<u8>> {
    if der.len() > reserved {
        return Err(Error::CapacityExceeded {
            required: der.len(),
            reserved,
        });
    }
    let mut contents = vec![0u8; reserved];
    contents[..der.len()].copy_from_slice(der);
    Ok(contents)
}

/// Builds detached CAdES signatures for one signer.
#[derive(Clone)]
pub struct CadesSigner {
    private_key: RsaPrivateKey,
    certificate: Certificate,
    certificate_der: Vec<u8>,
    ca_certificate: Option<Certificate>,
    ca_certificate_der: Option<Vec<u8>>,
    digest_algorithm: DigestAlgorithm,
    size_slack: usize,
    timestamp: Option<TimestampClient>,
}

impl CadesSigner {
    /// Create a signer for `certificate` and its private key.
    pub fn new(
        private_key: RsaPrivateKey,
        certificate: Certificate,
        ca_certificate: Option<Certificate>,
    ) -> Result<Self> {
        let certificate_der = certificate.to_der()?;
        let ca_certificate_der = ca_certificate.as_ref().map(|ca| ca.to_der()).transpose()?;
        Ok(Self {
            private_key,
            certificate,
            certificate_der,
            ca_certificate,
            ca_certificate_der,
            digest_algorithm: DigestAlgorithm::default(),
            size_slack: DEFAULT_SIZE_SLACK,
            timestamp: None,
        })
    }

    /// Create a signer from DER/PEM-loaded credentials.
    pub fn from_credentials(credentials: &SigningCredentials) -> Result<Self> {
        Self::new(
            credentials.rsa_private_key()?,
            credentials.x509_certificate()?,
            credentials.x509_ca_certificate()?,
        )
    }

    /// Set the message digest algorithm.
    pub fn with_digest_algorithm(mut self, digest_algorithm: DigestAlgorithm) -> Self {
        self.digest_algorithm = digest_algorithm;
        self
    }

    /// Set the slack added to the probe size.
    pub fn with_size_slack(mut self, size_slack: usize) -> Self {
        self.size_slack = size_slack;
        self
    }

    /// Embed a signature timestamp from `client`.
    pub fn with_timestamp(mut self, client: TimestampClient) -> Self {
        self.timestamp = Some(client);
        self
    }

    /// DER of the signing certificate.
    pub fn certificate_der(&self) -> &[u8] {
        &self.certificate_der
    }

    /// DER of the CA certificate, if configured.
    pub fn ca_certificate_der(&self) -> Option<&[u8]> {
        self.ca_certificate_der.as_deref()
    }

    /// Digest algorithm used for the message digest.
    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.digest_algorithm
    }

    /// Number of `/Contents` bytes to reserve.
    ///
    /// Signs [`SIZE_PROBE`] (including the timestamp exchange when one is
    /// configured) and adds the configured slack.
    pub fn estimate_size(&self) -> Result<usize> {
        let probe = self.signature_der(SIZE_PROBE)?;
        let reserved = probe.len() + self.size_slack;
        log::debug!(
            "Probe signature is {} bytes, reserving {} bytes for /Contents",
            probe.len(),
            reserved
        );
        Ok(reserved)
    }

    /// Sign `content` and return exactly `reserved` bytes.
    pub fn sign(&self, content: &[u8], reserved: usize) -> Result<Vec<u8>> {
        let der = self.signature_der(content)?;
        copy_into_reserved(&der, reserved)
    }

    /// Sign `content` and return the unpadded DER `ContentInfo`.
    pub fn signature_der(&self, content: &[u8]) -> Result<Vec<u8>> {
        let digest = self.digest_algorithm.digest(content);
        let encap = EncapsulatedContentInfo {
            econtent_type: OID_DATA,
            econtent: None,
        };

        let content_info = match self.digest_algorithm {
            DigestAlgorithm::Sha1 => {
                self.build_signed_data(SigningKey::<Sha1>::new(self.private_key.clone()), &encap, &digest)?
            },
            DigestAlgorithm::Sha256 => {
                self.build_signed_data(SigningKey::<Sha256>::new(self.private_key.clone()), &encap, &digest)?
            },
            DigestAlgorithm::Sha512 => {
                self.build_signed_data(SigningKey::<Sha512>::new(self.private_key.clone()), &encap, &digest)?
            },
        };

        // The timestamp covers the signature, so it is attached after signing.
        let content_info = match &self.timestamp {
            Some(client) => attach_timestamp(content_info, client)?,
            None => content_info,
        };

        Ok(content_info.to_der()?)
    }

    fn build_signed_data<S>(
        &self,
        signer: S,
        encap: &EncapsulatedContentInfo,
        digest: &[u8],
    ) -> Result<ContentInfo>
    where
        S: Keypair + DynSignatureAlgorithmIdentifier + signature::Signer<rsa::pkcs1v15::Signature>,
        S::VerifyingKey: EncodePublicKey,
    {
        let digest_algorithm = AlgorithmIdentifierOwned {
            oid: self.digest_algorithm.oid(),
            parameters: None,
        };
        let sid = SignerIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber {
            issuer: self.certificate.tbs_certificate.issuer.clone(),
            serial_number: self.certificate.tbs_certificate.serial_number.clone(),
        });

        let mut signer_info =
            SignerInfoBuilder::new(&signer, sid, digest_algorithm.clone(), encap, Some(digest))
                .map_err(signing_error)?;
        signer_info
            .add_signed_attribute(self.signing_certificate_attribute()?)
            .map_err(signing_error)?;

        let mut builder = SignedDataBuilder::new(encap);
        builder.add_digest_algorithm(digest_algorithm).map_err(signing_error)?;
        builder
            .add_certificate(CertificateChoices::Certificate(self.certificate.clone()))
            .map_err(signing_error)?;
        if let Some(ca) = &self.ca_certificate {
            builder
                .add_certificate(CertificateChoices::Certificate(ca.clone()))
                .map_err(signing_error)?;
        }
        builder
            .add_signer_info::<S, rsa::pkcs1v15::Signature>(signer_info)
            .map_err(signing_error)?;
        builder.build().map_err(signing_error)
    }

    fn signing_certificate_attribute(&self) -> Result<Attribute> {
        let ess = SigningCertificate {
            certs: vec![EssCertId {
                cert_hash: OctetString::new(Sha1::digest(&self.certificate_der).to_vec())?,
                issuer_serial: None,
            }],
            policies: None,
        };
        Ok(Attribute {
            oid: OID_SIGNING_CERTIFICATE,
            values: SetOfVec::try_from(vec![Any::from_der(&ess.to_der()?)?])?,
        })
    }
}

impl std::fmt::Debug for CadesSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CadesSigner")
            .field("private_key", &"[REDACTED]")
            .field("certificate", &format!("{} bytes", self.certificate_der.len()))
            .field("ca_certificate", &self.ca_certificate_der.as_ref().map(|c| c.len()))
            .field("digest_algorithm", &self.digest_algorithm)
            .field("size_slack", &self.size_slack)
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

/// Bytes whose SHA-512 is timestamped: the DER of the message-digest
/// attribute value, or the raw signature value when that attribute is absent.
pub fn timestamp_imprint_source(signer_info: &SignerInfo) -> Result<Vec<u8>> {
    let message_digest = signer_info
        .signed_attrs
        .iter()
        .flat_map(|attrs| attrs.iter())
        .find(|attr| attr.oid == OID_MESSAGE_DIGEST)
        .and_then(|attr| attr.values.iter().next());

    match message_digest {
        Some(value) => Ok(value.to_der()?),
        None => Ok(signer_info.signature.as_bytes().to_vec()),
    }
}

fn attach_timestamp(content_info: ContentInfo, client: &TimestampClient) -> Result<ContentInfo> {
    let mut signed_data = content_info.content.decode_as::<SignedData>()?;
    let mut signer_infos = signed_data.signer_infos.0.into_vec();
    let signer_info = signer_infos
        .first_mut()
        .ok_or_else(|| Error::Signing("SignedData has no signer".to_string()))?;

    let source = timestamp_imprint_source(signer_info)?;
    let token = client.request(DigestAlgorithm::Sha512, &DigestAlgorithm::Sha512.digest(&source))?;

    let attribute = Attribute {
        oid: OID_TIMESTAMP_TOKEN_ATTR,
        values: SetOfVec::try_from(vec![Any::from_der(&token)?])?,
    };
    signer_info.unsigned_attrs = Some(SetOfVec::try_from(vec![attribute])?);
    signed_data.signer_infos = SignerInfos(SetOfVec::try_from(signer_infos)?);

    Ok(ContentInfo {
        content_type: content_info.content_type,
        content: Any::from_der(&signed_data.to_der()?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGNER: &[u8] = include_bytes!("../../tests/fixtures/pades/signer.der");
    const SIGNER_KEY: &[u8] = include_bytes!("../../tests/fixtures/pades/signer.key.der");
    const CA: &[u8] = include_bytes!("../../tests/fixtures/pades/ca.der");

    fn signer() -> CadesSigner {
        let credentials =
            SigningCredentials::new(SIGNER.to_vec(), SIGNER_KEY.to_vec()).with_ca_certificate(CA.to_vec());
        CadesSigner::from_credentials(&credentials).unwrap()
    }

    fn decode(der: &[u8]) -> SignedData {
        let content_info = ContentInfo::from_der(der).unwrap();
        content_info.content.decode_as::<SignedData>().unwrap()
    }

    #[test]
    fn test_copy_into_reserved() {
        assert_eq!(copy_into_reserved(&[1, 2], 4).unwrap(), vec![1, 2, 0, 0]);
        assert_eq!(copy_into_reserved(&[1, 2], 2).unwrap(), vec![1, 2]);
        let err = copy_into_reserved(&[1, 2, 3], 2).unwrap_err();
        assert!(matches!(err, Error::CapacityExceeded { required: 3, reserved: 2 }));
    }

    #[test]
    fn test_signature_is_detached_with_both_certificates() {
        let signed_data = decode(&signer().signature_der(b"%PDF-1.7 signed bytes").unwrap());
        assert!(signed_data.encap_content_info.econtent.is_none());
        assert_eq!(signed_data.encap_content_info.econtent_type, OID_DATA);
        assert_eq!(signed_data.certificates.unwrap().0.len(), 2);
        assert_eq!(signed_data.signer_infos.0.len(), 1);
    }

    #[test]
    fn test_signed_attributes() {
        let content = b"%PDF-1.7 signed bytes";
        let signed_data = decode(&signer().signature_der(content).unwrap());
        let signer_info = signed_data.signer_infos.0.iter().next().unwrap();
        let attrs = signer_info.signed_attrs.as_ref().unwrap();

        let digest = attrs.iter().find(|a| a.oid == OID_MESSAGE_DIGEST).unwrap();
        let value = digest.values.iter().next().unwrap().decode_as::<OctetString>().unwrap();
        assert_eq!(value.as_bytes(), DigestAlgorithm::Sha256.digest(content).as_slice());

        let ess = attrs.iter().find(|a| a.oid == OID_SIGNING_CERTIFICATE).unwrap();
        let ess = ess.values.iter().next().unwrap().decode_as::<SigningCertificate>().unwrap();
        assert_eq!(ess.certs[0].cert_hash.as_bytes(), Sha1::digest(SIGNER).as_slice());

        assert!(attrs.iter().any(|a| a.oid == OID_CONTENT_TYPE));
        assert!(signer_info.unsigned_attrs.is_none());
    }

    #[test]
    fn test_estimate_size_adds_slack() {
        let signer = signer().with_size_slack(100);
        let probe = signer.signature_der(SIZE_PROBE).unwrap().len();
        assert_eq!(signer.estimate_size().unwrap(), probe + 100);
    }

    #[test]
    fn test_sign_pads_to_reserved() {
        let signer = signer();
        let reserved = signer.estimate_size().unwrap();
        let contents = signer.sign(b"content", reserved).unwrap();
        assert_eq!(contents.len(), reserved);
        assert_eq!(*contents.last().unwrap(), 0);
    }

    #[test]
    fn test_sign_never_truncates() {
        let err = signer().sign(b"content", 64).unwrap_err();
        assert!(matches!(err, Error::CapacityExceeded { reserved: 64, .. }));
    }

    #[test]
    fn test_sha512_digest_algorithm() {
        let signer = signer().with_digest_algorithm(DigestAlgorithm::Sha512);
        let signed_data = decode(&signer.signature_der(b"x").unwrap());
        let signer_info = signed_data.signer_infos.0.iter().next().unwrap();
        assert_eq!(signer_info.digest_alg.oid, DigestAlgorithm::Sha512.oid());
    }
}
