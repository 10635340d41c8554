//! PAdES signature validation.
//!
//! Integrity failures (undecodable CMS, digest mismatch, bad signature value)
//! are returned as errors. Revocation evidence found in the DSS is checked
//! afterwards and any problem there is recorded in
//! [`SignatureValidationResult::errors`].

use std::collections::BTreeSet;

use cms::cert::CertificateChoices;
use cms::content_info::ContentInfo;
use cms::signed_data::{SignedData, SignerIdentifier, SignerInfo};
use der::asn1::{ObjectIdentifier, OctetString};
use der::{Decode, Encode, Reader, SliceReader};
use rsa::pkcs8::DecodePublicKey;
use rsa::RsaPublicKey;
use sha1::{Digest, Sha1};
use x509_cert::ext::pkix::{AuthorityKeyIdentifier, SubjectKeyIdentifier};
use x509_cert::Certificate;

use super::digest::DigestAccumulator;
use super::dss::{signature_fingerprint, DocumentSecurity, DssCerts};
use super::ocsp::{self, OcspCertStatus};
use super::rfc3161::OID_SIGNED_DATA;
use super::signer::{SigningCertificate, OID_MESSAGE_DIGEST, OID_SIGNING_CERTIFICATE};
use super::types::{DigestAlgorithm, PdfSignature, SignatureSubFilter, SignatureValidationResult};
use crate::error::{Error, Result};

const OID_SUBJECT_KEY_IDENTIFIER: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.14");
const OID_AUTHORITY_KEY_IDENTIFIER: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.35");

/// Verify an RSA PKCS#1 v1.5 signature with the key in `spki_der`.
pub(crate) fn verify_pkcs1v15(
    spki_der: &[u8],
    digest: DigestAlgorithm,
    message: &[u8],
    signature: &[u8],
) -> Result<()> {
    let key = RsaPublicKey::from_public_key_der(spki_der)
        .map_err(|e| Error::SignatureInvalid(format!("unsupported public key: {}", e)))?;
    key.verify(digest.pkcs1v15_scheme(), &digest.digest(message), signature)
        .map_err(|e| Error::SignatureInvalid(e.to_string()))
}

/// Decode the CMS `SignedData` at the start of `contents`.
///
/// `/Contents` is zero padded after the DER value; any other trailing byte
/// is rejected.
pub fn decode_signed_data(contents: &[u8]) -> Result<SignedData> {
    let mut reader = SliceReader::new(contents).map_err(|e| Error::Decode(e.to_string()))?;
    let content_info = ContentInfo::decode(&mut reader).map_err(|e| Error::Decode(e.to_string()))?;
    let consumed = usize::try_from(reader.position()).map_err(|e| Error::Decode(e.to_string()))?;

    if contents[consumed..].iter().any(|b| *b != 0) {
        return Err(Error::Decode("non-zero bytes after the signature".to_string()));
    }
    if content_info.content_type != OID_SIGNED_DATA {
        return Err(Error::Decode(format!(
            "content type {} is not signedData",
            content_info.content_type
        )));
    }
    content_info
        .content
        .decode_as::<SignedData>()
        .map_err(|e| Error::Decode(e.to_string()))
}

/// Certificates embedded in a `SignedData`.
pub fn embedded_certificates(signed_data: &SignedData) -> Vec<Certificate> {
    signed_data
        .certificates
        .iter()
        .flat_map(|set| set.0.iter())
        .filter_map(|choice| match choice {
            CertificateChoices::Certificate(cert) => Some(cert.clone()),
            _ => None,
        })
        .collect()
}

/// The single signer of a `SignedData`.
pub fn only_signer(signed_data: &SignedData) -> Result<&SignerInfo> {
    let mut signers = signed_data.signer_infos.0.iter();
    match (signers.next(), signers.next()) {
        (Some(signer), None) => Ok(signer),
        (None, _) => Err(Error::Decode("SignedData has no signer".to_string())),
        (Some(_), Some(_)) => Err(Error::Decode("SignedData has more than one signer".to_string())),
    }
}

fn extension_value<'a>(cert: &'a Certificate, oid: &ObjectIdentifier) -> Option<&'a [u8]> {
    cert.tbs_certificate
        .extensions
        .iter()
        .flatten()
        .find(|ext| ext.extn_id == *oid)
        .map(|ext| ext.extn_value.as_bytes())
}

fn subject_key_id(cert: &Certificate) -> Option<Vec<u8>> {
    let value = extension_value(cert, &OID_SUBJECT_KEY_IDENTIFIER)?;
    SubjectKeyIdentifier::from_der(value).ok().map(|ski| ski.0.as_bytes().to_vec())
}

fn authority_key_id(cert: &Certificate) -> Option<Vec<u8>> {
    let value = extension_value(cert, &OID_AUTHORITY_KEY_IDENTIFIER)?;
    AuthorityKeyIdentifier::from_der(value)
        .ok()?
        .key_identifier
        .map(|id| id.as_bytes().to_vec())
}

/// Find the certificate named by a signer identifier.
pub fn find_signer_certificate<'a>(
    sid: &SignerIdentifier,
    certificates: &'a [Certificate],
) -> Result<&'a Certificate> {
    certificates
        .iter()
        .find(|cert| match sid {
            SignerIdentifier::IssuerAndSerialNumber(ias) => {
                cert.tbs_certificate.issuer == ias.issuer
                    && cert.tbs_certificate.serial_number == ias.serial_number
            },
            SignerIdentifier::SubjectKeyIdentifier(ski) => {
                subject_key_id(cert).as_deref() == Some(ski.0.as_bytes())
            },
        })
        .ok_or_else(|| Error::SignatureInvalid("signer certificate not found in the signature".to_string()))
}

/// Find the issuer of `cert` among `candidates`.
///
/// The issuer's subject must equal `cert`'s issuer name byte for byte. When
/// both carry key identifiers, the authority key identifier must also equal
/// the candidate's subject key identifier.
pub fn find_issuer<'a>(cert: &Certificate, candidates: &'a [Certificate]) -> Option<&'a Certificate> {
    let issuer_name = cert.tbs_certificate.issuer.to_der().ok()?;
    let aki = authority_key_id(cert);

    candidates.iter().find(|candidate| {
        if candidate.tbs_certificate.subject.to_der().ok().as_deref() != Some(issuer_name.as_slice()) {
            return false;
        }
        match (&aki, subject_key_id(candidate)) {
            (Some(aki), Some(ski)) => *aki == ski,
            _ => true,
        }
    })
}

/// Check one signer of a detached `SignedData` over `content`.
///
/// Verifies the message-digest attribute, the ESS signing-certificate hash
/// when present, and the RSA signature value.
pub fn verify_signer_info(signer_info: &SignerInfo, signer_cert: &Certificate, content: &[u8]) -> Result<()> {
    let digest = DigestAlgorithm::from_oid(&signer_info.digest_alg.oid).ok_or_else(|| {
        Error::SignatureInvalid(format!("unsupported digest algorithm {}", signer_info.digest_alg.oid))
    })?;
    let signature_digest =
        DigestAlgorithm::from_rsa_signature_oid(&signer_info.signature_algorithm.oid, Some(digest))
            .ok_or_else(|| {
                Error::SignatureInvalid(format!(
                    "unsupported signature algorithm {}",
                    signer_info.signature_algorithm.oid
                ))
            })?;
    let spki = signer_cert.tbs_certificate.subject_public_key_info.to_der()?;
    let signature = signer_info.signature.as_bytes();

    let Some(signed_attrs) = &signer_info.signed_attrs else {
        return verify_pkcs1v15(&spki, signature_digest, content, signature);
    };

    let message_digest = signed_attrs
        .iter()
        .find(|attr| attr.oid == OID_MESSAGE_DIGEST)
        .and_then(|attr| attr.values.iter().next())
        .ok_or_else(|| Error::SignatureInvalid("message-digest attribute is missing".to_string()))?
        .decode_as::<OctetString>()?;
    if message_digest.as_bytes() != digest.digest(content).as_slice() {
        return Err(Error::DigestMismatch);
    }

    if let Some(value) = signed_attrs
        .iter()
        .find(|attr| attr.oid == OID_SIGNING_CERTIFICATE)
        .and_then(|attr| attr.values.iter().next())
    {
        let ess = value.decode_as::<SigningCertificate>()?;
        let cert_hash = Sha1::digest(signer_cert.to_der()?);
        match ess.certs.first() {
            Some(id) if id.cert_hash.as_bytes() == cert_hash.as_slice() => {},
            _ => {
                return Err(Error::SignatureInvalid(
                    "signing-certificate attribute does not match the signer certificate".to_string(),
                ))
            },
        }
    }

    verify_pkcs1v15(&spki, signature_digest, &signed_attrs.to_der()?, signature)
}

fn same_serial(a: &[u8], b: &[u8]) -> bool {
    fn trim(bytes: &[u8]) -> &[u8] {
        let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
        &bytes[start..]
    }
    trim(a) == trim(b)
}

/// Validates `ETSI.CAdES.detached` signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator;

impl Validator {
    /// Create a validator.
    pub fn new() -> Self {
        Self
    }

    /// Whether `sig` is a PAdES CAdES signature.
    pub fn is_applicable(&self, sig: &PdfSignature) -> bool {
        SignatureSubFilter::CadesDetached.matches(sig)
    }

    /// Validate without DSS evidence.
    pub fn validate(&self, contents: &[u8], digest: &DigestAccumulator) -> Result<SignatureValidationResult> {
        self.validate_ex(contents, digest, None)
    }

    /// Validate `contents` over the accumulated bytes, checking the
    /// revocation evidence the reader's DSS holds for this signature.
    pub fn validate_ex(
        &self,
        contents: &[u8],
        digest: &DigestAccumulator,
        reader: Option<&dyn DocumentSecurity>,
    ) -> Result<SignatureValidationResult> {
        let fingerprint = signature_fingerprint(contents);
        let vri = reader.and_then(|r| r.dss()).and_then(|dss| dss.vri_entry(&fingerprint));
        if reader.is_some() && vri.is_none() {
            log::debug!("No VRI entry for signature {}", fingerprint);
        }

        let signed_data = decode_signed_data(contents)?;
        let vri_certificates = vri
            .map(|entry| {
                entry
                    .certs
                    .iter()
                    .map(|der| Certificate::from_der(der).map_err(|e| Error::InvalidCertificate(e.to_string())))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?
            .unwrap_or_default();

        let cms_certificates = embedded_certificates(&signed_data);
        let signer_info = only_signer(&signed_data)?;
        let signer = find_signer_certificate(&signer_info.sid, &cms_certificates)?;

        let candidates: Vec<Certificate> =
            vri_certificates.iter().chain(cms_certificates.iter()).cloned().collect();
        let issuer = find_issuer(signer, &candidates);

        verify_signer_info(signer_info, signer, digest.as_bytes())?;
        log::info!("Signature {} verified", fingerprint);

        let mut result = SignatureValidationResult {
            is_signed: true,
            is_verified: true,
            is_vri_found: vri.is_some(),
            ..Default::default()
        };

        if let Some(entry) = vri {
            let signer_der = signer.to_der()?;
            let issuer_der = issuer.map(|cert| cert.to_der()).transpose()?;
            check_ocsps(&mut result, entry, &signer_der, issuer_der.as_deref());

            let mut serials = vec![signer.tbs_certificate.serial_number.as_bytes().to_vec()];
            serials.extend(
                vri_certificates
                    .iter()
                    .map(|cert| cert.tbs_certificate.serial_number.as_bytes().to_vec()),
            );
            check_crls(&mut result, entry, &serials);
        }

        Ok(result)
    }
}

fn check_ocsps(
    result: &mut SignatureValidationResult,
    entry: &DssCerts,
    signer_der: &[u8],
    issuer_der: Option<&[u8]>,
) {
    result.is_ocsps_found = !entry.ocsps.is_empty();
    result.is_verified_by_ocsps = result.is_ocsps_found;

    for (i, response) in entry.ocsps.iter().enumerate() {
        let outcome = match issuer_der {
            Some(issuer) => ocsp::check_response(response, signer_der, issuer),
            None => Err(Error::Ocsp("issuer certificate not found".to_string())),
        };
        let problem = match outcome {
            Ok(OcspCertStatus::Good) => continue,
            Ok(OcspCertStatus::Revoked) => "OCSP responder reports the certificate revoked".to_string(),
            Ok(OcspCertStatus::Unknown) => "OCSP responder does not know the certificate".to_string(),
            Err(e) => e.to_string(),
        };
        log::warn!("OCSP response {} rejected: {}", i, problem);
        result.errors.push(format!("OCSP response {}: {}", i, problem));
        result.is_verified_by_ocsps = false;
    }
}

fn check_crls(result: &mut SignatureValidationResult, entry: &DssCerts, serials: &[Vec<u8>]) {
    result.is_crls_found = !entry.crls.is_empty();
    result.is_verified_by_crls = result.is_crls_found;

    for (i, der) in entry.crls.iter().enumerate() {
        let crl = match x509_parser::parse_x509_crl(der) {
            Ok((_, crl)) => crl,
            Err(e) => {
                log::warn!("CRL {} does not parse: {}", i, e);
                result.errors.push(format!("CRL {}: {}", i, e));
                result.is_verified_by_crls = false;
                continue;
            },
        };

        let mut reported = BTreeSet::new();
        for revoked in crl.iter_revoked_certificates() {
            let listed = revoked.raw_serial();
            if serials.iter().any(|serial| same_serial(serial, listed)) && reported.insert(listed.to_vec()) {
                let message = format!("certificate with serial number {} is revoked", revoked.serial());
                log::warn!("{}", message);
                result.errors.push(message);
                result.is_verified_by_crls = false;
            }
        }
    }
}
