//! OCSP request construction and response checking (RFC 6960).

use der::oid::ObjectIdentifier;
use rasn::types::{Any, OctetString};
use rasn_ocsp::{BasicOcspResponse, CertId, CertStatus, OcspResponseStatus, ResponderId};
use rasn_pkix::{AlgorithmIdentifier, Certificate};
use sha1::{Digest, Sha1};

use super::types::DigestAlgorithm;
use super::verifier::verify_pkcs1v15;
use crate::error::{Error, Result};

/// Certificate status reported by a matching OCSP SingleResponse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcspCertStatus {
    /// Not revoked
    Good,
    /// Revoked
    Revoked,
    /// Responder does not know the certificate
    Unknown,
}

fn ocsp_error(context: &str, e: impl std::fmt::Display) -> Error {
    Error::Ocsp(format!("{}: {}", context, e))
}

fn decode_cert(der: &[u8]) -> Result<Certificate> {
    rasn::der::decode::<Certificate>(der).map_err(|e| ocsp_error("invalid certificate", e))
}

/// Build the SHA-1 CertID of `cert_der` issued by `issuer_der`.
pub fn cert_id(cert_der: &[u8], issuer_der: &[u8]) -> Result<CertId> {
    let subject = decode_cert(cert_der)?;
    let issuer = decode_cert(issuer_der)?;
    make_cert_id(&subject, &issuer)
}

fn make_cert_id(subject: &Certificate, issuer: &Certificate) -> Result<CertId> {
    let issuer_name_raw = rasn::der::encode(&issuer.tbs_certificate.subject)
        .map_err(|e| ocsp_error("issuer name", e))?;
    let issuer_key_raw = issuer
        .tbs_certificate
        .subject_public_key_info
        .subject_public_key
        .as_raw_slice();

    let sha1_oid = rasn::types::Oid::new(&[1, 3, 14, 3, 2, 26])
        .ok_or_else(|| Error::Ocsp("invalid SHA-1 OID".to_string()))?;
    let null = rasn::der::encode(&()).map_err(|e| ocsp_error("NULL parameters", e))?;

    Ok(CertId {
        // Many responders expect NULL parameters rather than none.
        hash_algorithm: AlgorithmIdentifier {
            algorithm: rasn::types::ObjectIdentifier::from(sha1_oid),
            parameters: Some(Any::new(null)),
        },
        issuer_name_hash: OctetString::from(Sha1::digest(&issuer_name_raw).to_vec()),
        issuer_key_hash: OctetString::from(Sha1::digest(issuer_key_raw).to_vec()),
        serial_number: subject.tbs_certificate.serial_number.clone(),
    })
}

/// DER-encode an unsigned OCSP request for one certificate.
pub fn build_request(cert_der: &[u8], issuer_der: &[u8]) -> Result<Vec<u8>> {
    let req_cert = cert_id(cert_der, issuer_der)?;

    let request = rasn_ocsp::OcspRequest {
        tbs_request: rasn_ocsp::TbsRequest {
            version: rasn_ocsp::Version::from(0u8),
            requestor_name: None,
            request_list: vec![rasn_ocsp::Request {
                req_cert,
                single_request_extensions: None,
            }],
            request_extensions: None,
        },
        optional_signature: None,
    };

    rasn::der::encode(&request).map_err(|e| ocsp_error("cannot encode request", e))
}

/// Check an OCSP response for `cert_der` issued by `issuer_der`.
///
/// The response must be successful and signed by the issuer or by an
/// embedded responder certificate the issuer signed. Returns the status of
/// the SingleResponse whose CertID matches the pair.
pub fn check_response(response_der: &[u8], cert_der: &[u8], issuer_der: &[u8]) -> Result<OcspCertStatus> {
    let subject = decode_cert(cert_der)?;
    let issuer = decode_cert(issuer_der)?;
    let expected = make_cert_id(&subject, &issuer)?;

    let response = rasn::der::decode::<rasn_ocsp::OcspResponse>(response_der)
        .map_err(|e| ocsp_error("invalid OCSPResponse", e))?;
    if response.status != OcspResponseStatus::Successful {
        return Err(Error::Ocsp(format!("responder returned {:?}", response.status)));
    }
    let response_bytes = response
        .bytes
        .ok_or_else(|| Error::Ocsp("successful response carries no body".to_string()))?;
    let basic = rasn::der::decode::<BasicOcspResponse>(&response_bytes.response)
        .map_err(|e| ocsp_error("invalid BasicOCSPResponse", e))?;

    verify_response_signature(&basic, &issuer)?;

    let single = basic
        .tbs_response_data
        .responses
        .iter()
        .find(|single| same_cert_id(&single.cert_id, &expected))
        .ok_or_else(|| Error::Ocsp("no response for the certificate".to_string()))?;

    Ok(match single.cert_status {
        CertStatus::Good => OcspCertStatus::Good,
        CertStatus::Revoked(_) => OcspCertStatus::Revoked,
        CertStatus::Unknown(_) => OcspCertStatus::Unknown,
    })
}

fn same_cert_id(a: &CertId, b: &CertId) -> bool {
    a.hash_algorithm.algorithm == b.hash_algorithm.algorithm
        && a.issuer_name_hash == b.issuer_name_hash
        && a.issuer_key_hash == b.issuer_key_hash
        && a.serial_number == b.serial_number
}

fn signature_digest(algorithm: &AlgorithmIdentifier) -> Result<DigestAlgorithm> {
    let oid = ObjectIdentifier::new(&algorithm.algorithm.to_string())
        .map_err(|e| ocsp_error("signature algorithm", e))?;
    DigestAlgorithm::from_rsa_signature_oid(&oid, None)
        .ok_or_else(|| Error::Ocsp(format!("unsupported signature algorithm {}", oid)))
}

fn spki_der(cert: &Certificate) -> Result<Vec<u8>> {
    rasn::der::encode(&cert.tbs_certificate.subject_public_key_info)
        .map_err(|e| ocsp_error("public key", e))
}

fn responder_matches(responder_id: &ResponderId, cert: &Certificate) -> bool {
    match responder_id {
        ResponderId::ByName(name) => *name == cert.tbs_certificate.subject,
        ResponderId::ByKey(key_hash) => {
            let key = cert.tbs_certificate.subject_public_key_info.subject_public_key.as_raw_slice();
            key_hash.as_ref() == Sha1::digest(key).as_slice()
        },
    }
}

fn issued_by(cert: &Certificate, issuer: &Certificate) -> Result<bool> {
    if cert.tbs_certificate.issuer != issuer.tbs_certificate.subject {
        return Ok(false);
    }
    let tbs = rasn::der::encode(&cert.tbs_certificate).map_err(|e| ocsp_error("responder certificate", e))?;
    let digest = signature_digest(&cert.signature_algorithm)?;
    Ok(verify_pkcs1v15(&spki_der(issuer)?, digest, &tbs, cert.signature_value.as_raw_slice()).is_ok())
}

fn verify_response_signature(basic: &BasicOcspResponse, issuer: &Certificate) -> Result<()> {
    let tbs = rasn::der::encode(&basic.tbs_response_data)
        .map_err(|e| ocsp_error("cannot re-encode response data", e))?;
    let digest = signature_digest(&basic.signature_algorithm)?;
    let signature = basic.signature.as_raw_slice();

    if verify_pkcs1v15(&spki_der(issuer)?, digest, &tbs, signature).is_ok() {
        return Ok(());
    }

    for cert in basic.certs.iter().flatten() {
        if !responder_matches(&basic.tbs_response_data.responder_id, cert) {
            continue;
        }
        if !issued_by(cert, issuer)? {
            log::debug!("OCSP responder certificate is not issued by the CA, skipping");
            continue;
        }
        if verify_pkcs1v15(&spki_der(cert)?, digest, &tbs, signature).is_ok() {
            return Ok(());
        }
    }

    Err(Error::Ocsp(
        "response signature does not verify against the CA or a CA-issued responder".to_string(),
    ))
}
