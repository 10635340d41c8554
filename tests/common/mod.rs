//! Shared fixtures and fakes for the PAdES integration tests.
//!
//! The certificates, keys, CRLs and OCSP responses under
//! `tests/fixtures/pades/` were produced with OpenSSL from a small test PKI:
//! a self-signed CA, a leaf signer (serial 0x1001) and an unrelated leaf
//! (serial 0x2002), both issued by the CA.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cms::builder::{SignedDataBuilder, SignerInfoBuilder};
use cms::cert::{CertificateChoices, IssuerAndSerialNumber};
use cms::signed_data::{EncapsulatedContentInfo, SignerIdentifier};
use der::asn1::{GeneralizedTime, ObjectIdentifier, OctetString, Uint};
use der::{Any, Decode, Encode};
use pdf_pades::http::{HttpTransport, OCSP_REQUEST_CONTENT_TYPE, TIMESTAMP_QUERY_CONTENT_TYPE};
use pdf_pades::signatures::rfc3161::{PkiStatusInfo, TimeStampReq, TimeStampResp, TstInfo, OID_CT_TSTINFO};
use pdf_pades::signatures::{DigestAlgorithm, PadesLevelB, PadesLevelLT, PadesLevelLTA, PadesLevelT};
use pdf_pades::{Error, Result};
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;
use sha2::Sha256;
use spki::AlgorithmIdentifierOwned;
use x509_cert::ext::Extension;
use x509_cert::Certificate;

pub const CA: &[u8] = include_bytes!("../fixtures/pades/ca.der");
pub const CA_KEY: &[u8] = include_bytes!("../fixtures/pades/ca.key.der");
pub const SIGNER: &[u8] = include_bytes!("../fixtures/pades/signer.der");
pub const SIGNER_KEY: &[u8] = include_bytes!("../fixtures/pades/signer.key.der");
pub const SIGNER_PEM: &str = include_str!("../fixtures/pades/signer.pem");
pub const SIGNER_KEY_PEM: &str = include_str!("../fixtures/pades/signer.key.pem");
pub const SIGNER_PKCS1_PEM: &str = include_str!("../fixtures/pades/signer.pkcs1.pem");
pub const OTHER: &[u8] = include_bytes!("../fixtures/pades/other.der");

pub const CRL_EMPTY: &[u8] = include_bytes!("../fixtures/pades/crl_empty.der");
pub const CRL_REVOKED: &[u8] = include_bytes!("../fixtures/pades/crl_revoked.der");
pub const OCSP_SIGNER_GOOD: &[u8] = include_bytes!("../fixtures/pades/ocsp_signer_good.der");
pub const OCSP_SIGNER_REVOKED: &[u8] = include_bytes!("../fixtures/pades/ocsp_signer_revoked.der");
pub const OCSP_OTHER_GOOD: &[u8] = include_bytes!("../fixtures/pades/ocsp_other_good.der");

pub const EXTERNAL_CONTENT: &[u8] = include_bytes!("../fixtures/pades/external_content.bin");
pub const EXTERNAL_CMS: &[u8] = include_bytes!("../fixtures/pades/external_cms.der");

pub const TSA_REQUEST: &[u8] = include_bytes!("../fixtures/pades/tsa_request.tsq");
pub const TSA_RESPONSE: &[u8] = include_bytes!("../fixtures/pades/tsa_response.tsr");
pub const TSA_IMPRINT_DATA: &[u8] = include_bytes!("../fixtures/pades/tsa_imprint_data.bin");

pub const TSA_URL: &str = "http://tsa.test/signature";
pub const DOC_TSA_URL: &str = "http://tsa.test/document";
pub const CRL_URL: &str = "http://crl.test/ca.crl";
pub const OCSP_URL: &str = "http://ocsp.test";

/// Route test logs through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn certificate(der: &[u8]) -> Certificate {
    Certificate::from_der(der).unwrap()
}

pub fn signer_key() -> RsaPrivateKey {
    RsaPrivateKey::from_pkcs8_der(SIGNER_KEY).unwrap()
}

pub fn ca_key() -> RsaPrivateKey {
    RsaPrivateKey::from_pkcs8_der(CA_KEY).unwrap()
}

/// A fake PDF with a zero-filled `/Contents` hole of `reserved` bytes.
///
/// Returns the file and its ByteRange.
pub fn fake_pdf(reserved: usize) -> (Vec<u8>, [i64; 4]) {
    use pdf_pades::signatures::ByteRangeCalculator;

    let calc = ByteRangeCalculator::for_contents(reserved);
    let head = b"%PDF-1.7\n1 0 obj\n<< /Type /Sig /Filter /Adobe.PPKLite /Contents ".to_vec();
    let tail = b" /ByteRange [0 0 0 0] >>\nendobj\n%%EOF\n".to_vec();

    let mut pdf = head.clone();
    pdf.extend_from_slice(calc.generate_placeholder().as_bytes());
    pdf.extend_from_slice(&tail);

    let byte_range = calc.calculate_byte_range(pdf.len(), head.len());
    (pdf, byte_range)
}

/// Timestamp authority answering RFC 3161 queries in memory.
///
/// Tokens are signed by the test CA. A non-zero padding adds an extension of
/// that many bytes to every later token.
pub struct MockTsa {
    key: RsaPrivateKey,
    certificate: Certificate,
    serial: AtomicU64,
    padding: AtomicUsize,
}

impl MockTsa {
    pub fn new() -> Self {
        Self {
            key: ca_key(),
            certificate: certificate(CA),
            serial: AtomicU64::new(1),
            padding: AtomicUsize::new(0),
        }
    }

    pub fn set_padding(&self, bytes: usize) {
        self.padding.store(bytes, Ordering::SeqCst);
    }

    pub fn respond(&self, query: &[u8]) -> Vec<u8> {
        let request = TimeStampReq::from_der(query).unwrap();
        let serial = self.serial.fetch_add(1, Ordering::SeqCst);
        let padding = self.padding.load(Ordering::SeqCst);

        let extensions = (padding > 0).then(|| {
            vec![Extension {
                extn_id: ObjectIdentifier::new_unwrap("1.3.6.1.4.1.99999.1"),
                critical: false,
                extn_value: OctetString::new(vec![0x5A; padding]).unwrap(),
            }]
        });
        let tst_info = TstInfo {
            version: 1,
            policy: ObjectIdentifier::new_unwrap("1.2.3.4.1"),
            message_imprint: request.message_imprint.clone(),
            serial_number: Uint::new(&serial.to_be_bytes()).unwrap(),
            gen_time: GeneralizedTime::from_unix_duration(Duration::from_secs(1_767_225_600)).unwrap(),
            accuracy: None,
            ordering: false,
            nonce: request.nonce.clone(),
            tsa: None,
            extensions,
        };

        let econtent = OctetString::new(tst_info.to_der().unwrap()).unwrap();
        let encap = EncapsulatedContentInfo {
            econtent_type: OID_CT_TSTINFO,
            econtent: Some(Any::from_der(&econtent.to_der().unwrap()).unwrap()),
        };
        let digest_algorithm = AlgorithmIdentifierOwned {
            oid: DigestAlgorithm::Sha256.oid(),
            parameters: None,
        };
        let sid = SignerIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber {
            issuer: self.certificate.tbs_certificate.issuer.clone(),
            serial_number: self.certificate.tbs_certificate.serial_number.clone(),
        });

        let signer = SigningKey::<Sha256>::new(self.key.clone());
        let signer_info =
            SignerInfoBuilder::new(&signer, sid, digest_algorithm.clone(), &encap, None).unwrap();
        let mut builder = SignedDataBuilder::new(&encap);
        builder.add_digest_algorithm(digest_algorithm).unwrap();
        builder
            .add_certificate(CertificateChoices::Certificate(self.certificate.clone()))
            .unwrap();
        builder
            .add_signer_info::<SigningKey<Sha256>, rsa::pkcs1v15::Signature>(signer_info)
            .unwrap();
        let token = builder.build().unwrap();

        TimeStampResp {
            status: PkiStatusInfo {
                status: 0,
                status_string: None,
                fail_info: None,
            },
            time_stamp_token: Some(token),
        }
        .to_der()
        .unwrap()
    }
}

enum Route {
    Body(Vec<u8>),
    Tsa(Arc<MockTsa>),
}

/// In-memory [`HttpTransport`] with per-URL routes and a call log.
///
/// Unknown URLs answer 404.
pub struct MockTransport {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_body(self, url: &str, body: &[u8]) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Route::Body(body.to_vec()));
        self
    }

    pub fn with_tsa(self, url: &str, tsa: Arc<MockTsa>) -> Self {
        self.routes.lock().unwrap().insert(url.to_string(), Route::Tsa(tsa));
        self
    }

    /// Stop serving `url`; later requests answer 404.
    pub fn remove_route(&self, url: &str) {
        self.routes.lock().unwrap().remove(url);
    }

    /// Every URL requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    fn not_found(url: &str) -> Error {
        Error::HttpStatus {
            url: url.to_string(),
            status: 404,
        }
    }
}

impl HttpTransport for MockTransport {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push(url.to_string());
        match self.routes.lock().unwrap().get(url) {
            Some(Route::Body(body)) => Ok(body.clone()),
            _ => Err(Self::not_found(url)),
        }
    }

    fn post(&self, url: &str, content_type: &str, body: &[u8]) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push(url.to_string());
        match self.routes.lock().unwrap().get(url) {
            Some(Route::Tsa(tsa)) => {
                assert_eq!(content_type, TIMESTAMP_QUERY_CONTENT_TYPE);
                Ok(tsa.respond(body))
            },
            Some(Route::Body(response)) => {
                assert_eq!(content_type, OCSP_REQUEST_CONTENT_TYPE);
                Ok(response.clone())
            },
            None => Err(Self::not_found(url)),
        }
    }
}

/// Transport serving the signature TSA, the document TSA, an empty CRL and
/// a good OCSP response for the signer.
pub fn online_transport(tsa: Arc<MockTsa>) -> Arc<MockTransport> {
    Arc::new(
        MockTransport::new()
            .with_tsa(TSA_URL, tsa.clone())
            .with_tsa(DOC_TSA_URL, tsa)
            .with_body(CRL_URL, CRL_EMPTY)
            .with_body(OCSP_URL, OCSP_SIGNER_GOOD),
    )
}

pub fn level_b(transport: Arc<MockTransport>) -> PadesLevelB {
    PadesLevelB {
        private_key: Some(signer_key()),
        certificate: Some(certificate(SIGNER)),
        ca_certificate: Some(certificate(CA)),
        ..Default::default()
    }
    .with_transport(transport)
}

pub fn level_t(transport: Arc<MockTransport>) -> PadesLevelT {
    PadesLevelT {
        private_key: Some(signer_key()),
        certificate: Some(certificate(SIGNER)),
        ca_certificate: Some(certificate(CA)),
        certificate_timestamp_server_url: Some(TSA_URL.to_string()),
        ..Default::default()
    }
    .with_transport(transport)
}

pub fn level_lt(transport: Arc<MockTransport>) -> PadesLevelLT {
    PadesLevelLT {
        private_key: Some(signer_key()),
        certificate: Some(certificate(SIGNER)),
        ca_certificate: Some(certificate(CA)),
        certificate_timestamp_server_url: Some(TSA_URL.to_string()),
        crl_distribution_points: vec![CRL_URL.to_string()],
        ocsp_servers: vec![OCSP_URL.to_string()],
        ..Default::default()
    }
    .with_transport(transport)
}

pub fn level_lta(transport: Arc<MockTransport>) -> PadesLevelLTA {
    PadesLevelLTA {
        private_key: Some(signer_key()),
        certificate: Some(certificate(SIGNER)),
        ca_certificate: Some(certificate(CA)),
        certificate_timestamp_server_url: Some(TSA_URL.to_string()),
        crl_distribution_points: vec![CRL_URL.to_string()],
        ocsp_servers: vec![OCSP_URL.to_string()],
        timestamp_server_url: Some(DOC_TSA_URL.to_string()),
        ..Default::default()
    }
    .with_transport(transport)
}
