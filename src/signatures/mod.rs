//! PAdES digital signatures.
//!
//! Signature handlers for ETSI PAdES conformance levels B, T, LT and LTA:
//!
//! - **B**: detached CAdES signature (`ETSI.CAdES.detached`)
//! - **T**: B plus an RFC 3161 signature timestamp
//! - **LT**: T plus revocation evidence (CRLs, OCSP responses, certificates)
//!   recorded in the Document Security Store
//! - **LTA**: LT plus a document timestamp (`ETSI.RFC3161`)
//!
//! ## Example
//!
//! ```ignore
//! use pdf_pades::signatures::{DigestAccumulator, PadesLevelT, PdfSignature, SignatureHandler};
//!
//! let mut handler = PadesLevelT {
//!     private_key: Some(key),
//!     certificate: Some(cert),
//!     ca_certificate: Some(ca),
//!     certificate_timestamp_server_url: Some("http://tsa.example.com".into()),
//!     ..Default::default()
//! }
//! .build()?;
//!
//! let mut sig = PdfSignature::new();
//! handler.init_signature(&mut sig)?;
//! // ... the writer lays out the file and feeds the ByteRange ...
//! let mut digest = handler.new_digest(&sig);
//! ByteRangeCalculator::feed_signed_bytes(&pdf, &byte_range, &mut digest)?;
//! handler.sign(&mut sig, &digest)?;
//! ```
//!
//! ## References
//!
//! - ISO 32000-2:2020 Section 12.8 - Digital Signatures
//! - ETSI TS 102 778 - PAdES
//! - ETSI TS 103 172 - PAdES baseline profile
//! - RFC 5652 (CMS), RFC 3161 (TSP), RFC 6960 (OCSP), RFC 5035 (ESS)

mod byterange;
mod digest;
mod doc_timestamp;
mod dss;
mod handler;
mod levels;
pub mod ocsp;
mod pades;
pub mod revocation;
pub mod rfc3161;
mod signer;
pub mod timestamp;
mod types;
mod verifier;

pub use byterange::ByteRangeCalculator;
pub use digest::DigestAccumulator;
pub use doc_timestamp::DocTimestampHandler;
pub use dss::{signature_fingerprint, DocumentSecurity, Dss, DssCerts};
pub use handler::SignatureHandler;
pub use levels::{PadesLevelB, PadesLevelLT, PadesLevelLTA, PadesLevelT};
pub use pades::{PadesConfig, PadesHandler, PadesValidationHandler};
pub use signer::{copy_into_reserved, CadesSigner, EssCertId, SigningCertificate, SIZE_PROBE};
pub use types::{
    DigestAlgorithm, PdfSignature, SignatureSubFilter, SignatureValidationResult, SigningCredentials,
    FILTER_ADOBE_PPKLITE,
};
pub use verifier::{decode_signed_data, Validator};
