// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::result_large_err)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # PDF PAdES
//!
//! PAdES signature handlers for PDF documents: detached CAdES signing, RFC 3161
//! timestamps, DSS/VRI revocation evidence and signature validation.
//!
//! ## Core Features
//!
//! - **Level builders**: PAdES B, T, LT and LTA with fail-fast configuration checks
//! - **CAdES signing**: detached CMS `SignedData` with the ESS signing-certificate
//!   attribute and RSA PKCS#1 v1.5 (SHA-1, SHA-256, SHA-512)
//! - **Two-pass sizing**: `/Contents` is sized once from a probe signature and
//!   never resized; an oversized signature is an error, never truncated
//! - **Timestamps**: RFC 3161 signature timestamps and `ETSI.RFC3161` document
//!   timestamps
//! - **Revocation evidence**: CRLs and OCSP responses collected into the
//!   Document Security Store, keyed per signature (VRI)
//! - **Validation**: integrity, signer binding and DSS evidence checks
//!
//! ## Architecture
//!
//! The PDF object model is not part of this crate. A document writer drives
//! [`signatures::SignatureHandler::init_signature`], lays out the file, feeds the
//! ByteRange into a [`signatures::DigestAccumulator`] and calls
//! [`signatures::SignatureHandler::sign`]. A document reader drives
//! validation and exposes its DSS through [`signatures::DocumentSecurity`].
//!
//! ## Quick Start
//!
//! ```ignore
//! use pdf_pades::signatures::{PadesLevelB, PdfSignature, SignatureHandler, SigningCredentials};
//!
//! # fn main() -> pdf_pades::Result<()> {
//! let credentials = SigningCredentials::from_pem(&cert_pem, &key_pem)?;
//! let mut handler = PadesLevelB {
//!     private_key: Some(credentials.rsa_private_key()?),
//!     certificate: Some(credentials.x509_certificate()?),
//!     ca_certificate: Some(ca),
//!     ..Default::default()
//! }
//! .build()?;
//!
//! let mut sig = PdfSignature::new();
//! handler.init_signature(&mut sig)?;
//! let mut digest = handler.new_digest(&sig);
//! std::io::Write::write_all(&mut digest, &signed_bytes)?;
//! handler.sign(&mut sig, &digest)?;
//!
//! let result = handler.validate(&sig, &digest)?;
//! assert!(result.is_verified);
//! # Ok(())
//! # }
//! ```
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Error handling
pub mod error;

// Configuration
pub mod config;

// CRL, OCSP and timestamp transport
pub mod http;

// PAdES signature handlers
pub mod signatures;

// Re-exports
pub use config::SigningConfig;
pub use error::{Error, Result};
pub use http::{HttpConfig, HttpTransport, UreqTransport};

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
