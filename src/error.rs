//! Error types for PAdES signing and validation.
//!
//! Errors fall into four groups: configuration errors surfaced by the level
//! builders, transport errors from CRL/OCSP/timestamp exchanges, structural
//! errors found while decoding or verifying a signature, and capacity errors
//! when a signature no longer fits its reserved `/Contents` slot. Evidence-level
//! failures during validation are not errors; they are collected into
//! [`SignatureValidationResult::errors`](crate::signatures::SignatureValidationResult).

/// Result type alias for signature operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while signing or validating.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A field required by the selected PAdES level is missing
    #[error("field {0} is required")]
    MissingField(&'static str),

    /// `sign` was called on a handler that was never initialised
    #[error("signature handler is not initialised: call init_signature first")]
    NotInitialized,

    /// Private key could not be decoded
    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    /// Certificate could not be decoded
    #[error("Invalid certificate: {0}")]
    InvalidCertificate(String),

    /// HTTP request could not be completed
    #[error("HTTP request to {url} failed: {reason}")]
    Http {
        /// Target URL
        url: String,
        /// Transport failure description
        reason: String,
    },

    /// HTTP request completed with a non-success status code
    #[error("HTTP request to {url} returned status {status}")]
    HttpStatus {
        /// Target URL
        url: String,
        /// Status code returned by the server
        status: u16,
    },

    /// Response body is larger than the configured limit
    #[error("HTTP response from {url} exceeds {limit} bytes")]
    ResponseTooLarge {
        /// Target URL
        url: String,
        /// Configured maximum body size
        limit: u64,
    },

    /// Timestamp authority returned an unusable response
    #[error("Timestamp error: {0}")]
    Timestamp(String),

    /// OCSP response could not be decoded or does not match the certificate
    #[error("OCSP error: {0}")]
    Ocsp(String),

    /// CRL could not be decoded
    #[error("CRL error: {0}")]
    Crl(String),

    /// Signature bytes could not be decoded
    #[error("Failed to decode signature: {0}")]
    Decode(String),

    /// ASN.1 encoding or decoding error
    #[error("ASN.1 error: {0}")]
    Asn1(#[from] der::Error),

    /// The signed content digest does not match the message-digest attribute
    #[error("Content digest does not match the signed message digest")]
    DigestMismatch,

    /// The signature value or signer binding failed verification
    #[error("Signature verification failed: {0}")]
    SignatureInvalid(String),

    /// The CMS structure could not be produced
    #[error("Signing failed: {0}")]
    Signing(String),

    /// The encoded signature is larger than the space reserved for it
    #[error("Signature needs {required} bytes but only {reserved} bytes were reserved")]
    CapacityExceeded {
        /// Encoded signature length
        required: usize,
        /// Length frozen at initialisation
        reserved: usize,
    },

    /// The `/Contents` buffer was resized after initialisation
    #[error("Contents length changed after initialisation: expected {expected}, found {found}")]
    ContentsSizeChanged {
        /// Length frozen at initialisation
        expected: usize,
        /// Length found at signing time
        found: usize,
    },

    /// Byte range does not fit the document
    #[error("Invalid byte range: {0}")]
    InvalidByteRange(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
