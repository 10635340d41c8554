//! Document Security Store (ETSI TS 102 778-4).
//!
//! The DSS collects certificates, OCSP responses and CRLs for a whole
//! document. Each signature gets a VRI entry, keyed by the uppercase hex
//! SHA-1 of its `/Contents` bytes, listing the subset of evidence gathered
//! for that signature.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// Compute the VRI key of a signature: uppercase hex SHA-1 of `/Contents`.
///
/// The whole `/Contents` value is hashed, padding included.
pub fn signature_fingerprint(contents: &[u8]) -> String {
    hex::encode_upper(Sha1::digest(contents))
}

/// Evidence attached to one signature (a VRI entry).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DssCerts {
    /// DER-encoded certificates
    pub certs: Vec<Vec<u8>>,
    /// DER-encoded OCSP responses
    pub ocsps: Vec<Vec<u8>>,
    /// DER-encoded CRLs
    pub crls: Vec<Vec<u8>>,
}

impl DssCerts {
    /// Whether the entry carries no evidence at all.
    pub fn is_empty(&self) -> bool {
        self.certs.is_empty() && self.ocsps.is_empty() && self.crls.is_empty()
    }
}

/// Document Security Store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dss {
    /// All certificates in the document
    pub certs: Vec<Vec<u8>>,
    /// All OCSP responses in the document
    pub ocsps: Vec<Vec<u8>>,
    /// All CRLs in the document
    pub crls: Vec<Vec<u8>>,
    /// Per-signature evidence, keyed by [`signature_fingerprint`]
    pub vri: BTreeMap<String, DssCerts>,
}

impl Dss {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the evidence gathered for one signature.
    ///
    /// Blobs are appended to the document-wide collections (skipping exact
    /// duplicates) and the VRI entry for `fingerprint` points at exactly
    /// this batch.
    pub fn add_signature_evidence(&mut self, fingerprint: String, batch: DssCerts) {
        append_unique(&mut self.certs, &batch.certs);
        append_unique(&mut self.ocsps, &batch.ocsps);
        append_unique(&mut self.crls, &batch.crls);
        log::debug!(
            "DSS: VRI {} with {} certs, {} OCSPs, {} CRLs",
            fingerprint,
            batch.certs.len(),
            batch.ocsps.len(),
            batch.crls.len()
        );
        self.vri.insert(fingerprint, batch);
    }

    /// Look up the VRI entry for a signature fingerprint.
    pub fn vri_entry(&self, fingerprint: &str) -> Option<&DssCerts> {
        self.vri.get(fingerprint)
    }

    /// Whether the store holds nothing.
    pub fn is_empty(&self) -> bool {
        self.certs.is_empty() && self.ocsps.is_empty() && self.crls.is_empty() && self.vri.is_empty()
    }
}

fn append_unique(target: &mut Vec<Vec<u8>>, blobs: &[Vec<u8>]) {
    for blob in blobs {
        if !target.contains(blob) {
            target.push(blob.clone());
        }
    }
}

/// Read access to a parsed document's DSS.
///
/// Implemented by the document reader; validation only ever reads it.
pub trait DocumentSecurity {
    /// The document's DSS, if it has one.
    fn dss(&self) -> Option<&Dss>;
}

impl DocumentSecurity for Dss {
    fn dss(&self) -> Option<&Dss> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_uppercase_sha1() {
        // SHA-1("abc")
        assert_eq!(signature_fingerprint(b"abc"), "A9993E364706816ABA3E25717850C26C9CD0D89D");
    }

    #[test]
    fn test_fingerprint_covers_padding() {
        assert_ne!(signature_fingerprint(&[0x30, 0x00]), signature_fingerprint(&[0x30, 0x00, 0x00]));
    }

    #[test]
    fn test_vri_links_only_its_batch() {
        let mut dss = Dss::new();
        dss.add_signature_evidence(
            "AA".to_string(),
            DssCerts {
                certs: vec![vec![1], vec![2]],
                ocsps: vec![vec![3]],
                crls: vec![],
            },
        );
        dss.add_signature_evidence(
            "BB".to_string(),
            DssCerts {
                certs: vec![vec![2], vec![4]],
                ocsps: vec![],
                crls: vec![vec![5]],
            },
        );

        assert_eq!(dss.certs, vec![vec![1], vec![2], vec![4]]);
        assert_eq!(dss.ocsps, vec![vec![3]]);
        assert_eq!(dss.crls, vec![vec![5]]);
        assert_eq!(dss.vri_entry("BB").unwrap().certs, vec![vec![2], vec![4]]);
        assert!(dss.vri_entry("BB").unwrap().ocsps.is_empty());
        assert!(dss.vri_entry("CC").is_none());
    }

    #[test]
    fn test_dss_is_its_own_document_security() {
        let dss = Dss::new();
        assert!(dss.is_empty());
        assert!(DocumentSecurity::dss(&dss).is_some());
    }
}
