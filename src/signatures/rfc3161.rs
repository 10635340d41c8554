//! RFC 3161 Time-Stamp Protocol structures.
//!
//! ```text
//! TimeStampReq ::= SEQUENCE  {
//!     version          INTEGER  { v1(1) },
//!     messageImprint   MessageImprint,
//!     reqPolicy        TSAPolicyId              OPTIONAL,
//!     nonce            INTEGER                  OPTIONAL,
//!     certReq          BOOLEAN                  DEFAULT FALSE,
//!     extensions       [0] IMPLICIT Extensions  OPTIONAL  }
//! ```
//!
//! Only what a PAdES client needs is modelled: the request, the response
//! envelope and the `TSTInfo` carried as the token's encapsulated content.

use cms::content_info::ContentInfo;
use cms::signed_data::SignedData;
use der::asn1::{GeneralizedTime, ObjectIdentifier, OctetString, Uint};
use der::{Decode, Sequence};
use spki::AlgorithmIdentifierOwned;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::Extensions;

use crate::error::{Error, Result};

/// id-smime-aa-timeStampToken: 1.2.840.113549.1.9.16.2.14
pub const OID_TIMESTAMP_TOKEN_ATTR: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.2.14");
/// id-ct-TSTInfo: 1.2.840.113549.1.9.16.1.4
pub const OID_CT_TSTINFO: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.1.4");
/// id-signedData: 1.2.840.113549.1.7.2
pub const OID_SIGNED_DATA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.2");

/// PKIStatus `granted`
pub const STATUS_GRANTED: u8 = 0;
/// PKIStatus `grantedWithMods`
pub const STATUS_GRANTED_WITH_MODS: u8 = 1;

/// ```text
/// MessageImprint ::= SEQUENCE  {
///     hashAlgorithm    AlgorithmIdentifier,
///     hashedMessage    OCTET STRING  }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct MessageImprint {
    /// hash algorithm
    pub hash_algorithm: AlgorithmIdentifierOwned,
    /// hash of the data being timestamped
    pub hashed_message: OctetString,
}

impl MessageImprint {
    /// Compare algorithm OID and hash value, ignoring algorithm parameters.
    pub fn matches(&self, other: &MessageImprint) -> bool {
        self.hash_algorithm.oid == other.hash_algorithm.oid
            && self.hashed_message.as_bytes() == other.hashed_message.as_bytes()
    }
}

/// Time-stamp request.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct TimeStampReq {
    /// always 1
    pub version: u8,
    /// hash to be timestamped
    pub message_imprint: MessageImprint,
    /// requested TSA policy
    #[asn1(optional = "true")]
    pub req_policy: Option<ObjectIdentifier>,
    /// replay protection
    #[asn1(optional = "true")]
    pub nonce: Option<Uint>,
    /// ask the TSA to include its certificate
    #[asn1(default = "Default::default")]
    pub cert_req: bool,
    /// request extensions
    #[asn1(context_specific = "0", optional = "true", tag_mode = "IMPLICIT")]
    pub extensions: Option<Extensions>,
}

/// ```text
/// PKIStatusInfo ::= SEQUENCE {
///     status        PKIStatus,
///     statusString  PKIFreeText     OPTIONAL,
///     failInfo      PKIFailureInfo  OPTIONAL  }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct PkiStatusInfo {
    /// PKIStatus
    pub status: u8,
    /// free-form status text
    #[asn1(optional = "true")]
    pub status_string: Option<Vec<String>>,
    /// failure bits
    #[asn1(optional = "true")]
    pub fail_info: Option<der::asn1::BitString>,
}

impl PkiStatusInfo {
    /// Whether the TSA granted the request.
    pub fn is_granted(&self) -> bool {
        self.status == STATUS_GRANTED || self.status == STATUS_GRANTED_WITH_MODS
    }

    fn describe(&self) -> String {
        match &self.status_string {
            Some(text) if !text.is_empty() => format!("status {} ({})", self.status, text.join("; ")),
            _ => format!("status {}", self.status),
        }
    }
}

/// ```text
/// TimeStampResp ::= SEQUENCE  {
///     status                  PKIStatusInfo,
///     timeStampToken          TimeStampToken     OPTIONAL  }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct TimeStampResp {
    /// response status
    pub status: PkiStatusInfo,
    /// the token, a CMS `ContentInfo` wrapping `SignedData`
    #[asn1(optional = "true")]
    pub time_stamp_token: Option<ContentInfo>,
}

/// ```text
/// Accuracy ::= SEQUENCE {
///     seconds        INTEGER              OPTIONAL,
///     millis     [0] INTEGER  (1..999)    OPTIONAL,
///     micros     [1] INTEGER  (1..999)    OPTIONAL  }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct Accuracy {
    /// whole seconds
    #[asn1(optional = "true")]
    pub seconds: Option<u64>,
    /// milliseconds
    #[asn1(context_specific = "0", optional = "true", tag_mode = "IMPLICIT")]
    pub millis: Option<u16>,
    /// microseconds
    #[asn1(context_specific = "1", optional = "true", tag_mode = "IMPLICIT")]
    pub micros: Option<u16>,
}

/// `TSTInfo`, the signed content of a timestamp token.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct TstInfo {
    /// always 1
    pub version: u8,
    /// TSA policy under which the token was issued
    pub policy: ObjectIdentifier,
    /// copy of the request imprint
    pub message_imprint: MessageImprint,
    /// token serial number
    pub serial_number: Uint,
    /// time of issue
    pub gen_time: GeneralizedTime,
    /// clock accuracy
    #[asn1(optional = "true")]
    pub accuracy: Option<Accuracy>,
    /// ordering guarantee
    #[asn1(default = "Default::default")]
    pub ordering: bool,
    /// copy of the request nonce
    #[asn1(optional = "true")]
    pub nonce: Option<Uint>,
    /// TSA name
    #[asn1(context_specific = "0", optional = "true", tag_mode = "EXPLICIT")]
    pub tsa: Option<GeneralName>,
    /// token extensions
    #[asn1(context_specific = "1", optional = "true", tag_mode = "IMPLICIT")]
    pub extensions: Option<Extensions>,
}

impl TimeStampResp {
    /// Return the token if the TSA granted the request.
    pub fn into_granted_token(self) -> Result<ContentInfo> {
        if !self.status.is_granted() {
            return Err(Error::Timestamp(format!(
                "request rejected by TSA: {}",
                self.status.describe()
            )));
        }
        self.time_stamp_token
            .ok_or_else(|| Error::Timestamp("granted response carries no token".to_string()))
    }
}

/// Decode the `SignedData` of a timestamp token.
pub fn token_signed_data(token: &ContentInfo) -> Result<SignedData> {
    if token.content_type != OID_SIGNED_DATA {
        return Err(Error::Timestamp(format!(
            "token content type {} is not signedData",
            token.content_type
        )));
    }
    token.content.decode_as::<SignedData>().map_err(|e| Error::Timestamp(e.to_string()))
}

/// DER of the `TSTInfo` encapsulated in a timestamp token.
pub fn token_content(signed_data: &SignedData) -> Result<Vec<u8>> {
    let encap = &signed_data.encap_content_info;
    if encap.econtent_type != OID_CT_TSTINFO {
        return Err(Error::Timestamp(format!(
            "token content type {} is not TSTInfo",
            encap.econtent_type
        )));
    }
    let econtent = encap
        .econtent
        .as_ref()
        .ok_or_else(|| Error::Timestamp("token has no TSTInfo content".to_string()))?;
    let octets = econtent.decode_as::<OctetString>()?;
    Ok(octets.as_bytes().to_vec())
}

/// Decode the `TSTInfo` encapsulated in a timestamp token.
pub fn token_tst_info(signed_data: &SignedData) -> Result<TstInfo> {
    let content = token_content(signed_data)?;
    TstInfo::from_der(&content).map_err(|e| Error::Timestamp(format!("invalid TSTInfo: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use der::Encode;

    use crate::signatures::types::OID_SHA512;

    fn imprint(hash: &[u8]) -> MessageImprint {
        MessageImprint {
            hash_algorithm: AlgorithmIdentifierOwned {
                oid: OID_SHA512,
                parameters: None,
            },
            hashed_message: OctetString::new(hash.to_vec()).unwrap(),
        }
    }

    #[test]
    fn test_request_encodes_cert_req() {
        let req = TimeStampReq {
            version: 1,
            message_imprint: imprint(&[0xAB; 64]),
            req_policy: None,
            nonce: Some(Uint::new(&[0x01, 0x02, 0x03]).unwrap()),
            cert_req: true,
            extensions: None,
        };
        let der = req.to_der().unwrap();
        let decoded = TimeStampReq::from_der(&der).unwrap();
        assert!(decoded.cert_req);
        assert_eq!(decoded.nonce.unwrap().as_bytes(), &[0x01, 0x02, 0x03]);
    }

    #[test]
    fn test_imprint_match_ignores_parameters() {
        let a = imprint(&[1; 64]);
        let mut b = a.clone();
        b.hash_algorithm.parameters = Some(der::Any::from_der(&[0x05, 0x00]).unwrap());
        assert!(a.matches(&b));
        assert!(!a.matches(&imprint(&[2; 64])));
    }

    #[test]
    fn test_rejected_status() {
        let resp = TimeStampResp {
            status: PkiStatusInfo {
                status: 2,
                status_string: Some(vec!["bad alg".to_string()]),
                fail_info: None,
            },
            time_stamp_token: None,
        };
        let err = resp.into_granted_token().unwrap_err();
        assert!(format!("{}", err).contains("bad alg"));
    }
}
