//! Ledger write requests and their signature view.
//!
//! A request is signed in one of two mutually exclusive shapes:
//!
//! ```text
//! legacy:  { "identifier": "A", "signature": "..." }            signers = {A}
//! multi:   { "identifier": "A", "signatures": {"A": "...",
//!                                              "E": "..."} }     signers = {A, E}
//! ```
//!
//! The signer set is never empty. Requests violating that are rejected when
//! built or deserialized, so every [`Request`] in memory satisfies it.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A ledger identifier (DID).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Did(String);

impl Did {
    /// Create an identifier, rejecting empty or blank strings.
    pub fn new(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        if s.trim().is_empty() {
            return Err(Error::InvalidDid("identifier must not be empty".into()));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Did {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Did::new(s).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Did {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for Did {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Did::new(s)
    }
}

/// Who signed a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signatures {
    /// Legacy single signature, attributed to the request author.
    Single(String),
    /// Signer DID → signature payload.
    Multi(BTreeMap<Did, String>),
}

/// A submitted ledger write request.
///
/// Immutable once built. Use [`Request::builder`] or deserialize from the
/// ledger JSON shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRequest", into = "RawRequest")]
pub struct Request {
    identifier: Did,
    req_id: u64,
    operation: Value,
    protocol_version: Option<u32>,
    signatures: Signatures,
    endorser: Option<Did>,
}

impl Request {
    /// Start building a request authored by `identifier`.
    pub fn builder(identifier: Did) -> RequestBuilder {
        RequestBuilder::new(identifier)
    }

    /// The author DID.
    pub fn identifier(&self) -> &Did {
        &self.identifier
    }

    pub fn req_id(&self) -> u64 {
        self.req_id
    }

    /// Transaction payload. Opaque to the endorsement policy.
    pub fn operation(&self) -> &Value {
        &self.operation
    }

    pub fn protocol_version(&self) -> Option<u32> {
        self.protocol_version
    }

    pub fn signatures(&self) -> &Signatures {
        &self.signatures
    }

    /// The explicitly declared endorser, if any.
    pub fn endorser(&self) -> Option<&Did> {
        self.endorser.as_ref()
    }

    /// Distinct identifiers that signed this request.
    ///
    /// The key set of the multi-signature map, or the author alone for the
    /// legacy single-signature form. Never empty.
    pub fn signers(&self) -> BTreeSet<&Did> {
        match &self.signatures {
            Signatures::Single(_) => BTreeSet::from([&self.identifier]),
            Signatures::Multi(map) => map.keys().collect(),
        }
    }

    pub fn signer_count(&self) -> usize {
        match &self.signatures {
            Signatures::Single(_) => 1,
            Signatures::Multi(map) => map.len(),
        }
    }

    pub fn is_signed_by(&self, did: &Did) -> bool {
        match &self.signatures {
            Signatures::Single(_) => &self.identifier == did,
            Signatures::Multi(map) => map.contains_key(did),
        }
    }

    /// The author is the one and only signer.
    pub fn is_self_signed(&self) -> bool {
        self.signer_count() == 1 && self.is_signed_by(&self.identifier)
    }

    /// Hex SHA-256 over the canonical JSON of the signed payload.
    ///
    /// Signatures are excluded, so co-signing does not change the digest.
    pub fn digest(&self) -> Result<String> {
        let payload = serde_json::json!({
            "identifier": self.identifier,
            "reqId": self.req_id,
            "operation": self.operation,
            "protocolVersion": self.protocol_version,
            "endorser": self.endorser,
        });
        let bytes = serde_json::to_vec(&payload)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }

    /// Parse a request from its ledger JSON form.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Builder for [`Request`].
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    identifier: Did,
    req_id: u64,
    operation: Value,
    protocol_version: Option<u32>,
    signature: Option<String>,
    signatures: BTreeMap<Did, String>,
    endorser: Option<Did>,
}

impl RequestBuilder {
    fn new(identifier: Did) -> Self {
        Self {
            identifier,
            req_id: 0,
            operation: Value::Object(Default::default()),
            protocol_version: None,
            signature: None,
            signatures: BTreeMap::new(),
            endorser: None,
        }
    }

    pub fn req_id(mut self, req_id: u64) -> Self {
        self.req_id = req_id;
        self
    }

    pub fn operation(mut self, operation: Value) -> Self {
        self.operation = operation;
        self
    }

    pub fn protocol_version(mut self, version: u32) -> Self {
        self.protocol_version = Some(version);
        self
    }

    /// Use the legacy single-signature form, signed by the author.
    pub fn signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Add an entry to the multi-signature map.
    ///
    /// Signing twice with the same DID keeps the last signature.
    pub fn signed_by(mut self, signer: Did, signature: impl Into<String>) -> Self {
        self.signatures.insert(signer, signature.into());
        self
    }

    pub fn endorser(mut self, endorser: Did) -> Self {
        self.endorser = Some(endorser);
        self
    }

    pub fn build(self) -> Result<Request> {
        let signatures = match (self.signature, self.signatures.is_empty()) {
            (Some(_), false) => {
                return Err(Error::InvalidRequest(
                    "'signature' and 'signatures' are mutually exclusive".into(),
                ));
            }
            (Some(sig), true) => Signatures::Single(sig),
            (None, false) => Signatures::Multi(self.signatures),
            (None, true) => return Err(Error::MissingSignatures(self.identifier.to_string())),
        };

        Ok(Request {
            identifier: self.identifier,
            req_id: self.req_id,
            operation: self.operation,
            protocol_version: self.protocol_version,
            signatures,
            endorser: self.endorser,
        })
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRequest {
    identifier: Did,
    #[serde(default)]
    req_id: u64,
    #[serde(default)]
    operation: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    protocol_version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signatures: Option<BTreeMap<Did, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    endorser: Option<Did>,
}

impl TryFrom<RawRequest> for Request {
    type Error = Error;

    fn try_from(raw: RawRequest) -> Result<Self> {
        let mut builder = Request::builder(raw.identifier)
            .req_id(raw.req_id)
            .operation(raw.operation);
        if let Some(version) = raw.protocol_version {
            builder = builder.protocol_version(version);
        }
        if let Some(sig) = raw.signature {
            builder = builder.signature(sig);
        }
        match raw.signatures {
            Some(map) if map.is_empty() => {
                return Err(Error::MissingSignatures(builder.identifier.to_string()));
            }
            Some(map) => {
                for (did, sig) in map {
                    builder = builder.signed_by(did, sig);
                }
            }
            None => {}
        }
        if let Some(endorser) = raw.endorser {
            builder = builder.endorser(endorser);
        }
        builder.build()
    }
}

impl From<Request> for RawRequest {
    fn from(req: Request) -> Self {
        let (signature, signatures) = match req.signatures {
            Signatures::Single(sig) => (Some(sig), None),
            Signatures::Multi(map) => (None, Some(map)),
        };
        RawRequest {
            identifier: req.identifier,
            req_id: req.req_id,
            operation: req.operation,
            protocol_version: req.protocol_version,
            signature,
            signatures,
            endorser: req.endorser,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn did(s: &str) -> Did {
        Did::new(s).unwrap()
    }

    #[test]
    fn test_empty_did_rejected() {
        assert!(Did::new("").is_err());
        assert!(Did::new("   ").is_err());
        assert!(serde_json::from_str::<Did>("\"\"").is_err());
    }

    #[test]
    fn test_legacy_signature_attributed_to_author() {
        let req = Request::builder(did("author"))
            .signature("sig")
            .build()
            .unwrap();

        assert_eq!(req.signers(), BTreeSet::from([&did("author")]));
        assert!(req.is_self_signed());
        assert!(req.is_signed_by(&did("author")));
        assert!(!req.is_signed_by(&did("other")));
    }

    #[test]
    fn test_multi_signature_signers_are_keys() {
        let req = Request::builder(did("author"))
            .signed_by(did("endorser"), "sig1")
            .signed_by(did("author"), "sig2")
            .build()
            .unwrap();

        assert_eq!(req.signer_count(), 2);
        assert!(!req.is_self_signed());
        let signers: Vec<_> = req.signers().into_iter().map(Did::as_str).collect();
        assert_eq!(signers, vec!["author", "endorser"]);
    }

    #[test]
    fn test_single_non_author_signer_is_not_self_signed() {
        let req = Request::builder(did("author"))
            .signed_by(did("trustee"), "sig")
            .build()
            .unwrap();

        assert_eq!(req.signer_count(), 1);
        assert!(!req.is_self_signed());
        assert!(!req.is_signed_by(&did("author")));
    }

    #[test]
    fn test_signature_forms_are_exclusive() {
        let both = Request::builder(did("author"))
            .signature("sig")
            .signed_by(did("author"), "sig")
            .build();
        assert!(matches!(both, Err(Error::InvalidRequest(_))));

        let neither = Request::builder(did("author")).build();
        assert!(matches!(neither, Err(Error::MissingSignatures(_))));
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{
            "identifier": "author",
            "reqId": 7,
            "operation": {"type": "1", "dest": "target"},
            "protocolVersion": 2,
            "signatures": {"author": "s1", "endorser": "s2"},
            "endorser": "endorser"
        }"#;
        let req = Request::from_json(json).unwrap();

        assert_eq!(req.req_id(), 7);
        assert_eq!(req.protocol_version(), Some(2));
        assert_eq!(req.endorser(), Some(&did("endorser")));
        assert_eq!(req.operation()["dest"], "target");

        let back = Request::from_json(&req.to_json().unwrap()).unwrap();
        assert_eq!(back, req);
    }

    #[test]
    fn test_json_rejects_empty_signature_map() {
        let json = r#"{"identifier": "author", "signatures": {}}"#;
        let err = Request::from_json(json).unwrap_err();
        assert!(err.to_string().contains("carries no signatures"));
    }

    #[test]
    fn test_json_rejects_unsigned_request() {
        let err = Request::from_json(r#"{"identifier": "author"}"#).unwrap_err();
        assert!(err.to_string().contains("carries no signatures"));
    }

    #[test]
    fn test_json_rejects_both_signature_forms() {
        let json = r#"{"identifier": "author", "signature": "s", "signatures": {"author": "s"}}"#;
        let err = Request::from_json(json).unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"));
    }

    #[test]
    fn test_digest_ignores_signatures() {
        let one = Request::builder(did("author"))
            .req_id(1)
            .signature("sig")
            .build()
            .unwrap();
        let two = Request::builder(did("author"))
            .req_id(1)
            .signed_by(did("author"), "a")
            .signed_by(did("endorser"), "b")
            .build()
            .unwrap();
        let other = Request::builder(did("author"))
            .req_id(2)
            .signature("sig")
            .build()
            .unwrap();

        assert_eq!(one.digest().unwrap(), two.digest().unwrap());
        assert_ne!(one.digest().unwrap(), other.digest().unwrap());
        assert_eq!(one.digest().unwrap().len(), 64);
    }
}
