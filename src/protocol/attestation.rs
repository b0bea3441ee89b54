use alloy_primitives::{hex::FromHex, Bytes};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{RelayError, Result};

/// Signature bytes an attestor produced over an envelope's canonical encoding.
///
/// An attestation is consumed by value when it is registered on the
/// destination chain, so it cannot be submitted twice.
#[derive(Debug, PartialEq, Eq)]
pub struct Attestation {
    signature: Bytes,
}

impl Attestation {
    /// Wraps signature bytes, rejecting an empty signature.
    pub fn new(signature: Bytes) -> Result<Self> {
        if signature.is_empty() {
            return Err(RelayError::AttestationUnavailable {
                reason: "attestor returned an empty signature".to_string(),
            });
        }
        Ok(Self { signature })
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.signature
    }

    pub fn len(&self) -> usize {
        self.signature.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signature.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.signature
    }
}

/// Body sent to an HTTP attestor.
#[derive(Debug, Serialize)]
pub struct SignatureRequest {
    /// Canonical `(address, bytes)` encoding of the envelope
    pub data: Bytes,
}

/// Body returned by an HTTP attestor.
///
/// The signature is a hex string with or without a `0x` prefix. A null,
/// missing or empty value deserializes to `None`.
#[derive(Debug, Deserialize)]
pub struct SignatureResponse {
    #[serde(default, deserialize_with = "deserialize_optional_signature")]
    pub signature: Option<Bytes>,
}

fn deserialize_optional_signature<'de, D>(deserializer: D) -> std::result::Result<Option<Bytes>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;

    match opt {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => {
            let bytes = Bytes::from_hex(s).map_err(serde::de::Error::custom)?;
            Ok(Some(bytes))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_signature_is_unavailable() {
        let result = Attestation::new(Bytes::new());
        assert!(matches!(
            result,
            Err(RelayError::AttestationUnavailable { .. })
        ));
    }

    #[test]
    fn test_attestation_exposes_bytes() {
        let attestation = Attestation::new(Bytes::from_static(&[1, 2, 3])).unwrap();
        assert_eq!(attestation.len(), 3);
        assert_eq!(attestation.into_bytes().to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn test_deserialize_signature_with_prefix() {
        let json = r#"{"signature":"0x1234abcd"}"#;
        let response: SignatureResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            response.signature.unwrap().to_vec(),
            vec![0x12, 0x34, 0xab, 0xcd]
        );
    }

    #[test]
    fn test_deserialize_signature_without_prefix() {
        let json = r#"{"signature":"deadbeef"}"#;
        let response: SignatureResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            response.signature.unwrap().to_vec(),
            vec![0xde, 0xad, 0xbe, 0xef]
        );
    }

    #[test]
    fn test_deserialize_missing_null_or_empty_signature() {
        for json in [r#"{}"#, r#"{"signature":null}"#, r#"{"signature":""}"#] {
            let response: SignatureResponse = serde_json::from_str(json).unwrap();
            assert!(response.signature.is_none(), "{json}");
        }
    }

    #[test]
    fn test_deserialize_invalid_hex_fails() {
        let json = r#"{"signature":"not_valid_hex"}"#;
        assert!(serde_json::from_str::<SignatureResponse>(json).is_err());
    }

    #[test]
    fn test_request_serializes_hex() {
        let request = SignatureRequest {
            data: Bytes::from_static(&[0xca, 0xfe]),
        };
        insta::assert_snapshot!(serde_json::to_string(&request).unwrap(), @r#"{"data":"0xcafe"}"#);
    }
}
