//! Vault payload codec.
//!
//! The plaintext the vault guards: an ordered, version-tagged sequence of
//! keyring entries. Decode never panics: empty bytes are an empty
//! payload, and anything that fails validation is logged and treated as
//! empty rather than revived half-parsed.

use serde::{Deserialize, Serialize};
use shared_types::KeyringKind;
use tracing::warn;
use uuid::Uuid;
use zeroize::Zeroizing;

/// Current payload schema version.
pub const PAYLOAD_VERSION: u16 = 1;

/// One keyring in the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadEntry {
    pub id: Uuid,
    pub kind: KeyringKind,
    pub namespace: String,
    /// HD keyrings only.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub mnemonic: Option<String>,
    /// Private-key keyrings only; hex without prefix.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub private_key: Option<String>,
    /// HD derivation counter.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub derivation_index: Option<u32>,
}

/// The full payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyringPayload {
    pub version: u16,
    pub entries: Vec<PayloadEntry>,
}

impl KeyringPayload {
    /// A payload with no keyrings.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            version: PAYLOAD_VERSION,
            entries: Vec::new(),
        }
    }
}

/// Encode for the vault. The buffer zeroes on drop at the call site.
///
/// # Errors
///
/// Propagates serializer failures as `internal`.
pub fn encode(payload: &KeyringPayload) -> shared_types::WalletResult<Zeroizing<Vec<u8>>> {
    serde_json::to_vec(payload)
        .map(Zeroizing::new)
        .map_err(|e| shared_types::WalletError::internal(format!("payload encode failed: {e}")))
}

/// Decode a decrypted payload.
///
/// Empty bytes are the empty payload (a fresh vault). Parse failures and
/// version mismatches are logged and yield the empty payload.
#[must_use]
pub fn decode(bytes: &[u8]) -> KeyringPayload {
    if bytes.is_empty() {
        return KeyringPayload::empty();
    }
    match serde_json::from_slice::<KeyringPayload>(bytes) {
        Ok(payload) if payload.version == PAYLOAD_VERSION => payload,
        Ok(payload) => {
            warn!(
                version = payload.version,
                "unsupported payload version; treating as empty"
            );
            KeyringPayload::empty()
        }
        Err(error) => {
            warn!(%error, "invalid keyring payload; treating as empty");
            KeyringPayload::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> KeyringPayload {
        KeyringPayload {
            version: PAYLOAD_VERSION,
            entries: vec![PayloadEntry {
                id: Uuid::new_v4(),
                kind: KeyringKind::Hd,
                namespace: "eip155".into(),
                mnemonic: Some("test test junk".into()),
                private_key: None,
                derivation_index: Some(2),
            }],
        }
    }

    #[test]
    fn test_roundtrip() {
        let payload = sample();
        let bytes = encode(&payload).unwrap();
        let decoded = decode(&bytes);
        assert_eq!(decoded.entries.len(), 1);
        assert_eq!(decoded.entries[0].id, payload.entries[0].id);
        assert_eq!(decoded.entries[0].derivation_index, Some(2));
    }

    #[test]
    fn test_empty_bytes_are_empty_payload() {
        let decoded = decode(b"");
        assert_eq!(decoded.version, PAYLOAD_VERSION);
        assert!(decoded.entries.is_empty());
    }

    #[test]
    fn test_garbage_is_empty_payload_not_a_panic() {
        assert!(decode(b"{not json").entries.is_empty());
        assert!(decode(b"[1,2,3]").entries.is_empty());
    }

    #[test]
    fn test_future_version_is_empty_payload() {
        let mut payload = sample();
        payload.version = 99;
        let bytes = encode(&payload).unwrap();
        assert!(decode(&bytes).entries.is_empty());
    }
}
