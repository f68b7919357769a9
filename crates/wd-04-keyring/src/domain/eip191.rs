//! EIP-191 personal message envelope.

use shared_crypto::keccak256;

/// The digest `personal_sign` signs:
/// `keccak("\x19Ethereum Signed Message:\n" + len + message)`.
#[must_use]
pub fn personal_message_digest(message: &[u8]) -> [u8; 32] {
    let mut data = Vec::with_capacity(message.len() + 32);
    data.extend_from_slice(b"\x19Ethereum Signed Message:\n");
    data.extend_from_slice(message.len().to_string().as_bytes());
    data.extend_from_slice(message);
    keccak256(&data)
}
