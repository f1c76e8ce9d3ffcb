//! EIP-191 `personal_sign` signature recovery

use alloy_core::primitives::{eip191_hash_message, Address};
use alloy_signer::{
    k256::ecdsa::{RecoveryId, Signature, VerifyingKey},
    utils::public_key_to_address,
};

/// Length of an `r || s || v` recoverable signature
pub const SIGNATURE_LENGTH: usize = 65;

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("signature must be 0x-prefixed")]
    MissingPrefix,

    #[error("signature is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("expected {SIGNATURE_LENGTH} signature bytes, got {0}")]
    InvalidLength(usize),

    #[error("invalid recovery id: {0}")]
    InvalidRecoveryId(u8),

    #[error("malformed signature: {0}")]
    Malformed(String),

    #[error("public key recovery failed: {0}")]
    Recovery(String),
}

/// Decodes a `0x` prefixed hex string into a 65 bytes signature
pub fn decode_signature(signature: &str) -> Result<[u8; SIGNATURE_LENGTH], SignatureError> {
    let hex_sig = signature
        .strip_prefix("0x")
        .ok_or(SignatureError::MissingPrefix)?;
    let bytes = hex::decode(hex_sig)?;

    <[u8; SIGNATURE_LENGTH]>::try_from(bytes.as_slice())
        .map_err(|_| SignatureError::InvalidLength(bytes.len()))
}

/// Accepts both the raw (0/1) and the legacy Ethereum (27/28) parity encodings
fn recovery_id(v: u8) -> Result<RecoveryId, SignatureError> {
    let parity = match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        _ => return Err(SignatureError::InvalidRecoveryId(v)),
    };

    RecoveryId::from_byte(parity).ok_or(SignatureError::InvalidRecoveryId(v))
}

/// Recovers the address that produced `signature` over the EIP-191
/// personal message hash of `message`
pub fn recover_personal_sign(message: &[u8], signature: &str) -> Result<Address, SignatureError> {
    let bytes = decode_signature(signature)?;
    let (rs, v) = bytes.split_at(64);

    let recovery_id = recovery_id(v[0])?;
    let signature =
        Signature::from_slice(rs).map_err(|e| SignatureError::Malformed(e.to_string()))?;

    let message_hash = eip191_hash_message(message);
    let verifying_key = VerifyingKey::recover_from_prehash(&message_hash.0, &signature, recovery_id)
        .map_err(|e| SignatureError::Recovery(e.to_string()))?;

    Ok(public_key_to_address(&verifying_key))
}
