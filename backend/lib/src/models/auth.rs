use alloy_core::primitives::Address;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct NonceRequest {
    /// Validated by the auth service, so malformed addresses surface as a 400
    pub address: String,
    #[serde(rename = "chainId")]
    pub chain_id: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NonceResponse {
    /// Prepared SIWE message, ready to be signed as-is
    pub message: String,
    pub nonce: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub message: String,
    pub signature: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UserProfile {
    #[serde(serialize_with = "crate::utils::serde::checksummed_address")]
    pub address: Address,
    #[serde(rename = "chainId")]
    pub chain_id: u64,
}

/// Projection of the session token exposed to clients
pub type SessionResponse = UserProfile;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtClaims {
    #[serde(serialize_with = "crate::utils::serde::checksummed_address")]
    pub address: Address,
    #[serde(rename = "chainId")]
    pub chain_id: u64,
    pub exp: i64,
    pub iat: i64,
}
