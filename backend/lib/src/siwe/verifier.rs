use std::str::FromStr;

use alloy_core::primitives::Address;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use url::Url;

use super::{
    message::{is_eth_address, SignInMessage},
    signature::recover_personal_sign,
};
use crate::constants::siwe::{
    DEFAULT_CLOCK_SKEW_SECS, DEFAULT_MAX_MESSAGE_AGE_SECS, MAX_MESSAGE_LENGTH,
    MAX_SIGNATURE_LENGTH,
};

/// Request-bound facts the caller vouches for
///
/// `origin_host` and `origin_url` must already have been checked against the
/// caller's origin allow-list. `session_nonce` is the nonce minted for this
/// session, or `None` if the session never requested one (or it was consumed).
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub origin_host: String,
    pub origin_url: Url,
    pub session_nonce: Option<String>,
    pub now: DateTime<Utc>,
    pub supported_chain_ids: Vec<u64>,
}

/// Why a sign-in attempt was refused
///
/// Meant for server-side diagnostics only, clients should only ever see a
/// generic failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RejectionReason {
    #[error("malformed message")]
    MalformedMessage,

    #[error("invalid address format")]
    InvalidAddressFormat,

    #[error("unsupported chain")]
    UnsupportedChain,

    #[error("origin mismatch")]
    OriginMismatch,

    #[error("nonce mismatch")]
    NonceMismatch,

    #[error("message expired")]
    MessageExpired,

    #[error("invalid signature")]
    SignatureInvalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    Accepted { address: Address, chain_id: u64 },
    Rejected { reason: RejectionReason },
}

impl VerificationResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    pub fn rejection(&self) -> Option<RejectionReason> {
        match self {
            Self::Accepted { .. } => None,
            Self::Rejected { reason } => Some(*reason),
        }
    }
}

/// Time windows applied by the freshness check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationPolicy {
    /// Oldest accepted `Issued At`, relative to the verification time (inclusive)
    pub max_age: Duration,
    /// How far in the future an `Issued At` may be
    pub clock_skew: Duration,
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        Self {
            max_age: Duration::seconds(DEFAULT_MAX_MESSAGE_AGE_SECS as i64),
            clock_skew: Duration::seconds(DEFAULT_CLOCK_SKEW_SECS as i64),
        }
    }
}

/// Stateless SIWE verifier
///
/// Every check is a pure function of the message, the signature and the
/// [`RequestContext`]; the verifier holds nothing but its policy and can be
/// shared freely between threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct Verifier {
    policy: VerificationPolicy,
}

impl Verifier {
    pub fn new(policy: VerificationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &VerificationPolicy {
        &self.policy
    }

    /// Verifies a claimed SIWE message and its signature
    ///
    /// Checks run in a fixed order and stop at the first failure:
    /// input size, structure, address format, chain, origin, nonce,
    /// freshness and finally the signature itself.
    pub fn verify(
        &self,
        raw_message: &str,
        signature: &str,
        ctx: &RequestContext,
    ) -> VerificationResult {
        match self.check(raw_message, signature, ctx) {
            Ok((address, chain_id)) => {
                debug!(target: "siwe::verifier", %address, chain_id, "SIWE message accepted");
                VerificationResult::Accepted { address, chain_id }
            }
            Err(reason) => {
                debug!(target: "siwe::verifier", %reason, "SIWE message rejected");
                VerificationResult::Rejected { reason }
            }
        }
    }

    fn check(
        &self,
        raw_message: &str,
        signature: &str,
        ctx: &RequestContext,
    ) -> Result<(Address, u64), RejectionReason> {
        check_input_sizes(raw_message, signature)?;

        let message = SignInMessage::from_str(raw_message).map_err(|e| {
            debug!(target: "siwe::verifier", error = %e, "Unable to parse SIWE message");
            RejectionReason::MalformedMessage
        })?;

        let address = check_address(&message.address)?;
        check_chain(&message, &ctx.supported_chain_ids)?;
        check_origin(&message, ctx)?;
        check_nonce(&message, ctx.session_nonce.as_deref())?;
        self.check_freshness(&message, ctx.now)?;
        check_signature(&message, &address, signature)?;

        Ok((address, message.chain_id))
    }

    fn check_freshness(
        &self,
        message: &SignInMessage,
        now: DateTime<Utc>,
    ) -> Result<(), RejectionReason> {
        let issued_at = message.issued_at.as_datetime();

        if now - issued_at > self.policy.max_age {
            return Err(RejectionReason::MessageExpired);
        }

        if issued_at - now > self.policy.clock_skew {
            return Err(RejectionReason::MessageExpired);
        }

        if let Some(expiration_time) = &message.expiration_time {
            if now >= expiration_time.as_datetime() {
                return Err(RejectionReason::MessageExpired);
            }
        }

        if let Some(not_before) = &message.not_before {
            if now < not_before.as_datetime() {
                return Err(RejectionReason::MessageExpired);
            }
        }

        Ok(())
    }
}

/// Verifies with the default [`VerificationPolicy`]
pub fn verify(raw_message: &str, signature: &str, ctx: &RequestContext) -> VerificationResult {
    Verifier::default().verify(raw_message, signature, ctx)
}

fn check_input_sizes(raw_message: &str, signature: &str) -> Result<(), RejectionReason> {
    if raw_message.is_empty() || signature.is_empty() {
        return Err(RejectionReason::MalformedMessage);
    }

    // Cheap byte-length short-circuit before counting characters
    if (raw_message.len() > MAX_MESSAGE_LENGTH
        && raw_message.chars().count() > MAX_MESSAGE_LENGTH)
        || (signature.len() > MAX_SIGNATURE_LENGTH
            && signature.chars().count() > MAX_SIGNATURE_LENGTH)
    {
        return Err(RejectionReason::MalformedMessage);
    }

    Ok(())
}

fn check_address(address: &str) -> Result<Address, RejectionReason> {
    if !is_eth_address(address) {
        return Err(RejectionReason::InvalidAddressFormat);
    }

    Address::from_str(address).map_err(|_| RejectionReason::InvalidAddressFormat)
}

fn check_chain(message: &SignInMessage, supported: &[u64]) -> Result<(), RejectionReason> {
    if supported.contains(&message.chain_id) {
        Ok(())
    } else {
        Err(RejectionReason::UnsupportedChain)
    }
}

fn check_origin(message: &SignInMessage, ctx: &RequestContext) -> Result<(), RejectionReason> {
    if message.domain != ctx.origin_host {
        return Err(RejectionReason::OriginMismatch);
    }

    if let Some(scheme) = &message.scheme {
        if scheme != ctx.origin_url.scheme() {
            return Err(RejectionReason::OriginMismatch);
        }
    }

    // Compared as origins rather than string prefixes, so that
    // `https://example.com.evil.com` does not pass for `https://example.com`
    let uri = Url::parse(&message.uri).map_err(|_| RejectionReason::OriginMismatch)?;
    if uri.origin() != ctx.origin_url.origin() {
        return Err(RejectionReason::OriginMismatch);
    }

    Ok(())
}

fn check_nonce(message: &SignInMessage, session_nonce: Option<&str>) -> Result<(), RejectionReason> {
    match session_nonce {
        Some(expected) if expected == message.nonce => Ok(()),
        _ => Err(RejectionReason::NonceMismatch),
    }
}

fn check_signature(
    message: &SignInMessage,
    address: &Address,
    signature: &str,
) -> Result<(), RejectionReason> {
    let canonical = message.to_string();

    let recovered = recover_personal_sign(canonical.as_bytes(), signature).map_err(|e| {
        debug!(target: "siwe::verifier", error = %e, "Unable to recover SIWE signer");
        RejectionReason::SignatureInvalid
    })?;

    if &recovered != address {
        debug!(
            target: "siwe::verifier",
            claimed = %address,
            %recovered,
            "SIWE signer does not match claimed address"
        );
        return Err(RejectionReason::SignatureInvalid);
    }

    Ok(())
}
