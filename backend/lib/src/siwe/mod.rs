//! Sign-In with Ethereum (EIP-4361) verification
//!
//! [`verify`] decides whether a client supplied message and signature form a
//! valid, fresh, single-use sign-in assertion for the requesting origin.
//! It is a pure function of its inputs: nonce bookkeeping, token issuance and
//! origin filtering belong to the caller (see [`crate::services::auth`]).

pub mod message;
pub mod signature;
pub mod verifier;

pub use message::{ParseError, SignInMessage, Timestamp};
pub use signature::{recover_personal_sign, SignatureError};
pub use verifier::{
    verify, RejectionReason, RequestContext, VerificationPolicy, VerificationResult, Verifier,
};
