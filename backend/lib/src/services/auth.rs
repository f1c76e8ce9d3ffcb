use std::sync::Arc;

use alloy_core::primitives::Address;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{distributions::Alphanumeric, Rng};
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::{
    config::AuthConfig,
    constants::auth::{AUTH_FAILED_MESSAGE, NONCE_LENGTH},
    data::storage::BoxedStorage,
    error::Error,
    models::auth::{JwtClaims, NonceResponse, SessionResponse, UserProfile, VerifyResponse},
    siwe::{
        message::is_eth_address, RequestContext, SignInMessage, VerificationPolicy,
        VerificationResult, Verifier,
    },
};

mod extract;
pub use extract::{AuthenticatedUser, RequestOrigin};

/// Drives the sign-in flow around the stateless [`Verifier`]
///
/// Owns the nonce lifecycle (mint, store, consume) and the session tokens
/// handed out once a SIWE message is accepted.
#[derive(Clone)]
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    storage: Arc<dyn BoxedStorage>,
    verifier: Verifier,
    allowed_origins: Vec<Url>,
    default_scheme: String,
    supported_chain_ids: Vec<u64>,
    statement: Option<String>,
    session_duration: Duration,
    nonce_expiration_secs: u64,
}

impl AuthService {
    pub fn new(config: &AuthConfig, storage: Arc<dyn BoxedStorage>) -> Result<Self, Error> {
        let secret = config.jwt_secret.as_bytes();
        let policy = VerificationPolicy {
            max_age: seconds(config.max_message_age_secs),
            clock_skew: seconds(config.clock_skew_secs),
        };

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            storage,
            verifier: Verifier::new(policy),
            allowed_origins: config.parsed_allowed_origins()?,
            default_scheme: config.default_scheme.clone(),
            supported_chain_ids: config.supported_chain_ids.clone(),
            statement: config.statement.clone(),
            session_duration: seconds(config.session_duration_secs),
            nonce_expiration_secs: config.nonce_expiration_secs,
        })
    }

    /// Determines the origin a request comes from and checks it against the allow-list
    ///
    /// The `Origin` header is preferred; requests without it (same-origin
    /// navigations, non-browser clients) fall back to the `Host` header with
    /// the configured default scheme.
    pub fn resolve_origin(&self, origin: Option<&str>, host: Option<&str>) -> Result<Url, Error> {
        let candidate = match (origin, host) {
            (Some(origin), _) => origin.to_string(),
            (None, Some(host)) => format!("{}://{}", self.default_scheme, host),
            (None, None) => {
                return Err(Error::BadRequest(
                    "Missing Origin or Host header".to_string(),
                ))
            }
        };

        let url = Url::parse(&candidate).map_err(|_| {
            debug!(target: "auth_service::resolve_origin", origin = %candidate, "Unparsable origin");
            Error::Forbidden("Origin not allowed".to_string())
        })?;

        if !self
            .allowed_origins
            .iter()
            .any(|allowed| allowed.origin() == url.origin())
        {
            warn!(target: "auth_service::resolve_origin", origin = %candidate, "Origin not in allow-list");
            return Err(Error::Forbidden("Origin not allowed".to_string()));
        }

        Ok(url)
    }

    /// Mints a nonce for a new session and prepares the SIWE message to sign
    ///
    /// # Returns
    /// The session id the nonce is bound to, together with the message
    pub async fn challenge(
        &self,
        address: &str,
        chain_id: u64,
        origin: &Url,
    ) -> Result<(String, NonceResponse), Error> {
        if !is_eth_address(address) {
            return Err(Error::BadRequest("Invalid Ethereum address".to_string()));
        }
        let address: Address = address
            .parse()
            .map_err(|_| Error::BadRequest("Invalid Ethereum address".to_string()))?;

        if !self.supported_chain_ids.contains(&chain_id) {
            return Err(Error::BadRequest(format!("Unsupported chain: {chain_id}")));
        }

        let nonce = generate_nonce();
        let session_id = Uuid::now_v7().to_string();

        let issued_at = Utc::now();
        let message = SignInMessage {
            scheme: None,
            domain: origin_authority(origin),
            address: address.to_checksum(None),
            statement: self.statement.clone(),
            uri: origin.origin().ascii_serialization(),
            version: crate::constants::siwe::MESSAGE_VERSION.to_string(),
            chain_id,
            nonce: nonce.clone(),
            issued_at: issued_at.into(),
            expiration_time: issued_at
                .checked_add_signed(seconds(self.nonce_expiration_secs))
                .map(Into::into),
            not_before: None,
            request_id: None,
            resources: Vec::new(),
        };

        // must read back through the strict parser
        let message = message.to_string();
        if let Err(e) = message.parse::<SignInMessage>() {
            error!(target: "auth_service::challenge", error = %e, "Prepared SIWE message is unparsable");
            return Err(Error::Config(format!("prepared SIWE message is invalid: {e}")));
        }

        self.storage
            .store_nonce(session_id.clone(), nonce.clone(), self.nonce_expiration_secs)
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;

        debug!(target: "auth_service::challenge", %session_id, %address, chain_id, "Issued nonce");

        Ok((session_id, NonceResponse { message, nonce }))
    }

    /// Verifies a signed SIWE message and opens a session for its signer
    ///
    /// The session nonce is consumed whatever the outcome. Every rejection is
    /// reported to the client with the same generic error.
    pub async fn login(
        &self,
        message: &str,
        signature: &str,
        origin: &Url,
        session_id: Option<&str>,
    ) -> Result<VerifyResponse, Error> {
        let session_nonce = match session_id {
            Some(session_id) => self
                .storage
                .take_nonce(session_id)
                .await
                .map_err(|e| Error::Storage(e.to_string()))?,
            None => None,
        };

        let ctx = RequestContext {
            origin_host: origin_authority(origin),
            origin_url: origin.clone(),
            session_nonce,
            now: Utc::now(),
            supported_chain_ids: self.supported_chain_ids.clone(),
        };

        match self.verifier.verify(message, signature, &ctx) {
            VerificationResult::Accepted { address, chain_id } => {
                let token = self.encode_jwt(address, chain_id)?;
                info!(target: "auth_service::login", %address, chain_id, "User signed in");

                Ok(VerifyResponse {
                    token,
                    user: UserProfile { address, chain_id },
                })
            }
            VerificationResult::Rejected { reason } => {
                warn!(target: "auth_service::login", %reason, session = ?session_id, "Sign-in rejected");
                Err(Error::Unauthorized(AUTH_FAILED_MESSAGE.to_string()))
            }
        }
    }

    /// Origins allowed to sign in
    pub fn allowed_origins(&self) -> &[Url] {
        &self.allowed_origins
    }

    /// Projects validated session claims into the client facing session
    pub fn session(&self, claims: &JwtClaims) -> SessionResponse {
        SessionResponse {
            address: claims.address,
            chain_id: claims.chain_id,
        }
    }

    pub fn jwt_decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// Issues a session token for the given signer
    pub fn encode_jwt(&self, address: Address, chain_id: u64) -> Result<String, Error> {
        let now = Utc::now();
        let claims = JwtClaims {
            address,
            chain_id,
            iat: now.timestamp(),
            exp: now
                .checked_add_signed(self.session_duration)
                .ok_or(Error::Internal)?
                .timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(
            |e| {
                error!(target: "auth_service::encode_jwt", error = %e, "Unable to encode JWT");
                Error::Internal
            },
        )
    }

    /// Validates a session token and returns its claims
    pub fn decode_jwt(&self, token: &str) -> Result<JwtClaims, Error> {
        jsonwebtoken::decode::<JwtClaims>(token, self.jwt_decoding_key(), &jwt_validation())
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(target: "auth_service::decode_jwt", error = %e, "Rejected JWT");
                Error::Unauthorized("Invalid or expired token".to_string())
            })
    }
}

/// Validation rules applied to session tokens
pub fn jwt_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_required_spec_claims(&["exp", "iat"]);
    validation.leeway = 0;
    validation
}

fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LENGTH)
        .map(char::from)
        .collect()
}

/// `host[:port]`, with the port omitted when it is the scheme default
fn origin_authority(origin: &Url) -> String {
    let host = origin.host_str().unwrap_or_default();
    match origin.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

fn seconds(secs: u64) -> Duration {
    Duration::try_seconds(i64::try_from(secs).unwrap_or(i64::MAX)).unwrap_or(Duration::MAX)
}
