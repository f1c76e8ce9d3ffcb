//! Configuration constants for the SIWE auth backend


/// Default server configuration
pub mod server {
    /// Default HTTP listening host
    pub const DEFAULT_HOST: &str = "127.0.0.1";

    /// Default HTTP server port
    pub const DEFAULT_PORT: u16 = 8080;

    /// Service name reported by the health endpoint and the JSON logger
    pub const SERVICE_NAME: &str = "siwe-auth-backend";
}

/// Sign-In with Ethereum verification limits and defaults
pub mod siwe {
    /// Maximum accepted length of a raw SIWE message
    ///
    /// Counted in Unicode scalar values (`str::chars`), not bytes or UTF-16 units.
    pub const MAX_MESSAGE_LENGTH: usize = 10_000;

    /// Maximum accepted length of a hex encoded signature, in Unicode scalar values
    pub const MAX_SIGNATURE_LENGTH: usize = 200;

    /// Only version of the EIP-4361 message format
    pub const MESSAGE_VERSION: &str = "1";

    /// Ethereum mainnet
    pub const MAINNET_CHAIN_ID: u64 = 1;

    /// Sepolia public testnet
    pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;

    pub const DEFAULT_SUPPORTED_CHAIN_IDS: [u64; 2] = [MAINNET_CHAIN_ID, SEPOLIA_CHAIN_ID];

    /// Maximum age of a message, measured from its `Issued At` field
    pub const DEFAULT_MAX_MESSAGE_AGE_SECS: u64 = 5 * 60;

    /// Tolerated amount of time an `Issued At` may be ahead of the server clock
    pub const DEFAULT_CLOCK_SKEW_SECS: u64 = 60;
}

/// Authentication flow configuration
pub mod auth {
    pub const AUTH_NONCE_ENDPOINT: &str = "/auth/nonce";
    pub const AUTH_VERIFY_ENDPOINT: &str = "/auth/verify";
    pub const AUTH_SESSION_ENDPOINT: &str = "/auth/session";

    /// Cookie binding a pending nonce to the browser that requested it
    pub const SESSION_COOKIE: &str = "siwe-session";

    /// Number of alphanumeric characters in a generated nonce
    pub const NONCE_LENGTH: usize = 17;

    /// How long a generated nonce can be redeemed for
    pub const DEFAULT_NONCE_EXPIRATION_SECS: u64 = 5 * 60;

    /// How often expired nonces are swept from the store
    pub const DEFAULT_NONCE_PURGE_INTERVAL_SECS: u64 = 5 * 60;

    /// Lifetime of an issued JWT (30 days)
    pub const DEFAULT_SESSION_DURATION_SECS: u64 = 30 * 24 * 60 * 60;

    /// Scheme assumed when the origin has to be derived from the `Host` header
    pub const DEFAULT_SCHEME: &str = "http";

    pub const DEFAULT_ALLOWED_ORIGINS: [&str; 2] =
        ["http://localhost:3000", "https://localhost:3000"];

    pub const DEFAULT_STATEMENT: &str = "Sign-In with Ethereum to the app.";

    /// Development-only signing secret, must be overridden in deployments
    pub const DEFAULT_JWT_SECRET: &str = "insecure-development-secret-change-me!";

    /// Minimum length in bytes of the JWT signing secret
    pub const MIN_JWT_SECRET_LENGTH: usize = 32;

    /// Message returned to clients for every failed sign-in attempt
    pub const AUTH_FAILED_MESSAGE: &str = "Authentication failed";
}
