use std::{io::IsTerminal, str::FromStr};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{
    auth::{
        DEFAULT_ALLOWED_ORIGINS, DEFAULT_JWT_SECRET, DEFAULT_NONCE_EXPIRATION_SECS,
        DEFAULT_NONCE_PURGE_INTERVAL_SECS, DEFAULT_SCHEME, DEFAULT_SESSION_DURATION_SECS,
        DEFAULT_STATEMENT, MIN_JWT_SECRET_LENGTH,
    },
    server::{DEFAULT_HOST, DEFAULT_PORT},
    siwe::{DEFAULT_CLOCK_SKEW_SECS, DEFAULT_MAX_MESSAGE_AGE_SECS, DEFAULT_SUPPORTED_CHAIN_IDS},
};
use crate::error::Error;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON when stdout is not a terminal, text otherwise
    #[default]
    Auto,
    /// Bunyan JSON lines
    Json,
    /// Human-readable text
    Text,
}

impl LogFormat {
    /// Resolves [`LogFormat::Auto`] by checking whether stdout is a TTY
    pub fn resolve(self) -> Self {
        match self {
            Self::Auto if std::io::stdout().is_terminal() => Self::Text,
            Self::Auto => Self::Json,
            other => other,
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            other => Err(format!("unknown log format: {other} (expected auto, json or text)")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret used to sign session tokens
    pub jwt_secret: String,
    /// Lifetime of an issued session token
    pub session_duration_secs: u64,
    /// How long a minted nonce stays redeemable
    pub nonce_expiration_secs: u64,
    /// Interval of the background sweep of expired nonces
    pub nonce_purge_interval_secs: u64,
    pub supported_chain_ids: Vec<u64>,
    pub max_message_age_secs: u64,
    pub clock_skew_secs: u64,
    /// Origins (scheme, host and port) allowed to sign in
    pub allowed_origins: Vec<String>,
    /// Scheme used to rebuild the origin from the `Host` header when no
    /// `Origin` header is sent
    pub default_scheme: String,
    /// Statement embedded in the messages prepared by the backend
    pub statement: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        // these are just some sane defaults, most likely we will
        // have them overridden
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            log_format: LogFormat::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            session_duration_secs: DEFAULT_SESSION_DURATION_SECS,
            nonce_expiration_secs: DEFAULT_NONCE_EXPIRATION_SECS,
            nonce_purge_interval_secs: DEFAULT_NONCE_PURGE_INTERVAL_SECS,
            supported_chain_ids: DEFAULT_SUPPORTED_CHAIN_IDS.to_vec(),
            max_message_age_secs: DEFAULT_MAX_MESSAGE_AGE_SECS,
            clock_skew_secs: DEFAULT_CLOCK_SKEW_SECS,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(|origin| origin.to_string())
                .collect(),
            default_scheme: DEFAULT_SCHEME.to_string(),
            statement: Some(DEFAULT_STATEMENT.to_string()),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> std::io::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Rejects configurations the auth flow cannot run safely with
    pub fn validate(&self) -> Result<(), Error> {
        self.auth.validate()
    }
}

impl AuthConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(Error::Config(format!(
                "jwt_secret must be at least {MIN_JWT_SECRET_LENGTH} bytes long"
            )));
        }

        if self.supported_chain_ids.is_empty() {
            return Err(Error::Config(
                "supported_chain_ids must not be empty".to_string(),
            ));
        }

        if self.supported_chain_ids.contains(&0) {
            return Err(Error::Config("chain id 0 is not valid".to_string()));
        }

        if self.max_message_age_secs == 0
            || self.nonce_expiration_secs == 0
            || self.nonce_purge_interval_secs == 0
        {
            return Err(Error::Config(
                "max_message_age_secs, nonce_expiration_secs and nonce_purge_interval_secs must be positive"
                    .to_string(),
            ));
        }

        if !matches!(self.default_scheme.as_str(), "http" | "https") {
            return Err(Error::Config(format!(
                "default_scheme must be http or https, got {}",
                self.default_scheme
            )));
        }

        if let Some(statement) = &self.statement {
            // must fit on the single statement line of the message
            if statement.is_empty() || statement.contains('\n') || statement.starts_with("URI: ")
            {
                return Err(Error::Config(
                    "statement must be a single non-empty line not starting with `URI: `"
                        .to_string(),
                ));
            }
        }

        self.parsed_allowed_origins().map(|_| ())
    }

    /// Parses the configured allow-list, rejecting anything that is not a
    /// bare http(s) origin
    pub fn parsed_allowed_origins(&self) -> Result<Vec<Url>, Error> {
        if self.allowed_origins.is_empty() {
            return Err(Error::Config("allowed_origins must not be empty".to_string()));
        }

        self.allowed_origins
            .iter()
            .map(|origin| {
                let url = Url::parse(origin)
                    .map_err(|e| Error::Config(format!("invalid allowed origin {origin}: {e}")))?;

                if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
                    return Err(Error::Config(format!(
                        "allowed origin {origin} must be an http(s) origin"
                    )));
                }

                if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
                    return Err(Error::Config(format!(
                        "allowed origin {origin} must not contain a path"
                    )));
                }

                Ok(url)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            port = 9000
            log_format = "json"

            [auth]
            supported_chain_ids = [1]
            allowed_origins = ["https://app.example.com"]
            "#,
        )
        .unwrap();

        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, 9000);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.auth.supported_chain_ids, vec![1]);
        assert_eq!(config.auth.jwt_secret, DEFAULT_JWT_SECRET);
        assert_eq!(config.auth.max_message_age_secs, DEFAULT_MAX_MESSAGE_AGE_SECS);
        config.validate().unwrap();
    }

    #[test]
    fn rejects_short_secret() {
        let mut config = Config::default();
        config.auth.jwt_secret = "short".to_string();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn rejects_bad_chain_lists() {
        let mut config = Config::default();
        config.auth.supported_chain_ids = vec![];
        assert!(config.validate().is_err());

        config.auth.supported_chain_ids = vec![1, 0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_statements_breaking_the_message_layout() {
        for statement in ["", "Line one\nLine two", "URI: https://example.com"] {
            let mut config = Config::default();
            config.auth.statement = Some(statement.to_string());
            assert!(
                matches!(config.validate(), Err(Error::Config(_))),
                "{statement:?} should be rejected"
            );
        }

        let mut config = Config::default();
        config.auth.statement = None;
        config.validate().unwrap();
    }

    #[test]
    fn rejects_origins_with_paths_or_odd_schemes() {
        for origin in ["https://example.com/app", "ftp://example.com", "not a url"] {
            let mut config = Config::default();
            config.auth.allowed_origins = vec![origin.to_string()];
            assert!(config.validate().is_err(), "{origin} should be rejected");
        }
    }

    #[test]
    fn log_format_from_str() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("text".parse::<LogFormat>(), Ok(LogFormat::Text));
        assert!("yaml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::Json.resolve(), LogFormat::Json);
        assert_ne!(LogFormat::Auto.resolve(), LogFormat::Auto);
    }
}
