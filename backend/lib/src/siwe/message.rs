//! EIP-4361 message model
//!
//! The parser is strict: fields must appear in the order mandated by the
//! EIP-4361 grammar, separated by single LF characters, without trailing
//! whitespace. This guarantees that for every message accepted by
//! [`SignInMessage::from_str`] the [`Display`](fmt::Display) output is
//! byte-for-byte identical to the parsed input, so the bytes checked against
//! the signature are always the canonical ones.

use std::{fmt, str::FromStr};

use chrono::{DateTime, SecondsFormat, Utc};
use url::Url;

use crate::constants::siwe::MESSAGE_VERSION;

const PREAMBLE: &str = " wants you to sign in with your Ethereum account:";
const URI_TAG: &str = "URI: ";
const VERSION_TAG: &str = "Version: ";
const CHAIN_ID_TAG: &str = "Chain ID: ";
const NONCE_TAG: &str = "Nonce: ";
const ISSUED_AT_TAG: &str = "Issued At: ";
const EXPIRATION_TIME_TAG: &str = "Expiration Time: ";
const NOT_BEFORE_TAG: &str = "Not Before: ";
const REQUEST_ID_TAG: &str = "Request ID: ";
const RESOURCES_TAG: &str = "Resources:";
const RESOURCE_PREFIX: &str = "- ";

/// Reasons a text could not be read as a SIWE message
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("message is empty")]
    Empty,

    #[error("invalid header line")]
    InvalidHeader,

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("unsupported version: {0}")]
    UnsupportedVersion(String),

    #[error("unexpected content on line {line}")]
    UnexpectedLine { line: usize },
}

impl ParseError {
    fn invalid(field: &'static str, reason: impl ToString) -> Self {
        Self::InvalidField {
            field,
            reason: reason.to_string(),
        }
    }
}

/// An RFC 3339 timestamp that remembers how it was written
///
/// Kept verbatim so that re-serializing a parsed message reproduces the
/// exact text the wallet signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    raw: String,
    value: DateTime<Utc>,
}

impl Timestamp {
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.value
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self {
            raw: value.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            value,
        }
    }
}

impl FromStr for Timestamp {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc);
        Ok(Self {
            raw: s.to_string(),
            value,
        })
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A parsed Sign-In with Ethereum message
///
/// `address`, `uri` and `resources` hold the text as written by the client;
/// their format is checked by the parser (URIs) or by the verifier (address)
/// but never rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInMessage {
    pub scheme: Option<String>,
    pub domain: String,
    pub address: String,
    pub statement: Option<String>,
    pub uri: String,
    pub version: String,
    pub chain_id: u64,
    pub nonce: String,
    pub issued_at: Timestamp,
    pub expiration_time: Option<Timestamp>,
    pub not_before: Option<Timestamp>,
    pub request_id: Option<String>,
    pub resources: Vec<String>,
}

/// Line cursor over a message, tracking 1-based line numbers for errors
struct Lines<'a> {
    inner: std::iter::Peekable<std::iter::Enumerate<std::str::Split<'a, char>>>,
}

impl<'a> Lines<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            inner: text.split('\n').enumerate().peekable(),
        }
    }

    fn next_line(&mut self, field: &'static str) -> Result<&'a str, ParseError> {
        self.inner
            .next()
            .map(|(_, line)| line)
            .ok_or(ParseError::MissingField(field))
    }

    fn blank(&mut self, field: &'static str) -> Result<(), ParseError> {
        match self.inner.next() {
            Some((_, "")) => Ok(()),
            Some((index, _)) => Err(ParseError::UnexpectedLine { line: index + 1 }),
            None => Err(ParseError::MissingField(field)),
        }
    }

    fn tagged(&mut self, tag: &'static str, field: &'static str) -> Result<&'a str, ParseError> {
        self.next_line(field)?
            .strip_prefix(tag)
            .ok_or(ParseError::MissingField(field))
    }

    fn optional_tagged(&mut self, tag: &'static str) -> Option<&'a str> {
        match self.inner.peek() {
            Some((_, line)) if line.starts_with(tag) => {
                self.inner.next().and_then(|(_, line)| line.strip_prefix(tag))
            }
            _ => None,
        }
    }

    fn peek_is(&mut self, expected: &str) -> bool {
        matches!(self.inner.peek(), Some((_, line)) if *line == expected)
    }

    fn finish(mut self) -> Result<(), ParseError> {
        match self.inner.next() {
            None => Ok(()),
            Some((index, _)) => Err(ParseError::UnexpectedLine { line: index + 1 }),
        }
    }
}

fn parse_header(line: &str) -> Result<(Option<String>, String), ParseError> {
    let authority = line.strip_suffix(PREAMBLE).ok_or(ParseError::InvalidHeader)?;

    let (scheme, domain) = match authority.split_once("://") {
        Some((scheme, domain)) => (Some(scheme), domain),
        None => (None, authority),
    };

    if let Some(scheme) = scheme {
        let mut chars = scheme.chars();
        let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !valid {
            return Err(ParseError::InvalidHeader);
        }
    }

    if domain.is_empty() || domain.contains(|c: char| c.is_whitespace() || c == '/') {
        return Err(ParseError::InvalidHeader);
    }

    Ok((scheme.map(str::to_string), domain.to_string()))
}

fn parse_uri(value: &str, field: &'static str) -> Result<String, ParseError> {
    Url::parse(value).map_err(|e| ParseError::invalid(field, e))?;
    Ok(value.to_string())
}

fn parse_chain_id(value: &str) -> Result<u64, ParseError> {
    // Digits only and no leading zero, so the value re-serializes unchanged
    if value.is_empty()
        || !value.bytes().all(|b| b.is_ascii_digit())
        || (value.len() > 1 && value.starts_with('0'))
    {
        return Err(ParseError::invalid("Chain ID", "not a canonical decimal integer"));
    }

    match value.parse::<u64>() {
        Ok(0) => Err(ParseError::invalid("Chain ID", "must be positive")),
        Ok(chain_id) => Ok(chain_id),
        Err(e) => Err(ParseError::invalid("Chain ID", e)),
    }
}

fn parse_timestamp(value: &str, field: &'static str) -> Result<Timestamp, ParseError> {
    value
        .parse::<Timestamp>()
        .map_err(|e| ParseError::invalid(field, e))
}

impl FromStr for SignInMessage {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseError::Empty);
        }

        let mut lines = Lines::new(s);

        let (scheme, domain) = parse_header(lines.next_line("domain")?)?;
        let address = lines.next_line("address")?.to_string();
        lines.blank("statement")?;

        let statement = if lines.peek_is("") {
            lines.blank("statement")?;
            None
        } else {
            let statement = lines.next_line("statement")?;
            if statement.starts_with(URI_TAG) {
                return Err(ParseError::MissingField("statement separator"));
            }
            lines.blank("URI")?;
            Some(statement.to_string())
        };

        let uri = parse_uri(lines.tagged(URI_TAG, "URI")?, "URI")?;

        let version = lines.tagged(VERSION_TAG, "Version")?;
        if version != MESSAGE_VERSION {
            return Err(ParseError::UnsupportedVersion(version.to_string()));
        }

        let chain_id = parse_chain_id(lines.tagged(CHAIN_ID_TAG, "Chain ID")?)?;

        let nonce = lines.tagged(NONCE_TAG, "Nonce")?;
        if nonce.is_empty() || !nonce.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ParseError::invalid("Nonce", "must be non-empty and alphanumeric"));
        }

        let issued_at = parse_timestamp(lines.tagged(ISSUED_AT_TAG, "Issued At")?, "Issued At")?;

        let expiration_time = lines
            .optional_tagged(EXPIRATION_TIME_TAG)
            .map(|value| parse_timestamp(value, "Expiration Time"))
            .transpose()?;
        let not_before = lines
            .optional_tagged(NOT_BEFORE_TAG)
            .map(|value| parse_timestamp(value, "Not Before"))
            .transpose()?;
        let request_id = lines.optional_tagged(REQUEST_ID_TAG).map(str::to_string);

        let mut resources = Vec::new();
        if lines.peek_is(RESOURCES_TAG) {
            lines.next_line("Resources")?;
            while let Some(resource) = lines.optional_tagged(RESOURCE_PREFIX) {
                resources.push(parse_uri(resource, "Resources")?);
            }
            // an empty list would not be written back
            if resources.is_empty() {
                return Err(ParseError::MissingField("Resources"));
            }
        }

        lines.finish()?;

        Ok(Self {
            scheme,
            domain,
            address,
            statement,
            uri,
            version: version.to_string(),
            chain_id,
            nonce: nonce.to_string(),
            issued_at,
            expiration_time,
            not_before,
            request_id,
            resources,
        })
    }
}

impl fmt::Display for SignInMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scheme) = &self.scheme {
            write!(f, "{scheme}://")?;
        }
        writeln!(f, "{}{PREAMBLE}", self.domain)?;
        writeln!(f, "{}", self.address)?;
        writeln!(f)?;
        if let Some(statement) = &self.statement {
            writeln!(f, "{statement}")?;
        }
        writeln!(f)?;
        writeln!(f, "{URI_TAG}{}", self.uri)?;
        writeln!(f, "{VERSION_TAG}{}", self.version)?;
        writeln!(f, "{CHAIN_ID_TAG}{}", self.chain_id)?;
        writeln!(f, "{NONCE_TAG}{}", self.nonce)?;
        write!(f, "{ISSUED_AT_TAG}{}", self.issued_at)?;
        if let Some(expiration_time) = &self.expiration_time {
            write!(f, "\n{EXPIRATION_TIME_TAG}{expiration_time}")?;
        }
        if let Some(not_before) = &self.not_before {
            write!(f, "\n{NOT_BEFORE_TAG}{not_before}")?;
        }
        if let Some(request_id) = &self.request_id {
            write!(f, "\n{REQUEST_ID_TAG}{request_id}")?;
        }
        if !self.resources.is_empty() {
            write!(f, "\n{RESOURCES_TAG}")?;
            for resource in &self.resources {
                write!(f, "\n{RESOURCE_PREFIX}{resource}")?;
            }
        }
        Ok(())
    }
}

/// Checks the `0x` + 40 hex digits shape of an account string
///
/// Mixed case is accepted, EIP-55 checksums are not enforced.
pub fn is_eth_address(address: &str) -> bool {
    address
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    const FULL_MESSAGE: &str = "https://example.com wants you to sign in with your Ethereum account:
0x70997970C51812dc3A010C7d01b50e0d17dc79C8

Sign-In with Ethereum to the app.

URI: https://example.com
Version: 1
Chain ID: 1
Nonce: 3cb7760eac2f
Issued At: 2022-02-14T22:27:35.500Z
Expiration Time: 2022-02-14T22:32:35.500Z
Not Before: 2022-02-14T22:27:35.500Z
Request ID: login-42
Resources:
- https://example.com/terms
- ipfs://bafybeiemxf5abjwjbikoz4mc3a3dla6ual3jsgpdr4cjr3oz3evfyavhwq";

    const MINIMAL_MESSAGE: &str = "example.com wants you to sign in with your Ethereum account:
0x70997970C51812dc3A010C7d01b50e0d17dc79C8


URI: https://example.com
Version: 1
Chain ID: 11155111
Nonce: abc123
Issued At: 2022-02-14T22:27:35Z";

    #[test]
    fn parses_all_fields() {
        let message: SignInMessage = FULL_MESSAGE.parse().unwrap();

        assert_eq!(message.scheme.as_deref(), Some("https"));
        assert_eq!(message.domain, "example.com");
        assert_eq!(message.address, "0x70997970C51812dc3A010C7d01b50e0d17dc79C8");
        assert_eq!(
            message.statement.as_deref(),
            Some("Sign-In with Ethereum to the app.")
        );
        assert_eq!(message.uri, "https://example.com");
        assert_eq!(message.version, "1");
        assert_eq!(message.chain_id, 1);
        assert_eq!(message.nonce, "3cb7760eac2f");
        assert_eq!(
            message.issued_at.as_datetime(),
            Utc.with_ymd_and_hms(2022, 2, 14, 22, 27, 35).unwrap()
                + chrono::Duration::milliseconds(500)
        );
        assert!(message.expiration_time.is_some());
        assert!(message.not_before.is_some());
        assert_eq!(message.request_id.as_deref(), Some("login-42"));
        assert_eq!(message.resources.len(), 2);
    }

    #[test]
    fn serialization_reproduces_input() {
        for text in [FULL_MESSAGE, MINIMAL_MESSAGE] {
            let message: SignInMessage = text.parse().unwrap();
            assert_eq!(message.to_string(), text);
        }
    }

    #[test]
    fn statement_is_optional() {
        let message: SignInMessage = MINIMAL_MESSAGE.parse().unwrap();

        assert_eq!(message.scheme, None);
        assert_eq!(message.statement, None);
        assert_eq!(message.chain_id, 11_155_111);
        assert!(message.resources.is_empty());
    }

    #[test]
    fn timestamps_keep_their_original_text() {
        let ts: Timestamp = "2022-02-14T23:27:35.5+01:00".parse().unwrap();

        assert_eq!(ts.as_str(), "2022-02-14T23:27:35.5+01:00");
        assert_eq!(
            ts.as_datetime(),
            Utc.with_ymd_and_hms(2022, 2, 14, 22, 27, 35).unwrap()
                + chrono::Duration::milliseconds(500)
        );
    }

    #[test]
    fn rejects_empty_message() {
        assert_eq!("".parse::<SignInMessage>(), Err(ParseError::Empty));
    }

    #[test]
    fn rejects_bad_header() {
        let text = MINIMAL_MESSAGE.replace("wants you to sign in", "would like you to sign in");
        assert_eq!(text.parse::<SignInMessage>(), Err(ParseError::InvalidHeader));

        let text = MINIMAL_MESSAGE.replace("example.com wants", "exa mple.com wants");
        assert_eq!(text.parse::<SignInMessage>(), Err(ParseError::InvalidHeader));
    }

    #[test]
    fn rejects_wrong_version() {
        let text = MINIMAL_MESSAGE.replace("Version: 1", "Version: 2");
        assert_eq!(
            text.parse::<SignInMessage>(),
            Err(ParseError::UnsupportedVersion("2".to_string()))
        );
    }

    #[test]
    fn rejects_missing_mandatory_fields() {
        let without_nonce = MINIMAL_MESSAGE.replace("Nonce: abc123\n", "");
        assert_eq!(
            without_nonce.parse::<SignInMessage>(),
            Err(ParseError::MissingField("Nonce"))
        );

        let truncated = MINIMAL_MESSAGE
            .split("\nIssued At")
            .next()
            .unwrap()
            .to_string();
        assert_eq!(
            truncated.parse::<SignInMessage>(),
            Err(ParseError::MissingField("Issued At"))
        );

        let without_uri = MINIMAL_MESSAGE.replace("URI: https://example.com\n", "");
        assert!(without_uri.parse::<SignInMessage>().is_err());
    }

    #[test]
    fn rejects_non_canonical_chain_ids() {
        for chain_id in ["0", "01", "+1", "-1", "one", ""] {
            let text = MINIMAL_MESSAGE.replace("Chain ID: 11155111", &format!("Chain ID: {chain_id}"));
            assert!(
                matches!(
                    text.parse::<SignInMessage>(),
                    Err(ParseError::InvalidField { field: "Chain ID", .. })
                ),
                "chain id {chain_id:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_relative_uri() {
        let text = MINIMAL_MESSAGE.replace("URI: https://example.com", "URI: /login");
        assert!(matches!(
            text.parse::<SignInMessage>(),
            Err(ParseError::InvalidField { field: "URI", .. })
        ));
    }

    #[test]
    fn rejects_non_alphanumeric_nonce() {
        let text = MINIMAL_MESSAGE.replace("Nonce: abc123", "Nonce: abc-123");
        assert!(matches!(
            text.parse::<SignInMessage>(),
            Err(ParseError::InvalidField { field: "Nonce", .. })
        ));
    }

    #[test]
    fn rejects_cosmetic_variations() {
        let crlf = MINIMAL_MESSAGE.replace('\n', "\r\n");
        assert!(crlf.parse::<SignInMessage>().is_err());

        let trailing_newline = format!("{MINIMAL_MESSAGE}\n");
        assert_eq!(
            trailing_newline.parse::<SignInMessage>(),
            Err(ParseError::UnexpectedLine { line: 10 })
        );

        let trailing_space = MINIMAL_MESSAGE.replace("Nonce: abc123", "Nonce: abc123 ");
        assert!(trailing_space.parse::<SignInMessage>().is_err());
    }

    #[test]
    fn rejects_resources_header_without_entries() {
        let text = format!("{MINIMAL_MESSAGE}\nResources:");

        assert_eq!(
            text.parse::<SignInMessage>(),
            Err(ParseError::MissingField("Resources"))
        );
    }

    #[test]
    fn rejects_unknown_trailing_fields() {
        let text = format!("{MINIMAL_MESSAGE}\nFavourite Colour: blue");
        assert_eq!(
            text.parse::<SignInMessage>(),
            Err(ParseError::UnexpectedLine { line: 10 })
        );
    }

    #[test]
    fn address_shape() {
        assert!(is_eth_address("0x1111111111111111111111111111111111111111"));
        assert!(is_eth_address("0x70997970C51812dc3A010C7d01b50e0d17dc79C8"));
        assert!(!is_eth_address("0X70997970C51812dc3A010C7d01b50e0d17dc79C8"));
        assert!(!is_eth_address("70997970C51812dc3A010C7d01b50e0d17dc79C8"));
        assert!(!is_eth_address("0x70997970C51812dc3A010C7d01b50e0d17dc79"));
        assert!(!is_eth_address("0x70997970C51812dc3A010C7d01b50e0d17dc79CZ"));
    }
}
