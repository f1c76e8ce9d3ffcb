//! Logging configuration and setup for the SIWE auth backend
//!
//! This module provides custom logging infrastructure:
//! - The choice between JSON logging using Bunyan format or human-readable text logging
//! - Auto-detection based on whether the output is a TTY (JSON if non-TTY, Text if TTY)
//! - A custom writer that replaces "log." prefix with "backend_log." in Bunyan logs
//! to avoid conflicts with reserved fields in log ingestion tools

use std::io::Write;

use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::{
    fmt::MakeWriter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use crate::{config::LogFormat, constants::server::SERVICE_NAME};

/// Bunyan keys clashing with fields reserved by log ingestion tools, with their replacement
const RESERVED_KEY_PREFIXES: [(&str, &str); 1] = [("\"log.", "\"backend_log.")];

/// Writer rewriting [`RESERVED_KEY_PREFIXES`] in every Bunyan record
struct ReservedKeyWriter<W: Write> {
    inner: W,
}

impl<W: Write> ReservedKeyWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Returns the rewritten record, or `None` if nothing had to change
    fn rewrite(record: &str) -> Option<String> {
        let mut rewritten: Option<String> = None;

        for (reserved, replacement) in RESERVED_KEY_PREFIXES {
            let current = rewritten.as_deref().unwrap_or(record);
            if current.contains(reserved) {
                rewritten = Some(current.replace(reserved, replacement));
            }
        }

        rewritten
    }
}

impl<W: Write> Write for ReservedKeyWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        // Bunyan hands over one full record per call
        match std::str::from_utf8(buf).ok().and_then(Self::rewrite) {
            Some(record) => {
                self.inner.write_all(record.as_bytes())?;
                // report the caller's length, not the rewritten one
                Ok(buf.len())
            }
            // Untouched or not UTF-8: forward as-is
            None => self.inner.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Hands a fresh [`ReservedKeyWriter`] over stdout to the Bunyan layer
struct StdoutReservedKeyWriter;

impl<'a> MakeWriter<'a> for StdoutReservedKeyWriter {
    type Writer = ReservedKeyWriter<std::io::Stdout>;

    fn make_writer(&'a self) -> Self::Writer {
        ReservedKeyWriter::new(std::io::stdout())
    }
}

/// Initialize logging with the specified format
///
/// Filtering follows `RUST_LOG`, defaulting to `info` when unset.
pub fn initialize_logging(log_format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_format.resolve() {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(JsonStorageLayer)
                .with(BunyanFormattingLayer::new(
                    SERVICE_NAME.to_string(),
                    StdoutReservedKeyWriter,
                ))
                .init();
        }
        // `resolve` never returns `Auto`
        LogFormat::Text | LogFormat::Auto => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_reserved_log_prefix() {
        let mut writer = ReservedKeyWriter::new(Vec::new());
        let line = br#"{"msg":"hi","log.target":"siwe::verifier","level":30}"#;

        let written = writer.write(line).unwrap();

        assert_eq!(written, line.len());
        assert_eq!(
            String::from_utf8(writer.inner).unwrap(),
            r#"{"msg":"hi","backend_log.target":"siwe::verifier","level":30}"#
        );
    }

    #[test]
    fn leaves_records_without_reserved_keys_alone() {
        assert_eq!(
            ReservedKeyWriter::<Vec<u8>>::rewrite(r#"{"msg":"log.txt rotated"}"#),
            None
        );

        let mut writer = ReservedKeyWriter::new(Vec::new());
        writer.write_all(br#"{"msg":"hi"}"#).unwrap();
        assert_eq!(writer.inner, br#"{"msg":"hi"}"#.to_vec());
    }

    #[test]
    fn passes_through_non_utf8() {
        let mut writer = ReservedKeyWriter::new(Vec::new());
        writer.write_all(&[0xff, 0xfe]).unwrap();
        assert_eq!(writer.inner, vec![0xff, 0xfe]);
    }
}
