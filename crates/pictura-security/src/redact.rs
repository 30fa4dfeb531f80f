// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Secret redaction for log output and error messages.
//!
//! Two complementary mechanisms:
//! 1. **Regex-based**: known secret formats (payment keys, webhook secrets, Bearer tokens).
//! 2. **Exact-match**: the configured secret values, registered at startup.

use std::io::Write;
use std::sync::{Arc, LazyLock, RwLock};

use regex::Regex;

const PATTERNS: &[&str] = &[
    // Payment provider secret and restricted keys: sk_live_..., sk_test_..., rk_live_...
    r"\b(?:sk|rk)_(?:live|test)_[a-zA-Z0-9]{8,}",
    // Webhook signing secrets: whsec_...
    r"\bwhsec_[a-zA-Z0-9]{8,}",
    // Generation backend tokens: r8_...
    r"\br8_[a-zA-Z0-9]{8,}",
    // Bearer tokens in headers, including our v1 session tokens.
    r"Bearer\s+[a-zA-Z0-9._\-]{10,}",
];

static REDACTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    PATTERNS
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
});

/// The redaction placeholder.
const REDACTED: &str = "[REDACTED]";

/// Redact secrets from a string using the known patterns and exact `secrets`.
pub fn redact(input: &str, secrets: &[String]) -> String {
    let mut result = input.to_string();

    for pattern in REDACTION_PATTERNS.iter() {
        result = pattern.replace_all(&result, REDACTED).into_owned();
    }

    // Longest first so a secret containing another is replaced whole.
    let mut sorted: Vec<&String> = secrets.iter().filter(|s| !s.is_empty()).collect();
    sorted.sort_by_key(|s| std::cmp::Reverse(s.len()));
    for secret in sorted {
        result = result.replace(secret.as_str(), REDACTED);
    }

    result
}

/// A writer that redacts secrets before passing output to `inner`.
pub struct RedactingWriter<W> {
    inner: W,
    secrets: Arc<RwLock<Vec<String>>>,
}

impl<W: Write> RedactingWriter<W> {
    pub fn new(inner: W, secrets: Arc<RwLock<Vec<String>>>) -> Self {
        Self { inner, secrets }
    }

    /// Register an exact value to redact. Empty and duplicate values are ignored.
    pub fn add_secret(secrets: &Arc<RwLock<Vec<String>>>, value: String) {
        if value.is_empty() {
            return;
        }
        if let Ok(mut values) = secrets.write()
            && !values.contains(&value)
        {
            values.push(value);
        }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let input = String::from_utf8_lossy(buf);
        let redacted = match self.secrets.read() {
            Ok(values) => redact(&input, &values),
            Err(_) => redact(&input, &[]),
        };
        self.inner.write_all(redacted.as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
