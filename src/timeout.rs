//! Call timeouts given as milliseconds or duration strings (`"500ms"`, `"1.5s"`, `"1h30m"`).

use crate::{Error, ErrorContext, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

static PART: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?|\.\d+)\s*(ns|us|µs|ms|s|m|h|d)").expect("static regex")
});

/// Duration syntax the daemon's own parser accepts: case-sensitive units, no days, no spaces.
static DAEMON_SYNTAX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?:\d+(?:\.\d*)?|\.\d+)(?:ns|us|µs|μs|ms|s|m|h))+$").expect("static regex")
});

/// A per-call or default timeout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timeout {
    Millis(u64),
    Text(String),
}

impl Timeout {
    /// Resolve to a duration. `None` means "no timeout" (zero).
    pub fn duration(&self) -> Result<Option<Duration>> {
        let d = match self {
            Timeout::Millis(ms) => Duration::from_millis(*ms),
            Timeout::Text(s) => parse_duration(s)?,
        };
        Ok(Some(d).filter(|d| !d.is_zero()))
    }

    /// Wire form the daemon understands for its own `timeout` query parameter.
    ///
    /// Text already in the daemon's syntax is sent as written; anything else this crate
    /// accepts (bare milliseconds, days, spaces, upper-case units) is sent as `<n>ms`.
    pub fn to_query_value(&self) -> Result<String> {
        match self {
            Timeout::Millis(ms) => Ok(format!("{}ms", ms)),
            Timeout::Text(s) => {
                let s = s.trim();
                if DAEMON_SYNTAX.is_match(s) {
                    return Ok(s.to_string());
                }
                Ok(format!("{}ms", parse_duration(s)?.as_millis()))
            }
        }
    }
}

impl From<u64> for Timeout {
    fn from(ms: u64) -> Self {
        Timeout::Millis(ms)
    }
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Timeout::Millis(d.as_millis().min(u64::MAX as u128) as u64)
    }
}

impl From<&str> for Timeout {
    fn from(s: &str) -> Self {
        Timeout::Text(s.to_string())
    }
}

impl From<String> for Timeout {
    fn from(s: String) -> Self {
        Timeout::Text(s)
    }
}

fn invalid(input: &str) -> Error {
    Error::configuration_with_context(
        format!("cannot parse duration '{}'", input),
        ErrorContext::new()
            .with_field_path("timeout")
            .with_details("expected milliseconds or <number><unit> parts, e.g. 500ms, 1.5s, 1h30m")
            .with_source("timeout"),
    )
}

/// Parse a bare integer (milliseconds) or a sequence of `<number><unit>` parts.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let s = input.trim();
    if s.is_empty() {
        return Err(invalid(input));
    }
    if let Ok(ms) = s.parse::<u64>() {
        return Ok(Duration::from_millis(ms));
    }

    let mut total = 0f64;
    let mut consumed = 0usize;
    for caps in PART.captures_iter(s) {
        let whole = caps.get(0).ok_or_else(|| invalid(input))?;
        if !s[consumed..whole.start()].trim().is_empty() {
            return Err(invalid(input));
        }
        consumed = whole.end();

        let value: f64 = caps[1].parse().map_err(|_| invalid(input))?;
        let secs = match caps[2].to_lowercase().as_str() {
            "ns" => value / 1e9,
            "us" | "µs" => value / 1e6,
            "ms" => value / 1e3,
            "s" => value,
            "m" => value * 60.0,
            "h" => value * 3600.0,
            "d" => value * 86400.0,
            _ => return Err(invalid(input)),
        };
        total += secs;
    }

    if consumed == 0 || !s[consumed..].trim().is_empty() {
        return Err(invalid(input));
    }
    Duration::try_from_secs_f64(total).map_err(|_| invalid(input))
}
