use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Prefix of every service message line.
pub const PREFIX: &str = "##teamcity";

/// Timestamp layout, e.g. `2026-10-16T09:05:03.120+0000`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// Escape a value for use inside a quoted attribute.
///
/// Absent values render as the empty string.
pub fn escape(value: Option<&str>) -> String {
    let Some(value) = value else {
        return String::new();
    };
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '|' => out.push_str("||"),
            '\n' => out.push_str("|n"),
            '\r' => out.push_str("|r"),
            '\'' => out.push_str("|'"),
            c => out.push(c),
        }
    }
    out
}

/// Reverse of [`escape`]. Unknown escapes keep the escaped character.
pub fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '|' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('|'),
        }
    }
    out
}

pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

fn millis(duration: &Duration) -> String {
    duration.as_millis().to_string()
}

/// One line of the progress protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    EnteredTheMatrix {
        timestamp: DateTime<Utc>,
    },
    SuiteStarted {
        timestamp: DateTime<Utc>,
        name: String,
    },
    SuiteFinished {
        timestamp: DateTime<Utc>,
        name: String,
    },
    TestStarted {
        timestamp: DateTime<Utc>,
        location_hint: String,
        name: String,
    },
    TestFinished {
        timestamp: DateTime<Utc>,
        duration: Duration,
        name: String,
    },
    TestIgnored {
        timestamp: DateTime<Utc>,
        name: String,
    },
    TestFailed {
        timestamp: DateTime<Utc>,
        duration: Duration,
        details: Option<String>,
        message: Option<String>,
        name: String,
    },
}

impl Message {
    /// Service message name, e.g. `testSuiteStarted`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::EnteredTheMatrix { .. } => "enteredTheMatrix",
            Self::SuiteStarted { .. } => "testSuiteStarted",
            Self::SuiteFinished { .. } => "testSuiteFinished",
            Self::TestStarted { .. } => "testStarted",
            Self::TestFinished { .. } => "testFinished",
            Self::TestIgnored { .. } => "testIgnored",
            Self::TestFailed { .. } => "testFailed",
        }
    }

    /// Attributes in emission order, unescaped.
    pub fn attributes(&self) -> Vec<(&'static str, Option<String>)> {
        match self {
            Self::EnteredTheMatrix { timestamp } => {
                vec![("timestamp", Some(format_timestamp(timestamp)))]
            }
            Self::SuiteStarted { timestamp, name } | Self::SuiteFinished { timestamp, name } => {
                vec![
                    ("timestamp", Some(format_timestamp(timestamp))),
                    ("name", Some(name.clone())),
                ]
            }
            Self::TestStarted {
                timestamp,
                location_hint,
                name,
            } => vec![
                ("timestamp", Some(format_timestamp(timestamp))),
                ("locationHint", Some(location_hint.clone())),
                ("captureStandardOutput", Some("true".to_owned())),
                ("name", Some(name.clone())),
            ],
            Self::TestFinished {
                timestamp,
                duration,
                name,
            } => vec![
                ("timestamp", Some(format_timestamp(timestamp))),
                ("duration", Some(millis(duration))),
                ("name", Some(name.clone())),
            ],
            Self::TestIgnored { timestamp, name } => vec![
                ("timestamp", Some(format_timestamp(timestamp))),
                ("message", Some("Skipped step".to_owned())),
                ("name", Some(name.clone())),
            ],
            Self::TestFailed {
                timestamp,
                duration,
                details,
                message,
                name,
            } => vec![
                ("timestamp", Some(format_timestamp(timestamp))),
                ("duration", Some(millis(duration))),
                ("details", details.clone()),
                ("message", message.clone()),
                ("name", Some(name.clone())),
            ],
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PREFIX}[{}", self.name())?;
        for (key, value) in self.attributes() {
            write!(f, " {key} = '{}'", escape(value.as_deref()))?;
        }
        f.write_str("]")
    }
}

/// A service message decoded from a protocol line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceMessage {
    pub name: String,
    pub attributes: Vec<(String, String)>,
}

impl ServiceMessage {
    /// Unescaped value of the first attribute called `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Decode one protocol line. Returns `None` for lines that are not service
/// messages or are malformed.
pub fn parse_line(line: &str) -> Option<ServiceMessage> {
    let body = line.trim().strip_prefix(PREFIX)?.strip_prefix('[')?;
    let name_end = body.find(|c: char| c.is_whitespace() || c == ']')?;
    let name = body[..name_end].to_owned();
    let mut rest = &body[name_end..];
    let mut attributes = Vec::new();

    loop {
        rest = rest.trim_start();
        if rest == "]" {
            break;
        }
        let (key, after_key) = rest.split_once('=')?;
        let after_eq = after_key.trim_start().strip_prefix('\'')?;

        // Scan to the closing quote, skipping escaped characters.
        let mut end = None;
        let mut chars = after_eq.char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '|' => {
                    chars.next();
                }
                '\'' => {
                    end = Some(i);
                    break;
                }
                _ => {}
            }
        }
        let end = end?;
        attributes.push((key.trim().to_owned(), unescape(&after_eq[..end])));
        rest = &after_eq[end + 1..];
    }

    Some(ServiceMessage { name, attributes })
}
