//! Newline-delimited JSON event log, one lifecycle notification per line.
//!
//! ```text
//! {"event":"case_started","timestamp":"2026-10-16T09:05:03.120Z","case":{"uri":"file:///login.feature","line":3}}
//! {"event":"step_finished","timestamp":"...","case":{...},"step":{"type":"hook","hook":"before"},"result":{"status":"passed","duration_ms":2}}
//! ```

use std::io::BufRead;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::ast::{Feature, ParsedFeature};
use crate::progress::error::ReportError;
use crate::progress::event::{Event, HookKind, Outcome, Status, StepError, TestCase, TestStep};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventRecord {
    SourceRead {
        uri: String,
        path: PathBuf,
        feature: Feature,
    },
    RunStarted {
        timestamp: DateTime<Utc>,
    },
    CaseStarted {
        timestamp: DateTime<Utc>,
        case: CaseRecord,
    },
    StepStarted {
        timestamp: DateTime<Utc>,
        case: CaseRecord,
        step: StepRecord,
    },
    StepFinished {
        timestamp: DateTime<Utc>,
        case: CaseRecord,
        step: StepRecord,
        result: ResultRecord,
    },
    CaseFinished {
        timestamp: DateTime<Utc>,
        case: CaseRecord,
        result: ResultRecord,
    },
    RunFinished {
        timestamp: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub uri: String,
    pub line: usize,
}

/// A step as logged: `type` is `step` (or `pickle`) for feature-file steps
/// and `hook` for hooks, which then carry `hook: before|after|...`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub keyword: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub status: Status,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl From<CaseRecord> for TestCase {
    fn from(record: CaseRecord) -> Self {
        Self {
            uri: record.uri,
            line: record.line,
        }
    }
}

impl From<ResultRecord> for Outcome {
    fn from(record: ResultRecord) -> Self {
        Self {
            status: record.status,
            duration: Duration::from_millis(record.duration_ms),
            error: record.error.map(|e| StepError {
                message: e.message,
                detail: e.detail,
            }),
        }
    }
}

impl StepRecord {
    fn into_step(self, case: &CaseRecord, line_no: usize) -> Result<TestStep, ReportError> {
        match self.kind.as_str() {
            "step" | "pickle" => Ok(TestStep::Pickle {
                keyword: self.keyword,
                text: self.text.unwrap_or_default(),
                line: self.line.unwrap_or(case.line),
            }),
            "hook" => {
                let name = self.hook.unwrap_or_default();
                HookKind::parse(&name)
                    .map(|kind| TestStep::Hook { kind })
                    .ok_or_else(|| ReportError::UnclassifiedStep {
                        line: line_no,
                        kind: format!("hook {name}"),
                    })
            }
            other => Err(ReportError::UnclassifiedStep {
                line: line_no,
                kind: other.to_owned(),
            }),
        }
    }
}

impl EventRecord {
    /// Validate the record read from log line `line_no` (1-based) into an event.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::UnclassifiedStep`] for unknown step kinds.
    pub fn into_event(self, line_no: usize) -> Result<Event, ReportError> {
        Ok(match self {
            EventRecord::SourceRead { uri, path, feature } => Event::SourceRead {
                uri: uri.clone(),
                document: ParsedFeature { uri, path, feature },
            },
            EventRecord::RunStarted { timestamp } => Event::RunStarted { at: timestamp },
            EventRecord::CaseStarted { timestamp, case } => Event::CaseStarted {
                case: case.into(),
                at: timestamp,
            },
            EventRecord::StepStarted {
                timestamp,
                case,
                step,
            } => Event::StepStarted {
                step: step.into_step(&case, line_no)?,
                case: case.into(),
                at: timestamp,
            },
            EventRecord::StepFinished {
                timestamp,
                case,
                step,
                result,
            } => Event::StepFinished {
                step: step.into_step(&case, line_no)?,
                case: case.into(),
                outcome: result.into(),
                at: timestamp,
            },
            EventRecord::CaseFinished {
                timestamp,
                case,
                result,
            } => Event::CaseFinished {
                case: case.into(),
                outcome: result.into(),
                at: timestamp,
            },
            EventRecord::RunFinished { timestamp } => Event::RunFinished { at: timestamp },
        })
    }
}

/// Decode one log line. `line_no` is 1-based and only used for errors.
///
/// # Errors
///
/// Returns [`ReportError::MalformedRecord`] for invalid JSON or unknown
/// events, and [`ReportError::UnclassifiedStep`] for unknown step kinds.
pub fn decode_line(line: &str, line_no: usize) -> Result<Event, ReportError> {
    let record: EventRecord =
        serde_json::from_str(line).map_err(|e| ReportError::MalformedRecord {
            line: line_no,
            message: e.to_string(),
        })?;
    record.into_event(line_no)
}

/// Decode every non-blank line of an event log.
pub fn read_events<R: BufRead>(reader: R) -> impl Iterator<Item = Result<Event, ReportError>> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(i, line)| match line {
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => Some(decode_line(&line, i + 1)),
            Err(e) => Some(Err(e.into())),
        })
}
