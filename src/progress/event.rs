use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::ast::ParsedFeature;

/// A resolved, executable case: one scenario or one outline row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub uri: String,
    /// Line of the scenario, or of the examples row for outline cases.
    pub line: usize,
}

/// When a hook runs relative to its scenario or step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Before,
    After,
    BeforeStep,
    AfterStep,
}

impl HookKind {
    /// Parse a hook name as written in event logs (`before`, `after_step`, ...).
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "before" | "before_scenario" => Some(Self::Before),
            "after" | "after_scenario" => Some(Self::After),
            "before_step" => Some(Self::BeforeStep),
            "after_step" => Some(Self::AfterStep),
            _ => None,
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Before => write!(f, "Before"),
            Self::After => write!(f, "After"),
            Self::BeforeStep => write!(f, "BeforeStep"),
            Self::AfterStep => write!(f, "AfterStep"),
        }
    }
}

/// A step of a case: either a step from the feature file or a hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestStep {
    Pickle {
        keyword: String,
        text: String,
        line: usize,
    },
    Hook {
        kind: HookKind,
    },
}

impl TestStep {
    /// Label shown for the step, e.g. `Given a user` or `Hook Before`.
    pub fn label(&self) -> String {
        match self {
            Self::Pickle { keyword, text, .. } => {
                let keyword = keyword.trim();
                if keyword.is_empty() {
                    text.clone()
                } else {
                    format!("{keyword} {text}")
                }
            }
            Self::Hook { kind } => format!("Hook {kind}"),
        }
    }

    /// Source line to point at: the step's own line, or the case line for hooks.
    pub fn line(&self, case: &TestCase) -> usize {
        match self {
            Self::Pickle { line, .. } => *line,
            Self::Hook { .. } => case.line,
        }
    }
}

/// Result status of a step or case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Passed,
    Failed,
    Skipped,
    Pending,
    Undefined,
    Ambiguous,
}

impl Status {
    /// Whether this status counts as a success.
    ///
    /// Passed and skipped always do, undefined and pending only outside
    /// strict mode, failed and ambiguous never.
    pub fn is_ok(self, strict: bool) -> bool {
        match self {
            Self::Passed | Self::Skipped => true,
            Self::Undefined | Self::Pending => !strict,
            Self::Failed | Self::Ambiguous => false,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => write!(f, "passed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
            Self::Pending => write!(f, "pending"),
            Self::Undefined => write!(f, "undefined"),
            Self::Ambiguous => write!(f, "ambiguous"),
        }
    }
}

/// Error attached to a result. Either part may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepError {
    pub message: Option<String>,
    pub detail: Option<String>,
}

/// Outcome of a step or case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: Status,
    pub duration: Duration,
    pub error: Option<StepError>,
}

impl Outcome {
    pub fn passed(duration: Duration) -> Self {
        Self {
            status: Status::Passed,
            duration,
            error: None,
        }
    }

    pub fn failed(duration: Duration, message: &str) -> Self {
        Self {
            status: Status::Failed,
            duration,
            error: Some(StepError {
                message: Some(message.to_owned()),
                detail: None,
            }),
        }
    }

    pub fn with_status(status: Status, duration: Duration) -> Self {
        Self {
            status,
            duration,
            error: None,
        }
    }
}

/// How the progress reporter should present an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Pending work: reported as ignored.
    Pending,
    /// Not acceptable under the active strictness, or an error is attached.
    Failed,
    Ok,
}

impl Outcome {
    pub fn verdict(&self, strict: bool) -> Verdict {
        if self.status == Status::Pending {
            Verdict::Pending
        } else if !self.status.is_ok(strict) || self.error.is_some() {
            Verdict::Failed
        } else {
            Verdict::Ok
        }
    }
}

/// Lifecycle notifications, in the order the runner delivers them.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    SourceRead {
        uri: String,
        document: ParsedFeature,
    },
    RunStarted {
        at: DateTime<Utc>,
    },
    CaseStarted {
        case: TestCase,
        at: DateTime<Utc>,
    },
    StepStarted {
        case: TestCase,
        step: TestStep,
        at: DateTime<Utc>,
    },
    StepFinished {
        case: TestCase,
        step: TestStep,
        outcome: Outcome,
        at: DateTime<Utc>,
    },
    CaseFinished {
        case: TestCase,
        outcome: Outcome,
        at: DateTime<Utc>,
    },
    RunFinished {
        at: DateTime<Utc>,
    },
}
