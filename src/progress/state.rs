use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::document::error::LookupError;
use crate::document::registry::DocumentRegistry;
use crate::hierarchy::names::{examples_line_of, feature_name_of, name_of};
use crate::progress::event::{Event, Outcome, TestCase, Verdict};
use crate::progress::protocol::Message;

/// Label of the suite wrapping the cases of one examples block.
pub const EXAMPLES_SUITE: &str = "Examples:";

/// A line in a document: identity of a scenario, example or examples block.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScenarioLine {
    pub uri: String,
    pub line: usize,
}

impl ScenarioLine {
    pub fn new(uri: impl Into<String>, line: usize) -> Self {
        Self {
            uri: uri.into(),
            line,
        }
    }

    fn of(case: &TestCase) -> Self {
        Self::new(case.uri.clone(), case.line)
    }
}

/// Which suites are open while the run progresses.
///
/// The runner only reports cases and steps, so feature and examples suites
/// are opened and closed here whenever the case stream crosses their
/// boundaries. Transitions follow event arrival order strictly: nothing is
/// regrouped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReporterState {
    current_feature: Option<String>,
    current_examples: Option<ScenarioLine>,
    current_scenario: Option<ScenarioLine>,
    strict: bool,
    root_suite: String,
}

impl ReporterState {
    pub fn new(strict: bool, root_suite: impl Into<String>) -> Self {
        Self {
            current_feature: None,
            current_examples: None,
            current_scenario: None,
            strict,
            root_suite: root_suite.into(),
        }
    }

    pub fn current_feature(&self) -> Option<&str> {
        self.current_feature.as_deref()
    }

    pub fn current_examples(&self) -> Option<&ScenarioLine> {
        self.current_examples.as_ref()
    }

    pub fn current_scenario(&self) -> Option<&ScenarioLine> {
        self.current_scenario.as_ref()
    }

    pub fn strict(&self) -> bool {
        self.strict
    }

    /// Compute the state after `event` and the messages it produces, leaving
    /// `self` untouched.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] if the event refers to a document that was
    /// never read.
    pub fn transition(
        &self,
        event: &Event,
        documents: &DocumentRegistry,
    ) -> Result<(Self, Vec<Message>), LookupError> {
        let mut next = self.clone();
        let mut out = Vec::new();

        match event {
            Event::SourceRead { .. } => {}
            Event::RunStarted { at } => {
                out.push(Message::EnteredTheMatrix { timestamp: *at });
                out.push(Message::SuiteStarted {
                    timestamp: *at,
                    name: self.root_suite.clone(),
                });
            }
            Event::CaseStarted { case, at } => {
                next.case_started(case, *at, documents, &mut out)?;
            }
            Event::StepStarted { case, step, at } => {
                out.push(Message::TestStarted {
                    timestamp: *at,
                    location_hint: format!("{}:{}", case.uri, step.line(case)),
                    name: step.label(),
                });
            }
            Event::StepFinished {
                step, outcome, at, ..
            } => {
                let label = step.label();
                self.push_verdict(&label, outcome, *at, &mut out);
                out.push(Message::TestFinished {
                    timestamp: *at,
                    duration: outcome.duration,
                    name: label,
                });
            }
            Event::CaseFinished { case, outcome, at } => {
                let name = name_of(documents, &case.uri, case.line)?;
                self.push_verdict(&name, outcome, *at, &mut out);
                if next.current_scenario.is_none() {
                    warn!(uri = %case.uri, line = case.line, "case finished without an open scenario suite");
                }
                next.close_scenario(*at, documents, &mut out)?;
            }
            Event::RunFinished { at } => {
                next.close_scenario(*at, documents, &mut out)?;
                next.close_examples(*at, &mut out);
                next.close_feature(*at, documents, &mut out)?;
                out.push(Message::SuiteFinished {
                    timestamp: *at,
                    name: self.root_suite.clone(),
                });
            }
        }

        Ok((next, out))
    }

    /// Apply `event`, committing the new state only if the transition succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] if the event refers to a document that was
    /// never read. The state is unchanged in that case.
    pub fn apply(
        &mut self,
        event: &Event,
        documents: &DocumentRegistry,
    ) -> Result<Vec<Message>, LookupError> {
        let (next, messages) = self.transition(event, documents)?;
        *self = next;
        Ok(messages)
    }

    fn case_started(
        &mut self,
        case: &TestCase,
        at: DateTime<Utc>,
        documents: &DocumentRegistry,
        out: &mut Vec<Message>,
    ) -> Result<(), LookupError> {
        // Only still open if the previous case never finished.
        self.close_scenario(at, documents, out)?;

        if self.current_feature.as_deref() != Some(case.uri.as_str()) {
            self.close_examples(at, out);
            self.close_feature(at, documents, out)?;
            let name = feature_name_of(documents, &case.uri)?;
            debug!(uri = %case.uri, %name, "feature suite opened");
            out.push(Message::SuiteStarted {
                timestamp: at,
                name,
            });
            self.current_feature = Some(case.uri.clone());
        }

        let examples = examples_line_of(documents, &case.uri, case.line)?
            .map(|line| ScenarioLine::new(case.uri.clone(), line));
        if examples != self.current_examples {
            self.close_examples(at, out);
            if let Some(examples) = examples {
                debug!(uri = %examples.uri, line = examples.line, "examples suite opened");
                out.push(Message::SuiteStarted {
                    timestamp: at,
                    name: EXAMPLES_SUITE.to_owned(),
                });
                self.current_examples = Some(examples);
            }
        }

        let name = name_of(documents, &case.uri, case.line)?;
        debug!(uri = %case.uri, line = case.line, %name, "scenario suite opened");
        out.push(Message::SuiteStarted {
            timestamp: at,
            name,
        });
        self.current_scenario = Some(ScenarioLine::of(case));
        Ok(())
    }

    fn close_scenario(
        &mut self,
        at: DateTime<Utc>,
        documents: &DocumentRegistry,
        out: &mut Vec<Message>,
    ) -> Result<(), LookupError> {
        if let Some(open) = self.current_scenario.take() {
            let name = name_of(documents, &open.uri, open.line)?;
            out.push(Message::SuiteFinished {
                timestamp: at,
                name,
            });
        }
        Ok(())
    }

    fn close_examples(&mut self, at: DateTime<Utc>, out: &mut Vec<Message>) {
        if self.current_examples.take().is_some() {
            out.push(Message::SuiteFinished {
                timestamp: at,
                name: EXAMPLES_SUITE.to_owned(),
            });
        }
    }

    fn close_feature(
        &mut self,
        at: DateTime<Utc>,
        documents: &DocumentRegistry,
        out: &mut Vec<Message>,
    ) -> Result<(), LookupError> {
        if let Some(uri) = self.current_feature.take() {
            let name = feature_name_of(documents, &uri)?;
            debug!(%uri, %name, "feature suite closed");
            out.push(Message::SuiteFinished {
                timestamp: at,
                name,
            });
        }
        Ok(())
    }

    /// Pending outcomes are reported as ignored, unacceptable ones as failed.
    fn push_verdict(&self, name: &str, outcome: &Outcome, at: DateTime<Utc>, out: &mut Vec<Message>) {
        match outcome.verdict(self.strict) {
            Verdict::Pending => out.push(Message::TestIgnored {
                timestamp: at,
                name: name.to_owned(),
            }),
            Verdict::Failed => {
                let (message, details) = outcome
                    .error
                    .as_ref()
                    .map(|e| (e.message.clone(), e.detail.clone()))
                    .unwrap_or_default();
                out.push(Message::TestFailed {
                    timestamp: at,
                    duration: outcome.duration,
                    details,
                    message,
                    name: name.to_owned(),
                });
            }
            Verdict::Ok => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::document::ast::fixtures::{login_feature, outline_feature};
    use crate::progress::event::{HookKind, Status, StepError, TestStep};

    const LOGIN: &str = "file:///work/features/login.feature";
    const OUTLINE: &str = "classpath:io/cucumber/jupiter/engine/feature-with-outline.feature";

    fn at() -> DateTime<Utc> {
        DateTime::from_timestamp(1_792_000_000, 0).unwrap()
    }

    fn documents() -> DocumentRegistry {
        [login_feature(LOGIN), outline_feature()].into_iter().collect()
    }

    fn case(uri: &str, line: usize) -> TestCase {
        TestCase {
            uri: uri.into(),
            line,
        }
    }

    fn step() -> TestStep {
        TestStep::Pickle {
            keyword: "Given ".into(),
            text: "a registered user".into(),
            line: 4,
        }
    }

    /// Events of one case with a single step finishing with `outcome`.
    fn case_events(uri: &str, line: usize, outcome: Outcome) -> Vec<Event> {
        let c = case(uri, line);
        vec![
            Event::CaseStarted {
                case: c.clone(),
                at: at(),
            },
            Event::StepStarted {
                case: c.clone(),
                step: step(),
                at: at(),
            },
            Event::StepFinished {
                case: c.clone(),
                step: step(),
                outcome: outcome.clone(),
                at: at(),
            },
            Event::CaseFinished {
                case: c,
                outcome,
                at: at(),
            },
        ]
    }

    fn run(state: &mut ReporterState, events: &[Event]) -> Vec<Message> {
        let docs = documents();
        let mut out = vec![];
        for event in events {
            out.extend(state.apply(event, &docs).unwrap());
        }
        out
    }

    fn wrap(cases: Vec<Vec<Event>>) -> Vec<Event> {
        let mut events = vec![Event::RunStarted { at: at() }];
        events.extend(cases.into_iter().flatten());
        events.push(Event::RunFinished { at: at() });
        events
    }

    /// `name(label)` per message, for compact order assertions.
    fn summary(messages: &[Message]) -> Vec<String> {
        messages
            .iter()
            .map(|m| match m {
                Message::EnteredTheMatrix { .. } => "enteredTheMatrix".to_owned(),
                Message::SuiteStarted { name, .. } => format!("testSuiteStarted({name})"),
                Message::SuiteFinished { name, .. } => format!("testSuiteFinished({name})"),
                Message::TestStarted { name, .. } => format!("testStarted({name})"),
                Message::TestFinished { name, .. } => format!("testFinished({name})"),
                Message::TestIgnored { name, .. } => format!("testIgnored({name})"),
                Message::TestFailed { name, .. } => format!("testFailed({name})"),
            })
            .collect()
    }

    fn assert_balanced(messages: &[Message]) {
        let mut open: Vec<&str> = vec![];
        for m in messages {
            match m {
                Message::SuiteStarted { name, .. } => open.push(name),
                Message::SuiteFinished { name, .. } => {
                    assert_eq!(open.pop(), Some(name.as_str()), "suite closed out of order");
                }
                _ => {}
            }
        }
        assert!(open.is_empty(), "suites left open: {open:?}");
    }

    #[test]
    fn single_passing_scenario() {
        let mut state = ReporterState::new(false, "Cucumber");
        let out = run(
            &mut state,
            &wrap(vec![case_events(LOGIN, 3, Outcome::passed(Duration::from_millis(7)))]),
        );
        assert_eq!(
            summary(&out),
            vec![
                "enteredTheMatrix",
                "testSuiteStarted(Cucumber)",
                "testSuiteStarted(Login)",
                "testSuiteStarted(Valid login)",
                "testStarted(Given a registered user)",
                "testFinished(Given a registered user)",
                "testSuiteFinished(Valid login)",
                "testSuiteFinished(Login)",
                "testSuiteFinished(Cucumber)",
            ]
        );
        assert_balanced(&out);
        assert_eq!(state.current_feature(), None);
        assert_eq!(state.current_scenario(), None);
    }

    #[test]
    fn failing_step_reports_failure_before_finish() {
        let mut state = ReporterState::new(false, "Cucumber");
        let out = run(
            &mut state,
            &wrap(vec![case_events(LOGIN, 3, Outcome::failed(Duration::from_millis(2), "boom"))]),
        );
        assert_eq!(
            summary(&out)[4..8],
            [
                "testStarted(Given a registered user)",
                "testFailed(Given a registered user)",
                "testFinished(Given a registered user)",
                "testFailed(Valid login)",
            ]
        );
        assert_eq!(summary(&out)[8], "testSuiteFinished(Valid login)");
        let Message::TestFailed { message, .. } = &out[5] else {
            panic!("expected testFailed");
        };
        assert_eq!(message.as_deref(), Some("boom"));
    }

    #[test]
    fn failed_without_error_has_empty_message() {
        let mut state = ReporterState::new(false, "Cucumber");
        let outcome = Outcome::with_status(Status::Failed, Duration::from_millis(1));
        let out = run(&mut state, &wrap(vec![case_events(LOGIN, 3, outcome)]));
        let failed: Vec<&Message> = out
            .iter()
            .filter(|m| matches!(m, Message::TestFailed { .. }))
            .collect();
        assert_eq!(failed.len(), 2);
        assert!(failed[0].to_string().contains("message = ''"));
    }

    #[test]
    fn error_without_message_has_empty_message() {
        let mut state = ReporterState::new(false, "Cucumber");
        let outcome = Outcome {
            status: Status::Failed,
            duration: Duration::ZERO,
            error: Some(StepError {
                message: None,
                detail: Some("at login.rs:12".into()),
            }),
        };
        let out = run(&mut state, &wrap(vec![case_events(LOGIN, 3, outcome)]));
        let line = out[5].to_string();
        assert!(line.contains("message = ''"));
        assert!(line.contains("details = 'at login.rs:12'"));
    }

    #[test]
    fn pending_step_is_ignored_not_failed() {
        let mut state = ReporterState::new(true, "Cucumber");
        let outcome = Outcome::with_status(Status::Pending, Duration::ZERO);
        let out = summary(&run(&mut state, &wrap(vec![case_events(LOGIN, 3, outcome)])));
        assert!(out.contains(&"testIgnored(Given a registered user)".to_owned()));
        assert!(out.contains(&"testIgnored(Valid login)".to_owned()));
        assert!(!out.iter().any(|m| m.starts_with("testFailed")));
    }

    #[test]
    fn strict_mode_fails_undefined_steps() {
        let outcome = Outcome::with_status(Status::Undefined, Duration::ZERO);
        let lenient = summary(&run(
            &mut ReporterState::new(false, "Cucumber"),
            &wrap(vec![case_events(LOGIN, 3, outcome.clone())]),
        ));
        let strict = summary(&run(
            &mut ReporterState::new(true, "Cucumber"),
            &wrap(vec![case_events(LOGIN, 3, outcome)]),
        ));
        assert!(!lenient.iter().any(|m| m.starts_with("testFailed")));
        assert_eq!(strict.iter().filter(|m| m.starts_with("testFailed")).count(), 2);
    }

    #[test]
    fn outline_rows_in_one_block_share_examples_suite() {
        let mut state = ReporterState::new(false, "Cucumber");
        let docs = documents();
        let mut out = vec![];
        let mut seen = vec![];
        for event in wrap(vec![
            case_events(OUTLINE, 19, Outcome::passed(Duration::ZERO)),
            case_events(OUTLINE, 20, Outcome::passed(Duration::ZERO)),
        ]) {
            out.extend(state.apply(&event, &docs).unwrap());
            if matches!(event, Event::CaseStarted { .. }) {
                seen.push((
                    state.current_examples().cloned(),
                    state.current_scenario().map(|s| s.line),
                ));
            }
        }
        let block = Some(ScenarioLine::new(OUTLINE, 17));
        assert_eq!(seen, vec![(block.clone(), Some(19)), (block, Some(20))]);
        let s = summary(&out);
        assert_eq!(s.iter().filter(|m| *m == "testSuiteStarted(Examples:)").count(), 1);
        assert_eq!(s.iter().filter(|m| *m == "testSuiteFinished(Examples:)").count(), 1);
        assert!(s.contains(&"testSuiteStarted(Example #1)".to_owned()));
        assert!(s.contains(&"testSuiteStarted(Example #2)".to_owned()));
        assert_balanced(&out);
    }

    #[test]
    fn outline_rows_in_two_blocks_get_two_examples_suites() {
        let mut state = ReporterState::new(false, "Cucumber");
        let out = run(
            &mut state,
            &wrap(vec![
                case_events(OUTLINE, 20, Outcome::passed(Duration::ZERO)),
                case_events(OUTLINE, 24, Outcome::passed(Duration::ZERO)),
            ]),
        );
        let s = summary(&out);
        assert_eq!(s.iter().filter(|m| *m == "testSuiteStarted(Examples:)").count(), 2);
        assert_balanced(&out);
    }

    #[test]
    fn scenario_after_outline_closes_examples() {
        let mut state = ReporterState::new(false, "Cucumber");
        let out = run(
            &mut state,
            &wrap(vec![
                case_events(OUTLINE, 19, Outcome::passed(Duration::ZERO)),
                case_events(OUTLINE, 5, Outcome::passed(Duration::ZERO)),
            ]),
        );
        let s = summary(&out);
        let closed = s.iter().position(|m| m == "testSuiteFinished(Examples:)").unwrap();
        let opened = s.iter().position(|m| m == "testSuiteStarted(A scenario)").unwrap();
        assert!(closed < opened);
        assert_balanced(&out);
    }

    #[test]
    fn switching_features_closes_previous_feature_once() {
        let mut state = ReporterState::new(false, "Cucumber");
        let out = run(
            &mut state,
            &wrap(vec![
                case_events(OUTLINE, 19, Outcome::passed(Duration::ZERO)),
                case_events(LOGIN, 3, Outcome::passed(Duration::ZERO)),
            ]),
        );
        let s = summary(&out);
        let login_opened = s.iter().position(|m| m == "testSuiteStarted(Login)").unwrap();
        let feature_closes = s[..login_opened]
            .iter()
            .filter(|m| *m == "testSuiteFinished(A feature with scenario outlines)")
            .count();
        assert_eq!(feature_closes, 1);
        assert_balanced(&out);
    }

    #[test]
    fn case_started_closes_unfinished_case() {
        let mut state = ReporterState::new(false, "Cucumber");
        let events = wrap(vec![
            vec![Event::CaseStarted {
                case: case(OUTLINE, 5),
                at: at(),
            }],
            case_events(OUTLINE, 19, Outcome::passed(Duration::ZERO)),
        ]);
        let out = run(&mut state, &events);
        let s = summary(&out);
        let closed = s.iter().position(|m| m == "testSuiteFinished(A scenario)").unwrap();
        let next = s.iter().position(|m| m == "testSuiteStarted(Examples:)").unwrap();
        assert!(closed < next);
        assert_balanced(&out);
    }

    #[test]
    fn run_finished_closes_everything_still_open() {
        let mut state = ReporterState::new(false, "Cucumber");
        let events = vec![
            Event::RunStarted { at: at() },
            Event::CaseStarted {
                case: case(OUTLINE, 24),
                at: at(),
            },
            Event::RunFinished { at: at() },
        ];
        let out = run(&mut state, &events);
        assert_eq!(
            summary(&out)[5..],
            [
                "testSuiteFinished(Example #1)",
                "testSuiteFinished(Examples:)",
                "testSuiteFinished(A feature with scenario outlines)",
                "testSuiteFinished(Cucumber)",
            ]
        );
    }

    #[test]
    fn hook_steps_are_labelled_by_kind() {
        let mut state = ReporterState::new(false, "Cucumber");
        let c = case(LOGIN, 3);
        let hook = TestStep::Hook {
            kind: HookKind::Before,
        };
        let out = state
            .apply(
                &Event::StepStarted {
                    case: c,
                    step: hook,
                    at: at(),
                },
                &documents(),
            )
            .unwrap();
        let Message::TestStarted {
            name,
            location_hint,
            ..
        } = &out[0]
        else {
            panic!("expected testStarted");
        };
        assert_eq!(name, "Hook Before");
        assert_eq!(location_hint, &format!("{LOGIN}:3"));
    }

    #[test]
    fn unread_document_leaves_state_untouched() {
        let mut state = ReporterState::new(false, "Cucumber");
        let docs = documents();
        state
            .apply(
                &Event::CaseStarted {
                    case: case(LOGIN, 3),
                    at: at(),
                },
                &docs,
            )
            .unwrap();
        let before = state.clone();
        let err = state
            .apply(
                &Event::CaseStarted {
                    case: case("file:///unread.feature", 3),
                    at: at(),
                },
                &docs,
            )
            .unwrap_err();
        assert!(matches!(err, LookupError::DocumentNotRead { .. }));
        assert_eq!(state, before);
    }

    #[test]
    fn transition_is_pure() {
        let state = ReporterState::new(false, "Cucumber");
        let event = Event::CaseStarted {
            case: case(LOGIN, 3),
            at: at(),
        };
        let (next, first) = state.transition(&event, &documents()).unwrap();
        let (_, second) = state.transition(&event, &documents()).unwrap();
        assert_eq!(first, second);
        assert_eq!(state.current_feature(), None);
        assert_eq!(next.current_feature(), Some(LOGIN));
    }

    #[test]
    fn custom_root_suite_name() {
        let mut state = ReporterState::new(false, "Acceptance");
        let out = run(&mut state, &wrap(vec![]));
        assert_eq!(
            summary(&out),
            vec![
                "enteredTheMatrix",
                "testSuiteStarted(Acceptance)",
                "testSuiteFinished(Acceptance)",
            ]
        );
    }
}
