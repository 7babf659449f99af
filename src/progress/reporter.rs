use std::io::Write;

use tracing::{debug, error};

use crate::document::registry::DocumentRegistry;
use crate::progress::error::ReportError;
use crate::progress::event::Event;
use crate::progress::state::ReporterState;

/// Name of the outermost suite when none is configured.
pub const DEFAULT_ROOT_SUITE: &str = "Cucumber";

/// Configuration for progress reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReporterConfig {
    /// Report undefined and pending results as failures.
    pub strict: bool,
    /// Name of the suite wrapping the whole run.
    pub root_suite: String,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            strict: false,
            root_suite: DEFAULT_ROOT_SUITE.to_owned(),
        }
    }
}

/// Turns lifecycle events into protocol lines written to `out`.
///
/// Documents arrive as source-read events and are kept for the rest of the
/// run. The first failing event aborts the reporter: every later event is
/// rejected with [`ReportError::Aborted`].
pub struct ProgressReporter<W: Write> {
    documents: DocumentRegistry,
    state: ReporterState,
    out: W,
    aborted: bool,
}

impl<W: Write> ProgressReporter<W> {
    pub fn new(config: &ReporterConfig, out: W) -> Self {
        Self::with_documents(config, DocumentRegistry::new(), out)
    }

    /// Create a reporter that already knows some documents.
    pub fn with_documents(config: &ReporterConfig, documents: DocumentRegistry, out: W) -> Self {
        Self {
            documents,
            state: ReporterState::new(config.strict, config.root_suite.clone()),
            out,
            aborted: false,
        }
    }

    pub fn documents(&self) -> &DocumentRegistry {
        &self.documents
    }

    pub fn state(&self) -> &ReporterState {
        &self.state
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Handle one event, writing the messages it produces.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] if the event cannot be resolved or written,
    /// and [`ReportError::Aborted`] for any event after such a failure.
    pub fn handle(&mut self, event: Event) -> Result<(), ReportError> {
        if self.aborted {
            return Err(ReportError::Aborted);
        }
        let result = self.dispatch(event);
        if let Err(e) = &result {
            error!(error = %e, "progress reporting aborted");
            self.aborted = true;
        }
        result
    }

    fn dispatch(&mut self, event: Event) -> Result<(), ReportError> {
        if let Event::SourceRead { uri, document } = event {
            self.documents.put(uri, document);
            return Ok(());
        }
        let messages = self.state.apply(&event, &self.documents)?;
        for message in &messages {
            writeln!(self.out, "{message}")?;
        }
        debug!(count = messages.len(), "messages written");
        Ok(())
    }

    /// Handle every event in order, stopping at the first error.
    ///
    /// Returns the number of events handled.
    ///
    /// # Errors
    ///
    /// Returns the first decoding, lookup or write error.
    pub fn run<I>(&mut self, events: I) -> Result<usize, ReportError>
    where
        I: IntoIterator<Item = Result<Event, ReportError>>,
    {
        let mut handled = 0;
        for event in events {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    error!(error = %e, "progress reporting aborted");
                    self.aborted = true;
                    return Err(e);
                }
            };
            self.handle(event)?;
            handled += 1;
        }
        self.out.flush()?;
        Ok(handled)
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
