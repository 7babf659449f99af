use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::document::ast::ParsedFeature;
use crate::document::registry::DocumentRegistry;
use crate::emit::discovery::{emit_json, emit_yaml};
use crate::hierarchy::descriptor::{Descriptor, resolve_feature};
use crate::hierarchy::key::HierarchyKey;
use crate::progress::record::read_events;
use crate::progress::reporter::{DEFAULT_ROOT_SUITE, ProgressReporter, ReporterConfig};

/// Options for the `discover` command.
pub struct DiscoverOptions {
    pub format: String,
    pub output: Option<PathBuf>,
}

impl Default for DiscoverOptions {
    fn default() -> Self {
        Self {
            format: "yaml".to_owned(),
            output: None,
        }
    }
}

/// Options for the `report` command.
pub struct ReportOptions {
    pub strict: bool,
    pub root_suite: String,
    /// Parsed feature files known before the log starts.
    pub features: Vec<PathBuf>,
    pub output: Option<PathBuf>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            strict: false,
            root_suite: DEFAULT_ROOT_SUITE.to_owned(),
            features: vec![],
            output: None,
        }
    }
}

impl ReportOptions {
    fn reporter_config(&self) -> ReporterConfig {
        ReporterConfig {
            strict: self.strict,
            root_suite: self.root_suite.clone(),
        }
    }
}

/// Load a parsed feature file. `.json` files are read as JSON, anything else
/// as YAML.
///
/// # Errors
///
/// Returns an error if the file cannot be read or decoded.
pub fn load_feature(file: &Path) -> Result<ParsedFeature, String> {
    let input = std::fs::read_to_string(file)
        .map_err(|e| format!("failed to read {}: {e}", file.display()))?;
    if file.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&input).map_err(|e| format!("{}: {e}", file.display()))
    } else {
        serde_yaml::from_str(&input).map_err(|e| format!("{}: {e}", file.display()))
    }
}

/// Run the `discover` command: resolve parsed features into descriptor trees.
///
/// # Errors
///
/// Returns an error if any file fails to load, the format is unknown, or
/// the output cannot be written.
pub fn run_discover(files: &[PathBuf], options: &DiscoverOptions) -> Result<String, String> {
    let root = HierarchyKey::root();
    let features = files
        .iter()
        .map(|file| load_feature(file).map(|parsed| resolve_feature(&root, &parsed)))
        .collect::<Result<Vec<Descriptor>, String>>()?;
    info!(features = features.len(), "features resolved");

    let output = match options.format.as_str() {
        "yaml" => emit_yaml(&features)?,
        "json" => emit_json(&features)?,
        other => return Err(format!("unknown format '{other}' (expected: yaml, json)")),
    };

    if let Some(out_path) = &options.output {
        std::fs::write(out_path, &output)
            .map_err(|e| format!("failed to write {}: {e}", out_path.display()))?;
        Ok(format!("discovery written to {}", out_path.display()))
    } else {
        Ok(output)
    }
}

/// Feed the event log at `log` through a progress reporter writing to `out`.
///
/// Returns the number of events handled. Messages produced before a failure
/// stay written.
///
/// # Errors
///
/// Returns an error if a file cannot be read or an event cannot be decoded,
/// resolved or written.
pub fn report_to<W: Write>(log: &Path, options: &ReportOptions, out: W) -> Result<usize, String> {
    let documents = options
        .features
        .iter()
        .map(|file| load_feature(file))
        .collect::<Result<DocumentRegistry, String>>()?;

    let input =
        File::open(log).map_err(|e| format!("failed to read {}: {e}", log.display()))?;
    let mut reporter = ProgressReporter::with_documents(&options.reporter_config(), documents, out);
    let handled = reporter
        .run(read_events(BufReader::new(input)))
        .map_err(|e| format!("{}: {e}", log.display()))?;
    info!(events = handled, "event log reported");
    Ok(handled)
}

/// Run the `report` command: write the progress protocol for an event log.
///
/// With no output file the protocol streams to stdout and the returned
/// string is empty.
///
/// # Errors
///
/// See [`report_to`]; also fails if the output file cannot be created.
pub fn run_report(log: &Path, options: &ReportOptions) -> Result<String, String> {
    if let Some(out_path) = &options.output {
        let file = File::create(out_path)
            .map_err(|e| format!("failed to write {}: {e}", out_path.display()))?;
        let handled = report_to(log, options, BufWriter::new(file))?;
        Ok(format!(
            "{handled} events reported to {}",
            out_path.display()
        ))
    } else {
        report_to(log, options, std::io::stdout().lock())?;
        Ok(String::new())
    }
}
