//! Hierarchy resolution and progress reporting for Gherkin feature runs.
//!
//! [`hierarchy`] turns parsed feature documents into stable keys, names and
//! source origins; [`progress`] turns a run's lifecycle events into
//! `##teamcity[...]` service messages.

pub mod cli;
pub mod document;
pub mod emit;
pub mod hierarchy;
pub mod logging;
pub mod progress;
pub mod util;
