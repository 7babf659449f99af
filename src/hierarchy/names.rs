use crate::document::ast::{Examples, Feature, FeatureChild, Scenario, ScenarioOutline, TableRow};
use crate::document::error::LookupError;
use crate::document::registry::DocumentRegistry;

/// Label used for anything whose declared name is empty.
pub const NAMELESS: &str = "Nameless";

/// The executable node a case line points at.
#[derive(Debug, Clone, Copy)]
pub enum CaseNode<'a> {
    Scenario(&'a Scenario),
    /// One body row of an outline's examples table.
    Example {
        outline: &'a ScenarioOutline,
        examples: &'a Examples,
        row: &'a TableRow,
        /// 1-based index of the row within its examples block.
        index: usize,
    },
}

impl CaseNode<'_> {
    /// Display name of the node, [`NAMELESS`] when empty.
    pub fn name(&self) -> String {
        match self {
            Self::Scenario(scenario) => display_name(&scenario.name).to_owned(),
            Self::Example { index, .. } => example_name(*index),
        }
    }
}

/// Label of the `index`-th (1-based) row of an examples block.
pub fn example_name(index: usize) -> String {
    format!("Example #{index}")
}

/// `name`, or [`NAMELESS`] when it is empty.
pub fn display_name(name: &str) -> &str {
    if name.is_empty() { NAMELESS } else { name }
}

/// Find the top-level child occupying `line`.
///
/// A scenario occupies its own declared line. An outline occupies the lines
/// of its examples body rows, not its header, because every generated case
/// points at the row it came from. Backgrounds occupy nothing.
pub fn locate(feature: &Feature, line: usize) -> Option<CaseNode<'_>> {
    feature.children.iter().find_map(|child| match child {
        FeatureChild::Scenario(scenario) => {
            (scenario.location.line == line).then_some(CaseNode::Scenario(scenario))
        }
        FeatureChild::ScenarioOutline(outline) => {
            outline.examples.iter().find_map(|examples| {
                let index = examples.row_index(line)?;
                Some(CaseNode::Example {
                    outline,
                    examples,
                    row: &examples.rows[index - 1],
                    index,
                })
            })
        }
        FeatureChild::Background(_) => None,
    })
}

/// Display name of the scenario or example at `line` of document `uri`.
///
/// Falls back to [`NAMELESS`] when nothing occupies the line or the match has
/// an empty name.
///
/// # Errors
///
/// Returns [`LookupError`] if no document was read for `uri`.
pub fn name_of(registry: &DocumentRegistry, uri: &str, line: usize) -> Result<String, LookupError> {
    let document = registry.get(uri)?;
    Ok(locate(&document.feature, line)
        .map(|node| node.name())
        .unwrap_or_else(|| NAMELESS.to_owned()))
}

/// Header line of the examples block whose body contains `line`, if the line
/// is an outline row.
///
/// # Errors
///
/// Returns [`LookupError`] if no document was read for `uri`.
pub fn examples_line_of(
    registry: &DocumentRegistry,
    uri: &str,
    line: usize,
) -> Result<Option<usize>, LookupError> {
    let document = registry.get(uri)?;
    Ok(match locate(&document.feature, line) {
        Some(CaseNode::Example { examples, .. }) => Some(examples.location.line),
        Some(CaseNode::Scenario(_)) | None => None,
    })
}

/// Display name of the feature of document `uri`.
///
/// # Errors
///
/// Returns [`LookupError`] if no document was read for `uri`.
pub fn feature_name_of(registry: &DocumentRegistry, uri: &str) -> Result<String, LookupError> {
    let document = registry.get(uri)?;
    Ok(display_name(&document.feature.name).to_owned())
}
