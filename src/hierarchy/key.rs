use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::document::ast::{Examples, Scenario, ScenarioOutline, TableCell};
use crate::hierarchy::location::FeatureOrigin;

/// Kind of a hierarchy key segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SegmentType {
    Feature,
    Scenario,
    Outline,
    Examples,
    Example,
}

impl SegmentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Feature => "feature",
            Self::Scenario => "scenario",
            Self::Outline => "outline",
            Self::Examples => "examples",
            Self::Example => "example",
        }
    }
}

impl fmt::Display for SegmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SegmentType {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "feature" => Ok(Self::Feature),
            "scenario" => Ok(Self::Scenario),
            "outline" => Ok(Self::Outline),
            "examples" => Ok(Self::Examples),
            "example" => Ok(Self::Example),
            other => Err(KeyParseError::UnknownSegmentType(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    pub kind: SegmentType,
    pub value: String,
}

/// Structural path of a node, e.g. `[feature:classpath:a.feature]/[outline:11]/[examples:17]/[example:19]`.
///
/// Values below the feature are source line numbers, never names, so a key
/// survives renames and tells apart nodes that share a name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct HierarchyKey {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyParseError {
    #[error("unknown segment type '{0}'")]
    UnknownSegmentType(String),
    #[error("malformed segment '{0}' (expected [type:value])")]
    MalformedSegment(String),
}

impl HierarchyKey {
    /// The empty path, parent of every feature key.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// A copy of this key with one more segment.
    pub fn append(&self, kind: SegmentType, value: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment {
            kind,
            value: value.into(),
        });
        Self { segments }
    }

    pub fn is_prefix_of(&self, other: &HierarchyKey) -> bool {
        other.segments.starts_with(&self.segments)
    }
}

impl fmt::Display for HierarchyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "[{}:{}]", segment.kind, segment.value)?;
        }
        Ok(())
    }
}

impl FromStr for HierarchyKey {
    type Err = KeyParseError;

    /// Parses the rendered form.
    ///
    /// Segments below the first carry line numbers, so they are peeled off
    /// from the right while they look like `kind:<digits>`. Whatever remains
    /// is the first segment, whose value may itself contain `/`, `:` or even
    /// `]/[`. A first-segment value ending in `]/[kind:<digits>` cannot be
    /// told apart from a child segment.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut key = Self::root();
        if s.is_empty() {
            return Ok(key);
        }
        let inner = s
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(|| KeyParseError::MalformedSegment(s.to_owned()))?;

        let mut head = inner;
        let mut tail = Vec::new();
        while let Some((rest, last)) = head.rsplit_once("]/[") {
            let Some(segment) = line_segment(last) else {
                break;
            };
            tail.push(segment);
            head = rest;
        }

        let (kind, value) = head
            .split_once(':')
            .ok_or_else(|| KeyParseError::MalformedSegment(head.to_owned()))?;
        key = key.append(kind.parse()?, value);
        for (kind, value) in tail.into_iter().rev() {
            key = key.append(kind.parse()?, value);
        }
        Ok(key)
    }
}

/// `kind:<line>` split in two, if `part` has that shape.
fn line_segment(part: &str) -> Option<(&str, &str)> {
    let (kind, value) = part.split_once(':')?;
    let shaped = !kind.is_empty()
        && kind.chars().all(|c| c.is_ascii_lowercase())
        && !value.is_empty()
        && value.chars().all(|c| c.is_ascii_digit());
    shaped.then_some((kind, value))
}

impl Serialize for HierarchyKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// `parent` + `[feature:<primary identifier>]`.
pub fn feature_key(parent: &HierarchyKey, origin: &FeatureOrigin) -> HierarchyKey {
    parent.append(SegmentType::Feature, origin.primary_identifier())
}

/// `parent` + `[scenario:<line>]`.
pub fn scenario_key(parent: &HierarchyKey, scenario: &Scenario) -> HierarchyKey {
    parent.append(SegmentType::Scenario, scenario.location.line.to_string())
}

/// `parent` + `[outline:<line>]`.
pub fn outline_key(parent: &HierarchyKey, outline: &ScenarioOutline) -> HierarchyKey {
    parent.append(SegmentType::Outline, outline.location.line.to_string())
}

/// `parent` + `[examples:<line>]`, the line of the `Examples:` keyword.
pub fn examples_key(parent: &HierarchyKey, examples: &Examples) -> HierarchyKey {
    parent.append(SegmentType::Examples, examples.location.line.to_string())
}

/// `parent` + `[example:<line>]`, keyed by the first cell of the row.
pub fn example_key(parent: &HierarchyKey, first_cell: &TableCell) -> HierarchyKey {
    parent.append(SegmentType::Example, first_cell.location.line.to_string())
}
