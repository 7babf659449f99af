use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::util::position::Position;

/// A feature document as handed over by the external parser.
///
/// `uri` is the identifier the document was scanned under (for example
/// `classpath:com/example/login.feature`), `path` is where it was found on
/// disk. The two are kept apart because neither can be derived from the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedFeature {
    pub uri: String,
    pub path: PathBuf,
    pub feature: Feature,
}

/// A tag such as `@smoke`, name kept with its `@` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub location: Position,
}

/// A given/when/then step line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub keyword: String,
    pub text: String,
    pub location: Position,
}

/// The top-level unit of a feature file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub name: String,
    #[serde(default = "feature_keyword")]
    pub keyword: String,
    pub location: Position,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub children: Vec<FeatureChild>,
}

fn feature_keyword() -> String {
    "Feature".to_owned()
}

/// A direct child of a [`Feature`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeatureChild {
    Background(Background),
    Scenario(Scenario),
    ScenarioOutline(ScenarioOutline),
}

/// Steps shared by every scenario of a feature. Never executed on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Background {
    #[serde(default)]
    pub name: String,
    pub location: Position,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    pub location: Position,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// A templated scenario; every table row of its examples becomes one case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOutline {
    #[serde(default)]
    pub name: String,
    pub location: Position,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub examples: Vec<Examples>,
}

/// An examples table attached to an outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Examples {
    #[serde(default)]
    pub name: String,
    #[serde(default = "examples_keyword")]
    pub keyword: String,
    pub location: Position,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<TableRow>,
    #[serde(default)]
    pub rows: Vec<TableRow>,
}

fn examples_keyword() -> String {
    "Examples".to_owned()
}

impl Examples {
    /// 1-based index of the body row declared at `line`, if any.
    pub fn row_index(&self, line: usize) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.location.line == line)
            .map(|i| i + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    pub location: Position,
    #[serde(default)]
    pub cells: Vec<TableCell>,
}

impl TableRow {
    pub fn first_cell(&self) -> Option<&TableCell> {
        self.cells.first()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCell {
    pub location: Position,
    #[serde(default)]
    pub value: String,
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Hand-built documents shared by unit tests across the crate.

    use super::*;

    pub(crate) fn tag(name: &str, line: usize) -> Tag {
        Tag {
            name: name.into(),
            location: Position::new(line, 1),
        }
    }

    pub(crate) fn row(line: usize, column: usize, values: &[&str]) -> TableRow {
        TableRow {
            location: Position::new(line, column - 2),
            cells: values
                .iter()
                .enumerate()
                .map(|(i, v)| TableCell {
                    location: Position::new(line, column + i * 6),
                    value: (*v).into(),
                })
                .collect(),
        }
    }

    /// ```text
    ///  1 @FeatureTag
    ///  2 Feature: A feature with scenario outlines
    ///  4   @ScenarioTag
    ///  5   Scenario: A scenario
    ///  6     Given a scenario
    /// 10   @ScenarioOutlineTag
    /// 11   Scenario Outline: A scenario outline
    /// 12     Given an outline with <value>
    /// 16     @Example1Tag
    /// 17     Examples: With some text
    /// 18       | value |
    /// 19       | A     |
    /// 20       | B     |
    /// 22     Examples: With some other text
    /// 23       | value |
    /// 24       | C     |
    /// 25       | D     |
    /// ```
    pub(crate) fn outline_feature() -> ParsedFeature {
        ParsedFeature {
            uri: "classpath:io/cucumber/jupiter/engine/feature-with-outline.feature".into(),
            path: "/work/target/test-classes/io/cucumber/jupiter/engine/feature-with-outline.feature"
                .into(),
            feature: Feature {
                name: "A feature with scenario outlines".into(),
                keyword: "Feature".into(),
                location: Position::new(2, 1),
                tags: vec![tag("@FeatureTag", 1)],
                children: vec![
                    FeatureChild::Scenario(Scenario {
                        name: "A scenario".into(),
                        location: Position::new(5, 3),
                        tags: vec![tag("@ScenarioTag", 4)],
                        steps: vec![Step {
                            keyword: "Given ".into(),
                            text: "a scenario".into(),
                            location: Position::new(6, 5),
                        }],
                    }),
                    FeatureChild::ScenarioOutline(ScenarioOutline {
                        name: "A scenario outline".into(),
                        location: Position::new(11, 3),
                        tags: vec![tag("@ScenarioOutlineTag", 10)],
                        steps: vec![Step {
                            keyword: "Given ".into(),
                            text: "an outline with <value>".into(),
                            location: Position::new(12, 5),
                        }],
                        examples: vec![
                            Examples {
                                name: "With some text".into(),
                                keyword: "Examples".into(),
                                location: Position::new(17, 5),
                                tags: vec![tag("@Example1Tag", 16)],
                                header: Some(row(18, 9, &["value"])),
                                rows: vec![row(19, 9, &["A"]), row(20, 9, &["B"])],
                            },
                            Examples {
                                name: "With some other text".into(),
                                keyword: "Examples".into(),
                                location: Position::new(22, 5),
                                tags: vec![],
                                header: Some(row(23, 9, &["value"])),
                                rows: vec![row(24, 9, &["C"]), row(25, 9, &["D"])],
                            },
                        ],
                    }),
                ],
            },
        }
    }

    /// A single-scenario feature: `Login` / `Valid login` at line 3.
    pub(crate) fn login_feature(uri: &str) -> ParsedFeature {
        ParsedFeature {
            uri: uri.into(),
            path: format!("/work/features/{}", uri.rsplit('/').next().unwrap_or(uri)).into(),
            feature: Feature {
                name: "Login".into(),
                keyword: "Feature".into(),
                location: Position::new(1, 1),
                tags: vec![],
                children: vec![FeatureChild::Scenario(Scenario {
                    name: "Valid login".into(),
                    location: Position::new(3, 3),
                    tags: vec![],
                    steps: vec![Step {
                        keyword: "Given ".into(),
                        text: "a registered user".into(),
                        location: Position::new(4, 5),
                    }],
                })],
            },
        }
    }
}
