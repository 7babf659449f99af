use std::collections::BTreeSet;

use serde::Serialize;
use tracing::warn;

use crate::document::ast::{
    Examples, FeatureChild, ParsedFeature, Scenario, ScenarioOutline, Tag,
};
use crate::hierarchy::key::{
    HierarchyKey, example_key, examples_key, feature_key, outline_key, scenario_key,
};
use crate::hierarchy::location::{CompositeOrigin, FeatureOrigin, package_of_resource};
use crate::hierarchy::names::{display_name, example_name};

/// Whether a descriptor groups others or is executed itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorKind {
    Container,
    Test,
}

/// One node of the execution hierarchy handed to the host engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Descriptor {
    pub key: HierarchyKey,
    pub name: String,
    pub kind: DescriptorKind,
    pub origin: CompositeOrigin,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Descriptor>,
}

impl Descriptor {
    /// Package of the classpath resource this node was loaded from, e.g.
    /// `io.cucumber.jupiter.engine`.
    pub fn package_name(&self) -> Option<String> {
        self.origin.classpath_resource().map(package_of_resource)
    }

    /// Depth-first search for the descriptor with `key`.
    pub fn find(&self, key: &HierarchyKey) -> Option<&Descriptor> {
        if &self.key == key {
            return Some(self);
        }
        if !self.key.is_prefix_of(key) {
            return None;
        }
        self.children.iter().find_map(|child| child.find(key))
    }

    /// All test leaves below (and including) this node, in source order.
    pub fn tests(&self) -> Vec<&Descriptor> {
        let mut out = Vec::new();
        self.collect_tests(&mut out);
        out
    }

    fn collect_tests<'a>(&'a self, out: &mut Vec<&'a Descriptor>) {
        match self.kind {
            DescriptorKind::Test => out.push(self),
            DescriptorKind::Container => {
                for child in &self.children {
                    child.collect_tests(out);
                }
            }
        }
    }
}

/// Resolve a parsed feature into its descriptor tree below `parent`.
///
/// Feature → scenarios and outlines; outline → examples blocks; examples →
/// one example per body row. Backgrounds produce nothing.
pub fn resolve_feature(parent: &HierarchyKey, parsed: &ParsedFeature) -> Descriptor {
    let origin = FeatureOrigin::create(parsed);
    let feature = &parsed.feature;
    let key = feature_key(parent, &origin);
    let feature_tags = tag_names(&feature.tags);

    let children = feature
        .children
        .iter()
        .filter_map(|child| match child {
            FeatureChild::Scenario(scenario) => {
                Some(resolve_scenario(&key, &origin, &feature_tags, scenario))
            }
            FeatureChild::ScenarioOutline(outline) => {
                Some(resolve_outline(&key, &origin, &feature_tags, outline))
            }
            FeatureChild::Background(_) => None,
        })
        .collect();

    Descriptor {
        key,
        name: display_name(&feature.name).to_owned(),
        kind: DescriptorKind::Container,
        origin: origin.feature_origin(),
        tags: BTreeSet::new(),
        children,
    }
}

fn resolve_scenario(
    parent: &HierarchyKey,
    origin: &FeatureOrigin,
    feature_tags: &BTreeSet<String>,
    scenario: &Scenario,
) -> Descriptor {
    let mut tags = feature_tags.clone();
    tags.extend(tag_names(&scenario.tags));
    Descriptor {
        key: scenario_key(parent, scenario),
        name: display_name(&scenario.name).to_owned(),
        kind: DescriptorKind::Test,
        origin: origin.node_origin(scenario.location),
        tags,
        children: Vec::new(),
    }
}

fn resolve_outline(
    parent: &HierarchyKey,
    origin: &FeatureOrigin,
    feature_tags: &BTreeSet<String>,
    outline: &ScenarioOutline,
) -> Descriptor {
    let key = outline_key(parent, outline);
    let mut inherited = feature_tags.clone();
    inherited.extend(tag_names(&outline.tags));

    let children = outline
        .examples
        .iter()
        .map(|examples| resolve_examples(&key, origin, &inherited, examples))
        .collect();

    Descriptor {
        key,
        name: display_name(&outline.name).to_owned(),
        kind: DescriptorKind::Container,
        origin: origin.node_origin(outline.location),
        tags: BTreeSet::new(),
        children,
    }
}

fn resolve_examples(
    parent: &HierarchyKey,
    origin: &FeatureOrigin,
    inherited: &BTreeSet<String>,
    examples: &Examples,
) -> Descriptor {
    let key = examples_key(parent, examples);
    let mut tags = inherited.clone();
    tags.extend(tag_names(&examples.tags));

    let mut children = Vec::with_capacity(examples.rows.len());
    for (i, row) in examples.rows.iter().enumerate() {
        let Some(first_cell) = row.first_cell() else {
            warn!(line = row.location.line, "examples row without cells skipped");
            continue;
        };
        children.push(Descriptor {
            key: example_key(&key, first_cell),
            name: example_name(i + 1),
            kind: DescriptorKind::Test,
            origin: origin.node_origin(first_cell.location),
            tags: tags.clone(),
            children: Vec::new(),
        });
    }

    let name = if examples.name.is_empty() {
        examples.keyword.clone()
    } else {
        examples.name.clone()
    };

    Descriptor {
        key,
        name,
        kind: DescriptorKind::Container,
        origin: origin.node_origin(examples.location),
        tags: BTreeSet::new(),
        children,
    }
}

/// Characters a host engine reserves for its tag expressions.
const RESERVED_TAG_CHARS: [char; 6] = [',', '(', ')', '&', '|', '!'];

/// Whether `name` (without its `@`) can be handed to the host engine as a
/// tag: not blank after trimming, and free of inner whitespace, control
/// characters and reserved characters.
pub fn is_valid_tag(name: &str) -> bool {
    let name = name.strip_prefix('@').unwrap_or(name).trim();
    !name.is_empty()
        && !name
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || RESERVED_TAG_CHARS.contains(&c))
}

fn tag_names(tags: &[Tag]) -> BTreeSet<String> {
    tags.iter()
        .filter(|t| {
            let valid = is_valid_tag(&t.name);
            if !valid {
                warn!(tag = %t.name, line = t.location.line, "invalid tag dropped");
            }
            valid
        })
        .map(|t| t.name.trim().to_owned())
        .collect()
}
