use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::document::ast::ParsedFeature;
use crate::util::position::Position;

/// Scheme of resources loaded from the classpath, e.g. `classpath:com/example/a.feature`.
pub const CLASSPATH_SCHEME: &str = "classpath";
const FILE_SCHEME: &str = "file";

/// Where a resource lives, in the form a consumer can navigate to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceLocation {
    /// A file on disk.
    File { path: PathBuf },
    /// A classpath resource name, always starting with `/`.
    Classpath { resource: String },
    /// Anything else, kept verbatim.
    Uri { uri: String },
}

impl ResourceLocation {
    /// Classify a resource identifier.
    ///
    /// Classpath identifiers win, then anything that resolves to a file-system
    /// path (a `file:` URI or a bare path), and everything else falls back to
    /// an opaque URI.
    pub fn classify(identifier: &str) -> Self {
        match split_scheme(identifier) {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case(CLASSPATH_SCHEME) => {
                Self::classpath(rest)
            }
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case(FILE_SCHEME) => {
                match file_uri_path(rest) {
                    Some(path) => Self::File { path },
                    None => Self::Uri {
                        uri: identifier.to_owned(),
                    },
                }
            }
            Some(_) => Self::Uri {
                uri: identifier.to_owned(),
            },
            None if identifier.is_empty() => Self::Uri { uri: String::new() },
            None => Self::File {
                path: PathBuf::from(identifier),
            },
        }
    }

    /// A classpath location, normalising the leading separator.
    pub fn classpath(resource: &str) -> Self {
        let resource = if resource.starts_with('/') {
            resource.to_owned()
        } else {
            format!("/{resource}")
        };
        Self::Classpath { resource }
    }

    /// Stringified identifier of this location.
    ///
    /// Classpath resources render without the leading separator
    /// (`classpath:com/example/a.feature`), files as `file://` URIs.
    pub fn identifier(&self) -> String {
        match self {
            Self::File { path } => file_uri(path),
            Self::Classpath { resource } => {
                format!("{CLASSPATH_SCHEME}:{}", resource.trim_start_matches('/'))
            }
            Self::Uri { uri } => uri.clone(),
        }
    }

    /// Pair this location with a position. Opaque URIs cannot be navigated to
    /// a line, so they drop it.
    pub fn at(&self, position: Position) -> Origin {
        let position = match self {
            Self::Uri { .. } => None,
            Self::File { .. } | Self::Classpath { .. } => Some(position),
        };
        Origin {
            location: self.clone(),
            position,
        }
    }
}

/// A location plus the position inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Origin {
    #[serde(flatten)]
    pub location: ResourceLocation,
    #[serde(flatten)]
    pub position: Option<Position>,
}

/// The same point seen from several perspectives, in display priority order.
///
/// Equality ignores order: two composites are equal when they hold the same
/// origins.
#[derive(Debug, Clone, Eq, Serialize)]
#[serde(transparent)]
pub struct CompositeOrigin {
    origins: Vec<Origin>,
}

impl CompositeOrigin {
    pub fn new(first: Origin, rest: impl IntoIterator<Item = Origin>) -> Self {
        let mut origins = vec![first];
        origins.extend(rest);
        Self { origins }
    }

    pub fn origins(&self) -> &[Origin] {
        &self.origins
    }

    pub fn contains(&self, origin: &Origin) -> bool {
        self.origins.contains(origin)
    }

    /// The first classpath resource name among the origins.
    pub fn classpath_resource(&self) -> Option<&str> {
        self.origins.iter().find_map(|o| match &o.location {
            ResourceLocation::Classpath { resource } => Some(resource.as_str()),
            _ => None,
        })
    }
}

impl PartialEq for CompositeOrigin {
    fn eq(&self, other: &Self) -> bool {
        self.origins.iter().all(|o| other.contains(o))
            && other.origins.iter().all(|o| self.contains(o))
    }
}

/// Origins of one feature document: the location derived from its declared
/// uri and the one derived from its resolved path.
///
/// IDEs and CI tools differ in which of the two they can navigate to, so
/// every origin handed out carries both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureOrigin {
    declared: ResourceLocation,
    resolved: ResourceLocation,
    feature_position: Position,
}

impl FeatureOrigin {
    pub fn create(parsed: &ParsedFeature) -> Self {
        Self {
            declared: ResourceLocation::classify(&parsed.uri),
            resolved: ResourceLocation::classify(&file_uri(&parsed.path)),
            feature_position: parsed.feature.location,
        }
    }

    /// Origin of the feature itself.
    pub fn feature_origin(&self) -> CompositeOrigin {
        self.node_origin(self.feature_position)
    }

    /// Origin of any node inside the feature, at its own position.
    pub fn node_origin(&self, position: Position) -> CompositeOrigin {
        CompositeOrigin::new(self.declared.at(position), [self.resolved.at(position)])
    }

    /// Identifier used as the value of the `feature` key segment.
    pub fn primary_identifier(&self) -> String {
        self.declared.identifier()
    }
}

/// Package of a classpath resource: its directory with `/` replaced by `.`.
pub fn package_of_resource(resource: &str) -> String {
    let resource = resource.trim_start_matches('/');
    match resource.rfind('/') {
        Some(idx) => resource[..idx].replace('/', "."),
        None => String::new(),
    }
}

/// Split `scheme:rest`. Single-letter schemes are treated as drive letters.
fn split_scheme(identifier: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = identifier.split_once(':')?;
    let mut chars = scheme.chars();
    let valid = scheme.len() > 1
        && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some((scheme, rest))
}

/// Path named by the scheme-specific part of a `file:` URI, if it names a
/// local file.
fn file_uri_path(rest: &str) -> Option<PathBuf> {
    let path = match rest.strip_prefix("//") {
        Some(authority_and_path) => {
            let (authority, path) = match authority_and_path.find('/') {
                Some(idx) => authority_and_path.split_at(idx),
                None => (authority_and_path, ""),
            };
            if !(authority.is_empty() || authority.eq_ignore_ascii_case("localhost")) {
                return None;
            }
            path
        }
        None => rest,
    };
    if path.is_empty() {
        return None;
    }
    percent_decode(path).map(PathBuf::from)
}

fn percent_decode(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = s.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

fn file_uri(path: &Path) -> String {
    let path = path
        .to_string_lossy()
        .replace('%', "%25")
        .replace(' ', "%20");
    if path.starts_with('/') {
        format!("{FILE_SCHEME}://{path}")
    } else {
        format!("{FILE_SCHEME}:{path}")
    }
}
