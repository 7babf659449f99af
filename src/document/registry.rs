use std::collections::HashMap;

use tracing::{debug, warn};

use crate::document::ast::ParsedFeature;
use crate::document::error::LookupError;

/// Registry of parsed feature documents for one run.
///
/// Filled from source-read notifications before any hierarchy or reporting
/// query touches a document, and only read afterwards.
#[derive(Debug, Default)]
pub struct DocumentRegistry {
    documents: HashMap<String, ParsedFeature>,
}

impl DocumentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            documents: HashMap::new(),
        }
    }

    /// Store a parsed document under `uri`. A second put for the same uri
    /// replaces the first.
    pub fn put(&mut self, uri: impl Into<String>, document: ParsedFeature) {
        let uri = uri.into();
        debug!(%uri, feature = %document.feature.name, "document read");
        if self.documents.insert(uri.clone(), document).is_some() {
            warn!(%uri, "document read twice, keeping the latest");
        }
    }

    /// Store a document under its own declared uri.
    pub fn register(&mut self, document: ParsedFeature) {
        let uri = document.uri.clone();
        self.put(uri, document);
    }

    /// Look up a document by uri.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::DocumentNotRead`] if nothing was put under `uri`.
    pub fn get(&self, uri: &str) -> Result<&ParsedFeature, LookupError> {
        self.documents
            .get(uri)
            .ok_or_else(|| LookupError::DocumentNotRead {
                uri: uri.to_owned(),
            })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl FromIterator<ParsedFeature> for DocumentRegistry {
    fn from_iter<I: IntoIterator<Item = ParsedFeature>>(iter: I) -> Self {
        let mut registry = Self::new();
        for document in iter {
            registry.register(document);
        }
        registry
    }
}
