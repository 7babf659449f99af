use thiserror::Error;

/// A document referenced by uri is not in the registry.
///
/// Always a sequencing defect upstream: every document must be read before
/// anything asks about it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("no document was read for {uri}")]
    DocumentNotRead { uri: String },
}
