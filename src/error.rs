//! Error type shared by the catalog loader, the matcher and the resolvers.
//!
//! Only configuration errors, circular references, malformed catalog
//! documents and unresolved lookups under the `strict` policy are reported
//! through [`CatalogError`]. Missing catalog files, foreign root elements and
//! broken entries degrade to "no mapping" and are only logged.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// A feature was given a value outside of its literal set.
    #[error("invalid value '{value}' for feature '{feature}'")]
    InvalidFeature { feature: &'static str, value: String },
    /// A catalog URI is malformed, relative, or uses an unsupported scheme.
    #[error("invalid catalog URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },
    /// A catalog delegates or chains back to one of its ancestors.
    #[error("circular reference detected in catalog '{uri}'")]
    CircularReference { uri: String },
    /// The catalog document is not well-formed.
    #[error("failed to parse catalog '{uri}': {message}")]
    Parse { uri: String, message: String },
    /// No catalog entry matched and the resolution policy is `strict`.
    #[error("no match found for publicId '{}' and systemId '{}'",
        .public_id.as_deref().unwrap_or("null"),
        .system_id.as_deref().unwrap_or("null"))]
    Unresolved {
        public_id: Option<String>,
        system_id: Option<String>,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl CatalogError {
    pub(crate) fn parse(uri: &str, message: impl ToString) -> Self {
        Self::Parse {
            uri: uri.to_owned(),
            message: message.to_string(),
        }
    }

    pub(crate) fn invalid_uri(uri: &str, reason: impl ToString) -> Self {
        Self::InvalidUri {
            uri: uri.to_owned(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error comes from the configuration rather than from a
    /// catalog document or a lookup.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::InvalidFeature { .. } | Self::InvalidUri { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_message_names_both_identifiers() {
        let err = CatalogError::Unresolved {
            public_id: Some("-//A//DTD B//EN".to_owned()),
            system_id: None,
        };
        assert_eq!(
            err.to_string(),
            "no match found for publicId '-//A//DTD B//EN' and systemId 'null'"
        );
        assert!(!err.is_configuration_error());
    }

    #[test]
    fn configuration_errors() {
        let err = CatalogError::InvalidFeature {
            feature: "prefer",
            value: "both".to_owned(),
        };
        assert!(err.is_configuration_error());
        assert!(CatalogError::invalid_uri("a.xml", "relative URI").is_configuration_error());
    }
}
