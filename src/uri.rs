//! Provide helpers for handling the URIs found in catalogs.
//!
//! Catalog entries store absolute URIs. Relative references found in
//! catalog documents are made absolute against the effective base URI
//! (RFC 3986 section 5.2) with [`build_uri`].

use std::{
    borrow::Cow,
    env::current_dir,
    path::{Path, PathBuf},
};

use url::{ParseError, Url};

use crate::error::CatalogError;

/// URI schemes accepted for catalog files.
pub const SUPPORTED_SCHEMES: &[&str] = &["file", "jar", "http", "https"];

/// Computes the final URI of the reference by checking that the given URI
/// is valid, and building the final URI using the base URI.
///
/// An absolute `uri` is returned in its canonical serialization. If `base`
/// cannot be parsed, the reference is returned as is.
///
/// Returns a new URI string or `None` if the reference cannot be resolved.
pub fn build_uri(uri: &str, base: &str) -> Option<String> {
    match Url::parse(uri) {
        Ok(url) => return Some(url.into()),
        Err(ParseError::RelativeUrlWithoutBase) => {}
        Err(_) => return None,
    }
    let Ok(base) = Url::parse(base) else {
        return Some(uri.to_owned());
    };
    base.join(uri).ok().map(String::from)
}

/// Check if `uri` has a scheme.
pub fn is_absolute_uri(uri: &str) -> bool {
    Url::parse(uri).is_ok()
}

/// Validate a URI naming a catalog file.
///
/// The URI must be absolute and use one of [`SUPPORTED_SCHEMES`]. The
/// serialization of the returned [`Url`] is the key catalogs are registered
/// under.
pub fn validate_catalog_uri(uri: &str) -> Result<Url, CatalogError> {
    let url = match Url::parse(uri) {
        Ok(url) => url,
        Err(ParseError::RelativeUrlWithoutBase) => {
            return Err(CatalogError::invalid_uri(uri, "relative URI"));
        }
        Err(e) => return Err(CatalogError::invalid_uri(uri, e)),
    };
    if !SUPPORTED_SCHEMES.contains(&url.scheme()) {
        return Err(CatalogError::invalid_uri(
            uri,
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

/// Remove the fragment identifier, if any.
pub fn strip_fragment(uri: &str) -> &str {
    uri.split_once('#').map_or(uri, |(uri, _)| uri)
}

/// Constructs a `file:` URI expressing the existing path.
///
/// Relative paths are made absolute against the current directory.
pub fn path_to_uri(path: impl AsRef<Path>) -> Option<String> {
    let path = path.as_ref();
    let path = if path.is_absolute() {
        Cow::Borrowed(path)
    } else {
        Cow::Owned(current_dir().ok()?.join(path))
    };
    Url::from_file_path(path.as_ref()).ok().map(String::from)
}

/// Convert a `file:` URI back to a local path.
pub fn uri_to_path(uri: &str) -> Option<PathBuf> {
    let url = Url::parse(uri).ok()?;
    if url.scheme() != "file" {
        return None;
    }
    url.to_file_path().ok()
}

/// Returns `path` unchanged if it is already an absolute URI, otherwise
/// interprets it as a local path and converts it to a `file:` URI.
///
/// Single-letter schemes are treated as Windows drive letters.
pub fn canonic_path(path: &str) -> Cow<'_, str> {
    if let Ok(url) = Url::parse(path) {
        if url.scheme().len() > 1 {
            return Cow::Borrowed(path);
        }
    }
    path_to_uri(path).map_or(Cow::Borrowed(path), Cow::Owned)
}
