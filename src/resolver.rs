//! Adapter exposing a [`Catalog`] to entity and URI resolution callers.
//!
//! Unlike [`Catalog::resolve`], the outcome tells apart the `continue` and
//! `ignore` policies: the caller either goes on with its own lookup or
//! substitutes an empty resource.

use tracing::debug;

use crate::{
    catalog::Catalog,
    error::CatalogError,
    features::ResolveMode,
    normalize::is_urn,
    uri::{build_uri, is_absolute_uri, strip_fragment},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A catalog entry maps the identifier to this URI.
    Resolved(String),
    /// No match under the `continue` policy.
    Unresolved,
    /// No match under the `ignore` policy.
    Empty,
}

impl Resolution {
    pub fn uri(&self) -> Option<&str> {
        match self {
            Self::Resolved(uri) => Some(uri),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

#[derive(Debug, Clone)]
pub struct CatalogResolver {
    catalog: Catalog,
}

impl CatalogResolver {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn outcome(
        &self,
        found: Option<String>,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> Result<Resolution, CatalogError> {
        match (found, self.catalog.resolve_mode()) {
            (Some(uri), _) => Ok(Resolution::Resolved(uri)),
            (None, ResolveMode::Strict) => Err(CatalogError::Unresolved {
                public_id: public_id.map(str::to_owned),
                system_id: system_id.map(str::to_owned),
            }),
            (None, ResolveMode::Continue) => Ok(Resolution::Unresolved),
            (None, ResolveMode::Ignore) => Ok(Resolution::Empty),
        }
    }

    /// Resolve the external identifier of an entity.
    pub fn resolve_entity(
        &self,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> Result<Resolution, CatalogError> {
        let found = self.catalog.lookup_external(public_id, system_id)?;
        self.outcome(found, public_id, system_id)
    }

    /// Resolve a reference such as the `href` of an XInclude or an
    /// `xsl:import`.
    ///
    /// The fragment identifier is ignored. A relative `href` that has no
    /// match is tried again after being made absolute against `base`.
    pub fn resolve_href(&self, href: &str, base: Option<&str>) -> Result<Resolution, CatalogError> {
        let uri = strip_fragment(href);
        let mut found = self.catalog.lookup_uri(uri)?;
        if found.is_none() && !is_urn(uri) && !is_absolute_uri(uri) {
            if let Some(absolute) = base.and_then(|base| build_uri(uri, base)) {
                debug!("{href}: trying {absolute}");
                found = self.catalog.lookup_uri(&absolute)?;
            }
        }
        self.outcome(found, None, Some(href))
    }

    /// Resolve a resource, such as a schema import, known by its public
    /// and system identifiers.
    ///
    /// A relative system identifier that has no match is tried again after
    /// being made absolute against `base`.
    pub fn resolve_resource(
        &self,
        public_id: Option<&str>,
        system_id: Option<&str>,
        base: Option<&str>,
    ) -> Result<Resolution, CatalogError> {
        let mut found = self.catalog.lookup_external(public_id, system_id)?;
        if found.is_none() {
            if let Some(absolute) = system_id
                .filter(|id| !is_urn(id) && !is_absolute_uri(id))
                .zip(base)
                .and_then(|(id, base)| build_uri(id, base))
            {
                debug!("{}: trying {absolute}", system_id.unwrap_or_default());
                found = self.catalog.lookup_external(public_id, Some(&absolute))?;
            }
        }
        self.outcome(found, public_id, system_id)
    }
}
