//! Shorthands for creating catalogs and resolvers.

use crate::{
    catalog::{Catalog, CatalogLoader},
    error::CatalogError,
    features::CatalogFeatures,
    resolver::CatalogResolver,
};

pub struct CatalogManager;

impl CatalogManager {
    /// Load a catalog from local files.
    ///
    /// If `uris` is empty, the `files` feature is used.
    pub fn catalog<I, S>(features: CatalogFeatures, uris: I) -> Result<Catalog, CatalogError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        CatalogLoader::new(features).load(uris)
    }

    pub fn catalog_resolver(catalog: Catalog) -> CatalogResolver {
        CatalogResolver::new(catalog)
    }
}
