//! Resolution of public identifiers, system identifiers and URI references
//! through OASIS XML Catalogs.
//!
//! The entry point is [`CatalogManager`] (or [`CatalogLoader`] when a custom
//! resource loader or parser is needed):
//!
//! ```no_run
//! use xml_catalog::{CatalogFeatures, CatalogManager};
//!
//! # fn main() -> Result<(), xml_catalog::CatalogError> {
//! let features = CatalogFeatures::default();
//! let catalog = CatalogManager::catalog(features, ["file:///etc/xml/catalog"])?;
//! let resolved = catalog.resolve(None, Some("http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd"))?;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod encoding;
pub mod error;
pub mod features;
pub mod manager;
pub mod normalize;
pub mod resolver;
pub mod uri;

pub use catalog::{
    Catalog, CatalogDocument, CatalogLoader,
    entry::{CatalogEntry, CatalogEntryType},
    parser::{
        CatalogParser, FileResourceLoader, MemoryResourceLoader, ResourceLoader, XmlCatalogParser,
    },
    reader::{Attributes, CatalogHandler, CatalogReader},
};
pub use error::CatalogError;
pub use features::{CatalogFeatures, Feature, PreferMode, ResolveMode};
pub use manager::CatalogManager;
pub use resolver::{CatalogResolver, Resolution};

pub const SYSCONFDIR: &str = if let Some(sysconfdir) = option_env!("SYSCONFDIR") {
    sysconfdir
} else {
    "/etc"
};
