use std::sync::Arc;

use tracing::{debug, info};

use super::{
    Catalog, CatalogDocument,
    parser::{CatalogParser, FileResourceLoader, ResourceLoader, XmlCatalogParser},
    session::{LoadingSession, read_document},
};
use crate::{error::CatalogError, features::CatalogFeatures, uri::validate_catalog_uri};

/// Create [`Catalog`]s from lists of catalog URIs.
pub struct CatalogLoader {
    features: CatalogFeatures,
    resource_loader: Arc<dyn ResourceLoader>,
    parser: Arc<dyn CatalogParser>,
}

impl CatalogLoader {
    /// A loader reading local files with [`XmlCatalogParser`].
    pub fn new(features: CatalogFeatures) -> Self {
        Self {
            features,
            resource_loader: Arc::new(FileResourceLoader),
            parser: Arc::new(XmlCatalogParser),
        }
    }

    pub fn with_resource_loader(mut self, loader: impl ResourceLoader + 'static) -> Self {
        self.resource_loader = Arc::new(loader);
        self
    }

    pub fn with_parser(mut self, parser: impl CatalogParser + 'static) -> Self {
        self.parser = Arc::new(parser);
        self
    }

    pub fn features(&self) -> &CatalogFeatures {
        &self.features
    }

    /// Load the catalog hierarchy rooted at the first readable URI of `uris`.
    ///
    /// If `uris` is empty, the `files` feature is used instead. Every URI
    /// must be absolute and use a supported scheme; catalogs are identified
    /// by the canonical form of their URI. URIs that cannot be
    /// read are skipped; if none can be read, the catalog is empty.
    ///
    /// The `prefer`, `defer` and `resolve` attributes of the main catalog
    /// override the configured features.
    #[doc(alias = "xmlLoadCatalogs")]
    pub fn load<I, S>(&self, uris: I) -> Result<Catalog, CatalogError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let uris = uris
            .into_iter()
            .filter(|uri| !uri.as_ref().trim().is_empty())
            .map(|uri| validate_catalog_uri(uri.as_ref().trim()).map(String::from))
            .collect::<Result<Vec<_>, _>>()?;
        let uris = if uris.is_empty() {
            self.features.files().to_vec()
        } else {
            uris
        };

        let mut main = None;
        for (i, uri) in uris.iter().enumerate() {
            if let Some(document) = read_document(
                &*self.resource_loader,
                &*self.parser,
                uri,
                self.features.prefer(),
            )? {
                main = Some((i, document));
                break;
            }
        }
        let Some((index, document)) = main else {
            info!("no readable catalog, the catalog is empty");
            let system_id = uris.first().map_or("", |uri| uri.as_str());
            let document = CatalogDocument::empty(system_id, self.features.prefer());
            let session = LoadingSession::new(
                &self.features,
                self.resource_loader.clone(),
                self.parser.clone(),
            );
            return Ok(Catalog::new(Arc::new(document), vec![], Arc::new(session)));
        };

        let mut input_files: Vec<String> = vec![];
        for uri in &uris[index + 1..] {
            if uri != document.system_id() && !input_files.contains(uri) {
                input_files.push(uri.clone());
            }
        }

        let mut settings = self.features.clone();
        if let Some(prefer) = document.prefer_attr() {
            settings.set_prefer(prefer);
        }
        if let Some(defer) = document.defer_attr() {
            settings.set_defer(defer);
        }
        if let Some(resolve) = document.resolve_attr() {
            settings.set_resolve(resolve);
        }
        debug!(
            "{}: prefer={}, defer={}, resolve={}",
            document.system_id(),
            settings.prefer(),
            settings.defer(),
            settings.resolve()
        );

        let session = Arc::new(LoadingSession::new(
            &settings,
            self.resource_loader.clone(),
            self.parser.clone(),
        ));
        let document = Arc::new(document);
        session.register(document.clone());
        if !settings.defer() {
            session.load_eagerly(&document, &input_files)?;
        }
        Ok(Catalog::new(document, input_files, session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::parser::MemoryResourceLoader,
        features::{Feature, PreferMode, ResolveMode},
    };

    const HEAD: &str = r#"<catalog xmlns="urn:oasis:names:tc:entity:xmlns:xml:catalog""#;

    fn features() -> CatalogFeatures {
        CatalogFeatures::builder()
            .ignore_environment()
            .defaults_file(None::<&str>)
            .with(Feature::Resolve, "continue")
            .build()
            .unwrap()
    }

    #[test]
    fn first_readable_uri_is_main() {
        let loader = MemoryResourceLoader::new()
            .with("file:///b.xml", format!("{HEAD}/>"))
            .with("file:///c.xml", format!("{HEAD}/>"));
        let catalog = CatalogLoader::new(features())
            .with_resource_loader(loader)
            .load([
                "file:///a.xml",
                "file:///b.xml",
                "file:///c.xml",
                "file:///b.xml",
            ])
            .unwrap();
        assert_eq!(catalog.document().system_id(), "file:///b.xml");
        assert_eq!(catalog.alternates(), ["file:///c.xml"]);
        assert_eq!(catalog.loaded_catalogs(), ["file:///b.xml"]);
    }

    #[test]
    fn root_attributes_override_features() {
        let loader = MemoryResourceLoader::new()
            .with(
                "file:///a.xml",
                format!(r#"{HEAD} prefer="system" defer="false" resolve="ignore"><nextCatalog catalog="n.xml"/></catalog>"#),
            )
            .with("file:///n.xml", format!("{HEAD}/>"));
        let catalog = CatalogLoader::new(features())
            .with_resource_loader(loader)
            .load(["file:///a.xml"])
            .unwrap();
        assert_eq!(catalog.prefer(), PreferMode::System);
        assert!(!catalog.defer());
        assert_eq!(catalog.resolve_mode(), ResolveMode::Ignore);
        assert_eq!(catalog.loaded_catalogs(), ["file:///a.xml", "file:///n.xml"]);
    }

    #[test]
    fn uris_are_canonicalized() {
        let loader = MemoryResourceLoader::new()
            .with("file:///a.xml", format!(r#"{HEAD}><nextCatalog catalog="b.xml"/></catalog>"#))
            .with("file:///b.xml", format!(r#"{HEAD}><nextCatalog catalog="a.xml"/></catalog>"#));
        let catalog = CatalogLoader::new(features())
            .with_resource_loader(loader)
            .load(["file://localhost/a.xml"])
            .unwrap();
        assert_eq!(catalog.document().system_id(), "file:///a.xml");

        let err = catalog.resolve(None, Some("http://x/a.dtd")).unwrap_err();
        assert!(
            matches!(&err, CatalogError::CircularReference { uri } if uri == "file:///a.xml"),
            "{err}"
        );
        assert_eq!(catalog.loaded_catalogs(), ["file:///a.xml", "file:///b.xml"]);
    }

    #[test]
    fn alternates_inherit_main_prefer() {
        let loader = MemoryResourceLoader::new()
            .with(
                "file:///a.xml",
                format!(r#"{HEAD} prefer="system"><nextCatalog catalog="n.xml"/></catalog>"#),
            )
            .with(
                "file:///n.xml",
                format!(r#"{HEAD}><public publicId="-//A//DTD B//EN" uri="b.dtd"/></catalog>"#),
            );
        let catalog = CatalogLoader::new(features())
            .with_resource_loader(loader)
            .load(["file:///a.xml"])
            .unwrap();
        assert_eq!(
            catalog.resolve(Some("-//A//DTD B//EN"), Some("http://x/b.dtd")).unwrap(),
            None
        );
        assert_eq!(
            catalog.resolve(Some("-//A//DTD B//EN"), None).unwrap().as_deref(),
            Some("file:///b.dtd")
        );
    }

    #[test]
    fn invalid_uris() {
        let loader = CatalogLoader::new(features());
        assert!(matches!(
            loader.load(["relative/catalog.xml"]),
            Err(CatalogError::InvalidUri { .. })
        ));
        assert!(matches!(
            loader.load(["ftp://example.com/catalog.xml"]),
            Err(CatalogError::InvalidUri { .. })
        ));
    }

    #[test]
    fn nothing_readable() {
        let catalog = CatalogLoader::new(features())
            .with_resource_loader(MemoryResourceLoader::new())
            .load(["file:///a.xml", "file:///b.xml"])
            .unwrap();
        assert!(catalog.entries().is_empty());
        assert!(catalog.alternates().is_empty());
        assert!(catalog.loaded_catalogs().is_empty());
        assert_eq!(catalog.resolve(None, Some("http://x/a.dtd")).unwrap(), None);
    }
}
