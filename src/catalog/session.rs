//! Catalogs loaded on behalf of one root [`Catalog`](super::Catalog).

use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

use tracing::{debug, info};

use super::{
    CatalogDocument,
    parser::{CatalogParser, ResourceLoader},
    reader::CatalogReader,
};
use crate::{
    error::CatalogError,
    features::{CatalogFeatures, PreferMode, ResolveMode},
};

/// Load and parse the catalog at `uri`.
///
/// Returns `Ok(None)` if the resource is unavailable.
pub(crate) fn read_document(
    loader: &dyn ResourceLoader,
    parser: &dyn CatalogParser,
    uri: &str,
    prefer: PreferMode,
) -> Result<Option<CatalogDocument>, CatalogError> {
    let Some(content) = loader.load(uri) else {
        debug!("{uri}: catalog is unavailable, skipping");
        return Ok(None);
    };
    let mut reader = CatalogReader::new(uri, prefer);
    parser.parse(&content, uri, &mut reader)?;
    info!("loaded catalog {uri}");
    Ok(Some(reader.finish()))
}

/// The effective settings and the registry of parsed catalogs.
///
/// A catalog URI is parsed at most once per session.
pub(crate) struct LoadingSession {
    pub(crate) prefer: PreferMode,
    pub(crate) defer: bool,
    pub(crate) resolve: ResolveMode,
    loader: Arc<dyn ResourceLoader>,
    parser: Arc<dyn CatalogParser>,
    catalogs: RwLock<BTreeMap<String, Arc<CatalogDocument>>>,
}

impl fmt::Debug for LoadingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadingSession")
            .field("prefer", &self.prefer)
            .field("defer", &self.defer)
            .field("resolve", &self.resolve)
            .field("catalogs", &self.loaded())
            .finish_non_exhaustive()
    }
}

impl LoadingSession {
    pub(crate) fn new(
        settings: &CatalogFeatures,
        loader: Arc<dyn ResourceLoader>,
        parser: Arc<dyn CatalogParser>,
    ) -> Self {
        Self {
            prefer: settings.prefer(),
            defer: settings.defer(),
            resolve: settings.resolve(),
            loader,
            parser,
            catalogs: RwLock::new(BTreeMap::new()),
        }
    }

    pub(crate) fn get(&self, uri: &str) -> Option<Arc<CatalogDocument>> {
        self.catalogs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uri)
            .cloned()
    }

    pub(crate) fn register(&self, document: Arc<CatalogDocument>) {
        self.catalogs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(document.system_id().to_owned(), document);
    }

    /// Return the catalog at `uri`, parsing it on first use.
    ///
    /// Returns `Ok(None)` if the resource is unavailable.
    #[doc(alias = "xmlFetchXMLCatalogFile")]
    pub(crate) fn fetch(&self, uri: &str) -> Result<Option<Arc<CatalogDocument>>, CatalogError> {
        if let Some(document) = self.get(uri) {
            debug!("{uri}: using catalog from the registry");
            return Ok(Some(document));
        }

        let mut catalogs = self
            .catalogs
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        // someone else may have done it in the meantime
        if let Some(document) = catalogs.get(uri) {
            return Ok(Some(document.clone()));
        }
        let Some(document) = read_document(&*self.loader, &*self.parser, uri, self.prefer)? else {
            return Ok(None);
        };
        let document = Arc::new(document);
        catalogs.insert(uri.to_owned(), document.clone());
        Ok(Some(document))
    }

    pub(crate) fn loaded(&self) -> Vec<String> {
        self.catalogs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Load every catalog reachable from `main`: its delegates, then its
    /// `nextCatalog` targets, then `inputs`, recursively.
    pub(crate) fn load_eagerly(
        &self,
        main: &CatalogDocument,
        inputs: &[String],
    ) -> Result<(), CatalogError> {
        let mut chain = vec![main.system_id().to_owned()];
        self.load_references(main, &mut chain)?;
        for uri in inputs {
            self.load_chain(uri, &mut chain)?;
        }
        Ok(())
    }

    fn load_references(
        &self,
        document: &CatalogDocument,
        chain: &mut Vec<String>,
    ) -> Result<(), CatalogError> {
        for uri in document.delegate_catalogs() {
            self.load_chain(uri, chain)?;
        }
        for uri in document.next_catalogs() {
            self.load_chain(uri, chain)?;
        }
        Ok(())
    }

    fn load_chain(&self, uri: &str, chain: &mut Vec<String>) -> Result<(), CatalogError> {
        if chain.iter().any(|c| c == uri) {
            return Err(CatalogError::CircularReference {
                uri: uri.to_owned(),
            });
        }
        if self.get(uri).is_some() {
            return Ok(());
        }
        let Some(document) = self.fetch(uri)? else {
            return Ok(());
        };
        chain.push(uri.to_owned());
        let res = self.load_references(&document, chain);
        chain.pop();
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::parser::{MemoryResourceLoader, XmlCatalogParser};

    fn session(loader: MemoryResourceLoader) -> LoadingSession {
        LoadingSession::new(
            &CatalogFeatures::default(),
            Arc::new(loader),
            Arc::new(XmlCatalogParser),
        )
    }

    fn next_catalog(next: &str) -> String {
        format!(
            r#"<catalog xmlns="urn:oasis:names:tc:entity:xmlns:xml:catalog"><nextCatalog catalog="{next}"/></catalog>"#
        )
    }

    #[test]
    fn fetch_parses_once() {
        let session = session(MemoryResourceLoader::new().with(
            "file:///a.xml",
            r#"<catalog xmlns="urn:oasis:names:tc:entity:xmlns:xml:catalog"/>"#,
        ));
        let first = session.fetch("file:///a.xml").unwrap().unwrap();
        let second = session.fetch("file:///a.xml").unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(session.fetch("file:///missing.xml").unwrap().is_none());
        assert_eq!(session.loaded(), ["file:///a.xml"]);
    }

    #[test]
    fn eager_loading_detects_cycles() {
        let loader = MemoryResourceLoader::new()
            .with("file:///a.xml", next_catalog("b.xml"))
            .with("file:///b.xml", next_catalog("a.xml"));
        let session = session(loader);
        let main = session.fetch("file:///a.xml").unwrap().unwrap();
        let err = session.load_eagerly(&main, &[]).unwrap_err();
        assert!(matches!(err, CatalogError::CircularReference { uri } if uri == "file:///a.xml"));
    }

    #[test]
    fn eager_loading_shared_targets() {
        let loader = MemoryResourceLoader::new()
            .with(
                "file:///a.xml",
                r#"<catalog xmlns="urn:oasis:names:tc:entity:xmlns:xml:catalog">
                    <delegateSystem systemIdStartString="http://x/" catalog="b.xml"/>
                    <nextCatalog catalog="c.xml"/>
                </catalog>"#,
            )
            .with("file:///b.xml", next_catalog("d.xml"))
            .with("file:///c.xml", next_catalog("d.xml"))
            .with("file:///d.xml", next_catalog("missing.xml"));
        let session = session(loader);
        let main = session.fetch("file:///a.xml").unwrap().unwrap();
        session.load_eagerly(&main, &[]).unwrap();
        assert_eq!(
            session.loaded(),
            ["file:///a.xml", "file:///b.xml", "file:///c.xml", "file:///d.xml"]
        );
    }
}
