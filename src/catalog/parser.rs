//! Fetch catalog resources and feed them to a [`CatalogHandler`].

use std::{collections::HashMap, fs::read, str::from_utf8};

use quick_xml::{
    NsReader,
    events::{BytesStart, Event},
    name::ResolveResult,
};
use tracing::debug;

use super::reader::{Attributes, CatalogHandler};
use crate::{encoding::decode_document, error::CatalogError, uri::uri_to_path};

/// Source of catalog documents.
///
/// Returning `None` means that the resource is unavailable. Such catalogs
/// are skipped silently.
pub trait ResourceLoader: Send + Sync {
    fn load(&self, uri: &str) -> Option<Vec<u8>>;
}

/// Loads `file:` URIs from the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileResourceLoader;

impl ResourceLoader for FileResourceLoader {
    fn load(&self, uri: &str) -> Option<Vec<u8>> {
        let Some(path) = uri_to_path(uri) else {
            debug!("{uri}: not a local file");
            return None;
        };
        read(&path)
            .inspect_err(|e| debug!("{}: {e}", path.display()))
            .ok()
    }
}

/// Serves documents registered in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryResourceLoader {
    resources: HashMap<String, Vec<u8>>,
}

impl MemoryResourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, uri: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.resources.insert(uri.into(), content.into());
    }

    pub fn with(mut self, uri: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(uri, content);
        self
    }
}

impl ResourceLoader for MemoryResourceLoader {
    fn load(&self, uri: &str) -> Option<Vec<u8>> {
        self.resources.get(uri).cloned()
    }
}

/// Parser reporting the elements of a catalog document to a handler.
pub trait CatalogParser: Send + Sync {
    /// Parse `input`, which was loaded from `uri`.
    ///
    /// Malformed documents are reported as [`CatalogError::Parse`].
    fn parse(
        &self,
        input: &[u8],
        uri: &str,
        handler: &mut dyn CatalogHandler,
    ) -> Result<(), CatalogError>;
}

/// [`CatalogParser`] based on the namespace-aware reader of `quick-xml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlCatalogParser;

fn namespace_of(uri: &str, ns: ResolveResult) -> Result<Option<String>, CatalogError> {
    match ns {
        ResolveResult::Bound(ns) => from_utf8(ns.as_ref())
            .map(|ns| Some(ns.to_owned()))
            .map_err(|e| CatalogError::parse(uri, e)),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(CatalogError::parse(
            uri,
            format!(
                "unbound namespace prefix '{}'",
                String::from_utf8_lossy(&prefix)
            ),
        )),
    }
}

fn read_attributes(
    reader: &NsReader<&[u8]>,
    start: &BytesStart,
    uri: &str,
) -> Result<Attributes, CatalogError> {
    let mut attributes = Attributes::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| CatalogError::parse(uri, e))?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let (ns, local) = reader.resolve_attribute(attr.key);
        let namespace = namespace_of(uri, ns)?;
        let local = from_utf8(local.as_ref()).map_err(|e| CatalogError::parse(uri, e))?;
        let qname = from_utf8(attr.key.as_ref()).map_err(|e| CatalogError::parse(uri, e))?;
        let value = attr
            .decode_and_unescape_value(reader.decoder())
            .map_err(|e| CatalogError::parse(uri, e))?;
        attributes.push(namespace.as_deref(), local, qname, value);
    }
    Ok(attributes)
}

impl CatalogParser for XmlCatalogParser {
    fn parse(
        &self,
        input: &[u8],
        uri: &str,
        handler: &mut dyn CatalogHandler,
    ) -> Result<(), CatalogError> {
        let text = decode_document(input, uri)?;
        let mut reader = NsReader::from_str(&text);
        reader.config_mut().expand_empty_elements = true;
        handler.set_document_uri(uri);

        let mut depth = 0usize;
        loop {
            let (ns, event) = reader
                .read_resolved_event()
                .map_err(|e| CatalogError::parse(uri, e))?;
            match event {
                Event::Start(start) => {
                    let namespace = namespace_of(uri, ns)?;
                    let local_name = start.local_name();
                    let local_name =
                        from_utf8(local_name.as_ref()).map_err(|e| CatalogError::parse(uri, e))?;
                    let attributes = read_attributes(&reader, &start, uri)?;
                    depth += 1;
                    handler.start_element(namespace.as_deref(), local_name, &attributes);
                }
                Event::End(end) => {
                    let namespace = namespace_of(uri, ns)?;
                    let local_name = end.local_name();
                    let local_name =
                        from_utf8(local_name.as_ref()).map_err(|e| CatalogError::parse(uri, e))?;
                    depth = depth.saturating_sub(1);
                    handler.end_element(namespace.as_deref(), local_name);
                }
                Event::Eof => break,
                _ => {}
            }
        }
        if depth > 0 {
            return Err(CatalogError::parse(uri, "premature end of document"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        uri: String,
        events: Vec<String>,
    }

    impl CatalogHandler for Recorder {
        fn set_document_uri(&mut self, uri: &str) {
            self.uri = uri.to_owned();
        }

        fn start_element(&mut self, namespace: Option<&str>, local_name: &str, attributes: &Attributes) {
            let attrs = attributes
                .iter()
                .map(|att| format!(" {}={}", att.qname, att.value))
                .collect::<String>();
            self.events.push(format!(
                "start {{{}}}{local_name}{attrs}",
                namespace.unwrap_or("")
            ));
        }

        fn end_element(&mut self, namespace: Option<&str>, local_name: &str) {
            self.events
                .push(format!("end {{{}}}{local_name}", namespace.unwrap_or("")));
        }
    }

    #[test]
    fn reports_elements_in_order() {
        let input = br#"<?xml version="1.0"?>
<!DOCTYPE catalog>
<catalog xmlns="urn:oasis:names:tc:entity:xmlns:xml:catalog" xmlns:x="http://example.com/x">
  <!-- comment -->
  <system systemId="http://x/a.dtd" uri="a&amp;b.dtd" xml:base="http://mirror/"/>
  <x:ext/>
</catalog>"#;
        let mut recorder = Recorder::default();
        XmlCatalogParser
            .parse(input, "file:///catalog.xml", &mut recorder)
            .unwrap();
        assert_eq!(recorder.uri, "file:///catalog.xml");
        assert_eq!(
            recorder.events,
            [
                "start {urn:oasis:names:tc:entity:xmlns:xml:catalog}catalog",
                "start {urn:oasis:names:tc:entity:xmlns:xml:catalog}system systemId=http://x/a.dtd uri=a&b.dtd xml:base=http://mirror/",
                "end {urn:oasis:names:tc:entity:xmlns:xml:catalog}system",
                "start {http://example.com/x}ext",
                "end {http://example.com/x}ext",
                "end {urn:oasis:names:tc:entity:xmlns:xml:catalog}catalog",
            ]
        );
    }

    #[test]
    fn malformed_documents() {
        for input in [
            &b"<catalog><system></catalog>"[..],
            b"<catalog>",
            b"<p:catalog/>",
        ] {
            let err = XmlCatalogParser
                .parse(input, "file:///bad.xml", &mut Recorder::default())
                .unwrap_err();
            assert!(matches!(err, CatalogError::Parse { .. }), "{err}");
        }
    }

    #[test]
    fn memory_loader() {
        let loader = MemoryResourceLoader::new().with("file:///a.xml", "<catalog/>");
        assert_eq!(loader.load("file:///a.xml").as_deref(), Some(&b"<catalog/>"[..]));
        assert_eq!(loader.load("file:///b.xml"), None);
        assert_eq!(FileResourceLoader.load("http://example.com/catalog.xml"), None);
        assert_eq!(FileResourceLoader.load("file:///nonexistent/catalog.xml"), None);
    }
}
