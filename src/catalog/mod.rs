//! XML Catalogs (OASIS Standard V1.1).
//!
//! A [`Catalog`] is created from a list of catalog URIs by a
//! [`CatalogLoader`]. The first readable URI becomes the main catalog; the
//! following ones, together with the `nextCatalog` entries, are the
//! alternate catalogs searched when the main catalog has no match.
//! Every catalog loaded on behalf of one [`Catalog`] is parsed at most once
//! and shared between its clones.

pub mod entry;
pub mod group;
pub mod loader;
pub mod parser;
pub mod reader;
mod resolve;
pub(crate) mod session;

#[cfg(feature = "output")]
use std::io::{self, Write};
use std::sync::Arc;

pub use loader::CatalogLoader;

use self::{entry::CatalogEntry, group::Group, session::LoadingSession};
use crate::features::{PreferMode, ResolveMode};

/// One parsed catalog file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogDocument {
    pub(crate) system_id: String,
    pub(crate) root: Group,
    pub(crate) prefer_attr: Option<PreferMode>,
    pub(crate) defer_attr: Option<bool>,
    pub(crate) resolve_attr: Option<ResolveMode>,
    pub(crate) next_catalogs: Vec<String>,
}

impl CatalogDocument {
    /// A document without entries. It never matches.
    pub fn empty(system_id: impl Into<String>, prefer: PreferMode) -> Self {
        let system_id = system_id.into();
        Self {
            root: Group::new(None, prefer, system_id.clone()),
            system_id,
            prefer_attr: None,
            defer_attr: None,
            resolve_attr: None,
            next_catalogs: vec![],
        }
    }

    /// The URI this document was loaded from.
    pub fn system_id(&self) -> &str {
        &self.system_id
    }

    /// The base URI after applying the `xml:base` of the root element.
    pub fn base_uri(&self) -> &str {
        self.root.base_uri()
    }

    pub fn prefer(&self) -> PreferMode {
        self.root.prefer()
    }

    /// The `prefer` attribute of the root element, if valid.
    pub fn prefer_attr(&self) -> Option<PreferMode> {
        self.prefer_attr
    }

    /// The `defer` attribute of the root element, if valid.
    pub fn defer_attr(&self) -> Option<bool> {
        self.defer_attr
    }

    /// The `resolve` attribute of the root element, if valid.
    pub fn resolve_attr(&self) -> Option<ResolveMode> {
        self.resolve_attr
    }

    pub fn root(&self) -> &Group {
        &self.root
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        self.root.entries()
    }

    /// Targets of the `nextCatalog` entries in document order, without
    /// duplicates.
    pub fn next_catalogs(&self) -> &[String] {
        &self.next_catalogs
    }

    /// Catalogs referenced by `delegate*` entries in document order, without
    /// duplicates.
    pub fn delegate_catalogs(&self) -> Vec<&str> {
        self.root.delegate_catalogs()
    }

    /// Serialize the entries of this document as an XML catalog.
    #[cfg(feature = "output")]
    #[doc(alias = "xmlACatalogDump")]
    pub fn dump(&self, mut out: impl Write) -> io::Result<()> {
        writeln!(out, "<?xml version=\"1.0\"?>")?;
        write!(
            out,
            "<catalog xmlns=\"{}\" prefer=\"{}\"",
            reader::XML_CATALOGS_NAMESPACE,
            self.prefer()
        )?;
        if self.entries().is_empty() {
            return writeln!(out, "/>");
        }
        writeln!(out, ">")?;
        for entry in self.entries() {
            dump_entry(&mut out, entry, 1)?;
        }
        writeln!(out, "</catalog>")
    }
}

#[cfg(feature = "output")]
fn dump_element(
    out: &mut impl Write,
    depth: usize,
    name: &str,
    attrs: &[(&str, &str)],
    close: bool,
) -> io::Result<()> {
    use quick_xml::escape::escape;

    write!(out, "{:1$}<{name}", "", depth * 2)?;
    for (key, value) in attrs {
        write!(out, " {key}=\"{}\"", escape(*value))?;
    }
    writeln!(out, "{}>", if close { "/" } else { "" })
}

#[cfg(feature = "output")]
fn dump_entry(out: &mut impl Write, entry: &CatalogEntry, depth: usize) -> io::Result<()> {
    let name = entry.entry_type().literal();
    match entry {
        CatalogEntry::System(e) => {
            dump_element(out, depth, name, &[("systemId", e.system_id()), ("uri", e.uri())], true)
        }
        CatalogEntry::Public(e) => {
            dump_element(out, depth, name, &[("publicId", e.public_id()), ("uri", e.uri())], true)
        }
        CatalogEntry::Uri(e) => {
            dump_element(out, depth, name, &[("name", e.name()), ("uri", e.uri())], true)
        }
        CatalogEntry::RewriteSystem(e) => dump_element(
            out,
            depth,
            name,
            &[("systemIdStartString", e.start()), ("rewritePrefix", e.prefix())],
            true,
        ),
        CatalogEntry::RewriteUri(e) => dump_element(
            out,
            depth,
            name,
            &[("uriStartString", e.start()), ("rewritePrefix", e.prefix())],
            true,
        ),
        CatalogEntry::SystemSuffix(e) => dump_element(
            out,
            depth,
            name,
            &[("systemIdSuffix", e.suffix()), ("uri", e.uri())],
            true,
        ),
        CatalogEntry::UriSuffix(e) => {
            dump_element(out, depth, name, &[("uriSuffix", e.suffix()), ("uri", e.uri())], true)
        }
        CatalogEntry::DelegatePublic(e) => dump_element(
            out,
            depth,
            name,
            &[("publicIdStartString", e.start()), ("catalog", e.catalog())],
            true,
        ),
        CatalogEntry::DelegateSystem(e) => dump_element(
            out,
            depth,
            name,
            &[("systemIdStartString", e.start()), ("catalog", e.catalog())],
            true,
        ),
        CatalogEntry::DelegateUri(e) => dump_element(
            out,
            depth,
            name,
            &[("uriStartString", e.start()), ("catalog", e.catalog())],
            true,
        ),
        CatalogEntry::NextCatalog(e) => {
            dump_element(out, depth, name, &[("catalog", e.catalog())], true)
        }
        CatalogEntry::Group(group) => {
            let prefer = group.prefer().to_string();
            let mut attrs = vec![("prefer", prefer.as_str()), ("xml:base", group.base_uri())];
            if let Some(id) = group.id() {
                attrs.insert(0, ("id", id));
            }
            let close = group.entries().is_empty();
            dump_element(out, depth, name, &attrs, close)?;
            if close {
                return Ok(());
            }
            for entry in group.entries() {
                dump_entry(out, entry, depth + 1)?;
            }
            writeln!(out, "{:1$}</group>", "", depth * 2)
        }
    }
}

/// The root of a catalog hierarchy.
///
/// Cloning is cheap: clones share the catalogs loaded so far.
#[derive(Debug, Clone)]
pub struct Catalog {
    document: Arc<CatalogDocument>,
    input_files: Vec<String>,
    session: Arc<LoadingSession>,
}

impl Catalog {
    pub(crate) fn new(
        document: Arc<CatalogDocument>,
        input_files: Vec<String>,
        session: Arc<LoadingSession>,
    ) -> Self {
        Self {
            document,
            input_files,
            session,
        }
    }

    /// The main catalog document.
    pub fn document(&self) -> &CatalogDocument {
        &self.document
    }

    /// The top-level entries of the main catalog.
    pub fn entries(&self) -> &[CatalogEntry] {
        self.document.entries()
    }

    /// URIs of the alternate catalogs: the `nextCatalog` targets of the main
    /// catalog, then the catalogs given after it to the loader.
    pub fn alternates(&self) -> Vec<String> {
        let mut alternates = self.document.next_catalogs().to_vec();
        for uri in &self.input_files {
            if !alternates.contains(uri) {
                alternates.push(uri.clone());
            }
        }
        alternates
    }

    /// URIs of every catalog parsed so far.
    pub fn loaded_catalogs(&self) -> Vec<String> {
        self.session.loaded()
    }

    pub fn prefer(&self) -> PreferMode {
        self.session.prefer
    }

    pub fn defer(&self) -> bool {
        self.session.defer
    }

    pub fn resolve_mode(&self) -> ResolveMode {
        self.session.resolve
    }

    /// Serialize the main catalog.
    #[cfg(feature = "output")]
    pub fn dump(&self, out: impl Write) -> io::Result<()> {
        self.document.dump(out)
    }
}

#[cfg(all(test, feature = "output"))]
mod tests {
    use super::{
        entry::{NextCatalogEntry, PublicEntry, SystemEntry},
        *,
    };

    #[test]
    fn dump_document() {
        let mut doc = CatalogDocument::empty("file:///etc/xml/catalog", PreferMode::Public);
        let mut group = Group::new(Some("g1".to_owned()), PreferMode::System, "file:///etc/xml/");
        group.push(CatalogEntry::Public(PublicEntry::new(
            "-//A//DTD B//EN",
            "file:///etc/xml/b.dtd",
        )));
        doc.root.push(CatalogEntry::System(SystemEntry::new(
            "http://x/a.dtd?a=1&b=2",
            "file:///etc/xml/a.dtd",
        )));
        doc.root.push(CatalogEntry::Group(group));
        doc.root
            .push(CatalogEntry::NextCatalog(NextCatalogEntry::new("file:///etc/xml/next")));

        let mut out = vec![];
        doc.dump(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"<?xml version="1.0"?>
<catalog xmlns="urn:oasis:names:tc:entity:xmlns:xml:catalog" prefer="public">
  <system systemId="http://x/a.dtd?a=1&amp;b=2" uri="file:///etc/xml/a.dtd"/>
  <group id="g1" prefer="system" xml:base="file:///etc/xml/">
    <public publicId="-//A//DTD B//EN" uri="file:///etc/xml/b.dtd"/>
  </group>
  <nextCatalog catalog="file:///etc/xml/next"/>
</catalog>
"#
        );

        let mut out = vec![];
        CatalogDocument::empty("file:///e.xml", PreferMode::System)
            .dump(&mut out)
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "<?xml version=\"1.0\"?>\n<catalog xmlns=\"urn:oasis:names:tc:entity:xmlns:xml:catalog\" prefer=\"system\"/>\n"
        );
    }
}
