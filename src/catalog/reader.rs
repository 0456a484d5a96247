//! Build a [`CatalogDocument`] from element callbacks.
//!
//! Any parser able to report element starts and ends in document order can
//! drive a [`CatalogReader`] through the [`CatalogHandler`] trait.

use tracing::{debug, warn};

use super::{
    CatalogDocument,
    entry::{
        CatalogEntry, CatalogEntryType, DelegateEntry, NextCatalogEntry, PublicEntry,
        RewriteEntry, SuffixEntry, SystemEntry, UriEntry,
    },
    group::Group,
};
use crate::{
    features::{PreferMode, ResolveMode, parse_defer},
    uri::build_uri,
};

pub const XML_CATALOGS_NAMESPACE: &str = "urn:oasis:names:tc:entity:xmlns:xml:catalog";
pub const XML_XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub namespace: Option<String>,
    pub local_name: String,
    pub qname: String,
    pub value: String,
}

/// Attributes of one element, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    attrs: Vec<Attribute>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        namespace: Option<&str>,
        local_name: impl Into<String>,
        qname: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.attrs.push(Attribute {
            namespace: namespace.map(str::to_owned),
            local_name: local_name.into(),
            qname: qname.into(),
            value: value.into(),
        });
    }

    pub fn get_value(&self, namespace: Option<&str>, local_name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|att| att.namespace.as_deref() == namespace && att.local_name == local_name)
            .map(|att| att.value.as_str())
    }

    pub fn get_value_by_qname(&self, qname: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|att| att.qname == qname)
            .map(|att| att.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attrs.iter()
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    fn xml_base(&self) -> Option<&str> {
        self.get_value(Some(XML_XML_NAMESPACE), "base")
            .or_else(|| self.get_value_by_qname("xml:base"))
    }
}

impl<'a, L, Q, V> FromIterator<(Option<&'a str>, L, Q, V)> for Attributes
where
    L: Into<String>,
    Q: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (Option<&'a str>, L, Q, V)>>(iter: T) -> Self {
        let mut attrs = Self::new();
        for (namespace, local_name, qname, value) in iter {
            attrs.push(namespace, local_name, qname, value);
        }
        attrs
    }
}

/// Receiver of the element events of a catalog document.
pub trait CatalogHandler {
    /// Called once before the first element.
    fn set_document_uri(&mut self, uri: &str);

    fn start_element(&mut self, namespace: Option<&str>, local_name: &str, attributes: &Attributes);

    fn end_element(&mut self, namespace: Option<&str>, local_name: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Catalog,
    Group,
    Entry,
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    base: String,
    prefer: PreferMode,
}

/// Build a [`CatalogDocument`] from the events of one catalog document.
///
/// - A root element other than `catalog` in the catalog namespace makes the
///   whole document empty.
/// - Elements in other namespaces are ignored with their subtrees.
/// - Entries lacking a required attribute are skipped.
#[derive(Debug)]
pub struct CatalogReader {
    document_uri: String,
    default_prefer: PreferMode,
    frames: Vec<Frame>,
    groups: Vec<Group>,
    ignored_depth: usize,
    seen_root: bool,
    prefer: Option<PreferMode>,
    defer: Option<bool>,
    resolve: Option<ResolveMode>,
    next_catalogs: Vec<String>,
}

impl CatalogReader {
    /// `default_prefer` applies unless the root element overrides it.
    pub fn new(document_uri: impl Into<String>, default_prefer: PreferMode) -> Self {
        Self {
            document_uri: document_uri.into(),
            default_prefer,
            frames: vec![],
            groups: vec![],
            ignored_depth: 0,
            seen_root: false,
            prefer: None,
            defer: None,
            resolve: None,
            next_catalogs: vec![],
        }
    }

    pub fn finish(mut self) -> CatalogDocument {
        while self.groups.len() > 1 {
            if let Some(group) = self.groups.pop() {
                self.push_entry(CatalogEntry::Group(group));
            }
        }
        let root = self
            .groups
            .pop()
            .unwrap_or_else(|| Group::new(None, self.default_prefer, self.document_uri.clone()));
        CatalogDocument {
            system_id: self.document_uri,
            root,
            prefer_attr: self.prefer,
            defer_attr: self.defer,
            resolve_attr: self.resolve,
            next_catalogs: self.next_catalogs,
        }
    }

    fn push_entry(&mut self, entry: CatalogEntry) {
        if let Some(group) = self.groups.last_mut() {
            group.push(entry);
        }
    }

    /// Apply the `xml:base` of an element to the base URI of its parent.
    fn element_base(&self, attributes: &Attributes, parent_base: &str) -> String {
        let Some(base) = attributes.xml_base() else {
            return parent_base.to_owned();
        };
        build_uri(base, parent_base).unwrap_or_else(|| {
            warn!(
                "{}: ignoring invalid xml:base '{base}'",
                self.document_uri
            );
            parent_base.to_owned()
        })
    }

    fn read_prefer(&self, attributes: &Attributes) -> Option<PreferMode> {
        let value = attributes.get_value(None, "prefer")?;
        value
            .parse()
            .inspect_err(|_| {
                warn!(
                    "{}: invalid value for prefer: '{value}'",
                    self.document_uri
                )
            })
            .ok()
    }

    fn start_catalog(&mut self, attributes: &Attributes) {
        let base = self.element_base(attributes, &self.document_uri);
        self.prefer = self.read_prefer(attributes);
        self.defer = attributes.get_value(None, "defer").and_then(|value| {
            parse_defer(value)
                .inspect_err(|_| {
                    warn!("{}: invalid value for defer: '{value}'", self.document_uri)
                })
                .ok()
        });
        self.resolve = attributes.get_value(None, "resolve").and_then(|value| {
            value
                .parse()
                .inspect_err(|_| {
                    warn!("{}: invalid value for resolve: '{value}'", self.document_uri)
                })
                .ok()
        });
        let prefer = self.prefer.unwrap_or(self.default_prefer);
        let id = attributes.get_value(None, "id").map(str::to_owned);
        self.groups.push(Group::new(id, prefer, base.clone()));
        self.frames.push(Frame {
            kind: FrameKind::Catalog,
            base,
            prefer,
        });
    }

    fn required<'a>(
        &self,
        ty: CatalogEntryType,
        attributes: &'a Attributes,
        name: &str,
    ) -> Option<&'a str> {
        let value = attributes.get_value(None, name);
        if value.is_none() {
            warn!(
                "{}: {ty} entry lacks attribute '{name}', skipping",
                self.document_uri
            );
        }
        value
    }

    fn target(
        &self,
        ty: CatalogEntryType,
        attributes: &Attributes,
        name: &str,
        base: &str,
    ) -> Option<String> {
        let value = self.required(ty, attributes, name)?;
        let uri = build_uri(value, base);
        if uri.is_none() {
            warn!(
                "{}: {ty} entry has an invalid URI '{value}', skipping",
                self.document_uri
            );
        }
        uri
    }

    fn build_entry(
        &mut self,
        ty: CatalogEntryType,
        attributes: &Attributes,
        base: &str,
    ) -> Option<CatalogEntry> {
        use CatalogEntryType as Ty;

        let entry = match ty {
            Ty::Public => {
                let id = self.required(ty, attributes, "publicId")?;
                let uri = self.target(ty, attributes, "uri", base)?;
                CatalogEntry::Public(PublicEntry::new(id, uri))
            }
            Ty::System => {
                let id = self.required(ty, attributes, "systemId")?;
                let uri = self.target(ty, attributes, "uri", base)?;
                CatalogEntry::System(SystemEntry::new(id, uri))
            }
            Ty::Uri => {
                let name = self.required(ty, attributes, "name")?;
                let uri = self.target(ty, attributes, "uri", base)?;
                CatalogEntry::Uri(UriEntry::new(name, uri))
            }
            Ty::RewriteSystem => {
                let start = self.required(ty, attributes, "systemIdStartString")?;
                let prefix = self.target(ty, attributes, "rewritePrefix", base)?;
                CatalogEntry::RewriteSystem(RewriteEntry::new(start, prefix))
            }
            Ty::RewriteUri => {
                let start = self.required(ty, attributes, "uriStartString")?;
                let prefix = self.target(ty, attributes, "rewritePrefix", base)?;
                CatalogEntry::RewriteUri(RewriteEntry::new(start, prefix))
            }
            Ty::SystemSuffix => {
                let suffix = self.required(ty, attributes, "systemIdSuffix")?;
                let uri = self.target(ty, attributes, "uri", base)?;
                CatalogEntry::SystemSuffix(SuffixEntry::new(suffix, uri))
            }
            Ty::UriSuffix => {
                let suffix = self.required(ty, attributes, "uriSuffix")?;
                let uri = self.target(ty, attributes, "uri", base)?;
                CatalogEntry::UriSuffix(SuffixEntry::new(suffix, uri))
            }
            Ty::DelegatePublic => {
                let start = self.required(ty, attributes, "publicIdStartString")?;
                let catalog = self.target(ty, attributes, "catalog", base)?;
                CatalogEntry::DelegatePublic(DelegateEntry::new(start, catalog, true))
            }
            Ty::DelegateSystem => {
                let start = self.required(ty, attributes, "systemIdStartString")?;
                let catalog = self.target(ty, attributes, "catalog", base)?;
                CatalogEntry::DelegateSystem(DelegateEntry::new(start, catalog, false))
            }
            Ty::DelegateUri => {
                let start = self.required(ty, attributes, "uriStartString")?;
                let catalog = self.target(ty, attributes, "catalog", base)?;
                CatalogEntry::DelegateUri(DelegateEntry::new(start, catalog, false))
            }
            Ty::NextCatalog => {
                let catalog = self.target(ty, attributes, "catalog", base)?;
                if !self.next_catalogs.contains(&catalog) {
                    self.next_catalogs.push(catalog.clone());
                }
                CatalogEntry::NextCatalog(NextCatalogEntry::new(catalog))
            }
            Ty::CatalogFile | Ty::Catalog | Ty::Group => return None,
        };
        debug!("{}: found {ty} entry", self.document_uri);
        Some(entry)
    }
}

impl CatalogHandler for CatalogReader {
    fn set_document_uri(&mut self, uri: &str) {
        self.document_uri = uri.to_owned();
    }

    fn start_element(&mut self, namespace: Option<&str>, local_name: &str, attributes: &Attributes) {
        if self.ignored_depth > 0 {
            self.ignored_depth += 1;
            return;
        }

        let Some((parent, parent_base, parent_prefer)) = self
            .frames
            .last()
            .map(|frame| (frame.kind, frame.base.clone(), frame.prefer))
        else {
            if !self.seen_root
                && namespace == Some(XML_CATALOGS_NAMESPACE)
                && local_name == "catalog"
            {
                self.seen_root = true;
                self.start_catalog(attributes);
            } else {
                warn!(
                    "{}: root element '{local_name}' is not a catalog, ignoring the document",
                    self.document_uri
                );
                self.seen_root = true;
                self.ignored_depth = 1;
            }
            return;
        };

        if namespace != Some(XML_CATALOGS_NAMESPACE) {
            self.ignored_depth = 1;
            return;
        }
        if parent == FrameKind::Entry {
            warn!(
                "{}: unexpected element '{local_name}' inside an entry",
                self.document_uri
            );
            self.ignored_depth = 1;
            return;
        }

        let base = self.element_base(attributes, &parent_base);
        if local_name == "group" {
            let prefer = self.read_prefer(attributes).unwrap_or(parent_prefer);
            let id = attributes.get_value(None, "id").map(str::to_owned);
            self.groups.push(Group::new(id, prefer, base.clone()));
            self.frames.push(Frame {
                kind: FrameKind::Group,
                base,
                prefer,
            });
            return;
        }

        match local_name.parse::<CatalogEntryType>() {
            Ok(ty) if !matches!(
                ty,
                CatalogEntryType::CatalogFile | CatalogEntryType::Catalog | CatalogEntryType::Group
            ) =>
            {
                if let Some(entry) = self.build_entry(ty, attributes, &base) {
                    self.push_entry(entry);
                }
                self.frames.push(Frame {
                    kind: FrameKind::Entry,
                    base,
                    prefer: parent_prefer,
                });
            }
            _ => {
                warn!(
                    "{}: unrecognized element '{local_name}'",
                    self.document_uri
                );
                self.ignored_depth = 1;
            }
        }
    }

    fn end_element(&mut self, _namespace: Option<&str>, _local_name: &str) {
        if self.ignored_depth > 0 {
            self.ignored_depth -= 1;
            return;
        }
        if let Some(Frame {
            kind: FrameKind::Group,
            ..
        }) = self.frames.pop()
        {
            if let Some(group) = self.groups.pop() {
                self.push_entry(CatalogEntry::Group(group));
            }
        }
    }
}
