//! Catalog entries.
//!
//! Match keys are normalized when the entry is constructed and compared
//! verbatim afterwards. Targets are absolute URIs.

use std::{fmt::Display, str::FromStr};

use super::group::Group;
use crate::normalize::{decode_urn, normalize_public_id, normalize_uri};

/// Element names recognized in the catalog namespace.
#[doc(alias = "xmlCatalogEntryType")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogEntryType {
    CatalogFile,
    Catalog,
    Group,
    Public,
    System,
    RewriteSystem,
    SystemSuffix,
    DelegatePublic,
    DelegateSystem,
    Uri,
    RewriteUri,
    UriSuffix,
    DelegateUri,
    NextCatalog,
}

impl CatalogEntryType {
    pub const ALL: [CatalogEntryType; 14] = [
        Self::CatalogFile,
        Self::Catalog,
        Self::Group,
        Self::Public,
        Self::System,
        Self::RewriteSystem,
        Self::SystemSuffix,
        Self::DelegatePublic,
        Self::DelegateSystem,
        Self::Uri,
        Self::RewriteUri,
        Self::UriSuffix,
        Self::DelegateUri,
        Self::NextCatalog,
    ];

    pub fn literal(&self) -> &'static str {
        match self {
            Self::CatalogFile => "catalogfile",
            Self::Catalog => "catalog",
            Self::Group => "group",
            Self::Public => "public",
            Self::System => "system",
            Self::RewriteSystem => "rewriteSystem",
            Self::SystemSuffix => "systemSuffix",
            Self::DelegatePublic => "delegatePublic",
            Self::DelegateSystem => "delegateSystem",
            Self::Uri => "uri",
            Self::RewriteUri => "rewriteURI",
            Self::UriSuffix => "uriSuffix",
            Self::DelegateUri => "delegateURI",
            Self::NextCatalog => "nextCatalog",
        }
    }
}

impl Display for CatalogEntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.literal())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown catalog entry type '{0}'")]
pub struct UnknownEntryType(pub String);

impl FromStr for CatalogEntryType {
    type Err = UnknownEntryType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.literal() == s)
            .ok_or_else(|| UnknownEntryType(s.to_owned()))
    }
}

/// `system`: maps a system identifier to a URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemEntry {
    system_id: String,
    uri: String,
}

impl SystemEntry {
    pub fn new(system_id: &str, uri: impl Into<String>) -> Self {
        Self {
            system_id: normalize_uri(system_id).into_owned(),
            uri: uri.into(),
        }
    }

    pub fn system_id(&self) -> &str {
        &self.system_id
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// `system_id` must already be normalized.
    pub fn matches(&self, system_id: &str) -> Option<&str> {
        (self.system_id == system_id).then_some(self.uri.as_str())
    }
}

/// `public`: maps a public identifier to a URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicEntry {
    public_id: String,
    uri: String,
}

impl PublicEntry {
    /// A `urn:publicid:` identifier is unwrapped first.
    pub fn new(public_id: &str, uri: impl Into<String>) -> Self {
        Self {
            public_id: normalize_public_id(&decode_urn(public_id)).into_owned(),
            uri: uri.into(),
        }
    }

    pub fn public_id(&self) -> &str {
        &self.public_id
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// `public_id` must already be normalized.
    pub fn matches(&self, public_id: &str) -> Option<&str> {
        (self.public_id == public_id).then_some(self.uri.as_str())
    }
}

/// `uri`: maps a URI reference to another URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriEntry {
    name: String,
    uri: String,
}

impl UriEntry {
    pub fn new(name: &str, uri: impl Into<String>) -> Self {
        Self {
            name: normalize_uri(name).into_owned(),
            uri: uri.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// `name` must already be normalized.
    pub fn matches(&self, name: &str) -> Option<&str> {
        (self.name == name).then_some(self.uri.as_str())
    }
}

/// `rewriteSystem` and `rewriteURI`: replaces a matching prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteEntry {
    start: String,
    prefix: String,
}

impl RewriteEntry {
    pub fn new(start: &str, prefix: impl Into<String>) -> Self {
        Self {
            start: normalize_uri(start).into_owned(),
            prefix: prefix.into(),
        }
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Rewrite `key` if it starts with this entry's start string and the
    /// start string is strictly longer than `best`.
    ///
    /// Returns the rewritten URI and the length of the start string.
    pub fn match_longest(&self, key: &str, best: usize) -> Option<(String, usize)> {
        if self.start.len() <= best {
            return None;
        }
        let rest = key.strip_prefix(self.start.as_str())?;
        Some((join_prefix(&self.prefix, rest), self.start.len()))
    }
}

/// Join `prefix` and `rest` with exactly one `/` between them.
fn join_prefix(prefix: &str, rest: &str) -> String {
    let rest = rest.trim_start_matches('/');
    if rest.is_empty() {
        return prefix.to_owned();
    }
    let mut ret = String::with_capacity(prefix.len() + rest.len() + 1);
    ret.push_str(prefix);
    if !prefix.ends_with('/') {
        ret.push('/');
    }
    ret.push_str(rest);
    ret
}

/// `systemSuffix` and `uriSuffix`: maps every key with a matching suffix to
/// a fixed URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuffixEntry {
    suffix: String,
    uri: String,
}

impl SuffixEntry {
    pub fn new(suffix: &str, uri: impl Into<String>) -> Self {
        Self {
            suffix: normalize_uri(suffix).into_owned(),
            uri: uri.into(),
        }
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Same contract as [`RewriteEntry::match_longest`].
    pub fn match_longest(&self, key: &str, best: usize) -> Option<(String, usize)> {
        (self.suffix.len() > best && key.ends_with(self.suffix.as_str()))
            .then(|| (self.uri.clone(), self.suffix.len()))
    }
}

/// `delegatePublic`, `delegateSystem` and `delegateURI`: hands keys with a
/// matching prefix to another catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegateEntry {
    start: String,
    catalog: String,
}

impl DelegateEntry {
    /// `start` is normalized as a public identifier for `delegatePublic` and
    /// as a URI otherwise.
    pub fn new(start: &str, catalog: impl Into<String>, public: bool) -> Self {
        let start = if public {
            normalize_public_id(&decode_urn(start)).into_owned()
        } else {
            normalize_uri(start).into_owned()
        };
        Self {
            start,
            catalog: catalog.into(),
        }
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn catalog(&self) -> &str {
        &self.catalog
    }

    /// Same contract as [`RewriteEntry::match_longest`], yielding the
    /// delegate catalog URI.
    pub fn match_longest(&self, key: &str, best: usize) -> Option<(&str, usize)> {
        (self.start.len() > best && key.starts_with(self.start.as_str()))
            .then_some((self.catalog.as_str(), self.start.len()))
    }
}

/// `nextCatalog`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextCatalogEntry {
    catalog: String,
}

impl NextCatalogEntry {
    pub fn new(catalog: impl Into<String>) -> Self {
        Self {
            catalog: catalog.into(),
        }
    }

    pub fn catalog(&self) -> &str {
        &self.catalog
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEntry {
    System(SystemEntry),
    Public(PublicEntry),
    Uri(UriEntry),
    RewriteSystem(RewriteEntry),
    RewriteUri(RewriteEntry),
    SystemSuffix(SuffixEntry),
    UriSuffix(SuffixEntry),
    DelegatePublic(DelegateEntry),
    DelegateSystem(DelegateEntry),
    DelegateUri(DelegateEntry),
    NextCatalog(NextCatalogEntry),
    Group(Group),
}

impl CatalogEntry {
    pub fn entry_type(&self) -> CatalogEntryType {
        match self {
            Self::System(_) => CatalogEntryType::System,
            Self::Public(_) => CatalogEntryType::Public,
            Self::Uri(_) => CatalogEntryType::Uri,
            Self::RewriteSystem(_) => CatalogEntryType::RewriteSystem,
            Self::RewriteUri(_) => CatalogEntryType::RewriteUri,
            Self::SystemSuffix(_) => CatalogEntryType::SystemSuffix,
            Self::UriSuffix(_) => CatalogEntryType::UriSuffix,
            Self::DelegatePublic(_) => CatalogEntryType::DelegatePublic,
            Self::DelegateSystem(_) => CatalogEntryType::DelegateSystem,
            Self::DelegateUri(_) => CatalogEntryType::DelegateUri,
            Self::NextCatalog(_) => CatalogEntryType::NextCatalog,
            Self::Group(_) => CatalogEntryType::Group,
        }
    }
}
