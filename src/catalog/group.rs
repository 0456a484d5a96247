//! Matching over the entry tree of one catalog document.
//!
//! A [`Group`] only sees its own entries and nested groups. Delegation to
//! other catalogs and alternate catalogs are handled by the caller.

use super::entry::{CatalogEntry, DelegateEntry};
use crate::features::PreferMode;

/// Outcome of scanning a group for one identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchRecord {
    /// Target of an exact entry. Ends the scan.
    pub instant: Option<String>,
    /// Best rewritten URI and the length of its start string.
    pub rewrite: Option<(String, usize)>,
    /// Best suffix target and the length of its suffix.
    pub suffix: Option<(String, usize)>,
}

impl MatchRecord {
    fn instant(target: &str) -> Self {
        Self {
            instant: Some(target.to_owned()),
            ..Default::default()
        }
    }

    fn rewrite_len(&self) -> usize {
        self.rewrite.as_ref().map_or(0, |r| r.1)
    }

    fn suffix_len(&self) -> usize {
        self.suffix.as_ref().map_or(0, |s| s.1)
    }

    /// Keep the best rewrite and suffix of `other` only if strictly longer.
    fn merge(&mut self, other: MatchRecord) {
        if let Some(rewrite) = other.rewrite.filter(|r| r.1 > self.rewrite_len()) {
            self.rewrite = Some(rewrite);
        }
        if let Some(suffix) = other.suffix.filter(|s| s.1 > self.suffix_len()) {
            self.suffix = Some(suffix);
        }
    }

    /// The exact match, else the longest rewrite, else the longest suffix.
    pub fn into_match(self) -> Option<String> {
        self.instant
            .or(self.rewrite.map(|r| r.0))
            .or(self.suffix.map(|s| s.0))
    }
}

/// Which `delegate*` entries to consider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelegateKind {
    Public,
    System,
    Uri,
}

impl DelegateKind {
    fn select(self, entry: &CatalogEntry) -> Option<&DelegateEntry> {
        match (self, entry) {
            (Self::Public, CatalogEntry::DelegatePublic(d))
            | (Self::System, CatalogEntry::DelegateSystem(d))
            | (Self::Uri, CatalogEntry::DelegateUri(d)) => Some(d),
            _ => None,
        }
    }
}

/// An ordered list of entries sharing a `prefer` mode and a base URI.
///
/// The top level of a catalog document is a group too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    id: Option<String>,
    prefer: PreferMode,
    base_uri: String,
    entries: Vec<CatalogEntry>,
}

impl Group {
    pub fn new(id: Option<String>, prefer: PreferMode, base_uri: impl Into<String>) -> Self {
        Self {
            id,
            prefer,
            base_uri: base_uri.into(),
            entries: vec![],
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn prefer(&self) -> PreferMode {
        self.prefer
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn push(&mut self, entry: CatalogEntry) {
        self.entries.push(entry);
    }

    /// Match a normalized system identifier against `system`,
    /// `rewriteSystem` and `systemSuffix` entries.
    pub fn match_system(&self, system_id: &str) -> MatchRecord {
        let mut record = MatchRecord::default();
        for entry in &self.entries {
            match entry {
                CatalogEntry::System(system) => {
                    if let Some(target) = system.matches(system_id) {
                        return MatchRecord::instant(target);
                    }
                }
                CatalogEntry::RewriteSystem(rewrite) => {
                    if let Some(m) = rewrite.match_longest(system_id, record.rewrite_len()) {
                        record.rewrite = Some(m);
                    }
                }
                CatalogEntry::SystemSuffix(suffix) => {
                    if let Some(m) = suffix.match_longest(system_id, record.suffix_len()) {
                        record.suffix = Some(m);
                    }
                }
                CatalogEntry::Group(group) => {
                    let nested = group.match_system(system_id);
                    if nested.instant.is_some() {
                        return nested;
                    }
                    record.merge(nested);
                }
                _ => {}
            }
        }
        record
    }

    /// Match a normalized URI reference against `uri`, `rewriteURI` and
    /// `uriSuffix` entries.
    pub fn match_uri(&self, uri: &str) -> MatchRecord {
        let mut record = MatchRecord::default();
        for entry in &self.entries {
            match entry {
                CatalogEntry::Uri(exact) => {
                    if let Some(target) = exact.matches(uri) {
                        return MatchRecord::instant(target);
                    }
                }
                CatalogEntry::RewriteUri(rewrite) => {
                    if let Some(m) = rewrite.match_longest(uri, record.rewrite_len()) {
                        record.rewrite = Some(m);
                    }
                }
                CatalogEntry::UriSuffix(suffix) => {
                    if let Some(m) = suffix.match_longest(uri, record.suffix_len()) {
                        record.suffix = Some(m);
                    }
                }
                CatalogEntry::Group(group) => {
                    let nested = group.match_uri(uri);
                    if nested.instant.is_some() {
                        return nested;
                    }
                    record.merge(nested);
                }
                _ => {}
            }
        }
        record
    }

    /// Match a normalized public identifier against `public` entries, and
    /// `uri` entries whose name equals `uri_key`.
    ///
    /// The direct entries of a group preferring system identifiers are
    /// skipped when a system identifier was supplied, even if it did not
    /// match. Nested groups apply their own preference.
    pub fn match_public(&self, public_id: &str, uri_key: &str, system_supplied: bool) -> Option<String> {
        let skip = self.prefer == PreferMode::System && system_supplied;
        self.entries.iter().find_map(|entry| match entry {
            CatalogEntry::Group(group) => group.match_public(public_id, uri_key, system_supplied),
            _ if skip => None,
            CatalogEntry::Public(public) => public.matches(public_id).map(str::to_owned),
            CatalogEntry::Uri(uri) => uri.matches(uri_key).map(str::to_owned),
            _ => None,
        })
    }

    /// Find the delegate entry of `kind` with the longest start string that
    /// prefixes `key`, nested groups included.
    ///
    /// Returns the delegate catalog URI and the start string length.
    pub fn best_delegate(
        &self,
        kind: DelegateKind,
        key: &str,
        system_supplied: bool,
    ) -> Option<(&str, usize)> {
        let mut best = None::<(&str, usize)>;
        self.scan_delegates(kind, key, system_supplied, &mut best);
        best
    }

    fn scan_delegates<'a>(
        &'a self,
        kind: DelegateKind,
        key: &str,
        system_supplied: bool,
        best: &mut Option<(&'a str, usize)>,
    ) {
        let skip = kind == DelegateKind::Public && self.prefer == PreferMode::System && system_supplied;
        for entry in &self.entries {
            if let CatalogEntry::Group(group) = entry {
                group.scan_delegates(kind, key, system_supplied, best);
            } else if skip {
                continue;
            } else if let Some(delegate) = kind.select(entry) {
                let len = best.map_or(0, |b| b.1);
                if let Some(m) = delegate.match_longest(key, len) {
                    *best = Some(m);
                }
            }
        }
    }

    /// Every delegate catalog URI in the tree, in document order.
    pub fn delegate_catalogs(&self) -> Vec<&str> {
        let mut ret = vec![];
        self.collect_delegate_catalogs(&mut ret);
        ret
    }

    fn collect_delegate_catalogs<'a>(&'a self, out: &mut Vec<&'a str>) {
        for entry in &self.entries {
            match entry {
                CatalogEntry::DelegatePublic(d)
                | CatalogEntry::DelegateSystem(d)
                | CatalogEntry::DelegateUri(d) => {
                    if !out.contains(&d.catalog()) {
                        out.push(d.catalog());
                    }
                }
                CatalogEntry::Group(group) => group.collect_delegate_catalogs(out),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::entry::{
        PublicEntry, RewriteEntry, SuffixEntry, SystemEntry, UriEntry,
    };

    fn group(prefer: PreferMode, entries: Vec<CatalogEntry>) -> Group {
        let mut group = Group::new(None, prefer, "file:///etc/xml/catalog");
        for entry in entries {
            group.push(entry);
        }
        group
    }

    #[test]
    fn system_entry_wins_over_rewrite() {
        let group = group(
            PreferMode::Public,
            vec![
                CatalogEntry::RewriteSystem(RewriteEntry::new("http://x/", "file:///rewritten/")),
                CatalogEntry::System(SystemEntry::new("http://x/a.dtd", "file:///exact/a.dtd")),
            ],
        );
        assert_eq!(
            group.match_system("http://x/a.dtd").into_match().as_deref(),
            Some("file:///exact/a.dtd")
        );
        assert_eq!(
            group.match_system("http://x/b.dtd").into_match().as_deref(),
            Some("file:///rewritten/b.dtd")
        );
    }

    #[test]
    fn longest_rewrite_wins_regardless_of_order() {
        let short = CatalogEntry::RewriteSystem(RewriteEntry::new("http://x/", "file:///short/"));
        let long = CatalogEntry::RewriteSystem(RewriteEntry::new("http://x/sub/", "file:///long/"));
        for entries in [vec![short.clone(), long.clone()], vec![long, short]] {
            let group = group(PreferMode::Public, entries);
            assert_eq!(
                group.match_system("http://x/sub/a.dtd").into_match().as_deref(),
                Some("file:///long/a.dtd")
            );
        }
    }

    #[test]
    fn equal_length_keeps_first() {
        let group = group(
            PreferMode::Public,
            vec![
                CatalogEntry::UriSuffix(SuffixEntry::new("a.xsd", "file:///first.xsd")),
                CatalogEntry::UriSuffix(SuffixEntry::new("a.xsd", "file:///second.xsd")),
            ],
        );
        assert_eq!(
            group.match_uri("http://x/a.xsd").into_match().as_deref(),
            Some("file:///first.xsd")
        );
    }

    #[test]
    fn rewrite_beats_suffix() {
        let group = group(
            PreferMode::Public,
            vec![
                CatalogEntry::SystemSuffix(SuffixEntry::new("/sub/a.dtd", "file:///suffix.dtd")),
                CatalogEntry::RewriteSystem(RewriteEntry::new("http://x/", "file:///r/")),
            ],
        );
        assert_eq!(
            group.match_system("http://x/sub/a.dtd").into_match().as_deref(),
            Some("file:///r/sub/a.dtd")
        );
    }

    #[test]
    fn nested_groups() {
        let inner = group(
            PreferMode::Public,
            vec![
                CatalogEntry::RewriteSystem(RewriteEntry::new("http://x/sub/", "file:///inner/")),
                CatalogEntry::System(SystemEntry::new("http://x/exact.dtd", "file:///inner.dtd")),
            ],
        );
        let outer = group(
            PreferMode::Public,
            vec![
                CatalogEntry::RewriteSystem(RewriteEntry::new("http://x/", "file:///outer/")),
                CatalogEntry::Group(inner),
                CatalogEntry::System(SystemEntry::new("http://x/exact.dtd", "file:///outer.dtd")),
            ],
        );
        assert_eq!(
            outer.match_system("http://x/sub/a.dtd").into_match().as_deref(),
            Some("file:///inner/a.dtd")
        );
        assert_eq!(
            outer.match_system("http://x/exact.dtd").into_match().as_deref(),
            Some("file:///inner.dtd")
        );
        assert_eq!(
            outer.match_system("http://x/other.dtd").into_match().as_deref(),
            Some("file:///outer/other.dtd")
        );
    }

    #[test]
    fn prefer_system_suppresses_public() {
        let entries = vec![CatalogEntry::Public(PublicEntry::new(
            "-//A//DTD B//EN",
            "file:///b.dtd",
        ))];
        let system = group(PreferMode::System, entries.clone());
        assert_eq!(system.match_public("-//A//DTD B//EN", "", true), None);
        assert_eq!(
            system.match_public("-//A//DTD B//EN", "", false).as_deref(),
            Some("file:///b.dtd")
        );
        let public = group(PreferMode::Public, entries);
        assert_eq!(
            public.match_public("-//A//DTD B//EN", "", true).as_deref(),
            Some("file:///b.dtd")
        );
        let nested = group(PreferMode::System, vec![CatalogEntry::Group(public)]);
        assert_eq!(
            nested.match_public("-//A//DTD B//EN", "", true).as_deref(),
            Some("file:///b.dtd")
        );
    }

    #[test]
    fn public_matches_uri_entries() {
        let group = group(
            PreferMode::Public,
            vec![CatalogEntry::Uri(UriEntry::new("-//A//B//EN", "file:///b.xml"))],
        );
        assert_eq!(
            group.match_public("-//A//B//EN", "-//A//B//EN", false).as_deref(),
            Some("file:///b.xml")
        );
    }

    #[test]
    fn best_delegate_searches_nested_groups() {
        let inner = group(
            PreferMode::System,
            vec![CatalogEntry::DelegatePublic(DelegateEntry::new(
                "-//OASIS//DTD",
                "file:///inner.xml",
                true,
            ))],
        );
        let outer = group(
            PreferMode::Public,
            vec![
                CatalogEntry::DelegatePublic(DelegateEntry::new("-//OASIS//", "file:///outer.xml", true)),
                CatalogEntry::Group(inner),
                CatalogEntry::DelegateSystem(DelegateEntry::new("http://x/", "file:///sys.xml", false)),
            ],
        );
        let key = "-//OASIS//DTD DocBook//EN";
        assert_eq!(
            outer.best_delegate(DelegateKind::Public, key, false),
            Some(("file:///inner.xml", 13))
        );
        assert_eq!(
            outer.best_delegate(DelegateKind::Public, key, true),
            Some(("file:///outer.xml", 10))
        );
        assert_eq!(
            outer.best_delegate(DelegateKind::System, "http://x/a.dtd", false),
            Some(("file:///sys.xml", 9))
        );
        assert_eq!(outer.best_delegate(DelegateKind::Uri, "http://x/a.dtd", false), None);
        assert_eq!(
            outer.delegate_catalogs(),
            ["file:///outer.xml", "file:///inner.xml", "file:///sys.xml"]
        );
    }
}
