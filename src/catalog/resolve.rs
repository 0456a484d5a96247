use std::collections::HashSet;

use tracing::{debug, warn};

use super::{
    Catalog, CatalogDocument,
    group::DelegateKind,
    session::LoadingSession,
};
use crate::{
    error::CatalogError,
    features::ResolveMode,
    normalize::{decode_urn, is_urn, normalize_public_id, normalize_uri},
};

/// State of one top-level lookup.
#[derive(Debug, Default)]
pub(crate) struct SearchState {
    /// Catalogs currently being searched, outermost first.
    ancestors: Vec<String>,
    /// Catalogs whose entries were already searched without success.
    searched: HashSet<String>,
}

impl SearchState {
    fn is_ancestor(&self, uri: &str) -> bool {
        self.ancestors.iter().any(|a| a == uri)
    }

    fn enter(&mut self, uri: &str) {
        self.ancestors.push(uri.to_owned());
    }

    fn leave(&mut self) {
        self.ancestors.pop();
    }
}

#[derive(Debug, Clone, Copy)]
enum Query<'a> {
    External {
        public_id: Option<&'a str>,
        system_id: Option<&'a str>,
    },
    Uri(&'a str),
}

type MatchResult = Result<Option<String>, CatalogError>;

impl CatalogDocument {
    fn match_system_in(
        &self,
        system_id: &str,
        session: &LoadingSession,
        state: &mut SearchState,
    ) -> MatchResult {
        if let Some(found) = self.root.match_system(system_id).into_match() {
            debug!("{}: found system match {system_id}, using {found}", self.system_id);
            return Ok(Some(found));
        }
        self.delegate(DelegateKind::System, system_id, false, session, state, |doc, session, state| {
            doc.match_system_in(system_id, session, state)
        })
    }

    fn match_public_in(
        &self,
        public_id: &str,
        system_supplied: bool,
        session: &LoadingSession,
        state: &mut SearchState,
    ) -> MatchResult {
        let uri_key = normalize_uri(public_id);
        if let Some(found) = self.root.match_public(public_id, &uri_key, system_supplied) {
            debug!("{}: found public match {public_id}, using {found}", self.system_id);
            return Ok(Some(found));
        }
        self.delegate(
            DelegateKind::Public,
            public_id,
            system_supplied,
            session,
            state,
            |doc, session, state| doc.match_public_in(public_id, system_supplied, session, state),
        )
    }

    fn match_uri_in(&self, uri: &str, session: &LoadingSession, state: &mut SearchState) -> MatchResult {
        if let Some(found) = self.root.match_uri(uri).into_match() {
            debug!("{}: found uri match {uri}, using {found}", self.system_id);
            return Ok(Some(found));
        }
        self.delegate(DelegateKind::Uri, uri, false, session, state, |doc, session, state| {
            doc.match_uri_in(uri, session, state)
        })
    }

    /// Hand `key` to the delegate catalog with the longest matching start
    /// string. Its own alternates are not searched.
    fn delegate(
        &self,
        kind: DelegateKind,
        key: &str,
        system_supplied: bool,
        session: &LoadingSession,
        state: &mut SearchState,
        matcher: impl FnOnce(&CatalogDocument, &LoadingSession, &mut SearchState) -> MatchResult,
    ) -> MatchResult {
        let Some((catalog, _)) = self.root.best_delegate(kind, key, system_supplied) else {
            return Ok(None);
        };
        if state.is_ancestor(catalog) {
            return Err(CatalogError::CircularReference {
                uri: catalog.to_owned(),
            });
        }
        let Some(delegate) = session.fetch(catalog)? else {
            debug!("{}: delegate catalog {catalog} is unavailable", self.system_id);
            return Ok(None);
        };
        debug!("{}: delegating {key} to {catalog}", self.system_id);
        state.enter(catalog);
        let found = matcher(&*delegate, session, state);
        state.leave();
        found
    }
}

/// Unwrap `urn:publicid:` identifiers (XML Catalogs section 7.1.1) and
/// normalize both identifiers.
fn unwrap_identifiers(
    public_id: Option<&str>,
    system_id: Option<&str>,
) -> (Option<String>, Option<String>) {
    let mut public = public_id.map(|id| {
        let decoded = decode_urn(id);
        if is_urn(id) {
            debug!("expanded URN {id} to {decoded}");
        }
        normalize_public_id(&decoded).into_owned()
    });
    let system = match system_id {
        Some(id) if is_urn(id) => {
            let unwrapped = normalize_public_id(&decode_urn(id)).into_owned();
            match public.as_deref() {
                Some(public) if public != unwrapped => {
                    warn!("system identifier {id} does not match public identifier {public}, discarding it");
                }
                _ => {}
            }
            if public.is_none() {
                debug!("expanded URN {id} to public identifier {unwrapped}");
                public = Some(unwrapped);
            }
            None
        }
        Some(id) => Some(normalize_uri(id).into_owned()),
        None => None,
    };
    (public, system)
}

impl Catalog {
    /// Match `system_id` against the main catalog and its delegates.
    ///
    /// Alternate catalogs are not searched and a missing match is not an
    /// error.
    pub fn match_system(&self, system_id: &str) -> MatchResult {
        let system_id = normalize_uri(system_id);
        let mut state = SearchState::default();
        state.enter(self.document.system_id());
        self.document
            .match_system_in(&system_id, &self.session, &mut state)
    }

    /// Match `public_id` against the main catalog and its delegates.
    ///
    /// Same contract as [`match_system`](Self::match_system).
    pub fn match_public(&self, public_id: &str) -> MatchResult {
        let public_id = normalize_public_id(&decode_urn(public_id)).into_owned();
        let mut state = SearchState::default();
        state.enter(self.document.system_id());
        self.document
            .match_public_in(&public_id, false, &self.session, &mut state)
    }

    /// Match `uri` against the main catalog and its delegates.
    ///
    /// Same contract as [`match_system`](Self::match_system).
    pub fn match_uri(&self, uri: &str) -> MatchResult {
        let uri = normalize_uri(uri);
        let mut state = SearchState::default();
        state.enter(self.document.system_id());
        self.document.match_uri_in(&uri, &self.session, &mut state)
    }

    /// Resolve an external identifier.
    ///
    /// The system identifier is tried first, then the public identifier,
    /// then the system identifier against `uri` entries. Alternate catalogs
    /// are searched in order until one of them has a match.
    ///
    /// Without a match, the result depends on the `resolve` feature: `strict`
    /// reports [`CatalogError::Unresolved`], the other modes return `None`.
    #[doc(alias = "xmlCatalogResolve")]
    pub fn resolve(&self, public_id: Option<&str>, system_id: Option<&str>) -> MatchResult {
        let found = self.lookup_external(public_id, system_id)?;
        self.check_unresolved(found, public_id, system_id)
    }

    /// Resolve a URI reference.
    ///
    /// A `urn:publicid:` URI is resolved as a public identifier first.
    #[doc(alias = "xmlCatalogResolveURI")]
    pub fn resolve_uri(&self, uri: &str) -> MatchResult {
        let found = self.lookup_uri(uri)?;
        self.check_unresolved(found, None, Some(uri))
    }

    pub(crate) fn check_unresolved(
        &self,
        found: Option<String>,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> MatchResult {
        if found.is_none() && self.session.resolve == ResolveMode::Strict {
            return Err(CatalogError::Unresolved {
                public_id: public_id.map(str::to_owned),
                system_id: system_id.map(str::to_owned),
            });
        }
        Ok(found)
    }

    /// [`resolve`](Self::resolve) without the unresolved policy.
    pub(crate) fn lookup_external(
        &self,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> MatchResult {
        let (public_id, system_id) = unwrap_identifiers(public_id, system_id);
        if public_id.is_none() && system_id.is_none() {
            return Ok(None);
        }
        let query = Query::External {
            public_id: public_id.as_deref(),
            system_id: system_id.as_deref(),
        };
        self.resolve_in(&self.document, true, query, &mut SearchState::default())
    }

    /// [`resolve_uri`](Self::resolve_uri) without the unresolved policy.
    pub(crate) fn lookup_uri(&self, uri: &str) -> MatchResult {
        if is_urn(uri) {
            let public_id = normalize_public_id(&decode_urn(uri)).into_owned();
            debug!("expanded URN {uri} to {public_id}");
            let query = Query::External {
                public_id: Some(public_id.as_str()),
                system_id: None,
            };
            if let Some(found) =
                self.resolve_in(&self.document, true, query, &mut SearchState::default())?
            {
                return Ok(Some(found));
            }
        }
        let uri = normalize_uri(uri);
        self.resolve_in(
            &self.document,
            true,
            Query::Uri(&uri),
            &mut SearchState::default(),
        )
    }

    fn resolve_in(
        &self,
        doc: &CatalogDocument,
        is_root: bool,
        query: Query,
        state: &mut SearchState,
    ) -> MatchResult {
        state.enter(doc.system_id());
        let found = self.search(doc, is_root, query, state);
        state.leave();
        found
    }

    fn search(
        &self,
        doc: &CatalogDocument,
        is_root: bool,
        query: Query,
        state: &mut SearchState,
    ) -> MatchResult {
        let session = &*self.session;
        let found = match query {
            Query::External {
                public_id,
                system_id,
            } => {
                let mut found = None;
                if let Some(system_id) = system_id {
                    found = doc.match_system_in(system_id, session, state)?;
                }
                if let Some(public_id) = public_id.filter(|_| found.is_none()) {
                    found = doc.match_public_in(public_id, system_id.is_some(), session, state)?;
                }
                if let Some(system_id) = system_id.filter(|_| found.is_none()) {
                    found = doc.match_uri_in(system_id, session, state)?;
                }
                found
            }
            Query::Uri(uri) => doc.match_uri_in(uri, session, state)?,
        };
        if found.is_some() {
            return Ok(found);
        }
        state.searched.insert(doc.system_id().to_owned());

        let inputs = if is_root {
            self.input_files.as_slice()
        } else {
            &[]
        };
        for alternate in doc.next_catalogs().iter().chain(inputs) {
            if state.is_ancestor(alternate) {
                return Err(CatalogError::CircularReference {
                    uri: alternate.clone(),
                });
            }
            if state.searched.contains(alternate) {
                debug!("{alternate}: already searched");
                continue;
            }
            let Some(next) = session.fetch(alternate)? else {
                continue;
            };
            if let Some(found) = self.resolve_in(&next, false, query, state)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urn_identifiers() {
        let urn = "urn:publicid:-:A:DTD+B:EN";
        assert_eq!(
            unwrap_identifiers(None, Some(urn)),
            (Some("-//A//DTD B//EN".to_owned()), None)
        );
        assert_eq!(
            unwrap_identifiers(Some("-//A//DTD  B//EN"), Some(urn)),
            (Some("-//A//DTD B//EN".to_owned()), None)
        );
        assert_eq!(
            unwrap_identifiers(Some("-//C//DTD D//EN"), Some(urn)),
            (Some("-//C//DTD D//EN".to_owned()), None)
        );
        assert_eq!(
            unwrap_identifiers(Some(urn), Some("http://x/a b.dtd")),
            (
                Some("-//A//DTD B//EN".to_owned()),
                Some("http://x/a%20b.dtd".to_owned())
            )
        );
        assert_eq!(unwrap_identifiers(None, None), (None, None));
    }
}
