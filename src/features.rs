//! Configuration of catalog loading and resolution.
//!
//! Each [`Feature`] is looked up, in order, from the value given through
//! [`CatalogFeaturesBuilder::with`], the process environment, the packaged
//! defaults file and finally the built-in default. The `prefer`, `defer` and
//! `resolve` attributes of the main catalog document take precedence over
//! all of these; they are applied by the loader.

use std::{
    fmt::Display,
    fs::read_to_string,
    io,
    path::{Path, PathBuf},
    str::FromStr,
};

use const_format::concatcp;
use tracing::debug;

use crate::{SYSCONFDIR, error::CatalogError, uri::validate_catalog_uri};

/// Location of the packaged defaults file.
pub const DEFAULT_PROPERTIES_FILE: &str = concatcp!(SYSCONFDIR, "/xml/catalog.properties");

/// The configurable features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// `;`-separated list of absolute catalog URIs.
    Files,
    /// `public` or `system`.
    Prefer,
    /// `true` or `false`.
    Defer,
    /// `strict`, `continue` or `ignore`.
    Resolve,
}

impl Feature {
    pub const ALL: [Feature; 4] = [
        Feature::Files,
        Feature::Prefer,
        Feature::Defer,
        Feature::Resolve,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Files => "files",
            Self::Prefer => "prefer",
            Self::Defer => "defer",
            Self::Resolve => "resolve",
        }
    }

    /// Key of the feature in the defaults file.
    pub fn property(&self) -> &'static str {
        match self {
            Self::Files => "xml.catalog.files",
            Self::Prefer => "xml.catalog.prefer",
            Self::Defer => "xml.catalog.defer",
            Self::Resolve => "xml.catalog.resolve",
        }
    }

    /// Name of the environment variable that overrides the defaults file.
    pub fn env_var(&self) -> &'static str {
        match self {
            Self::Files => "XML_CATALOG_FILES",
            Self::Prefer => "XML_CATALOG_PREFER",
            Self::Defer => "XML_CATALOG_DEFER",
            Self::Resolve => "XML_CATALOG_RESOLVE",
        }
    }

    pub fn default_value(&self) -> &'static str {
        match self {
            Self::Files => "",
            Self::Prefer => "public",
            Self::Defer => "true",
            Self::Resolve => "strict",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Which kind of external identifier is preferred when both a public and a
/// system identifier are supplied.
#[doc(alias = "xmlCatalogPrefer")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreferMode {
    #[default]
    Public,
    System,
}

impl FromStr for PreferMode {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "system" => Ok(Self::System),
            _ => Err(CatalogError::InvalidFeature {
                feature: "prefer",
                value: s.to_owned(),
            }),
        }
    }
}

impl Display for PreferMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::System => write!(f, "system"),
        }
    }
}

/// What to do when no catalog entry matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveMode {
    /// Report [`CatalogError::Unresolved`].
    #[default]
    Strict,
    /// Let the caller go on with its own lookup.
    Continue,
    /// Let the caller substitute an empty resource.
    Ignore,
}

impl FromStr for ResolveMode {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(Self::Strict),
            "continue" => Ok(Self::Continue),
            "ignore" => Ok(Self::Ignore),
            _ => Err(CatalogError::InvalidFeature {
                feature: "resolve",
                value: s.to_owned(),
            }),
        }
    }
}

impl Display for ResolveMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Continue => write!(f, "continue"),
            Self::Ignore => write!(f, "ignore"),
        }
    }
}

pub(crate) fn parse_defer(value: &str) -> Result<bool, CatalogError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(CatalogError::InvalidFeature {
            feature: "defer",
            value: value.to_owned(),
        }),
    }
}

/// Validated feature values.
///
/// `Default` yields the built-in defaults without consulting the
/// environment or the defaults file. Use [`CatalogFeatures::builder`] for the
/// full lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogFeatures {
    files: Vec<String>,
    prefer: PreferMode,
    defer: bool,
    resolve: ResolveMode,
}

impl Default for CatalogFeatures {
    fn default() -> Self {
        Self {
            files: vec![],
            prefer: PreferMode::Public,
            defer: true,
            resolve: ResolveMode::Strict,
        }
    }
}

impl CatalogFeatures {
    pub fn builder() -> CatalogFeaturesBuilder {
        CatalogFeaturesBuilder::default()
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn prefer(&self) -> PreferMode {
        self.prefer
    }

    pub fn defer(&self) -> bool {
        self.defer
    }

    pub fn resolve(&self) -> ResolveMode {
        self.resolve
    }

    /// The value of `feature` in its textual form.
    pub fn get(&self, feature: Feature) -> String {
        match feature {
            Feature::Files => self.files.join(";"),
            Feature::Prefer => self.prefer.to_string(),
            Feature::Defer => self.defer.to_string(),
            Feature::Resolve => self.resolve.to_string(),
        }
    }

    pub(crate) fn set_prefer(&mut self, prefer: PreferMode) {
        self.prefer = prefer;
    }

    pub(crate) fn set_defer(&mut self, defer: bool) {
        self.defer = defer;
    }

    pub(crate) fn set_resolve(&mut self, resolve: ResolveMode) {
        self.resolve = resolve;
    }
}

/// Split and validate a `files` value.
pub(crate) fn parse_files(value: &str) -> Result<Vec<String>, CatalogError> {
    value
        .split(';')
        .map(str::trim)
        .filter(|uri| !uri.is_empty())
        .map(|uri| validate_catalog_uri(uri).map(String::from))
        .collect()
}

#[derive(Debug)]
pub struct CatalogFeaturesBuilder {
    values: [Option<String>; 4],
    use_environment: bool,
    defaults_file: Option<PathBuf>,
}

impl Default for CatalogFeaturesBuilder {
    fn default() -> Self {
        Self {
            values: Default::default(),
            use_environment: true,
            defaults_file: Some(PathBuf::from(DEFAULT_PROPERTIES_FILE)),
        }
    }
}

impl CatalogFeaturesBuilder {
    /// Set `feature` to `value`. The value is validated by [`build`](Self::build).
    pub fn with(mut self, feature: Feature, value: impl Into<String>) -> Self {
        self.values[feature.index()] = Some(value.into());
        self
    }

    /// Do not consult the `XML_CATALOG_*` environment variables.
    pub fn ignore_environment(mut self) -> Self {
        self.use_environment = false;
        self
    }

    /// Read default values from `path` instead of [`DEFAULT_PROPERTIES_FILE`].
    /// `None` disables the defaults file.
    pub fn defaults_file(mut self, path: Option<impl AsRef<Path>>) -> Self {
        self.defaults_file = path.map(|path| path.as_ref().to_owned());
        self
    }

    pub fn build(self) -> Result<CatalogFeatures, CatalogError> {
        let properties = match self.defaults_file.as_deref() {
            Some(path) => read_properties(path)?,
            None => vec![],
        };

        let lookup = |feature: Feature| -> String {
            if let Some(value) = self.values[feature.index()].as_deref() {
                return value.to_owned();
            }
            if self.use_environment {
                if let Ok(value) = std::env::var(feature.env_var()) {
                    debug!("{feature} taken from {}: {value}", feature.env_var());
                    return value;
                }
            }
            if let Some((_, value)) = properties.iter().find(|(key, _)| key == feature.property())
            {
                debug!("{feature} taken from the defaults file: {value}");
                return value.clone();
            }
            feature.default_value().to_owned()
        };

        Ok(CatalogFeatures {
            files: parse_files(&lookup(Feature::Files))?,
            prefer: lookup(Feature::Prefer).parse()?,
            defer: parse_defer(&lookup(Feature::Defer))?,
            resolve: lookup(Feature::Resolve).parse()?,
        })
    }
}

/// Read `key=value` lines. A missing file yields no properties.
fn read_properties(path: &Path) -> Result<Vec<(String, String)>, CatalogError> {
    let content = match read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
        Err(e) => return Err(e.into()),
    };
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(['#', '!']))
        .filter_map(|line| {
            let (key, value) = line.split_once(['=', ':'])?;
            Some((key.trim().to_owned(), value.trim().to_owned()))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn builder() -> CatalogFeaturesBuilder {
        CatalogFeatures::builder()
            .ignore_environment()
            .defaults_file(None::<&str>)
    }

    #[test]
    fn built_in_defaults() {
        let features = builder().build().unwrap();
        assert_eq!(features, CatalogFeatures::default());
        assert!(features.files().is_empty());
        assert_eq!(features.prefer(), PreferMode::Public);
        assert!(features.defer());
        assert_eq!(features.resolve(), ResolveMode::Strict);
        assert!(DEFAULT_PROPERTIES_FILE.ends_with("/xml/catalog.properties"));
    }

    #[test]
    fn api_values() {
        let features = builder()
            .with(
                Feature::Files,
                "file:///etc/xml/catalog; ;http://example.com/catalog.xml",
            )
            .with(Feature::Prefer, "system")
            .with(Feature::Defer, "false")
            .with(Feature::Resolve, "continue")
            .build()
            .unwrap();
        assert_eq!(
            features.files(),
            ["file:///etc/xml/catalog", "http://example.com/catalog.xml"]
        );
        assert_eq!(features.prefer(), PreferMode::System);
        assert!(!features.defer());
        assert_eq!(features.resolve(), ResolveMode::Continue);
        assert_eq!(features.get(Feature::Resolve), "continue");
        assert_eq!(
            features.get(Feature::Files),
            "file:///etc/xml/catalog;http://example.com/catalog.xml"
        );
    }

    #[test]
    fn invalid_values_are_rejected() {
        for (feature, value) in [
            (Feature::Prefer, "both"),
            (Feature::Defer, "yes"),
            (Feature::Resolve, "skip"),
        ] {
            let err = builder().with(feature, value).build().unwrap_err();
            assert!(
                matches!(&err, CatalogError::InvalidFeature { feature: f, .. } if *f == feature.name()),
                "{err}"
            );
        }
        for files in ["catalog.xml", "ftp://example.com/catalog.xml"] {
            let err = builder().with(Feature::Files, files).build().unwrap_err();
            assert!(matches!(err, CatalogError::InvalidUri { .. }), "{err}");
        }
    }

    #[test]
    fn defaults_file_is_below_api() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "# packaged defaults\nxml.catalog.prefer = system\nxml.catalog.resolve=ignore\nunknown.key=1"
        )
        .unwrap();
        let features = builder()
            .defaults_file(Some(file.path()))
            .with(Feature::Resolve, "continue")
            .build()
            .unwrap();
        assert_eq!(features.prefer(), PreferMode::System);
        assert_eq!(features.resolve(), ResolveMode::Continue);
        assert!(features.defer());
    }

    #[test]
    fn missing_defaults_file() {
        let features = builder()
            .defaults_file(Some("/nonexistent/xml/catalog.properties"))
            .build()
            .unwrap();
        assert_eq!(features, CatalogFeatures::default());
    }

    #[test]
    fn literals_round_trip() {
        for prefer in [PreferMode::Public, PreferMode::System] {
            assert_eq!(prefer.to_string().parse::<PreferMode>().unwrap(), prefer);
        }
        for resolve in [ResolveMode::Strict, ResolveMode::Continue, ResolveMode::Ignore] {
            assert_eq!(resolve.to_string().parse::<ResolveMode>().unwrap(), resolve);
        }
    }
}
