//! Resolve public identifiers, system identifiers and URIs through XML
//! catalogs from the command line.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{EnvFilter, prelude::*};
use xml_catalog::{CatalogError, CatalogFeatures, CatalogLoader, Feature, uri::canonic_path};

#[derive(clap::Parser)]
#[command(
    version,
    name = "xmlcatalog",
    about = "Resolve identifiers through XML catalogs.",
    arg_required_else_help = true
)]
struct CmdArgs {
    /// catalog file or URI to load, may be repeated (default: XML_CATALOG_FILES)
    #[arg(long = "catalog", value_name = "URI")]
    catalogs: Vec<String>,
    /// prefer public or system identifiers
    #[arg(long, value_name = "public|system")]
    prefer: Option<String>,
    /// load delegate and next catalogs only when needed
    #[arg(long, value_name = "true|false")]
    defer: Option<String>,
    /// behavior when no entry matches
    #[arg(long, value_name = "strict|continue|ignore")]
    resolve: Option<String>,
    /// public identifier to resolve
    #[arg(long, value_name = "ID")]
    public: Option<String>,
    /// system identifier to resolve
    #[arg(long, value_name = "ID")]
    system: Option<String>,
    /// URI reference to resolve
    #[arg(long, value_name = "URI", conflicts_with_all = ["public", "system"])]
    uri: Option<String>,
    #[cfg(feature = "output")]
    /// dump the main catalog to stdout
    #[arg(long)]
    dump: bool,
    /// trace the resolution
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    let args = CmdArgs::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("XML_CATALOG_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mut builder = CatalogFeatures::builder();
    for (feature, value) in [
        (Feature::Prefer, &args.prefer),
        (Feature::Defer, &args.defer),
        (Feature::Resolve, &args.resolve),
    ] {
        if let Some(value) = value {
            builder = builder.with(feature, value.as_str());
        }
    }
    let features = builder.build().context("invalid configuration")?;

    let uris = args
        .catalogs
        .iter()
        .map(|catalog| canonic_path(catalog).into_owned())
        .collect::<Vec<_>>();
    let catalog = CatalogLoader::new(features)
        .load(&uris)
        .context("failed to load the catalogs")?;

    #[cfg(feature = "output")]
    if args.dump {
        catalog
            .dump(std::io::stdout().lock())
            .context("failed to dump the catalog")?;
    }

    let (query, result) = if let Some(uri) = args.uri.as_deref() {
        (uri.to_owned(), catalog.resolve_uri(uri))
    } else if args.public.is_some() || args.system.is_some() {
        let query = [args.public.as_deref(), args.system.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        (
            query,
            catalog.resolve(args.public.as_deref(), args.system.as_deref()),
        )
    } else {
        return Ok(ExitCode::SUCCESS);
    };

    match result {
        Ok(Some(uri)) => {
            println!("{uri}");
            Ok(ExitCode::SUCCESS)
        }
        Ok(None) | Err(CatalogError::Unresolved { .. }) => {
            println!("No entry for {query}");
            Ok(ExitCode::from(1))
        }
        Err(e) => Err(e).with_context(|| format!("failed to resolve {query}")),
    }
}
