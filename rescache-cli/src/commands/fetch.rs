//! Fetch command: stream a URL through the resource cache.
//!
//! A valid cached copy is served straight from disk. Otherwise the resource
//! is downloaded once, written to the cache and, if requested, to an output
//! file at the same time.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use rescache::cache::{generate_key, CacheConfig, CacheIndex, ResourceCache};
use rescache::config::{format_size_approx, ConfigFile};
use rescache::metacard::{attribute, Metacard};
use rescache::transfer::{
    CachedResourceWriter, HttpRetriever, ResourceRetriever, ResourceStream, TransferConfig,
    TransferOutcome,
};
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::error::CliError;

/// Arguments for `rescache fetch`.
#[derive(Debug, Args)]
pub struct FetchArgs {
    /// URL of the resource
    pub url: String,

    /// Source identifier of the catalog entry
    #[arg(long)]
    pub source: String,

    /// Identifier of the catalog entry
    #[arg(long)]
    pub id: String,

    /// Checksum of the current resource; a cached copy with a different
    /// checksum is treated as stale
    #[arg(long)]
    pub checksum: Option<String>,

    /// Write the resource to this file
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Run the fetch command.
pub fn run(args: FetchArgs, config: &ConfigFile) -> Result<(), CliError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    runtime.block_on(fetch(args, config))
}

async fn fetch(args: FetchArgs, config: &ConfigFile) -> Result<(), CliError> {
    let cache = Arc::new(ResourceCache::open(CacheConfig::from(config))?);

    let mut metacard = Metacard::new(args.id.as_str(), args.source.as_str())
        .with_attribute(attribute::RESOURCE_URI, args.url.as_str());
    if let Some(checksum) = &args.checksum {
        metacard.set_attribute(attribute::CHECKSUM, checksum.as_str());
    }
    let key = generate_key(Some(&metacard))?;

    if let Some(cached) = cache.get_valid(&key, Some(&metacard))? {
        println!(
            "Cache hit: {} ({})",
            key,
            format_size_approx(cached.size_bytes())
        );
        if let Some(output) = &args.output {
            tokio::fs::copy(cached.file_path(), output)
                .await
                .map_err(|error| file_write_error(output, error))?;
            println!("Wrote {}", output.display());
        }
        return Ok(());
    }

    let retriever = Arc::new(HttpRetriever::new(args.url.as_str())?);
    let response = retriever.retrieve_resource().await?;
    info!(url = %args.url, key = %key, "Fetching resource");

    let writer = CachedResourceWriter::new(TransferConfig::from(config));
    let index: Arc<dyn CacheIndex> = cache.clone();
    let mut resource = writer.store(key.as_str(), metacard, response, index, retriever);

    // Without an output file the stream is left in place for wait() to drain.
    if let Some(output) = &args.output {
        if let Some(stream) = resource.input_stream() {
            write_output(stream, output).await?;
        }
    }

    let outcome = resource.wait().await?;
    println!("{}", describe_outcome(&outcome));

    if let Some(output) = &args.output {
        println!("Wrote {}", output.display());
    }
    Ok(())
}

/// One-line summary of how a transfer ended.
fn describe_outcome(outcome: &TransferOutcome) -> String {
    match outcome {
        TransferOutcome::Completed(cached) => format!(
            "Cached {} ({})",
            cached.key(),
            format_size_approx(cached.size_bytes())
        ),
        TransferOutcome::Streamed { bytes } => format!(
            "Fetched {} without caching (already cached, being cached by another \
             transfer, or the product file could not be written)",
            format_size_approx(*bytes)
        ),
        TransferOutcome::Cancelled { bytes_delivered } => format!(
            "Transfer abandoned after {}",
            format_size_approx(*bytes_delivered)
        ),
    }
}

async fn write_output(mut stream: ResourceStream, output: &Path) -> Result<(), CliError> {
    let mut file = tokio::fs::File::create(output)
        .await
        .map_err(|error| file_write_error(output, error))?;
    tokio::io::copy(&mut stream, &mut file)
        .await
        .map_err(|error| file_write_error(output, error))?;
    file.flush()
        .await
        .map_err(|error| file_write_error(output, error))
}

fn file_write_error(path: &Path, error: std::io::Error) -> CliError {
    CliError::FileWrite {
        path: path.display().to_string(),
        error,
    }
}
