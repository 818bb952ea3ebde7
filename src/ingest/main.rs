//! Catalog ingest pipeline.
//!
//! Reads catalog rows from CSV, computes each record's stored geohash once,
//! and bulk-indexes the records into Elasticsearch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::builder::TypedValueParser;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use nearby::catalog::load_records;
use nearby::elasticsearch::{ensure_index, BulkIndexer, EsClient};
use nearby::geohash::{DEFAULT_PRECISION, MAX_PRECISION};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "ingest")]
#[command(about = "Ingest catalog CSV data into Elasticsearch")]
struct Args {
    /// Catalog CSV file (optionally .gz)
    #[arg(short, long)]
    file: PathBuf,

    /// Elasticsearch URL
    #[arg(long, default_value = "http://localhost:9200")]
    es_url: String,

    /// Elasticsearch index name
    #[arg(long, default_value = "food_recommendations")]
    index: String,

    /// Drop and recreate the index before import
    #[arg(long)]
    recreate_index: bool,

    /// Batch size for bulk indexing
    #[arg(long, default_value = "5000")]
    batch_size: usize,

    /// Geohash precision for records that lack a stored key
    #[arg(long, default_value_t = DEFAULT_PRECISION,
          value_parser = clap::value_parser!(u8).range(1..=MAX_PRECISION as i64).map(usize::from))]
    precision: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Nearby Catalog Ingest");
    info!("File: {}", args.file.display());

    let es_client = EsClient::connect(&args.es_url, &args.index)
        .await
        .context("Failed to connect to Elasticsearch")?;
    ensure_index(&es_client, args.recreate_index).await?;

    let records = load_records(&args.file, args.precision)?;

    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})",
            )?
            .progress_chars("#>-"),
    );

    let mut indexer = BulkIndexer::new(es_client.clone(), args.batch_size);
    for record in records {
        indexer.add(record).await?;
        pb.inc(1);
    }
    pb.finish_with_message("Indexing complete");

    let summary = indexer.finish().await?;
    info!(
        "Indexed {} records ({} rejected)",
        summary.indexed,
        summary.rejected.len()
    );
    if !summary.rejected.is_empty() {
        let ids: Vec<&str> = summary.rejected.iter().map(|r| r.id.as_str()).collect();
        warn!("Rejected record ids: {}", ids.join(", "));
    }

    es_client.refresh().await?;
    info!("Total records in index: {}", es_client.record_count().await?);

    Ok(())
}
