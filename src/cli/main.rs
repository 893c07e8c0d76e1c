//! Mammal track dataset CLI
//!
//! Command-line interface over the collection, transcoding, and curation
//! pipeline stages.

use super::config::CliConfigBuilder;
use crate::{
    collector::{collect_from_source, DedupCollector},
    config::{CurationOptions, PipelineConfig},
    dataset::{Dataset, MergeInputs},
    fetch::{FetchImage, ImageFetcher},
    footprint::EdgeFilterOptions,
    progress::ProgressIndicator,
    review::{ConsoleReviewer, CurationSession},
    sources::{
        download_candidates, GalleryConfig, GallerySource, ImageSource, ObservationConfig,
        ObservationSource, SearchApiConfig, SearchApiSource, StaticPageSession,
    },
    tracing_config::init_cli_tracing,
    transcode::transcode_dataset,
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Mammal track photo dataset tool
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "trackset")]
pub struct Cli {
    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Arguments shared by the network-facing subcommands
#[derive(Args, Debug)]
pub struct PipelineArgs {
    /// Dataset CSV that collectors append to
    #[arg(long, value_name = "CSV", default_value = "tracks.csv")]
    pub dataset: PathBuf,

    /// Root directory for saved images
    #[arg(long, value_name = "DIR", default_value = "images")]
    pub images_dir: PathBuf,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,

    /// Attempts per failed network call
    #[arg(long, default_value_t = 3)]
    pub retries: u32,

    /// Cap on candidate images collected per animal
    #[arg(long, default_value_t = 20)]
    pub max_images: usize,

    /// Override the HTTP user agent
    #[arg(long, value_name = "UA")]
    pub user_agent: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Collect candidate URLs from the image search API, one run per animal
    Search {
        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Search API key
        #[arg(long, value_name = "KEY")]
        api_key: String,

        /// Search engine id
        #[arg(long, value_name = "CX")]
        cx: String,

        /// Screen candidates with the footprint edge heuristic
        #[arg(long)]
        edge_filter: bool,

        /// Animal names to search for
        #[arg(value_name = "ANIMAL", required = true)]
        animals: Vec<String>,
    },

    /// Collect labeled candidates from a tracking-guide photo gallery
    Gallery {
        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Gallery page URL
        #[arg(long, value_name = "URL")]
        url: Option<String>,

        /// Also download the gallery images into this directory
        #[arg(long, value_name = "DIR")]
        download_dir: Option<PathBuf>,
    },

    /// Collect candidates from the paginated observation site
    Observations {
        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Free-text query
        #[arg(long, default_value = "track")]
        query: String,

        /// Taxon filter
        #[arg(long, default_value = "Mammalia")]
        taxa: String,

        /// Upper bound on result pages fetched
        #[arg(long, default_value_t = 20)]
        max_pages: usize,
    },

    /// Assign sequential row ids to a dataset
    AddId {
        /// Input CSV
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output CSV
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },

    /// Replace every image URL with the base64 of its downloaded bytes
    Encode {
        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Input CSV with an image_url column of URLs
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output CSV with base64 payloads
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Seconds to wait between rows
        #[arg(long, default_value_t = 1)]
        delay: u64,
    },

    /// Interactively review an encoded dataset and keep the accepted rows
    Review {
        /// Input CSV with base64 payloads
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Where to write the filtered CSV of accepted rows
        #[arg(short, long, value_name = "CSV")]
        output: Option<PathBuf>,

        /// Root of the image tree written for accepted rows
        #[arg(long, value_name = "DIR", default_value = "images")]
        images_dir: PathBuf,
    },

    /// Merge image references from several source shapes into one dataset
    Merge {
        /// A label-partitioned directory tree: <root>/<label>/<image>
        #[arg(long, value_name = "DIR")]
        label_tree: Option<PathBuf>,

        /// A flat directory of <page>_<n>_<label>.jpg files
        #[arg(long, value_name = "DIR")]
        flat_dir: Option<PathBuf>,

        /// An existing CSV with animal and image_url columns
        #[arg(long, value_name = "CSV")]
        csv: Option<PathBuf>,

        /// Output CSV
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },
}

/// CLI entry point
pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_cli_tracing(cli.verbose).map_err(|e| anyhow::anyhow!("{}", e))?;

    match cli.command {
        Command::Search {
            pipeline,
            api_key,
            cx,
            edge_filter,
            animals,
        } => run_search(&pipeline, api_key, cx, edge_filter, &animals).await,
        Command::Gallery {
            pipeline,
            url,
            download_dir,
        } => run_gallery(&pipeline, url, download_dir.as_deref()).await,
        Command::Observations {
            pipeline,
            query,
            taxa,
            max_pages,
        } => run_observations(&pipeline, query, taxa, max_pages).await,
        Command::AddId { input, output } => run_add_id(&input, &output),
        Command::Encode {
            pipeline,
            input,
            output,
            delay,
        } => run_encode(&pipeline, &input, &output, delay).await,
        Command::Review {
            input,
            output,
            images_dir,
        } => run_review(&input, output, images_dir),
        Command::Merge {
            label_tree,
            flat_dir,
            csv,
            output,
        } => run_merge(
            label_tree.as_deref(),
            flat_dir.as_deref(),
            csv.as_deref(),
            &output,
        ),
    }
}

fn build_pipeline(args: &PipelineArgs) -> Result<(PipelineConfig, ImageFetcher)> {
    let config = CliConfigBuilder::from_args(args)?;
    let fetcher = ImageFetcher::new(&config).context("Failed to create HTTP client")?;
    Ok((config, fetcher))
}

async fn run_search(
    args: &PipelineArgs,
    api_key: String,
    cx: String,
    edge_filter: bool,
    animals: &[String],
) -> Result<()> {
    let (config, fetcher) = build_pipeline(args)?;
    let mut collector = DedupCollector::load(&config.dataset_csv)
        .context("Failed to load the destination dataset")?;

    let mut search_config = SearchApiConfig::new(api_key, cx);
    search_config.max_images = config.max_images_per_label;

    let edge_options = EdgeFilterOptions::default();
    let mut total = 0usize;

    for animal in animals {
        let mut source = SearchApiSource::new(search_config.clone(), fetcher.clone(), animal.as_str());
        let screening = edge_filter.then_some((&fetcher as &dyn FetchImage, &edge_options));
        let appended = collect_from_source(&mut source, &mut collector, screening)
            .await
            .with_context(|| format!("Search collection failed for '{}'", animal))?;
        info!(animal = %animal, appended, "Search collection done");
        total += appended;
    }

    println!(
        "Appended {} new rows to {}",
        total,
        config.dataset_csv.display()
    );
    Ok(())
}

async fn run_gallery(
    args: &PipelineArgs,
    url: Option<String>,
    download_dir: Option<&std::path::Path>,
) -> Result<()> {
    let (config, fetcher) = build_pipeline(args)?;

    let mut gallery_config = GalleryConfig::default();
    if let Some(url) = url {
        gallery_config.url = url;
    }

    let mut source = GallerySource::new(gallery_config, StaticPageSession::new(fetcher.clone()));

    // Drain the source once so the same candidates can feed both the dataset
    // and the optional bulk download.
    let mut candidates = Vec::new();
    while let Some(batch) = source
        .next_page()
        .await
        .context("Gallery collection failed")?
    {
        candidates.extend(batch);
    }

    let mut collector = DedupCollector::load(&config.dataset_csv)
        .context("Failed to load the destination dataset")?;
    for candidate in &candidates {
        collector.push(candidate.clone());
    }
    let appended = collector.commit().context("Failed to append gallery rows")?;
    println!(
        "Appended {} new rows to {}",
        appended,
        config.dataset_csv.display()
    );

    if let Some(dir) = download_dir {
        let saved = download_candidates(&fetcher, &candidates, dir, config.download_delay)
            .await
            .context("Gallery download failed")?;
        println!("Downloaded {} images into {}", saved, dir.display());
    }

    Ok(())
}

async fn run_observations(
    args: &PipelineArgs,
    query: String,
    taxa: String,
    max_pages: usize,
) -> Result<()> {
    let (config, fetcher) = build_pipeline(args)?;

    let observation_config = ObservationConfig {
        query,
        iconic_taxa: taxa,
        max_pages,
        ..ObservationConfig::default()
    };

    let mut source =
        ObservationSource::new(observation_config, StaticPageSession::new(fetcher));
    let mut collector = DedupCollector::load(&config.dataset_csv)
        .context("Failed to load the destination dataset")?;

    let appended = collect_from_source(&mut source, &mut collector, None)
        .await
        .context("Observation collection failed")?;
    println!(
        "Appended {} new rows to {}",
        appended,
        config.dataset_csv.display()
    );
    Ok(())
}

fn run_add_id(input: &std::path::Path, output: &std::path::Path) -> Result<()> {
    let dataset = Dataset::read_from_path(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let with_ids = dataset.with_assigned_ids();
    with_ids
        .write_to_path(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Wrote {} rows to {}", with_ids.len(), output.display());
    Ok(())
}

async fn run_encode(
    args: &PipelineArgs,
    input: &std::path::Path,
    output: &std::path::Path,
    delay: u64,
) -> Result<()> {
    let (_, fetcher) = build_pipeline(args)?;

    let dataset = Dataset::read_from_path(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let progress = ProgressIndicator::batch_bar(dataset.len() as u64);

    let report = transcode_dataset(
        &dataset,
        output,
        &fetcher,
        Duration::from_secs(delay),
        &progress,
    )
    .await
    .context("Transcoding failed")?;

    println!(
        "Encoded {}/{} rows ({} unresolved, {} skipped) into {}",
        report.encoded,
        report.total,
        report.unresolved,
        report.skipped,
        output.display()
    );
    Ok(())
}

fn run_review(
    input: &std::path::Path,
    output: Option<PathBuf>,
    images_dir: PathBuf,
) -> Result<()> {
    let session = CurationSession::new(CurationOptions {
        output_csv: output,
        images_dir,
    });
    let mut reviewer = ConsoleReviewer::new().context("Failed to set up the console reviewer")?;
    let outcome = session
        .run(input, &mut reviewer)
        .context("Review session failed")?;

    println!(
        "Reviewed {} rows: {} accepted, {} rejected, {} auto-rejected, {} images saved",
        outcome.total,
        outcome.accepted,
        outcome.rejected,
        outcome.auto_rejected,
        outcome.images_saved
    );
    if outcome.save_failures > 0 {
        println!("{} accepted images could not be saved", outcome.save_failures);
    }
    Ok(())
}

fn run_merge(
    label_tree: Option<&std::path::Path>,
    flat_dir: Option<&std::path::Path>,
    csv: Option<&std::path::Path>,
    output: &std::path::Path,
) -> Result<()> {
    if label_tree.is_none() && flat_dir.is_none() && csv.is_none() {
        anyhow::bail!("Nothing to merge: pass --label-tree, --flat-dir, or --csv");
    }

    let merged = crate::dataset::merge_sources(&MergeInputs {
        label_tree,
        flat_dir,
        csv,
    })
    .context("Merge failed")?;
    merged
        .write_to_path(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Wrote {} rows to {}", merged.len(), output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_search() {
        let cli = Cli::parse_from([
            "trackset", "search", "--api-key", "k", "--cx", "c", "lynx", "fox",
        ]);
        match cli.command {
            Command::Search { animals, edge_filter, .. } => {
                assert_eq!(animals, vec!["lynx".to_string(), "fox".to_string()]);
                assert!(!edge_filter);
            },
            _ => panic!("expected search subcommand"),
        }
    }

    #[test]
    fn test_cli_parses_verbosity() {
        let cli = Cli::parse_from(["trackset", "-vv", "add-id", "in.csv", "out.csv"]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::AddId { .. }));
    }

    #[test]
    fn test_cli_requires_animals_for_search() {
        let result =
            Cli::try_parse_from(["trackset", "search", "--api-key", "k", "--cx", "c"]);
        assert!(result.is_err());
    }
}
