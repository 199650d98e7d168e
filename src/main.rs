mod analyzer;
mod cache;
mod config;
mod confluence;
mod error;
mod export;
mod metrics;
mod models;
mod processor;
mod rate_limit;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{error, info};

use crate::config::Config;
use crate::confluence::ConfluenceClient;
use crate::metrics::Metrics;
use crate::models::{CorpusSummary, ProcessedDocument, QualityReport, RawPage};
use crate::processor::PageProcessor;

#[derive(Parser)]
#[command(
    name = "confluence_rag",
    about = "Extract and process Confluence content for RAG pipelines"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, ValueEnum)]
enum OutputFormat {
    Raw,
    Processed,
    All,
}

impl OutputFormat {
    fn wants_raw(self) -> bool {
        matches!(self, OutputFormat::Raw | OutputFormat::All)
    }
    fn wants_processed(self) -> bool {
        matches!(self, OutputFormat::Processed | OutputFormat::All)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Extract and process every page of a space
    ExtractSpace {
        space_key: String,
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,
        #[arg(long, value_enum, default_value = "all")]
        format: OutputFormat,
    },
    /// Extract and process a single page
    ExtractPage {
        page_id: String,
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,
        #[arg(long, value_enum, default_value = "all")]
        format: OutputFormat,
        /// Skip fetching attachments
        #[arg(long)]
        skip_attachments: bool,
        /// Skip fetching comments
        #[arg(long)]
        skip_comments: bool,
    },
    /// Process page ids (or SPACE_<key> lines) listed in a file
    Batch {
        input_file: PathBuf,
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,
        /// Max items to process (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Recompute summary and quality stats for a processed JSONL file
    Analyze { input: PathBuf },
}

struct App {
    config: Config,
    client: ConfluenceClient,
    processor: Arc<PageProcessor>,
    metrics: Arc<Metrics>,
}

fn build_app() -> anyhow::Result<App> {
    let config = Config::from_env()?;
    let metrics = Arc::new(Metrics::new());
    let client = ConfluenceClient::new(&config).with_metrics(Arc::clone(&metrics));
    let processor =
        Arc::new(PageProcessor::new(config.stage_timeout).with_metrics(Arc::clone(&metrics)));
    Ok(App {
        config,
        client,
        processor,
        metrics,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::ExtractSpace {
            space_key,
            output_dir,
            format,
        } => {
            let app = build_app()?;
            extract_space(&app, &space_key, &output_dir, format).await?;
            report_metrics(&app.metrics);
            Ok(())
        }
        Commands::ExtractPage {
            page_id,
            output_dir,
            format,
            skip_attachments,
            skip_comments,
        } => {
            let app = build_app()?;
            extract_page(
                &app,
                &page_id,
                &output_dir,
                format,
                !skip_attachments,
                !skip_comments,
            )
            .await?;
            report_metrics(&app.metrics);
            Ok(())
        }
        Commands::Batch {
            input_file,
            output_dir,
            limit,
        } => {
            let app = build_app()?;
            batch(&app, &input_file, &output_dir, limit).await?;
            report_metrics(&app.metrics);
            Ok(())
        }
        Commands::Analyze { input } => analyze(&input),
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn extract_space(
    app: &App,
    space_key: &str,
    output_dir: &Path,
    format: OutputFormat,
) -> anyhow::Result<()> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("create {}", output_dir.display()))?;

    let pages = app.client.space_pages(space_key).await?;
    if pages.is_empty() {
        println!("No pages found in space {}.", space_key);
        return Ok(());
    }

    if format.wants_raw() {
        let raw_path = output_dir.join(format!("{}_raw.csv", space_key));
        export::write_raw_csv(&raw_path, &pages)?;
    }

    if format.wants_processed() {
        println!("Processing {} pages...", pages.len());
        let documents =
            process_concurrently(Arc::clone(&app.processor), pages, app.config.concurrency).await;

        export::write_jsonl(
            &output_dir.join(format!("{}_processed.jsonl", space_key)),
            &documents,
        )?;

        let summary = analyzer::summarize(&documents)?;
        let quality = analyzer::analyze_quality(&documents)?;
        export::write_json(
            &output_dir.join(format!("{}_summary.json", space_key)),
            &summary,
        )?;
        export::write_json(
            &output_dir.join(format!("{}_quality.json", space_key)),
            &quality,
        )?;

        print_summary(&summary);
        print_quality(&quality);
    }

    println!("Results saved to {}", output_dir.display());
    Ok(())
}

async fn extract_page(
    app: &App,
    page_id: &str,
    output_dir: &Path,
    format: OutputFormat,
    with_attachments: bool,
    with_comments: bool,
) -> anyhow::Result<()> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("create {}", output_dir.display()))?;

    let mut page = app.client.page(page_id).await?;
    if with_attachments {
        page.attachments = app.client.attachments(page_id).await?;
    }
    if with_comments {
        page.comments = app.client.comments(page_id).await?;
    }

    if format.wants_raw() {
        export::write_json(&output_dir.join(format!("page_{}_raw.json", page_id)), &page)?;
    }

    if format.wants_processed() {
        let document = app.processor.process_page(page).await?;
        export::write_json(
            &output_dir.join(format!("page_{}_processed.json", page_id)),
            &document,
        )?;
        export::write_html(&output_dir.join(format!("page_{}.html", page_id)), &document)?;
        println!(
            "Processed page {}: {} words, {} tables, {} code blocks, {} comments",
            page_id,
            document.content.split_whitespace().count(),
            document.tables.len(),
            document.code_blocks.len(),
            document.comments.len(),
        );
    }

    println!("Results saved to {}", output_dir.display());
    Ok(())
}

#[derive(Serialize)]
struct BatchItemOutcome {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    timestamp: String,
}

#[derive(Serialize)]
struct BatchResults {
    successful: Vec<BatchItemOutcome>,
    failed: Vec<BatchItemOutcome>,
    start_time: String,
    finished_at: String,
}

async fn batch(
    app: &App,
    input_file: &Path,
    output_dir: &Path,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("create {}", output_dir.display()))?;

    let raw = std::fs::read_to_string(input_file)
        .with_context(|| format!("read {}", input_file.display()))?;
    let mut items: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect();
    if let Some(limit) = limit {
        items.truncate(limit);
    }
    if items.is_empty() {
        println!("Nothing to process in {}.", input_file.display());
        return Ok(());
    }

    let start_time = chrono::Utc::now().to_rfc3339();
    let mut successful = Vec::new();
    let mut failed = Vec::new();

    println!("Batch: {} items...", items.len());
    for item in &items {
        let outcome = if let Some(space_key) = item.strip_prefix("SPACE_") {
            process_space_to_dir(app, space_key, output_dir)
                .await
                .map(|_| ())
        } else {
            process_page_to_dir(app, item, output_dir).await
        };
        let timestamp = chrono::Utc::now().to_rfc3339();
        match outcome {
            Ok(()) => successful.push(BatchItemOutcome {
                id: item.clone(),
                error: None,
                timestamp,
            }),
            Err(e) => {
                error!("Batch item {} failed: {}", item, e);
                failed.push(BatchItemOutcome {
                    id: item.clone(),
                    error: Some(e.to_string()),
                    timestamp,
                });
            }
        }
    }

    let results = BatchResults {
        successful,
        failed,
        start_time,
        finished_at: chrono::Utc::now().to_rfc3339(),
    };
    export::write_json(&output_dir.join("batch_results.json"), &results)?;
    println!(
        "Batch done: {} ok, {} failed. Results saved to {}",
        results.successful.len(),
        results.failed.len(),
        output_dir.display()
    );
    Ok(())
}

/// Fetch, process, and export one space; used by the batch command.
async fn process_space_to_dir(
    app: &App,
    space_key: &str,
    output_dir: &Path,
) -> anyhow::Result<usize> {
    let pages = app.client.space_pages(space_key).await?;
    let total = pages.len();
    let documents =
        process_concurrently(Arc::clone(&app.processor), pages, app.config.concurrency).await;
    export::write_jsonl(
        &output_dir.join(format!("{}_processed.jsonl", space_key)),
        &documents,
    )?;
    Ok(total)
}

/// Fetch, process, and export one page; used by the batch command.
async fn process_page_to_dir(app: &App, page_id: &str, output_dir: &Path) -> anyhow::Result<()> {
    let mut page = app.client.page(page_id).await?;
    page.attachments = app.client.attachments(page_id).await?;
    page.comments = app.client.comments(page_id).await?;
    let document = app.processor.process_page(page).await?;
    export::write_json(
        &output_dir.join(format!("page_{}_processed.json", page_id)),
        &document,
    )?;
    Ok(())
}

fn analyze(input: &Path) -> anyhow::Result<()> {
    let documents = export::read_jsonl(input)?;
    let summary = analyzer::summarize(&documents)?;
    let quality = analyzer::analyze_quality(&documents)?;
    print_summary(&summary);
    print_quality(&quality);
    Ok(())
}

/// Process pages concurrently under a semaphore, streaming results back as
/// they finish. Pages whose processing fails are logged and dropped; the
/// returned order is completion order, not input order.
async fn process_concurrently(
    processor: Arc<PageProcessor>,
    pages: Vec<RawPage>,
    concurrency: usize,
) -> Vec<ProcessedDocument> {
    let total = pages.len();
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
            .unwrap()
            .progress_chars("=> "),
    );

    let concurrency = concurrency.max(1);
    let semaphore = Arc::new(tokio::sync::Semaphore::new(concurrency));
    let (tx, mut rx) = tokio::sync::mpsc::channel::<
        Result<ProcessedDocument, (String, error::Error)>,
    >(concurrency * 2);

    for page in pages {
        let processor = Arc::clone(&processor);
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();
        tokio::spawn(async move {
            let _permit = sem.acquire().await.unwrap();
            let page_id = if page.id.is_empty() {
                "unknown".to_string()
            } else {
                page.id.clone()
            };
            let result = processor.process_page(page).await.map_err(|e| (page_id, e));
            let _ = tx.send(result).await;
        });
    }

    // Drop our copy of tx so rx closes when all spawned tasks finish
    drop(tx);

    let mut documents = Vec::with_capacity(total);
    while let Some(result) = rx.recv().await {
        match result {
            Ok(document) => documents.push(document),
            Err((page_id, e)) => error!("Failed to process page {}: {}", page_id, e),
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    documents
}

fn print_summary(summary: &CorpusSummary) {
    println!("Pages:       {}", summary.total_pages);
    println!(
        "Words:       {} ({:.2}/page)",
        summary.total_words, summary.averages.words_per_page
    );
    println!(
        "Tables:      {} ({:.2}/page)",
        summary.total_tables, summary.averages.tables_per_page
    );
    println!(
        "Code blocks: {} ({:.2}/page)",
        summary.total_code_blocks, summary.averages.code_blocks_per_page
    );
    println!(
        "Comments:    {} ({:.2}/page)",
        summary.total_comments, summary.averages.comments_per_page
    );
    if let Some(range) = &summary.date_range {
        println!(
            "Date range:  {} .. {}",
            range.oldest_page, range.newest_page
        );
    }
}

fn print_quality(quality: &QualityReport) {
    let a = &quality.averages;
    let r = &quality.ranges;
    println!(
        "Readability:           {:>5.1} (range {:.1}..{:.1})",
        a.readability, r.readability.0, r.readability.1
    );
    println!(
        "Content completeness:  {:>5.1} (range {:.1}..{:.1})",
        a.content_completeness, r.content_completeness.0, r.content_completeness.1
    );
    println!(
        "Metadata completeness: {:>5.1} (range {:.1}..{:.1})",
        a.metadata_completeness, r.metadata_completeness.0, r.metadata_completeness.1
    );
    println!(
        "Formatting quality:    {:>5.1} (range {:.1}..{:.1})",
        a.formatting_quality, r.formatting_quality.0, r.formatting_quality.1
    );
    println!("Overall quality score: {:>5.1}", quality.quality_score);
}

fn report_metrics(metrics: &Metrics) {
    for line in metrics.snapshot() {
        info!("{}", line);
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
