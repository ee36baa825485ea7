//! `analyze` command handler.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use brandpulse_core::{load_brands, AppConfig, BrandsFile, BucketWidth, ConfigError};
use brandpulse_sentiment::{
    load_classifier, read_posts, run_pipeline, summarize_brands, summarize_categories,
    write_jsonl, BrandMetricWindow, BrandSummary, CategorySummary, CrisisSignal, PipelineConfig,
};
use serde::Serialize;

#[derive(Debug)]
pub(crate) struct AnalyzeOptions {
    pub posts: PathBuf,
    pub model: PathBuf,
    pub bucket: BucketWidth,
    pub dense: bool,
    pub out: Option<PathBuf>,
    pub summary: bool,
}

/// One line of `analyze` output.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum OutputRecord {
    Window(BrandMetricWindow),
    Crisis(CrisisSignal),
}

/// Run the pipeline over a posts file and write windows then crisis signals
/// as JSON Lines.
///
/// # Errors
///
/// Returns an error if the model cannot be loaded, the brands file is
/// present but invalid, the posts file cannot be read, or output cannot be
/// written.
pub(crate) async fn run_analyze(config: &AppConfig, options: AnalyzeOptions) -> anyhow::Result<()> {
    // No output is possible without a model, so fail before touching input.
    let classifier = load_classifier(&options.model)?;
    let brands = load_tracked_brands(config)?;

    let ingested = read_posts(&options.posts)?;

    let mut pipeline_config = PipelineConfig::from_app_config(config, brands.clone());
    pipeline_config.bucket_width = options.bucket;
    pipeline_config.dense = options.dense;

    let mut output = run_pipeline(classifier, ingested.records, &pipeline_config).await?;
    output.report.skipped.malformed = ingested.malformed;

    let records: Vec<OutputRecord> = output
        .windows
        .iter()
        .cloned()
        .map(OutputRecord::Window)
        .chain(output.crises.iter().cloned().map(OutputRecord::Crisis))
        .collect();

    match &options.out {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            write_jsonl(BufWriter::new(file), &records)?;
        }
        None => write_jsonl(std::io::stdout().lock(), &records)?,
    }

    eprintln!(
        "run {} (model {}): {}",
        output.run_id, output.model_version, output.report
    );
    if output.report.discrepancies > 0 {
        tracing::warn!(
            discrepancies = output.report.discrepancies,
            "metric windows did not reconcile with classified posts"
        );
    }

    if options.summary {
        let summaries = summarize_brands(&output.windows);
        let categories = brands
            .as_ref()
            .map(|b| summarize_categories(&summaries, b))
            .unwrap_or_default();
        // Keep stdout clean for JSON Lines when no output file was given.
        if options.out.is_some() {
            write_summary(&mut std::io::stdout().lock(), &summaries, &categories)?;
        } else {
            write_summary(&mut std::io::stderr().lock(), &summaries, &categories)?;
        }
    }

    Ok(())
}

/// The brands file is optional: when it does not exist every brand is kept.
fn load_tracked_brands(config: &AppConfig) -> anyhow::Result<Option<BrandsFile>> {
    match load_brands(&config.brands_path) {
        Ok(brands) => Ok(Some(brands)),
        Err(ConfigError::BrandsFileIo { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            tracing::warn!(
                path = %config.brands_path.display(),
                "brands file not found; analyzing every brand in the input"
            );
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Render brand and category totals as tables.
pub(crate) fn write_summary(
    out: &mut dyn Write,
    brands: &[BrandSummary],
    categories: &[CategorySummary],
) -> std::io::Result<()> {
    writeln!(
        out,
        "{:<20}{:>9}{:>8}{:>8}{:>8}{:>8}  HEALTH",
        "BRAND", "MENTIONS", "POS", "NEG", "SOV%", "INDEX"
    )?;
    for b in brands {
        writeln!(
            out,
            "{:<20}{:>9}{:>8}{:>8}{:>8.1}{:>8.1}  {}",
            b.brand,
            b.mentions,
            b.counts.positive,
            b.counts.negative,
            b.share_of_voice * 100.0,
            b.health_index,
            b.health
        )?;
    }

    if !categories.is_empty() {
        writeln!(out)?;
        writeln!(
            out,
            "{:<20}{:>9}{:>9}{:>8}  HEALTH",
            "CATEGORY", "BRANDS", "MENTIONS", "INDEX"
        )?;
        for c in categories {
            writeln!(
                out,
                "{:<20}{:>9}{:>9}{:>8.1}  {}",
                c.category.to_string(),
                c.brands,
                c.mentions,
                c.health_index,
                c.health
            )?;
        }
    }
    Ok(())
}
