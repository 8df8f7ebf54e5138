//! End-to-end `generate` pipeline: fetch → classify → enrich → build → render → write.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use epicreport_artifacts::{ArtifactMeta, report_file_name, write_artifacts};
use epicreport_fetcher::WorkItemSource;
use epicreport_render::OutputFormat;
use epicreport_shared::{Epic, EpicQuery, ReportError, ReportModel, Result};

use crate::classify::{BucketCounts, classify};
use crate::enrich::enrich;
use crate::report::{ReportMeta, build_report};

/// Configuration for the `generate` pipeline.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    /// Name used in the title and output file names.
    pub project_name: String,
    /// Which epics to fetch.
    pub query: EpicQuery,
    /// Formats to render; must not be empty.
    pub formats: Vec<OutputFormat>,
    /// Directory report files are written to.
    pub output_dir: PathBuf,
}

/// Result of the `generate` pipeline.
#[derive(Debug, Serialize)]
pub struct GenerateResult {
    pub files: Vec<ArtifactMeta>,
    pub counts: BucketCounts,
    /// Non-fatal classification warnings.
    pub warnings: Vec<String>,
    pub generated_at: DateTime<Utc>,
    /// Total elapsed time.
    #[serde(skip)]
    pub elapsed: Duration,
}

/// A report model with the bookkeeping that produced it.
#[derive(Debug)]
pub struct AssembledReport {
    pub model: ReportModel,
    pub counts: BucketCounts,
    pub warnings: Vec<String>,
}

/// Output of the `summary` command: classification only, nothing rendered.
#[derive(Debug, Serialize)]
pub struct Summary {
    pub source: String,
    pub counts: BucketCounts,
    /// `(state, count)` in first-seen order.
    pub states: Vec<(String, usize)>,
    pub warnings: Vec<String>,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once the source returned its epics.
    fn epics_fetched(&self, count: usize);
    /// Called after each report file lands on disk.
    fn file_written(&self, meta: &ArtifactMeta);
    /// Called when the pipeline completes.
    fn done(&self, result: &GenerateResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn epics_fetched(&self, _count: usize) {}
    fn file_written(&self, _meta: &ArtifactMeta) {}
    fn done(&self, _result: &GenerateResult) {}
}

/// Classify, enrich and build. Pure apart from tracing.
pub fn assemble(epics: Vec<Epic>, meta: &ReportMeta) -> AssembledReport {
    let classification = classify(epics);
    let warnings = classification.warnings.clone();
    let enriched = enrich(classification);
    let model = build_report(&enriched, meta);

    AssembledReport {
        model,
        counts: enriched.counts,
        warnings,
    }
}

/// Run the full `generate` pipeline.
///
/// A failed fetch aborts before anything is rendered. Every format is
/// rendered in memory before the first file is written.
#[instrument(skip_all, fields(project = %config.project_name, formats = config.formats.len()))]
pub async fn generate_report<S: WorkItemSource>(
    source: &S,
    config: &GenerateConfig,
    progress: &dyn ProgressReporter,
) -> Result<GenerateResult> {
    let start = Instant::now();

    if config.formats.is_empty() {
        return Err(ReportError::validation("no output format selected"));
    }

    // --- Phase 1: Fetch ---
    progress.phase("Fetching epics");
    let epics = source.fetch_epics(&config.query).await?;
    progress.epics_fetched(epics.len());
    info!(count = epics.len(), source = %source.describe(), "epics fetched");

    // --- Phase 2: Classify, enrich, build ---
    progress.phase("Building report");
    let generated_at = Utc::now();
    let meta = ReportMeta {
        project_name: config.project_name.clone(),
        source: source.describe(),
        query: config.query.clone(),
        generated_at,
    };
    let assembled = assemble(epics, &meta);
    for warning in &assembled.warnings {
        warn!(%warning, "classification warning");
    }

    // --- Phase 3: Render ---
    progress.phase("Rendering");
    let mut files = Vec::with_capacity(config.formats.len());
    for format in &config.formats {
        let bytes = epicreport_render::render(&assembled.model, *format)?;
        let name = report_file_name(&config.project_name, generated_at, format.extension());
        files.push((name, bytes));
    }

    // --- Phase 4: Write ---
    progress.phase("Writing report files");
    let written = write_artifacts(&config.output_dir, &files)?;
    for meta in &written {
        progress.file_written(meta);
    }

    let result = GenerateResult {
        files: written,
        counts: assembled.counts,
        warnings: assembled.warnings,
        generated_at,
        elapsed: start.elapsed(),
    };

    info!(
        files = result.files.len(),
        epics = result.counts.total,
        elapsed_ms = result.elapsed.as_millis(),
        "report generated"
    );
    progress.done(&result);

    Ok(result)
}

/// Fetch and classify without rendering anything.
#[instrument(skip_all, fields(area = %query.area_path))]
pub async fn summarize<S: WorkItemSource>(source: &S, query: &EpicQuery) -> Result<Summary> {
    let epics = source.fetch_epics(query).await?;
    let classification = classify(epics);

    Ok(Summary {
        source: source.describe(),
        counts: classification.counts(),
        states: classification.state_distribution(),
        warnings: classification.warnings,
    })
}
