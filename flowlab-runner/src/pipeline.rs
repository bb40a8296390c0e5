//! Batch pipeline: raw exports in, refreshed ledger artifacts out.
//!
//! One run is strictly sequential:
//! discover → parse each file → load prior ledger → merge → enrich → emit.
//! Bad input files are reported and skipped. Anything that would leave the
//! ledger in doubt (missing source dir, corrupt prior ledger, failed write)
//! aborts before artifacts are replaced.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info, warn};

use flowlab_core::data::{discover_sources, FileOutcome, ParseError, SkipReason, SourceIngestor};
use flowlab_core::domain::EnrichedLedger;
use flowlab_core::indicators::enrich;
use flowlab_core::ledger::{merge, Canonicalizer, Ledger, LedgerError};

use crate::artifacts::{ArtifactManager, ArtifactPaths, LedgerManifest};
use crate::config::{ConfigError, PipelineConfig};
use crate::ledger_store::{read_ledger, StoreError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("source directory {0} does not exist")]
    MissingSourceDir(PathBuf),

    #[error("failed to list {path}: {source}")]
    Discover {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("existing ledger is unusable: {0}")]
    Store(#[from] StoreError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("failed to write artifacts: {0:#}")]
    Artifact(anyhow::Error),
}

/// What happened to one input file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileStatus {
    Parsed { trade_date: NaiveDate, rows: usize },
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub file: String,
    pub status: FileStatus,
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub files: Vec<FileReport>,
    /// Rows contributed by this run's snapshots.
    pub merged_rows: usize,
    /// Prior ledger rows dropped because their date was re-ingested.
    pub replaced_rows: usize,
    /// Dates that did not exist in the prior ledger.
    pub new_dates: Vec<NaiveDate>,
    /// Dates carried by more than one input file in this run.
    pub superseded_dates: Vec<NaiveDate>,
    pub total_rows: usize,
    pub total_dates: usize,
    pub total_entities: usize,
    /// `None` when there was nothing new to write.
    pub artifacts: Option<ArtifactPaths>,
    pub manifest: Option<LedgerManifest>,
}

impl RunReport {
    pub fn parsed_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.status, FileStatus::Parsed { .. }))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.files.len() - self.parsed_count()
    }

    pub fn wrote_artifacts(&self) -> bool {
        self.artifacts.is_some()
    }
}

/// Run the full pipeline once.
pub fn run_pipeline(config: &PipelineConfig) -> Result<RunReport, PipelineError> {
    config.validate()?;
    let windows = config.window_set()?;
    debug!(
        data_dir = %config.data_dir.display(),
        output_dir = %config.output_dir.display(),
        windows = ?windows.as_slice(),
        missing_values = ?config.missing_values,
        "pipeline config"
    );

    if !config.data_dir.is_dir() {
        return Err(PipelineError::MissingSourceDir(config.data_dir.clone()));
    }

    let ledger_path = config.ledger_path();
    let prior = read_ledger(&ledger_path)?.unwrap_or_default();
    debug!(path = %ledger_path.display(), rows = prior.len(), "loaded prior ledger");

    let sources = discover_sources(&config.data_dir, &config.normalized_extensions()).map_err(
        |source| PipelineError::Discover {
            path: config.data_dir.clone(),
            source,
        },
    )?;
    info!(count = sources.len(), dir = %config.data_dir.display(), "discovered input files");

    let ingestor = SourceIngestor::new(config.columns.clone(), config.file_prefix.clone());
    let mut files = Vec::with_capacity(sources.len());
    let mut snapshots = Vec::new();
    let mut seen: BTreeMap<NaiveDate, String> = BTreeMap::new();

    for source in &sources {
        match ingestor.ingest_file(source)? {
            FileOutcome::Parsed(snapshot) => {
                let trade_date = snapshot.trade_date();
                info!(file = %source.name, date = %trade_date, rows = snapshot.len(), "parsed");
                if let Some(earlier) = seen.insert(trade_date, source.name.clone()) {
                    warn!(
                        file = %source.name,
                        replaces = %earlier,
                        date = %trade_date,
                        "two inputs for one trade date, keeping the later file"
                    );
                }
                files.push(FileReport {
                    file: source.name.clone(),
                    status: FileStatus::Parsed {
                        trade_date,
                        rows: snapshot.len(),
                    },
                });
                snapshots.push(snapshot);
            }
            FileOutcome::Skipped(reason) => {
                warn!(file = %source.name, reason = %reason, "skipped");
                files.push(FileReport {
                    file: source.name.clone(),
                    status: FileStatus::Skipped(reason),
                });
            }
        }
    }

    if snapshots.is_empty() {
        info!("no new valid data, ledger left unchanged");
        let dates = prior.dates().len();
        let entities = prior.entities().len();
        return Ok(RunReport {
            files,
            merged_rows: 0,
            replaced_rows: 0,
            new_dates: Vec::new(),
            superseded_dates: Vec::new(),
            total_rows: prior.len(),
            total_dates: dates,
            total_entities: entities,
            artifacts: None,
            manifest: None,
        });
    }

    let prior_dates = prior.dates();
    let outcome = merge(&prior, &snapshots, config.missing_values)?;
    let new_dates: Vec<NaiveDate> = outcome
        .dates
        .iter()
        .copied()
        .filter(|d| !prior_dates.contains(d))
        .collect();
    info!(
        appended = outcome.appended_rows,
        replaced = outcome.replaced_rows,
        new_dates = new_dates.len(),
        total = outcome.ledger.len(),
        "merged snapshots into ledger"
    );

    for anomaly in Canonicalizer::detect_anomalies(outcome.ledger.records()) {
        warn!(kind = ?anomaly.anomaly_type, count = anomaly.count, "ledger anomaly");
    }

    let enriched = enrich(&outcome.ledger, &windows);
    let (paths, manifest) = ArtifactManager::new(&config.output_dir, config.artifacts.clone())
        .and_then(|manager| manager.save_ledger(&enriched))
        .map_err(PipelineError::Artifact)?;
    info!(
        ledger = %paths.ledger_csv.display(),
        hash = %manifest.ledger_hash,
        "artifacts written"
    );

    Ok(RunReport {
        files,
        merged_rows: outcome.appended_rows,
        replaced_rows: outcome.replaced_rows,
        new_dates,
        superseded_dates: outcome.superseded.clone(),
        total_rows: outcome.ledger.len(),
        total_dates: outcome.ledger.dates().len(),
        total_entities: outcome.ledger.entities().len(),
        artifacts: Some(paths),
        manifest: Some(manifest),
    })
}

/// Load the persisted ledger and recompute its indicators.
///
/// `Ok(None)` when no ledger has been written yet.
pub fn load_enriched_ledger(config: &PipelineConfig) -> Result<Option<EnrichedLedger>, PipelineError> {
    let windows = config.window_set()?;
    let Some(ledger) = read_ledger(&config.ledger_path())? else {
        return Ok(None);
    };
    Ok(Some(enrich(&ledger, &windows)))
}

/// Load the persisted ledger without indicators.
pub fn load_ledger(config: &PipelineConfig) -> Result<Option<Ledger>, PipelineError> {
    Ok(read_ledger(&config.ledger_path())?)
}
