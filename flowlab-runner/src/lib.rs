//! FlowLab Runner: batch orchestration on top of `flowlab-core`.
//!
//! This crate provides:
//! - TOML pipeline configuration
//! - Ledger persistence (load the previous run, encode the next)
//! - Staged, all-or-nothing artifact emission (CSV, text, JSON, Parquet)
//! - The end-to-end ingest run with per-file reporting
//! - Display-name mapping for reports

pub mod artifacts;
pub mod config;
pub mod ledger_store;
pub mod names;
pub mod pipeline;

pub use artifacts::{ArtifactManager, ArtifactPaths, LedgerManifest};
pub use config::{ArtifactNames, ConfigError, PipelineConfig};
pub use ledger_store::{encode_ledger_csv, parse_ledger, read_ledger, StoreError};
pub use names::{NameMap, NameMapError};
pub use pipeline::{
    load_enriched_ledger, load_ledger, run_pipeline, FileReport, FileStatus, PipelineError,
    RunReport,
};
