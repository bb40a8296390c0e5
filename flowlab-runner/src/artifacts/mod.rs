//! Artifact manager for persisting the enriched ledger and its derivatives.
//!
//! Every artifact is staged as a `*.tmp` sibling first. Only once all of them
//! are staged are they renamed into place, so a failure while rendering or
//! staging leaves the previous artifacts untouched.

mod manifest;
mod parquet;
mod summary;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use flowlab_core::domain::EnrichedLedger;

use crate::config::ArtifactNames;
use crate::ledger_store::encode_ledger_csv;

pub use manifest::{render_manifest, LedgerManifest, SCHEMA_VERSION};
pub use parquet::{ledger_dataframe, write_ledger_parquet};
pub use summary::{render_entity_list, render_summary_csv};

/// Artifact paths returned after export.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPaths {
    pub ledger_csv: PathBuf,
    pub summary_csv: PathBuf,
    pub entities_txt: PathBuf,
    pub manifest_json: PathBuf,
    pub ledger_parquet: Option<PathBuf>,
}

/// Manages writing all artifacts for a ledger.
#[derive(Debug, Clone)]
pub struct ArtifactManager {
    output_dir: PathBuf,
    names: ArtifactNames,
}

impl ArtifactManager {
    pub fn new(output_dir: impl AsRef<Path>, names: ArtifactNames) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir)
            .context("Failed to create artifact output directory")?;
        Ok(Self { output_dir, names })
    }

    pub fn paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            ledger_csv: self.output_dir.join(&self.names.ledger),
            summary_csv: self.output_dir.join(&self.names.summary),
            entities_txt: self.output_dir.join(&self.names.entities),
            manifest_json: self.output_dir.join(&self.names.manifest),
            ledger_parquet: self.names.parquet.as_ref().map(|p| self.output_dir.join(p)),
        }
    }

    /// Write every artifact for `ledger`, replacing the previous set.
    pub fn save_ledger(&self, ledger: &EnrichedLedger) -> Result<(ArtifactPaths, LedgerManifest)> {
        let paths = self.paths();
        let records = || ledger.rows().iter().map(|r| &r.record);

        let ledger_csv = encode_ledger_csv(ledger).context("Failed to encode ledger CSV")?;
        let manifest = LedgerManifest::describe(ledger, &ledger_csv);
        let rendered = [
            (&paths.ledger_csv, ledger_csv),
            (&paths.summary_csv, render_summary_csv(records())?),
            (&paths.entities_txt, render_entity_list(records())),
            (&paths.manifest_json, render_manifest(&manifest)?),
        ];

        let mut staged: Vec<(PathBuf, &Path)> = Vec::new();
        let result = (|| -> Result<()> {
            for (target, bytes) in &rendered {
                let tmp = tmp_path(target);
                std::fs::write(&tmp, bytes)
                    .with_context(|| format!("Failed to stage {}", tmp.display()))?;
                staged.push((tmp, target.as_path()));
            }
            if let Some(target) = &paths.ledger_parquet {
                let tmp = tmp_path(target);
                staged.push((tmp.clone(), target.as_path()));
                write_ledger_parquet(&tmp, ledger)?;
            }
            Ok(())
        })();

        if let Err(e) = result {
            for (tmp, _) in &staged {
                let _ = std::fs::remove_file(tmp);
            }
            return Err(e);
        }

        for (tmp, target) in &staged {
            std::fs::rename(tmp, target)
                .with_context(|| format!("Failed to move {} into place", target.display()))?;
        }

        Ok((paths.clone(), manifest))
    }
}

fn tmp_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}
