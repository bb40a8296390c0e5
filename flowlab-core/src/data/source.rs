//! Input discovery: which files in the drop directory are daily exports,
//! and which trade date each one carries.
//!
//! Naming convention: `{prefix}{YYYYMMDD}.{ext}`, e.g. `re20241009.xls`.

use chrono::NaiveDate;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A candidate daily export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// File name, used in per-file log lines.
    pub name: String,
    /// File name without extension.
    pub stem: String,
}

impl SourceFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, name, stem }
    }
}

/// List files in `dir` whose extension is one of `extensions` (case-insensitive),
/// sorted by file name.
pub fn discover_sources(dir: &Path, extensions: &[String]) -> io::Result<Vec<SourceFile>> {
    let mut sources = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
            .unwrap_or(false);
        if matches {
            sources.push(SourceFile::from_path(path));
        }
    }
    sources.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(sources)
}

/// Derive the trade date from a file stem such as `re20241009`.
///
/// The prefix is optional; what remains must be exactly eight digits.
pub fn trade_date_from_stem(stem: &str, prefix: &str) -> Option<NaiveDate> {
    let token = stem.strip_prefix(prefix).unwrap_or(stem);
    if token.len() != 8 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(token, "%Y%m%d").ok()
}
