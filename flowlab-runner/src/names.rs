//! Display names for entity ids.
//!
//! The map is a convenience for people reading reports; a bad map file never
//! stops a run, it just falls back to raw ids.

use std::collections::HashMap;
use std::path::Path;

use tracing::warn;

const SOURCE_COLUMN: &str = "영문명";
const DISPLAY_COLUMN: &str = "한글명";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NameMap {
    names: HashMap<String, String>,
}

impl NameMap {
    /// Load a `영문명,한글명` CSV. Any failure yields an empty map and a warning.
    pub fn load_or_identity(path: &Path) -> Self {
        match std::fs::read(path) {
            Ok(bytes) => match Self::from_csv(&bytes) {
                Ok(map) => map,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "name map unusable, showing raw ids");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "name map unreadable, showing raw ids");
                Self::default()
            }
        }
    }

    pub fn from_csv(bytes: &[u8]) -> Result<Self, NameMapError> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);
        let header: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let find = |name: &str| {
            header
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| NameMapError::MissingColumn(name.to_string()))
        };
        let source = find(SOURCE_COLUMN)?;
        let display = find(DISPLAY_COLUMN)?;

        let mut names = HashMap::new();
        for record in reader.records() {
            let record = record?;
            let (Some(id), Some(name)) = (record.get(source), record.get(display)) else {
                continue;
            };
            let (id, name) = (id.trim(), name.trim());
            if !id.is_empty() && !name.is_empty() {
                names.insert(id.to_string(), name.to_string());
            }
        }
        Ok(Self { names })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// `"{name} ({id})"` when mapped, else the id itself.
    pub fn display(&self, entity_id: &str) -> String {
        match self.names.get(entity_id) {
            Some(name) => format!("{name} ({entity_id})"),
            None => entity_id.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NameMapError {
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing column {0}")]
    MissingColumn(String),
}
