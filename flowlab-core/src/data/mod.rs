//! Raw export ingestion

pub mod decode;
pub mod ingest;
pub mod schema;
pub mod source;
pub mod table;

pub use ingest::{FileOutcome, ParseError, SkipReason, SourceIngestor};
pub use schema::{LedgerSchema, SchemaError};
pub use source::{discover_sources, trade_date_from_stem, SourceFile};
pub use table::{ColumnMapping, RawRow, RawTable};
