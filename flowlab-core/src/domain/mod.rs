//! Domain types shared by every pipeline stage.

pub mod enriched;
pub mod record;

pub use enriched::{EnrichedLedger, EnrichedRow};
pub use record::DailyRecord;
