//! FlowLab Core: parsing, snapshots, the ledger, and indicators.
//!
//! This crate contains the pure part of the trading-flow pipeline:
//! - Raw table parsing from HTML-style exports (any common encoding)
//! - Snapshot building with per-entity aggregation
//! - Ledger accumulation with overwrite-by-date semantics
//! - Rolling-window moving averages over net flow
//! - Coverage summaries and read-only screening queries
//!
//! Nothing here writes files; persistence lives in `flowlab-runner`.

pub mod data;
pub mod domain;
pub mod indicators;
pub mod ledger;
pub mod screen;
pub mod snapshot;
pub mod summary;
