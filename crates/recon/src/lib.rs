//! `stockrecon-recon` — Vehicle stock reconciliation engine.
//!
//! Pure engine crate: receives pre-parsed tables, returns unified records,
//! derived action lists and report views. No CLI or file IO dependencies.

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod model;
pub mod normalize;
pub mod reconcile;
pub mod summary;
pub mod views;

pub use config::ReconConfig;
pub use engine::{run, ReconInput};
pub use error::ReconError;
pub use extract::{extract, Extraction, SourceSpec};
pub use model::{ReconReport, Table, UnifiedRecord};
pub use normalize::StockId;
pub use views::{report_views, Cell, TableView};
