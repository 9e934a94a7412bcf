//! Data layer for the DU speed pipeline.
//!
//! Responsible for extracting run durations from saved HTML reports, reading
//! and writing the intermediate `date;scenario;minutes` table, and running
//! the aggregation stage that feeds the chart layer.

pub mod analysis;
pub mod extractor;
pub mod table;

pub use speed_core as core;
