//! Domain layer for the DU speed pipeline.
//!
//! Holds the scenario enumeration, daily record and aggregate types, the
//! pure calculations over them, the pipeline-wide error type and the CLI
//! settings. No file or network I/O happens here.

pub mod calculations;
pub mod error;
pub mod models;
pub mod settings;

pub use error::{Result, SpeedError};
