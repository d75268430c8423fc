//! Seasonal and spatial stacking of Mount St. Helens seismic parameters.
//!
//! Multi-year station exports (RSAM, DSAR, RMS, PGA) are deseasonalized,
//! collapsed across stations, lined up year against year, summarized per
//! year and, optionally, correlated with lava-dome extrusion rates.

pub mod analysis;
pub mod config;
pub mod export;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod stations;

pub use model::{AnalysisError, Result};
