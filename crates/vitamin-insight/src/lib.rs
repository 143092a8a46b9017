//! Mock vitamin deficiency analysis: a static nutrient catalog, pluggable
//! confidence scoring, an illustrative edge heatmap, and report assembly.

pub mod analysis;
pub mod catalog;
pub mod config;
pub mod error;
pub mod report;
pub mod scoring;
pub mod telemetry;
pub mod visual;
