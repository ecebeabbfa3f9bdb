pub mod config;
pub mod error;
pub mod metric;
pub mod plot;
pub mod stat;
pub mod util;

pub use error::{Error, Result};

/// Label appended after the benchmarks for the per-configuration mean
pub const AVG_LABEL: &str = "Avg";
