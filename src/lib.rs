//! Elia open-data balancing datasets for one civil day.
//!
//! Records of the previous and the target day are fetched per dataset,
//! normalized into a [`Table`] in the reference timezone and cut down to the
//! civil day `[D 00:00, D+1 00:00]` before they are charted.

pub mod cache;
pub mod chart;
pub mod config;
pub mod dataset;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod report;
pub mod table;
pub mod window;

#[cfg(test)]
mod testing;

pub use cache::{CachePolicy, CachedFetcher};
pub use chart::{render_day, ChartRenderer, ChartSpec, RenderedChart, SvgRenderer, CHARTS};
pub use self::config::Settings;
pub use dataset::{Catalog, Dataset};
pub use error::EliaError;
pub use fetch::{EliaClient, RawRecord, RecordFetcher};
pub use pipeline::{DatasetOutcome, DayData, DayLoader};
pub use report::Report;
pub use table::{normalize, Row, Table};
pub use window::{slice_day, DayWindow};
