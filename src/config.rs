use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::cache::CachePolicy;
use crate::dataset::{Catalog, Dataset};
use crate::error::EliaError;
use crate::fetch::{DEFAULT_API_URL, DEFAULT_ROWS};

pub const DEFAULT_CONFIG_FILE: &str = "elia.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api_url: String,
    pub rows: u32,
    pub timezone: String,
    pub cache_ttl_secs: u64,
    pub cache_max_entries: usize,
    pub output_dir: PathBuf,
    pub chart_width: u32,
    pub chart_height: u32,
    pub cross_border_dataset: String,
}

impl Settings {
    /// Defaults, then `path` (or `elia.toml` if present), then `ELIA_*`
    /// environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, EliaError> {
        let builder = Config::builder()
            .set_default("api_url", DEFAULT_API_URL)?
            .set_default("rows", i64::from(DEFAULT_ROWS))?
            .set_default("timezone", "Europe/Brussels")?
            .set_default("cache_ttl_secs", 900)?
            .set_default("cache_max_entries", 64)?
            .set_default("output_dir", "charts")?
            .set_default("chart_width", 1200)?
            .set_default("chart_height", 400)?
            .set_default(
                "cross_border_dataset",
                Dataset::CrossBorderCapacity.default_id(),
            )?;

        let builder = match path {
            Some(path) => builder.add_source(File::from(path).format(FileFormat::Toml)),
            None => builder
                .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false)),
        };

        let settings = builder
            .add_source(Environment::with_prefix("ELIA"))
            .build()?
            .try_deserialize::<Settings>()?;

        settings.zone()?;
        Ok(settings)
    }

    pub fn zone(&self) -> Result<Tz, EliaError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|err| EliaError::Config(format!("unknown timezone {}: {err}", self.timezone)))
    }

    /// A ttl of zero keeps entries until they are evicted.
    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            ttl: (self.cache_ttl_secs > 0).then(|| Duration::from_secs(self.cache_ttl_secs)),
            max_entries: self.cache_max_entries,
        }
    }

    pub fn catalog(&self) -> Catalog {
        Catalog::with_cross_border_id(self.cross_border_dataset.clone())
    }

    pub fn chart_size(&self) -> (u32, u32) {
        (self.chart_width, self.chart_height)
    }
}
