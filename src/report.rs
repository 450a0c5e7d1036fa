use std::path::Path;

use askama::Template;

use crate::chart::RenderedChart;
use crate::error::EliaError;
use crate::window::DayWindow;

pub const REPORT_TITLE: &str = "Elia Balancing and Imbalance Data (Opendata)";

/// Single HTML page with every chart of a day and the datasets that failed.
#[derive(Template)]
#[template(path = "report.html")]
pub struct Report {
    pub title: String,
    pub date: String,
    pub zone: String,
    pub charts: Vec<RenderedChart>,
    pub warnings: Vec<String>,
}

impl Report {
    pub fn new(window: &DayWindow, charts: Vec<RenderedChart>, warnings: Vec<String>) -> Self {
        Self {
            title: REPORT_TITLE.to_owned(),
            date: window.date().format("%Y-%m-%d").to_string(),
            zone: window.lower().timezone().name().to_owned(),
            charts,
            warnings,
        }
    }

    pub fn write(&self, path: &Path) -> Result<(), EliaError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.render()?)?;
        Ok(())
    }
}
