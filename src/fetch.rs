use std::future::Future;

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::EliaError;

/// One flat record as returned by the API, keyed by field name.
pub type RawRecord = Map<String, Value>;

pub const DEFAULT_API_URL: &str = "https://opendata.elia.be";
pub const DEFAULT_ROWS: u32 = 1000;

/// Source of raw records for a `(dataset, date)` pair.
pub trait RecordFetcher {
    fn fetch(
        &self,
        dataset_id: &str,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Vec<RawRecord>, EliaError>> + Send;
}

#[derive(Deserialize)]
struct SearchRecord {
    fields: Option<RawRecord>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    records: Vec<SearchRecord>,
}

/// Client for the records search endpoint of the Elia open-data portal.
#[derive(Debug, Clone)]
pub struct EliaClient {
    client: reqwest::Client,
    base_url: String,
    rows: u32,
}

impl Default for EliaClient {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl EliaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            rows: DEFAULT_ROWS,
        }
    }

    /// Sets the maximum number of records requested per call.
    pub fn with_rows(mut self, rows: u32) -> Self {
        self.rows = rows;
        self
    }

    fn search_url(&self) -> String {
        format!(
            "{}/api/records/1.0/search/",
            self.base_url.trim_end_matches('/')
        )
    }
}

impl RecordFetcher for EliaClient {
    async fn fetch(&self, dataset_id: &str, date: NaiveDate) -> Result<Vec<RawRecord>, EliaError> {
        let query_params = [
            ("dataset", dataset_id.to_owned()),
            ("rows", self.rows.to_string()),
            ("refine.datetime", date.format("%Y-%m-%d").to_string()),
        ];

        debug!(dataset = dataset_id, %date, "requesting records");

        let response = self
            .client
            .get(self.search_url())
            .query(&query_params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EliaError::Status {
                dataset: dataset_id.to_owned(),
                status,
            });
        }

        let text = response.text().await?;
        let body = serde_json::from_str::<SearchResponse>(&text).map_err(|e| {
            EliaError::UnsupportedResponse(format!("decoding {dataset_id} records failed: {e}"))
        })?;

        Ok(body
            .records
            .into_iter()
            .filter_map(|record| record.fields)
            .collect())
    }
}
