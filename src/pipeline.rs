use chrono::NaiveDate;
use chrono_tz::Tz;
use tracing::{info, warn};

use crate::dataset::{Catalog, Dataset};
use crate::error::EliaError;
use crate::fetch::{RawRecord, RecordFetcher};
use crate::table::{normalize, Table};
use crate::window::DayWindow;

/// Result of preparing one dataset for a day.
#[derive(Debug)]
pub struct DatasetOutcome {
    pub dataset: Dataset,
    pub dataset_id: String,
    pub result: Result<Table, EliaError>,
}

/// Every dataset of one civil day, each either sliced or failed on its own.
#[derive(Debug)]
pub struct DayData {
    pub window: DayWindow,
    pub outcomes: Vec<DatasetOutcome>,
}

impl DayData {
    /// Every dataset that was prepared, in catalog order.
    pub fn tables(&self) -> impl Iterator<Item = (Dataset, &Table)> + '_ {
        self.outcomes
            .iter()
            .filter_map(|outcome| Some((outcome.dataset, outcome.result.as_ref().ok()?)))
    }

    pub fn table(&self, dataset: Dataset) -> Option<&Table> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.dataset == dataset)
            .and_then(|outcome| outcome.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (Dataset, &EliaError)> + '_ {
        self.outcomes
            .iter()
            .filter_map(|outcome| Some((outcome.dataset, outcome.result.as_ref().err()?)))
    }
}

/// Fetches, normalizes and slices datasets for a civil day in `zone`.
pub struct DayLoader<F> {
    fetcher: F,
    zone: Tz,
}

impl<F: RecordFetcher> DayLoader<F> {
    pub fn new(fetcher: F, zone: Tz) -> Self {
        Self { fetcher, zone }
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Records of the day before `date` followed by those of `date`. The
    /// portal files local midnight of `date` under the previous day.
    pub async fn fetch_raw(
        &self,
        dataset_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<RawRecord>, EliaError> {
        let previous = date
            .pred_opt()
            .ok_or_else(|| EliaError::Config(format!("date {date} is out of range")))?;

        let mut records = self.fetcher.fetch(dataset_id, previous).await?;
        records.extend(self.fetcher.fetch(dataset_id, date).await?);

        Ok(records)
    }

    /// Normalizes already fetched records and cuts out the civil day.
    pub fn prepare(
        &self,
        dataset: Dataset,
        dataset_id: &str,
        window: &DayWindow,
        records: Vec<RawRecord>,
    ) -> Result<Table, EliaError> {
        let table = normalize(dataset_id, records, dataset.required_columns(), self.zone)?;
        Ok(window.slice(&table))
    }

    pub async fn load(
        &self,
        dataset: Dataset,
        dataset_id: &str,
        date: NaiveDate,
    ) -> Result<Table, EliaError> {
        let window = DayWindow::new(date, self.zone)?;
        let records = self.fetch_raw(dataset_id, date).await?;
        self.prepare(dataset, dataset_id, &window, records)
    }

    /// Loads every dataset of `catalog` for `date`.
    ///
    /// A failed fetch aborts the whole call. Validation errors are kept per
    /// dataset so the remaining datasets can still be charted.
    pub async fn load_day(&self, catalog: &Catalog, date: NaiveDate) -> Result<DayData, EliaError> {
        let window = DayWindow::new(date, self.zone)?;

        let mut fetched = Vec::new();
        for (dataset, dataset_id) in catalog.entries() {
            let records = self.fetch_raw(dataset_id, date).await?;
            fetched.push((dataset, dataset_id, records));
        }

        let outcomes = fetched
            .into_iter()
            .map(|(dataset, dataset_id, records)| {
                let result = self.prepare(dataset, dataset_id, &window, records);
                match &result {
                    Ok(table) => info!(dataset = dataset_id, rows = table.len(), "dataset ready"),
                    Err(err) => warn!(dataset = dataset_id, "{} skipped: {}", dataset.title(), err),
                }
                DatasetOutcome {
                    dataset,
                    dataset_id: dataset_id.to_owned(),
                    result,
                }
            })
            .collect();

        Ok(DayData { window, outcomes })
    }
}
