//! Test doubles shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use serde_json::{json, Value};

use crate::error::EliaError;
use crate::fetch::{RawRecord, RecordFetcher};

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub(crate) fn record(datetime: &str, fields: &[(&str, Value)]) -> RawRecord {
    let mut record = RawRecord::new();
    record.insert("datetime".to_owned(), json!(datetime));
    for (key, value) in fields {
        record.insert((*key).to_owned(), value.clone());
    }
    record
}

/// One record per UTC hour of `date`, the way the portal labels a day.
pub(crate) fn hourly_records(date: NaiveDate, fields: &[(&str, Value)]) -> Vec<RawRecord> {
    let start = Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap());
    (0..24)
        .map(|hour| {
            let at = start + Duration::hours(hour);
            record(&at.to_rfc3339(), fields)
        })
        .collect()
}

#[derive(Default)]
pub(crate) struct FakeFetcher {
    records: HashMap<(String, NaiveDate), Vec<RawRecord>>,
    failing: HashSet<String>,
    calls: AtomicUsize,
}

impl FakeFetcher {
    pub(crate) fn with_records(
        mut self,
        dataset_id: &str,
        date: NaiveDate,
        records: Vec<RawRecord>,
    ) -> Self {
        self.records.insert((dataset_id.to_owned(), date), records);
        self
    }

    pub(crate) fn with_hourly(
        self,
        dataset_id: &str,
        date: NaiveDate,
        fields: &[(&str, Value)],
    ) -> Self {
        self.with_records(dataset_id, date, hourly_records(date, fields))
    }

    pub(crate) fn failing(mut self, dataset_id: &str) -> Self {
        self.failing.insert(dataset_id.to_owned());
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RecordFetcher for FakeFetcher {
    async fn fetch(&self, dataset_id: &str, date: NaiveDate) -> Result<Vec<RawRecord>, EliaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.failing.contains(dataset_id) {
            return Err(EliaError::Status {
                dataset: dataset_id.to_owned(),
                status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            });
        }

        Ok(self
            .records
            .get(&(dataset_id.to_owned(), date))
            .cloned()
            .unwrap_or_default())
    }
}
