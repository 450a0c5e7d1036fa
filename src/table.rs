use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::Value;

use crate::error::EliaError;
use crate::fetch::RawRecord;

const TIMESTAMP_COLUMN: &str = "datetime";

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%:z"];
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// A record whose timestamp has been parsed and moved into the reference zone.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub datetime: DateTime<Tz>,
    pub fields: RawRecord,
}

impl Row {
    /// Numeric value of `column`. Numeric strings are accepted, nulls and
    /// non-finite values such as `"inf"` or `"NaN"` are not.
    pub fn number(&self, column: &str) -> Option<f64> {
        let value = match self.fields.get(column)? {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        };
        value.filter(|v| v.is_finite())
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        self.fields.get(column)?.as_str()
    }
}

/// Rows of one dataset, ascending by `datetime`.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    dataset: String,
    rows: Vec<Row>,
}

impl Table {
    pub(crate) fn from_rows(dataset: impl Into<String>, rows: Vec<Row>) -> Self {
        Self {
            dataset: dataset.into(),
            rows,
        }
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `(datetime, value)` pairs of `column`, skipping rows without a number.
    pub fn series(&self, column: &str) -> Vec<(DateTime<Tz>, f64)> {
        self.rows
            .iter()
            .filter_map(|row| Some((row.datetime, row.number(column)?)))
            .collect()
    }
}

/// Validates, parses and sorts the raw records of one dataset.
///
/// Every record has to carry every column of `required_columns`, otherwise
/// nothing is processed and [`EliaError::MissingColumns`] lists what is
/// absent. Timestamps without an offset are taken as UTC. The sort is
/// stable, so duplicate timestamps keep their input order.
pub fn normalize(
    dataset_id: &str,
    records: Vec<RawRecord>,
    required_columns: &[&str],
    zone: Tz,
) -> Result<Table, EliaError> {
    let missing = missing_columns(&records, required_columns);
    if !missing.is_empty() {
        return Err(EliaError::MissingColumns {
            dataset: dataset_id.to_owned(),
            columns: missing,
        });
    }

    let mut rows = records
        .into_iter()
        .map(|fields| {
            let datetime = row_timestamp(dataset_id, &fields)?.with_timezone(&zone);
            Ok(Row { datetime, fields })
        })
        .collect::<Result<Vec<_>, EliaError>>()?;

    rows.sort_by_key(|row| row.datetime);

    Ok(Table::from_rows(dataset_id, rows))
}

fn missing_columns(records: &[RawRecord], required_columns: &[&str]) -> Vec<String> {
    let mut missing: Vec<String> = Vec::new();
    for column in required_columns {
        let absent = records.is_empty() || records.iter().any(|record| !record.contains_key(*column));
        if absent && !missing.iter().any(|m| m == column) {
            missing.push((*column).to_owned());
        }
    }
    missing
}

fn row_timestamp(dataset_id: &str, fields: &RawRecord) -> Result<DateTime<Utc>, EliaError> {
    let malformed = |value: String| EliaError::MalformedTimestamp {
        dataset: dataset_id.to_owned(),
        value,
    };

    match fields.get(TIMESTAMP_COLUMN) {
        Some(Value::String(text)) => parse_timestamp(text).ok_or_else(|| malformed(text.clone())),
        Some(other) => Err(malformed(other.to_string())),
        None => Err(malformed(String::new())),
    }
}

/// Parses an instant, taking naive timestamps as UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Some(datetime.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(datetime) = DateTime::parse_from_str(text, format) {
            return Some(datetime.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}
