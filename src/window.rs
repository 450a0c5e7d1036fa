use chrono::{DateTime, Days, Duration, NaiveDate, TimeZone};
use chrono_tz::Tz;

use crate::error::EliaError;
use crate::table::Table;

/// One civil day in a reference zone, `[D 00:00, D+1 00:00]` with both ends
/// included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    date: NaiveDate,
    lower: DateTime<Tz>,
    upper: DateTime<Tz>,
}

impl DayWindow {
    /// The upper bound is the local midnight of the next calendar date, so the
    /// window spans 23 or 25 hours on daylight-saving transition days.
    pub fn new(date: NaiveDate, zone: Tz) -> Result<Self, EliaError> {
        let next = date
            .checked_add_days(Days::new(1))
            .ok_or_else(|| EliaError::Config(format!("date {date} is out of range")))?;

        Ok(Self {
            date,
            lower: local_midnight(date, zone)?,
            upper: local_midnight(next, zone)?,
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn lower(&self) -> DateTime<Tz> {
        self.lower
    }

    pub fn upper(&self) -> DateTime<Tz> {
        self.upper
    }

    pub fn duration(&self) -> Duration {
        self.upper.signed_duration_since(self.lower)
    }

    pub fn contains(&self, instant: &DateTime<Tz>) -> bool {
        self.lower <= *instant && *instant <= self.upper
    }

    /// Copies the rows of `table` that fall inside the window: first the rows
    /// exactly at `lower`, then those in `(lower, upper]`.
    pub fn slice(&self, table: &Table) -> Table {
        let boundary_start = table.rows().iter().filter(|row| row.datetime == self.lower);
        let body = table
            .rows()
            .iter()
            .filter(|row| row.datetime > self.lower && row.datetime <= self.upper);

        Table::from_rows(table.dataset(), boundary_start.chain(body).cloned().collect())
    }
}

fn local_midnight(date: NaiveDate, zone: Tz) -> Result<DateTime<Tz>, EliaError> {
    let midnight = date.and_time(chrono::NaiveTime::MIN);
    zone.from_local_datetime(&midnight)
        .earliest()
        .ok_or(EliaError::NonexistentLocalTime(midnight))
}

/// Cuts the civil day `date` out of a table holding the previous and the
/// target day.
pub fn slice_day(table: &Table, date: NaiveDate, zone: Tz) -> Result<Table, EliaError> {
    Ok(DayWindow::new(date, zone)?.slice(table))
}
