use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{info, warn};

use crate::error::DataFormatError;
use crate::models::{CaseRecord, CaseRow};

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

pub fn parse_inflow_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
                .map(|datetime| datetime.date())
        })
}

#[derive(Debug, Clone, Default)]
pub struct LoadSummary {
    pub loaded: usize,
    pub rejected: Vec<DataFormatError>,
}

/// Immutable snapshot of every case, loaded once.
#[derive(Debug, Clone, Default)]
pub struct CaseStore {
    records: Vec<CaseRecord>,
}

impl CaseStore {
    /// Builds a store from raw rows. Rows without a usable date are left out
    /// and reported in the summary; the load itself never fails.
    pub fn load(rows: impl IntoIterator<Item = CaseRow>) -> (Self, LoadSummary) {
        let mut records = Vec::new();
        let mut rejected = Vec::new();

        for (index, row) in rows.into_iter().enumerate() {
            match record_from_row(index + 1, row) {
                Ok(record) => records.push(record),
                Err(err) => rejected.push(err),
            }
        }

        if !rejected.is_empty() {
            warn!(
                rejected = rejected.len(),
                "skipped rows with missing or unparseable inflow dates"
            );
        }
        info!(loaded = records.len(), "case data loaded");

        let summary = LoadSummary {
            loaded: records.len(),
            rejected,
        };
        (Self { records }, summary)
    }

    pub fn from_records(records: Vec<CaseRecord>) -> Self {
        info!(loaded = records.len(), "case data loaded");
        Self { records }
    }

    pub fn records(&self) -> &[CaseRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn years(&self) -> BTreeSet<i32> {
        self.records.iter().map(|record| record.year).collect()
    }

    pub fn latest_year(&self) -> Option<i32> {
        self.years().last().copied()
    }

    /// Second-latest year against the latest one. A single-year dataset is
    /// compared with itself.
    pub fn default_comparison(&self) -> Option<(i32, i32)> {
        let years: Vec<i32> = self.years().into_iter().collect();
        match years.as_slice() {
            [] => None,
            [only] => Some((*only, *only)),
            [.., previous, latest] => Some((*previous, *latest)),
        }
    }

    pub fn filter(&self, years: &BTreeSet<i32>) -> Vec<&CaseRecord> {
        self.records
            .iter()
            .filter(|record| years.contains(&record.year))
            .collect()
    }

    pub fn by_year(&self, years: &BTreeSet<i32>) -> BTreeMap<i32, Vec<&CaseRecord>> {
        let mut grouped: BTreeMap<i32, Vec<&CaseRecord>> = BTreeMap::new();
        for record in self.filter(years) {
            grouped.entry(record.year).or_default().push(record);
        }
        grouped
    }
}

pub fn record_from_row(row_number: usize, row: CaseRow) -> Result<CaseRecord, DataFormatError> {
    let raw_date = row
        .inflow_date
        .filter(|value| !value.trim().is_empty())
        .ok_or(DataFormatError::MissingDate { row: row_number })?;
    let inflow_date = parse_inflow_date(&raw_date).ok_or_else(|| DataFormatError::BadDate {
        row: row_number,
        value: raw_date.clone(),
    })?;

    Ok(CaseRecord::new(
        row.case_name.unwrap_or_default(),
        inflow_date,
        row.disease.unwrap_or_default(),
        row.client_name.unwrap_or_default(),
    ))
}
