use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub const QUARTER_LABELS: [&str; 4] = ["Q1", "Q2", "Q3", "Q4"];

/// One row as delivered by a loader, before any parsing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CaseRow {
    #[serde(rename = "CASE_NAME", default)]
    pub case_name: Option<String>,
    #[serde(rename = "INFLOW_DATE", default)]
    pub inflow_date: Option<String>,
    #[serde(rename = "DISEASE", default)]
    pub disease: Option<String>,
    #[serde(rename = "CLIENT_NAME", default)]
    pub client_name: Option<String>,
    /// Stable import key; only the database import reads it.
    #[serde(rename = "SOURCE_KEY", default)]
    pub source_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseRecord {
    pub case_name: String,
    pub inflow_date: NaiveDate,
    pub category: String,
    pub client_name: String,
    pub year: i32,
    pub month: u32,
    pub quarter: u32,
}

impl CaseRecord {
    pub fn new(
        case_name: impl Into<String>,
        inflow_date: NaiveDate,
        category: impl Into<String>,
        client_name: impl Into<String>,
    ) -> Self {
        let month = inflow_date.month();
        Self {
            case_name: case_name.into(),
            inflow_date,
            category: category.into(),
            client_name: client_name.into(),
            year: inflow_date.year(),
            month,
            quarter: (month + 2) / 3,
        }
    }

    pub fn month_abbrev(&self) -> &'static str {
        MONTH_LABELS[self.month as usize - 1]
    }

    pub fn quarter_label(&self) -> &'static str {
        QUARTER_LABELS[self.quarter as usize - 1]
    }
}

/// Which categorical attribute to group by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryField {
    Category,
    Client,
}

impl CategoryField {
    pub fn value<'a>(&self, record: &'a CaseRecord) -> &'a str {
        match self {
            CategoryField::Category => &record.category,
            CategoryField::Client => &record.client_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub label: &'static str,
    pub count: usize,
}

/// Counts over a closed, ordered domain. Every label of the domain is
/// present exactly once, in canonical order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BucketedSeries {
    buckets: Vec<Bucket>,
}

impl BucketedSeries {
    pub(crate) fn new(buckets: Vec<Bucket>) -> Self {
        Self { buckets }
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn count(&self, label: &str) -> Option<usize> {
        self.buckets
            .iter()
            .find(|bucket| bucket.label == label)
            .map(|bucket| bucket.count)
    }

    pub fn counts(&self) -> Vec<usize> {
        self.buckets.iter().map(|bucket| bucket.count).collect()
    }

    pub fn total(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.count).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub label: String,
    pub count: usize,
}

/// Counts over an open domain: only labels seen in the input appear.
/// Iteration order is lexical by label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CategoryAggregate {
    counts: std::collections::BTreeMap<String, usize>,
}

impl CategoryAggregate {
    pub(crate) fn increment(&mut self, label: &str) {
        *self.counts.entry(label.to_string()).or_insert(0) += 1;
    }

    pub fn get(&self, label: &str) -> Option<usize> {
        self.counts.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(label, count)| (label.as_str(), *count))
    }

    pub fn to_rows(&self) -> Vec<CategoryCount> {
        self.iter()
            .map(|(label, count)| CategoryCount {
                label: label.to_string(),
                count,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub month: &'static str,
    pub direction: Direction,
    /// Signed change, truncated toward zero.
    pub percent: i64,
    /// Layout hint: just above the taller of the two bars.
    pub y_position: f64,
}

impl Annotation {
    pub fn label(&self) -> String {
        match self.direction {
            Direction::Up => format!("⬆️ +{}%", self.percent),
            Direction::Down => format!("⬇️ {}%", self.percent),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub year1: i32,
    pub year2: i32,
    pub reference_date: NaiveDate,
    pub series1: BucketedSeries,
    pub series2: BucketedSeries,
    pub annotations: Vec<Annotation>,
}

impl ComparisonReport {
    /// Display label of the month's annotation, if one was emitted.
    pub fn change_label(&self, month: &str) -> Option<String> {
        self.annotations
            .iter()
            .find(|annotation| annotation.month == month)
            .map(Annotation::label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultTable {
    Series { series: BucketedSeries },
    Ranking { rows: Vec<CategoryCount> },
    Comparison(ComparisonReport),
}
