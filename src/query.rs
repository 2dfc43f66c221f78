use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::Serialize;
use tracing::debug;

use crate::buckets;
use crate::categories::{self, TOP_CLIENTS};
use crate::compare;
use crate::error::QueryError;
use crate::models::{CaseRecord, CategoryField, ResultTable};
use crate::store::CaseStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    MonthTrend,
    QuarterTrend,
    CategoryTrend,
    ClientTop10,
    YearComparison,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFilters {
    pub years: BTreeSet<i32>,
    pub category: Option<String>,
    pub year1: Option<i32>,
    pub year2: Option<i32>,
    pub reference_date: Option<NaiveDate>,
}

/// Read-only entry point over a loaded snapshot. Every call recomputes
/// from the store, so identical filters give identical tables.
#[derive(Debug, Clone, Copy)]
pub struct QueryEngine<'a> {
    store: &'a CaseStore,
}

impl<'a> QueryEngine<'a> {
    pub fn new(store: &'a CaseStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &'a CaseStore {
        self.store
    }

    pub fn run(&self, kind: ReportKind, filters: &QueryFilters) -> Result<ResultTable, QueryError> {
        if self.store.is_empty() {
            return Err(QueryError::NoData);
        }
        debug!(?kind, ?filters, "running query");

        let table = match kind {
            ReportKind::MonthTrend => ResultTable::Series {
                series: buckets::by_month(self.selection(filters)?),
            },
            ReportKind::QuarterTrend => ResultTable::Series {
                series: buckets::by_quarter(self.selection(filters)?),
            },
            ReportKind::CategoryTrend => ResultTable::Ranking {
                rows: categories::by_category(self.selection(filters)?, CategoryField::Category)
                    .to_rows(),
            },
            ReportKind::ClientTop10 => {
                let aggregate =
                    categories::by_category(self.selection(filters)?, CategoryField::Client);
                ResultTable::Ranking {
                    rows: categories::top_n(&aggregate, TOP_CLIENTS),
                }
            }
            ReportKind::YearComparison => {
                let (year1, year2) = match (filters.year1, filters.year2) {
                    (Some(year1), Some(year2)) => (year1, year2),
                    _ => {
                        return Err(QueryError::InvalidFilter(
                            "year comparison needs both year1 and year2".to_string(),
                        ))
                    }
                };
                let grouped = self.grouped(&BTreeSet::from([year1, year2]), filters);
                ResultTable::Comparison(compare::compare(
                    &grouped,
                    year1,
                    year2,
                    filters.reference_date,
                ))
            }
        };
        Ok(table)
    }

    fn selection(&self, filters: &QueryFilters) -> Result<Vec<&'a CaseRecord>, QueryError> {
        if filters.years.is_empty() {
            return Err(QueryError::InvalidFilter(
                "at least one year must be selected".to_string(),
            ));
        }
        Ok(self
            .store
            .filter(&filters.years)
            .into_iter()
            .filter(|record| matches_category(record, filters))
            .collect())
    }

    fn grouped(
        &self,
        years: &BTreeSet<i32>,
        filters: &QueryFilters,
    ) -> BTreeMap<i32, Vec<&'a CaseRecord>> {
        let mut grouped = self.store.by_year(years);
        for records in grouped.values_mut() {
            records.retain(|record| matches_category(record, filters));
        }
        grouped
    }
}

fn matches_category(record: &CaseRecord, filters: &QueryFilters) -> bool {
    filters
        .category
        .as_deref()
        .map_or(true, |category| record.category == category)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CaseRow, Direction};

    fn row(date: &str, disease: &str, client: &str) -> CaseRow {
        CaseRow {
            case_name: Some("case".to_string()),
            inflow_date: Some(date.to_string()),
            disease: Some(disease.to_string()),
            client_name: Some(client.to_string()),
            ..CaseRow::default()
        }
    }

    fn sample_store() -> CaseStore {
        let (store, _) = CaseStore::load(vec![
            row("2023-01-04", "Dengue", "Acme"),
            row("2023-01-09", "Dengue", "Beta"),
            row("2023-04-20", "Malaria", "Acme"),
            row("2024-01-02", "Dengue", "Acme"),
            row("2024-01-05", "Malaria", "Gamma"),
            row("2024-01-28", "Dengue", "Beta"),
            row("2024-03-15", "Dengue", "Acme"),
            row("2024-11-30", "Malaria", "Acme"),
        ]);
        store
    }

    fn years(values: &[i32]) -> QueryFilters {
        QueryFilters {
            years: values.iter().copied().collect(),
            ..QueryFilters::default()
        }
    }

    #[test]
    fn month_trend_over_selected_years() {
        let store = sample_store();
        let engine = QueryEngine::new(&store);

        let table = engine.run(ReportKind::MonthTrend, &years(&[2024])).unwrap();
        let ResultTable::Series { series } = table else {
            panic!("expected a series");
        };
        assert_eq!(series.counts(), vec![3, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0]);

        let both = engine.run(ReportKind::MonthTrend, &years(&[2023, 2024])).unwrap();
        let ResultTable::Series { series } = both else {
            panic!("expected a series");
        };
        assert_eq!(series.total(), 8);
    }

    #[test]
    fn year_without_cases_gives_zero_series() {
        let store = sample_store();
        let engine = QueryEngine::new(&store);

        let table = engine.run(ReportKind::QuarterTrend, &years(&[2019])).unwrap();
        let ResultTable::Series { series } = table else {
            panic!("expected a series");
        };
        assert_eq!(series.counts(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn category_and_client_tables() {
        let store = sample_store();
        let engine = QueryEngine::new(&store);
        let filters = years(&[2024]);

        let ResultTable::Ranking { rows } =
            engine.run(ReportKind::CategoryTrend, &filters).unwrap()
        else {
            panic!("expected a ranking");
        };
        let pairs: Vec<(&str, usize)> = rows.iter().map(|r| (r.label.as_str(), r.count)).collect();
        assert_eq!(pairs, vec![("Dengue", 3), ("Malaria", 2)]);

        let ResultTable::Ranking { rows } = engine.run(ReportKind::ClientTop10, &filters).unwrap()
        else {
            panic!("expected a ranking");
        };
        let pairs: Vec<(&str, usize)> = rows.iter().map(|r| (r.label.as_str(), r.count)).collect();
        assert_eq!(pairs, vec![("Acme", 3), ("Beta", 1), ("Gamma", 1)]);
    }

    #[test]
    fn category_filter_narrows_every_report() {
        let store = sample_store();
        let engine = QueryEngine::new(&store);
        let filters = QueryFilters {
            category: Some("Malaria".to_string()),
            ..years(&[2023, 2024])
        };

        let ResultTable::Series { series } = engine.run(ReportKind::MonthTrend, &filters).unwrap()
        else {
            panic!("expected a series");
        };
        assert_eq!(series.total(), 3);

        let comparison = QueryFilters {
            category: Some("Malaria".to_string()),
            year1: Some(2023),
            year2: Some(2024),
            reference_date: NaiveDate::from_ymd_opt(2025, 1, 1),
            ..QueryFilters::default()
        };
        let ResultTable::Comparison(report) =
            engine.run(ReportKind::YearComparison, &comparison).unwrap()
        else {
            panic!("expected a comparison");
        };
        assert_eq!(report.series1.total(), 1);
        assert_eq!(report.series2.total(), 2);
    }

    #[test]
    fn year_comparison_annotations() {
        let store = sample_store();
        let engine = QueryEngine::new(&store);
        let filters = QueryFilters {
            year1: Some(2023),
            year2: Some(2024),
            reference_date: NaiveDate::from_ymd_opt(2024, 6, 1),
            ..QueryFilters::default()
        };

        let ResultTable::Comparison(report) =
            engine.run(ReportKind::YearComparison, &filters).unwrap()
        else {
            panic!("expected a comparison");
        };
        // Jan 2 -> 3 is shown; Mar has a zero baseline; Apr 1 -> 0 is a drop;
        // Nov is after the reference month.
        let shown: Vec<(&str, Direction, i64)> = report
            .annotations
            .iter()
            .map(|a| (a.month, a.direction, a.percent))
            .collect();
        assert_eq!(
            shown,
            vec![("Jan", Direction::Up, 50), ("Apr", Direction::Down, -100)]
        );
    }

    #[test]
    fn invalid_filters_are_rejected() {
        let store = sample_store();
        let engine = QueryEngine::new(&store);

        for kind in [
            ReportKind::MonthTrend,
            ReportKind::QuarterTrend,
            ReportKind::CategoryTrend,
            ReportKind::ClientTop10,
        ] {
            assert!(matches!(
                engine.run(kind, &QueryFilters::default()),
                Err(QueryError::InvalidFilter(_))
            ));
        }

        let half = QueryFilters {
            year1: Some(2023),
            ..QueryFilters::default()
        };
        assert!(matches!(
            engine.run(ReportKind::YearComparison, &half),
            Err(QueryError::InvalidFilter(_))
        ));
    }

    #[test]
    fn empty_store_refuses_queries() {
        let store = CaseStore::default();
        let engine = QueryEngine::new(&store);
        assert_eq!(
            engine.run(ReportKind::MonthTrend, &years(&[2024])),
            Err(QueryError::NoData)
        );
    }

    #[test]
    fn repeated_queries_are_identical() {
        let store = sample_store();
        let engine = QueryEngine::new(&store);
        let filters = QueryFilters {
            year1: Some(2023),
            year2: Some(2024),
            reference_date: NaiveDate::from_ymd_opt(2024, 12, 1),
            ..years(&[2024])
        };
        for kind in [ReportKind::ClientTop10, ReportKind::YearComparison] {
            assert_eq!(engine.run(kind, &filters), engine.run(kind, &filters));
        }
    }

    #[test]
    fn result_tables_serialize_with_kind_tag() {
        let store = sample_store();
        let engine = QueryEngine::new(&store);
        let table = engine.run(ReportKind::QuarterTrend, &years(&[2023])).unwrap();
        let json = serde_json::to_value(&table).unwrap();

        assert_eq!(json["kind"], "series");
        assert_eq!(json["series"][0]["label"], "Q1");
        assert_eq!(json["series"][0]["count"], 2);
        assert_eq!(json["series"][1]["count"], 1);
    }
}
