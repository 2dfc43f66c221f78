use std::collections::BTreeMap;

use chrono::{Datelike, Local, NaiveDate};
use tracing::debug;

use crate::buckets;
use crate::models::{Annotation, BucketedSeries, CaseRecord, ComparisonReport, Direction};

/// Month-by-month comparison of `year2` against `year1`.
///
/// `reference_date` stands for "today"; when it is `None` the wall clock is
/// read on every call. Months of `year2` that lie after the reference month
/// of the reference year carry no annotation.
pub fn compare(
    records_by_year: &BTreeMap<i32, Vec<&CaseRecord>>,
    year1: i32,
    year2: i32,
    reference_date: Option<NaiveDate>,
) -> ComparisonReport {
    let reference_date = reference_date.unwrap_or_else(|| Local::now().date_naive());
    let series1 = series_for(records_by_year, year1);
    let series2 = series_for(records_by_year, year2);

    let mut annotations = Vec::new();
    for (index, (left, right)) in series1.buckets().iter().zip(series2.buckets()).enumerate() {
        let month_number = index as u32 + 1;
        if year2 == reference_date.year() && month_number > reference_date.month() {
            continue;
        }
        if let Some((direction, percent)) = percent_change(left.count, right.count) {
            annotations.push(Annotation {
                month: right.label,
                direction,
                percent,
                y_position: left.count.max(right.count) as f64 * 1.05,
            });
        }
    }

    debug!(
        year1,
        year2,
        %reference_date,
        annotations = annotations.len(),
        "built yearly comparison"
    );

    ComparisonReport {
        year1,
        year2,
        reference_date,
        series1,
        series2,
        annotations,
    }
}

/// Signed change from `before` to `after` in whole percent, truncated toward
/// zero. A zero baseline has no comparable change and yields `None`, as does
/// an unchanged count.
pub fn percent_change(before: usize, after: usize) -> Option<(Direction, i64)> {
    if before == 0 || before == after {
        return None;
    }
    let ratio = (after as f64 - before as f64) / before as f64 * 100.0;
    let direction = if after > before {
        Direction::Up
    } else {
        Direction::Down
    };
    Some((direction, ratio.trunc() as i64))
}

fn series_for(records_by_year: &BTreeMap<i32, Vec<&CaseRecord>>, year: i32) -> BucketedSeries {
    match records_by_year.get(&year) {
        Some(records) => buckets::by_month(records.iter().copied()),
        None => buckets::by_month(std::iter::empty::<&CaseRecord>()),
    }
}
