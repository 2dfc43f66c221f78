use std::fmt::Write;

use crate::error::QueryError;
use crate::models::{BucketedSeries, CategoryCount, ComparisonReport, ResultTable};
use crate::query::{QueryEngine, QueryFilters, ReportKind};

pub fn build_report(engine: &QueryEngine<'_>, filters: &QueryFilters) -> Result<String, QueryError> {
    let mut output = String::new();
    let years: Vec<String> = filters.years.iter().map(|year| year.to_string()).collect();

    let _ = writeln!(output, "# Case Trends Dashboard");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(output, "Years: {}", years.join(", "));
    if let Some(category) = filters.category.as_deref() {
        let _ = writeln!(output, "Category: {category}");
    }

    let sections = [
        ("Month-wise Trend", "Month", ReportKind::MonthTrend),
        ("Quarterly Trend", "Quarter", ReportKind::QuarterTrend),
        ("Disease-wise Trend", "Disease", ReportKind::CategoryTrend),
        ("Top 10 Clients", "Client", ReportKind::ClientTop10),
    ];
    for (title, column, kind) in sections {
        let _ = writeln!(output);
        let _ = writeln!(output, "### {title}");
        write_table(&mut output, column, &engine.run(kind, filters)?);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Yearly Comparison");
    write_table(
        &mut output,
        "Month",
        &engine.run(ReportKind::YearComparison, filters)?,
    );

    Ok(output)
}

fn write_table(output: &mut String, column: &str, table: &ResultTable) {
    match table {
        ResultTable::Series { series } => write_series(output, column, series),
        ResultTable::Ranking { rows } => write_ranking(output, column, rows),
        ResultTable::Comparison(report) => write_comparison(output, report),
    }
}

fn write_series(output: &mut String, column: &str, series: &BucketedSeries) {
    if series.total() == 0 {
        let _ = writeln!(output, "No cases recorded for this selection.");
        return;
    }
    let _ = writeln!(output, "| {column} | No of Case |");
    let _ = writeln!(output, "|---|---:|");
    for bucket in series.buckets() {
        let _ = writeln!(output, "| {} | {} |", bucket.label, bucket.count);
    }
}

fn write_ranking(output: &mut String, column: &str, rows: &[CategoryCount]) {
    if rows.is_empty() {
        let _ = writeln!(output, "No cases recorded for this selection.");
        return;
    }
    let _ = writeln!(output, "| {column} | No of Case |");
    let _ = writeln!(output, "|---|---:|");
    for row in rows {
        let _ = writeln!(output, "| {} | {} |", row.label, row.count);
    }
}

fn write_comparison(output: &mut String, report: &ComparisonReport) {
    let _ = writeln!(
        output,
        "### {} vs {} (as of {})",
        report.year1, report.year2, report.reference_date
    );
    if report.series1.total() == 0 && report.series2.total() == 0 {
        let _ = writeln!(output, "No cases recorded for either year.");
        return;
    }

    let _ = writeln!(output, "| Month | {} | {} | Change |", report.year1, report.year2);
    let _ = writeln!(output, "|---|---:|---:|---|");
    for (left, right) in report.series1.buckets().iter().zip(report.series2.buckets()) {
        let change = report.change_label(left.label).unwrap_or_default();
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} |",
            left.label, left.count, right.count, change
        );
    }
}
