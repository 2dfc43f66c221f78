use anyhow::Context;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::DataFormatError;
use crate::ingest;
use crate::models::{CaseRecord, CaseRow};
use crate::store::record_from_row;

#[derive(Debug, Clone, Default)]
pub struct ImportSummary {
    pub inserted: usize,
    pub duplicates: usize,
    pub rejected: Vec<DataFormatError>,
}

/// A parsed row ready for insertion, keyed for idempotent re-imports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCase {
    pub source_key: String,
    pub record: CaseRecord,
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn fetch_cases(pool: &PgPool) -> anyhow::Result<Vec<CaseRecord>> {
    let rows = sqlx::query(
        "SELECT case_name, inflow_date, disease, client_name \
         FROM case_trends.cases \
         ORDER BY inflow_date, created_at",
    )
    .fetch_all(pool)
    .await
    .context("failed to fetch cases")?;

    let mut cases = Vec::with_capacity(rows.len());
    for row in rows {
        let inflow_date: NaiveDate = row.get("inflow_date");
        cases.push(CaseRecord::new(
            row.get::<String, _>("case_name"),
            inflow_date,
            row.get::<String, _>("disease"),
            row.get::<String, _>("client_name"),
        ));
    }

    Ok(cases)
}

/// Parses rows with the same rules as the in-memory store. Rows without a
/// `SOURCE_KEY` get a fresh `import-<uuid>` key.
pub fn prepare_import(rows: Vec<CaseRow>) -> (Vec<PendingCase>, Vec<DataFormatError>) {
    let mut pending = Vec::new();
    let mut rejected = Vec::new();

    for (index, mut row) in rows.into_iter().enumerate() {
        let source_key = row
            .source_key
            .take()
            .filter(|key| !key.is_empty())
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));
        match record_from_row(index + 1, row) {
            Ok(record) => pending.push(PendingCase { source_key, record }),
            Err(err) => rejected.push(err),
        }
    }

    (pending, rejected)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<ImportSummary> {
    let (pending, rejected) = prepare_import(ingest::read_path(csv_path)?);
    let mut summary = ImportSummary {
        rejected,
        ..ImportSummary::default()
    };

    for case in pending {
        let result = sqlx::query(
            r#"
            INSERT INTO case_trends.cases
            (id, case_name, inflow_date, disease, client_name, source_key)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&case.record.case_name)
        .bind(case.record.inflow_date)
        .bind(&case.record.category)
        .bind(&case.record.client_name)
        .bind(&case.source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            summary.inserted += 1;
        } else {
            summary.duplicates += 1;
        }
    }

    if !summary.rejected.is_empty() {
        warn!(
            rejected = summary.rejected.len(),
            "import skipped rows with missing or unparseable inflow dates"
        );
    }
    info!(
        inserted = summary.inserted,
        duplicates = summary.duplicates,
        "case import finished"
    );

    Ok(summary)
}
