use std::io::Read;
use std::path::Path;

use anyhow::Context;

use crate::models::CaseRow;
use crate::store::{CaseStore, LoadSummary};

pub fn read_rows<R: Read>(reader: R) -> anyhow::Result<Vec<CaseRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();

    for (index, result) in reader.deserialize::<CaseRow>().enumerate() {
        let row = result.with_context(|| format!("malformed CSV record {}", index + 1))?;
        rows.push(row);
    }

    Ok(rows)
}

pub fn read_path(path: &Path) -> anyhow::Result<Vec<CaseRow>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    read_rows(file)
}

pub fn load_csv(path: &Path) -> anyhow::Result<(CaseStore, LoadSummary)> {
    Ok(CaseStore::load(read_path(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_workbook_columns() {
        let data = "\
CASE_NAME,INFLOW_DATE,DISEASE,CLIENT_NAME,NOTES
C-001,2024-01-15,Dengue,Acme Health,first
C-002,2024-02-03 09:30:00,Malaria,Beta Clinic,
C-003,,Dengue,Acme Health,no date
";
        let rows = read_rows(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].case_name.as_deref(), Some("C-001"));
        assert_eq!(rows[1].client_name.as_deref(), Some("Beta Clinic"));
        assert_eq!(rows[2].inflow_date, None);

        let (store, summary) = CaseStore::load(rows);
        assert_eq!(store.len(), 2);
        assert_eq!(summary.rejected.len(), 1);
    }

    #[test]
    fn missing_optional_columns_are_tolerated() {
        let data = "INFLOW_DATE,DISEASE\n2023-07-01,Flu\n";
        let rows = read_rows(data.as_bytes()).unwrap();
        assert_eq!(rows[0].client_name, None);
        assert_eq!(rows[0].disease.as_deref(), Some("Flu"));
    }

    #[test]
    fn ragged_records_fail_the_read() {
        let data = "CASE_NAME,INFLOW_DATE\nC-1,2023-01-01,extra\n";
        assert!(read_rows(data.as_bytes()).is_err());
    }
}
