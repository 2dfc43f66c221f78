use crate::models::{Bucket, BucketedSeries, CaseRecord, MONTH_LABELS, QUARTER_LABELS};

/// Case counts per calendar month, always Jan through Dec.
pub fn by_month<'a>(records: impl IntoIterator<Item = &'a CaseRecord>) -> BucketedSeries {
    let mut counts = [0usize; 12];
    for record in records {
        counts[record.month as usize - 1] += 1;
    }
    zero_filled(&MONTH_LABELS, &counts)
}

/// Case counts per quarter, always Q1 through Q4.
pub fn by_quarter<'a>(records: impl IntoIterator<Item = &'a CaseRecord>) -> BucketedSeries {
    let mut counts = [0usize; 4];
    for record in records {
        counts[record.quarter as usize - 1] += 1;
    }
    zero_filled(&QUARTER_LABELS, &counts)
}

fn zero_filled(domain: &[&'static str], counts: &[usize]) -> BucketedSeries {
    BucketedSeries::new(
        domain
            .iter()
            .zip(counts)
            .map(|(label, count)| Bucket {
                label: *label,
                count: *count,
            })
            .collect(),
    )
}
