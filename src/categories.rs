use std::cmp::Reverse;

use crate::models::{CaseRecord, CategoryAggregate, CategoryCount, CategoryField};

pub const TOP_CLIENTS: usize = 10;

pub fn by_category<'a>(
    records: impl IntoIterator<Item = &'a CaseRecord>,
    field: CategoryField,
) -> CategoryAggregate {
    let mut aggregate = CategoryAggregate::default();
    for record in records {
        aggregate.increment(field.value(record));
    }
    aggregate
}

/// The `n` largest groups by count. Equal counts keep the aggregate's
/// lexical label order.
pub fn top_n(aggregate: &CategoryAggregate, n: usize) -> Vec<CategoryCount> {
    let mut rows = aggregate.to_rows();
    rows.sort_by_key(|row| Reverse(row.count));
    rows.truncate(n);
    rows
}
