use thiserror::Error;

/// A row whose inflow date could not be turned into a calendar date.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataFormatError {
    #[error("row {row}: missing inflow date")]
    MissingDate { row: usize },

    #[error("row {row}: unparseable inflow date {value:?}")]
    BadDate { row: usize, value: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("no case data loaded")]
    NoData,
}
