//! Case intake trend engine: month and quarter buckets, disease and client
//! tallies, and year-over-year comparisons over an immutable case snapshot.

pub mod buckets;
pub mod categories;
pub mod compare;
pub mod db;
pub mod error;
pub mod ingest;
pub mod models;
pub mod query;
pub mod report;
pub mod store;
