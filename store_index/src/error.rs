//! Error type shared by the catalog, aggregator, tree and loaders

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed coordinate for store {entity_id}: {value:?}")]
    MalformedCoordinate {
        entity_id: String,
        value: String,
    },

    #[error("store not found: {0}")]
    NotFound(String),

    #[error("neighbor count must be positive, got {0}")]
    InvalidK(i64),

    #[error("invalid period {0:?}, expected something like 2021Q1")]
    InvalidPeriod(String),

    #[error("unknown measure {0:?}, expected bottles_sold, sale_dollars or volume_sold_liters")]
    InvalidMeasure(String),

    #[error("column {0:?} missing from input header")]
    MissingColumn(String),

    #[error("line {line}: {reason}")]
    MalformedRecord {
        line: usize,
        reason: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bad input pattern: {0}")]
    Glob(#[from] glob::PatternError),
}

pub type Result<T> = std::result::Result<T, Error>;
