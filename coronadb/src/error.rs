//! Error types.

#[derive(thiserror::Error, Debug)]
pub enum CoronaDbError {
    #[error("Wrapped anyhow error: {0}")]
    AnyhowError(#[from] anyhow::Error),
    #[error("Malformed observation {index} for '{country}': {reason}")]
    DataFormat {
        country: String,
        index: usize,
        reason: String,
    },
    #[error("Missing field '{field}' in {context}")]
    MissingField { field: String, context: String },
    #[error("Reference entity name is not unique: {0}")]
    DuplicateReferenceName(String),
    #[error("Country not found in series: {0}")]
    UnknownCountry(String),
    #[error("Wrapped polars error: {0}")]
    PolarsError(#[from] polars::error::PolarsError),
    #[error("Wrapped GeoJSON error: {0}")]
    GeoJsonError(#[from] geojson::Error),
    #[error("Wrapped serde JSON error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
    #[error("Wrapped request error: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Wrapped IO error: {0}")]
    IOError(#[from] std::io::Error),
}

pub type CoronaDbResult<T> = Result<T, CoronaDbError>;
