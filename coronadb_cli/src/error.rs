use coronadb::error::CoronaDbError;
use polars::error::PolarsError;

#[derive(thiserror::Error, Debug)]
pub enum CoronaDbCliError {
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
    #[error("serde JSON error: {0}")]
    SerdeJSONError(#[from] serde_json::Error),
    #[error("polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("coronadb error: {0}")]
    CoronaDbError(#[from] CoronaDbError),
    #[error("std IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid config file: {0}")]
    ConfigError(#[from] toml::de::Error),
}

pub type CoronaDbCliResult<T> = Result<T, CoronaDbCliError>;
