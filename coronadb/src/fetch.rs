//! Loaders for the three upstream datasets. A location is either an `http(s)` URL or a path on
//! the local filesystem.

use log::info;
use polars::frame::DataFrame;
use tokio::try_join;

use crate::config::Config;
use crate::datasets::read_metadata_tsv;
use crate::error::CoronaDbResult;
use crate::series::RawFeed;
use crate::world::{reference_entities_from_geojson, ReferenceEntity};

/// The raw inputs of the pipeline, as fetched
#[derive(Debug)]
pub struct Sources {
    pub entities: Vec<ReferenceEntity>,
    pub feed: RawFeed,
    pub metadata: DataFrame,
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Performs a read of the full contents at `location`
pub async fn read_location(location: &str) -> CoronaDbResult<Vec<u8>> {
    if is_remote(location) {
        info!("Attempting to download {location}");
        let bytes = reqwest::Client::new()
            .get(location)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    } else {
        info!("Attempting to read {location}");
        Ok(tokio::fs::read(location).await?)
    }
}

pub async fn load_timeseries(location: &str) -> CoronaDbResult<RawFeed> {
    let bytes = read_location(location).await?;
    let feed: RawFeed = serde_json::from_slice(&bytes)?;
    info!("Loaded case series for {} countries", feed.len());
    Ok(feed)
}

pub async fn load_metadata(location: &str) -> CoronaDbResult<DataFrame> {
    let bytes = read_location(location).await?;
    let metadata = read_metadata_tsv(bytes)?;
    info!("Loaded metadata with shape: {:?}", metadata.shape());
    Ok(metadata)
}

pub async fn load_reference_entities(
    location: &str,
    name_property: &str,
) -> CoronaDbResult<Vec<ReferenceEntity>> {
    let bytes = read_location(location).await?;
    reference_entities_from_geojson(&String::from_utf8_lossy(&bytes), name_property)
}

/// Fetch all three datasets concurrently
pub async fn load_all(config: &Config) -> CoronaDbResult<Sources> {
    let (entities, feed, metadata) = try_join!(
        load_reference_entities(&config.boundaries_url, &config.boundaries_name_property),
        load_timeseries(&config.timeseries_url),
        load_metadata(&config.metadata_url),
    )?;
    Ok(Sources {
        entities,
        feed,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use httpmock::prelude::*;
    use tempfile::NamedTempFile;

    use super::*;
    use crate::error::CoronaDbError;

    const FEED: &str = r#"{
        "Norway": [
            {"date": "2020-1-22", "confirmed": 0, "deaths": 0, "recovered": 0},
            {"date": "2020-1-23", "confirmed": 2, "deaths": 0, "recovered": 0}
        ],
        "US": [
            {"date": "2020-1-22", "confirmed": 1, "deaths": 0, "recovered": 0},
            {"date": "2020-1-23", "confirmed": 1, "deaths": 0, "recovered": 0}
        ]
    }"#;

    #[tokio::test]
    async fn timeseries_should_download() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/timeseries.json");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(FEED);
            })
            .await;

        let feed = load_timeseries(&server.url("/timeseries.json")).await;
        assert!(feed.is_ok(), "The feed should load");
        let feed = feed.unwrap();
        assert_eq!(feed.len(), 2);
        assert_eq!(feed["US"][1].confirmed, Some(1));
        assert_eq!(feed["Norway"][0].date.as_deref(), Some("2020-1-22"));
    }

    #[tokio::test]
    async fn missing_remote_file_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/current.tsv");
                then.status(404);
            })
            .await;

        let result = load_metadata(&server.url("/current.tsv")).await;
        assert!(matches!(result, Err(CoronaDbError::RequestError(_))));
    }

    #[tokio::test]
    async fn metadata_should_load_from_local_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "cdb_id\tisolation_country\tgenbank_accession\n1\tUSA\tMN908947\n2\tNorway\tMT1\n"
        )
        .unwrap();

        let metadata = load_metadata(&file.path().to_string_lossy()).await.unwrap();
        assert_eq!(metadata.shape(), (2, 3));
    }
}
