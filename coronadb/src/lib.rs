use std::borrow::Cow;

use log::{debug, info, warn};
use polars::frame::DataFrame;

use crate::config::Config;
use crate::datasets::DatasetCount;
use crate::error::CoronaDbResult;
use crate::fetch::Sources;
use crate::reconcile::{reconcile, ReconcileReport};
use crate::series::{Observation, Selection, SeriesMap, Snapshot};
use crate::world::{reference_names, WorldTable};

// Re-exports
pub use column_names as COL;

// Modules
pub mod alias;
pub mod column_names;
pub mod config;
pub mod datasets;
pub mod error;
pub mod fetch;
#[cfg(feature = "formatters")]
pub mod formatters;
pub mod reconcile;
pub mod series;
pub mod world;

/// The joined dashboard data: one row per country plus the queryable case series
pub struct CoronaDb {
    pub config: Config,
    pub world: WorldTable,
    pub series: SeriesMap,
    /// Sequence metadata with an extra canonical [`COL::COUNTRY`] column
    pub metadata: DataFrame,
    /// Diagnostics of reconciling the case feed with the boundaries
    pub report: ReconcileReport,
    /// Metadata countries, after aliasing, that match no boundary name
    pub unmatched_metadata: Vec<String>,
}

impl CoronaDb {
    /// Fetch the sources with default configuration and build the tables
    pub async fn new() -> CoronaDbResult<Self> {
        Self::new_with_config(Config::default()).await
    }

    /// Fetch the sources described by the configuration and build the tables
    pub async fn new_with_config(config: Config) -> CoronaDbResult<Self> {
        debug!("config: {config:?}");
        let sources = fetch::load_all(&config).await?;
        Self::from_sources(sources, config)
    }

    /// Build the tables from already fetched sources. This performs no I/O.
    pub fn from_sources(sources: Sources, config: Config) -> CoronaDbResult<Self> {
        let names = reference_names(&sources.entities)?;
        let reconciliation = reconcile(
            &names,
            sources.feed.keys().map(String::as_str),
            &config.aliases.timeseries(),
        );
        let series = SeriesMap::build(reconciliation.apply(sources.feed))?;

        let metadata_aliases = config.aliases.metadata();
        let dataset_count = DatasetCount::count(&sources.metadata, &metadata_aliases)?;
        let metadata = datasets::with_canonical_country(sources.metadata, &metadata_aliases)?;
        let unmatched_metadata = dataset_count.unmatched(&names);
        info!(
            "{} metadata countries, {} mapped onto boundaries, {} left over",
            dataset_count.len(),
            dataset_count.len() - unmatched_metadata.len(),
            unmatched_metadata.len()
        );
        if !unmatched_metadata.is_empty() {
            warn!(
                "Metadata countries without a boundary: {}",
                unmatched_metadata.join(", ")
            );
        }

        let world = WorldTable::build(
            &sources.entities,
            &series,
            &dataset_count,
            Snapshot::from(config.as_of),
        )?;

        Ok(Self {
            report: reconciliation.report().clone(),
            config,
            world,
            series,
            metadata,
            unmatched_metadata,
        })
    }

    /// Case series for the selected countries; an empty selection means the whole world
    pub fn selection_series(
        &self,
        countries: Vec<String>,
    ) -> CoronaDbResult<Cow<'_, [Observation]>> {
        self.series.select(&Selection::from_countries(countries))
    }

    /// Metadata rows for the selected countries; an empty selection means every row
    pub fn selection_metadata(&self, countries: Vec<String>) -> CoronaDbResult<DataFrame> {
        Ok(datasets::filter_metadata(
            &self.metadata,
            &Selection::from_countries(countries),
        )?)
    }

    /// Snapshot used for the world table
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from(self.config.as_of)
    }
}
