//! The per-country world table: boundaries joined with the case snapshot and dataset counts.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use geo::Geometry;
use geojson::{FeatureCollection, GeoJson};
use log::{debug, info};
use polars::prelude::*;
use wkt::ToWkt;

use crate::datasets::DatasetCount;
use crate::error::{CoronaDbError, CoronaDbResult};
use crate::series::{Observation, SeriesMap, Snapshot};
use crate::COL;

/// Entities of the boundaries dataset that are not countries and never appear in the table
pub const EXCLUDED_ENTITIES: &[&str] = &["Antarctica"];

/// One entity of the boundaries dataset. The geometry is only carried through to the output.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceEntity {
    pub name: String,
    pub geometry: Option<Geometry<f64>>,
}

impl ReferenceEntity {
    pub fn new(name: impl Into<String>, geometry: Option<Geometry<f64>>) -> Self {
        Self {
            name: name.into(),
            geometry,
        }
    }
}

/// Read reference entities from a GeoJSON feature collection, taking each canonical name from
/// the `name_property` of the feature.
pub fn reference_entities_from_geojson(
    geojson: &str,
    name_property: &str,
) -> CoronaDbResult<Vec<ReferenceEntity>> {
    let geojson: GeoJson = geojson.parse()?;
    let collection = FeatureCollection::try_from(geojson)?;
    let entities = collection
        .features
        .into_iter()
        .enumerate()
        .map(|(idx, feature)| {
            let name = feature
                .property(name_property)
                .and_then(|value| value.as_str())
                .ok_or_else(|| CoronaDbError::MissingField {
                    field: name_property.into(),
                    context: format!("boundary feature {idx}"),
                })?
                .to_string();
            let geometry = feature.geometry.map(Geometry::try_from).transpose()?;
            Ok(ReferenceEntity { name, geometry })
        })
        .collect::<CoronaDbResult<Vec<_>>>()?;
    info!("Loaded {} reference entities", entities.len());
    Ok(entities)
}

/// Canonical names of the reference entities, which must be unique
pub fn reference_names(entities: &[ReferenceEntity]) -> CoronaDbResult<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    for entity in entities {
        if !names.insert(entity.name.clone()) {
            return Err(CoronaDbError::DuplicateReferenceName(entity.name.clone()));
        }
    }
    Ok(names)
}

/// Display-safe identifier of a country: the name with spaces replaced by hyphens
pub fn flag_id(country: &str) -> String {
    country.replace(' ', "-")
}

fn is_excluded(country: &str) -> bool {
    EXCLUDED_ENTITIES.contains(&country)
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorldRow {
    pub country: String,
    pub flags: String,
    pub geometry: Option<Geometry<f64>>,
    /// Case snapshot, `None` if the country has no case data
    pub latest: Option<Observation>,
    pub datasets: u32,
}

impl WorldRow {
    fn new(
        country: &str,
        geometry: Option<Geometry<f64>>,
        latest: Option<&Observation>,
        datasets: &DatasetCount,
    ) -> Self {
        Self {
            country: country.to_string(),
            flags: flag_id(country),
            geometry,
            latest: latest.copied(),
            datasets: datasets.get(country),
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.latest.map(|obs| obs.date)
    }

    pub fn confirmed(&self) -> Option<i64> {
        self.latest.map(|obs| obs.confirmed)
    }

    pub fn recovered(&self) -> Option<i64> {
        self.latest.map(|obs| obs.recovered)
    }

    pub fn deaths(&self) -> Option<i64> {
        self.latest.map(|obs| obs.deaths)
    }
}

/// One row per country, keyed by canonical name
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorldTable {
    rows: Vec<WorldRow>,
}

impl WorldTable {
    /// Outer join of the reference entities with the case snapshot, left joined with the dataset
    /// counts.
    ///
    /// Rows follow the reference entity order; countries with case data but no reference entity
    /// come last, sorted by name. Excluded entities are dropped from both sides.
    pub fn build(
        entities: &[ReferenceEntity],
        series: &SeriesMap,
        datasets: &DatasetCount,
        snapshot: Snapshot,
    ) -> CoronaDbResult<Self> {
        let names = reference_names(entities)?;
        let mut cases: BTreeMap<&str, &Observation> = series.snapshot(snapshot);

        let mut rows: Vec<WorldRow> = entities
            .iter()
            .filter(|entity| !is_excluded(&entity.name))
            .map(|entity| {
                let latest = cases.remove(entity.name.as_str());
                WorldRow::new(&entity.name, entity.geometry.clone(), latest, datasets)
            })
            .collect();

        let unmatched: Vec<WorldRow> = cases
            .into_iter()
            .filter(|(country, _)| !is_excluded(country) && !names.contains(*country))
            .map(|(country, latest)| {
                debug!("'{country}' has case data but no boundaries");
                WorldRow::new(country, None, Some(latest), datasets)
            })
            .collect();
        rows.extend(unmatched);

        info!(
            "Built world table with {} rows, {} with case data",
            rows.len(),
            rows.iter().filter(|row| row.latest.is_some()).count()
        );
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[WorldRow] {
        &self.rows
    }

    pub fn get(&self, country: &str) -> Option<&WorldRow> {
        self.rows.iter().find(|row| row.country == country)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Columnar form of the table, with geometries encoded as WKT in [`COL::GEOMETRY`]
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let rows = &self.rows;
        let dates = DateChunked::from_naive_date_options(COL::DATE, rows.iter().map(WorldRow::date));
        DataFrame::new(vec![
            Series::new(
                COL::COUNTRY,
                rows.iter().map(|r| r.country.as_str()).collect::<Vec<_>>(),
            ),
            Series::new(
                COL::FLAGS,
                rows.iter().map(|r| r.flags.as_str()).collect::<Vec<_>>(),
            ),
            dates.into_series(),
            Series::new(
                COL::CONFIRMED,
                rows.iter().map(WorldRow::confirmed).collect::<Vec<_>>(),
            ),
            Series::new(
                COL::RECOVERED,
                rows.iter().map(WorldRow::recovered).collect::<Vec<_>>(),
            ),
            Series::new(
                COL::DEATHS,
                rows.iter().map(WorldRow::deaths).collect::<Vec<_>>(),
            ),
            Series::new(
                COL::DATASETS,
                rows.iter().map(|r| r.datasets).collect::<Vec<_>>(),
            ),
            Series::new(
                COL::GEOMETRY,
                rows.iter()
                    .map(|r| r.geometry.as_ref().map(|g| g.wkt_string()))
                    .collect::<Vec<_>>(),
            ),
        ])
    }
}
