//! Per-country case time series and their aggregates.

use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::{debug, info, warn};
use nonempty::NonEmpty;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{CoronaDbError, CoronaDbResult};
use crate::COL;

/// Name of the synthetic series summing every country
pub const WORLD: &str = "World";

/// Expected calendar format of the `date` field in the case feed
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One record of the raw case feed, before validation
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct RawObservation {
    pub date: Option<String>,
    pub confirmed: Option<i64>,
    pub deaths: Option<i64>,
    pub recovered: Option<i64>,
}

/// Raw case feed keyed by the feed's own country spelling
pub type RawFeed = BTreeMap<String, Vec<RawObservation>>;

/// Cumulative case counts for one country on one day
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub date: NaiveDate,
    pub confirmed: i64,
    pub deaths: i64,
    pub recovered: i64,
}

impl Observation {
    pub fn zero(date: NaiveDate) -> Self {
        Self {
            date,
            confirmed: 0,
            deaths: 0,
            recovered: 0,
        }
    }

    fn add_counts(&mut self, other: &Observation) {
        self.confirmed += other.confirmed;
        self.deaths += other.deaths;
        self.recovered += other.recovered;
    }

    fn from_raw(country: &str, index: usize, raw: &RawObservation) -> CoronaDbResult<Self> {
        let missing = |field: &str| CoronaDbError::MissingField {
            field: field.into(),
            context: format!("observation {index} for '{country}'"),
        };
        let date_str = raw.date.as_deref().ok_or_else(|| missing(COL::DATE))?;
        let date = NaiveDate::parse_from_str(date_str, DATE_FORMAT).map_err(|e| {
            CoronaDbError::DataFormat {
                country: country.into(),
                index,
                reason: format!("invalid date '{date_str}': {e}"),
            }
        })?;
        Ok(Self {
            date,
            confirmed: raw.confirmed.ok_or_else(|| missing(COL::CONFIRMED))?,
            deaths: raw.deaths.ok_or_else(|| missing(COL::DEATHS))?,
            recovered: raw.recovered.ok_or_else(|| missing(COL::RECOVERED))?,
        })
    }
}

/// Which observation counts as "current" when taking a snapshot of the series
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Snapshot {
    /// The last observation of each series
    #[default]
    Latest,
    /// The last observation dated on or before the given day
    AsOf(NaiveDate),
}

impl From<Option<NaiveDate>> for Snapshot {
    fn from(value: Option<NaiveDate>) -> Self {
        value.map(Snapshot::AsOf).unwrap_or_default()
    }
}

/// A set of countries picked by the user. Nothing selected means the whole world.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    World,
    Countries(NonEmpty<String>),
}

impl Selection {
    pub fn from_countries(countries: Vec<String>) -> Self {
        if countries.iter().any(|c| c == WORLD) {
            return Selection::World;
        }
        NonEmpty::from_vec(countries)
            .map(Selection::Countries)
            .unwrap_or(Selection::World)
    }

    pub fn countries(&self) -> Vec<&str> {
        match self {
            Selection::World => vec![WORLD],
            Selection::Countries(countries) => countries.iter().map(String::as_str).collect(),
        }
    }
}

/// Sum the counts of several series day by day. Days missing from a series count as zero for
/// that series.
fn sum_by_date<'a, I>(series: I) -> Vec<Observation>
where
    I: IntoIterator<Item = &'a [Observation]>,
{
    let mut totals: BTreeMap<NaiveDate, Observation> = BTreeMap::new();
    for observations in series {
        for obs in observations {
            totals
                .entry(obs.date)
                .or_insert_with(|| Observation::zero(obs.date))
                .add_counts(obs);
        }
    }
    totals.into_values().collect()
}

/// Ordered daily observations per country, plus the synthetic [`WORLD`] series.
///
/// A `SeriesMap` is immutable once built; every query borrows it, so repeated or interleaved
/// queries always agree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SeriesMap(BTreeMap<String, Vec<Observation>>);

impl SeriesMap {
    /// Validate a feed already keyed by canonical name and derive the world series.
    ///
    /// Any missing field, unparsable date or non-increasing date aborts the whole build.
    pub fn build(raw: RawFeed) -> CoronaDbResult<Self> {
        let mut series: BTreeMap<String, Vec<Observation>> = BTreeMap::new();
        for (country, raw_observations) in raw {
            if country == WORLD {
                warn!("Feed already contains a '{WORLD}' series, it will be replaced");
                continue;
            }
            let observations = raw_observations
                .iter()
                .enumerate()
                .map(|(idx, raw)| Observation::from_raw(&country, idx, raw))
                .collect::<CoronaDbResult<Vec<_>>>()?;
            if let Some(idx) = observations
                .windows(2)
                .position(|pair| pair[0].date >= pair[1].date)
            {
                return Err(CoronaDbError::DataFormat {
                    country,
                    index: idx + 1,
                    reason: format!(
                        "date {} does not follow {}",
                        observations[idx + 1].date,
                        observations[idx].date
                    ),
                });
            }
            debug!("Loaded {} observations for '{country}'", observations.len());
            series.insert(country, observations);
        }

        let world = sum_by_date(series.values().map(Vec::as_slice));
        info!(
            "Built series for {} countries over {} days",
            series.len(),
            world.len()
        );
        series.insert(WORLD.to_string(), world);
        Ok(Self(series))
    }

    pub fn get(&self, country: &str) -> Option<&[Observation]> {
        self.0.get(country).map(Vec::as_slice)
    }

    /// Country names, including [`WORLD`]
    pub fn countries(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Last observation of a country, `None` if the country is unknown or has no observations
    pub fn latest(&self, country: &str) -> Option<&Observation> {
        self.0.get(country).and_then(|series| series.last())
    }

    /// Observation of a country at the given snapshot
    pub fn at(&self, country: &str, snapshot: Snapshot) -> Option<&Observation> {
        match snapshot {
            Snapshot::Latest => self.latest(country),
            Snapshot::AsOf(date) => self
                .0
                .get(country)
                .and_then(|series| series.iter().rev().find(|obs| obs.date <= date)),
        }
    }

    /// Snapshot observation for every real country, i.e. excluding [`WORLD`]
    pub fn snapshot(&self, snapshot: Snapshot) -> BTreeMap<&str, &Observation> {
        self.countries()
            .filter(|country| *country != WORLD)
            .filter_map(|country| self.at(country, snapshot).map(|obs| (country, obs)))
            .collect()
    }

    /// Most recent day covered by the feed
    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.latest(WORLD).map(|obs| obs.date)
    }

    /// Series for a list of countries: the country's own series if a single country is given,
    /// otherwise the day-by-day sum. An empty list yields the world series.
    pub fn aggregate<S: AsRef<str>>(
        &self,
        countries: &[S],
    ) -> CoronaDbResult<Cow<'_, [Observation]>> {
        let lookup = |country: &str| {
            self.get(country)
                .ok_or_else(|| CoronaDbError::UnknownCountry(country.to_string()))
        };
        match countries {
            [] => Ok(Cow::Borrowed(lookup(WORLD)?)),
            [country] => Ok(Cow::Borrowed(lookup(country.as_ref())?)),
            _ => {
                let series = countries
                    .iter()
                    .map(|c| lookup(c.as_ref()))
                    .collect::<CoronaDbResult<Vec<_>>>()?;
                Ok(Cow::Owned(sum_by_date(series)))
            }
        }
    }

    pub fn select(&self, selection: &Selection) -> CoronaDbResult<Cow<'_, [Observation]>> {
        self.aggregate(&selection.countries())
    }

    /// Columnar form of a series for plotting
    pub fn to_dataframe(series: &[Observation]) -> PolarsResult<DataFrame> {
        let dates = DateChunked::from_naive_date(COL::DATE, series.iter().map(|obs| obs.date));
        DataFrame::new(vec![
            dates.into_series(),
            Series::new(
                COL::CONFIRMED,
                series.iter().map(|obs| obs.confirmed).collect::<Vec<_>>(),
            ),
            Series::new(
                COL::DEATHS,
                series.iter().map(|obs| obs.deaths).collect::<Vec<_>>(),
            ),
            Series::new(
                COL::RECOVERED,
                series.iter().map(|obs| obs.recovered).collect::<Vec<_>>(),
            ),
        ])
    }
}
