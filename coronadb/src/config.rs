use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::alias::AliasTable;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Daily case counts per country, as a JSON object of arrays
    pub timeseries_url: String,
    /// Tab-separated sequence metadata table
    pub metadata_url: String,
    /// GeoJSON feature collection of country boundaries
    pub boundaries_url: String,
    /// Feature property holding the canonical country name
    pub boundaries_name_property: String,
    /// Snapshot date for the world table; the latest observation is used when unset
    pub as_of: Option<NaiveDate>,
    pub aliases: AliasConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            timeseries_url: "https://pomber.github.io/covid19/timeseries.json".into(),
            metadata_url: "https://s1.sfb.uit.no/public/mar/SarsCoV2DB/Metadatabase/current.tsv"
                .into(),
            boundaries_url: "https://raw.githubusercontent.com/nvkelso/natural-earth-vector/master/geojson/ne_110m_admin_0_countries.geojson".into(),
            boundaries_name_property: "NAME".into(),
            as_of: None,
            aliases: AliasConfig::default(),
        }
    }
}

/// Alias tables to use in place of the built-in ones
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct AliasConfig {
    pub timeseries: Option<AliasTable>,
    pub metadata: Option<AliasTable>,
}

impl AliasConfig {
    pub fn timeseries(&self) -> AliasTable {
        self.timeseries
            .clone()
            .unwrap_or_else(AliasTable::timeseries_default)
    }

    pub fn metadata(&self) -> AliasTable {
        self.metadata
            .clone()
            .unwrap_or_else(AliasTable::metadata_default)
    }
}
