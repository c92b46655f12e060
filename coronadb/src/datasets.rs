//! Sequence metadata table: parsing, canonical country names, dataset counts per country and the
//! filtered table view.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;

use log::{debug, info};
use polars::prelude::*;

use crate::alias::AliasTable;
use crate::error::{CoronaDbError, CoronaDbResult};
use crate::series::Selection;
use crate::COL;

/// Parse the tab-separated metadata table. Every column is read as text.
pub fn read_metadata_tsv(bytes: Vec<u8>) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_parse_options(CsvParseOptions::default().with_separator(b'\t'))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
}

fn isolation_countries(metadata: &DataFrame) -> CoronaDbResult<&StringChunked> {
    let column = metadata
        .column(COL::ISOLATION_COUNTRY)
        .map_err(|_| CoronaDbError::MissingField {
            field: COL::ISOLATION_COUNTRY.into(),
            context: "metadata table".into(),
        })?;
    Ok(column.str()?)
}

/// Canonical country of every metadata row, `None` where the row has no isolation country
fn canonical_countries(
    metadata: &DataFrame,
    aliases: &AliasTable,
) -> CoronaDbResult<Vec<Option<String>>> {
    Ok(isolation_countries(metadata)?
        .into_iter()
        .map(|country| {
            country
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(|c| aliases.canonicalize(c).to_string())
        })
        .collect())
}

/// Add a [`COL::COUNTRY`] column holding the canonical spelling of `isolation_country`
pub fn with_canonical_country(
    mut metadata: DataFrame,
    aliases: &AliasTable,
) -> CoronaDbResult<DataFrame> {
    let countries = canonical_countries(&metadata, aliases)?;
    metadata.with_column(Series::new(COL::COUNTRY, countries))?;
    Ok(metadata)
}

/// Metadata rows for a selection of canonical countries, sorted by isolation country. The world
/// selection keeps every row. Expects the [`COL::COUNTRY`] column added by
/// [`with_canonical_country`].
pub fn filter_metadata(metadata: &DataFrame, selection: &Selection) -> PolarsResult<DataFrame> {
    let df = match selection {
        Selection::World => metadata.clone(),
        Selection::Countries(countries) => {
            let countries = Series::new("countries", countries.iter().cloned().collect::<Vec<_>>());
            metadata
                .clone()
                .lazy()
                .filter(col(COL::COUNTRY).is_in(lit(countries)))
                .collect()?
        }
    };
    df.sort(
        [COL::ISOLATION_COUNTRY],
        SortMultipleOptions::default().with_maintain_order(true),
    )
}

/// Number of metadata records per canonical country name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetCount(BTreeMap<String, u32>);

impl DatasetCount {
    /// Count metadata rows per country after resolving each `isolation_country` through the alias
    /// table. Rows without an isolation country are not counted.
    pub fn count(metadata: &DataFrame, aliases: &AliasTable) -> CoronaDbResult<Self> {
        let mut counts: BTreeMap<String, u32> = BTreeMap::new();
        let mut unknown = 0;
        for country in canonical_countries(metadata, aliases)? {
            match country {
                Some(country) => *counts.entry(country).or_insert(0) += 1,
                None => unknown += 1,
            }
        }
        if unknown > 0 {
            debug!("{unknown} metadata rows have no isolation country");
        }
        info!(
            "Counted {} datasets over {} countries",
            counts.values().sum::<u32>(),
            counts.len()
        );
        Ok(Self(counts))
    }

    /// Countries with records that are not reference names. Their counts never reach the world
    /// table, so a non-empty result points at a gap in the metadata alias table.
    pub fn unmatched(&self, reference_names: &BTreeSet<String>) -> Vec<String> {
        self.0
            .keys()
            .filter(|country| !reference_names.contains(*country))
            .cloned()
            .collect()
    }

    /// Dataset count for a canonical name, zero if the country has no records
    pub fn get(&self, country: &str) -> u32 {
        self.0.get(country).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use nonempty::nonempty;

    use super::*;

    fn metadata() -> DataFrame {
        df!(
            COL::CDB_ID => &["1", "2", "3", "4", "5", "6"],
            COL::ISOLATION_COUNTRY => &[
                Some("USA"),
                Some("Viet Nam"),
                Some("United States of America"),
                Some("Norway"),
                None,
                Some("USA"),
            ],
            COL::GENBANK_ACCESSION => &["MN1", "MN2", "MN3", "MN4", "MN5", "MN6"],
        )
        .unwrap()
    }

    #[test]
    fn counts_use_canonical_names() {
        let counts = DatasetCount::count(&metadata(), &AliasTable::metadata_default()).unwrap();
        assert_eq!(counts.get("United States of America"), 3);
        assert_eq!(counts.get("Vietnam"), 1);
        assert_eq!(counts.get("Norway"), 1);
        assert_eq!(counts.get("USA"), 0);
        assert_eq!(counts.get("Sweden"), 0);
        assert_eq!(counts.len(), 3);
    }

    #[test]
    fn unaliased_countries_are_unmatched() {
        let df = df!(
            COL::ISOLATION_COUNTRY => &["USA", "Hong Kong", "Norway", "Hong Kong"],
        )
        .unwrap();
        let counts = DatasetCount::count(&df, &AliasTable::metadata_default()).unwrap();
        let reference: BTreeSet<String> = ["United States of America", "Norway", "Sweden"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(counts.unmatched(&reference), vec!["Hong Kong".to_string()]);
        assert_eq!(counts.get("Hong Kong"), 2);
    }

    #[test]
    fn aliases_are_not_chained() {
        let aliases = AliasTable::from_pairs([("USA", "America"), ("America", "Elsewhere")]);
        let counts = DatasetCount::count(&metadata(), &aliases).unwrap();
        assert_eq!(counts.get("America"), 2);
        assert_eq!(counts.get("Elsewhere"), 0);
    }

    #[test]
    fn missing_country_column_is_reported() {
        let df = df!(COL::CDB_ID => &["1"]).unwrap();
        assert!(matches!(
            DatasetCount::count(&df, &AliasTable::default()),
            Err(CoronaDbError::MissingField { field, .. }) if field == COL::ISOLATION_COUNTRY
        ));
    }

    #[test]
    fn metadata_is_filtered_by_canonical_country() {
        let df = with_canonical_country(metadata(), &AliasTable::metadata_default()).unwrap();
        let selection = Selection::Countries(nonempty!["United States of America".to_string()]);
        let filtered = filter_metadata(&df, &selection).unwrap();
        assert_eq!(filtered.height(), 3);
        let ids: Vec<Option<&str>> = filtered
            .column(COL::ISOLATION_COUNTRY)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(
            ids,
            vec![
                Some("USA"),
                Some("USA"),
                Some("United States of America")
            ]
        );

        let all = filter_metadata(&df, &Selection::World).unwrap();
        assert_eq!(all.height(), 6);
    }

    #[test]
    fn tsv_should_parse_as_text() {
        let tsv = "cdb_id\tisolation_country\tgenbank_accession\n\
                   0001\tUSA\tMN908947\n\
                   0002\tViet Nam\tMT192772\n";
        let df = read_metadata_tsv(tsv.as_bytes().to_vec()).unwrap();
        assert_eq!(df.shape(), (2, 3));
        let first_id = df.column(COL::CDB_ID).unwrap().str().unwrap().get(0);
        assert_eq!(first_id, Some("0001"));
    }
}
