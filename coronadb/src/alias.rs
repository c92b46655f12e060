//! Hand-curated alias tables mapping an external dataset's spelling of a country name to the
//! canonical spelling used by the boundaries dataset.

use std::collections::BTreeMap;

use itertools::Itertools;
use log::warn;
use serde::{Deserialize, Serialize};

/// Mapping from an external spelling to a canonical country name.
///
/// Keys are unique: inserting a key twice keeps the later target. A canonical name should
/// receive at most one alias per source dataset; tables that break this are still accepted but
/// the offending targets are reported by [`AliasTable::duplicate_targets`].
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct AliasTable(BTreeMap<String, String>);

impl AliasTable {
    /// Aliases from the Johns Hopkins case time series to the boundaries dataset
    pub fn timeseries_default() -> Self {
        Self::from_pairs([
            ("Bosnia and Herzegovina", "Bosnia and Herz."),
            ("Central African Republic", "Central African Rep."),
            ("Congo (Brazzaville)", "Congo"),
            ("Congo (Kinshasa)", "Dem. Rep. Congo"),
            ("Cote d'Ivoire", "Côte d'Ivoire"),
            ("Dominican Republic", "Dominican Rep."),
            ("Equatorial Guinea", "Eq. Guinea"),
            ("Korea, South", "South Korea"),
            ("North Macedonia", "Macedonia"),
            ("Taiwan*", "Taiwan"),
            ("US", "United States of America"),
        ])
    }

    /// Aliases from the sequence metadata table's `isolation_country` to the boundaries dataset
    pub fn metadata_default() -> Self {
        Self::from_pairs([
            ("USA", "United States of America"),
            ("Viet Nam", "Vietnam"),
        ])
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut table = BTreeMap::new();
        for (alias, canonical) in pairs {
            let alias = alias.into();
            let canonical = canonical.into();
            if let Some(previous) = table.insert(alias.clone(), canonical.clone()) {
                warn!("Alias '{alias}' redefined: '{previous}' replaced by '{canonical}'");
            }
        }
        let table = Self(table);
        for (canonical, aliases) in table.duplicate_targets() {
            warn!(
                "Canonical name '{canonical}' is the target of several aliases: {}",
                aliases.join(", ")
            );
        }
        table
    }

    /// Canonical name for an alias, if the alias is known
    pub fn resolve(&self, alias: &str) -> Option<&str> {
        self.0.get(alias).map(String::as_str)
    }

    /// Resolve the alias if known, otherwise return the value untouched. This is a single lookup
    /// on the original value, so the target of one alias is never rewritten by another.
    pub fn canonicalize<'a>(&'a self, value: &'a str) -> &'a str {
        self.resolve(value).unwrap_or(value)
    }

    /// Canonical names targeted by more than one alias, along with those aliases
    pub fn duplicate_targets(&self) -> Vec<(String, Vec<String>)> {
        self.0
            .iter()
            .map(|(alias, canonical)| (canonical.clone(), alias.clone()))
            .into_group_map()
            .into_iter()
            .filter(|(_, aliases)| aliases.len() > 1)
            .map(|(canonical, aliases)| (canonical, aliases.into_iter().sorted().collect()))
            .sorted()
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
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
    use super::*;

    #[test]
    fn default_tables_have_no_duplicate_targets() {
        assert!(AliasTable::timeseries_default().duplicate_targets().is_empty());
        assert!(AliasTable::metadata_default().duplicate_targets().is_empty());
    }

    #[test]
    fn later_alias_overwrites_earlier() {
        let table = AliasTable::from_pairs([("US", "USA"), ("US", "United States of America")]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.resolve("US"), Some("United States of America"));
    }

    #[test]
    fn duplicate_targets_are_reported() {
        let table = AliasTable::from_pairs([
            ("US", "United States of America"),
            ("USA", "United States of America"),
            ("Viet Nam", "Vietnam"),
        ]);
        assert_eq!(
            table.duplicate_targets(),
            vec![(
                "United States of America".to_string(),
                vec!["US".to_string(), "USA".to_string()]
            )]
        );
    }

    #[test]
    fn canonicalize_never_chains() {
        // "A" -> "B" and "B" -> "C": looking up "A" must stop at "B"
        let table = AliasTable::from_pairs([("A", "B"), ("B", "C")]);
        assert_eq!(table.canonicalize("A"), "B");
        assert_eq!(table.canonicalize("B"), "C");
        assert_eq!(table.canonicalize("Norway"), "Norway");
    }

    #[test]
    fn alias_table_should_deserialize_from_toml_like_json() {
        let table: AliasTable =
            serde_json::from_str(r#"{"Viet Nam": "Vietnam", "USA": "United States of America"}"#)
                .unwrap();
        assert_eq!(table, AliasTable::metadata_default());
    }
}
