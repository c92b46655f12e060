//! Reconciliation of an external dataset's country names against the canonical names of the
//! boundaries dataset.
//!
//! Matching is exact or through an explicit [`AliasTable`]; there is no approximate matching.
//! Names that cannot be reconciled are dropped, never reported as errors, and are listed in the
//! [`ReconcileReport`] so that alias-table coverage can be audited.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::alias::AliasTable;

/// Counts and leftovers of a reconciliation run
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Raw keys that were already canonical names
    pub exact_matches: usize,
    /// Raw keys reconciled through the alias table
    pub aliased_matches: usize,
    /// Raw keys dropped because neither they nor an alias of theirs is a canonical name
    pub unmapped_raw: Vec<String>,
    /// Aliased raw keys whose canonical name is also claimed by an exact match or an earlier
    /// alias. They stay in the mapping but [`Reconciliation::apply`] keeps the other key's data.
    pub shadowed_aliases: Vec<String>,
    /// Canonical names that no raw key reconciled to
    pub unmapped_reference: Vec<String>,
}

impl ReconcileReport {
    pub fn matched(&self) -> usize {
        self.exact_matches + self.aliased_matches
    }

    /// Every raw key whose data is discarded by [`Reconciliation::apply`]
    pub fn dropped(&self) -> impl Iterator<Item = &str> {
        self.unmapped_raw
            .iter()
            .chain(self.shadowed_aliases.iter())
            .map(String::as_str)
    }
}

/// Result of reconciling a set of raw keys: a mapping from every surviving raw key to its
/// canonical name, plus the diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    mapping: BTreeMap<String, String>,
    report: ReconcileReport,
}

impl Reconciliation {
    pub fn mapping(&self) -> &BTreeMap<String, String> {
        &self.mapping
    }

    pub fn report(&self) -> &ReconcileReport {
        &self.report
    }

    pub fn canonical(&self, raw_key: &str) -> Option<&str> {
        self.mapping.get(raw_key).map(String::as_str)
    }

    /// Re-key a raw dataset by canonical name, discarding entries that did not reconcile.
    ///
    /// When several raw keys share a canonical name the exact match wins, then the first alias
    /// in name order; the other entries are discarded.
    pub fn apply<T>(&self, raw: BTreeMap<String, T>) -> BTreeMap<String, T> {
        raw.into_iter()
            .filter(|(key, _)| {
                let shadowed = self.report.shadowed_aliases.contains(key);
                if shadowed {
                    debug!("Discarding '{key}', its canonical name is taken by another key");
                }
                !shadowed
            })
            .filter_map(|(key, value)| self.canonical(&key).map(|c| (c.to_string(), value)))
            .collect()
    }
}

/// Map each raw key onto a reference name.
///
/// Raw keys found in `reference_names` map to themselves. Any other raw key is looked up in
/// `aliases` and maps to the alias target when that target is a reference name. Everything else
/// is dropped. Aliased keys whose target is also reached by an exact match or an earlier alias
/// are kept in the mapping and listed in [`ReconcileReport::shadowed_aliases`].
pub fn reconcile<'a, I>(
    reference_names: &BTreeSet<String>,
    raw_keys: I,
    aliases: &AliasTable,
) -> Reconciliation
where
    I: IntoIterator<Item = &'a str>,
{
    let raw_keys: BTreeSet<&str> = raw_keys.into_iter().collect();
    let mut mapping: BTreeMap<String, String> = BTreeMap::new();
    let mut report = ReconcileReport::default();

    for key in raw_keys.iter().filter(|k| reference_names.contains(**k)) {
        mapping.insert(key.to_string(), key.to_string());
        report.exact_matches += 1;
    }
    let mut claimed: BTreeSet<String> = mapping.values().cloned().collect();

    for key in raw_keys.iter().filter(|k| !reference_names.contains(**k)) {
        match aliases.resolve(key) {
            Some(target) if !reference_names.contains(target) => {
                warn!("Alias target '{target}' for '{key}' is not a reference name, dropping");
                report.unmapped_raw.push(key.to_string());
            }
            Some(target) => {
                debug!("Remapped key: '{key}' to key: '{target}'");
                if !claimed.insert(target.to_string()) {
                    warn!("'{key}' aliases to '{target}' which is already mapped");
                    report.shadowed_aliases.push(key.to_string());
                }
                mapping.insert(key.to_string(), target.to_string());
                report.aliased_matches += 1;
            }
            None => {
                debug!("No reference name for '{key}', dropping");
                report.unmapped_raw.push(key.to_string());
            }
        }
    }

    report.unmapped_reference = reference_names
        .iter()
        .filter(|name| !claimed.contains(*name))
        .cloned()
        .collect();

    info!(
        "Reconciled {} of {} keys ({} exact, {} aliased), {} dropped, {} reference names unmatched",
        report.matched(),
        raw_keys.len(),
        report.exact_matches,
        report.aliased_matches,
        report.unmapped_raw.len() + report.shadowed_aliases.len(),
        report.unmapped_reference.len()
    );

    Reconciliation { mapping, report }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn aliases_reconcile_to_reference_names() {
        let reference = names(&["United States of America", "Vietnam"]);
        let aliases = AliasTable::from_pairs([
            ("US", "United States of America"),
            ("Viet Nam", "Vietnam"),
        ]);
        let result = reconcile(&reference, ["US", "Viet Nam"], &aliases);

        let expected: BTreeMap<String, String> = [
            ("US".to_string(), "United States of America".to_string()),
            ("Viet Nam".to_string(), "Vietnam".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(result.mapping(), &expected);
        assert_eq!(result.report().exact_matches, 0);
        assert_eq!(result.report().aliased_matches, 2);
        assert!(result.report().unmapped_reference.is_empty());
    }

    #[test]
    fn exact_matches_map_to_themselves() {
        let reference = names(&["Norway", "Sweden", "Denmark"]);
        let result = reconcile(&reference, ["Norway", "Sweden"], &AliasTable::default());
        assert_eq!(result.canonical("Norway"), Some("Norway"));
        assert_eq!(result.canonical("Sweden"), Some("Sweden"));
        assert_eq!(result.report().exact_matches, 2);
        assert_eq!(result.report().unmapped_reference, vec!["Denmark".to_string()]);
    }

    #[test]
    fn unknown_keys_are_dropped_and_reported() {
        let reference = names(&["Norway"]);
        let result = reconcile(
            &reference,
            ["Norway", "Diamond Princess", "MS Zaandam"],
            &AliasTable::timeseries_default(),
        );
        assert_eq!(result.mapping().len(), 1);
        assert_eq!(result.canonical("Diamond Princess"), None);
        assert_eq!(
            result.report().unmapped_raw,
            vec!["Diamond Princess".to_string(), "MS Zaandam".to_string()]
        );
    }

    #[test]
    fn alias_to_non_reference_name_is_dropped() {
        let reference = names(&["Vietnam"]);
        let aliases = AliasTable::from_pairs([("Burma", "Myanmar")]);
        let result = reconcile(&reference, ["Burma"], &aliases);
        assert!(result.mapping().is_empty());
        assert_eq!(result.report().unmapped_raw, vec!["Burma".to_string()]);
    }

    #[test]
    fn alias_is_mapped_even_when_exact_match_exists() {
        let reference = names(&["United States of America"]);
        let aliases = AliasTable::from_pairs([("US", "United States of America")]);
        let result = reconcile(&reference, ["US", "United States of America"], &aliases);
        assert_eq!(
            result.canonical("United States of America"),
            Some("United States of America")
        );
        assert_eq!(result.canonical("US"), Some("United States of America"));
        assert_eq!(result.report().exact_matches, 1);
        assert_eq!(result.report().aliased_matches, 1);
        assert_eq!(result.report().shadowed_aliases, vec!["US".to_string()]);
        assert_eq!(result.report().dropped().collect::<Vec<_>>(), vec!["US"]);
    }

    #[test]
    fn apply_prefers_exact_match_on_shared_canonical_name() {
        let reference = names(&["United States of America"]);
        let aliases = AliasTable::from_pairs([("US", "United States of America")]);
        let result = reconcile(&reference, ["US", "United States of America"], &aliases);
        let raw: BTreeMap<String, u32> = [
            ("US".to_string(), 1),
            ("United States of America".to_string(), 2),
        ]
        .into_iter()
        .collect();
        let rekeyed = result.apply(raw);
        assert_eq!(rekeyed.len(), 1);
        assert_eq!(rekeyed.get("United States of America"), Some(&2));
    }

    #[test]
    fn apply_rekeys_by_canonical_name() {
        let reference = names(&["South Korea", "Norway"]);
        let result = reconcile(
            &reference,
            ["Korea, South", "Norway", "Atlantis"],
            &AliasTable::timeseries_default(),
        );
        let raw: BTreeMap<String, u32> = [
            ("Korea, South".to_string(), 1),
            ("Norway".to_string(), 2),
            ("Atlantis".to_string(), 3),
        ]
        .into_iter()
        .collect();
        let rekeyed = result.apply(raw);
        assert_eq!(rekeyed.get("South Korea"), Some(&1));
        assert_eq!(rekeyed.get("Norway"), Some(&2));
        assert_eq!(rekeyed.len(), 2);
    }
}
