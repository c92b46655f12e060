//! This module stores the column names used when the core tables are exposed as dataframes, and the
//! column names expected in the upstream metadata table. Note that the metadata names must be kept
//! in sync with the published metadata database!

pub const COUNTRY: &str = "country";
pub const FLAGS: &str = "flags";
pub const GEOMETRY: &str = "geometry";

pub const DATE: &str = "date";
pub const CONFIRMED: &str = "confirmed";
pub const RECOVERED: &str = "recovered";
pub const DEATHS: &str = "deaths";

pub const DATASETS: &str = "datasets";

pub const ISOLATION_COUNTRY: &str = "isolation_country";
pub const CDB_ID: &str = "cdb_id";
pub const GENBANK_ACCESSION: &str = "genbank_accession";
