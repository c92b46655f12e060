use std::{fs::File, path::Path};

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use coronadb::{
    alias::AliasTable,
    config::Config,
    formatters::{
        CSVFormatter, GeoJSONFormatter, GeoJSONSeqFormatter, OutputFormatter, OutputGenerator,
    },
    series::SeriesMap,
    CoronaDb,
};
use enum_dispatch::enum_dispatch;
use log::{debug, info};
use polars::frame::DataFrame;
use serde::{Deserialize, Serialize};
use spinners::{Spinner, Spinners};
use strum_macros::EnumString;

use crate::display::{display_metadata, display_report, display_world};
use crate::error::CoronaDbCliResult;

const DEFAULT_PROGRESS_SPINNER: Spinners = Spinners::Dots;
const COMPLETE_PROGRESS_STRING: &str = "✔";
const RUNNING_TAIL_STRING: &str = "...";
const DOWNLOADING_STRING: &str = "Downloading case series, boundaries and metadata";

/// Defines the output formats we are able to produce data in.
#[derive(Clone, Debug, Deserialize, Serialize, EnumString, PartialEq, Eq)]
#[strum(ascii_case_insensitive)]
pub enum OutputFormat {
    GeoJSON,
    GeoJSONSeq,
    Csv,
    Stdout,
}

impl From<&OutputFormat> for OutputFormatter {
    fn from(value: &OutputFormat) -> Self {
        match value {
            OutputFormat::GeoJSON => OutputFormatter::GeoJSON(GeoJSONFormatter),
            OutputFormat::GeoJSONSeq => OutputFormatter::GeoJSONSeq(GeoJSONSeqFormatter),
            OutputFormat::Csv | OutputFormat::Stdout => OutputFormatter::Csv(CSVFormatter),
        }
    }
}

fn write_output<T, U>(
    output_generator: T,
    mut data: DataFrame,
    output_file: Option<U>,
) -> CoronaDbCliResult<()>
where
    T: OutputGenerator,
    U: AsRef<Path>,
{
    if let Some(output_file) = output_file {
        let mut f = File::create(output_file).context("Failed to write output")?;
        output_generator.save(&mut f, &mut data)?;
    } else {
        let mut stdout_lock = std::io::stdout().lock();
        output_generator.save(&mut stdout_lock, &mut data)?;
    };
    Ok(())
}

/// Fetch the sources and build the tables, showing a spinner unless `quiet`
async fn load(
    mut config: Config,
    as_of: Option<NaiveDate>,
    quiet: bool,
) -> CoronaDbCliResult<CoronaDb> {
    if as_of.is_some() {
        config.as_of = as_of;
    }
    let sp = (!quiet).then(|| {
        Spinner::with_timer(
            DEFAULT_PROGRESS_SPINNER,
            DOWNLOADING_STRING.to_string() + RUNNING_TAIL_STRING,
        )
    });
    let db = CoronaDb::new_with_config(config).await;
    if let Some(mut s) = sp {
        s.stop_with_symbol(COMPLETE_PROGRESS_STRING);
    }
    Ok(db?)
}

/// Country names as typed by the user may use the spelling of any source. Each name is looked up
/// in the alias tables in order and the first hit wins.
fn canonical_countries(tables: &[AliasTable], countries: &[String]) -> Vec<String> {
    countries
        .iter()
        .map(|c| {
            tables
                .iter()
                .find_map(|aliases| aliases.resolve(c))
                .unwrap_or(c.as_str())
                .to_string()
        })
        .collect()
}

/// Trait that defines what to run when a given subcommand is invoked.
#[enum_dispatch]
pub trait RunCommand {
    async fn run(&self, config: Config) -> CoronaDbCliResult<()>;
}

/// The `world` command outputs one row per country with the latest case counts and the number of
/// available datasets.
#[derive(Args, Debug)]
pub struct WorldCommand {
    #[arg(
        short = 'f',
        long,
        value_name = "geojson|geojsonseq|csv|stdout",
        help = "Output format for the results"
    )]
    output_format: OutputFormat,
    #[arg(short = 'o', long, help = "Output file to place the results")]
    output_file: Option<String>,
    #[arg(long, help = "Use the case counts as of this date (YYYY-MM-DD)")]
    as_of: Option<NaiveDate>,
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for WorldCommand {
    async fn run(&self, config: Config) -> CoronaDbCliResult<()> {
        info!("Running `world` subcommand");
        let db = load(config, self.as_of, self.quiet).await?;
        let data = db.world.to_dataframe()?;
        debug!("{data:#?}");
        let formatter: OutputFormatter = (&self.output_format).into();
        write_output(formatter, data, self.output_file.as_deref())?;
        Ok(())
    }
}

/// The `countries` command prints a summary table of the world table.
#[derive(Args, Debug)]
pub struct CountriesCommand {
    #[arg(long, help = "Maximum number of rows to print")]
    max_results: Option<usize>,
    #[arg(long, help = "Use the case counts as of this date (YYYY-MM-DD)")]
    as_of: Option<NaiveDate>,
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for CountriesCommand {
    async fn run(&self, config: Config) -> CoronaDbCliResult<()> {
        info!("Running `countries` subcommand");
        let db = load(config, self.as_of, self.quiet).await?;
        if let Some(date) = db.series.latest_date() {
            println!("\nCase counts are available up to {date}");
        }
        display_world(&db.world, self.max_results)?;
        Ok(())
    }
}

/// The `series` command outputs the daily case counts summed over the selected countries, or for
/// the whole world when no country is given.
#[derive(Args, Debug)]
pub struct SeriesCommand {
    #[arg(index = 1, help = "Countries to sum over")]
    countries: Vec<String>,
    #[arg(short = 'o', long, help = "Output file to place the results")]
    output_file: Option<String>,
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for SeriesCommand {
    async fn run(&self, config: Config) -> CoronaDbCliResult<()> {
        info!("Running `series` subcommand");
        let countries = canonical_countries(&[config.aliases.timeseries()], &self.countries);
        let db = load(config, None, self.quiet).await?;
        let series = db.selection_series(countries)?;
        let data = SeriesMap::to_dataframe(&series)?;
        write_output(CSVFormatter, data, self.output_file.as_deref())?;
        Ok(())
    }
}

/// The `datasets` command lists the sequence metadata records of the selected countries.
#[derive(Args, Debug)]
pub struct DatasetsCommand {
    #[arg(index = 1, help = "Countries to list records for")]
    countries: Vec<String>,
    #[arg(long, help = "Maximum number of records to print")]
    max_results: Option<usize>,
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for DatasetsCommand {
    async fn run(&self, config: Config) -> CoronaDbCliResult<()> {
        info!("Running `datasets` subcommand");
        let tables = [config.aliases.metadata(), config.aliases.timeseries()];
        let countries = canonical_countries(&tables, &self.countries);
        let db = load(config, None, self.quiet).await?;
        let metadata = db.selection_metadata(countries)?;
        println!("\nFound {} records", metadata.height());
        display_metadata(metadata, self.max_results)?;
        Ok(())
    }
}

/// The `reconcile` command reports how the case feed's country names matched the boundaries.
#[derive(Args, Debug)]
pub struct ReconcileCommand {
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for ReconcileCommand {
    async fn run(&self, config: Config) -> CoronaDbCliResult<()> {
        info!("Running `reconcile` subcommand");
        let aliases = config.aliases.timeseries();
        let db = load(config, None, self.quiet).await?;
        display_report(&db.report, &aliases, &db.unmatched_metadata)?;
        Ok(())
    }
}

/// The entrypoint for the CLI.
#[derive(Parser, Debug)]
#[command(version, about="CoronaDB joins Covid-19 case counts, country boundaries and sequence metadata", long_about = None, name="coronadb")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
    #[arg(
        short = 'q',
        long = "quiet",
        help = "\
            Do not print progress bar to stdout. Results and logs (when `RUST_LOG`\n\
            is set) will still be printed.",
        global = true
    )]
    quiet: bool,
}

/// Commands contains the list of subcommands avaliable for use in the CLI.
/// Each command should implmement the RunCommand trait and specify the list
/// of required args for that command.
#[derive(Subcommand, Debug)]
#[enum_dispatch(RunCommand)]
pub enum Commands {
    /// Output the world table with boundaries, latest case counts and dataset counts
    World(WorldCommand),
    /// Print a summary of the world table
    Countries(CountriesCommand),
    /// Output the daily case counts summed over a selection of countries
    Series(SeriesCommand),
    /// List sequence metadata records for a selection of countries
    Datasets(DatasetsCommand),
    /// Report how country names in the case feed matched the boundaries
    Reconcile(ReconcileCommand),
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use coronadb::{series::Observation, COL};
    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn output_type_should_deserialize_properly() {
        let output_format = OutputFormat::from_str("GeoJSON");
        assert_eq!(
            output_format.unwrap(),
            OutputFormat::GeoJSON,
            "geojson format should be parsed correctly"
        );
        let output_format = OutputFormat::from_str("GeoJson");
        assert_eq!(
            output_format.unwrap(),
            OutputFormat::GeoJSON,
            "parsing should be case insensitive"
        );
        let output_format = OutputFormat::from_str("csv");
        assert_eq!(
            output_format.unwrap(),
            OutputFormat::Csv,
            "correct variants should parse correctly"
        );
        let output_format = OutputFormat::from_str("geoparquet");
        assert!(output_format.is_err(), "non listed formats should fail");
    }

    #[test]
    fn user_countries_are_canonicalized() {
        let config = Config::default();
        let countries = canonical_countries(
            &[config.aliases.timeseries()],
            &["US".to_string(), "Norway".to_string()],
        );
        assert_eq!(countries, vec!["United States of America", "Norway"]);
    }

    #[test]
    fn dataset_countries_accept_metadata_spelling() {
        let config = Config::default();
        let tables = [config.aliases.metadata(), config.aliases.timeseries()];
        let countries = canonical_countries(
            &tables,
            &["USA".to_string(), "US".to_string(), "Viet Nam".to_string()],
        );
        assert_eq!(
            countries,
            vec!["United States of America", "United States of America", "Vietnam"]
        );
    }

    #[test]
    fn series_should_be_written_to_file() {
        let series = vec![Observation {
            date: NaiveDate::from_ymd_opt(2020, 4, 16).unwrap(),
            confirmed: 10,
            deaths: 1,
            recovered: 2,
        }];
        let data = SeriesMap::to_dataframe(&series).unwrap();
        let file = NamedTempFile::new().unwrap();
        write_output(CSVFormatter, data, Some(file.path())).unwrap();
        let written = std::fs::read_to_string(file.path()).unwrap();
        let mut lines = written.lines();
        assert_eq!(
            lines.next().unwrap(),
            [COL::DATE, COL::CONFIRMED, COL::DEATHS, COL::RECOVERED].join(",")
        );
        assert_eq!(lines.next(), Some("2020-04-16,10,1,2"));
    }

    #[test]
    fn cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
