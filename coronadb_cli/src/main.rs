mod cli;
mod display;
mod error;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, RunCommand};
use coronadb::config::Config;
use log::debug;

use crate::error::CoronaDbCliResult;

const DEFAULT_LOGGING_LEVEL: &str = "warn";

#[tokio::main]
async fn main() -> Result<()> {
    // Set RUST_LOG to `DEFAULT_LOGGING_LEVEL` if not set
    let _ =
        std::env::var("RUST_LOG").map_err(|_| std::env::set_var("RUST_LOG", DEFAULT_LOGGING_LEVEL));
    pretty_env_logger::init_timed();
    let args = Cli::parse();
    debug!("args: {args:?}");
    let config = match config_path() {
        Some(path) => read_config_from_toml(&path)?,
        None => Config::default(),
    };
    debug!("config: {config:?}");

    if let Some(command) = args.command {
        command.run(config).await?;
    }
    Ok(())
}

/// Linux: ~/.config/coronadb/config.toml, macOS: ~/Library/Application Support/coronadb/config.toml
fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("coronadb").join("config.toml"))
}

fn read_config_from_toml(file_path: &Path) -> CoronaDbCliResult<Config> {
    match std::fs::read_to_string(file_path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
        Err(e) => Err(anyhow::Error::from(e)
            .context(format!("Error reading config file {}", file_path.display()))
            .into()),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn missing_config_file_gives_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = read_config_from_toml(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn config_file_overrides_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "metadata_url = \"current.tsv\"\nas_of = \"2020-04-16\"\n\n[aliases.metadata]\n\"Viet Nam\" = \"Vietnam\""
        )
        .unwrap();
        let config = read_config_from_toml(file.path()).unwrap();
        assert_eq!(config.metadata_url, "current.tsv");
        assert_eq!(config.timeseries_url, Config::default().timeseries_url);
        assert_eq!(
            config.aliases.metadata().resolve("Viet Nam"),
            Some("Vietnam")
        );
        assert_eq!(config.aliases.metadata().resolve("USA"), None);
    }

    #[test]
    fn invalid_config_file_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "as_of = 12").unwrap();
        assert!(read_config_from_toml(file.path()).is_err());
    }
}
