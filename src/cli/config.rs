use std::path::Path;

use anyhow::Context;
use tenderview::{Config, domain::ConfigKey};
use tracing::instrument;

use super::{Settings, terminal::Colorize};

#[derive(Debug, clap::Parser)]
pub struct Command {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Debug, clap::Parser)]
enum ConfigCommand {
    /// Show every setting, including command-line overrides
    Show,

    /// Print one setting
    Get {
        /// The setting (api_url, web_url, page_size, timeout_secs)
        key: ConfigKey,
    },

    /// Change one setting in the config file
    Set {
        /// The setting (api_url, web_url, page_size, timeout_secs)
        key: ConfigKey,
        /// The new value
        value: String,
    },

    /// Write a config file with the default settings
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

impl Command {
    #[instrument(skip(settings))]
    pub fn run(self, settings: &Settings) -> anyhow::Result<()> {
        match self.command {
            ConfigCommand::Show => {
                let config = settings.config()?;
                for key in ConfigKey::ALL {
                    println!("{:<14} {}", key.name(), config.get(key));
                }
            }
            ConfigCommand::Get { key } => println!("{}", settings.config()?.get(key)),
            ConfigCommand::Set { key, value } => {
                let value = set(settings.config_path(), key, &value)?;
                println!("{}", format!("Set {key} = {value}").success());
            }
            ConfigCommand::Init { force } => {
                init(settings.config_path(), force)?;
                println!(
                    "{}",
                    format!("Wrote defaults to {}", settings.config_path().display()).success()
                );
            }
        }
        Ok(())
    }
}

/// Updates one setting in the file at `path` and returns its stored value.
///
/// Command-line overrides are not written back.
fn set(path: &Path, key: ConfigKey, value: &str) -> anyhow::Result<String> {
    let mut config = Config::load_or_default(path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    config.set(key, value)?;
    config
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(config.get(key))
}

fn init(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        );
    }
    Config::default()
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn set_persists_the_value() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("tender-viewer.toml");

        let stored = set(&path, ConfigKey::PageSize, " 25 ").unwrap();
        assert_eq!(stored, "25");

        let config = Config::load(&path).unwrap();
        assert_eq!(config.page_size().get(), 25);
    }

    #[test]
    fn invalid_values_leave_the_file_alone() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("tender-viewer.toml");
        set(&path, ConfigKey::WebUrl, "https://viewer.example.org").unwrap();

        assert!(set(&path, ConfigKey::WebUrl, "ftp://viewer.example.org").is_err());
        assert!(set(&path, ConfigKey::PageSize, "0").is_err());

        let config = Config::load(&path).unwrap();
        assert_eq!(config.web_url().host_str(), Some("viewer.example.org"));
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("tender-viewer.toml");
        set(&path, ConfigKey::TimeoutSecs, "5").unwrap();

        assert!(init(&path, false).is_err());
        assert_eq!(Config::load(&path).unwrap().get(ConfigKey::TimeoutSecs), "5");

        init(&path, true).unwrap();
        assert_eq!(Config::load(&path).unwrap(), Config::default());
    }

    #[test]
    fn keys_accept_dashes() {
        assert_eq!("page-size".parse::<ConfigKey>().unwrap(), ConfigKey::PageSize);
        assert!("colour".parse::<ConfigKey>().is_err());
    }
}
