use std::path::PathBuf;

mod browse;
mod config;
mod link;
mod list;
mod show;
mod status;
mod terminal;

use anyhow::Context;
use clap::ArgAction;
use tenderview::{Catalog, Config, HttpTransport, domain::parse_base_url};
use url::Url;

use browse::Browse;
use list::List;
use show::Show;
use status::Status;

/// Default config file, relative to the working directory.
const DEFAULT_CONFIG: &str = "tender-viewer.toml";

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the config file
    #[arg(long, default_value = DEFAULT_CONFIG, global = true)]
    config: PathBuf,

    /// Catalog API base URL, overriding the config file
    #[arg(long, value_parser = parse_base_url, global = true)]
    api: Option<Url>,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        let settings = Settings {
            config_path: self.config,
            api: self.api,
        };

        self.command
            .unwrap_or_else(|| Command::Status(Status::default()))
            .run(&settings)
            .await
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

/// Where configuration comes from, as given on the command line.
#[derive(Debug, Clone)]
pub struct Settings {
    config_path: PathBuf,
    api: Option<Url>,
}

impl Settings {
    /// The config file path.
    pub fn config_path(&self) -> &std::path::Path {
        &self.config_path
    }

    /// Loads the config file (or defaults) with command-line overrides.
    pub fn config(&self) -> anyhow::Result<Config> {
        let mut config = Config::load_or_default(&self.config_path)
            .with_context(|| format!("failed to load {}", self.config_path.display()))?;
        if let Some(api) = &self.api {
            config.set_api_url(api.clone());
        }
        Ok(config)
    }

    /// Loads the config and connects a catalog to its API.
    pub fn open(&self) -> anyhow::Result<(Config, Catalog<HttpTransport>)> {
        let config = self.config()?;
        let transport = HttpTransport::from_config(&config)
            .with_context(|| format!("failed to create a client for {}", config.api_url()))?;
        tracing::info!(api = %config.api_url(), "using catalog");
        Ok((config, Catalog::new(transport)))
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Show catalog totals and highlights (default)
    Status(Status),

    /// List tenders with search, filters, sorting and pagination
    Tenders(List),

    /// List contracts with search, filters, sorting and pagination
    Contracts(List),

    /// Show a tender or contract in detail
    ///
    /// Accepts an id or a link such as `/tenders/T1#contract-C1`; the
    /// record named by the link's anchor is expanded.
    Show(Show),

    /// Print the shareable link to a view
    Link(link::Command),

    /// Browse the catalog interactively
    Browse(Browse),

    /// Show or modify configuration settings
    Config(config::Command),
}

impl Command {
    async fn run(self, settings: &Settings) -> anyhow::Result<()> {
        match self {
            Self::Status(command) => command.run(settings).await?,
            Self::Tenders(command) => command.run_tenders(settings).await?,
            Self::Contracts(command) => command.run_contracts(settings).await?,
            Self::Show(command) => command.run(settings).await?,
            Self::Link(command) => command.run(settings)?,
            Self::Browse(command) => command.run(settings).await?,
            Self::Config(command) => command.run(settings)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn defaults_to_status() {
        let cli = Cli::try_parse_from(["tv"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG));
    }

    #[test]
    fn api_override_applies_to_loaded_config() {
        let cli = Cli::try_parse_from([
            "tv",
            "--api",
            "https://catalog.example.org/api",
            "--config",
            "/nonexistent/tender-viewer.toml",
            "status",
        ])
        .unwrap();
        let settings = Settings {
            config_path: cli.config,
            api: cli.api,
        };

        let config = settings.config().unwrap();
        assert_eq!(config.api_url().host_str(), Some("catalog.example.org"));
        assert_eq!(config.page_size().get(), 50);
    }

    #[test]
    fn rejects_non_http_api() {
        assert!(Cli::try_parse_from(["tv", "--api", "ftp://example.org"]).is_err());
    }

    #[test]
    fn verbosity_is_global() {
        let cli = Cli::try_parse_from(["tv", "tenders", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
