use tenderview::Route;
use tracing::instrument;

use super::{Settings, show::resolve};

#[derive(Debug, clap::Parser)]
pub struct Command {
    /// A tender id, or a path such as `/tenders/T1#award-A1` or
    /// `/contracts?sort_by=value`
    target: String,

    /// Treat a bare id as a contract id
    #[clap(long)]
    contract: bool,

    /// Print the path only, without the viewer's base URL
    #[clap(long)]
    relative: bool,
}

impl Command {
    #[instrument(skip(settings))]
    pub fn run(self, settings: &Settings) -> anyhow::Result<()> {
        println!("{}", self.link(settings)?);
        Ok(())
    }

    fn link(&self, settings: &Settings) -> anyhow::Result<String> {
        let route: Route = resolve(&self.target, self.contract)?;
        if self.relative {
            return Ok(route.to_string());
        }
        let config = settings.config()?;
        Ok(route.permalink(config.web_url()))
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use tempfile::tempdir;
    use tenderview::Config;

    use super::{super::Settings, Command};

    fn settings(web_url: &str) -> (tempfile::TempDir, Settings) {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("tender-viewer.toml");
        let mut config = Config::default();
        config
            .set(tenderview::domain::ConfigKey::WebUrl, web_url)
            .unwrap();
        config.save(&path).unwrap();
        (
            tmp,
            Settings {
                config_path: path,
                api: None,
            },
        )
    }

    fn link(args: &[&str], settings: &Settings) -> String {
        let mut argv = vec!["link"];
        argv.extend_from_slice(args);
        Command::try_parse_from(argv)
            .unwrap()
            .link(settings)
            .expect("link should resolve")
    }

    #[test]
    fn links_use_the_configured_viewer() {
        let (_tmp, settings) = settings("https://viewer.example.org/app/");
        assert_eq!(
            link(&["T1#contract-C1"], &settings),
            "https://viewer.example.org/app/tenders/T1#contract-C1"
        );
        assert_eq!(
            link(&["C9", "--contract"], &settings),
            "https://viewer.example.org/app/contracts/C9"
        );
    }

    #[test]
    fn list_links_keep_their_query() {
        let (_tmp, settings) = settings("https://viewer.example.org");
        assert_eq!(
            link(&["/tenders?search=roads&page=2", "--relative"], &settings),
            "/tenders?page=2&search=roads"
        );
    }

    #[test]
    fn ids_with_slashes_are_escaped() {
        let (_tmp, settings) = settings("https://viewer.example.org");
        assert_eq!(
            link(&["/tenders/a%2Fb#item-1"], &settings),
            "https://viewer.example.org/tenders/a%2Fb#item-1"
        );
    }
}
