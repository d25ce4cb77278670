use clap::Parser;
use serde_json::json;
use tenderview::{
    Dashboard, FetchError, QueryState, Tender,
    domain::{Collection, StatusCounts, TenderStats, format},
    fetch::Page,
    view::{Panel, Resource},
};
use tracing::instrument;

use super::{
    Settings,
    terminal::{Colorize, is_narrow, spinner},
};

/// Statuses shown before the rest are summarized.
const MAX_STATUS_DISPLAY: usize = 8;

#[derive(Debug, Parser, Default)]
#[command(about = "Show catalog totals, statuses and highlights")]
pub struct Status {
    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress headers and format for scripting
    #[arg(long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl Status {
    #[instrument(level = "debug", skip_all)]
    pub async fn run(self, settings: &Settings) -> anyhow::Result<()> {
        let (config, catalog) = settings.open()?;

        let mut query = QueryState::new(Collection::Tenders);
        query.set_page_size(config.page_size());
        let mut dashboard = Dashboard::new(query);

        let progress = spinner("Loading dashboard");
        let mut settled = 0;
        dashboard
            .load(&catalog, |_, panel| {
                settled += 1;
                progress.set_message(format!(
                    "Loaded {} ({settled}/{})",
                    panel.title().to_lowercase(),
                    Panel::ALL.len()
                ));
            })
            .await;
        progress.finish_and_clear();

        if Panel::ALL
            .iter()
            .all(|panel| panel_error(&dashboard, *panel).is_some())
        {
            let error = panel_error(&dashboard, Panel::Tenders)
                .cloned()
                .map_or_else(|| anyhow::anyhow!("no data"), anyhow::Error::from);
            return Err(error.context(format!(
                "the catalog at {} did not respond",
                config.api_url()
            )));
        }

        match self.output {
            OutputFormat::Json => Self::output_json(&dashboard)?,
            OutputFormat::Table => {
                let lines = if self.quiet {
                    vec![quiet_line(&dashboard)]
                } else {
                    table_lines(&dashboard, is_narrow())
                };
                for line in lines {
                    println!("{line}");
                }
            }
        }

        Ok(())
    }

    fn output_json(dashboard: &Dashboard) -> anyhow::Result<()> {
        let error = |panel| panel_error(dashboard, panel).map(ToString::to_string);
        let titles = |resource: &Resource<Page<Tender>>| {
            resource.data().map(|page| {
                page.records
                    .iter()
                    .map(|tender| json!({ "id": tender.id, "title": tender.display_title() }))
                    .collect::<Vec<_>>()
            })
        };

        let output = json!({
            "stats": { "data": dashboard.stats().data(), "error": error(Panel::Stats) },
            "statuses": {
                "data": dashboard.statuses().data(),
                "error": error(Panel::Statuses),
            },
            "recent": { "data": titles(dashboard.recent()), "error": error(Panel::Recent) },
            "detailed": {
                "data": titles(dashboard.detailed()),
                "error": error(Panel::Detailed),
            },
            "tenders": {
                "total": dashboard.tenders().data().map(|page| page.total),
                "error": error(Panel::Tenders),
            },
        });

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}

fn panel_error(dashboard: &Dashboard, panel: Panel) -> Option<&FetchError> {
    match panel {
        Panel::Tenders => dashboard.tenders().error(),
        Panel::Recent => dashboard.recent().error(),
        Panel::Detailed => dashboard.detailed().error(),
        Panel::Statuses => dashboard.statuses().error(),
        Panel::Stats => dashboard.stats().error(),
    }
}

fn quiet_line(dashboard: &Dashboard) -> String {
    let count = |value: Option<String>| value.unwrap_or_else(|| "?".to_string());
    let stats = dashboard.stats().data();
    format!(
        "tenders={} contracts={} statuses={}",
        count(stats.map(|stats| stats.tenders.to_string())),
        count(stats.map(|stats| stats.contracts.to_string())),
        count(
            dashboard
                .statuses()
                .data()
                .map(|statuses| statuses.by_count().len().to_string())
        ),
    )
}

fn table_lines(dashboard: &Dashboard, narrow: bool) -> Vec<String> {
    let mut lines = Vec::new();

    heading(&mut lines, Panel::Stats);
    lines.extend(stats_lines(dashboard.stats(), narrow));
    lines.push(String::new());

    heading(&mut lines, Panel::Statuses);
    lines.extend(status_lines(dashboard.statuses(), narrow));
    lines.push(String::new());

    heading(&mut lines, Panel::Recent);
    lines.extend(highlight_lines(dashboard.recent()));
    lines.push(String::new());

    heading(&mut lines, Panel::Detailed);
    lines.extend(highlight_lines(dashboard.detailed()));
    lines.push(String::new());

    lines.extend(list_lines(dashboard.tenders(), dashboard.main_query()));
    lines
}

fn heading(lines: &mut Vec<String>, panel: Panel) {
    let title = panel.title();
    lines.push(title.heading());
    lines.push("─".repeat(title.chars().count()).dim());
}

fn failed(error: &FetchError) -> String {
    format!("Unavailable: {error}").failure()
}

fn stats_lines(resource: &Resource<TenderStats>, narrow: bool) -> Vec<String> {
    if let Some(error) = resource.error() {
        return vec![failed(error)];
    }
    let Some(stats) = resource.data() else {
        return vec![format::NOT_AVAILABLE.dim()];
    };

    let counts = [
        ("Tenders", stats.tenders),
        ("Contracts", stats.contracts),
        ("Items", stats.items),
        ("Milestones", stats.milestones),
        ("Transactions", stats.transactions),
        ("Purchase orders", stats.purchase_orders),
    ];
    let mut lines: Vec<String> = if narrow {
        counts
            .iter()
            .map(|(label, count)| format!("{label}: {count}"))
            .collect()
    } else {
        counts
            .iter()
            .map(|(label, count)| format!("{label:<16} {count}"))
            .collect()
    };

    let awarded = stats
        .total_award_value
        .map_or_else(|| format::NOT_AVAILABLE.to_string(), |value| {
            format!("${}", format::number(value))
        });
    let period = format!(
        "{} – {}",
        format::date(stats.min_date),
        format::date(stats.max_date)
    );
    if narrow {
        lines.push(format!("Awarded: {awarded}"));
        lines.push(format!("Period: {period}"));
    } else {
        lines.push(format!("{:<16} {awarded}", "Awarded"));
        lines.push(format!("{:<16} {period}", "Period"));
    }
    lines
}

fn status_lines(resource: &Resource<StatusCounts>, narrow: bool) -> Vec<String> {
    if let Some(error) = resource.error() {
        return vec![failed(error)];
    }
    let Some(statuses) = resource.data() else {
        return vec![format::NOT_AVAILABLE.dim()];
    };
    if statuses.is_empty() {
        return vec!["No statuses reported.".dim()];
    }

    let ranked = statuses.by_count();
    let mut lines: Vec<String> = ranked
        .iter()
        .take(MAX_STATUS_DISPLAY)
        .map(|(status, count)| {
            if narrow {
                format!("{status}: {count}")
            } else {
                format!("{status:<16} {count}")
            }
        })
        .collect();
    if ranked.len() > MAX_STATUS_DISPLAY {
        let rest: u64 = ranked
            .iter()
            .skip(MAX_STATUS_DISPLAY)
            .map(|(_, count)| count)
            .sum();
        lines.push(
            format!(
                "... and {} more statuses ({rest} tenders)",
                ranked.len() - MAX_STATUS_DISPLAY
            )
            .dim(),
        );
    }
    lines
}

fn highlight_lines(resource: &Resource<Page<Tender>>) -> Vec<String> {
    if let Some(error) = resource.error() {
        return vec![failed(error)];
    }
    match resource.data() {
        None => vec![format::NOT_AVAILABLE.dim()],
        Some(page) if page.records.is_empty() => vec!["No tenders yet.".dim()],
        Some(page) => page
            .records
            .iter()
            .map(|tender| format!("{}  {}", tender.id.as_str().dim(), tender.display_title()))
            .collect(),
    }
}

fn list_lines(resource: &Resource<Page<Tender>>, query: &QueryState) -> Vec<String> {
    if let Some(error) = resource.error() {
        return vec![failed(error)];
    }
    resource.data().map_or_else(Vec::new, |page| {
        vec![
            format!(
                "{} tenders in {} pages of {}",
                page.total,
                page.total_pages(query.page_size()),
                query.page_size()
            ),
            "Run 'tv tenders' to list them or 'tv browse' to explore.".dim(),
        ]
    })
}
