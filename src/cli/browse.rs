use dialoguer::{Input, Select, theme::ColorfulTheme};
use tenderview::{
    Catalog, ContractListing, HttpTransport, QueryState, Route, Tender,
    domain::{Collection, SortKey},
    view::{ListState, ListView},
};
use tracing::instrument;
use url::Url;

use super::{
    Settings,
    list::{Column, Row, with_page_size},
    show::{self, Loaded},
    terminal::{Colorize, with_spinner},
};

#[derive(Debug, Default, clap::Parser)]
#[command(about = "Browse the catalog interactively")]
pub struct Browse {
    /// Start from a link, e.g. `/contracts?sort_by=value` or
    /// `/tenders/T1#award-A1`
    from: Option<String>,
}

/// An entry of a list menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListAction {
    Open(usize),
    Next,
    Previous,
    Search,
    Status,
    Sort,
    Switch(Collection),
    Reload,
    Link,
    Quit,
}

/// An entry of a detail menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetailAction {
    Toggle,
    ExpandAll,
    CollapseAll,
    OpenTender,
    Link,
    Back,
    Quit,
}

/// The list menu entries after the rows, for `page` of `last`.
fn list_menu(page: u32, last: u32, collection: Collection) -> Vec<(ListAction, String)> {
    let other = match collection {
        Collection::Tenders => Collection::Contracts,
        Collection::Contracts => Collection::Tenders,
    };
    [
        (page < last, ListAction::Next, "Next page".to_string()),
        (page > 1, ListAction::Previous, "Previous page".to_string()),
        (true, ListAction::Search, "Search…".to_string()),
        (true, ListAction::Status, "Filter by status…".to_string()),
        (true, ListAction::Sort, "Sort…".to_string()),
        (true, ListAction::Switch(other), format!("Browse {other}")),
        (true, ListAction::Reload, "Reload".to_string()),
        (true, ListAction::Link, "Show link".to_string()),
        (true, ListAction::Quit, "Quit".to_string()),
    ]
    .into_iter()
    .filter(|(enabled, ..)| *enabled)
    .map(|(_, action, label)| (action, label))
    .collect()
}

fn detail_menu(has_tender: bool) -> Vec<(DetailAction, &'static str)> {
    [
        (true, DetailAction::Toggle, "Expand or collapse a card…"),
        (true, DetailAction::ExpandAll, "Expand all"),
        (true, DetailAction::CollapseAll, "Collapse all"),
        (has_tender, DetailAction::OpenTender, "Open tender"),
        (true, DetailAction::Link, "Show link"),
        (true, DetailAction::Back, "Back to list"),
        (true, DetailAction::Quit, "Quit"),
    ]
    .into_iter()
    .filter(|(enabled, ..)| *enabled)
    .map(|(_, action, label)| (action, label))
    .collect()
}

struct Session<'a> {
    catalog: Catalog<HttpTransport>,
    web_url: &'a Url,
    page_size: std::num::NonZeroU32,
    theme: ColorfulTheme,
}

impl Browse {
    #[instrument(level = "debug", skip_all)]
    pub async fn run(self, settings: &Settings) -> anyhow::Result<()> {
        let (config, catalog) = settings.open()?;
        let session = Session {
            catalog,
            web_url: config.web_url(),
            page_size: config.page_size(),
            theme: ColorfulTheme::default(),
        };

        let mut route = match &self.from {
            Some(link) => show::resolve(link, false)?,
            None => Route::Tenders(session.query(Collection::Tenders)),
        };

        loop {
            let next = match route {
                Route::Home => Some(Route::Tenders(session.query(Collection::Tenders))),
                Route::Tenders(query) => session.list::<Tender>(query).await?,
                Route::Contracts(query) => session.list::<ContractListing>(query).await?,
                detail @ (Route::Tender { .. } | Route::Contract { .. }) => {
                    session.detail(&detail).await?
                }
            };
            match next {
                Some(next) => route = next,
                None => break,
            }
        }
        Ok(())
    }
}

impl Session<'_> {
    fn query(&self, collection: Collection) -> QueryState {
        let mut query = QueryState::new(collection);
        query.set_page_size(self.page_size);
        query
    }

    /// Shows a list until the user opens a record, switches lists or quits.
    async fn list<R: Row>(&self, query: QueryState) -> anyhow::Result<Option<Route>> {
        let mut view = ListView::<R>::new(with_page_size(query, self.page_size));

        loop {
            with_spinner(&format!("Loading {}", R::COLLECTION), view.load(&self.catalog)).await;

            let mut labels = Vec::new();
            let mut actions = Vec::new();

            println!();
            match view.state() {
                ListState::Loading => {}
                ListState::Failed(error) => println!("{}", error.to_string().failure()),
                ListState::Empty => println!("No {} match the current filters.", R::COLLECTION),
                ListState::Rows {
                    rows,
                    total,
                    total_pages,
                    ..
                } => {
                    for (index, row) in rows.iter().enumerate() {
                        labels.push(format!(
                            "{}  {}",
                            row.cell(Column::Id).dim(),
                            row.cell(Column::Title)
                        ));
                        actions.push(ListAction::Open(index));
                    }
                    println!(
                        "{}",
                        format!(
                            "Page {} of {total_pages} · {total} {}",
                            view.query().page(),
                            R::COLLECTION
                        )
                        .dim()
                    );
                }
            }

            let page = view.query().page().get();
            let last = view.total_pages().unwrap_or(1);
            for (action, label) in list_menu(page, last, R::COLLECTION) {
                labels.push(label.info());
                actions.push(action);
            }

            let Some(choice) = Select::with_theme(&self.theme)
                .with_prompt(format!("{}", view.route()))
                .items(&labels)
                .default(0)
                .interact_opt()?
            else {
                return Ok(None);
            };

            match actions[choice] {
                ListAction::Open(index) => {
                    if let Some(route) = view.select(index) {
                        return Ok(Some(route));
                    }
                    println!("{}", "This record has no id and cannot be opened.".warning());
                }
                ListAction::Next => {
                    view.next_page();
                }
                ListAction::Previous => {
                    view.previous_page();
                }
                ListAction::Search => {
                    let term = self.prompt("Search", view.query().search())?;
                    view.set_search(Some(&term));
                }
                ListAction::Status => {
                    let status =
                        self.prompt("Status (blank or `all` for any)", view.query().status())?;
                    view.set_status(Some(&status));
                }
                ListAction::Sort => {
                    if let Some(key) = self.pick_sort(view.query())? {
                        view.toggle_sort(key)?;
                    }
                }
                ListAction::Switch(collection) => {
                    return Ok(Some(match collection {
                        Collection::Tenders => Route::Tenders(self.query(collection)),
                        Collection::Contracts => Route::Contracts(self.query(collection)),
                    }));
                }
                ListAction::Reload => self.catalog.cache().invalidate(&view.key()),
                ListAction::Link => println!("{}", view.route().permalink(self.web_url)),
                ListAction::Quit => return Ok(None),
            }
        }
    }

    /// Shows a record until the user goes back or quits.
    async fn detail(&self, route: &Route) -> anyhow::Result<Option<Route>> {
        let mut loaded = match show::load(&self.catalog, route).await {
            Ok(loaded) => loaded,
            Err(error) => {
                println!("{}", format!("{error:#}").failure());
                return Ok(Some(route.close()));
            }
        };

        loop {
            println!();
            for line in show::render(&loaded, route, self.web_url) {
                println!("{line}");
            }

            let tender_route = match &loaded {
                Loaded::Contract(detail) => detail.tender_route(),
                Loaded::Tender(_) => None,
            };
            let (actions, labels): (Vec<DetailAction>, Vec<&str>) =
                detail_menu(tender_route.is_some()).into_iter().unzip();

            let Some(choice) = Select::with_theme(&self.theme)
                .items(&labels)
                .default(0)
                .interact_opt()?
            else {
                return Ok(None);
            };

            match actions[choice] {
                DetailAction::Toggle => self.pick_card(&mut loaded)?,
                DetailAction::ExpandAll => loaded.expand_all(),
                DetailAction::CollapseAll => loaded.collapse_all(),
                DetailAction::OpenTender => return Ok(tender_route),
                DetailAction::Link => {
                    println!("{}", show::permalink(&loaded, route, self.web_url));
                }
                DetailAction::Back => return Ok(Some(route.close())),
                DetailAction::Quit => return Ok(None),
            }
        }
    }

    fn pick_card(&self, loaded: &mut Loaded) -> anyhow::Result<()> {
        let cards = show::all_cards(loaded);
        if cards.is_empty() {
            println!("{}", "Nothing to expand.".dim());
            return Ok(());
        }

        let labels: Vec<String> = cards
            .iter()
            .map(|card| {
                let marker = if loaded.cards().is_expanded(&card.id) {
                    "▾"
                } else {
                    "▸"
                };
                format!("{marker} {}: {}", card.id.kind.prefix(), card.heading)
            })
            .collect();

        if let Some(choice) = Select::with_theme(&self.theme)
            .with_prompt("Card")
            .items(&labels)
            .default(0)
            .interact_opt()?
        {
            loaded.toggle(&cards[choice].id);
        }
        Ok(())
    }

    fn pick_sort(&self, query: &QueryState) -> anyhow::Result<Option<SortKey>> {
        let current = query.sort();
        let keys = query.collection().sort_keys();
        let labels: Vec<String> = keys
            .iter()
            .map(|key| {
                let next = current.toggled(*key);
                format!("{} {}", key.label(), next.direction.arrow())
            })
            .collect();
        let default = keys.iter().position(|key| *key == current.key).unwrap_or(0);

        let choice = Select::with_theme(&self.theme)
            .with_prompt("Sort by")
            .items(&labels)
            .default(default)
            .interact_opt()?;
        Ok(choice.map(|index| keys[index]))
    }

    fn prompt(&self, label: &str, current: Option<&str>) -> anyhow::Result<String> {
        let input = Input::<String>::with_theme(&self.theme)
            .with_prompt(label)
            .allow_empty(true);
        let input = match current {
            Some(current) => input.with_initial_text(current),
            None => input,
        };
        Ok(input.interact_text()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actions(page: u32, last: u32) -> Vec<ListAction> {
        list_menu(page, last, Collection::Tenders)
            .into_iter()
            .map(|(action, _)| action)
            .collect()
    }

    #[test]
    fn paging_entries_follow_the_position() {
        assert!(!actions(1, 1).contains(&ListAction::Next));
        assert!(!actions(1, 1).contains(&ListAction::Previous));
        assert!(actions(1, 3).contains(&ListAction::Next));
        assert!(actions(3, 3).contains(&ListAction::Previous));
        assert!(!actions(3, 3).contains(&ListAction::Next));
    }

    #[test]
    fn lists_offer_the_other_collection() {
        let menu = list_menu(1, 1, Collection::Contracts);
        assert!(menu.contains(&(
            ListAction::Switch(Collection::Tenders),
            "Browse tenders".to_string()
        )));
    }

    #[test]
    fn contracts_link_to_their_tender() {
        let contract: Vec<_> = detail_menu(true)
            .into_iter()
            .map(|(action, _)| action)
            .collect();
        assert!(contract.contains(&DetailAction::OpenTender));
        assert!(contract.contains(&DetailAction::ExpandAll));

        let tender: Vec<_> = detail_menu(false)
            .into_iter()
            .map(|(action, _)| action)
            .collect();
        assert!(tender.contains(&DetailAction::ExpandAll));
        assert!(!tender.contains(&DetailAction::OpenTender));
    }
}
