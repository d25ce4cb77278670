use std::{fmt, num::NonZeroU32};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use serde_json::json;
use tenderview::{
    Catalog, ContractListing, HttpTransport, QueryState, Route, Tender,
    domain::{
        Collection, SortKey, format,
        query::{DEFAULT_PAGE_SIZE, DatePresence},
    },
    view::{ListRow, ListState, ListView},
};
use tracing::instrument;

use super::{
    Settings,
    terminal::{Colorize, is_narrow, truncate, with_spinner},
};

/// Command arguments for `tv tenders` and `tv contracts`.
#[derive(Debug, Parser)]
#[command(about = "List records with search, filters, sorting and pagination")]
pub struct List {
    /// Start from a list link such as `/tenders?search=roads&page=2`.
    ///
    /// Options given alongside are applied on top of it.
    #[arg(long, value_name = "LINK")]
    from: Option<String>,

    /// Free-text search.
    #[arg(short, long)]
    search: Option<String>,

    /// Filter by status (`all` for any).
    #[arg(long)]
    status: Option<String>,

    /// Only records with (`yes`) or without (`no`) a tender start date.
    #[arg(long, value_name = "yes|no")]
    has_date: Option<DatePresence>,

    /// Only records whose value exceeds this amount.
    #[arg(long, value_name = "AMOUNT")]
    min_value: Option<f64>,

    /// Sort column. Naming the active column again reverses it.
    #[arg(long, value_name = "COLUMN")]
    sort: Vec<SortKey>,

    /// Page to show (1-based).
    #[arg(short, long)]
    page: Option<u32>,

    /// Records per page (default: the config's `page_size`).
    #[arg(long)]
    page_size: Option<NonZeroU32>,

    /// Output format (default: table).
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,

    /// Suppress headers and format rows for scripting.
    #[arg(long)]
    quiet: bool,

    /// Print the shareable link to this page after the rows.
    #[arg(long)]
    link: bool,
}

/// Supported output formats.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

impl List {
    pub async fn run_tenders(self, settings: &Settings) -> anyhow::Result<()> {
        self.run::<Tender>(settings).await
    }

    pub async fn run_contracts(self, settings: &Settings) -> anyhow::Result<()> {
        self.run::<ContractListing>(settings).await
    }

    #[instrument(level = "debug", skip_all, fields(collection = %R::COLLECTION))]
    async fn run<R: Row>(self, settings: &Settings) -> anyhow::Result<()> {
        let (config, catalog) = settings.open()?;

        let mut query = self.query(R::COLLECTION, config.page_size())?;
        let target = self.page.unwrap_or_else(|| query.page().get());
        // The page count is only known once the first page has loaded.
        query.set_page(NonZeroU32::MIN);

        let mut view = ListView::<R>::new(query);
        load(&mut view, &catalog).await;

        if target != 1 && matches!(view.state(), ListState::Rows { .. }) {
            let last = view.total_pages().unwrap_or(1);
            if !view.go_to_page(target) {
                anyhow::bail!("page {target} is out of range (1-{last})");
            }
            load(&mut view, &catalog).await;
        }

        match view.state() {
            ListState::Loading => {}
            ListState::Failed(error) => {
                return Err(error.clone()).context(format!("failed to load {}", R::COLLECTION));
            }
            ListState::Empty => {
                if !self.quiet {
                    println!("No {} match the current filters.", R::COLLECTION);
                }
            }
            ListState::Rows {
                rows,
                total,
                total_pages,
                ..
            } => {
                let page = Paging {
                    total,
                    page: view.query().page().get(),
                    total_pages,
                };
                match self.output {
                    OutputFormat::Table => render_table(rows, view.query(), &page, self.quiet),
                    OutputFormat::Json => render_json(rows, &page)?,
                    OutputFormat::Csv => render_csv(rows, self.quiet),
                }
            }
        }

        if self.link {
            println!("{}", view.route().permalink(config.web_url()));
        }

        Ok(())
    }

    /// Builds the query from `--from` and the filter options.
    fn query(&self, collection: Collection, page_size: NonZeroU32) -> anyhow::Result<QueryState> {
        let mut query = match &self.from {
            Some(link) => {
                let route = Route::parse(link).with_context(|| format!("invalid link '{link}'"))?;
                match route.query() {
                    Some(query) if query.collection() == collection => {
                        with_page_size(query.clone(), page_size)
                    }
                    _ => anyhow::bail!("'{link}' is not a {collection} list"),
                }
            }
            None => {
                let mut query = QueryState::new(collection);
                query.set_page_size(page_size);
                query
            }
        };

        if let Some(search) = &self.search {
            query.set_search(Some(search));
        }
        if let Some(status) = &self.status {
            query.set_status(Some(status));
        }
        if self.has_date.is_some() {
            query.set_has_date(self.has_date);
        }
        if self.min_value.is_some() {
            query.set_min_value(self.min_value)?;
        }
        for key in &self.sort {
            query.toggle_sort(*key)?;
        }
        if let Some(page_size) = self.page_size {
            query.set_page_size(page_size);
        }
        Ok(query)
    }
}

async fn load<R: Row>(view: &mut ListView<R>, catalog: &Catalog<HttpTransport>) {
    let message = format!("Loading {}", R::COLLECTION);
    with_spinner(&message, view.load(catalog)).await;
}

struct Paging {
    total: u64,
    page: u32,
    total_pages: u32,
}

/// A table column.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Column {
    Id,
    Title,
    Tender,
    Status,
    Value,
    Period,
    Signed,
    Modified,
    Details,
}

impl Column {
    const fn header(self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::Title => "Title",
            Self::Tender => "Tender",
            Self::Status => "Status",
            Self::Value => "Value",
            Self::Period => "Tender Period",
            Self::Signed => "Signed",
            Self::Modified => "Modified",
            Self::Details => "Details",
        }
    }

    /// The sort key selected by clicking this column's header.
    const fn sort_key(self) -> Option<SortKey> {
        match self {
            Self::Title => Some(SortKey::Title),
            Self::Value => Some(SortKey::Value),
            Self::Period => Some(SortKey::StartDate),
            Self::Signed => Some(SortKey::DateSigned),
            Self::Modified => Some(SortKey::DateModified),
            Self::Details => Some(SortKey::Complexity),
            Self::Id | Self::Tender | Self::Status => None,
        }
    }

    /// Columns dropped on narrow terminals.
    const fn is_secondary(self) -> bool {
        matches!(self, Self::Period | Self::Tender | Self::Details)
    }
}

/// A list record that can be rendered as a table row.
pub trait Row: ListRow + Serialize {
    /// The columns, in display order.
    const COLUMNS: &'static [Column];

    /// The text of one cell.
    fn cell(&self, column: Column) -> String;
}

impl Row for Tender {
    const COLUMNS: &'static [Column] = &[
        Column::Id,
        Column::Title,
        Column::Status,
        Column::Value,
        Column::Period,
        Column::Modified,
        Column::Details,
    ];

    fn cell(&self, column: Column) -> String {
        match column {
            Column::Id => self
                .tender_id
                .clone()
                .unwrap_or_else(|| self.id.to_string()),
            Column::Title => self.display_title(),
            Column::Status => format::or_na(self.status.as_deref()).to_string(),
            Column::Value => format::amount(self.value.as_ref()),
            Column::Period => format::period(self.tender_period.as_ref()),
            Column::Modified => format::date(self.date_modified),
            Column::Details => self.complexity().to_string(),
            Column::Tender | Column::Signed => String::new(),
        }
    }
}

impl Row for ContractListing {
    const COLUMNS: &'static [Column] = &[
        Column::Id,
        Column::Title,
        Column::Tender,
        Column::Status,
        Column::Value,
        Column::Signed,
    ];

    fn cell(&self, column: Column) -> String {
        let contract = &self.contract;
        match column {
            Column::Id => contract
                .contract_id
                .clone()
                .or_else(|| contract.id.as_ref().map(ToString::to_string))
                .unwrap_or_else(|| format::NOT_AVAILABLE.to_string()),
            Column::Title => format::title(Some(&contract.heading())),
            Column::Tender => {
                let title = format::title(self.tender_title.as_deref());
                if title.is_empty() {
                    format::NOT_AVAILABLE.to_string()
                } else {
                    title
                }
            }
            Column::Status => format::or_na(contract.status.as_deref()).to_string(),
            Column::Value => format::amount(contract.value.as_ref()),
            Column::Signed => format::date(contract.date_signed),
            Column::Period | Column::Modified | Column::Details => String::new(),
        }
    }
}

fn visible_columns<R: Row>(narrow: bool) -> Vec<Column> {
    R::COLUMNS
        .iter()
        .copied()
        .filter(|column| !(narrow && column.is_secondary()))
        .collect()
}

/// Header text, with the sort arrow on the active column.
fn header(column: Column, query: &QueryState) -> String {
    let sort = query.sort();
    match column.sort_key() {
        Some(key) if key == sort.key => format!("{} {}", column.header(), sort.direction.arrow()),
        _ => column.header().to_string(),
    }
}

fn table_cells<R: Row>(rows: &[R], columns: &[Column], title_width: usize) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| {
            columns
                .iter()
                .map(|column| {
                    let value = row.cell(*column);
                    if matches!(column, Column::Title | Column::Tender) {
                        truncate(&value, title_width)
                    } else {
                        value
                    }
                })
                .collect()
        })
        .collect()
}

fn render_table<R: Row>(rows: &[R], query: &QueryState, page: &Paging, quiet: bool) {
    let narrow = is_narrow();
    let columns = visible_columns::<R>(narrow);
    let data = table_cells(rows, &columns, if narrow { 28 } else { 48 });

    if quiet {
        for row in data {
            println!("{}", row.join("\t"));
        }
        return;
    }

    let headers: Vec<String> = columns.iter().map(|column| header(*column, query)).collect();

    // Determine column widths for alignment.
    let widths = headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            data.iter()
                .map(|row| row[idx].chars().count())
                .max()
                .unwrap_or(0)
                .max(header.chars().count())
        })
        .collect::<Vec<_>>();

    for (header, width) in headers.iter().zip(&widths) {
        print!("{}  ", pad(header, *width).heading());
    }
    println!();
    for width in &widths {
        print!("{:-<width$}  ", "");
    }
    println!();

    for row in data {
        for (value, width) in row.iter().zip(&widths) {
            print!("{}  ", pad(value, *width));
        }
        println!();
    }

    println!();
    println!(
        "{}",
        format!(
            "Page {} of {} · {} {}",
            page.page,
            page.total_pages,
            page.total,
            query.collection()
        )
        .dim()
    );
}

fn pad(value: &str, width: usize) -> String {
    let padding = width.saturating_sub(value.chars().count());
    format!("{value}{}", " ".repeat(padding))
}

fn render_json<R: Row>(rows: &[R], page: &Paging) -> anyhow::Result<()> {
    let output = json!({
        "data": rows,
        "meta": {
            "total": page.total,
            "page": page.page,
            "totalPages": page.total_pages,
        },
    });

    serde_json::to_writer_pretty(std::io::stdout(), &output)
        .context("failed to render json output")?;
    println!();
    Ok(())
}

fn render_csv<R: Row>(rows: &[R], quiet: bool) {
    for line in csv_lines(rows, quiet) {
        println!("{line}");
    }
}

fn csv_lines<R: Row>(rows: &[R], quiet: bool) -> Vec<String> {
    let header = (!quiet).then(|| {
        R::COLUMNS
            .iter()
            .map(|column| csv_escape(column.header()))
            .collect::<Vec<_>>()
            .join(",")
    });

    header
        .into_iter()
        .chain(rows.iter().map(|row| {
            R::COLUMNS
                .iter()
                .map(|column| csv_escape(&row.cell(*column)))
                .collect::<Vec<_>>()
                .join(",")
        }))
        .collect()
}

fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        let escaped = value.replace('"', "\"\"");
        format!("\"{escaped}\"")
    } else {
        value.to_string()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Table => "table",
            Self::Json => "json",
            Self::Csv => "csv",
        })
    }
}

/// Applies the configured page size to a query parsed from a link.
///
/// Links leave out the page size when it is the default, so only a query
/// still at the default takes the configured size.
pub fn with_page_size(mut query: QueryState, page_size: NonZeroU32) -> QueryState {
    if query.page_size() == DEFAULT_PAGE_SIZE {
        query.set_page_size(page_size);
    }
    query
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tenderview::domain::SortDirection;
    use test_case::test_case;

    use super::*;

    fn parse(args: &[&str]) -> List {
        let mut argv = vec!["tenders"];
        argv.extend_from_slice(args);
        List::try_parse_from(argv).unwrap()
    }

    fn tender(value: serde_json::Value) -> Tender {
        serde_json::from_value(value).unwrap()
    }

    #[test_case("plain", "plain"; "untouched")]
    #[test_case("a,b", "\"a,b\""; "comma")]
    #[test_case("say \"hi\"", "\"say \"\"hi\"\"\""; "quotes")]
    #[test_case("two\nlines", "\"two\nlines\""; "newline")]
    fn escapes_csv(value: &str, expected: &str) {
        assert_eq!(csv_escape(value), expected);
    }

    #[test]
    fn builds_query_from_options() {
        let list = parse(&[
            "--search",
            "roads",
            "--status",
            "active",
            "--has-date",
            "no",
            "--min-value",
            "1000",
            "--sort",
            "value",
        ]);
        let query = list
            .query(Collection::Tenders, NonZeroU32::new(20).unwrap())
            .unwrap();

        assert_eq!(query.search(), Some("roads"));
        assert_eq!(query.status(), Some("active"));
        assert_eq!(query.has_date(), Some(DatePresence::Absent));
        assert_eq!(query.min_value(), Some(1000.0));
        assert_eq!(query.sort().key, SortKey::Value);
        assert_eq!(query.sort().direction, SortDirection::Descending);
        assert_eq!(query.page_size().get(), 20);
    }

    #[test]
    fn repeated_sort_reverses() {
        let list = parse(&["--sort", "title", "--sort", "title"]);
        let query = list.query(Collection::Tenders, NonZeroU32::MIN).unwrap();
        assert_eq!(query.sort().key, SortKey::Title);
        assert_eq!(query.sort().direction, SortDirection::Descending);
    }

    #[test]
    fn rejects_sort_the_collection_lacks() {
        let list = parse(&["--sort", "complexity"]);
        assert!(list.query(Collection::Contracts, NonZeroU32::MIN).is_err());
    }

    #[test]
    fn starts_from_a_link() {
        let list = parse(&["--from", "/tenders?search=bridge&page=3", "--status", "active"]);
        let query = list.query(Collection::Tenders, NonZeroU32::MIN).unwrap();
        assert_eq!(query.search(), Some("bridge"));
        assert_eq!(query.status(), Some("active"));

        let list = parse(&["--from", "/contracts"]);
        assert!(list.query(Collection::Tenders, NonZeroU32::MIN).is_err());
    }

    #[test]
    fn links_take_the_configured_page_size() {
        let twenty = NonZeroU32::new(20).unwrap();

        let list = parse(&["--from", "/tenders?page=2"]);
        let query = list.query(Collection::Tenders, twenty).unwrap();
        assert_eq!(query.page_size(), twenty);
        assert_eq!(query.page().get(), 2);

        let list = parse(&["--from", "/tenders?page_size=10"]);
        let query = list.query(Collection::Tenders, twenty).unwrap();
        assert_eq!(query.page_size().get(), 10);
    }

    #[test]
    fn marks_active_sort_column() {
        let mut query = QueryState::new(Collection::Tenders);
        assert_eq!(header(Column::Modified, &query), "Modified ↓");
        assert_eq!(header(Column::Title, &query), "Title");

        query.toggle_sort(SortKey::Title).unwrap();
        assert_eq!(header(Column::Title, &query), "Title ↑");
    }

    #[test]
    fn tender_cells() {
        let tender = tender(json!({
            "id": "T1",
            "tenderID": "UA-2024-01-01-000001-a",
            "title": "[TESTING] Road repair",
            "value": {"amount": 1_234_567.5, "currency": "UAH"},
            "items": [{}, {}],
        }));

        assert_eq!(tender.cell(Column::Id), "UA-2024-01-01-000001-a");
        assert_eq!(tender.cell(Column::Title), "Road repair");
        assert_eq!(tender.cell(Column::Status), "N/A");
        assert_eq!(tender.cell(Column::Value), "1,234,567.5 UAH");
        assert_eq!(tender.cell(Column::Details), "2");
    }

    #[test]
    fn contract_csv_has_header_and_rows() {
        let listing: ContractListing = serde_json::from_value(json!({
            "contract": {"id": "C1", "title": "Supply, delivery", "value": {"amount": 10}},
            "tender_id": "T1",
            "tender_title": "Bridge",
        }))
        .unwrap();

        let lines = csv_lines(&[listing.clone()], false);
        assert_eq!(lines[0], "ID,Title,Tender,Status,Value,Signed");
        assert_eq!(lines[1], "C1,\"Supply, delivery\",Bridge,N/A,$10,N/A");

        assert_eq!(csv_lines(&[listing], true).len(), 1);
    }

    #[test]
    fn narrow_tables_drop_secondary_columns() {
        let columns = visible_columns::<Tender>(true);
        assert!(!columns.contains(&Column::Period));
        assert!(columns.contains(&Column::Title));
        assert_eq!(visible_columns::<Tender>(false).len(), Tender::COLUMNS.len());
    }
}
