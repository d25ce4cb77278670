use std::collections::HashSet;

use anyhow::Context;
use clap::Parser;
use serde_json::json;
use tenderview::{
    Catalog, HttpTransport, QueryState, RecordId, Route, TenderDetail,
    domain::{
        Collection, Contract, format,
        record::{Address, Document, Item, Milestone, Organization, Transaction},
    },
    view::{Anchor, CardId, CardKind, ContractDetail, ExpandState, Section},
};
use tracing::instrument;
use url::Url;

use super::{
    Settings,
    terminal::{Colorize, with_spinner},
};

#[derive(Debug, Parser)]
#[command(about = "Display a tender or contract in detail")]
pub struct Show {
    /// A tender id, or a link such as `/tenders/T1#contract-C1`
    ///
    /// A bare id may carry an anchor too: `T1#award-A1`.
    target: String,

    /// Treat a bare id as a contract id
    #[arg(long)]
    contract: bool,

    /// Expand every card
    #[arg(long)]
    expand_all: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Pretty,
    Json,
}

/// A detail view, loaded.
pub enum Loaded {
    Tender(TenderDetail),
    Contract(ContractDetail),
}

impl Loaded {
    /// The card expand state.
    pub const fn cards(&self) -> &ExpandState {
        match self {
            Self::Tender(detail) => detail.cards(),
            Self::Contract(detail) => detail.cards(),
        }
    }

    /// Flips a card and returns whether it is now expanded.
    pub fn toggle(&mut self, card: &CardId) -> bool {
        match self {
            Self::Tender(detail) => detail.toggle(card),
            Self::Contract(detail) => detail.toggle(card),
        }
    }

    /// Expands every card.
    pub fn expand_all(&mut self) {
        match self {
            Self::Tender(detail) => detail.expand_all(),
            Self::Contract(detail) => detail.expand_all(),
        }
    }

    /// Collapses every card.
    pub fn collapse_all(&mut self) {
        match self {
            Self::Tender(detail) => detail.collapse_all(),
            Self::Contract(detail) => detail.collapse_all(),
        }
    }
}

impl Show {
    #[instrument(level = "debug", skip(self, settings), fields(target = %self.target))]
    pub async fn run(self, settings: &Settings) -> anyhow::Result<()> {
        let route = resolve(&self.target, self.contract)?;
        let (config, catalog) = settings.open()?;

        let mut loaded = load(&catalog, &route).await?;
        if self.expand_all {
            loaded.expand_all();
        }

        match self.output {
            OutputFormat::Pretty => {
                for line in render(&loaded, &route, config.web_url()) {
                    println!("{line}");
                }
            }
            OutputFormat::Json => output_json(&loaded, &route, config.web_url())?,
        }
        Ok(())
    }
}

/// Resolves a command-line target to a detail route.
///
/// Links are parsed as routes; anything else is an id with an optional
/// `#kind-id` anchor.
pub fn resolve(target: &str, contract: bool) -> anyhow::Result<Route> {
    let target = target.trim();
    if target.starts_with('/') || target.contains("://") {
        return Route::parse(target).with_context(|| format!("invalid link '{target}'"));
    }

    let (id, anchor) = match target.split_once('#') {
        Some((id, anchor)) => {
            let anchor = anchor
                .parse::<Anchor>()
                .with_context(|| format!("invalid anchor '#{anchor}'"))?;
            (id, Some(anchor))
        }
        None => (target, None),
    };
    let id = RecordId::new(id).with_context(|| format!("invalid id '{id}'"))?;

    let route = if contract {
        Route::contract(id)
    } else {
        Route::tender(id)
    };
    Ok(route.with_anchor(anchor))
}

/// Fetches the record a detail route names and opens it at its anchor.
pub async fn load(catalog: &Catalog<HttpTransport>, route: &Route) -> anyhow::Result<Loaded> {
    match route {
        Route::Tender { id, anchor, .. } => {
            let tender = with_spinner(&format!("Loading tender {id}"), catalog.tender(id))
                .await
                .context("failed to load tender")?
                .with_context(|| format!("tender {id} not found"))?;
            Ok(Loaded::Tender(TenderDetail::new(tender, anchor.as_ref())))
        }
        Route::Contract { id, anchor, .. } => {
            let listing = with_spinner(&format!("Loading contract {id}"), catalog.contract(id))
                .await
                .context("failed to load contract")?
                .with_context(|| format!("contract {id} not found"))?;
            Ok(Loaded::Contract(ContractDetail::new(listing, anchor.as_ref())))
        }
        Route::Home | Route::Tenders(_) | Route::Contracts(_) => {
            anyhow::bail!("'{}' is a list, not a record", route)
        }
    }
}

fn output_json(loaded: &Loaded, route: &Route, web_url: &Url) -> anyhow::Result<()> {
    let output = match loaded {
        Loaded::Tender(detail) => json!({
            "data": detail.tender(),
            "permalink": permalink(loaded, route, web_url),
            "target": detail
                .cards()
                .scroll_target()
                .and_then(CardId::anchor)
                .as_ref()
                .map(ToString::to_string),
        }),
        Loaded::Contract(detail) => json!({
            "data": detail.contract(),
            "permalink": permalink(loaded, route, web_url),
            "tender": detail.tender_route().map(|route| route.permalink(web_url)),
        }),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// One expandable card, ready to print.
#[derive(Debug, Clone)]
pub struct Card {
    pub id: CardId,
    pub heading: String,
    pub body: Vec<String>,
    pub children: Vec<Self>,
}

impl Card {
    fn new(id: CardId, heading: impl Into<String>, body: Vec<String>) -> Self {
        Self {
            id,
            heading: heading.into(),
            body,
            children: Vec::new(),
        }
    }
}

/// A section of a detail view: its cards, or plain lines for sections
/// without cards.
#[derive(Debug, Clone)]
pub struct SectionView {
    pub section: Section,
    pub count: usize,
    pub cards: Vec<Card>,
    pub lines: Vec<String>,
}

impl SectionView {
    fn cards(section: Section, count: usize, cards: Vec<Card>) -> Self {
        Self {
            section,
            count,
            cards,
            lines: Vec::new(),
        }
    }

    fn lines(section: Section, count: usize, lines: Vec<String>) -> Self {
        Self {
            section,
            count,
            cards: Vec::new(),
            lines,
        }
    }
}

/// Every card of a loaded view, flattened, for selection menus.
pub fn all_cards(loaded: &Loaded) -> Vec<Card> {
    fn flatten(cards: Vec<Card>, out: &mut Vec<Card>) {
        for mut card in cards {
            let children = std::mem::take(&mut card.children);
            out.push(card);
            flatten(children, out);
        }
    }

    let sections = match loaded {
        Loaded::Tender(detail) => tender_sections(detail),
        Loaded::Contract(detail) => contract_sections(detail),
    };
    let mut out = Vec::new();
    for section in sections {
        flatten(section.cards, &mut out);
    }
    // Contracts appear both under their award and in their own section.
    let mut seen = HashSet::new();
    out.retain(|card| seen.insert(card.id.clone()));
    out
}

/// The shareable link to a loaded view, anchored at its scroll target.
pub fn permalink(loaded: &Loaded, route: &Route, web_url: &Url) -> String {
    let route = match loaded {
        Loaded::Tender(detail) => detail.route(
            route
                .query()
                .cloned()
                .unwrap_or_else(|| QueryState::new(Collection::Tenders)),
        ),
        Loaded::Contract(detail) => route
            .clone()
            .with_anchor(detail.cards().scroll_target().and_then(CardId::anchor)),
    };
    route.permalink(web_url)
}

/// Renders a loaded view as text lines.
pub fn render(loaded: &Loaded, route: &Route, web_url: &Url) -> Vec<String> {
    let mut lines = match loaded {
        Loaded::Tender(detail) => render_tender(detail),
        Loaded::Contract(detail) => render_contract(detail),
    };
    lines.push(String::new());
    lines.push(format!("Link: {}", permalink(loaded, route, web_url)).dim());
    lines
}

fn render_tender(detail: &TenderDetail) -> Vec<String> {
    let tender = detail.tender();
    let mut lines = vec![
        format!("# {}", detail.title()).heading(),
        tender
            .tender_id
            .clone()
            .unwrap_or_else(|| tender.id.to_string())
            .dim(),
        String::new(),
        "Overview".dim(),
    ];

    let procuring_entity = tender.procuring_entity.as_ref().and_then(organization_name);
    let method = match (&tender.procurement_method, &tender.procurement_method_details) {
        (Some(method), Some(details)) => Some(format!("{method} ({details})")),
        (method, details) => method.clone().or_else(|| details.clone()),
    };

    field(&mut lines, "Status", format::or_na(tender.status.as_deref()));
    field(&mut lines, "Value", &format::amount(tender.value.as_ref()));
    if tender.minimal_step.is_some() {
        field(&mut lines, "Minimal step", &format::amount(tender.minimal_step.as_ref()));
    }
    field(&mut lines, "Procuring entity", format::or_na(procuring_entity));
    field(&mut lines, "Method", format::or_na(method.as_deref()));
    field(&mut lines, "Award criteria", format::or_na(tender.award_criteria.as_deref()));
    field(&mut lines, "Tender period", &format::period(tender.tender_period.as_ref()));
    if tender.enquiry_period.is_some() {
        field(&mut lines, "Enquiries", &format::period(tender.enquiry_period.as_ref()));
    }
    field(&mut lines, "Modified", &format::datetime(tender.date_modified));
    if let Some(source) = &tender.source_url {
        field(&mut lines, "Source", source);
    }

    if let Some(description) = tender.description.as_deref().filter(|d| !d.trim().is_empty()) {
        lines.push(String::new());
        lines.push("Description".dim());
        lines.push(format!("  {}", description.trim()));
    }

    render_sections(&mut lines, &tender_sections(detail), detail.cards());
    lines
}

fn render_contract(detail: &ContractDetail) -> Vec<String> {
    let contract = detail.contract();
    let mut lines = vec![format!("# {}", format::title(Some(&contract.heading()))).heading()];
    if let Some(number) = &contract.contract_id {
        lines.push(number.dim());
    }
    lines.push(String::new());
    lines.push("Overview".dim());

    field(&mut lines, "Status", format::or_na(contract.status.as_deref()));
    field(&mut lines, "Value", &format::amount(contract.value.as_ref()));
    field(&mut lines, "Signed", &format::date(contract.date_signed));
    field(&mut lines, "Period", &format::period(contract.period.as_ref()));
    if let Some(award) = &contract.award_id {
        field(&mut lines, "Award", award.as_str());
    }
    match (detail.tender_title(), detail.tender_route()) {
        (title, Some(route)) => {
            let title = title.unwrap_or_else(|| format::NOT_AVAILABLE.to_string());
            field(&mut lines, "Tender", &title);
            field(&mut lines, "", &route.to_string().info());
        }
        (Some(title), None) => field(&mut lines, "Tender", &title),
        (None, None) => {}
    }

    render_sections(&mut lines, &contract_sections(detail), detail.cards());
    lines
}

fn field(lines: &mut Vec<String>, label: &str, value: &str) {
    let label = if label.is_empty() {
        String::new()
    } else {
        format!("{label}:")
    };
    lines.push(format!("  {label:<18}{value}"));
}

fn render_sections(lines: &mut Vec<String>, sections: &[SectionView], cards: &ExpandState) {
    for section in sections {
        lines.push(String::new());
        lines.push(format!("{} ({})", section.section.title(), section.count).info());
        for card in &section.cards {
            render_card(lines, card, cards, 1);
        }
        for line in &section.lines {
            lines.push(format!("  {line}"));
        }
    }
}

fn render_card(lines: &mut Vec<String>, card: &Card, cards: &ExpandState, depth: usize) {
    let indent = "  ".repeat(depth);
    let expanded = cards.is_expanded(&card.id);
    let target = if cards.scroll_target() == Some(&card.id) {
        "→"
    } else {
        " "
    };
    let marker = if expanded { "▾" } else { "▸" };
    let anchor = card
        .id
        .anchor()
        .map(|anchor| format!("  #{anchor}").dim())
        .unwrap_or_default();

    lines.push(format!("{target}{indent}{marker} {}{anchor}", card.heading));
    if !expanded {
        return;
    }
    for line in &card.body {
        lines.push(format!(" {indent}    {line}"));
    }
    for child in &card.children {
        render_card(lines, child, cards, depth + 2);
    }
}

fn organization_name(organization: &Organization) -> Option<&str> {
    organization.name.as_deref().or_else(|| organization.legal_name())
}

fn tender_sections(detail: &TenderDetail) -> Vec<SectionView> {
    let tender = detail.tender();
    detail
        .sections()
        .into_iter()
        .map(|(section, count)| match section {
            Section::Items => SectionView::cards(section, count, item_cards(&tender.items)),
            Section::Bids => SectionView::cards(
                section,
                count,
                tender
                    .bids
                    .iter()
                    .enumerate()
                    .map(|(index, bid)| {
                        let tenderer = bid.tenderer().and_then(organization_name);
                        Card::new(
                            CardId::new(CardKind::Bid, bid.id.as_ref(), index),
                            tenderer.unwrap_or("Bid"),
                            vec![
                                format!("Value: {}", format::amount(bid.value.as_ref())),
                                format!("Status: {}", format::or_na(bid.status.as_deref())),
                                format!("Date: {}", format::datetime(bid.date)),
                            ],
                        )
                    })
                    .collect(),
            ),
            Section::Awards => SectionView::cards(
                section,
                count,
                detail
                    .awards()
                    .into_iter()
                    .map(|card| {
                        let award = card.award;
                        let supplier = award.supplier().and_then(organization_name);
                        let heading = award
                            .title
                            .clone()
                            .or_else(|| supplier.map(ToString::to_string))
                            .unwrap_or_else(|| "Award".to_string());
                        let mut body = vec![
                            format!("Status: {}", format::or_na(award.status.as_deref())),
                            format!("Value: {}", format::amount(award.value.as_ref())),
                            format!("Supplier: {}", format::or_na(supplier)),
                            format!("Date: {}", format::date(award.date)),
                        ];
                        if card.contracts.is_empty() {
                            body.push("No contracts".dim());
                        }
                        Card {
                            id: card.id,
                            heading: format::title(Some(&heading)),
                            body,
                            children: card
                                .contracts
                                .into_iter()
                                .map(|contract| contract_card(contract.id, contract.contract))
                                .collect(),
                        }
                    })
                    .collect(),
            ),
            Section::Contracts => SectionView::cards(
                section,
                count,
                detail
                    .contracts()
                    .into_iter()
                    .map(|card| contract_card(card.id, card.contract))
                    .collect(),
            ),
            Section::Milestones => {
                SectionView::cards(section, count, milestone_cards(&tender.milestones))
            }
            Section::Transactions => SectionView::cards(
                section,
                count,
                detail
                    .transactions()
                    .into_iter()
                    .map(|row| {
                        let mut card = transaction_card(row.id, row.transaction);
                        card.body.push(format!(
                            "Contract: {}",
                            format::title(Some(&row.contract.heading()))
                        ));
                        card
                    })
                    .collect(),
            ),
            Section::Documents => {
                SectionView::cards(section, count, document_cards(&tender.documents))
            }
            Section::Questions => SectionView::cards(
                section,
                count,
                tender
                    .questions
                    .iter()
                    .enumerate()
                    .map(|(index, question)| {
                        let mut body = Vec::new();
                        if let Some(description) = &question.description {
                            body.push(description.trim().to_string());
                        }
                        body.push(format!("Answer: {}", format::or_na(question.answer.as_deref())));
                        body.push(format!("Date: {}", format::date(question.date)));
                        Card::new(
                            CardId::new(CardKind::Question, question.id.as_ref(), index),
                            format::or_na(question.title.as_deref()),
                            body,
                        )
                    })
                    .collect(),
            ),
            Section::Complaints => SectionView::cards(
                section,
                count,
                tender
                    .complaints
                    .iter()
                    .enumerate()
                    .map(|(index, complaint)| {
                        let mut body = vec![
                            format!("Status: {}", format::or_na(complaint.status.as_deref())),
                            format!("Date: {}", format::date(complaint.date)),
                        ];
                        if let Some(description) = &complaint.description {
                            body.push(description.trim().to_string());
                        }
                        Card::new(
                            CardId::new(CardKind::Complaint, complaint.id.as_ref(), index),
                            format::or_na(complaint.title.as_deref()),
                            body,
                        )
                    })
                    .collect(),
            ),
            Section::Revisions => {
                let history = detail.revisions();
                let mut lines: Vec<String> = history
                    .recent
                    .iter()
                    .map(|revision| {
                        format!(
                            "{}  {}  {} changes",
                            format::datetime(revision.date),
                            format::or_na(revision.author.as_deref()),
                            revision.changes.len()
                        )
                    })
                    .collect();
                if history.hidden > 0 {
                    lines.push(format!("... and {} more", history.hidden).dim());
                }
                SectionView::lines(section, count, lines)
            }
            Section::PurchaseOrders | Section::AgreedMetrics => {
                SectionView::lines(section, count, Vec::new())
            }
        })
        .collect()
}

fn contract_sections(detail: &ContractDetail) -> Vec<SectionView> {
    let contract = detail.contract();
    detail
        .sections()
        .into_iter()
        .map(|(section, count)| match section {
            Section::Items => SectionView::cards(section, count, item_cards(&contract.items)),
            Section::Milestones => {
                SectionView::cards(section, count, milestone_cards(&contract.milestones))
            }
            Section::Transactions => SectionView::cards(
                section,
                count,
                contract
                    .transactions()
                    .iter()
                    .enumerate()
                    .map(|(index, transaction)| {
                        transaction_card(
                            CardId::new(CardKind::Transaction, transaction.id.as_ref(), index),
                            transaction,
                        )
                    })
                    .collect(),
            ),
            Section::PurchaseOrders => SectionView::lines(
                section,
                count,
                contract
                    .purchase_orders()
                    .iter()
                    .map(|order| {
                        format!(
                            "{}  {}  {}  {}",
                            order.id.as_ref().map_or(format::NOT_AVAILABLE, RecordId::as_str),
                            format::or_na(order.status.as_deref()),
                            format::amount(order.value.as_ref()),
                            format::period(order.execution_period.as_ref())
                        )
                    })
                    .collect(),
            ),
            Section::AgreedMetrics => SectionView::lines(
                section,
                count,
                contract
                    .agreed_metrics
                    .iter()
                    .map(|metric| {
                        let title = format::or_na(metric.title.as_deref());
                        match metric.description.as_deref() {
                            Some(description) => format!("{title}: {description}"),
                            None => title.to_string(),
                        }
                    })
                    .collect(),
            ),
            Section::Documents => {
                SectionView::cards(section, count, document_cards(&contract.documents))
            }
            other => SectionView::lines(other, count, Vec::new()),
        })
        .collect()
}

fn contract_card(id: CardId, contract: &Contract) -> Card {
    let mut body = vec![
        format!("Status: {}", format::or_na(contract.status.as_deref())),
        format!("Value: {}", format::amount(contract.value.as_ref())),
        format!("Signed: {}", format::date(contract.date_signed)),
        format!("Period: {}", format::period(contract.period.as_ref())),
    ];
    if !contract.milestones.is_empty() {
        body.push(format!("Milestones: {}", contract.milestones.len()));
    }
    for transaction in contract.transactions() {
        body.push(transaction_line(transaction));
    }
    Card::new(id, format::title(Some(&contract.heading())), body)
}

fn transaction_line(transaction: &Transaction) -> String {
    format!(
        "Paid {} on {} to {}",
        format::amount(transaction.value.as_ref()),
        format::date(transaction.date),
        format::or_na(transaction.payee.as_ref().and_then(organization_name))
    )
}

fn transaction_card(id: CardId, transaction: &Transaction) -> Card {
    let heading = format!(
        "{}  {}",
        format::date(transaction.date),
        format::amount(transaction.value.as_ref())
    );
    let body = vec![
        format!(
            "Payer: {}",
            format::or_na(transaction.payer.as_ref().and_then(organization_name))
        ),
        format!(
            "Payee: {}",
            format::or_na(transaction.payee.as_ref().and_then(organization_name))
        ),
    ];
    Card::new(id, heading, body)
}

fn item_cards(items: &[Item]) -> Vec<Card> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let unit = item.unit.as_ref().and_then(|unit| unit.name.as_deref());
            let quantity = item.quantity.map_or_else(
                || format::NOT_AVAILABLE.to_string(),
                |quantity| format!("{} {}", format::number(quantity), unit.unwrap_or_default()),
            );
            let mut body = vec![format!("Quantity: {}", quantity.trim_end())];
            if let Some(classification) = &item.classification {
                body.push(format!(
                    "Classification: {} {}",
                    format::or_na(classification.id.as_deref()),
                    classification.description.as_deref().unwrap_or_default()
                ));
            }
            if item.delivery_date.is_some() {
                body.push(format!("Delivery: {}", format::period(item.delivery_date.as_ref())));
            }
            if let Some(address) = item.delivery_address.as_ref().and_then(Address::one_line) {
                body.push(format!("Address: {address}"));
            }
            Card::new(
                CardId::new(CardKind::Item, item.id.as_ref(), index),
                item.description
                    .clone()
                    .unwrap_or_else(|| format!("Item {}", index + 1)),
                body,
            )
        })
        .collect()
}

fn milestone_cards(milestones: &[Milestone]) -> Vec<Card> {
    milestones
        .iter()
        .enumerate()
        .map(|(index, milestone)| {
            let mut body = vec![
                format!("Type: {}", format::or_na(milestone.kind.as_deref())),
                format!("Status: {}", format::or_na(milestone.status.as_deref())),
                format!("Due: {}", format::date(milestone.due_date)),
            ];
            if milestone.date_met.is_some() {
                body.push(format!("Met: {}", format::date(milestone.date_met)));
            }
            if let Some(description) = &milestone.description {
                body.push(description.trim().to_string());
            }
            let heading = milestone
                .title
                .as_deref()
                .or(milestone.code.as_deref())
                .unwrap_or("Milestone");
            Card::new(
                CardId::new(CardKind::Milestone, milestone.id.as_ref(), index),
                heading,
                body,
            )
        })
        .collect()
}

fn document_cards(documents: &[Document]) -> Vec<Card> {
    documents
        .iter()
        .enumerate()
        .map(|(index, document)| {
            let body = vec![
                format!("Type: {}", format::or_na(document.document_type.as_deref())),
                format!("Format: {}", format::or_na(document.format.as_deref())),
                format!("Published: {}", format::date(document.date_published)),
                format!("URL: {}", format::or_na(document.url.as_deref())),
            ];
            Card::new(
                CardId::new(CardKind::Document, document.id.as_ref(), index),
                format::or_na(document.title.as_deref()),
                body,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tenderview::Tender;

    use super::*;

    fn detail(anchor: Option<&str>) -> Loaded {
        let tender: Tender = serde_json::from_value(json!({
            "id": "T1",
            "title": "Bridge works",
            "awards": [{"id": "A1", "title": "Main works", "suppliers": [{"name": "Builder Ltd"}]}],
            "contracts": [{
                "id": "C1",
                "awardID": "A1",
                "title": "Bridge contract",
                "implementation": {"transactions": [{"id": "P1", "value": {"amount": 500}}]},
            }],
            "revisions": [
                {"date": "2024-01-01T00:00:00Z"},
                {"date": "2024-01-02T00:00:00Z"},
                {"date": "2024-01-03T00:00:00Z"},
                {"date": "2024-01-04T00:00:00Z"},
                {"date": "2024-01-05T00:00:00Z"},
                {"date": "2024-01-06T00:00:00Z"},
                {"date": "2024-01-07T00:00:00Z"},
            ],
        }))
        .unwrap();
        let anchor = anchor.map(|anchor| anchor.parse::<Anchor>().unwrap());
        Loaded::Tender(TenderDetail::new(tender, anchor.as_ref()))
    }

    fn lines(loaded: &Loaded) -> Vec<String> {
        let route = Route::parse("/tenders/T1?search=bridge").unwrap();
        render(loaded, &route, &web())
    }

    fn web() -> Url {
        Url::parse("https://viewer.example.org").unwrap()
    }

    #[test]
    fn resolves_ids_and_links() {
        assert_eq!(
            resolve("T1", false).unwrap(),
            Route::tender(RecordId::new("T1").unwrap())
        );
        assert_eq!(
            resolve("C1", true).unwrap(),
            Route::contract(RecordId::new("C1").unwrap())
        );

        let route = resolve("T1#award-A1", false).unwrap();
        assert_eq!(route.anchor().map(ToString::to_string).as_deref(), Some("award-A1"));

        let route = resolve("https://viewer.example.org/tenders/T1#contract-C1", false).unwrap();
        assert_eq!(route.anchor().map(|a| a.kind), Some(CardKind::Contract));
    }

    #[test]
    fn rejects_malformed_anchor_on_bare_id() {
        assert!(resolve("T1#nonsense", false).is_err());
        assert!(resolve("#award-A1", false).is_err());
    }

    #[test]
    fn collapsed_cards_hide_their_body() {
        let lines = lines(&detail(None));
        assert!(lines.iter().any(|line| line.contains("▸ Main works")));
        assert!(!lines.iter().any(|line| line.contains("Builder Ltd")));
    }

    #[test]
    fn deep_link_expands_award_and_marks_contract() {
        let lines = lines(&detail(Some("contract-C1")));

        let award = lines.iter().position(|line| line.contains("▾ Main works")).unwrap();
        let contract = lines
            .iter()
            .position(|line| line.starts_with('→') && line.contains("Bridge contract"))
            .unwrap();
        assert!(award < contract);
        assert!(lines.iter().any(|line| line.contains("Builder Ltd")));
        assert!(lines.iter().any(|line| line.contains("#contract-C1")));
    }

    #[test]
    fn revisions_summarize_the_rest() {
        let lines = lines(&detail(None));
        assert!(lines.iter().any(|line| line.contains("Change History (7)")));
        assert!(lines.iter().any(|line| line.contains("... and 2 more")));
        assert!(lines.iter().any(|line| line.contains("2024-01-07")));
        assert!(!lines.iter().any(|line| line.contains("2024-01-01")));
    }

    #[test]
    fn permalink_carries_list_query_and_scroll_target() {
        let route = Route::parse("/tenders/T1?search=bridge").unwrap();
        assert_eq!(
            permalink(&detail(Some("transaction-P1")), &route, &web()),
            "https://viewer.example.org/tenders/T1?search=bridge#transaction-P1"
        );
        assert_eq!(
            permalink(&detail(None), &route, &web()),
            "https://viewer.example.org/tenders/T1?search=bridge"
        );
    }

    #[test]
    fn menu_lists_each_card_once() {
        let cards = all_cards(&detail(None));
        let contracts = cards
            .iter()
            .filter(|card| card.id.kind == CardKind::Contract)
            .count();
        assert_eq!(contracts, 1);
        assert!(cards.iter().any(|card| card.id.kind == CardKind::Transaction));
    }

    #[test]
    fn contract_links_back_to_tender() {
        let listing = serde_json::from_value(json!({
            "contract": {"id": "C1", "title": "Bridge contract"},
            "tender_id": "T1",
            "tender_title": "[TESTING] Bridge works",
        }))
        .unwrap();
        let loaded = Loaded::Contract(ContractDetail::new(listing, None));
        let lines = render(&loaded, &Route::parse("/contracts/C1").unwrap(), &web());

        assert!(lines.iter().any(|line| line.contains("Bridge works")));
        assert!(lines.iter().any(|line| line.contains("/tenders/T1#contract-C1")));
        assert!(
            lines
                .iter()
                .any(|line| line.contains("https://viewer.example.org/contracts/C1"))
        );
    }

    #[test]
    fn expand_all_opens_contract_cards() {
        let listing = serde_json::from_value(json!({
            "contract": {
                "id": "C1",
                "milestones": [{"id": "M1", "title": "Handover", "status": "scheduled"}],
            },
        }))
        .unwrap();
        let mut loaded = Loaded::Contract(ContractDetail::new(listing, None));
        let route = Route::parse("/contracts/C1").unwrap();
        let shows_body = |loaded: &Loaded| {
            render(loaded, &route, &web())
                .iter()
                .any(|line| line.contains("Status: scheduled"))
        };

        assert!(!shows_body(&loaded));
        loaded.expand_all();
        assert!(shows_body(&loaded));
        loaded.collapse_all();
        assert!(!shows_body(&loaded));
    }
}
