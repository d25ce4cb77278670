//! Detail views of a single tender or contract.
//!
//! Nested records are shown as cards that start collapsed. A deep-link
//! anchor expands the card it names, together with the cards containing
//! it, and marks it as the scroll target.

use std::{cmp::Reverse, collections::HashSet};

use super::{Anchor, CardKind, Route};
use crate::domain::{
    Award, Contract, ContractListing, QueryState, RecordId, Tender, format,
    record::{Revision, Transaction},
};

/// Number of revisions shown before the rest are summarized.
pub const RECENT_REVISIONS: usize = 5;

/// How a card is told apart from its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CardKey {
    /// The record's own id.
    Id(RecordId),
    /// Position in its list, for records published without an id.
    Index(usize),
}

/// Identifies one expandable card.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CardId {
    /// The kind of record.
    pub kind: CardKind,
    /// The record within its kind.
    pub key: CardKey,
}

impl CardId {
    /// The card for a record, keyed by id when it has one.
    #[must_use]
    pub fn new(kind: CardKind, id: Option<&RecordId>, index: usize) -> Self {
        let key = id.map_or(CardKey::Index(index), |id| CardKey::Id(id.clone()));
        Self { kind, key }
    }

    /// The anchor linking to this card. Cards without an id have none.
    #[must_use]
    pub fn anchor(&self) -> Option<Anchor> {
        match &self.key {
            CardKey::Id(id) => Some(Anchor::new(self.kind, id.clone())),
            CardKey::Index(_) => None,
        }
    }
}

impl From<&Anchor> for CardId {
    fn from(anchor: &Anchor) -> Self {
        Self {
            kind: anchor.kind,
            key: CardKey::Id(anchor.id.clone()),
        }
    }
}

/// Which cards are expanded, and which one to scroll to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandState {
    expanded: HashSet<CardId>,
    scroll_target: Option<CardId>,
}

impl ExpandState {
    /// Whether `card` is expanded.
    #[must_use]
    pub fn is_expanded(&self, card: &CardId) -> bool {
        self.expanded.contains(card)
    }

    /// Flips `card` and returns whether it is now expanded.
    pub fn toggle(&mut self, card: &CardId) -> bool {
        if self.expanded.remove(card) {
            false
        } else {
            self.expanded.insert(card.clone());
            true
        }
    }

    /// Expands `card`.
    pub fn expand(&mut self, card: CardId) {
        self.expanded.insert(card);
    }

    /// Collapses every card.
    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    /// The card a deep link pointed at.
    #[must_use]
    pub const fn scroll_target(&self) -> Option<&CardId> {
        self.scroll_target.as_ref()
    }

    fn reveal(&mut self, chain: impl IntoIterator<Item = CardId>, target: CardId) {
        self.expanded.extend(chain);
        self.expanded.insert(target.clone());
        self.scroll_target = Some(target);
    }
}

/// A sub-collection of a detail view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// Line items.
    Items,
    /// Bids.
    Bids,
    /// Awards, each with its linked contracts.
    Awards,
    /// Contracts.
    Contracts,
    /// Milestones.
    Milestones,
    /// Contract payments.
    Transactions,
    /// Purchase orders.
    PurchaseOrders,
    /// Agreed performance metrics.
    AgreedMetrics,
    /// Documents.
    Documents,
    /// Enquiries.
    Questions,
    /// Complaints.
    Complaints,
    /// Revision history.
    Revisions,
}

impl Section {
    /// Section heading.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Items => "Items",
            Self::Bids => "Bidders",
            Self::Awards => "Awards",
            Self::Contracts => "Contracts",
            Self::Milestones => "Milestones",
            Self::Transactions => "Transactions",
            Self::PurchaseOrders => "Purchase Orders",
            Self::AgreedMetrics => "Agreed Metrics",
            Self::Documents => "Documents",
            Self::Questions => "Questions",
            Self::Complaints => "Complaints",
            Self::Revisions => "Change History",
        }
    }
}

/// A contract card.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractCard<'a> {
    /// The card.
    pub id: CardId,
    /// The contract.
    pub contract: &'a Contract,
}

/// An award card with the contracts that execute it.
#[derive(Debug, Clone, PartialEq)]
pub struct AwardCard<'a> {
    /// The card.
    pub id: CardId,
    /// The award.
    pub award: &'a Award,
    /// Contracts whose `awardID` matches this award.
    pub contracts: Vec<ContractCard<'a>>,
}

/// A payment with the contract it was made under.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRow<'a> {
    /// The card.
    pub id: CardId,
    /// The paying contract.
    pub contract: &'a Contract,
    /// The payment.
    pub transaction: &'a Transaction,
}

/// The most recent revisions, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct RevisionHistory<'a> {
    /// Up to [`RECENT_REVISIONS`] revisions.
    pub recent: Vec<&'a Revision>,
    /// How many older revisions are not shown.
    pub hidden: usize,
}

impl<'a> RevisionHistory<'a> {
    fn of(revisions: &'a [Revision]) -> Self {
        let mut sorted: Vec<&Revision> = revisions.iter().collect();
        // Undated revisions sort last.
        sorted.sort_by_key(|revision| Reverse(revision.date));

        let hidden = sorted.len().saturating_sub(RECENT_REVISIONS);
        sorted.truncate(RECENT_REVISIONS);
        Self {
            recent: sorted,
            hidden,
        }
    }

    /// Total number of revisions.
    #[must_use]
    pub fn total(&self) -> usize {
        self.recent.len() + self.hidden
    }
}

/// A tender and the expand state of its cards.
#[derive(Debug, Clone, PartialEq)]
pub struct TenderDetail {
    tender: Tender,
    cards: ExpandState,
}

impl TenderDetail {
    /// Opens a tender with every card collapsed, then reveals `anchor`.
    #[must_use]
    pub fn new(tender: Tender, anchor: Option<&Anchor>) -> Self {
        let mut detail = Self {
            tender,
            cards: ExpandState::default(),
        };
        if let Some(anchor) = anchor {
            detail.reveal(anchor);
        }
        detail
    }

    /// The tender.
    #[must_use]
    pub const fn tender(&self) -> &Tender {
        &self.tender
    }

    /// The card expand state.
    #[must_use]
    pub const fn cards(&self) -> &ExpandState {
        &self.cards
    }

    /// Flips a card and returns whether it is now expanded.
    pub fn toggle(&mut self, card: &CardId) -> bool {
        self.cards.toggle(card)
    }

    /// Expands every card that has content.
    pub fn expand_all(&mut self) {
        for card in self.all_cards() {
            self.cards.expand(card);
        }
    }

    /// Collapses every card.
    pub fn collapse_all(&mut self) {
        self.cards.collapse_all();
    }

    /// The route to this tender with the scroll target as its anchor.
    #[must_use]
    pub fn route(&self, list: QueryState) -> Route {
        Route::Tender {
            id: self.tender.id.clone(),
            anchor: self.cards.scroll_target().and_then(CardId::anchor),
            list,
        }
    }

    /// Expands the card `anchor` names and every card containing it, and
    /// makes it the scroll target.
    ///
    /// Returns `false` if the tender has no such record; nothing changes.
    pub fn reveal(&mut self, anchor: &Anchor) -> bool {
        let target = CardId::from(anchor);
        let id = anchor.id.as_str();

        let chain: Vec<CardId> = match anchor.kind {
            CardKind::Contract => match self.tender.contract(id) {
                Some(contract) => self.award_chain(contract),
                None => return self.not_found(anchor),
            },
            CardKind::Transaction | CardKind::Milestone
                if !self.has_tender_level(anchor.kind, id) =>
            {
                let Some((index, contract)) = self.containing_contract(anchor) else {
                    return self.not_found(anchor);
                };
                let mut chain = self.award_chain(contract);
                chain.push(contract_card(contract, index));
                chain
            }
            kind if self.has_tender_level(kind, id) => Vec::new(),
            _ => return self.not_found(anchor),
        };

        self.cards.reveal(chain, target);
        true
    }

    fn not_found(&self, anchor: &Anchor) -> bool {
        tracing::warn!(tender = %self.tender.id, %anchor, "anchor does not match any record");
        false
    }

    fn award_chain(&self, contract: &Contract) -> Vec<CardId> {
        contract
            .award_id
            .as_ref()
            .filter(|award_id| self.tender.award(award_id.as_str()).is_some())
            .map(|award_id| CardId::new(CardKind::Award, Some(award_id), 0))
            .into_iter()
            .collect()
    }

    fn containing_contract(&self, anchor: &Anchor) -> Option<(usize, &Contract)> {
        let id = Some(&anchor.id);
        self.tender.contracts.iter().enumerate().find(|(_, contract)| match anchor.kind {
            CardKind::Transaction => contract.transactions().iter().any(|t| t.id.as_ref() == id),
            CardKind::Milestone => contract.milestones.iter().any(|m| m.id.as_ref() == id),
            _ => false,
        })
    }

    fn has_tender_level(&self, kind: CardKind, id: &str) -> bool {
        let id = Some(id);
        let tender = &self.tender;
        match kind {
            CardKind::Item => tender.items.iter().any(|r| r.id.as_deref() == id),
            CardKind::Bid => tender.bids.iter().any(|r| r.id.as_deref() == id),
            CardKind::Award => tender.awards.iter().any(|r| r.id.as_deref() == id),
            CardKind::Contract => tender.contracts.iter().any(|r| r.id.as_deref() == id),
            CardKind::Milestone => tender.milestones.iter().any(|r| r.id.as_deref() == id),
            CardKind::Document => tender.documents.iter().any(|r| r.id.as_deref() == id),
            CardKind::Question => tender.questions.iter().any(|r| r.id.as_deref() == id),
            CardKind::Complaint => tender.complaints.iter().any(|r| r.id.as_deref() == id),
            CardKind::Transaction => false,
        }
    }

    /// Populated sections with their entry counts, in display order.
    #[must_use]
    pub fn sections(&self) -> Vec<(Section, usize)> {
        let tender = &self.tender;
        [
            (Section::Items, tender.items.len()),
            (Section::Bids, tender.bids.len()),
            (Section::Awards, tender.awards.len()),
            (Section::Contracts, tender.contracts.len()),
            (Section::Milestones, tender.milestones.len()),
            (Section::Transactions, self.transactions().len()),
            (Section::Documents, tender.documents.len()),
            (Section::Questions, tender.questions.len()),
            (Section::Complaints, tender.complaints.len()),
            (Section::Revisions, tender.revisions.len()),
        ]
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .collect()
    }

    /// Award cards, each listing its linked contracts.
    #[must_use]
    pub fn awards(&self) -> Vec<AwardCard<'_>> {
        self.tender
            .awards
            .iter()
            .enumerate()
            .map(|(index, award)| AwardCard {
                id: CardId::new(CardKind::Award, award.id.as_ref(), index),
                award,
                contracts: award
                    .id
                    .as_ref()
                    .map(|award_id| {
                        self.contracts()
                            .into_iter()
                            .filter(|card| card.contract.award_id.as_ref() == Some(award_id))
                            .collect()
                    })
                    .unwrap_or_default(),
            })
            .collect()
    }

    /// Contract cards.
    #[must_use]
    pub fn contracts(&self) -> Vec<ContractCard<'_>> {
        self.tender
            .contracts
            .iter()
            .enumerate()
            .map(|(index, contract)| ContractCard {
                id: contract_card(contract, index),
                contract,
            })
            .collect()
    }

    /// Payments across all contracts.
    #[must_use]
    pub fn transactions(&self) -> Vec<TransactionRow<'_>> {
        self.tender
            .contracts
            .iter()
            .flat_map(|contract| {
                contract
                    .transactions()
                    .iter()
                    .map(move |transaction| (contract, transaction))
            })
            .enumerate()
            .map(|(index, (contract, transaction))| TransactionRow {
                id: CardId::new(CardKind::Transaction, transaction.id.as_ref(), index),
                contract,
                transaction,
            })
            .collect()
    }

    /// The most recent revisions.
    #[must_use]
    pub fn revisions(&self) -> RevisionHistory<'_> {
        RevisionHistory::of(&self.tender.revisions)
    }

    /// The title shown in the header.
    #[must_use]
    pub fn title(&self) -> String {
        self.tender.display_title()
    }

    fn all_cards(&self) -> Vec<CardId> {
        let tender = &self.tender;
        cards(CardKind::Item, tender.items.iter().map(|r| r.id.as_ref()))
            .chain(cards(CardKind::Bid, tender.bids.iter().map(|r| r.id.as_ref())))
            .chain(cards(CardKind::Award, tender.awards.iter().map(|r| r.id.as_ref())))
            .chain(cards(CardKind::Contract, tender.contracts.iter().map(|r| r.id.as_ref())))
            .chain(cards(CardKind::Milestone, tender.milestones.iter().map(|r| r.id.as_ref())))
            .chain(cards(CardKind::Document, tender.documents.iter().map(|r| r.id.as_ref())))
            .chain(cards(CardKind::Question, tender.questions.iter().map(|r| r.id.as_ref())))
            .chain(cards(CardKind::Complaint, tender.complaints.iter().map(|r| r.id.as_ref())))
            .chain(self.transactions().into_iter().map(|row| row.id))
            .collect()
    }
}

/// Card ids for one collection of records, in display order.
fn cards<'a>(
    kind: CardKind,
    ids: impl Iterator<Item = Option<&'a RecordId>>,
) -> impl Iterator<Item = CardId> {
    ids.enumerate()
        .map(move |(index, id)| CardId::new(kind, id, index))
}

fn contract_card(contract: &Contract, index: usize) -> CardId {
    CardId::new(CardKind::Contract, contract.id.as_ref(), index)
}

/// An independently fetched contract and the expand state of its cards.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractDetail {
    listing: ContractListing,
    cards: ExpandState,
}

impl ContractDetail {
    /// Opens a contract, revealing `anchor` if given.
    #[must_use]
    pub fn new(listing: ContractListing, anchor: Option<&Anchor>) -> Self {
        let mut detail = Self {
            listing,
            cards: ExpandState::default(),
        };
        if let Some(anchor) = anchor {
            detail.reveal(anchor);
        }
        detail
    }

    /// The contract.
    #[must_use]
    pub const fn contract(&self) -> &Contract {
        &self.listing.contract
    }

    /// The card expand state.
    #[must_use]
    pub const fn cards(&self) -> &ExpandState {
        &self.cards
    }

    /// Flips a card and returns whether it is now expanded.
    pub fn toggle(&mut self, card: &CardId) -> bool {
        self.cards.toggle(card)
    }

    /// Expands every card that has content.
    pub fn expand_all(&mut self) {
        let contract = &self.listing.contract;
        let all: Vec<CardId> = cards(CardKind::Item, contract.items.iter().map(|r| r.id.as_ref()))
            .chain(cards(CardKind::Milestone, contract.milestones.iter().map(|r| r.id.as_ref())))
            .chain(cards(
                CardKind::Transaction,
                contract.transactions().iter().map(|r| r.id.as_ref()),
            ))
            .chain(cards(CardKind::Document, contract.documents.iter().map(|r| r.id.as_ref())))
            .collect();
        for card in all {
            self.cards.expand(card);
        }
    }

    /// Collapses every card.
    pub fn collapse_all(&mut self) {
        self.cards.collapse_all();
    }

    /// The parent tender's title, if known.
    #[must_use]
    pub fn tender_title(&self) -> Option<String> {
        let title = format::title(self.listing.tender_title.as_deref());
        (!title.is_empty()).then_some(title)
    }

    /// The route to the parent tender, with this contract revealed.
    #[must_use]
    pub fn tender_route(&self) -> Option<Route> {
        let tender_id = self.listing.tender_id.clone()?;
        let anchor = self
            .contract()
            .id
            .clone()
            .map(|id| Anchor::new(CardKind::Contract, id));
        Some(Route::tender(tender_id).with_anchor(anchor))
    }

    /// Populated sections with their entry counts, in display order.
    #[must_use]
    pub fn sections(&self) -> Vec<(Section, usize)> {
        let contract = self.contract();
        [
            (Section::Items, contract.items.len()),
            (Section::Milestones, contract.milestones.len()),
            (Section::Transactions, contract.transactions().len()),
            (Section::PurchaseOrders, contract.purchase_orders().len()),
            (Section::AgreedMetrics, contract.agreed_metrics.len()),
            (Section::Documents, contract.documents.len()),
        ]
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .collect()
    }

    /// Expands the card `anchor` names and makes it the scroll target.
    ///
    /// Returns `false` if the contract has no such record.
    pub fn reveal(&mut self, anchor: &Anchor) -> bool {
        let contract = self.contract();
        let id = Some(&anchor.id);
        let found = match anchor.kind {
            CardKind::Item => contract.items.iter().any(|r| r.id.as_ref() == id),
            CardKind::Milestone => contract.milestones.iter().any(|r| r.id.as_ref() == id),
            CardKind::Document => contract.documents.iter().any(|r| r.id.as_ref() == id),
            CardKind::Transaction => contract.transactions().iter().any(|r| r.id.as_ref() == id),
            _ => false,
        };

        if found {
            self.cards.reveal([], CardId::from(anchor));
        } else {
            tracing::warn!(%anchor, "anchor does not match any record");
        }
        found
    }
}
