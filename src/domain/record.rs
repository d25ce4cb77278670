//! Typed procurement records.
//!
//! Every field other than a record's identifier is optional; nested
//! collections default to empty and malformed entries are dropped rather
//! than failing the enclosing record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{RecordId, format, lenient};

/// A monetary amount.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Value {
    /// The numeric amount.
    #[serde(default, deserialize_with = "lenient::number::deserialize")]
    pub amount: Option<f64>,
    /// ISO 4217 currency code.
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub currency: Option<String>,
}

/// A period of time. Either bound may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    /// Start of the period.
    #[serde(default, deserialize_with = "lenient::timestamp::deserialize")]
    pub start_date: Option<DateTime<Utc>>,
    /// End of the period.
    #[serde(default, deserialize_with = "lenient::timestamp::deserialize")]
    pub end_date: Option<DateTime<Utc>>,
}

/// A postal address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct Address {
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub street_address: Option<String>,
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub locality: Option<String>,
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub postal_code: Option<String>,
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub country_name: Option<String>,
}

impl Address {
    /// Joins the populated address lines with `", "`.
    #[must_use]
    pub fn one_line(&self) -> Option<String> {
        let parts: Vec<&str> = [
            &self.street_address,
            &self.locality,
            &self.region,
            &self.country_name,
            &self.postal_code,
        ]
        .into_iter()
        .filter_map(|part| part.as_deref())
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();

        (!parts.is_empty()).then(|| parts.join(", "))
    }
}

/// Registered identifier of an organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identifier {
    /// Identifier scheme, e.g. a national company register.
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub scheme: Option<String>,
    /// Identifier within the scheme.
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub id: Option<String>,
    /// Registered legal name.
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub legal_name: Option<String>,
}

/// Contact details for an organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ContactPoint {
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub telephone: Option<String>,
}

/// A buyer, supplier, tenderer, payer or payee.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    /// Organization reference within the release.
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub id: Option<RecordId>,
    /// Display name.
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub name: Option<String>,
    /// Primary identifier.
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub identifier: Option<Identifier>,
    /// Postal address.
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub address: Option<Address>,
    /// Contact point.
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub contact_point: Option<ContactPoint>,
}

impl Organization {
    /// The legal name when registered, otherwise the display name.
    #[must_use]
    pub fn legal_name(&self) -> Option<&str> {
        self.identifier
            .as_ref()
            .and_then(|identifier| identifier.legal_name.as_deref())
            .or(self.name.as_deref())
    }
}

/// Classification of an item, e.g. a CPV code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Classification {
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub scheme: Option<String>,
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub description: Option<String>,
}

/// Unit of measure for an item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Unit {
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub value: Option<Value>,
}

/// A line item of goods, works or services.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Item reference within the record.
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub id: Option<RecordId>,
    /// Free-text description.
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub description: Option<String>,
    /// Quantity ordered.
    #[serde(default, deserialize_with = "lenient::number::deserialize")]
    pub quantity: Option<f64>,
    /// Unit of measure.
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub unit: Option<Unit>,
    /// Primary classification.
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub classification: Option<Classification>,
    /// Expected delivery window.
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub delivery_date: Option<Period>,
    /// Delivery location.
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub delivery_address: Option<Address>,
}

/// A bid submitted by one or more tenderers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    /// Bid reference within the tender.
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub id: Option<RecordId>,
    /// Bid status.
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub status: Option<String>,
    /// Offered value.
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub value: Option<Value>,
    /// Submission time.
    #[serde(default, deserialize_with = "lenient::timestamp::deserialize")]
    pub date: Option<DateTime<Utc>>,
    /// Bidding organizations; the first is the lead tenderer.
    #[serde(default, deserialize_with = "lenient::seq::deserialize")]
    pub tenderers: Vec<Organization>,
}

impl Bid {
    /// The lead tenderer, if any.
    #[must_use]
    pub fn tenderer(&self) -> Option<&Organization> {
        self.tenderers.first()
    }
}

/// The decision assigning (part of) a tender to a supplier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Award {
    /// Award identifier, referenced by `Contract::award_id`.
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub id: Option<RecordId>,
    /// Award title.
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub title: Option<String>,
    /// Award status (pending, active, cancelled, unsuccessful).
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub status: Option<String>,
    /// Awarded value.
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub value: Option<Value>,
    /// Awarded suppliers; the first is the primary supplier.
    #[serde(default, deserialize_with = "lenient::seq::deserialize")]
    pub suppliers: Vec<Organization>,
    /// The winning bid.
    #[serde(
        default,
        rename = "bid_id",
        alias = "bidID",
        alias = "relatedBid",
        deserialize_with = "lenient::text::deserialize"
    )]
    pub bid_id: Option<String>,
    /// Date of the award decision.
    #[serde(default, deserialize_with = "lenient::timestamp::deserialize")]
    pub date: Option<DateTime<Utc>>,
}

impl Award {
    /// The primary supplier, if any.
    #[must_use]
    pub fn supplier(&self) -> Option<&Organization> {
        self.suppliers.first()
    }
}

/// A contract or tender milestone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    /// Milestone reference.
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub id: Option<RecordId>,
    /// Milestone title.
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub title: Option<String>,
    /// Free-text description.
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub description: Option<String>,
    /// Milestone type (e.g. `payment`, `delivery`).
    #[serde(default, rename = "type", deserialize_with = "lenient::text::deserialize")]
    pub kind: Option<String>,
    /// Milestone code.
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub code: Option<String>,
    /// Milestone status (scheduled, met, notMet).
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub status: Option<String>,
    /// When the milestone is due.
    #[serde(default, deserialize_with = "lenient::timestamp::deserialize")]
    pub due_date: Option<DateTime<Utc>>,
    /// When the milestone was met.
    #[serde(default, deserialize_with = "lenient::timestamp::deserialize")]
    pub date_met: Option<DateTime<Utc>>,
}

/// A payment made under a contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction reference.
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub id: Option<RecordId>,
    /// Payment date.
    #[serde(default, deserialize_with = "lenient::timestamp::deserialize")]
    pub date: Option<DateTime<Utc>>,
    /// Amount paid.
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub value: Option<Value>,
    /// Paying organization.
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub payer: Option<Organization>,
    /// Receiving organization.
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub payee: Option<Organization>,
}

/// A purchase order issued under a framework contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrder {
    /// Order reference.
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub id: Option<RecordId>,
    /// Order status.
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub status: Option<String>,
    /// Order value.
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub value: Option<Value>,
    /// Window in which the order is executed.
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub execution_period: Option<Period>,
}

/// Execution data for a contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Implementation {
    /// Payments made.
    #[serde(default, deserialize_with = "lenient::seq::deserialize")]
    pub transactions: Vec<Transaction>,
    /// Purchase orders issued.
    #[serde(default, deserialize_with = "lenient::seq::deserialize")]
    pub purchase_orders: Vec<PurchaseOrder>,
}

/// A performance metric agreed in a contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct AgreedMetric {
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub id: Option<RecordId>,
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub description: Option<String>,
}

/// A published document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Document reference.
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub id: Option<RecordId>,
    /// Document title.
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub title: Option<String>,
    /// OCDS document type (e.g. `tenderNotice`).
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub document_type: Option<String>,
    /// Download location.
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub url: Option<String>,
    /// MIME type.
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub format: Option<String>,
    /// Publication date.
    #[serde(default, deserialize_with = "lenient::timestamp::deserialize")]
    pub date_published: Option<DateTime<Utc>>,
}

/// A clarification question raised during the enquiry period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Question {
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub id: Option<RecordId>,
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub answer: Option<String>,
    #[serde(default, deserialize_with = "lenient::timestamp::deserialize")]
    pub date: Option<DateTime<Utc>>,
}

/// A complaint lodged against the procedure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Complaint {
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub id: Option<RecordId>,
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient::timestamp::deserialize")]
    pub date: Option<DateTime<Utc>>,
}

/// An entry in a record's revision history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    /// When the revision was made.
    #[serde(default, deserialize_with = "lenient::timestamp::deserialize")]
    pub date: Option<DateTime<Utc>>,
    /// Who made the revision.
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub author: Option<String>,
    /// The individual field changes.
    #[serde(default, deserialize_with = "lenient::seq::deserialize")]
    pub changes: Vec<serde_json::Value>,
}

/// A procurement solicitation together with its nested sub-entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tender {
    /// Server-assigned identifier.
    pub id: RecordId,
    /// Human-facing tender number.
    #[serde(
        default,
        rename = "tenderID",
        deserialize_with = "lenient::text::deserialize"
    )]
    pub tender_id: Option<String>,
    /// Title, possibly carrying test markers.
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub title: Option<String>,
    /// Free-text description.
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub description: Option<String>,
    /// Tender status (planning, active, complete, cancelled, ...).
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub status: Option<String>,
    /// Estimated value.
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub value: Option<Value>,
    /// Minimal bid step for auctions.
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub minimal_step: Option<Value>,
    /// Procurement method (open, selective, limited, direct).
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub procurement_method: Option<String>,
    /// Detailed procurement method name.
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub procurement_method_details: Option<String>,
    /// Award criteria.
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub award_criteria: Option<String>,
    /// Submission method(s).
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub submission_method: Option<SubmissionMethod>,
    /// The buyer running the procedure.
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub procuring_entity: Option<Organization>,
    /// Period in which bids are accepted.
    #[serde(
        default,
        alias = "period",
        deserialize_with = "lenient::opt::deserialize"
    )]
    pub tender_period: Option<Period>,
    /// Period in which questions are accepted.
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub enquiry_period: Option<Period>,
    /// Period in which complaints are accepted.
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub complaint_period: Option<Period>,
    /// Last modification time.
    #[serde(default, deserialize_with = "lenient::timestamp::deserialize")]
    pub date_modified: Option<DateTime<Utc>>,
    /// Link to the tender on the originating platform.
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub source_url: Option<String>,
    /// Items being procured.
    #[serde(default, deserialize_with = "lenient::seq::deserialize")]
    pub items: Vec<Item>,
    /// Submitted bids.
    #[serde(default, deserialize_with = "lenient::seq::deserialize")]
    pub bids: Vec<Bid>,
    /// Award decisions.
    #[serde(default, deserialize_with = "lenient::seq::deserialize")]
    pub awards: Vec<Award>,
    /// Signed contracts.
    #[serde(default, deserialize_with = "lenient::seq::deserialize")]
    pub contracts: Vec<Contract>,
    /// Tender-level milestones.
    #[serde(default, deserialize_with = "lenient::seq::deserialize")]
    pub milestones: Vec<Milestone>,
    /// Published documents.
    #[serde(default, deserialize_with = "lenient::seq::deserialize")]
    pub documents: Vec<Document>,
    /// Enquiries and answers.
    #[serde(default, deserialize_with = "lenient::seq::deserialize")]
    pub questions: Vec<Question>,
    /// Complaints.
    #[serde(default, deserialize_with = "lenient::seq::deserialize")]
    pub complaints: Vec<Complaint>,
    /// Revision history, in publication order.
    #[serde(default, deserialize_with = "lenient::seq::deserialize")]
    pub revisions: Vec<Revision>,
}

/// Submission methods are published either as a single string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubmissionMethod {
    /// A single method.
    One(String),
    /// Several methods.
    Many(Vec<String>),
}

impl std::fmt::Display for SubmissionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::One(method) => f.write_str(method),
            Self::Many(methods) => f.write_str(&methods.join(", ")),
        }
    }
}

impl Tender {
    /// The title with test-environment markers removed.
    #[must_use]
    pub fn display_title(&self) -> String {
        let title = format::title(self.title.as_deref());
        if title.is_empty() {
            "Untitled Tender".to_string()
        } else {
            title
        }
    }

    /// The number of nested detail entries.
    ///
    /// This is the quantity the backend orders by for the `complexity` sort
    /// key.
    #[must_use]
    pub fn complexity(&self) -> usize {
        self.awards.len()
            + self.contracts.len()
            + self.documents.len()
            + self.items.len()
            + self.milestones.len()
            + self.bids.len()
    }

    /// Contracts whose `awardID` refers to the given award.
    pub fn contracts_for_award<'a>(
        &'a self,
        award_id: &'a RecordId,
    ) -> impl Iterator<Item = &'a Contract> + 'a {
        self.contracts
            .iter()
            .filter(move |contract| contract.award_id.as_ref() == Some(award_id))
    }

    /// Finds a contract by id.
    #[must_use]
    pub fn contract(&self, id: &str) -> Option<&Contract> {
        self.contracts
            .iter()
            .find(|contract| contract.id.as_deref() == Some(id))
    }

    /// Finds an award by id.
    #[must_use]
    pub fn award(&self, id: &str) -> Option<&Award> {
        self.awards
            .iter()
            .find(|award| award.id.as_deref() == Some(id))
    }
}

/// A legal agreement resulting from an award.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    /// Contract identifier.
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub id: Option<RecordId>,
    /// Human-facing contract number.
    #[serde(
        default,
        rename = "contractID",
        deserialize_with = "lenient::text::deserialize"
    )]
    pub contract_id: Option<String>,
    /// The award this contract executes.
    #[serde(
        default,
        rename = "awardID",
        deserialize_with = "lenient::opt::deserialize"
    )]
    pub award_id: Option<RecordId>,
    /// Contract title.
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub title: Option<String>,
    /// Free-text description.
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub description: Option<String>,
    /// Contract status (pending, active, terminated, cancelled).
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub status: Option<String>,
    /// Contract value.
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub value: Option<Value>,
    /// Signature date.
    #[serde(default, deserialize_with = "lenient::timestamp::deserialize")]
    pub date_signed: Option<DateTime<Utc>>,
    /// Contract duration.
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub period: Option<Period>,
    /// Contracted items.
    #[serde(default, deserialize_with = "lenient::seq::deserialize")]
    pub items: Vec<Item>,
    /// Execution milestones.
    #[serde(default, deserialize_with = "lenient::seq::deserialize")]
    pub milestones: Vec<Milestone>,
    /// Contract documents.
    #[serde(default, deserialize_with = "lenient::seq::deserialize")]
    pub documents: Vec<Document>,
    /// Execution data.
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub implementation: Option<Implementation>,
    /// Agreed performance metrics.
    #[serde(default, deserialize_with = "lenient::seq::deserialize")]
    pub agreed_metrics: Vec<AgreedMetric>,
}

impl Contract {
    /// Payments made under this contract.
    #[must_use]
    pub fn transactions(&self) -> &[Transaction] {
        self.implementation
            .as_ref()
            .map_or(&[], |implementation| &implementation.transactions)
    }

    /// Purchase orders issued under this contract.
    #[must_use]
    pub fn purchase_orders(&self) -> &[PurchaseOrder] {
        self.implementation
            .as_ref()
            .map_or(&[], |implementation| &implementation.purchase_orders)
    }

    /// A heading for the contract: its title, number, or id.
    #[must_use]
    pub fn heading(&self) -> String {
        self.title
            .clone()
            .or_else(|| self.contract_id.clone())
            .or_else(|| self.id.as_ref().map(|id| format!("Contract {id}")))
            .unwrap_or_else(|| "Contract".to_string())
    }
}

/// A contract together with the tender it belongs to, as returned by the
/// `/contracts` endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractListing {
    /// The contract itself.
    pub contract: Contract,
    /// Identifier of the parent tender.
    #[serde(default, deserialize_with = "lenient::opt::deserialize")]
    pub tender_id: Option<RecordId>,
    /// Title of the parent tender.
    #[serde(default, deserialize_with = "lenient::text::deserialize")]
    pub tender_title: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn tender(value: serde_json::Value) -> Tender {
        serde_json::from_value(value).expect("tender should decode")
    }

    #[test]
    fn decodes_minimal_tender() {
        let tender = tender(json!({"id": "T1"}));
        assert_eq!(tender.id.as_str(), "T1");
        assert!(tender.items.is_empty());
        assert!(tender.value.is_none());
        assert_eq!(tender.display_title(), "Untitled Tender");
    }

    #[test]
    fn tender_without_id_is_rejected() {
        let result: Result<Tender, _> = serde_json::from_value(json!({"title": "x"}));
        assert!(result.is_err());
    }

    #[test]
    fn malformed_sub_fields_do_not_fail_the_record() {
        let tender = tender(json!({
            "id": "T1",
            "value": "lots",
            "tenderPeriod": {"startDate": "not a date", "endDate": "2024-05-01"},
            "items": [{"id": "I1", "quantity": "3"}, "junk"],
            "awards": null,
            "bids": {"details": []},
            "procuringEntity": {"name": "City", "address": 7}
        }));

        assert!(tender.value.is_none());
        let period = tender.tender_period.expect("period");
        assert!(period.start_date.is_none());
        assert!(period.end_date.is_some());
        assert_eq!(tender.items.len(), 1);
        assert_eq!(tender.items[0].quantity, Some(3.0));
        assert!(tender.awards.is_empty());
        assert!(tender.bids.is_empty());
        let entity = tender.procuring_entity.expect("entity");
        assert_eq!(entity.name.as_deref(), Some("City"));
        assert!(entity.address.is_none());
    }

    #[test]
    fn mistyped_text_fields_do_not_drop_records() {
        let tender = tender(json!({
            "id": "T1",
            "title": 12345,
            "status": {"code": "active"},
            "awards": [{"id": "A1", "status": ["active"], "title": true}],
            "contracts": [{"id": "C1", "awardID": "A1", "status": {"code": "active"}}],
            "milestones": [{"id": "M1", "title": {"en": "Delivery"}}],
            "documents": [{"id": "D1", "title": 7}]
        }));

        assert_eq!(tender.title.as_deref(), Some("12345"));
        assert!(tender.status.is_none());
        assert_eq!(tender.awards.len(), 1);
        assert!(tender.awards[0].status.is_none());
        assert_eq!(tender.awards[0].title.as_deref(), Some("true"));
        assert_eq!(tender.contracts.len(), 1);
        assert!(tender.contracts[0].status.is_none());
        assert_eq!(tender.milestones.len(), 1);
        assert!(tender.milestones[0].title.is_none());
        assert_eq!(tender.documents[0].title.as_deref(), Some("7"));

        let award_id = RecordId::new("A1").unwrap();
        assert_eq!(tender.contracts_for_award(&award_id).count(), 1);
        assert!(tender.contract("C1").is_some());
    }

    #[test]
    fn period_alias_is_accepted() {
        let tender = tender(json!({
            "id": "T1",
            "period": {"startDate": "2024-01-01"}
        }));
        assert!(tender.tender_period.unwrap().start_date.is_some());
    }

    #[test]
    fn links_contracts_to_awards() {
        let tender = tender(json!({
            "id": "T1",
            "awards": [{"id": "A1"}, {"id": "A2"}],
            "contracts": [
                {"id": "C1", "awardID": "A1"},
                {"id": "C2", "awardID": "A2"},
                {"id": "C3", "awardID": "A1"},
                {"id": "C4"}
            ]
        }));

        let award_id = RecordId::new("A1").unwrap();
        let linked: Vec<_> = tender
            .contracts_for_award(&award_id)
            .filter_map(|contract| contract.id.as_deref())
            .collect();
        assert_eq!(linked, ["C1", "C3"]);
    }

    #[test]
    fn complexity_counts_nested_entries() {
        let tender = tender(json!({
            "id": "T1",
            "awards": [{}],
            "contracts": [{}, {}],
            "documents": [{}],
            "items": [{}],
            "milestones": [],
            "bids": [{}],
            "questions": [{}]
        }));
        assert_eq!(tender.complexity(), 6);
    }

    #[test]
    fn submission_method_accepts_string_or_list() {
        let single = tender(json!({"id": "T1", "submissionMethod": "electronicSubmission"}));
        assert_eq!(
            single.submission_method.unwrap().to_string(),
            "electronicSubmission"
        );

        let many = tender(json!({"id": "T1", "submissionMethod": ["inPerson", "written"]}));
        assert_eq!(many.submission_method.unwrap().to_string(), "inPerson, written");
    }

    #[test]
    fn contract_accessors_flatten_implementation() {
        let contract: Contract = serde_json::from_value(json!({
            "id": "C1",
            "implementation": {
                "transactions": [{"id": "X1", "value": {"amount": 10}}],
                "purchaseOrders": [{"id": "PO1"}]
            }
        }))
        .unwrap();

        assert_eq!(contract.transactions().len(), 1);
        assert_eq!(contract.purchase_orders().len(), 1);
        assert_eq!(contract.heading(), "Contract C1");
        assert!(Contract::default().transactions().is_empty());
    }

    #[test]
    fn address_one_line_skips_blank_parts() {
        let address = Address {
            street_address: Some("1 Main St".into()),
            locality: Some(" ".into()),
            region: Some("Oregon".into()),
            ..Address::default()
        };
        assert_eq!(address.one_line().as_deref(), Some("1 Main St, Oregon"));
        assert!(Address::default().one_line().is_none());
    }

    #[test]
    fn organization_prefers_legal_name() {
        let org: Organization = serde_json::from_value(json!({
            "name": "ACME",
            "identifier": {"legalName": "ACME Holdings LLC", "id": 1234}
        }))
        .unwrap();
        assert_eq!(org.legal_name(), Some("ACME Holdings LLC"));
        assert!(org.identifier.unwrap().id.is_none());
    }
}
