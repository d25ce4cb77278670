//! Normalization of OCDS releases into flat tender documents.
//!
//! The catalog stores compiled releases, where the tender proper lives
//! under a `tender` key and awards, contracts and bids sit beside it. Views
//! work on a single flat [`Tender`](super::Tender), so releases are folded
//! before decoding. Documents that are already flat pass through unchanged.

use serde_json::{Map, Value};

/// Collections that may be published at release level instead of inside
/// the tender.
const RELEASE_COLLECTIONS: [&str; 5] = ["awards", "contracts", "bids", "documents", "milestones"];

/// Folds a release into a flat tender document.
///
/// - Fields of the nested `tender` object take precedence.
/// - Release-level collections fill in collections the tender lacks.
/// - `bids: {details: [...]}` is unwrapped to a plain list.
/// - The release `date` becomes `dateModified` when the tender has none.
/// - The release `id` (or `ocid`) identifies the tender when it has none.
#[must_use]
pub fn flatten_release(document: Value) -> Value {
    let Value::Object(mut release) = document else {
        return document;
    };

    let Some(Value::Object(mut tender)) = release.remove("tender") else {
        unwrap_bid_details(&mut release);
        return Value::Object(release);
    };

    for key in RELEASE_COLLECTIONS {
        if is_missing(tender.get(key)) {
            if let Some(collection) = release.remove(key) {
                tender.insert(key.to_string(), collection);
            }
        }
    }
    unwrap_bid_details(&mut tender);

    if is_missing(tender.get("dateModified")) {
        if let Some(date) = release.remove("date") {
            tender.insert("dateModified".to_string(), date);
        }
    }

    if is_missing(tender.get("id")) {
        if let Some(id) = release
            .remove("id")
            .filter(|id| !id.is_null())
            .or_else(|| release.remove("ocid"))
        {
            tender.insert("id".to_string(), id);
        }
    }

    if is_missing(tender.get("tenderID")) {
        if let Some(ocid) = release.remove("ocid") {
            tender.insert("tenderID".to_string(), ocid);
        }
    }

    Value::Object(tender)
}

fn unwrap_bid_details(document: &mut Map<String, Value>) {
    if let Some(Value::Object(bids)) = document.get_mut("bids") {
        let details = bids.remove("details").unwrap_or(Value::Null);
        document.insert("bids".to_string(), details);
    }
}

fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Array(entries)) => entries.is_empty(),
        Some(Value::String(text)) => text.trim().is_empty(),
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn flat_documents_pass_through() {
        let flat = json!({"id": "T1", "title": "Roads", "awards": [{"id": "A1"}]});
        assert_eq!(flatten_release(flat.clone()), flat);
    }

    #[test]
    fn folds_release_level_collections() {
        let release = json!({
            "id": "R1",
            "ocid": "ocds-abc-1",
            "date": "2024-04-01T00:00:00Z",
            "tender": {"title": "Bridge", "awards": []},
            "awards": [{"id": "A1"}],
            "contracts": [{"id": "C1", "awardID": "A1"}],
            "bids": {"details": [{"id": "B1"}]}
        });

        let flat = flatten_release(release);

        assert_eq!(flat["id"], "R1");
        assert_eq!(flat["tenderID"], "ocds-abc-1");
        assert_eq!(flat["title"], "Bridge");
        assert_eq!(flat["dateModified"], "2024-04-01T00:00:00Z");
        assert_eq!(flat["awards"], json!([{"id": "A1"}]));
        assert_eq!(flat["contracts"][0]["id"], "C1");
        assert_eq!(flat["bids"], json!([{"id": "B1"}]));
    }

    #[test]
    fn tender_fields_take_precedence() {
        let release = json!({
            "id": "R1",
            "date": "2020-01-01",
            "tender": {
                "id": "T1",
                "tenderID": "UA-1",
                "dateModified": "2024-01-01",
                "awards": [{"id": "A9"}]
            },
            "awards": [{"id": "A1"}]
        });

        let flat = flatten_release(release);

        assert_eq!(flat["id"], "T1");
        assert_eq!(flat["tenderID"], "UA-1");
        assert_eq!(flat["dateModified"], "2024-01-01");
        assert_eq!(flat["awards"], json!([{"id": "A9"}]));
    }

    #[test]
    fn ocid_identifies_release_without_id() {
        let flat = flatten_release(json!({"ocid": "ocds-1", "tender": {}}));
        assert_eq!(flat["id"], "ocds-1");
    }

    #[test]
    fn unwraps_bids_on_flat_documents() {
        let flat = flatten_release(json!({"id": "T1", "bids": {"details": [{"id": "B1"}]}}));
        assert_eq!(flat["bids"], json!([{"id": "B1"}]));
    }

    #[test]
    fn non_objects_pass_through() {
        assert_eq!(flatten_release(json!("T1")), json!("T1"));
    }
}
