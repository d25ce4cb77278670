use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::lenient;

/// Catalog-wide totals from `/tenders/stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenderStats {
    /// Number of tenders.
    #[serde(default)]
    pub tenders: u64,
    /// Number of contracts across all tenders.
    #[serde(default)]
    pub contracts: u64,
    /// Number of items across all tenders.
    #[serde(default)]
    pub items: u64,
    /// Number of milestones.
    #[serde(default)]
    pub milestones: u64,
    /// Number of contract transactions.
    #[serde(default)]
    pub transactions: u64,
    /// Number of purchase orders.
    #[serde(default)]
    pub purchase_orders: u64,
    /// Sum of all award values.
    #[serde(default, deserialize_with = "lenient::number::deserialize")]
    pub total_award_value: Option<f64>,
    /// Earliest tender period start.
    #[serde(default, deserialize_with = "lenient::timestamp::deserialize")]
    pub min_date: Option<DateTime<Utc>>,
    /// Latest tender period end.
    #[serde(default, deserialize_with = "lenient::timestamp::deserialize")]
    pub max_date: Option<DateTime<Utc>>,
}

/// Tender counts per status, from `/tenders/meta/statuses`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCounts(BTreeMap<String, u64>);

impl StatusCounts {
    /// Statuses ordered by count, largest first. Ties are ordered by name.
    #[must_use]
    pub fn by_count(&self) -> Vec<(&str, u64)> {
        let mut counts: Vec<_> = self
            .0
            .iter()
            .map(|(status, count)| (status.as_str(), *count))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        counts
    }

    /// Sum of all counts.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    /// Whether no statuses were reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, u64)> for StatusCounts {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl StatusCounts {
    /// Decodes a status map, dropping entries whose count is not a
    /// non-negative integer. A `null` status is reported as `unknown`.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        value
            .as_object()
            .into_iter()
            .flatten()
            .filter_map(|(status, count)| {
                let status = if status.is_empty() || status == "null" {
                    "unknown".to_string()
                } else {
                    status.clone()
                };
                count.as_u64().map(|count| (status, count))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_stats() {
        let stats: TenderStats = serde_json::from_value(json!({
            "tenders": 12,
            "contracts": 4,
            "purchaseOrders": 2,
            "totalAwardValue": 1500.5,
            "minDate": "2023-01-01T00:00:00",
            "maxDate": null
        }))
        .unwrap();

        assert_eq!(stats.tenders, 12);
        assert_eq!(stats.purchase_orders, 2);
        assert_eq!(stats.items, 0);
        assert_eq!(stats.total_award_value, Some(1500.5));
        assert!(stats.min_date.is_some());
        assert!(stats.max_date.is_none());
    }

    #[test]
    fn orders_statuses_by_count() {
        let counts = StatusCounts::from_json(&json!({
            "complete": 3,
            "active": 10,
            "cancelled": 3,
            "null": 1,
            "bogus": "many"
        }));

        assert_eq!(
            counts.by_count(),
            vec![("active", 10), ("cancelled", 3), ("complete", 3), ("unknown", 1)]
        );
        assert_eq!(counts.total(), 17);
    }

    #[test]
    fn non_object_is_empty() {
        assert!(StatusCounts::from_json(&json!([1, 2])).is_empty());
    }
}
