use serde_json::Value;

/// A response body split into its payload and list metadata.
///
/// The API wraps most payloads as `{"data": ..., "meta": {"total": n}}`
/// but some endpoints return the payload bare.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<'a> {
    /// The payload. `Value::Null` means the record was not found.
    pub data: &'a Value,
    /// Total matching records across all pages, if reported.
    pub total: Option<u64>,
}

impl<'a> Envelope<'a> {
    /// Splits a response body.
    #[must_use]
    pub fn open(body: &'a Value) -> Self {
        match body.as_object() {
            Some(object) if object.contains_key("data") => Self {
                data: &object["data"],
                total: object
                    .get("meta")
                    .and_then(|meta| meta.get("total"))
                    .and_then(Value::as_u64),
            },
            _ => Self {
                data: body,
                total: None,
            },
        }
    }

    /// The payload entries, or an empty slice if the payload is not a list.
    #[must_use]
    pub fn entries(&self) -> &'a [Value] {
        self.data.as_array().map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn opens_wrapped_list() {
        let body = json!({"data": [{"id": "T1"}], "meta": {"total": 31, "limit": 1}});
        let envelope = Envelope::open(&body);
        assert_eq!(envelope.entries().len(), 1);
        assert_eq!(envelope.total, Some(31));
    }

    #[test]
    fn bare_body_is_the_payload() {
        let body = json!({"active": 3});
        let envelope = Envelope::open(&body);
        assert_eq!(envelope.data, &body);
        assert_eq!(envelope.total, None);
        assert!(envelope.entries().is_empty());
    }

    #[test]
    fn null_data_is_not_found() {
        let body = json!({"data": null, "error": "Not Found"});
        assert!(Envelope::open(&body).data.is_null());
    }
}
