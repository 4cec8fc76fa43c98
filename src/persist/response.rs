//! Stored Response
//!
//! The wire-level response kept by the persistent store.

use chrono::{DateTime, Utc};
use http::header::{HeaderName, ETAG, LAST_MODIFIED};
use http::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

/// Status, headers and body of a cached response, plus when it was
/// requested and received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub status: u16,
    /// Header name/value pairs in received order
    pub headers: Vec<(String, String)>,
    #[serde(with = "body_base64")]
    pub body: Vec<u8>,
    pub request_date: DateTime<Utc>,
    pub response_date: DateTime<Utc>,
}

impl StoredResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Vec<u8>>) -> Self {
        let now = Utc::now();
        Self {
            status,
            headers,
            body: body.into(),
            request_date: now,
            response_date: now,
        }
    }

    /// First value of the named header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn etag(&self) -> Option<&str> {
        self.header(ETAG.as_str())
    }

    pub fn last_modified(&self) -> Option<&str> {
        self.header(LAST_MODIFIED.as_str())
    }

    /// Headers in transport form. Pairs that are not valid HTTP headers are
    /// skipped.
    pub fn header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                map.append(name, value);
            }
        }
        map
    }

    /// Replaces the headers with those in `map`. Non-text values are skipped.
    pub fn set_headers(&mut self, map: &HeaderMap) {
        self.headers = map
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
    }
}

mod body_base64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded.as_bytes()).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staleness::{DefaultStalenessPolicy, StalenessPolicy};

    fn sample() -> StoredResponse {
        StoredResponse::new(
            200,
            vec![
                ("Content-Type".to_string(), "application/xml".to_string()),
                ("ETag".to_string(), "\"abc\"".to_string()),
                ("Last-Modified".to_string(), "Tue, 15 Nov 1994 12:45:26 GMT".to_string()),
            ],
            b"<marketplace/>".to_vec(),
        )
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = sample();
        assert_eq!(response.header("content-type"), Some("application/xml"));
        assert_eq!(response.etag(), Some("\"abc\""));
        assert_eq!(response.last_modified(), Some("Tue, 15 Nov 1994 12:45:26 GMT"));
        assert_eq!(response.header("x-missing"), None);
    }

    #[test]
    fn test_body_serialized_as_base64() {
        let response = StoredResponse::new(200, Vec::new(), vec![0u8, 255, 10]);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["body"], "AP8K");

        let back: StoredResponse = serde_json::from_value(json).unwrap();
        assert_eq!(back, response);
    }

    #[test]
    fn test_invalid_base64_rejected() {
        let mut json = serde_json::to_value(sample()).unwrap();
        json["body"] = serde_json::Value::String("***".to_string());
        assert!(serde_json::from_value::<StoredResponse>(json).is_err());
    }

    #[test]
    fn test_header_map_skips_invalid_pairs() {
        let mut response = sample();
        response.headers.push(("bad name".to_string(), "v".to_string()));

        let map = response.header_map();
        assert_eq!(map.len(), 3);
        assert_eq!(map.get("etag").unwrap(), "\"abc\"");
    }

    #[test]
    fn test_decorated_headers_round_trip() {
        let mut response = sample();
        let mut map = response.header_map();
        DefaultStalenessPolicy::default().decorate_response(&mut map);
        response.set_headers(&map);

        assert_eq!(
            response.header("cache-control"),
            Some("stale-while-revalidate=43200")
        );
        assert_eq!(response.headers.len(), 4);
    }
}
