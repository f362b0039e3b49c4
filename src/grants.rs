//! Grants-opportunity search client.
//!
//! Speaks the `search2` endpoint: `POST {keyword, rows, oppStatuses}` and
//! reads hits from `data.oppHits`. No authentication header is sent.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::config::GrantsConfig;
use crate::error::UpstreamError;
use crate::models::GrantHit;

const SERVICE: &str = "grants";

#[async_trait]
pub trait GrantSearch: Send + Sync {
    /// Returns the hits for one keyword. A well-formed response with no
    /// hits is `Ok(vec![])`, not an error.
    async fn search(&self, keyword: &str) -> Result<Vec<GrantHit>, UpstreamError>;
}

#[derive(Debug, Clone)]
pub struct GrantsGovClient {
    client: reqwest::Client,
    url: String,
    rows: u32,
    opp_statuses: String,
}

impl GrantsGovClient {
    pub fn new(config: &GrantsConfig) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| UpstreamError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: format!("{}/search2", config.base_url.trim_end_matches('/')),
            rows: config.rows,
            opp_statuses: config.opp_statuses.clone(),
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    keyword: &'a str,
    rows: u32,
    opp_statuses: &'a str,
}

#[derive(Deserialize)]
struct SearchResponse {
    data: Option<SearchData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchData {
    opp_hits: Option<Vec<Value>>,
}

/// Reads `data.oppHits`. A missing path means zero hits. Entries that are
/// not JSON objects carry no identifier and are dropped with a warning;
/// field types inside an object never cost the hit.
fn parse_hits(keyword: &str, body: &str) -> Result<Vec<GrantHit>, UpstreamError> {
    let parsed: SearchResponse = serde_json::from_str(body)
        .map_err(|e| UpstreamError::parse(SERVICE, format!("invalid JSON: {}", e)))?;

    let raw = parsed
        .data
        .and_then(|d| d.opp_hits)
        .unwrap_or_default();

    let mut hits = Vec::with_capacity(raw.len());
    for value in raw {
        match serde_json::from_value::<GrantHit>(value) {
            Ok(hit) => hits.push(hit),
            Err(e) => tracing::warn!(keyword, error = %e, "dropping grant hit that is not an object"),
        }
    }
    Ok(hits)
}

#[async_trait]
impl GrantSearch for GrantsGovClient {
    async fn search(&self, keyword: &str) -> Result<Vec<GrantHit>, UpstreamError> {
        let body = SearchRequest {
            keyword,
            rows: self.rows,
            opp_statuses: &self.opp_statuses,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| UpstreamError::transport(SERVICE, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| UpstreamError::transport(SERVICE, e))?;

        if !status.is_success() {
            return Err(UpstreamError::Status {
                service: SERVICE,
                status: status.as_u16(),
                body: text,
            });
        }

        parse_hits(keyword, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hits() {
        let body = r#"{"errorcode":0,"data":{"hitCount":2,"oppHits":[
            {"id":"1","title":"A","agencyName":"NIH"},
            {"id":2,"title":"B"}
        ]}}"#;
        let hits = parse_hits("genomics", body).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].key().as_deref(), Some("2"));
    }

    #[test]
    fn test_missing_opp_hits_is_zero_hits() {
        assert!(parse_hits("x", r#"{"data":{}}"#).unwrap().is_empty());
        assert!(parse_hits("x", r#"{"errorcode":0}"#).unwrap().is_empty());
    }

    #[test]
    fn test_hit_with_odd_field_types_survives() {
        let body = r#"{"data":{"oppHits":[
            {"id":"355012","title":"Real grant","number":12345,"agencyCode":"NSF"},
            "not a hit",
            {"id":"2"}
        ]}}"#;
        let hits = parse_hits("x", body).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].key().as_deref(), Some("355012"));
        assert_eq!(hits[0].number().as_deref(), Some("12345"));
        assert_eq!(hits[0].agency_label(), "NSF");

        let back = serde_json::to_value(&hits[0]).unwrap();
        assert_eq!(back["number"], 12345);
        assert_eq!(back["title"], "Real grant");
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = parse_hits("x", "not json").unwrap_err();
        assert!(matches!(err, UpstreamError::Parse { .. }));
    }

    #[test]
    fn test_request_body_shape() {
        let body = SearchRequest {
            keyword: "crispr",
            rows: 10,
            opp_statuses: "forecasted|posted",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"keyword": "crispr", "rows": 10, "oppStatuses": "forecasted|posted"})
        );
    }
}
