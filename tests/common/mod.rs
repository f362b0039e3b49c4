#![allow(dead_code)]

use std::collections::HashMap;

use grant_beacon::config::{Config, Credential};
use grant_beacon::pipeline::Services;
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const KEYWORD_PROMPT: &str = "Extract 5-10 relevant keywords";
pub const RANKING_PROMPT: &str = "Rank the relevance";

/// One mock server per upstream.
pub struct Upstreams {
    pub profile: MockServer,
    pub chat: MockServer,
    pub grants: MockServer,
}

impl Upstreams {
    pub async fn start() -> Self {
        Self {
            profile: MockServer::start().await,
            chat: MockServer::start().await,
            grants: MockServer::start().await,
        }
    }

    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.profile.base_url = self.profile.uri();
        config.profile.timeout_secs = 2;
        config.chat.base_url = self.chat.uri();
        config.chat.timeout_secs = 2;
        config.grants.base_url = self.grants.uri();
        config.grants.timeout_secs = 2;
        config
    }

    pub fn services(&self, config: &Config) -> Services {
        Services::from_credentials(
            config,
            &Credential::Valid("pplx-test".to_string()),
            &Credential::Valid("sk-test".to_string()),
        )
        .unwrap()
    }

    pub async fn mount_profile(&self, text: &str) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(chat_reply(text))
            .mount(&self.profile)
            .await;
    }

    pub async fn mount_keywords(&self, reply: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains(KEYWORD_PROMPT))
            .respond_with(reply)
            .mount(&self.chat)
            .await;
    }

    pub async fn mount_ranking(&self, reply: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains(RANKING_PROMPT))
            .respond_with(reply)
            .mount(&self.chat)
            .await;
    }

    pub async fn mount_grants(&self, responder: KeywordGrants) {
        Mock::given(method("POST"))
            .and(path("/search2"))
            .respond_with(responder)
            .mount(&self.grants)
            .await;
    }
}

pub fn chat_reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    }))
}

pub fn grant(id: &str, title: &str, agency: &str) -> Value {
    json!({
        "id": id,
        "number": format!("PA-{}", id),
        "title": title,
        "agencyName": agency,
        "agencyCode": "HHS-NIH11",
        "oppStatus": "posted",
        "openDate": "01/15/2025",
        "closeDate": "09/30/2025",
        "docType": "synopsis"
    })
}

/// Answers a grants search with the hits registered for its keyword.
/// Unknown keywords get an empty hit list.
#[derive(Default)]
pub struct KeywordGrants {
    hits: HashMap<String, Vec<Value>>,
    failing: HashMap<String, u16>,
}

impl KeywordGrants {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hits(mut self, keyword: &str, hits: Vec<Value>) -> Self {
        self.hits.insert(keyword.to_string(), hits);
        self
    }

    pub fn failing(mut self, keyword: &str, status: u16) -> Self {
        self.failing.insert(keyword.to_string(), status);
        self
    }
}

impl Respond for KeywordGrants {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let parsed: Value = serde_json::from_slice(&request.body).unwrap_or_default();
        let keyword = parsed
            .get("keyword")
            .and_then(Value::as_str)
            .unwrap_or_default();

        if let Some(status) = self.failing.get(keyword) {
            return ResponseTemplate::new(*status).set_body_string("upstream unavailable");
        }

        let hits = self.hits.get(keyword).cloned().unwrap_or_default();
        ResponseTemplate::new(200).set_body_json(json!({
            "errorcode": 0,
            "data": { "hitCount": hits.len(), "oppHits": hits }
        }))
    }
}

pub fn grant_ids(data: &Value) -> Vec<String> {
    data["grantResults"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["id"].as_str().unwrap().to_string())
        .collect()
}

pub fn steps(envelope: &Value) -> Vec<String> {
    envelope["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["step"].as_str().unwrap().to_string())
        .collect()
}
