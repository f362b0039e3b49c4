//! TOML configuration and upstream credential handling.
//!
//! Every section is optional in the file; omitted fields take the defaults
//! below, so an empty file is a valid configuration. API keys are never read
//! from the TOML file. Each upstream section names the environment variable
//! that holds its key (`api_key_env`), and [`Credential::from_env`] classifies
//! the value at startup.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default = "UpstreamConfig::profile", deserialize_with = "profile_section")]
    pub profile: UpstreamConfig,
    #[serde(default = "UpstreamConfig::chat", deserialize_with = "chat_section")]
    pub chat: UpstreamConfig,
    #[serde(default)]
    pub keywords: KeywordsConfig,
    #[serde(default)]
    pub grants: GrantsConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub assist: AssistConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            profile: UpstreamConfig::profile(),
            chat: UpstreamConfig::chat(),
            keywords: KeywordsConfig::default(),
            grants: GrantsConfig::default(),
            ranking: RankingConfig::default(),
            assist: AssistConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3001".to_string()
}

/// An OpenAI-compatible chat endpoint: the profile service and the
/// chat-completion service share this shape.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
    pub key_prefix: String,
    pub timeout_secs: u64,
}

impl UpstreamConfig {
    /// Defaults for `[profile]`, the search-and-summarize service.
    pub fn profile() -> Self {
        Self {
            base_url: "https://api.perplexity.ai".to_string(),
            model: "sonar".to_string(),
            api_key_env: "PERPLEXITY_API_KEY".to_string(),
            key_prefix: "pplx-".to_string(),
            timeout_secs: default_upstream_timeout(),
        }
    }

    /// Defaults for `[chat]`, the chat-completion service.
    pub fn chat() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            key_prefix: "sk-".to_string(),
            timeout_secs: default_upstream_timeout(),
        }
    }
}

/// An upstream section as written in the file. Omitted keys fall back to
/// the section's own defaults, which differ between `[profile]` and `[chat]`.
#[derive(Debug, Deserialize)]
struct UpstreamSection {
    base_url: Option<String>,
    model: Option<String>,
    api_key_env: Option<String>,
    key_prefix: Option<String>,
    timeout_secs: Option<u64>,
}

impl UpstreamSection {
    fn over(self, defaults: UpstreamConfig) -> UpstreamConfig {
        UpstreamConfig {
            base_url: self.base_url.unwrap_or(defaults.base_url),
            model: self.model.unwrap_or(defaults.model),
            api_key_env: self.api_key_env.unwrap_or(defaults.api_key_env),
            key_prefix: self.key_prefix.unwrap_or(defaults.key_prefix),
            timeout_secs: self.timeout_secs.unwrap_or(defaults.timeout_secs),
        }
    }
}

fn profile_section<'de, D: Deserializer<'de>>(d: D) -> Result<UpstreamConfig, D::Error> {
    UpstreamSection::deserialize(d).map(|s| s.over(UpstreamConfig::profile()))
}

fn chat_section<'de, D: Deserializer<'de>>(d: D) -> Result<UpstreamConfig, D::Error> {
    UpstreamSection::deserialize(d).map(|s| s.over(UpstreamConfig::chat()))
}

fn default_upstream_timeout() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct KeywordsConfig {
    #[serde(default = "default_keyword_temperature")]
    pub temperature: f32,
    #[serde(default = "default_keyword_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_max_keywords")]
    pub max_keywords: usize,
    #[serde(default = "default_min_keywords")]
    pub min_keywords: usize,
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self {
            temperature: default_keyword_temperature(),
            max_tokens: default_keyword_max_tokens(),
            max_keywords: default_max_keywords(),
            min_keywords: default_min_keywords(),
        }
    }
}

fn default_keyword_temperature() -> f32 {
    0.5
}
fn default_keyword_max_tokens() -> u32 {
    60
}
fn default_max_keywords() -> usize {
    10
}
fn default_min_keywords() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct GrantsConfig {
    #[serde(default = "default_grants_url")]
    pub base_url: String,
    #[serde(default = "default_rows")]
    pub rows: u32,
    #[serde(default = "default_opp_statuses")]
    pub opp_statuses: String,
    #[serde(default = "default_grants_timeout")]
    pub timeout_secs: u64,
}

impl Default for GrantsConfig {
    fn default() -> Self {
        Self {
            base_url: default_grants_url(),
            rows: default_rows(),
            opp_statuses: default_opp_statuses(),
            timeout_secs: default_grants_timeout(),
        }
    }
}

fn default_grants_url() -> String {
    "https://api.grants.gov/v1/api".to_string()
}
fn default_rows() -> u32 {
    10
}
fn default_opp_statuses() -> String {
    "forecasted|posted".to_string()
}
fn default_grants_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct RankingConfig {
    #[serde(default = "default_ranking_temperature")]
    pub temperature: f32,
    #[serde(default = "default_ranking_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            temperature: default_ranking_temperature(),
            max_tokens: default_ranking_max_tokens(),
            max_candidates: default_max_candidates(),
        }
    }
}

fn default_ranking_temperature() -> f32 {
    0.3
}
fn default_ranking_max_tokens() -> u32 {
    200
}
fn default_max_candidates() -> usize {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssistConfig {
    #[serde(default = "default_assist_temperature")]
    pub temperature: f32,
    #[serde(default = "default_assist_max_tokens")]
    pub max_tokens: u32,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            temperature: default_assist_temperature(),
            max_tokens: default_assist_max_tokens(),
        }
    }
}

fn default_assist_temperature() -> f32 {
    0.7
}
fn default_assist_max_tokens() -> u32 {
    800
}

impl Config {
    /// Checks ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.grants.rows == 0 || self.grants.rows > 100 {
            anyhow::bail!("grants.rows must be in 1..=100");
        }
        if self.ranking.max_candidates == 0 {
            anyhow::bail!("ranking.max_candidates must be >= 1");
        }
        if self.keywords.max_keywords == 0 {
            anyhow::bail!("keywords.max_keywords must be >= 1");
        }

        let temperatures = [
            ("keywords.temperature", self.keywords.temperature),
            ("ranking.temperature", self.ranking.temperature),
            ("assist.temperature", self.assist.temperature),
        ];
        for (name, t) in temperatures {
            if !(0.0..=2.0).contains(&t) {
                anyhow::bail!("{} must be in [0.0, 2.0]", name);
            }
        }

        let urls = [
            ("profile.base_url", &self.profile.base_url),
            ("chat.base_url", &self.chat.base_url),
            ("grants.base_url", &self.grants.base_url),
        ];
        for (name, url) in urls {
            if url.trim().is_empty() {
                anyhow::bail!("{} must not be empty", name);
            }
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}

// ============ Credentials ============

/// Classification of an upstream API key found in the environment.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Valid(String),
    Missing,
    Invalid(String),
}

impl std::fmt::Debug for Credential {
    // Keys must never reach logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::Valid(_) => f.write_str("Valid(<redacted>)"),
            Credential::Missing => f.write_str("Missing"),
            Credential::Invalid(reason) => write!(f, "Invalid({})", reason),
        }
    }
}

impl Credential {
    /// Reads and classifies the key named by `upstream.api_key_env`.
    pub fn from_env(upstream: &UpstreamConfig) -> Self {
        Self::classify(
            std::env::var(&upstream.api_key_env).ok().as_deref(),
            &upstream.key_prefix,
        )
    }

    pub fn classify(raw: Option<&str>, prefix: &str) -> Self {
        let key = match raw.map(str::trim) {
            None | Some("") => return Credential::Missing,
            Some(k) => k,
        };

        if key.starts_with("YOUR_") && key.ends_with("_GOES_HERE") {
            return Credential::Invalid("placeholder value".to_string());
        }
        if !key.starts_with(prefix) {
            return Credential::Invalid(format!("expected prefix '{}'", prefix));
        }

        Credential::Valid(key.to_string())
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            Credential::Valid(k) => Some(k),
            _ => None,
        }
    }

    /// Short status label for `beacon check` and startup logging.
    pub fn status(&self) -> String {
        match self {
            Credential::Valid(_) => "OK".to_string(),
            Credential::Missing => "MISSING".to_string(),
            Credential::Invalid(reason) => format!("INVALID ({})", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        config.validate().unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:3001");
        assert_eq!(config.profile.api_key_env, "PERPLEXITY_API_KEY");
        assert_eq!(config.chat.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.chat.key_prefix, "sk-");
        assert_eq!(config.grants.rows, 10);
        assert_eq!(config.ranking.max_candidates, 20);
    }

    #[test]
    fn test_default_matches_empty_file() {
        let config = Config::default();
        assert_eq!(config.chat.model, "gpt-3.5-turbo");
        assert_eq!(config.profile.model, "sonar");
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
[grants]
rows = 5

[ranking]
temperature = 0.1
"#,
        )
        .unwrap();
        assert_eq!(config.grants.rows, 5);
        assert_eq!(config.grants.opp_statuses, "forecasted|posted");
        assert!((config.ranking.temperature - 0.1).abs() < 1e-6);
        assert_eq!(config.ranking.max_tokens, 200);
    }

    #[test]
    fn test_partial_upstream_section_uses_its_own_defaults() {
        let config: Config = toml::from_str(
            r#"
[profile]
api_key_env = "BEACON_PROFILE_KEY"

[chat]
model = "gpt-4o-mini"
"#,
        )
        .unwrap();
        assert_eq!(config.profile.api_key_env, "BEACON_PROFILE_KEY");
        assert_eq!(config.profile.base_url, "https://api.perplexity.ai");
        assert_eq!(config.chat.model, "gpt-4o-mini");
        assert_eq!(config.chat.key_prefix, "sk-");
        assert_eq!(config.chat.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_validate_rejects_zero_rows() {
        let mut config = Config::default();
        config.grants.rows = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_temperature() {
        let mut config = Config::default();
        config.ranking.temperature = 3.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ranking.temperature"));
    }

    #[test]
    fn test_credential_classification() {
        assert_eq!(Credential::classify(None, "sk-"), Credential::Missing);
        assert_eq!(Credential::classify(Some("  "), "sk-"), Credential::Missing);
        assert!(matches!(
            Credential::classify(Some("YOUR_OPENAI_API_KEY_GOES_HERE"), "sk-"),
            Credential::Invalid(_)
        ));
        assert!(matches!(
            Credential::classify(Some("pplx-abc"), "sk-"),
            Credential::Invalid(_)
        ));
        assert_eq!(
            Credential::classify(Some("sk-abc"), "sk-").key(),
            Some("sk-abc")
        );
    }

    #[test]
    fn test_credential_debug_redacts_key() {
        let c = Credential::Valid("sk-secret".to_string());
        assert!(!format!("{:?}", c).contains("secret"));
    }
}
