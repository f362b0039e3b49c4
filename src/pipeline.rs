//! The discovery pipeline: profile → keywords → fan-out search → dedup →
//! ranking → talking points.
//!
//! Stages run strictly in sequence; only the grant search fans out. Each
//! stage either consumes the previous stage's output or records a skip.
//! A failed profile does not abort the run: it yields `partial_success`
//! with a `skipped` entry for every downstream stage.
//!
//! # Status
//!
//! | Status | Meaning |
//! |--------|---------|
//! | `success` | no issue downgraded the run (informational notes allowed) |
//! | `partial_success` | at least one recoverable failure; data still returned |
//! | `failed` | the profile service is not configured; no data |

use std::sync::Arc;
use tracing::Instrument;

use crate::config::{Config, Credential};
use crate::dedup::dedupe;
use crate::error::{Issue, IssueKind, Step};
use crate::fanout::fan_out;
use crate::grants::{GrantSearch, GrantsGovClient};
use crate::ideation::talking_points;
use crate::keywords::extract_keywords;
use crate::llm::{ChatClient, OpenAiCompatClient};
use crate::models::ResearcherRequest;
use crate::profile::{synthesize_profile, Profile};
use crate::rank::rank_grants;
use crate::report::{PipelineResult, ResultData, RunLog};

/// Upstream clients, injected rather than global.
///
/// `profile` is a hard dependency; `chat` is optional and its absence only
/// degrades the run.
#[derive(Clone)]
pub struct Services {
    pub profile: Option<Arc<dyn ChatClient>>,
    pub chat: Option<Arc<dyn ChatClient>>,
    pub grants: Arc<dyn GrantSearch>,
}

impl Services {
    /// Builds clients from the config and the keys found in the environment.
    pub fn from_env(config: &Config) -> anyhow::Result<Self> {
        let profile = Credential::from_env(&config.profile);
        let chat = Credential::from_env(&config.chat);
        Self::from_credentials(config, &profile, &chat)
    }

    pub fn from_credentials(
        config: &Config,
        profile: &Credential,
        chat: &Credential,
    ) -> anyhow::Result<Self> {
        tracing::info!(
            env = %config.profile.api_key_env,
            status = %profile.status(),
            "profile service credential"
        );
        tracing::info!(
            env = %config.chat.api_key_env,
            status = %chat.status(),
            "chat service credential"
        );

        let profile = match profile.key() {
            Some(key) => match OpenAiCompatClient::new("profile", &config.profile, key) {
                Ok(client) => Some(Arc::new(client) as Arc<dyn ChatClient>),
                Err(e) => {
                    tracing::error!(error = %e, "profile client initialization failed; researcher requests will fail");
                    None
                }
            },
            None => {
                tracing::warn!("profile service not configured; researcher requests will fail");
                None
            }
        };

        let chat = match chat.key() {
            Some(key) => match OpenAiCompatClient::new("chat", &config.chat, key) {
                Ok(client) => Some(Arc::new(client) as Arc<dyn ChatClient>),
                Err(e) => {
                    tracing::error!(error = %e, "chat client initialization failed");
                    None
                }
            },
            None => {
                tracing::warn!("chat service not configured; keyword extraction and ranking will be skipped");
                None
            }
        };

        let grants = Arc::new(GrantsGovClient::new(&config.grants)?) as Arc<dyn GrantSearch>;

        Ok(Self {
            profile,
            chat,
            grants,
        })
    }
}

#[derive(Clone)]
pub struct Pipeline {
    services: Services,
    config: Arc<Config>,
}

impl Pipeline {
    pub fn new(services: Services, config: Arc<Config>) -> Self {
        Self { services, config }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs every stage for one researcher. Never returns an error: all
    /// failures are reported through the result's status and issue log.
    pub async fn run(&self, req: &ResearcherRequest) -> PipelineResult {
        let span = tracing::info_span!("pipeline", request_id = %uuid::Uuid::new_v4());
        async {
            tracing::info!(name = %req.name, affiliation = %req.affiliation, "processing researcher");
            let result = self.run_stages(req).await;
            tracing::info!(status = ?result.status, issues = result.errors.len(), "finished request");
            result
        }
        .instrument(span)
        .await
    }

    async fn run_stages(&self, req: &ResearcherRequest) -> PipelineResult {
        let mut log = RunLog::new();

        let Some(profile_client) = self.services.profile.as_deref() else {
            log.fail(Issue::new(
                Step::Config,
                IssueKind::Config,
                "Profile service API key is not configured correctly on the server.",
            ));
            return PipelineResult::from_log(log, None);
        };

        let chat = self.services.chat.as_deref();
        if chat.is_none() {
            log.degrade(Issue::new(
                Step::Config,
                IssueKind::Config,
                "Chat service API key is not configured; keyword extraction and ranking skipped.",
            ));
        }

        // 1. Profile
        let profile = synthesize_profile(profile_client, req, &mut log).await;

        // 2. Keywords
        let keywords = match (&profile, chat) {
            (Profile::Available(text), Some(chat)) => {
                extract_keywords(chat, text, &self.config.keywords, &mut log).await
            }
            (Profile::Available(_), None) => Vec::new(),
            (Profile::Unavailable(_), _) => {
                log.note(Issue::skipped(
                    Step::KeywordExtraction,
                    "Skipped due to profile generation failure.",
                ));
                Vec::new()
            }
        };

        // 3 + 4. Fan-out search and dedup
        let unique = if !keywords.is_empty() {
            dedupe(fan_out(self.services.grants.as_ref(), &keywords, &mut log).await)
        } else {
            let message = if profile.is_available() {
                "Skipped grant search: no keywords were extracted from the profile."
            } else {
                "Skipped grant search due to profile generation failure."
            };
            log.note(Issue::skipped(Step::GrantSearch, message));
            Vec::new()
        };
        tracing::info!(unique = unique.len(), "unique grants after dedup");

        // 5. Ranking
        let ranked = match (&profile, chat) {
            (Profile::Available(text), Some(chat)) if !unique.is_empty() => {
                rank_grants(chat, text, unique, &self.config.ranking, &mut log).await
            }
            (Profile::Unavailable(_), _) => {
                log.note(Issue::skipped(
                    Step::Ranking,
                    "Skipped ranking due to profile generation failure.",
                ));
                unique
            }
            _ => unique,
        };

        let mock_ideation = talking_points(req, &keywords, ranked.first());
        let data = ResultData {
            received: req.clone(),
            profile: profile.display_text().to_string(),
            actual_keywords: keywords,
            grant_results: ranked,
            mock_ideation,
        };

        PipelineResult::from_log(log, Some(data))
    }
}
