//! Researcher profile synthesis via the search-and-summarize service.

use crate::error::{Issue, Step, UpstreamError};
use crate::llm::{ChatClient, ChatRequest};
use crate::models::ResearcherRequest;
use crate::report::RunLog;

pub const FAILED_SENTINEL: &str = "Failed to retrieve profile from the profile service.";
pub const UNPARSEABLE_SENTINEL: &str = "Could not generate profile from the profile service response.";

const SYSTEM_PROMPT: &str = "Generate a concise, professional researcher profile suitable for \
identifying relevant research areas and keywords for grant searching. Write a short narrative \
covering key expertise, research interests, and methodologies based on publicly available \
information, then optionally list a few candidate search terms. If no specific information is \
found, state that.";

/// Why a profile could not be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileFailure {
    /// Transport failure or non-2xx status.
    Request,
    /// 2xx with a body that did not contain a profile.
    Unparseable,
}

/// Outcome of synthesis. Downstream stages branch on the variant, never on
/// the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Profile {
    Available(String),
    Unavailable(ProfileFailure),
}

impl Profile {
    pub fn text(&self) -> Option<&str> {
        match self {
            Profile::Available(text) => Some(text),
            Profile::Unavailable(_) => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Profile::Available(_))
    }

    /// Text shown to the client: the narrative, or a failure sentence.
    pub fn display_text(&self) -> &str {
        match self {
            Profile::Available(text) => text,
            Profile::Unavailable(ProfileFailure::Request) => FAILED_SENTINEL,
            Profile::Unavailable(ProfileFailure::Unparseable) => UNPARSEABLE_SENTINEL,
        }
    }
}

pub fn user_prompt(req: &ResearcherRequest) -> String {
    format!(
        "Generate profile for {}, affiliated with {}.",
        req.name, req.affiliation
    )
}

/// Asks the profile service for a narrative. Failures are recorded in `log`
/// and returned as [`Profile::Unavailable`].
pub async fn synthesize_profile(
    client: &dyn ChatClient,
    req: &ResearcherRequest,
    log: &mut RunLog,
) -> Profile {
    tracing::info!("requesting researcher profile");

    let request = ChatRequest::new("profile", SYSTEM_PROMPT, user_prompt(req));
    match client.complete(request).await {
        Ok(text) => {
            tracing::info!(chars = text.len(), "profile synthesized");
            Profile::Available(text)
        }
        Err(err) => {
            let (message, failure) = match &err {
                UpstreamError::Status { status, .. } => (
                    format!("Profile service API error {}", status),
                    ProfileFailure::Request,
                ),
                UpstreamError::Transport { .. } => (
                    "No response received from profile service".to_string(),
                    ProfileFailure::Request,
                ),
                UpstreamError::Parse { .. } => (
                    "Could not parse profile from profile service response".to_string(),
                    ProfileFailure::Unparseable,
                ),
                UpstreamError::Config(_) => (
                    "Failed to make profile service request".to_string(),
                    ProfileFailure::Request,
                ),
            };
            log.degrade(Issue::upstream(Step::ProfileSynthesis, message, &err));
            Profile::Unavailable(failure)
        }
    }
}
