//! Error taxonomy for upstream calls and the pipeline's issue log.
//!
//! [`UpstreamError`] is what a client returns when one of the three external
//! services fails. The pipeline never propagates it: each stage converts the
//! failure into an [`Issue`], appends it to the run's log, and carries on
//! with an empty or fallback value.

use serde::Serialize;
use thiserror::Error;

/// Failure from one of the external services.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The service answered with a non-2xx status.
    #[error("{service} API error {status}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// No usable HTTP response: connect failure, timeout, TLS, body read.
    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// A 2xx response whose body did not have the expected shape.
    #[error("{service} response could not be parsed: {message}")]
    Parse {
        service: &'static str,
        message: String,
    },

    /// The client could not be built (bad key characters, TLS backend).
    #[error("configuration error: {0}")]
    Config(String),
}

impl UpstreamError {
    pub fn transport(service: &'static str, source: reqwest::Error) -> Self {
        Self::Transport { service, source }
    }

    pub fn parse(service: &'static str, message: impl Into<String>) -> Self {
        Self::Parse {
            service,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> IssueKind {
        match self {
            Self::Status { .. } | Self::Transport { .. } => IssueKind::UpstreamTransport,
            Self::Parse { .. } => IssueKind::UpstreamParse,
            Self::Config(_) => IssueKind::Config,
        }
    }

    /// Diagnostic detail suitable for the client-facing issue log.
    pub fn details(&self) -> Option<String> {
        match self {
            Self::Status { body, .. } if !body.is_empty() => Some(body.clone()),
            Self::Status { .. } => None,
            Self::Transport { source, .. } if source.is_timeout() => {
                Some("request timed out".to_string())
            }
            Self::Transport { source, .. } => Some(source.to_string()),
            Self::Parse { message, .. } => Some(message.clone()),
            Self::Config(message) => Some(message.clone()),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Pipeline stage an issue is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Config,
    Validation,
    ProfileSynthesis,
    KeywordExtraction,
    GrantSearch,
    Ranking,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Config => "config",
            Step::Validation => "validation",
            Step::ProfileSynthesis => "profile_synthesis",
            Step::KeywordExtraction => "keyword_extraction",
            Step::GrantSearch => "grant_search",
            Step::Ranking => "ranking",
        }
    }
}

/// Closed set of issue kinds.
///
/// `LowYield`, `Skipped` and partial `RankingMismatch` entries are
/// informational; whether an issue downgrades the run is decided by the
/// stage that records it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Config,
    UpstreamTransport,
    UpstreamParse,
    Validation,
    RankingMismatch,
    LowYield,
    Skipped,
}

/// One entry in the run's issue log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub step: Step,
    pub kind: IssueKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
}

impl Issue {
    pub fn new(step: Step, kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            step,
            kind,
            message: message.into(),
            details: None,
            keyword: None,
        }
    }

    /// Builds an issue from an upstream failure, keeping its kind and details.
    pub fn upstream(step: Step, message: impl Into<String>, err: &UpstreamError) -> Self {
        Self {
            step,
            kind: err.kind(),
            message: message.into(),
            details: err.details(),
            keyword: None,
        }
    }

    pub fn skipped(step: Step, message: impl Into<String>) -> Self {
        Self::new(step, IssueKind::Skipped, message)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_serializes_flat_and_omits_empty_fields() {
        let issue = Issue::new(
            Step::KeywordExtraction,
            IssueKind::UpstreamTransport,
            "Failed to call chat service for keywords",
        );
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["step"], "keyword_extraction");
        assert_eq!(json["kind"], "upstream_transport");
        assert!(json.get("details").is_none());
        assert!(json.get("keyword").is_none());
    }

    #[test]
    fn test_issue_from_status_error_keeps_body() {
        let err = UpstreamError::Status {
            service: "grants",
            status: 503,
            body: "unavailable".to_string(),
        };
        let issue = Issue::upstream(Step::GrantSearch, "Failed to fetch grants", &err)
            .with_keyword("genomics");
        assert_eq!(issue.kind, IssueKind::UpstreamTransport);
        assert_eq!(issue.details.as_deref(), Some("unavailable"));
        assert_eq!(issue.keyword.as_deref(), Some("genomics"));
        assert_eq!(err.status_code(), Some(503));
        assert_eq!(err.to_string(), "grants API error 503");
    }

    #[test]
    fn test_parse_error_kind() {
        let err = UpstreamError::parse("profile", "missing choices");
        assert_eq!(err.kind(), IssueKind::UpstreamParse);
        assert_eq!(err.details().as_deref(), Some("missing choices"));
    }

    #[test]
    fn test_step_names_match_serialization() {
        for step in [
            Step::Config,
            Step::Validation,
            Step::ProfileSynthesis,
            Step::KeywordExtraction,
            Step::GrantSearch,
            Step::Ranking,
        ] {
            let json = serde_json::to_value(step).unwrap();
            assert_eq!(json, step.as_str());
        }
    }
}
