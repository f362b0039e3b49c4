//! Run status, the per-run issue log, and the response envelope.

use serde::Serialize;

use crate::error::Issue;
use crate::models::{GrantHit, ResearcherRequest};

/// Overall outcome of one run. Ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    PartialSuccess,
    Failed,
}

impl RunStatus {
    /// Moves toward `to` only if it is worse than the current status.
    pub fn downgrade(&mut self, to: RunStatus) {
        if to > *self {
            *self = to;
        }
    }
}

/// Accumulates issues and status for a single run. Owned by the run; never
/// shared across requests.
#[derive(Debug)]
pub struct RunLog {
    status: RunStatus,
    issues: Vec<Issue>,
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}

impl RunLog {
    pub fn new() -> Self {
        Self {
            status: RunStatus::Success,
            issues: Vec::new(),
        }
    }

    /// Records an informational issue; status is unchanged.
    pub fn note(&mut self, issue: Issue) {
        tracing::info!(step = issue.step.as_str(), kind = ?issue.kind, "{}", issue.message);
        self.issues.push(issue);
    }

    /// Records a recoverable failure and downgrades to partial success.
    pub fn degrade(&mut self, issue: Issue) {
        tracing::warn!(
            step = issue.step.as_str(),
            kind = ?issue.kind,
            details = issue.details.as_deref().unwrap_or(""),
            keyword = issue.keyword.as_deref().unwrap_or(""),
            "{}",
            issue.message
        );
        self.issues.push(issue);
        self.status.downgrade(RunStatus::PartialSuccess);
    }

    /// Records a hard failure. The run must not assemble data afterwards.
    pub fn fail(&mut self, issue: Issue) {
        tracing::error!(step = issue.step.as_str(), kind = ?issue.kind, "{}", issue.message);
        self.issues.push(issue);
        self.status.downgrade(RunStatus::Failed);
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn into_parts(self) -> (RunStatus, Vec<Issue>) {
        (self.status, self.issues)
    }
}

/// Payload returned for a completed run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultData {
    pub received: ResearcherRequest,
    pub profile: String,
    pub actual_keywords: Vec<String>,
    pub grant_results: Vec<GrantHit>,
    pub mock_ideation: Vec<String>,
}

/// Response envelope: `{status, errors, data}`. `data` is null for
/// validation and configuration failures.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub status: RunStatus,
    pub errors: Vec<Issue>,
    pub data: Option<ResultData>,
}

impl PipelineResult {
    /// A result that carries only a terminal issue and no data.
    pub fn rejected(issue: Issue) -> Self {
        Self {
            status: RunStatus::Failed,
            errors: vec![issue],
            data: None,
        }
    }

    pub fn from_log(log: RunLog, data: Option<ResultData>) -> Self {
        let (status, errors) = log.into_parts();
        Self {
            status,
            errors,
            data,
        }
    }
}
