//! Section-targeted drafting assistance.
//!
//! A single chat-completion call: a fixed instruction template chosen by the
//! target section, plus the researcher profile, grant details, and the
//! user's request.

use serde::Deserialize;
use serde_json::Value;

use crate::config::AssistConfig;
use crate::error::UpstreamError;
use crate::llm::{ChatClient, ChatRequest};

/// Grant application sections with a dedicated drafting template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Summary,
    Narrative,
    SpecificAims,
    ResearchStrategy,
    Significance,
    Innovation,
    Approach,
    PreliminaryData,
    Other,
}

impl Section {
    pub const ALL: [Section; 9] = [
        Section::Summary,
        Section::Narrative,
        Section::SpecificAims,
        Section::ResearchStrategy,
        Section::Significance,
        Section::Innovation,
        Section::Approach,
        Section::PreliminaryData,
        Section::Other,
    ];

    /// Label as shown in the section picker.
    pub fn label(&self) -> &'static str {
        match self {
            Section::Summary => "Project Summary/Abstract",
            Section::Narrative => "Project Narrative",
            Section::SpecificAims => "Specific Aims",
            Section::ResearchStrategy => "Research Strategy",
            Section::Significance => "Significance / Scientific Premise",
            Section::Innovation => "Innovation",
            Section::Approach => "Approach",
            Section::PreliminaryData => "Preliminary Data",
            Section::Other => "Other (Specify in prompt)",
        }
    }

    /// Matches a label case-insensitively; unknown labels map to `Other`.
    pub fn from_label(label: &str) -> Section {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.label().eq_ignore_ascii_case(label))
            .unwrap_or(Section::Other)
    }

    fn instructions(&self) -> &'static str {
        match self {
            Section::Summary => {
                "Write a self-contained project summary of at most 30 lines: the broad, long-term \
objectives, specific aims, and health relevance, in plain third-person language."
            }
            Section::Narrative => {
                "Write a two-to-three sentence project narrative describing the relevance of the \
research to public health, in plain language for a lay audience."
            }
            Section::SpecificAims => {
                "Draft a Specific Aims page: an opening paragraph establishing the gap, a central \
hypothesis, two or three concise aims each with a one-line rationale, and an expected-outcomes \
closing."
            }
            Section::ResearchStrategy => {
                "Draft research strategy text organized into significance, innovation, and \
approach, keeping claims specific and tied to the aims."
            }
            Section::Significance => {
                "Explain the importance of the problem, the rigor of the prior research that \
forms the scientific premise, and how the project will improve knowledge or practice."
            }
            Section::Innovation => {
                "Explain how the project challenges current paradigms, using novel concepts, \
approaches, methods, or technologies, and why that novelty matters."
            }
            Section::Approach => {
                "Describe the overall strategy, methodology, and analyses for each aim, including \
potential problems, alternative strategies, and benchmarks for success."
            }
            Section::PreliminaryData => {
                "Present preliminary data persuasively: what was done, what was found, and how it \
supports feasibility of the proposed aims. Mark places where figures should be inserted."
            }
            Section::Other => {
                "Follow the user's request for the section they describe, matching the tone of a \
competitive federal grant application."
            }
        }
    }
}

/// Body of `POST /api/assist-grant-writing` before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistInput {
    #[serde(default)]
    pub researcher_profile: Option<String>,
    #[serde(default)]
    pub grant_info: Option<Value>,
    #[serde(default)]
    pub target_section: Option<String>,
    #[serde(default)]
    pub user_prompt: Option<String>,
}

/// A validated drafting request.
#[derive(Debug, Clone)]
pub struct AssistRequest {
    pub researcher_profile: String,
    pub grant_info: Value,
    pub section: Section,
    pub user_prompt: String,
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

impl AssistInput {
    /// Returns the names of missing fields on failure.
    pub fn validate(self) -> Result<AssistRequest, Vec<&'static str>> {
        let profile = non_blank(self.researcher_profile);
        let grant_info = self
            .grant_info
            .filter(|v| !v.is_null() && v.as_object().map_or(true, |o| !o.is_empty()));
        let section = non_blank(self.target_section);
        let prompt = non_blank(self.user_prompt);

        match (profile, grant_info, section, prompt) {
            (Some(researcher_profile), Some(grant_info), Some(section), Some(user_prompt)) => {
                Ok(AssistRequest {
                    researcher_profile,
                    grant_info,
                    section: Section::from_label(&section),
                    user_prompt,
                })
            }
            (profile, grant_info, section, prompt) => {
                let mut missing = Vec::new();
                if profile.is_none() {
                    missing.push("researcherProfile");
                }
                if grant_info.is_none() {
                    missing.push("grantInfo");
                }
                if section.is_none() {
                    missing.push("targetSection");
                }
                if prompt.is_none() {
                    missing.push("userPrompt");
                }
                Err(missing)
            }
        }
    }
}

/// One-line description of the grant for the prompt.
fn describe_grant(info: &Value) -> String {
    let field = |name: &str| info.get(name).and_then(Value::as_str).unwrap_or("N/A");
    match info {
        Value::Object(_) => format!(
            "{} (Number: {}, Agency: {})",
            field("title"),
            field("number"),
            field("agencyName")
        ),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn build_prompt(req: &AssistRequest) -> (String, String) {
    let system = format!(
        "You are an experienced grant writer helping a researcher draft the \"{}\" section of a \
grant application. {} Ground the draft in the researcher profile and the funding opportunity; \
do not invent publications, results, or collaborators.",
        req.section.label(),
        req.section.instructions()
    );
    let user = format!(
        "Researcher profile:\n---\n{}\n---\nFunding opportunity: {}\n\nRequest: {}",
        req.researcher_profile,
        describe_grant(&req.grant_info),
        req.user_prompt
    );
    (system, user)
}

pub async fn draft_section(
    client: &dyn ChatClient,
    req: &AssistRequest,
    config: &AssistConfig,
) -> Result<String, UpstreamError> {
    tracing::info!(section = req.section.label(), "requesting drafting assistance");
    let (system, user) = build_prompt(req);
    let request = ChatRequest::new("assist", system, user)
        .temperature(config.temperature)
        .max_tokens(config.max_tokens);
    client.complete(request).await
}
