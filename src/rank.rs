//! AI relevance ranking of deduplicated grants.
//!
//! The model only ever reorders. Whatever it returns, every input grant
//! appears exactly once in the output: matched identifiers first in the
//! model's order, then everything else in the original order.

use std::collections::{HashMap, HashSet};

use crate::config::RankingConfig;
use crate::error::{Issue, IssueKind, Step};
use crate::llm::{ChatClient, ChatRequest};
use crate::models::GrantHit;
use crate::report::RunLog;

const SYSTEM_PROMPT: &str = "You are an expert assistant specializing in matching researchers \
with relevant grant funding based on their profile and grant descriptions. Prioritize relevance \
based on scientific overlap. Return ONLY the comma-separated list of grant IDs as requested.";

/// Builds the user message: profile, then one line per candidate.
pub fn build_prompt(profile: &str, candidates: &[GrantHit]) -> String {
    let listing = candidates
        .iter()
        .filter_map(|g| {
            g.key().map(|id| {
                format!(
                    "{}: {} (Agency: {}, Number: {})",
                    id,
                    g.title().as_deref().unwrap_or("N/A"),
                    g.agency_label(),
                    g.number().as_deref().unwrap_or("N/A"),
                )
            })
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Based on the following researcher profile:\n---\n{}\n---\nRank the relevance of the \
following grant opportunities. Consider the researcher's expertise, interests, and the grant's \
focus and agency. Return ONLY a comma-separated list of the grant IDs, ordered from most \
relevant to least relevant. Only include IDs from the list provided.\n\nGrants:\n{}",
        profile, listing
    )
}

/// Splits the model's answer into identifiers. Tolerates newlines, list
/// brackets, and quoting around individual ids.
pub fn parse_ranked_ids(raw: &str) -> Vec<String> {
    raw.split([',', '\n'])
        .map(|id| {
            id.trim()
                .trim_matches(|c: char| matches!(c, '[' | ']' | '"' | '\'' | '`') || c.is_whitespace())
                .to_string()
        })
        .filter(|id| !id.is_empty())
        .collect()
}

/// Reordered grants plus match accounting.
#[derive(Debug)]
pub struct Reordered {
    pub grants: Vec<GrantHit>,
    /// Distinct identifiers the model returned.
    pub returned: usize,
    /// Distinct returned identifiers that matched a grant.
    pub matched: usize,
}

/// Puts grants named in `ids` first, in that order, followed by the rest in
/// their original order. Unknown and repeated ids are ignored.
pub fn apply_ranking(grants: Vec<GrantHit>, ids: &[String]) -> Reordered {
    let mut slots: Vec<Option<GrantHit>> = grants.into_iter().map(Some).collect();
    let positions: HashMap<String, usize> = slots
        .iter()
        .enumerate()
        .filter_map(|(i, g)| g.as_ref().and_then(GrantHit::key).map(|k| (k, i)))
        .collect();

    let mut ordered = Vec::with_capacity(slots.len());
    for id in ids {
        if let Some(&i) = positions.get(id) {
            if let Some(grant) = slots[i].take() {
                ordered.push(grant);
            }
        }
    }
    let matched = ordered.len();

    ordered.extend(slots.into_iter().flatten());

    let returned = ids.iter().collect::<HashSet<_>>().len();

    Reordered {
        grants: ordered,
        returned,
        matched,
    }
}

/// Ranks `grants` against `profile`. On any failure the input order is
/// returned unchanged and the failure is recorded in `log`.
pub async fn rank_grants(
    client: &dyn ChatClient,
    profile: &str,
    grants: Vec<GrantHit>,
    config: &RankingConfig,
    log: &mut RunLog,
) -> Vec<GrantHit> {
    let limit = config.max_candidates.min(grants.len());
    tracing::info!(unique = grants.len(), candidates = limit, "requesting relevance ranking");

    let request = ChatRequest::new("ranking", SYSTEM_PROMPT, build_prompt(profile, &grants[..limit]))
        .temperature(config.temperature)
        .max_tokens(config.max_tokens);

    let raw = match client.complete(request).await {
        Ok(raw) => raw,
        Err(err) => {
            log.degrade(Issue::upstream(
                Step::Ranking,
                "Failed to call chat service for ranking",
                &err,
            ));
            return grants;
        }
    };

    let ids = parse_ranked_ids(&raw);
    if ids.is_empty() {
        log.degrade(
            Issue::new(
                Step::Ranking,
                IssueKind::UpstreamParse,
                "Could not parse ranking from chat response",
            )
            .with_details(raw),
        );
        return grants;
    }

    let reordered = apply_ranking(grants, &ids);
    tracing::info!(
        returned = reordered.returned,
        matched = reordered.matched,
        total = reordered.grants.len(),
        "grants reordered"
    );

    if reordered.matched == 0 {
        log.degrade(
            Issue::new(
                Step::Ranking,
                IssueKind::RankingMismatch,
                "Ranker returned IDs, but none matched fetched grants",
            )
            .with_details(format!("Returned IDs: {}", ids.join(","))),
        );
    } else if reordered.matched < reordered.returned {
        log.note(
            Issue::new(
                Step::Ranking,
                IssueKind::RankingMismatch,
                "Ranker returned some IDs that did not match fetched grants",
            )
            .with_details(format!("Returned IDs: {}", ids.join(","))),
        );
    }

    reordered.grants
}
