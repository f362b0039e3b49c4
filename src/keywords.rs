//! Search-term extraction from a synthesized profile.

use crate::config::KeywordsConfig;
use crate::error::{Issue, IssueKind, Step};
use crate::llm::{ChatClient, ChatRequest};
use crate::report::RunLog;

const SYSTEM_PROMPT: &str = "Extract 5-10 relevant keywords suitable for searching grant \
databases like Grants.gov based on the provided researcher profile. Focus on specific scientific \
concepts, methodologies, diseases, or research areas mentioned. Return ONLY a single line of \
comma-separated keywords (e.g., keyword1, keyword2, keyword3) with no other text.";

/// Splits a model response into normalized search terms.
///
/// Splits on commas and newlines, strips list bullets and quoting,
/// lowercases, and drops empty tokens and markdown artifacts (headings,
/// `label: value` lines). At most `max` terms are kept, in response order.
pub fn parse_keywords(raw: &str, max: usize) -> Vec<String> {
    raw.split([',', '\n'])
        .filter_map(normalize_keyword)
        .take(max)
        .collect()
}

fn normalize_keyword(token: &str) -> Option<String> {
    let token = token.trim();
    if token.starts_with('#') || token.contains(':') {
        return None;
    }

    let token = strip_list_marker(token)
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '.' || c.is_whitespace());

    if token.is_empty() {
        None
    } else {
        Some(token.to_lowercase())
    }
}

/// Removes a leading `-`, `*`, `•`, `1.` or `1)` list marker.
fn strip_list_marker(token: &str) -> &str {
    let t = token.trim_start_matches(['-', '*', '•']).trim_start();
    let digits = t.len() - t.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 {
        if let Some(rest) = t[digits..].strip_prefix(['.', ')']) {
            return rest;
        }
    }
    t
}

/// Asks the chat service for search terms. Returns an empty list on any
/// failure, after recording it in `log`.
pub async fn extract_keywords(
    client: &dyn ChatClient,
    profile: &str,
    config: &KeywordsConfig,
    log: &mut RunLog,
) -> Vec<String> {
    tracing::info!("requesting keyword extraction");

    let request = ChatRequest::new("keywords", SYSTEM_PROMPT, profile)
        .temperature(config.temperature)
        .max_tokens(config.max_tokens);

    let raw = match client.complete(request).await {
        Ok(raw) => raw,
        Err(err) => {
            log.degrade(Issue::upstream(
                Step::KeywordExtraction,
                "Failed to call chat service for keywords",
                &err,
            ));
            return Vec::new();
        }
    };

    let keywords = parse_keywords(&raw, config.max_keywords);
    tracing::info!(count = keywords.len(), ?keywords, "keywords extracted");

    if keywords.is_empty() {
        log.degrade(
            Issue::new(
                Step::KeywordExtraction,
                IssueKind::UpstreamParse,
                "Chat response parsed, but resulted in zero valid keywords",
            )
            .with_details(raw),
        );
    } else if keywords.len() < config.min_keywords {
        log.note(Issue::new(
            Step::KeywordExtraction,
            IssueKind::LowYield,
            format!(
                "Only {} keyword(s) extracted; grant coverage may be limited",
                keywords.len()
            ),
        ));
    }

    keywords
}
