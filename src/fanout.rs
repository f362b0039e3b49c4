//! Concurrent per-keyword grant search.
//!
//! One query per keyword, all in flight at once. The stage waits for every
//! query to settle before merging; a failed keyword yields an issue and an
//! empty slot, and never cancels its siblings.

use futures::future::join_all;

use crate::error::{Issue, Step, UpstreamError};
use crate::grants::GrantSearch;
use crate::models::GrantHit;
use crate::report::RunLog;

/// Result of one keyword's query, kept in its own slot until fan-in.
#[derive(Debug)]
pub struct KeywordOutcome {
    pub keyword: String,
    pub result: Result<Vec<GrantHit>, UpstreamError>,
}

/// Issues every query concurrently and returns the outcomes in keyword
/// order once all have settled.
pub async fn search_all(search: &dyn GrantSearch, keywords: &[String]) -> Vec<KeywordOutcome> {
    let queries = keywords.iter().map(|keyword| async move {
        KeywordOutcome {
            keyword: keyword.clone(),
            result: search.search(keyword).await,
        }
    });
    join_all(queries).await
}

/// Flattens successful outcomes in keyword order and records one issue per
/// failed keyword.
pub fn merge_outcomes(outcomes: Vec<KeywordOutcome>, log: &mut RunLog) -> Vec<GrantHit> {
    let mut combined = Vec::new();
    for outcome in outcomes {
        match outcome.result {
            Ok(hits) => {
                tracing::info!(keyword = %outcome.keyword, hits = hits.len(), "grant search finished");
                combined.extend(hits);
            }
            Err(err) => {
                log.degrade(
                    Issue::upstream(Step::GrantSearch, "Failed to fetch grants for keyword", &err)
                        .with_keyword(outcome.keyword),
                );
            }
        }
    }
    combined
}

/// Runs the fan-out and fan-in for `keywords`.
pub async fn fan_out(
    search: &dyn GrantSearch,
    keywords: &[String],
    log: &mut RunLog,
) -> Vec<GrantHit> {
    tracing::info!(keywords = keywords.len(), "starting grant search fan-out");
    let outcomes = search_all(search, keywords).await;
    let combined = merge_outcomes(outcomes, log);
    tracing::info!(total = combined.len(), "aggregated grant hits before dedup");
    combined
}
