//! Templated talking points derived from a finished run.

use crate::models::{GrantHit, ResearcherRequest};

/// Five proposal talking points built from the top two keywords and the
/// top-ranked grant, with generic fallbacks when either is missing.
pub fn talking_points(
    req: &ResearcherRequest,
    keywords: &[String],
    top_grant: Option<&GrantHit>,
) -> Vec<String> {
    let top_keyword = keywords
        .first()
        .map(String::as_str)
        .unwrap_or("your primary research area");
    let second_keyword = keywords
        .get(1)
        .map(String::as_str)
        .unwrap_or("a secondary focus");

    let number = top_grant.and_then(GrantHit::number);
    let agency = top_grant.and_then(GrantHit::agency_name);
    let number = number.as_deref();
    let agency = agency.as_deref();

    vec![
        format!(
            "Consider focusing a proposal on the intersection of {} and {} based on {}'s profile strengths.",
            top_keyword, second_keyword, req.name
        ),
        format!(
            "Highlight {}'s unique resources or facilities relevant to grant opportunity {}.",
            req.affiliation,
            number.unwrap_or("the top ranked grant")
        ),
        format!(
            "Explore collaborative potential with researchers mentioned in relation to {}'s work (if applicable based on profile).",
            req.name
        ),
        format!(
            "Tailor the specific aims towards the stated priorities of {} for grant {}.",
            agency.unwrap_or("the funding agency"),
            number.unwrap_or("the most relevant opportunity")
        ),
        format!(
            "Investigate recent awards by {} in the area of {} for insights.",
            agency.unwrap_or("the agency"),
            top_keyword
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req() -> ResearcherRequest {
        ResearcherRequest::new("Jane Doe", "Acme University").unwrap()
    }

    #[test]
    fn test_fallbacks_without_keywords_or_grants() {
        let points = talking_points(&req(), &[], None);
        assert_eq!(points.len(), 5);
        assert!(points[0].contains("your primary research area and a secondary focus"));
        assert!(points[1].contains("the top ranked grant"));
        assert!(points[3].contains("the funding agency for grant the most relevant opportunity"));
        assert!(points[4].starts_with("Investigate recent awards by the agency"));
    }

    #[test]
    fn test_uses_keywords_and_top_grant() {
        let grant: GrantHit = serde_json::from_value(serde_json::json!({
            "id": "1",
            "number": "RFA-AI-25-010",
            "agencyName": "National Institutes of Health"
        }))
        .unwrap();
        let keywords = vec!["virology".to_string(), "immunology".to_string()];
        let points = talking_points(&req(), &keywords, Some(&grant));
        assert!(points[0].contains("virology and immunology"));
        assert!(points[1].contains("Acme University's"));
        assert!(points[1].contains("RFA-AI-25-010"));
        assert!(points[4].contains("National Institutes of Health in the area of virology"));
    }
}
