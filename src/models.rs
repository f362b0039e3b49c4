//! Core data types that flow through the discovery pipeline.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

use crate::error::{Issue, IssueKind, Step};

/// A validated researcher lookup: both fields non-blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResearcherRequest {
    pub name: String,
    pub affiliation: String,
}

impl ResearcherRequest {
    pub fn new(name: impl Into<String>, affiliation: impl Into<String>) -> Result<Self, Issue> {
        ResearcherInput {
            name: Some(name.into()),
            affiliation: Some(affiliation.into()),
        }
        .validate()
    }
}

/// Raw request body before validation. Absent and blank fields are both
/// rejected.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResearcherInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub affiliation: Option<String>,
}

impl ResearcherInput {
    pub fn validate(self) -> Result<ResearcherRequest, Issue> {
        let name = self.name.as_deref().map(str::trim).unwrap_or_default();
        let affiliation = self.affiliation.as_deref().map(str::trim).unwrap_or_default();

        if name.is_empty() || affiliation.is_empty() {
            return Err(Issue::new(
                Step::Validation,
                IssueKind::Validation,
                "Missing name or affiliation",
            ));
        }

        Ok(ResearcherRequest {
            name: name.to_string(),
            affiliation: affiliation.to_string(),
        })
    }
}

/// Opportunity identifier as the grants API sends it: a string or a number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GrantId {
    Number(serde_json::Number),
    Text(String),
}

impl GrantId {
    /// String form used as the dedup key and in ranking prompts.
    /// Blank text ids have no key.
    pub fn key(&self) -> Option<String> {
        match self {
            GrantId::Number(n) => Some(n.to_string()),
            GrantId::Text(s) if s.trim().is_empty() => None,
            GrantId::Text(s) => Some(s.trim().to_string()),
        }
    }
}

/// One opportunity hit from the grants search API.
///
/// Only the identifier is typed. Every other field is kept exactly as the
/// upstream sent it and read through [`GrantHit::text`], so an unexpected
/// type in a display field never costs the whole hit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GrantHit {
    #[serde(
        default,
        deserialize_with = "lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<GrantId>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Strings and numbers become identifiers; any other shape means no id.
fn lenient_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<GrantId>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(GrantId::Text(s)),
        Value::Number(n) => Some(GrantId::Number(n)),
        _ => None,
    })
}

impl GrantHit {
    pub fn key(&self) -> Option<String> {
        self.id.as_ref().and_then(GrantId::key)
    }

    /// A pass-through field as text. Strings are borrowed, numbers and
    /// booleans are rendered; blanks, nulls, arrays and objects are `None`.
    pub fn text(&self, field: &str) -> Option<Cow<'_, str>> {
        match self.fields.get(field)? {
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            Value::Bool(b) => Some(Cow::Owned(b.to_string())),
            _ => None,
        }
    }

    pub fn title(&self) -> Option<Cow<'_, str>> {
        self.text("title")
    }

    pub fn number(&self) -> Option<Cow<'_, str>> {
        self.text("number")
    }

    pub fn agency_name(&self) -> Option<Cow<'_, str>> {
        self.text("agencyName")
    }

    /// Agency label for prompts: name, then code, then `N/A`.
    pub fn agency_label(&self) -> Cow<'_, str> {
        self.agency_name()
            .or_else(|| self.text("agencyCode"))
            .unwrap_or(Cow::Borrowed("N/A"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_rejects_missing_and_blank() {
        let missing = ResearcherInput {
            name: Some("Jane Doe".to_string()),
            affiliation: None,
        };
        assert_eq!(missing.validate().unwrap_err().step, Step::Validation);

        let blank = ResearcherInput {
            name: Some("   ".to_string()),
            affiliation: Some("Acme University".to_string()),
        };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_validate_trims() {
        let req = ResearcherRequest::new(" Jane Doe ", "Acme University\n").unwrap();
        assert_eq!(req.name, "Jane Doe");
        assert_eq!(req.affiliation, "Acme University");
    }

    #[test]
    fn test_grant_hit_numeric_and_string_ids() {
        let numeric: GrantHit = serde_json::from_value(json!({"id": 355012, "title": "A"})).unwrap();
        assert_eq!(numeric.key().as_deref(), Some("355012"));

        let text: GrantHit = serde_json::from_value(json!({"id": "OPP-100"})).unwrap();
        assert_eq!(text.key().as_deref(), Some("OPP-100"));

        let null: GrantHit = serde_json::from_value(json!({"id": null, "title": "B"})).unwrap();
        assert_eq!(null.key(), None);

        let blank: GrantHit = serde_json::from_value(json!({"id": "  "})).unwrap();
        assert_eq!(blank.key(), None);
    }

    #[test]
    fn test_grant_hit_passes_unknown_fields_through() {
        let raw = json!({
            "id": "1",
            "number": "PAR-25-001",
            "agencyCode": "HHS-NIH11",
            "docType": "synopsis",
            "alnist": ["93.242"]
        });
        let hit: GrantHit = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(hit.agency_label(), "HHS-NIH11");
        assert_eq!(hit.fields["docType"], "synopsis");

        let back = serde_json::to_value(&hit).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn test_unexpected_field_types_keep_the_hit() {
        let raw = json!({
            "id": "355012",
            "title": 42,
            "number": 12345,
            "agencyName": null,
            "agencyCode": "NSF",
            "closeDate": ["09/30/2025"]
        });
        let hit: GrantHit = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(hit.key().as_deref(), Some("355012"));
        assert_eq!(hit.title().as_deref(), Some("42"));
        assert_eq!(hit.number().as_deref(), Some("12345"));
        assert_eq!(hit.agency_label(), "NSF");
        assert_eq!(hit.text("closeDate"), None);
        assert_eq!(serde_json::to_value(&hit).unwrap(), raw);
    }

    #[test]
    fn test_unusable_id_shape_means_no_key() {
        let hit: GrantHit =
            serde_json::from_value(json!({"id": {"nested": 1}, "title": "T"})).unwrap();
        assert_eq!(hit.key(), None);
        assert_eq!(hit.title().as_deref(), Some("T"));
    }
}
