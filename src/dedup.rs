//! Collapse grant hits that share an opportunity identifier.

use std::collections::HashMap;

use crate::models::GrantHit;

/// Returns one hit per identifier.
///
/// Each identifier keeps the position of its first occurrence and the
/// payload of its last one. Hits without an identifier are dropped. Because
/// fan-out results arrive in keyword order, "last" means the latest keyword
/// that returned the identifier.
pub fn dedupe(hits: Vec<GrantHit>) -> Vec<GrantHit> {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(hits.len());
    let mut unique: Vec<GrantHit> = Vec::with_capacity(hits.len());

    for hit in hits {
        let Some(key) = hit.key() else {
            continue;
        };
        match index.get(&key) {
            Some(&slot) => unique[slot] = hit,
            None => {
                index.insert(key, unique.len());
                unique.push(hit);
            }
        }
    }

    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hit(value: serde_json::Value) -> GrantHit {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_last_payload_wins_first_position_kept() {
        let hits = vec![
            hit(json!({"id": "OPP-100", "title": "first"})),
            hit(json!({"id": "OPP-200", "title": "other"})),
            hit(json!({"id": "OPP-100", "title": "second"})),
        ];
        let out = dedupe(hits);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].key().as_deref(), Some("OPP-100"));
        assert_eq!(out[0].title().as_deref(), Some("second"));
        assert_eq!(out[1].key().as_deref(), Some("OPP-200"));
    }

    #[test]
    fn test_missing_ids_dropped() {
        let hits = vec![
            hit(json!({"title": "no id"})),
            hit(json!({"id": null, "title": "null id"})),
            hit(json!({"id": "", "title": "blank id"})),
            hit(json!({"id": 7, "title": "kept"})),
        ];
        let out = dedupe(hits);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title().as_deref(), Some("kept"));
    }

    #[test]
    fn test_numeric_and_string_forms_collide() {
        let hits = vec![
            hit(json!({"id": 42, "title": "number"})),
            hit(json!({"id": "42", "title": "string"})),
        ];
        let out = dedupe(hits);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title().as_deref(), Some("string"));
    }

    #[test]
    fn test_output_never_larger_than_input() {
        let inputs = [
            vec![],
            vec![json!({"id": "a"})],
            vec![json!({"id": "a"}), json!({"id": "a"}), json!({"id": "b"})],
            vec![json!({}), json!({"id": "c"}), json!({"id": "d"})],
        ];
        for input in inputs {
            let hits: Vec<GrantHit> = input.into_iter().map(hit).collect();
            let n = hits.len();
            let out = dedupe(hits);
            assert!(out.len() <= n);
            let mut keys: Vec<String> = out.iter().filter_map(GrantHit::key).collect();
            let total = keys.len();
            keys.sort();
            keys.dedup();
            assert_eq!(keys.len(), total);
        }
    }
}
