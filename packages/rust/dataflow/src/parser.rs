//! Text parsers for module prompts and model responses.
//!
//! - Cross-references: `{{moduleId.fieldName}}` or `{{moduleId}}`
//! - Claim payloads: a fenced ```` ```json ```` block or bare JSON, holding
//!   either an array of claims or `{ "claims": [...] }`

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use leadgen_shared::{Claim, ClaimBatch, LeadgenError, Result};

/// Field assumed when a reference names only a module.
pub const DEFAULT_FIELD: &str = "output";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One `{{module.field}}` reference found in text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Reference {
    /// Producing module.
    pub module_id: String,
    /// Field of the producer's output, `output` when omitted.
    pub field: String,
}

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// Matches `{{module}}` and `{{module.field}}`, tolerating inner whitespace.
static REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_-]+)(?:\.([A-Za-z0-9_-]+))?\s*\}\}").expect("reference regex")
});

/// Matches a fenced code block, optionally tagged `json`.
static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?[ \t]*\r?\n?(.*?)```").expect("fence regex")
});

// ---------------------------------------------------------------------------
// References
// ---------------------------------------------------------------------------

/// Extract the distinct references in `text`, in order of first appearance.
///
/// References to `self_id` are dropped.
pub fn extract_references(text: &str, self_id: &str) -> Vec<Reference> {
    let mut seen = HashSet::new();
    let mut refs = Vec::new();

    for caps in REF_RE.captures_iter(text) {
        let module_id = &caps[1];
        if module_id == self_id {
            continue;
        }
        let field = caps.get(2).map_or(DEFAULT_FIELD, |m| m.as_str());

        let reference = Reference {
            module_id: module_id.to_string(),
            field: field.to_string(),
        };
        if seen.insert(reference.clone()) {
            refs.push(reference);
        }
    }

    refs
}

// ---------------------------------------------------------------------------
// Claim payloads
// ---------------------------------------------------------------------------

/// Turn a model response into a claim batch for `step`.
///
/// Non-object entries in the claim list are dropped with a warning.
pub fn parse_claims_response(text: &str, step: &str) -> Result<ClaimBatch> {
    let payload = find_json_payload(text)
        .ok_or_else(|| LeadgenError::parse(format!("no JSON payload in response for step {step}")))?;

    let items = match payload {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("claims") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(LeadgenError::parse(format!(
                    "response for step {step} has no claims array"
                )));
            }
        },
        _ => {
            return Err(LeadgenError::parse(format!(
                "response for step {step} is not an array or object"
            )));
        }
    };

    let mut claims = Vec::with_capacity(items.len());
    for (position, item) in items.into_iter().enumerate() {
        if !item.is_object() {
            warn!(step, position, "dropping non-object claim entry");
            continue;
        }
        claims.push(serde_json::from_value::<Claim>(item)?);
    }

    debug!(step, claims = claims.len(), "parsed claims response");
    Ok(ClaimBatch::new(step, claims))
}

/// First parseable JSON payload: fenced blocks, then the whole text, then
/// the span between the first opening and last closing bracket.
fn find_json_payload(text: &str) -> Option<Value> {
    for caps in FENCE_RE.captures_iter(text) {
        if let Ok(value) = serde_json::from_str(caps[1].trim()) {
            return Some(value);
        }
    }

    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    let start = trimmed.find(['[', '{'])?;
    let end = trimmed.rfind([']', '}'])?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&trimmed[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(module_id: &str, field: &str) -> Reference {
        Reference {
            module_id: module_id.into(),
            field: field.into(),
        }
    }

    #[test]
    fn extracts_module_and_field() {
        let refs = extract_references(
            "Use {{2.companies}} and {{3}} to find contacts at {{ 2.companies }}.",
            "4",
        );
        assert_eq!(refs, vec![r("2", "companies"), r("3", "output")]);
    }

    #[test]
    fn drops_self_references() {
        let refs = extract_references("{{4.draft}} refines {{4}} using {{1.query}}", "4");
        assert_eq!(refs, vec![r("1", "query")]);
    }

    #[test]
    fn same_module_different_fields_are_distinct() {
        let refs = extract_references("{{2.a}} {{2.b}} {{2.a}} {{2}}", "9");
        assert_eq!(refs, vec![r("2", "a"), r("2", "b"), r("2", "output")]);
    }

    #[test]
    fn ignores_non_references() {
        assert!(extract_references("{single} {{}} {{ .x }} plain text", "1").is_empty());
    }

    #[test]
    fn parses_fenced_claim_array() {
        let text = r#"Here are the claims:

```json
[
  {"claim_id": "c1", "claim_type": "ENTITY", "statement": "Acme Corp"},
  {"claim_id": "c2", "claim_type": "SIGNAL", "statement": "Acme opened a Berlin office"}
]
```
Let me know if you need more."#;

        let batch = parse_claims_response(text, "company_research").unwrap();
        assert_eq!(batch.step, "company_research");
        assert_eq!(batch.claims.len(), 2);
        assert_eq!(
            batch.claims[1].statement.as_deref(),
            Some("Acme opened a Berlin office")
        );
    }

    #[test]
    fn parses_bare_object_with_claims() {
        let text = r#"{"claims": [{"claim_id": "p1", "claim_type": "CONTACT", "statement": "Jane Doe, CFO"}]}"#;
        let batch = parse_claims_response(text, "contacts").unwrap();
        assert_eq!(batch.claims[0].claim_id.as_deref(), Some("p1"));
    }

    #[test]
    fn parses_json_embedded_in_prose() {
        let text = r#"Result: [{"claim_id": "c1", "statement": "x"}] (end)"#;
        let batch = parse_claims_response(text, "s").unwrap();
        assert_eq!(batch.claims.len(), 1);
    }

    #[test]
    fn drops_non_object_entries() {
        let batch = parse_claims_response(r#"[{"claim_id": "c1"}, "oops", 3]"#, "s").unwrap();
        assert_eq!(batch.claims.len(), 1);
    }

    #[test]
    fn response_without_json_fails() {
        let err = parse_claims_response("I could not find anything.", "s").unwrap_err();
        assert!(err.to_string().contains("no JSON payload"));
    }

    #[test]
    fn object_without_claims_fails() {
        let err = parse_claims_response(r#"{"items": []}"#, "s").unwrap_err();
        assert!(err.to_string().contains("no claims array"));
    }
}
