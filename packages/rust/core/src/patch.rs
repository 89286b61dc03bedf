//! Reconciliation patch model.
//!
//! Patches arrive as loosely-shaped JSON from an upstream generator. Parsing
//! never fails: a patch with a known operation but unusable fields becomes
//! [`Patch::Malformed`], anything else becomes [`Patch::Unknown`]. Both are
//! carried through to the applier so they can be counted and reported.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The five reconciliation operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchKind {
    Merge,
    MergeContact,
    Invalidate,
    FlagConflict,
    Enhance,
}

impl PatchKind {
    /// Wire name of the operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::MergeContact => "merge_contact",
            Self::Invalidate => "invalidate",
            Self::FlagConflict => "flag_conflict",
            Self::Enhance => "enhance",
        }
    }

    /// Parse an `operation` value. Matching is exact.
    pub fn from_operation(operation: &str) -> Option<Self> {
        match operation {
            "merge" => Some(Self::Merge),
            "merge_contact" => Some(Self::MergeContact),
            "invalidate" => Some(Self::Invalidate),
            "flag_conflict" => Some(Self::FlagConflict),
            "enhance" => Some(Self::Enhance),
            _ => None,
        }
    }
}

impl std::fmt::Display for PatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a `claim_ids` list.
///
/// Entries that are not strings are kept as given so the applier can report
/// them and still act on the rest of the list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClaimRef {
    Id(String),
    Invalid(Value),
}

impl ClaimRef {
    pub fn as_id(&self) -> Option<&str> {
        match self {
            Self::Id(id) => Some(id),
            Self::Invalid(_) => None,
        }
    }
}

impl From<&str> for ClaimRef {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

/// Body of `merge` and `merge_contact`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergePatch {
    #[serde(default)]
    pub claim_ids: Vec<ClaimRef>,
    #[serde(default)]
    pub keep_claim_id: Option<String>,
    #[serde(default)]
    pub add_metadata: Option<Map<String, Value>>,
}

/// Body of `invalidate`.
///
/// `reason` and `superseded_by` are informational only; they reach the claim
/// only when repeated inside `add_metadata`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvalidatePatch {
    #[serde(default)]
    pub claim_id: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub superseded_by: Option<String>,
    #[serde(default)]
    pub add_metadata: Option<Map<String, Value>>,
}

/// Body of `flag_conflict`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlagConflictPatch {
    #[serde(default)]
    pub claim_ids: Vec<ClaimRef>,
    #[serde(default)]
    pub add_metadata: Option<Map<String, Value>>,
}

/// Body of `enhance`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnhancePatch {
    #[serde(default)]
    pub claim_id: Option<String>,
    #[serde(default)]
    pub add_metadata: Option<Map<String, Value>>,
}

/// One reconciliation instruction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub enum Patch {
    Merge(MergePatch),
    MergeContact(MergePatch),
    Invalidate(InvalidatePatch),
    FlagConflict(FlagConflictPatch),
    Enhance(EnhancePatch),
    /// Known operation whose fields could not be decoded.
    Malformed { kind: PatchKind, reason: String },
    /// Missing or unrecognised operation.
    Unknown { operation: Option<String> },
}

impl Patch {
    /// The operation kind, if recognised (malformed patches keep theirs).
    pub fn kind(&self) -> Option<PatchKind> {
        match self {
            Self::Merge(_) => Some(PatchKind::Merge),
            Self::MergeContact(_) => Some(PatchKind::MergeContact),
            Self::Invalidate(_) => Some(PatchKind::Invalidate),
            Self::FlagConflict(_) => Some(PatchKind::FlagConflict),
            Self::Enhance(_) => Some(PatchKind::Enhance),
            Self::Malformed { kind, .. } => Some(*kind),
            Self::Unknown { .. } => None,
        }
    }

    /// Operation name as given, for logs and diagnostics.
    pub fn operation(&self) -> &str {
        match self {
            Self::Unknown {
                operation: Some(op),
            } => op.as_str(),
            Self::Unknown { operation: None } => "<missing>",
            other => other.kind().map_or("<missing>", |k| k.as_str()),
        }
    }
}

impl From<Value> for Patch {
    fn from(value: Value) -> Self {
        let Some(operation) = value.get("operation").and_then(Value::as_str) else {
            return Self::Unknown { operation: None };
        };
        let Some(kind) = PatchKind::from_operation(operation) else {
            return Self::Unknown {
                operation: Some(operation.to_string()),
            };
        };

        let parsed = match kind {
            PatchKind::Merge => serde_json::from_value(value).map(Self::Merge),
            PatchKind::MergeContact => serde_json::from_value(value).map(Self::MergeContact),
            PatchKind::Invalidate => serde_json::from_value(value).map(Self::Invalidate),
            PatchKind::FlagConflict => serde_json::from_value(value).map(Self::FlagConflict),
            PatchKind::Enhance => serde_json::from_value(value).map(Self::Enhance),
        };

        parsed.unwrap_or_else(|e| Self::Malformed {
            kind,
            reason: e.to_string(),
        })
    }
}
