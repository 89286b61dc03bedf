//! Core domain types: claims, claim batches, qualified ids and run manifests.

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Current schema version for the run manifest format.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Literal used as the local id of a claim that arrived without one.
pub const UNKNOWN_CLAIM_ID: &str = "unknown";

/// Upper bound on statement length, in characters.
pub const MAX_STATEMENT_CHARS: usize = 500;

/// Claim fields that identify a claim and must never be rewritten by metadata updates.
pub const RESERVED_CLAIM_KEYS: [&str; 3] = ["claim_id", "qualified_id", "producing_step"];

// ---------------------------------------------------------------------------
// ClaimType
// ---------------------------------------------------------------------------

/// Kind of fact a claim asserts.
///
/// Values outside the known set are kept verbatim in [`ClaimType::Other`] so
/// that malformed upstream output survives ingestion untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClaimType {
    Signal,
    Contact,
    Entity,
    Relationship,
    Opportunity,
    Metric,
    Attribute,
    Note,
    Other(String),
}

impl ClaimType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Signal => "SIGNAL",
            Self::Contact => "CONTACT",
            Self::Entity => "ENTITY",
            Self::Relationship => "RELATIONSHIP",
            Self::Opportunity => "OPPORTUNITY",
            Self::Metric => "METRIC",
            Self::Attribute => "ATTRIBUTE",
            Self::Note => "NOTE",
            Self::Other(raw) => raw,
        }
    }

    /// Whether this is one of the eight recognised kinds.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<String> for ClaimType {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SIGNAL" => Self::Signal,
            "CONTACT" => Self::Contact,
            "ENTITY" => Self::Entity,
            "RELATIONSHIP" => Self::Relationship,
            "OPPORTUNITY" => Self::Opportunity,
            "METRIC" => Self::Metric,
            "ATTRIBUTE" => Self::Attribute,
            "NOTE" => Self::Note,
            _ => Self::Other(raw),
        }
    }
}

impl From<ClaimType> for String {
    fn from(kind: ClaimType) -> Self {
        match kind {
            ClaimType::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for ClaimType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Claim
// ---------------------------------------------------------------------------

/// An atomic, provenance-tagged fact produced by one upstream step.
///
/// The typed fields cover what every claim carries. Everything else a
/// reconciliation patch attaches (`related_claims`, `strategic_importance`,
/// conflict descriptions, ...) lives in `metadata`, which is flattened back
/// into the claim object on serialization.
///
/// Typed fields are decoded leniently: a value of the wrong JSON type is
/// coerced for internal use, and the value as given is kept and written back
/// on serialization, so a malformed claim leaves the engine unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Claim {
    /// Local id, unique only within the producing batch.
    pub claim_id: Option<String>,
    /// `step.claim_id`, stamped at ingestion.
    pub qualified_id: Option<String>,
    /// Upstream step that emitted the claim.
    pub producing_step: Option<String>,
    pub claim_type: Option<ClaimType>,
    /// Human-readable fact.
    pub statement: Option<String>,
    /// Named entities, in the order given (duplicates preserved).
    pub entities: Option<Vec<String>>,
    pub source_tier: Option<String>,
    pub confidence: Option<String>,
    pub source_name: Option<String>,
    pub source_url: Option<String>,
    /// Open extension map for patch-injected attributes.
    pub metadata: Map<String, Value>,
    /// Typed fields whose input did not decode cleanly, as given.
    verbatim: Map<String, Value>,
}

/// Claim keys decoded into typed fields, in serialization order.
const TYPED_CLAIM_KEYS: [&str; 10] = [
    "claim_id",
    "qualified_id",
    "producing_step",
    "claim_type",
    "statement",
    "entities",
    "source_tier",
    "confidence",
    "source_name",
    "source_url",
];

impl Claim {
    /// The local id, or [`UNKNOWN_CLAIM_ID`] when the claim has none.
    pub fn effective_claim_id(&self) -> &str {
        self.claim_id.as_deref().unwrap_or(UNKNOWN_CLAIM_ID)
    }

    /// Statement length in characters (0 when absent).
    pub fn statement_chars(&self) -> usize {
        self.statement.as_deref().map_or(0, |s| s.chars().count())
    }

    /// Whether the statement fits within [`MAX_STATEMENT_CHARS`].
    pub fn statement_within_limit(&self) -> bool {
        self.statement_chars() <= MAX_STATEMENT_CHARS
    }

    /// The input value of a typed field that had to be coerced.
    pub fn raw_field(&self, key: &str) -> Option<&Value> {
        self.verbatim.get(key)
    }

    /// Set the identity assigned at ingestion.
    pub fn stamp_identity(&mut self, qualified_id: String, step: &str) {
        self.qualified_id = Some(qualified_id);
        self.producing_step = Some(step.to_string());
        self.verbatim.remove("qualified_id");
        self.verbatim.remove("producing_step");
    }

    /// Apply a last-write-wins metadata update.
    ///
    /// Keys naming a typed field overwrite that field; any other key lands in
    /// `metadata`. Identity keys are left untouched and returned so the
    /// caller can report them.
    pub fn apply_metadata(&mut self, updates: &Map<String, Value>) -> Vec<String> {
        let mut rejected = Vec::new();

        for (key, value) in updates {
            if RESERVED_CLAIM_KEYS.contains(&key.as_str()) {
                rejected.push(key.clone());
            } else if TYPED_CLAIM_KEYS.contains(&key.as_str()) {
                self.set_typed(key, value.clone());
            } else {
                self.metadata.insert(key.clone(), value.clone());
            }
        }

        rejected
    }

    /// Decode `value` into the typed field `key`, remembering it verbatim
    /// when it is not of the expected shape.
    fn set_typed(&mut self, key: &str, value: Value) {
        let clean = match key {
            "claim_type" => value
                .as_str()
                .is_some_and(|s| ClaimType::from(s.to_string()).as_str() == s),
            "entities" => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            _ => value.is_string(),
        };

        let text = || lenient::scalar_to_string(value.clone());
        match key {
            "claim_id" => self.claim_id = text(),
            "qualified_id" => self.qualified_id = text(),
            "producing_step" => self.producing_step = text(),
            "claim_type" => self.claim_type = text().map(ClaimType::from),
            "statement" => self.statement = text(),
            "entities" => self.entities = Some(lenient::to_string_list(value.clone())),
            "source_tier" => self.source_tier = text(),
            "confidence" => self.confidence = text(),
            "source_name" => self.source_name = text(),
            "source_url" => self.source_url = text(),
            _ => return,
        }

        if clean {
            self.verbatim.remove(key);
        } else {
            self.verbatim.insert(key.to_string(), value);
        }
    }

    /// JSON value of a typed field as it will be written out.
    fn typed_value(&self, key: &str) -> Option<Value> {
        if let Some(raw) = self.verbatim.get(key) {
            return Some(raw.clone());
        }
        let text = |field: &Option<String>| field.clone().map(Value::String);
        match key {
            "claim_id" => text(&self.claim_id),
            "qualified_id" => text(&self.qualified_id),
            "producing_step" => text(&self.producing_step),
            "claim_type" => self.claim_type.clone().map(|t| Value::String(t.into())),
            "statement" => text(&self.statement),
            "entities" => self
                .entities
                .as_ref()
                .map(|items| Value::Array(items.iter().cloned().map(Value::String).collect())),
            "source_tier" => text(&self.source_tier),
            "confidence" => text(&self.confidence),
            "source_name" => text(&self.source_name),
            "source_url" => text(&self.source_url),
            _ => None,
        }
    }
}

impl Serialize for Claim {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for key in TYPED_CLAIM_KEYS {
            if let Some(value) = self.typed_value(key) {
                map.serialize_entry(key, &value)?;
            }
        }
        for (key, value) in &self.metadata {
            if !TYPED_CLAIM_KEYS.contains(&key.as_str()) {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Claim {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let fields = Map::<String, Value>::deserialize(deserializer)?;

        let mut claim = Claim::default();
        for (key, value) in fields {
            if TYPED_CLAIM_KEYS.contains(&key.as_str()) {
                claim.set_typed(&key, value);
            } else {
                claim.metadata.insert(key, value);
            }
        }
        Ok(claim)
    }
}

// ---------------------------------------------------------------------------
// ClaimBatch
// ---------------------------------------------------------------------------

/// All claims emitted by one upstream step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimBatch {
    /// Producing step name; the first half of every qualified id in the batch.
    #[serde(alias = "producing_step")]
    pub step: String,
    /// Claims in emission order.
    #[serde(default)]
    pub claims: Vec<Claim>,
}

impl ClaimBatch {
    pub fn new(step: impl Into<String>, claims: Vec<Claim>) -> Self {
        Self {
            step: step.into(),
            claims,
        }
    }
}

// ---------------------------------------------------------------------------
// QualifiedId
// ---------------------------------------------------------------------------

/// Globally unique claim key: producing step plus local claim id.
///
/// Kept as two parts so that ids containing `.` cannot collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedId {
    pub step: String,
    pub claim_id: String,
}

impl QualifiedId {
    pub fn new(step: impl Into<String>, claim_id: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            claim_id: claim_id.into(),
        }
    }

    /// Every way of reading `raw` as `step.claim_id`, splitting at each `.`
    /// from left to right.
    pub fn candidates(raw: &str) -> impl Iterator<Item = QualifiedId> + '_ {
        raw.match_indices('.')
            .map(move |(pos, _)| QualifiedId::new(&raw[..pos], &raw[pos + 1..]))
    }
}

impl std::fmt::Display for QualifiedId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.step, self.claim_id)
    }
}

impl Serialize for QualifiedId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// RunId / RunManifest
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one merge run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A file written as part of a merge report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFile {
    pub filename: String,
    pub sha256: String,
    pub size_bytes: usize,
}

/// The `manifest.json` stored at the root of each report directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    /// Schema version for forward compatibility.
    pub schema_version: u32,
    /// Unique identifier for this run.
    pub id: RunId,
    /// Tool version that wrote the report.
    pub tool_version: String,
    /// When the report was written.
    pub created_at: DateTime<Utc>,
    /// Claims ingested across all batches.
    pub total_input_claims: usize,
    /// Patch objects supplied.
    pub patch_count: usize,
    /// Claims surviving the merge.
    pub final_claim_count: usize,
    /// Number of patches that were skipped or only partially applied.
    pub diagnostic_count: usize,
    /// Files in the report directory, with checksums.
    #[serde(default)]
    pub files: Vec<ReportFile>,
}

// ---------------------------------------------------------------------------
// Lenient field decoding
// ---------------------------------------------------------------------------

/// Coercions used for the typed view of a claim field.
mod lenient {
    use serde_json::Value;

    pub(super) fn scalar_to_string(value: Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        }
    }

    pub(super) fn to_string_list(value: Value) -> Vec<String> {
        match value {
            Value::Array(items) => items.into_iter().filter_map(scalar_to_string).collect(),
            Value::Null => Vec::new(),
            other => scalar_to_string(other).into_iter().collect(),
        }
    }
}
