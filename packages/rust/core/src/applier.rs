//! Patch applier.
//!
//! Applies reconciliation patches to a [`ClaimIndex`] strictly in the order
//! given. Application is fail-open: a patch naming claims that are not in the
//! index does whatever it still can and the rest is skipped. Every skip is
//! described by a [`PatchDiagnostic`] so callers can see what was lost.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use leadgen_shared::QualifiedId;

use crate::index::ClaimIndex;
use crate::patch::{
    ClaimRef, EnhancePatch, FlagConflictPatch, InvalidatePatch, MergePatch, Patch, PatchKind,
};

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Why (part of) a patch had no effect, or had a surprising one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "issue", content = "detail", rename_all = "snake_case")]
pub enum PatchIssue {
    /// `merge`/`merge_contact` without a `keep_claim_id`.
    MissingKeepId,
    /// `keep_claim_id` does not name an indexed claim.
    UnknownKeepId(String),
    /// The survivor had already been merged into another claim.
    KeepMergedAway { keep: String, merged_into: String },
    /// `invalidate`/`enhance` without a `claim_id`.
    MissingClaimId,
    /// A listed id does not name an indexed claim.
    UnknownClaim(String),
    /// A `claim_ids` entry is not a string (kept as JSON text).
    InvalidClaimId(String),
    /// `claim_ids` was empty.
    EmptyClaimIds,
    /// `add_metadata` tried to rewrite an identity field.
    ReservedMetadataKey(String),
    /// Known operation with undecodable fields.
    Malformed(String),
    /// Operation not recognised.
    UnknownOperation(String),
    /// No `operation` field.
    MissingOperation,
}

impl std::fmt::Display for PatchIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingKeepId => write!(f, "missing keep_claim_id"),
            Self::UnknownKeepId(id) => write!(f, "unknown keep_claim_id {id}"),
            Self::KeepMergedAway { keep, merged_into } => {
                write!(f, "keep {keep} is already merged into {merged_into}")
            }
            Self::MissingClaimId => write!(f, "missing claim_id"),
            Self::UnknownClaim(id) => write!(f, "unknown claim {id}"),
            Self::InvalidClaimId(raw) => write!(f, "claim id {raw} is not a string"),
            Self::EmptyClaimIds => write!(f, "empty claim_ids"),
            Self::ReservedMetadataKey(key) => write!(f, "reserved metadata key {key}"),
            Self::Malformed(reason) => write!(f, "malformed patch: {reason}"),
            Self::UnknownOperation(op) => write!(f, "unknown operation {op}"),
            Self::MissingOperation => write!(f, "missing operation"),
        }
    }
}

/// How much of a patch took effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchStatus {
    /// Nothing changed.
    Skipped,
    /// Some targets were updated, others were not.
    Partial,
    /// Fully applied, but with an issue worth flagging.
    AppliedWithWarnings,
}

/// Report for one patch that did not apply cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchDiagnostic {
    /// Zero-based position in the input patch list.
    pub position: usize,
    /// Operation name as given.
    pub operation: String,
    pub status: PatchStatus,
    pub issues: Vec<PatchIssue>,
}

impl std::fmt::Display for PatchDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let issues: Vec<String> = self.issues.iter().map(ToString::to_string).collect();
        write!(
            f,
            "#{} {} ({:?}): {}",
            self.position,
            self.operation,
            self.status,
            issues.join("; ")
        )
    }
}

// ---------------------------------------------------------------------------
// Applier
// ---------------------------------------------------------------------------

/// Outcome of one handler: whether anything changed and what went wrong.
#[derive(Default)]
struct Outcome {
    touched: bool,
    /// Issues that stop (part of) the patch from applying.
    skips: Vec<PatchIssue>,
    /// Issues that leave the patch applied.
    warnings: Vec<PatchIssue>,
}

impl Outcome {
    fn skipped(issue: PatchIssue) -> Self {
        Self {
            skips: vec![issue],
            ..Default::default()
        }
    }

    fn into_diagnostic(self, position: usize, operation: &str) -> Option<PatchDiagnostic> {
        let status = match (self.touched, self.skips.is_empty(), self.warnings.is_empty()) {
            (false, _, _) => PatchStatus::Skipped,
            (true, false, _) => PatchStatus::Partial,
            (true, true, false) => PatchStatus::AppliedWithWarnings,
            (true, true, true) => return None,
        };

        let mut issues = self.skips;
        issues.extend(self.warnings);
        Some(PatchDiagnostic {
            position,
            operation: operation.to_string(),
            status,
            issues,
        })
    }
}

/// Applies patches to a borrowed index.
pub struct PatchApplier<'a> {
    index: &'a mut ClaimIndex,
    log_outcomes: bool,
}

impl<'a> PatchApplier<'a> {
    pub fn new(index: &'a mut ClaimIndex) -> Self {
        Self {
            index,
            log_outcomes: true,
        }
    }

    /// Toggle the per-patch debug events.
    pub fn log_outcomes(mut self, enabled: bool) -> Self {
        self.log_outcomes = enabled;
        self
    }

    /// Apply every patch in order and collect diagnostics for the ones that
    /// did not apply cleanly.
    pub fn apply_all(&mut self, patches: &[Patch]) -> Vec<PatchDiagnostic> {
        patches
            .iter()
            .enumerate()
            .filter_map(|(position, patch)| self.apply(position, patch))
            .collect()
    }

    /// Apply a single patch. Returns a diagnostic unless it applied cleanly.
    pub fn apply(&mut self, position: usize, patch: &Patch) -> Option<PatchDiagnostic> {
        let outcome = match patch {
            Patch::Merge(body) | Patch::MergeContact(body) => self.apply_merge(body),
            Patch::Invalidate(body) => self.apply_invalidate(body),
            Patch::FlagConflict(body) => self.apply_flag_conflict(body),
            Patch::Enhance(body) => self.apply_enhance(body),
            Patch::Malformed { reason, .. } => Outcome::skipped(PatchIssue::Malformed(reason.clone())),
            Patch::Unknown {
                operation: Some(op),
            } => Outcome::skipped(PatchIssue::UnknownOperation(op.clone())),
            Patch::Unknown { operation: None } => Outcome::skipped(PatchIssue::MissingOperation),
        };

        let diagnostic = outcome.into_diagnostic(position, patch.operation());
        match &diagnostic {
            Some(d) if d.status == PatchStatus::Skipped => {
                warn!(position, operation = patch.operation(), issues = %d, "patch skipped");
            }
            Some(d) if self.log_outcomes => {
                debug!(position, operation = patch.operation(), issues = %d, "patch partially applied");
            }
            None if self.log_outcomes => {
                debug!(position, operation = patch.operation(), "patch applied");
            }
            _ => {}
        }
        diagnostic
    }

    /// `merge` and `merge_contact`: fold every listed id except the survivor
    /// into the survivor, then update the survivor's metadata.
    fn apply_merge(&mut self, body: &MergePatch) -> Outcome {
        let Some(keep_raw) = body.keep_claim_id.as_deref() else {
            return Outcome::skipped(PatchIssue::MissingKeepId);
        };
        let Some(keep) = self.index.resolve(keep_raw) else {
            return Outcome::skipped(PatchIssue::UnknownKeepId(keep_raw.to_string()));
        };

        let mut outcome = Outcome {
            touched: true,
            ..Default::default()
        };

        if body.claim_ids.is_empty() {
            outcome.warnings.push(PatchIssue::EmptyClaimIds);
        }

        for entry in &body.claim_ids {
            let Some(id) = self.target(entry, &mut outcome) else {
                continue;
            };
            if id == keep {
                continue;
            }
            if let Some(record) = self.index.get_mut(&id) {
                record.merged_into = Some(keep.clone());
                record.patches_applied.push(PatchKind::Merge);
            }
        }

        let keep_target = self.index.get(&keep).and_then(|r| r.merged_into.clone());
        if let Some(target) = keep_target {
            outcome.warnings.push(PatchIssue::KeepMergedAway {
                keep: keep.to_string(),
                merged_into: target.to_string(),
            });
        }

        self.update_metadata(&keep, body.add_metadata.as_ref(), &mut outcome);
        if let Some(record) = self.index.get_mut(&keep) {
            record.patches_applied.push(PatchKind::Merge);
        }

        outcome
    }

    /// `invalidate`: set the sticky flag and merge metadata. Nothing is removed.
    fn apply_invalidate(&mut self, body: &InvalidatePatch) -> Outcome {
        let id = match self.single_target(body.claim_id.as_deref()) {
            Ok(id) => id,
            Err(outcome) => return outcome,
        };

        let mut outcome = Outcome {
            touched: true,
            ..Default::default()
        };
        if let Some(record) = self.index.get_mut(&id) {
            record.invalidated = true;
            record.patches_applied.push(PatchKind::Invalidate);
        }
        self.update_metadata(&id, body.add_metadata.as_ref(), &mut outcome);

        if let Some(reason) = &body.reason {
            debug!(claim = %id, reason, superseded_by = ?body.superseded_by, "claim invalidated");
        }
        outcome
    }

    /// `flag_conflict`: annotate every listed claim that exists.
    fn apply_flag_conflict(&mut self, body: &FlagConflictPatch) -> Outcome {
        if body.claim_ids.is_empty() {
            return Outcome::skipped(PatchIssue::EmptyClaimIds);
        }

        let mut outcome = Outcome::default();
        for entry in &body.claim_ids {
            let Some(id) = self.target(entry, &mut outcome) else {
                continue;
            };
            if let Some(record) = self.index.get_mut(&id) {
                record.patches_applied.push(PatchKind::FlagConflict);
            }
            self.update_metadata(&id, body.add_metadata.as_ref(), &mut outcome);
            outcome.touched = true;
        }
        outcome
    }

    /// `enhance`: merge metadata into one claim.
    fn apply_enhance(&mut self, body: &EnhancePatch) -> Outcome {
        let id = match self.single_target(body.claim_id.as_deref()) {
            Ok(id) => id,
            Err(outcome) => return outcome,
        };

        let mut outcome = Outcome {
            touched: true,
            ..Default::default()
        };
        self.update_metadata(&id, body.add_metadata.as_ref(), &mut outcome);
        if let Some(record) = self.index.get_mut(&id) {
            record.patches_applied.push(PatchKind::Enhance);
        }
        outcome
    }

    /// Resolve one `claim_ids` entry, recording a skip when it names nothing.
    fn target(&self, entry: &ClaimRef, outcome: &mut Outcome) -> Option<QualifiedId> {
        let raw = match entry {
            ClaimRef::Id(raw) => raw,
            ClaimRef::Invalid(value) => {
                outcome.skips.push(PatchIssue::InvalidClaimId(value.to_string()));
                return None;
            }
        };
        let id = self.index.resolve(raw);
        if id.is_none() {
            outcome.skips.push(PatchIssue::UnknownClaim(raw.to_string()));
        }
        id
    }

    /// Resolve the `claim_id` of a single-target patch.
    fn single_target(&self, raw: Option<&str>) -> Result<QualifiedId, Outcome> {
        let raw = raw.ok_or_else(|| Outcome::skipped(PatchIssue::MissingClaimId))?;
        self.index
            .resolve(raw)
            .ok_or_else(|| Outcome::skipped(PatchIssue::UnknownClaim(raw.to_string())))
    }

    /// Last-write-wins metadata update on one record.
    fn update_metadata(
        &mut self,
        id: &QualifiedId,
        add_metadata: Option<&Map<String, Value>>,
        outcome: &mut Outcome,
    ) {
        let (Some(updates), Some(record)) = (add_metadata, self.index.get_mut(id)) else {
            return;
        };

        for key in record.claim.apply_metadata(updates) {
            let issue = PatchIssue::ReservedMetadataKey(key);
            if !outcome.warnings.contains(&issue) {
                outcome.warnings.push(issue);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadgen_shared::ClaimBatch;
    use serde_json::json;

    fn index() -> ClaimIndex {
        let batches: Vec<ClaimBatch> = serde_json::from_value(json!([
            {"step": "A", "claims": [
                {"claim_id": "c1", "claim_type": "ENTITY", "statement": "Foo"},
                {"claim_id": "c2", "claim_type": "SIGNAL", "statement": "Foo is hiring"}
            ]},
            {"step": "B", "claims": [
                {"claim_id": "c1", "claim_type": "ENTITY", "statement": "Foo Inc"},
                {"claim_id": "c3", "claim_type": "CONTACT", "statement": "Jane Doe, CFO"}
            ]}
        ]))
        .unwrap();
        ClaimIndex::from_batches(&batches)
    }

    fn patch(value: serde_json::Value) -> Patch {
        Patch::from(value)
    }

    fn record<'a>(index: &'a ClaimIndex, raw: &str) -> &'a crate::index::MergeRecord {
        index.lookup(raw).expect("record exists")
    }

    #[test]
    fn merge_folds_non_kept_ids_into_keep() {
        let mut index = index();
        let diagnostics = PatchApplier::new(&mut index).apply_all(&[patch(json!({
            "operation": "merge",
            "claim_ids": ["A.c1", "B.c1", "A.c2"],
            "keep_claim_id": "B.c1",
            "add_metadata": {"note": "dup"}
        }))]);

        assert!(diagnostics.is_empty());
        let keep = QualifiedId::new("B", "c1");
        assert_eq!(record(&index, "A.c1").merged_into, Some(keep.clone()));
        assert_eq!(record(&index, "A.c2").merged_into, Some(keep));
        assert!(record(&index, "B.c1").survives());
        assert_eq!(record(&index, "B.c1").claim.metadata["note"], "dup");
        assert_eq!(record(&index, "B.c1").patches_applied, vec![PatchKind::Merge]);
        assert_eq!(record(&index, "A.c1").patches_applied, vec![PatchKind::Merge]);
        assert!(record(&index, "B.c3").patches_applied.is_empty());
    }

    #[test]
    fn merge_contact_uses_merge_semantics() {
        let mut index = index();
        PatchApplier::new(&mut index).apply_all(&[patch(json!({
            "operation": "merge_contact",
            "claim_ids": ["B.c3", "A.c2"],
            "keep_claim_id": "B.c3",
            "add_metadata": {"email": "jane@foo.example"}
        }))]);

        assert_eq!(
            record(&index, "A.c2").merged_into,
            Some(QualifiedId::new("B", "c3"))
        );
        assert_eq!(record(&index, "B.c3").patches_applied, vec![PatchKind::Merge]);
        assert_eq!(record(&index, "B.c3").claim.metadata["email"], "jane@foo.example");
    }

    #[test]
    fn merge_with_unknown_keep_is_a_noop() {
        let mut index = index();
        let before: Vec<_> = index.records().cloned().collect();

        let diagnostics = PatchApplier::new(&mut index).apply_all(&[patch(json!({
            "operation": "merge",
            "claim_ids": ["A.c1", "B.c1"],
            "keep_claim_id": "Z.c9",
            "add_metadata": {"note": "dup"}
        }))]);

        let after: Vec<_> = index.records().cloned().collect();
        assert_eq!(before, after);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].status, PatchStatus::Skipped);
        assert_eq!(
            diagnostics[0].issues,
            vec![PatchIssue::UnknownKeepId("Z.c9".into())]
        );
    }

    #[test]
    fn merge_without_keep_is_a_noop() {
        let mut index = index();
        let diagnostics = PatchApplier::new(&mut index)
            .apply_all(&[patch(json!({"operation": "merge", "claim_ids": ["A.c1"]}))]);
        assert!(record(&index, "A.c1").survives());
        assert_eq!(diagnostics[0].issues, vec![PatchIssue::MissingKeepId]);
    }

    #[test]
    fn merge_skips_unknown_members_but_applies_the_rest() {
        let mut index = index();
        let diagnostics = PatchApplier::new(&mut index).apply_all(&[patch(json!({
            "operation": "merge",
            "claim_ids": ["A.c1", "Q.nope"],
            "keep_claim_id": "B.c1"
        }))]);

        assert!(!record(&index, "A.c1").survives());
        assert_eq!(diagnostics[0].status, PatchStatus::Partial);
        assert_eq!(
            diagnostics[0].issues,
            vec![PatchIssue::UnknownClaim("Q.nope".into())]
        );
    }

    #[test]
    fn non_string_member_is_skipped_not_the_whole_merge() {
        let mut index = index();
        let diagnostics = PatchApplier::new(&mut index).apply_all(&[patch(json!({
            "operation": "merge",
            "claim_ids": ["A.c1", null, "B.c1"],
            "keep_claim_id": "B.c1"
        }))]);

        assert_eq!(
            record(&index, "A.c1").merged_into,
            Some(QualifiedId::new("B", "c1"))
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].status, PatchStatus::Partial);
        assert_eq!(
            diagnostics[0].issues,
            vec![PatchIssue::InvalidClaimId("null".into())]
        );
    }

    #[test]
    fn non_string_conflict_member_is_skipped() {
        let mut index = index();
        let diagnostics = PatchApplier::new(&mut index).apply_all(&[patch(json!({
            "operation": "flag_conflict",
            "claim_ids": [{"id": "A.c1"}, "B.c1"]
        }))]);

        assert_eq!(
            record(&index, "B.c1").patches_applied,
            vec![PatchKind::FlagConflict]
        );
        assert!(record(&index, "A.c1").patches_applied.is_empty());
        assert_eq!(diagnostics[0].status, PatchStatus::Partial);
        assert!(matches!(diagnostics[0].issues[0], PatchIssue::InvalidClaimId(_)));
    }

    #[test]
    fn merge_chain_is_not_resolved() {
        let mut index = index();
        let diagnostics = PatchApplier::new(&mut index).apply_all(&[
            patch(json!({"operation": "merge", "claim_ids": ["A.c1"], "keep_claim_id": "B.c1"})),
            patch(json!({"operation": "merge", "claim_ids": ["B.c1"], "keep_claim_id": "A.c2"})),
        ]);

        assert!(diagnostics.is_empty());
        // A.c1 still names its direct survivor, not the end of the chain.
        assert_eq!(
            record(&index, "A.c1").merged_into,
            Some(QualifiedId::new("B", "c1"))
        );
        assert_eq!(
            record(&index, "B.c1").merged_into,
            Some(QualifiedId::new("A", "c2"))
        );
        assert_eq!(
            record(&index, "B.c1").patches_applied,
            vec![PatchKind::Merge, PatchKind::Merge]
        );
    }

    #[test]
    fn merging_into_a_merged_away_keep_warns() {
        let mut index = index();
        let diagnostics = PatchApplier::new(&mut index).apply_all(&[
            patch(json!({"operation": "merge", "claim_ids": ["A.c1"], "keep_claim_id": "B.c1"})),
            patch(json!({"operation": "merge", "claim_ids": ["A.c2"], "keep_claim_id": "A.c1"})),
        ]);

        assert_eq!(
            record(&index, "A.c2").merged_into,
            Some(QualifiedId::new("A", "c1"))
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].position, 1);
        assert_eq!(diagnostics[0].status, PatchStatus::AppliedWithWarnings);
    }

    #[test]
    fn invalidate_is_sticky_and_non_destructive() {
        let mut index = index();
        PatchApplier::new(&mut index).apply_all(&[
            patch(json!({
                "operation": "invalidate",
                "claim_id": "A.c2",
                "reason": "outdated",
                "superseded_by": "B.c1",
                "add_metadata": {"invalid_reason": "outdated"}
            })),
            patch(json!({"operation": "enhance", "claim_id": "A.c2", "add_metadata": {"x": 1}})),
        ]);

        let rec = record(&index, "A.c2");
        assert!(rec.invalidated);
        assert!(rec.survives());
        assert_eq!(rec.patches_applied, vec![PatchKind::Invalidate, PatchKind::Enhance]);
        assert_eq!(rec.claim.metadata["invalid_reason"], "outdated");
        // Extra patch fields are not copied onto the claim.
        assert!(!rec.claim.metadata.contains_key("reason"));
        assert!(!rec.claim.metadata.contains_key("superseded_by"));
    }

    #[test]
    fn invalidate_unknown_claim_is_skipped() {
        let mut index = index();
        let diagnostics = PatchApplier::new(&mut index)
            .apply_all(&[patch(json!({"operation": "invalidate", "claim_id": "A.c404"}))]);
        assert_eq!(diagnostics[0].issues, vec![PatchIssue::UnknownClaim("A.c404".into())]);
        assert!(index.records().all(|r| !r.invalidated));
    }

    #[test]
    fn flag_conflict_annotates_every_existing_claim() {
        let mut index = index();
        let diagnostics = PatchApplier::new(&mut index).apply_all(&[patch(json!({
            "operation": "flag_conflict",
            "claim_ids": ["A.c1", "B.c1", "C.missing"],
            "add_metadata": {"conflict": "name mismatch"}
        }))]);

        for raw in ["A.c1", "B.c1"] {
            let rec = record(&index, raw);
            assert!(rec.survives());
            assert!(!rec.invalidated);
            assert_eq!(rec.patches_applied, vec![PatchKind::FlagConflict]);
            assert_eq!(rec.claim.metadata["conflict"], "name mismatch");
        }
        assert_eq!(diagnostics[0].status, PatchStatus::Partial);
    }

    #[test]
    fn flag_conflict_with_only_missing_ids_is_skipped() {
        let mut index = index();
        let diagnostics = PatchApplier::new(&mut index).apply_all(&[patch(json!({
            "operation": "flag_conflict",
            "claim_ids": ["X.1", "X.2"]
        }))]);
        assert_eq!(diagnostics[0].status, PatchStatus::Skipped);
        assert_eq!(diagnostics[0].issues.len(), 2);
    }

    #[test]
    fn later_metadata_wins() {
        let mut index = index();
        PatchApplier::new(&mut index).apply_all(&[
            patch(json!({
                "operation": "enhance",
                "claim_id": "B.c3",
                "add_metadata": {"strategic_importance": "low", "seniority": "C-level"}
            })),
            patch(json!({
                "operation": "enhance",
                "claim_id": "B.c3",
                "add_metadata": {"strategic_importance": "high"}
            })),
        ]);

        let rec = record(&index, "B.c3");
        assert_eq!(rec.claim.metadata["strategic_importance"], "high");
        assert_eq!(rec.claim.metadata["seniority"], "C-level");
        assert_eq!(rec.patches_applied, vec![PatchKind::Enhance, PatchKind::Enhance]);
    }

    #[test]
    fn reserved_keys_are_not_rewritten() {
        let mut index = index();
        let diagnostics = PatchApplier::new(&mut index).apply_all(&[patch(json!({
            "operation": "enhance",
            "claim_id": "A.c1",
            "add_metadata": {"qualified_id": "Z.z", "confidence": "LOW"}
        }))]);

        let rec = record(&index, "A.c1");
        assert_eq!(rec.claim.qualified_id.as_deref(), Some("A.c1"));
        assert_eq!(rec.claim.confidence.as_deref(), Some("LOW"));
        assert_eq!(diagnostics[0].status, PatchStatus::AppliedWithWarnings);
        assert_eq!(
            diagnostics[0].issues,
            vec![PatchIssue::ReservedMetadataKey("qualified_id".into())]
        );
    }

    #[test]
    fn unknown_and_malformed_patches_change_nothing() {
        let mut index = index();
        let before: Vec<_> = index.records().cloned().collect();
        let diagnostics = PatchApplier::new(&mut index).apply_all(&[
            patch(json!({"operation": "split", "claim_id": "A.c1"})),
            patch(json!({"claim_id": "A.c1"})),
            patch(json!({"operation": "enhance", "claim_id": ["A.c1"]})),
        ]);
        let after: Vec<_> = index.records().cloned().collect();

        assert_eq!(before, after);
        assert_eq!(diagnostics.len(), 3);
        assert_eq!(diagnostics[0].issues, vec![PatchIssue::UnknownOperation("split".into())]);
        assert_eq!(diagnostics[1].issues, vec![PatchIssue::MissingOperation]);
        assert!(matches!(diagnostics[2].issues[0], PatchIssue::Malformed(_)));
        assert_eq!(diagnostics[2].operation, "enhance");
    }
}
