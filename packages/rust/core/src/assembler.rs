//! Result assembler.
//!
//! Walks the final claim index and produces the surviving claims plus the
//! application summary. Survival only checks one hop: a record is dropped
//! when its `merged_into` is set, regardless of where that chain ends.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use leadgen_shared::Claim;

use crate::applier::PatchDiagnostic;
use crate::index::{ClaimIndex, IngestNote, MergeRecord};
use crate::patch::{Patch, PatchKind};

/// Key set to `true` on output claims whose record was invalidated.
pub const INVALIDATED_KEY: &str = "invalidated";

/// Aggregate statistics for one merge run.
///
/// Per-kind counters count patch objects seen, not successful mutations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSummary {
    /// Records in the index (one per distinct ingested key).
    pub total_input_claims: usize,
    /// Input patch objects, whatever their operation.
    pub patches_applied: usize,
    /// `merge` and `merge_contact` patches.
    pub merges: usize,
    pub invalidations: usize,
    pub conflicts_flagged: usize,
    pub enhancements: usize,
    /// Length of `merged_claims`.
    pub final_claim_count: usize,
}

impl ApplicationSummary {
    /// Count patch objects by kind. Unknown operations count only towards
    /// `patches_applied`.
    pub fn count_patches(&mut self, patches: &[Patch]) {
        self.patches_applied = patches.len();
        for patch in patches {
            match patch.kind() {
                Some(PatchKind::Merge | PatchKind::MergeContact) => self.merges += 1,
                Some(PatchKind::Invalidate) => self.invalidations += 1,
                Some(PatchKind::FlagConflict) => self.conflicts_flagged += 1,
                Some(PatchKind::Enhance) => self.enhancements += 1,
                None => {}
            }
        }
    }
}

/// Engine output: `{ merged_claims, application_summary }`.
///
/// `diagnostics` and `ingest_notes` are only serialized when non-empty, so
/// clean runs keep the two-field shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeResult {
    pub merged_claims: Vec<Claim>,
    pub application_summary: ApplicationSummary,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<PatchDiagnostic>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingest_notes: Vec<IngestNote>,
}

/// Build the merge result from the final index.
#[instrument(skip_all, fields(records = index.len(), patches = patches.len()))]
pub fn assemble(
    index: &ClaimIndex,
    patches: &[Patch],
    diagnostics: Vec<PatchDiagnostic>,
) -> MergeResult {
    let merged_claims: Vec<Claim> = index
        .records()
        .filter(|record| record.survives())
        .map(output_claim)
        .collect();

    let mut summary = ApplicationSummary {
        total_input_claims: index.len(),
        final_claim_count: merged_claims.len(),
        ..Default::default()
    };
    summary.count_patches(patches);

    info!(
        input = summary.total_input_claims,
        surviving = summary.final_claim_count,
        patches = summary.patches_applied,
        skipped = diagnostics.len(),
        "merge result assembled"
    );

    MergeResult {
        merged_claims,
        application_summary: summary,
        diagnostics,
        ingest_notes: index.notes().to_vec(),
    }
}

/// The claim as callers see it: invalidation is carried on the claim itself.
fn output_claim(record: &MergeRecord) -> Claim {
    let mut claim = record.claim.clone();
    if record.invalidated {
        claim.metadata.insert(INVALIDATED_KEY.to_string(), Value::Bool(true));
    }
    claim
}
