//! End-to-end merge: claim batches + patches → index → applied patches → result.

use std::path::Path;

use tracing::{info, instrument, warn};

use leadgen_shared::{ClaimBatch, LeadgenError, MergeOptions, Result};

use crate::applier::{PatchApplier, PatchDiagnostic};
use crate::assembler::{self, MergeResult};
use crate::index::{ClaimIndex, IngestNote, MergeRecord};
use crate::patch::Patch;

/// A finished merge: the final index (for audit) and the assembled result.
#[derive(Debug, Clone)]
pub struct MergeRun {
    pub index: ClaimIndex,
    pub result: MergeResult,
}

impl MergeRun {
    /// Audit lookup by textual `step.claim_id`, including merged-away claims.
    pub fn record(&self, raw: &str) -> Option<&MergeRecord> {
        self.index.lookup(raw)
    }

    pub fn diagnostics(&self) -> &[PatchDiagnostic] {
        &self.result.diagnostics
    }

    /// Ingestion notes for input claims that did not make it into the index.
    pub fn lost_claims(&self) -> impl Iterator<Item = &IngestNote> {
        self.result.ingest_notes.iter().filter(|note| note.loses_claim())
    }

    /// Whether every patch applied cleanly and no input claim was lost.
    pub fn is_clean(&self) -> bool {
        self.result.diagnostics.is_empty() && self.lost_claims().next().is_none()
    }

    /// Refuse the run if any patch was skipped or only partially applied, or
    /// if an input claim was overwritten at ingestion.
    pub fn into_strict(self) -> Result<Self> {
        if self.is_clean() {
            return Ok(self);
        }

        let mut problems: Vec<String> = self
            .lost_claims()
            .map(|note| match note {
                IngestNote::DuplicateKey { qualified_id } => {
                    format!("claim {qualified_id} overwritten by a later claim")
                }
                other => format!("{other:?}"),
            })
            .collect();
        problems.extend(self.result.diagnostics.iter().map(ToString::to_string));

        Err(LeadgenError::PatchRejected {
            count: problems.len(),
            summary: problems.join(" | "),
        })
    }
}

/// Apply `patches` to `batches` and assemble the result. Never fails.
#[instrument(skip_all, fields(batches = batches.len(), patches = patches.len()))]
pub fn apply(batches: &[ClaimBatch], patches: &[Patch], options: &MergeOptions) -> MergeRun {
    let mut index = ClaimIndex::from_batches(batches);

    let diagnostics = PatchApplier::new(&mut index)
        .log_outcomes(options.log_patch_outcomes)
        .apply_all(patches);

    if !diagnostics.is_empty() {
        warn!(
            count = diagnostics.len(),
            "some patches were skipped or only partially applied"
        );
    }

    let result = assembler::assemble(&index, patches, diagnostics);
    MergeRun { index, result }
}

/// [`apply`] followed by [`MergeRun::into_strict`] when `options.strict` is set.
pub fn run(batches: &[ClaimBatch], patches: &[Patch], options: &MergeOptions) -> Result<MergeRun> {
    let merged = apply(batches, patches, options);
    if options.strict {
        merged.into_strict()
    } else {
        Ok(merged)
    }
}

/// Best-effort merge with default options, returning only the result.
pub fn merge_claims(batches: &[ClaimBatch], patches: &[Patch]) -> MergeResult {
    apply(batches, patches, &MergeOptions::default()).result
}

// ---------------------------------------------------------------------------
// Input loading
// ---------------------------------------------------------------------------

/// Parse a JSON array of `{ step, claims }` batches.
pub fn batches_from_json(json: &str) -> Result<Vec<ClaimBatch>> {
    serde_json::from_str(json)
        .map_err(|e| LeadgenError::parse(format!("claim batches must be a JSON array of {{step, claims}}: {e}")))
}

/// Parse a JSON array of patch objects. Individual patches never fail.
pub fn patches_from_json(json: &str) -> Result<Vec<Patch>> {
    serde_json::from_str(json)
        .map_err(|e| LeadgenError::parse(format!("patches must be a JSON array: {e}")))
}

/// Read batches and patches from disk.
pub fn load_inputs(batches_path: &Path, patches_path: &Path) -> Result<(Vec<ClaimBatch>, Vec<Patch>)> {
    let batches_json =
        std::fs::read_to_string(batches_path).map_err(|e| LeadgenError::io(batches_path, e))?;
    let patches_json =
        std::fs::read_to_string(patches_path).map_err(|e| LeadgenError::io(patches_path, e))?;

    let batches = batches_from_json(&batches_json)?;
    let patches = patches_from_json(&patches_json)?;

    info!(
        batches = batches.len(),
        claims = batches.iter().map(|b| b.claims.len()).sum::<usize>(),
        patches = patches.len(),
        "merge inputs loaded"
    );
    Ok((batches, patches))
}
