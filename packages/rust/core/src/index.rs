//! Claim index: one [`MergeRecord`] per ingested claim, keyed by [`QualifiedId`].
//!
//! The index owns deep copies of every claim, so applying patches never
//! touches the batches the caller passed in. Records are never removed;
//! merged-away and invalidated claims stay available for audit.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use leadgen_shared::{Claim, ClaimBatch, QualifiedId};

use crate::patch::PatchKind;

/// Merge bookkeeping wrapped around one ingested claim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeRecord {
    /// Index key. Assigned once at ingestion.
    pub qualified_id: QualifiedId,
    /// Owned copy of the claim, updated in place by metadata patches.
    pub claim: Claim,
    /// Survivor this claim was folded into (one hop, never resolved further).
    pub merged_into: Option<QualifiedId>,
    /// Sticky once set.
    pub invalidated: bool,
    /// Operations applied to this record, in order, repeats included.
    pub patches_applied: Vec<PatchKind>,
}

impl MergeRecord {
    fn new(qualified_id: QualifiedId, claim: Claim) -> Self {
        Self {
            qualified_id,
            claim,
            merged_into: None,
            invalidated: false,
            patches_applied: Vec::new(),
        }
    }

    /// Whether the record contributes to the merged output.
    pub fn survives(&self) -> bool {
        self.merged_into.is_none()
    }
}

/// Something worth knowing about the input, noticed while building the index.
/// Notes never change what gets indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IngestNote {
    /// Claim had no `claim_id`; it was indexed under the `unknown` literal.
    MissingClaimId { step: String, position: usize },
    /// A later claim reused an existing key and replaced the earlier record.
    DuplicateKey { qualified_id: String },
    /// Statement is longer than the allowed maximum (kept as given).
    StatementTooLong { qualified_id: String, chars: usize },
    /// Claim named a different `producing_step` than its batch; the batch
    /// step was stamped over it.
    ProducingStepMismatch { qualified_id: String, declared: String },
}

impl IngestNote {
    /// Whether the note means an input claim is missing from the index.
    pub fn loses_claim(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }
}

/// Mapping from qualified id to merge record, in first-ingestion order.
#[derive(Debug, Clone, Default)]
pub struct ClaimIndex {
    records: HashMap<QualifiedId, MergeRecord>,
    order: Vec<QualifiedId>,
    notes: Vec<IngestNote>,
}

impl ClaimIndex {
    /// Build the index from every claim in every batch.
    pub fn from_batches(batches: &[ClaimBatch]) -> Self {
        let mut index = Self::default();
        for batch in batches {
            for (position, claim) in batch.claims.iter().enumerate() {
                index.ingest(&batch.step, position, claim.clone());
            }
        }

        debug!(
            batches = batches.len(),
            records = index.len(),
            notes = index.notes.len(),
            "claim index built"
        );
        index
    }

    /// Index one claim produced by `step`.
    ///
    /// A key collision replaces the earlier record but keeps its position in
    /// iteration order.
    pub fn ingest(&mut self, step: &str, position: usize, mut claim: Claim) -> QualifiedId {
        if claim.claim_id.is_none() {
            self.notes.push(IngestNote::MissingClaimId {
                step: step.to_string(),
                position,
            });
        }

        let qualified_id = QualifiedId::new(step, claim.effective_claim_id());
        let display_id = qualified_id.to_string();

        if !claim.statement_within_limit() {
            self.notes.push(IngestNote::StatementTooLong {
                qualified_id: display_id.clone(),
                chars: claim.statement_chars(),
            });
        }

        if let Some(declared) = claim.producing_step.as_deref() {
            if declared != step {
                self.notes.push(IngestNote::ProducingStepMismatch {
                    qualified_id: display_id.clone(),
                    declared: declared.to_string(),
                });
            }
        }
        claim.stamp_identity(display_id.clone(), step);

        let record = MergeRecord::new(qualified_id.clone(), claim);
        if self.records.insert(qualified_id.clone(), record).is_some() {
            warn!(qualified_id = %display_id, "duplicate claim key, earlier claim overwritten");
            self.notes.push(IngestNote::DuplicateKey {
                qualified_id: display_id,
            });
        } else {
            self.order.push(qualified_id.clone());
        }

        qualified_id
    }

    /// Number of indexed records (distinct keys).
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: &QualifiedId) -> bool {
        self.records.contains_key(id)
    }

    pub fn get(&self, id: &QualifiedId) -> Option<&MergeRecord> {
        self.records.get(id)
    }

    pub fn get_mut(&mut self, id: &QualifiedId) -> Option<&mut MergeRecord> {
        self.records.get_mut(id)
    }

    /// Resolve a textual `step.claim_id` reference to an indexed key.
    ///
    /// Split points are tried left to right; the first one naming an indexed
    /// record wins.
    pub fn resolve(&self, raw: &str) -> Option<QualifiedId> {
        QualifiedId::candidates(raw).find(|candidate| self.records.contains_key(candidate))
    }

    /// Look up a record by its textual reference.
    pub fn lookup(&self, raw: &str) -> Option<&MergeRecord> {
        self.resolve(raw).and_then(|id| self.records.get(&id))
    }

    /// Records in first-ingestion order.
    pub fn records(&self) -> impl Iterator<Item = &MergeRecord> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    /// Ingestion notes, in the order they were raised.
    pub fn notes(&self) -> &[IngestNote] {
        &self.notes
    }
}
