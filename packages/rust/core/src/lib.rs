//! Claims-merge engine.
//!
//! Ingests claim batches into a step-qualified index, applies reconciliation
//! patches in order, and assembles the surviving claims with a summary
//! (see [`pipeline::apply`]). [`report`] persists a run to disk.

pub mod applier;
pub mod assembler;
pub mod index;
pub mod patch;
pub mod pipeline;
pub mod report;

pub use applier::{PatchApplier, PatchDiagnostic, PatchIssue, PatchStatus};
pub use assembler::{ApplicationSummary, MergeResult};
pub use index::{ClaimIndex, IngestNote, MergeRecord};
pub use patch::{ClaimRef, Patch, PatchKind};
pub use pipeline::{MergeRun, merge_claims};
pub use report::{ReportConfig, ReportOutput, validate_report, write_report};
