//! Merge report writer.
//!
//! Persists a finished [`MergeRun`] as a directory of JSON files plus a
//! checksummed `manifest.json`:
//! ```text
//! <dir>/
//! ├── manifest.json
//! ├── merged_claims.json
//! ├── application_summary.json
//! ├── diagnostics.json
//! └── audit.json
//! ```

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use leadgen_shared::{
    CURRENT_SCHEMA_VERSION, LeadgenError, ReportFile, Result, RunId, RunManifest,
};

use crate::index::{IngestNote, MergeRecord};
use crate::pipeline::MergeRun;

const MANIFEST_FILE: &str = "manifest.json";

/// Settings for one report.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub run_id: RunId,
    /// Tool version string recorded in the manifest.
    pub tool_version: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            run_id: RunId::new(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// What [`write_report`] produced.
#[derive(Debug, Clone)]
pub struct ReportOutput {
    pub dir: PathBuf,
    pub manifest: RunManifest,
}

/// Contents of `audit.json`.
#[derive(Debug, Serialize)]
struct AuditLog<'a> {
    records: Vec<&'a MergeRecord>,
    ingest_notes: &'a [IngestNote],
}

/// Write the report for `run` into `dir`, creating it if needed.
///
/// Each file is written to a dot-prefixed temp file and renamed into place.
/// The manifest is written last.
#[instrument(skip_all, fields(dir = %dir.display(), run_id = %config.run_id))]
pub fn write_report(dir: &Path, run: &MergeRun, config: &ReportConfig) -> Result<ReportOutput> {
    std::fs::create_dir_all(dir).map_err(|e| LeadgenError::io(dir, e))?;

    let mut records: Vec<&MergeRecord> = run.index.records().collect();
    records.sort_by(|a, b| a.qualified_id.cmp(&b.qualified_id));
    let audit = AuditLog {
        records,
        ingest_notes: run.index.notes(),
    };

    let files = vec![
        write_json(dir, "merged_claims.json", &run.result.merged_claims)?,
        write_json(dir, "application_summary.json", &run.result.application_summary)?,
        write_json(dir, "diagnostics.json", &run.result.diagnostics)?,
        write_json(dir, "audit.json", &audit)?,
    ];

    let summary = &run.result.application_summary;
    let manifest = RunManifest {
        schema_version: CURRENT_SCHEMA_VERSION,
        id: config.run_id.clone(),
        tool_version: config.tool_version.clone(),
        created_at: Utc::now(),
        total_input_claims: summary.total_input_claims,
        patch_count: summary.patches_applied,
        final_claim_count: summary.final_claim_count,
        diagnostic_count: run.result.diagnostics.len(),
        files,
    };
    write_json(dir, MANIFEST_FILE, &manifest)?;

    info!(
        files = manifest.files.len(),
        surviving = manifest.final_claim_count,
        "merge report written"
    );

    Ok(ReportOutput {
        dir: dir.to_path_buf(),
        manifest,
    })
}

/// Verify that a report directory is well-formed and untampered.
pub fn validate_report(dir: &Path) -> Result<RunManifest> {
    let manifest_path = dir.join(MANIFEST_FILE);
    if !manifest_path.exists() {
        return Err(LeadgenError::validation("missing manifest.json"));
    }

    let content = std::fs::read_to_string(&manifest_path)
        .map_err(|e| LeadgenError::io(&manifest_path, e))?;
    let manifest: RunManifest = serde_json::from_str(&content)
        .map_err(|e| LeadgenError::validation(format!("invalid manifest.json: {e}")))?;

    if manifest.schema_version > CURRENT_SCHEMA_VERSION {
        return Err(LeadgenError::validation(format!(
            "unsupported schema version {} (max {})",
            manifest.schema_version, CURRENT_SCHEMA_VERSION
        )));
    }

    for file in &manifest.files {
        let path = dir.join(&file.filename);
        if !path.exists() {
            return Err(LeadgenError::validation(format!(
                "missing {}",
                file.filename
            )));
        }
        let bytes = std::fs::read(&path).map_err(|e| LeadgenError::io(&path, e))?;
        let actual = sha256_hex(&bytes);
        if actual != file.sha256 {
            return Err(LeadgenError::validation(format!(
                "checksum mismatch for {}",
                file.filename
            )));
        }
    }

    debug!(files = manifest.files.len(), "report validated");
    Ok(manifest)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Pretty-print `data` to `dir/filename` via temp file + rename.
fn write_json<T: Serialize + ?Sized>(dir: &Path, filename: &str, data: &T) -> Result<ReportFile> {
    let json = serde_json::to_string_pretty(data)?;

    let target = dir.join(filename);
    let temp = dir.join(format!(".{filename}.tmp"));
    std::fs::write(&temp, &json).map_err(|e| LeadgenError::io(&temp, e))?;
    std::fs::rename(&temp, &target).map_err(|e| LeadgenError::io(&target, e))?;

    debug!(file = %filename, size = json.len(), "wrote report file");

    Ok(ReportFile {
        filename: filename.to_string(),
        sha256: sha256_hex(json.as_bytes()),
        size_bytes: json.len(),
    })
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::Patch;
    use crate::pipeline;
    use leadgen_shared::{ClaimBatch, MergeOptions};
    use serde_json::json;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("leadgen-report-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn make_run() -> MergeRun {
        let batches: Vec<ClaimBatch> = serde_json::from_value(json!([
            {"step": "search", "claims": [
                {"claim_id": "c2", "statement": "Acme is hiring"},
                {"claim_id": "c1", "statement": "Acme"}
            ]},
            {"step": "research", "claims": [{"claim_id": "c1", "statement": "Acme Corp"}]}
        ]))
        .unwrap();
        let patches: Vec<Patch> = serde_json::from_value(json!([
            {"operation": "merge", "claim_ids": ["search.c1", "research.c1"], "keep_claim_id": "research.c1"},
            {"operation": "enhance", "claim_id": "search.c9"}
        ]))
        .unwrap();
        pipeline::apply(&batches, &patches, &MergeOptions::default())
    }

    fn make_config() -> ReportConfig {
        ReportConfig {
            run_id: RunId::new(),
            tool_version: "0.1.0-test".into(),
        }
    }

    #[test]
    fn report_writes_all_files_and_manifest() {
        let tmp = temp_dir();
        let out = write_report(&tmp, &make_run(), &make_config()).unwrap();

        for name in [
            "manifest.json",
            "merged_claims.json",
            "application_summary.json",
            "diagnostics.json",
            "audit.json",
        ] {
            assert!(tmp.join(name).exists(), "{name} missing");
        }

        assert_eq!(out.manifest.files.len(), 4);
        assert_eq!(out.manifest.total_input_claims, 3);
        assert_eq!(out.manifest.patch_count, 2);
        assert_eq!(out.manifest.final_claim_count, 2);
        assert_eq!(out.manifest.diagnostic_count, 1);
        assert!(out.manifest.files.iter().all(|f| f.sha256.len() == 64));

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn audit_is_sorted_and_keeps_merged_records() {
        let tmp = temp_dir();
        write_report(&tmp, &make_run(), &make_config()).unwrap();

        let audit: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(tmp.join("audit.json")).unwrap()).unwrap();
        let ids: Vec<&str> = audit["records"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["qualified_id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["research.c1", "search.c1", "search.c2"]);
        assert_eq!(audit["records"][1]["merged_into"], "research.c1");

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn validate_accepts_fresh_report() {
        let tmp = temp_dir();
        let config = make_config();
        write_report(&tmp, &make_run(), &config).unwrap();

        let manifest = validate_report(&tmp).unwrap();
        assert_eq!(manifest.id, config.run_id);
        assert_eq!(manifest.schema_version, CURRENT_SCHEMA_VERSION);

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn validate_detects_tampering() {
        let tmp = temp_dir();
        write_report(&tmp, &make_run(), &make_config()).unwrap();
        std::fs::write(tmp.join("merged_claims.json"), "[]").unwrap();

        let err = validate_report(&tmp).unwrap_err();
        assert!(err.to_string().contains("checksum mismatch for merged_claims.json"));

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn validate_missing_manifest() {
        let tmp = temp_dir();
        let err = validate_report(&tmp).unwrap_err();
        assert!(err.to_string().contains("missing manifest.json"));
        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn no_temp_files_left_behind() {
        let tmp = temp_dir();
        write_report(&tmp, &make_run(), &make_config()).unwrap();
        write_report(&tmp, &make_run(), &make_config()).unwrap();

        for entry in std::fs::read_dir(&tmp).unwrap() {
            let name = entry.unwrap().file_name().to_string_lossy().to_string();
            assert!(!name.starts_with('.'), "temp file left behind: {name}");
        }

        std::fs::remove_dir_all(&tmp).ok();
    }
}
