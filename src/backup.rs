use anyhow::{anyhow, Context};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::db::DB_FILE;

const MANIFEST_ENTRY: &str = "manifest.json";
const STATE_ENTRY: &str = "state/dashboard.json";
const DB_ENTRY: &str = "db/studyboard.sqlite3";
pub const BUNDLE_FORMAT_V1: &str = "studyboard-snapshot-v1";

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
    pub state_digest: String,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub bundle_format_detected: String,
    pub state: serde_json::Value,
}

fn digest_of(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Writes a snapshot bundle: a manifest carrying the format tag and the
/// SHA-256 digest of the state payload, the dashboard state itself, and the
/// session database when a workspace is open.
pub fn export_snapshot(
    state: &serde_json::Value,
    workspace: Option<&Path>,
    out_path: &Path,
) -> anyhow::Result<ExportSummary> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let state_bytes = serde_json::to_string_pretty(state)
        .context("failed to serialize dashboard state")?
        .into_bytes();
    let state_digest = digest_of(&state_bytes);

    let exported_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": exported_at,
        "stateDigest": state_digest,
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    zip.start_file(STATE_ENTRY, opts)
        .context("failed to start state entry")?;
    zip.write_all(&state_bytes)
        .context("failed to write state entry")?;

    let mut entry_count = 2;
    if let Some(workspace) = workspace {
        let db_path = workspace.join(DB_FILE);
        if db_path.is_file() {
            zip.start_file(DB_ENTRY, opts)
                .context("failed to start database entry")?;
            let mut db_file = File::open(&db_path).with_context(|| {
                format!("failed to open database {}", db_path.to_string_lossy())
            })?;
            std::io::copy(&mut db_file, &mut zip).context("failed to write database entry")?;
            entry_count += 1;
        }
    }

    zip.finish().context("failed to finalize zip bundle")?;

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        entry_count,
        state_digest,
    })
}

/// Reads a snapshot bundle back, verifying the format tag and the state
/// payload digest before handing the state to the caller.
pub fn import_snapshot(in_path: &Path) -> anyhow::Result<ImportSummary> {
    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: serde_json::Value =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }

    let mut state_text = String::new();
    archive
        .by_name(STATE_ENTRY)
        .context("bundle missing state/dashboard.json")?
        .read_to_string(&mut state_text)
        .context("failed to read state/dashboard.json")?;

    if let Some(expected) = manifest.get("stateDigest").and_then(|v| v.as_str()) {
        let actual = digest_of(state_text.as_bytes());
        if actual != expected {
            return Err(anyhow!("state digest mismatch: bundle is corrupt"));
        }
    }

    let state: serde_json::Value =
        serde_json::from_str(&state_text).context("dashboard state is invalid JSON")?;

    Ok(ImportSummary {
        bundle_format_detected: BUNDLE_FORMAT_V1.to_string(),
        state,
    })
}
