//! Reproducibility bundles: input copy, result, metadata and a sha256 manifest.

use anyhow::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Serialize)]
pub struct BundleMeta {
    pub tool: String,
    pub tool_version: String,
    pub created_unix_ms: u128,
    pub command: String,
    pub args: serde_json::Value,
    pub input: BundleInputMeta,
}

#[derive(Debug, Clone, Serialize)]
pub struct BundleInputMeta {
    pub original_path: String,
    pub bundled_path: String,
    pub input_sha256: String,
}

#[derive(Debug, Clone, Serialize)]
struct Manifest {
    bundle_version: u32,
    files: Vec<ManifestFile>,
}

#[derive(Debug, Clone, Serialize)]
struct ManifestFile {
    path: String,
    bytes: u64,
    sha256: String,
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    let out = h.finalize();
    let mut s = String::with_capacity(64);
    for b in out {
        s.push_str(&format!("{:02x}", b));
    }
    s
}

fn manifest_file(bundle_dir: &Path, rel: &str) -> Result<ManifestFile> {
    let bytes = std::fs::read(bundle_dir.join(rel))?;
    Ok(ManifestFile { path: rel.to_string(), bytes: bytes.len() as u64, sha256: sha256_hex(&bytes) })
}

pub fn ensure_empty_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        if !dir.is_dir() {
            anyhow::bail!("bundle path exists but is not a directory: {}", dir.display());
        }
        // Require an empty (or missing) dir so a bundle never mixes two runs.
        if dir.read_dir()?.next().is_some() {
            anyhow::bail!("bundle directory must be empty: {}", dir.display());
        }
    } else {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Write a bundle for one analysis.
///
/// `outputs` are `(file name, value)` pairs written under `outputs/`; the
/// first one is conventionally `result.json`.
pub fn write_bundle(
    bundle_dir: &Path,
    command: &str,
    args: serde_json::Value,
    input_path: &Path,
    outputs: &[(&str, serde_json::Value)],
) -> Result<()> {
    ensure_empty_dir(bundle_dir)?;

    let inputs_dir = bundle_dir.join("inputs");
    let outputs_dir = bundle_dir.join("outputs");
    std::fs::create_dir_all(&inputs_dir)?;
    std::fs::create_dir_all(&outputs_dir)?;

    let input_bytes = std::fs::read(input_path)?;
    let ext = input_path.extension().and_then(|e| e.to_str()).unwrap_or("dat");
    let input_rel = format!("inputs/input.{}", ext.to_ascii_lowercase());
    std::fs::write(bundle_dir.join(&input_rel), &input_bytes)?;

    let created_unix_ms = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis();
    let meta = BundleMeta {
        tool: "didstat".to_string(),
        tool_version: ds_core::VERSION.to_string(),
        created_unix_ms,
        command: command.to_string(),
        args,
        input: BundleInputMeta {
            original_path: input_path.display().to_string(),
            bundled_path: input_rel.clone(),
            input_sha256: sha256_hex(&input_bytes),
        },
    };
    std::fs::write(bundle_dir.join("meta.json"), serde_json::to_string_pretty(&meta)?)?;

    let mut rels = vec!["meta.json".to_string(), input_rel];
    for (name, value) in outputs {
        std::fs::write(outputs_dir.join(name), serde_json::to_string_pretty(value)?)?;
        rels.push(format!("outputs/{}", name));
    }

    let files = rels.iter().map(|rel| manifest_file(bundle_dir, rel)).collect::<Result<Vec<_>>>()?;
    let manifest = Manifest { bundle_version: 1, files };
    std::fs::write(bundle_dir.join("manifest.json"), serde_json::to_string_pretty(&manifest)?)?;

    Ok(())
}
