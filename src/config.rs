use crate::error::{Result, ScoreError};
use crate::types::instrument::Instrument;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use toml::map::Map;
use toml::Value;
use tracing::{debug, info};
use walkdir::WalkDir;

pub const DEFAULT_INSTRUMENTS_DIR: &str = "instruments";
pub const LOCAL_OVERLAY_SUFFIX: &str = ".local.toml";

/// Resolves `reference` as a path to an instrument file, or else as an
/// instrument id looked up as `<dir>/<id>.toml`.
pub fn resolve_instrument_path(reference: &str, dir: &Path) -> Result<PathBuf> {
    let direct = PathBuf::from(reference);
    if direct.is_file() {
        return Ok(direct);
    }
    let by_id = dir.join(format!("{reference}.toml"));
    if by_id.is_file() {
        return Ok(by_id);
    }
    Err(ScoreError::InstrumentNotFound(format!(
        "{reference} (looked in {})",
        dir.display()
    )))
}

pub fn load_instrument(path: &Path) -> Result<Instrument> {
    let mut hasher = Sha256::new();
    let mut merged = Value::Table(Map::new());
    merge_file(&mut merged, path, &mut hasher)?;

    let overlay = overlay_path(path);
    if overlay.is_file() {
        debug!(overlay = %overlay.display(), "merging local overlay");
        merge_file(&mut merged, &overlay, &mut hasher)?;
    }

    let mut instrument: Instrument = merged.try_into().map_err(|e: toml::de::Error| {
        ScoreError::InvalidInstrument(format!("{}: {}", path.display(), e))
    })?;
    instrument.validate()?;
    instrument.source_sha256 = format!("{:x}", hasher.finalize());

    info!(
        instrument = %instrument.instrument.id,
        groups = instrument.groups.len(),
        questions = instrument.question_count(),
        "loaded instrument"
    );
    Ok(instrument)
}

/// Instrument definition files under `dir`, overlays excluded, sorted.
pub fn discover(dir: &Path) -> Vec<PathBuf> {
    let mut files = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.path().to_path_buf())
        .filter(|path| {
            let name = path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default();
            name.ends_with(".toml") && !name.ends_with(LOCAL_OVERLAY_SUFFIX)
        })
        .collect::<Vec<_>>();
    files.sort();
    files
}

fn overlay_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("instrument");
    path.with_file_name(format!("{stem}{LOCAL_OVERLAY_SUFFIX}"))
}

fn merge_file(merged: &mut Value, path: &Path, hasher: &mut Sha256) -> Result<()> {
    let content = std::fs::read_to_string(path)?;
    hasher.update(content.as_bytes());
    let value: Value = toml::from_str(&content)
        .map_err(|e| ScoreError::InvalidInstrument(format!("{}: {}", path.display(), e)))?;
    merge_toml(merged, value);
    Ok(())
}

/// Deep-merges tables; any other overlay value replaces the base value.
fn merge_toml(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Table(base_table), Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => {
            *slot = value;
        }
    }
}
