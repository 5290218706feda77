//! On-disk snapshot of a [`MemoryRepository`].
//!
//! Layout: `<repo>/repository.json` plus one `<repo>/assets/<sha256>` file per
//! stored content blob. Files are written to a temp file in the target
//! directory and renamed into place.
use super::MemoryRepository;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const SNAPSHOT_FILE: &str = "repository.json";
pub const ASSETS_DIR: &str = "assets";

/// Create a fresh snapshot under `repo_dir`.
pub fn init_store(repo_dir: &Path, handle_prefix: &str, force: bool) -> Result<MemoryRepository> {
    if handle_prefix.trim().is_empty() || handle_prefix.contains('/') {
        return Err(anyhow!(
            "handle prefix must be non-empty and must not contain '/' (got {handle_prefix:?})"
        ));
    }
    let snapshot = repo_dir.join(SNAPSHOT_FILE);
    if snapshot.exists() && !force {
        return Err(anyhow!(
            "repository already initialized at {} (use --force to overwrite)",
            repo_dir.display()
        ));
    }
    let mut repository = MemoryRepository::new(handle_prefix);
    save_repository(repo_dir, &mut repository)?;
    Ok(repository)
}

pub fn load_repository(repo_dir: &Path) -> Result<MemoryRepository> {
    let path = repo_dir.join(SNAPSHOT_FILE);
    let bytes = fs::read(&path).with_context(|| format!("read repository {}", path.display()))?;
    let repository: MemoryRepository =
        serde_json::from_slice(&bytes).context("parse repository snapshot JSON")?;
    Ok(repository)
}

/// Write pending assets, then the snapshot. Returns the files written.
pub fn save_repository(repo_dir: &Path, repository: &mut MemoryRepository) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(repo_dir).with_context(|| format!("create {}", repo_dir.display()))?;
    let assets_dir = repo_dir.join(ASSETS_DIR);
    fs::create_dir_all(&assets_dir).with_context(|| format!("create {}", assets_dir.display()))?;

    let mut written = Vec::new();
    for (key, bytes) in repository.take_pending_assets() {
        let path = assets_dir.join(&key);
        if path.exists() {
            continue;
        }
        write_atomic(&path, &bytes)?;
        written.push(path);
    }

    let text = serde_json::to_string_pretty(repository).context("serialize repository")?;
    let snapshot = repo_dir.join(SNAPSHOT_FILE);
    write_atomic(&snapshot, text.as_bytes())?;
    written.push(snapshot);
    Ok(written)
}

pub fn asset_path(repo_dir: &Path, key: &str) -> PathBuf {
    repo_dir.join(ASSETS_DIR).join(key)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).with_context(|| format!("create temp in {}", dir.display()))?;
    tmp.write_all(bytes)
        .with_context(|| format!("write {}", path.display()))?;
    tmp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("persist {}", path.display()))?;
    Ok(())
}
