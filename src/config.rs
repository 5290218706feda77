//! Repository-owned ingest configuration.
//!
//! `<repo>/config.json` carries the section-type → crosswalk mapping, the
//! manifest preservation switch and the fallback deposit license text.
use crate::crosswalk::{CrosswalkRegistry, NULL_STREAM};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_SCHEMA_VERSION: u32 = 1;
pub const CONFIG_FILE: &str = "config.json";

const DEFAULT_LICENSE_TEXT: &str = "By depositing this work you grant the repository the \
non-exclusive right to reproduce, translate and distribute it in any medium \
for preservation and access.";

/// Administrative section types carried by AIPs that have no target fields.
const DISCARDED_SECTION_TYPES: [&str; 6] = [
    "DSpaceDepositLicense",
    "CreativeCommonsRDF",
    "CreativeCommonsText",
    "METSRights",
    "DSPACE_ROLES",
    "PREMIS",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    pub schema_version: u32,
    /// Section type label → crosswalk plugin name.
    #[serde(default)]
    pub crosswalks: BTreeMap<String, String>,
    /// Keep the raw manifest as `mets.xml` on ingested items.
    #[serde(default)]
    pub preserve_manifest: bool,
    /// License text used when the owning collection defines none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_license: Option<String>,
}

pub fn default_config() -> IngestConfig {
    let mut crosswalks = BTreeMap::new();
    crosswalks.insert("DIM".to_string(), "DIM".to_string());
    crosswalks.insert("MODS".to_string(), "MODS".to_string());
    for section_type in DISCARDED_SECTION_TYPES {
        crosswalks.insert(section_type.to_string(), NULL_STREAM.to_string());
    }
    IngestConfig {
        schema_version: CONFIG_SCHEMA_VERSION,
        crosswalks,
        preserve_manifest: false,
        default_license: Some(DEFAULT_LICENSE_TEXT.to_string()),
    }
}

/// Pretty JSON of the default config, for new repositories.
pub fn config_stub() -> Result<String> {
    serde_json::to_string_pretty(&default_config()).context("serialize config stub")
}

pub fn config_path(repo_dir: &Path) -> PathBuf {
    repo_dir.join(CONFIG_FILE)
}

pub fn load_config(repo_dir: &Path) -> Result<IngestConfig> {
    let path = config_path(repo_dir);
    let bytes = fs::read(&path).with_context(|| format!("read config {}", path.display()))?;
    let config: IngestConfig =
        serde_json::from_slice(&bytes).context("parse ingest config JSON")?;
    validate_config(&config)?;
    Ok(config)
}

/// Load `config.json` when present, else the defaults.
pub fn load_config_or_default(repo_dir: &Path) -> Result<IngestConfig> {
    if config_path(repo_dir).exists() {
        return load_config(repo_dir);
    }
    tracing::debug!(repo = %repo_dir.display(), "no config.json; using defaults");
    Ok(default_config())
}

pub fn write_config(repo_dir: &Path, config: &IngestConfig) -> Result<()> {
    fs::create_dir_all(repo_dir).with_context(|| format!("create {}", repo_dir.display()))?;
    let path = config_path(repo_dir);
    let text = serde_json::to_string_pretty(config).context("serialize ingest config")?;
    fs::write(&path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn validate_config(config: &IngestConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported ingest config schema_version {}",
            config.schema_version
        ));
    }
    for (section_type, plugin) in &config.crosswalks {
        if section_type.trim().is_empty() {
            return Err(anyhow!("crosswalks keys must be non-empty section types"));
        }
        if plugin.trim().is_empty() {
            return Err(anyhow!(
                "crosswalk for section type {section_type:?} must name a plugin"
            ));
        }
    }
    if config
        .default_license
        .as_deref()
        .is_some_and(|text| text.trim().is_empty())
    {
        return Err(anyhow!("default_license must be non-empty when set"));
    }
    Ok(())
}

/// Crosswalk registry for `config`; unknown plugin names are rejected.
pub fn build_registry(config: &IngestConfig) -> Result<CrosswalkRegistry> {
    CrosswalkRegistry::from_mapping(&config.crosswalks).context("build crosswalk registry")
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
