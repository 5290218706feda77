//! Per-call package parameters.
//!
//! Parameters mirror the packager option strings (`-o key=value`) accepted by
//! the repository's command-line packager, so the same keys work from the CLI
//! flags and from option strings.
use serde::Serialize;
use thiserror::Error;

pub const MANIFEST_ONLY: &str = "manifestOnly";
pub const CREATE_METADATA_FIELDS: &str = "createMetadataFields";
pub const DMD: &str = "dmd";
pub const RESTORE_MODE: &str = "restoreModeEnabled";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("option {0:?} is not of the form key=value")]
    NotKeyValue(String),
    #[error("unknown package option {0:?}")]
    UnknownKey(String),
    #[error("option {key} expects a boolean (got {value:?})")]
    NotBoolean { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageParameters {
    /// Content is referenced in place; nothing is copied from the package.
    pub manifest_only: bool,
    /// Missing metadata fields are created by the finalizer.
    pub create_metadata_fields: bool,
    /// Forced primary descriptive section type.
    pub dmd: Option<String>,
    /// Replace/restore an existing object instead of creating a new one.
    pub restore_mode_enabled: bool,
}

impl Default for PackageParameters {
    fn default() -> Self {
        Self {
            manifest_only: false,
            create_metadata_fields: true,
            dmd: None,
            restore_mode_enabled: false,
        }
    }
}

impl PackageParameters {
    pub fn restore() -> Self {
        Self {
            restore_mode_enabled: true,
            ..Self::default()
        }
    }

    /// Forced section type, ignoring blank values.
    pub fn forced_dmd(&self) -> Option<&str> {
        self.dmd
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Apply `key=value` option strings on top of the current values.
    pub fn apply_options<S: AsRef<str>>(&mut self, options: &[S]) -> Result<(), ParamError> {
        for option in options {
            let option = option.as_ref();
            let (key, value) = option
                .split_once('=')
                .ok_or_else(|| ParamError::NotKeyValue(option.to_string()))?;
            let key = key.trim();
            let value = value.trim();
            match key {
                MANIFEST_ONLY => self.manifest_only = parse_bool(key, value)?,
                CREATE_METADATA_FIELDS => self.create_metadata_fields = parse_bool(key, value)?,
                RESTORE_MODE => self.restore_mode_enabled = parse_bool(key, value)?,
                DMD => self.dmd = Some(value.to_string()).filter(|value| !value.is_empty()),
                _ => return Err(ParamError::UnknownKey(key.to_string())),
            }
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ParamError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ParamError::NotBoolean {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Help text for the option strings, shown by the CLI.
pub fn parameter_help() -> &'static str {
    "Package options (-o key=value):\n  \
     manifestOnly=[boolean]          Reference content in place instead of copying it (default false)\n  \
     createMetadataFields=[boolean]  Create missing metadata fields; if false, ingest fails on an unknown field (default true)\n  \
     dmd=[dmdSecType]                Type of the dmdSec used as primary metadata (defaults to DIM, then MODS)\n  \
     restoreModeEnabled=[boolean]    Restore/replace the object named by the package OBJID (default false)"
}
