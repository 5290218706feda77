//! Deposit license reconciliation for content objects.
//!
//! | restore | manifest-only | license present | action     |
//! |---------|---------------|-----------------|------------|
//! | no      | any           | any             | attach new |
//! | yes     | yes           | any             | keep       |
//! | yes     | no            | yes             | keep       |
//! | yes     | no            | no              | attach new |
//!
//! An existing license is never removed or replaced.
use crate::error::IngestError;
use crate::repository::Repository;
use crate::schema::{Checksum, LICENSE_BUNDLE, LICENSE_FILE_NAME};
use crate::target::{StagedBitstream, StagedContent, TargetObject};
use crate::util::sha256_hex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseAction {
    AttachNew,
    Keep,
}

pub fn decide(restore: bool, manifest_only: bool, has_license: bool) -> LicenseAction {
    if !restore || (!manifest_only && !has_license) {
        LicenseAction::AttachNew
    } else {
        LicenseAction::Keep
    }
}

/// Apply [`decide`] to `target`, staging a new `license.txt` when needed.
///
/// The license text comes from the owning collection, else `default_license`.
pub fn reconcile(
    target: &mut TargetObject,
    repo: &dyn Repository,
    restore: bool,
    manifest_only: bool,
    default_license: Option<&str>,
) -> Result<LicenseAction, IngestError> {
    let action = decide(restore, manifest_only, target.has_license());
    if action == LicenseAction::Keep {
        tracing::debug!(restore, manifest_only, "keeping existing license state");
        return Ok(action);
    }

    let collection = target
        .parent
        .and_then(|parent| repo.owning_collection(parent));
    let text = collection
        .and_then(|collection| repo.find_deposit_license(collection.id))
        .or_else(|| default_license.map(str::to_string))
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| {
            let owner = collection
                .map(|collection| format!("collection {}", collection.handle))
                .unwrap_or_else(|| "the object".to_string());
            IngestError::LicenseAttachment(format!(
                "no deposit license defined for {owner} and no default license configured"
            ))
        })?;

    let bytes = text.into_bytes();
    target.stage_bitstream(StagedBitstream {
        name: LICENSE_FILE_NAME.to_string(),
        bundle: LICENSE_BUNDLE.to_string(),
        mime_type: Some("text/plain".to_string()),
        size: Some(bytes.len() as u64),
        checksum: Some(Checksum {
            algorithm: "SHA-256".to_string(),
            value: sha256_hex(&bytes),
        }),
        content: StagedContent::Copied(bytes),
    });
    Ok(action)
}
