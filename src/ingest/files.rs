use crate::error::IngestError;
use crate::manifest::{Manifest, ManifestFile, MANIFEST_FILE_NAME};
use crate::package::PackageSource;
use crate::schema::{Checksum, METADATA_BUNDLE};
use crate::target::{StagedBitstream, StagedContent, TargetObject};
use crate::util::sha256_hex;

/// Stage the object's `fileSec` files onto `target`.
///
/// Package `LICENSE` files are only carried over by a restore that keeps no
/// license of its own.
pub(super) fn stage_files(
    target: &mut TargetObject,
    manifest: &Manifest,
    source: &PackageSource,
    restore: bool,
) -> Result<(), IngestError> {
    for file in manifest.object_files() {
        let bundle_is_license = file
            .bundle
            .eq_ignore_ascii_case(crate::schema::LICENSE_BUNDLE);
        if bundle_is_license && (!restore || target.existing_license.is_some()) {
            tracing::debug!(file = %file.id, "skipping package license file");
            continue;
        }

        let (content, size) = if source.is_manifest_only() {
            (StagedContent::Referenced(file.location.clone()), file.size)
        } else {
            let bytes = source.read_bundled(&file.location).map_err(|err| {
                IngestError::malformed(format!(
                    "read file {} ({}): {err}",
                    file.id, file.location
                ))
            })?;
            verify(file, &bytes)?;
            let size = Some(bytes.len() as u64);
            (StagedContent::Copied(bytes), size)
        };
        target.stage_bitstream(StagedBitstream {
            name: file.name(),
            bundle: file.bundle.clone(),
            mime_type: file.mime_type.clone(),
            size,
            checksum: file.checksum.clone(),
            content,
        });
    }
    Ok(())
}

/// Keep the raw manifest as `mets.xml` in the `METADATA` bundle.
pub(super) fn preserve_manifest(target: &mut TargetObject, manifest_bytes: &[u8]) {
    target.stage_bitstream(StagedBitstream {
        name: MANIFEST_FILE_NAME.to_string(),
        bundle: METADATA_BUNDLE.to_string(),
        mime_type: Some("text/xml".to_string()),
        size: Some(manifest_bytes.len() as u64),
        checksum: Some(Checksum {
            algorithm: "SHA-256".to_string(),
            value: sha256_hex(manifest_bytes),
        }),
        content: StagedContent::Copied(manifest_bytes.to_vec()),
    });
}

fn verify(file: &ManifestFile, bytes: &[u8]) -> Result<(), IngestError> {
    if let Some(expected) = file.size {
        if expected != bytes.len() as u64 {
            return Err(IngestError::malformed(format!(
                "file {} is {} bytes, manifest says {expected}",
                file.id,
                bytes.len()
            )));
        }
    }
    let Some(checksum) = &file.checksum else {
        return Ok(());
    };
    if !is_sha256(&checksum.algorithm) {
        tracing::debug!(
            file = %file.id,
            algorithm = %checksum.algorithm,
            "checksum recorded, not verified"
        );
        return Ok(());
    }
    let actual = sha256_hex(bytes);
    if actual != checksum.value {
        return Err(IngestError::malformed(format!(
            "checksum mismatch for file {}: manifest {}, content {actual}",
            file.id, checksum.value
        )));
    }
    Ok(())
}

fn is_sha256(algorithm: &str) -> bool {
    algorithm.replace('-', "").eq_ignore_ascii_case("sha256")
}
