use crate::error::{IngestError, RepositoryError};
use crate::repository::Repository;
use crate::schema::{Bitstream, ObjectId};
use crate::target::{StagedContent, TargetObject};

/// Write the draft to the repository.
///
/// Every referenced field is checked before the first write, so an unknown
/// field leaves the repository unchanged.
pub(super) fn commit(
    target: &TargetObject,
    repo: &mut dyn Repository,
) -> Result<(ObjectId, String), IngestError> {
    if let Some(field) = target
        .referenced_fields()
        .into_iter()
        .find(|field| !repo.field_exists(field))
    {
        return Err(IngestError::UnknownMetadataField {
            field: field.clone(),
        });
    }

    let id = match target.existing {
        Some(id) => {
            repo.reset_object(id, target.parent)?;
            id
        }
        None => repo.create_object(target.object_type, target.handle.as_deref(), target.parent)?,
    };
    for value in target.metadata() {
        repo.append_metadata(id, value.clone())?;
    }
    for staged in target.bitstreams() {
        let (location, referenced) = match &staged.content {
            StagedContent::Copied(bytes) => (repo.store_bytes(bytes)?, false),
            StagedContent::Referenced(location) => (location.clone(), true),
        };
        repo.attach_bitstream(
            id,
            Bitstream {
                name: staged.name.clone(),
                bundle: staged.bundle.clone(),
                mime_type: staged.mime_type.clone(),
                size: staged.size,
                checksum: staged.checksum.clone(),
                location,
                referenced,
            },
        )?;
    }

    let handle = repo
        .object(id)
        .map(|object| object.handle.clone())
        .ok_or(RepositoryError::NoSuchObject(id.0))?;
    Ok((id, handle))
}
