//! Field-registry reconciliation run once per object before commit.
use crate::error::{IngestError, RepositoryError};
use crate::repository::Repository;
use crate::schema::MetadataField;
use crate::target::TargetObject;

/// Register every field `target` references that the repository lacks.
///
/// Returns the fields created, in sorted order. With `create_fields` off
/// nothing happens and the commit pre-check reports the first unknown field.
pub fn finish_object(
    target: &TargetObject,
    repo: &mut dyn Repository,
    create_fields: bool,
) -> Result<Vec<MetadataField>, IngestError> {
    if !create_fields {
        return Ok(Vec::new());
    }
    let missing: Vec<MetadataField> = target
        .referenced_fields()
        .into_iter()
        .filter(|field| !repo.field_exists(field))
        .cloned()
        .collect();
    for field in &missing {
        repo.create_field(field).map_err(|err| match err {
            RepositoryError::UnknownSchema(_) | RepositoryError::UnknownField(_) => {
                IngestError::UnknownMetadataField {
                    field: field.clone(),
                }
            }
            other => IngestError::Repository(other),
        })?;
        tracing::info!(field = %field, "created metadata field");
    }
    Ok(missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRepository;
    use crate::schema::{MetadataValue, ObjectType};

    fn target_with(fields: &[MetadataField]) -> TargetObject {
        let mut target = TargetObject::new(ObjectType::Item);
        for field in fields {
            target.add_metadata(MetadataValue::new(field.clone(), "v"));
        }
        target
    }

    #[test]
    fn creates_only_missing_fields_once() {
        let mut repo = MemoryRepository::new("123");
        let note = MetadataField::new("local", "note", None);
        let target = target_with(&[MetadataField::dc("title", None), note.clone(), note.clone()]);
        let created = finish_object(&target, &mut repo, true).expect("finish");
        assert_eq!(created, [note.clone()]);
        assert!(repo.field_exists(&note));
    }

    #[test]
    fn disabled_creation_leaves_registry_untouched() {
        let mut repo = MemoryRepository::new("123");
        let note = MetadataField::new("local", "note", None);
        let created = finish_object(&target_with(&[note.clone()]), &mut repo, false)
            .expect("finish");
        assert!(created.is_empty());
        assert!(!repo.field_exists(&note));
    }

    #[test]
    fn unknown_schema_is_an_unknown_field() {
        let mut repo = MemoryRepository::new("123");
        let field = MetadataField::new("mods", "title", None);
        let err = finish_object(&target_with(&[field.clone()]), &mut repo, true)
            .expect_err("unknown schema");
        assert!(matches!(err, IngestError::UnknownMetadataField { field: f } if f == field));
    }
}
