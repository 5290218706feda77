//! Repository collaborator consumed by the ingest pipeline.
//!
//! The pipeline reads through the lookup methods while it builds a draft and
//! calls the mutating methods only from the commit step.
use crate::error::RepositoryError;
use crate::schema::{Bitstream, MetadataField, MetadataValue, ObjectId, ObjectType, RepoObject};

mod memory;
mod store;

pub use memory::MemoryRepository;
pub use store::{
    asset_path, init_store, load_repository, save_repository, ASSETS_DIR, SNAPSHOT_FILE,
};

pub trait Repository {
    fn schema_exists(&self, schema: &str) -> bool;

    fn field_exists(&self, field: &MetadataField) -> bool;

    /// Register a field in an existing schema.
    fn create_field(&mut self, field: &MetadataField) -> Result<(), RepositoryError>;

    fn object(&self, id: ObjectId) -> Option<&RepoObject>;

    fn find_by_handle(&self, handle: &str) -> Option<&RepoObject>;

    /// Create an empty object, minting a handle when none is given.
    fn create_object(
        &mut self,
        object_type: ObjectType,
        handle: Option<&str>,
        parent: Option<ObjectId>,
    ) -> Result<ObjectId, RepositoryError>;

    /// Clear metadata and every non-license attachment, then re-parent.
    fn reset_object(&mut self, id: ObjectId, parent: Option<ObjectId>)
        -> Result<(), RepositoryError>;

    /// Fails with [`RepositoryError::UnknownField`] for unregistered fields.
    fn append_metadata(&mut self, id: ObjectId, value: MetadataValue)
        -> Result<(), RepositoryError>;

    /// Store content and return its storage location.
    fn store_bytes(&mut self, bytes: &[u8]) -> Result<String, RepositoryError>;

    fn attach_bitstream(&mut self, id: ObjectId, bitstream: Bitstream)
        -> Result<(), RepositoryError>;

    /// Nearest collection at or above `start`.
    fn owning_collection(&self, start: ObjectId) -> Option<&RepoObject> {
        let mut current = self.object(start);
        while let Some(object) = current {
            if object.object_type == ObjectType::Collection {
                return Some(object);
            }
            current = object.parent.and_then(|parent| self.object(parent));
        }
        None
    }

    /// License template of a collection: its first `dc.rights.license` value.
    fn find_deposit_license(&self, collection: ObjectId) -> Option<String> {
        self.object(collection)?
            .first_value(&MetadataField::dc("rights", Some("license")))
            .map(str::to_string)
    }
}
