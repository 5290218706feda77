use super::Repository;
use crate::error::RepositoryError;
use crate::schema::{Bitstream, MetadataField, MetadataValue, ObjectId, ObjectType, RepoObject};
use crate::util::sha256_hex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

const BASE_SCHEMAS: [&str; 3] = ["dc", "dcterms", "local"];

const BASE_DC_FIELDS: &[(&str, Option<&str>)] = &[
    ("contributor", None),
    ("contributor", Some("author")),
    ("contributor", Some("advisor")),
    ("coverage", Some("spatial")),
    ("coverage", Some("temporal")),
    ("date", Some("accessioned")),
    ("date", Some("available")),
    ("date", Some("created")),
    ("date", Some("issued")),
    ("description", None),
    ("description", Some("abstract")),
    ("description", Some("provenance")),
    ("description", Some("tableofcontents")),
    ("format", Some("extent")),
    ("format", Some("mimetype")),
    ("identifier", None),
    ("identifier", Some("citation")),
    ("identifier", Some("uri")),
    ("language", Some("iso")),
    ("publisher", None),
    ("relation", Some("ispartof")),
    ("rights", None),
    ("rights", Some("license")),
    ("subject", None),
    ("title", None),
    ("title", Some("alternative")),
    ("type", None),
];

/// Repository held in memory and persisted as a JSON snapshot.
///
/// Stored content is kept in `pending_assets` until the snapshot store
/// writes it out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRepository {
    pub handle_prefix: String,
    next_id: u64,
    next_handle: u64,
    schemas: BTreeSet<String>,
    fields: BTreeSet<MetadataField>,
    objects: Vec<RepoObject>,
    #[serde(skip)]
    pending_assets: BTreeMap<String, Vec<u8>>,
}

impl MemoryRepository {
    /// Empty repository with the base schemas and Dublin Core fields registered.
    pub fn new(handle_prefix: &str) -> Self {
        Self {
            handle_prefix: handle_prefix.trim().to_string(),
            next_id: 1,
            next_handle: 1,
            schemas: BASE_SCHEMAS.iter().map(|schema| schema.to_string()).collect(),
            fields: BASE_DC_FIELDS
                .iter()
                .map(|(element, qualifier)| MetadataField::dc(element, *qualifier))
                .collect(),
            objects: Vec::new(),
            pending_assets: BTreeMap::new(),
        }
    }

    pub fn objects(&self) -> &[RepoObject] {
        &self.objects
    }

    pub fn children(&self, parent: ObjectId) -> Vec<&RepoObject> {
        self.objects
            .iter()
            .filter(|object| object.parent == Some(parent))
            .collect()
    }

    pub fn pending_asset(&self, key: &str) -> Option<&[u8]> {
        self.pending_assets.get(key).map(Vec::as_slice)
    }

    /// Hand stored content over to the snapshot store.
    pub fn take_pending_assets(&mut self) -> BTreeMap<String, Vec<u8>> {
        std::mem::take(&mut self.pending_assets)
    }

    fn object_mut(&mut self, id: ObjectId) -> Result<&mut RepoObject, RepositoryError> {
        self.objects
            .iter_mut()
            .find(|object| object.id == id)
            .ok_or(RepositoryError::NoSuchObject(id.0))
    }

    fn mint_handle(&mut self) -> String {
        loop {
            let candidate = format!("{}/{}", self.handle_prefix, self.next_handle);
            self.next_handle += 1;
            if self.find_by_handle(&candidate).is_none() {
                return candidate;
            }
        }
    }
}

impl Repository for MemoryRepository {
    fn schema_exists(&self, schema: &str) -> bool {
        self.schemas.contains(schema)
    }

    fn field_exists(&self, field: &MetadataField) -> bool {
        self.fields.contains(field)
    }

    fn create_field(&mut self, field: &MetadataField) -> Result<(), RepositoryError> {
        if !self.schema_exists(&field.schema) {
            return Err(RepositoryError::UnknownSchema(field.schema.clone()));
        }
        self.fields.insert(field.clone());
        Ok(())
    }

    fn object(&self, id: ObjectId) -> Option<&RepoObject> {
        self.objects.iter().find(|object| object.id == id)
    }

    fn find_by_handle(&self, handle: &str) -> Option<&RepoObject> {
        self.objects.iter().find(|object| object.handle == handle)
    }

    fn create_object(
        &mut self,
        object_type: ObjectType,
        handle: Option<&str>,
        parent: Option<ObjectId>,
    ) -> Result<ObjectId, RepositoryError> {
        if let Some(parent) = parent {
            if self.object(parent).is_none() {
                return Err(RepositoryError::NoSuchObject(parent.0));
            }
        }
        let handle = match handle {
            Some(handle) if self.find_by_handle(handle).is_some() => {
                return Err(RepositoryError::DuplicateHandle(handle.to_string()));
            }
            Some(handle) => handle.to_string(),
            None => self.mint_handle(),
        };
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.objects.push(RepoObject {
            id,
            object_type,
            handle,
            parent,
            metadata: Vec::new(),
            bitstreams: Vec::new(),
        });
        Ok(id)
    }

    fn reset_object(
        &mut self,
        id: ObjectId,
        parent: Option<ObjectId>,
    ) -> Result<(), RepositoryError> {
        let object = self.object_mut(id)?;
        object.metadata.clear();
        object.bitstreams.retain(Bitstream::is_license);
        object.parent = parent;
        Ok(())
    }

    fn append_metadata(
        &mut self,
        id: ObjectId,
        value: MetadataValue,
    ) -> Result<(), RepositoryError> {
        if !self.field_exists(&value.field) {
            return Err(RepositoryError::UnknownField(value.field));
        }
        self.object_mut(id)?.metadata.push(value);
        Ok(())
    }

    fn store_bytes(&mut self, bytes: &[u8]) -> Result<String, RepositoryError> {
        let key = sha256_hex(bytes);
        self.pending_assets
            .entry(key.clone())
            .or_insert_with(|| bytes.to_vec());
        Ok(key)
    }

    fn attach_bitstream(
        &mut self,
        id: ObjectId,
        bitstream: Bitstream,
    ) -> Result<(), RepositoryError> {
        self.object_mut(id)?.bitstreams.push(bitstream);
        Ok(())
    }
}
