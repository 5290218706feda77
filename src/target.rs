//! Working copy of the object being reconstituted.
//!
//! Crosswalks, file staging and license reconciliation all write here; the
//! repository is touched only when the orchestrator commits the draft.
use crate::schema::{
    Bitstream, Checksum, MetadataField, MetadataValue, ObjectId, ObjectType,
};
use std::collections::BTreeSet;

/// Content of a staged attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagedContent {
    /// Bytes copied out of the package, stored at commit.
    Copied(Vec<u8>),
    /// An existing storage location, referenced in place.
    Referenced(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedBitstream {
    pub name: String,
    pub bundle: String,
    pub mime_type: Option<String>,
    pub size: Option<u64>,
    pub checksum: Option<Checksum>,
    pub content: StagedContent,
}

impl StagedBitstream {
    pub fn is_license(&self) -> bool {
        self.bundle
            .eq_ignore_ascii_case(crate::schema::LICENSE_BUNDLE)
    }
}

#[derive(Debug, Clone)]
pub struct TargetObject {
    pub object_type: ObjectType,
    /// Handle to restore under; `None` mints a new one at commit.
    pub handle: Option<String>,
    /// Object replaced in place on restore.
    pub existing: Option<ObjectId>,
    pub parent: Option<ObjectId>,
    /// License kept from the object being restored.
    pub existing_license: Option<Bitstream>,
    metadata: Vec<MetadataValue>,
    bitstreams: Vec<StagedBitstream>,
}

impl TargetObject {
    pub fn new(object_type: ObjectType) -> Self {
        Self {
            object_type,
            handle: None,
            existing: None,
            parent: None,
            existing_license: None,
            metadata: Vec::new(),
            bitstreams: Vec::new(),
        }
    }

    /// Append a described value. Crosswalks only ever add.
    pub fn add_metadata(&mut self, value: MetadataValue) {
        self.metadata.push(value);
    }

    pub fn metadata(&self) -> &[MetadataValue] {
        &self.metadata
    }

    pub fn values(&self, field: &MetadataField) -> Vec<&str> {
        self.metadata
            .iter()
            .filter(|value| &value.field == field)
            .map(|value| value.value.as_str())
            .collect()
    }

    /// Distinct fields referenced by the staged metadata, sorted.
    pub fn referenced_fields(&self) -> BTreeSet<&MetadataField> {
        self.metadata.iter().map(|value| &value.field).collect()
    }

    pub fn stage_bitstream(&mut self, bitstream: StagedBitstream) {
        self.bitstreams.push(bitstream);
    }

    pub fn bitstreams(&self) -> &[StagedBitstream] {
        &self.bitstreams
    }

    /// True when the object will carry a license after commit without any
    /// further attachment.
    pub fn has_license(&self) -> bool {
        self.existing_license.is_some() || self.bitstreams.iter().any(StagedBitstream::is_license)
    }
}
