//! Repository object model shared by the pipeline and the repository store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bundle holding the deposit license of an item.
pub const LICENSE_BUNDLE: &str = "LICENSE";
/// Bundle holding preserved package manifests.
pub const METADATA_BUNDLE: &str = "METADATA";
/// File name of an attached deposit license.
pub const LICENSE_FILE_NAME: &str = "license.txt";

/// Repository object types, as named in a manifest `TYPE` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Bitstream,
    Bundle,
    Item,
    Collection,
    Community,
    Site,
    Group,
    EPerson,
}

/// The two families the ingester can reconstitute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectFamily {
    Container,
    Content,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Bitstream => "BITSTREAM",
            ObjectType::Bundle => "BUNDLE",
            ObjectType::Item => "ITEM",
            ObjectType::Collection => "COLLECTION",
            ObjectType::Community => "COMMUNITY",
            ObjectType::Site => "SITE",
            ObjectType::Group => "GROUP",
            ObjectType::EPerson => "EPERSON",
        }
    }

    /// Case-insensitive lookup of a bare type name (`"Item"`, `"COLLECTION"`).
    pub fn from_type_name(name: &str) -> Option<Self> {
        const ALL: [ObjectType; 8] = [
            ObjectType::Bitstream,
            ObjectType::Bundle,
            ObjectType::Item,
            ObjectType::Collection,
            ObjectType::Community,
            ObjectType::Site,
            ObjectType::Group,
            ObjectType::EPerson,
        ];
        let name = name.trim();
        ALL.into_iter()
            .find(|candidate| candidate.as_str().eq_ignore_ascii_case(name))
    }

    /// `None` for types this ingester does not reconstitute.
    pub fn family(&self) -> Option<ObjectFamily> {
        match self {
            ObjectType::Item => Some(ObjectFamily::Content),
            ObjectType::Collection | ObjectType::Community | ObjectType::Site => {
                Some(ObjectFamily::Container)
            }
            ObjectType::Bitstream | ObjectType::Bundle | ObjectType::Group | ObjectType::EPerson => {
                None
            }
        }
    }

    /// Parent types an object of this type may be attached to.
    pub fn allowed_parents(&self) -> &'static [ObjectType] {
        match self {
            ObjectType::Item => &[ObjectType::Collection],
            ObjectType::Collection => &[ObjectType::Community],
            ObjectType::Community => &[ObjectType::Community],
            _ => &[],
        }
    }

    pub fn requires_parent(&self) -> bool {
        matches!(self, ObjectType::Item | ObjectType::Collection)
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A `schema.element[.qualifier]` field name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MetadataField {
    pub schema: String,
    pub element: String,
    pub qualifier: Option<String>,
}

impl MetadataField {
    pub fn new(schema: &str, element: &str, qualifier: Option<&str>) -> Self {
        Self {
            schema: schema.trim().to_string(),
            element: element.trim().to_string(),
            qualifier: qualifier
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
        }
    }

    /// Shorthand for a Dublin Core field.
    pub fn dc(element: &str, qualifier: Option<&str>) -> Self {
        Self::new("dc", element, qualifier)
    }
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.element)?;
        if let Some(qualifier) = &self.qualifier {
            write!(f, ".{qualifier}")?;
        }
        Ok(())
    }
}

impl FromStr for MetadataField {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = value.trim().split('.').collect();
        if parts.iter().any(|part| part.is_empty()) {
            return Err(format!("invalid metadata field name {value:?}"));
        }
        match parts.as_slice() {
            [schema, element] => Ok(Self::new(schema, element, None)),
            [schema, element, qualifier] => Ok(Self::new(schema, element, Some(qualifier))),
            _ => Err(format!("invalid metadata field name {value:?}")),
        }
    }
}

impl TryFrom<String> for MetadataField {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MetadataField> for String {
    fn from(field: MetadataField) -> Self {
        field.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataValue {
    pub field: MetadataField,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<i32>,
}

impl MetadataValue {
    pub fn new(field: MetadataField, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
            language: None,
            authority: None,
            confidence: None,
        }
    }

    pub fn with_language(mut self, language: Option<&str>) -> Self {
        self.language = language
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksum {
    pub algorithm: String,
    pub value: String,
}

/// A file attached to a repository object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bitstream {
    pub name: String,
    pub bundle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<Checksum>,
    /// Storage location: an asset key for copied content, or the referenced
    /// location for manifest-only packages.
    pub location: String,
    /// True when the content was referenced in place rather than copied.
    #[serde(default)]
    pub referenced: bool,
}

impl Bitstream {
    pub fn is_license(&self) -> bool {
        self.bundle.eq_ignore_ascii_case(LICENSE_BUNDLE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoObject {
    pub id: ObjectId,
    pub object_type: ObjectType,
    pub handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ObjectId>,
    #[serde(default)]
    pub metadata: Vec<MetadataValue>,
    #[serde(default)]
    pub bitstreams: Vec<Bitstream>,
}

impl RepoObject {
    pub fn license(&self) -> Option<&Bitstream> {
        self.bitstreams.iter().find(|bitstream| bitstream.is_license())
    }

    pub fn first_value(&self, field: &MetadataField) -> Option<&str> {
        self.metadata
            .iter()
            .find(|value| &value.field == field)
            .map(|value| value.value.as_str())
    }
}
