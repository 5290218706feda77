//! In-memory model of a METS package manifest.
//!
//! The manifest is parsed once per ingest call and is read-only afterwards.
//! Section payloads stay unresolved here: inline XML is kept as an element
//! tree, binary and referenced payloads are resolved by the crosswalk invoker.
use crate::error::IngestError;
use crate::schema::Checksum;
use crate::xml::{parse_document, XmlElement};
use serde::Serialize;
use std::collections::BTreeSet;

/// Manifest file name inside an external package.
pub const MANIFEST_FILE_NAME: &str = "mets.xml";

const HANDLE_PREFIX: &str = "hdl:";
const PARENT_STRUCT_MAP_LABEL: &str = "Parent";

/// Semantic category of a metadata section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionCategory {
    Descriptive,
    Technical,
    Rights,
    Source,
    Provenance,
}

impl SectionCategory {
    fn from_amd_child(local: &str) -> Option<Self> {
        match local {
            "techMD" => Some(SectionCategory::Technical),
            "rightsMD" => Some(SectionCategory::Rights),
            "sourceMD" => Some(SectionCategory::Source),
            "digiprovMD" => Some(SectionCategory::Provenance),
            _ => None,
        }
    }

    pub fn is_descriptive(&self) -> bool {
        matches!(self, SectionCategory::Descriptive)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionPayload {
    /// Children of `mdWrap/xmlData`.
    Xml(Vec<XmlElement>),
    /// Base64 text of `mdWrap/binData`.
    Binary(String),
    /// `mdRef` pointing at a file bundled with the package.
    Reference {
        href: String,
        mime_type: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataSection {
    pub id: String,
    pub category: SectionCategory,
    pub type_label: String,
    pub group_id: Option<String>,
    pub payload: SectionPayload,
}

/// Reference from a container to one of its child packages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum ChildRef {
    /// Manifest-only packages refer to children by persistent handle.
    Handle(String),
    /// External packages refer to nested package locations.
    Location(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestFile {
    pub id: String,
    pub bundle: String,
    pub group_id: Option<String>,
    pub mime_type: Option<String>,
    pub size: Option<u64>,
    pub checksum: Option<Checksum>,
    pub location: String,
    pub title: Option<String>,
    pub dmd_ids: Vec<String>,
}

impl ManifestFile {
    /// Display name of the file: the `FLocat` title, else the last path segment.
    pub fn name(&self) -> String {
        if let Some(title) = self.title.as_deref() {
            return title.to_string();
        }
        self.location
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.location)
            .to_string()
    }
}

/// The object-level division of the structural map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectDivision {
    pub dmd_ids: Vec<String>,
    pub adm_ids: Vec<String>,
    pub file_ids: Vec<String>,
    pub children: Vec<ChildRef>,
}

/// Root attributes of a manifest, readable before its body is trusted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestHeader {
    pub profile: Option<String>,
    pub object_type: Option<String>,
    pub obj_id: Option<String>,
}

impl ManifestHeader {
    /// Persistent handle of the described object (`OBJID` without `hdl:`).
    pub fn handle(&self) -> Option<&str> {
        self.obj_id.as_deref().map(strip_handle_prefix)
    }
}

/// A well-formed `<mets>` document whose body has not been read yet.
///
/// Only the root attributes are looked at, so the profile gate can reject a
/// foreign package before any structural check runs.
#[derive(Debug, Clone)]
pub struct ParsedManifest {
    pub header: ManifestHeader,
    root: XmlElement,
}

impl ParsedManifest {
    pub fn parse(bytes: &[u8]) -> Result<Self, IngestError> {
        let root = parse_document(bytes)?;
        if !root.is("mets") {
            return Err(IngestError::malformed(format!(
                "root element is <{}>, expected <mets>",
                root.name
            )));
        }
        let header = ManifestHeader {
            profile: root.attr("PROFILE").map(str::to_string),
            object_type: root.attr("TYPE").map(str::to_string),
            obj_id: root.attr_non_empty("OBJID").map(str::to_string),
        };
        Ok(Self { header, root })
    }

    /// Read sections, files and structural maps, checking that every
    /// structMap reference resolves.
    pub fn into_manifest(self) -> Result<Manifest, IngestError> {
        let ParsedManifest { header, root } = self;

        let mut sections = Vec::new();
        for child in &root.children {
            if child.is("dmdSec") {
                sections.push(parse_section(child, SectionCategory::Descriptive)?);
            } else if child.is("amdSec") {
                for md in &child.children {
                    if let Some(category) = SectionCategory::from_amd_child(md.local_name()) {
                        sections.push(parse_section(md, category)?);
                    }
                }
            }
        }

        let mut files = Vec::new();
        if let Some(file_sec) = root.child("fileSec") {
            for group in file_sec.children_named("fileGrp") {
                collect_files(group, None, &mut files)?;
            }
        }

        let mut division = ObjectDivision::default();
        let mut parent_handle = None;
        let mut seen_object_map = false;
        for struct_map in root.children_named("structMap") {
            let is_parent_map = struct_map
                .attr("LABEL")
                .is_some_and(|label| label.eq_ignore_ascii_case(PARENT_STRUCT_MAP_LABEL));
            if is_parent_map {
                parent_handle = struct_map
                    .descendants_named("mptr")
                    .into_iter()
                    .find(|mptr| is_handle_loc(mptr))
                    .and_then(|mptr| mptr.attr_non_empty("href"))
                    .map(|href| strip_handle_prefix(href).to_string());
            } else if !seen_object_map {
                seen_object_map = true;
                if let Some(div) = struct_map.child("div") {
                    division = parse_division(div);
                }
            }
        }

        let manifest = Manifest {
            header,
            sections,
            files,
            division,
            parent_handle,
        };
        manifest.check_references()?;
        Ok(manifest)
    }
}

#[derive(Debug, Clone)]
pub struct Manifest {
    pub header: ManifestHeader,
    pub sections: Vec<MetadataSection>,
    pub files: Vec<ManifestFile>,
    pub division: ObjectDivision,
    pub parent_handle: Option<String>,
}

impl Manifest {
    pub fn handle(&self) -> Option<&str> {
        self.header.handle()
    }

    pub fn section(&self, id: &str) -> Option<&MetadataSection> {
        self.sections.iter().find(|section| section.id == id)
    }

    /// Descriptive sections applying to the object as a whole, in document order.
    pub fn object_wide_descriptive(&self) -> Vec<&MetadataSection> {
        self.object_wide(&self.division.dmd_ids, true)
    }

    /// Administrative sections applying to the object as a whole, in document order.
    pub fn object_wide_administrative(&self) -> Vec<&MetadataSection> {
        self.object_wide(&self.division.adm_ids, false)
    }

    fn object_wide(&self, ids: &[String], descriptive: bool) -> Vec<&MetadataSection> {
        let per_file: BTreeSet<&str> = self
            .files
            .iter()
            .flat_map(|file| file.dmd_ids.iter().map(String::as_str))
            .collect();
        self.sections
            .iter()
            .filter(|section| section.category.is_descriptive() == descriptive)
            .filter(|section| {
                if ids.is_empty() {
                    !per_file.contains(section.id.as_str())
                } else {
                    ids.iter().any(|id| id == &section.id)
                }
            })
            .collect()
    }

    /// Files attached to the object: those the object division points at, or
    /// every file when the division lists none.
    pub fn object_files(&self) -> Vec<&ManifestFile> {
        if self.division.file_ids.is_empty() {
            return self.files.iter().collect();
        }
        self.files
            .iter()
            .filter(|file| self.division.file_ids.iter().any(|id| id == &file.id))
            .collect()
    }

    fn check_references(&self) -> Result<(), IngestError> {
        for id in self.division.dmd_ids.iter().chain(&self.division.adm_ids) {
            if self.section(id).is_none() {
                return Err(IngestError::malformed(format!(
                    "structMap references missing metadata section {id}"
                )));
            }
        }
        for id in &self.division.file_ids {
            if !self.files.iter().any(|file| &file.id == id) {
                return Err(IngestError::malformed(format!(
                    "structMap references missing file {id}"
                )));
            }
        }
        Ok(())
    }
}

fn parse_section(
    element: &XmlElement,
    category: SectionCategory,
) -> Result<MetadataSection, IngestError> {
    let id = element
        .attr_non_empty("ID")
        .ok_or_else(|| IngestError::malformed(format!("<{}> has no ID", element.name)))?
        .to_string();
    let group_id = element.attr_non_empty("GROUPID").map(str::to_string);

    let (holder, payload) = if let Some(wrap) = element.child("mdWrap") {
        let payload = if let Some(xml_data) = wrap.child("xmlData") {
            SectionPayload::Xml(xml_data.children.clone())
        } else if let Some(bin_data) = wrap.child("binData") {
            SectionPayload::Binary(bin_data.trimmed_text().to_string())
        } else {
            return Err(IngestError::malformed(format!(
                "mdWrap in section {id} has neither xmlData nor binData"
            )));
        };
        (wrap, payload)
    } else if let Some(md_ref) = element.child("mdRef") {
        let href = md_ref.attr_non_empty("href").ok_or_else(|| {
            IngestError::malformed(format!("mdRef in section {id} has no xlink:href"))
        })?;
        let payload = SectionPayload::Reference {
            href: href.to_string(),
            mime_type: md_ref.attr_non_empty("MIMETYPE").map(str::to_string),
        };
        (md_ref, payload)
    } else {
        return Err(IngestError::malformed(format!(
            "section {id} has neither mdWrap nor mdRef"
        )));
    };

    let type_label = md_type(holder)
        .ok_or_else(|| IngestError::malformed(format!("section {id} has no MDTYPE")))?;

    Ok(MetadataSection {
        id,
        category,
        type_label,
        group_id,
        payload,
    })
}

/// `MDTYPE`, or `OTHERMDTYPE` when `MDTYPE="OTHER"`.
fn md_type(holder: &XmlElement) -> Option<String> {
    let md_type = holder.attr_non_empty("MDTYPE")?;
    if md_type == "OTHER" {
        if let Some(other) = holder.attr_non_empty("OTHERMDTYPE") {
            return Some(other.to_string());
        }
    }
    Some(md_type.to_string())
}

fn collect_files(
    group: &XmlElement,
    inherited_use: Option<&str>,
    files: &mut Vec<ManifestFile>,
) -> Result<(), IngestError> {
    let bundle = group.attr_non_empty("USE").or(inherited_use);
    for child in &group.children {
        if child.is("fileGrp") {
            collect_files(child, bundle, files)?;
        } else if child.is("file") {
            files.push(parse_file(child, bundle)?);
        }
    }
    Ok(())
}

fn parse_file(element: &XmlElement, bundle: Option<&str>) -> Result<ManifestFile, IngestError> {
    let id = element
        .attr_non_empty("ID")
        .ok_or_else(|| IngestError::malformed("<file> has no ID"))?
        .to_string();
    let bundle = bundle
        .ok_or_else(|| IngestError::malformed(format!("file {id} is not in a fileGrp with USE")))?
        .to_string();
    let locat = element
        .child("FLocat")
        .ok_or_else(|| IngestError::malformed(format!("file {id} has no FLocat")))?;
    let location = locat
        .attr_non_empty("href")
        .ok_or_else(|| IngestError::malformed(format!("FLocat of file {id} has no xlink:href")))?
        .to_string();
    let size = match element.attr_non_empty("SIZE") {
        Some(raw) => Some(raw.parse::<u64>().map_err(|_| {
            IngestError::malformed(format!("file {id} has invalid SIZE {raw:?}"))
        })?),
        None => None,
    };
    let checksum = match (
        element.attr_non_empty("CHECKSUM"),
        element.attr_non_empty("CHECKSUMTYPE"),
    ) {
        (Some(value), Some(algorithm)) => Some(Checksum {
            algorithm: algorithm.to_string(),
            value: value.to_ascii_lowercase(),
        }),
        (None, None) => None,
        _ => {
            return Err(IngestError::malformed(format!(
                "file {id} needs both CHECKSUM and CHECKSUMTYPE"
            )))
        }
    };
    Ok(ManifestFile {
        id,
        bundle,
        group_id: element.attr_non_empty("GROUPID").map(str::to_string),
        mime_type: element.attr_non_empty("MIMETYPE").map(str::to_string),
        size,
        checksum,
        location,
        title: locat.attr_non_empty("title").map(str::to_string),
        dmd_ids: id_list(element.attr("DMDID")),
    })
}

fn parse_division(div: &XmlElement) -> ObjectDivision {
    let mut division = ObjectDivision {
        dmd_ids: id_list(div.attr("DMDID")),
        adm_ids: id_list(div.attr("ADMID")),
        ..ObjectDivision::default()
    };
    collect_pointers(div, &mut division);
    division
}

fn collect_pointers(div: &XmlElement, division: &mut ObjectDivision) {
    for child in &div.children {
        if child.is("fptr") {
            if let Some(file_id) = child.attr_non_empty("FILEID") {
                division.file_ids.push(file_id.to_string());
            }
        } else if child.is("mptr") {
            if let Some(href) = child.attr_non_empty("href") {
                let child_ref = if is_handle_loc(child) {
                    ChildRef::Handle(strip_handle_prefix(href).to_string())
                } else {
                    ChildRef::Location(href.to_string())
                };
                division.children.push(child_ref);
            }
        } else if child.is("div") {
            collect_pointers(child, division);
        }
    }
}

fn is_handle_loc(mptr: &XmlElement) -> bool {
    mptr.attr("LOCTYPE")
        .is_some_and(|loc| loc.eq_ignore_ascii_case("HANDLE"))
}

fn strip_handle_prefix(value: &str) -> &str {
    value.strip_prefix(HANDLE_PREFIX).unwrap_or(value)
}

fn id_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| value.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
