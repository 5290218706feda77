//! Shared test infrastructure for integration tests.
#![allow(dead_code)]

use aip_ingest::crosswalk::{IngestionCrosswalk, ResolvedPayload};
use aip_ingest::error::CrosswalkFailure;
use aip_ingest::repository::{MemoryRepository, Repository};
use aip_ingest::schema::ObjectType;
use aip_ingest::target::TargetObject;
use aip_ingest::validate::AIP_PROFILE;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Handle of the seeded community.
pub const COMMUNITY_HANDLE: &str = "123/1";
/// Handle of the seeded collection.
pub const COLLECTION_HANDLE: &str = "123/2";

/// Builder for METS AIP manifests.
#[derive(Debug, Clone)]
pub struct Aip {
    object_type: String,
    profile: String,
    obj_id: Option<String>,
    parent: Option<String>,
    sections: Vec<String>,
    file_groups: Vec<String>,
    children: Vec<String>,
}

impl Aip {
    /// `object_type` is written as `TYPE="DSpace <object_type>"`.
    pub fn new(object_type: &str) -> Self {
        Self {
            object_type: object_type.to_string(),
            profile: AIP_PROFILE.to_string(),
            obj_id: None,
            parent: None,
            sections: Vec::new(),
            file_groups: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn profile(mut self, profile: &str) -> Self {
        self.profile = profile.to_string();
        self
    }

    pub fn obj_id(mut self, handle: &str) -> Self {
        self.obj_id = Some(handle.to_string());
        self
    }

    pub fn parent(mut self, handle: &str) -> Self {
        self.parent = Some(handle.to_string());
        self
    }

    pub fn section(mut self, id: &str, md_type: &str, group: Option<&str>, xml: &str) -> Self {
        let group = group
            .map(|group| format!(r#" GROUPID="{group}""#))
            .unwrap_or_default();
        self.sections.push(format!(
            r#"<mets:dmdSec ID="{id}"{group}><mets:mdWrap MDTYPE="OTHER" OTHERMDTYPE="{md_type}"><mets:xmlData>{xml}</mets:xmlData></mets:mdWrap></mets:dmdSec>"#
        ));
        self
    }

    pub fn dim_section(self, id: &str, group: Option<&str>, title: &str) -> Self {
        self.section(id, "DIM", group, &dim_title(title))
    }

    pub fn file(mut self, id: &str, bundle: &str, href: &str) -> Self {
        self.file_groups.push(format!(
            r#"<mets:fileGrp USE="{bundle}"><mets:file ID="{id}" MIMETYPE="application/octet-stream"><mets:FLocat LOCTYPE="URL" xlink:href="{href}"/></mets:file></mets:fileGrp>"#
        ));
        self
    }

    pub fn child_handle(mut self, handle: &str) -> Self {
        self.children.push(format!(
            r#"<mets:div TYPE="DSpace Object"><mets:mptr LOCTYPE="HANDLE" xlink:href="hdl:{handle}"/></mets:div>"#
        ));
        self
    }

    pub fn child_location(mut self, rel: &str) -> Self {
        self.children.push(format!(
            r#"<mets:div TYPE="DSpace Object"><mets:mptr LOCTYPE="URL" xlink:href="{rel}"/></mets:div>"#
        ));
        self
    }

    pub fn render(&self) -> String {
        let obj_id = self
            .obj_id
            .as_deref()
            .map(|handle| format!(r#" OBJID="hdl:{handle}""#))
            .unwrap_or_default();
        let file_sec = if self.file_groups.is_empty() {
            String::new()
        } else {
            format!("<mets:fileSec>{}</mets:fileSec>", self.file_groups.concat())
        };
        let parent_map = self
            .parent
            .as_deref()
            .map(|handle| {
                format!(
                    r#"<mets:structMap LABEL="Parent" TYPE="LOGICAL"><mets:div TYPE="AIP Parent Link"><mets:mptr LOCTYPE="HANDLE" xlink:href="{handle}"/></mets:div></mets:structMap>"#
                )
            })
            .unwrap_or_default();
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<mets:mets xmlns:mets="http://www.loc.gov/METS/" xmlns:xlink="http://www.w3.org/1999/xlink" PROFILE="{profile}" TYPE="DSpace {object_type}"{obj_id}>
{sections}{file_sec}<mets:structMap LABEL="DSpace Object" TYPE="LOGICAL"><mets:div TYPE="DSpace Object Contents">{children}</mets:div></mets:structMap>{parent_map}
</mets:mets>"#,
            profile = self.profile,
            object_type = self.object_type,
            sections = self.sections.concat(),
            children = self.children.concat(),
        )
    }

    /// Write an exploded package directory `dir/name` with bundled files.
    pub fn write_external(&self, dir: &Path, name: &str, files: &[(&str, &[u8])]) -> PathBuf {
        let root = dir.join(name);
        write_file(&root.join("mets.xml"), self.render().as_bytes());
        for (rel, bytes) in files {
            write_file(&root.join(rel), bytes);
        }
        root
    }

    /// Write a bare manifest `dir/file_name`.
    pub fn write_manifest(&self, dir: &Path, file_name: &str) -> PathBuf {
        let path = dir.join(file_name);
        write_file(&path, self.render().as_bytes());
        path
    }
}

pub fn dim_title(title: &str) -> String {
    format!(
        r#"<dim:dim xmlns:dim="http://www.dspace.org/xmlns/dspace/dim"><dim:field mdschema="dc" element="title">{title}</dim:field></dim:dim>"#
    )
}

pub fn write_file(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent directory");
    }
    fs::write(path, bytes).expect("write file");
}

/// Repository with community [`COMMUNITY_HANDLE`] holding collection
/// [`COLLECTION_HANDLE`].
pub fn seeded_repo() -> MemoryRepository {
    let mut repo = MemoryRepository::new("123");
    let community = repo
        .create_object(ObjectType::Community, None, None)
        .expect("community");
    repo.create_object(ObjectType::Collection, None, Some(community))
        .expect("collection");
    repo
}

/// Crosswalk that records which payloads it was handed and adds nothing.
#[derive(Clone, Default)]
pub struct CountingCrosswalk {
    calls: Arc<AtomicUsize>,
    roots: Arc<Mutex<Vec<String>>>,
}

impl CountingCrosswalk {
    pub const NAME: &'static str = "COUNTING";

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Root element names of every payload seen, in call order.
    pub fn roots(&self) -> Vec<String> {
        self.roots.lock().expect("roots lock").clone()
    }
}

impl IngestionCrosswalk for CountingCrosswalk {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn ingest(
        &self,
        _target: &mut TargetObject,
        payload: &ResolvedPayload,
    ) -> Result<(), CrosswalkFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let elements = payload.elements()?;
        let mut roots = self.roots.lock().expect("roots lock");
        roots.extend(elements.iter().map(|element| element.local_name().to_string()));
        Ok(())
    }
}
