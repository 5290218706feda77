//! Package sources: where a manifest and its bundled files come from.
//!
//! A manifest-only package is a single manifest file whose children live next
//! to it; an external package is an exploded directory holding `mets.xml` and
//! the files it references.
use crate::crosswalk::ExternalResolver;
use crate::error::IngestError;
use crate::manifest::{ChildRef, MANIFEST_FILE_NAME};
use crate::util::{display_path, handle_file_token, is_contained_relative};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSource {
    ManifestOnly { manifest_path: PathBuf },
    External { root: PathBuf },
}

impl PackageSource {
    /// Open `path` as a manifest-only or external package.
    ///
    /// External packages may be named by their directory or by the `mets.xml`
    /// inside it.
    pub fn open(path: &Path, manifest_only: bool) -> Result<Self, IngestError> {
        if manifest_only {
            if !path.is_file() {
                return Err(IngestError::malformed(format!(
                    "manifest-only package {} is not a file",
                    path.display()
                )));
            }
            return Ok(PackageSource::ManifestOnly {
                manifest_path: path.to_path_buf(),
            });
        }

        let root = if path.is_dir() {
            path.to_path_buf()
        } else if path.file_name().is_some_and(|name| name == MANIFEST_FILE_NAME) {
            path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf()
        } else {
            return Err(IngestError::malformed(format!(
                "package {} is neither a package directory nor its {MANIFEST_FILE_NAME}",
                path.display()
            )));
        };
        if !root.join(MANIFEST_FILE_NAME).is_file() {
            return Err(IngestError::malformed(format!(
                "package {} has no {MANIFEST_FILE_NAME}",
                root.display()
            )));
        }
        Ok(PackageSource::External { root })
    }

    pub fn is_manifest_only(&self) -> bool {
        matches!(self, PackageSource::ManifestOnly { .. })
    }

    /// Human-readable location used in reports and failures.
    pub fn location(&self) -> String {
        match self {
            PackageSource::ManifestOnly { manifest_path } => display_path(manifest_path, None),
            PackageSource::External { root } => display_path(root, None),
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        match self {
            PackageSource::ManifestOnly { manifest_path } => manifest_path.clone(),
            PackageSource::External { root } => root.join(MANIFEST_FILE_NAME),
        }
    }

    pub fn read_manifest(&self) -> Result<Vec<u8>, IngestError> {
        let path = self.manifest_path();
        fs::read(&path)
            .map_err(|err| IngestError::malformed(format!("read {}: {err}", path.display())))
    }

    /// Directory that relative references inside the manifest resolve against.
    fn base_dir(&self) -> PathBuf {
        match self {
            PackageSource::ManifestOnly { manifest_path } => manifest_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .to_path_buf(),
            PackageSource::External { root } => root.clone(),
        }
    }

    /// Read a file bundled with the package by its manifest-relative path.
    pub fn read_bundled(&self, href: &str) -> io::Result<Vec<u8>> {
        let rel = href.strip_prefix("file:").unwrap_or(href);
        if !is_contained_relative(rel) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("bundled file reference must be a relative path without '..' (got {href:?})"),
            ));
        }
        fs::read(self.base_dir().join(rel))
    }

    /// Locate the package a container manifest points at.
    pub fn child(&self, child: &ChildRef) -> Result<PackageSource, IngestError> {
        match child {
            ChildRef::Handle(handle) => self.child_by_handle(handle),
            ChildRef::Location(rel) => self.child_by_location(rel),
        }
    }

    /// Children named by handle sit next to this package as
    /// `[TYPE@]<prefix>-<suffix>` (plus `.xml` for manifest-only packages).
    fn child_by_handle(&self, handle: &str) -> Result<PackageSource, IngestError> {
        let token = handle_file_token(handle);
        let (dir, wanted) = match self {
            PackageSource::ManifestOnly { .. } => (self.base_dir(), format!("{token}.xml")),
            PackageSource::External { root } => (
                root.parent().unwrap_or_else(|| Path::new(".")).to_path_buf(),
                token,
            ),
        };
        let entries = fs::read_dir(&dir)
            .map_err(|err| IngestError::malformed(format!("read {}: {err}", dir.display())))?;
        let mut candidates: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| {
                        name == wanted
                            || name
                                .split_once('@')
                                .is_some_and(|(_, rest)| rest == wanted)
                    })
            })
            .collect();
        candidates.sort();
        let path = candidates.into_iter().next().ok_or_else(|| {
            IngestError::malformed(format!(
                "no package for child {handle} in {}",
                dir.display()
            ))
        })?;
        PackageSource::open(&path, self.is_manifest_only())
    }

    fn child_by_location(&self, rel: &str) -> Result<PackageSource, IngestError> {
        if !is_contained_relative(rel) {
            return Err(IngestError::malformed(format!(
                "child package reference must be a relative path without '..' (got {rel:?})"
            )));
        }
        PackageSource::open(&self.base_dir().join(rel), self.is_manifest_only())
    }
}

impl ExternalResolver for PackageSource {
    fn resolve(&self, href: &str) -> io::Result<Vec<u8>> {
        self.read_bundled(href)
    }
}
