//! Error taxonomy for package ingestion.
//!
//! Every pipeline component reports an [`IngestError`]; the orchestrator wraps
//! it in an [`IngestFailure`] that records where in the state machine the
//! package was rejected and which package/object it concerned.
use crate::ingest::IngestStage;
use crate::schema::MetadataField;
use crate::xml::XmlError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Failure raised by a single pipeline component.
#[derive(Debug, Error)]
pub enum IngestError {
    /// I/O or structural failure before validation could start.
    #[error("malformed package: {0}")]
    MalformedPackage(String),

    #[error("{0}")]
    ProfileMismatch(String),

    #[error("{0}")]
    UnrecognizedObjectType(String),

    #[error("could not find an acceptable object-wide descriptive metadata section ({0})")]
    MissingDescriptiveMetadata(String),

    #[error("no crosswalk configured for metadata section type {section_type:?}")]
    NoCrosswalkConfigured { section_type: String },

    #[error("crosswalk {crosswalk} failed on section {section}: {source}")]
    CrosswalkApplication {
        crosswalk: String,
        section: String,
        #[source]
        source: CrosswalkFailure,
    },

    #[error("unknown metadata field {field}")]
    UnknownMetadataField { field: MetadataField },

    #[error("license attachment failed: {0}")]
    LicenseAttachment(String),

    #[error("invalid parent: {0}")]
    InvalidParent(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Stable identifiers for [`IngestError`] variants, used in JSON reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MalformedPackage,
    ProfileMismatch,
    UnrecognizedObjectType,
    MissingDescriptiveMetadata,
    NoCrosswalkConfigured,
    CrosswalkApplicationError,
    UnknownMetadataField,
    LicenseAttachmentError,
    InvalidParent,
    Repository,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MalformedPackage => "malformed_package",
            ErrorKind::ProfileMismatch => "profile_mismatch",
            ErrorKind::UnrecognizedObjectType => "unrecognized_object_type",
            ErrorKind::MissingDescriptiveMetadata => "missing_descriptive_metadata",
            ErrorKind::NoCrosswalkConfigured => "no_crosswalk_configured",
            ErrorKind::CrosswalkApplicationError => "crosswalk_application_error",
            ErrorKind::UnknownMetadataField => "unknown_metadata_field",
            ErrorKind::LicenseAttachmentError => "license_attachment_error",
            ErrorKind::InvalidParent => "invalid_parent",
            ErrorKind::Repository => "repository",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::MalformedPackage(_) => ErrorKind::MalformedPackage,
            IngestError::ProfileMismatch(_) => ErrorKind::ProfileMismatch,
            IngestError::UnrecognizedObjectType(_) => ErrorKind::UnrecognizedObjectType,
            IngestError::MissingDescriptiveMetadata(_) => ErrorKind::MissingDescriptiveMetadata,
            IngestError::NoCrosswalkConfigured { .. } => ErrorKind::NoCrosswalkConfigured,
            IngestError::CrosswalkApplication { .. } => ErrorKind::CrosswalkApplicationError,
            IngestError::UnknownMetadataField { .. } => ErrorKind::UnknownMetadataField,
            IngestError::LicenseAttachment(_) => ErrorKind::LicenseAttachmentError,
            IngestError::InvalidParent(_) => ErrorKind::InvalidParent,
            IngestError::Repository(RepositoryError::UnknownField(_)) => {
                ErrorKind::UnknownMetadataField
            }
            IngestError::Repository(_) => ErrorKind::Repository,
        }
    }

    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        IngestError::MalformedPackage(detail.into())
    }
}

impl From<XmlError> for IngestError {
    fn from(err: XmlError) -> Self {
        IngestError::MalformedPackage(err.to_string())
    }
}

/// Why a crosswalk could not transform a metadata payload.
#[derive(Debug, Error)]
pub enum CrosswalkFailure {
    #[error("{0}")]
    Structure(String),

    #[error("payload is not well-formed XML: {0}")]
    Xml(#[from] XmlError),

    #[error("payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("cannot read referenced metadata {href}: {source}")]
    Io {
        href: String,
        #[source]
        source: std::io::Error,
    },
}

impl CrosswalkFailure {
    pub fn structure(detail: impl Into<String>) -> Self {
        CrosswalkFailure::Structure(detail.into())
    }
}

/// Failure reported by a [`crate::repository::Repository`] collaborator.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("unknown metadata field {0}")]
    UnknownField(MetadataField),

    #[error("unknown metadata schema {0:?}")]
    UnknownSchema(String),

    #[error("no object with id {0}")]
    NoSuchObject(u64),

    #[error("handle {0} is already assigned")]
    DuplicateHandle(String),

    #[error("object {handle} is a {existing}, package describes a {declared}")]
    TypeMismatch {
        handle: String,
        existing: crate::schema::ObjectType,
        declared: crate::schema::ObjectType,
    },
}

/// Terminal failure of one package ingest.
#[derive(Debug, Error)]
pub struct IngestFailure {
    pub stage: IngestStage,
    pub location: String,
    pub handle: Option<String>,
    #[source]
    pub error: IngestError,
}

impl IngestFailure {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    /// JSON-friendly summary for CLI reports.
    pub fn record(&self) -> FailureRecord {
        FailureRecord {
            stage: self.stage,
            kind: self.kind(),
            location: self.location.clone(),
            handle: self.handle.clone(),
            message: self.error.to_string(),
        }
    }
}

impl fmt::Display for IngestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ingest of {} failed at {}", self.location, self.stage)?;
        if let Some(handle) = &self.handle {
            write!(f, " (object {handle})")?;
        }
        write!(f, ": {}", self.error)
    }
}

/// Serializable view of an [`IngestFailure`].
#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    pub stage: IngestStage,
    pub kind: ErrorKind,
    pub location: String,
    pub handle: Option<String>,
    pub message: String,
}
