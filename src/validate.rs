//! Package validation: the gate every manifest passes before any mutation.
//!
//! ## Checks
//! - **Profile**: `mets@PROFILE` must be exactly [`AIP_PROFILE`].
//! - **Object type**: `mets@TYPE` must name a known object type, optionally
//!   prefixed with `"DSpace "`.
//!
//! ```text
//! <mets PROFILE="http://www.dspace.org/schema/aip/mets_aip_1_0.xsd" TYPE="DSpace ITEM">
//! -> profile ok, type Item
//! <mets PROFILE="http://www.dspace.org/schema/sip/mets_sip_1_0.xsd" TYPE="DSpace ITEM">
//! -> ProfileMismatch
//! ```
use crate::error::IngestError;
use crate::manifest::ManifestHeader;
use crate::schema::{ObjectFamily, ObjectType};
use regex::Regex;

/// METS profile written by the complementary AIP disseminator.
pub const AIP_PROFILE: &str = "http://www.dspace.org/schema/aip/mets_aip_1_0.xsd";

const TYPE_PREFIX: &str = "DSpace ";

/// `<prefix>/<suffix>`, neither part empty nor containing whitespace.
const HANDLE_PATTERN: &str = r"^[^/\s]+/[^/\s]+$";

pub fn check_profile(header: &ManifestHeader) -> Result<(), IngestError> {
    match header.profile.as_deref() {
        None => Err(IngestError::ProfileMismatch(
            "cannot accept METS with no PROFILE attribute".to_string(),
        )),
        Some(profile) if profile != AIP_PROFILE => Err(IngestError::ProfileMismatch(format!(
            "METS has unacceptable PROFILE attribute, profile={profile}"
        ))),
        Some(_) => Ok(()),
    }
}

/// Resolve `mets@TYPE` to an object type.
pub fn resolve_object_type(header: &ManifestHeader) -> Result<ObjectType, IngestError> {
    let raw = header
        .object_type
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            IngestError::UnrecognizedObjectType(
                "manifest is missing the required mets@TYPE attribute".to_string(),
            )
        })?;
    let bare = raw.strip_prefix(TYPE_PREFIX).unwrap_or(raw);
    ObjectType::from_type_name(bare).ok_or_else(|| {
        IngestError::UnrecognizedObjectType(format!(
            "manifest has unrecognized value in mets@TYPE attribute: {bare}"
        ))
    })
}

/// Resolve the object type and require an ingestible family.
pub fn resolve_family(header: &ManifestHeader) -> Result<(ObjectType, ObjectFamily), IngestError> {
    let object_type = resolve_object_type(header)?;
    let family = object_type.family().ok_or_else(|| {
        IngestError::UnrecognizedObjectType(format!(
            "object type {object_type} cannot be ingested from an AIP"
        ))
    })?;
    Ok((object_type, family))
}

/// Reject identifiers that are not `<prefix>/<suffix>` handles.
pub fn check_handle(handle: &str) -> Result<(), IngestError> {
    let pattern = Regex::new(HANDLE_PATTERN)
        .map_err(|err| IngestError::malformed(format!("compile handle pattern: {err}")))?;
    if pattern.is_match(handle) {
        Ok(())
    } else {
        Err(IngestError::malformed(format!(
            "OBJID {handle:?} is not a <prefix>/<suffix> handle"
        )))
    }
}
