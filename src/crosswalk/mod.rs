//! Crosswalk invocation.
//!
//! A crosswalk maps one metadata section payload onto the target object's
//! field-based description. Crosswalks are looked up by section type through
//! an injected, read-only [`CrosswalkRegistry`], so concurrent ingests can
//! share one registry without coordination.
use crate::error::{CrosswalkFailure, IngestError};
use crate::manifest::{MetadataSection, SectionPayload};
use crate::target::TargetObject;
use crate::xml::{parse_fragment, XmlElement};
use anyhow::{anyhow, Result};
use base64::Engine;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

mod dim;
mod mods;

pub use dim::DimCrosswalk;
pub use mods::ModsCrosswalk;

/// Plugin name of the crosswalk that discards its input.
pub const NULL_STREAM: &str = "NULLSTREAM";

/// Resolves `mdRef` tokens against the files bundled with a package.
pub trait ExternalResolver {
    fn resolve(&self, href: &str) -> std::io::Result<Vec<u8>>;
}

/// Section payload after external references were resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedPayload {
    Xml(Vec<XmlElement>),
    Bytes(Vec<u8>),
}

impl ResolvedPayload {
    /// Payload as XML elements, parsing byte payloads on demand.
    pub fn elements(&self) -> Result<Cow<'_, [XmlElement]>, CrosswalkFailure> {
        match self {
            ResolvedPayload::Xml(elements) => Ok(Cow::Borrowed(elements.as_slice())),
            ResolvedPayload::Bytes(bytes) => Ok(Cow::Owned(parse_fragment(bytes)?)),
        }
    }
}

pub trait IngestionCrosswalk: Send + Sync {
    fn name(&self) -> &str;

    /// Append fields derived from `payload` to `target`. Never removes fields.
    fn ingest(
        &self,
        target: &mut TargetObject,
        payload: &ResolvedPayload,
    ) -> Result<(), CrosswalkFailure>;
}

/// Accepts any payload and records nothing.
pub struct NullStreamCrosswalk;

impl IngestionCrosswalk for NullStreamCrosswalk {
    fn name(&self) -> &str {
        NULL_STREAM
    }

    fn ingest(
        &self,
        _target: &mut TargetObject,
        _payload: &ResolvedPayload,
    ) -> Result<(), CrosswalkFailure> {
        Ok(())
    }
}

/// Named crosswalk plugins plus the section-type → plugin mapping.
///
/// Names and section types are matched case-insensitively.
#[derive(Clone, Default)]
pub struct CrosswalkRegistry {
    plugins: BTreeMap<String, Arc<dyn IngestionCrosswalk>>,
    mapping: BTreeMap<String, String>,
}

impl CrosswalkRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the built-in `DIM`, `MODS` and `NULLSTREAM` plugins and
    /// no explicit mapping.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(DimCrosswalk));
        registry.register(Arc::new(ModsCrosswalk));
        registry.register(Arc::new(NullStreamCrosswalk));
        registry
    }

    /// Built-in plugins plus the configured `section type → plugin` mapping.
    pub fn from_mapping(mapping: &BTreeMap<String, String>) -> Result<Self> {
        let mut registry = Self::with_builtins();
        for (section_type, plugin) in mapping {
            registry.map_section_type(section_type, plugin)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, crosswalk: Arc<dyn IngestionCrosswalk>) {
        self.plugins
            .insert(crosswalk.name().to_ascii_uppercase(), crosswalk);
    }

    pub fn map_section_type(&mut self, section_type: &str, plugin: &str) -> Result<()> {
        let plugin_key = plugin.trim().to_ascii_uppercase();
        if !self.plugins.contains_key(&plugin_key) {
            return Err(anyhow!(
                "crosswalk for section type {section_type:?} names unknown plugin {plugin:?}"
            ));
        }
        self.mapping
            .insert(section_type.trim().to_ascii_uppercase(), plugin_key);
        Ok(())
    }

    /// Mapped plugin for `section_type`, else a plugin of the same name.
    pub fn lookup(&self, section_type: &str) -> Option<&Arc<dyn IngestionCrosswalk>> {
        let key = section_type.trim().to_ascii_uppercase();
        match self.mapping.get(&key) {
            Some(plugin) => self.plugins.get(plugin),
            None => self.plugins.get(&key),
        }
    }
}

/// Stateless adapter applying one section to one target.
pub struct CrosswalkInvoker<'a> {
    registry: &'a CrosswalkRegistry,
}

impl<'a> CrosswalkInvoker<'a> {
    pub fn new(registry: &'a CrosswalkRegistry) -> Self {
        Self { registry }
    }

    pub fn apply(
        &self,
        target: &mut TargetObject,
        section: &MetadataSection,
        resolver: &dyn ExternalResolver,
    ) -> Result<(), IngestError> {
        let crosswalk = self.registry.lookup(&section.type_label).ok_or_else(|| {
            IngestError::NoCrosswalkConfigured {
                section_type: section.type_label.clone(),
            }
        })?;
        let wrap = |source: CrosswalkFailure| IngestError::CrosswalkApplication {
            crosswalk: crosswalk.name().to_string(),
            section: section.id.clone(),
            source,
        };

        let payload = resolve_payload(&section.payload, resolver).map_err(wrap)?;
        let before = target.metadata().len();
        crosswalk.ingest(target, &payload).map_err(wrap)?;
        tracing::debug!(
            section = %section.id,
            section_type = %section.type_label,
            crosswalk = crosswalk.name(),
            added = target.metadata().len() - before,
            "crosswalk applied"
        );
        Ok(())
    }
}

fn resolve_payload(
    payload: &SectionPayload,
    resolver: &dyn ExternalResolver,
) -> Result<ResolvedPayload, CrosswalkFailure> {
    match payload {
        SectionPayload::Xml(elements) => Ok(ResolvedPayload::Xml(elements.clone())),
        SectionPayload::Binary(encoded) => {
            let compact: String = encoded.split_whitespace().collect();
            let bytes = base64::engine::general_purpose::STANDARD.decode(compact)?;
            Ok(ResolvedPayload::Bytes(bytes))
        }
        SectionPayload::Reference { href, .. } => {
            let bytes = resolver
                .resolve(href)
                .map_err(|source| CrosswalkFailure::Io {
                    href: href.clone(),
                    source,
                })?;
            Ok(ResolvedPayload::Bytes(bytes))
        }
    }
}

/// Lowercased ASCII alphanumerics of `raw`, for qualifiers derived from
/// attribute values; `None` when nothing is left.
pub(crate) fn qualifier_token(raw: &str) -> Option<String> {
    let token: String = raw
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    Some(token).filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::SectionCategory;
    use crate::schema::{MetadataField, ObjectType};
    use std::collections::HashMap;

    struct MapResolver(HashMap<&'static str, &'static str>);

    impl ExternalResolver for MapResolver {
        fn resolve(&self, href: &str) -> std::io::Result<Vec<u8>> {
            self.0
                .get(href)
                .map(|text| text.as_bytes().to_vec())
                .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, href.to_string()))
        }
    }

    fn no_files() -> MapResolver {
        MapResolver(HashMap::new())
    }

    fn section(type_label: &str, payload: SectionPayload) -> MetadataSection {
        MetadataSection {
            id: "dmd_1".to_string(),
            category: SectionCategory::Descriptive,
            type_label: type_label.to_string(),
            group_id: None,
            payload,
        }
    }

    fn dim_xml(title: &str) -> SectionPayload {
        let doc = format!(
            r#"<dim:dim><dim:field mdschema="dc" element="title">{title}</dim:field></dim:dim>"#
        );
        SectionPayload::Xml(parse_fragment(doc.as_bytes()).expect("parse dim"))
    }

    #[test]
    fn unmapped_type_falls_back_to_plugin_of_same_name() {
        let registry = CrosswalkRegistry::with_builtins();
        assert_eq!(registry.lookup("dim").map(|p| p.name()), Some("DIM"));
        assert!(registry.lookup("MARC").is_none());
    }

    #[test]
    fn mapping_overrides_plugin_name_lookup() {
        let mut mapping = BTreeMap::new();
        mapping.insert("DSpaceDepositLicense".to_string(), "NULLSTREAM".to_string());
        mapping.insert("DIM".to_string(), "nullstream".to_string());
        let registry = CrosswalkRegistry::from_mapping(&mapping).expect("registry");
        assert_eq!(
            registry.lookup("dspacedepositlicense").map(|p| p.name()),
            Some(NULL_STREAM)
        );
        assert_eq!(registry.lookup("DIM").map(|p| p.name()), Some(NULL_STREAM));
    }

    #[test]
    fn mapping_to_unknown_plugin_is_rejected() {
        let mut mapping = BTreeMap::new();
        mapping.insert("DC".to_string(), "QDC".to_string());
        assert!(CrosswalkRegistry::from_mapping(&mapping).is_err());
    }

    #[test]
    fn apply_fails_without_configured_crosswalk() {
        let registry = CrosswalkRegistry::with_builtins();
        let mut target = TargetObject::new(ObjectType::Item);
        let err = CrosswalkInvoker::new(&registry)
            .apply(&mut target, &section("MARC", dim_xml("x")), &no_files())
            .expect_err("no crosswalk");
        assert!(matches!(err, IngestError::NoCrosswalkConfigured { .. }));
        assert!(target.metadata().is_empty());
    }

    #[test]
    fn apply_resolves_external_references() {
        let registry = CrosswalkRegistry::with_builtins();
        let resolver = MapResolver(HashMap::from([(
            "meta/dim.xml",
            r#"<?xml version="1.0"?><dim xmlns="x"><field mdschema="dc" element="title">From file</field></dim>"#,
        )]));
        let reference = SectionPayload::Reference {
            href: "meta/dim.xml".to_string(),
            mime_type: Some("text/xml".to_string()),
        };
        let mut target = TargetObject::new(ObjectType::Item);
        CrosswalkInvoker::new(&registry)
            .apply(&mut target, &section("DIM", reference), &resolver)
            .expect("apply");
        assert_eq!(target.values(&MetadataField::dc("title", None)), ["From file"]);
    }

    #[test]
    fn unresolvable_reference_is_a_crosswalk_error() {
        let registry = CrosswalkRegistry::with_builtins();
        let reference = SectionPayload::Reference {
            href: "missing.xml".to_string(),
            mime_type: None,
        };
        let mut target = TargetObject::new(ObjectType::Item);
        let err = CrosswalkInvoker::new(&registry)
            .apply(&mut target, &section("DIM", reference), &no_files())
            .expect_err("missing reference");
        assert!(matches!(
            err,
            IngestError::CrosswalkApplication {
                source: CrosswalkFailure::Io { .. },
                ..
            }
        ));
    }

    #[test]
    fn malformed_binary_payload_is_a_crosswalk_error() {
        let registry = CrosswalkRegistry::with_builtins();
        let mut target = TargetObject::new(ObjectType::Item);
        let err = CrosswalkInvoker::new(&registry)
            .apply(
                &mut target,
                &section("NULLSTREAM", SectionPayload::Binary("***".to_string())),
                &no_files(),
            )
            .expect_err("bad base64");
        assert!(matches!(
            err,
            IngestError::CrosswalkApplication {
                source: CrosswalkFailure::Decode(_),
                ..
            }
        ));
    }

    #[test]
    fn binary_payload_is_decoded_across_line_breaks() {
        let payload = resolve_payload(
            &SectionPayload::Binary("bGlj\nZW5zZQ==".to_string()),
            &no_files(),
        )
        .expect("decode");
        assert_eq!(payload, ResolvedPayload::Bytes(b"license".to_vec()));
    }

    #[test]
    fn qualifier_token_strips_punctuation() {
        assert_eq!(qualifier_token("Thesis Advisor"), Some("thesisadvisor".to_string()));
        assert_eq!(qualifier_token("--"), None);
    }
}
