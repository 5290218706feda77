//! MODS crosswalk: common MODS elements onto Dublin Core fields.
//!
//! Elements without a Dublin Core counterpart are skipped.
use super::{qualifier_token, IngestionCrosswalk, ResolvedPayload};
use crate::error::CrosswalkFailure;
use crate::schema::{MetadataField, MetadataValue};
use crate::target::TargetObject;
use crate::xml::XmlElement;

pub struct ModsCrosswalk;

impl IngestionCrosswalk for ModsCrosswalk {
    fn name(&self) -> &str {
        "MODS"
    }

    fn ingest(
        &self,
        target: &mut TargetObject,
        payload: &ResolvedPayload,
    ) -> Result<(), CrosswalkFailure> {
        let elements = payload.elements()?;
        for element in elements.iter() {
            if element.is("modsCollection") {
                for mods in element.children_named("mods") {
                    ingest_record(target, mods);
                }
            } else if element.is("mods") {
                ingest_record(target, element);
            } else {
                return Err(CrosswalkFailure::structure(format!(
                    "unexpected element <{}> in MODS payload",
                    element.name
                )));
            }
        }
        Ok(())
    }
}

fn ingest_record(target: &mut TargetObject, mods: &XmlElement) {
    for child in &mods.children {
        match child.local_name() {
            "titleInfo" => {
                let qualifier = child.attr_non_empty("type").map(|_| "alternative");
                for title in child.children_named("title") {
                    add(target, MetadataField::dc("title", qualifier), title);
                }
            }
            "name" => add_name(target, child),
            "originInfo" => {
                for info in &child.children {
                    let field = match info.local_name() {
                        "dateIssued" => MetadataField::dc("date", Some("issued")),
                        "dateCreated" => MetadataField::dc("date", Some("created")),
                        "publisher" => MetadataField::dc("publisher", None),
                        _ => continue,
                    };
                    add(target, field, info);
                }
            }
            "abstract" => add(target, MetadataField::dc("description", Some("abstract")), child),
            "note" => add(target, MetadataField::dc("description", None), child),
            "tableOfContents" => add(
                target,
                MetadataField::dc("description", Some("tableofcontents")),
                child,
            ),
            "subject" => {
                for term in &child.children {
                    let field = match term.local_name() {
                        "topic" => MetadataField::dc("subject", None),
                        "geographic" => MetadataField::dc("coverage", Some("spatial")),
                        "temporal" => MetadataField::dc("coverage", Some("temporal")),
                        _ => continue,
                    };
                    add(target, field, term);
                }
            }
            "identifier" => {
                let qualifier = child.attr("type").and_then(qualifier_token);
                add(
                    target,
                    MetadataField::dc("identifier", qualifier.as_deref()),
                    child,
                );
            }
            "language" => {
                for term in child.children_named("languageTerm") {
                    add(target, MetadataField::dc("language", Some("iso")), term);
                }
            }
            "genre" => add(target, MetadataField::dc("type", None), child),
            "accessCondition" => add(target, MetadataField::dc("rights", None), child),
            "physicalDescription" => {
                for detail in &child.children {
                    let field = match detail.local_name() {
                        "extent" => MetadataField::dc("format", Some("extent")),
                        "internetMediaType" => MetadataField::dc("format", Some("mimetype")),
                        _ => continue,
                    };
                    add(target, field, detail);
                }
            }
            "relatedItem" if child.attr("type") == Some("host") => {
                if let Some(info) = child.child("titleInfo") {
                    for title in info.children_named("title") {
                        add(target, MetadataField::dc("relation", Some("ispartof")), title);
                    }
                }
            }
            other => tracing::trace!(element = other, "MODS element has no mapping"),
        }
    }
}

fn add_name(target: &mut TargetObject, name: &XmlElement) {
    let mut family = None;
    let mut given = None;
    let mut plain = Vec::new();
    for part in name.children_named("namePart") {
        let text = part.trimmed_text();
        if text.is_empty() {
            continue;
        }
        match part.attr("type") {
            Some("family") => family = Some(text),
            Some("given") => given = Some(text),
            _ => plain.push(text),
        }
    }
    let display = match (family, given) {
        (Some(family), Some(given)) => format!("{family}, {given}"),
        (Some(only), None) | (None, Some(only)) => only.to_string(),
        (None, None) => plain.join(" "),
    };
    if display.is_empty() {
        return;
    }
    let role = name
        .child("role")
        .and_then(|role| role.child("roleTerm"))
        .and_then(|term| qualifier_token(term.trimmed_text()));
    let value = MetadataValue::new(MetadataField::dc("contributor", role.as_deref()), display)
        .with_language(name.attr("lang"));
    target.add_metadata(value);
}

fn add(target: &mut TargetObject, field: MetadataField, element: &XmlElement) {
    let text = element.trimmed_content();
    if text.is_empty() {
        return;
    }
    target.add_metadata(MetadataValue::new(field, text).with_language(element.attr("lang")));
}
