//! DIM (the repository's native field-per-element format) crosswalk.
use super::{IngestionCrosswalk, ResolvedPayload};
use crate::error::CrosswalkFailure;
use crate::schema::{MetadataField, MetadataValue};
use crate::target::TargetObject;
use crate::xml::XmlElement;

pub struct DimCrosswalk;

impl IngestionCrosswalk for DimCrosswalk {
    fn name(&self) -> &str {
        "DIM"
    }

    fn ingest(
        &self,
        target: &mut TargetObject,
        payload: &ResolvedPayload,
    ) -> Result<(), CrosswalkFailure> {
        let elements = payload.elements()?;
        for element in elements.iter() {
            ingest_element(target, element)?;
        }
        Ok(())
    }
}

fn ingest_element(target: &mut TargetObject, element: &XmlElement) -> Result<(), CrosswalkFailure> {
    if element.is("dim") {
        for child in &element.children {
            ingest_element(target, child)?;
        }
        return Ok(());
    }
    if !element.is("field") {
        return Err(CrosswalkFailure::structure(format!(
            "unexpected element <{}> in DIM payload",
            element.name
        )));
    }
    target.add_metadata(field_value(element)?);
    Ok(())
}

fn field_value(element: &XmlElement) -> Result<MetadataValue, CrosswalkFailure> {
    let schema = element
        .attr_non_empty("mdschema")
        .ok_or_else(|| CrosswalkFailure::structure("DIM field without mdschema"))?;
    let name = element
        .attr_non_empty("element")
        .ok_or_else(|| CrosswalkFailure::structure("DIM field without element"))?;
    let field = MetadataField::new(schema, name, element.attr("qualifier"));

    let confidence = match element.attr_non_empty("confidence") {
        Some(raw) => Some(raw.parse::<i32>().map_err(|_| {
            CrosswalkFailure::structure(format!("DIM field {field} has invalid confidence {raw:?}"))
        })?),
        None => None,
    };

    let mut value = MetadataValue::new(field, element.trimmed_content())
        .with_language(element.attr("lang"));
    value.authority = element.attr_non_empty("authority").map(str::to_string);
    value.confidence = confidence;
    Ok(value)
}
