use super::*;

const ITEM_AIP: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<mets:mets xmlns:mets="http://www.loc.gov/METS/" xmlns:xlink="http://www.w3.org/1999/xlink"
    ID="DSpace_ITEM_123456789-7" OBJID="hdl:123456789/7" TYPE="DSpace ITEM"
    PROFILE="http://www.dspace.org/schema/aip/mets_aip_1_0.xsd">
  <mets:dmdSec ID="dmdSec_1" GROUPID="group_dmd_0">
    <mets:mdWrap MDTYPE="MODS">
      <mets:xmlData><mods:mods xmlns:mods="http://www.loc.gov/mods/v3"><mods:titleInfo><mods:title>A</mods:title></mods:titleInfo></mods:mods></mets:xmlData>
    </mets:mdWrap>
  </mets:dmdSec>
  <mets:dmdSec ID="dmdSec_2" GROUPID="group_dmd_0">
    <mets:mdWrap MDTYPE="OTHER" OTHERMDTYPE="DIM">
      <mets:xmlData><dim:dim xmlns:dim="http://www.dspace.org/xmlns/dspace/dim"><dim:field mdschema="dc" element="title">A</dim:field></dim:dim></mets:xmlData>
    </mets:mdWrap>
  </mets:dmdSec>
  <mets:dmdSec ID="dmdSec_file">
    <mets:mdRef LOCTYPE="URL" MDTYPE="OTHER" OTHERMDTYPE="DIM" xlink:href="file_dim.xml"/>
  </mets:dmdSec>
  <mets:amdSec ID="amd_1">
    <mets:rightsMD ID="rightsMD_1">
      <mets:mdWrap MDTYPE="OTHER" OTHERMDTYPE="DSpaceDepositLicense" MIMETYPE="text/plain">
        <mets:binData>bGljZW5zZQ==</mets:binData>
      </mets:mdWrap>
    </mets:rightsMD>
  </mets:amdSec>
  <mets:fileSec>
    <mets:fileGrp USE="ORIGINAL">
      <mets:file ID="bitstream_1" MIMETYPE="application/pdf" SIZE="4" CHECKSUM="ABCD" CHECKSUMTYPE="MD5" DMDID="dmdSec_file">
        <mets:FLocat LOCTYPE="URL" xlink:href="bitstream_1.pdf" xlink:title="paper.pdf"/>
      </mets:file>
    </mets:fileGrp>
    <mets:fileGrp USE="LICENSE">
      <mets:file ID="bitstream_2" MIMETYPE="text/plain">
        <mets:FLocat LOCTYPE="URL" xlink:href="files/license.txt"/>
      </mets:file>
    </mets:fileGrp>
  </mets:fileSec>
  <mets:structMap ID="struct_1" LABEL="DSpace Object" TYPE="LOGICAL">
    <mets:div ADMID="rightsMD_1" DMDID="dmdSec_1 dmdSec_2" TYPE="DSpace Object Contents">
      <mets:div TYPE="DSpace BITSTREAM"><mets:fptr FILEID="bitstream_1"/></mets:div>
      <mets:div TYPE="DSpace BITSTREAM"><mets:fptr FILEID="bitstream_2"/></mets:div>
    </mets:div>
  </mets:structMap>
  <mets:structMap ID="struct_2" LABEL="Parent" TYPE="LOGICAL">
    <mets:div LABEL="Parent of this DSpace Object" TYPE="AIP Parent Link">
      <mets:mptr LOCTYPE="HANDLE" xlink:href="123456789/2"/>
    </mets:div>
  </mets:structMap>
</mets:mets>"#;

fn parse(doc: &[u8]) -> Result<Manifest, IngestError> {
    ParsedManifest::parse(doc)?.into_manifest()
}

#[test]
fn parses_root_attributes_and_handle() {
    let manifest = parse(ITEM_AIP.as_bytes()).expect("parse manifest");
    assert_eq!(
        manifest.header.profile.as_deref(),
        Some("http://www.dspace.org/schema/aip/mets_aip_1_0.xsd")
    );
    assert_eq!(manifest.header.object_type.as_deref(), Some("DSpace ITEM"));
    assert_eq!(manifest.handle(), Some("123456789/7"));
    assert_eq!(manifest.parent_handle.as_deref(), Some("123456789/2"));
}

#[test]
fn resolves_other_md_type_and_group_ids() {
    let manifest = parse(ITEM_AIP.as_bytes()).expect("parse manifest");
    let dmd = manifest.object_wide_descriptive();
    let summary: Vec<_> = dmd
        .iter()
        .map(|section| (section.id.as_str(), section.type_label.as_str()))
        .collect();
    assert_eq!(summary, [("dmdSec_1", "MODS"), ("dmdSec_2", "DIM")]);
    assert!(dmd
        .iter()
        .all(|section| section.group_id.as_deref() == Some("group_dmd_0")));
}

#[test]
fn per_file_sections_are_not_object_wide_even_without_dmdid() {
    let doc = ITEM_AIP.replace(r#"DMDID="dmdSec_1 dmdSec_2" "#, "");
    let manifest = parse(doc.as_bytes()).expect("parse manifest");
    let ids: Vec<_> = manifest
        .object_wide_descriptive()
        .iter()
        .map(|section| section.id.clone())
        .collect();
    assert_eq!(ids, ["dmdSec_1", "dmdSec_2"]);
}

#[test]
fn administrative_sections_carry_category_and_binary_payload() {
    let manifest = parse(ITEM_AIP.as_bytes()).expect("parse manifest");
    let amd = manifest.object_wide_administrative();
    assert_eq!(amd.len(), 1);
    assert_eq!(amd[0].category, SectionCategory::Rights);
    assert_eq!(amd[0].type_label, "DSpaceDepositLicense");
    assert_eq!(amd[0].payload, SectionPayload::Binary("bGljZW5zZQ==".to_string()));
}

#[test]
fn parses_file_inventory_with_bundles_and_checksums() {
    let manifest = parse(ITEM_AIP.as_bytes()).expect("parse manifest");
    let files = manifest.object_files();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].bundle, "ORIGINAL");
    assert_eq!(files[0].name(), "paper.pdf");
    assert_eq!(files[0].size, Some(4));
    assert_eq!(
        files[0].checksum,
        Some(Checksum {
            algorithm: "MD5".to_string(),
            value: "abcd".to_string()
        })
    );
    assert_eq!(files[1].bundle, "LICENSE");
    assert_eq!(files[1].name(), "license.txt");
}

#[test]
fn reference_payload_keeps_href() {
    let manifest = parse(ITEM_AIP.as_bytes()).expect("parse manifest");
    let section = manifest.section("dmdSec_file").expect("file dmd");
    assert_eq!(
        section.payload,
        SectionPayload::Reference {
            href: "file_dim.xml".to_string(),
            mime_type: None
        }
    );
}

#[test]
fn collects_child_references_from_nested_divisions() {
    let doc = r#"<mets PROFILE="p" TYPE="DSpace COLLECTION" OBJID="hdl:1/2">
  <structMap LABEL="DSpace Object">
    <div DMDID="d1">
      <div TYPE="DSpace ITEM"><mptr LOCTYPE="URL" href="ITEM@1-3"/></div>
      <div TYPE="DSpace ITEM"><mptr LOCTYPE="HANDLE" href="hdl:1/4"/></div>
    </div>
  </structMap>
  <dmdSec ID="d1"><mdWrap MDTYPE="DIM"><xmlData/></mdWrap></dmdSec>
</mets>"#;
    let manifest = parse(doc.as_bytes()).expect("parse manifest");
    assert_eq!(
        manifest.division.children,
        [
            ChildRef::Location("ITEM@1-3".to_string()),
            ChildRef::Handle("1/4".to_string())
        ]
    );
}

#[test]
fn rejects_non_mets_root() {
    let err = parse(b"<package/>").expect_err("non-mets root");
    assert!(matches!(err, IngestError::MalformedPackage(_)));
}

#[test]
fn rejects_dangling_structmap_references() {
    let doc = r#"<mets PROFILE="p" TYPE="ITEM">
  <structMap><div DMDID="missing"/></structMap>
</mets>"#;
    let err = parse(doc.as_bytes()).expect_err("dangling DMDID");
    assert!(err.to_string().contains("missing"));
}

#[test]
fn rejects_section_without_payload() {
    let doc = r#"<mets PROFILE="p" TYPE="ITEM"><dmdSec ID="d1"/></mets>"#;
    let err = parse(doc.as_bytes()).expect_err("empty dmdSec");
    assert!(matches!(err, IngestError::MalformedPackage(_)));
}

#[test]
fn rejects_invalid_file_size() {
    let doc = ITEM_AIP.replace(r#"SIZE="4""#, r#"SIZE="four""#);
    let err = parse(doc.as_bytes()).expect_err("bad SIZE");
    assert!(err.to_string().contains("SIZE"));
}

#[test]
fn header_is_read_without_touching_a_broken_body() {
    let doc = r#"<mets PROFILE="p" TYPE="DSpace ITEM" OBJID="hdl:1/9">
  <dmdSec ID="d1"><mdWrap><xmlData/></mdWrap></dmdSec>
  <structMap><div DMDID="missing"/></structMap>
</mets>"#;
    let parsed = ParsedManifest::parse(doc.as_bytes()).expect("root parses");
    assert_eq!(parsed.header.profile.as_deref(), Some("p"));
    assert_eq!(parsed.header.handle(), Some("1/9"));
    assert!(parsed.into_manifest().is_err());
}
