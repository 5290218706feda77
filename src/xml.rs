//! Minimal owned XML element tree built on `quick-xml`.
//!
//! Manifests and metadata payloads are small, so the whole document is read
//! into a tree and walked by local name. Namespace prefixes are kept on the
//! qualified name but lookups ignore them.
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct XmlError(String);

impl XmlError {
    fn new(detail: impl Into<String>) -> Self {
        XmlError(detail.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    /// Qualified name as written, e.g. `dim:field`.
    pub name: String,
    pub attributes: Vec<(String, String)>,
    /// Character data directly inside this element, whitespace kept.
    pub text: String,
    pub children: Vec<XmlElement>,
    /// Length of `text` when each child was opened.
    child_offsets: Vec<usize>,
}

impl XmlElement {
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    pub fn is(&self, local: &str) -> bool {
        self.local_name().eq_ignore_ascii_case(local)
    }

    /// Attribute value by local name (`xlink:href` matches `href`).
    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| local_part(key) == local)
            .map(|(_, value)| value.as_str())
    }

    /// Attribute value, treating empty strings as absent.
    pub fn attr_non_empty(&self, local: &str) -> Option<&str> {
        self.attr(local)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.children.iter().find(|child| child.is(local))
    }

    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |child| child.is(local))
    }

    /// Depth-first search over descendants (self excluded).
    pub fn descendants_named<'a>(&'a self, local: &str) -> Vec<&'a XmlElement> {
        let mut found = Vec::new();
        for child in &self.children {
            if child.is(local) {
                found.push(child);
            }
            found.extend(child.descendants_named(local));
        }
        found
    }

    pub fn trimmed_text(&self) -> &str {
        self.text.trim()
    }

    /// All character data below this element in document order, so
    /// `a <i>b</i> c` reads as `a b c`. Surrounding whitespace is trimmed.
    pub fn trimmed_content(&self) -> String {
        let mut content = String::new();
        self.collect_content(&mut content);
        content.trim().to_string()
    }

    fn collect_content(&self, out: &mut String) {
        let mut from = 0;
        for (child, &offset) in self.children.iter().zip(&self.child_offsets) {
            out.push_str(&self.text[from..offset]);
            child.collect_content(out);
            from = offset;
        }
        out.push_str(&self.text[from..]);
    }
}

fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map(|(_, local)| local).unwrap_or(name)
}

/// Parse a complete document and return its root element.
pub fn parse_document(bytes: &[u8]) -> Result<XmlElement, XmlError> {
    let mut roots = parse_fragment(bytes)?;
    match roots.len() {
        0 => Err(XmlError::new("document has no root element")),
        1 => Ok(roots.remove(0)),
        n => Err(XmlError::new(format!(
            "document has {n} root elements, expected one"
        ))),
    }
}

/// Parse a sequence of sibling elements (a payload fragment).
pub fn parse_fragment(bytes: &[u8]) -> Result<Vec<XmlElement>, XmlError> {
    let mut reader = Reader::from_reader(bytes);

    let mut roots = Vec::new();
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut buf = Vec::new();
    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|err| XmlError::new(err.to_string()))?;
        match event {
            Event::Start(start) => stack.push(element_from_start(&start)?),
            Event::Empty(start) => {
                let element = element_from_start(&start)?;
                attach(&mut stack, &mut roots, element);
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| XmlError::new("unbalanced closing tag"))?;
                attach(&mut stack, &mut roots, element);
            }
            Event::Text(text) => {
                let value = text
                    .unescape()
                    .map_err(|err| XmlError::new(err.to_string()))?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&value);
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    if let Some(open) = stack.last() {
        return Err(XmlError::new(format!(
            "unexpected end of document inside <{}>",
            open.name
        )));
    }
    Ok(roots)
}

fn element_from_start(start: &BytesStart<'_>) -> Result<XmlElement, XmlError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|err| XmlError::new(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| XmlError::new(err.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(XmlElement {
        name,
        attributes,
        text: String::new(),
        children: Vec::new(),
        child_offsets: Vec::new(),
    })
}

fn attach(stack: &mut [XmlElement], roots: &mut Vec<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => {
            parent.child_offsets.push(parent.text.len());
            parent.children.push(element);
        }
        None => roots.push(element),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_with_prefixed_attributes() {
        let doc = br#"<?xml version="1.0"?>
<mets:mets xmlns:mets="http://www.loc.gov/METS/" PROFILE="p">
  <mets:mdRef xlink:href="a&amp;b.xml" LOCTYPE="URL"/>
  <mets:note>  hello &lt;world&gt; </mets:note>
</mets:mets>"#;
        let root = parse_document(doc).expect("parse");
        assert_eq!(root.local_name(), "mets");
        assert_eq!(root.attr("PROFILE"), Some("p"));
        let md_ref = root.child("mdRef").expect("mdRef");
        assert_eq!(md_ref.attr("href"), Some("a&b.xml"));
        assert_eq!(root.child("note").expect("note").trimmed_text(), "hello <world>");
    }

    #[test]
    fn fragment_keeps_sibling_order() {
        let roots = parse_fragment(b"<a>1</a><b/><c>3</c>").expect("parse fragment");
        let names: Vec<_> = roots.iter().map(XmlElement::local_name).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn mixed_content_keeps_spacing_around_inline_elements() {
        let root = parse_document(b"<title>  Notes on <i>Rust</i> and <b>XML</b>  </title>")
            .expect("parse");
        assert_eq!(root.trimmed_content(), "Notes on Rust and XML");
        assert_eq!(root.children.len(), 2);
    }

    #[test]
    fn rejects_unclosed_document() {
        assert!(parse_document(b"<a><b></b>").is_err());
    }

    #[test]
    fn rejects_mismatched_tags() {
        assert!(parse_document(b"<a><b></a>").is_err());
    }
}
