use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde_json::{json, Map, Value};

use super::{Content, Document, NodeId};
use crate::error::{ParseError, Result};

/// Serialize the whole tree to an XML string with a leading declaration.
///
/// No indentation is added: `<p>` elements carry mixed content and any inserted
/// whitespace would become part of the text.
pub fn to_xml(doc: &Document) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_error)?;
    write_node(&mut writer, doc, doc.root())?;
    String::from_utf8(writer.into_inner()).map_err(xml_error)
}

fn write_node(writer: &mut Writer<Vec<u8>>, doc: &Document, id: NodeId) -> Result<()> {
    let node = doc.node(id);
    let mut start = BytesStart::new(node.tag.as_str());
    for (key, value) in &node.attrs {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if node.children.is_empty() {
        return writer.write_event(Event::Empty(start)).map_err(xml_error);
    }

    writer.write_event(Event::Start(start)).map_err(xml_error)?;
    for child in &node.children {
        match child {
            Content::Text(text) => writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(xml_error)?,
            Content::Element(child) => write_node(writer, doc, *child)?,
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(node.tag.as_str())))
        .map_err(xml_error)
}

fn xml_error(e: impl std::fmt::Display) -> ParseError {
    ParseError::Xml(e.to_string())
}

/// Project the tree into JSON: `{"tag", "attrs", "children"}` objects with text
/// children as bare strings.
pub fn to_json(doc: &Document) -> Value {
    node_json(doc, doc.root())
}

fn node_json(doc: &Document, id: NodeId) -> Value {
    let node = doc.node(id);
    let attrs: Map<String, Value> = node
        .attrs
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    let children: Vec<Value> = node
        .children
        .iter()
        .map(|c| match c {
            Content::Text(t) => Value::String(t.clone()),
            Content::Element(child) => node_json(doc, *child),
        })
        .collect();
    json!({ "tag": node.tag, "attrs": attrs, "children": children })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        let mut doc = Document::new("debate");
        doc.set_attr(0, "name", "A & B");
        let p = doc.append(0, "p", &[]);
        doc.push_text(p, "Monday, ");
        doc.append_text_element(p, "docDate", &[("date", "2014-01-06")], "06 January 2014");
        doc.append(0, "FRBRthis", &[]);
        doc
    }

    #[test]
    fn mixed_content_is_compact() {
        let xml = to_xml(&sample()).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains(
            "<p>Monday, <docDate date=\"2014-01-06\">06 January 2014</docDate></p>"
        ));
    }

    #[test]
    fn childless_elements_are_self_closing() {
        let xml = to_xml(&sample()).unwrap();
        assert!(xml.contains("<FRBRthis/>"));
    }

    #[test]
    fn attribute_values_are_escaped() {
        let xml = to_xml(&sample()).unwrap();
        assert!(xml.contains("name=\"A &amp; B\""));
    }

    #[test]
    fn json_projection_keeps_order() {
        let v = to_json(&sample());
        assert_eq!(v["tag"], "debate");
        assert_eq!(v["children"][0]["children"][0], "Monday, ");
        assert_eq!(v["children"][0]["children"][1]["attrs"]["date"], "2014-01-06");
        assert_eq!(v["children"][1]["tag"], "FRBRthis");
    }
}
