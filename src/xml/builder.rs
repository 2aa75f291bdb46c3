//! Stack-based XML tree builder used by every ISO 20022 generator.
//!
//! The builder keeps a cursor into the tree under construction.
//! [`XmlBuilder::add_element`] opens a child and moves the cursor into it,
//! [`XmlBuilder::end`] moves it back to the parent. Helper functions that
//! emit shared blocks open and close their own elements, so callers only
//! have to balance their own calls.

use crate::error::{Error, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

#[derive(Debug)]
struct Node {
    name: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<usize>,
}

impl Node {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }
}

/// Mutable cursor over an XML tree under construction.
#[derive(Debug)]
pub struct XmlBuilder {
    nodes: Vec<Node>,
    open: Vec<usize>,
    last: usize,
    underflow: bool,
}

impl XmlBuilder {
    /// Start a `Document` root in the given ISO 20022 namespace.
    pub fn new(namespace: &str) -> Self {
        let mut root = Node::new("Document");
        root.attributes.push(("xmlns".to_string(), namespace.to_string()));
        root.attributes.push(("xmlns:xsi".to_string(), XSI_NAMESPACE.to_string()));
        Self {
            nodes: vec![root],
            open: vec![0],
            last: 0,
            underflow: false,
        }
    }

    fn append(&mut self, node: Node) -> usize {
        let index = self.nodes.len();
        self.nodes.push(node);
        let parent = *self.open.last().unwrap_or(&0);
        self.nodes[parent].children.push(index);
        self.last = index;
        index
    }

    /// Create a child under the cursor and move the cursor into it.
    pub fn add_element(&mut self, name: &str) -> &mut Self {
        let index = self.append(Node::new(name));
        self.open.push(index);
        self
    }

    /// Create a closed leaf child carrying text; the cursor stays put.
    pub fn add_child(&mut self, name: &str, text: &str) -> &mut Self {
        let mut node = Node::new(name);
        node.text = Some(text.to_string());
        self.append(node);
        self
    }

    /// Add a leaf child only when a value is present.
    pub fn add_optional_child(&mut self, name: &str, text: Option<&str>) -> &mut Self {
        if let Some(text) = text {
            self.add_child(name, text);
        }
        self
    }

    /// Attach an attribute to the most recently added element.
    pub fn with_attribute(&mut self, name: &str, value: &str) -> &mut Self {
        self.nodes[self.last]
            .attributes
            .push((name.to_string(), value.to_string()));
        self
    }

    /// Move the cursor back to the parent of the current element.
    pub fn end(&mut self) -> &mut Self {
        if self.open.len() > 1 {
            self.open.pop();
        } else {
            self.underflow = true;
        }
        self
    }

    /// Number of elements currently open below the root.
    pub fn depth(&self) -> usize {
        self.open.len() - 1
    }

    /// Serialize the finished tree with an UTF-8 XML declaration.
    ///
    /// Fails when `add_element`/`end` calls were not balanced.
    pub fn get_xml(&self) -> Result<String> {
        if self.underflow {
            return Err(Error::XmlError("end() called without an open element".to_string()));
        }
        if self.open.len() != 1 {
            let name = &self.nodes[*self.open.last().unwrap_or(&0)].name;
            return Err(Error::XmlError(format!(
                "{} element(s) still open, innermost <{}>",
                self.depth(),
                name
            )));
        }

        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        self.write_node(&mut writer, 0)?;

        let mut xml = String::from_utf8(writer.into_inner())
            .map_err(|e| Error::XmlError(e.to_string()))?;
        xml.push('\n');
        Ok(xml)
    }

    fn write_node(&self, writer: &mut Writer<Vec<u8>>, index: usize) -> Result<()> {
        let node = &self.nodes[index];
        let mut start = BytesStart::new(node.name.as_str());
        for (key, value) in &node.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if node.children.is_empty() && node.text.is_none() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        if let Some(ref text) = node.text {
            writer.write_event(Event::Text(BytesText::new(text)))?;
        }
        for &child in &node.children {
            self.write_node(writer, child)?;
        }
        writer.write_event(Event::End(BytesEnd::new(node.name.as_str())))?;
        Ok(())
    }
}

/// Escape `&`, `<`, `>`, `"` and `'` for use in XML text or attributes.
pub fn escape(text: &str) -> String {
    quick_xml::escape::escape(text).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_elements() {
        let mut b = XmlBuilder::new("urn:test");
        b.add_element("A").add_child("B", "1").add_element("C");
        b.add_child("D", "2").end().end();
        let xml = b.get_xml().unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<Document xmlns=\"urn:test\""));
        assert!(xml.contains("<B>1</B>"));
        assert!(xml.contains("<D>2</D>"));
        let a = xml.find("<A>").unwrap();
        let c = xml.find("<C>").unwrap();
        let end_a = xml.find("</A>").unwrap();
        assert!(a < c && c < end_a);
    }

    #[test]
    fn test_attribute_on_last_element() {
        let mut b = XmlBuilder::new("urn:test");
        b.add_child("Amt", "10.00").with_attribute("Ccy", "EUR");
        let xml = b.get_xml().unwrap();
        assert!(xml.contains("<Amt Ccy=\"EUR\">10.00</Amt>"));
    }

    #[test]
    fn test_text_is_escaped() {
        let mut b = XmlBuilder::new("urn:test");
        b.add_child("Nm", "A & B <C> \"D\" 'E'");
        let xml = b.get_xml().unwrap();
        assert!(xml.contains("A &amp; B &lt;C&gt; &quot;D&quot; &apos;E&apos;"));
    }

    #[test]
    fn test_unbalanced_builder_fails() {
        let mut b = XmlBuilder::new("urn:test");
        b.add_element("Open");
        assert!(b.get_xml().is_err());

        let mut b = XmlBuilder::new("urn:test");
        b.end();
        assert!(b.get_xml().is_err());
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a<b&'\""), "a&lt;b&amp;&apos;&quot;");
    }
}
