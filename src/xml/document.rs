//! Namespace-aware XML document with XPath-style field extraction.

use super::xpath::{wrap_string_call, Item, XPath};
use crate::error::{Error, Result};
use crate::types::Amount;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Element(Element),
    Text(String),
}

/// An XML element with its resolved namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    local_name: String,
    prefix: Option<String>,
    namespace: Option<String>,
    /// Raw attribute names (`Ccy`, `xmlns:b`, …) with unescaped values.
    attributes: Vec<(String, String)>,
    nodes: Vec<Node>,
}

impl Element {
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Value of a non-namespace-declaration attribute, matched on local name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .filter(|(key, _)| key != "xmlns" && !key.starts_with("xmlns:"))
            .find(|(key, _)| key.rsplit(':').next() == Some(name))
            .map(|(_, value)| value.as_str())
    }

    /// Value of the default namespace declaration (`xmlns="…"`).
    pub fn default_namespace_declaration(&self) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == "xmlns")
            .map(|(_, value)| value.as_str())
    }

    /// Prefixed namespace declarations (`xmlns:p="…"`) as `(prefix, uri)`.
    pub fn prefixed_namespace_declarations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().filter_map(|(key, value)| {
            key.strip_prefix("xmlns:").map(|prefix| (prefix, value.as_str()))
        })
    }

    /// Child elements in document order.
    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    pub(crate) fn collect_descendants<'a>(&'a self, out: &mut Vec<&'a Element>) {
        for child in self.children() {
            out.push(child);
            child.collect_descendants(out);
        }
    }

    /// Concatenated text of this element's own text nodes.
    pub fn own_text(&self) -> Option<String> {
        let text: String = self
            .nodes
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) => Some(text.as_str()),
                Node::Element(_) => None,
            })
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// XPath string-value: all descendant text in document order.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.append_text(&mut out);
        out
    }

    fn append_text(&self, out: &mut String) {
        for node in &self.nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Element(el) => el.append_text(out),
            }
        }
    }
}

/// How the query namespace of a document was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceSource {
    KnownNamespace,
    RootNamespace,
    RootDefaultDeclaration,
    UsedPrefixDeclaration,
    RootFallback,
    None,
}

/// Parsed XML document with a detected query namespace.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    root: Element,
    namespace: Option<String>,
    namespace_source: NamespaceSource,
    declared_namespaces: Vec<String>,
}

impl XmlDocument {
    /// Parse XML text and detect the namespace for `format_token`
    /// (e.g. `"camt.053"`), preferring any of `known_namespaces`.
    pub fn parse(xml: &str, format_token: &str, known_namespaces: &[&str]) -> Result<Self> {
        let mut declared = Vec::new();
        let root = Self::build_tree(xml, &mut declared)?;
        let (namespace, source) = Self::detect_namespace(&root, format_token, known_namespaces);
        debug!(
            namespace = namespace.as_deref().unwrap_or(""),
            source = ?source,
            format = format_token,
            "detected document namespace"
        );
        Ok(Self {
            root,
            namespace,
            namespace_source: source,
            declared_namespaces: declared,
        })
    }

    fn open_element(ns: ResolveResult<'_>, start: &BytesStart<'_>, declared: &mut Vec<String>) -> Result<Element> {
        let namespace = match ns {
            ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
            ResolveResult::Unbound => None,
            ResolveResult::Unknown(prefix) => {
                return Err(Error::XmlError(format!(
                    "undeclared namespace prefix '{}'",
                    String::from_utf8_lossy(&prefix)
                )))
            }
        };

        let name = start.name();
        let local_name = String::from_utf8_lossy(name.local_name().as_ref()).into_owned();
        let prefix = name
            .prefix()
            .map(|p| String::from_utf8_lossy(p.as_ref()).into_owned());

        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            if (key == "xmlns" || key.starts_with("xmlns:")) && !declared.contains(&value) {
                declared.push(value.clone());
            }
            attributes.push((key, value));
        }

        Ok(Element {
            local_name,
            prefix,
            namespace,
            attributes,
            nodes: Vec::new(),
        })
    }

    fn close_element(stack: &mut Vec<Element>, root: &mut Option<Element>, element: Element) -> Result<()> {
        match stack.last_mut() {
            Some(parent) => parent.nodes.push(Node::Element(element)),
            None if root.is_none() => *root = Some(element),
            None => {
                return Err(Error::XmlError(format!(
                    "second root element <{}>",
                    element.local_name
                )))
            }
        }
        Ok(())
    }

    fn build_tree(xml: &str, declared: &mut Vec<String>) -> Result<Element> {
        let mut reader = NsReader::from_str(xml);
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_resolved_event() {
                Ok((ns, Event::Start(e))) => {
                    let element = Self::open_element(ns, &e, declared)?;
                    stack.push(element);
                }
                Ok((ns, Event::Empty(e))) => {
                    let element = Self::open_element(ns, &e, declared)?;
                    Self::close_element(&mut stack, &mut root, element)?;
                }
                Ok((_, Event::End(_))) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| Error::XmlError("unexpected closing tag".to_string()))?;
                    Self::close_element(&mut stack, &mut root, element)?;
                }
                Ok((_, Event::Text(t))) => {
                    let text = t.unescape()?.into_owned();
                    match stack.last_mut() {
                        Some(parent) if !text.trim().is_empty() => parent.nodes.push(Node::Text(text)),
                        Some(_) => {}
                        None if text.trim().is_empty() => {}
                        None => {
                            return Err(Error::XmlError("text outside of the root element".to_string()))
                        }
                    }
                }
                Ok((_, Event::CData(c))) => {
                    let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                    if let Some(parent) = stack.last_mut() {
                        parent.nodes.push(Node::Text(text));
                    }
                }
                Ok((_, Event::Eof)) => break,
                Ok(_) => {}
                Err(e) => return Err(Error::XmlError(e.to_string())),
            }
        }

        if let Some(open) = stack.last() {
            return Err(Error::XmlError(format!(
                "unexpected end of document, <{}> is not closed",
                open.local_name
            )));
        }
        root.ok_or_else(|| Error::XmlError("document has no root element".to_string()))
    }

    fn detect_namespace(root: &Element, token: &str, known_namespaces: &[&str]) -> (Option<String>, NamespaceSource) {
        // 1. a known namespace the root or its first child is in
        let in_use = [root.namespace(), root.children().next().and_then(Element::namespace)];
        if let Some(known) = known_namespaces.iter().find(|known| in_use.contains(&Some(**known))) {
            return (Some(known.to_string()), NamespaceSource::KnownNamespace);
        }

        // 2. the root element's own namespace carries the format token
        if let Some(ns) = root.namespace().filter(|ns| ns.contains(token)) {
            return (Some(ns.to_string()), NamespaceSource::RootNamespace);
        }

        // 3. default declaration on the root carries the token
        if let Some(ns) = root.default_namespace_declaration().filter(|ns| ns.contains(token)) {
            return (Some(ns.to_string()), NamespaceSource::RootDefaultDeclaration);
        }

        // 4. a prefixed declaration with the token whose prefix the first child uses
        let child_prefix = root.children().next().and_then(Element::prefix);
        if let Some(child_prefix) = child_prefix {
            if let Some((_, ns)) = root
                .prefixed_namespace_declarations()
                .find(|(prefix, ns)| *prefix == child_prefix && ns.contains(token))
            {
                return (Some(ns.to_string()), NamespaceSource::UsedPrefixDeclaration);
            }
        }

        // 5. whatever namespace the root is in
        if let Some(ns) = root.default_namespace_declaration().or(root.namespace()) {
            warn!(namespace = ns, format = token, "namespace does not match expected format");
            return (Some(ns.to_string()), NamespaceSource::RootFallback);
        }

        (None, NamespaceSource::None)
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Namespace registered under the `ns` query prefix, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn namespace_source(&self) -> NamespaceSource {
        self.namespace_source
    }

    /// Every namespace URI declared anywhere in the document.
    pub fn declared_namespaces(&self) -> &[String] {
        &self.declared_namespaces
    }

    fn evaluate<'a>(&'a self, context: Option<&'a Element>, expr: &str) -> Result<Vec<Item<'a>>> {
        let path = XPath::compile(expr)?;
        Ok(path.evaluate(&self.root, context, self.namespace()))
    }

    /// Elements selected by `expr`, evaluated from the document node.
    pub fn select(&self, expr: &str) -> Result<Vec<&Element>> {
        self.select_in(None, expr)
    }

    /// Elements selected by `expr`, evaluated relative to `context`.
    pub fn select_in<'a>(&'a self, context: Option<&'a Element>, expr: &str) -> Result<Vec<&'a Element>> {
        Ok(self
            .evaluate(context, expr)?
            .into_iter()
            .filter_map(|item| match item {
                Item::Element(el) => Some(el),
                _ => None,
            })
            .collect())
    }

    /// First element matching `expr`, failing with `message` when absent.
    pub fn required_node<'a>(&'a self, context: Option<&'a Element>, expr: &str, message: &str) -> Result<&'a Element> {
        self.select_in(context, expr)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::RequiredNode(message.to_string()))
    }

    /// String value of `expr` (implicitly `string(expr)`); empty is `None`.
    pub fn xpath_string(&self, expr: &str) -> Result<Option<String>> {
        self.xpath_string_in(None, expr)
    }

    pub fn xpath_string_in(&self, context: Option<&Element>, expr: &str) -> Result<Option<String>> {
        let expr = wrap_string_call(expr);
        let value = self
            .evaluate(context, &expr)?
            .first()
            .map(Item::string_value)
            .unwrap_or_default();
        Ok(if value.is_empty() { None } else { Some(value) })
    }

    /// First non-empty result of `exprs`, tried in order.
    pub fn xpath_string_with_fallback(&self, context: Option<&Element>, exprs: &[&str]) -> Result<Option<String>> {
        for expr in exprs {
            if let Some(value) = self.xpath_string_in(context, expr)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Amount text plus its `Ccy` attribute. A missing or unreadable amount
    /// degrades to zero in `default_currency`.
    pub fn amount_with_currency(&self, context: Option<&Element>, expr: &str, default_currency: &str) -> Result<Amount> {
        let element = self.select_in(context, expr)?.into_iter().next();
        let Some(element) = element else {
            return Ok(Amount::new(Decimal::ZERO, default_currency));
        };

        let currency = element
            .attribute("Ccy")
            .filter(|c| !c.is_empty())
            .unwrap_or(default_currency);
        let text = element.text();
        let value = match Decimal::from_str(text.trim()) {
            Ok(value) => value,
            Err(_) => {
                if !text.trim().is_empty() {
                    warn!(amount = %text, "unreadable amount, using zero");
                }
                Decimal::ZERO
            }
        };
        Ok(Amount::new(value, currency))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAMT_027: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Document xmlns="urn:iso:std:iso:20022:tech:xsd:camt.027.001.09">
  <ClmNonRct>
    <Assgnmt>
      <Id>ASSIGN-1</Id>
      <CreDtTm>2025-01-01T10:00:00</CreDtTm>
    </Assgnmt>
    <Undrlg>
      <Initn>
        <OrgnlInstdAmt Ccy="EUR">12.50</OrgnlInstdAmt>
        <Empty/>
      </Initn>
    </Undrlg>
  </ClmNonRct>
</Document>"#;

    #[test]
    fn test_known_namespace_wins() {
        let doc = XmlDocument::parse(
            CAMT_027,
            "camt.027",
            &["urn:iso:std:iso:20022:tech:xsd:camt.027.001.09"],
        )
        .unwrap();
        assert_eq!(doc.namespace_source(), NamespaceSource::KnownNamespace);
        assert_eq!(doc.xpath_string("//Assgnmt/Id").unwrap().as_deref(), Some("ASSIGN-1"));
        assert_eq!(doc.xpath_string("//ns:Assgnmt/ns:Id").unwrap().as_deref(), Some("ASSIGN-1"));
    }

    #[test]
    fn test_root_namespace_with_token() {
        let doc = XmlDocument::parse(CAMT_027, "camt.027", &[]).unwrap();
        assert_eq!(doc.namespace_source(), NamespaceSource::RootNamespace);
        assert_eq!(doc.namespace(), Some("urn:iso:std:iso:20022:tech:xsd:camt.027.001.09"));
    }

    #[test]
    fn test_used_prefix_beats_first_declared() {
        let xml = r#"<Document xmlns:a="urn:iso:std:iso:20022:tech:xsd:camt.053.001.02"
                               xmlns:b="urn:iso:std:iso:20022:tech:xsd:camt.053.001.08">
              <b:BkToCstmrStmt><b:GrpHdr><b:MsgId>M1</b:MsgId></b:GrpHdr></b:BkToCstmrStmt>
            </Document>"#;
        let doc = XmlDocument::parse(xml, "camt.053", &[]).unwrap();
        assert_eq!(doc.namespace_source(), NamespaceSource::UsedPrefixDeclaration);
        assert_eq!(doc.namespace(), Some("urn:iso:std:iso:20022:tech:xsd:camt.053.001.08"));
        assert_eq!(doc.xpath_string("//GrpHdr/MsgId").unwrap().as_deref(), Some("M1"));
    }

    #[test]
    fn test_unused_known_declaration_is_ignored() {
        let xml = r#"<Document xmlns:a="urn:iso:std:iso:20022:tech:xsd:camt.053.001.02"
                               xmlns:b="urn:iso:std:iso:20022:tech:xsd:camt.053.001.08">
              <b:BkToCstmrStmt><b:GrpHdr><b:MsgId>M1</b:MsgId></b:GrpHdr></b:BkToCstmrStmt>
            </Document>"#;
        let known = [
            "urn:iso:std:iso:20022:tech:xsd:camt.053.001.02",
            "urn:iso:std:iso:20022:tech:xsd:camt.053.001.08",
        ];
        let doc = XmlDocument::parse(xml, "camt.053", &known).unwrap();
        assert_eq!(doc.namespace_source(), NamespaceSource::KnownNamespace);
        assert_eq!(doc.namespace(), Some(known[1]));
        assert_eq!(doc.xpath_string("//GrpHdr/MsgId").unwrap().as_deref(), Some("M1"));
    }

    #[test]
    fn test_fallback_to_root_namespace() {
        let xml = r#"<Document xmlns="urn:example:other"><A>1</A></Document>"#;
        let doc = XmlDocument::parse(xml, "camt.053", &[]).unwrap();
        assert_eq!(doc.namespace_source(), NamespaceSource::RootFallback);
        assert_eq!(doc.xpath_string("/Document/A").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn test_no_namespace() {
        let xml = "<Document><A>1</A></Document>";
        let doc = XmlDocument::parse(xml, "camt.053", &[]).unwrap();
        assert_eq!(doc.namespace(), None);
        assert_eq!(doc.xpath_string("/Document/A").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn test_missing_and_empty_values_are_none() {
        let doc = XmlDocument::parse(CAMT_027, "camt.027", &[]).unwrap();
        assert_eq!(doc.xpath_string("//Assgnmt/Missing").unwrap(), None);
        assert_eq!(doc.xpath_string("//Initn/Empty").unwrap(), None);
    }

    #[test]
    fn test_fallback_chain() {
        let doc = XmlDocument::parse(CAMT_027, "camt.027", &[]).unwrap();
        let value = doc
            .xpath_string_with_fallback(None, &["//Case/Id", "//Assgnmt/Id"])
            .unwrap();
        assert_eq!(value.as_deref(), Some("ASSIGN-1"));
    }

    #[test]
    fn test_amount_with_currency() {
        let doc = XmlDocument::parse(CAMT_027, "camt.027", &[]).unwrap();
        let amount = doc.amount_with_currency(None, "//OrgnlInstdAmt", "USD").unwrap();
        assert_eq!(amount.value, Decimal::new(1250, 2));
        assert_eq!(amount.currency, "EUR");

        let missing = doc.amount_with_currency(None, "//IntrBkSttlmAmt", "USD").unwrap();
        assert_eq!(missing.value, Decimal::ZERO);
        assert_eq!(missing.currency, "USD");
    }

    #[test]
    fn test_required_node() {
        let doc = XmlDocument::parse(CAMT_027, "camt.027", &[]).unwrap();
        assert!(doc.required_node(None, "//ClmNonRct", "claim").is_ok());
        let err = doc.required_node(None, "//UblToApply", "UblToApply missing").unwrap_err();
        assert!(matches!(err, Error::RequiredNode(ref m) if m == "UblToApply missing"));
    }

    #[test]
    fn test_relative_queries() {
        let doc = XmlDocument::parse(CAMT_027, "camt.027", &[]).unwrap();
        let assignment = doc.required_node(None, "//Assgnmt", "assignment").unwrap();
        assert_eq!(
            doc.xpath_string_in(Some(assignment), "CreDtTm").unwrap().as_deref(),
            Some("2025-01-01T10:00:00")
        );
        assert_eq!(
            doc.xpath_string("//OrgnlInstdAmt/@Ccy").unwrap().as_deref(),
            Some("EUR")
        );
    }

    #[test]
    fn test_malformed_xml_fails() {
        assert!(XmlDocument::parse("<Document><A></Document>", "camt", &[]).is_err());
        assert!(XmlDocument::parse("<Document><A>", "camt", &[]).is_err());
        assert!(XmlDocument::parse("", "camt", &[]).is_err());
    }

    #[test]
    fn test_entities_are_unescaped() {
        let xml = "<Document><Nm>A &amp; B &apos;C&apos;</Nm></Document>";
        let doc = XmlDocument::parse(xml, "camt", &[]).unwrap();
        assert_eq!(doc.xpath_string("//Nm").unwrap().as_deref(), Some("A & B 'C'"));
    }
}
