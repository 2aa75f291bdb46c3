//! camt.026 UnableToApply.

use super::{add_head, finish, message_root, open, read_head, start, validate_head, DEFAULT_CURRENCY};
use crate::error::{Error, Result};
use crate::iso20022::blocks;
use crate::iso20022::common::{Assignment, Case, UnderlyingTransaction};
use crate::iso20022::{CamtType, CamtVersion};
use crate::xml::{Element, XmlBuilder, XmlDocument};

/// A missing or incorrect information item (`MssngInf` / `IncrrctInf`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InformationItem {
    /// `Tp/Cd`, e.g. `MS01` or `IN03`.
    pub code: String,
    pub additional_information: Option<String>,
}

impl InformationItem {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            additional_information: None,
        }
    }
}

/// The receiver cannot apply a payment and asks for the listed details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Camt026Document {
    pub assignment: Assignment,
    pub case: Option<Case>,
    pub underlying: UnderlyingTransaction,
    pub missing_information: Vec<InformationItem>,
    pub incorrect_information: Vec<InformationItem>,
}

impl Camt026Document {
    pub fn new(assignment: Assignment, underlying: UnderlyingTransaction) -> Self {
        Self {
            assignment,
            case: None,
            underlying,
            missing_information: Vec::new(),
            incorrect_information: Vec::new(),
        }
    }

    pub fn with_case(&self, case: Case) -> Self {
        Self {
            case: Some(case),
            ..self.clone()
        }
    }

    pub fn with_missing_information(&self, item: InformationItem) -> Self {
        let mut doc = self.clone();
        doc.missing_information.push(item);
        doc
    }

    pub fn with_incorrect_information(&self, item: InformationItem) -> Self {
        let mut doc = self.clone();
        doc.incorrect_information.push(item);
        doc
    }

    pub fn to_xml(&self, version: CamtVersion) -> Result<String> {
        let mut b = start(CamtType::Camt026, version)?;
        add_head(&mut b, &self.assignment, self.case.as_ref());
        blocks::add_underlying(&mut b, &self.underlying);

        b.add_element("Justfn");
        if self.missing_information.is_empty() && self.incorrect_information.is_empty() {
            b.add_child("AnyInf", "true");
        } else {
            b.add_element("MssngOrIncrrctInf");
            for item in &self.missing_information {
                add_item(&mut b, "MssngInf", "AddtlMssngInf", item);
            }
            for item in &self.incorrect_information {
                add_item(&mut b, "IncrrctInf", "AddtlIncrrctInf", item);
            }
            b.end();
        }
        b.end();
        finish(b)
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        let doc = open(xml, CamtType::Camt026)?;
        let root = message_root(&doc, CamtType::Camt026)?;
        let (assignment, case) = read_head(&doc, root)?;
        let underlying = blocks::read_underlying(&doc, root, DEFAULT_CURRENCY)?
            .ok_or_else(|| Error::RequiredNode("UblToApply/Undrlg".to_string()))?;
        Ok(Self {
            assignment,
            case,
            underlying,
            missing_information: read_items(&doc, root, "Justfn/MssngOrIncrrctInf/MssngInf", "AddtlMssngInf")?,
            incorrect_information: read_items(&doc, root, "Justfn/MssngOrIncrrctInf/IncrrctInf", "AddtlIncrrctInf")?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        validate_head(&self.assignment, self.case.as_ref())?;
        self.underlying.validate()?;
        for item in self.missing_information.iter().chain(&self.incorrect_information) {
            if item.code.len() != 4 {
                return Err(Error::validation("Justfn/Tp/Cd", format!("'{}' is not a 4 letter code", item.code)));
            }
        }
        Ok(())
    }
}

xml_io!(Camt026Document, CamtVersion);

fn add_item(b: &mut XmlBuilder, tag: &str, info_tag: &str, item: &InformationItem) {
    b.add_element(tag);
    b.add_element("Tp").add_child("Cd", &item.code).end();
    b.add_optional_child(info_tag, item.additional_information.as_deref());
    b.end();
}

fn read_items(doc: &XmlDocument, root: &Element, path: &str, info_tag: &str) -> Result<Vec<InformationItem>> {
    blocks::children(doc, root, path)?
        .into_iter()
        .map(|el| {
            Ok(InformationItem {
                code: blocks::required_text(doc, el, "Tp/Cd")?,
                additional_information: blocks::text(doc, el, info_tag)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iso20022::camt::fixtures::assignment;
    use pretty_assertions::assert_eq;

    fn document() -> Camt026Document {
        let underlying = UnderlyingTransaction {
            original_end_to_end_id: Some("E2E-26".into()),
            ..UnderlyingTransaction::initiation()
        };
        Camt026Document::new(assignment(), underlying)
    }

    #[test]
    fn test_any_information_without_items() {
        let xml = document().to_xml(CamtVersion::V07).unwrap();
        assert!(xml.contains("<AnyInf>true</AnyInf>"));
        assert!(!xml.contains("<Case>"));
    }

    #[test]
    fn test_round_trip_with_items() {
        let mut missing = InformationItem::new("MS01");
        missing.additional_information = Some("Remittance missing".into());
        let doc = document()
            .with_case(Case::new("CASE-26"))
            .with_missing_information(missing)
            .with_incorrect_information(InformationItem::new("IN03"));
        let xml = doc.to_xml(CamtVersion::V09).unwrap();
        assert!(xml.contains("camt.026.001.09"));
        assert_eq!(Camt026Document::from_xml(&xml).unwrap(), doc);
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn test_unsupported_version() {
        assert!(matches!(document().to_xml(CamtVersion::V02), Err(Error::InvalidArgument(_))));
    }
}
