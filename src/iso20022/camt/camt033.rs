//! camt.033 RequestForDuplicate.

use super::{add_head, finish, message_root, open, read_head, start, validate_head};
use crate::error::Result;
use crate::iso20022::common::{Assignment, Case};
use crate::iso20022::{CamtType, CamtVersion};

/// Asks the assignee to resend a message; carries only the shared head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Camt033Document {
    pub assignment: Assignment,
    pub case: Option<Case>,
}

impl Camt033Document {
    pub fn new(assignment: Assignment) -> Self {
        Self { assignment, case: None }
    }

    pub fn with_case(&self, case: Case) -> Self {
        Self {
            case: Some(case),
            ..self.clone()
        }
    }

    pub fn to_xml(&self, version: CamtVersion) -> Result<String> {
        let mut b = start(CamtType::Camt033, version)?;
        add_head(&mut b, &self.assignment, self.case.as_ref());
        finish(b)
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        let doc = open(xml, CamtType::Camt033)?;
        let root = message_root(&doc, CamtType::Camt033)?;
        let (assignment, case) = read_head(&doc, root)?;
        Ok(Self { assignment, case })
    }

    pub fn validate(&self) -> Result<()> {
        validate_head(&self.assignment, self.case.as_ref())
    }
}

xml_io!(Camt033Document, CamtVersion);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iso20022::camt::fixtures::assignment;
    use crate::iso20022::common::AssignmentParty;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_round_trip_with_case_creator() {
        let case = Case::new("CASE-33").with_creator(AssignmentParty::party_name("ACME GmbH"));
        let doc = Camt033Document::new(assignment()).with_case(case);
        let xml = doc.to_xml(CamtVersion::V07).unwrap();
        assert!(xml.contains("<Cretr>"));
        assert_eq!(Camt033Document::from_xml(&xml).unwrap(), doc);
    }

    #[test]
    fn test_write_to() {
        let mut out = Vec::new();
        Camt033Document::new(assignment())
            .write_to(&mut out, CamtVersion::V06)
            .unwrap();
        let xml = String::from_utf8(out).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("urn:iso:std:iso:20022:tech:xsd:camt.033.001.06"));
    }
}
