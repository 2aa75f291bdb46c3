//! camt.031 RejectInvestigation.

use super::{add_head, finish, message_root, open, read_head, start, validate_head};
use crate::error::{Error, Result};
use crate::iso20022::blocks;
use crate::iso20022::common::{Assignment, Case};
use crate::iso20022::{CamtType, CamtVersion};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Camt031Document {
    pub assignment: Assignment,
    pub case: Option<Case>,
    /// `Justfn/RjctnRsn`, e.g. `NFND`, `NAUT`, `UKNW`.
    pub rejection_reason: String,
}

impl Camt031Document {
    pub fn new(assignment: Assignment, rejection_reason: impl Into<String>) -> Self {
        Self {
            assignment,
            case: None,
            rejection_reason: rejection_reason.into(),
        }
    }

    pub fn with_case(&self, case: Case) -> Self {
        Self {
            case: Some(case),
            ..self.clone()
        }
    }

    pub fn to_xml(&self, version: CamtVersion) -> Result<String> {
        let mut b = start(CamtType::Camt031, version)?;
        add_head(&mut b, &self.assignment, self.case.as_ref());
        b.add_element("Justfn").add_child("RjctnRsn", &self.rejection_reason).end();
        finish(b)
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        let doc = open(xml, CamtType::Camt031)?;
        let root = message_root(&doc, CamtType::Camt031)?;
        let (assignment, case) = read_head(&doc, root)?;
        Ok(Self {
            assignment,
            case,
            rejection_reason: blocks::required_text(&doc, root, "Justfn/RjctnRsn")?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        validate_head(&self.assignment, self.case.as_ref())?;
        if self.rejection_reason.len() != 4 {
            return Err(Error::validation(
                "Justfn/RjctnRsn",
                format!("'{}' is not a 4 letter code", self.rejection_reason),
            ));
        }
        Ok(())
    }
}

xml_io!(Camt031Document, CamtVersion);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iso20022::camt::fixtures::assignment;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_round_trip() {
        let doc = Camt031Document::new(assignment(), "NFND").with_case(Case::new("CASE-31"));
        let xml = doc.to_xml(CamtVersion::V05).unwrap();
        assert!(xml.contains("<RjctnRsn>NFND</RjctnRsn>"));
        assert_eq!(Camt031Document::from_xml(&xml).unwrap(), doc);
    }

    #[test]
    fn test_missing_reason() {
        let xml = Camt031Document::new(assignment(), "NFND")
            .to_xml(CamtVersion::V06)
            .unwrap()
            .replace("<RjctnRsn>NFND</RjctnRsn>", "");
        assert!(matches!(Camt031Document::from_xml(&xml), Err(Error::RequiredNode(_))));
    }
}
