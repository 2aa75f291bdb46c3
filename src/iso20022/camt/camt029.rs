//! camt.029 ResolutionOfInvestigation.

use super::{finish, message_root, open, start, INVESTIGATION_DIALECT};
use crate::error::{Error, Result};
use crate::iso20022::blocks;
use crate::iso20022::common::{validate_max35, validate_optional_max35, Assignment, Case};
use crate::iso20022::{CamtType, CamtVersion};
use crate::xml::{Element, XmlBuilder, XmlDocument};

/// Outcome for one transaction of a cancellation request
/// (`CxlDtls/TxInfAndSts`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CancellationStatus {
    pub cancellation_status_id: Option<String>,
    pub original_instruction_id: Option<String>,
    pub original_end_to_end_id: Option<String>,
    /// `TxCxlSts`, e.g. `CNCL`, `RJCR` or `PDCR`.
    pub status: Option<String>,
    pub reason_code: Option<String>,
    pub additional_information: Option<String>,
}

/// Answer to an investigation or cancellation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Camt029Document {
    pub assignment: Assignment,
    pub resolved_case: Option<Case>,
    /// `Sts/Conf`, e.g. `CNCL`, `ACCR`, `RJCR`.
    pub confirmation: String,
    pub cancellation_details: Vec<CancellationStatus>,
}

impl Camt029Document {
    pub fn new(assignment: Assignment, confirmation: impl Into<String>) -> Self {
        Self {
            assignment,
            resolved_case: None,
            confirmation: confirmation.into(),
            cancellation_details: Vec::new(),
        }
    }

    pub fn with_resolved_case(&self, case: Case) -> Self {
        Self {
            resolved_case: Some(case),
            ..self.clone()
        }
    }

    pub fn with_cancellation_status(&self, status: CancellationStatus) -> Self {
        let mut doc = self.clone();
        doc.cancellation_details.push(status);
        doc
    }

    pub fn to_xml(&self, version: CamtVersion) -> Result<String> {
        let mut b = start(CamtType::Camt029, version)?;
        blocks::add_assignment(&mut b, &self.assignment, INVESTIGATION_DIALECT);
        blocks::add_case(&mut b, "RslvdCase", self.resolved_case.as_ref(), INVESTIGATION_DIALECT);
        b.add_element("Sts").add_child("Conf", &self.confirmation).end();
        if !self.cancellation_details.is_empty() {
            b.add_element("CxlDtls");
            for status in &self.cancellation_details {
                add_status(&mut b, status);
            }
            b.end();
        }
        finish(b)
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        let doc = open(xml, CamtType::Camt029)?;
        let root = message_root(&doc, CamtType::Camt029)?;
        let cancellation_details = blocks::children(&doc, root, "CxlDtls/TxInfAndSts")?
            .into_iter()
            .map(|el| read_status(&doc, el))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            assignment: blocks::read_assignment(&doc, root)?,
            resolved_case: blocks::read_case(&doc, root, "RslvdCase")?,
            confirmation: blocks::text_with_fallback(&doc, root, &["Sts/Conf", "Sts/RjctdMod/Cd"])?
                .ok_or_else(|| Error::RequiredNode("RsltnOfInvstgtn/Sts/Conf".to_string()))?,
            cancellation_details,
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.assignment.validate()?;
        if let Some(case) = &self.resolved_case {
            case.validate()?;
        }
        if self.confirmation.len() != 4 {
            return Err(Error::validation(
                "Sts/Conf",
                format!("'{}' is not a 4 letter code", self.confirmation),
            ));
        }
        for status in &self.cancellation_details {
            validate_optional_max35("CxlStsId", status.cancellation_status_id.as_deref())?;
            validate_optional_max35("OrgnlInstrId", status.original_instruction_id.as_deref())?;
            validate_optional_max35("OrgnlEndToEndId", status.original_end_to_end_id.as_deref())?;
            if let Some(code) = &status.status {
                validate_max35("TxCxlSts", code)?;
            }
        }
        Ok(())
    }
}

xml_io!(Camt029Document, CamtVersion);

fn add_status(b: &mut XmlBuilder, status: &CancellationStatus) {
    b.add_element("TxInfAndSts");
    b.add_optional_child("CxlStsId", status.cancellation_status_id.as_deref())
        .add_optional_child("OrgnlInstrId", status.original_instruction_id.as_deref())
        .add_optional_child("OrgnlEndToEndId", status.original_end_to_end_id.as_deref())
        .add_optional_child("TxCxlSts", status.status.as_deref());
    blocks::add_reason(
        b,
        "CxlStsRsnInf",
        status.reason_code.as_deref(),
        status.additional_information.as_deref(),
    );
    b.end();
}

fn read_status(doc: &XmlDocument, el: &Element) -> Result<CancellationStatus> {
    let (reason_code, additional_information) = blocks::read_reason(doc, el, "CxlStsRsnInf")?;
    Ok(CancellationStatus {
        cancellation_status_id: blocks::text(doc, el, "CxlStsId")?,
        original_instruction_id: blocks::text(doc, el, "OrgnlInstrId")?,
        original_end_to_end_id: blocks::text(doc, el, "OrgnlEndToEndId")?,
        status: blocks::text(doc, el, "TxCxlSts")?,
        reason_code,
        additional_information,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iso20022::camt::fixtures::assignment;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_round_trip() {
        let doc = Camt029Document::new(assignment(), "RJCR")
            .with_resolved_case(Case::new("CASE-29"))
            .with_cancellation_status(CancellationStatus {
                original_end_to_end_id: Some("E2E-1".into()),
                status: Some("RJCR".into()),
                reason_code: Some("LEGL".into()),
                additional_information: Some("Funds already credited".into()),
                ..CancellationStatus::default()
            });
        let xml = doc.to_xml(CamtVersion::V09).unwrap();
        assert!(xml.contains("<RslvdCase>"));
        assert!(xml.contains("<Conf>RJCR</Conf>"));
        assert_eq!(Camt029Document::from_xml(&xml).unwrap(), doc);
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn test_minimal_document() {
        let xml = Camt029Document::new(assignment(), "CNCL").to_xml(CamtVersion::V13).unwrap();
        assert!(!xml.contains("CxlDtls"));
        assert!(!xml.contains("RslvdCase"));
    }
}
