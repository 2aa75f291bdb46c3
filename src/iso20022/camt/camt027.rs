//! camt.027 ClaimNonReceipt.

use super::{add_head, finish, message_root, open, read_head, start, validate_head, DEFAULT_CURRENCY};
use crate::error::{Error, Result};
use crate::iso20022::blocks;
use crate::iso20022::common::{Assignment, Case, UnderlyingTransaction};
use crate::iso20022::{CamtType, CamtVersion};

/// A creditor reports that an expected payment has not arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Camt027Document {
    pub assignment: Assignment,
    pub case: Option<Case>,
    pub underlying: UnderlyingTransaction,
    /// `CoverDtls/MssngCoverInd`
    pub missing_cover_indication: Option<bool>,
}

impl Camt027Document {
    pub fn new(assignment: Assignment, underlying: UnderlyingTransaction) -> Self {
        Self {
            assignment,
            case: None,
            underlying,
            missing_cover_indication: None,
        }
    }

    pub fn with_case(&self, case: Case) -> Self {
        Self {
            case: Some(case),
            ..self.clone()
        }
    }

    pub fn with_missing_cover_indication(&self, missing: bool) -> Self {
        Self {
            missing_cover_indication: Some(missing),
            ..self.clone()
        }
    }

    /// Generate the message in `version`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use finmsg::iso20022::camt::Camt027Document;
    /// use finmsg::iso20022::common::{Assignment, AssignmentParty, UnderlyingTransaction};
    /// use finmsg::iso20022::CamtVersion;
    /// use chrono::NaiveDateTime;
    ///
    /// let created = NaiveDateTime::parse_from_str("2025-01-01T10:00:00", "%Y-%m-%dT%H:%M:%S").unwrap();
    /// let assignment = Assignment::new(
    ///     "ASSIGN-1",
    ///     AssignmentParty::agent_bic("COBADEFFXXX"),
    ///     AssignmentParty::agent_bic("DEUTDEFFXXX"),
    ///     created,
    /// );
    /// let doc = Camt027Document::new(assignment, UnderlyingTransaction::initiation());
    /// let xml = doc.to_xml(CamtVersion::V07).unwrap();
    /// ```
    pub fn to_xml(&self, version: CamtVersion) -> Result<String> {
        let mut b = start(CamtType::Camt027, version)?;
        add_head(&mut b, &self.assignment, self.case.as_ref());
        blocks::add_underlying(&mut b, &self.underlying);
        if let Some(missing) = self.missing_cover_indication {
            b.add_element("CoverDtls")
                .add_child("MssngCoverInd", if missing { "true" } else { "false" })
                .end();
        }
        finish(b)
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        let doc = open(xml, CamtType::Camt027)?;
        let root = message_root(&doc, CamtType::Camt027)?;
        let (assignment, case) = read_head(&doc, root)?;
        let underlying = blocks::read_underlying(&doc, root, DEFAULT_CURRENCY)?
            .ok_or_else(|| Error::RequiredNode("ClmNonRct/Undrlg".to_string()))?;
        Ok(Self {
            assignment,
            case,
            underlying,
            missing_cover_indication: blocks::optional_bool(&doc, root, "CoverDtls/MssngCoverInd")?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        validate_head(&self.assignment, self.case.as_ref())?;
        self.underlying.validate()
    }
}

xml_io!(Camt027Document, CamtVersion);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iso20022::camt::fixtures::{assignment, created};
    use crate::types::Amount;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn underlying() -> UnderlyingTransaction {
        UnderlyingTransaction {
            original_message_id: Some("MSG-001".into()),
            original_message_name_id: Some("pain.001.001.03".into()),
            original_creation_date_time: Some(created()),
            original_end_to_end_id: Some("E2E-1".into()),
            amount: Some(Amount::new(Decimal::new(12550, 2), "EUR")),
            date: NaiveDate::from_ymd_opt(2025, 1, 2),
            ..UnderlyingTransaction::initiation()
        }
    }

    #[test]
    fn test_case_omitted() {
        let xml = Camt027Document::new(assignment(), underlying())
            .to_xml(CamtVersion::V07)
            .unwrap();
        assert!(xml.contains("<ClmNonRct>"));
        assert!(!xml.contains("<Case>"));
        assert!(!xml.contains("CoverDtls"));
        assert!(xml.contains("<ReqdExctnDt>"));
    }

    #[test]
    fn test_round_trip() {
        let doc = Camt027Document::new(assignment(), underlying())
            .with_case(Case::new("CASE-1"))
            .with_missing_cover_indication(true);
        let xml = doc.to_xml(CamtVersion::V10).unwrap();
        assert_eq!(Camt027Document::from_xml(&xml).unwrap(), doc);
    }

    #[test]
    fn test_wrong_message_rejected() {
        let xml = Camt027Document::new(assignment(), underlying())
            .to_xml(CamtVersion::V07)
            .unwrap();
        assert!(matches!(
            crate::iso20022::camt::Camt033Document::from_xml(&xml),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_validate_long_assignment_id() {
        let mut doc = Camt027Document::new(assignment(), underlying());
        doc.assignment.id = "X".repeat(36);
        assert!(matches!(doc.validate(), Err(Error::Validation { .. })));
    }
}
