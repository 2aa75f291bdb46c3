//! camt.087 RequestToModifyPayment.

use super::{add_head, finish, message_root, open, read_head, start, validate_head, DEFAULT_CURRENCY, INVESTIGATION_DIALECT};
use crate::error::{Error, Result};
use crate::iso20022::blocks;
use crate::iso20022::common::{validate_amount, Assignment, Case, UnderlyingTransaction};
use crate::iso20022::{CamtType, CamtVersion};
use crate::types::{Account, Amount, Party, RemittanceInformation};
use chrono::NaiveDate;

/// Requested changes (`Mod`); only present fields are changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Modification {
    pub instruction_id: Option<String>,
    pub end_to_end_id: Option<String>,
    pub requested_execution_date: Option<NaiveDate>,
    pub amount: Option<Amount>,
    pub creditor: Option<Party>,
    pub creditor_account: Option<Account>,
    pub remittance: Option<RemittanceInformation>,
}

impl Modification {
    pub fn is_empty(&self) -> bool {
        *self == Modification::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Camt087Document {
    pub assignment: Assignment,
    pub case: Option<Case>,
    pub underlying: UnderlyingTransaction,
    pub modification: Modification,
}

impl Camt087Document {
    pub fn new(assignment: Assignment, underlying: UnderlyingTransaction, modification: Modification) -> Self {
        Self {
            assignment,
            case: None,
            underlying,
            modification,
        }
    }

    pub fn with_case(&self, case: Case) -> Self {
        Self {
            case: Some(case),
            ..self.clone()
        }
    }

    pub fn to_xml(&self, version: CamtVersion) -> Result<String> {
        let mut b = start(CamtType::Camt087, version)?;
        add_head(&mut b, &self.assignment, self.case.as_ref());
        blocks::add_underlying(&mut b, &self.underlying);

        let m = &self.modification;
        b.add_element("Mod");
        b.add_optional_child("InstrId", m.instruction_id.as_deref())
            .add_optional_child("EndToEndId", m.end_to_end_id.as_deref());
        if let Some(date) = &m.requested_execution_date {
            blocks::add_date(&mut b, "ReqdExctnDt", date, true);
        }
        if let Some(amount) = &m.amount {
            b.add_element("Amt");
            blocks::add_amount(&mut b, "InstdAmt", amount);
            b.end();
        }
        if let Some(creditor) = &m.creditor {
            blocks::add_party(&mut b, "Cdtr", creditor, INVESTIGATION_DIALECT);
        }
        if let Some(account) = &m.creditor_account {
            blocks::add_account(&mut b, "CdtrAcct", account);
        }
        if let Some(remittance) = &m.remittance {
            blocks::add_remittance(&mut b, remittance);
        }
        b.end();
        finish(b)
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        let doc = open(xml, CamtType::Camt087)?;
        let root = message_root(&doc, CamtType::Camt087)?;
        let (assignment, case) = read_head(&doc, root)?;
        let underlying = blocks::read_underlying(&doc, root, DEFAULT_CURRENCY)?
            .ok_or_else(|| Error::RequiredNode("ReqToModfyPmt/Undrlg".to_string()))?;
        let el = doc.required_node(Some(root), "Mod", "ReqToModfyPmt/Mod")?;
        let modification = Modification {
            instruction_id: blocks::text(&doc, el, "InstrId")?,
            end_to_end_id: blocks::text(&doc, el, "EndToEndId")?,
            requested_execution_date: blocks::optional_date(&doc, el, &["ReqdExctnDt/Dt", "ReqdExctnDt"])?,
            amount: match blocks::child(&doc, el, "Amt/InstdAmt")? {
                Some(_) => blocks::optional_amount(&doc, el, "Amt/InstdAmt", DEFAULT_CURRENCY)?,
                None => blocks::optional_amount(&doc, el, "Amt/EqvtAmt/Amt", DEFAULT_CURRENCY)?,
            },
            creditor: blocks::read_optional_party(&doc, el, "Cdtr")?,
            creditor_account: blocks::read_optional_account(&doc, el, "CdtrAcct")?,
            remittance: blocks::read_remittance(&doc, el)?,
        };
        Ok(Self {
            assignment,
            case,
            underlying,
            modification,
        })
    }

    pub fn validate(&self) -> Result<()> {
        validate_head(&self.assignment, self.case.as_ref())?;
        self.underlying.validate()?;
        if self.modification.is_empty() {
            return Err(Error::validation("Mod", "requests no change"));
        }
        if let Some(amount) = &self.modification.amount {
            validate_amount("Mod/Amt", amount)?;
        }
        Ok(())
    }
}

xml_io!(Camt087Document, CamtVersion);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iso20022::camt::fixtures::assignment;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn modification() -> Modification {
        Modification {
            requested_execution_date: NaiveDate::from_ymd_opt(2025, 2, 1),
            amount: Some(Amount::new(Decimal::new(75, 0), "EUR")),
            creditor: Some(Party::named("Lieferant AG")),
            creditor_account: Some(Account::iban("DE89370400440532013000")),
            remittance: Some(RemittanceInformation::unstructured("Rechnung 99")),
            ..Modification::default()
        }
    }

    #[test]
    fn test_round_trip() {
        let underlying = UnderlyingTransaction {
            original_end_to_end_id: Some("E2E-87".into()),
            ..UnderlyingTransaction::initiation()
        };
        let doc = Camt087Document::new(assignment(), underlying, modification());
        let xml = doc.to_xml(CamtVersion::V06).unwrap();
        assert!(xml.contains("<InstdAmt Ccy=\"EUR\">75.00</InstdAmt>"));
        assert_eq!(Camt087Document::from_xml(&xml).unwrap(), doc);
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn test_empty_modification_invalid() {
        let doc = Camt087Document::new(assignment(), UnderlyingTransaction::initiation(), Modification::default());
        assert!(matches!(doc.validate(), Err(Error::Validation { .. })));
    }
}
