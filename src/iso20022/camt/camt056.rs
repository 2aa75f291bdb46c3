//! camt.056 FIToFIPaymentCancellationRequest.

use super::{add_head, finish, message_root, open, read_head, start, validate_head, DEFAULT_CURRENCY};
use crate::error::{Error, Result};
use crate::iso20022::blocks;
use crate::iso20022::common::{validate_optional_max35, Assignment, Case, UnderlyingKind, UnderlyingTransaction};
use crate::iso20022::{CamtType, CamtVersion};

/// One interbank transaction to recall (`Undrlg/TxInf`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterbankCancellation {
    pub cancellation_id: Option<String>,
    pub original: UnderlyingTransaction,
    /// `CxlRsnInf/Rsn/Cd`, e.g. `DUPL`, `TECH`, `FRAD`.
    pub reason_code: Option<String>,
    pub additional_information: Option<String>,
}

impl InterbankCancellation {
    pub fn new(original: UnderlyingTransaction) -> Self {
        Self {
            cancellation_id: None,
            original: UnderlyingTransaction {
                kind: UnderlyingKind::Interbank,
                ..original
            },
            reason_code: None,
            additional_information: None,
        }
    }
}

/// An agent asks the next agent to cancel interbank payments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Camt056Document {
    pub assignment: Assignment,
    pub case: Option<Case>,
    pub transactions: Vec<InterbankCancellation>,
}

impl Camt056Document {
    pub fn new(assignment: Assignment) -> Self {
        Self {
            assignment,
            case: None,
            transactions: Vec::new(),
        }
    }

    pub fn with_case(&self, case: Case) -> Self {
        Self {
            case: Some(case),
            ..self.clone()
        }
    }

    pub fn with_transaction(&self, transaction: InterbankCancellation) -> Self {
        let mut doc = self.clone();
        doc.transactions.push(transaction);
        doc
    }

    pub fn to_xml(&self, version: CamtVersion) -> Result<String> {
        let mut b = start(CamtType::Camt056, version)?;
        add_head(&mut b, &self.assignment, self.case.as_ref());
        b.add_element("CtrlData")
            .add_child("NbOfTxs", &self.transactions.len().to_string())
            .end();
        b.add_element("Undrlg");
        for tx in &self.transactions {
            b.add_element("TxInf");
            b.add_optional_child("CxlId", tx.cancellation_id.as_deref());
            blocks::add_original_reference(&mut b, &tx.original);
            blocks::add_reason(
                &mut b,
                "CxlRsnInf",
                tx.reason_code.as_deref(),
                tx.additional_information.as_deref(),
            );
            b.end();
        }
        b.end();
        finish(b)
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        let doc = open(xml, CamtType::Camt056)?;
        let root = message_root(&doc, CamtType::Camt056)?;
        let (assignment, case) = read_head(&doc, root)?;
        let transactions = blocks::children(&doc, root, "Undrlg/TxInf")?
            .into_iter()
            .map(|el| {
                let (reason_code, additional_information) = blocks::read_reason(&doc, el, "CxlRsnInf")?;
                Ok(InterbankCancellation {
                    cancellation_id: blocks::text(&doc, el, "CxlId")?,
                    original: blocks::read_original_reference(&doc, el, UnderlyingKind::Interbank, DEFAULT_CURRENCY)?,
                    reason_code,
                    additional_information,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            assignment,
            case,
            transactions,
        })
    }

    pub fn validate(&self) -> Result<()> {
        validate_head(&self.assignment, self.case.as_ref())?;
        if self.transactions.is_empty() {
            return Err(Error::validation("Undrlg/TxInf", "at least one is required"));
        }
        for tx in &self.transactions {
            validate_optional_max35("CxlId", tx.cancellation_id.as_deref())?;
            tx.original.validate()?;
        }
        Ok(())
    }
}

xml_io!(Camt056Document, CamtVersion);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iso20022::camt::fixtures::{assignment, created};
    use crate::types::Amount;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn recall() -> InterbankCancellation {
        let original = UnderlyingTransaction {
            original_message_id: Some("PACS-1".into()),
            original_message_name_id: Some("pacs.008.001.08".into()),
            original_creation_date_time: Some(created()),
            original_transaction_id: Some("TX-1".into()),
            amount: Some(Amount::new(Decimal::new(50000, 2), "EUR")),
            date: NaiveDate::from_ymd_opt(2025, 1, 2),
            ..UnderlyingTransaction::initiation()
        };
        InterbankCancellation {
            cancellation_id: Some("RECALL-1".into()),
            reason_code: Some("FRAD".into()),
            ..InterbankCancellation::new(original)
        }
    }

    #[test]
    fn test_new_forces_interbank_kind() {
        assert_eq!(recall().original.kind, UnderlyingKind::Interbank);
    }

    #[test]
    fn test_round_trip() {
        let doc = Camt056Document::new(assignment()).with_transaction(recall());
        let xml = doc.to_xml(CamtVersion::V08).unwrap();
        assert!(xml.contains("<OrgnlIntrBkSttlmAmt Ccy=\"EUR\">500.00</OrgnlIntrBkSttlmAmt>"));
        assert!(xml.contains("<OrgnlIntrBkSttlmDt>2025-01-02</OrgnlIntrBkSttlmDt>"));
        assert_eq!(Camt056Document::from_xml(&xml).unwrap(), doc);
        assert!(doc.validate().is_ok());
    }
}
