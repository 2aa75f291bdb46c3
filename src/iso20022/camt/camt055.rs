//! camt.055 CustomerPaymentCancellationRequest.

use super::{add_head, finish, message_root, open, read_head, start, validate_head, DEFAULT_CURRENCY};
use crate::error::{Error, Result};
use crate::iso20022::blocks;
use crate::iso20022::common::{format_date_time, validate_amount, validate_optional_max35, Assignment, Case};
use crate::iso20022::{CamtType, CamtVersion};
use crate::types::Amount;
use crate::xml::{Element, XmlBuilder, XmlDocument};
use chrono::{NaiveDate, NaiveDateTime};

/// One transaction to cancel (`TxInf`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentCancellation {
    pub cancellation_id: Option<String>,
    pub original_instruction_id: Option<String>,
    pub original_end_to_end_id: Option<String>,
    pub original_instructed_amount: Option<Amount>,
    pub original_requested_execution_date: Option<NaiveDate>,
    /// `CxlRsnInf/Rsn/Cd`, e.g. `DUPL`, `CUST`, `FRAD`.
    pub reason_code: Option<String>,
    pub additional_information: Option<String>,
}

/// A payment information block of the original pain.001 and the
/// transactions of it to cancel (`OrgnlPmtInfAndCxl`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginalPaymentInformation {
    pub payment_cancellation_id: Option<String>,
    pub original_payment_information_id: String,
    pub original_message_id: Option<String>,
    pub original_message_name_id: Option<String>,
    pub original_creation_date_time: Option<NaiveDateTime>,
    /// Cancel the whole payment information block.
    pub cancel_all: Option<bool>,
    pub transactions: Vec<PaymentCancellation>,
}

impl OriginalPaymentInformation {
    pub fn new(original_payment_information_id: impl Into<String>) -> Self {
        Self {
            original_payment_information_id: original_payment_information_id.into(),
            ..Self::default()
        }
    }

    pub fn with_transaction(&self, transaction: PaymentCancellation) -> Self {
        let mut info = self.clone();
        info.transactions.push(transaction);
        info
    }
}

/// A debtor asks its bank to cancel initiated payments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Camt055Document {
    pub assignment: Assignment,
    pub case: Option<Case>,
    pub payment_informations: Vec<OriginalPaymentInformation>,
}

impl Camt055Document {
    pub fn new(assignment: Assignment) -> Self {
        Self {
            assignment,
            case: None,
            payment_informations: Vec::new(),
        }
    }

    pub fn with_case(&self, case: Case) -> Self {
        Self {
            case: Some(case),
            ..self.clone()
        }
    }

    /// Copy of this request with `info` appended; `self` is unchanged.
    pub fn with_original_payment_information(&self, info: OriginalPaymentInformation) -> Self {
        let mut doc = self.clone();
        doc.payment_informations.push(info);
        doc
    }

    /// Transactions across all payment information blocks (`CtrlData/NbOfTxs`).
    pub fn number_of_transactions(&self) -> usize {
        self.payment_informations.iter().map(|p| p.transactions.len()).sum()
    }

    pub fn to_xml(&self, version: CamtVersion) -> Result<String> {
        let mut b = start(CamtType::Camt055, version)?;
        add_head(&mut b, &self.assignment, self.case.as_ref());
        b.add_element("CtrlData")
            .add_child("NbOfTxs", &self.number_of_transactions().to_string())
            .end();
        b.add_element("Undrlg");
        for info in &self.payment_informations {
            add_payment_information(&mut b, info);
        }
        b.end();
        finish(b)
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        let doc = open(xml, CamtType::Camt055)?;
        let root = message_root(&doc, CamtType::Camt055)?;
        let (assignment, case) = read_head(&doc, root)?;
        let payment_informations = blocks::children(&doc, root, "Undrlg/OrgnlPmtInfAndCxl")?
            .into_iter()
            .map(|el| read_payment_information(&doc, el))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            assignment,
            case,
            payment_informations,
        })
    }

    pub fn validate(&self) -> Result<()> {
        validate_head(&self.assignment, self.case.as_ref())?;
        if self.payment_informations.is_empty() {
            return Err(Error::validation("Undrlg/OrgnlPmtInfAndCxl", "at least one is required"));
        }
        for info in &self.payment_informations {
            validate_optional_max35("OrgnlPmtInfId", Some(&info.original_payment_information_id))?;
            for tx in &info.transactions {
                validate_optional_max35("CxlId", tx.cancellation_id.as_deref())?;
                validate_optional_max35("OrgnlEndToEndId", tx.original_end_to_end_id.as_deref())?;
                if let Some(amount) = &tx.original_instructed_amount {
                    validate_amount("OrgnlInstdAmt", amount)?;
                }
            }
        }
        Ok(())
    }
}

xml_io!(Camt055Document, CamtVersion);

fn add_payment_information(b: &mut XmlBuilder, info: &OriginalPaymentInformation) {
    b.add_element("OrgnlPmtInfAndCxl");
    b.add_optional_child("PmtCxlId", info.payment_cancellation_id.as_deref());
    b.add_child("OrgnlPmtInfId", &info.original_payment_information_id);
    if let Some(message_id) = &info.original_message_id {
        b.add_element("OrgnlGrpInf");
        b.add_child("OrgnlMsgId", message_id);
        b.add_child(
            "OrgnlMsgNmId",
            info.original_message_name_id.as_deref().unwrap_or(blocks::NOT_PROVIDED),
        );
        if let Some(created) = &info.original_creation_date_time {
            b.add_child("OrgnlCreDtTm", &format_date_time(created));
        }
        b.end();
    }
    if let Some(all) = info.cancel_all {
        b.add_child("PmtInfCxl", if all { "true" } else { "false" });
    }
    for tx in &info.transactions {
        b.add_element("TxInf");
        b.add_optional_child("CxlId", tx.cancellation_id.as_deref())
            .add_optional_child("OrgnlInstrId", tx.original_instruction_id.as_deref())
            .add_optional_child("OrgnlEndToEndId", tx.original_end_to_end_id.as_deref());
        blocks::add_optional_amount(b, "OrgnlInstdAmt", tx.original_instructed_amount.as_ref());
        if let Some(date) = &tx.original_requested_execution_date {
            blocks::add_date(b, "OrgnlReqdExctnDt", date, true);
        }
        blocks::add_reason(b, "CxlRsnInf", tx.reason_code.as_deref(), tx.additional_information.as_deref());
        b.end();
    }
    b.end();
}

fn read_payment_information(doc: &XmlDocument, el: &Element) -> Result<OriginalPaymentInformation> {
    let transactions = blocks::children(doc, el, "TxInf")?
        .into_iter()
        .map(|tx| {
            let (reason_code, additional_information) = blocks::read_reason(doc, tx, "CxlRsnInf")?;
            Ok(PaymentCancellation {
                cancellation_id: blocks::text(doc, tx, "CxlId")?,
                original_instruction_id: blocks::text(doc, tx, "OrgnlInstrId")?,
                original_end_to_end_id: blocks::text(doc, tx, "OrgnlEndToEndId")?,
                original_instructed_amount: blocks::optional_amount(doc, tx, "OrgnlInstdAmt", DEFAULT_CURRENCY)?,
                original_requested_execution_date: blocks::optional_date(
                    doc,
                    tx,
                    &["OrgnlReqdExctnDt/Dt", "OrgnlReqdExctnDt"],
                )?,
                reason_code,
                additional_information,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(OriginalPaymentInformation {
        payment_cancellation_id: blocks::text(doc, el, "PmtCxlId")?,
        original_payment_information_id: blocks::required_text(doc, el, "OrgnlPmtInfId")?,
        original_message_id: blocks::text(doc, el, "OrgnlGrpInf/OrgnlMsgId")?,
        original_message_name_id: blocks::text(doc, el, "OrgnlGrpInf/OrgnlMsgNmId")?,
        original_creation_date_time: blocks::optional_date_time(doc, el, "OrgnlGrpInf/OrgnlCreDtTm")?,
        cancel_all: blocks::optional_bool(doc, el, "PmtInfCxl")?,
        transactions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iso20022::camt::fixtures::{assignment, created};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn cancellation() -> PaymentCancellation {
        PaymentCancellation {
            cancellation_id: Some("CXL-1".into()),
            original_end_to_end_id: Some("E2E-1".into()),
            original_instructed_amount: Some(Amount::new(Decimal::new(9999, 2), "EUR")),
            original_requested_execution_date: NaiveDate::from_ymd_opt(2025, 1, 3),
            reason_code: Some("DUPL".into()),
            ..PaymentCancellation::default()
        }
    }

    #[test]
    fn test_with_original_payment_information_leaves_receiver() {
        let doc = Camt055Document::new(assignment());
        let extended = doc.with_original_payment_information(OriginalPaymentInformation::new("PMT-1"));
        assert!(doc.payment_informations.is_empty());
        assert_eq!(extended.payment_informations.len(), 1);
    }

    #[test]
    fn test_round_trip() {
        let info = OriginalPaymentInformation {
            original_message_id: Some("MSG-001".into()),
            original_message_name_id: Some("pain.001.001.09".into()),
            original_creation_date_time: Some(created()),
            ..OriginalPaymentInformation::new("PMT-1")
        }
        .with_transaction(cancellation());
        let doc = Camt055Document::new(assignment()).with_original_payment_information(info);
        let xml = doc.to_xml(CamtVersion::V08).unwrap();
        assert!(xml.contains("<NbOfTxs>1</NbOfTxs>"));
        assert!(xml.contains("<OrgnlInstdAmt Ccy=\"EUR\">99.99</OrgnlInstdAmt>"));

        let parsed = Camt055Document::from_xml(&xml).unwrap();
        assert_eq!(parsed, doc);
        assert_eq!(parsed.number_of_transactions(), 1);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_payment_information() {
        assert!(matches!(
            Camt055Document::new(assignment()).validate(),
            Err(Error::Validation { .. })
        ));
    }
}
