//! pain.007 CustomerPaymentReversal: the creditor reverses collections of
//! an earlier pain.008.

use super::{add_group_header, control_sum, dialect, finish, message_root, open, read_group_header, start, DEFAULT_CURRENCY};
use crate::error::{Error, Result};
use crate::iso20022::blocks::{self, NOT_PROVIDED};
use crate::iso20022::common::{
    format_date_time, validate_amount, validate_max35, validate_optional_max35, GroupHeader,
};
use crate::iso20022::{PainType, PainVersion};
use crate::types::Amount;
use crate::xml::{Element, XmlBuilder, XmlDocument};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;

/// One reversed collection (`TxInf`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReversalTransaction {
    pub reversal_id: Option<String>,
    pub original_instruction_id: Option<String>,
    pub original_end_to_end_id: Option<String>,
    pub original_instructed_amount: Option<Amount>,
    /// `RvsdInstdAmt`, counted in `CtrlSum`.
    pub reversed_amount: Amount,
    /// `RvslRsnInf/Rsn/Cd`, e.g. `MS02`, `AM05`.
    pub reason_code: Option<String>,
    pub additional_information: Option<String>,
}

impl ReversalTransaction {
    pub fn new(reversed_amount: Amount) -> Self {
        Self {
            reversal_id: None,
            original_instruction_id: None,
            original_end_to_end_id: None,
            original_instructed_amount: None,
            reversed_amount,
            reason_code: None,
            additional_information: None,
        }
    }
}

/// `OrgnlPmtInfAndRvsl`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalPaymentInformationReversal {
    pub reversal_payment_information_id: Option<String>,
    pub original_payment_information_id: String,
    pub transactions: Vec<ReversalTransaction>,
}

impl OriginalPaymentInformationReversal {
    pub fn new(original_payment_information_id: impl Into<String>) -> Self {
        Self {
            reversal_payment_information_id: None,
            original_payment_information_id: original_payment_information_id.into(),
            transactions: Vec::new(),
        }
    }

    pub fn with_transaction(&self, transaction: ReversalTransaction) -> Self {
        let mut info = self.clone();
        info.transactions.push(transaction);
        info
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pain007Document {
    pub group_header: GroupHeader,
    pub original_message_id: String,
    /// Defaults to `NOTPROVIDED` on output, typically `pain.008.001.02`.
    pub original_message_name_id: Option<String>,
    pub original_creation_date_time: Option<NaiveDateTime>,
    pub payment_informations: Vec<OriginalPaymentInformationReversal>,
}

impl Pain007Document {
    pub fn new(group_header: GroupHeader, original_message_id: impl Into<String>) -> Self {
        Self {
            group_header,
            original_message_id: original_message_id.into(),
            original_message_name_id: None,
            original_creation_date_time: None,
            payment_informations: Vec::new(),
        }
    }

    pub fn with_original_payment_information(&self, info: OriginalPaymentInformationReversal) -> Self {
        let mut doc = self.clone();
        doc.payment_informations.push(info);
        doc
    }

    fn transactions(&self) -> impl Iterator<Item = &ReversalTransaction> {
        self.payment_informations.iter().flat_map(|p| p.transactions.iter())
    }

    pub fn number_of_transactions(&self) -> usize {
        self.transactions().count()
    }

    pub fn control_sum(&self) -> Decimal {
        control_sum(self.transactions().map(|t| &t.reversed_amount))
    }

    pub fn to_xml(&self, version: PainVersion) -> Result<String> {
        let dialect = dialect(version);
        let mut b = start(PainType::Pain007, version)?;
        add_group_header(
            &mut b,
            &self.group_header,
            Some((self.number_of_transactions(), self.control_sum())),
            dialect,
        );
        b.add_element("OrgnlGrpInf");
        b.add_child("OrgnlMsgId", &self.original_message_id);
        b.add_child(
            "OrgnlMsgNmId",
            self.original_message_name_id.as_deref().unwrap_or(NOT_PROVIDED),
        );
        if let Some(created) = &self.original_creation_date_time {
            b.add_child("OrgnlCreDtTm", &format_date_time(created));
        }
        b.end();
        for info in &self.payment_informations {
            add_payment_information(&mut b, info);
        }
        finish(b)
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        let doc = open(xml, PainType::Pain007)?;
        let root = message_root(&doc, PainType::Pain007)?;
        let group = doc.required_node(Some(root), "OrgnlGrpInf", "original group (OrgnlGrpInf)")?;
        Ok(Self {
            group_header: read_group_header(&doc, root)?,
            original_message_id: blocks::required_text(&doc, group, "OrgnlMsgId")?,
            original_message_name_id: blocks::text(&doc, group, "OrgnlMsgNmId")?.filter(|n| n != NOT_PROVIDED),
            original_creation_date_time: blocks::optional_date_time(&doc, group, "OrgnlCreDtTm")?,
            payment_informations: blocks::children(&doc, root, "OrgnlPmtInfAndRvsl")?
                .into_iter()
                .map(|el| read_payment_information(&doc, el))
                .collect::<Result<Vec<_>>>()?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.group_header.validate()?;
        validate_max35("OrgnlMsgId", &self.original_message_id)?;
        if self.number_of_transactions() == 0 {
            return Err(Error::validation("OrgnlPmtInfAndRvsl/TxInf", "at least one is required"));
        }
        for info in &self.payment_informations {
            validate_max35("OrgnlPmtInfId", &info.original_payment_information_id)?;
            for tx in &info.transactions {
                validate_optional_max35("RvslId", tx.reversal_id.as_deref())?;
                validate_optional_max35("OrgnlEndToEndId", tx.original_end_to_end_id.as_deref())?;
                validate_amount("RvsdInstdAmt", &tx.reversed_amount)?;
            }
        }
        Ok(())
    }
}

xml_io!(Pain007Document, PainVersion);

fn add_payment_information(b: &mut XmlBuilder, info: &OriginalPaymentInformationReversal) {
    b.add_element("OrgnlPmtInfAndRvsl");
    b.add_optional_child("RvslPmtInfId", info.reversal_payment_information_id.as_deref());
    b.add_child("OrgnlPmtInfId", &info.original_payment_information_id);
    for tx in &info.transactions {
        b.add_element("TxInf");
        b.add_optional_child("RvslId", tx.reversal_id.as_deref())
            .add_optional_child("OrgnlInstrId", tx.original_instruction_id.as_deref())
            .add_optional_child("OrgnlEndToEndId", tx.original_end_to_end_id.as_deref());
        blocks::add_optional_amount(b, "OrgnlInstdAmt", tx.original_instructed_amount.as_ref());
        blocks::add_amount(b, "RvsdInstdAmt", &tx.reversed_amount);
        blocks::add_reason(b, "RvslRsnInf", tx.reason_code.as_deref(), tx.additional_information.as_deref());
        b.end();
    }
    b.end();
}

fn read_payment_information(doc: &XmlDocument, el: &Element) -> Result<OriginalPaymentInformationReversal> {
    let transactions = blocks::children(doc, el, "TxInf")?
        .into_iter()
        .map(|tx| {
            let (reason_code, additional_information) = blocks::read_reason(doc, tx, "RvslRsnInf")?;
            Ok(ReversalTransaction {
                reversal_id: blocks::text(doc, tx, "RvslId")?,
                original_instruction_id: blocks::text(doc, tx, "OrgnlInstrId")?,
                original_end_to_end_id: blocks::text(doc, tx, "OrgnlEndToEndId")?,
                original_instructed_amount: blocks::optional_amount(doc, tx, "OrgnlInstdAmt", DEFAULT_CURRENCY)?,
                reversed_amount: doc.amount_with_currency(Some(tx), "RvsdInstdAmt", DEFAULT_CURRENCY)?,
                reason_code,
                additional_information,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(OriginalPaymentInformationReversal {
        reversal_payment_information_id: blocks::text(doc, el, "RvslPmtInfId")?,
        original_payment_information_id: blocks::required_text(doc, el, "OrgnlPmtInfId")?,
        transactions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iso20022::pain::fixtures::{created, header};
    use pretty_assertions::assert_eq;

    fn reversal() -> ReversalTransaction {
        ReversalTransaction {
            reversal_id: Some("RVSL-1".into()),
            original_end_to_end_id: Some("E2E-DD-1".into()),
            original_instructed_amount: Some(Amount::new(Decimal::new(4999, 2), "EUR")),
            reason_code: Some("MS02".into()),
            additional_information: Some("Doppelte Einreichung".into()),
            ..ReversalTransaction::new(Amount::new(Decimal::new(4999, 2), "EUR"))
        }
    }

    fn document() -> Pain007Document {
        let info = OriginalPaymentInformationReversal::new("DD-1").with_transaction(reversal());
        Pain007Document {
            original_message_name_id: Some("pain.008.001.02".into()),
            original_creation_date_time: Some(created()),
            ..Pain007Document::new(header("RVSL-MSG-1"), "DD-MSG-1")
        }
        .with_original_payment_information(info)
    }

    #[test]
    fn test_round_trip() {
        let doc = document();
        let xml = doc.to_xml(PainVersion::V02).unwrap();
        assert!(xml.contains("<CtrlSum>49.99</CtrlSum>"));
        assert!(xml.contains("<RvsdInstdAmt Ccy=\"EUR\">49.99</RvsdInstdAmt>"));
        assert_eq!(Pain007Document::from_xml(&xml).unwrap(), doc);
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn test_missing_name_id_written_as_not_provided() {
        let mut doc = document();
        doc.original_message_name_id = None;
        let xml = doc.to_xml(PainVersion::V09).unwrap();
        assert!(xml.contains("<OrgnlMsgNmId>NOTPROVIDED</OrgnlMsgNmId>"));
        assert_eq!(Pain007Document::from_xml(&xml).unwrap().original_message_name_id, None);
    }

    #[test]
    fn test_validate_requires_transactions() {
        let doc = Pain007Document::new(header("RVSL-MSG-1"), "DD-MSG-1");
        assert!(matches!(doc.validate(), Err(Error::Validation { .. })));
    }
}
