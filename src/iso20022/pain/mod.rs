//! pain messages: credit transfer initiation (pain.001), payment reversal
//! (pain.007), direct debit initiation (pain.008) and mandate initiation
//! (pain.009).
//!
//! All four open with a `GrpHdr`. The counters in it (`NbOfTxs`,
//! `CtrlSum`) are computed from the payload on generation and never
//! stored on the documents.

pub mod pain001;
pub mod pain007;
pub mod pain008;
pub mod pain009;

pub use pain001::{CreditTransfer, Pain001Document, PaymentInstruction};
pub use pain007::{OriginalPaymentInformationReversal, Pain007Document, ReversalTransaction};
pub use pain008::{DirectDebit, DirectDebitInstruction, Pain008Document};
pub use pain009::{Mandate, Pain009Document};

use super::blocks::{self, Dialect};
use super::common::{format_date_time, GroupHeader};
use super::{open_document, MessageType, PainType, PainVersion};
use crate::error::{Error, Result};
use crate::types::Amount;
use crate::xml::{Element, XmlBuilder, XmlDocument};
use rust_decimal::Decimal;

pub(crate) use super::camt::DEFAULT_CURRENCY;

/// 2009 schemas (`.001.01` to `.001.03`) use `BIC`, `BICOrBEI` and plain
/// execution dates; the 2019 generation and later use the current names.
pub fn dialect(version: PainVersion) -> Dialect {
    if version >= PainVersion::V06 {
        Dialect::CURRENT
    } else {
        Dialect::LEGACY
    }
}

/// SEPA direct debit sequence (`SeqTp`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceType {
    First,
    Recurring,
    Final,
    OneOff,
}

impl SequenceType {
    pub fn code(&self) -> &'static str {
        match self {
            SequenceType::First => "FRST",
            SequenceType::Recurring => "RCUR",
            SequenceType::Final => "FNAL",
            SequenceType::OneOff => "OOFF",
        }
    }

    pub fn from_code(code: &str) -> Result<Self> {
        match code.trim() {
            "FRST" => Ok(SequenceType::First),
            "RCUR" => Ok(SequenceType::Recurring),
            "FNAL" => Ok(SequenceType::Final),
            "OOFF" => Ok(SequenceType::OneOff),
            other => Err(Error::ParseError(format!("unknown sequence type '{}'", other))),
        }
    }
}

/// Sum of amounts as written to `CtrlSum`.
pub fn control_sum<'a>(amounts: impl IntoIterator<Item = &'a Amount>) -> Decimal {
    amounts.into_iter().map(|a| a.value).sum()
}

pub(crate) fn start(pain_type: PainType, version: PainVersion) -> Result<XmlBuilder> {
    let namespace = pain_type.namespace(version)?;
    let mut b = XmlBuilder::new(namespace);
    b.add_element(pain_type.root_element());
    Ok(b)
}

pub(crate) fn finish(mut b: XmlBuilder) -> Result<String> {
    b.end();
    b.get_xml()
}

pub(crate) fn open(xml: &str, pain_type: PainType) -> Result<XmlDocument> {
    open_document(xml, MessageType::Pain(pain_type))
}

pub(crate) fn message_root(doc: &XmlDocument, pain_type: PainType) -> Result<&Element> {
    blocks::message_root(doc, pain_type.root_element())
}

/// `GrpHdr`; the counters are skipped for messages without them (pain.009).
pub(crate) fn add_group_header(
    b: &mut XmlBuilder,
    header: &GroupHeader,
    counters: Option<(usize, Decimal)>,
    dialect: Dialect,
) {
    b.add_element("GrpHdr");
    b.add_child("MsgId", &header.message_id);
    b.add_child("CreDtTm", &format_date_time(&header.creation_date_time));
    if let Some((transactions, sum)) = counters {
        b.add_child("NbOfTxs", &transactions.to_string());
        b.add_child("CtrlSum", &format!("{:.2}", sum));
    }
    if let Some(party) = &header.initiating_party {
        blocks::add_party(b, "InitgPty", party, dialect);
    }
    b.end();
}

pub(crate) fn read_group_header(doc: &XmlDocument, root: &Element) -> Result<GroupHeader> {
    let el = doc.required_node(Some(root), "GrpHdr", "group header (GrpHdr)")?;
    Ok(GroupHeader {
        message_id: blocks::required_text(doc, el, "MsgId")?,
        creation_date_time: blocks::required_date_time(doc, el, "CreDtTm")?,
        initiating_party: blocks::read_optional_party(doc, el, "InitgPty")?,
    })
}

/// `PmtTpInf` with the SEPA service level, an optional local instrument and
/// an optional sequence type.
pub(crate) fn add_payment_type(
    b: &mut XmlBuilder,
    service_level: Option<&str>,
    local_instrument: Option<&str>,
    sequence_type: Option<SequenceType>,
) {
    if service_level.is_none() && local_instrument.is_none() && sequence_type.is_none() {
        return;
    }
    b.add_element("PmtTpInf");
    if let Some(level) = service_level {
        b.add_element("SvcLvl").add_child("Cd", level).end();
    }
    if let Some(instrument) = local_instrument {
        b.add_element("LclInstrm").add_child("Cd", instrument).end();
    }
    b.add_optional_child("SeqTp", sequence_type.map(|s| s.code()));
    b.end();
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::iso20022::common::GroupHeader;
    use crate::types::{Account, FinancialInstitution, Party};
    use chrono::{NaiveDate, NaiveDateTime};

    pub fn created() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(10, 0, 0).unwrap()
    }

    pub fn header(message_id: &str) -> GroupHeader {
        GroupHeader::new(message_id, created()).with_initiating_party(Party::named("ACME GmbH"))
    }

    pub fn acme() -> (Party, Account, FinancialInstitution) {
        (
            Party::named("ACME GmbH"),
            Account::iban("DE89370400440532013000"),
            FinancialInstitution::bic("COBADEFFXXX"),
        )
    }

    pub fn supplier() -> (Party, Account, FinancialInstitution) {
        (
            Party::named("Lieferant AG"),
            Account::iban("DE02100100100006820101"),
            FinancialInstitution::bic("PBNKDEFFXXX"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_by_version() {
        assert_eq!(dialect(PainVersion::V03), Dialect::LEGACY);
        assert_eq!(dialect(PainVersion::V09), Dialect::CURRENT);
    }

    #[test]
    fn test_sequence_type_codes() {
        for seq in [
            SequenceType::First,
            SequenceType::Recurring,
            SequenceType::Final,
            SequenceType::OneOff,
        ] {
            assert_eq!(SequenceType::from_code(seq.code()).unwrap(), seq);
        }
        assert!(SequenceType::from_code("XXXX").is_err());
    }

    #[test]
    fn test_control_sum() {
        let amounts = [
            Amount::new(Decimal::new(1050, 2), "EUR"),
            Amount::new(Decimal::new(2, 0), "EUR"),
        ];
        assert_eq!(control_sum(&amounts), Decimal::new(1250, 2));
    }
}
