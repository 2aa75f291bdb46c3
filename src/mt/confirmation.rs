//! MT900 confirmation of debit and MT910 confirmation of credit.

use super::codec;
use super::types::check_tag_content;
use super::{MtDocument, MtType};
use crate::error::{Error, Result};
use crate::types::{round_amount, DebitCredit};
use chrono::{DateTime, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use std::io::{Read, Write};

/// Width and line limit of `:72:` and `:50K:`.
const NARRATIVE_WIDTH: usize = 35;
const INFO_MAX_LINES: usize = 6;
const PARTY_MAX_LINES: usize = 4;

/// A debit (MT900) or credit (MT910) confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationDocument {
    debit_credit: DebitCredit,
    reference_id: String,
    related_reference: String,
    account_id: String,
    creation_date_time: Option<DateTime<FixedOffset>>,
    value_date: NaiveDate,
    currency: String,
    amount: Decimal,
    ordering_customer: Vec<String>,
    ordering_institution: Option<String>,
    sender_to_receiver_information: Option<String>,
}

impl ConfirmationDocument {
    pub fn new(
        debit_credit: DebitCredit,
        reference_id: impl Into<String>,
        related_reference: impl Into<String>,
        account_id: impl Into<String>,
        value_date: NaiveDate,
        currency: impl Into<String>,
        amount: Decimal,
    ) -> Result<Self> {
        let reference_id = reference_id.into();
        let related_reference = related_reference.into();
        let account_id = account_id.into();
        check_tag_content("reference id", &reference_id)?;
        check_tag_content("related reference", &related_reference)?;
        check_tag_content("account id", &account_id)?;
        Ok(Self {
            debit_credit,
            reference_id,
            related_reference,
            account_id,
            creation_date_time: None,
            value_date,
            currency: currency.into(),
            amount: round_amount(amount.abs()),
            ordering_customer: Vec::new(),
            ordering_institution: None,
            sender_to_receiver_information: None,
        })
    }

    pub fn with_creation_date_time(self, created: DateTime<FixedOffset>) -> Self {
        Self {
            creation_date_time: Some(created),
            ..self
        }
    }

    /// Name and address lines for `:50K:` (credit confirmations only).
    pub fn with_ordering_customer(self, lines: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            ordering_customer: lines.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    /// BIC for `:52A:`.
    pub fn with_ordering_institution(self, bic: impl Into<String>) -> Self {
        Self {
            ordering_institution: Some(bic.into()),
            ..self
        }
    }

    pub fn with_sender_to_receiver_information(self, text: impl Into<String>) -> Self {
        Self {
            sender_to_receiver_information: Some(text.into()),
            ..self
        }
    }

    pub fn mt_type(&self) -> MtType {
        match self.debit_credit {
            DebitCredit::Debit => MtType::Mt900,
            DebitCredit::Credit => MtType::Mt910,
        }
    }

    pub fn debit_credit(&self) -> DebitCredit {
        self.debit_credit
    }

    pub fn reference_id(&self) -> &str {
        &self.reference_id
    }

    pub fn related_reference(&self) -> &str {
        &self.related_reference
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn creation_date_time(&self) -> Option<&DateTime<FixedOffset>> {
        self.creation_date_time.as_ref()
    }

    pub fn value_date(&self) -> NaiveDate {
        self.value_date
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn ordering_customer(&self) -> &[String] {
        &self.ordering_customer
    }

    pub fn ordering_institution(&self) -> Option<&str> {
        self.ordering_institution.as_deref()
    }

    pub fn sender_to_receiver_information(&self) -> Option<&str> {
        self.sender_to_receiver_information.as_deref()
    }

    /// Parse as MT900 or MT910; the type fixes the direction.
    pub fn parse_as(mt_type: MtType, text: &str) -> Result<Self> {
        let debit_credit = match mt_type {
            MtType::Mt900 => DebitCredit::Debit,
            MtType::Mt910 => DebitCredit::Credit,
            other => {
                return Err(Error::InvalidArgument(format!("{} is not a confirmation", other)));
            }
        };

        let fields = codec::split_fields(text)?;
        let reference_id = codec::required(&fields, "20", "transaction reference")?;
        let related_reference = codec::required(&fields, "21", "related reference")?;
        let account_id = codec::required(&fields, "25", "account identification")?;
        let value = codec::required(&fields, "32A", "value date, currency, amount")?;
        if value.len() < 10 || !value.is_ascii() {
            return Err(Error::ParseError(format!("invalid :32A: '{}'", value)));
        }
        let value_date = codec::parse_date(&value[..6])?;
        let currency = &value[6..9];
        let amount = codec::parse_amount(&value[9..])?;

        let mut doc = Self::new(
            debit_credit,
            reference_id,
            related_reference,
            account_id,
            value_date,
            currency,
            amount,
        )?;
        if let Some(field) = codec::find(&fields, "13D") {
            doc.creation_date_time = Some(codec::parse_date_time(&field.joined())?);
        }
        if let Some(field) = codec::find(&fields, "50K") {
            doc.ordering_customer = field.lines().map(|l| l.trim().to_string()).collect();
        }
        doc.ordering_institution = codec::find(&fields, "52A").map(|f| f.joined().trim().to_string());
        doc.sender_to_receiver_information = codec::find(&fields, "72").map(|f| f.joined());
        Ok(doc)
    }

    pub fn from_read<R: Read>(reader: &mut R, mt_type: MtType) -> Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::parse_as(mt_type, &text)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let text = ConfirmationGenerator::new(self.mt_type())?.generate(self)?;
        writer.write_all(text.as_bytes())?;
        Ok(())
    }
}

impl TryFrom<MtDocument> for ConfirmationDocument {
    type Error = Error;

    fn try_from(doc: MtDocument) -> Result<Self> {
        match doc {
            MtDocument::Confirmation(doc) => Ok(doc),
            other => Err(Error::InvalidArgument(format!(
                "expected MT900/MT910, got {}",
                other.mt_type()
            ))),
        }
    }
}

/// Writes MT900 or MT910, refusing confirmations of the other direction.
#[derive(Debug, Clone)]
pub struct ConfirmationGenerator {
    mt_type: MtType,
}

impl ConfirmationGenerator {
    pub fn new(mt_type: MtType) -> Result<Self> {
        match mt_type {
            MtType::Mt900 | MtType::Mt910 => Ok(Self { mt_type }),
            other => Err(Error::InvalidArgument(format!("{} is not a confirmation", other))),
        }
    }

    pub fn generate_document(&self, doc: &MtDocument) -> Result<String> {
        match doc {
            MtDocument::Confirmation(doc) => self.generate(doc),
            other => Err(Error::InvalidArgument(format!(
                "{} generator cannot write {}",
                self.mt_type,
                other.mt_type()
            ))),
        }
    }

    pub fn generate(&self, doc: &ConfirmationDocument) -> Result<String> {
        if doc.mt_type() != self.mt_type {
            return Err(Error::InvalidArgument(format!(
                "{} generator cannot write a {} confirmation",
                self.mt_type,
                doc.mt_type()
            )));
        }

        let mut lines = vec![
            format!(":20:{}", doc.reference_id),
            format!(":21:{}", doc.related_reference),
            format!(":25:{}", doc.account_id),
        ];
        if let Some(created) = &doc.creation_date_time {
            lines.push(format!(":13D:{}", codec::format_date_time(created)));
        }
        lines.push(format!(
            ":32A:{}{}{}",
            codec::format_date(doc.value_date),
            doc.currency,
            codec::format_amount(doc.amount)
        ));
        if self.mt_type == MtType::Mt910 && !doc.ordering_customer.is_empty() {
            let party: Vec<String> = doc
                .ordering_customer
                .iter()
                .take(PARTY_MAX_LINES)
                .map(|l| l.chars().take(NARRATIVE_WIDTH).collect())
                .collect();
            for (i, line) in party.iter().enumerate() {
                codec::check_field_text("ordering customer", line)?;
                if i == 0 {
                    lines.push(format!(":50K:{}", line));
                } else if codec::breaks_message(line) {
                    return Err(Error::InvalidArgument(format!("ordering customer line '{}' reads as a tag", line)));
                } else {
                    lines.push(line.clone());
                }
            }
        }
        if let Some(bic) = &doc.ordering_institution {
            lines.push(format!(":52A:{}", bic));
        }
        if let Some(info) = &doc.sender_to_receiver_information {
            lines.extend(codec::wrap_field("72", info, NARRATIVE_WIDTH, INFO_MAX_LINES)?);
        }
        Ok(codec::assemble(&lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn credit() -> ConfirmationDocument {
        ConfirmationDocument::new(
            DebitCredit::Credit,
            "C11126A1378",
            "5482ABC",
            "DE0012",
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            "EUR",
            Decimal::new(123456, 2),
        )
        .unwrap()
    }

    #[test]
    fn test_generate_mt910() {
        let doc = credit()
            .with_ordering_customer(["ACME GmbH", "Hauptstr. 1"])
            .with_ordering_institution("COBADEFFXXX")
            .with_sender_to_receiver_information("/REC/INVOICE 4711");
        let text = ConfirmationGenerator::new(MtType::Mt910).unwrap().generate(&doc).unwrap();
        assert_eq!(
            text,
            [
                ":20:C11126A1378",
                ":21:5482ABC",
                ":25:DE0012",
                ":32A:250101EUR1234,56",
                ":50K:ACME GmbH",
                "Hauptstr. 1",
                ":52A:COBADEFFXXX",
                ":72:/REC/INVOICE 4711",
                "-",
            ]
            .join("\r\n")
        );
    }

    #[test]
    fn test_direction_mismatch_rejected() {
        let err = ConfirmationGenerator::new(MtType::Mt900)
            .unwrap()
            .generate(&credit())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(ConfirmationGenerator::new(MtType::Mt940).is_err());
    }

    #[test]
    fn test_round_trip() {
        let doc = credit()
            .with_creation_date_time(DateTime::parse_from_rfc3339("2025-01-01T09:00:00+01:00").unwrap())
            .with_ordering_customer(["ACME GmbH"])
            .with_sender_to_receiver_information("x".repeat(50));
        let text = ConfirmationGenerator::new(MtType::Mt910).unwrap().generate(&doc).unwrap();
        let parsed = ConfirmationDocument::parse_as(MtType::Mt910, &text).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_narrative_never_forms_a_tag() {
        let info = format!("{}:20:FAKE", "x".repeat(35));
        let doc = credit().with_sender_to_receiver_information(info.clone());
        let text = ConfirmationGenerator::new(MtType::Mt910).unwrap().generate(&doc).unwrap();
        assert_eq!(text.split("\r\n").filter(|l| l.starts_with(":20:")).count(), 1);
        let parsed = ConfirmationDocument::parse_as(MtType::Mt910, &text).unwrap();
        assert_eq!(parsed.sender_to_receiver_information(), Some(info.as_str()));

        let doc = credit().with_ordering_customer(["ACME GmbH", "-"]);
        let err = ConfirmationGenerator::new(MtType::Mt910).unwrap().generate(&doc).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_parse_mt900_missing_related_reference() {
        let err = ConfirmationDocument::parse_as(MtType::Mt900, ":20:A\r\n:25:B\r\n:32A:250101EUR1,00\r\n-")
            .unwrap_err();
        assert!(matches!(err, Error::MissingField(_)));
    }
}
