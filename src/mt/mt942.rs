//! MT942 interim transaction report.

use super::codec;
use super::mt940::{parse_transactions, transaction_lines};
use super::types::{check_tag_content, Transaction};
use super::{MtDocument, MtOptions};
use crate::error::{Error, Result};
use crate::types::DebitCredit;
use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use std::io::{Read, Write};
use tracing::debug;

/// `:34F:` floor limit. Without a mark it applies to debits and credits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloorLimit {
    pub currency: String,
    pub debit_credit: Option<DebitCredit>,
    pub amount: Decimal,
}

impl FloorLimit {
    fn format(&self) -> String {
        format!(
            ":34F:{}{}{}",
            self.currency,
            self.debit_credit.map_or("", |dc| dc.mt_code()),
            codec::format_amount(self.amount)
        )
    }

    fn parse(field: &codec::Field) -> Result<Self> {
        let content = field.joined();
        let content = content.trim();
        if content.len() < 4 || !content.is_ascii() {
            return Err(Error::MtParseError {
                line: field.line,
                message: format!("invalid floor limit '{}'", content),
            });
        }
        let currency = content[..3].to_string();
        let rest = &content[3..];
        let (debit_credit, amount) = match rest[..1].parse::<DebitCredit>() {
            Ok(dc) => (Some(dc), &rest[1..]),
            Err(_) => (None, rest),
        };
        Ok(Self {
            currency,
            debit_credit,
            amount: codec::parse_amount(amount)?,
        })
    }
}

/// An MT942 interim report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mt942Document {
    reference_id: String,
    related_reference: Option<String>,
    account_id: String,
    statement_number: String,
    currency: String,
    creation_date_time: DateTime<FixedOffset>,
    floor_limits: Vec<FloorLimit>,
    transactions: Vec<Transaction>,
}

impl Mt942Document {
    pub fn new(
        reference_id: impl Into<String>,
        account_id: impl Into<String>,
        statement_number: impl Into<String>,
        currency: impl Into<String>,
        creation_date_time: DateTime<FixedOffset>,
    ) -> Result<Self> {
        let reference_id = reference_id.into();
        let account_id = account_id.into();
        let statement_number = statement_number.into();
        check_tag_content("reference id", &reference_id)?;
        check_tag_content("account id", &account_id)?;
        check_tag_content("statement number", &statement_number)?;
        Ok(Self {
            reference_id,
            related_reference: None,
            account_id,
            statement_number,
            currency: currency.into(),
            creation_date_time,
            floor_limits: Vec::new(),
            transactions: Vec::new(),
        })
    }

    pub fn with_related_reference(self, reference: impl Into<String>) -> Result<Self> {
        let reference = reference.into();
        check_tag_content("related reference", &reference)?;
        Ok(Self {
            related_reference: Some(reference),
            ..self
        })
    }

    /// At most two limits: one for debits and one for credits.
    pub fn with_floor_limit(mut self, limit: FloorLimit) -> Result<Self> {
        if self.floor_limits.len() >= 2 {
            return Err(Error::InvalidArgument("MT942 carries at most two floor limits".to_string()));
        }
        self.floor_limits.push(limit);
        Ok(self)
    }

    pub fn with_transaction(mut self, transaction: Transaction) -> Self {
        self.transactions.push(transaction);
        self
    }

    pub fn reference_id(&self) -> &str {
        &self.reference_id
    }

    pub fn related_reference(&self) -> Option<&str> {
        self.related_reference.as_deref()
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn statement_number(&self) -> &str {
        &self.statement_number
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn creation_date_time(&self) -> &DateTime<FixedOffset> {
        &self.creation_date_time
    }

    pub fn floor_limits(&self) -> &[FloorLimit] {
        &self.floor_limits
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    fn summary(&self, debit_credit: DebitCredit) -> (usize, Decimal) {
        self.transactions
            .iter()
            .filter(|tx| tx.debit_credit() == debit_credit)
            .fold((0, Decimal::ZERO), |(count, sum), tx| (count + 1, sum + tx.amount()))
    }

    /// Number and sum of debit entries (`:90D:`).
    pub fn debit_summary(&self) -> (usize, Decimal) {
        self.summary(DebitCredit::Debit)
    }

    /// Number and sum of credit entries (`:90C:`).
    pub fn credit_summary(&self) -> (usize, Decimal) {
        self.summary(DebitCredit::Credit)
    }

    /// Parse an MT942 message. `:90D:`/`:90C:` are recomputed from the
    /// transactions rather than stored.
    pub fn parse(text: &str) -> Result<Self> {
        let fields = codec::split_fields(text)?;
        let reference_id = codec::required(&fields, "20", "transaction reference")?;
        let account_id = codec::required(&fields, "25", "account identification")?;
        let creation = codec::required(&fields, "13D", "date/time indication")?;
        let creation_date_time = codec::parse_date_time(&creation)?;

        let floor_limits = fields
            .iter()
            .filter(|f| f.tag == "34F")
            .map(FloorLimit::parse)
            .collect::<Result<Vec<_>>>()?;
        let currency = floor_limits
            .first()
            .map(|l| l.currency.clone())
            .or_else(|| {
                fields
                    .iter()
                    .find(|f| f.tag == "90D" || f.tag == "90C")
                    .and_then(|f| summary_currency(&f.joined()))
            })
            .unwrap_or_default();

        let transactions = parse_transactions(&fields, &currency)?;
        let doc = Self {
            reference_id,
            related_reference: codec::find(&fields, "21").map(|f| f.joined().trim().to_string()),
            account_id,
            statement_number: codec::find(&fields, "28C")
                .map(|f| f.joined().trim().to_string())
                .unwrap_or_default(),
            currency,
            creation_date_time,
            floor_limits,
            transactions,
        };
        if let Some(field) = codec::find(&fields, "90D") {
            let (count, _) = doc.debit_summary();
            if !field.content.starts_with(&count.to_string()) {
                debug!(field = %field.content, count, "debit summary does not match entries");
            }
        }
        Ok(doc)
    }

    pub fn from_read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::parse(&text)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W, options: &MtOptions) -> Result<()> {
        let text = Mt942Generator::new(options.clone()).generate(self)?;
        writer.write_all(text.as_bytes())?;
        Ok(())
    }
}

fn summary_currency(content: &str) -> Option<String> {
    let rest = content.trim().trim_start_matches(|c: char| c.is_ascii_digit());
    let currency: String = rest.chars().take(3).collect();
    if currency.len() == 3 && currency.chars().all(|c| c.is_ascii_uppercase()) {
        Some(currency)
    } else {
        None
    }
}

impl TryFrom<MtDocument> for Mt942Document {
    type Error = Error;

    fn try_from(doc: MtDocument) -> Result<Self> {
        match doc {
            MtDocument::Mt942(doc) => Ok(doc),
            other => Err(Error::InvalidArgument(format!("expected MT942, got {}", other.mt_type()))),
        }
    }
}

/// Writes [`Mt942Document`]s.
#[derive(Debug, Clone, Default)]
pub struct Mt942Generator {
    options: MtOptions,
}

impl Mt942Generator {
    pub fn new(options: MtOptions) -> Self {
        Self { options }
    }

    pub fn generate_document(&self, doc: &MtDocument) -> Result<String> {
        match doc {
            MtDocument::Mt942(doc) => self.generate(doc),
            other => Err(Error::InvalidArgument(format!(
                "MT942 generator cannot write {}",
                other.mt_type()
            ))),
        }
    }

    pub fn generate(&self, doc: &Mt942Document) -> Result<String> {
        let mut lines = vec![format!(":20:{}", doc.reference_id)];
        if let Some(related) = &doc.related_reference {
            lines.push(format!(":21:{}", related));
        }
        lines.push(format!(":25:{}", doc.account_id));
        lines.push(format!(":28C:{}", doc.statement_number));
        if doc.floor_limits.is_empty() {
            lines.push(format!(":34F:{}{}", doc.currency, codec::format_amount(Decimal::ZERO)));
        }
        lines.extend(doc.floor_limits.iter().map(FloorLimit::format));
        lines.push(format!(":13D:{}", codec::format_date_time(&doc.creation_date_time)));
        lines.extend(transaction_lines(&doc.transactions, &self.options)?);

        let (debit_count, debit_sum) = doc.debit_summary();
        lines.push(format!(":90D:{}{}{}", debit_count, doc.currency, codec::format_amount(debit_sum)));
        let (credit_count, credit_sum) = doc.credit_summary();
        lines.push(format!(":90C:{}{}{}", credit_count, doc.currency, codec::format_amount(credit_sum)));
        Ok(codec::assemble(&lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn created() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2025-01-01T10:30:00+01:00").unwrap()
    }

    fn report() -> Mt942Document {
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        Mt942Document::new("INTRA1", "DE0012", "7", "EUR", created())
            .unwrap()
            .with_transaction(Transaction::new(date, Decimal::new(1000, 2), DebitCredit::Debit, "EUR"))
            .with_transaction(Transaction::new(date, Decimal::new(2550, 2), DebitCredit::Debit, "EUR"))
            .with_transaction(Transaction::new(date, Decimal::new(99, 0), DebitCredit::Credit, "EUR"))
    }

    #[test]
    fn test_generate_summaries() {
        let text = Mt942Generator::default().generate(&report()).unwrap();
        assert!(text.contains("\r\n:34F:EUR0,00\r\n:13D:2501011030+0100\r\n"));
        assert!(text.contains("\r\n:90D:2EUR35,50\r\n:90C:1EUR99,00\r\n-"));
    }

    #[test]
    fn test_round_trip() {
        let doc = report()
            .with_floor_limit(FloorLimit {
                currency: "EUR".into(),
                debit_credit: Some(DebitCredit::Debit),
                amount: Decimal::new(100, 0),
            })
            .unwrap();
        let text = Mt942Generator::default().generate(&doc).unwrap();
        assert!(text.contains(":34F:EURD100,00"));

        let parsed = Mt942Document::parse(&text).unwrap();
        assert_eq!(parsed.creation_date_time(), &created());
        assert_eq!(parsed.floor_limits(), doc.floor_limits());
        assert_eq!(parsed.debit_summary(), (2, Decimal::new(3550, 2)));
        assert_eq!(parsed.currency(), "EUR");
        assert_eq!(parsed.transactions().len(), 3);
    }

    #[test]
    fn test_missing_creation_time() {
        let err = Mt942Document::parse(":20:A\r\n:25:B\r\n:34F:EUR0,\r\n-").unwrap_err();
        assert!(matches!(err, Error::MissingField(_)));
    }

    #[test]
    fn test_too_many_floor_limits() {
        let limit = FloorLimit {
            currency: "EUR".into(),
            debit_credit: None,
            amount: Decimal::ZERO,
        };
        let doc = report()
            .with_floor_limit(limit.clone())
            .unwrap()
            .with_floor_limit(limit.clone())
            .unwrap();
        assert!(doc.with_floor_limit(limit).is_err());
    }
}
