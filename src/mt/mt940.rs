//! MT940 customer statement.
//!
//! MT940 is the SWIFT end-of-day account statement: a header, an opening
//! balance, the statement lines (`:61:` with their `:86:` narrative) and
//! the closing balances.

use super::codec::{self, Field};
use super::purpose::{format_purpose, parse_purpose};
use super::types::{check_tag_content, Balance, BalanceKind, Transaction};
use super::{MtDocument, MtOptions};
use crate::error::{Error, Result};
use chrono::{DateTime, FixedOffset};
use std::io::{Read, Write};
use tracing::debug;

/// An MT940 statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mt940Document {
    reference_id: String,
    related_reference: Option<String>,
    account_id: String,
    statement_number: String,
    currency: String,
    creation_date_time: Option<DateTime<FixedOffset>>,
    opening_balance: Option<Balance>,
    closing_balance: Option<Balance>,
    closing_available_balance: Option<Balance>,
    forward_available_balance: Option<Balance>,
    transactions: Vec<Transaction>,
}

impl Mt940Document {
    /// Fails when `reference_id` or `account_id` cannot be carried in a tag.
    pub fn new(
        reference_id: impl Into<String>,
        account_id: impl Into<String>,
        statement_number: impl Into<String>,
        currency: impl Into<String>,
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
            creation_date_time: None,
            opening_balance: None,
            closing_balance: None,
            closing_available_balance: None,
            forward_available_balance: None,
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

    /// Creation time kept on the document; MT940 has no tag for it.
    pub fn with_creation_date_time(self, created: DateTime<FixedOffset>) -> Self {
        Self {
            creation_date_time: Some(created),
            ..self
        }
    }

    /// `:60F:` or `:60M:`, depending on the balance kind.
    pub fn with_opening_balance(self, balance: Balance) -> Result<Self> {
        if !balance.kind.is_opening() {
            return Err(Error::InvalidArgument(format!("{:?} is not an opening balance", balance.kind)));
        }
        Ok(Self {
            opening_balance: Some(balance),
            ..self
        })
    }

    /// `:62F:` or `:62M:`, depending on the balance kind.
    pub fn with_closing_balance(self, balance: Balance) -> Result<Self> {
        if !balance.kind.is_closing() {
            return Err(Error::InvalidArgument(format!("{:?} is not a closing balance", balance.kind)));
        }
        Ok(Self {
            closing_balance: Some(balance),
            ..self
        })
    }

    pub fn with_closing_available_balance(self, balance: Balance) -> Self {
        Self {
            closing_available_balance: Some(balance.with_kind(BalanceKind::ClosingAvailable)),
            ..self
        }
    }

    pub fn with_forward_available_balance(self, balance: Balance) -> Self {
        Self {
            forward_available_balance: Some(balance.with_kind(BalanceKind::ForwardAvailable)),
            ..self
        }
    }

    pub fn with_transaction(mut self, transaction: Transaction) -> Self {
        self.transactions.push(transaction);
        self
    }

    pub fn with_transactions(mut self, transactions: impl IntoIterator<Item = Transaction>) -> Self {
        self.transactions.extend(transactions);
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

    pub fn creation_date_time(&self) -> Option<&DateTime<FixedOffset>> {
        self.creation_date_time.as_ref()
    }

    pub fn opening_balance(&self) -> Option<&Balance> {
        self.opening_balance.as_ref()
    }

    pub fn closing_balance(&self) -> Option<&Balance> {
        self.closing_balance.as_ref()
    }

    pub fn closing_available_balance(&self) -> Option<&Balance> {
        self.closing_available_balance.as_ref()
    }

    pub fn forward_available_balance(&self) -> Option<&Balance> {
        self.forward_available_balance.as_ref()
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Parse an MT940 message (envelope optional).
    pub fn parse(text: &str) -> Result<Self> {
        let fields = codec::split_fields(text)?;
        let reference_id = codec::required(&fields, "20", "transaction reference")?;
        let account_id = codec::required(&fields, "25", "account identification")?;
        let statement_number = codec::find(&fields, "28C")
            .map(|f| f.joined().trim().to_string())
            .unwrap_or_default();

        let mut balances = Vec::new();
        for field in fields.iter().filter(|f| BalanceKind::from_tag(&f.tag).is_some()) {
            balances.push(codec::parse_balance(field)?);
        }
        let currency = balances.first().map(|b| b.currency.clone()).unwrap_or_default();

        let mut doc = Self {
            reference_id,
            related_reference: codec::find(&fields, "21").map(|f| f.joined().trim().to_string()),
            account_id,
            statement_number,
            currency,
            creation_date_time: None,
            opening_balance: None,
            closing_balance: None,
            closing_available_balance: None,
            forward_available_balance: None,
            transactions: Vec::new(),
        };
        for balance in balances {
            match balance.kind {
                BalanceKind::Opening | BalanceKind::IntermediateOpening => doc.opening_balance = Some(balance),
                BalanceKind::Closing | BalanceKind::IntermediateClosing => doc.closing_balance = Some(balance),
                BalanceKind::ClosingAvailable => doc.closing_available_balance = Some(balance),
                BalanceKind::ForwardAvailable => doc.forward_available_balance = Some(balance),
            }
        }
        doc.transactions = parse_transactions(&fields, &doc.currency)?;
        Ok(doc)
    }

    pub fn from_read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::parse(&text)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W, options: &MtOptions) -> Result<()> {
        let text = Mt940Generator::new(options.clone()).generate(self)?;
        writer.write_all(text.as_bytes())?;
        Ok(())
    }
}

impl TryFrom<MtDocument> for Mt940Document {
    type Error = Error;

    fn try_from(doc: MtDocument) -> Result<Self> {
        match doc {
            MtDocument::Mt940(doc) => Ok(doc),
            other => Err(Error::InvalidArgument(format!("expected MT940, got {}", other.mt_type()))),
        }
    }
}

/// Pair every `:61:` with the `:86:` that follows it.
pub(crate) fn parse_transactions(fields: &[Field], currency: &str) -> Result<Vec<Transaction>> {
    let mut transactions: Vec<Transaction> = Vec::new();
    let mut expects_purpose = false;
    for field in fields {
        match field.tag.as_str() {
            "61" => {
                transactions.push(codec::parse_statement_line(field, currency)?);
                expects_purpose = true;
            }
            "86" if expects_purpose => {
                let purpose = parse_purpose(&field.joined());
                if !purpose.is_empty() {
                    if let Some(tx) = transactions.pop() {
                        transactions.push(tx.with_purpose(purpose));
                    }
                }
                expects_purpose = false;
            }
            "86" => debug!(line = field.line, "statement-level :86: ignored"),
            _ => expects_purpose = false,
        }
    }
    Ok(transactions)
}

/// Statement lines and narratives for `transactions`.
pub(crate) fn transaction_lines(transactions: &[Transaction], options: &MtOptions) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    for tx in transactions {
        lines.extend(codec::statement_lines(tx));
        if let Some(purpose) = tx.purpose().filter(|p| !p.is_empty()) {
            lines.extend(format_purpose(purpose, options)?);
        }
    }
    Ok(lines)
}

/// Writes [`Mt940Document`]s.
#[derive(Debug, Clone, Default)]
pub struct Mt940Generator {
    options: MtOptions,
}

impl Mt940Generator {
    pub fn new(options: MtOptions) -> Self {
        Self { options }
    }

    /// Reject anything but an MT940 document.
    pub fn generate_document(&self, doc: &MtDocument) -> Result<String> {
        match doc {
            MtDocument::Mt940(doc) => self.generate(doc),
            other => Err(Error::InvalidArgument(format!(
                "MT940 generator cannot write {}",
                other.mt_type()
            ))),
        }
    }

    pub fn generate(&self, doc: &Mt940Document) -> Result<String> {
        let mut lines = vec![format!(":20:{}", doc.reference_id)];
        if let Some(related) = &doc.related_reference {
            lines.push(format!(":21:{}", related));
        }
        lines.push(format!(":25:{}", doc.account_id));
        lines.push(format!(":28C:{}", doc.statement_number));

        if let Some(balance) = &doc.opening_balance {
            lines.push(codec::balance_line(balance));
        }
        lines.extend(transaction_lines(&doc.transactions, &self.options)?);
        for balance in [
            &doc.closing_balance,
            &doc.closing_available_balance,
            &doc.forward_available_balance,
        ]
        .into_iter()
        .flatten()
        {
            lines.push(codec::balance_line(balance));
        }
        Ok(codec::assemble(&lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mt::types::Purpose;
    use crate::types::DebitCredit;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    fn statement() -> Mt940Document {
        Mt940Document::new("REF1", "DE0012", "1", "EUR")
            .unwrap()
            .with_opening_balance(Balance::new(
                BalanceKind::Opening,
                DebitCredit::Credit,
                date(),
                "EUR",
                Decimal::new(1000, 0),
            ))
            .unwrap()
            .with_transaction(
                Transaction::new(date(), Decimal::new(50, 0), DebitCredit::Debit, "EUR")
                    .with_purpose(Purpose::text("Rechnung 4711")),
            )
            .with_closing_balance(Balance::new(
                BalanceKind::Closing,
                DebitCredit::Credit,
                date(),
                "EUR",
                Decimal::new(950, 0),
            ))
            .unwrap()
    }

    #[test]
    fn test_generate_statement() {
        let text = Mt940Generator::default().generate(&statement()).unwrap();
        assert_eq!(
            text,
            [
                ":20:REF1",
                ":25:DE0012",
                ":28C:1",
                ":60F:C250101EUR1000,00",
                ":61:2501010101D50,00NMSCNONREF",
                ":86:Rechnung 4711",
                ":62F:C250101EUR950,00",
                "-",
            ]
            .join("\r\n")
        );
    }

    #[test]
    fn test_related_reference_only_when_present() {
        let text = Mt940Generator::default().generate(&statement()).unwrap();
        assert!(!text.contains(":21:"));

        let doc = statement().with_related_reference("REL").unwrap();
        let text = Mt940Generator::default().generate(&doc).unwrap();
        assert!(text.contains("\r\n:21:REL\r\n:25:"));
    }

    #[test]
    fn test_parse_round_trip() {
        let doc = statement();
        let text = Mt940Generator::default().generate(&doc).unwrap();
        let parsed = Mt940Document::parse(&text).unwrap();

        assert_eq!(parsed.reference_id(), "REF1");
        assert_eq!(parsed.account_id(), "DE0012");
        assert_eq!(parsed.statement_number(), "1");
        assert_eq!(parsed.currency(), "EUR");
        assert_eq!(parsed.opening_balance(), doc.opening_balance());
        assert_eq!(parsed.closing_balance(), doc.closing_balance());
        assert_eq!(parsed.transactions().len(), 1);
        let tx = &parsed.transactions()[0];
        assert_eq!(tx.signed_amount(), Decimal::new(-50, 0));
        assert_eq!(tx.valuta_date(), Some(date()));
        assert_eq!(tx.purpose().and_then(|p| p.text.as_deref()), Some("Rechnung 4711"));
    }

    fn statement_with_purpose(text: &str) -> Mt940Document {
        let doc = statement();
        Mt940Document::new("REF1", "DE0012", "1", "EUR")
            .unwrap()
            .with_transaction(
                Transaction::new(date(), Decimal::new(50, 0), DebitCredit::Debit, "EUR").with_purpose(Purpose::text(text)),
            )
            .with_closing_balance(doc.closing_balance().cloned().unwrap())
            .unwrap()
    }

    #[test]
    fn test_narrative_cannot_end_statement_or_open_tags() {
        let ending = format!("{}-", "a".repeat(65));
        let text = Mt940Generator::default().generate(&statement_with_purpose(&ending)).unwrap();
        let parsed = Mt940Document::parse(&text).unwrap();
        assert_eq!(parsed.closing_balance(), statement().closing_balance());
        assert_eq!(parsed.transactions()[0].purpose().and_then(|p| p.text.as_deref()), Some(ending.as_str()));

        let injected = format!("{}:62F:D250101EUR1,00", "a".repeat(65));
        let text = Mt940Generator::default().generate(&statement_with_purpose(&injected)).unwrap();
        assert_eq!(text.split("\r\n").filter(|l| l.starts_with(":62F:")).count(), 1);
        let parsed = Mt940Document::parse(&text).unwrap();
        assert_eq!(parsed.closing_balance(), statement().closing_balance());
        assert_eq!(parsed.transactions()[0].purpose().and_then(|p| p.text.as_deref()), Some(injected.as_str()));

        let result = Mt940Generator::default().generate(&statement_with_purpose("Zeile1\r\n:20:X"));
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_invalid_header_content() {
        assert!(Mt940Document::new("REF\r\n:20:X", "DE0012", "1", "EUR").is_err());
        assert!(Mt940Document::new("REF", ":25:DE", "1", "EUR").is_err());
    }

    #[test]
    fn test_generator_rejects_other_types() {
        let doc = MtDocument::Mt940(statement());
        assert!(Mt940Generator::default().generate_document(&doc).is_ok());

        let confirmation = crate::mt::ConfirmationDocument::new(
            DebitCredit::Credit,
            "REF",
            "REL",
            "DE0012",
            date(),
            "EUR",
            Decimal::ONE,
        )
        .unwrap();
        let err = Mt940Generator::default()
            .generate_document(&MtDocument::Confirmation(confirmation))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_missing_account_fails() {
        let err = Mt940Document::parse(":20:REF\r\n:28C:1\r\n-").unwrap_err();
        assert!(matches!(err, Error::MissingField(_)));
    }

    #[test]
    fn test_wrong_balance_kind_rejected() {
        let balance = Balance::new(BalanceKind::Closing, DebitCredit::Credit, date(), "EUR", Decimal::ONE);
        assert!(Mt940Document::new("R", "A", "1", "EUR")
            .unwrap()
            .with_opening_balance(balance)
            .is_err());
    }
}
