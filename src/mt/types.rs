//! Entities shared by the MT9xx message types.

use super::codec::{breaks_message, check_field_text};
use super::purpose::SepaReferences;
use crate::error::{Error, Result};
use crate::gvc::GvcCode;
use crate::types::{round_amount, DebitCredit};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const SUPPLEMENTARY_DETAILS_LENGTH: usize = 34;

/// Role of a balance within a statement, which fixes its tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BalanceKind {
    /// `:60F:` first opening balance
    Opening,
    /// `:60M:` intermediate opening balance
    IntermediateOpening,
    /// `:62F:` final closing balance
    Closing,
    /// `:62M:` intermediate closing balance
    IntermediateClosing,
    /// `:64:` closing available balance
    ClosingAvailable,
    /// `:65:` forward available balance
    ForwardAvailable,
}

impl BalanceKind {
    pub fn tag(&self) -> &'static str {
        match self {
            BalanceKind::Opening => "60F",
            BalanceKind::IntermediateOpening => "60M",
            BalanceKind::Closing => "62F",
            BalanceKind::IntermediateClosing => "62M",
            BalanceKind::ClosingAvailable => "64",
            BalanceKind::ForwardAvailable => "65",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "60F" => Some(BalanceKind::Opening),
            "60M" => Some(BalanceKind::IntermediateOpening),
            "62F" => Some(BalanceKind::Closing),
            "62M" => Some(BalanceKind::IntermediateClosing),
            "64" => Some(BalanceKind::ClosingAvailable),
            "65" => Some(BalanceKind::ForwardAvailable),
            _ => None,
        }
    }

    pub fn is_opening(&self) -> bool {
        matches!(self, BalanceKind::Opening | BalanceKind::IntermediateOpening)
    }

    pub fn is_closing(&self) -> bool {
        matches!(self, BalanceKind::Closing | BalanceKind::IntermediateClosing)
    }
}

/// A statement balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub kind: BalanceKind,
    pub debit_credit: DebitCredit,
    pub date: NaiveDate,
    pub currency: String,
    /// Always non-negative; the sign is carried by `debit_credit`.
    pub amount: Decimal,
}

impl Balance {
    pub fn new(
        kind: BalanceKind,
        debit_credit: DebitCredit,
        date: NaiveDate,
        currency: impl Into<String>,
        amount: Decimal,
    ) -> Self {
        Self {
            kind,
            debit_credit,
            date,
            currency: currency.into(),
            amount: round_amount(amount.abs()),
        }
    }

    /// Balance from a signed amount; negative values are debit balances.
    pub fn from_signed(kind: BalanceKind, date: NaiveDate, currency: impl Into<String>, amount: Decimal) -> Self {
        let debit_credit = if amount.is_sign_negative() && !amount.is_zero() {
            DebitCredit::Debit
        } else {
            DebitCredit::Credit
        };
        Self::new(kind, debit_credit, date, currency, amount)
    }

    pub fn signed_amount(&self) -> Decimal {
        match self.debit_credit {
            DebitCredit::Debit => -self.amount,
            DebitCredit::Credit => self.amount,
        }
    }

    pub fn with_kind(&self, kind: BalanceKind) -> Self {
        Self { kind, ..self.clone() }
    }
}

/// Content of the `:86:` narrative field.
///
/// In SWIFT plain output only `text` is written (falling back to
/// `booking_text`); the DATEV layout carries every field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purpose {
    pub gvc: Option<GvcCode>,
    /// Raw three digit code when it is outside the [`GvcCode`] catalogue.
    pub gvc_code: Option<String>,
    /// `?00` booking text, e.g. `SEPA-UEBERWEISUNG`
    pub booking_text: Option<String>,
    /// `?10` primanota
    pub primanota: Option<String>,
    /// `?20`–`?29`, `?60`–`?63` purpose lines
    pub text: Option<String>,
    /// `?30`
    pub counterparty_bic: Option<String>,
    /// `?31`
    pub counterparty_iban: Option<String>,
    /// `?32`/`?33`
    pub counterparty_name: Option<String>,
    /// `?34`
    pub text_key_extension: Option<String>,
}

impl Purpose {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The free-text fields with their names.
    pub fn text_fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("booking text", &self.booking_text),
            ("primanota", &self.primanota),
            ("purpose", &self.text),
            ("counterparty BIC", &self.counterparty_bic),
            ("counterparty IBAN", &self.counterparty_iban),
            ("counterparty name", &self.counterparty_name),
            ("text key extension", &self.text_key_extension),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
    }

    /// SEPA keyword references embedded in the purpose text.
    pub fn sepa_references(&self) -> SepaReferences {
        SepaReferences::parse(self.text.as_deref().unwrap_or(""))
    }
}

/// One `:61:` statement line with its `:86:` narrative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    booking_date: NaiveDate,
    valuta_date: Option<NaiveDate>,
    amount: Decimal,
    debit_credit: DebitCredit,
    currency: String,
    reversal: bool,
    transaction_code: String,
    customer_reference: String,
    bank_reference: Option<String>,
    supplementary_details: Option<String>,
    purpose: Option<Purpose>,
}

impl Transaction {
    pub const DEFAULT_TRANSACTION_CODE: &'static str = "NMSC";
    pub const NO_REFERENCE: &'static str = "NONREF";
    pub const REFERENCE_LENGTH: usize = 16;

    /// The amount is stored as its absolute value rounded to two places.
    pub fn new(booking_date: NaiveDate, amount: Decimal, debit_credit: DebitCredit, currency: impl Into<String>) -> Self {
        Self {
            booking_date,
            valuta_date: None,
            amount: round_amount(amount.abs()),
            debit_credit,
            currency: currency.into(),
            reversal: false,
            transaction_code: Self::DEFAULT_TRANSACTION_CODE.to_string(),
            customer_reference: Self::NO_REFERENCE.to_string(),
            bank_reference: None,
            supplementary_details: None,
            purpose: None,
        }
    }

    pub fn with_valuta_date(self, valuta_date: NaiveDate) -> Self {
        Self {
            valuta_date: Some(valuta_date),
            ..self
        }
    }

    pub fn with_reversal(self, reversal: bool) -> Self {
        Self { reversal, ..self }
    }

    /// Four character transaction type, e.g. `NTRF`.
    pub fn with_transaction_code(self, code: impl Into<String>) -> Result<Self> {
        let code = code.into();
        if code.chars().count() != 4 || !code.is_ascii() {
            return Err(Error::InvalidArgument(format!(
                "transaction type must be 4 characters: '{}'",
                code
            )));
        }
        Ok(Self {
            transaction_code: code,
            ..self
        })
    }

    pub fn with_customer_reference(self, reference: impl Into<String>) -> Result<Self> {
        let reference = check_reference("customer reference", reference.into())?;
        Ok(Self {
            customer_reference: reference,
            ..self
        })
    }

    pub fn with_bank_reference(self, reference: impl Into<String>) -> Result<Self> {
        let reference = check_reference("bank reference", reference.into())?;
        Ok(Self {
            bank_reference: Some(reference),
            ..self
        })
    }

    /// Free text written on the line after `:61:`, cut to 34 characters.
    pub fn with_supplementary_details(self, details: impl Into<String>) -> Result<Self> {
        let details: String = details.into();
        check_field_text("supplementary details", &details)?;
        let details: String = details.chars().take(SUPPLEMENTARY_DETAILS_LENGTH).collect();
        if breaks_message(&details) {
            return Err(Error::InvalidArgument(format!(
                "supplementary details would start a new field: '{}'",
                details
            )));
        }
        Ok(Self {
            supplementary_details: Some(details),
            ..self
        })
    }

    pub fn with_purpose(self, purpose: Purpose) -> Self {
        Self {
            purpose: Some(purpose),
            ..self
        }
    }

    pub fn booking_date(&self) -> NaiveDate {
        self.booking_date
    }

    pub fn valuta_date(&self) -> Option<NaiveDate> {
        self.valuta_date
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Negative for debits.
    pub fn signed_amount(&self) -> Decimal {
        match self.debit_credit {
            DebitCredit::Debit => -self.amount,
            DebitCredit::Credit => self.amount,
        }
    }

    pub fn debit_credit(&self) -> DebitCredit {
        self.debit_credit
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn is_reversal(&self) -> bool {
        self.reversal
    }

    pub fn transaction_code(&self) -> &str {
        &self.transaction_code
    }

    pub fn customer_reference(&self) -> &str {
        &self.customer_reference
    }

    pub fn bank_reference(&self) -> Option<&str> {
        self.bank_reference.as_deref()
    }

    pub fn supplementary_details(&self) -> Option<&str> {
        self.supplementary_details.as_deref()
    }

    pub fn purpose(&self) -> Option<&Purpose> {
        self.purpose.as_ref()
    }
}

/// `16x` references: at most 16 characters, no `//` and no line breaks.
fn check_reference(field: &str, reference: String) -> Result<String> {
    if reference.is_empty() || reference.contains("//") || reference.contains(['\r', '\n']) {
        return Err(Error::InvalidArgument(format!("invalid {}: '{}'", field, reference)));
    }
    if reference.chars().count() > Transaction::REFERENCE_LENGTH {
        return Err(Error::InvalidArgument(format!(
            "{} longer than {} characters: '{}'",
            field,
            Transaction::REFERENCE_LENGTH,
            reference
        )));
    }
    Ok(reference)
}

/// Validate content of a header tag such as `:20:` or `:25:`.
pub(crate) fn check_tag_content(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidArgument(format!("{} must not be empty", field)));
    }
    if value.contains(['\r', '\n']) || value.starts_with(':') {
        return Err(Error::InvalidArgument(format!(
            "{} contains a field separator: '{}'",
            field,
            value.escape_debug()
        )));
    }
    Ok(())
}
