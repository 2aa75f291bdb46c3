//! Value types shared by the MT and ISO 20022 formats.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Debit/Credit indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DebitCredit {
    /// Debit transaction (outgoing).
    Debit,
    /// Credit transaction (incoming).
    Credit,
}

impl FromStr for DebitCredit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "D" | "DBIT" | "DEBIT" => Ok(DebitCredit::Debit),
            "C" | "CRDT" | "CREDIT" => Ok(DebitCredit::Credit),
            _ => Err(format!("Invalid debit/credit indicator: {}", s)),
        }
    }
}

impl DebitCredit {
    /// SWIFT MT mark (`D` / `C`).
    pub fn mt_code(&self) -> &'static str {
        match self {
            DebitCredit::Debit => "D",
            DebitCredit::Credit => "C",
        }
    }

    /// ISO 20022 `CdtDbtInd` code.
    pub fn iso_code(&self) -> &'static str {
        match self {
            DebitCredit::Debit => "DBIT",
            DebitCredit::Credit => "CRDT",
        }
    }

    pub fn is_debit(&self) -> bool {
        *self == DebitCredit::Debit
    }
}

impl fmt::Display for DebitCredit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mt_code())
    }
}

/// Round a monetary value to two decimal places, midpoint away from zero.
pub fn round_amount(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Monetary amount with its ISO 4217 currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub value: Decimal,
    pub currency: String,
}

impl Amount {
    pub fn new(value: Decimal, currency: impl Into<String>) -> Self {
        Self {
            value: round_amount(value),
            currency: currency.into(),
        }
    }

    /// Decimal text as used in ISO 20022 amount elements (`1234.50`).
    pub fn format_iso(&self) -> String {
        format!("{:.2}", round_amount(self.value))
    }
}

/// Postal address. Absent parts are omitted from generated XML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalAddress {
    pub street_name: Option<String>,
    pub building_number: Option<String>,
    pub postal_code: Option<String>,
    pub town_name: Option<String>,
    pub country: Option<String>,
    pub address_lines: Vec<String>,
}

impl PostalAddress {
    pub fn is_empty(&self) -> bool {
        self.street_name.is_none()
            && self.building_number.is_none()
            && self.postal_code.is_none()
            && self.town_name.is_none()
            && self.country.is_none()
            && self.address_lines.is_empty()
    }
}

/// A debtor, creditor or other named party.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub name: Option<String>,
    pub postal_address: Option<PostalAddress>,
    /// Organisation BIC (`Id/OrgId/AnyBIC`).
    pub bic: Option<String>,
    /// Other identification (`Id/OrgId/Othr/Id`), e.g. a creditor scheme id.
    pub identification: Option<String>,
}

impl Party {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.postal_address.as_ref().map_or(true, PostalAddress::is_empty)
            && self.bic.is_none()
            && self.identification.is_none()
    }
}

/// Cash account, identified by IBAN or a proprietary id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub iban: Option<String>,
    pub other_id: Option<String>,
    pub currency: Option<String>,
    pub name: Option<String>,
}

impl Account {
    pub fn iban(iban: impl Into<String>) -> Self {
        Self {
            iban: Some(iban.into()),
            ..Self::default()
        }
    }

    /// IBAN if present, proprietary id otherwise.
    pub fn identifier(&self) -> Option<&str> {
        self.iban.as_deref().or(self.other_id.as_deref())
    }
}

/// Financial institution (agent).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialInstitution {
    pub bic: Option<String>,
    pub name: Option<String>,
    pub clearing_member_id: Option<String>,
}

impl FinancialInstitution {
    pub fn bic(bic: impl Into<String>) -> Self {
        Self {
            bic: Some(bic.into()),
            ..Self::default()
        }
    }
}

/// Remittance information (`RmtInf`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemittanceInformation {
    pub unstructured: Vec<String>,
    /// Structured creditor reference (`Strd/CdtrRefInf/Ref`).
    pub creditor_reference: Option<String>,
}

impl RemittanceInformation {
    pub fn unstructured(text: impl Into<String>) -> Self {
        Self {
            unstructured: vec![text.into()],
            creditor_reference: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.unstructured.is_empty() && self.creditor_reference.is_none()
    }

    /// Unstructured lines joined by a single space.
    pub fn text(&self) -> Option<String> {
        if self.unstructured.is_empty() {
            None
        } else {
            Some(self.unstructured.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debit_credit() {
        assert_eq!("D".parse::<DebitCredit>().ok(), Some(DebitCredit::Debit));
        assert_eq!("CRDT".parse::<DebitCredit>().ok(), Some(DebitCredit::Credit));
        assert!("X".parse::<DebitCredit>().is_err());
        assert_eq!(DebitCredit::Debit.iso_code(), "DBIT");
    }

    #[test]
    fn test_round_amount_midpoint_away_from_zero() {
        assert_eq!(round_amount(Decimal::new(12345, 3)), Decimal::new(1235, 2));
        assert_eq!(round_amount(Decimal::new(-12345, 3)), Decimal::new(-1235, 2));
    }

    #[test]
    fn test_amount_format_iso() {
        let amount = Amount::new(Decimal::new(1000, 0), "EUR");
        assert_eq!(amount.format_iso(), "1000.00");
    }

    #[test]
    fn test_party_emptiness() {
        assert!(Party::default().is_empty());
        assert!(!Party::named("ACME").is_empty());
    }
}
