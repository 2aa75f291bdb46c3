//! Envelope structures shared by ISO 20022 messages and field checks.

use crate::error::{Error, Result};
use crate::types::{Amount, FinancialInstitution, Party};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

/// Max35Text limit.
pub const MAX35: usize = 35;

/// Assigner or assignee of an investigation case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentParty {
    /// `Agt/FinInstnId`
    Agent(FinancialInstitution),
    /// `Pty`
    Party(Party),
}

impl AssignmentParty {
    pub fn agent_bic(bic: impl Into<String>) -> Self {
        AssignmentParty::Agent(FinancialInstitution::bic(bic))
    }

    pub fn party_name(name: impl Into<String>) -> Self {
        AssignmentParty::Party(Party::named(name))
    }
}

/// `Assgnmt` block of investigation messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub id: String,
    pub assigner: AssignmentParty,
    pub assignee: AssignmentParty,
    pub creation_date_time: NaiveDateTime,
}

impl Assignment {
    pub fn new(
        id: impl Into<String>,
        assigner: AssignmentParty,
        assignee: AssignmentParty,
        creation_date_time: NaiveDateTime,
    ) -> Self {
        Self {
            id: id.into(),
            assigner,
            assignee,
            creation_date_time,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_max35("Assgnmt/Id", &self.id)
    }
}

/// `Case` block; omitted from the XML when absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Case {
    pub id: String,
    pub creator: Option<AssignmentParty>,
    pub reopen_case_indication: Option<bool>,
}

impl Case {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            creator: None,
            reopen_case_indication: None,
        }
    }

    pub fn with_creator(&self, creator: AssignmentParty) -> Self {
        Self {
            creator: Some(creator),
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_max35("Case/Id", &self.id)
    }
}

/// Whether an underlying transaction was a customer initiation or an
/// interbank transfer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnderlyingKind {
    /// `Undrlg/Initn`
    #[default]
    Initiation,
    /// `Undrlg/IntrBk`
    Interbank,
}

/// Reference to the transaction an investigation is about. Every field is
/// optional and omitted from the XML when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnderlyingTransaction {
    pub kind: UnderlyingKind,
    pub original_message_id: Option<String>,
    pub original_message_name_id: Option<String>,
    pub original_creation_date_time: Option<NaiveDateTime>,
    /// Initiation only.
    pub original_payment_information_id: Option<String>,
    pub original_instruction_id: Option<String>,
    pub original_end_to_end_id: Option<String>,
    /// Interbank only.
    pub original_transaction_id: Option<String>,
    pub original_uetr: Option<String>,
    /// Instructed amount (initiation) or interbank settlement amount.
    pub amount: Option<Amount>,
    /// Requested execution date (initiation) or settlement date.
    pub date: Option<NaiveDate>,
}

impl UnderlyingTransaction {
    pub fn initiation() -> Self {
        Self::default()
    }

    pub fn interbank() -> Self {
        Self {
            kind: UnderlyingKind::Interbank,
            ..Self::default()
        }
    }

    pub fn has_original_group(&self) -> bool {
        self.original_message_id.is_some()
    }

    pub fn validate(&self) -> Result<()> {
        validate_optional_max35("OrgnlMsgId", self.original_message_id.as_deref())?;
        validate_optional_max35("OrgnlPmtInfId", self.original_payment_information_id.as_deref())?;
        validate_optional_max35("OrgnlInstrId", self.original_instruction_id.as_deref())?;
        validate_optional_max35("OrgnlEndToEndId", self.original_end_to_end_id.as_deref())?;
        validate_optional_max35("OrgnlTxId", self.original_transaction_id.as_deref())?;
        if let Some(amount) = &self.amount {
            validate_amount("Undrlg amount", amount)?;
        }
        Ok(())
    }
}

/// `GrpHdr` of reporting and initiation messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupHeader {
    pub message_id: String,
    pub creation_date_time: NaiveDateTime,
    pub initiating_party: Option<Party>,
}

impl GroupHeader {
    pub fn new(message_id: impl Into<String>, creation_date_time: NaiveDateTime) -> Self {
        Self {
            message_id: message_id.into(),
            creation_date_time,
            initiating_party: None,
        }
    }

    pub fn with_initiating_party(&self, party: Party) -> Self {
        Self {
            initiating_party: Some(party),
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_max35("GrpHdr/MsgId", &self.message_id)
    }
}

/// `ISODateTime` without offset, e.g. `2025-01-01T10:00:00`.
pub fn format_date_time(value: &NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Accept local times with optional fractions and offset-qualified times.
/// Offsets are dropped, keeping the local wall-clock time.
pub fn parse_date_time(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.naive_local()))
        .map_err(|_| Error::InvalidDate(value.to_string()))
}

pub fn format_date(value: &NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

/// `ISODate`; a trailing time part is ignored.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    let value = value.trim();
    let date_part = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|_| Error::InvalidDate(value.to_string()))
}

/// Max35Text: 1 to 35 characters.
pub fn validate_max35(field: &str, value: &str) -> Result<()> {
    let length = value.chars().count();
    if length == 0 {
        return Err(Error::validation(field, "must not be empty"));
    }
    if length > MAX35 {
        return Err(Error::validation(
            field,
            format!("{} characters exceed the maximum of {}", length, MAX35),
        ));
    }
    Ok(())
}

pub fn validate_optional_max35(field: &str, value: Option<&str>) -> Result<()> {
    value.map_or(Ok(()), |v| validate_max35(field, v))
}

pub fn validate_not_empty(field: &str, value: Option<&str>) -> Result<()> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(Error::validation(field, "is required")),
    }
}

/// Positive amount in an alphabetic three letter currency.
pub fn validate_amount(field: &str, amount: &Amount) -> Result<()> {
    if amount.value <= Decimal::ZERO {
        return Err(Error::validation(field, format!("amount {} must be positive", amount.value)));
    }
    validate_currency(field, &amount.currency)
}

pub fn validate_currency(field: &str, currency: &str) -> Result<()> {
    if currency.len() == 3 && currency.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(Error::validation(field, format!("invalid currency '{}'", currency)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_time_formats() {
        let dt = parse_date_time("2025-01-01T10:00:00").unwrap();
        assert_eq!(format_date_time(&dt), "2025-01-01T10:00:00");
        assert_eq!(parse_date_time("2025-01-01T10:00:00.123").unwrap().format("%H:%M:%S").to_string(), "10:00:00");
        assert_eq!(parse_date_time("2025-01-01T10:00:00+01:00").unwrap(), dt);
        assert!(parse_date_time("01.01.2025").is_err());
    }

    #[test]
    fn test_parse_date() {
        let date = parse_date("2025-03-04").unwrap();
        assert_eq!(format_date(&date), "2025-03-04");
        assert_eq!(parse_date("2025-03-04T00:00:00").unwrap(), date);
    }

    #[test]
    fn test_max35() {
        assert!(validate_max35("MsgId", &"a".repeat(35)).is_ok());
        let err = validate_max35("MsgId", &"a".repeat(36)).unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "MsgId"));
        assert!(validate_max35("MsgId", "").is_err());
    }

    #[test]
    fn test_amount_validation() {
        assert!(validate_amount("Amt", &Amount::new(Decimal::ONE, "EUR")).is_ok());
        assert!(validate_amount("Amt", &Amount::new(Decimal::ZERO, "EUR")).is_err());
        assert!(validate_amount("Amt", &Amount::new(Decimal::ONE, "eur")).is_err());
    }
}
