//! MT940 ⇄ camt.053 conversion.
//!
//! Statement structure maps one to one: `:60F:`/`:62F:` become `OPBD`/`CLBD`
//! balances, every `:61:` line becomes an `Ntry`. The `:86:` narrative is
//! split into structured fields through [`SepaReferences`] on the way to
//! camt.053 and reassembled on the way back. Bank transaction codes are
//! derived from the GVC in both directions, which is lossy (see
//! [`GvcCode::try_from_camt_codes`]).

use crate::error::{Error, Result};
use crate::gvc::GvcCode;
use crate::iso20022::camt::statement::PROPRIETARY_ISSUER;
use crate::iso20022::camt::{
    AccountReport, AccountReportDocument, BalanceType, BankTransactionCode, CashBalance, Entry, ReportKind,
    TransactionDetails,
};
use crate::iso20022::common::GroupHeader;
use crate::mt::{Balance, BalanceKind, Mt940Document, Purpose, SepaReferences, Transaction};
use crate::types::{Account, Amount, DebitCredit, FinancialInstitution, Party, RemittanceInformation};
use chrono::{FixedOffset, NaiveDateTime};
use tracing::{debug, warn};

/// Currency when neither the account nor a balance names one.
const FALLBACK_CURRENCY: &str = "EUR";

/// Convert an MT940 statement into a camt.053 document with one `Stmt`.
///
/// `created` becomes the group header creation time; the MT940 creation
/// time (if any) is kept as the statement's `CreDtTm`.
pub fn mt940_to_camt053(doc: &Mt940Document, message_id: &str, created: NaiveDateTime) -> Result<AccountReportDocument> {
    let mut account = account_from_id(doc.account_id());
    account.currency = Some(doc.currency().to_string());

    let mut report = AccountReport::new(doc.reference_id(), account);
    report.electronic_sequence_number = doc
        .statement_number()
        .split('/')
        .next()
        .and_then(|n| n.trim().parse().ok());
    report.creation_date_time = doc.creation_date_time().map(|dt| dt.naive_local());

    let balances = [
        doc.opening_balance(),
        doc.closing_balance(),
        doc.closing_available_balance(),
        doc.forward_available_balance(),
    ];
    for balance in balances.into_iter().flatten() {
        report.balances.push(CashBalance::new(
            balance_type(balance.kind),
            balance.debit_credit,
            Amount::new(balance.amount, balance.currency.as_str()),
            balance.date,
        ));
    }

    for tx in doc.transactions() {
        report.entries.push(entry_from_transaction(tx));
    }

    debug!(
        reference = %doc.reference_id(),
        entries = report.entries.len(),
        "converted MT940 to camt.053"
    );
    Ok(AccountReportDocument::new(ReportKind::Statement, GroupHeader::new(message_id, created)).with_report(report))
}

/// Convert one camt.052/053 report into an MT940 statement.
pub fn camt053_to_mt940(report: &AccountReport) -> Result<Mt940Document> {
    let account_id = report
        .account
        .identifier()
        .ok_or_else(|| Error::ConversionError(format!("statement {} has no account id", report.id)))?;
    let currency = report
        .account
        .currency
        .clone()
        .or_else(|| report.balances.first().map(|b| b.amount.currency.clone()))
        .or_else(|| report.entries.first().map(|e| e.amount.currency.clone()))
        .unwrap_or_else(|| FALLBACK_CURRENCY.to_string());
    let statement_number = report
        .electronic_sequence_number
        .map_or_else(|| "1".to_string(), |n| n.to_string());

    let mut doc = Mt940Document::new(report.id.as_str(), account_id, statement_number, currency.as_str())?;
    if let Some(created) = report.creation_date_time {
        if let Some(created) = FixedOffset::east_opt(0).and_then(|utc| created.and_local_timezone(utc).single()) {
            doc = doc.with_creation_date_time(created);
        }
    }

    let balance = |cash: &CashBalance, kind: BalanceKind| {
        Balance::new(kind, cash.debit_credit, cash.date, cash.amount.currency.as_str(), cash.amount.value)
    };
    let interim: Vec<_> = report
        .balances
        .iter()
        .filter(|b| b.balance_type == BalanceType::InterimBooked)
        .collect();

    let opening = report
        .balance(BalanceType::OpeningBooked)
        .or_else(|| report.balance(BalanceType::PreviouslyClosedBooked));
    match (opening, interim.first().copied()) {
        (Some(cash), _) => doc = doc.with_opening_balance(balance(cash, BalanceKind::Opening))?,
        (None, Some(cash)) => doc = doc.with_opening_balance(balance(cash, BalanceKind::IntermediateOpening))?,
        (None, None) => {}
    }
    // the first ITBD is already the opening balance when there is no OPBD
    let skip = usize::from(opening.is_none());
    let interim_closing = interim.iter().skip(skip).last().copied();
    match (report.balance(BalanceType::ClosingBooked), interim_closing) {
        (Some(cash), _) => doc = doc.with_closing_balance(balance(cash, BalanceKind::Closing))?,
        (None, Some(cash)) => doc = doc.with_closing_balance(balance(cash, BalanceKind::IntermediateClosing))?,
        (None, None) => {}
    }
    if let Some(cash) = report.balance(BalanceType::ClosingAvailable) {
        doc = doc.with_closing_available_balance(balance(cash, BalanceKind::ClosingAvailable));
    }
    if let Some(cash) = report.balance(BalanceType::ForwardAvailable) {
        doc = doc.with_forward_available_balance(balance(cash, BalanceKind::ForwardAvailable));
    }

    let transactions = report
        .entries
        .iter()
        .map(transaction_from_entry)
        .collect::<Result<Vec<_>>>()?;
    Ok(doc.with_transactions(transactions))
}

fn balance_type(kind: BalanceKind) -> BalanceType {
    match kind {
        BalanceKind::Opening => BalanceType::OpeningBooked,
        BalanceKind::Closing => BalanceType::ClosingBooked,
        BalanceKind::IntermediateOpening | BalanceKind::IntermediateClosing => BalanceType::InterimBooked,
        BalanceKind::ClosingAvailable => BalanceType::ClosingAvailable,
        BalanceKind::ForwardAvailable => BalanceType::ForwardAvailable,
    }
}

/// IBAN shape: country code, check digits, up to 30 alphanumerics.
fn looks_like_iban(id: &str) -> bool {
    let bytes = id.as_bytes();
    (15..=34).contains(&id.len())
        && bytes[..2].iter().all(u8::is_ascii_uppercase)
        && bytes[2..4].iter().all(u8::is_ascii_digit)
        && bytes[4..].iter().all(u8::is_ascii_alphanumeric)
}

fn account_from_id(id: &str) -> Account {
    let id = id.trim();
    if looks_like_iban(id) {
        Account::iban(id)
    } else {
        Account {
            other_id: Some(id.to_string()),
            ..Account::default()
        }
    }
}

fn entry_from_transaction(tx: &Transaction) -> Entry {
    let debit_credit = tx.debit_credit();
    let mut entry = Entry::new(Amount::new(tx.amount(), tx.currency()), debit_credit, tx.booking_date());
    entry.value_date = tx.valuta_date();
    entry.reversal = tx.is_reversal();
    entry.account_servicer_reference = tx.bank_reference().map(str::to_string);
    if tx.customer_reference() != Transaction::NO_REFERENCE {
        entry.reference = Some(tx.customer_reference().to_string());
    }

    let purpose = tx.purpose();
    let gvc = purpose.and_then(|p| p.gvc).or_else(|| {
        let text = purpose.and_then(|p| p.booking_text.as_deref().or(p.text.as_deref()))?;
        GvcCode::try_from_booking_text(text, debit_credit.is_debit())
    });
    entry.bank_transaction_code = Some(match gvc {
        Some(gvc) => BankTransactionCode::from_gvc(gvc, debit_credit, tx.transaction_code()),
        None => BankTransactionCode {
            proprietary_code: Some(tx.transaction_code().to_string()),
            proprietary_issuer: Some(PROPRIETARY_ISSUER.to_string()),
            ..BankTransactionCode::default()
        },
    });

    if let Some(purpose) = purpose {
        entry.additional_information = purpose.booking_text.clone();
        let details = details_from_purpose(purpose, debit_credit, &entry.amount);
        if details != TransactionDetails::default() {
            entry.details.push(details);
        }
    }
    entry
}

fn details_from_purpose(purpose: &Purpose, debit_credit: DebitCredit, amount: &Amount) -> TransactionDetails {
    let references = purpose.sepa_references();
    let remittance = if references.is_empty() {
        purpose.text.clone()
    } else {
        references.remittance.clone()
    };

    let counterparty = purpose
        .counterparty_name
        .as_ref()
        .map(|name| Party::named(name.as_str()));
    let counterparty_account = purpose
        .counterparty_iban
        .as_ref()
        .or(references.iban.as_ref())
        .map(|iban| Account::iban(iban.as_str()));
    let counterparty_agent = purpose
        .counterparty_bic
        .as_ref()
        .or(references.bic.as_ref())
        .map(|bic| FinancialInstitution::bic(bic.as_str()));

    let mut details = TransactionDetails {
        end_to_end_id: references.end_to_end_reference.clone().filter(|r| r != "NOTPROVIDED"),
        mandate_id: references.mandate_reference.clone(),
        ultimate_debtor: references.ultimate_debtor.as_ref().map(|n| Party::named(n.as_str())),
        ultimate_creditor: references.ultimate_creditor.as_ref().map(|n| Party::named(n.as_str())),
        remittance: remittance.map(RemittanceInformation::unstructured),
        ..TransactionDetails::default()
    };
    match debit_credit {
        DebitCredit::Debit => {
            details.creditor = counterparty;
            details.creditor_account = counterparty_account;
            details.creditor_agent = counterparty_agent;
        }
        DebitCredit::Credit => {
            details.debtor = counterparty;
            details.debtor_account = counterparty_account;
            details.debtor_agent = counterparty_agent;
        }
    }
    if details != TransactionDetails::default() {
        details.amount = Some(amount.clone());
    }
    details
}

fn transaction_from_entry(entry: &Entry) -> Result<Transaction> {
    let booking_date = entry
        .booking_date
        .or(entry.value_date)
        .ok_or_else(|| Error::ConversionError("entry without booking or value date".to_string()))?;
    let swift_code = entry
        .bank_transaction_code
        .as_ref()
        .and_then(BankTransactionCode::swift_code)
        .unwrap_or(Transaction::DEFAULT_TRANSACTION_CODE);

    let mut tx = Transaction::new(booking_date, entry.amount.value, entry.debit_credit, entry.amount.currency.as_str())
        .with_valuta_date(entry.value_date.unwrap_or(booking_date))
        .with_reversal(entry.reversal)
        .with_transaction_code(swift_code)?;
    if let Some(reference) = entry.reference.as_deref().and_then(|r| mt_reference("customer reference", r)) {
        tx = tx.with_customer_reference(reference)?;
    }
    if let Some(reference) = entry
        .account_servicer_reference
        .as_deref()
        .and_then(|r| mt_reference("bank reference", r))
    {
        tx = tx.with_bank_reference(reference)?;
    }

    let purpose = purpose_from_entry(entry);
    if !purpose.is_empty() {
        tx = tx.with_purpose(purpose);
    }
    Ok(tx)
}

/// Fit a camt reference into a `16x` subfield. References holding `//` or
/// line breaks are dropped; the customer reference then stays `NONREF`.
fn mt_reference(field: &str, reference: &str) -> Option<String> {
    let reference = reference.trim();
    if reference.contains("//") || reference.contains(['\r', '\n']) {
        warn!(field, reference, "reference cannot be expressed in MT940, dropped");
        return None;
    }
    let fitted: String = reference.chars().take(Transaction::REFERENCE_LENGTH).collect();
    let fitted = fitted.trim_matches('/');
    if fitted.is_empty() {
        return None;
    }
    if fitted != reference {
        debug!(field, reference, fitted, "reference shortened");
    }
    Some(fitted.to_string())
}

fn single_line(text: Option<String>) -> Option<String> {
    text.map(|t| t.replace("\r\n", " ").replace(['\r', '\n'], " "))
}

fn purpose_from_entry(entry: &Entry) -> Purpose {
    let mut purpose = Purpose {
        gvc: entry.gvc(),
        booking_text: single_line(entry.additional_information.clone()),
        ..Purpose::default()
    };
    let Some(details) = entry.details.first() else {
        return purpose;
    };

    let remittance = details.remittance.as_ref().and_then(RemittanceInformation::text);
    let references = SepaReferences {
        end_to_end_reference: details.end_to_end_id.clone(),
        mandate_reference: details.mandate_id.clone(),
        ultimate_debtor: details.ultimate_debtor.as_ref().and_then(|p| p.name.clone()),
        ultimate_creditor: details.ultimate_creditor.as_ref().and_then(|p| p.name.clone()),
        ..SepaReferences::default()
    };
    let remittance = single_line(remittance);
    purpose.text = if references.is_empty() {
        remittance
    } else {
        Some(
            SepaReferences {
                remittance,
                ..references
            }
            .to_purpose_text(),
        )
    };

    let (party, account, agent) = details.counterparty(entry.debit_credit);
    purpose.counterparty_name = single_line(party.and_then(|p| p.name.clone()));
    purpose.counterparty_iban = account.and_then(|a| a.iban.clone());
    purpose.counterparty_bic = agent.and_then(|a| a.bic.clone());
    purpose
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iso20022::CamtVersion;
    use crate::mt::{Mt940Generator, MtOptions};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn created() -> NaiveDateTime {
        date(1).and_hms_opt(18, 0, 0).unwrap()
    }

    fn statement() -> Mt940Document {
        let salary = Transaction::new(date(2), Decimal::new(250000, 2), DebitCredit::Credit, "EUR")
            .with_valuta_date(date(2))
            .with_transaction_code("NTRF")
            .unwrap()
            .with_purpose(Purpose {
                gvc: Some(GvcCode::SepaCtSingleCredit),
                booking_text: Some("SEPA-GUTSCHRIFT".into()),
                text: Some("EREF+LOHN-2025-01 SVWZ+Gehalt Januar".into()),
                counterparty_name: Some("Arbeitgeber GmbH".into()),
                counterparty_iban: Some("DE02100100100006820101".into()),
                ..Purpose::default()
            });
        let rent = Transaction::new(date(3), Decimal::new(80000, 2), DebitCredit::Debit, "EUR")
            .with_valuta_date(date(3))
            .with_customer_reference("MIETE01")
            .unwrap()
            .with_purpose(Purpose::text("Miete Januar"));

        Mt940Document::new("REF1", "DE89370400440532013000", "1", "EUR")
            .unwrap()
            .with_opening_balance(Balance::new(BalanceKind::Opening, DebitCredit::Credit, date(1), "EUR", Decimal::new(1000, 0)))
            .unwrap()
            .with_closing_balance(Balance::new(BalanceKind::Closing, DebitCredit::Credit, date(3), "EUR", Decimal::new(2700, 0)))
            .unwrap()
            .with_transaction(salary)
            .with_transaction(rent)
    }

    #[test]
    fn test_mt940_to_camt053() {
        let camt = mt940_to_camt053(&statement(), "CAMT-1", created()).unwrap();
        assert_eq!(camt.group_header.message_id, "CAMT-1");
        let report = &camt.reports[0];
        assert_eq!(report.id, "REF1");
        assert_eq!(report.electronic_sequence_number, Some(1));
        assert_eq!(report.account.iban.as_deref(), Some("DE89370400440532013000"));
        assert_eq!(
            report.balance(BalanceType::ClosingBooked).map(CashBalance::signed_value),
            Some(Decimal::new(2700, 0))
        );

        let salary = &report.entries[0];
        assert_eq!(salary.gvc(), Some(GvcCode::SepaCtSingleCredit));
        let details = &salary.details[0];
        assert_eq!(details.end_to_end_id.as_deref(), Some("LOHN-2025-01"));
        assert_eq!(details.debtor, Some(Party::named("Arbeitgeber GmbH")));
        assert_eq!(
            details.remittance.as_ref().and_then(RemittanceInformation::text).as_deref(),
            Some("Gehalt Januar")
        );

        let rent = &report.entries[1];
        assert_eq!(rent.reference.as_deref(), Some("MIETE01"));
        assert_eq!(
            rent.details[0].remittance.as_ref().and_then(RemittanceInformation::text).as_deref(),
            Some("Miete Januar")
        );
        assert!(camt.to_xml(CamtVersion::V08).is_ok());
    }

    #[test]
    fn test_round_trip_through_camt053() {
        let original = statement();
        let camt = mt940_to_camt053(&original, "CAMT-1", created()).unwrap();
        let back = camt053_to_mt940(&camt.reports[0]).unwrap();

        assert_eq!(back.reference_id(), "REF1");
        assert_eq!(back.account_id(), original.account_id());
        assert_eq!(back.opening_balance(), original.opening_balance());
        assert_eq!(back.closing_balance(), original.closing_balance());
        assert_eq!(back.transactions().len(), 2);

        let salary = &back.transactions()[0];
        assert_eq!(salary.signed_amount(), Decimal::new(2500, 0));
        assert_eq!(salary.transaction_code(), "NTRF");
        let purpose = salary.purpose().unwrap();
        assert_eq!(purpose.gvc, Some(GvcCode::SepaCtSingleCredit));
        assert_eq!(purpose.text.as_deref(), Some("EREF+LOHN-2025-01 SVWZ+Gehalt Januar"));
        assert_eq!(purpose.counterparty_name.as_deref(), Some("Arbeitgeber GmbH"));

        let rent = &back.transactions()[1];
        assert_eq!(rent.customer_reference(), "MIETE01");
        assert_eq!(rent.purpose().and_then(|p| p.text.as_deref()), Some("Miete Januar"));
    }

    #[test]
    fn test_non_iban_account() {
        let doc = Mt940Document::new("REF2", "37040044/0532013000", "5/1", "EUR").unwrap();
        let camt = mt940_to_camt053(&doc, "CAMT-2", created()).unwrap();
        let report = &camt.reports[0];
        assert_eq!(report.account.other_id.as_deref(), Some("37040044/0532013000"));
        assert_eq!(report.electronic_sequence_number, Some(5));
        assert_eq!(camt053_to_mt940(report).unwrap().account_id(), "37040044/0532013000");
    }

    #[test]
    fn test_camt_values_fitted_to_mt940_fields() {
        let mut long_references = Entry::new(Amount::new(Decimal::new(100, 0), "EUR"), DebitCredit::Credit, date(2));
        long_references.reference = Some("E2E-2025-01-000000042".into());
        long_references.account_servicer_reference = Some("BANK-REFERENCE-000123".into());
        long_references.details.push(TransactionDetails {
            remittance: Some(RemittanceInformation::unstructured("Zeile1\r\n:20:X")),
            ..TransactionDetails::default()
        });
        let mut slashed = Entry::new(Amount::new(Decimal::new(5, 0), "EUR"), DebitCredit::Debit, date(3));
        slashed.reference = Some("A//B".into());
        slashed.account_servicer_reference = Some("X//Y".into());
        let report = AccountReport::new("S1", Account::iban("DE89370400440532013000"))
            .with_balance(CashBalance::new(
                BalanceType::OpeningBooked,
                DebitCredit::Credit,
                Amount::new(Decimal::new(10, 0), "EUR"),
                date(1),
            ))
            .with_balance(CashBalance::new(
                BalanceType::ClosingBooked,
                DebitCredit::Credit,
                Amount::new(Decimal::new(105, 0), "EUR"),
                date(3),
            ))
            .with_entry(long_references)
            .with_entry(slashed);

        let doc = camt053_to_mt940(&report).unwrap();
        let first = &doc.transactions()[0];
        assert_eq!(first.customer_reference(), "E2E-2025-01-0000");
        assert_eq!(first.bank_reference(), Some("BANK-REFERENCE-0"));
        assert_eq!(first.purpose().and_then(|p| p.text.as_deref()), Some("Zeile1 :20:X"));
        let second = &doc.transactions()[1];
        assert_eq!(second.customer_reference(), Transaction::NO_REFERENCE);
        assert_eq!(second.bank_reference(), None);

        let text = Mt940Generator::new(MtOptions::default()).generate(&doc).unwrap();
        assert!(text.contains("E2E-2025-01-0000//BANK-REFERENCE-0\r\n"));
        assert_eq!(text.split("\r\n").filter(|l| l.starts_with(":20:")).count(), 1);
        let parsed = Mt940Document::parse(&text).unwrap();
        assert_eq!(parsed.transactions(), doc.transactions());
    }

    #[test]
    fn test_report_without_account_fails() {
        let report = AccountReport::new("S1", Account::default());
        assert!(matches!(camt053_to_mt940(&report), Err(Error::ConversionError(_))));
    }
}
