use chrono::NaiveDate;
use finmsg::{
    conversion::{camt053_to_mt940, mt940_to_camt053},
    iso20022::{camt::AccountReportDocument, CamtVersion},
    mt::{Mt940Document, Mt940Generator, MtOptions},
    DebitCredit, GvcCode,
};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;

const STATEMENT: &str = ":20:REF1\r\n\
:25:DE0012\r\n\
:28C:1\r\n\
:60F:C250101EUR1000,00\r\n\
:61:2501010101D50,00NMSCNONREF\r\n\
:86:Rechnung 4711\r\n\
:62F:C250101EUR950,00\r\n\
-";

#[test]
fn mt940_through_camt053_and_back() {
    let mt940 = Mt940Document::parse(STATEMENT).expect("parse mt940");
    let created = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap().and_hms_opt(8, 0, 0).unwrap();

    let camt = mt940_to_camt053(&mt940, "CAMT-1", created).expect("to camt.053");
    let xml = camt.to_xml(CamtVersion::V08).expect("write camt.053");
    assert!(xml.contains("<Cd>OPBD</Cd>"));
    assert!(xml.contains("<Ustrd>Rechnung 4711</Ustrd>"));

    let parsed = AccountReportDocument::from_xml(&xml).expect("read camt.053");
    assert_eq!(parsed, camt);

    let back = camt053_to_mt940(&parsed.reports[0]).expect("to mt940");
    let text = Mt940Generator::new(MtOptions::default()).generate(&back).unwrap();
    assert_eq!(text, STATEMENT);
}

#[test]
fn booking_text_drives_bank_transaction_code() {
    let statement = ":20:REF2\r\n\
:25:DE89370400440532013000\r\n\
:28C:7/1\r\n\
:60F:C250101EUR0,00\r\n\
:61:2501020102C2500,00NTRFNONREF\r\n\
:86:SEPA-Überweisung Gehalt Januar\r\n\
:62F:C250102EUR2500,00\r\n\
-";
    let mt940 = Mt940Document::parse(statement).expect("parse mt940");
    let created = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap().and_hms_opt(8, 0, 0).unwrap();
    let camt = mt940_to_camt053(&mt940, "CAMT-2", created).expect("to camt.053");

    let report = &camt.reports[0];
    assert_eq!(report.electronic_sequence_number, Some(7));
    assert_eq!(report.account.iban.as_deref(), Some("DE89370400440532013000"));

    let entry = &report.entries[0];
    assert_eq!(entry.debit_credit, DebitCredit::Credit);
    assert_eq!(entry.signed_value(), Decimal::new(2500, 0));
    assert_eq!(entry.gvc(), Some(GvcCode::SepaCtSingleCredit));
    let code = entry.bank_transaction_code.as_ref().unwrap();
    assert_eq!(code.proprietary_code.as_deref(), Some("NTRF+166"));
    assert_eq!(code.swift_code(), Some("NTRF"));

    let back = camt053_to_mt940(report).expect("to mt940");
    let tx = &back.transactions()[0];
    assert_eq!(tx.transaction_code(), "NTRF");
    assert_eq!(tx.purpose().and_then(|p| p.gvc), Some(GvcCode::SepaCtSingleCredit));
}
