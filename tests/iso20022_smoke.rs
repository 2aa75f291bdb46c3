use chrono::NaiveDate;
use finmsg::{
    iso20022::{
        camt::AccountReportDocument,
        common::GroupHeader,
        pain::{CreditTransfer, Pain001Document, Pain008Document, PaymentInstruction},
        CamtType, CamtVersion, Iso20022Document, MessageType, PainType, PainVersion,
    },
    xml::XmlDocument,
    Account, Amount, Error, Party,
};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;

fn credit_transfer() -> Pain001Document {
    let created = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(10, 0, 0).unwrap();
    let instruction = PaymentInstruction::new(
        "PMT-1",
        NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
        Party::named("ACME GmbH"),
        Account::iban("DE89370400440532013000"),
    )
    .with_transaction(CreditTransfer::new(
        "E2E-1",
        Amount::new(Decimal::from_str_exact("123.45").unwrap(), "EUR"),
        Party::named("Lieferant AG"),
        Account::iban("DE02100100100006820101"),
    ))
    .with_transaction(CreditTransfer::new(
        "E2E-2",
        Amount::new(Decimal::from_str_exact("10.00").unwrap(), "EUR"),
        Party::named("Vermieter KG"),
        Account::iban("DE02100100100006820101"),
    ));
    Pain001Document::new(GroupHeader::new("MSG-1", created)).with_payment_instruction(instruction)
}

#[test]
fn pain001_detected_and_converted_back() {
    let doc = credit_transfer();
    let xml = doc.to_xml(PainVersion::V09).expect("write pain.001");
    assert!(xml.contains("<NbOfTxs>2</NbOfTxs>"));
    assert!(xml.contains("<CtrlSum>133.45</CtrlSum>"));

    let parsed = Iso20022Document::parse(&xml).expect("parse pain.001");
    assert_eq!(parsed.message_type(), MessageType::Pain(PainType::Pain001));
    assert!(parsed.validate().is_ok());

    let back = Pain001Document::try_from(parsed.clone()).expect("pain.001");
    assert_eq!(back, doc);
    assert!(matches!(
        Pain008Document::try_from(parsed),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn pain001_legacy_version_round_trip() {
    let doc = credit_transfer();
    let mut buf = Vec::new();
    doc.write_to(&mut buf, PainVersion::V03).expect("write pain.001");
    let xml = String::from_utf8(buf).unwrap();
    assert!(xml.contains("urn:iso:std:iso:20022:tech:xsd:pain.001.001.03"));

    let back = Pain001Document::from_read(&mut xml.as_bytes()).expect("read pain.001");
    assert_eq!(back, doc);
}

#[test]
fn detection_prefers_prefix_in_use() {
    let xml = r#"<Document xmlns:a="urn:iso:std:iso:20022:tech:xsd:camt.053.001.02"
                           xmlns:b="urn:iso:std:iso:20022:tech:xsd:camt.053.001.08">
          <b:BkToCstmrStmt>
            <b:GrpHdr><b:MsgId>M1</b:MsgId><b:CreDtTm>2025-01-01T10:00:00</b:CreDtTm></b:GrpHdr>
          </b:BkToCstmrStmt>
        </Document>"#;
    let doc = XmlDocument::parse(xml, "urn:iso:std:iso:20022", &[]).unwrap();
    assert_eq!(doc.namespace(), Some("urn:iso:std:iso:20022:tech:xsd:camt.053.001.08"));
    assert_eq!(MessageType::detect(&doc), Some(MessageType::Camt(CamtType::Camt053)));
    assert_eq!(
        CamtType::from_namespace(doc.namespace().unwrap()),
        Some((CamtType::Camt053, CamtVersion::V08))
    );
}

#[test]
fn account_report_rejects_payment_initiation() {
    let xml = credit_transfer().to_xml(PainVersion::V09).unwrap();
    assert!(matches!(
        AccountReportDocument::from_xml(&xml),
        Err(Error::InvalidArgument(_))
    ));
}
