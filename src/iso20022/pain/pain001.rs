//! pain.001 CustomerCreditTransferInitiation.

use super::{
    add_group_header, add_payment_type, control_sum, dialect, finish, message_root, open, read_group_header, start,
    DEFAULT_CURRENCY,
};
use crate::error::{Error, Result};
use crate::iso20022::blocks::{self, Dialect};
use crate::iso20022::common::{validate_amount, validate_max35, validate_not_empty, GroupHeader};
use crate::iso20022::{PainType, PainVersion};
use crate::types::{Account, Amount, FinancialInstitution, Party, RemittanceInformation};
use crate::xml::{Element, XmlBuilder, XmlDocument};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

/// One credit transfer (`CdtTrfTxInf`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditTransfer {
    pub instruction_id: Option<String>,
    pub end_to_end_id: String,
    pub amount: Amount,
    pub creditor: Party,
    pub creditor_account: Account,
    pub creditor_agent: Option<FinancialInstitution>,
    pub ultimate_creditor: Option<Party>,
    /// `Purp/Cd`, e.g. `SALA`.
    pub purpose_code: Option<String>,
    pub remittance: Option<RemittanceInformation>,
}

impl CreditTransfer {
    pub fn new(end_to_end_id: impl Into<String>, amount: Amount, creditor: Party, creditor_account: Account) -> Self {
        Self {
            instruction_id: None,
            end_to_end_id: end_to_end_id.into(),
            amount,
            creditor,
            creditor_account,
            creditor_agent: None,
            ultimate_creditor: None,
            purpose_code: None,
            remittance: None,
        }
    }
}

/// A payment information block (`PmtInf`): one debtor account, one
/// execution date, many transfers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentInstruction {
    pub payment_information_id: String,
    pub requested_execution_date: NaiveDate,
    pub batch_booking: Option<bool>,
    /// `PmtTpInf/SvcLvl/Cd`, `SEPA` for euro transfers.
    pub service_level: Option<String>,
    /// `PmtTpInf/LclInstrm/Cd`, `INST` for instant payments.
    pub local_instrument: Option<String>,
    pub debtor: Party,
    pub debtor_account: Account,
    /// Written as `NOTPROVIDED` when absent.
    pub debtor_agent: Option<FinancialInstitution>,
    /// `ChrgBr`, `SLEV` for SEPA.
    pub charge_bearer: Option<String>,
    pub transactions: Vec<CreditTransfer>,
}

impl PaymentInstruction {
    pub fn new(
        payment_information_id: impl Into<String>,
        requested_execution_date: NaiveDate,
        debtor: Party,
        debtor_account: Account,
    ) -> Self {
        Self {
            payment_information_id: payment_information_id.into(),
            requested_execution_date,
            batch_booking: None,
            service_level: None,
            local_instrument: None,
            debtor,
            debtor_account,
            debtor_agent: None,
            charge_bearer: None,
            transactions: Vec::new(),
        }
    }

    pub fn with_transaction(&self, transaction: CreditTransfer) -> Self {
        let mut instruction = self.clone();
        instruction.transactions.push(transaction);
        instruction
    }

    pub fn control_sum(&self) -> Decimal {
        control_sum(self.transactions.iter().map(|t| &t.amount))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pain001Document {
    pub group_header: GroupHeader,
    pub payment_instructions: Vec<PaymentInstruction>,
}

impl Pain001Document {
    pub fn new(group_header: GroupHeader) -> Self {
        Self {
            group_header,
            payment_instructions: Vec::new(),
        }
    }

    pub fn with_payment_instruction(&self, instruction: PaymentInstruction) -> Self {
        let mut doc = self.clone();
        doc.payment_instructions.push(instruction);
        doc
    }

    pub fn number_of_transactions(&self) -> usize {
        self.payment_instructions.iter().map(|p| p.transactions.len()).sum()
    }

    pub fn control_sum(&self) -> Decimal {
        self.payment_instructions.iter().map(PaymentInstruction::control_sum).sum()
    }

    pub fn to_xml(&self, version: PainVersion) -> Result<String> {
        let dialect = dialect(version);
        let mut b = start(PainType::Pain001, version)?;
        add_group_header(
            &mut b,
            &self.group_header,
            Some((self.number_of_transactions(), self.control_sum())),
            dialect,
        );
        for instruction in &self.payment_instructions {
            add_instruction(&mut b, instruction, dialect);
        }
        finish(b)
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        let doc = open(xml, PainType::Pain001)?;
        let root = message_root(&doc, PainType::Pain001)?;
        let group_header = read_group_header(&doc, root)?;
        let payment_instructions = blocks::children(&doc, root, "PmtInf")?
            .into_iter()
            .map(|el| read_instruction(&doc, el))
            .collect::<Result<Vec<_>>>()?;

        let doc = Self {
            group_header,
            payment_instructions,
        };
        debug!(
            message_id = %doc.group_header.message_id,
            transactions = doc.number_of_transactions(),
            "parsed pain.001"
        );
        Ok(doc)
    }

    pub fn validate(&self) -> Result<()> {
        self.group_header.validate()?;
        if self.payment_instructions.is_empty() {
            return Err(Error::validation("PmtInf", "at least one is required"));
        }
        for instruction in &self.payment_instructions {
            validate_max35("PmtInfId", &instruction.payment_information_id)?;
            validate_not_empty("Dbtr/Nm", instruction.debtor.name.as_deref())?;
            validate_not_empty("DbtrAcct/Id", instruction.debtor_account.identifier())?;
            if instruction.transactions.is_empty() {
                return Err(Error::validation("CdtTrfTxInf", "at least one is required"));
            }
            for tx in &instruction.transactions {
                validate_max35("EndToEndId", &tx.end_to_end_id)?;
                validate_amount("InstdAmt", &tx.amount)?;
                validate_not_empty("Cdtr/Nm", tx.creditor.name.as_deref())?;
                validate_not_empty("CdtrAcct/Id", tx.creditor_account.identifier())?;
            }
        }
        Ok(())
    }
}

xml_io!(Pain001Document, PainVersion);

fn add_instruction(b: &mut XmlBuilder, instruction: &PaymentInstruction, dialect: Dialect) {
    b.add_element("PmtInf");
    b.add_child("PmtInfId", &instruction.payment_information_id);
    b.add_child("PmtMtd", "TRF");
    if let Some(batch) = instruction.batch_booking {
        b.add_child("BtchBookg", if batch { "true" } else { "false" });
    }
    b.add_child("NbOfTxs", &instruction.transactions.len().to_string());
    b.add_child("CtrlSum", &format!("{:.2}", instruction.control_sum()));
    add_payment_type(
        b,
        instruction.service_level.as_deref(),
        instruction.local_instrument.as_deref(),
        None,
    );
    blocks::add_date(b, "ReqdExctnDt", &instruction.requested_execution_date, dialect.date_choice);
    blocks::add_party(b, "Dbtr", &instruction.debtor, dialect);
    blocks::add_account(b, "DbtrAcct", &instruction.debtor_account);
    blocks::add_agent(b, "DbtrAgt", instruction.debtor_agent.as_ref(), dialect);
    b.add_optional_child("ChrgBr", instruction.charge_bearer.as_deref());

    for tx in &instruction.transactions {
        b.add_element("CdtTrfTxInf");
        b.add_element("PmtId")
            .add_optional_child("InstrId", tx.instruction_id.as_deref())
            .add_child("EndToEndId", &tx.end_to_end_id)
            .end();
        b.add_element("Amt");
        blocks::add_amount(b, "InstdAmt", &tx.amount);
        b.end();
        if let Some(agent) = &tx.creditor_agent {
            blocks::add_agent(b, "CdtrAgt", Some(agent), dialect);
        }
        blocks::add_party(b, "Cdtr", &tx.creditor, dialect);
        blocks::add_account(b, "CdtrAcct", &tx.creditor_account);
        if let Some(party) = &tx.ultimate_creditor {
            blocks::add_party(b, "UltmtCdtr", party, dialect);
        }
        if let Some(code) = &tx.purpose_code {
            b.add_element("Purp").add_child("Cd", code).end();
        }
        if let Some(remittance) = &tx.remittance {
            blocks::add_remittance(b, remittance);
        }
        b.end();
    }
    b.end();
}

fn read_instruction(doc: &XmlDocument, el: &Element) -> Result<PaymentInstruction> {
    let requested_execution_date = blocks::optional_date(doc, el, &["ReqdExctnDt/Dt", "ReqdExctnDt/DtTm", "ReqdExctnDt"])?
        .ok_or_else(|| Error::RequiredNode("PmtInf/ReqdExctnDt".to_string()))?;
    let debtor_account_el = doc.required_node(Some(el), "DbtrAcct", "debtor account (PmtInf/DbtrAcct)")?;

    let transactions = blocks::children(doc, el, "CdtTrfTxInf")?
        .into_iter()
        .map(|tx| {
            let creditor_account_el = doc.required_node(Some(tx), "CdtrAcct", "creditor account (CdtTrfTxInf/CdtrAcct)")?;
            Ok(CreditTransfer {
                instruction_id: blocks::text(doc, tx, "PmtId/InstrId")?,
                end_to_end_id: blocks::required_text(doc, tx, "PmtId/EndToEndId")?,
                amount: doc.amount_with_currency(Some(tx), "Amt/InstdAmt", DEFAULT_CURRENCY)?,
                creditor: blocks::read_optional_party(doc, tx, "Cdtr")?.unwrap_or_default(),
                creditor_account: blocks::read_account(doc, creditor_account_el)?,
                creditor_agent: blocks::read_agent(doc, tx, "CdtrAgt")?,
                ultimate_creditor: blocks::read_optional_party(doc, tx, "UltmtCdtr")?,
                purpose_code: blocks::text(doc, tx, "Purp/Cd")?,
                remittance: blocks::read_remittance(doc, tx)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(PaymentInstruction {
        payment_information_id: blocks::required_text(doc, el, "PmtInfId")?,
        requested_execution_date,
        batch_booking: blocks::optional_bool(doc, el, "BtchBookg")?,
        service_level: blocks::text(doc, el, "PmtTpInf/SvcLvl/Cd")?,
        local_instrument: blocks::text(doc, el, "PmtTpInf/LclInstrm/Cd")?,
        debtor: blocks::read_optional_party(doc, el, "Dbtr")?.unwrap_or_default(),
        debtor_account: blocks::read_account(doc, debtor_account_el)?,
        debtor_agent: blocks::read_agent(doc, el, "DbtrAgt")?,
        charge_bearer: blocks::text(doc, el, "ChrgBr")?,
        transactions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iso20022::pain::fixtures::{acme, header, supplier};
    use pretty_assertions::assert_eq;

    fn transfer(id: &str, cents: i64) -> CreditTransfer {
        let (creditor, account, agent) = supplier();
        CreditTransfer {
            creditor_agent: Some(agent),
            remittance: Some(RemittanceInformation::unstructured(format!("Rechnung {}", id))),
            ..CreditTransfer::new(id, Amount::new(Decimal::new(cents, 2), "EUR"), creditor, account)
        }
    }

    fn document() -> Pain001Document {
        let (debtor, account, agent) = acme();
        let instruction = PaymentInstruction {
            service_level: Some("SEPA".into()),
            debtor_agent: Some(agent),
            charge_bearer: Some("SLEV".into()),
            batch_booking: Some(true),
            ..PaymentInstruction::new("PMT-1", NaiveDate::from_ymd_opt(2025, 1, 3).unwrap(), debtor, account)
        }
        .with_transaction(transfer("E2E-1", 10050))
        .with_transaction(transfer("E2E-2", 2000));
        Pain001Document::new(header("MSG-001")).with_payment_instruction(instruction)
    }

    #[test]
    fn test_counters() {
        let doc = document();
        assert_eq!(doc.number_of_transactions(), 2);
        assert_eq!(doc.control_sum(), Decimal::new(12050, 2));
        let xml = doc.to_xml(PainVersion::V09).unwrap();
        assert!(xml.contains("<NbOfTxs>2</NbOfTxs>"));
        assert!(xml.contains("<CtrlSum>120.50</CtrlSum>"));
    }

    #[test]
    fn test_round_trip_current() {
        let doc = document();
        let xml = doc.to_xml(PainVersion::V09).unwrap();
        assert!(xml.contains("<BICFI>COBADEFFXXX</BICFI>"));
        assert!(xml.contains("<Dt>2025-01-03</Dt>"));
        assert_eq!(Pain001Document::from_xml(&xml).unwrap(), doc);
    }

    #[test]
    fn test_round_trip_legacy() {
        let doc = document();
        let xml = doc.to_xml(PainVersion::V03).unwrap();
        assert!(xml.contains("<BIC>COBADEFFXXX</BIC>"));
        assert!(xml.contains("<ReqdExctnDt>2025-01-03</ReqdExctnDt>"));
        assert_eq!(Pain001Document::from_xml(&xml).unwrap(), doc);
    }

    #[test]
    fn test_missing_debtor_agent_not_provided() {
        let mut doc = document();
        doc.payment_instructions[0].debtor_agent = None;
        let xml = doc.to_xml(PainVersion::V11).unwrap();
        assert!(xml.contains("<Id>NOTPROVIDED</Id>"));
        assert_eq!(Pain001Document::from_xml(&xml).unwrap().payment_instructions[0].debtor_agent, None);
    }

    #[test]
    fn test_validate() {
        assert!(document().validate().is_ok());
        let mut doc = document();
        doc.payment_instructions[0].transactions[0].amount = Amount::new(Decimal::ZERO, "EUR");
        assert!(matches!(doc.validate(), Err(Error::Validation { .. })));
    }

    #[test]
    fn test_rejects_direct_debit_document() {
        let xml = r#"<Document xmlns="urn:iso:std:iso:20022:tech:xsd:pain.008.001.02"><CstmrDrctDbtInitn/></Document>"#;
        assert!(matches!(Pain001Document::from_xml(xml), Err(Error::InvalidArgument(_))));
    }
}
