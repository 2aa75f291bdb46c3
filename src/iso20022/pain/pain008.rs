//! pain.008 CustomerDirectDebitInitiation.

use super::{
    add_group_header, add_payment_type, control_sum, dialect, finish, message_root, open, read_group_header, start,
    SequenceType, DEFAULT_CURRENCY,
};
use crate::error::{Error, Result};
use crate::iso20022::blocks::{self, Dialect};
use crate::iso20022::common::{
    format_date, validate_amount, validate_max35, validate_not_empty, GroupHeader,
};
use crate::iso20022::{PainType, PainVersion};
use crate::types::{Account, Amount, FinancialInstitution, Party, RemittanceInformation};
use crate::xml::{Element, XmlBuilder, XmlDocument};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// One collection (`DrctDbtTxInf`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectDebit {
    pub instruction_id: Option<String>,
    pub end_to_end_id: String,
    pub amount: Amount,
    /// `DrctDbtTx/MndtRltdInf/MndtId`
    pub mandate_id: String,
    pub mandate_signature_date: NaiveDate,
    pub debtor: Party,
    pub debtor_account: Account,
    pub debtor_agent: Option<FinancialInstitution>,
    pub ultimate_debtor: Option<Party>,
    pub remittance: Option<RemittanceInformation>,
}

impl DirectDebit {
    pub fn new(
        end_to_end_id: impl Into<String>,
        amount: Amount,
        mandate_id: impl Into<String>,
        mandate_signature_date: NaiveDate,
        debtor: Party,
        debtor_account: Account,
    ) -> Self {
        Self {
            instruction_id: None,
            end_to_end_id: end_to_end_id.into(),
            amount,
            mandate_id: mandate_id.into(),
            mandate_signature_date,
            debtor,
            debtor_account,
            debtor_agent: None,
            ultimate_debtor: None,
            remittance: None,
        }
    }
}

/// A payment information block of collections sharing creditor, scheme,
/// sequence type and collection date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectDebitInstruction {
    pub payment_information_id: String,
    pub batch_booking: Option<bool>,
    pub service_level: Option<String>,
    /// `CORE`, `COR1` or `B2B`.
    pub local_instrument: String,
    pub sequence_type: SequenceType,
    pub requested_collection_date: NaiveDate,
    pub creditor: Party,
    pub creditor_account: Account,
    /// Written as `NOTPROVIDED` when absent.
    pub creditor_agent: Option<FinancialInstitution>,
    pub charge_bearer: Option<String>,
    /// SEPA creditor identifier, e.g. `DE98ZZZ09999999999`.
    pub creditor_scheme_id: Option<String>,
    pub transactions: Vec<DirectDebit>,
}

impl DirectDebitInstruction {
    pub fn new(
        payment_information_id: impl Into<String>,
        local_instrument: impl Into<String>,
        sequence_type: SequenceType,
        requested_collection_date: NaiveDate,
        creditor: Party,
        creditor_account: Account,
    ) -> Self {
        Self {
            payment_information_id: payment_information_id.into(),
            batch_booking: None,
            service_level: None,
            local_instrument: local_instrument.into(),
            sequence_type,
            requested_collection_date,
            creditor,
            creditor_account,
            creditor_agent: None,
            charge_bearer: None,
            creditor_scheme_id: None,
            transactions: Vec::new(),
        }
    }

    pub fn with_transaction(&self, transaction: DirectDebit) -> Self {
        let mut instruction = self.clone();
        instruction.transactions.push(transaction);
        instruction
    }

    pub fn control_sum(&self) -> Decimal {
        control_sum(self.transactions.iter().map(|t| &t.amount))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pain008Document {
    pub group_header: GroupHeader,
    pub instructions: Vec<DirectDebitInstruction>,
}

impl Pain008Document {
    pub fn new(group_header: GroupHeader) -> Self {
        Self {
            group_header,
            instructions: Vec::new(),
        }
    }

    pub fn with_instruction(&self, instruction: DirectDebitInstruction) -> Self {
        let mut doc = self.clone();
        doc.instructions.push(instruction);
        doc
    }

    pub fn number_of_transactions(&self) -> usize {
        self.instructions.iter().map(|i| i.transactions.len()).sum()
    }

    pub fn control_sum(&self) -> Decimal {
        self.instructions.iter().map(DirectDebitInstruction::control_sum).sum()
    }

    pub fn to_xml(&self, version: PainVersion) -> Result<String> {
        let dialect = dialect(version);
        let mut b = start(PainType::Pain008, version)?;
        add_group_header(
            &mut b,
            &self.group_header,
            Some((self.number_of_transactions(), self.control_sum())),
            dialect,
        );
        for instruction in &self.instructions {
            add_instruction(&mut b, instruction, dialect);
        }
        finish(b)
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        let doc = open(xml, PainType::Pain008)?;
        let root = message_root(&doc, PainType::Pain008)?;
        Ok(Self {
            group_header: read_group_header(&doc, root)?,
            instructions: blocks::children(&doc, root, "PmtInf")?
                .into_iter()
                .map(|el| read_instruction(&doc, el))
                .collect::<Result<Vec<_>>>()?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.group_header.validate()?;
        if self.instructions.is_empty() {
            return Err(Error::validation("PmtInf", "at least one is required"));
        }
        for instruction in &self.instructions {
            validate_max35("PmtInfId", &instruction.payment_information_id)?;
            validate_not_empty("Cdtr/Nm", instruction.creditor.name.as_deref())?;
            validate_not_empty("CdtrAcct/Id", instruction.creditor_account.identifier())?;
            validate_not_empty("CdtrSchmeId", instruction.creditor_scheme_id.as_deref())?;
            for tx in &instruction.transactions {
                validate_max35("EndToEndId", &tx.end_to_end_id)?;
                validate_max35("MndtId", &tx.mandate_id)?;
                validate_amount("InstdAmt", &tx.amount)?;
                validate_not_empty("Dbtr/Nm", tx.debtor.name.as_deref())?;
                validate_not_empty("DbtrAcct/Id", tx.debtor_account.identifier())?;
            }
        }
        Ok(())
    }
}

xml_io!(Pain008Document, PainVersion);

fn add_instruction(b: &mut XmlBuilder, instruction: &DirectDebitInstruction, dialect: Dialect) {
    b.add_element("PmtInf");
    b.add_child("PmtInfId", &instruction.payment_information_id);
    b.add_child("PmtMtd", "DD");
    if let Some(batch) = instruction.batch_booking {
        b.add_child("BtchBookg", if batch { "true" } else { "false" });
    }
    b.add_child("NbOfTxs", &instruction.transactions.len().to_string());
    b.add_child("CtrlSum", &format!("{:.2}", instruction.control_sum()));
    add_payment_type(
        b,
        instruction.service_level.as_deref(),
        Some(&instruction.local_instrument),
        Some(instruction.sequence_type),
    );
    b.add_child("ReqdColltnDt", &format_date(&instruction.requested_collection_date));
    blocks::add_party(b, "Cdtr", &instruction.creditor, dialect);
    blocks::add_account(b, "CdtrAcct", &instruction.creditor_account);
    blocks::add_agent(b, "CdtrAgt", instruction.creditor_agent.as_ref(), dialect);
    b.add_optional_child("ChrgBr", instruction.charge_bearer.as_deref());
    if let Some(id) = &instruction.creditor_scheme_id {
        blocks::add_creditor_scheme_id(b, id);
    }

    for tx in &instruction.transactions {
        b.add_element("DrctDbtTxInf");
        b.add_element("PmtId")
            .add_optional_child("InstrId", tx.instruction_id.as_deref())
            .add_child("EndToEndId", &tx.end_to_end_id)
            .end();
        blocks::add_amount(b, "InstdAmt", &tx.amount);
        b.add_element("DrctDbtTx")
            .add_element("MndtRltdInf")
            .add_child("MndtId", &tx.mandate_id)
            .add_child("DtOfSgntr", &format_date(&tx.mandate_signature_date))
            .end()
            .end();
        blocks::add_agent(b, "DbtrAgt", tx.debtor_agent.as_ref(), dialect);
        blocks::add_party(b, "Dbtr", &tx.debtor, dialect);
        blocks::add_account(b, "DbtrAcct", &tx.debtor_account);
        if let Some(party) = &tx.ultimate_debtor {
            blocks::add_party(b, "UltmtDbtr", party, dialect);
        }
        if let Some(remittance) = &tx.remittance {
            blocks::add_remittance(b, remittance);
        }
        b.end();
    }
    b.end();
}

fn read_instruction(doc: &XmlDocument, el: &Element) -> Result<DirectDebitInstruction> {
    let creditor_account_el = doc.required_node(Some(el), "CdtrAcct", "creditor account (PmtInf/CdtrAcct)")?;
    let sequence_type = SequenceType::from_code(&blocks::required_text(doc, el, "PmtTpInf/SeqTp")?)?;
    let requested_collection_date = blocks::optional_date(doc, el, &["ReqdColltnDt"])?
        .ok_or_else(|| Error::RequiredNode("PmtInf/ReqdColltnDt".to_string()))?;

    let transactions = blocks::children(doc, el, "DrctDbtTxInf")?
        .into_iter()
        .map(|tx| {
            let debtor_account_el = doc.required_node(Some(tx), "DbtrAcct", "debtor account (DrctDbtTxInf/DbtrAcct)")?;
            let mandate_signature_date = blocks::optional_date(doc, tx, &["DrctDbtTx/MndtRltdInf/DtOfSgntr"])?
                .ok_or_else(|| Error::RequiredNode("MndtRltdInf/DtOfSgntr".to_string()))?;
            Ok(DirectDebit {
                instruction_id: blocks::text(doc, tx, "PmtId/InstrId")?,
                end_to_end_id: blocks::required_text(doc, tx, "PmtId/EndToEndId")?,
                amount: doc.amount_with_currency(Some(tx), "InstdAmt", DEFAULT_CURRENCY)?,
                mandate_id: blocks::required_text(doc, tx, "DrctDbtTx/MndtRltdInf/MndtId")?,
                mandate_signature_date,
                debtor: blocks::read_optional_party(doc, tx, "Dbtr")?.unwrap_or_default(),
                debtor_account: blocks::read_account(doc, debtor_account_el)?,
                debtor_agent: blocks::read_agent(doc, tx, "DbtrAgt")?,
                ultimate_debtor: blocks::read_optional_party(doc, tx, "UltmtDbtr")?,
                remittance: blocks::read_remittance(doc, tx)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(DirectDebitInstruction {
        payment_information_id: blocks::required_text(doc, el, "PmtInfId")?,
        batch_booking: blocks::optional_bool(doc, el, "BtchBookg")?,
        service_level: blocks::text(doc, el, "PmtTpInf/SvcLvl/Cd")?,
        local_instrument: blocks::text(doc, el, "PmtTpInf/LclInstrm/Cd")?.unwrap_or_else(|| "CORE".to_string()),
        sequence_type,
        requested_collection_date,
        creditor: blocks::read_optional_party(doc, el, "Cdtr")?.unwrap_or_default(),
        creditor_account: blocks::read_account(doc, creditor_account_el)?,
        creditor_agent: blocks::read_agent(doc, el, "CdtrAgt")?,
        charge_bearer: blocks::text(doc, el, "ChrgBr")?,
        creditor_scheme_id: blocks::read_creditor_scheme_id(doc, el)?,
        transactions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iso20022::pain::fixtures::{acme, header, supplier};
    use pretty_assertions::assert_eq;

    fn document() -> Pain008Document {
        let (creditor, account, agent) = acme();
        let (debtor, debtor_account, debtor_agent) = supplier();
        let debit = DirectDebit {
            debtor_agent: Some(debtor_agent),
            remittance: Some(RemittanceInformation::unstructured("Beitrag Januar")),
            ..DirectDebit::new(
                "E2E-DD-1",
                Amount::new(Decimal::new(4999, 2), "EUR"),
                "MANDATE-7",
                NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                debtor,
                debtor_account,
            )
        };
        let instruction = DirectDebitInstruction {
            service_level: Some("SEPA".into()),
            creditor_agent: Some(agent),
            charge_bearer: Some("SLEV".into()),
            creditor_scheme_id: Some("DE98ZZZ09999999999".into()),
            ..DirectDebitInstruction::new(
                "DD-1",
                "CORE",
                SequenceType::Recurring,
                NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
                creditor,
                account,
            )
        }
        .with_transaction(debit);
        Pain008Document::new(header("DD-MSG-1")).with_instruction(instruction)
    }

    #[test]
    fn test_round_trip() {
        let doc = document();
        for version in [PainVersion::V02, PainVersion::V08, PainVersion::V10] {
            let xml = doc.to_xml(version).unwrap();
            assert!(xml.contains("<SeqTp>RCUR</SeqTp>"));
            assert!(xml.contains("<MndtId>MANDATE-7</MndtId>"));
            assert!(xml.contains("<Prtry>SEPA</Prtry>"));
            assert_eq!(Pain008Document::from_xml(&xml).unwrap(), doc);
        }
    }

    #[test]
    fn test_counters_and_validate() {
        let doc = document();
        assert_eq!(doc.number_of_transactions(), 1);
        assert_eq!(doc.control_sum(), Decimal::new(4999, 2));
        assert!(doc.validate().is_ok());

        let mut missing_scheme = doc.clone();
        missing_scheme.instructions[0].creditor_scheme_id = None;
        assert!(matches!(missing_scheme.validate(), Err(Error::Validation { .. })));
    }

    #[test]
    fn test_unknown_sequence_type() {
        let xml = document()
            .to_xml(PainVersion::V08)
            .unwrap()
            .replace("<SeqTp>RCUR</SeqTp>", "<SeqTp>XXXX</SeqTp>");
        assert!(matches!(Pain008Document::from_xml(&xml), Err(Error::ParseError(_))));
    }
}
