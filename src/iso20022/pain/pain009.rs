//! pain.009 MandateInitiationRequest.

use super::{
    add_group_header, dialect, finish, message_root, open, read_group_header, start, SequenceType, DEFAULT_CURRENCY,
};
use crate::error::{Error, Result};
use crate::iso20022::blocks::{self, Dialect};
use crate::iso20022::common::{
    format_date, validate_amount, validate_max35, validate_not_empty, validate_optional_max35, GroupHeader,
};
use crate::iso20022::{PainType, PainVersion};
use crate::types::{Account, Amount, FinancialInstitution, Party};
use crate::xml::{Element, XmlBuilder, XmlDocument};
use chrono::NaiveDate;

/// A direct debit mandate (`Mndt`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mandate {
    /// Only written by the 2019 and later schemas.
    pub mandate_id: Option<String>,
    pub mandate_request_id: String,
    pub service_level: Option<String>,
    pub local_instrument: Option<String>,
    pub sequence_type: Option<SequenceType>,
    /// `Frqcy`, e.g. `MNTH`, `YEAR`.
    pub frequency: Option<String>,
    pub first_collection_date: Option<NaiveDate>,
    pub final_collection_date: Option<NaiveDate>,
    pub collection_amount: Option<Amount>,
    pub maximum_amount: Option<Amount>,
    /// Only written by the 2019 and later schemas.
    pub creditor_scheme_id: Option<String>,
    pub creditor: Party,
    pub creditor_account: Option<Account>,
    pub creditor_agent: Option<FinancialInstitution>,
    pub debtor: Party,
    pub debtor_account: Option<Account>,
    pub debtor_agent: Option<FinancialInstitution>,
}

impl Mandate {
    pub fn new(mandate_request_id: impl Into<String>, creditor: Party, debtor: Party) -> Self {
        Self {
            mandate_id: None,
            mandate_request_id: mandate_request_id.into(),
            service_level: None,
            local_instrument: None,
            sequence_type: None,
            frequency: None,
            first_collection_date: None,
            final_collection_date: None,
            collection_amount: None,
            maximum_amount: None,
            creditor_scheme_id: None,
            creditor,
            creditor_account: None,
            creditor_agent: None,
            debtor,
            debtor_account: None,
            debtor_agent: None,
        }
    }

    fn has_occurrences(&self) -> bool {
        self.sequence_type.is_some()
            || self.frequency.is_some()
            || self.first_collection_date.is_some()
            || self.final_collection_date.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pain009Document {
    pub group_header: GroupHeader,
    pub mandates: Vec<Mandate>,
}

impl Pain009Document {
    pub fn new(group_header: GroupHeader) -> Self {
        Self {
            group_header,
            mandates: Vec::new(),
        }
    }

    pub fn with_mandate(&self, mandate: Mandate) -> Self {
        let mut doc = self.clone();
        doc.mandates.push(mandate);
        doc
    }

    pub fn to_xml(&self, version: PainVersion) -> Result<String> {
        let dialect = dialect(version);
        let mut b = start(PainType::Pain009, version)?;
        add_group_header(&mut b, &self.group_header, None, dialect);
        for mandate in &self.mandates {
            add_mandate(&mut b, mandate, dialect);
        }
        finish(b)
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        let doc = open(xml, PainType::Pain009)?;
        let root = message_root(&doc, PainType::Pain009)?;
        Ok(Self {
            group_header: read_group_header(&doc, root)?,
            mandates: blocks::children(&doc, root, "Mndt")?
                .into_iter()
                .map(|el| read_mandate(&doc, el))
                .collect::<Result<Vec<_>>>()?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.group_header.validate()?;
        if self.mandates.is_empty() {
            return Err(Error::validation("Mndt", "at least one is required"));
        }
        for mandate in &self.mandates {
            validate_max35("MndtReqId", &mandate.mandate_request_id)?;
            validate_optional_max35("MndtId", mandate.mandate_id.as_deref())?;
            validate_not_empty("Cdtr/Nm", mandate.creditor.name.as_deref())?;
            validate_not_empty("Dbtr/Nm", mandate.debtor.name.as_deref())?;
            for (field, amount) in [("ColltnAmt", &mandate.collection_amount), ("MaxAmt", &mandate.maximum_amount)] {
                if let Some(amount) = amount {
                    validate_amount(field, amount)?;
                }
            }
        }
        Ok(())
    }
}

xml_io!(Pain009Document, PainVersion);

fn add_mandate(b: &mut XmlBuilder, mandate: &Mandate, dialect: Dialect) {
    // MndtId and CdtrSchmeId are not part of the 2009 mandate schema
    let current = dialect == Dialect::CURRENT;
    b.add_element("Mndt");
    if current {
        b.add_optional_child("MndtId", mandate.mandate_id.as_deref());
    }
    b.add_child("MndtReqId", &mandate.mandate_request_id);
    if mandate.service_level.is_some() || mandate.local_instrument.is_some() {
        b.add_element("Tp");
        if let Some(level) = &mandate.service_level {
            b.add_element("SvcLvl").add_child("Cd", level).end();
        }
        if let Some(instrument) = &mandate.local_instrument {
            b.add_element("LclInstrm").add_child("Cd", instrument).end();
        }
        b.end();
    }
    if mandate.has_occurrences() {
        b.add_element("Ocrncs");
        b.add_optional_child("SeqTp", mandate.sequence_type.map(|s| s.code()));
        if let Some(frequency) = &mandate.frequency {
            if current {
                b.add_element("Frqcy").add_child("Tp", frequency).end();
            } else {
                b.add_child("Frqcy", frequency);
            }
        }
        if let Some(date) = &mandate.first_collection_date {
            b.add_child("FrstColltnDt", &format_date(date));
        }
        if let Some(date) = &mandate.final_collection_date {
            b.add_child("FnlColltnDt", &format_date(date));
        }
        b.end();
    }
    blocks::add_optional_amount(b, "ColltnAmt", mandate.collection_amount.as_ref());
    blocks::add_optional_amount(b, "MaxAmt", mandate.maximum_amount.as_ref());
    if current {
        if let Some(id) = &mandate.creditor_scheme_id {
            blocks::add_creditor_scheme_id(b, id);
        }
    }
    blocks::add_party(b, "Cdtr", &mandate.creditor, dialect);
    if let Some(account) = &mandate.creditor_account {
        blocks::add_account(b, "CdtrAcct", account);
    }
    if let Some(agent) = &mandate.creditor_agent {
        blocks::add_agent(b, "CdtrAgt", Some(agent), dialect);
    }
    blocks::add_party(b, "Dbtr", &mandate.debtor, dialect);
    if let Some(account) = &mandate.debtor_account {
        blocks::add_account(b, "DbtrAcct", account);
    }
    blocks::add_agent(b, "DbtrAgt", mandate.debtor_agent.as_ref(), dialect);
    b.end();
}

fn read_mandate(doc: &XmlDocument, el: &Element) -> Result<Mandate> {
    let sequence_type = blocks::text(doc, el, "Ocrncs/SeqTp")?
        .map(|code| SequenceType::from_code(&code))
        .transpose()?;
    Ok(Mandate {
        mandate_id: blocks::text(doc, el, "MndtId")?,
        mandate_request_id: blocks::required_text(doc, el, "MndtReqId")?,
        service_level: blocks::text(doc, el, "Tp/SvcLvl/Cd")?,
        local_instrument: blocks::text(doc, el, "Tp/LclInstrm/Cd")?,
        sequence_type,
        frequency: blocks::text_with_fallback(doc, el, &["Ocrncs/Frqcy/Tp", "Ocrncs/Frqcy"])?,
        first_collection_date: blocks::optional_date(doc, el, &["Ocrncs/FrstColltnDt"])?,
        final_collection_date: blocks::optional_date(doc, el, &["Ocrncs/FnlColltnDt"])?,
        collection_amount: blocks::optional_amount(doc, el, "ColltnAmt", DEFAULT_CURRENCY)?,
        maximum_amount: blocks::optional_amount(doc, el, "MaxAmt", DEFAULT_CURRENCY)?,
        creditor_scheme_id: blocks::read_creditor_scheme_id(doc, el)?,
        creditor: blocks::read_optional_party(doc, el, "Cdtr")?.unwrap_or_default(),
        creditor_account: blocks::read_optional_account(doc, el, "CdtrAcct")?,
        creditor_agent: blocks::read_agent(doc, el, "CdtrAgt")?,
        debtor: blocks::read_optional_party(doc, el, "Dbtr")?.unwrap_or_default(),
        debtor_account: blocks::read_optional_account(doc, el, "DbtrAcct")?,
        debtor_agent: blocks::read_agent(doc, el, "DbtrAgt")?,
    })
}
