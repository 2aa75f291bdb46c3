//! Building blocks shared by the ISO 20022 generators and parsers.
//!
//! Every `add_*` function opens and closes its own elements, so it leaves
//! the builder cursor where it found it. The `read_*` functions are their
//! inverses and resolve schema-version differences through fallback paths.

use super::common::{
    format_date, format_date_time, parse_date, parse_date_time, Assignment, AssignmentParty, Case,
    UnderlyingKind, UnderlyingTransaction,
};
use crate::error::{Error, Result};
use crate::types::{Account, Amount, FinancialInstitution, Party, PostalAddress, RemittanceInformation};
use crate::xml::{Element, XmlBuilder, XmlDocument};
use chrono::{NaiveDate, NaiveDateTime};

/// Placeholder used when an agent is not known.
pub const NOT_PROVIDED: &str = "NOTPROVIDED";

/// Element names that differ between schema generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    /// `BIC` (2009 schemas) or `BICFI`.
    pub bic: &'static str,
    /// `BICOrBEI` (2009 schemas) or `AnyBIC`.
    pub org_bic: &'static str,
    /// Related parties wrapped in `Pty` (`RltdPties/Dbtr/Pty/Nm`).
    pub wrapped_party: bool,
    /// Entry status as `Sts/Cd` instead of plain `Sts`.
    pub status_code: bool,
    /// Dates as a `Dt`/`DtTm` choice (`ReqdExctnDt/Dt`).
    pub date_choice: bool,
}

impl Dialect {
    pub const LEGACY: Dialect = Dialect {
        bic: "BIC",
        org_bic: "BICOrBEI",
        wrapped_party: false,
        status_code: false,
        date_choice: false,
    };

    pub const CURRENT: Dialect = Dialect {
        bic: "BICFI",
        org_bic: "AnyBIC",
        wrapped_party: true,
        status_code: true,
        date_choice: true,
    };
}

fn fin_instn_bic_paths() -> [&'static str; 2] {
    ["FinInstnId/BICFI", "FinInstnId/BIC"]
}

// ---------------------------------------------------------------------------
// generation
// ---------------------------------------------------------------------------

/// `<tag Ccy="…">1.00</tag>`
pub fn add_amount(b: &mut XmlBuilder, tag: &str, amount: &Amount) {
    b.add_child(tag, &amount.format_iso()).with_attribute("Ccy", &amount.currency);
}

pub fn add_optional_amount(b: &mut XmlBuilder, tag: &str, amount: Option<&Amount>) {
    if let Some(amount) = amount {
        add_amount(b, tag, amount);
    }
}

/// `<tag><FinInstnId><BICFI>…</BICFI></FinInstnId></tag>`
pub fn add_agent_by_bic(b: &mut XmlBuilder, tag: &str, bic: &str, dialect: Dialect) {
    b.add_element(tag).add_element("FinInstnId");
    b.add_child(dialect.bic, bic);
    b.end().end();
}

/// `FinInstnId` content; an institution without any identification is
/// written as `Othr/Id NOTPROVIDED`.
pub fn add_financial_institution(b: &mut XmlBuilder, institution: &FinancialInstitution, dialect: Dialect) {
    b.add_element("FinInstnId");
    b.add_optional_child(dialect.bic, institution.bic.as_deref());
    if let Some(member) = &institution.clearing_member_id {
        b.add_element("ClrSysMmbId").add_child("MmbId", member).end();
    }
    b.add_optional_child("Nm", institution.name.as_deref());
    if institution.bic.is_none() && institution.clearing_member_id.is_none() && institution.name.is_none() {
        b.add_element("Othr").add_child("Id", NOT_PROVIDED).end();
    }
    b.end();
}

/// Agent element; `None` yields the `NOTPROVIDED` placeholder.
pub fn add_agent(b: &mut XmlBuilder, tag: &str, institution: Option<&FinancialInstitution>, dialect: Dialect) {
    b.add_element(tag);
    add_financial_institution(b, &institution.cloned().unwrap_or_default(), dialect);
    b.end();
}

pub fn add_postal_address(b: &mut XmlBuilder, address: &PostalAddress) {
    if address.is_empty() {
        return;
    }
    b.add_element("PstlAdr");
    b.add_optional_child("StrtNm", address.street_name.as_deref())
        .add_optional_child("BldgNb", address.building_number.as_deref())
        .add_optional_child("PstCd", address.postal_code.as_deref())
        .add_optional_child("TwnNm", address.town_name.as_deref())
        .add_optional_child("Ctry", address.country.as_deref());
    for line in &address.address_lines {
        b.add_child("AdrLine", line);
    }
    b.end();
}

/// Party content (`Nm`, `PstlAdr`, `Id`) without the enclosing element.
fn add_party_content(b: &mut XmlBuilder, party: &Party, dialect: Dialect) {
    b.add_optional_child("Nm", party.name.as_deref());
    if let Some(address) = &party.postal_address {
        add_postal_address(b, address);
    }
    if party.bic.is_some() || party.identification.is_some() {
        b.add_element("Id").add_element("OrgId");
        b.add_optional_child(dialect.org_bic, party.bic.as_deref());
        if let Some(id) = &party.identification {
            b.add_element("Othr").add_child("Id", id).end();
        }
        b.end().end();
    }
}

/// `<tag>` with the party content; absent fields are omitted.
pub fn add_party(b: &mut XmlBuilder, tag: &str, party: &Party, dialect: Dialect) {
    b.add_element(tag);
    add_party_content(b, party, dialect);
    b.end();
}

/// Related party, wrapped in `Pty` for newer schemas.
pub fn add_related_party(b: &mut XmlBuilder, tag: &str, party: &Party, dialect: Dialect) {
    b.add_element(tag);
    if dialect.wrapped_party {
        b.add_element("Pty");
        add_party_content(b, party, dialect);
        b.end();
    } else {
        add_party_content(b, party, dialect);
    }
    b.end();
}

/// `<tag><Id><IBAN>…</IBAN></Id><Ccy/><Nm/></tag>`
pub fn add_account(b: &mut XmlBuilder, tag: &str, account: &Account) {
    b.add_element(tag);
    add_account_content(b, account);
    b.end();
}

/// `Id`, `Ccy` and `Nm` of an account, for callers that append more
/// children (`Ownr`, `Svcr`) to the account element.
pub fn add_account_content(b: &mut XmlBuilder, account: &Account) {
    b.add_element("Id");
    match (&account.iban, &account.other_id) {
        (Some(iban), _) => {
            b.add_child("IBAN", iban);
        }
        (None, Some(other)) => {
            b.add_element("Othr").add_child("Id", other).end();
        }
        (None, None) => {
            b.add_element("Othr").add_child("Id", NOT_PROVIDED).end();
        }
    }
    b.end();
    b.add_optional_child("Ccy", account.currency.as_deref())
        .add_optional_child("Nm", account.name.as_deref());
}

/// SEPA creditor identifier (`CdtrSchmeId/Id/PrvtId/Othr`).
pub fn add_creditor_scheme_id(b: &mut XmlBuilder, id: &str) {
    b.add_element("CdtrSchmeId").add_element("Id").add_element("PrvtId").add_element("Othr");
    b.add_child("Id", id);
    b.add_element("SchmeNm").add_child("Prtry", "SEPA").end();
    b.end().end().end().end();
}

pub fn add_remittance(b: &mut XmlBuilder, remittance: &RemittanceInformation) {
    if remittance.is_empty() {
        return;
    }
    b.add_element("RmtInf");
    for line in &remittance.unstructured {
        b.add_child("Ustrd", line);
    }
    if let Some(reference) = &remittance.creditor_reference {
        b.add_element("Strd")
            .add_element("CdtrRefInf")
            .add_child("Ref", reference)
            .end()
            .end();
    }
    b.end();
}

/// Date, optionally wrapped in the `Dt` choice element.
pub fn add_date(b: &mut XmlBuilder, tag: &str, date: &NaiveDate, wrapped: bool) {
    if wrapped {
        b.add_element(tag).add_child("Dt", &format_date(date)).end();
    } else {
        b.add_child(tag, &format_date(date));
    }
}

fn add_assignment_party(b: &mut XmlBuilder, tag: &str, party: &AssignmentParty, dialect: Dialect) {
    b.add_element(tag);
    match party {
        AssignmentParty::Agent(agent) => {
            b.add_element("Agt");
            add_financial_institution(b, agent, dialect);
            b.end();
        }
        AssignmentParty::Party(party) => add_party(b, "Pty", party, dialect),
    }
    b.end();
}

/// `Assgnmt`: `Id`, `Assgnr`, `Assgne`, `CreDtTm`.
pub fn add_assignment(b: &mut XmlBuilder, assignment: &Assignment, dialect: Dialect) {
    b.add_element("Assgnmt");
    b.add_child("Id", &assignment.id);
    add_assignment_party(b, "Assgnr", &assignment.assigner, dialect);
    add_assignment_party(b, "Assgne", &assignment.assignee, dialect);
    b.add_child("CreDtTm", &format_date_time(&assignment.creation_date_time));
    b.end();
}

/// Case block under `tag`; nothing is written without a case.
pub fn add_case(b: &mut XmlBuilder, tag: &str, case: Option<&Case>, dialect: Dialect) {
    let Some(case) = case else {
        return;
    };
    b.add_element(tag);
    b.add_child("Id", &case.id);
    if let Some(creator) = &case.creator {
        add_assignment_party(b, "Cretr", creator, dialect);
    }
    if let Some(reopen) = case.reopen_case_indication {
        b.add_child("ReopCaseIndctn", if reopen { "true" } else { "false" });
    }
    b.end();
}

fn add_original_group(b: &mut XmlBuilder, underlying: &UnderlyingTransaction) {
    let Some(message_id) = &underlying.original_message_id else {
        return;
    };
    b.add_element("OrgnlGrpInf");
    b.add_child("OrgnlMsgId", message_id);
    b.add_child(
        "OrgnlMsgNmId",
        underlying.original_message_name_id.as_deref().unwrap_or(NOT_PROVIDED),
    );
    if let Some(created) = &underlying.original_creation_date_time {
        b.add_child("OrgnlCreDtTm", &format_date_time(created));
    }
    b.end();
}

/// `Undrlg` with `Initn` or `IntrBk`; every absent field is omitted.
pub fn add_underlying(b: &mut XmlBuilder, underlying: &UnderlyingTransaction) {
    b.add_element("Undrlg");
    match underlying.kind {
        UnderlyingKind::Initiation => b.add_element("Initn"),
        UnderlyingKind::Interbank => b.add_element("IntrBk"),
    };
    add_original_reference(b, underlying);
    b.end().end();
}

/// Original group, ids, amount and date of an underlying transaction,
/// written into the current element.
pub fn add_original_reference(b: &mut XmlBuilder, underlying: &UnderlyingTransaction) {
    add_original_group(b, underlying);
    match underlying.kind {
        UnderlyingKind::Initiation => {
            b.add_optional_child("OrgnlPmtInfId", underlying.original_payment_information_id.as_deref())
                .add_optional_child("OrgnlInstrId", underlying.original_instruction_id.as_deref())
                .add_optional_child("OrgnlEndToEndId", underlying.original_end_to_end_id.as_deref())
                .add_optional_child("OrgnlUETR", underlying.original_uetr.as_deref());
            add_optional_amount(b, "OrgnlInstdAmt", underlying.amount.as_ref());
            if let Some(date) = &underlying.date {
                add_date(b, "ReqdExctnDt", date, true);
            }
        }
        UnderlyingKind::Interbank => {
            b.add_optional_child("OrgnlInstrId", underlying.original_instruction_id.as_deref())
                .add_optional_child("OrgnlEndToEndId", underlying.original_end_to_end_id.as_deref())
                .add_optional_child("OrgnlTxId", underlying.original_transaction_id.as_deref())
                .add_optional_child("OrgnlUETR", underlying.original_uetr.as_deref());
            add_optional_amount(b, "OrgnlIntrBkSttlmAmt", underlying.amount.as_ref());
            if let Some(date) = &underlying.date {
                b.add_child("OrgnlIntrBkSttlmDt", &format_date(date));
            }
        }
    }
}

/// `<tag><Rsn><Cd>…</Cd></Rsn><AddtlInf>…</AddtlInf></tag>`
pub fn add_reason(b: &mut XmlBuilder, tag: &str, code: Option<&str>, additional_info: Option<&str>) {
    if code.is_none() && additional_info.is_none() {
        return;
    }
    b.add_element(tag);
    if let Some(code) = code {
        b.add_element("Rsn").add_child("Cd", code).end();
    }
    b.add_optional_child("AddtlInf", additional_info);
    b.end();
}

// ---------------------------------------------------------------------------
// parsing
// ---------------------------------------------------------------------------

/// Optional string relative to `ctx`.
pub fn text(doc: &XmlDocument, ctx: &Element, expr: &str) -> Result<Option<String>> {
    doc.xpath_string_in(Some(ctx), expr)
}

/// First non-empty string of `exprs` relative to `ctx`.
pub fn text_with_fallback(doc: &XmlDocument, ctx: &Element, exprs: &[&str]) -> Result<Option<String>> {
    doc.xpath_string_with_fallback(Some(ctx), exprs)
}

/// Required string relative to `ctx`.
pub fn required_text(doc: &XmlDocument, ctx: &Element, expr: &str) -> Result<String> {
    text(doc, ctx, expr)?.ok_or_else(|| Error::RequiredNode(format!("{}/{}", ctx.local_name(), expr)))
}

pub fn child<'a>(doc: &'a XmlDocument, ctx: &'a Element, expr: &str) -> Result<Option<&'a Element>> {
    Ok(doc.select_in(Some(ctx), expr)?.into_iter().next())
}

pub fn children<'a>(doc: &'a XmlDocument, ctx: &'a Element, expr: &str) -> Result<Vec<&'a Element>> {
    doc.select_in(Some(ctx), expr)
}

pub fn optional_date(doc: &XmlDocument, ctx: &Element, exprs: &[&str]) -> Result<Option<NaiveDate>> {
    text_with_fallback(doc, ctx, exprs)?.map(|v| parse_date(&v)).transpose()
}

pub fn optional_date_time(doc: &XmlDocument, ctx: &Element, expr: &str) -> Result<Option<NaiveDateTime>> {
    text(doc, ctx, expr)?.map(|v| parse_date_time(&v)).transpose()
}

pub fn required_date_time(doc: &XmlDocument, ctx: &Element, expr: &str) -> Result<NaiveDateTime> {
    parse_date_time(&required_text(doc, ctx, expr)?)
}

pub fn optional_bool(doc: &XmlDocument, ctx: &Element, expr: &str) -> Result<Option<bool>> {
    Ok(text(doc, ctx, expr)?.map(|v| v.trim() == "true" || v.trim() == "1"))
}

/// Amount at `expr` if the element exists.
pub fn optional_amount(doc: &XmlDocument, ctx: &Element, expr: &str, default_currency: &str) -> Result<Option<Amount>> {
    if child(doc, ctx, expr)?.is_none() {
        return Ok(None);
    }
    doc.amount_with_currency(Some(ctx), expr, default_currency).map(Some)
}

/// Institution below `ctx` (the agent element); `NOTPROVIDED` reads as absent.
pub fn read_financial_institution(doc: &XmlDocument, ctx: &Element) -> Result<Option<FinancialInstitution>> {
    let institution = FinancialInstitution {
        bic: text_with_fallback(doc, ctx, &fin_instn_bic_paths())?,
        name: text(doc, ctx, "FinInstnId/Nm")?,
        clearing_member_id: text(doc, ctx, "FinInstnId/ClrSysMmbId/MmbId")?,
    };
    if institution == FinancialInstitution::default() {
        return Ok(None);
    }
    Ok(Some(institution))
}

pub fn read_agent(doc: &XmlDocument, ctx: &Element, tag: &str) -> Result<Option<FinancialInstitution>> {
    match child(doc, ctx, tag)? {
        Some(agent) => read_financial_institution(doc, agent),
        None => Ok(None),
    }
}

pub fn read_postal_address(doc: &XmlDocument, ctx: &Element) -> Result<Option<PostalAddress>> {
    let Some(el) = child(doc, ctx, "PstlAdr")? else {
        return Ok(None);
    };
    let address = PostalAddress {
        street_name: text(doc, el, "StrtNm")?,
        building_number: text(doc, el, "BldgNb")?,
        postal_code: text(doc, el, "PstCd")?,
        town_name: text(doc, el, "TwnNm")?,
        country: text(doc, el, "Ctry")?,
        address_lines: children(doc, el, "AdrLine")?.into_iter().map(Element::text).collect(),
    };
    Ok(if address.is_empty() { None } else { Some(address) })
}

/// Party content of `ctx`, accepting both the flat and the `Pty`-wrapped form.
pub fn read_party(doc: &XmlDocument, ctx: &Element) -> Result<Party> {
    let el = child(doc, ctx, "Pty")?.unwrap_or(ctx);
    Ok(Party {
        name: text(doc, el, "Nm")?,
        postal_address: read_postal_address(doc, el)?,
        bic: text_with_fallback(doc, el, &["Id/OrgId/AnyBIC", "Id/OrgId/BICOrBEI"])?,
        identification: text_with_fallback(doc, el, &["Id/OrgId/Othr/Id", "Id/PrvtId/Othr/Id"])?,
    })
}

pub fn read_optional_party(doc: &XmlDocument, ctx: &Element, tag: &str) -> Result<Option<Party>> {
    match child(doc, ctx, tag)? {
        Some(el) => {
            let party = read_party(doc, el)?;
            Ok(if party.is_empty() { None } else { Some(party) })
        }
        None => Ok(None),
    }
}

pub fn read_account(doc: &XmlDocument, ctx: &Element) -> Result<Account> {
    let other_id = text(doc, ctx, "Id/Othr/Id")?.filter(|id| id != NOT_PROVIDED);
    Ok(Account {
        iban: text(doc, ctx, "Id/IBAN")?,
        other_id,
        currency: text(doc, ctx, "Ccy")?,
        name: text(doc, ctx, "Nm")?,
    })
}

pub fn read_optional_account(doc: &XmlDocument, ctx: &Element, tag: &str) -> Result<Option<Account>> {
    match child(doc, ctx, tag)? {
        Some(el) => read_account(doc, el).map(Some),
        None => Ok(None),
    }
}

pub fn read_remittance(doc: &XmlDocument, ctx: &Element) -> Result<Option<RemittanceInformation>> {
    let Some(el) = child(doc, ctx, "RmtInf")? else {
        return Ok(None);
    };
    let remittance = RemittanceInformation {
        unstructured: children(doc, el, "Ustrd")?.into_iter().map(Element::text).collect(),
        creditor_reference: text(doc, el, "Strd/CdtrRefInf/Ref")?,
    };
    Ok(if remittance.is_empty() { None } else { Some(remittance) })
}

fn read_assignment_party(doc: &XmlDocument, ctx: &Element) -> Result<AssignmentParty> {
    if let Some(agent) = child(doc, ctx, "Agt")? {
        return Ok(AssignmentParty::Agent(
            read_financial_institution(doc, agent)?.unwrap_or_default(),
        ));
    }
    Ok(AssignmentParty::Party(read_party(doc, ctx)?))
}

pub fn read_assignment(doc: &XmlDocument, ctx: &Element) -> Result<Assignment> {
    let el = child(doc, ctx, "Assgnmt")?
        .ok_or_else(|| Error::RequiredNode(format!("{}/Assgnmt", ctx.local_name())))?;
    let assigner = child(doc, el, "Assgnr")?.ok_or_else(|| Error::RequiredNode("Assgnmt/Assgnr".to_string()))?;
    let assignee = child(doc, el, "Assgne")?.ok_or_else(|| Error::RequiredNode("Assgnmt/Assgne".to_string()))?;
    Ok(Assignment {
        id: required_text(doc, el, "Id")?,
        assigner: read_assignment_party(doc, assigner)?,
        assignee: read_assignment_party(doc, assignee)?,
        creation_date_time: required_date_time(doc, el, "CreDtTm")?,
    })
}

pub fn read_case(doc: &XmlDocument, ctx: &Element, tag: &str) -> Result<Option<Case>> {
    let Some(el) = child(doc, ctx, tag)? else {
        return Ok(None);
    };
    let creator = match child(doc, el, "Cretr")? {
        Some(creator) => Some(read_assignment_party(doc, creator)?),
        None => None,
    };
    Ok(Some(Case {
        id: required_text(doc, el, "Id")?,
        creator,
        reopen_case_indication: optional_bool(doc, el, "ReopCaseIndctn")?,
    }))
}

pub fn read_underlying(doc: &XmlDocument, ctx: &Element, default_currency: &str) -> Result<Option<UnderlyingTransaction>> {
    let Some(undrlg) = child(doc, ctx, "Undrlg")? else {
        return Ok(None);
    };
    if let Some(el) = child(doc, undrlg, "Initn")? {
        return read_original_reference(doc, el, UnderlyingKind::Initiation, default_currency).map(Some);
    }
    if let Some(el) = child(doc, undrlg, "IntrBk")? {
        return read_original_reference(doc, el, UnderlyingKind::Interbank, default_currency).map(Some);
    }
    Ok(None)
}

/// Inverse of [`add_original_reference`].
pub fn read_original_reference(
    doc: &XmlDocument,
    el: &Element,
    kind: UnderlyingKind,
    default_currency: &str,
) -> Result<UnderlyingTransaction> {
    let (amount_tag, date_paths): (&str, &[&str]) = match kind {
        UnderlyingKind::Initiation => ("OrgnlInstdAmt", &["ReqdExctnDt/Dt", "ReqdExctnDt"]),
        UnderlyingKind::Interbank => ("OrgnlIntrBkSttlmAmt", &["OrgnlIntrBkSttlmDt"]),
    };
    Ok(UnderlyingTransaction {
        kind,
        original_message_id: text(doc, el, "OrgnlGrpInf/OrgnlMsgId")?,
        original_message_name_id: text(doc, el, "OrgnlGrpInf/OrgnlMsgNmId")?,
        original_creation_date_time: optional_date_time(doc, el, "OrgnlGrpInf/OrgnlCreDtTm")?,
        original_payment_information_id: text(doc, el, "OrgnlPmtInfId")?,
        original_instruction_id: text(doc, el, "OrgnlInstrId")?,
        original_end_to_end_id: text(doc, el, "OrgnlEndToEndId")?,
        original_transaction_id: text(doc, el, "OrgnlTxId")?,
        original_uetr: text(doc, el, "OrgnlUETR")?,
        amount: optional_amount(doc, el, amount_tag, default_currency)?,
        date: optional_date(doc, el, date_paths)?,
    })
}

pub fn read_creditor_scheme_id(doc: &XmlDocument, ctx: &Element) -> Result<Option<String>> {
    text_with_fallback(doc, ctx, &["CdtrSchmeId/Id/PrvtId/Othr/Id", "CdtrSchmeId/Id/OrgId/Othr/Id"])
}

/// `(code, additional info)` of a reason block below `ctx`.
pub fn read_reason(doc: &XmlDocument, ctx: &Element, tag: &str) -> Result<(Option<String>, Option<String>)> {
    match child(doc, ctx, tag)? {
        Some(el) => Ok((
            text_with_fallback(doc, el, &["Rsn/Cd", "Rsn/Prtry"])?,
            text(doc, el, "AddtlInf")?,
        )),
        None => Ok((None, None)),
    }
}

/// The message element below `Document`, e.g. `ClmNonRct`.
pub fn message_root<'a>(doc: &'a XmlDocument, name: &str) -> Result<&'a Element> {
    doc.required_node(None, &format!("//{}", name), &format!("{} element", name))
}
