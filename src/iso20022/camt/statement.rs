//! camt.052 account report, camt.053 statement and camt.054 debit/credit
//! notification.
//!
//! The three messages share one model. [`ReportKind`] picks the message
//! element and the per-account element (`Rpt`, `Stmt`, `Ntfctn`); the
//! schema version picks the element dialect (see [`dialect`]).

use super::{finish, message_root, open, start, DEFAULT_CURRENCY};
use crate::error::{Error, Result};
use crate::gvc::GvcCode;
use crate::iso20022::blocks::{self, Dialect};
use crate::iso20022::common::{
    format_date, format_date_time, validate_currency, validate_max35, validate_not_empty,
    validate_optional_max35, GroupHeader,
};
use crate::iso20022::{CamtType, CamtVersion, MessageType};
use crate::types::{Account, Amount, DebitCredit, FinancialInstitution, Party, RemittanceInformation};
use crate::xml::{Element, XmlBuilder, XmlDocument};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use tracing::debug;

/// Issuer written for proprietary `NTRF+GVC` codes.
pub const PROPRIETARY_ISSUER: &str = "DK";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    /// camt.052 `Rpt`
    Report,
    /// camt.053 `Stmt`
    Statement,
    /// camt.054 `Ntfctn`
    Notification,
}

impl ReportKind {
    pub fn camt_type(&self) -> CamtType {
        match self {
            ReportKind::Report => CamtType::Camt052,
            ReportKind::Statement => CamtType::Camt053,
            ReportKind::Notification => CamtType::Camt054,
        }
    }

    pub fn from_camt_type(camt_type: CamtType) -> Option<Self> {
        match camt_type {
            CamtType::Camt052 => Some(ReportKind::Report),
            CamtType::Camt053 => Some(ReportKind::Statement),
            CamtType::Camt054 => Some(ReportKind::Notification),
            _ => None,
        }
    }

    pub fn element(&self) -> &'static str {
        match self {
            ReportKind::Report => "Rpt",
            ReportKind::Statement => "Stmt",
            ReportKind::Notification => "Ntfctn",
        }
    }
}

/// Element names per schema generation: `BIC` before V04, flat related
/// parties and plain `Sts` before V08.
pub fn dialect(version: CamtVersion) -> Dialect {
    if version >= CamtVersion::V08 {
        Dialect::CURRENT
    } else if version >= CamtVersion::V04 {
        Dialect {
            wrapped_party: false,
            status_code: false,
            ..Dialect::CURRENT
        }
    } else {
        Dialect::LEGACY
    }
}

/// `Bal/Tp/CdOrPrtry/Cd`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BalanceType {
    OpeningBooked,
    ClosingBooked,
    ClosingAvailable,
    ForwardAvailable,
    InterimBooked,
    InterimAvailable,
    PreviouslyClosedBooked,
}

impl BalanceType {
    pub fn code(&self) -> &'static str {
        match self {
            BalanceType::OpeningBooked => "OPBD",
            BalanceType::ClosingBooked => "CLBD",
            BalanceType::ClosingAvailable => "CLAV",
            BalanceType::ForwardAvailable => "FWAV",
            BalanceType::InterimBooked => "ITBD",
            BalanceType::InterimAvailable => "ITAV",
            BalanceType::PreviouslyClosedBooked => "PRCD",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "OPBD" => Some(BalanceType::OpeningBooked),
            "CLBD" => Some(BalanceType::ClosingBooked),
            "CLAV" => Some(BalanceType::ClosingAvailable),
            "FWAV" => Some(BalanceType::ForwardAvailable),
            "ITBD" => Some(BalanceType::InterimBooked),
            "ITAV" => Some(BalanceType::InterimAvailable),
            "PRCD" => Some(BalanceType::PreviouslyClosedBooked),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CashBalance {
    pub balance_type: BalanceType,
    pub debit_credit: DebitCredit,
    /// Always non-negative; the sign is in `debit_credit`.
    pub amount: Amount,
    pub date: NaiveDate,
}

impl CashBalance {
    pub fn new(balance_type: BalanceType, debit_credit: DebitCredit, amount: Amount, date: NaiveDate) -> Self {
        Self {
            balance_type,
            debit_credit,
            amount: Amount::new(amount.value.abs(), amount.currency),
            date,
        }
    }

    pub fn signed_value(&self) -> Decimal {
        if self.debit_credit.is_debit() {
            -self.amount.value
        } else {
            self.amount.value
        }
    }
}

/// `BkTxCd`: the ISO domain/family/sub family triple and a proprietary code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BankTransactionCode {
    pub domain: Option<String>,
    pub family: Option<String>,
    pub sub_family: Option<String>,
    /// German banks write `<SWIFT code>+<GVC>[+<text key>]`, e.g. `NTRF+166`.
    pub proprietary_code: Option<String>,
    pub proprietary_issuer: Option<String>,
}

impl BankTransactionCode {
    /// ISO triple of `gvc` plus the proprietary `<swift_code>+<GVC>` code.
    pub fn from_gvc(gvc: GvcCode, debit_credit: DebitCredit, swift_code: &str) -> Self {
        let (domain, family, sub_family) = gvc.to_camt_codes(debit_credit);
        Self {
            domain: Some(domain.to_string()),
            family: Some(family.to_string()),
            sub_family: Some(sub_family.to_string()),
            proprietary_code: Some(format!("{}+{}", swift_code, gvc.code())),
            proprietary_issuer: Some(PROPRIETARY_ISSUER.to_string()),
        }
    }

    /// GVC from the proprietary code, else classified from the ISO triple.
    pub fn gvc(&self, debit_credit: DebitCredit, is_return: bool) -> Option<GvcCode> {
        let proprietary = self
            .proprietary_code
            .as_deref()
            .and_then(|code| code.split('+').nth(1))
            .and_then(GvcCode::try_from_code);
        proprietary.or_else(|| {
            GvcCode::try_from_camt_codes(
                self.domain.as_deref()?,
                self.family.as_deref().unwrap_or_default(),
                self.sub_family.as_deref().unwrap_or_default(),
                debit_credit,
                is_return,
            )
        })
    }

    /// Leading SWIFT transaction type of the proprietary code (`NTRF`).
    pub fn swift_code(&self) -> Option<&str> {
        self.proprietary_code
            .as_deref()
            .and_then(|code| code.split('+').next())
            .filter(|code| code.len() == 4 && code.starts_with('N'))
    }
}

/// `NtryDtls/TxDtls`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionDetails {
    pub account_servicer_reference: Option<String>,
    pub instruction_id: Option<String>,
    pub end_to_end_id: Option<String>,
    pub mandate_id: Option<String>,
    pub amount: Option<Amount>,
    pub debtor: Option<Party>,
    pub debtor_account: Option<Account>,
    pub ultimate_debtor: Option<Party>,
    pub creditor: Option<Party>,
    pub creditor_account: Option<Account>,
    pub ultimate_creditor: Option<Party>,
    pub debtor_agent: Option<FinancialInstitution>,
    pub creditor_agent: Option<FinancialInstitution>,
    pub remittance: Option<RemittanceInformation>,
    /// `RtrInf/Rsn/Cd`
    pub return_reason: Option<String>,
    pub additional_information: Option<String>,
}

impl TransactionDetails {
    /// The other side of the booking: creditor of a debit, debtor of a credit.
    pub fn counterparty(&self, debit_credit: DebitCredit) -> (Option<&Party>, Option<&Account>, Option<&FinancialInstitution>) {
        match debit_credit {
            DebitCredit::Debit => (
                self.creditor.as_ref(),
                self.creditor_account.as_ref(),
                self.creditor_agent.as_ref(),
            ),
            DebitCredit::Credit => (
                self.debtor.as_ref(),
                self.debtor_account.as_ref(),
                self.debtor_agent.as_ref(),
            ),
        }
    }
}

/// `Ntry`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub reference: Option<String>,
    pub amount: Amount,
    pub debit_credit: DebitCredit,
    pub reversal: bool,
    /// `BOOK`, `PDNG` or `INFO`.
    pub status: String,
    pub booking_date: Option<NaiveDate>,
    pub value_date: Option<NaiveDate>,
    pub account_servicer_reference: Option<String>,
    pub bank_transaction_code: Option<BankTransactionCode>,
    pub details: Vec<TransactionDetails>,
    pub additional_information: Option<String>,
}

impl Entry {
    /// A booked entry.
    pub fn new(amount: Amount, debit_credit: DebitCredit, booking_date: NaiveDate) -> Self {
        Self {
            reference: None,
            amount: Amount::new(amount.value.abs(), amount.currency),
            debit_credit,
            reversal: false,
            status: "BOOK".to_string(),
            booking_date: Some(booking_date),
            value_date: None,
            account_servicer_reference: None,
            bank_transaction_code: None,
            details: Vec::new(),
            additional_information: None,
        }
    }

    pub fn signed_value(&self) -> Decimal {
        if self.debit_credit.is_debit() {
            -self.amount.value
        } else {
            self.amount.value
        }
    }

    /// GVC of the bank transaction code; a return reason marks a return.
    pub fn gvc(&self) -> Option<GvcCode> {
        let is_return = self.reversal || self.details.iter().any(|d| d.return_reason.is_some());
        self.bank_transaction_code
            .as_ref()
            .and_then(|code| code.gvc(self.debit_credit, is_return))
    }
}

/// `TxsSummry`, computed from the entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionsSummary {
    pub credit_entries: usize,
    pub credit_sum: Decimal,
    pub debit_entries: usize,
    pub debit_sum: Decimal,
}

impl TransactionsSummary {
    pub fn entries(&self) -> usize {
        self.credit_entries + self.debit_entries
    }

    pub fn sum(&self) -> Decimal {
        self.credit_sum + self.debit_sum
    }
}

/// One account's `Rpt`, `Stmt` or `Ntfctn`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountReport {
    pub id: String,
    pub electronic_sequence_number: Option<u64>,
    pub creation_date_time: Option<NaiveDateTime>,
    pub account: Account,
    pub owner: Option<Party>,
    pub servicer: Option<FinancialInstitution>,
    /// Not written for notifications.
    pub balances: Vec<CashBalance>,
    pub entries: Vec<Entry>,
    pub additional_information: Option<String>,
}

impl AccountReport {
    pub fn new(id: impl Into<String>, account: Account) -> Self {
        Self {
            id: id.into(),
            electronic_sequence_number: None,
            creation_date_time: None,
            account,
            owner: None,
            servicer: None,
            balances: Vec::new(),
            entries: Vec::new(),
            additional_information: None,
        }
    }

    pub fn with_balance(&self, balance: CashBalance) -> Self {
        let mut report = self.clone();
        report.balances.push(balance);
        report
    }

    pub fn with_entry(&self, entry: Entry) -> Self {
        let mut report = self.clone();
        report.entries.push(entry);
        report
    }

    pub fn balance(&self, balance_type: BalanceType) -> Option<&CashBalance> {
        self.balances.iter().find(|b| b.balance_type == balance_type)
    }

    pub fn summary(&self) -> TransactionsSummary {
        self.entries.iter().fold(TransactionsSummary::default(), |mut s, entry| {
            match entry.debit_credit {
                DebitCredit::Credit => {
                    s.credit_entries += 1;
                    s.credit_sum += entry.amount.value;
                }
                DebitCredit::Debit => {
                    s.debit_entries += 1;
                    s.debit_sum += entry.amount.value;
                }
            }
            s
        })
    }

    fn currency(&self) -> &str {
        self.account
            .currency
            .as_deref()
            .or_else(|| self.balances.first().map(|b| b.amount.currency.as_str()))
            .unwrap_or(DEFAULT_CURRENCY)
    }
}

/// A camt.052, camt.053 or camt.054 message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountReportDocument {
    pub kind: ReportKind,
    /// `initiating_party` has no counterpart in account reports and is not written.
    pub group_header: GroupHeader,
    pub reports: Vec<AccountReport>,
}

impl AccountReportDocument {
    pub fn new(kind: ReportKind, group_header: GroupHeader) -> Self {
        Self {
            kind,
            group_header,
            reports: Vec::new(),
        }
    }

    pub fn with_report(&self, report: AccountReport) -> Self {
        let mut doc = self.clone();
        doc.reports.push(report);
        doc
    }

    pub fn camt_type(&self) -> CamtType {
        self.kind.camt_type()
    }

    /// Generate as the camt type of `kind` in `version`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use finmsg::iso20022::camt::{AccountReport, AccountReportDocument, ReportKind};
    /// use finmsg::iso20022::common::GroupHeader;
    /// use finmsg::iso20022::CamtVersion;
    /// use finmsg::types::Account;
    /// use chrono::NaiveDateTime;
    ///
    /// let created = NaiveDateTime::parse_from_str("2025-01-01T18:00:00", "%Y-%m-%dT%H:%M:%S").unwrap();
    /// let doc = AccountReportDocument::new(ReportKind::Statement, GroupHeader::new("STMT-1", created))
    ///     .with_report(AccountReport::new("S1", Account::iban("DE89370400440532013000")));
    /// let xml = doc.to_xml(CamtVersion::V08).unwrap();
    /// ```
    pub fn to_xml(&self, version: CamtVersion) -> Result<String> {
        let dialect = dialect(version);
        let mut b = start(self.camt_type(), version)?;
        b.add_element("GrpHdr");
        b.add_child("MsgId", &self.group_header.message_id);
        b.add_child("CreDtTm", &format_date_time(&self.group_header.creation_date_time));
        b.end();
        for report in &self.reports {
            self.add_report(&mut b, report, version, dialect);
        }
        finish(b)
    }

    fn add_report(&self, b: &mut XmlBuilder, report: &AccountReport, version: CamtVersion, dialect: Dialect) {
        b.add_element(self.kind.element());
        b.add_child("Id", &report.id);
        if let Some(number) = report.electronic_sequence_number {
            b.add_child("ElctrncSeqNb", &number.to_string());
        }
        if let Some(created) = &report.creation_date_time {
            b.add_child("CreDtTm", &format_date_time(created));
        }

        b.add_element("Acct");
        blocks::add_account_content(b, &report.account);
        if let Some(owner) = &report.owner {
            blocks::add_party(b, "Ownr", owner, dialect);
        }
        if let Some(servicer) = &report.servicer {
            blocks::add_agent(b, "Svcr", Some(servicer), dialect);
        }
        b.end();

        if self.kind != ReportKind::Notification {
            for balance in &report.balances {
                add_balance(b, balance);
            }
        }
        if !report.entries.is_empty() {
            add_summary(b, &report.summary());
        }
        for entry in &report.entries {
            add_entry(b, entry, version, dialect);
        }
        b.add_optional_child(additional_info_tag(self.kind), report.additional_information.as_deref());
        b.end();
    }

    /// Parse camt.052, camt.053 or camt.054, detected from the document.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let sniffed = XmlDocument::parse(xml, "urn:iso:std:iso:20022", &[])?;
        match MessageType::detect(&sniffed) {
            Some(MessageType::Camt(t)) if ReportKind::from_camt_type(t).is_some() => Self::from_xml_as(xml, t),
            Some(other) => Err(Error::InvalidArgument(format!("{} is not an account report", other))),
            None => Err(Error::InvalidFormat("unrecognised account report".to_string())),
        }
    }

    /// Parse as `camt_type`, which must be camt.052, camt.053 or camt.054.
    pub fn from_xml_as(xml: &str, camt_type: CamtType) -> Result<Self> {
        let kind = ReportKind::from_camt_type(camt_type)
            .ok_or_else(|| Error::InvalidArgument(format!("{} is not an account report", camt_type)))?;
        let doc = open(xml, camt_type)?;
        let root = message_root(&doc, camt_type)?;
        let header = doc.required_node(Some(root), "GrpHdr", "group header (GrpHdr)")?;
        let group_header = GroupHeader::new(
            blocks::required_text(&doc, header, "MsgId")?,
            blocks::required_date_time(&doc, header, "CreDtTm")?,
        );
        let reports = blocks::children(&doc, root, kind.element())?
            .into_iter()
            .map(|el| read_report(&doc, el, kind))
            .collect::<Result<Vec<_>>>()?;
        debug!(message = %camt_type, reports = reports.len(), "parsed account report");
        Ok(Self {
            kind,
            group_header,
            reports,
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.group_header.validate()?;
        if self.reports.is_empty() {
            return Err(Error::validation(self.kind.element(), "at least one is required"));
        }
        for report in &self.reports {
            validate_max35("Id", &report.id)?;
            validate_not_empty("Acct/Id", report.account.identifier())?;
            for balance in &report.balances {
                validate_currency("Bal/Amt", &balance.amount.currency)?;
            }
            for entry in &report.entries {
                validate_currency("Ntry/Amt", &entry.amount.currency)?;
                validate_optional_max35("AcctSvcrRef", entry.account_servicer_reference.as_deref())?;
                for details in &entry.details {
                    validate_optional_max35("EndToEndId", details.end_to_end_id.as_deref())?;
                    validate_optional_max35("MndtId", details.mandate_id.as_deref())?;
                }
            }
        }
        Ok(())
    }
}

xml_io!(AccountReportDocument, CamtVersion);

fn additional_info_tag(kind: ReportKind) -> &'static str {
    match kind {
        ReportKind::Report => "AddtlRptInf",
        ReportKind::Statement => "AddtlStmtInf",
        ReportKind::Notification => "AddtlNtfctnInf",
    }
}

fn add_balance(b: &mut XmlBuilder, balance: &CashBalance) {
    b.add_element("Bal");
    b.add_element("Tp")
        .add_element("CdOrPrtry")
        .add_child("Cd", balance.balance_type.code())
        .end()
        .end();
    blocks::add_amount(b, "Amt", &balance.amount);
    b.add_child("CdtDbtInd", balance.debit_credit.iso_code());
    b.add_element("Dt").add_child("Dt", &format_date(&balance.date)).end();
    b.end();
}

fn add_summary(b: &mut XmlBuilder, summary: &TransactionsSummary) {
    b.add_element("TxsSummry");
    b.add_element("TtlNtries")
        .add_child("NbOfNtries", &summary.entries().to_string())
        .add_child("Sum", &format!("{:.2}", summary.sum()))
        .end();
    b.add_element("TtlCdtNtries")
        .add_child("NbOfNtries", &summary.credit_entries.to_string())
        .add_child("Sum", &format!("{:.2}", summary.credit_sum))
        .end();
    b.add_element("TtlDbtNtries")
        .add_child("NbOfNtries", &summary.debit_entries.to_string())
        .add_child("Sum", &format!("{:.2}", summary.debit_sum))
        .end();
    b.end();
}

fn add_bank_transaction_code(b: &mut XmlBuilder, code: &BankTransactionCode) {
    b.add_element("BkTxCd");
    if let Some(domain) = &code.domain {
        b.add_element("Domn").add_child("Cd", domain);
        if let Some(family) = &code.family {
            b.add_element("Fmly")
                .add_child("Cd", family)
                .add_child("SubFmlyCd", code.sub_family.as_deref().unwrap_or("NTAV"))
                .end();
        }
        b.end();
    }
    if let Some(proprietary) = &code.proprietary_code {
        b.add_element("Prtry")
            .add_child("Cd", proprietary)
            .add_optional_child("Issr", code.proprietary_issuer.as_deref())
            .end();
    }
    b.end();
}

fn add_entry(b: &mut XmlBuilder, entry: &Entry, version: CamtVersion, dialect: Dialect) {
    b.add_element("Ntry");
    b.add_optional_child("NtryRef", entry.reference.as_deref());
    blocks::add_amount(b, "Amt", &entry.amount);
    b.add_child("CdtDbtInd", entry.debit_credit.iso_code());
    if entry.reversal {
        b.add_child("RvslInd", "true");
    }
    if dialect.status_code {
        b.add_element("Sts").add_child("Cd", &entry.status).end();
    } else {
        b.add_child("Sts", &entry.status);
    }
    if let Some(date) = &entry.booking_date {
        blocks::add_date(b, "BookgDt", date, true);
    }
    if let Some(date) = &entry.value_date {
        blocks::add_date(b, "ValDt", date, true);
    }
    b.add_optional_child("AcctSvcrRef", entry.account_servicer_reference.as_deref());
    if let Some(code) = &entry.bank_transaction_code {
        add_bank_transaction_code(b, code);
    }
    if !entry.details.is_empty() {
        b.add_element("NtryDtls");
        for details in &entry.details {
            add_details(b, details, version, dialect);
        }
        b.end();
    }
    b.add_optional_child("AddtlNtryInf", entry.additional_information.as_deref());
    b.end();
}

fn add_details(b: &mut XmlBuilder, details: &TransactionDetails, version: CamtVersion, dialect: Dialect) {
    b.add_element("TxDtls");
    let has_refs = details.account_servicer_reference.is_some()
        || details.instruction_id.is_some()
        || details.end_to_end_id.is_some()
        || details.mandate_id.is_some();
    if has_refs {
        b.add_element("Refs");
        b.add_optional_child("AcctSvcrRef", details.account_servicer_reference.as_deref())
            .add_optional_child("InstrId", details.instruction_id.as_deref())
            .add_optional_child("EndToEndId", details.end_to_end_id.as_deref())
            .add_optional_child("MndtId", details.mandate_id.as_deref());
        b.end();
    }
    if let Some(amount) = &details.amount {
        if version >= CamtVersion::V04 {
            blocks::add_amount(b, "Amt", amount);
        } else {
            b.add_element("AmtDtls").add_element("TxAmt");
            blocks::add_amount(b, "Amt", amount);
            b.end().end();
        }
    }

    let parties = [
        ("Dbtr", details.debtor.as_ref()),
        ("UltmtDbtr", details.ultimate_debtor.as_ref()),
        ("Cdtr", details.creditor.as_ref()),
        ("UltmtCdtr", details.ultimate_creditor.as_ref()),
    ];
    let has_parties = parties.iter().any(|(_, p)| p.is_some())
        || details.debtor_account.is_some()
        || details.creditor_account.is_some();
    if has_parties {
        b.add_element("RltdPties");
        if let Some(debtor) = &details.debtor {
            blocks::add_related_party(b, "Dbtr", debtor, dialect);
        }
        if let Some(account) = &details.debtor_account {
            blocks::add_account(b, "DbtrAcct", account);
        }
        if let Some(party) = &details.ultimate_debtor {
            blocks::add_related_party(b, "UltmtDbtr", party, dialect);
        }
        if let Some(creditor) = &details.creditor {
            blocks::add_related_party(b, "Cdtr", creditor, dialect);
        }
        if let Some(account) = &details.creditor_account {
            blocks::add_account(b, "CdtrAcct", account);
        }
        if let Some(party) = &details.ultimate_creditor {
            blocks::add_related_party(b, "UltmtCdtr", party, dialect);
        }
        b.end();
    }
    if details.debtor_agent.is_some() || details.creditor_agent.is_some() {
        b.add_element("RltdAgts");
        if let Some(agent) = &details.debtor_agent {
            blocks::add_agent(b, "DbtrAgt", Some(agent), dialect);
        }
        if let Some(agent) = &details.creditor_agent {
            blocks::add_agent(b, "CdtrAgt", Some(agent), dialect);
        }
        b.end();
    }
    if let Some(remittance) = &details.remittance {
        blocks::add_remittance(b, remittance);
    }
    if let Some(reason) = &details.return_reason {
        b.add_element("RtrInf").add_element("Rsn").add_child("Cd", reason).end().end();
    }
    b.add_optional_child("AddtlTxInf", details.additional_information.as_deref());
    b.end();
}

fn read_report(doc: &XmlDocument, el: &Element, kind: ReportKind) -> Result<AccountReport> {
    let account_el = doc.required_node(Some(el), "Acct", "account (Acct)")?;
    let electronic_sequence_number = blocks::text(doc, el, "ElctrncSeqNb")?
        .map(|n| {
            n.trim()
                .parse::<u64>()
                .map_err(|_| Error::ParseError(format!("invalid ElctrncSeqNb '{}'", n)))
        })
        .transpose()?;

    let mut report = AccountReport {
        id: blocks::required_text(doc, el, "Id")?,
        electronic_sequence_number,
        creation_date_time: blocks::optional_date_time(doc, el, "CreDtTm")?,
        account: blocks::read_account(doc, account_el)?,
        owner: blocks::read_optional_party(doc, account_el, "Ownr")?,
        servicer: blocks::read_agent(doc, account_el, "Svcr")?,
        balances: Vec::new(),
        entries: Vec::new(),
        additional_information: blocks::text(doc, el, additional_info_tag(kind))?,
    };
    let currency = report.currency().to_string();

    for bal in blocks::children(doc, el, "Bal")? {
        let code = blocks::text_with_fallback(doc, bal, &["Tp/CdOrPrtry/Cd", "Tp/CdOrPrtry/Prtry"])?
            .unwrap_or_default();
        let Some(balance_type) = BalanceType::from_code(&code) else {
            debug!(code = %code, "skipping balance of unknown type");
            continue;
        };
        let date = blocks::optional_date(doc, bal, &["Dt/Dt", "Dt/DtTm"])?
            .ok_or_else(|| Error::RequiredNode("Bal/Dt".to_string()))?;
        report.balances.push(CashBalance::new(
            balance_type,
            read_debit_credit(doc, bal)?,
            doc.amount_with_currency(Some(bal), "Amt", &currency)?,
            date,
        ));
    }

    for ntry in blocks::children(doc, el, "Ntry")? {
        report.entries.push(read_entry(doc, ntry, &currency)?);
    }
    Ok(report)
}

fn read_debit_credit(doc: &XmlDocument, el: &Element) -> Result<DebitCredit> {
    let indicator = blocks::required_text(doc, el, "CdtDbtInd")?;
    indicator
        .parse::<DebitCredit>()
        .map_err(Error::ParseError)
}

fn read_entry(doc: &XmlDocument, el: &Element, currency: &str) -> Result<Entry> {
    let bank_transaction_code = match blocks::child(doc, el, "BkTxCd")? {
        Some(code) => Some(BankTransactionCode {
            domain: blocks::text(doc, code, "Domn/Cd")?,
            family: blocks::text(doc, code, "Domn/Fmly/Cd")?,
            sub_family: blocks::text(doc, code, "Domn/Fmly/SubFmlyCd")?,
            proprietary_code: blocks::text(doc, code, "Prtry/Cd")?,
            proprietary_issuer: blocks::text(doc, code, "Prtry/Issr")?,
        }),
        None => None,
    };
    let details = blocks::children(doc, el, "NtryDtls/TxDtls")?
        .into_iter()
        .map(|tx| read_details(doc, tx, currency))
        .collect::<Result<Vec<_>>>()?;

    Ok(Entry {
        reference: blocks::text(doc, el, "NtryRef")?,
        amount: doc.amount_with_currency(Some(el), "Amt", currency)?,
        debit_credit: read_debit_credit(doc, el)?,
        reversal: blocks::optional_bool(doc, el, "RvslInd")?.unwrap_or(false),
        status: blocks::text_with_fallback(doc, el, &["Sts/Cd", "Sts/Prtry", "Sts"])?
            .unwrap_or_else(|| "BOOK".to_string()),
        booking_date: blocks::optional_date(doc, el, &["BookgDt/Dt", "BookgDt/DtTm"])?,
        value_date: blocks::optional_date(doc, el, &["ValDt/Dt", "ValDt/DtTm"])?,
        account_servicer_reference: blocks::text(doc, el, "AcctSvcrRef")?,
        bank_transaction_code,
        details,
        additional_information: blocks::text(doc, el, "AddtlNtryInf")?,
    })
}

fn read_details(doc: &XmlDocument, el: &Element, currency: &str) -> Result<TransactionDetails> {
    let amount = match blocks::child(doc, el, "Amt")? {
        Some(_) => blocks::optional_amount(doc, el, "Amt", currency)?,
        None => blocks::optional_amount(doc, el, "AmtDtls/TxAmt/Amt", currency)?,
    };
    let (parties, agents) = (blocks::child(doc, el, "RltdPties")?, blocks::child(doc, el, "RltdAgts")?);
    let party = |tag: &str| -> Result<Option<Party>> {
        match parties {
            Some(p) => blocks::read_optional_party(doc, p, tag),
            None => Ok(None),
        }
    };
    let account = |tag: &str| -> Result<Option<Account>> {
        match parties {
            Some(p) => blocks::read_optional_account(doc, p, tag),
            None => Ok(None),
        }
    };
    let agent = |tag: &str| -> Result<Option<FinancialInstitution>> {
        match agents {
            Some(a) => blocks::read_agent(doc, a, tag),
            None => Ok(None),
        }
    };

    Ok(TransactionDetails {
        account_servicer_reference: blocks::text(doc, el, "Refs/AcctSvcrRef")?,
        instruction_id: blocks::text(doc, el, "Refs/InstrId")?,
        end_to_end_id: blocks::text(doc, el, "Refs/EndToEndId")?,
        mandate_id: blocks::text(doc, el, "Refs/MndtId")?,
        amount,
        debtor: party("Dbtr")?,
        debtor_account: account("DbtrAcct")?,
        ultimate_debtor: party("UltmtDbtr")?,
        creditor: party("Cdtr")?,
        creditor_account: account("CdtrAcct")?,
        ultimate_creditor: party("UltmtCdtr")?,
        debtor_agent: agent("DbtrAgt")?,
        creditor_agent: agent("CdtrAgt")?,
        remittance: blocks::read_remittance(doc, el)?,
        return_reason: blocks::text_with_fallback(doc, el, &["RtrInf/Rsn/Cd", "RtrInf/Rsn/Prtry"])?,
        additional_information: blocks::text(doc, el, "AddtlTxInf")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iso20022::camt::fixtures::created;
    use pretty_assertions::assert_eq;

    const CAMT053_V02: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Document xmlns="urn:iso:std:iso:20022:tech:xsd:camt.053.001.02">
  <BkToCstmrStmt>
    <GrpHdr><MsgId>STMT-1</MsgId><CreDtTm>2025-01-01T18:00:00</CreDtTm></GrpHdr>
    <Stmt>
      <Id>S1</Id>
      <ElctrncSeqNb>12</ElctrncSeqNb>
      <Acct>
        <Id><IBAN>DE89370400440532013000</IBAN></Id>
        <Ccy>EUR</Ccy>
        <Svcr><FinInstnId><BIC>COBADEFFXXX</BIC></FinInstnId></Svcr>
      </Acct>
      <Bal>
        <Tp><CdOrPrtry><Cd>PRCD</Cd></CdOrPrtry></Tp>
        <Amt Ccy="EUR">1000.00</Amt>
        <CdtDbtInd>CRDT</CdtDbtInd>
        <Dt><Dt>2024-12-31</Dt></Dt>
      </Bal>
      <Ntry>
        <Amt Ccy="EUR">50.00</Amt>
        <CdtDbtInd>DBIT</CdtDbtInd>
        <Sts>BOOK</Sts>
        <BookgDt><Dt>2025-01-01</Dt></BookgDt>
        <ValDt><Dt>2025-01-01</Dt></ValDt>
        <BkTxCd>
          <Domn><Cd>PMNT</Cd><Fmly><Cd>ICDT</Cd><SubFmlyCd>ESCT</SubFmlyCd></Fmly></Domn>
          <Prtry><Cd>NTRF+116+9310</Cd><Issr>DK</Issr></Prtry>
        </BkTxCd>
        <NtryDtls>
          <TxDtls>
            <Refs><EndToEndId>E2E-1</EndToEndId></Refs>
            <AmtDtls><TxAmt><Amt Ccy="EUR">50.00</Amt></TxAmt></AmtDtls>
            <RltdPties>
              <Cdtr><Nm>Lieferant AG</Nm></Cdtr>
              <CdtrAcct><Id><IBAN>DE02100100100006820101</IBAN></Id></CdtrAcct>
            </RltdPties>
            <RltdAgts><CdtrAgt><FinInstnId><BIC>PBNKDEFFXXX</BIC></FinInstnId></CdtrAgt></RltdAgts>
            <RmtInf><Ustrd>Rechnung 4711</Ustrd></RmtInf>
          </TxDtls>
        </NtryDtls>
      </Ntry>
    </Stmt>
  </BkToCstmrStmt>
</Document>"#;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn statement() -> AccountReportDocument {
        let details = TransactionDetails {
            end_to_end_id: Some("E2E-1".into()),
            amount: Some(Amount::new(Decimal::new(5000, 2), "EUR")),
            creditor: Some(Party::named("Lieferant AG")),
            creditor_account: Some(Account::iban("DE02100100100006820101")),
            creditor_agent: Some(FinancialInstitution::bic("PBNKDEFFXXX")),
            remittance: Some(RemittanceInformation::unstructured("Rechnung 4711")),
            ..TransactionDetails::default()
        };
        let mut entry = Entry::new(Amount::new(Decimal::new(5000, 2), "EUR"), DebitCredit::Debit, date(1));
        entry.value_date = Some(date(1));
        entry.bank_transaction_code = Some(BankTransactionCode::from_gvc(
            GvcCode::SepaCtSingleDebit,
            DebitCredit::Debit,
            "NTRF",
        ));
        entry.details.push(details);

        let mut account = Account::iban("DE89370400440532013000");
        account.currency = Some("EUR".into());
        let report = AccountReport::new("S1", account)
            .with_balance(CashBalance::new(
                BalanceType::OpeningBooked,
                DebitCredit::Credit,
                Amount::new(Decimal::new(1000, 0), "EUR"),
                date(1),
            ))
            .with_balance(CashBalance::new(
                BalanceType::ClosingBooked,
                DebitCredit::Credit,
                Amount::new(Decimal::new(950, 0), "EUR"),
                date(1),
            ))
            .with_entry(entry);
        AccountReportDocument::new(ReportKind::Statement, GroupHeader::new("STMT-1", created())).with_report(report)
    }

    #[test]
    fn test_parse_legacy_statement() {
        let doc = AccountReportDocument::from_xml(CAMT053_V02).unwrap();
        assert_eq!(doc.camt_type(), CamtType::Camt053);
        let report = &doc.reports[0];
        assert_eq!(report.electronic_sequence_number, Some(12));
        assert_eq!(report.servicer, Some(FinancialInstitution::bic("COBADEFFXXX")));
        assert_eq!(
            report.balance(BalanceType::PreviouslyClosedBooked).map(CashBalance::signed_value),
            Some(Decimal::new(1000, 0))
        );

        let entry = &report.entries[0];
        assert_eq!(entry.signed_value(), Decimal::new(-50, 0));
        assert_eq!(entry.status, "BOOK");
        assert_eq!(entry.gvc(), Some(GvcCode::SepaCtSingleDebit));
        assert_eq!(
            entry.bank_transaction_code.as_ref().and_then(BankTransactionCode::swift_code),
            Some("NTRF")
        );

        let details = &entry.details[0];
        assert_eq!(details.amount, Some(Amount::new(Decimal::new(50, 0), "EUR")));
        assert_eq!(details.creditor, Some(Party::named("Lieferant AG")));
        assert_eq!(details.creditor_agent, Some(FinancialInstitution::bic("PBNKDEFFXXX")));
        let (party, account, _) = details.counterparty(DebitCredit::Debit);
        assert_eq!(party.and_then(|p| p.name.as_deref()), Some("Lieferant AG"));
        assert_eq!(account.and_then(Account::identifier), Some("DE02100100100006820101"));
    }

    #[test]
    fn test_parse_with_unused_namespace_declaration() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<Document xmlns:a="urn:iso:std:iso:20022:tech:xsd:camt.053.001.02"
          xmlns:b="urn:iso:std:iso:20022:tech:xsd:camt.053.001.08">
  <b:BkToCstmrStmt>
    <b:GrpHdr><b:MsgId>STMT-2</b:MsgId><b:CreDtTm>2025-01-01T18:00:00</b:CreDtTm></b:GrpHdr>
    <b:Stmt>
      <b:Id>S2</b:Id>
      <b:Acct><b:Id><b:IBAN>DE89370400440532013000</b:IBAN></b:Id></b:Acct>
    </b:Stmt>
  </b:BkToCstmrStmt>
</Document>"#;
        let doc = AccountReportDocument::from_xml(xml).unwrap();
        assert_eq!(doc.camt_type(), CamtType::Camt053);
        assert_eq!(doc.group_header.message_id, "STMT-2");
        assert_eq!(doc.reports.len(), 1);
        assert_eq!(doc.reports[0].id, "S2");
        assert_eq!(doc.reports[0].account.iban.as_deref(), Some("DE89370400440532013000"));
    }

    #[test]
    fn test_round_trip_current_dialect() {
        let doc = statement();
        let xml = doc.to_xml(CamtVersion::V08).unwrap();
        assert!(xml.contains("<Cd>BOOK</Cd>"));
        assert!(xml.contains("<Pty>"));
        assert!(xml.contains("<BICFI>PBNKDEFFXXX</BICFI>"));
        assert_eq!(AccountReportDocument::from_xml(&xml).unwrap(), doc);
    }

    #[test]
    fn test_round_trip_legacy_dialect() {
        let doc = statement();
        let xml = doc.to_xml(CamtVersion::V02).unwrap();
        assert!(xml.contains("<Sts>BOOK</Sts>"));
        assert!(xml.contains("<BIC>PBNKDEFFXXX</BIC>"));
        assert!(xml.contains("<AmtDtls>"));
        assert!(!xml.contains("<Pty>"));
        assert_eq!(AccountReportDocument::from_xml(&xml).unwrap(), doc);
    }

    #[test]
    fn test_summary() {
        let xml = statement().to_xml(CamtVersion::V06).unwrap();
        assert!(xml.contains("<TtlDbtNtries>"));
        let summary = statement().reports[0].summary();
        assert_eq!(summary.debit_entries, 1);
        assert_eq!(summary.debit_sum, Decimal::new(50, 0));
        assert_eq!(summary.entries(), 1);
    }

    #[test]
    fn test_notification_omits_balances() {
        let mut doc = statement();
        doc.kind = ReportKind::Notification;
        let xml = doc.to_xml(CamtVersion::V08).unwrap();
        assert!(xml.contains("<BkToCstmrDbtCdtNtfctn>"));
        assert!(xml.contains("<Ntfctn>"));
        assert!(!xml.contains("<Bal>"));
        let parsed = AccountReportDocument::from_xml(&xml).unwrap();
        assert_eq!(parsed.kind, ReportKind::Notification);
        assert!(parsed.reports[0].balances.is_empty());
    }

    #[test]
    fn test_from_xml_as_rejects_other_types() {
        assert!(matches!(
            AccountReportDocument::from_xml_as(CAMT053_V02, CamtType::Camt027),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            AccountReportDocument::from_xml_as(CAMT053_V02, CamtType::Camt052),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_validate() {
        assert!(statement().validate().is_ok());
        let empty = AccountReportDocument::new(ReportKind::Report, GroupHeader::new("R", created()));
        assert!(matches!(empty.validate(), Err(Error::Validation { .. })));
    }
}
