//! camt messages: investigations (camt.026 to camt.033, camt.055, camt.056,
//! camt.087) and account reporting (camt.052, camt.053, camt.054).
//!
//! Every investigation message starts with the same `Assgnmt` and
//! optional `Case` blocks; [`add_head`] and [`read_head`] write and read
//! them so the message modules only deal with their payload.

pub mod camt026;
pub mod camt027;
pub mod camt029;
pub mod camt031;
pub mod camt033;
pub mod camt055;
pub mod camt056;
pub mod camt087;
pub mod statement;

pub use camt026::{Camt026Document, InformationItem};
pub use camt027::Camt027Document;
pub use camt029::{Camt029Document, CancellationStatus};
pub use camt031::Camt031Document;
pub use camt033::Camt033Document;
pub use camt055::{Camt055Document, OriginalPaymentInformation, PaymentCancellation};
pub use camt056::{Camt056Document, InterbankCancellation};
pub use camt087::{Camt087Document, Modification};
pub use statement::{
    AccountReport, AccountReportDocument, BalanceType, BankTransactionCode, CashBalance, Entry, ReportKind,
    TransactionDetails, TransactionsSummary,
};

use super::blocks::{self, Dialect};
use super::common::{Assignment, Case};
use super::{open_document, CamtType, CamtVersion, MessageType};
use crate::error::Result;
use crate::xml::{Element, XmlBuilder, XmlDocument};

/// Currency assumed for amounts without a `Ccy` attribute.
pub const DEFAULT_CURRENCY: &str = "EUR";

/// Every supported investigation version uses `BICFI` and `AnyBIC`.
pub(crate) const INVESTIGATION_DIALECT: Dialect = Dialect::CURRENT;

/// Open `Document` and the message element of `camt_type`.
pub(crate) fn start(camt_type: CamtType, version: CamtVersion) -> Result<XmlBuilder> {
    let namespace = camt_type.namespace(version)?;
    let mut b = XmlBuilder::new(namespace);
    b.add_element(camt_type.root_element());
    Ok(b)
}

/// Close the message element and serialize.
pub(crate) fn finish(mut b: XmlBuilder) -> Result<String> {
    b.end();
    b.get_xml()
}

pub(crate) fn open(xml: &str, camt_type: CamtType) -> Result<XmlDocument> {
    open_document(xml, MessageType::Camt(camt_type))
}

pub(crate) fn message_root(doc: &XmlDocument, camt_type: CamtType) -> Result<&Element> {
    blocks::message_root(doc, camt_type.root_element())
}

pub(crate) fn add_head(b: &mut XmlBuilder, assignment: &Assignment, case: Option<&Case>) {
    blocks::add_assignment(b, assignment, INVESTIGATION_DIALECT);
    blocks::add_case(b, "Case", case, INVESTIGATION_DIALECT);
}

pub(crate) fn read_head(doc: &XmlDocument, root: &Element) -> Result<(Assignment, Option<Case>)> {
    Ok((blocks::read_assignment(doc, root)?, blocks::read_case(doc, root, "Case")?))
}

pub(crate) fn validate_head(assignment: &Assignment, case: Option<&Case>) -> Result<()> {
    assignment.validate()?;
    case.map_or(Ok(()), Case::validate)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::iso20022::common::{Assignment, AssignmentParty};
    use chrono::{NaiveDate, NaiveDateTime};

    pub fn created() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(10, 0, 0).unwrap()
    }

    pub fn assignment() -> Assignment {
        Assignment::new(
            "ASSIGN-1",
            AssignmentParty::agent_bic("COBADEFFXXX"),
            AssignmentParty::agent_bic("DEUTDEFFXXX"),
            created(),
        )
    }
}
