//! ISO 20022 cash management (camt) and payments initiation (pain) messages.
//!
//! Namespaces are fixed per message type and version and listed literally
//! in the tables below. Generators take the version explicitly; parsers
//! detect it from the document.

/// `from_read`/`write_to` adapters around `from_xml`/`to_xml`.
macro_rules! xml_io {
    ($doc:ty, $version:ty) => {
        impl $doc {
            pub fn from_read<R: std::io::Read>(reader: &mut R) -> $crate::error::Result<Self> {
                let mut xml = String::new();
                reader.read_to_string(&mut xml)?;
                Self::from_xml(&xml)
            }

            /// Generate in `version` and write the complete document to `writer`.
            pub fn write_to<W: std::io::Write>(&self, writer: &mut W, version: $version) -> $crate::error::Result<()> {
                let xml = self.to_xml(version)?;
                writer.write_all(xml.as_bytes())?;
                Ok(())
            }
        }
    };
}

pub mod blocks;
pub mod camt;
pub mod common;
pub mod pain;

use crate::error::{Error, Result};
use crate::xml::XmlDocument;
use camt::{
    AccountReportDocument, Camt026Document, Camt027Document, Camt029Document, Camt031Document,
    Camt033Document, Camt055Document, Camt056Document, Camt087Document,
};
use pain::{Pain001Document, Pain007Document, Pain008Document, Pain009Document};
use std::fmt;
use std::io::Read;
use tracing::debug;

/// Supported camt message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CamtType {
    Camt026,
    Camt027,
    Camt029,
    Camt031,
    Camt033,
    Camt052,
    Camt053,
    Camt054,
    Camt055,
    Camt056,
    Camt087,
}

/// camt schema versions (`camt.xxx.001.NN`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CamtVersion {
    V02,
    V04,
    V05,
    V06,
    V07,
    V08,
    V09,
    V10,
    V11,
    V12,
    V13,
}

const CAMT_NAMESPACES: &[(CamtType, CamtVersion, &str)] = &[
    (CamtType::Camt026, CamtVersion::V07, "urn:iso:std:iso:20022:tech:xsd:camt.026.001.07"),
    (CamtType::Camt026, CamtVersion::V08, "urn:iso:std:iso:20022:tech:xsd:camt.026.001.08"),
    (CamtType::Camt026, CamtVersion::V09, "urn:iso:std:iso:20022:tech:xsd:camt.026.001.09"),
    (CamtType::Camt026, CamtVersion::V10, "urn:iso:std:iso:20022:tech:xsd:camt.026.001.10"),
    (CamtType::Camt027, CamtVersion::V07, "urn:iso:std:iso:20022:tech:xsd:camt.027.001.07"),
    (CamtType::Camt027, CamtVersion::V08, "urn:iso:std:iso:20022:tech:xsd:camt.027.001.08"),
    (CamtType::Camt027, CamtVersion::V09, "urn:iso:std:iso:20022:tech:xsd:camt.027.001.09"),
    (CamtType::Camt027, CamtVersion::V10, "urn:iso:std:iso:20022:tech:xsd:camt.027.001.10"),
    (CamtType::Camt029, CamtVersion::V09, "urn:iso:std:iso:20022:tech:xsd:camt.029.001.09"),
    (CamtType::Camt029, CamtVersion::V11, "urn:iso:std:iso:20022:tech:xsd:camt.029.001.11"),
    (CamtType::Camt029, CamtVersion::V12, "urn:iso:std:iso:20022:tech:xsd:camt.029.001.12"),
    (CamtType::Camt029, CamtVersion::V13, "urn:iso:std:iso:20022:tech:xsd:camt.029.001.13"),
    (CamtType::Camt031, CamtVersion::V05, "urn:iso:std:iso:20022:tech:xsd:camt.031.001.05"),
    (CamtType::Camt031, CamtVersion::V06, "urn:iso:std:iso:20022:tech:xsd:camt.031.001.06"),
    (CamtType::Camt031, CamtVersion::V07, "urn:iso:std:iso:20022:tech:xsd:camt.031.001.07"),
    (CamtType::Camt033, CamtVersion::V06, "urn:iso:std:iso:20022:tech:xsd:camt.033.001.06"),
    (CamtType::Camt033, CamtVersion::V07, "urn:iso:std:iso:20022:tech:xsd:camt.033.001.07"),
    (CamtType::Camt052, CamtVersion::V02, "urn:iso:std:iso:20022:tech:xsd:camt.052.001.02"),
    (CamtType::Camt052, CamtVersion::V06, "urn:iso:std:iso:20022:tech:xsd:camt.052.001.06"),
    (CamtType::Camt052, CamtVersion::V08, "urn:iso:std:iso:20022:tech:xsd:camt.052.001.08"),
    (CamtType::Camt052, CamtVersion::V10, "urn:iso:std:iso:20022:tech:xsd:camt.052.001.10"),
    (CamtType::Camt053, CamtVersion::V02, "urn:iso:std:iso:20022:tech:xsd:camt.053.001.02"),
    (CamtType::Camt053, CamtVersion::V04, "urn:iso:std:iso:20022:tech:xsd:camt.053.001.04"),
    (CamtType::Camt053, CamtVersion::V06, "urn:iso:std:iso:20022:tech:xsd:camt.053.001.06"),
    (CamtType::Camt053, CamtVersion::V08, "urn:iso:std:iso:20022:tech:xsd:camt.053.001.08"),
    (CamtType::Camt053, CamtVersion::V10, "urn:iso:std:iso:20022:tech:xsd:camt.053.001.10"),
    (CamtType::Camt054, CamtVersion::V02, "urn:iso:std:iso:20022:tech:xsd:camt.054.001.02"),
    (CamtType::Camt054, CamtVersion::V06, "urn:iso:std:iso:20022:tech:xsd:camt.054.001.06"),
    (CamtType::Camt054, CamtVersion::V08, "urn:iso:std:iso:20022:tech:xsd:camt.054.001.08"),
    (CamtType::Camt054, CamtVersion::V10, "urn:iso:std:iso:20022:tech:xsd:camt.054.001.10"),
    (CamtType::Camt055, CamtVersion::V08, "urn:iso:std:iso:20022:tech:xsd:camt.055.001.08"),
    (CamtType::Camt055, CamtVersion::V09, "urn:iso:std:iso:20022:tech:xsd:camt.055.001.09"),
    (CamtType::Camt055, CamtVersion::V10, "urn:iso:std:iso:20022:tech:xsd:camt.055.001.10"),
    (CamtType::Camt055, CamtVersion::V11, "urn:iso:std:iso:20022:tech:xsd:camt.055.001.11"),
    (CamtType::Camt056, CamtVersion::V08, "urn:iso:std:iso:20022:tech:xsd:camt.056.001.08"),
    (CamtType::Camt056, CamtVersion::V09, "urn:iso:std:iso:20022:tech:xsd:camt.056.001.09"),
    (CamtType::Camt056, CamtVersion::V10, "urn:iso:std:iso:20022:tech:xsd:camt.056.001.10"),
    (CamtType::Camt056, CamtVersion::V11, "urn:iso:std:iso:20022:tech:xsd:camt.056.001.11"),
    (CamtType::Camt087, CamtVersion::V06, "urn:iso:std:iso:20022:tech:xsd:camt.087.001.06"),
    (CamtType::Camt087, CamtVersion::V07, "urn:iso:std:iso:20022:tech:xsd:camt.087.001.07"),
    (CamtType::Camt087, CamtVersion::V08, "urn:iso:std:iso:20022:tech:xsd:camt.087.001.08"),
];

impl CamtType {
    pub const ALL: [CamtType; 11] = [
        CamtType::Camt026,
        CamtType::Camt027,
        CamtType::Camt029,
        CamtType::Camt031,
        CamtType::Camt033,
        CamtType::Camt052,
        CamtType::Camt053,
        CamtType::Camt054,
        CamtType::Camt055,
        CamtType::Camt056,
        CamtType::Camt087,
    ];

    /// Format token as it appears in namespaces, e.g. `camt.053`.
    pub fn code(&self) -> &'static str {
        match self {
            CamtType::Camt026 => "camt.026",
            CamtType::Camt027 => "camt.027",
            CamtType::Camt029 => "camt.029",
            CamtType::Camt031 => "camt.031",
            CamtType::Camt033 => "camt.033",
            CamtType::Camt052 => "camt.052",
            CamtType::Camt053 => "camt.053",
            CamtType::Camt054 => "camt.054",
            CamtType::Camt055 => "camt.055",
            CamtType::Camt056 => "camt.056",
            CamtType::Camt087 => "camt.087",
        }
    }

    /// Message element directly below `Document`.
    pub fn root_element(&self) -> &'static str {
        match self {
            CamtType::Camt026 => "UblToApply",
            CamtType::Camt027 => "ClmNonRct",
            CamtType::Camt029 => "RsltnOfInvstgtn",
            CamtType::Camt031 => "RjctInvstgtn",
            CamtType::Camt033 => "ReqForDplct",
            CamtType::Camt052 => "BkToCstmrAcctRpt",
            CamtType::Camt053 => "BkToCstmrStmt",
            CamtType::Camt054 => "BkToCstmrDbtCdtNtfctn",
            CamtType::Camt055 => "CstmrPmtCxlReq",
            CamtType::Camt056 => "FIToFIPmtCxlReq",
            CamtType::Camt087 => "ReqToModfyPmt",
        }
    }

    pub fn default_version(&self) -> CamtVersion {
        match self {
            CamtType::Camt026 | CamtType::Camt027 => CamtVersion::V07,
            CamtType::Camt029 => CamtVersion::V09,
            CamtType::Camt031 => CamtVersion::V05,
            CamtType::Camt033 | CamtType::Camt087 => CamtVersion::V06,
            CamtType::Camt052 | CamtType::Camt053 | CamtType::Camt054 => CamtVersion::V08,
            CamtType::Camt055 | CamtType::Camt056 => CamtVersion::V08,
        }
    }

    /// Namespace URI for this type in `version`.
    pub fn namespace(&self, version: CamtVersion) -> Result<&'static str> {
        CAMT_NAMESPACES
            .iter()
            .find(|(t, v, _)| t == self && *v == version)
            .map(|(_, _, ns)| *ns)
            .ok_or_else(|| Error::InvalidArgument(format!("{} does not exist in version {}", self, version)))
    }

    pub fn supported_versions(&self) -> Vec<CamtVersion> {
        CAMT_NAMESPACES
            .iter()
            .filter(|(t, _, _)| t == self)
            .map(|(_, v, _)| *v)
            .collect()
    }

    pub fn known_namespaces(&self) -> Vec<&'static str> {
        CAMT_NAMESPACES
            .iter()
            .filter(|(t, _, _)| t == self)
            .map(|(_, _, ns)| *ns)
            .collect()
    }

    /// Reverse lookup of a namespace URI.
    pub fn from_namespace(namespace: &str) -> Option<(CamtType, CamtVersion)> {
        CAMT_NAMESPACES
            .iter()
            .find(|(_, _, ns)| *ns == namespace)
            .map(|(t, v, _)| (*t, *v))
    }

    pub fn from_root_element(name: &str) -> Option<CamtType> {
        Self::ALL.into_iter().find(|t| t.root_element() == name)
    }
}

impl fmt::Display for CamtType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl CamtVersion {
    pub fn number(&self) -> u8 {
        match self {
            CamtVersion::V02 => 2,
            CamtVersion::V04 => 4,
            CamtVersion::V05 => 5,
            CamtVersion::V06 => 6,
            CamtVersion::V07 => 7,
            CamtVersion::V08 => 8,
            CamtVersion::V09 => 9,
            CamtVersion::V10 => 10,
            CamtVersion::V11 => 11,
            CamtVersion::V12 => 12,
            CamtVersion::V13 => 13,
        }
    }

    /// Version of a namespace listed in the table.
    pub fn from_namespace(namespace: &str) -> Option<Self> {
        CamtType::from_namespace(namespace).map(|(_, v)| v)
    }
}

impl fmt::Display for CamtVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "001.{:02}", self.number())
    }
}

/// Supported pain message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PainType {
    Pain001,
    Pain007,
    Pain008,
    Pain009,
}

/// pain schema versions (`pain.xxx.001.NN`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PainVersion {
    V01,
    V02,
    V03,
    V06,
    V07,
    V08,
    V09,
    V10,
    V11,
}

const PAIN_NAMESPACES: &[(PainType, PainVersion, &str)] = &[
    (PainType::Pain001, PainVersion::V03, "urn:iso:std:iso:20022:tech:xsd:pain.001.001.03"),
    (PainType::Pain001, PainVersion::V09, "urn:iso:std:iso:20022:tech:xsd:pain.001.001.09"),
    (PainType::Pain001, PainVersion::V11, "urn:iso:std:iso:20022:tech:xsd:pain.001.001.11"),
    (PainType::Pain007, PainVersion::V02, "urn:iso:std:iso:20022:tech:xsd:pain.007.001.02"),
    (PainType::Pain007, PainVersion::V09, "urn:iso:std:iso:20022:tech:xsd:pain.007.001.09"),
    (PainType::Pain007, PainVersion::V11, "urn:iso:std:iso:20022:tech:xsd:pain.007.001.11"),
    (PainType::Pain008, PainVersion::V02, "urn:iso:std:iso:20022:tech:xsd:pain.008.001.02"),
    (PainType::Pain008, PainVersion::V08, "urn:iso:std:iso:20022:tech:xsd:pain.008.001.08"),
    (PainType::Pain008, PainVersion::V10, "urn:iso:std:iso:20022:tech:xsd:pain.008.001.10"),
    (PainType::Pain009, PainVersion::V01, "urn:iso:std:iso:20022:tech:xsd:pain.009.001.01"),
    (PainType::Pain009, PainVersion::V06, "urn:iso:std:iso:20022:tech:xsd:pain.009.001.06"),
    (PainType::Pain009, PainVersion::V07, "urn:iso:std:iso:20022:tech:xsd:pain.009.001.07"),
];

impl PainType {
    pub const ALL: [PainType; 4] = [PainType::Pain001, PainType::Pain007, PainType::Pain008, PainType::Pain009];

    pub fn code(&self) -> &'static str {
        match self {
            PainType::Pain001 => "pain.001",
            PainType::Pain007 => "pain.007",
            PainType::Pain008 => "pain.008",
            PainType::Pain009 => "pain.009",
        }
    }

    pub fn root_element(&self) -> &'static str {
        match self {
            PainType::Pain001 => "CstmrCdtTrfInitn",
            PainType::Pain007 => "CstmrPmtRvsl",
            PainType::Pain008 => "CstmrDrctDbtInitn",
            PainType::Pain009 => "MndtInitnReq",
        }
    }

    pub fn default_version(&self) -> PainVersion {
        match self {
            PainType::Pain001 => PainVersion::V03,
            PainType::Pain007 | PainType::Pain008 => PainVersion::V02,
            PainType::Pain009 => PainVersion::V01,
        }
    }

    pub fn namespace(&self, version: PainVersion) -> Result<&'static str> {
        PAIN_NAMESPACES
            .iter()
            .find(|(t, v, _)| t == self && *v == version)
            .map(|(_, _, ns)| *ns)
            .ok_or_else(|| Error::InvalidArgument(format!("{} does not exist in version {}", self, version)))
    }

    pub fn supported_versions(&self) -> Vec<PainVersion> {
        PAIN_NAMESPACES
            .iter()
            .filter(|(t, _, _)| t == self)
            .map(|(_, v, _)| *v)
            .collect()
    }

    pub fn known_namespaces(&self) -> Vec<&'static str> {
        PAIN_NAMESPACES
            .iter()
            .filter(|(t, _, _)| t == self)
            .map(|(_, _, ns)| *ns)
            .collect()
    }

    pub fn from_namespace(namespace: &str) -> Option<(PainType, PainVersion)> {
        PAIN_NAMESPACES
            .iter()
            .find(|(_, _, ns)| *ns == namespace)
            .map(|(t, v, _)| (*t, *v))
    }

    pub fn from_root_element(name: &str) -> Option<PainType> {
        Self::ALL.into_iter().find(|t| t.root_element() == name)
    }
}

impl fmt::Display for PainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl PainVersion {
    pub fn number(&self) -> u8 {
        match self {
            PainVersion::V01 => 1,
            PainVersion::V02 => 2,
            PainVersion::V03 => 3,
            PainVersion::V06 => 6,
            PainVersion::V07 => 7,
            PainVersion::V08 => 8,
            PainVersion::V09 => 9,
            PainVersion::V10 => 10,
            PainVersion::V11 => 11,
        }
    }

    pub fn from_namespace(namespace: &str) -> Option<Self> {
        PainType::from_namespace(namespace).map(|(_, v)| v)
    }
}

impl fmt::Display for PainVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "001.{:02}", self.number())
    }
}

/// Any ISO 20022 message type handled by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Camt(CamtType),
    Pain(PainType),
}

impl MessageType {
    /// Identify a message by its namespace, falling back to the element
    /// below `Document`.
    pub fn detect(doc: &XmlDocument) -> Option<Self> {
        let by_namespace = doc.namespace().and_then(|ns| {
            CamtType::from_namespace(ns)
                .map(|(t, _)| MessageType::Camt(t))
                .or_else(|| PainType::from_namespace(ns).map(|(t, _)| MessageType::Pain(t)))
        });
        if by_namespace.is_some() {
            return by_namespace;
        }
        let action = doc.root().children().next()?.local_name().to_string();
        debug!(element = %action, "namespace unknown, detecting by message element");
        CamtType::from_root_element(&action)
            .map(MessageType::Camt)
            .or_else(|| PainType::from_root_element(&action).map(MessageType::Pain))
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::Camt(t) => write!(f, "{}", t),
            MessageType::Pain(t) => write!(f, "{}", t),
        }
    }
}

/// Open `xml` as a message of `expected`, failing with `InvalidArgument`
/// when the namespace identifies another message type.
pub(crate) fn open_document(xml: &str, expected: MessageType) -> Result<XmlDocument> {
    let (token, known) = match expected {
        MessageType::Camt(t) => (t.code(), t.known_namespaces()),
        MessageType::Pain(t) => (t.code(), t.known_namespaces()),
    };
    let doc = XmlDocument::parse(xml, token, &known)?;
    if let Some(found) = MessageType::detect(&doc) {
        if found != expected {
            return Err(Error::InvalidArgument(format!("expected {}, document is {}", expected, found)));
        }
    }
    Ok(doc)
}

/// Any parsed ISO 20022 document.
#[derive(Debug, Clone, PartialEq)]
pub enum Iso20022Document {
    UnableToApply(Camt026Document),
    ClaimNonReceipt(Camt027Document),
    ResolutionOfInvestigation(Camt029Document),
    RejectInvestigation(Camt031Document),
    RequestForDuplicate(Camt033Document),
    AccountReport(AccountReportDocument),
    CustomerPaymentCancellationRequest(Camt055Document),
    FiToFiPaymentCancellationRequest(Camt056Document),
    RequestToModifyPayment(Camt087Document),
    CreditTransferInitiation(Pain001Document),
    PaymentReversal(Pain007Document),
    DirectDebitInitiation(Pain008Document),
    MandateInitiationRequest(Pain009Document),
}

impl Iso20022Document {
    /// Parse any supported message, detecting its type.
    pub fn parse(xml: &str) -> Result<Self> {
        let sniffed = XmlDocument::parse(xml, "urn:iso:std:iso:20022", &[])?;
        let message_type = MessageType::detect(&sniffed)
            .ok_or_else(|| Error::InvalidFormat("unrecognised ISO 20022 message".to_string()))?;
        debug!(message = %message_type, "parsing ISO 20022 document");

        Ok(match message_type {
            MessageType::Camt(CamtType::Camt026) => Self::UnableToApply(Camt026Document::from_xml(xml)?),
            MessageType::Camt(CamtType::Camt027) => Self::ClaimNonReceipt(Camt027Document::from_xml(xml)?),
            MessageType::Camt(CamtType::Camt029) => {
                Self::ResolutionOfInvestigation(Camt029Document::from_xml(xml)?)
            }
            MessageType::Camt(CamtType::Camt031) => Self::RejectInvestigation(Camt031Document::from_xml(xml)?),
            MessageType::Camt(CamtType::Camt033) => Self::RequestForDuplicate(Camt033Document::from_xml(xml)?),
            MessageType::Camt(t @ (CamtType::Camt052 | CamtType::Camt053 | CamtType::Camt054)) => {
                Self::AccountReport(AccountReportDocument::from_xml_as(xml, t)?)
            }
            MessageType::Camt(CamtType::Camt055) => {
                Self::CustomerPaymentCancellationRequest(Camt055Document::from_xml(xml)?)
            }
            MessageType::Camt(CamtType::Camt056) => {
                Self::FiToFiPaymentCancellationRequest(Camt056Document::from_xml(xml)?)
            }
            MessageType::Camt(CamtType::Camt087) => Self::RequestToModifyPayment(Camt087Document::from_xml(xml)?),
            MessageType::Pain(PainType::Pain001) => Self::CreditTransferInitiation(Pain001Document::from_xml(xml)?),
            MessageType::Pain(PainType::Pain007) => Self::PaymentReversal(Pain007Document::from_xml(xml)?),
            MessageType::Pain(PainType::Pain008) => Self::DirectDebitInitiation(Pain008Document::from_xml(xml)?),
            MessageType::Pain(PainType::Pain009) => Self::MandateInitiationRequest(Pain009Document::from_xml(xml)?),
        })
    }

    pub fn from_read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut xml = String::new();
        reader.read_to_string(&mut xml)?;
        Self::parse(&xml)
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            Self::UnableToApply(_) => MessageType::Camt(CamtType::Camt026),
            Self::ClaimNonReceipt(_) => MessageType::Camt(CamtType::Camt027),
            Self::ResolutionOfInvestigation(_) => MessageType::Camt(CamtType::Camt029),
            Self::RejectInvestigation(_) => MessageType::Camt(CamtType::Camt031),
            Self::RequestForDuplicate(_) => MessageType::Camt(CamtType::Camt033),
            Self::AccountReport(doc) => MessageType::Camt(doc.camt_type()),
            Self::CustomerPaymentCancellationRequest(_) => MessageType::Camt(CamtType::Camt055),
            Self::FiToFiPaymentCancellationRequest(_) => MessageType::Camt(CamtType::Camt056),
            Self::RequestToModifyPayment(_) => MessageType::Camt(CamtType::Camt087),
            Self::CreditTransferInitiation(_) => MessageType::Pain(PainType::Pain001),
            Self::PaymentReversal(_) => MessageType::Pain(PainType::Pain007),
            Self::DirectDebitInitiation(_) => MessageType::Pain(PainType::Pain008),
            Self::MandateInitiationRequest(_) => MessageType::Pain(PainType::Pain009),
        }
    }

    /// Generate in the default version of the message type.
    pub fn to_xml(&self) -> Result<String> {
        match self.message_type() {
            MessageType::Camt(t) => self.to_camt_xml(t, t.default_version()),
            MessageType::Pain(t) => self.to_pain_xml(t, t.default_version()),
        }
    }

    /// Generate as `camt_type`, failing when the document is another type.
    pub fn to_camt_xml(&self, camt_type: CamtType, version: CamtVersion) -> Result<String> {
        if self.message_type() != MessageType::Camt(camt_type) {
            return Err(Error::InvalidArgument(format!(
                "{} generator cannot write {}",
                camt_type,
                self.message_type()
            )));
        }
        match self {
            Self::UnableToApply(doc) => doc.to_xml(version),
            Self::ClaimNonReceipt(doc) => doc.to_xml(version),
            Self::ResolutionOfInvestigation(doc) => doc.to_xml(version),
            Self::RejectInvestigation(doc) => doc.to_xml(version),
            Self::RequestForDuplicate(doc) => doc.to_xml(version),
            Self::AccountReport(doc) => doc.to_xml(version),
            Self::CustomerPaymentCancellationRequest(doc) => doc.to_xml(version),
            Self::FiToFiPaymentCancellationRequest(doc) => doc.to_xml(version),
            Self::RequestToModifyPayment(doc) => doc.to_xml(version),
            other => Err(Error::InvalidArgument(format!("{} is not a camt message", other.message_type()))),
        }
    }

    /// Generate as `pain_type`, failing when the document is another type.
    pub fn to_pain_xml(&self, pain_type: PainType, version: PainVersion) -> Result<String> {
        if self.message_type() != MessageType::Pain(pain_type) {
            return Err(Error::InvalidArgument(format!(
                "{} generator cannot write {}",
                pain_type,
                self.message_type()
            )));
        }
        match self {
            Self::CreditTransferInitiation(doc) => doc.to_xml(version),
            Self::PaymentReversal(doc) => doc.to_xml(version),
            Self::DirectDebitInitiation(doc) => doc.to_xml(version),
            Self::MandateInitiationRequest(doc) => doc.to_xml(version),
            other => Err(Error::InvalidArgument(format!("{} is not a pain message", other.message_type()))),
        }
    }

    /// Field constraint checks of the wrapped document.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::UnableToApply(doc) => doc.validate(),
            Self::ClaimNonReceipt(doc) => doc.validate(),
            Self::ResolutionOfInvestigation(doc) => doc.validate(),
            Self::RejectInvestigation(doc) => doc.validate(),
            Self::RequestForDuplicate(doc) => doc.validate(),
            Self::AccountReport(doc) => doc.validate(),
            Self::CustomerPaymentCancellationRequest(doc) => doc.validate(),
            Self::FiToFiPaymentCancellationRequest(doc) => doc.validate(),
            Self::RequestToModifyPayment(doc) => doc.validate(),
            Self::CreditTransferInitiation(doc) => doc.validate(),
            Self::PaymentReversal(doc) => doc.validate(),
            Self::DirectDebitInitiation(doc) => doc.validate(),
            Self::MandateInitiationRequest(doc) => doc.validate(),
        }
    }
}

macro_rules! document_conversions {
    ($($variant:ident => $doc:ty;)+) => {
        $(
            impl From<$doc> for Iso20022Document {
                fn from(doc: $doc) -> Self {
                    Iso20022Document::$variant(doc)
                }
            }

            impl TryFrom<Iso20022Document> for $doc {
                type Error = Error;

                fn try_from(doc: Iso20022Document) -> Result<Self> {
                    match doc {
                        Iso20022Document::$variant(doc) => Ok(doc),
                        other => Err(Error::InvalidArgument(format!(
                            "expected {}, got {}",
                            stringify!($variant),
                            other.message_type()
                        ))),
                    }
                }
            }
        )+
    };
}

document_conversions! {
    UnableToApply => Camt026Document;
    ClaimNonReceipt => Camt027Document;
    ResolutionOfInvestigation => Camt029Document;
    RejectInvestigation => Camt031Document;
    RequestForDuplicate => Camt033Document;
    AccountReport => AccountReportDocument;
    CustomerPaymentCancellationRequest => Camt055Document;
    FiToFiPaymentCancellationRequest => Camt056Document;
    RequestToModifyPayment => Camt087Document;
    CreditTransferInitiation => Pain001Document;
    PaymentReversal => Pain007Document;
    DirectDebitInitiation => Pain008Document;
    MandateInitiationRequest => Pain009Document;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_lookup() {
        assert_eq!(
            CamtType::Camt053.namespace(CamtVersion::V08).unwrap(),
            "urn:iso:std:iso:20022:tech:xsd:camt.053.001.08"
        );
        assert!(matches!(
            CamtType::Camt053.namespace(CamtVersion::V13),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(
            PainType::Pain008.namespace(PainVersion::V02).unwrap(),
            "urn:iso:std:iso:20022:tech:xsd:pain.008.001.02"
        );
    }

    #[test]
    fn test_reverse_lookup() {
        assert_eq!(
            CamtType::from_namespace("urn:iso:std:iso:20022:tech:xsd:camt.056.001.08"),
            Some((CamtType::Camt056, CamtVersion::V08))
        );
        assert_eq!(
            PainVersion::from_namespace("urn:iso:std:iso:20022:tech:xsd:pain.001.001.09"),
            Some(PainVersion::V09)
        );
        assert_eq!(CamtVersion::from_namespace("urn:example"), None);
    }

    #[test]
    fn test_default_versions_are_supported() {
        for t in CamtType::ALL {
            assert!(t.namespace(t.default_version()).is_ok(), "{}", t);
        }
        for t in PainType::ALL {
            assert!(t.namespace(t.default_version()).is_ok(), "{}", t);
        }
    }

    #[test]
    fn test_root_elements_are_unique() {
        for t in CamtType::ALL {
            assert_eq!(CamtType::from_root_element(t.root_element()), Some(t));
        }
        assert_eq!(PainType::from_root_element("CstmrDrctDbtInitn"), Some(PainType::Pain008));
    }

    #[test]
    fn test_version_display() {
        assert_eq!(CamtVersion::V08.to_string(), "001.08");
        assert_eq!(PainVersion::V11.to_string(), "001.11");
    }
}
