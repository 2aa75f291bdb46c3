//! SWIFT MT9xx cash management messages.
//!
//! Every message type has a document value ([`Mt940Document`],
//! [`Mt942Document`], [`ConfirmationDocument`]), a parser and a generator.
//! [`MtDocument`] wraps them when the type is only known at runtime.

pub mod codec;
pub mod confirmation;
pub mod mt940;
pub mod mt942;
pub mod purpose;
pub mod types;

pub use confirmation::{ConfirmationDocument, ConfirmationGenerator};
pub use mt940::{Mt940Document, Mt940Generator};
pub use mt942::{FloorLimit, Mt942Document, Mt942Generator};
pub use purpose::SepaReferences;
pub use types::{Balance, BalanceKind, Purpose, Transaction};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

/// Supported MT message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MtType {
    /// Confirmation of debit
    Mt900,
    /// Confirmation of credit
    Mt910,
    /// Customer statement
    Mt940,
    /// Interim transaction report
    Mt942,
}

impl MtType {
    pub fn code(&self) -> &'static str {
        match self {
            MtType::Mt900 => "900",
            MtType::Mt910 => "910",
            MtType::Mt940 => "940",
            MtType::Mt942 => "942",
        }
    }
}

impl FromStr for MtType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let code = s.trim().trim_start_matches("MT").trim_start_matches("mt");
        match code {
            "900" => Ok(MtType::Mt900),
            "910" => Ok(MtType::Mt910),
            "940" => Ok(MtType::Mt940),
            "942" => Ok(MtType::Mt942),
            _ => Err(Error::InvalidFormat(format!("unsupported MT type: {}", s))),
        }
    }
}

impl fmt::Display for MtType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MT{}", self.code())
    }
}

/// Layout of the `:86:` narrative field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurposeFormat {
    /// Free continuation lines.
    #[default]
    Swift,
    /// `?xx` keyed subfields.
    Datev,
}

impl FromStr for PurposeFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "swift" => Ok(PurposeFormat::Swift),
            "datev" => Ok(PurposeFormat::Datev),
            _ => Err(Error::InvalidFormat(format!("unknown purpose format: {}", s))),
        }
    }
}

/// Generator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MtOptions {
    pub purpose_format: PurposeFormat,
    /// Characters per narrative line.
    pub line_length: usize,
    /// Lines per narrative field, the tag line included.
    pub max_lines: usize,
}

impl Default for MtOptions {
    fn default() -> Self {
        Self {
            purpose_format: PurposeFormat::Swift,
            line_length: 65,
            max_lines: 6,
        }
    }
}

impl MtOptions {
    pub fn datev() -> Self {
        Self {
            purpose_format: PurposeFormat::Datev,
            ..Self::default()
        }
    }
}

/// Any supported MT document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MtDocument {
    Mt940(Mt940Document),
    Mt942(Mt942Document),
    /// MT900 (debit) or MT910 (credit).
    Confirmation(ConfirmationDocument),
}

impl MtDocument {
    pub fn mt_type(&self) -> MtType {
        match self {
            MtDocument::Mt940(_) => MtType::Mt940,
            MtDocument::Mt942(_) => MtType::Mt942,
            MtDocument::Confirmation(doc) => doc.mt_type(),
        }
    }

    pub fn reference_id(&self) -> &str {
        match self {
            MtDocument::Mt940(doc) => doc.reference_id(),
            MtDocument::Mt942(doc) => doc.reference_id(),
            MtDocument::Confirmation(doc) => doc.reference_id(),
        }
    }

    pub fn account_id(&self) -> &str {
        match self {
            MtDocument::Mt940(doc) => doc.account_id(),
            MtDocument::Mt942(doc) => doc.account_id(),
            MtDocument::Confirmation(doc) => doc.account_id(),
        }
    }

    /// Generate with the generator matching the document type.
    pub fn generate(&self, options: &MtOptions) -> Result<String> {
        match self {
            MtDocument::Mt940(doc) => Mt940Generator::new(options.clone()).generate(doc),
            MtDocument::Mt942(doc) => Mt942Generator::new(options.clone()).generate(doc),
            MtDocument::Confirmation(doc) => ConfirmationGenerator::new(doc.mt_type())?.generate(doc),
        }
    }

    /// Generate the whole message before writing anything.
    pub fn write_to<W: Write>(&self, writer: &mut W, options: &MtOptions) -> Result<()> {
        let text = self.generate(options)?;
        writer.write_all(text.as_bytes())?;
        Ok(())
    }

    /// Parse a message, detecting its type.
    pub fn parse(text: &str) -> Result<Self> {
        let mt_type = detect_type(text)
            .ok_or_else(|| Error::InvalidFormat("cannot detect MT message type".to_string()))?;
        Self::parse_as(mt_type, text)
    }

    pub fn parse_as(mt_type: MtType, text: &str) -> Result<Self> {
        match mt_type {
            MtType::Mt940 => Mt940Document::parse(text).map(MtDocument::Mt940),
            MtType::Mt942 => Mt942Document::parse(text).map(MtDocument::Mt942),
            MtType::Mt900 | MtType::Mt910 => {
                ConfirmationDocument::parse_as(mt_type, text).map(MtDocument::Confirmation)
            }
        }
    }

    pub fn from_read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::parse(&text)
    }
}

/// Detect the message type from the `{2:}` header, or from the tags.
///
/// Without an envelope MT900 and MT910 cannot be told apart and `None` is
/// returned for them.
pub fn detect_type(text: &str) -> Option<MtType> {
    if let Some(code) = codec::envelope_type(text) {
        return code.parse().ok();
    }
    let fields = codec::split_fields(text).ok()?;
    let has = |tag: &str| fields.iter().any(|f| f.tag == tag);
    if has("34F") || has("90D") || has("90C") {
        Some(MtType::Mt942)
    } else if has("60F") || has("60M") || has("62F") || has("62M") || has("28C") {
        Some(MtType::Mt940)
    } else {
        None
    }
}
