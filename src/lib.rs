//! finmsg
//!
//! A library for generating, parsing and converting bank messages.
//!
//! # Supported Formats
//!
//! - **SWIFT MT**: MT940 statements, MT942 interim reports, MT900/MT910
//!   confirmations, with SWIFT or DATEV `:86:` narratives
//! - **ISO 20022 camt**: camt.052/053/054 account reporting and the
//!   camt.026 to camt.087 investigation messages
//! - **ISO 20022 pain**: pain.001, pain.007, pain.008 and pain.009
//!
//! # Features
//!
//! - Namespace and version detection for ISO 20022 documents
//! - German business transaction codes (GVC) with booking text and
//!   bank transaction code classification
//! - Conversion between MT940 and camt.053
//! - Use standard `Read` and `Write` traits for flexibility
//!
//! # Examples
//!
//! ## Parsing an MT940 file
//!
//! ```no_run
//! use std::fs::File;
//! use finmsg::mt::Mt940Document;
//!
//! let mut file = File::open("statement.sta")?;
//! let statement = Mt940Document::from_read(&mut file)?;
//! println!("Statement: {}", statement.reference_id());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Converting MT940 to camt.053
//!
//! ```no_run
//! use std::fs::File;
//! use chrono::NaiveDate;
//! use finmsg::conversion::mt940_to_camt053;
//! use finmsg::iso20022::CamtVersion;
//! use finmsg::mt::Mt940Document;
//!
//! let mut input = File::open("statement.sta")?;
//! let mt940 = Mt940Document::from_read(&mut input)?;
//!
//! let created = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap().and_hms_opt(8, 0, 0).unwrap();
//! let camt053 = mt940_to_camt053(&mt940, "MSG-1", created)?;
//!
//! let mut output = File::create("statement.xml")?;
//! camt053.write_to(&mut output, CamtVersion::V08)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Reading any ISO 20022 message
//!
//! ```no_run
//! use finmsg::iso20022::Iso20022Document;
//!
//! let xml = std::fs::read_to_string("message.xml")?;
//! let doc = Iso20022Document::parse(&xml)?;
//! println!("{}", doc.message_type());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod types;
pub mod gvc;
pub mod xml;
pub mod mt;
pub mod iso20022;
pub mod conversion;

use std::str::FromStr;

// Re-export commonly used types
pub use error::{Error, Result};
pub use gvc::GvcCode;
pub use types::{Account, Amount, DebitCredit, FinancialInstitution, Party, PostalAddress, RemittanceInformation};

/// Statement formats the converter reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// MT940 SWIFT statement
    Mt940,
    /// camt.053 ISO 20022 statement
    Camt053,
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mt940" | "mt-940" | "swift" => Ok(Format::Mt940),
            "camt053" | "camt.053" | "camt" | "xml" => Ok(Format::Camt053),
            _ => Err(Error::InvalidFormat(s.to_string())),
        }
    }
}

impl Format {
    /// File extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Mt940 => "sta",
            Format::Camt053 => "xml",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_str() {
        assert_eq!("mt940".parse::<Format>().unwrap(), Format::Mt940);
        assert_eq!("MT940".parse::<Format>().unwrap(), Format::Mt940);
        assert_eq!("camt.053".parse::<Format>().unwrap(), Format::Camt053);
        assert!("csv".parse::<Format>().is_err());
    }

    #[test]
    fn test_format_extension() {
        assert_eq!(Format::Mt940.extension(), "sta");
        assert_eq!(Format::Camt053.extension(), "xml");
    }
}
