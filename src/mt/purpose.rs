//! The `:86:` narrative field in SWIFT plain and DATEV structured layout,
//! and the SEPA keyword references carried inside purpose texts.

use super::codec::{check_field_text, chunk_chars, narrative_lines};
use super::types::Purpose;
use super::{MtOptions, PurposeFormat};
use crate::error::Result;
use crate::gvc::GvcCode;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const PURPOSE_TAG: &str = ":86:";

/// DATEV subfield width.
pub const DATEV_LINE_LENGTH: usize = 27;
/// DATEV limit on `:86:` lines.
pub const DATEV_MAX_LINES: usize = 20;

const DATEV_PURPOSE_KEYS: [u8; 14] = [20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 60, 61, 62, 63];

lazy_static! {
    static ref DATEV_CONTENT: Regex = Regex::new(r"^\d{3}\?\d{2}").unwrap();
    static ref DATEV_SUBFIELD: Regex = Regex::new(r"\?(\d{2})").unwrap();
    static ref SEPA_KEYWORD: Regex =
        Regex::new(r"\b(EREF|KREF|MREF|CRED|DEBT|SVWZ|ABWA|ABWE|IBAN|BIC|COAM|OAMT|DDAT)\+").unwrap();
}

/// Render a purpose as `:86:` lines (first line carries the tag).
///
/// Fails when a value contains a line break or the SWIFT text cannot be
/// wrapped without a continuation line reading as a tag.
pub fn format_purpose(purpose: &Purpose, options: &MtOptions) -> Result<Vec<String>> {
    for (name, value) in purpose.text_fields() {
        check_field_text(name, value)?;
    }
    match options.purpose_format {
        PurposeFormat::Swift => format_swift(purpose, options.line_length, options.max_lines),
        PurposeFormat::Datev => Ok(format_datev(purpose)),
    }
}

fn format_swift(purpose: &Purpose, line_length: usize, max_lines: usize) -> Result<Vec<String>> {
    let text = purpose
        .text
        .as_deref()
        .or(purpose.booking_text.as_deref())
        .unwrap_or("");
    let first_width = (line_length + 4).saturating_sub(PURPOSE_TAG.len());
    let mut chunks = narrative_lines("purpose", text, first_width, line_length)?.into_iter();

    let mut lines = vec![format!("{}{}", PURPOSE_TAG, chunks.next().unwrap_or_default())];
    let continuation: Vec<String> = chunks.collect();
    let allowed = max_lines.saturating_sub(1);
    if continuation.len() > allowed {
        warn!(
            lines = continuation.len() + 1,
            max_lines, "purpose text truncated"
        );
    }
    lines.extend(continuation.into_iter().take(allowed));
    Ok(lines)
}

/// `?` opens a subfield, so it cannot appear inside a DATEV value.
fn datev_value(value: &str) -> String {
    value.replace('?', " ")
}

fn format_datev(purpose: &Purpose) -> Vec<String> {
    let code = match (purpose.gvc, &purpose.gvc_code) {
        (Some(gvc), _) => gvc.code(),
        (None, Some(code)) => code.clone(),
        (None, None) => GvcCode::Unstructured.code(),
    };
    let mut subfields: Vec<(u8, String)> = Vec::new();

    if let Some(booking_text) = &purpose.booking_text {
        subfields.push((0, datev_value(booking_text).chars().take(DATEV_LINE_LENGTH).collect()));
    }
    if let Some(primanota) = &purpose.primanota {
        subfields.push((10, datev_value(primanota).chars().take(DATEV_LINE_LENGTH).collect()));
    }
    if let Some(text) = &purpose.text {
        let chunks = chunk_chars(&datev_value(text), DATEV_LINE_LENGTH);
        if chunks.len() > DATEV_PURPOSE_KEYS.len() {
            warn!(chunks = chunks.len(), "DATEV purpose text truncated");
        }
        subfields.extend(DATEV_PURPOSE_KEYS.iter().copied().zip(chunks));
    }
    if let Some(bic) = &purpose.counterparty_bic {
        subfields.push((30, datev_value(bic)));
    }
    if let Some(iban) = &purpose.counterparty_iban {
        subfields.push((31, datev_value(iban)));
    }
    if let Some(name) = &purpose.counterparty_name {
        let mut chunks = chunk_chars(&datev_value(name), DATEV_LINE_LENGTH).into_iter();
        if let Some(first) = chunks.next() {
            subfields.push((32, first));
        }
        if let Some(second) = chunks.next() {
            subfields.push((33, second));
        }
    }
    if let Some(extension) = &purpose.text_key_extension {
        subfields.push((34, datev_value(extension).chars().take(3).collect()));
    }

    let mut lines = Vec::new();
    let mut subfields = subfields.into_iter();
    let first = match subfields.next() {
        Some((key, value)) => format!("{}{}?{:02}{}", PURPOSE_TAG, code, key, value),
        None => format!("{}{}", PURPOSE_TAG, code),
    };
    lines.push(first);
    lines.extend(subfields.map(|(key, value)| format!("?{:02}{}", key, value)));

    if lines.len() > DATEV_MAX_LINES {
        warn!(lines = lines.len(), "DATEV purpose truncated to {} lines", DATEV_MAX_LINES);
        lines.truncate(DATEV_MAX_LINES);
    }
    lines
}

/// True when `:86:` content uses the DATEV `NNN?xx` layout.
pub fn is_datev(content: &str) -> bool {
    DATEV_CONTENT.is_match(content)
}

/// Parse the joined `:86:` content, detecting the layout.
pub fn parse_purpose(content: &str) -> Purpose {
    if is_datev(content) {
        parse_datev(content)
    } else {
        let text = content.trim_end();
        Purpose {
            text: if text.is_empty() { None } else { Some(text.to_string()) },
            ..Purpose::default()
        }
    }
}

fn parse_datev(content: &str) -> Purpose {
    let code = &content[..3];
    let gvc = GvcCode::try_from_code(code);
    if gvc.is_none() {
        debug!(code, "unknown GVC code in DATEV purpose");
    }

    let markers: Vec<(u8, usize, usize)> = DATEV_SUBFIELD
        .captures_iter(content)
        .filter_map(|c| {
            let whole = c.get(0)?;
            let key = c[1].parse::<u8>().ok()?;
            Some((key, whole.start(), whole.end()))
        })
        .collect();

    let mut purpose = Purpose {
        gvc,
        gvc_code: if gvc.is_none() { Some(code.to_string()) } else { None },
        ..Purpose::default()
    };
    let mut text = String::new();
    let mut name = String::new();
    for (i, (key, _, value_start)) in markers.iter().enumerate() {
        let value_end = markers.get(i + 1).map_or(content.len(), |next| next.1);
        let value = &content[*value_start..value_end];
        match key {
            0 => purpose.booking_text = Some(value.to_string()),
            10 => purpose.primanota = Some(value.to_string()),
            20..=29 | 60..=63 => text.push_str(value),
            30 => purpose.counterparty_bic = Some(value.to_string()),
            31 => purpose.counterparty_iban = Some(value.to_string()),
            32 | 33 => name.push_str(value),
            34 => purpose.text_key_extension = Some(value.to_string()),
            other => debug!(subfield = other, "ignoring DATEV subfield"),
        }
    }
    if !text.is_empty() {
        purpose.text = Some(text);
    }
    if !name.is_empty() {
        purpose.counterparty_name = Some(name);
    }
    purpose
}

/// SEPA references embedded as `KEYWORD+value` in purpose text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SepaReferences {
    /// `EREF+` end-to-end reference
    pub end_to_end_reference: Option<String>,
    /// `KREF+` customer reference
    pub customer_reference: Option<String>,
    /// `MREF+` mandate reference
    pub mandate_reference: Option<String>,
    /// `CRED+` creditor identifier
    pub creditor_id: Option<String>,
    /// `DEBT+` originator identifier
    pub debtor_id: Option<String>,
    /// `SVWZ+` remittance text
    pub remittance: Option<String>,
    /// `ABWA+` ultimate debtor
    pub ultimate_debtor: Option<String>,
    /// `ABWE+` ultimate creditor
    pub ultimate_creditor: Option<String>,
    /// `IBAN+`
    pub iban: Option<String>,
    /// `BIC+`
    pub bic: Option<String>,
    /// `COAM+` compensation amount
    pub compensation_amount: Option<String>,
    /// `OAMT+` original amount
    pub original_amount: Option<String>,
    /// `DDAT+` settlement date
    pub settlement_date: Option<String>,
}

impl SepaReferences {
    /// Maximum value length per keyword.
    pub fn max_length(keyword: &str) -> usize {
        match keyword {
            "SVWZ" => 140,
            "ABWA" | "ABWE" => 70,
            "IBAN" => 34,
            "BIC" => 11,
            "COAM" | "OAMT" => 18,
            "DDAT" => 8,
            _ => 35,
        }
    }

    fn slot(&mut self, keyword: &str) -> Option<&mut Option<String>> {
        Some(match keyword {
            "EREF" => &mut self.end_to_end_reference,
            "KREF" => &mut self.customer_reference,
            "MREF" => &mut self.mandate_reference,
            "CRED" => &mut self.creditor_id,
            "DEBT" => &mut self.debtor_id,
            "SVWZ" => &mut self.remittance,
            "ABWA" => &mut self.ultimate_debtor,
            "ABWE" => &mut self.ultimate_creditor,
            "IBAN" => &mut self.iban,
            "BIC" => &mut self.bic,
            "COAM" => &mut self.compensation_amount,
            "OAMT" => &mut self.original_amount,
            "DDAT" => &mut self.settlement_date,
            _ => return None,
        })
    }

    fn entries(&self) -> [(&'static str, Option<&String>); 13] {
        [
            ("EREF", self.end_to_end_reference.as_ref()),
            ("KREF", self.customer_reference.as_ref()),
            ("MREF", self.mandate_reference.as_ref()),
            ("CRED", self.creditor_id.as_ref()),
            ("DEBT", self.debtor_id.as_ref()),
            ("COAM", self.compensation_amount.as_ref()),
            ("OAMT", self.original_amount.as_ref()),
            ("DDAT", self.settlement_date.as_ref()),
            ("IBAN", self.iban.as_ref()),
            ("BIC", self.bic.as_ref()),
            ("ABWA", self.ultimate_debtor.as_ref()),
            ("ABWE", self.ultimate_creditor.as_ref()),
            ("SVWZ", self.remittance.as_ref()),
        ]
    }

    /// Extract keyword values; each runs up to the next keyword or the end.
    pub fn parse(text: &str) -> Self {
        let mut references = Self::default();
        let matches: Vec<_> = SEPA_KEYWORD.captures_iter(text).collect();
        for (i, caps) in matches.iter().enumerate() {
            let (Some(whole), Some(keyword)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let end = matches
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(text.len(), |m| m.start());
            let value: String = text[whole.end()..end]
                .trim()
                .chars()
                .take(Self::max_length(keyword.as_str()))
                .collect();
            if value.is_empty() {
                continue;
            }
            if let Some(slot) = references.slot(keyword.as_str()) {
                if slot.is_none() {
                    *slot = Some(value);
                }
            }
        }
        references
    }

    pub fn is_empty(&self) -> bool {
        self.entries().iter().all(|(_, value)| value.is_none())
    }

    /// `KEYWORD+value` pairs separated by spaces, `SVWZ+` last.
    pub fn to_purpose_text(&self) -> String {
        self.entries()
            .iter()
            .filter_map(|(keyword, value)| {
                value.map(|v| {
                    let v: String = v.chars().take(Self::max_length(keyword)).collect();
                    format!("{}+{}", keyword, v)
                })
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn swift(line_length: usize, max_lines: usize) -> MtOptions {
        MtOptions {
            purpose_format: PurposeFormat::Swift,
            line_length,
            max_lines,
        }
    }

    #[test]
    fn test_swift_first_line_boundary() {
        let options = MtOptions::default();
        let exact = "a".repeat(65);
        let lines = format_purpose(&Purpose::text(exact.clone()), &options).unwrap();
        assert_eq!(lines, vec![format!(":86:{}", exact)]);

        let longer = "a".repeat(66);
        let lines = format_purpose(&Purpose::text(longer), &options).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "a");
        assert!(lines[1].chars().count() <= 65);
    }

    #[test]
    fn test_swift_truncates_to_max_lines() {
        let lines = format_purpose(&Purpose::text("b".repeat(500)), &swift(10, 3)).unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], format!(":86:{}", "b".repeat(10)));
        assert_eq!(lines[2], "b".repeat(10));
    }

    #[test]
    fn test_swift_round_trip() {
        let text = "EREF+E2E-1 SVWZ+Rechnung 4711 vom 01.01.2025 Kundennummer 123456 Danke";
        let lines = format_purpose(&Purpose::text(text), &MtOptions::default()).unwrap();
        let joined: String = lines.concat();
        let parsed = parse_purpose(joined.strip_prefix(PURPOSE_TAG).unwrap());
        assert_eq!(parsed.text.as_deref(), Some(text));
        assert_eq!(parsed.gvc, None);
    }

    #[test]
    fn test_datev_layout() {
        let purpose = Purpose {
            gvc: Some(GvcCode::SepaCtSingleCredit),
            booking_text: Some("SEPA-GUTSCHRIFT".into()),
            primanota: Some("9310".into()),
            text: Some("EREF+E2E-1 SVWZ+Rechnung 4711 vom Januar".into()),
            counterparty_bic: Some("COBADEFFXXX".into()),
            counterparty_iban: Some("DE89370400440532013000".into()),
            counterparty_name: Some("Max Mustermann Handelsgesellschaft mbH".into()),
            text_key_extension: None,
            gvc_code: None,
        };
        let options = MtOptions {
            purpose_format: PurposeFormat::Datev,
            ..MtOptions::default()
        };
        let lines = format_purpose(&purpose, &options).unwrap();
        assert_eq!(lines[0], ":86:166?00SEPA-GUTSCHRIFT");
        assert_eq!(lines[1], "?109310");
        assert_eq!(lines[2], "?20EREF+E2E-1 SVWZ+Rechnung 47");
        assert!(lines.contains(&"?30COBADEFFXXX".to_string()));
        assert!(lines.iter().all(|l| l.len() <= 4 + 3 + 3 + DATEV_LINE_LENGTH));

        let joined: String = lines.concat();
        let parsed = parse_purpose(joined.strip_prefix(PURPOSE_TAG).unwrap());
        assert_eq!(parsed, purpose);
    }

    fn datev() -> MtOptions {
        MtOptions {
            purpose_format: PurposeFormat::Datev,
            ..MtOptions::default()
        }
    }

    #[test]
    fn test_swift_continuation_never_reads_as_tag() {
        let text = format!("{}:62F:D250101EUR1,00", "a".repeat(65));
        let lines = format_purpose(&Purpose::text(text.clone()), &MtOptions::default()).unwrap();
        assert!(lines[1..].iter().all(|l| !l.starts_with(':')));
        assert_eq!(lines.concat().strip_prefix(PURPOSE_TAG), Some(text.as_str()));

        let lines = format_purpose(&Purpose::text(format!("{}-", "a".repeat(65))), &MtOptions::default()).unwrap();
        assert_eq!(lines, vec![format!(":86:{}", "a".repeat(64)), "a-".to_string()]);

        let broken = Purpose::text("Zeile1\r\n:20:X");
        assert!(matches!(
            format_purpose(&broken, &MtOptions::default()),
            Err(crate::error::Error::InvalidArgument(_))
        ));
        assert!(format_purpose(&broken, &datev()).is_err());
    }

    #[test]
    fn test_datev_question_mark_in_value() {
        let purpose = Purpose {
            gvc: Some(GvcCode::SepaCtSingleDebit),
            text: Some("Rechnung ?21 bezahlt".into()),
            counterparty_name: Some("Wer?Was GmbH".into()),
            ..Purpose::default()
        };
        let lines = format_purpose(&purpose, &datev()).unwrap();
        assert_eq!(lines, vec![":86:116?20Rechnung  21 bezahlt", "?32Wer Was GmbH"]);

        let parsed = parse_purpose(lines.concat().strip_prefix(PURPOSE_TAG).unwrap());
        assert_eq!(parsed.text.as_deref(), Some("Rechnung  21 bezahlt"));
        assert_eq!(parsed.counterparty_name.as_deref(), Some("Wer Was GmbH"));
    }

    #[test]
    fn test_datev_unknown_code_is_kept() {
        let parsed = parse_purpose("777?00SONDERBUCHUNG?20Text");
        assert_eq!(parsed.gvc, None);
        assert_eq!(parsed.gvc_code.as_deref(), Some("777"));
        assert_eq!(parsed.booking_text.as_deref(), Some("SONDERBUCHUNG"));

        let lines = format_purpose(&parsed, &datev()).unwrap();
        assert_eq!(lines[0], ":86:777?00SONDERBUCHUNG");
        assert_eq!(parse_purpose(lines.concat().strip_prefix(PURPOSE_TAG).unwrap()), parsed);

        let known = parse_purpose("166?00GUTSCHRIFT");
        assert_eq!(known.gvc_code, None);
    }

    #[test]
    fn test_datev_detection() {
        assert!(is_datev("166?00SEPA"));
        assert!(!is_datev("Rechnung 166?00"));
        assert!(!is_datev("16?00"));
    }

    #[test]
    fn test_sepa_references_parse() {
        let refs = SepaReferences::parse(
            "EREF+E2E-4711 MREF+M-1 CRED+DE98ZZZ09999999999 SVWZ+Beitrag Januar ABWA+Oma",
        );
        assert_eq!(refs.end_to_end_reference.as_deref(), Some("E2E-4711"));
        assert_eq!(refs.mandate_reference.as_deref(), Some("M-1"));
        assert_eq!(refs.creditor_id.as_deref(), Some("DE98ZZZ09999999999"));
        assert_eq!(refs.remittance.as_deref(), Some("Beitrag Januar"));
        assert_eq!(refs.ultimate_debtor.as_deref(), Some("Oma"));
        assert_eq!(refs.iban, None);
    }

    #[test]
    fn test_sepa_references_max_length() {
        let refs = SepaReferences::parse(&format!("BIC+{}", "X".repeat(20)));
        assert_eq!(refs.bic.as_deref().map(str::len), Some(11));
    }

    #[test]
    fn test_sepa_references_to_text() {
        let refs = SepaReferences {
            end_to_end_reference: Some("E1".into()),
            remittance: Some("Danke".into()),
            ..SepaReferences::default()
        };
        assert_eq!(refs.to_purpose_text(), "EREF+E1 SVWZ+Danke");
        assert_eq!(SepaReferences::parse(&refs.to_purpose_text()), refs);
        assert!(SepaReferences::default().is_empty());
    }
}
