//! Tag-line grammar shared by all MT9xx messages.
//!
//! Messages are CRLF separated lines; a field starts with `:NN[X]:` and may
//! continue on following lines that do not start with a tag. A line holding
//! only `-` ends the text block.

use super::types::{Balance, BalanceKind, Transaction};
use crate::error::{Error, Result};
use crate::types::{round_amount, DebitCredit};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::debug;

pub const LINE_SEPARATOR: &str = "\r\n";
pub const END_MARKER: &str = "-";

lazy_static! {
    static ref TAG_LINE: Regex = Regex::new(r"^:(\d{2}[A-Z]?):(.*)$").unwrap();
    static ref STATEMENT_LINE: Regex = Regex::new(
        r"^(\d{6})(\d{4})?(R?[CD])([A-Z])?(\d+,\d*)([NFS][A-Z0-9]{3})(.*?)(?://(.*))?$"
    )
    .unwrap();
    static ref BLOCK2_TYPE: Regex = Regex::new(r"\{2:[IO](\d{3})").unwrap();
}

/// One tag with its content. Continuation lines are kept, joined by `\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub tag: String,
    pub content: String,
    /// 1-based line number of the tag line.
    pub line: usize,
}

impl Field {
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.content.split('\n')
    }

    /// Content with continuation lines concatenated without separator.
    pub fn joined(&self) -> String {
        self.lines().collect()
    }

    fn parse_error(&self, message: impl Into<String>) -> Error {
        Error::MtParseError {
            line: self.line,
            message: format!(":{}: {}", self.tag, message.into()),
        }
    }
}

/// Message type code from an `{2:I940…}` / `{2:O940…}` application header.
pub fn envelope_type(text: &str) -> Option<&str> {
    BLOCK2_TYPE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Remove a `{1:..}{2:..}{4:` envelope and its `-}` trailer if present.
fn strip_envelope(text: &str) -> &str {
    let text = text.trim();
    let body = match text.find("{4:") {
        Some(pos) if text.starts_with('{') => &text[pos + 3..],
        _ => text,
    };
    match body.rfind("-}") {
        Some(pos) if text.starts_with('{') => &body[..pos + 1],
        _ => body,
    }
}

/// Split a message into its fields.
pub fn split_fields(text: &str) -> Result<Vec<Field>> {
    let body = strip_envelope(text);
    let mut fields: Vec<Field> = Vec::new();

    for (index, raw) in body.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        let number = index + 1;
        if line.trim() == END_MARKER {
            break;
        }
        if let Some(caps) = TAG_LINE.captures(line) {
            fields.push(Field {
                tag: caps[1].to_string(),
                content: caps[2].to_string(),
                line: number,
            });
            continue;
        }
        match fields.last_mut() {
            Some(field) => {
                field.content.push('\n');
                field.content.push_str(line);
            }
            None if line.trim().is_empty() => {}
            None => {
                return Err(Error::MtParseError {
                    line: number,
                    message: format!("content before first tag: '{}'", line),
                })
            }
        }
    }

    if fields.is_empty() {
        return Err(Error::ParseError("no MT fields found".to_string()));
    }
    Ok(fields)
}

/// Join tag lines with CRLF and close with the end marker.
pub fn assemble(lines: &[String]) -> String {
    let mut out = lines.join(LINE_SEPARATOR);
    out.push_str(LINE_SEPARATOR);
    out.push_str(END_MARKER);
    out
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%y%m%d").to_string()
}

pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%y%m%d").map_err(|_| Error::InvalidDate(value.to_string()))
}

/// `:13D:` date-time indication, `YYMMDDHHMM±hhmm`.
pub fn format_date_time(value: &DateTime<FixedOffset>) -> String {
    value.format("%y%m%d%H%M%z").to_string()
}

pub fn parse_date_time(value: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_str(value.trim(), "%y%m%d%H%M%z")
        .map_err(|_| Error::InvalidDate(value.to_string()))
}

/// SWIFT amount: absolute value, two decimals, comma separator.
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", round_amount(amount.abs())).replace('.', ",")
}

pub fn parse_amount(value: &str) -> Result<Decimal> {
    let mut normalized = value.trim().replace(',', ".");
    if normalized.ends_with('.') {
        normalized.push('0');
    }
    Decimal::from_str(&normalized)
        .map(round_amount)
        .map_err(|_| Error::InvalidAmount(value.to_string()))
}

/// `<D/C><YYMMDD><CCY><AMOUNT>`
pub fn format_balance(balance: &Balance) -> String {
    format!(
        "{}{}{}{}",
        balance.debit_credit.mt_code(),
        format_date(balance.date),
        balance.currency,
        format_amount(balance.amount)
    )
}

pub fn balance_line(balance: &Balance) -> String {
    format!(":{}:{}", balance.kind.tag(), format_balance(balance))
}

pub fn parse_balance(field: &Field) -> Result<Balance> {
    let kind = BalanceKind::from_tag(&field.tag).ok_or_else(|| field.parse_error("not a balance tag"))?;
    let content = field.content.trim();
    if content.len() < 11 || !content.is_ascii() {
        return Err(field.parse_error(format!("balance too short: '{}'", content)));
    }
    let debit_credit = content[0..1]
        .parse::<DebitCredit>()
        .map_err(|e| field.parse_error(e))?;
    let date = parse_date(&content[1..7])?;
    let currency = &content[7..10];
    let amount = parse_amount(&content[10..])?;
    Ok(Balance::new(kind, debit_credit, date, currency, amount))
}

/// `:61:` statement line plus the optional supplementary details line.
pub fn statement_lines(tx: &Transaction) -> Vec<String> {
    let value_date = tx.valuta_date().unwrap_or(tx.booking_date());
    let mark = if tx.is_reversal() {
        format!("R{}", tx.debit_credit().mt_code())
    } else {
        tx.debit_credit().mt_code().to_string()
    };
    let mut line = format!(
        ":61:{}{}{}{}{}{}",
        format_date(value_date),
        tx.booking_date().format("%m%d"),
        mark,
        format_amount(tx.amount()),
        tx.transaction_code(),
        tx.customer_reference()
    );
    if let Some(bank_reference) = tx.bank_reference() {
        line.push_str("//");
        line.push_str(bank_reference);
    }

    let mut lines = vec![line];
    if let Some(details) = tx.supplementary_details() {
        lines.push(details.to_string());
    }
    lines
}

/// Resolve the year of an `MMDD` entry date relative to the value date.
/// Entries booked in December for a January value date belong to the
/// previous year, and vice versa.
fn entry_date(value_date: NaiveDate, mmdd: &str) -> Result<NaiveDate> {
    let month: u32 = mmdd[0..2].parse().map_err(|_| Error::InvalidDate(mmdd.to_string()))?;
    let day: u32 = mmdd[2..4].parse().map_err(|_| Error::InvalidDate(mmdd.to_string()))?;
    let year = match (value_date.month(), month) {
        (1, 12) => value_date.year() - 1,
        (12, 1) => value_date.year() + 1,
        _ => value_date.year(),
    };
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| Error::InvalidDate(mmdd.to_string()))
}

/// Parse a `:61:` field. The purpose is attached later from `:86:`.
pub fn parse_statement_line(field: &Field, currency: &str) -> Result<Transaction> {
    let mut lines = field.lines();
    let first = lines.next().unwrap_or("").trim();
    let caps = STATEMENT_LINE
        .captures(first)
        .ok_or_else(|| field.parse_error(format!("malformed statement line '{}'", first)))?;

    let value_date = parse_date(&caps[1])?;
    let booking_date = match caps.get(2) {
        Some(mmdd) => entry_date(value_date, mmdd.as_str())?,
        None => value_date,
    };
    let mark = &caps[3];
    let debit_credit = mark[mark.len() - 1..]
        .parse::<DebitCredit>()
        .map_err(|e| field.parse_error(e))?;
    let amount = parse_amount(&caps[5])?;

    let mut tx = Transaction::new(booking_date, amount, debit_credit, currency)
        .with_valuta_date(value_date)
        .with_reversal(mark.starts_with('R'))
        .with_transaction_code(&caps[6])?;

    let customer_reference = caps[7].trim();
    if !customer_reference.is_empty() {
        tx = tx.with_customer_reference(customer_reference)?;
    }
    if let Some(bank_reference) = caps.get(8).map(|m| m.as_str().trim()).filter(|r| !r.is_empty()) {
        tx = tx.with_bank_reference(bank_reference)?;
    }
    let details: String = lines.collect::<Vec<_>>().join(" ");
    if !details.trim().is_empty() {
        tx = tx.with_supplementary_details(details.trim())?;
    }
    Ok(tx)
}

/// Split text into chunks of at most `width` characters.
pub fn chunk_chars(text: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(width.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// True when `line` would be read back as a tag or as the end marker.
pub fn breaks_message(line: &str) -> bool {
    line.starts_with(':') || line.trim() == END_MARKER
}

/// Reject text that cannot stay inside one field.
pub fn check_field_text(field: &str, text: &str) -> Result<()> {
    if text.contains(['\r', '\n']) {
        return Err(Error::InvalidArgument(format!(
            "{} contains a line break: '{}'",
            field,
            text.escape_debug()
        )));
    }
    Ok(())
}

/// Split narrative text into lines of `first_width`, then `width`
/// characters. A boundary moves back while the following line would start
/// with `:` or read as the end marker; text that cannot be split that way
/// is rejected.
pub fn narrative_lines(field: &str, text: &str, first_width: usize, width: usize) -> Result<Vec<String>> {
    check_field_text(field, text)?;
    let chars: Vec<char> = text.chars().collect();
    let width = width.max(1);
    let next_line = |start: usize| -> String { chars[start..(start + width).min(chars.len())].iter().collect() };

    let mut lines = Vec::new();
    let mut start = 0;
    let mut limit = first_width.max(1);
    while start < chars.len() {
        let mut end = (start + limit).min(chars.len());
        while end < chars.len() && end > start + 1 && breaks_message(&next_line(end)) {
            end -= 1;
        }
        if end < chars.len() && breaks_message(&next_line(end)) {
            return Err(Error::InvalidArgument(format!(
                "{} cannot be wrapped without starting a line with ':' or '-': '{}'",
                field, text
            )));
        }
        lines.push(chars[start..end].iter().collect());
        start = end;
        limit = width;
    }
    Ok(lines)
}

/// Wrap free text for a tag: the first line follows the tag, the rest are
/// continuation lines, at most `max_lines` lines in total.
pub fn wrap_field(tag: &str, text: &str, width: usize, max_lines: usize) -> Result<Vec<String>> {
    let chunks = narrative_lines(tag, text, width, width)?;
    if chunks.len() > max_lines {
        debug!(tag, lines = chunks.len(), max_lines, "field text truncated");
    }
    Ok(chunks
        .into_iter()
        .take(max_lines)
        .enumerate()
        .map(|(i, chunk)| if i == 0 { format!(":{}:{}", tag, chunk) } else { chunk })
        .collect())
}

/// Find the first field with `tag`.
pub fn find<'a>(fields: &'a [Field], tag: &str) -> Option<&'a Field> {
    fields.iter().find(|f| f.tag == tag)
}

/// Content of a required single-line field.
pub fn required(fields: &[Field], tag: &str, name: &str) -> Result<String> {
    find(fields, tag)
        .map(|f| f.joined().trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::MissingField(format!("{} :{}:", name, tag)))
}
