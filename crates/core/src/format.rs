//! Moment-style date/time format strings: tokenizing, rendering, regex fragments.
//!
//! A format is split into token and literal spans by a greedy longest-first
//! scan over [`FORMAT_TOKENS`]. Anything that is not a known token is literal,
//! so tokenizing never fails. Text inside `[...]` is always literal.

use chrono::{DateTime, Datelike, FixedOffset, Timelike};
use serde::{Deserialize, Serialize};

use crate::sanitize::sanitize_fragment;
use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatPartKind {
    Token,
    Literal,
}

/// One span of a parsed format string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatPart {
    pub kind: FormatPartKind,
    pub value: String,
    pub span: Span,
}

/// A recognized format token with completion metadata and its regex fragment.
#[derive(Debug, Clone, Copy)]
pub struct FormatToken {
    pub token: &'static str,
    pub description: &'static str,
    pub example: &'static str,
    pub regex: &'static str,
}

const fn tok(
    token: &'static str,
    description: &'static str,
    example: &'static str,
    regex: &'static str,
) -> FormatToken {
    FormatToken {
        token,
        description,
        example,
        regex,
    }
}

const ORDINAL: &str = r"\d{1,3}(?:st|nd|rd|th)";

/// Known tokens, longest first. Tokenizing relies on this order.
pub static FORMAT_TOKENS: &[FormatToken] = &[
    tok("YYYY", "4-digit year", "2024", r"\d{4}"),
    tok("MMMM", "Full month name", "January", r"[A-Za-z]+"),
    tok("DDDD", "Day of year, padded", "032", r"\d{3}"),
    tok("DDDo", "Day of year, ordinal", "32nd", ORDINAL),
    tok("dddd", "Full weekday name", "Monday", r"[A-Za-z]+"),
    tok("GGGG", "ISO week year", "2024", r"\d{4}"),
    tok("gggg", "Week year", "2024", r"\d{4}"),
    tok("MMM", "Short month name", "Jan", r"[A-Za-z]{3}"),
    tok("DDD", "Day of year", "32", r"\d{1,3}"),
    tok("ddd", "Short weekday name", "Mon", r"[A-Za-z]{3}"),
    tok("SSS", "Milliseconds", "042", r"\d{3}"),
    tok("YY", "2-digit year", "24", r"\d{2}"),
    tok("Qo", "Quarter, ordinal", "1st", ORDINAL),
    tok("MM", "Month, padded", "01", r"\d{2}"),
    tok("Mo", "Month, ordinal", "1st", ORDINAL),
    tok("DD", "Day of month, padded", "05", r"\d{2}"),
    tok("Do", "Day of month, ordinal", "5th", ORDINAL),
    tok("dd", "Min weekday name", "Mo", r"[A-Za-z]{2}"),
    tok("do", "Day of week, ordinal", "1st", ORDINAL),
    tok("WW", "ISO week, padded", "05", r"\d{2}"),
    tok("Wo", "ISO week, ordinal", "5th", ORDINAL),
    tok("ww", "Week of year, padded", "05", r"\d{2}"),
    tok("wo", "Week of year, ordinal", "5th", ORDINAL),
    tok("GG", "ISO week year, 2-digit", "24", r"\d{2}"),
    tok("gg", "Week year, 2-digit", "24", r"\d{2}"),
    tok("HH", "Hour (00-23), padded", "09", r"\d{2}"),
    tok("hh", "Hour (01-12), padded", "09", r"\d{2}"),
    tok("kk", "Hour (01-24), padded", "09", r"\d{2}"),
    tok("mm", "Minute, padded", "07", r"\d{2}"),
    tok("ss", "Second, padded", "03", r"\d{2}"),
    tok("SS", "Hundredths of a second", "04", r"\d{2}"),
    tok("ZZ", "UTC offset", "+0100", r"[+-]\d{4}"),
    tok("Y", "Year", "2024", r"-?\d+"),
    tok("Q", "Quarter", "1", r"[1-4]"),
    tok("M", "Month", "1", r"\d{1,2}"),
    tok("D", "Day of month", "5", r"\d{1,2}"),
    tok("d", "Day of week (0 = Sunday)", "1", r"[0-6]"),
    tok("E", "ISO day of week (1 = Monday)", "1", r"[1-7]"),
    tok("e", "Locale day of week", "1", r"[0-6]"),
    tok("W", "ISO week", "5", r"\d{1,2}"),
    tok("w", "Week of year", "5", r"\d{1,2}"),
    tok("H", "Hour (0-23)", "9", r"\d{1,2}"),
    tok("h", "Hour (1-12)", "9", r"\d{1,2}"),
    tok("k", "Hour (1-24)", "9", r"\d{1,2}"),
    tok("m", "Minute", "7", r"\d{1,2}"),
    tok("s", "Second", "3", r"\d{1,2}"),
    tok("S", "Tenths of a second", "0", r"\d"),
    tok("A", "AM/PM", "PM", r"(?:AM|PM)"),
    tok("a", "am/pm", "pm", r"(?:am|pm)"),
    tok("Z", "UTC offset with colon", "+01:00", r"[+-]\d{2}:\d{2}"),
    tok("X", "Unix timestamp (seconds)", "1704067200", r"\d+"),
    tok("x", "Unix timestamp (milliseconds)", "1704067200000", r"\d+"),
];

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Look up a token by exact text.
pub fn find_token(token: &str) -> Option<&'static FormatToken> {
    FORMAT_TOKENS.iter().find(|t| t.token == token)
}

fn match_token_at(format: &str, pos: usize) -> Option<&'static FormatToken> {
    let rest = &format[pos..];
    FORMAT_TOKENS.iter().find(|t| rest.starts_with(t.token))
}

/// Split a format string into contiguous token/literal spans covering the input.
pub fn parse_format_string(format: &str) -> Vec<FormatPart> {
    let mut parts: Vec<FormatPart> = Vec::new();
    let mut pos = 0;

    while pos < format.len() {
        if let Some(token) = match_token_at(format, pos) {
            let end = pos + token.token.len();
            parts.push(FormatPart {
                kind: FormatPartKind::Token,
                value: token.token.to_string(),
                span: Span::new(pos, end),
            });
            pos = end;
            continue;
        }

        let rest = &format[pos..];
        let len = match rest.strip_prefix('[').and_then(|r| r.find(']')) {
            // `[` + inner + `]`
            Some(close) => close + 2,
            None => rest.chars().next().map(char::len_utf8).unwrap_or(1),
        };
        let end = pos + len;
        match parts.last_mut() {
            Some(last) if last.kind == FormatPartKind::Literal && last.span.end == pos => {
                last.value.push_str(&format[pos..end]);
                last.span.end = end;
            }
            _ => parts.push(FormatPart {
                kind: FormatPartKind::Literal,
                value: format[pos..end].to_string(),
                span: Span::new(pos, end),
            }),
        }
        pos = end;
    }

    parts
}

/// Literal text with `[...]` escapes unwrapped.
fn unescape_literal(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    let mut rest = literal;
    while let Some(open) = rest.find('[') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find(']') {
            Some(close) => {
                out.push_str(&after[..close]);
                rest = &after[close + 1..];
            }
            None => {
                out.push('[');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Render `dt` with a moment-style format string.
pub fn format_datetime(dt: &DateTime<FixedOffset>, format: &str) -> String {
    let mut out = String::with_capacity(format.len() + 16);
    for part in parse_format_string(format) {
        match part.kind {
            FormatPartKind::Token => render_token(&part.value, dt, &mut out),
            FormatPartKind::Literal => out.push_str(&unescape_literal(&part.value)),
        }
    }
    out
}

/// Regex fragment matching what [`format_datetime`] produces for `format`
/// once the result has gone through filename sanitization.
pub fn format_to_regex(format: &str) -> String {
    let mut out = String::new();
    for part in parse_format_string(format) {
        match part.kind {
            FormatPartKind::Token => match find_token(&part.value) {
                Some(token) => out.push_str(token.regex),
                None => out.push_str(&regex::escape(&part.value)),
            },
            FormatPartKind::Literal => {
                let literal = sanitize_fragment(&unescape_literal(&part.value));
                out.push_str(&regex::escape(&literal));
            }
        }
    }
    out
}

fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

fn hour12(hour: u32) -> u32 {
    match hour % 12 {
        0 => 12,
        h => h,
    }
}

/// Week of year with weeks starting on Sunday and the week holding Jan 1 as week 1.
fn locale_week(dt: &DateTime<FixedOffset>) -> u32 {
    let weekday = dt.weekday().num_days_from_sunday();
    let jan1_weekday = (weekday + 7 - dt.ordinal0() % 7) % 7;
    (dt.ordinal0() + jan1_weekday) / 7 + 1
}

fn push_offset(dt: &DateTime<FixedOffset>, with_colon: bool, out: &mut String) {
    let secs = dt.offset().local_minus_utc();
    let sign = if secs < 0 { '-' } else { '+' };
    let secs = secs.unsigned_abs();
    let (hours, minutes) = (secs / 3600, (secs % 3600) / 60);
    if with_colon {
        out.push_str(&format!("{}{:02}:{:02}", sign, hours, minutes));
    } else {
        out.push_str(&format!("{}{:02}{:02}", sign, hours, minutes));
    }
}

fn render_token(token: &str, dt: &DateTime<FixedOffset>, out: &mut String) {
    let month0 = dt.month0() as usize;
    let weekday = dt.weekday().num_days_from_sunday();
    let nanos = dt.nanosecond() % 1_000_000_000;
    let rendered = match token {
        "YYYY" => format!("{:04}", dt.year()),
        "YY" => format!("{:02}", dt.year().rem_euclid(100)),
        "Y" => dt.year().to_string(),
        "Q" => (month0 / 3 + 1).to_string(),
        "Qo" => ordinal(month0 as u32 / 3 + 1),
        "MMMM" => MONTHS[month0].to_string(),
        "MMM" => MONTHS[month0][..3].to_string(),
        "MM" => format!("{:02}", dt.month()),
        "Mo" => ordinal(dt.month()),
        "M" => dt.month().to_string(),
        "DDDD" => format!("{:03}", dt.ordinal()),
        "DDDo" => ordinal(dt.ordinal()),
        "DDD" => dt.ordinal().to_string(),
        "DD" => format!("{:02}", dt.day()),
        "Do" => ordinal(dt.day()),
        "D" => dt.day().to_string(),
        "dddd" => WEEKDAYS[weekday as usize].to_string(),
        "ddd" => WEEKDAYS[weekday as usize][..3].to_string(),
        "dd" => WEEKDAYS[weekday as usize][..2].to_string(),
        "do" => ordinal(weekday),
        "d" | "e" => weekday.to_string(),
        "E" => dt.weekday().number_from_monday().to_string(),
        "WW" => format!("{:02}", dt.iso_week().week()),
        "Wo" => ordinal(dt.iso_week().week()),
        "W" => dt.iso_week().week().to_string(),
        "ww" => format!("{:02}", locale_week(dt)),
        "wo" => ordinal(locale_week(dt)),
        "w" => locale_week(dt).to_string(),
        "GGGG" => format!("{:04}", dt.iso_week().year()),
        "GG" => format!("{:02}", dt.iso_week().year().rem_euclid(100)),
        "gggg" => format!("{:04}", dt.year()),
        "gg" => format!("{:02}", dt.year().rem_euclid(100)),
        "HH" => format!("{:02}", dt.hour()),
        "H" => dt.hour().to_string(),
        "hh" => format!("{:02}", hour12(dt.hour())),
        "h" => hour12(dt.hour()).to_string(),
        "kk" => format!("{:02}", if dt.hour() == 0 { 24 } else { dt.hour() }),
        "k" => (if dt.hour() == 0 { 24 } else { dt.hour() }).to_string(),
        "mm" => format!("{:02}", dt.minute()),
        "m" => dt.minute().to_string(),
        "ss" => format!("{:02}", dt.second()),
        "s" => dt.second().to_string(),
        "SSS" => format!("{:03}", nanos / 1_000_000),
        "SS" => format!("{:02}", nanos / 10_000_000),
        "S" => (nanos / 100_000_000).to_string(),
        "A" => (if dt.hour() < 12 { "AM" } else { "PM" }).to_string(),
        "a" => (if dt.hour() < 12 { "am" } else { "pm" }).to_string(),
        "ZZ" => return push_offset(dt, false, out),
        "Z" => return push_offset(dt, true, out),
        "X" => dt.timestamp().to_string(),
        "x" => dt.timestamp_millis().to_string(),
        other => other.to_string(),
    };
    out.push_str(&rendered);
}
