//! Sanitizing and validating submitted copy fields.
//!
//! Every rule runs on every submission; a failing field never hides the
//! outcome of another. Normalized values are produced whether or not the
//! submission is valid so a rejected form can be echoed back faithfully.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::models::{BookId, InstanceDraft, InstanceId, InstanceStatus, NewInstance};

pub const BOOK_REQUIRED: &str = "Book must be specified";
pub const IMPRINT_REQUIRED: &str = "Imprint must be specified";
pub const INVALID_STATUS: &str = "Status must be one of Maintenance, Available, Loaned, Reserved";
pub const INVALID_DATE: &str = "Invalid date";

/// Raw fields exactly as submitted. Absent fields deserialize as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InstanceForm {
    #[serde(default)]
    pub book: String,
    #[serde(default)]
    pub imprint: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub due_back: String,
}

/// A single rule violation, scoped to the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
    /// The normalized value that failed.
    pub value: String,
}

/// Result of running every field rule over a submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    /// Normalized echo of the submission.
    pub draft: InstanceDraft,
    /// Failures in field order; empty when the submission is valid.
    pub errors: Vec<FieldError>,
    valid: Option<NewInstance>,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// The validated record, or the echo and its errors for a re-render.
    pub fn into_result(self) -> Result<NewInstance, (InstanceDraft, Vec<FieldError>)> {
        match self.valid {
            Some(instance) if self.errors.is_empty() => Ok(instance),
            _ => Err((self.draft, self.errors)),
        }
    }
}

/// Validate a submission. `target` is carried into the draft when the
/// submission replaces an existing record.
pub fn validate(form: &InstanceForm, target: Option<&InstanceId>) -> Validation {
    let mut errors = Vec::new();

    let book = escape(form.book.trim());
    if book.is_empty() {
        errors.push(FieldError {
            field: "book",
            message: BOOK_REQUIRED,
            value: book.clone(),
        });
    }

    let imprint = escape(form.imprint.trim());
    if imprint.is_empty() {
        errors.push(FieldError {
            field: "imprint",
            message: IMPRINT_REQUIRED,
            value: imprint.clone(),
        });
    }

    let status_input = form.status.trim();
    let status = status_input.parse::<InstanceStatus>().ok();
    let status_echo = escape(status_input);
    if status.is_none() {
        errors.push(FieldError {
            field: "status",
            message: INVALID_STATUS,
            value: status_echo.clone(),
        });
    }

    let due_back = parse_due_back(&form.due_back);
    let due_back_echo = match due_back {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => escape(form.due_back.trim()),
    };
    if due_back.is_none() {
        errors.push(FieldError {
            field: "due_back",
            message: INVALID_DATE,
            value: due_back_echo.clone(),
        });
    }

    let valid = match (status, due_back) {
        (Some(status), Some(due_back)) if errors.is_empty() => Some(NewInstance {
            book: BookId::new(book.clone()),
            imprint: imprint.clone(),
            status,
            due_back,
        }),
        _ => None,
    };

    Validation {
        draft: InstanceDraft {
            id: target.cloned(),
            book,
            imprint,
            status: status_echo,
            due_back: due_back_echo,
        },
        errors,
        valid,
    }
}

/// Parse an ISO-8601 date or date-time, keeping only the calendar date.
///
/// Accepted forms are `YYYY`, `YYYY-MM`, `YYYY-MM-DD`, and a full date
/// followed by `T` (or a space), a clock time `HH:MM[:SS[.fff]]`, and an
/// optional offset `Z`, `±HH`, `±HHMM` or `±HH:MM`. Reduced precision dates
/// fall on the first day of their month or year. Components must be zero
/// padded; signed or expanded years are rejected.
pub fn parse_due_back(input: &str) -> Option<NaiveDate> {
    let input = input.trim();

    if has_shape(input, "9999") {
        return NaiveDate::from_ymd_opt(input.parse().ok()?, 1, 1);
    }
    if has_shape(input, "9999-99") {
        return NaiveDate::parse_from_str(&format!("{}-01", input), "%Y-%m-%d").ok();
    }

    let day = input.get(..10)?;
    if !has_shape(day, "9999-99-99") {
        return None;
    }
    let date = NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()?;

    let rest = &input[10..];
    if rest.is_empty() {
        return Some(date);
    }
    let time = rest.strip_prefix(['T', 't', ' '])?;
    is_time_of_day(time).then_some(date)
}

/// `9` in `shape` stands for an ASCII digit; every other byte must match.
fn has_shape(input: &str, shape: &str) -> bool {
    input.len() == shape.len()
        && input.bytes().zip(shape.bytes()).all(|(byte, expected)| match expected {
            b'9' => byte.is_ascii_digit(),
            other => byte == other,
        })
}

fn is_time_of_day(time: &str) -> bool {
    let (clock, offset) = match time.find(['Z', 'z', '+', '-']) {
        Some(split) => time.split_at(split),
        None => (time, ""),
    };

    let clock_ok = ["%H:%M:%S%.f", "%H:%M"]
        .iter()
        .any(|format| NaiveTime::parse_from_str(clock, format).is_ok());
    clock_ok && is_utc_offset(offset)
}

fn is_utc_offset(offset: &str) -> bool {
    let Some(digits) = offset.strip_prefix(['+', '-']) else {
        return matches!(offset, "" | "Z" | "z");
    };

    let (hours, minutes) = if has_shape(digits, "99:99") {
        (&digits[..2], &digits[3..])
    } else if has_shape(digits, "9999") {
        (&digits[..2], &digits[2..])
    } else if has_shape(digits, "99") {
        (digits, "00")
    } else {
        return false;
    };

    matches!(hours.parse::<u32>(), Ok(h) if h < 24) && matches!(minutes.parse::<u32>(), Ok(m) if m < 60)
}

/// Replace characters that are unsafe to render in HTML with entities.
pub fn escape(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '/' => escaped.push_str("&#x2F;"),
            '\\' => escaped.push_str("&#x5C;"),
            '`' => escaped.push_str("&#96;"),
            other => escaped.push(other),
        }
    }
    escaped
}
