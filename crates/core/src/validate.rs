//! Checks entered prompt values against their declared type.
//!
//! Failures are reported as a [`ValidationResult`], never as an error.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::presets::ValueType;
use crate::prompt::PromptDescriptor;
use crate::sanitize::RESERVED_CHARS;
use crate::substitute::PromptValues;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(message.into()),
        }
    }
}

/// `YYYY-MM-DD`.
pub fn parse_date_value(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// `HH:mm` or `HH:mm:ss`.
pub fn parse_time_value(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

/// `YYYY-MM-DDTHH:mm[:ss]`, with `T` or a single space as separator.
pub fn parse_datetime_value(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    let (date, time) = value.split_once('T').or_else(|| value.split_once(' '))?;
    Some(parse_date_value(date)?.and_time(parse_time_value(time)?))
}

fn reserved_in(value: &str) -> Vec<char> {
    let mut found: Vec<char> = value.chars().filter(|c| RESERVED_CHARS.contains(c)).collect();
    found.dedup();
    found
}

/// Validate one entered value for `prompt`.
pub fn validate_prompt_value(value: &str, prompt: &PromptDescriptor) -> ValidationResult {
    let name = prompt.name.as_str();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return if prompt.is_optional {
            ValidationResult::ok()
        } else {
            ValidationResult::invalid(format!("{} cannot be empty", name))
        };
    }

    if !prompt.value_type.is_constrained() {
        let reserved = reserved_in(trimmed);
        if !reserved.is_empty() {
            let list: String = reserved.iter().map(|c| format!(" {}", c)).collect();
            return ValidationResult::invalid(format!(
                "{} contains characters not allowed in filenames:{}",
                name, list
            ));
        }
    }

    match prompt.value_type {
        ValueType::Text => ValidationResult::ok(),
        ValueType::Numeric => match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => ValidationResult::ok(),
            _ => ValidationResult::invalid(format!("{} must be a number", name)),
        },
        ValueType::Date => match parse_date_value(trimmed) {
            Some(_) => ValidationResult::ok(),
            None => ValidationResult::invalid(format!("{} must be a date (YYYY-MM-DD)", name)),
        },
        ValueType::Time => match parse_time_value(trimmed) {
            Some(_) => ValidationResult::ok(),
            None => ValidationResult::invalid(format!("{} must be a time (HH:mm)", name)),
        },
        ValueType::DateTime => match parse_datetime_value(trimmed) {
            Some(_) => ValidationResult::ok(),
            None => ValidationResult::invalid(format!(
                "{} must be a date and time (YYYY-MM-DDTHH:mm)",
                name
            )),
        },
        ValueType::List => {
            if prompt.options().iter().any(|o| o == value) {
                ValidationResult::ok()
            } else {
                ValidationResult::invalid(format!("\"{}\" is not a valid option for {}", value, name))
            }
        }
        ValueType::MultiList => {
            let options = prompt.options();
            let entries: Vec<&str> = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();
            if entries.is_empty() {
                return ValidationResult::invalid(format!("{} cannot be empty", name));
            }
            match entries.iter().find(|e| !options.iter().any(|o| o == *e)) {
                Some(bad) => ValidationResult::invalid(format!(
                    "\"{}\" is not a valid option for {}",
                    bad, name
                )),
                None => ValidationResult::ok(),
            }
        }
    }
}

/// Validate every prompt, returning failures by prompt name in prompt order.
/// Prompts with no entry in `values` are validated as empty.
pub fn validate_all(prompts: &[PromptDescriptor], values: &PromptValues) -> Vec<(String, ValidationResult)> {
    prompts
        .iter()
        .map(|p| (p.name.clone(), validate_prompt_value(values.get(&p.name).unwrap_or(""), p)))
        .filter(|(_, r)| !r.valid)
        .collect()
}

pub fn all_prompts_valid(prompts: &[PromptDescriptor], values: &PromptValues) -> bool {
    validate_all(prompts, values).is_empty()
}
