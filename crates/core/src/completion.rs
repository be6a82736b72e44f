//! Autocomplete context: what is being typed at the cursor, and what fits.
//!
//! Only the text before the cursor is inspected. The innermost unclosed
//! `{%` or `{{` decides the context; triggers inside fenced code are ignored.

use serde::Serialize;

use crate::codeblock::CodeBlockIndex;
use crate::format::FORMAT_TOKENS;
use crate::presets::{PresetKind, ValueType};
use crate::prompt::extract_prompts_in_content;
use crate::span::Span;
use crate::variables::VariableKind;

const CUSTOM_FORMAT_OPEN: &str = "format(";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuggestionStage {
    /// Right after `{%` or `{%?`, nothing typed yet.
    Opening,
    Name,
    Type,
    /// Preset or list segment after the second colon.
    Format,
    /// Inside `format(` of a prompt or after `:` of a date variable.
    FormatToken,
    /// Name of a `{{variable}}`.
    Variable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestionContext {
    pub stage: SuggestionStage,
    /// Text already typed for the current item.
    pub query: String,
    /// Range a chosen completion replaces.
    pub replace: Span,
    /// Declared type of the prompt, once past the type segment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
    #[serde(skip)]
    pub preset_kind: Option<PresetKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub label: String,
    pub description: String,
    pub insert_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

impl Completion {
    fn new(label: impl Into<String>, description: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            insert_text: label.clone(),
            label,
            description: description.into(),
            example: None,
        }
    }

    fn with_insert(mut self, insert_text: impl Into<String>) -> Self {
        self.insert_text = insert_text.into();
        self
    }

    fn with_example(mut self, example: impl Into<String>) -> Self {
        self.example = Some(example.into());
        self
    }
}

fn context(stage: SuggestionStage, before: &str, start: usize) -> SuggestionContext {
    SuggestionContext {
        stage,
        query: before[start..].to_string(),
        replace: Span::new(start, before.len()),
        value_type: None,
        preset_kind: None,
    }
}

fn skip_whitespace(text: &str, from: usize, to: usize) -> usize {
    let trimmed = text[from..to].trim_start();
    to - trimmed.len()
}

/// Start of the trailing run of ASCII letters in `text[from..]`.
fn trailing_letters(text: &str, from: usize) -> usize {
    let tail = &text[from..];
    let kept = tail.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    from + kept.len()
}

/// Classify what the user is typing at the end of `before`.
pub fn suggestion_context(before: &str) -> Option<SuggestionContext> {
    let prompt_open = before.rfind("{%");
    let variable_open = before.rfind("{{");
    let (open, is_prompt) = match (prompt_open, variable_open) {
        (Some(p), Some(v)) if v > p => (v, false),
        (Some(p), _) => (p, true),
        (None, Some(v)) => (v, false),
        (None, None) => return None,
    };
    if CodeBlockIndex::new(before).contains(open) {
        return None;
    }
    if is_prompt {
        prompt_context(before, open)
    } else {
        variable_context(before, open)
    }
}

fn prompt_context(before: &str, open: usize) -> Option<SuggestionContext> {
    let mut inner_start = open + 2;
    if before[inner_start..].starts_with('?') {
        inner_start += 1;
    }
    let inner = &before[inner_start..];
    if inner.contains('%') {
        return None;
    }

    let Some(first_rel) = inner.find(':') else {
        let start = skip_whitespace(before, inner_start, before.len());
        let stage = if start == before.len() {
            SuggestionStage::Opening
        } else {
            SuggestionStage::Name
        };
        return Some(context(stage, before, start));
    };
    let first = inner_start + first_rel;

    let Some(second_rel) = before[first + 1..].find(':') else {
        let start = skip_whitespace(before, first + 1, before.len());
        return Some(context(SuggestionStage::Type, before, start));
    };
    let second = first + 1 + second_rel;
    let value_type = ValueType::from_alias(&before[first + 1..second]).unwrap_or_default();

    let segment_start = skip_whitespace(before, second + 1, before.len());
    let segment = &before[segment_start..];
    let is_custom = segment
        .get(..CUSTOM_FORMAT_OPEN.len())
        .is_some_and(|s| s.eq_ignore_ascii_case(CUSTOM_FORMAT_OPEN));
    if is_custom {
        if segment.contains(')') {
            return None;
        }
        let start = trailing_letters(before, segment_start + CUSTOM_FORMAT_OPEN.len());
        let mut ctx = context(SuggestionStage::FormatToken, before, start);
        ctx.value_type = Some(value_type);
        return Some(ctx);
    }

    let (start, preset_kind) = match (value_type, segment.rfind(',')) {
        (ValueType::DateTime, Some(comma)) => (
            skip_whitespace(before, segment_start + comma + 1, before.len()),
            Some(PresetKind::Time),
        ),
        (ValueType::Date | ValueType::DateTime, _) => (segment_start, Some(PresetKind::Date)),
        (ValueType::Time, _) => (segment_start, Some(PresetKind::Time)),
        (_, Some(comma)) => (skip_whitespace(before, segment_start + comma + 1, before.len()), None),
        (_, None) => (segment_start, None),
    };
    let mut ctx = context(SuggestionStage::Format, before, start);
    ctx.value_type = Some(value_type);
    ctx.preset_kind = preset_kind;
    Some(ctx)
}

fn variable_context(before: &str, open: usize) -> Option<SuggestionContext> {
    let inner_start = open + 2;
    let inner = &before[inner_start..];
    if inner.contains('}') || inner.contains('{') {
        return None;
    }
    match inner.find(':') {
        Some(colon_rel) => {
            let kind = VariableKind::from_name(&inner[..colon_rel])?;
            if !kind.accepts_format() {
                return None;
            }
            let start = trailing_letters(before, inner_start + colon_rel + 1);
            Some(context(SuggestionStage::FormatToken, before, start))
        }
        None => {
            if !inner.chars().all(|c| c.is_alphanumeric() || c == '_') {
                return None;
            }
            Some(context(SuggestionStage::Variable, before, inner_start))
        }
    }
}

fn matches_prefix(label: &str, query: &str) -> bool {
    label.to_lowercase().starts_with(&query.to_lowercase())
}

fn candidates(ctx: &SuggestionContext, before: &str) -> Vec<Completion> {
    match ctx.stage {
        SuggestionStage::Opening => ValueType::ALL
            .iter()
            .map(|ty| {
                let insert = match ty {
                    ValueType::Text => "Name".to_string(),
                    ty => format!("Name:{}", ty.keyword()),
                };
                Completion::new(ty.keyword(), ty.description())
                    .with_insert(insert)
                    .with_example(ty.example())
            })
            .collect(),
        SuggestionStage::Name => {
            let earlier = &before[..ctx.replace.start];
            extract_prompts_in_content(earlier)
                .into_iter()
                .map(|p| Completion::new(p.name, format!("Existing {} prompt", p.value_type.keyword())))
                .collect()
        }
        SuggestionStage::Type => ValueType::ALL
            .iter()
            .map(|ty| Completion::new(ty.keyword(), ty.description()).with_example(ty.example()))
            .collect(),
        SuggestionStage::Format => {
            let Some(kind) = ctx.preset_kind else {
                return Vec::new();
            };
            let mut items: Vec<Completion> = kind
                .presets()
                .iter()
                .map(|p| {
                    let c = Completion::new(p.name, p.description);
                    match p.format {
                        Some(f) => c.with_example(f),
                        None => c,
                    }
                })
                .collect();
            let after_comma = ctx.value_type == Some(ValueType::DateTime) && kind == PresetKind::Time;
            if !after_comma {
                items.push(
                    Completion::new("format(...)", "Custom format")
                        .with_insert(CUSTOM_FORMAT_OPEN)
                        .with_example("format(MMM D, YYYY)"),
                );
            }
            items
        }
        SuggestionStage::FormatToken => FORMAT_TOKENS
            .iter()
            .map(|t| Completion::new(t.token, t.description).with_example(t.example))
            .collect(),
        SuggestionStage::Variable => VariableKind::ALL
            .iter()
            .map(|k| Completion::new(k.name(), k.description()).with_insert(format!("{}}}}}", k.name())))
            .collect(),
    }
}

/// Context plus completions whose label starts with the query
/// (case-insensitive).
pub fn suggestions(before: &str) -> Option<(SuggestionContext, Vec<Completion>)> {
    let ctx = suggestion_context(before)?;
    let items = candidates(&ctx, before)
        .into_iter()
        .filter(|c| matches_prefix(&c.label, &ctx.query))
        .collect();
    Some((ctx, items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn stage(before: &str) -> Option<SuggestionStage> {
        suggestion_context(before).map(|c| c.stage)
    }

    fn labels(before: &str) -> Vec<String> {
        suggestions(before)
            .map(|(_, items)| items.into_iter().map(|c| c.label).collect())
            .unwrap_or_default()
    }

    #[test]
    fn classifies_prompt_stages() {
        assert_eq!(stage("Title {%"), Some(SuggestionStage::Opening));
        assert_eq!(stage("{%? "), Some(SuggestionStage::Opening));
        assert_eq!(stage("{% Ti"), Some(SuggestionStage::Name));
        assert_eq!(stage("{% Due:da"), Some(SuggestionStage::Type));
        assert_eq!(stage("{% Due:date:"), Some(SuggestionStage::Format));
        assert_eq!(stage("{% Due:date:format(YY"), Some(SuggestionStage::FormatToken));
        assert_eq!(stage("{% Due:date:format(YY)"), None);
        assert_eq!(stage("{% Done %} after"), None);
    }

    #[test]
    fn query_and_replace_span() {
        let before = "x {% Due:  da";
        let ctx = suggestion_context(before).unwrap();
        assert_eq!(ctx.query, "da");
        assert_eq!(ctx.replace.text(before), "da");
        let before = "{% D:date:format(MMM D, YY";
        let ctx = suggestion_context(before).unwrap();
        assert_eq!(ctx.query, "YY");
        assert_eq!(ctx.replace, Span::new(before.len() - 2, before.len()));
    }

    #[test]
    fn classifies_variables() {
        assert_eq!(stage("{{da"), Some(SuggestionStage::Variable));
        assert_eq!(stage("{{date:MM"), Some(SuggestionStage::FormatToken));
        assert_eq!(stage("{{counter:"), None);
        assert_eq!(stage("{{date}}"), None);
        assert_eq!(stage("{{date:{% Fmt"), Some(SuggestionStage::Name));
    }

    #[test]
    fn ignores_fenced_code() {
        assert_eq!(stage("```\n{% Ti"), None);
        assert_eq!(stage("```\ncode\n```\n{% Ti"), Some(SuggestionStage::Name));
    }

    #[test]
    fn type_suggestions_filter_by_prefix() {
        assert_eq!(labels("{% X:d"), vec!["date", "datetime"]);
        assert_eq!(labels("{% X:MULTI"), vec!["multilist"]);
    }

    #[test]
    fn format_suggestions_follow_type() {
        let date = labels("{% X:date:");
        assert!(date.contains(&"ISO".to_string()));
        assert!(date.contains(&"short-month".to_string()));
        assert!(date.contains(&"format(...)".to_string()));
        assert_eq!(labels("{% X:time:12"), vec!["12-hour"]);
        assert_eq!(labels("{% X:datetime:ISO, 24"), vec!["24-hour"]);
        assert!(labels("{% X:list:").is_empty());
    }

    #[test]
    fn format_token_suggestions() {
        let items = labels("{% X:date:format(MMM");
        assert_eq!(items, vec!["MMMM", "MMM"]);
        assert!(labels("{{time:h").contains(&"HH".to_string()));
    }

    #[test]
    fn name_suggestions_come_from_earlier_prompts() {
        assert_eq!(labels("{% Title %} {% Topic:list:a %} {% T"), vec!["Title", "Topic"]);
    }

    #[test]
    fn variable_suggestions_insert_closing_braces() {
        let (_, items) = suggestions("{{cou").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].insert_text, "counter}}");
    }

    #[test]
    fn opening_suggests_prompt_shapes() {
        let (ctx, items) = suggestions("{%").unwrap();
        assert_eq!(ctx.stage, SuggestionStage::Opening);
        assert_eq!(items.len(), ValueType::ALL.len());
        assert_eq!(items[0].insert_text, "Name");
        assert_eq!(items[2].insert_text, "Name:date");
    }
}
