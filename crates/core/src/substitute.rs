//! Prompt substitution and the prompts-then-variables render pipeline.
//!
//! Prompts are resolved first, variables second. Variable tokens that start
//! inside an inserted prompt value are skipped, so user input is never read
//! back as template syntax.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::codeblock::CodeBlockIndex;
use crate::config::DateTimeSettings;
use crate::format::format_datetime;
use crate::presets::{PresetKind, ValueType};
use crate::prompt::{
    find_prompt_occurrences, find_prompt_occurrences_in_content, OutputFormat, PromptDescriptor,
    PromptOccurrence,
};
use crate::span::Span;
use crate::validate::{parse_date_value, parse_datetime_value, parse_time_value};
use crate::variables::{substitute_variables_where, RenderTarget, VariableContext};

/// Values entered for prompts, keyed case-insensitively by prompt name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptValues {
    values: HashMap<String, String>,
}

impl PromptValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.values
            .insert(name.as_ref().trim().to_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(&name.trim().to_lowercase())
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for PromptValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = PromptValues::new();
        for (k, v) in iter {
            values.insert(k, v);
        }
        values
    }
}

/// How unfilled prompts render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubstitutionMode {
    /// Missing values become empty strings.
    Final,
    /// Unfilled prompts show as `[Name]`.
    Preview,
}

/// Result of prompt substitution with the output spans holding inserted values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substituted {
    pub text: String,
    pub inserted: Vec<Span>,
    /// Source spans copied through unchanged, with their start in `text`.
    copied: Vec<(Span, usize)>,
}

impl Substituted {
    fn is_inserted(&self, pos: usize) -> bool {
        let idx = self.inserted.partition_point(|s| s.end <= pos);
        self.inserted.get(idx).is_some_and(|s| s.contains(pos))
    }

    /// Offset in the source text of output offset `pos`, if `pos` lies in
    /// copied text.
    pub fn source_offset(&self, pos: usize) -> Option<usize> {
        let idx = self.copied.partition_point(|(_, out)| *out <= pos);
        let (source, out) = self.copied.get(idx.checked_sub(1)?)?;
        let offset = source.start + (pos - out);
        source.contains(offset).then_some(offset)
    }
}

fn at_midnight(date: NaiveDate) -> Option<DateTime<FixedOffset>> {
    date.and_hms_opt(0, 0, 0).map(at_utc)
}

fn at_utc(naive: NaiveDateTime) -> DateTime<FixedOffset> {
    Utc.from_utc_datetime(&naive).into()
}

fn render_with(config: Option<&OutputFormat>, kind: PresetKind, dt: &DateTime<FixedOffset>, settings: &DateTimeSettings) -> String {
    let default = OutputFormat::default();
    let format = config.unwrap_or(&default).resolve(kind, settings);
    format_datetime(dt, format)
}

/// Render an entered value the way the prompt's configuration asks for.
/// Values that do not parse are returned unchanged.
pub fn format_prompt_value(value: &str, prompt: &PromptDescriptor, settings: &DateTimeSettings) -> String {
    match prompt.value_type {
        ValueType::Date => parse_date_value(value)
            .and_then(at_midnight)
            .map(|dt| render_with(prompt.date_config.as_ref(), PresetKind::Date, &dt, settings))
            .unwrap_or_else(|| value.to_string()),
        ValueType::Time => parse_time_value(value)
            .map(|t| at_utc(NaiveDate::default().and_time(t)))
            .map(|dt| render_with(prompt.time_config.as_ref(), PresetKind::Time, &dt, settings))
            .unwrap_or_else(|| value.to_string()),
        ValueType::DateTime => match parse_datetime_value(value) {
            Some(naive) => {
                let dt = at_utc(naive);
                match (&prompt.date_config, &prompt.time_config) {
                    (Some(OutputFormat::Custom(d)), Some(OutputFormat::Custom(t))) if d == t => {
                        format_datetime(&dt, d)
                    }
                    (date, time) => format!(
                        "{} {}",
                        render_with(date.as_ref(), PresetKind::Date, &dt, settings),
                        render_with(time.as_ref(), PresetKind::Time, &dt, settings)
                    ),
                }
            }
            None => value.to_string(),
        },
        ValueType::MultiList => value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        ValueType::Text | ValueType::Numeric | ValueType::List => value.to_string(),
    }
}

fn resolve_value(
    prompt: &PromptDescriptor,
    values: &PromptValues,
    settings: &DateTimeSettings,
    mode: SubstitutionMode,
) -> String {
    match (values.get(&prompt.name), mode) {
        (Some(v), _) if !v.is_empty() => format_prompt_value(v, prompt, settings),
        (Some(_), SubstitutionMode::Preview) if prompt.is_optional => String::new(),
        (_, SubstitutionMode::Preview) => format!("[{}]", prompt.name),
        (_, SubstitutionMode::Final) => String::new(),
    }
}

fn substitute_occurrences(
    text: &str,
    occurrences: Vec<PromptOccurrence>,
    prompts: &[PromptDescriptor],
    values: &PromptValues,
    settings: &DateTimeSettings,
    mode: SubstitutionMode,
) -> Substituted {
    let mut out = String::with_capacity(text.len());
    let mut inserted = Vec::new();
    let mut copied = Vec::new();
    let mut last = 0;
    for occurrence in occurrences {
        let Some(prompt) = prompts.iter().find(|p| p.is_named(&occurrence.descriptor.name)) else {
            continue;
        };
        copy_source(&mut out, &mut copied, text, Span::new(last, occurrence.span.start));
        let start = out.len();
        out.push_str(&resolve_value(prompt, values, settings, mode));
        if out.len() > start {
            inserted.push(Span::new(start, out.len()));
        }
        last = occurrence.span.end;
    }
    copy_source(&mut out, &mut copied, text, Span::new(last, text.len()));
    Substituted {
        text: out,
        inserted,
        copied,
    }
}

fn copy_source(out: &mut String, copied: &mut Vec<(Span, usize)>, text: &str, span: Span) {
    if span.is_empty() {
        return;
    }
    copied.push((span, out.len()));
    out.push_str(span.text(text));
}

/// Substitute prompts in a pattern, tracking where values were inserted.
pub fn substitute_prompts_tracked(
    pattern: &str,
    prompts: &[PromptDescriptor],
    values: &PromptValues,
    settings: &DateTimeSettings,
    mode: SubstitutionMode,
) -> Substituted {
    substitute_occurrences(pattern, find_prompt_occurrences(pattern), prompts, values, settings, mode)
}

/// Substitute prompts in a title pattern. Missing values become empty.
/// Occurrences whose name is not in `prompts` stay verbatim.
pub fn substitute_prompts(
    pattern: &str,
    prompts: &[PromptDescriptor],
    values: &PromptValues,
    settings: &DateTimeSettings,
) -> String {
    substitute_prompts_tracked(pattern, prompts, values, settings, SubstitutionMode::Final).text
}

/// Substitute prompts in document content, leaving fenced code blocks intact.
pub fn substitute_in_content(
    content: &str,
    prompts: &[PromptDescriptor],
    values: &PromptValues,
    settings: &DateTimeSettings,
) -> String {
    substitute_in_content_tracked(content, prompts, values, settings).text
}

fn substitute_in_content_tracked(
    content: &str,
    prompts: &[PromptDescriptor],
    values: &PromptValues,
    settings: &DateTimeSettings,
) -> Substituted {
    substitute_occurrences(
        content,
        find_prompt_occurrences_in_content(content),
        prompts,
        values,
        settings,
        SubstitutionMode::Final,
    )
}

/// Render a title pattern: prompts, then variables (filename target).
/// The result is not yet sanitized.
pub fn render_title(
    pattern: &str,
    prompts: &[PromptDescriptor],
    values: &PromptValues,
    ctx: &VariableContext<'_>,
) -> String {
    render_title_with_mode(pattern, prompts, values, ctx, SubstitutionMode::Final)
}

/// Work-in-progress title for interactive display: unfilled prompts show as
/// `[Name]` and a missing counter as `#`.
pub fn preview_title(
    pattern: &str,
    prompts: &[PromptDescriptor],
    values: &PromptValues,
    ctx: &VariableContext<'_>,
) -> String {
    render_title_with_mode(pattern, prompts, values, ctx, SubstitutionMode::Preview)
}

fn render_title_with_mode(
    pattern: &str,
    prompts: &[PromptDescriptor],
    values: &PromptValues,
    ctx: &VariableContext<'_>,
    mode: SubstitutionMode,
) -> String {
    let ctx = ctx.clone().with_target(RenderTarget::Filename);
    let substituted = substitute_prompts_tracked(pattern, prompts, values, ctx.settings, mode);
    substitute_variables_where(&substituted.text, &ctx, |pos| substituted.is_inserted(pos))
}

/// Render file content: prompts, then variables (content target). Fenced code
/// blocks of the template are left untouched by both passes; fences typed
/// into prompt values do not hide later variables.
pub fn render_content(
    content: &str,
    prompts: &[PromptDescriptor],
    values: &PromptValues,
    ctx: &VariableContext<'_>,
) -> String {
    let ctx = ctx.clone().with_target(RenderTarget::Content);
    let substituted = substitute_in_content_tracked(content, prompts, values, ctx.settings);
    let fenced = CodeBlockIndex::new(content);
    substitute_variables_where(&substituted.text, &ctx, |pos| match substituted.source_offset(pos) {
        Some(source) => fenced.contains(source),
        None => true,
    })
}
