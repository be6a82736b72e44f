//! Built-in variables: `{{name}}` and `{{name:FORMAT}}`.
//!
//! Names are matched case-insensitively. Unknown names are left in the text
//! untouched so templates written for newer versions keep their placeholders.

use chrono::{DateTime, FixedOffset};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::DateTimeSettings;
use crate::format::{format_datetime, format_to_regex};
use crate::span::Span;

static VARIABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{(\w+)(?::([^{}]*))?\}\}").expect("failed to compile variable regex")
});

/// Rendered in place of `{{counter}}` when no value is known yet.
pub const COUNTER_PLACEHOLDER: &str = "#";

/// Time format used in filenames when `{{time}}` has no explicit format.
pub const FILENAME_TIME_FORMAT: &str = "HH-mm";

/// Format behind `{{timestamp}}`.
pub const TIMESTAMP_FORMAT: &str = "YYYYMMDDHHmmss";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    Date,
    Time,
    #[serde(rename = "datetime")]
    DateTime,
    Timestamp,
    Year,
    Month,
    Day,
    Counter,
}

impl VariableKind {
    pub const ALL: [VariableKind; 8] = [
        VariableKind::Date,
        VariableKind::Time,
        VariableKind::DateTime,
        VariableKind::Timestamp,
        VariableKind::Year,
        VariableKind::Month,
        VariableKind::Day,
        VariableKind::Counter,
    ];

    pub fn from_name(name: &str) -> Option<VariableKind> {
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(name))
    }

    pub fn name(self) -> &'static str {
        match self {
            VariableKind::Date => "date",
            VariableKind::Time => "time",
            VariableKind::DateTime => "datetime",
            VariableKind::Timestamp => "timestamp",
            VariableKind::Year => "year",
            VariableKind::Month => "month",
            VariableKind::Day => "day",
            VariableKind::Counter => "counter",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            VariableKind::Date => "Current date",
            VariableKind::Time => "Current time",
            VariableKind::DateTime => "Current date and time",
            VariableKind::Timestamp => "Compact timestamp (YYYYMMDDHHmmss)",
            VariableKind::Year => "Current year",
            VariableKind::Month => "Current month (01-12)",
            VariableKind::Day => "Current day of month (01-31)",
            VariableKind::Counter => "Next number in this folder",
        }
    }

    /// Only date, time and datetime honor a `:FORMAT` suffix.
    pub fn accepts_format(self) -> bool {
        matches!(
            self,
            VariableKind::Date | VariableKind::Time | VariableKind::DateTime
        )
    }
}

/// Where rendered text ends up. Filenames get a colon-free default time format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    Filename,
    Content,
}

/// One `{{...}}` occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableToken {
    /// Name as written.
    pub name: String,
    /// `None` for unknown names.
    pub kind: Option<VariableKind>,
    pub format: Option<String>,
    pub span: Span,
    pub name_span: Span,
    pub format_span: Option<Span>,
}

/// Everything needed to render variables.
#[derive(Debug, Clone)]
pub struct VariableContext<'a> {
    pub now: DateTime<FixedOffset>,
    pub counter: Option<u64>,
    pub settings: &'a DateTimeSettings,
    pub target: RenderTarget,
}

impl<'a> VariableContext<'a> {
    pub fn new(now: DateTime<FixedOffset>, settings: &'a DateTimeSettings) -> Self {
        Self {
            now,
            counter: None,
            settings,
            target: RenderTarget::Filename,
        }
    }

    pub fn with_counter(mut self, counter: Option<u64>) -> Self {
        self.counter = counter;
        self
    }

    pub fn with_target(mut self, target: RenderTarget) -> Self {
        self.target = target;
        self
    }
}

/// Find every `{{...}}` occurrence, known or not.
pub fn parse_variables(text: &str) -> Vec<VariableToken> {
    VARIABLE_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?;
            let format = caps.get(2);
            Some(VariableToken {
                name: name.as_str().to_string(),
                kind: VariableKind::from_name(name.as_str()),
                format: format.map(|f| f.as_str().to_string()),
                span: Span::new(whole.start(), whole.end()),
                name_span: Span::new(name.start(), name.end()),
                format_span: format.map(|f| Span::new(f.start(), f.end())),
            })
        })
        .collect()
}

/// Number of `{{counter}}` placeholders in `text`.
pub fn count_counters(text: &str) -> usize {
    parse_variables(text)
        .iter()
        .filter(|v| v.kind == Some(VariableKind::Counter))
        .count()
}

pub fn has_counter(text: &str) -> bool {
    count_counters(text) > 0
}

/// True if `text` holds a recognized variable other than the counter.
pub fn has_dynamic_variables(text: &str) -> bool {
    parse_variables(text)
        .iter()
        .any(|v| matches!(v.kind, Some(k) if k != VariableKind::Counter))
}

fn explicit_format(token: &VariableToken) -> Option<&str> {
    token
        .format
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
}

fn default_time_format<'a>(ctx: &VariableContext<'a>) -> &'a str {
    match ctx.target {
        RenderTarget::Filename => FILENAME_TIME_FORMAT,
        RenderTarget::Content => &ctx.settings.time_format,
    }
}

fn datetime_default_format(settings: &DateTimeSettings) -> String {
    format!("{} {}", settings.date_format, settings.time_format)
}

/// Render one known variable.
pub fn render_variable(kind: VariableKind, format: Option<&str>, ctx: &VariableContext<'_>) -> String {
    let format = format.filter(|_| kind.accepts_format());
    match kind {
        VariableKind::Date => {
            format_datetime(&ctx.now, format.unwrap_or(&ctx.settings.date_format))
        }
        VariableKind::Time => format_datetime(&ctx.now, format.unwrap_or(default_time_format(ctx))),
        VariableKind::DateTime => match format {
            Some(f) => format_datetime(&ctx.now, f),
            None => format_datetime(&ctx.now, &datetime_default_format(ctx.settings)),
        },
        VariableKind::Timestamp => format_datetime(&ctx.now, TIMESTAMP_FORMAT),
        VariableKind::Year => format_datetime(&ctx.now, "YYYY"),
        VariableKind::Month => format_datetime(&ctx.now, "MM"),
        VariableKind::Day => format_datetime(&ctx.now, "DD"),
        VariableKind::Counter => match ctx.counter {
            Some(n) => n.to_string(),
            None => COUNTER_PLACEHOLDER.to_string(),
        },
    }
}

/// Regex fragment matching what `token` renders to inside a sanitized filename.
pub fn variable_regex(token: &VariableToken, settings: &DateTimeSettings) -> String {
    let Some(kind) = token.kind else {
        return regex::escape(&crate::sanitize::sanitize_fragment(&token.span_text_fallback()));
    };
    let format = explicit_format(token).filter(|_| kind.accepts_format());
    match kind {
        VariableKind::Date => format_to_regex(format.unwrap_or(&settings.date_format)),
        VariableKind::Time => format_to_regex(format.unwrap_or(FILENAME_TIME_FORMAT)),
        VariableKind::DateTime => match format {
            Some(f) => format_to_regex(f),
            None => format_to_regex(&datetime_default_format(settings)),
        },
        VariableKind::Timestamp => format_to_regex(TIMESTAMP_FORMAT),
        VariableKind::Year => r"\d{4}".to_string(),
        VariableKind::Month | VariableKind::Day => r"\d{2}".to_string(),
        VariableKind::Counter => r"\d+".to_string(),
    }
}

impl VariableToken {
    /// Reconstructed source text, used when an unknown variable stays verbatim.
    fn span_text_fallback(&self) -> String {
        match &self.format {
            Some(f) => format!("{{{{{}:{}}}}}", self.name, f),
            None => format!("{{{{{}}}}}", self.name),
        }
    }
}

/// Replace every known variable in `text`.
pub fn substitute_variables(text: &str, ctx: &VariableContext<'_>) -> String {
    substitute_variables_where(text, ctx, |_| false)
}

/// Replace known variables, leaving any whose start offset satisfies `skip`.
pub fn substitute_variables_where(
    text: &str,
    ctx: &VariableContext<'_>,
    skip: impl Fn(usize) -> bool,
) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for token in parse_variables(text) {
        let Some(kind) = token.kind else { continue };
        if skip(token.span.start) {
            continue;
        }
        out.push_str(&text[last..token.span.start]);
        out.push_str(&render_variable(kind, explicit_format(&token), ctx));
        last = token.span.end;
    }
    out.push_str(&text[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 15, 9, 30, 5)
            .unwrap()
    }

    #[test]
    fn parses_name_and_format_spans() {
        let text = "x {{Date:YYYY}} {{foo}}";
        let vars = parse_variables(text);
        assert_eq!(vars.len(), 2);
        assert_eq!(vars[0].kind, Some(VariableKind::Date));
        assert_eq!(vars[0].name_span.text(text), "Date");
        assert_eq!(vars[0].format_span.unwrap().text(text), "YYYY");
        assert_eq!(vars[0].span.text(text), "{{Date:YYYY}}");
        assert_eq!(vars[1].kind, None);
    }

    #[test]
    fn substitutes_known_variables() {
        let settings = DateTimeSettings::default();
        let ctx = VariableContext::new(now(), &settings).with_counter(Some(7));
        assert_eq!(
            substitute_variables("{{date}} {{YEAR}}-{{month}}-{{day}} #{{counter}}", &ctx),
            "2024-01-15 2024-01-15 #7"
        );
        assert_eq!(substitute_variables("{{timestamp}}", &ctx), "20240115093005");
        assert_eq!(substitute_variables("{{date:MMM D}}", &ctx), "Jan 15");
    }

    #[test]
    fn unknown_variables_are_left_verbatim() {
        let settings = DateTimeSettings::default();
        let ctx = VariableContext::new(now(), &settings);
        assert_eq!(
            substitute_variables("{{title}} {{foo:bar}} {{date}}", &ctx),
            "{{title}} {{foo:bar}} 2024-01-15"
        );
    }

    #[test]
    fn counter_without_value_is_placeholder() {
        let settings = DateTimeSettings::default();
        let ctx = VariableContext::new(now(), &settings);
        assert_eq!(substitute_variables("Note {{counter}}", &ctx), "Note #");
    }

    #[test]
    fn time_default_depends_on_target() {
        let settings = DateTimeSettings::default();
        let ctx = VariableContext::new(now(), &settings);
        assert_eq!(substitute_variables("{{time}}", &ctx), "09-30");
        let ctx = ctx.with_target(RenderTarget::Content);
        assert_eq!(substitute_variables("{{time}}", &ctx), "09:30");
        assert_eq!(substitute_variables("{{datetime}}", &ctx), "2024-01-15 09:30");
    }

    #[test]
    fn format_ignored_for_non_date_variables() {
        let settings = DateTimeSettings::default();
        let ctx = VariableContext::new(now(), &settings).with_counter(Some(3));
        assert_eq!(substitute_variables("{{counter:YYYY}}", &ctx), "3");
    }

    #[test]
    fn skip_predicate_keeps_tokens() {
        let settings = DateTimeSettings::default();
        let ctx = VariableContext::new(now(), &settings);
        let text = "{{year}} {{year}}";
        assert_eq!(substitute_variables_where(text, &ctx, |pos| pos > 0), "2024 {{year}}");
    }

    #[test]
    fn counts_counters() {
        assert_eq!(count_counters("{{counter}} {{Counter}}"), 2);
        assert!(has_counter("a {{COUNTER}}"));
        assert!(!has_counter("a {{count}}"));
        assert!(has_dynamic_variables("{{date}} {{counter}}"));
        assert!(!has_dynamic_variables("{{counter}} {{unknown}}"));
    }

    #[test]
    fn variable_regex_for_date_uses_settings() {
        let settings = DateTimeSettings::default();
        let token = &parse_variables("{{date}}")[0];
        assert_eq!(variable_regex(token, &settings), r"\d{4}\-\d{2}\-\d{2}");
        let token = &parse_variables("{{time}}")[0];
        assert_eq!(variable_regex(token, &settings), r"\d{2}\-\d{2}");
    }
}
