//! Flat, kinded byte ranges for painting template syntax.

use serde::Serialize;

use crate::codeblock::CodeBlockIndex;
use crate::format::{parse_format_string, FormatPart, FormatPartKind};
use crate::presets::ValueType;
use crate::prompt::{find_prompt_occurrences_in_content, FormatSyntax, PromptOccurrence};
use crate::span::Span;
use crate::variables::parse_variables;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HighlightKind {
    /// `{%`, `{%?`, `%}`, `?%}`
    PromptMarker,
    PromptName,
    /// Colons separating name, type and format.
    Separator,
    PromptType,
    /// Preset name in a date/time format segment.
    Preset,
    ListOption,
    /// Commas between presets or list options.
    Comma,
    /// `format` keyword and its parentheses.
    FormatKeyword,
    FormatToken,
    FormatLiteral,
    /// `{{` and `}}`
    VariableBrace,
    VariableName,
    /// `{{name}}` that is not a built-in variable.
    UnknownVariable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Highlight {
    pub kind: HighlightKind,
    pub span: Span,
}

impl Highlight {
    fn new(kind: HighlightKind, span: Span) -> Self {
        Self { kind, span }
    }
}

fn push_format_parts(out: &mut Vec<Highlight>, parts: &[FormatPart], offset: usize) {
    for part in parts {
        let kind = match part.kind {
            FormatPartKind::Token => HighlightKind::FormatToken,
            FormatPartKind::Literal => HighlightKind::FormatLiteral,
        };
        out.push(Highlight::new(kind, part.span.offset(offset)));
    }
}

fn push_prompt(out: &mut Vec<Highlight>, occurrence: &PromptOccurrence) {
    let syntax = &occurrence.syntax;
    out.push(Highlight::new(HighlightKind::PromptMarker, occurrence.open_marker));
    if !syntax.name.span.is_empty() {
        out.push(Highlight::new(HighlightKind::PromptName, syntax.name.span));
    }
    if let Some(colon) = syntax.type_colon {
        out.push(Highlight::new(HighlightKind::Separator, colon));
    }
    if let Some(ty) = syntax.type_name.as_ref().filter(|t| !t.span.is_empty()) {
        out.push(Highlight::new(HighlightKind::PromptType, ty.span));
    }
    if let Some(colon) = syntax.format_colon {
        out.push(Highlight::new(HighlightKind::Separator, colon));
    }
    match &syntax.format {
        Some(FormatSyntax::Custom(custom)) => {
            out.push(Highlight::new(HighlightKind::FormatKeyword, custom.keyword));
            out.push(Highlight::new(HighlightKind::FormatKeyword, custom.open_paren));
            push_format_parts(out, &custom.parts, 0);
            if let Some(close) = custom.close_paren {
                out.push(Highlight::new(HighlightKind::FormatKeyword, close));
            }
        }
        Some(FormatSyntax::Items(list)) => {
            let item_kind = if syntax.value_type.is_list() {
                HighlightKind::ListOption
            } else if syntax.value_type == ValueType::Text || syntax.value_type == ValueType::Numeric {
                HighlightKind::FormatLiteral
            } else {
                HighlightKind::Preset
            };
            for item in &list.items {
                out.push(Highlight::new(item_kind, item.span));
            }
            for comma in &list.commas {
                out.push(Highlight::new(HighlightKind::Comma, *comma));
            }
        }
        None => {}
    }
    out.push(Highlight::new(HighlightKind::PromptMarker, occurrence.close_marker));
}

/// Highlights for every prompt and variable outside fenced code, ordered by
/// start offset.
pub fn highlight(text: &str) -> Vec<Highlight> {
    let mut out = Vec::new();
    for occurrence in find_prompt_occurrences_in_content(text) {
        push_prompt(&mut out, &occurrence);
    }

    let fenced = CodeBlockIndex::new(text);
    for token in parse_variables(text) {
        if fenced.contains(token.span.start) {
            continue;
        }
        let open = Span::new(token.span.start, token.span.start + 2);
        let close = Span::new(token.span.end - 2, token.span.end);
        out.push(Highlight::new(HighlightKind::VariableBrace, open));
        let name_kind = if token.kind.is_some() {
            HighlightKind::VariableName
        } else {
            HighlightKind::UnknownVariable
        };
        out.push(Highlight::new(name_kind, token.name_span));
        if let Some(format_span) = token.format_span {
            out.push(Highlight::new(
                HighlightKind::Separator,
                Span::new(format_span.start - 1, format_span.start),
            ));
            let accepts_format = token.kind.is_some_and(|k| k.accepts_format());
            if accepts_format {
                let parts = parse_format_string(format_span.text(text));
                push_format_parts(&mut out, &parts, format_span.start);
            } else if !format_span.is_empty() {
                out.push(Highlight::new(HighlightKind::FormatLiteral, format_span));
            }
        }
        out.push(Highlight::new(HighlightKind::VariableBrace, close));
    }

    out.sort_by_key(|h| (h.span.start, h.span.end));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn painted(text: &str) -> Vec<(HighlightKind, &str)> {
        highlight(text)
            .into_iter()
            .map(|h| (h.kind, h.span.text(text)))
            .collect()
    }

    #[test]
    fn prompt_parts() {
        use HighlightKind::*;
        assert_eq!(
            painted("{%? Due : date:ISO ?%}"),
            vec![
                (PromptMarker, "{%?"),
                (PromptName, "Due"),
                (Separator, ":"),
                (PromptType, "date"),
                (Separator, ":"),
                (Preset, "ISO"),
                (PromptMarker, "?%}"),
            ]
        );
    }

    #[test]
    fn custom_format_and_list_parts() {
        use HighlightKind::*;
        let text = "{% D:date:format(YYYY [at] HH) %}";
        let kinds: Vec<_> = painted(text);
        assert!(kinds.contains(&(FormatKeyword, "format")));
        assert!(kinds.contains(&(FormatToken, "YYYY")));
        assert!(kinds.contains(&(FormatLiteral, " [at] ")));
        assert!(kinds.contains(&(FormatToken, "HH")));
        assert!(kinds.contains(&(FormatKeyword, ")")));

        let list = painted("{% S:list:a, b %}");
        assert!(list.contains(&(ListOption, "a")));
        assert!(list.contains(&(Comma, ",")));
        assert!(list.contains(&(ListOption, "b")));
    }

    #[test]
    fn variables_with_formats() {
        use HighlightKind::*;
        assert_eq!(
            painted("{{date:YYYY-MM}} {{nope}}"),
            vec![
                (VariableBrace, "{{"),
                (VariableName, "date"),
                (Separator, ":"),
                (FormatToken, "YYYY"),
                (FormatLiteral, "-"),
                (FormatToken, "MM"),
                (VariableBrace, "}}"),
                (VariableBrace, "{{"),
                (UnknownVariable, "nope"),
                (VariableBrace, "}}"),
            ]
        );
    }

    #[test]
    fn fenced_code_is_not_highlighted() {
        let text = "```\n{% A %} {{date}}\n```\n{% B %}";
        let names: Vec<_> = painted(text)
            .into_iter()
            .filter(|(k, _)| *k == HighlightKind::PromptName || *k == HighlightKind::VariableName)
            .map(|(_, s)| s)
            .collect();
        assert_eq!(names, vec!["B"]);
    }

    #[test]
    fn serializes_with_kebab_case_kinds() {
        let json = serde_json::to_value(highlight("{{nope}}")).unwrap();
        assert_eq!(json[1]["kind"], "unknown-variable");
        assert_eq!(json[1]["span"]["start"], 2);
    }

    #[test]
    fn spans_are_ordered() {
        let hl = highlight("{{year}} {% T %} {{month}}");
        assert!(hl.windows(2).all(|w| w[0].span.start <= w[1].span.start));
    }
}
