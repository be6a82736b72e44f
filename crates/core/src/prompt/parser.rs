//! Scanner for `{% ... %}` occurrences and the content sub-grammar.
//!
//! Every sub-part is recorded with its absolute byte span in the scanned text
//! so highlighting and completion can address it directly.

use crate::codeblock::CodeBlockIndex;
use crate::format::{parse_format_string, FormatPart};
use crate::presets::{PresetKind, ValueType};
use crate::span::{trim_span, Span, Spanned};

use super::{ListConfig, OutputFormat, PromptDescriptor};

const CUSTOM_FORMAT_KEYWORD: &str = "format";

/// `format(...)` with its pieces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomFormatSyntax {
    /// The `format` keyword.
    pub keyword: Span,
    pub open_paren: Span,
    /// Text between the parentheses, untrimmed.
    pub value: Spanned<String>,
    /// `None` while the user is still typing.
    pub close_paren: Option<Span>,
    /// Tokens and literals of `value`, with absolute spans.
    pub parts: Vec<FormatPart>,
}

/// Comma-separated presets or list options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemListSyntax {
    /// Trimmed, non-empty items.
    pub items: Vec<Spanned<String>>,
    pub commas: Vec<Span>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatSyntax {
    Custom(CustomFormatSyntax),
    Items(ItemListSyntax),
}

/// Parsed prompt content with absolute spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSyntax {
    pub name: Spanned<String>,
    /// Colon between name and type.
    pub type_colon: Option<Span>,
    /// Type text as written (trimmed); empty while being typed.
    pub type_name: Option<Spanned<String>>,
    /// Colon between type and format.
    pub format_colon: Option<Span>,
    /// Raw (trimmed) span of everything after the format colon.
    pub format_span: Option<Span>,
    pub format: Option<FormatSyntax>,
    pub value_type: ValueType,
}

impl PromptSyntax {
    /// Whether the prompt names its type inline.
    pub fn has_explicit_type(&self) -> bool {
        self.type_name.as_ref().is_some_and(|t| !t.value.is_empty())
    }
}

/// One `{% ... %}` occurrence in a text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptOccurrence {
    /// Whole occurrence, markers included.
    pub span: Span,
    /// `{%` or `{%?`.
    pub open_marker: Span,
    /// `%}` or `?%}`.
    pub close_marker: Span,
    /// Content between markers, whitespace trimmed.
    pub content: Span,
    pub is_optional: bool,
    pub syntax: PromptSyntax,
    pub descriptor: PromptDescriptor,
}

/// Find every prompt occurrence in `text`, in order.
pub fn find_prompt_occurrences(text: &str) -> Vec<PromptOccurrence> {
    let mut out = Vec::new();
    let mut pos = 0;

    while let Some(rel) = text[pos..].find("{%") {
        let open = pos + rel;
        let inner_start = open + 2;
        // Content cannot contain '%', so the first '%' decides the match.
        let Some(pct_rel) = text[inner_start..].find('%') else {
            break;
        };
        let pct = inner_start + pct_rel;
        if text[pct..].starts_with("%}") {
            if let Some(occurrence) = scan_occurrence(text, open, inner_start, pct) {
                out.push(occurrence);
                pos = pct + 2;
                continue;
            }
        }
        pos = open + 1;
    }

    out
}

/// Like [`find_prompt_occurrences`], dropping occurrences that start inside a
/// fenced code block.
pub fn find_prompt_occurrences_in_content(text: &str) -> Vec<PromptOccurrence> {
    let index = CodeBlockIndex::new(text);
    let mut occurrences = find_prompt_occurrences(text);
    if !index.is_empty() {
        occurrences.retain(|o| !index.contains(o.span.start));
    }
    occurrences
}

fn scan_occurrence(text: &str, open: usize, inner_start: usize, pct: usize) -> Option<PromptOccurrence> {
    let opt_open = text[inner_start..pct].starts_with('?');
    let after_open = inner_start + usize::from(opt_open);
    let opt_close = pct > after_open && text[after_open..pct].ends_with('?');
    let before_close = pct - usize::from(opt_close);

    let content = trim_span(text, after_open, before_close);
    if content.is_empty() {
        return None;
    }

    let syntax = parse_prompt_parts(text, content);
    if syntax.name.value.is_empty() {
        return None;
    }

    let is_optional = opt_open && opt_close;
    let descriptor = build_descriptor(&syntax, is_optional);
    Some(PromptOccurrence {
        span: Span::new(open, pct + 2),
        open_marker: Span::new(open, after_open),
        close_marker: Span::new(before_close, pct + 2),
        content,
        is_optional,
        syntax,
        descriptor,
    })
}

/// Parse the fields of a prompt from its raw content (the text between the
/// markers, e.g. `Date:date:format(MMM DD, YYYY)`).
pub fn parse_prompt_syntax(raw_content: &str, is_optional: bool) -> PromptDescriptor {
    let content = trim_span(raw_content, 0, raw_content.len());
    let syntax = parse_prompt_parts(raw_content, content);
    build_descriptor(&syntax, is_optional)
}

/// Parse the content sub-grammar of `source[content]`. Spans in the result
/// are absolute offsets into `source`. Never fails: partial input yields
/// partial structure.
pub fn parse_prompt_parts(source: &str, content: Span) -> PromptSyntax {
    let body = content.text(source);

    let Some(name_colon_rel) = body.find(':') else {
        let name = trim_span(source, content.start, content.end);
        return PromptSyntax {
            name: Spanned::new(name.text(source).to_string(), name),
            type_colon: None,
            type_name: None,
            format_colon: None,
            format_span: None,
            format: None,
            value_type: ValueType::Text,
        };
    };

    let name_colon = content.start + name_colon_rel;
    let name = trim_span(source, content.start, name_colon);
    let type_start = name_colon + 1;
    let format_colon = source[type_start..content.end]
        .find(':')
        .map(|rel| type_start + rel);
    let type_end = format_colon.unwrap_or(content.end);
    let type_span = trim_span(source, type_start, type_end);
    let type_text = type_span.text(source);
    let value_type = ValueType::from_alias(type_text).unwrap_or_default();

    let (format_span, format) = match format_colon {
        Some(colon) => {
            let span = trim_span(source, colon + 1, content.end);
            (Some(span), Some(parse_format_segment(source, span, value_type)))
        }
        None => (None, None),
    };

    PromptSyntax {
        name: Spanned::new(name.text(source).to_string(), name),
        type_colon: Some(Span::new(name_colon, name_colon + 1)),
        type_name: Some(Spanned::new(type_text.to_string(), type_span)),
        format_colon: format_colon.map(|c| Span::new(c, c + 1)),
        format_span,
        format,
        value_type,
    }
}

fn starts_with_custom_keyword(text: &str) -> bool {
    let len = CUSTOM_FORMAT_KEYWORD.len();
    text.get(..len)
        .is_some_and(|k| k.eq_ignore_ascii_case(CUSTOM_FORMAT_KEYWORD))
        && text[len..].starts_with('(')
}

fn parse_format_segment(source: &str, span: Span, value_type: ValueType) -> FormatSyntax {
    let text = span.text(source);

    if starts_with_custom_keyword(text) {
        let keyword = Span::new(span.start, span.start + CUSTOM_FORMAT_KEYWORD.len());
        let open_paren = Span::new(keyword.end, keyword.end + 1);
        let (value_end, close_paren) = if text.ends_with(')') && span.len() > keyword.len() + 1 {
            (span.end - 1, Some(Span::new(span.end - 1, span.end)))
        } else {
            (span.end, None)
        };
        let value_span = Span::new(open_paren.end, value_end);
        let value = value_span.text(source).to_string();
        let parts = parse_format_string(&value)
            .into_iter()
            .map(|mut part| {
                part.span = part.span.offset(value_span.start);
                part
            })
            .collect();
        return FormatSyntax::Custom(CustomFormatSyntax {
            keyword,
            open_paren,
            value: Spanned::new(value, value_span),
            close_paren,
            parts,
        });
    }

    // A single date or time format may legitimately contain commas.
    let split_on_commas = matches!(
        value_type,
        ValueType::DateTime | ValueType::List | ValueType::MultiList
    );
    if !split_on_commas {
        let items = if span.is_empty() {
            Vec::new()
        } else {
            vec![Spanned::new(text.to_string(), span)]
        };
        return FormatSyntax::Items(ItemListSyntax {
            items,
            commas: Vec::new(),
        });
    }

    let mut items = Vec::new();
    let mut commas = Vec::new();
    let mut item_start = span.start;
    for (rel, _) in text.match_indices(',') {
        let comma = span.start + rel;
        push_item(source, item_start, comma, &mut items);
        commas.push(Span::new(comma, comma + 1));
        item_start = comma + 1;
    }
    push_item(source, item_start, span.end, &mut items);

    FormatSyntax::Items(ItemListSyntax { items, commas })
}

fn push_item(source: &str, start: usize, end: usize, items: &mut Vec<Spanned<String>>) {
    let span = trim_span(source, start, end);
    if !span.is_empty() {
        items.push(Spanned::new(span.text(source).to_string(), span));
    }
}

fn single_config(format: Option<&FormatSyntax>, kind: PresetKind) -> OutputFormat {
    match format {
        Some(FormatSyntax::Custom(custom)) => {
            OutputFormat::Custom(custom.value.value.clone()).normalized(kind)
        }
        Some(FormatSyntax::Items(list)) => list
            .items
            .first()
            .map(|item| OutputFormat::from_preset_or_literal(&item.value, kind))
            .unwrap_or_default(),
        None => OutputFormat::default(),
    }
}

fn datetime_config(format: Option<&FormatSyntax>) -> (OutputFormat, OutputFormat) {
    match format {
        Some(FormatSyntax::Custom(custom)) => {
            let f = OutputFormat::Custom(custom.value.value.clone());
            (f.clone().normalized(PresetKind::Date), f.normalized(PresetKind::Time))
        }
        Some(FormatSyntax::Items(list)) => match list.items.as_slice() {
            [] => Default::default(),
            [single] => {
                let preset = PresetKind::Date
                    .find(&single.value)
                    .or_else(|| PresetKind::Time.find(&single.value));
                let f = match preset {
                    Some(p) => OutputFormat::Preset(p.name.to_string()),
                    None => OutputFormat::Custom(single.value.clone()),
                };
                (f.clone(), f)
            }
            [date, time, ..] => (
                OutputFormat::from_preset_or_literal(&date.value, PresetKind::Date),
                OutputFormat::from_preset_or_literal(&time.value, PresetKind::Time),
            ),
        },
        None => Default::default(),
    }
}

fn build_descriptor(syntax: &PromptSyntax, is_optional: bool) -> PromptDescriptor {
    let value_type = syntax.value_type;
    let format = syntax.format.as_ref();
    let mut descriptor = PromptDescriptor {
        name: syntax.name.value.clone(),
        value_type,
        is_optional,
        date_config: None,
        time_config: None,
        list_config: None,
    };

    match value_type {
        ValueType::Text | ValueType::Numeric => {}
        ValueType::Date => descriptor.date_config = Some(single_config(format, PresetKind::Date)),
        ValueType::Time => descriptor.time_config = Some(single_config(format, PresetKind::Time)),
        ValueType::DateTime => {
            let (date, time) = datetime_config(format);
            descriptor.date_config = Some(date);
            descriptor.time_config = Some(time);
        }
        ValueType::List | ValueType::MultiList => {
            let options = match format {
                Some(FormatSyntax::Items(list)) => {
                    list.items.iter().map(|i| i.value.clone()).collect()
                }
                // `format(...)` does not attach to list types.
                _ => Vec::new(),
            };
            descriptor.list_config = Some(ListConfig { options });
        }
    }

    descriptor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatPartKind;
    use pretty_assertions::assert_eq;

    fn only(text: &str) -> PromptOccurrence {
        let mut all = find_prompt_occurrences(text);
        assert_eq!(all.len(), 1, "expected one prompt in {:?}", text);
        all.remove(0)
    }

    #[test]
    fn custom_format_example() {
        let d = parse_prompt_syntax("Date:date:format(MMM DD, YYYY)", false);
        assert_eq!(d.name, "Date");
        assert_eq!(d.value_type, ValueType::Date);
        assert_eq!(d.date_config, Some(OutputFormat::Custom("MMM DD, YYYY".into())));
        assert!(d.date_config.as_ref().unwrap().is_custom());
    }

    #[test]
    fn custom_formats_are_normalized() {
        let d = parse_prompt_syntax("D:date:format( YYYY )", false);
        assert_eq!(d.date_config, Some(OutputFormat::Custom("YYYY".into())));
        let d = parse_prompt_syntax("D:date:format()", false);
        assert_eq!(d.date_config, Some(OutputFormat::default()));
        let d = parse_prompt_syntax("W:datetime:format(iso)", false);
        assert_eq!(d.date_config, Some(OutputFormat::Preset("ISO".into())));
        assert_eq!(d.time_config, Some(OutputFormat::Preset("ISO".into())));
    }

    #[test]
    fn custom_format_may_contain_colons() {
        let d = parse_prompt_syntax("At:time:format(HH:mm:ss)", false);
        assert_eq!(d.time_config, Some(OutputFormat::Custom("HH:mm:ss".into())));
    }

    #[test]
    fn preset_and_literal_formats() {
        let d = parse_prompt_syntax("D:date:iso", false);
        assert_eq!(d.date_config, Some(OutputFormat::Preset("ISO".into())));
        let d = parse_prompt_syntax("D:date:DD/MM, YYYY", false);
        assert_eq!(d.date_config, Some(OutputFormat::Custom("DD/MM, YYYY".into())));
        let d = parse_prompt_syntax("T:time:12-hour", false);
        assert_eq!(d.time_config, Some(OutputFormat::Preset("12-hour".into())));
    }

    #[test]
    fn datetime_presets() {
        let d = parse_prompt_syntax("W:datetime:US, 12-hour", false);
        assert_eq!(d.date_config, Some(OutputFormat::Preset("US".into())));
        assert_eq!(d.time_config, Some(OutputFormat::Preset("12-hour".into())));
        let d = parse_prompt_syntax("W:datetime:ISO", false);
        assert_eq!(d.date_config, Some(OutputFormat::Preset("ISO".into())));
        assert_eq!(d.time_config, Some(OutputFormat::Preset("ISO".into())));
        let d = parse_prompt_syntax("W:datetime", false);
        assert!(d.date_config.as_ref().unwrap().is_default());
        assert!(d.time_config.as_ref().unwrap().is_default());
    }

    #[test]
    fn list_options_trimmed_and_non_empty() {
        let d = parse_prompt_syntax("Status:LIST: Open , ,Done,", false);
        assert_eq!(d.value_type, ValueType::List);
        assert_eq!(d.options(), &["Open".to_string(), "Done".to_string()]);
        let d = parse_prompt_syntax("Tags:multilist:Work,Personal", false);
        assert_eq!(d.value_type, ValueType::MultiList);
        assert_eq!(d.options().len(), 2);
    }

    #[test]
    fn unknown_type_falls_back_to_text() {
        let d = parse_prompt_syntax("Thing:colour", false);
        assert_eq!(d.name, "Thing");
        assert_eq!(d.value_type, ValueType::Text);
        assert_eq!(parse_prompt_syntax("Pages:number", false).value_type, ValueType::Numeric);
    }

    #[test]
    fn bare_name_is_text() {
        let d = parse_prompt_syntax("  Title  ", true);
        assert_eq!(d.name, "Title");
        assert_eq!(d.value_type, ValueType::Text);
        assert!(d.is_optional);
    }

    #[test]
    fn marker_and_content_spans() {
        let text = "ab {%?  Sub title ?%} cd";
        let occ = only(text);
        assert_eq!(occ.span.text(text), "{%?  Sub title ?%}");
        assert_eq!(occ.open_marker.text(text), "{%?");
        assert_eq!(occ.close_marker.text(text), "?%}");
        assert_eq!(occ.content.text(text), "Sub title");
        assert_eq!(occ.syntax.name.span.text(text), "Sub title");
        assert!(occ.is_optional);
    }

    #[test]
    fn asymmetric_marker_spans() {
        let text = "{%? A %}";
        let occ = only(text);
        assert_eq!(occ.open_marker.text(text), "{%?");
        assert_eq!(occ.close_marker.text(text), "%}");
        assert!(!occ.is_optional);
    }

    #[test]
    fn sub_part_spans() {
        let text = "x {% Due : date : format(MMM DD) %}";
        let occ = only(text);
        let s = &occ.syntax;
        assert_eq!(s.name.span.text(text), "Due");
        assert_eq!(s.type_colon.unwrap().text(text), ":");
        assert_eq!(s.type_name.as_ref().unwrap().span.text(text), "date");
        assert_eq!(s.format_colon.unwrap().start, text.rfind(" : ").unwrap() + 1);
        let Some(FormatSyntax::Custom(custom)) = &s.format else {
            panic!("expected custom format");
        };
        assert_eq!(custom.keyword.text(text), "format");
        assert_eq!(custom.open_paren.text(text), "(");
        assert_eq!(custom.value.span.text(text), "MMM DD");
        assert_eq!(custom.close_paren.unwrap().text(text), ")");
        let tokens: Vec<&str> = custom
            .parts
            .iter()
            .filter(|p| p.kind == FormatPartKind::Token)
            .map(|p| p.span.text(text))
            .collect();
        assert_eq!(tokens, vec!["MMM", "DD"]);
    }

    #[test]
    fn list_item_and_comma_spans() {
        let text = "{% S:list: a ,bb %}";
        let occ = only(text);
        let Some(FormatSyntax::Items(list)) = &occ.syntax.format else {
            panic!("expected items");
        };
        let items: Vec<&str> = list.items.iter().map(|i| i.span.text(text)).collect();
        assert_eq!(items, vec!["a", "bb"]);
        assert_eq!(list.commas.len(), 1);
        assert_eq!(list.commas[0].text(text), ",");
    }

    #[test]
    fn multibyte_text_spans() {
        let text = "日本 {% Titel:list:ä,ö %} ü";
        let occ = only(text);
        assert_eq!(occ.syntax.name.span.text(text), "Titel");
        assert_eq!(occ.descriptor.options(), &["ä".to_string(), "ö".to_string()]);
    }

    #[test]
    fn partial_syntax_is_not_a_prompt() {
        for text in ["{%", "{% Name", "{% Name:", "{% Name:date:format(", "{% %}", "{%?%}", "{% a % b %}"] {
            assert!(find_prompt_occurrences(text).is_empty(), "{:?}", text);
        }
    }

    #[test]
    fn unclosed_custom_format_parses_partially() {
        let source = "D:date:format(YYYY";
        let syntax = parse_prompt_parts(source, Span::new(0, source.len()));
        let Some(FormatSyntax::Custom(custom)) = syntax.format else {
            panic!("expected custom format");
        };
        assert_eq!(custom.value.value, "YYYY");
        assert!(custom.close_paren.is_none());
    }

    #[test]
    fn recovers_after_false_start() {
        let text = "{%{% Name %}";
        let occ = only(text);
        assert_eq!(occ.span, Span::new(2, text.len()));
    }

    #[test]
    fn multiple_occurrences_in_order() {
        let all = find_prompt_occurrences("{% A %}-{% B:number %}-{%? C ?%}");
        let names: Vec<&str> = all.iter().map(|o| o.descriptor.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn explicit_type_detection() {
        assert!(only("{% A:date %}").syntax.has_explicit_type());
        assert!(!only("{% A %}").syntax.has_explicit_type());
    }
}
