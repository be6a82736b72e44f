//! User prompts: `{% Name %}`, `{%? Name ?%}` and their typed variants.
//!
//! Content grammar, tried in this order on the text between the markers:
//!
//! ```text
//! Name:Type:format(Custom)     custom date/time format, may contain colons
//! Name:Type:Preset             date/time preset or literal format
//! Name:datetime:Date,Time      separate date and time presets
//! Name:list:a,b,c              options for list / multilist
//! Name:Type
//! Name
//! ```
//!
//! A prompt is optional only when *both* markers carry `?`. `{%? x %}` and
//! `{% x ?%}` parse as prompts but are required.

mod parser;
mod rewrite;

pub use parser::{
    find_prompt_occurrences, find_prompt_occurrences_in_content, parse_prompt_parts,
    parse_prompt_syntax, CustomFormatSyntax, FormatSyntax, ItemListSyntax, PromptOccurrence,
    PromptSyntax,
};
pub use rewrite::{rename_prompt_in_text, update_prompt_in_text};

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::DateTimeSettings;
use crate::presets::{PresetKind, ValueType, DEFAULT_PRESET};

/// How a date or time value is rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Canonical preset name from the preset tables.
    Preset(String),
    /// Literal moment-style format string.
    Custom(String),
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Preset(DEFAULT_PRESET.to_string())
    }
}

impl OutputFormat {
    /// Preset if `text` names one in `kind`'s table, otherwise a literal format.
    pub fn from_preset_or_literal(text: &str, kind: PresetKind) -> Self {
        let text = text.trim();
        if text.is_empty() {
            return OutputFormat::default();
        }
        match kind.find(text) {
            Some(preset) => OutputFormat::Preset(preset.name.to_string()),
            None => OutputFormat::Custom(text.to_string()),
        }
    }

    /// Canonical form for `kind`: a literal is trimmed, an empty literal is
    /// the default preset and a literal naming a preset becomes that preset.
    /// Every normalized format survives a trip through prompt syntax.
    pub fn normalized(self, kind: PresetKind) -> Self {
        match self {
            OutputFormat::Custom(text) => OutputFormat::from_preset_or_literal(&text, kind),
            OutputFormat::Preset(name) => match kind.find(&name) {
                Some(preset) => OutputFormat::Preset(preset.name.to_string()),
                None => OutputFormat::Preset(name),
            },
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, OutputFormat::Custom(_))
    }

    pub fn is_default(&self) -> bool {
        matches!(self, OutputFormat::Preset(p) if p == DEFAULT_PRESET)
    }

    /// Concrete format string.
    pub fn resolve<'a>(&'a self, kind: PresetKind, settings: &'a DateTimeSettings) -> &'a str {
        match self {
            OutputFormat::Preset(name) => kind.resolve(name, settings),
            OutputFormat::Custom(format) => format,
        }
    }

    /// Text used for this format in prompt syntax (preset name or literal).
    fn syntax_text(&self) -> &str {
        match self {
            OutputFormat::Preset(name) => name,
            OutputFormat::Custom(format) => format,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListConfig {
    pub options: Vec<String>,
}

/// One resolved prompt. Names are unique case-insensitively within a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptDescriptor {
    pub name: String,
    pub value_type: ValueType,
    pub is_optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_config: Option<OutputFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_config: Option<OutputFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_config: Option<ListConfig>,
}

impl PromptDescriptor {
    /// A descriptor of `value_type` with default configuration.
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            is_optional: false,
            date_config: value_type.has_date().then(OutputFormat::default),
            time_config: value_type.has_time().then(OutputFormat::default),
            list_config: value_type.is_list().then(ListConfig::default),
        }
    }

    pub fn optional(mut self, is_optional: bool) -> Self {
        self.is_optional = is_optional;
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.list_config = Some(ListConfig {
            options: options.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Set the date format, normalized (see [`OutputFormat::normalized`]).
    pub fn with_date_format(mut self, format: OutputFormat) -> Self {
        self.date_config = Some(format.normalized(PresetKind::Date));
        self
    }

    /// Set the time format, normalized (see [`OutputFormat::normalized`]).
    pub fn with_time_format(mut self, format: OutputFormat) -> Self {
        self.time_config = Some(format.normalized(PresetKind::Time));
        self
    }

    pub fn options(&self) -> &[String] {
        self.list_config
            .as_ref()
            .map(|l| l.options.as_slice())
            .unwrap_or(&[])
    }

    /// Case-insensitive name comparison.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.trim().to_lowercase()
    }
}

/// Extract the distinct prompts of a pattern, in order of first appearance.
/// The first occurrence of a name decides its configuration.
pub fn extract_prompts(pattern: &str) -> Vec<PromptDescriptor> {
    dedup_descriptors(find_prompt_occurrences(pattern))
}

/// Like [`extract_prompts`], skipping occurrences inside fenced code blocks.
pub fn extract_prompts_in_content(content: &str) -> Vec<PromptDescriptor> {
    dedup_descriptors(find_prompt_occurrences_in_content(content))
}

/// True if `content` has at least one prompt outside fenced code blocks.
pub fn has_prompts_in_content(content: &str) -> bool {
    !find_prompt_occurrences_in_content(content).is_empty()
}

fn dedup_descriptors(occurrences: Vec<PromptOccurrence>) -> Vec<PromptDescriptor> {
    let mut seen = HashSet::new();
    occurrences
        .into_iter()
        .filter(|o| seen.insert(o.descriptor.name.to_lowercase()))
        .map(|o| o.descriptor)
        .collect()
}

/// Merge descriptor lists, keeping the first descriptor for each name.
pub fn merge_descriptors(
    first: Vec<PromptDescriptor>,
    second: Vec<PromptDescriptor>,
) -> Vec<PromptDescriptor> {
    let mut seen = HashSet::new();
    first
        .into_iter()
        .chain(second)
        .filter(|d| seen.insert(d.name.to_lowercase()))
        .collect()
}

fn single_format_body(format: Option<&OutputFormat>) -> Option<String> {
    match format {
        None => None,
        Some(f) if f.is_default() => None,
        Some(OutputFormat::Preset(name)) => Some(name.clone()),
        Some(OutputFormat::Custom(custom)) => Some(format!("format({})", custom)),
    }
}

fn datetime_format_body(date: Option<&OutputFormat>, time: Option<&OutputFormat>) -> Option<String> {
    let default = OutputFormat::default();
    let date = date.unwrap_or(&default);
    let time = time.unwrap_or(&default);
    if date.is_default() && time.is_default() {
        return None;
    }
    if date == time {
        return single_format_body(Some(date));
    }
    Some(format!("{},{}", date.syntax_text(), time.syntax_text()))
}

/// Inner text of a prompt, e.g. `Due:date:ISO`.
pub fn create_prompt_body(descriptor: &PromptDescriptor) -> String {
    let name = descriptor.name.trim();
    let ty = descriptor.value_type;
    let format = match ty {
        ValueType::Text => return name.to_string(),
        ValueType::Numeric => None,
        ValueType::Date => single_format_body(descriptor.date_config.as_ref()),
        ValueType::Time => single_format_body(descriptor.time_config.as_ref()),
        ValueType::DateTime => datetime_format_body(
            descriptor.date_config.as_ref(),
            descriptor.time_config.as_ref(),
        ),
        ValueType::List | ValueType::MultiList => {
            let options = descriptor.options();
            (!options.is_empty()).then(|| options.join(","))
        }
    };
    match format {
        Some(format) => format!("{}:{}:{}", name, ty.keyword(), format),
        None => format!("{}:{}", name, ty.keyword()),
    }
}

/// Full prompt syntax for a descriptor, e.g. `{%? Due:date:ISO ?%}`.
pub fn create_full_prompt_syntax(descriptor: &PromptDescriptor) -> String {
    let body = create_prompt_body(descriptor);
    if descriptor.is_optional {
        format!("{{%? {} ?%}}", body)
    } else {
        format!("{{% {} %}}", body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn extract_dedups_case_insensitively_first_wins() {
        let prompts = extract_prompts("{% Title:number %} {% title %} {% Other %}");
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[0].name, "Title");
        assert_eq!(prompts[0].value_type, ValueType::Numeric);
        assert_eq!(prompts[1].name, "Other");
    }

    #[test]
    fn optional_requires_both_markers() {
        let optional = extract_prompts("{%? Subtitle ?%}");
        assert!(optional[0].is_optional);
        let left_only = extract_prompts("{%? Subtitle %}");
        assert_eq!(left_only[0].name, "Subtitle");
        assert!(!left_only[0].is_optional);
        let right_only = extract_prompts("{% Subtitle ?%}");
        assert_eq!(right_only[0].name, "Subtitle");
        assert!(!right_only[0].is_optional);
    }

    #[test]
    fn content_extraction_skips_code_blocks() {
        let content = "{% Real %}\n```\n{% Example %}\n```\n";
        let prompts = extract_prompts_in_content(content);
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].name, "Real");
        assert!(!has_prompts_in_content("```\n{% Only %}\n```"));
        assert!(has_prompts_in_content("x {% A %}"));
    }

    #[test]
    fn create_syntax_forms() {
        let text = PromptDescriptor::new("Title", ValueType::Text);
        assert_eq!(create_full_prompt_syntax(&text), "{% Title %}");
        let opt = PromptDescriptor::new("Sub", ValueType::Text).optional(true);
        assert_eq!(create_full_prompt_syntax(&opt), "{%? Sub ?%}");
        let date = PromptDescriptor::new("Due", ValueType::Date)
            .with_date_format(OutputFormat::Custom("MMM DD, YYYY".into()));
        assert_eq!(create_full_prompt_syntax(&date), "{% Due:date:format(MMM DD, YYYY) %}");
        let dt = PromptDescriptor::new("When", ValueType::DateTime)
            .with_date_format(OutputFormat::Preset("ISO".into()))
            .with_time_format(OutputFormat::Preset("12-hour".into()));
        assert_eq!(create_full_prompt_syntax(&dt), "{% When:datetime:ISO,12-hour %}");
        let list = PromptDescriptor::new("Tags", ValueType::MultiList).with_options(["a", "b"]);
        assert_eq!(create_full_prompt_syntax(&list), "{% Tags:multilist:a,b %}");
        let num = PromptDescriptor::new("N", ValueType::Numeric);
        assert_eq!(create_full_prompt_syntax(&num), "{% N:numeric %}");
    }

    #[test]
    fn round_trip_examples() {
        let descriptors = vec![
            PromptDescriptor::new("Title", ValueType::Text),
            PromptDescriptor::new("Count", ValueType::Numeric).optional(true),
            PromptDescriptor::new("Due", ValueType::Date),
            PromptDescriptor::new("Due", ValueType::Date)
                .with_date_format(OutputFormat::Preset("US".into())),
            PromptDescriptor::new("At", ValueType::Time)
                .with_time_format(OutputFormat::Custom("HH:mm:ss".into())),
            PromptDescriptor::new("When", ValueType::DateTime)
                .with_date_format(OutputFormat::Preset("US".into()))
                .with_time_format(OutputFormat::Preset("US".into())),
            PromptDescriptor::new("When", ValueType::DateTime)
                .with_date_format(OutputFormat::Preset("EU".into())),
            PromptDescriptor::new("When", ValueType::DateTime)
                .with_date_format(OutputFormat::Custom("YYYY".into()))
                .with_time_format(OutputFormat::Custom("YYYY".into())),
            PromptDescriptor::new("When", ValueType::DateTime)
                .with_date_format(OutputFormat::Custom("YYYY ".into()))
                .with_time_format(OutputFormat::Preset("ISO".into())),
            PromptDescriptor::new("When", ValueType::DateTime)
                .with_date_format(OutputFormat::Custom(String::new()))
                .with_time_format(OutputFormat::Preset("ISO".into())),
            PromptDescriptor::new("When", ValueType::DateTime)
                .with_date_format(OutputFormat::Custom("iso".into()))
                .with_time_format(OutputFormat::Custom("hh A".into())),
            PromptDescriptor::new("Status", ValueType::List).with_options(["Open", "Done"]),
            PromptDescriptor::new("Empty", ValueType::List),
        ];
        for d in descriptors {
            let syntax = create_full_prompt_syntax(&d);
            assert_eq!(extract_prompts(&syntax), vec![d.clone()], "via {}", syntax);
        }
    }

    fn arb_output_format(kind: PresetKind) -> impl Strategy<Value = OutputFormat> {
        let presets: Vec<String> = kind.presets().iter().map(|p| p.name.to_string()).collect();
        prop_oneof![
            proptest::sample::select(presets).prop_map(OutputFormat::Preset),
            "[YMDHhmsA /.-]{1,12}".prop_map(OutputFormat::Custom),
        ]
    }

    fn arb_descriptor() -> impl Strategy<Value = PromptDescriptor> {
        let name = "[A-Za-z][A-Za-z0-9 _-]{0,10}[A-Za-z0-9]";
        (
            name,
            proptest::sample::select(ValueType::ALL.to_vec()),
            any::<bool>(),
            arb_output_format(PresetKind::Date),
            arb_output_format(PresetKind::Time),
            proptest::collection::vec("[A-Za-z0-9][A-Za-z0-9 ]{0,6}[A-Za-z0-9]", 0..4),
        )
            .prop_map(|(name, ty, optional, date, time, options)| {
                let d = PromptDescriptor::new(name, ty).optional(optional);
                match ty {
                    ValueType::Date => d.with_date_format(date),
                    ValueType::Time => d.with_time_format(time),
                    ValueType::DateTime => d.with_date_format(date).with_time_format(time),
                    ValueType::List | ValueType::MultiList => d.with_options(options),
                    ValueType::Text | ValueType::Numeric => d,
                }
            })
    }

    proptest! {
        #[test]
        fn descriptor_survives_syntax_round_trip(d in arb_descriptor()) {
            let syntax = create_full_prompt_syntax(&d);
            prop_assert_eq!(extract_prompts(&syntax), vec![d]);
        }
    }
}
