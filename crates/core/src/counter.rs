//! Infers the next `{{counter}}` value from files already in a folder.
//!
//! A title pattern is turned into a regex with one capture group for the
//! counter digits. Static text next to the counter is matched exactly;
//! dynamic text (other variables, prompts) is matched loosely unless both
//! sides are dynamic, in which case every placeholder gets its own fragment.

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::config::DateTimeSettings;
use crate::error::StorageError;
use crate::prompt::find_prompt_occurrences;
use crate::sanitize::sanitize_fragment;
use crate::span::Span;
use crate::storage::{EntryKind, Vault};
use crate::template::TitleTemplate;
use crate::variables::{
    count_counters, has_dynamic_variables, parse_variables, variable_regex, VariableKind,
};

/// Which structural case produced a [`CounterMatchPattern`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterStrategy {
    /// `^prefix(\d+)suffix$`
    StaticBothSides,
    /// `^prefix(\d+).*$`
    StaticPrefix,
    /// `^.*?(\d+)suffix$`
    StaticSuffix,
    /// Every placeholder replaced by its own regex fragment.
    FullPrecision,
}

#[derive(Debug, Clone)]
pub struct CounterMatchPattern {
    regex: Regex,
    strategy: CounterStrategy,
}

impl CounterMatchPattern {
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn strategy(&self) -> CounterStrategy {
        self.strategy
    }
}

const EDGE_CHARS: &[char] = &['.', ' '];

fn is_dynamic(text: &str) -> bool {
    has_dynamic_variables(text)
        || count_counters(text) > 0
        || !find_prompt_occurrences(text).is_empty()
}

/// Build the matching regex for a title pattern. `None` when the pattern has
/// no `{{counter}}`. Only the first counter is captured.
pub fn build_matching_pattern(
    pattern: &str,
    settings: Option<&DateTimeSettings>,
) -> Option<CounterMatchPattern> {
    let counter = parse_variables(pattern)
        .into_iter()
        .find(|v| v.kind == Some(VariableKind::Counter))?;
    let before = &pattern[..counter.span.start];
    let after = &pattern[counter.span.end..];

    let (source, strategy) = match (is_dynamic(before), is_dynamic(after)) {
        (false, false) => (
            format!(
                r"^{}(\d+){}$",
                regex::escape(sanitize_fragment(before).trim_start_matches(EDGE_CHARS)),
                regex::escape(sanitize_fragment(after).trim_end_matches(EDGE_CHARS)),
            ),
            CounterStrategy::StaticBothSides,
        ),
        (false, true) => (
            format!(
                r"^{}(\d+).*$",
                regex::escape(sanitize_fragment(before).trim_start_matches(EDGE_CHARS))
            ),
            CounterStrategy::StaticPrefix,
        ),
        (true, false) => (
            format!(
                r"^.*?(\d+){}$",
                regex::escape(sanitize_fragment(after).trim_end_matches(EDGE_CHARS))
            ),
            CounterStrategy::StaticSuffix,
        ),
        (true, true) => {
            let settings = settings.cloned().unwrap_or_default();
            (
                full_precision_source(pattern, counter.span, &settings),
                CounterStrategy::FullPrecision,
            )
        }
    };

    match Regex::new(&source) {
        Ok(regex) => Some(CounterMatchPattern { regex, strategy }),
        Err(e) => {
            tracing::warn!("Could not compile counter pattern {:?}: {}", source, e);
            None
        }
    }
}

fn full_precision_source(pattern: &str, counter: Span, settings: &DateTimeSettings) -> String {
    let mut pieces: Vec<(Span, String)> = Vec::new();
    for token in parse_variables(pattern) {
        let fragment = match token.kind {
            Some(VariableKind::Counter) if token.span == counter => r"(\d+)".to_string(),
            Some(_) => variable_regex(&token, settings),
            None => continue,
        };
        pieces.push((token.span, fragment));
    }
    for occurrence in find_prompt_occurrences(pattern) {
        pieces.push((occurrence.span, ".*?".to_string()));
    }
    pieces.sort_by_key(|(span, _)| span.start);

    let mut literals = Vec::new();
    let mut fragments = Vec::new();
    let mut last = 0;
    for (span, fragment) in pieces {
        if span.start < last {
            continue;
        }
        literals.push(&pattern[last..span.start]);
        fragments.push(fragment);
        last = span.end;
    }
    literals.push(&pattern[last..]);

    let count = literals.len();
    let mut source = String::from("^");
    for (i, literal) in literals.into_iter().enumerate() {
        let mut literal = sanitize_fragment(literal);
        if i == 0 {
            literal = literal.trim_start_matches(EDGE_CHARS).to_string();
        }
        if i + 1 == count {
            literal = literal.trim_end_matches(EDGE_CHARS).to_string();
        }
        source.push_str(&regex::escape(&literal));
        if let Some(fragment) = fragments.get(i) {
            source.push_str(fragment);
        }
    }
    source.push('$');
    source
}

/// Counter value in `filename` (a file stem), if it matches.
pub fn extract_counter_from_filename(filename: &str, pattern: &CounterMatchPattern) -> Option<u64> {
    pattern
        .regex
        .captures(filename)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

/// Highest counter among direct children of `folder` plus one, or `start`
/// when nothing matches. A missing folder counts as empty.
pub fn next_counter_in_folder(
    vault: &dyn Vault,
    folder: &str,
    pattern: &str,
    start: u64,
    settings: &DateTimeSettings,
) -> Result<u64, StorageError> {
    let Some(matcher) = build_matching_pattern(pattern, Some(settings)) else {
        return Ok(start);
    };
    match vault.kind(folder)? {
        None => {
            tracing::debug!("Folder {:?} does not exist yet; counter starts at {}", folder, start);
            return Ok(start);
        }
        Some(EntryKind::File) => return Err(StorageError::NotAFolder(folder.to_string())),
        Some(EntryKind::Folder) => {}
    }
    let max = vault
        .list(folder)?
        .iter()
        .filter(|e| e.is_file())
        .filter_map(|e| {
            let stem: String = e.stem().nfc().collect();
            extract_counter_from_filename(&stem, &matcher)
        })
        .max();
    tracing::debug!(
        "Counter scan of {:?} with {} ({:?}): max {:?}",
        folder,
        matcher.as_str(),
        matcher.strategy(),
        max
    );
    Ok(max.map_or(start, |m| m.saturating_add(1)))
}

/// Next counter value for a template, scanning the template's folder.
pub fn get_next_counter_value(
    vault: &dyn Vault,
    template: &TitleTemplate,
    settings: &DateTimeSettings,
) -> Result<u64, StorageError> {
    next_counter_in_folder(
        vault,
        &template.folder,
        &template.title_pattern,
        template.counter_start,
        settings,
    )
}
