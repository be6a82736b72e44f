//! In-place rewriting of prompt syntax inside arbitrary text.
//!
//! Only the matched occurrences change; everything else (including prompts
//! inside fenced code blocks) is copied through byte for byte.

use super::parser::{find_prompt_occurrences_in_content, PromptOccurrence};
use super::{create_full_prompt_syntax, PromptDescriptor};

fn rewrite_matching(
    text: &str,
    name: &str,
    mut replace: impl FnMut(&PromptOccurrence, &mut String),
) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for occurrence in find_prompt_occurrences_in_content(text) {
        if !occurrence.descriptor.is_named(name) {
            continue;
        }
        out.push_str(&text[last..occurrence.span.start]);
        replace(&occurrence, &mut out);
        last = occurrence.span.end;
    }
    out.push_str(&text[last..]);
    out
}

/// Replace every occurrence of prompt `name` with the syntax for `descriptor`.
pub fn update_prompt_in_text(text: &str, name: &str, descriptor: &PromptDescriptor) -> String {
    let syntax = create_full_prompt_syntax(descriptor);
    rewrite_matching(text, name, |_, out| out.push_str(&syntax))
}

/// Rename prompt `old` to `new`, keeping markers, spacing and configuration.
pub fn rename_prompt_in_text(text: &str, old: &str, new: &str) -> String {
    rewrite_matching(text, old, |occurrence, out| {
        let name = occurrence.syntax.name.span;
        out.push_str(&text[occurrence.span.start..name.start]);
        out.push_str(new.trim());
        out.push_str(&text[name.end..occurrence.span.end]);
    })
}
