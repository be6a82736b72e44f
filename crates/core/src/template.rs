//! Persisted title templates and prompt configuration.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::TemplateError;
use crate::presets::ValueType;
use crate::prompt::{
    find_prompt_occurrences, find_prompt_occurrences_in_content, merge_descriptors, ListConfig,
    OutputFormat, PromptDescriptor, PromptOccurrence,
};
use crate::variables::count_counters;

/// A saved way of naming new notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleTemplate {
    pub name: String,
    pub title_pattern: String,
    /// Vault folder new notes go into; empty for the vault root.
    #[serde(default)]
    pub folder: String,
    /// Vault path of a note whose content seeds new notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_template: Option<String>,
    #[serde(default = "default_counter_start")]
    pub counter_start: u64,
    /// Prompt settings saved from earlier edits, keyed by name.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prompts: Vec<UserPrompt>,
}

fn default_counter_start() -> u64 {
    1
}

impl TitleTemplate {
    pub fn new(name: impl Into<String>, title_pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title_pattern: title_pattern.into(),
            folder: String::new(),
            file_template: None,
            counter_start: default_counter_start(),
            prompts: Vec::new(),
        }
    }

    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into();
        self
    }

    pub fn with_file_template(mut self, path: impl Into<String>) -> Self {
        self.file_template = Some(path.into());
        self
    }

    pub fn with_counter_start(mut self, start: u64) -> Self {
        self.counter_start = start;
        self
    }

    pub fn with_prompts(mut self, prompts: Vec<UserPrompt>) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn validate(&self) -> Result<(), TemplateError> {
        validate_title_pattern(&self.title_pattern)
    }

    /// Prompts to ask for when creating a note: title prompts, then prompts
    /// from `content`, with saved settings applied.
    pub fn effective_prompts(&self, content: &str) -> Vec<PromptDescriptor> {
        let occurrences = find_prompt_occurrences(&self.title_pattern)
            .into_iter()
            .chain(find_prompt_occurrences_in_content(content))
            .collect();
        sync_occurrences(occurrences, &self.prompts)
            .iter()
            .map(PromptDescriptor::from)
            .collect()
    }
}

/// Saved configuration of one prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPrompt {
    pub name: String,
    #[serde(default)]
    pub value_type: ValueType,
    #[serde(default)]
    pub is_optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<OutputFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_format: Option<OutputFormat>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl From<&PromptDescriptor> for UserPrompt {
    fn from(d: &PromptDescriptor) -> Self {
        Self {
            name: d.name.clone(),
            value_type: d.value_type,
            is_optional: d.is_optional,
            date_format: d.date_config.clone(),
            time_format: d.time_config.clone(),
            options: d.options().to_vec(),
        }
    }
}

impl From<&UserPrompt> for PromptDescriptor {
    fn from(p: &UserPrompt) -> Self {
        let ty = p.value_type;
        let mut d = PromptDescriptor::new(p.name.clone(), ty).optional(p.is_optional);
        if ty.has_date() {
            if let Some(f) = &p.date_format {
                d = d.with_date_format(f.clone());
            }
        }
        if ty.has_time() {
            if let Some(f) = &p.time_format {
                d = d.with_time_format(f.clone());
            }
        }
        if ty.is_list() {
            d.list_config = Some(ListConfig {
                options: p.options.clone(),
            });
        }
        d
    }
}

/// Reject empty patterns and patterns with more than one `{{counter}}`.
pub fn validate_title_pattern(pattern: &str) -> Result<(), TemplateError> {
    if pattern.trim().is_empty() {
        return Err(TemplateError::EmptyPattern);
    }
    let count = count_counters(pattern);
    if count > 1 {
        return Err(TemplateError::MultipleCounters { count });
    }
    Ok(())
}

/// Distinct prompts of a title pattern followed by those of a file template,
/// skipping fenced code in the content. Title configuration wins.
pub fn collect_template_prompts(title_pattern: &str, content: &str) -> Vec<PromptDescriptor> {
    merge_descriptors(
        crate::prompt::extract_prompts(title_pattern),
        crate::prompt::extract_prompts_in_content(content),
    )
}

/// Reconcile saved prompt settings with the prompts in `pattern`.
///
/// The result follows pattern order and drops saved prompts the pattern no
/// longer mentions. An occurrence that spells out a type keeps its inline
/// configuration; a bare `{% Name %}` takes the saved settings for that name.
/// Optionality always comes from the pattern.
pub fn sync_prompts(pattern: &str, stored: &[UserPrompt]) -> Vec<UserPrompt> {
    sync_occurrences(find_prompt_occurrences(pattern), stored)
}

fn sync_occurrences(occurrences: Vec<PromptOccurrence>, stored: &[UserPrompt]) -> Vec<UserPrompt> {
    let mut seen = HashSet::new();
    let mut synced = Vec::new();
    for occurrence in occurrences {
        let descriptor = &occurrence.descriptor;
        if !seen.insert(descriptor.name.to_lowercase()) {
            continue;
        }
        let saved = stored.iter().find(|p| descriptor.is_named(&p.name));
        let prompt = match saved {
            Some(saved) if !occurrence.syntax.has_explicit_type() => UserPrompt {
                name: descriptor.name.clone(),
                is_optional: descriptor.is_optional,
                ..saved.clone()
            },
            _ => UserPrompt::from(descriptor),
        };
        synced.push(prompt);
    }
    synced
}
