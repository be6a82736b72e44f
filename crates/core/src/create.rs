//! Note creation: from a template and entered prompt values to a new file.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::config::{AppConfig, DateTimeSettings};
use crate::counter::get_next_counter_value;
use crate::error::{CreateError, NotegenError, StorageError};
use crate::prompt::PromptDescriptor;
use crate::sanitize::sanitize_filename;
use crate::storage::{join_path, normalize_path, Vault};
use crate::substitute::{self, render_content, render_title, PromptValues};
use crate::template::{sync_prompts, TitleTemplate};
use crate::validate::validate_prompt_value;
use crate::variables::{has_counter, VariableContext};

/// Title used when a rendered title sanitizes to nothing.
pub const UNTITLED: &str = "Untitled";

#[derive(Debug, Clone)]
pub struct CreateOptions {
    pub note_extension: String,
    pub max_collision_attempts: u32,
}

impl Default for CreateOptions {
    fn default() -> Self {
        let config = AppConfig::default();
        Self {
            note_extension: config.vault.note_extension,
            max_collision_attempts: config.creation.max_collision_attempts,
        }
    }
}

/// What [`FileCreator::create`] produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedFile {
    /// Vault-relative path of the new file.
    pub path: String,
    /// Sanitized title, before any collision suffix.
    pub title: String,
    pub counter: Option<u64>,
    pub content: String,
}

pub struct FileCreator<'a> {
    vault: &'a dyn Vault,
    settings: DateTimeSettings,
    options: CreateOptions,
}

impl<'a> FileCreator<'a> {
    pub fn new(vault: &'a dyn Vault, settings: DateTimeSettings) -> Self {
        Self {
            vault,
            settings,
            options: CreateOptions::default(),
        }
    }

    pub fn from_config(vault: &'a dyn Vault, config: &AppConfig) -> Self {
        Self {
            vault,
            settings: config.datetime.clone(),
            options: CreateOptions {
                note_extension: config.vault.note_extension.clone(),
                max_collision_attempts: config.creation.max_collision_attempts,
            },
        }
    }

    pub fn with_options(mut self, options: CreateOptions) -> Self {
        self.options = options;
        self
    }

    /// Raw content of the template's file template, or empty if it has none.
    pub fn template_content(&self, template: &TitleTemplate) -> Result<String, CreateError> {
        match &template.file_template {
            Some(path) => Ok(self.vault.read(path)?),
            None => Ok(String::new()),
        }
    }

    /// Every prompt a creation with `template` will ask for.
    pub fn prompts_for(&self, template: &TitleTemplate) -> Result<Vec<PromptDescriptor>, CreateError> {
        let content = self.template_content(template)?;
        Ok(template.effective_prompts(&content))
    }

    pub fn next_counter(&self, template: &TitleTemplate) -> Result<Option<u64>, CreateError> {
        if !has_counter(&template.title_pattern) {
            return Ok(None);
        }
        Ok(Some(get_next_counter_value(self.vault, template, &self.settings)?))
    }

    /// Work-in-progress title for display while values are being entered.
    pub fn preview_title(
        &self,
        template: &TitleTemplate,
        values: &PromptValues,
        now: DateTime<FixedOffset>,
        counter: Option<u64>,
    ) -> String {
        let prompts: Vec<PromptDescriptor> = sync_prompts(&template.title_pattern, &template.prompts)
            .iter()
            .map(PromptDescriptor::from)
            .collect();
        let ctx = VariableContext::new(now, &self.settings).with_counter(counter);
        substitute::preview_title(&template.title_pattern, &prompts, values, &ctx)
    }

    /// Create a note. Nothing is written unless every prompt value is valid.
    pub fn create(
        &self,
        template: &TitleTemplate,
        values: &PromptValues,
        now: DateTime<FixedOffset>,
    ) -> Result<CreatedFile, CreateError> {
        template.validate()?;

        let raw_content = self.template_content(template)?;
        let prompts = template.effective_prompts(&raw_content);
        for prompt in &prompts {
            let result = validate_prompt_value(values.get(&prompt.name).unwrap_or(""), prompt);
            if !result.valid {
                return Err(CreateError::InvalidPrompt {
                    name: prompt.name.clone(),
                    message: result.error.unwrap_or_default(),
                });
            }
        }

        let counter = self.next_counter(template)?;
        let ctx = VariableContext::new(now, &self.settings).with_counter(counter);

        let mut title = sanitize_filename(&render_title(&template.title_pattern, &prompts, values, &ctx));
        if title.is_empty() {
            title = UNTITLED.to_string();
        }
        let content = render_content(&raw_content, &prompts, values, &ctx);

        let folder = normalize_path(&template.folder)?;
        self.vault.create_folder(&folder)?;
        let path = self.write_unique(&folder, &title, &content)?;
        tracing::info!("Created {} from template '{}'", path, template.name);

        Ok(CreatedFile {
            path,
            title,
            counter,
            content,
        })
    }

    fn file_name(&self, title: &str, attempt: u32) -> String {
        let ext = self.options.note_extension.trim_start_matches('.');
        let stem = match attempt {
            0 => title.to_string(),
            n => format!("{} {}", title, n),
        };
        if ext.is_empty() {
            stem
        } else {
            format!("{}.{}", stem, ext)
        }
    }

    fn write_unique(&self, folder: &str, title: &str, content: &str) -> Result<String, CreateError> {
        let attempts = self.options.max_collision_attempts.max(1);
        for attempt in 0..attempts {
            let path = join_path(folder, &self.file_name(title, attempt));
            match self.vault.create(&path, content) {
                Ok(()) => return Ok(path),
                Err(StorageError::AlreadyExists(_)) => {
                    tracing::debug!("{} is taken", path);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(CreateError::CollisionLimit {
            title: title.to_string(),
            attempts,
        })
    }
}

/// Create a note from the configured template named `template_name`
/// (case-insensitive), with the config's date settings and creation options.
pub fn create_from_config(
    vault: &dyn Vault,
    config: &AppConfig,
    template_name: &str,
    values: &PromptValues,
    now: DateTime<FixedOffset>,
) -> Result<CreatedFile, NotegenError> {
    let template = config.template(template_name)?;
    Ok(FileCreator::from_config(vault, config).create(template, values, now)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::ValueType;
    use crate::storage::MemoryVault;
    use crate::template::UserPrompt;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 20, 16, 45, 0)
            .unwrap()
    }

    fn values(pairs: &[(&str, &str)]) -> PromptValues {
        pairs.iter().copied().collect()
    }

    #[test]
    fn creates_with_rendered_content() {
        let vault = MemoryVault::new().with_file("Templates/meeting.md", "# {% Topic %}\nAt {{time}}\n");
        let template = TitleTemplate::new("Meeting", "{{date}} {% Topic %}")
            .with_folder("Meetings")
            .with_file_template("Templates/meeting.md");
        let creator = FileCreator::new(&vault, DateTimeSettings::default());
        let created = creator.create(&template, &values(&[("topic", "Roadmap")]), now()).unwrap();
        assert_eq!(created.path, "Meetings/2024-05-20 Roadmap.md");
        assert_eq!(created.content, "# Roadmap\nAt 16:45\n");
        assert_eq!(vault.read(&created.path).unwrap(), created.content);
        assert_eq!(created.counter, None);
    }

    #[test]
    fn invalid_value_aborts_before_writing() {
        let vault = MemoryVault::new();
        let template = TitleTemplate::new("N", "{% Count:numeric %}");
        let creator = FileCreator::new(&vault, DateTimeSettings::default());
        let err = creator.create(&template, &values(&[("count", "many")]), now()).unwrap_err();
        assert!(matches!(err, CreateError::InvalidPrompt { ref name, .. } if name == "Count"));
        assert!(vault.list("").unwrap().is_empty());
    }

    #[test]
    fn saved_prompt_settings_are_validated() {
        let vault = MemoryVault::new();
        let saved = UserPrompt::from(&PromptDescriptor::new("Status", ValueType::List).with_options(["Open"]));
        let template = TitleTemplate::new("S", "{% Status %}").with_prompts(vec![saved]);
        let creator = FileCreator::new(&vault, DateTimeSettings::default());
        assert!(creator.create(&template, &values(&[("status", "Closed")]), now()).is_err());
        assert!(creator.create(&template, &values(&[("status", "Open")]), now()).is_ok());
    }

    #[test]
    fn collisions_get_numeric_suffixes() {
        let vault = MemoryVault::new().with_file("Idea.md", "");
        let template = TitleTemplate::new("Idea", "Idea");
        let creator = FileCreator::new(&vault, DateTimeSettings::default());
        assert_eq!(creator.create(&template, &PromptValues::new(), now()).unwrap().path, "Idea 1.md");
        assert_eq!(creator.create(&template, &PromptValues::new(), now()).unwrap().path, "Idea 2.md");
    }

    #[test]
    fn collision_limit_is_enforced() {
        let vault = MemoryVault::new().with_file("X.md", "").with_file("X 1.md", "");
        let template = TitleTemplate::new("X", "X");
        let creator = FileCreator::new(&vault, DateTimeSettings::default()).with_options(CreateOptions {
            note_extension: "md".into(),
            max_collision_attempts: 2,
        });
        let err = creator.create(&template, &PromptValues::new(), now()).unwrap_err();
        assert!(matches!(err, CreateError::CollisionLimit { attempts: 2, .. }));
    }

    #[test]
    fn empty_title_falls_back_to_untitled() {
        let vault = MemoryVault::new();
        let template = TitleTemplate::new("Opt", "{%? Name ?%}");
        let creator = FileCreator::new(&vault, DateTimeSettings::default());
        let created = creator.create(&template, &PromptValues::new(), now()).unwrap();
        assert_eq!(created.path, "Untitled.md");
    }

    #[test]
    fn title_is_sanitized() {
        let vault = MemoryVault::new();
        let template = TitleTemplate::new("T", "Re: {{time}}");
        let creator = FileCreator::new(&vault, DateTimeSettings::default());
        let created = creator.create(&template, &PromptValues::new(), now()).unwrap();
        assert_eq!(created.title, "Re\u{A789} 16-45");
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let vault = MemoryVault::new();
        let template = TitleTemplate::new("C", "{{counter}} {{counter}}");
        let creator = FileCreator::new(&vault, DateTimeSettings::default());
        assert!(matches!(
            creator.create(&template, &PromptValues::new(), now()),
            Err(CreateError::Template(_))
        ));
    }

    #[test]
    fn preview_shows_placeholders() {
        let vault = MemoryVault::new();
        let template = TitleTemplate::new("C", "Chapter {{counter}} - {% Title %}");
        let creator = FileCreator::new(&vault, DateTimeSettings::default());
        assert_eq!(
            creator.preview_title(&template, &PromptValues::new(), now(), None),
            "Chapter # - [Title]"
        );
        assert_eq!(
            creator.preview_title(&template, &values(&[("title", "Intro")]), now(), Some(4)),
            "Chapter 4 - Intro"
        );
    }

    #[test]
    fn creates_from_configured_template() {
        let vault = MemoryVault::new().with_file("Log/Log 2.md", "");
        let mut config = AppConfig::default();
        config.vault.note_extension = "txt".to_string();
        config.templates.push(TitleTemplate::new("Log", "Log {{counter}}").with_folder("Log"));

        let created = create_from_config(&vault, &config, "log", &PromptValues::new(), now()).unwrap();
        assert_eq!(created.path, "Log/Log 3.txt");

        let err = create_from_config(&vault, &config, "Journal", &PromptValues::new(), now()).unwrap_err();
        assert!(matches!(err, NotegenError::Config(_)));
        assert_eq!(err.to_string(), "Config error: No template named 'Journal'");
    }
}
