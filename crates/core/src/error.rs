/// Error for entry points that span configuration, storage and creation,
/// such as [`crate::create::create_from_config`].
#[derive(Debug, thiserror::Error)]
pub enum NotegenError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("File creation error: {0}")]
    Create(#[from] CreateError),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Path already exists: {0}")]
    AlreadyExists(String),

    #[error("Not a folder: {0}")]
    NotAFolder(String),

    #[error("Invalid vault path: {0}")]
    InvalidPath(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("No template named '{0}'")]
    UnknownTemplate(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Title pattern is empty")]
    EmptyPattern,

    #[error("Title pattern contains {count} counter placeholders; at most one is allowed")]
    MultipleCounters { count: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum CreateError {
    #[error("Invalid value for prompt '{name}': {message}")]
    InvalidPrompt { name: String, message: String },

    #[error("Could not find a free filename for '{title}' after {attempts} attempts")]
    CollisionLimit { title: String, attempts: u32 },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
