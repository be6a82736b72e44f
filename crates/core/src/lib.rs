pub mod codeblock;
pub mod completion;
pub mod config;
pub mod counter;
pub mod create;
pub mod error;
pub mod format;
pub mod highlight;
pub mod presets;
pub mod prompt;
pub mod sanitize;
pub mod span;
pub mod storage;
pub mod substitute;
pub mod template;
pub mod validate;
pub mod variables;

pub mod prelude {
    pub use crate::config::{AppConfig, DateTimeSettings};
    pub use crate::create::{CreatedFile, FileCreator};
    pub use crate::error::*;
    pub use crate::presets::ValueType;
    pub use crate::prompt::{OutputFormat, PromptDescriptor};
    pub use crate::storage::{DirVault, MemoryVault, Vault};
    pub use crate::substitute::PromptValues;
    pub use crate::template::{TitleTemplate, UserPrompt};
}
