use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Local};
use notegen_core::completion::suggestions;
use notegen_core::config::{config_path, load_config, load_config_from, AppConfig};
use notegen_core::create::{create_from_config, FileCreator};
use notegen_core::highlight::highlight;
use notegen_core::prompt::{create_full_prompt_syntax, PromptDescriptor};
use notegen_core::storage::DirVault;
use notegen_core::substitute::PromptValues;
use notegen_core::template::TitleTemplate;

type CliResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser)]
#[command(name = "notegen")]
#[command(about = "Create notes from title templates with prompts, variables and counters")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct TemplateArgs {
    /// Template name from the config file
    template: Option<String>,

    /// Use this title pattern instead of a configured template
    #[arg(long, conflicts_with = "template")]
    pattern: Option<String>,

    /// Target folder for --pattern (vault-relative)
    #[arg(long)]
    folder: Option<String>,

    /// Vault root directory
    #[arg(long)]
    vault: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a note
    New {
        #[command(flatten)]
        target: TemplateArgs,

        /// Prompt value (NAME=VALUE), repeatable
        #[arg(long = "set", value_name = "NAME=VALUE")]
        set: Vec<String>,
    },

    /// Show the title a note would get, with unfilled prompts marked
    Preview {
        #[command(flatten)]
        target: TemplateArgs,

        /// Prompt value (NAME=VALUE), repeatable
        #[arg(long = "set", value_name = "NAME=VALUE")]
        set: Vec<String>,

        /// Counter value to show instead of scanning the vault
        #[arg(long)]
        counter: Option<u64>,
    },

    /// List the prompts a template asks for
    Prompts {
        #[command(flatten)]
        target: TemplateArgs,
    },

    /// Show the next counter value for a template
    NextCounter {
        #[command(flatten)]
        target: TemplateArgs,
    },

    /// Suggest completions for template text ending at the cursor
    Complete {
        /// Text before the cursor
        text: String,
    },

    /// Show syntax highlight ranges for template text
    Highlight {
        /// Template text
        text: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Initialize default config file
    Init,
    /// Show current configuration
    Show,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let result = load_cli_config(cli.config.as_deref()).and_then(|cfg| match &cli.command {
        Commands::New { target, set } => run_new(&cfg, target, set, cli.json),
        Commands::Preview {
            target,
            set,
            counter,
        } => run_preview(&cfg, target, set, *counter, cli.json),
        Commands::Prompts { target } => run_prompts(&cfg, target, cli.json),
        Commands::NextCounter { target } => run_next_counter(&cfg, target, cli.json),
        Commands::Complete { text } => run_complete(text, cli.json),
        Commands::Highlight { text } => run_highlight(text, cli.json),
        Commands::Config { action } => run_config(&cfg, action, cli.config.as_deref(), cli.json),
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_cli_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error + Send + Sync>> {
    match path {
        Some(p) if p.exists() => Ok(load_config_from(p)?),
        Some(_) => Ok(AppConfig::default()),
        None => Ok(load_config()),
    }
}

fn now() -> DateTime<FixedOffset> {
    let local = Local::now();
    local.with_timezone(local.offset())
}

fn resolve_template(cfg: &AppConfig, target: &TemplateArgs) -> Result<TitleTemplate, Box<dyn std::error::Error + Send + Sync>> {
    if let Some(pattern) = &target.pattern {
        return Ok(TitleTemplate::new("(command line)", pattern.clone()).with_folder(target.folder.clone().unwrap_or_default()));
    }
    match &target.template {
        Some(name) => Ok(cfg.template(name)?.clone()),
        None => Err("Give a template name or --pattern".into()),
    }
}

fn vault_root(cfg: &AppConfig, target: &TemplateArgs) -> PathBuf {
    target
        .vault
        .clone()
        .or_else(|| cfg.vault.root.clone())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn parse_values(set: &[String]) -> Result<PromptValues, Box<dyn std::error::Error + Send + Sync>> {
    let mut values = PromptValues::new();
    for pair in set {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("Expected NAME=VALUE, got '{}'", pair))?;
        values.insert(name, value);
    }
    Ok(values)
}

fn run_new(cfg: &AppConfig, target: &TemplateArgs, set: &[String], json: bool) -> CliResult {
    let values = parse_values(set)?;
    let vault = DirVault::new(vault_root(cfg, target));
    let created = match (&target.pattern, &target.template) {
        (None, Some(name)) => create_from_config(&vault, cfg, name, &values, now())?,
        _ => {
            let template = resolve_template(cfg, target)?;
            FileCreator::from_config(&vault, cfg).create(&template, &values, now())?
        }
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&created)?);
    } else {
        println!("Created: {}", created.path);
    }
    Ok(())
}

fn run_preview(
    cfg: &AppConfig,
    target: &TemplateArgs,
    set: &[String],
    counter: Option<u64>,
    json: bool,
) -> CliResult {
    let template = resolve_template(cfg, target)?;
    let values = parse_values(set)?;
    let vault = DirVault::new(vault_root(cfg, target));
    let creator = FileCreator::from_config(&vault, cfg);
    let counter = match counter {
        Some(c) => Some(c),
        None if target.vault.is_some() || cfg.vault.root.is_some() => creator.next_counter(&template)?,
        None => None,
    };
    let title = creator.preview_title(&template, &values, now(), counter);
    if json {
        println!("{}", serde_json::json!({ "title": title, "counter": counter }));
    } else {
        println!("{}", title);
    }
    Ok(())
}

fn run_prompts(cfg: &AppConfig, target: &TemplateArgs, json: bool) -> CliResult {
    let template = resolve_template(cfg, target)?;
    let prompts: Vec<PromptDescriptor> = if template.file_template.is_some() {
        let vault = DirVault::new(vault_root(cfg, target));
        FileCreator::from_config(&vault, cfg).prompts_for(&template)?
    } else {
        template.effective_prompts("")
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&prompts)?);
        return Ok(());
    }
    for prompt in &prompts {
        let optional = if prompt.is_optional { ", optional" } else { "" };
        println!(
            "{} ({}{})  {}",
            prompt.name,
            prompt.value_type.keyword(),
            optional,
            create_full_prompt_syntax(prompt)
        );
    }
    Ok(())
}

fn run_next_counter(cfg: &AppConfig, target: &TemplateArgs, json: bool) -> CliResult {
    let template = resolve_template(cfg, target)?;
    let vault = DirVault::new(vault_root(cfg, target));
    let next = FileCreator::from_config(&vault, cfg)
        .next_counter(&template)?
        .ok_or("Title pattern has no {{counter}}")?;
    if json {
        println!("{}", serde_json::json!({ "next": next }));
    } else {
        println!("{}", next);
    }
    Ok(())
}

fn run_complete(text: &str, json: bool) -> CliResult {
    let Some((context, items)) = suggestions(text) else {
        if json {
            println!("null");
        }
        return Ok(());
    };
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "context": context, "items": items }))?
        );
        return Ok(());
    }
    for item in &items {
        match &item.example {
            Some(example) => println!("{}  {} (e.g. {})", item.label, item.description, example),
            None => println!("{}  {}", item.label, item.description),
        }
    }
    Ok(())
}

fn run_highlight(text: &str, json: bool) -> CliResult {
    let ranges = highlight(text);
    if json {
        println!("{}", serde_json::to_string_pretty(&ranges)?);
        return Ok(());
    }
    for range in &ranges {
        println!(
            "{:>4}..{:<4} {:<16} {}",
            range.span.start,
            range.span.end,
            serde_json::to_value(range.kind)?.as_str().unwrap_or_default(),
            range.span.text(text)
        );
    }
    Ok(())
}

fn run_config(cfg: &AppConfig, action: &ConfigAction, explicit: Option<&Path>, json: bool) -> CliResult {
    match action {
        ConfigAction::Init => {
            let path = match explicit {
                Some(p) => p.to_path_buf(),
                None => config_path().ok_or("Could not determine config directory")?,
            };
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, AppConfig::default().to_toml_string()?)?;
            if json {
                println!("{}", serde_json::json!({ "path": path.display().to_string() }));
            } else {
                println!("Wrote default config to {}", path.display());
            }
        }
        ConfigAction::Show => {
            if json {
                println!("{}", serde_json::to_string_pretty(cfg)?);
            } else {
                println!("{}", cfg.to_toml_string()?);
            }
        }
    }
    Ok(())
}
