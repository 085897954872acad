//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use draftwell_core::Config;

use crate::output::{Output, OutputFormat};

const VALID_KEYS: &str = "data_dir, auto_save, autosave_delay_ms, outline_min_level, \
     new_document_title, new_document_template, log_level, log_file";

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "auto_save": config.auto_save,
                    "autosave_delay_ms": config.autosave_delay_ms,
                    "outline_min_level": config.outline_min_level,
                    "new_document_title": config.new_document_title,
                    "new_document_template": config.new_document_template,
                    "log_level": config.log_level,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:              {}", config.data_dir.display());
            println!("  auto_save:             {}", config.auto_save);
            println!("  autosave_delay_ms:     {}", config.autosave_delay_ms);
            println!("  outline_min_level:     {}", config.outline_min_level);
            println!("  new_document_title:    {}", config.new_document_title);
            println!(
                "  new_document_template: {:?}",
                config.new_document_template
            );
            println!("  log_level:             {}", config.log_level);
            println!(
                "  log_file:              {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "auto_save" => {
            config.auto_save = value
                .parse()
                .context("Invalid value for auto_save. Use 'true' or 'false'.")?;
        }
        "autosave_delay_ms" => {
            config.autosave_delay_ms = value
                .parse()
                .context("Invalid value for autosave_delay_ms. Use a number of milliseconds.")?;
        }
        "outline_min_level" => {
            let level: u8 = value
                .parse()
                .context("Invalid value for outline_min_level. Use 1 to 6.")?;
            if !(1..=6).contains(&level) {
                bail!("Invalid value for outline_min_level. Use 1 to 6.");
            }
            config.outline_min_level = level;
        }
        "new_document_title" => {
            if value.trim().is_empty() {
                bail!("new_document_title must not be empty");
            }
            config.new_document_title = value.to_string();
        }
        "new_document_template" => {
            config.new_document_template = value.replace("\\n", "\n");
        }
        "log_level" => {
            config.log_level = value.to_string();
        }
        "log_file" => {
            config.log_file = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.into())
            };
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\nValid keys: {}",
                key,
                VALID_KEYS
            );
        }
    }
    Ok(())
}
