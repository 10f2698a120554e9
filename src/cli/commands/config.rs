//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::{anyhow, Result};

/// Run the config command. `config_path` is the `--config` override, if any.
pub fn run_config(
    action: &ConfigAction,
    settings: Settings,
    config_path: Option<&str>,
) -> Result<()> {
    let config_path = config_path
        .map(Settings::expand_path)
        .unwrap_or_else(Settings::default_config_path);

    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&settings)
                .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Set { key, value } => {
            let updated = set_value(&settings, key, value)?;
            updated.save_to(&config_path)?;
            Output::success(&format!("Set {} = {}", key, value));
        }

        ConfigAction::Edit => {
            // Create default config if it doesn't exist
            if !config_path.exists() {
                settings.save_to(&config_path)?;
                Output::info(&format!("Created default config at {:?}", config_path));
            }

            let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vim".to_string());

            Output::info(&format!("Opening config in {}...", editor));

            let status = std::process::Command::new(&editor).arg(&config_path).status();

            match status {
                Ok(s) if s.success() => {
                    Output::success("Config saved.");
                }
                Ok(_) => {
                    Output::warning("Editor exited with non-zero status.");
                }
                Err(e) => {
                    Output::error(&format!("Failed to open editor: {}", e));
                    Output::info(&format!("Config file is at: {:?}", config_path));
                }
            }
        }

        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }

    Ok(())
}

/// Return a copy of `settings` with the dotted `key` set to `value`.
///
/// `value` is read as a TOML literal when it parses as one (numbers, arrays,
/// booleans), and as a plain string otherwise.
fn set_value(settings: &Settings, key: &str, value: &str) -> Result<Settings> {
    let mut document = toml::Value::try_from(settings)?;

    let parts: Vec<&str> = key.split('.').collect();
    let (field, sections) = parts
        .split_last()
        .filter(|(field, _)| !field.is_empty())
        .ok_or_else(|| anyhow!("Invalid config key: '{}'", key))?;

    let mut table = document
        .as_table_mut()
        .ok_or_else(|| anyhow!("Config is not a table"))?;
    for section in sections {
        table = table
            .get_mut(*section)
            .and_then(toml::Value::as_table_mut)
            .ok_or_else(|| anyhow!("Unknown config section: '{}'", section))?;
    }
    table.insert(field.to_string(), parse_value(value));

    let updated: Settings = document.try_into()?;

    // Unknown keys are ignored by deserialization; make sure ours survived.
    let check = toml::Value::try_from(&updated)?;
    let mut current = check.as_table();
    for section in sections {
        current = current.and_then(|t| t.get(*section)).and_then(toml::Value::as_table);
    }
    if !current.is_some_and(|t| t.contains_key(*field)) {
        return Err(anyhow!("Unknown config key: '{}'", key));
    }

    Ok(updated)
}

fn parse_value(value: &str) -> toml::Value {
    toml::from_str::<toml::Table>(&format!("value = {}", value))
        .ok()
        .and_then(|mut table| table.remove("value"))
        .unwrap_or_else(|| toml::Value::String(value.to_string()))
}
