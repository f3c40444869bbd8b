//! Config command handlers.

use std::path::Path;

use anyhow::Result;

use petclaw::config::Config;
use petclaw::providers::select_backend;

use super::ConfigAction;

pub(crate) fn cmd_config(config_path: Option<&Path>, action: ConfigAction) -> Result<()> {
    let path = config_path.map(Path::to_path_buf).unwrap_or_else(Config::path);

    match action {
        ConfigAction::Check => {
            println!("Config file: {}", path.display());
            if !path.exists() {
                println!("[OK] No config file found (using defaults)");
            }
            match Config::load_from_path(&path) {
                Ok(config) => {
                    println!("[OK] Configuration is valid");
                    match select_backend(&config) {
                        Some(backend) => println!("[OK] Provider: {}", backend.as_str()),
                        None => println!("[WARN] No provider has an API key; `ask` and `chat` are unavailable"),
                    }
                }
                Err(e) => println!("[ERROR] {}", e),
            }
        }
        ConfigAction::Show => {
            let config = Config::load_from_path(&path)?;
            println!("{}", serde_json::to_string_pretty(&masked(&config)?)?);
        }
    }
    Ok(())
}

/// Serialize `config` with every API key replaced.
fn masked(config: &Config) -> Result<serde_json::Value> {
    let mut value = serde_json::to_value(config)?;
    if let Some(providers) = value.get_mut("providers").and_then(|p| p.as_object_mut()) {
        for provider in providers.values_mut() {
            if let Some(key) = provider.get_mut("api_key") {
                if key.is_string() {
                    *key = serde_json::Value::String("********".into());
                }
            }
        }
    }
    Ok(value)
}
