//! `roomchat config [key] [value]`.

use anyhow::{Context, Result};

use crate::config::Config;

/// Keys accepted by [`run`].
pub const KEYS: &[&str] = &[
    "server_url",
    "room_page_size",
    "history_page_size",
    "reconnect_delay_ms",
    "max_reconnect_attempts",
];

/// Print the whole config, print one key, or set one key.
pub fn run(key: Option<&str>, value: Option<&str>) -> Result<()> {
    let dir = Config::config_dir()?;
    let mut config = Config::load_from(&dir)?;

    match (key, value) {
        (None, _) => println!("{}", serde_json::to_string_pretty(&config)?),
        (Some(key), None) => println!("{}", get(&config, key)?),
        (Some(key), Some(value)) => {
            set(&mut config, key, value)?;
            config.save_to(&dir)?;
            println!("{key} = {value}");
        }
    }
    Ok(())
}

/// Value of `key` as text.
pub fn get(config: &Config, key: &str) -> Result<String> {
    Ok(match key {
        "server_url" => config.server_url.clone(),
        "room_page_size" => config.room_page_size.to_string(),
        "history_page_size" => config.history_page_size.to_string(),
        "reconnect_delay_ms" => config.reconnect_delay_ms.to_string(),
        "max_reconnect_attempts" => config.max_reconnect_attempts.to_string(),
        _ => anyhow::bail!("unknown config key '{key}' (expected one of {})", KEYS.join(", ")),
    })
}

/// Parse `value` into `key`.
pub fn set(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let number = || -> Result<u64> {
        value
            .parse()
            .with_context(|| format!("'{value}' is not a number"))
    };
    match key {
        "server_url" => {
            if !(value.starts_with("http://") || value.starts_with("https://")) {
                anyhow::bail!("server_url must start with http:// or https://");
            }
            config.server_url = value.trim_end_matches('/').to_string();
        }
        "room_page_size" => config.room_page_size = u32::try_from(number()?)?,
        "history_page_size" => config.history_page_size = u32::try_from(number()?)?,
        "reconnect_delay_ms" => config.reconnect_delay_ms = number()?,
        "max_reconnect_attempts" => config.max_reconnect_attempts = u32::try_from(number()?)?,
        _ => anyhow::bail!("unknown config key '{key}' (expected one of {})", KEYS.join(", ")),
    }
    Ok(())
}
