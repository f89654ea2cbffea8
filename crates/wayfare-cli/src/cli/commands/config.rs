//! Config command handlers.

use anyhow::{Context, Result};
use wayfare_core::config::{self, Config, paths};

pub fn path() {
    println!("{}", paths::config_path().display());
}

pub fn init() -> Result<()> {
    let config_path = paths::config_path();
    Config::init(&config_path)
        .with_context(|| format!("init config at {}", config_path.display()))?;
    println!("Created config at {}", config_path.display());
    Ok(())
}

/// Prints the settings in effect after env overrides.
pub fn show() -> Result<()> {
    let config = Config::load().context("load config")?;
    let names = config.cookie_names();
    let timeout = config
        .request_timeout()
        .map_or_else(|| "none".to_string(), |t| format!("{}s", t.as_secs()));

    println!("Config file:     {}", paths::config_path().display());
    println!("Base URL:        {}", config.effective_base_url()?);
    println!("Timeout:         {timeout}");
    println!("Access cookie:   {}", names.access);
    println!("Refresh cookie:  {}", names.refresh);
    println!("Page size:       {}", config.page_size());
    println!("Popular limit:   {}", config.listing.popular_limit);
    println!(
        "Permissions TTL: {}m",
        config.permissions_stale_time().as_secs() / 60
    );
    Ok(())
}

pub fn set_url(url: &str) -> Result<()> {
    let config_path = paths::config_path();
    Config::save_base_url_to(&config_path, url)
        .with_context(|| format!("update {}", config_path.display()))?;
    let saved = config::resolve_base_url(None, Some(url))?;
    println!("Base URL set to {saved}");
    Ok(())
}
