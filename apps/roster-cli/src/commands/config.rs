use roster_config::Settings;

use crate::cli::Cli;
use crate::context::{load_settings, settings_path};

pub fn cmd_config_set(
    cli: &Cli,
    base_url: &str,
    token: &str,
    timeout_secs: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = Settings::new(base_url, token)?;
    settings.timeout_secs = timeout_secs;

    let path = settings_path(cli)?;
    settings.save_to(&path)?;

    println!("Saved settings to {}", path.display());
    println!("  Base URL: {}", settings.base_url);
    println!("  Token: {}", settings.masked_token());

    Ok(())
}

pub fn cmd_config_show(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let settings = load_settings(cli)?;

    println!("Base URL: {}", settings.base_url);
    println!("Token: {}", settings.masked_token());
    if let Some(secs) = settings.timeout_secs {
        println!("Timeout: {}s", secs);
    }
    if let Ok(path) = settings_path(cli) {
        println!("Config file: {}", path.display());
    }

    Ok(())
}
