//! `colloquy config`: Show the effective configuration.

use colloquy_config::AppConfig;

/// Prints the config even when it does not validate, so the problem can be fixed.
pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load_unchecked().map_err(|e| format!("Failed to load config: {e}"))?;
    println!("{}", render(config)?);
    Ok(())
}

pub async fn defaults() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", AppConfig::default_toml());
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}

/// TOML with the secret redacted and any validation error appended as a comment.
fn render(mut config: AppConfig) -> Result<String, toml::ser::Error> {
    let problem = config.validate().err();
    if config.auth.jwt_secret.is_some() {
        config.auth.jwt_secret = Some("[REDACTED]".into());
    }

    let mut out = toml::to_string_pretty(&config)?;
    if let Some(e) = problem {
        out.push_str(&format!("\n# Invalid: {e}\n"));
    }
    Ok(out)
}
