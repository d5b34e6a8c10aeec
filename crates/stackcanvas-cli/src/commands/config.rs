use anyhow::Result;

use super::utils::CliContext;

/// Prints the effective configuration, secrets masked.
pub fn show(ctx: &CliContext) -> Result<()> {
    println!("# {}", ctx.config_path.display());
    println!("{}", render(ctx)?);
    Ok(())
}

fn render(ctx: &CliContext) -> Result<String> {
    let mut config = ctx.config.clone();
    if config.remote.api_token.is_some() {
        config.remote.api_token = Some("********".to_string());
    }
    Ok(toml::to_string_pretty(&config)?)
}
