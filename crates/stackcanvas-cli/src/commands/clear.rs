use anyhow::Result;

use super::utils::CliContext;

pub async fn run(ctx: &CliContext, session: &str, owner: Option<String>) -> Result<()> {
    let remote = owner.is_some() && ctx.config.remote.base_url.is_some();
    let canvas = ctx.canvas_session(session, owner)?;

    if !canvas.has_auto_save() && !remote {
        println!("Nothing to clear for '{}'", session);
        return Ok(());
    }

    canvas.clear_save().await?;
    println!(
        "✓ Cleared {} save for '{}'",
        if remote { "local and remote" } else { "local" },
        session
    );
    Ok(())
}
