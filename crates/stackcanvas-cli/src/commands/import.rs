use anyhow::{Context, Result, bail};
use stackcanvas_core::save::SaveStatus;
use stackcanvas_core::snapshot::CanvasState;
use std::fs;
use std::path::Path;

use super::utils::CliContext;

/// Replaces the canvas of `session` with the snapshot in `file`.
///
/// An import is an explicit user choice, so it also settles any pending
/// local/remote conflict in its own favor.
pub async fn run(ctx: &CliContext, session: &str, file: &Path, owner: Option<String>) -> Result<()> {
    let content =
        fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let state: CanvasState = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {} as a canvas snapshot", file.display()))?;

    let canvas = ctx.canvas_session(session, owner)?;
    canvas.initialize().await?;

    let node_count = state.nodes.len();
    if canvas.auto_save().conflict().is_some() {
        tracing::info!("Import overrides conflicting saves for '{}'", session);
        canvas.resolve_conflict(state).await;
    } else {
        canvas.reset_state(state).await;
    }

    let status = canvas.auto_save().save_status();
    match status.status {
        SaveStatus::Saved => {
            println!("✓ Imported {} nodes into '{}'", node_count, session);
            Ok(())
        }
        SaveStatus::Conflict => bail!("Remote save for '{}' changed during import", session),
        _ => bail!(
            "Import into '{}' was not saved: {}",
            session,
            status.last_error.unwrap_or_else(|| "unknown error".to_string())
        ),
    }
}
