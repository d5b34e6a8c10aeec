use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::utils::CliContext;

/// Writes the saved snapshot of `session` to `out`, or stdout.
pub fn run(ctx: &CliContext, session: &str, out: Option<&Path>) -> Result<()> {
    let record = ctx.require_record(session)?;
    let json = serde_json::to_string_pretty(&record.state)?;

    match out {
        Some(path) => {
            fs::write(path, json + "\n")
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "✓ Exported {} nodes from '{}' to {}",
                record.state.nodes.len(),
                session,
                path.display()
            );
        }
        None => println!("{}", json),
    }
    Ok(())
}
