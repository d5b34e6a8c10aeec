use anyhow::Result;
use stackcanvas_core::save::{SaveOrigin, SaveRecord};

use super::utils::CliContext;

pub fn run(ctx: &CliContext, session: &str) -> Result<()> {
    let record = ctx.require_record(session)?;
    println!("{}", describe(session, &record));
    Ok(())
}

fn describe(session: &str, record: &SaveRecord) -> String {
    let origin = match record.origin {
        SaveOrigin::Local => "local",
        SaveOrigin::Remote => "remote",
    };
    let mut lines = vec![
        format!("Session:     {}", session),
        format!("Saved at:    {}", record.saved_at.to_rfc3339()),
        format!("Origin:      {}", origin),
        format!(
            "Owner:       {}",
            record.owner_id.as_deref().unwrap_or("(anonymous)")
        ),
        format!("Nodes:       {}", record.state.nodes.len()),
        format!("Connections: {}", record.state.connections.len()),
        format!("Size:        ~{} bytes", record.state.approximate_size()),
    ];
    if !record.state.metadata.is_empty() {
        let keys: Vec<&str> = record.state.metadata.keys().map(String::as_str).collect();
        lines.push(format!("Metadata:    {}", keys.join(", ")));
    }
    lines.join("\n")
}
