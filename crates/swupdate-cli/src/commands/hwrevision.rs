//! Hwrevision command - Query the board the daemon runs on.

use anyhow::{Context, Result};
use std::process::ExitCode;

use crate::config::Settings;

pub async fn run(settings: &Settings, json: bool) -> Result<ExitCode> {
    let hw = settings
        .client()
        .hw_revision()
        .await
        .with_context(|| format!("Failed to query {:?}", settings.socket))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&hw)?);
    } else {
        println!("Board:     {}", hw.board);
        println!("Revision:  {}", hw.revision);
    }
    Ok(ExitCode::SUCCESS)
}
