//! Versions command - Set the range of versions the daemon accepts.

use anyhow::{bail, Context, Result};
use std::process::ExitCode;
use swupdate_ipc::VersionsRange;

use crate::config::Settings;

pub async fn run(
    settings: &Settings,
    minimum: String,
    maximum: String,
    current: Option<String>,
) -> Result<ExitCode> {
    if minimum.is_empty() || maximum.is_empty() {
        bail!("both --min and --max must be non-empty");
    }

    let range = VersionsRange {
        minimum,
        maximum,
        current: current.unwrap_or_default(),
    };
    settings
        .client()
        .set_versions_range(&range)
        .await
        .with_context(|| format!("Failed to set versions range via {:?}", settings.socket))?;

    println!("Accepted versions: {} - {}", range.minimum, range.maximum);
    Ok(ExitCode::SUCCESS)
}
