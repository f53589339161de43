//! Status command - Show or follow the daemon's state.

use anyhow::{Context, Result};
use serde::Serialize;
use std::process::ExitCode;
use swupdate_ipc::{RecoveryStatus, StatusReport};

use super::timestamp;
use crate::config::Settings;

#[derive(Serialize)]
struct StatusOutput<'a> {
    socket: String,
    checked_at: String,
    #[serde(flatten)]
    report: &'a StatusReport,
}

pub async fn run(settings: &Settings, json: bool, wait: bool) -> Result<ExitCode> {
    let client = settings.client();

    if wait {
        let result = client
            .wait_for_completion(settings.poll_interval, |report| {
                if !json && !report.desc.is_empty() {
                    println!("[{}] {}: {}", timestamp(), report.current, report.desc);
                }
            })
            .await
            .with_context(|| format!("Failed to query {:?}", settings.socket))?;

        if json {
            println!("{}", serde_json::json!({ "last_result": result }));
        } else {
            println!("Last result: {}", result);
        }
        return Ok(if result == RecoveryStatus::Failure {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        });
    }

    let report = client
        .get_status()
        .await
        .with_context(|| format!("Failed to query {:?}", settings.socket))?;

    if json {
        let output = StatusOutput {
            socket: settings.socket.display().to_string(),
            checked_at: chrono::Local::now().to_rfc3339(),
            report: &report,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Status:       {}", report.current);
        println!("Last result:  {}", report.last_result);
        if report.error != 0 {
            println!("Error:        {}", report.error);
        }
        if !report.desc.is_empty() {
            println!("Message:      {}", report.desc);
        }
    }

    Ok(ExitCode::SUCCESS)
}
