//! Full installation flow: start, stream, wait, post-update.

use crate::retry::{with_retry, RetryConfig};
use crate::{InstallRequest, IpcClient, RecoveryStatus, Result, StatusReport};
use serde::Serialize;
use std::time::Duration;
use tokio::io::AsyncRead;
use tracing::{error, info, warn};

/// Default pause between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Knobs of [`install`].
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Retry policy for opening the installation
    pub retry: RetryConfig,
    pub poll_interval: Duration,
    /// Request post-update actions after a successful update
    pub post_update: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            post_update: true,
        }
    }
}

/// Progress notifications emitted while installing.
#[derive(Debug)]
pub enum InstallEvent<'a> {
    /// Image bytes sent so far
    Sent(u64),
    /// A status report from the daemon
    Status(&'a StatusReport),
}

/// Result of an installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallOutcome {
    pub status: RecoveryStatus,
    pub bytes_sent: u64,
    /// `None` when post-update was not requested
    pub post_update: Option<bool>,
}

impl InstallOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == RecoveryStatus::Success && self.post_update != Some(false)
    }

    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> i32 {
        if self.succeeded() {
            0
        } else {
            1
        }
    }
}

/// Install `image` through the daemon behind `client`.
///
/// Errors are returned only when the daemon cannot be reached or the
/// conversation breaks; an update the daemon rejects while running ends
/// in an outcome with `RecoveryStatus::Failure`.
pub async fn install<R, F>(
    client: &IpcClient,
    request: &InstallRequest,
    image: R,
    options: &InstallOptions,
    mut on_event: F,
) -> Result<InstallOutcome>
where
    R: AsyncRead + Unpin,
    F: FnMut(InstallEvent<'_>),
{
    let stream = with_retry(&options.retry, || client.start_install(request)).await?;

    let bytes_sent = stream
        .send_image(image, |sent| on_event(InstallEvent::Sent(sent)))
        .await?;

    let status = client
        .wait_for_completion(options.poll_interval, |report| {
            on_event(InstallEvent::Status(report))
        })
        .await?;

    let post_update = match status {
        RecoveryStatus::Success => {
            info!("SWUpdate was successful !");
            if options.post_update {
                match client.post_update().await {
                    Ok(()) => Some(true),
                    Err(e) => {
                        warn!("post-update failed: {}", e);
                        Some(false)
                    }
                }
            } else {
                None
            }
        }
        _ => {
            error!("SWUpdate *failed* !");
            None
        }
    };

    Ok(InstallOutcome {
        status,
        bytes_sent,
        post_update,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let outcome = |status, post_update| InstallOutcome {
            status,
            bytes_sent: 0,
            post_update,
        };
        assert_eq!(outcome(RecoveryStatus::Success, None).exit_code(), 0);
        assert_eq!(outcome(RecoveryStatus::Success, Some(true)).exit_code(), 0);
        assert_eq!(outcome(RecoveryStatus::Success, Some(false)).exit_code(), 1);
        assert_eq!(outcome(RecoveryStatus::Failure, None).exit_code(), 1);
        assert_eq!(outcome(RecoveryStatus::Idle, None).exit_code(), 1);
    }
}
