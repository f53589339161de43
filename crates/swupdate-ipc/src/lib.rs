//! # swupdate-ipc
//!
//! Client side of the SWUpdate daemon's control socket.
//!
//! The daemon listens on a Unix socket (by default `/tmp/sockinstctrl`).
//! This crate provides:
//! - The message model ([`Message`], [`InstallRequest`], [`StatusReport`])
//! - Frame encoding and decoding ([`codec`])
//! - An async client for individual requests ([`IpcClient`])
//! - The complete install flow with start retries ([`install`])
//!
//! ## Example
//!
//! ```rust,no_run
//! use swupdate_ipc::{install, InstallOptions, InstallRequest, IpcClient, SourceType};
//!
//! # async fn run() -> swupdate_ipc::Result<()> {
//! let client = IpcClient::default();
//! let image = tokio::fs::File::open("update.swu").await?;
//! let request = InstallRequest::prepare().source(SourceType::Local);
//!
//! let outcome = install(&client, &request, image, &InstallOptions::default(), |_| {}).await?;
//! std::process::exit(outcome.exit_code());
//! # }
//! ```

mod client;
pub mod codec;
mod error;
mod install;
mod message;
pub mod retry;

pub use client::*;
pub use error::*;
pub use install::*;
pub use message::*;
pub use retry::RetryConfig;
