//! Install command - Stream an update image to the daemon.

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use swupdate_description::{is_compatible, SwuImage};
use swupdate_ipc::retry::is_unreachable;
use swupdate_ipc::{install, InstallEvent, InstallOptions, InstallRequest, IpcClient, SourceType};
use tokio::io::AsyncRead;
use tracing::{debug, info};

use super::{timestamp, SelectionArgs};
use crate::config::Settings;

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Path to the .swu image ("-" or omitted reads stdin)
    pub file: Option<PathBuf>,

    /// Only check the image, do not install it
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Free text recorded by the daemon with the update
    #[arg(long)]
    pub info: Option<String>,

    /// Do not ask for post-update actions after a successful update
    #[arg(long)]
    pub no_post_update: bool,

    /// Attempts to start the installation while the daemon is busy
    #[arg(long)]
    pub retries: Option<u32>,

    /// Refuse images not compatible with the daemon's hardware revision
    #[arg(long)]
    pub check_hw: bool,
}

impl InstallArgs {
    fn path(&self) -> Option<&Path> {
        self.file.as_deref().filter(|p| *p != Path::new("-"))
    }
}

pub async fn run(settings: &Settings, args: InstallArgs) -> Result<ExitCode> {
    let client = settings.client();
    let selection = args.selection.resolve(settings)?;

    if args.check_hw {
        let Some(path) = args.path() else {
            bail!("--check-hw needs an image file, not stdin");
        };
        check_hardware(&client, path, settings, &args.selection).await?;
    }

    let mut request = InstallRequest::prepare()
        .source(SourceType::Local)
        .dry_run(args.dry_run);
    if let Some(text) = &args.info {
        request = request.info(text.as_str());
    }
    if let Some((set, mode)) = selection {
        request = request.selection(set, mode);
    }
    request.validate().context("Invalid install request")?;

    let mut options = InstallOptions {
        retry: settings.retry.clone(),
        poll_interval: settings.poll_interval,
        post_update: settings.post_update && !args.no_post_update,
    };
    if let Some(retries) = args.retries {
        options.retry.max_attempts = retries;
    }

    let image: Box<dyn AsyncRead + Unpin + Send> = match args.path() {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open image: {:?}", path))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };

    info!(
        "installing {} via {}",
        args.path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<stdin>".into()),
        client.socket_path().display()
    );

    let outcome = install(&client, &request, image, &options, |event| match event {
        InstallEvent::Sent(bytes) => debug!("sent {} bytes", bytes),
        InstallEvent::Status(report) if !report.desc.is_empty() => {
            println!("[{}] {}", timestamp(), report.desc)
        }
        InstallEvent::Status(_) => {}
    })
    .await
    .map_err(|e| {
        if is_unreachable(&e) {
            anyhow!(e).context(format!(
                "Cannot reach the update daemon at {:?}. Is swupdate running?",
                client.socket_path()
            ))
        } else {
            anyhow!(e)
        }
    })?;

    println!(
        "{} ({} bytes sent)",
        if outcome.succeeded() {
            "Update succeeded"
        } else {
            "Update failed"
        },
        outcome.bytes_sent
    );
    if outcome.post_update == Some(false) {
        println!("Post-update actions were rejected");
    }

    Ok(ExitCode::from(outcome.exit_code() as u8))
}

async fn check_hardware(
    client: &IpcClient,
    path: &Path,
    settings: &Settings,
    selection: &SelectionArgs,
) -> Result<()> {
    let hw = client
        .hw_revision()
        .await
        .context("Failed to query the hardware revision")?;
    let selection = selection.selection(settings, Some(hw.board.clone()))?;
    let image = SwuImage::load(path, &selection)
        .with_context(|| format!("Failed to read: {:?}", path))?;

    let compatible = is_compatible(&image.description.hardware_compatibility, &hw.revision)?;
    if !compatible {
        bail!(
            "image is not compatible with {} (accepts: {})",
            hw,
            image.description.hardware_compatibility.join(", ")
        );
    }
    info!("image is compatible with {}", hw);
    Ok(())
}
