//! Connection to the update daemon's control socket.
//!
//! Each request uses a fresh connection: connect, send one frame, read one
//! frame. An install keeps its connection open to stream the image.

use crate::codec::{read_message, write_message};
use crate::{
    InstallRequest, IpcError, Message, MsgType, RecoveryStatus, Result, StatusReport,
    VersionsRange,
};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use swupdate_description::HwRevision;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing::{debug, info};

/// Control socket used by the daemon unless configured otherwise.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/sockinstctrl";

/// Image bytes sent per write.
pub const IMAGE_CHUNK_SIZE: usize = 16 * 1024;

/// Default bound for each connect, read and write.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(30);

async fn timed<T, F>(stage: &'static str, timeout: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| IpcError::Timeout { stage, timeout })?
}

/// Client for the daemon's control socket.
#[derive(Debug, Clone)]
pub struct IpcClient {
    socket_path: PathBuf,
    io_timeout: Duration,
}

impl Default for IpcClient {
    fn default() -> Self {
        Self::new(DEFAULT_SOCKET_PATH)
    }
}

impl IpcClient {
    pub fn new<P: Into<PathBuf>>(socket_path: P) -> Self {
        Self {
            socket_path: socket_path.into(),
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    async fn connect(&self) -> Result<UnixStream> {
        let path = self.socket_path.clone();
        timed("connecting", self.io_timeout, async move {
            UnixStream::connect(&path)
                .await
                .map_err(|source| IpcError::Connect { path, source })
        })
        .await
    }

    async fn exchange(&self, stream: &mut UnixStream, msg: &Message) -> Result<Message> {
        timed("sending", self.io_timeout, write_message(stream, msg)).await?;
        timed("waiting for reply", self.io_timeout, read_message(stream)).await
    }

    /// Send one request and return the daemon's reply.
    pub async fn request(&self, msg: &Message) -> Result<Message> {
        let mut stream = self.connect().await?;
        debug!("request {} on {}", msg.msg_type(), self.socket_path.display());
        self.exchange(&mut stream, msg).await
    }

    /// Current daemon state and the next pending notification.
    pub async fn get_status(&self) -> Result<StatusReport> {
        match self.request(&Message::GetStatus).await? {
            Message::Status(report) => Ok(report),
            other => Err(unexpected(MsgType::GetStatus, &other)),
        }
    }

    /// Ask the daemon to run its post-update actions.
    pub async fn post_update(&self) -> Result<()> {
        expect_ack(MsgType::PostUpdate, self.request(&Message::PostUpdate).await?)
    }

    /// Restrict the versions the daemon accepts.
    pub async fn set_versions_range(&self, range: &VersionsRange) -> Result<()> {
        expect_ack(
            MsgType::SetVersionsRange,
            self.request(&Message::SetVersionsRange(range.clone())).await?,
        )
    }

    /// Board name and revision the daemon runs on.
    pub async fn hw_revision(&self) -> Result<HwRevision> {
        match self.request(&Message::GetHwRevision).await? {
            Message::HwRevision(rev) => Ok(rev),
            Message::Nack { reason } => Err(IpcError::Rejected {
                request: MsgType::GetHwRevision,
                reason,
            }),
            other => Err(unexpected(MsgType::GetHwRevision, &other)),
        }
    }

    /// Open an installation. On ACK the returned stream accepts the image.
    pub async fn start_install(&self, request: &InstallRequest) -> Result<InstallStream> {
        let mut stream = self.connect().await?;
        let reply = self
            .exchange(&mut stream, &Message::Install(request.clone()))
            .await?;
        expect_ack(MsgType::ReqInstall, reply)?;
        info!("installation accepted by {}", self.socket_path.display());
        Ok(InstallStream {
            stream,
            io_timeout: self.io_timeout,
        })
    }

    /// Poll the daemon until it is idle again and return the last result.
    ///
    /// `on_status` sees every report. Polling sleeps for `poll` only when a
    /// report brings neither a state change nor a message.
    pub async fn wait_for_completion<F>(&self, poll: Duration, mut on_status: F) -> Result<RecoveryStatus>
    where
        F: FnMut(&StatusReport),
    {
        let mut last: Option<RecoveryStatus> = None;
        loop {
            let report = self.get_status().await?;
            on_status(&report);

            if report.current == RecoveryStatus::Idle {
                debug!("daemon idle, last result {}", report.last_result);
                return Ok(report.last_result);
            }

            let changed = last != Some(report.current) || !report.desc.is_empty();
            last = Some(report.current);
            if !changed {
                tokio::time::sleep(poll).await;
            }
        }
    }
}

fn unexpected(request: MsgType, got: &Message) -> IpcError {
    IpcError::UnexpectedReply {
        request,
        got: got.msg_type(),
    }
}

fn expect_ack(request: MsgType, reply: Message) -> Result<()> {
    match reply {
        Message::Ack => Ok(()),
        Message::Nack { reason } => Err(IpcError::Rejected { request, reason }),
        other => Err(unexpected(request, &other)),
    }
}

/// An accepted installation, ready to receive the image.
#[derive(Debug)]
pub struct InstallStream {
    stream: UnixStream,
    io_timeout: Duration,
}

impl InstallStream {
    /// Copy the image to the daemon and close the write side.
    ///
    /// `progress` is called with the running byte count after every chunk.
    /// Returns the total number of bytes sent.
    pub async fn send_image<R, P>(mut self, mut image: R, mut progress: P) -> Result<u64>
    where
        R: AsyncRead + Unpin,
        P: FnMut(u64),
    {
        let mut buf = vec![0u8; IMAGE_CHUNK_SIZE];
        let mut sent: u64 = 0;
        loop {
            let n = image.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            timed("streaming the image", self.io_timeout, async {
                self.stream.write_all(&buf[..n]).await.map_err(IpcError::from)
            })
            .await?;
            sent += n as u64;
            progress(sent);
        }
        timed("closing the image stream", self.io_timeout, async {
            self.stream.shutdown().await.map_err(IpcError::from)
        })
        .await?;
        debug!("image sent, {} bytes", sent);
        Ok(sent)
    }
}
