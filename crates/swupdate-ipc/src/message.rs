//! Messages exchanged over the control socket.

use crate::{IpcError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use swupdate_description::HwRevision;

/// Version of the install request layout.
pub const SWUPDATE_API_VERSION: u32 = 0x1;

/// Size of the `info` buffer in an install request, terminator included.
pub const INFO_SIZE: usize = 512;

/// Size of the software set and running mode buffers, terminator included.
pub const SELECTION_SIZE: usize = 256;

/// Message type carried in every frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MsgType {
    ReqInstall = 0,
    Ack = 1,
    Nack = 2,
    GetStatus = 3,
    PostUpdate = 4,
    SwupdateSubprocess = 5,
    SetAesKey = 6,
    SetUpdateState = 7,
    GetUpdateState = 8,
    ReqInstallExt = 9,
    SetVersionsRange = 10,
    NotifyStream = 11,
    GetHwRevision = 12,
    SetSwupdateVars = 13,
    GetSwupdateVars = 14,
}

impl MsgType {
    const ALL: [MsgType; 15] = [
        MsgType::ReqInstall,
        MsgType::Ack,
        MsgType::Nack,
        MsgType::GetStatus,
        MsgType::PostUpdate,
        MsgType::SwupdateSubprocess,
        MsgType::SetAesKey,
        MsgType::SetUpdateState,
        MsgType::GetUpdateState,
        MsgType::ReqInstallExt,
        MsgType::SetVersionsRange,
        MsgType::NotifyStream,
        MsgType::GetHwRevision,
        MsgType::SetSwupdateVars,
        MsgType::GetSwupdateVars,
    ];

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn from_u32(value: u32) -> Result<Self> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or(IpcError::UnknownType(value))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MsgType::ReqInstall => "REQ_INSTALL",
            MsgType::Ack => "ACK",
            MsgType::Nack => "NACK",
            MsgType::GetStatus => "GET_STATUS",
            MsgType::PostUpdate => "POST_UPDATE",
            MsgType::SwupdateSubprocess => "SWUPDATE_SUBPROCESS",
            MsgType::SetAesKey => "SET_AES_KEY",
            MsgType::SetUpdateState => "SET_UPDATE_STATE",
            MsgType::GetUpdateState => "GET_UPDATE_STATE",
            MsgType::ReqInstallExt => "REQ_INSTALL_EXT",
            MsgType::SetVersionsRange => "SET_VERSIONS_RANGE",
            MsgType::NotifyStream => "NOTIFY_STREAM",
            MsgType::GetHwRevision => "GET_HW_REVISION",
            MsgType::SetSwupdateVars => "SET_SWUPDATE_VARS",
            MsgType::GetSwupdateVars => "GET_SWUPDATE_VARS",
        }
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of the update daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStatus {
    Idle,
    Start,
    Run,
    Success,
    Failure,
    Download,
    Done,
    Subprocess,
    Progress,
}

impl RecoveryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RecoveryStatus::Idle => "IDLE",
            RecoveryStatus::Start => "START",
            RecoveryStatus::Run => "RUN",
            RecoveryStatus::Success => "SUCCESS",
            RecoveryStatus::Failure => "FAILURE",
            RecoveryStatus::Download => "DOWNLOAD",
            RecoveryStatus::Done => "DONE",
            RecoveryStatus::Subprocess => "SUBPROCESS",
            RecoveryStatus::Progress => "PROGRESS",
        }
    }
}

impl fmt::Display for RecoveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is asking for the installation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    #[default]
    Unknown,
    Webserver,
    Suricatta,
    Downloader,
    Local,
    ChunksDownloader,
}

/// Whether the daemon should really install or only check the image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunType {
    #[default]
    Default,
    DryRun,
    Install,
}

/// Parameters of an installation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallRequest {
    pub api_version: u32,
    pub source: SourceType,
    pub dry_run: RunType,
    /// Free text recorded by the daemon with the update
    pub info: String,
    pub software_set: String,
    pub running_mode: String,
    pub disable_store_swu: bool,
}

impl Default for InstallRequest {
    fn default() -> Self {
        Self::prepare()
    }
}

impl InstallRequest {
    /// A request with all fields at their defaults.
    pub fn prepare() -> Self {
        Self {
            api_version: SWUPDATE_API_VERSION,
            source: SourceType::Unknown,
            dry_run: RunType::Default,
            info: String::new(),
            software_set: String::new(),
            running_mode: String::new(),
            disable_store_swu: false,
        }
    }

    pub fn source(mut self, source: SourceType) -> Self {
        self.source = source;
        self
    }

    /// Only check the image, do not install it.
    pub fn dry_run(mut self, check: bool) -> Self {
        if check {
            self.dry_run = RunType::DryRun;
        }
        self
    }

    pub fn info(mut self, info: impl Into<String>) -> Self {
        self.info = info.into();
        self
    }

    pub fn selection(mut self, software_set: impl Into<String>, running_mode: impl Into<String>) -> Self {
        self.software_set = software_set.into();
        self.running_mode = running_mode.into();
        self
    }

    /// Check that every string fits the daemon's buffers.
    pub fn validate(&self) -> Result<()> {
        let fields: [(&'static str, &str, usize); 3] = [
            ("info", &self.info, INFO_SIZE),
            ("software_set", &self.software_set, SELECTION_SIZE),
            ("running_mode", &self.running_mode, SELECTION_SIZE),
        ];
        for (field, value, size) in fields {
            if value.len() >= size {
                return Err(IpcError::FieldTooLong {
                    field,
                    len: value.len(),
                    max: size - 1,
                });
            }
        }
        Ok(())
    }
}

/// Reply to a status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub current: RecoveryStatus,
    pub last_result: RecoveryStatus,
    pub error: i32,
    /// Pending notification text, empty when there is none
    #[serde(default)]
    pub desc: String,
}

/// Version window the daemon accepts for new images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionsRange {
    pub minimum: String,
    pub maximum: String,
    #[serde(default)]
    pub current: String,
}

/// Body of a NACK frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct NackBody {
    pub reason: String,
}

/// A decoded control-socket message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Install(InstallRequest),
    Ack,
    Nack { reason: Option<String> },
    GetStatus,
    Status(StatusReport),
    PostUpdate,
    SetVersionsRange(VersionsRange),
    GetHwRevision,
    HwRevision(HwRevision),
}

impl Message {
    /// Frame type used to carry this message.
    pub fn msg_type(&self) -> MsgType {
        match self {
            Message::Install(_) => MsgType::ReqInstall,
            Message::Ack => MsgType::Ack,
            Message::Nack { .. } => MsgType::Nack,
            Message::GetStatus | Message::Status(_) => MsgType::GetStatus,
            Message::PostUpdate => MsgType::PostUpdate,
            Message::SetVersionsRange(_) => MsgType::SetVersionsRange,
            Message::GetHwRevision | Message::HwRevision(_) => MsgType::GetHwRevision,
        }
    }
}
