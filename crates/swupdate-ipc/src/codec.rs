//! Frame encoding for the control socket.
//!
//! Every message travels as a fixed header followed by a body:
//!
//! ```text
//! magic: u32 LE | type: u32 LE | len: u32 LE | body[len]
//! ```
//!
//! Bodies are JSON documents; messages without payload have `len == 0`.
//! `GET_STATUS` and `GET_HW_REVISION` use the same type for request and
//! reply: the request has an empty body, the reply does not.

use crate::message::NackBody;
use crate::{IpcError, Message, MsgType, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

/// Magic value opening every frame.
pub const IPC_MAGIC: u32 = 0x1405_2001;

/// Size of the frame header in bytes.
pub const HEADER_LEN: usize = 12;

/// Largest accepted frame body.
pub const MAX_BODY_LEN: usize = 64 * 1024;

/// Encode a message into a complete frame.
pub fn encode(msg: &Message) -> Result<Vec<u8>> {
    let msg_type = msg.msg_type();
    let body = match msg {
        Message::Install(req) => {
            req.validate()?;
            to_body(msg_type, req)?
        }
        Message::Nack {
            reason: Some(reason),
        } => to_body(
            msg_type,
            &NackBody {
                reason: reason.clone(),
            },
        )?,
        Message::Status(report) => to_body(msg_type, report)?,
        Message::SetVersionsRange(range) => to_body(msg_type, range)?,
        Message::HwRevision(rev) => to_body(msg_type, rev)?,
        Message::Ack
        | Message::Nack { reason: None }
        | Message::GetStatus
        | Message::PostUpdate
        | Message::GetHwRevision => Vec::new(),
    };

    if body.len() > MAX_BODY_LEN {
        return Err(IpcError::FrameTooLarge {
            len: body.len(),
            max: MAX_BODY_LEN,
        });
    }

    let mut frame = Vec::with_capacity(HEADER_LEN + body.len());
    frame.extend_from_slice(&IPC_MAGIC.to_le_bytes());
    frame.extend_from_slice(&msg_type.as_u32().to_le_bytes());
    frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

fn to_body<T: Serialize>(msg_type: MsgType, value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|source| IpcError::Body { msg_type, source })
}

fn from_body<T: DeserializeOwned>(msg_type: MsgType, body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|source| IpcError::Body { msg_type, source })
}

/// Parse a frame header into its type and body length.
pub fn decode_header(header: &[u8; HEADER_LEN]) -> Result<(MsgType, usize)> {
    let word = |i: usize| u32::from_le_bytes([header[i], header[i + 1], header[i + 2], header[i + 3]]);

    let magic = word(0);
    if magic != IPC_MAGIC {
        return Err(IpcError::BadMagic(magic));
    }
    let msg_type = MsgType::from_u32(word(4))?;
    let len = word(8) as usize;
    if len > MAX_BODY_LEN {
        return Err(IpcError::FrameTooLarge {
            len,
            max: MAX_BODY_LEN,
        });
    }
    Ok((msg_type, len))
}

/// Build a message from its frame type and body.
pub fn decode_body(msg_type: MsgType, body: &[u8]) -> Result<Message> {
    let empty = body.is_empty();
    let msg = match msg_type {
        MsgType::ReqInstall => Message::Install(from_body(msg_type, body)?),
        MsgType::Ack if empty => Message::Ack,
        MsgType::Nack if empty => Message::Nack { reason: None },
        MsgType::Nack => Message::Nack {
            reason: Some(from_body::<NackBody>(msg_type, body)?.reason),
        },
        MsgType::GetStatus if empty => Message::GetStatus,
        MsgType::GetStatus => Message::Status(from_body(msg_type, body)?),
        MsgType::PostUpdate if empty => Message::PostUpdate,
        MsgType::SetVersionsRange => Message::SetVersionsRange(from_body(msg_type, body)?),
        MsgType::GetHwRevision if empty => Message::GetHwRevision,
        MsgType::GetHwRevision => Message::HwRevision(from_body(msg_type, body)?),
        MsgType::Ack | MsgType::PostUpdate => {
            return Err(IpcError::UnexpectedBody { msg_type });
        }
        other => {
            return Err(IpcError::UnknownType(other.as_u32()));
        }
    };
    Ok(msg)
}

/// Decode one complete frame held in memory.
pub fn decode(frame: &[u8]) -> Result<Message> {
    let header: &[u8; HEADER_LEN] = frame
        .get(..HEADER_LEN)
        .and_then(|h| h.try_into().ok())
        .ok_or(IpcError::Closed)?;
    let (msg_type, len) = decode_header(header)?;
    let body = frame
        .get(HEADER_LEN..HEADER_LEN + len)
        .ok_or(IpcError::Closed)?;
    decode_body(msg_type, body)
}

/// Write one message to a stream.
pub async fn write_message<W>(writer: &mut W, msg: &Message) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode(msg)?;
    trace!("-> {} ({} bytes)", msg.msg_type(), frame.len());
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one message from a stream.
pub async fn read_message<R>(reader: &mut R) -> Result<Message>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    read_full(reader, &mut header).await?;
    let (msg_type, len) = decode_header(&header)?;

    let mut body = vec![0u8; len];
    read_full(reader, &mut body).await?;
    trace!("<- {} ({} byte body)", msg_type, len);
    decode_body(msg_type, &body)
}

async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    match reader.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(IpcError::Closed),
        Err(e) => Err(IpcError::Io(e)),
    }
}
