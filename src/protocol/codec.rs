//! Protocol codec
//!
//! Encoding and decoding of frames, commands and responses.

use std::io::{Read, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{KvError, Result};
use super::{Command, CommandType, Response, Status};

/// Header size: 1 byte tag + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Frames
// =============================================================================

fn encode_frame(tag: u8, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    buf.put_u8(tag);
    buf.put_u32(payload.len() as u32);
    buf.put_slice(payload);
    buf.freeze()
}

fn check_payload_len(len: u32) -> Result<usize> {
    if len > MAX_PAYLOAD_SIZE {
        return Err(KvError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(len as usize)
}

/// Split a complete in-memory frame into tag and payload
fn split_frame(mut bytes: &[u8]) -> Result<(u8, &[u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(KvError::Protocol(format!(
            "Incomplete header: expected {} bytes, got {}",
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let tag = bytes.get_u8();
    let len = check_payload_len(bytes.get_u32())?;
    if bytes.len() < len {
        return Err(KvError::Protocol(format!(
            "Incomplete payload: expected {} bytes, got {}",
            len,
            bytes.len()
        )));
    }

    Ok((tag, &bytes[..len]))
}

/// Read one frame from a stream
fn read_frame<R: Read>(reader: &mut R) -> Result<(u8, Vec<u8>)> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let mut header = &header[..];
    let tag = header.get_u8();
    let len = check_payload_len(header.get_u32())?;

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok((tag, payload))
}

// =============================================================================
// Commands
// =============================================================================

/// Encode a command to bytes
pub fn encode_command(command: &Command) -> Bytes {
    let mut payload = BytesMut::new();
    match command {
        Command::Get { key } | Command::Delete { key } => put_key(&mut payload, key),
        Command::Put { key, value } => {
            put_key(&mut payload, key);
            payload.put_slice(value.as_bytes());
        }
        Command::Ping => {}
    }
    encode_frame(command.command_type() as u8, &payload)
}

fn put_key(buf: &mut BytesMut, key: &str) {
    buf.put_u32(key.len() as u32);
    buf.put_slice(key.as_bytes());
}

/// Decode a command from a complete frame
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (tag, payload) = split_frame(bytes)?;
    command_from_payload(tag, payload)
}

fn command_from_payload(tag: u8, mut payload: &[u8]) -> Result<Command> {
    let command_type = CommandType::try_from(tag)?;

    if command_type == CommandType::Ping {
        if !payload.is_empty() {
            return Err(KvError::Protocol(format!(
                "PING command: unexpected payload of {} bytes",
                payload.len()
            )));
        }
        return Ok(Command::Ping);
    }

    if payload.remaining() < 4 {
        return Err(KvError::Protocol(format!(
            "{:?} command: missing key length",
            command_type
        )));
    }
    let key_len = payload.get_u32() as usize;
    if payload.remaining() < key_len {
        return Err(KvError::Protocol(format!(
            "{:?} command: incomplete key (expected {}, got {})",
            command_type,
            key_len,
            payload.remaining()
        )));
    }
    let key = utf8(&payload[..key_len], "key")?;
    let rest = &payload[key_len..];

    match command_type {
        CommandType::Get | CommandType::Delete if !rest.is_empty() => Err(KvError::Protocol(
            format!("{:?} command: {} trailing bytes", command_type, rest.len()),
        )),
        CommandType::Get => Ok(Command::Get { key }),
        CommandType::Delete => Ok(Command::Delete { key }),
        CommandType::Put => Ok(Command::Put {
            key,
            value: utf8(rest, "value")?,
        }),
        CommandType::Ping => Ok(Command::Ping),
    }
}

fn utf8(bytes: &[u8], what: &str) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| KvError::Protocol(format!("{} is not valid UTF-8: {}", what, e)))
}

// =============================================================================
// Responses
// =============================================================================

/// Encode a response to bytes
pub fn encode_response(response: &Response) -> Bytes {
    let payload = response.payload.as_deref().unwrap_or("");
    encode_frame(response.status as u8, payload.as_bytes())
}

/// Decode a response from a complete frame
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (tag, payload) = split_frame(bytes)?;
    response_from_payload(tag, payload)
}

fn response_from_payload(tag: u8, payload: &[u8]) -> Result<Response> {
    let status = Status::try_from(tag)?;
    let payload = if payload.is_empty() {
        None
    } else {
        Some(utf8(payload, "payload")?)
    };
    Ok(Response { status, payload })
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    let (tag, payload) = read_frame(reader)?;
    command_from_payload(tag, &payload)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    writer.write_all(&encode_command(command))?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let (tag, payload) = read_frame(reader)?;
    response_from_payload(tag, &payload)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    writer.write_all(&encode_response(response))?;
    writer.flush()?;
    Ok(())
}
