//! Envelope encoding and framing.
//!
//! Every envelope travels as one self-delimiting frame: a 4-byte big-endian
//! length prefix followed by the UTF-8 JSON encoding of the envelope.
//!
//! ```text
//! [u32 BE: len][UTF-8 JSON bytes of len]
//! ```

use crate::config::WireConfig;
use crate::envelope::{InvocationRequest, InvocationResponse, Outcome};
use crate::error::{CarmineError, Result};
use crate::value::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Encode a request into a complete frame.
pub fn encode_request(request: &InvocationRequest) -> Result<Vec<u8>> {
    request
        .arguments()
        .iter()
        .chain(request.context().iter().map(|(_, value)| value))
        .try_for_each(Value::ensure_encodable)?;
    encode(request)
}

/// Decode a request from a complete frame.
pub fn decode_request(bytes: &[u8]) -> Result<InvocationRequest> {
    decode(bytes)
}

/// Encode a response into a complete frame.
pub fn encode_response(response: &InvocationResponse) -> Result<Vec<u8>> {
    match response.outcome() {
        Outcome::Success { result } => result.ensure_encodable()?,
        Outcome::Failure { failure } => {
            if let Some(detail) = &failure.detail {
                detail.ensure_encodable()?;
            }
        }
    }
    response
        .context()
        .iter()
        .try_for_each(|(_, value)| value.ensure_encodable())?;
    encode(response)
}

/// Decode a response from a complete frame.
pub fn decode_response(bytes: &[u8]) -> Result<InvocationResponse> {
    decode(bytes)
}

fn encode<T: Serialize>(envelope: &T) -> Result<Vec<u8>> {
    let payload = serde_json::to_vec(envelope).map_err(|e| CarmineError::Encode {
        message: e.to_string(),
    })?;
    if payload.len() > WireConfig::MAX_MESSAGE_SIZE {
        return Err(CarmineError::FrameTooLarge {
            size: payload.len(),
            max: WireConfig::MAX_MESSAGE_SIZE,
        });
    }

    let mut frame = Vec::with_capacity(WireConfig::FRAME_HEADER_LEN + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let payload = unframe(bytes)?;
    Ok(serde_json::from_slice(payload)?)
}

/// Validate the length prefix and return the payload it announces.
fn unframe(bytes: &[u8]) -> Result<&[u8]> {
    if bytes.len() < WireConfig::FRAME_HEADER_LEN {
        return Err(CarmineError::Decode {
            message: format!("frame of {} bytes is shorter than its header", bytes.len()),
        });
    }

    let (header, payload) = bytes.split_at(WireConfig::FRAME_HEADER_LEN);
    let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;

    if len > WireConfig::MAX_MESSAGE_SIZE {
        return Err(CarmineError::FrameTooLarge {
            size: len,
            max: WireConfig::MAX_MESSAGE_SIZE,
        });
    }
    if payload.len() != len {
        return Err(CarmineError::Decode {
            message: format!(
                "frame announces {} bytes but carries {}",
                len,
                payload.len()
            ),
        });
    }

    Ok(payload)
}

/// Read one frame from an async reader, header included.
///
/// Returns `None` on clean EOF before any byte of the header arrived. A
/// stream that ends inside the header is a decode error.
pub async fn read_frame<R: AsyncReadExt + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; WireConfig::FRAME_HEADER_LEN];
    let mut filled = 0;
    while filled < len_buf.len() {
        match reader.read(&mut len_buf[filled..]).await? {
            0 if filled == 0 => return Ok(None),
            0 => {
                return Err(CarmineError::Decode {
                    message: format!(
                        "stream ended after {} of {} header bytes",
                        filled,
                        WireConfig::FRAME_HEADER_LEN
                    ),
                })
            }
            n => filled += n,
        }
    }

    let len = u32::from_be_bytes(len_buf) as usize;

    if len > WireConfig::MAX_MESSAGE_SIZE {
        return Err(CarmineError::FrameTooLarge {
            size: len,
            max: WireConfig::MAX_MESSAGE_SIZE,
        });
    }

    let mut frame = vec![0u8; WireConfig::FRAME_HEADER_LEN + len];
    frame[..WireConfig::FRAME_HEADER_LEN].copy_from_slice(&len_buf);
    reader
        .read_exact(&mut frame[WireConfig::FRAME_HEADER_LEN..])
        .await?;

    Ok(Some(frame))
}

/// Write an already framed envelope to an async writer and flush it.
pub async fn write_frame<W: AsyncWriteExt + Unpin>(writer: &mut W, frame: &[u8]) -> Result<()> {
    writer.write_all(frame).await?;
    writer.flush().await?;
    Ok(())
}
