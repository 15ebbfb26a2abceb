//! Status ping framing: the handshake and status-request packets a probe
//! sends, and parsing of the length-prefixed JSON response it gets back.

use crate::error::ProbeError;
use crate::varint::{decode_varint, encode_varint, varint_len, BufferSource};
use crate::StatusSample;
use serde_json::Value;

/// Protocol version advertised in the handshake.
pub const PROTOCOL_VERSION: i32 = 47;

/// Message id shared by the handshake and the status request.
pub const HANDSHAKE_ID: i32 = 0;
pub const STATUS_REQUEST_ID: i32 = 0;

/// Next-state selector asking the server for its status.
pub const STATUS_STATE: i32 = 1;

/// Sanity ceiling on the declared response length, in bytes.
pub const MAX_RESPONSE_SIZE: i32 = 65535;

/// Prefixes `payload` with its varint-encoded length.
pub fn frame(payload: &[u8]) -> Vec<u8> {
    let length = payload.len() as i32;
    let mut packet = Vec::with_capacity(varint_len(length) + payload.len());
    encode_varint(length, &mut packet);
    packet.extend_from_slice(payload);
    packet
}

/// Framed handshake announcing `host:port` and requesting the status state.
pub fn handshake_packet(host: &str, port: u16) -> Vec<u8> {
    let host = host.as_bytes();
    let mut payload = Vec::with_capacity(host.len() + 16);

    encode_varint(HANDSHAKE_ID, &mut payload);
    encode_varint(PROTOCOL_VERSION, &mut payload);
    encode_varint(host.len() as i32, &mut payload);
    payload.extend_from_slice(host);
    payload.extend_from_slice(&port.to_be_bytes());
    encode_varint(STATUS_STATE, &mut payload);

    frame(&payload)
}

/// Framed status request: a lone message id.
pub fn status_request_packet() -> Vec<u8> {
    let mut payload = Vec::with_capacity(1);
    encode_varint(STATUS_REQUEST_ID, &mut payload);
    frame(&payload)
}

/// Validates a declared response length and returns it as a byte count.
pub fn check_response_size(declared: i32) -> Result<usize, ProbeError> {
    if declared <= 0 || declared > MAX_RESPONSE_SIZE {
        return Err(ProbeError::InvalidResponseSize(declared));
    }
    Ok(declared as usize)
}

/// Parses a full response body: message id, JSON length, JSON text.
pub async fn parse_status_response(body: &[u8]) -> Result<StatusSample, ProbeError> {
    let mut source = BufferSource::new(body);

    let _message_id = decode_varint(&mut source).await?;
    let json_len = decode_varint(&mut source).await?;

    let available = source.remaining();
    let json = usize::try_from(json_len)
        .ok()
        .and_then(|len| source.take(len))
        .ok_or(ProbeError::TruncatedResponse {
            expected: json_len.max(0) as usize,
            received: available,
        })?;

    parse_status_json(json)
}

/// Extracts a [`StatusSample`] from the status JSON document.
///
/// `version.name` must be a non-empty string. Player fields are optional and
/// lenient: a count that is not a non-negative number is dropped, and sample
/// entries without a string `name` are skipped.
pub fn parse_status_json(json: &[u8]) -> Result<StatusSample, ProbeError> {
    let document: Value = serde_json::from_slice(json)?;

    let version_name = document
        .get("version")
        .and_then(|v| v.get("name"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    if version_name.is_empty() {
        return Err(ProbeError::InvalidVersionField);
    }

    let players = document.get("players");

    let reported_count = players
        .and_then(|p| p.get("online"))
        .and_then(player_count);

    let sampled_names = players
        .and_then(|p| p.get("sample"))
        .and_then(Value::as_array)
        .map(|sample| {
            sample
                .iter()
                .filter_map(|entry| entry.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(StatusSample::new(reported_count, sampled_names))
}

fn player_count(value: &Value) -> Option<u32> {
    if let Some(count) = value.as_u64() {
        return u32::try_from(count).ok();
    }
    value
        .as_f64()
        .filter(|count| *count >= 0.0 && *count <= u32::MAX as f64)
        .map(|count| count as u32)
}
