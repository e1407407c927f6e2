// Primary prober: Minecraft Server List Ping over a raw TCP connection.
//
// The exchange is three varint-length-prefixed frames: a handshake
// (protocol version, address, port, next state 1), an empty status
// request, and a status response whose payload is a length-prefixed
// JSON document.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::probe::{ProbeOutcome, Prober};
use crate::status::{ServerStatus, StatusSource};

/// Handshake `next state` value requesting the status flow.
const NEXT_STATE_STATUS: i32 = 1;
/// Protocol version -1 asks the server to answer regardless of version.
const PROTOCOL_VERSION: i32 = -1;
/// Both the handshake and the status response use packet id 0.
const PACKET_STATUS: i32 = 0x00;
/// Upper bound on an accepted frame; status responses are a few KiB.
const MAX_FRAME_LEN: i32 = 1024 * 1024;

#[derive(Debug, thiserror::Error)]
enum PingError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("varint longer than 5 bytes")]
    VarIntTooLong,
    #[error("frame length {0} out of range")]
    BadFrameLength(i32),
    #[error("truncated frame")]
    Truncated,
    #[error("unexpected packet id {0}")]
    UnexpectedPacket(i32),
    #[error("status payload is not valid JSON: {0}")]
    BadJson(#[from] serde_json::Error),
}

// Raw JSON shape of the status response. Servers disagree on whether
// `description` is a string or a chat object, so it stays a Value
// until normalization.
#[derive(Debug, Deserialize)]
struct RawStatus {
    #[serde(default)]
    description: Option<serde_json::Value>,
    #[serde(default)]
    players: Option<RawPlayers>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPlayers {
    online: Option<u32>,
    max: Option<u32>,
    sample: Option<Vec<RawSampleEntry>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSampleEntry {
    name: Option<String>,
}

/// Direct Server List Ping against the game port.
pub struct PingProber {
    host: String,
    port: u16,
    timeout: Duration,
}

impl PingProber {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }

    async fn query(&self) -> Result<ServerStatus, PingError> {
        let mut stream = TcpStream::connect((self.host.as_str(), self.port)).await?;

        stream
            .write_all(&frame(PACKET_STATUS, &handshake_payload(&self.host, self.port)))
            .await?;
        stream.write_all(&frame(PACKET_STATUS, &[])).await?;
        stream.flush().await?;

        let (packet_id, payload) = read_frame(&mut stream).await?;
        if packet_id != PACKET_STATUS {
            return Err(PingError::UnexpectedPacket(packet_id));
        }

        let json = read_prefixed_string(&payload)?;
        let raw: RawStatus = serde_json::from_slice(json)?;
        Ok(normalize(raw))
    }
}

#[async_trait]
impl Prober for PingProber {
    fn name(&self) -> &'static str {
        "ping"
    }

    async fn probe(&self) -> ProbeOutcome {
        match tokio::time::timeout(self.timeout, self.query()).await {
            Ok(Ok(status)) => ProbeOutcome::Usable(status),
            Ok(Err(e)) => ProbeOutcome::unusable(format!("ping failed: {e}")),
            Err(_) => {
                ProbeOutcome::unusable(format!("ping timed out after {:?}", self.timeout))
            }
        }
    }
}

/// A completed ping proves liveness even when the sample list is hidden,
/// so the result is always online.
fn normalize(raw: RawStatus) -> ServerStatus {
    let motd = raw.description.as_ref().and_then(description_text);
    let players = raw.players.unwrap_or_default();
    let names = players
        .sample
        .unwrap_or_default()
        .into_iter()
        .filter_map(|entry| entry.name)
        .collect();
    ServerStatus::online(StatusSource::Primary, names, players.online, players.max, motd)
}

/// Extract display text from a `description` that is either a plain
/// string or a chat object with a `text` field.
fn description_text(value: &serde_json::Value) -> Option<String> {
    let text = match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Object(map) => map.get("text")?.as_str()?.to_string(),
        _ => return None,
    };
    let text = text.trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

// ── Wire framing ─────────────────────────────────────────────────────

fn write_varint(buf: &mut Vec<u8>, value: i32) {
    let mut v = value as u32;
    loop {
        let byte = (v & 0x7f) as u8;
        v >>= 7;
        if v == 0 {
            buf.push(byte);
            break;
        }
        buf.push(byte | 0x80);
    }
}

/// Wrap a packet id and payload in a length-prefixed frame.
fn frame(packet_id: i32, payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(payload.len() + 5);
    write_varint(&mut body, packet_id);
    body.extend_from_slice(payload);

    let mut out = Vec::with_capacity(body.len() + 5);
    write_varint(&mut out, body.len() as i32);
    out.extend_from_slice(&body);
    out
}

fn handshake_payload(host: &str, port: u16) -> Vec<u8> {
    let mut payload = Vec::new();
    write_varint(&mut payload, PROTOCOL_VERSION);
    write_varint(&mut payload, host.len() as i32);
    payload.extend_from_slice(host.as_bytes());
    payload.extend_from_slice(&port.to_be_bytes());
    write_varint(&mut payload, NEXT_STATE_STATUS);
    payload
}

async fn read_varint<R: AsyncRead + Unpin>(reader: &mut R) -> Result<i32, PingError> {
    let mut value: u32 = 0;
    for i in 0..5 {
        let byte = reader.read_u8().await?;
        value |= u32::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value as i32);
        }
    }
    Err(PingError::VarIntTooLong)
}

/// Read one frame and split it into packet id and payload.
async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<(i32, Vec<u8>), PingError> {
    let len = read_varint(reader).await?;
    if len <= 0 || len > MAX_FRAME_LEN {
        return Err(PingError::BadFrameLength(len));
    }
    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body).await?;

    let (packet_id, consumed) = read_varint_slice(&body)?;
    Ok((packet_id, body[consumed..].to_vec()))
}

fn read_varint_slice(buf: &[u8]) -> Result<(i32, usize), PingError> {
    let mut value: u32 = 0;
    for (i, byte) in buf.iter().take(5).enumerate() {
        value |= u32::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value as i32, i + 1));
        }
    }
    if buf.len() < 5 {
        Err(PingError::Truncated)
    } else {
        Err(PingError::VarIntTooLong)
    }
}

/// Decode a varint-length-prefixed UTF-8 string from a packet payload.
fn read_prefixed_string(payload: &[u8]) -> Result<&[u8], PingError> {
    let (len, consumed) = read_varint_slice(payload)?;
    if len < 0 {
        return Err(PingError::BadFrameLength(len));
    }
    let end = consumed
        .checked_add(len as usize)
        .ok_or(PingError::Truncated)?;
    payload.get(consumed..end).ok_or(PingError::Truncated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn varint_bytes(value: i32) -> Vec<u8> {
        let mut buf = Vec::new();
        write_varint(&mut buf, value);
        buf
    }

    #[test]
    fn test_varint_roundtrip() {
        for value in [0, 1, 127, 128, 255, 300, 25565, i32::MAX, -1] {
            let bytes = varint_bytes(value);
            let (decoded, consumed) = read_varint_slice(&bytes).unwrap();
            assert_eq!(decoded, value, "value {value}");
            assert_eq!(consumed, bytes.len());
        }
    }

    #[test]
    fn test_varint_known_encodings() {
        assert_eq!(varint_bytes(0), vec![0x00]);
        assert_eq!(varint_bytes(1), vec![0x01]);
        assert_eq!(varint_bytes(128), vec![0x80, 0x01]);
        assert_eq!(varint_bytes(255), vec![0xff, 0x01]);
        // -1 encodes as the full five-byte form
        assert_eq!(varint_bytes(-1), vec![0xff, 0xff, 0xff, 0xff, 0x0f]);
    }

    #[test]
    fn test_varint_slice_rejects_runaway() {
        let err = read_varint_slice(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x80]).unwrap_err();
        assert!(matches!(err, PingError::VarIntTooLong));
    }

    #[tokio::test]
    async fn test_read_frame_roundtrip() {
        let payload = b"hello".to_vec();
        let framed = frame(0x00, &payload);
        let mut cursor = Cursor::new(framed);
        let (packet_id, body) = read_frame(&mut cursor).await.unwrap();
        assert_eq!(packet_id, 0x00);
        assert_eq!(body, payload);
    }

    #[tokio::test]
    async fn test_read_frame_rejects_oversized_length() {
        let mut bytes = Vec::new();
        write_varint(&mut bytes, MAX_FRAME_LEN + 1);
        let mut cursor = Cursor::new(bytes);
        let err = read_frame(&mut cursor).await.unwrap_err();
        assert!(matches!(err, PingError::BadFrameLength(_)));
    }

    #[test]
    fn test_prefixed_string_decodes() {
        let mut payload = Vec::new();
        write_varint(&mut payload, 4);
        payload.extend_from_slice(b"{},:");
        assert_eq!(read_prefixed_string(&payload).unwrap(), b"{},:");
    }

    #[test]
    fn test_prefixed_string_rejects_truncation() {
        let mut payload = Vec::new();
        write_varint(&mut payload, 10);
        payload.extend_from_slice(b"short");
        assert!(matches!(
            read_prefixed_string(&payload).unwrap_err(),
            PingError::Truncated
        ));
    }

    #[test]
    fn test_normalize_string_description() {
        let raw: RawStatus = serde_json::from_str(
            r#"{"description":"A Minecraft Server","players":{"online":2,"max":20,"sample":[{"name":"Alex"},{"name":"Steve"}]}}"#,
        )
        .unwrap();
        let status = normalize(raw);
        assert!(status.online);
        assert_eq!(status.source, StatusSource::Primary);
        assert_eq!(status.motd.as_deref(), Some("A Minecraft Server"));
        assert_eq!(status.player_names, vec!["Alex", "Steve"]);
        assert_eq!(status.player_count, Some(2));
        assert_eq!(status.player_max, Some(20));
    }

    #[test]
    fn test_normalize_object_description_and_hidden_sample() {
        let raw: RawStatus = serde_json::from_str(
            r#"{"description":{"text":"Termite SMP"},"players":{"online":3,"max":10}}"#,
        )
        .unwrap();
        let status = normalize(raw);
        assert!(status.online);
        assert_eq!(status.motd.as_deref(), Some("Termite SMP"));
        assert!(status.player_names.is_empty());
        assert_eq!(status.player_count, Some(3));
    }

    #[test]
    fn test_normalize_empty_body_is_online_with_defaults() {
        let raw: RawStatus = serde_json::from_str("{}").unwrap();
        let status = normalize(raw);
        assert!(status.online);
        assert_eq!(status.motd, None);
        assert_eq!(status.player_count, None);
    }

    #[test]
    fn test_handshake_payload_layout() {
        let payload = handshake_payload("mc.example.org", 25565);
        // protocol -1 (5 bytes), len-prefixed host, big-endian port, state 1
        assert_eq!(&payload[..5], &[0xff, 0xff, 0xff, 0xff, 0x0f]);
        assert_eq!(payload[5], 14);
        assert_eq!(&payload[6..20], b"mc.example.org");
        assert_eq!(&payload[20..22], &25565u16.to_be_bytes());
        assert_eq!(payload[22], NEXT_STATE_STATUS as u8);
        assert_eq!(payload.len(), 23);
    }
}
