//! TCP status probe.
//!
//! One probe opens a connection, sends the handshake and the status request,
//! then reads the length-prefixed response. Connect and the exchange are each
//! bounded by the probe timeout; the connection is dropped on every path.

use async_trait::async_trait;
use log::debug;
use shared::status::check_response_size;
use shared::{
    decode_varint, handshake_packet, parse_status_response, status_request_packet, ProbeError,
    StatusSample, StreamSource,
};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Source of status samples for a check cycle.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self) -> Result<StatusSample, ProbeError>;
}

/// Probes a fixed `host:port` over TCP.
#[derive(Debug, Clone)]
pub struct TcpProber {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
}

impl TcpProber {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self) -> Result<StatusSample, ProbeError> {
        probe(&self.host, self.port, self.timeout).await
    }
}

/// Queries `host:port` once and returns what the server reported.
pub async fn probe(host: &str, port: u16, limit: Duration) -> Result<StatusSample, ProbeError> {
    let mut stream = match timeout(limit, TcpStream::connect((host, port))).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => return Err(ProbeError::Unreachable(format!("{}:{}: {}", host, port, e))),
        Err(_) => {
            return Err(ProbeError::Unreachable(format!(
                "{}:{}: connect timed out after {:?}",
                host, port, limit
            )))
        }
    };
    debug!("Connected to {}:{}", host, port);

    match timeout(limit, exchange(&mut stream, host, port)).await {
        Ok(result) => result,
        Err(_) => Err(ProbeError::TimedOut(limit)),
    }
}

/// Runs the handshake/request/response exchange over an open connection.
pub async fn exchange<S>(
    stream: &mut S,
    host: &str,
    port: u16,
) -> Result<StatusSample, ProbeError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut request = handshake_packet(host, port);
    request.extend_from_slice(&status_request_packet());
    stream
        .write_all(&request)
        .await
        .map_err(|e| ProbeError::Unreachable(format!("failed to send request: {}", e)))?;
    stream
        .flush()
        .await
        .map_err(|e| ProbeError::Unreachable(format!("failed to send request: {}", e)))?;

    let declared = decode_varint(&mut StreamSource::new(stream)).await?;
    let length = check_response_size(declared)?;

    let body = read_body(stream, length).await?;
    debug!("Received {} byte status response", body.len());

    parse_status_response(&body).await
}

/// Reads exactly `length` bytes, tolerating short reads.
async fn read_body<R>(stream: &mut R, length: usize) -> Result<Vec<u8>, ProbeError>
where
    R: AsyncRead + Unpin,
{
    let mut body = vec![0u8; length];
    let mut received = 0;

    while received < length {
        match stream.read(&mut body[received..]).await {
            Ok(0) | Err(_) => {
                return Err(ProbeError::TruncatedResponse {
                    expected: length,
                    received,
                })
            }
            Ok(n) => received += n,
        }
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::encode_varint;
    use tokio_test::io::Builder;

    const HOST: &str = "mc.local";
    const PORT: u16 = 25565;

    fn request_bytes() -> Vec<u8> {
        let mut request = handshake_packet(HOST, PORT);
        request.extend_from_slice(&status_request_packet());
        request
    }

    fn response_bytes(json: &str) -> Vec<u8> {
        let mut body = Vec::new();
        encode_varint(0, &mut body);
        encode_varint(json.len() as i32, &mut body);
        body.extend_from_slice(json.as_bytes());

        let mut response = Vec::new();
        encode_varint(body.len() as i32, &mut response);
        response.extend_from_slice(&body);
        response
    }

    const STATUS_JSON: &str =
        r#"{"version":{"name":"1.20.4"},"players":{"online":1,"sample":[{"name":"Alice"}]}}"#;

    #[tokio::test]
    async fn test_exchange_reads_status() {
        let mut stream = Builder::new()
            .write(&request_bytes())
            .read(&response_bytes(STATUS_JSON))
            .build();

        let sample = exchange(&mut stream, HOST, PORT).await.unwrap();

        assert!(sample.reachable);
        assert_eq!(sample.reported_count, Some(1));
        assert_eq!(sample.sampled_names, vec!["Alice"]);
    }

    #[tokio::test]
    async fn test_exchange_handles_partial_reads() {
        let response = response_bytes(STATUS_JSON);
        let mut builder = Builder::new();
        builder.write(&request_bytes());
        for chunk in response.chunks(7) {
            builder.read(chunk);
        }
        let mut stream = builder.build();

        let sample = exchange(&mut stream, HOST, PORT).await.unwrap();

        assert_eq!(sample.sampled_names, vec!["Alice"]);
    }

    #[tokio::test]
    async fn test_exchange_rejects_oversized_length() {
        let mut declared = Vec::new();
        encode_varint(70000, &mut declared);

        // Only the length prefix is scripted; the body must never be read
        let mut stream = Builder::new()
            .write(&request_bytes())
            .read(&declared)
            .build();

        let err = exchange(&mut stream, HOST, PORT).await.unwrap_err();
        assert!(matches!(err, ProbeError::InvalidResponseSize(70000)));
    }

    #[tokio::test]
    async fn test_exchange_rejects_zero_length() {
        let mut stream = Builder::new()
            .write(&request_bytes())
            .read(&[0x00])
            .build();

        let err = exchange(&mut stream, HOST, PORT).await.unwrap_err();
        assert!(matches!(err, ProbeError::InvalidResponseSize(0)));
    }

    #[tokio::test]
    async fn test_exchange_truncated_body() {
        let response = response_bytes(STATUS_JSON);
        let cut = response.len() - 10;

        let mut stream = Builder::new()
            .write(&request_bytes())
            .read(&response[..cut])
            .build();

        let err = exchange(&mut stream, HOST, PORT).await.unwrap_err();
        match err {
            ProbeError::TruncatedResponse { expected, received } => {
                assert_eq!(expected, response.len() - 1);
                assert_eq!(received, cut - 1);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_exchange_connection_closed_before_length() {
        let mut stream = Builder::new().write(&request_bytes()).build();

        let err = exchange(&mut stream, HOST, PORT).await.unwrap_err();
        assert!(matches!(err, ProbeError::MalformedVarint(_)));
    }

    #[tokio::test]
    async fn test_exchange_invalid_version() {
        let mut stream = Builder::new()
            .write(&request_bytes())
            .read(&response_bytes(r#"{"version":{"name":""},"players":{"online":3}}"#))
            .build();

        let err = exchange(&mut stream, HOST, PORT).await.unwrap_err();
        assert!(matches!(err, ProbeError::InvalidVersionField));
    }

    #[tokio::test]
    async fn test_probe_refused_connection_is_unreachable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = probe("127.0.0.1", port, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Unreachable(_)));
    }

    #[tokio::test]
    async fn test_probe_silent_server_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 256];
            // Swallow the request, never answer
            let _ = socket.read(&mut buf).await;
            tokio::time::sleep(Duration::from_secs(2)).await;
        });

        let err = probe("127.0.0.1", port, Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::TimedOut(_)));

        server.abort();
    }
}
