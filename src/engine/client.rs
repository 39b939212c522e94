//! Engine socket connection: opens the event stream and issues restart requests.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
#[cfg(unix)]
use tokio::net::UnixStream;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::engine::framer::ChunkedFramer;
use crate::error::{Result, WatchdogError};

const READ_BUF_SIZE: usize = 4096;

/// Either end of the engine socket: a local IPC path or a remote TCP host:port.
#[derive(Debug, Clone)]
pub enum SocketTarget {
    Ipc(String),
    Tcp { host: String, port: u16 },
}

impl SocketTarget {
    /// Parse a `ipc://<path>` or `tcp://<host>:<port>` URL.
    pub fn parse(url: &str) -> Result<Self> {
        let parsed = url::Url::parse(url)
            .map_err(|e| WatchdogError::Config(format!("invalid socket-url '{url}': {e}")))?;

        match parsed.scheme() {
            "ipc" => {
                // urlparse keeps the path component; host is absent for ipc:// URLs.
                let path = if !parsed.path().is_empty() {
                    parsed.path().to_string()
                } else {
                    parsed
                        .host_str()
                        .map(|h| format!("/{h}"))
                        .ok_or_else(|| WatchdogError::Config(format!("invalid ipc url: {url}")))?
                };
                Ok(SocketTarget::Ipc(path))
            }
            "tcp" => {
                let host = parsed
                    .host_str()
                    .ok_or_else(|| WatchdogError::Config(format!("missing host in {url}")))?
                    .to_string();
                let port = parsed
                    .port()
                    .ok_or_else(|| WatchdogError::Config(format!("missing port in {url}")))?;
                Ok(SocketTarget::Tcp { host, port })
            }
            other => Err(WatchdogError::Config(format!(
                "unknown socket scheme: {other}"
            ))),
        }
    }
}

/// A live connection to the engine socket, generic over unix/tcp transport.
enum Connection {
    #[cfg(unix)]
    Unix(UnixStream),
    Tcp(TcpStream),
}

impl Connection {
    async fn connect(target: &SocketTarget) -> Result<(Self, String)> {
        match target {
            #[cfg(unix)]
            SocketTarget::Ipc(path) => {
                let stream = UnixStream::connect(path).await.map_err(|e| {
                    WatchdogError::Config(format!("cannot connect to ipc socket {path}: {e}"))
                })?;
                Ok((Connection::Unix(stream), "localhost".to_string()))
            }
            #[cfg(not(unix))]
            SocketTarget::Ipc(path) => Err(WatchdogError::Config(format!(
                "ipc sockets are not supported on this platform: {path}"
            ))),
            SocketTarget::Tcp { host, port } => {
                let stream = TcpStream::connect((host.as_str(), *port))
                    .await
                    .map_err(|e| {
                        WatchdogError::Config(format!(
                            "cannot connect to tcp socket {host}:{port}: {e}"
                        ))
                    })?;
                let hostname = local_hostname();
                Ok((Connection::Tcp(stream), hostname))
            }
        }
    }

    async fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        let res = match self {
            #[cfg(unix)]
            Connection::Unix(s) => s.write_all(buf).await,
            Connection::Tcp(s) => s.write_all(buf).await,
        };
        res.map_err(|e| WatchdogError::Protocol(format!("write failed: {e}")))
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let res = match self {
            #[cfg(unix)]
            Connection::Unix(s) => s.read(buf).await,
            Connection::Tcp(s) => s.read(buf).await,
        };
        res.map_err(|e| WatchdogError::Protocol(format!("read failed: {e}")))
    }
}

fn local_hostname() -> String {
    hostname_from_env().unwrap_or_else(|| "localhost".to_string())
}

fn hostname_from_env() -> Option<String> {
    std::process::Command::new("hostname")
        .output()
        .ok()
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Reads bytes one small chunk at a time until `\r\n\r\n` is seen, returning
/// the header text and any payload bytes that arrived past it.
async fn read_http_header(conn: &mut Connection) -> Result<(String, Vec<u8>)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; READ_BUF_SIZE];

    loop {
        let n = conn.read(&mut chunk).await?;
        if n == 0 {
            return Err(WatchdogError::StreamClosed);
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(pos) = find_subslice(&buf, b"\r\n\r\n") {
            let header = String::from_utf8_lossy(&buf[..pos]).to_string();
            let rest = buf[pos + 4..].to_vec();
            return Ok((header, rest));
        }
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Parse the status line of an HTTP response header, e.g. `HTTP/1.1 200 OK`.
fn header_status(header: &str) -> Result<(u16, String)> {
    let status_line = header.lines().next().unwrap_or_default();
    let mut fields = status_line.splitn(3, ' ');
    let _version = fields.next();
    let code = fields
        .next()
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or_else(|| WatchdogError::Protocol(format!("bad status line: {status_line}")))?;
    let reason = fields.next().unwrap_or("").to_string();
    Ok((code, reason))
}

/// Thin client over the engine's raw HTTP-over-socket protocol.
pub struct EngineClient {
    target: SocketTarget,
}

impl EngineClient {
    pub fn new(target: SocketTarget) -> Self {
        Self { target }
    }

    /// Open the `/events` stream. Returns the live connection and framer,
    /// having already validated the `200 OK` response.
    pub async fn open_event_stream(&self) -> Result<EventStream> {
        let (mut conn, hostname) = Connection::connect(&self.target).await?;
        let request = format!("GET /events HTTP/1.1\nHost: {hostname}\n\n");
        conn.write_all(request.as_bytes()).await?;

        let (header, leftover) = read_http_header(&mut conn).await?;
        let (status, reason) = header_status(&header)?;
        if status != 200 {
            return Err(WatchdogError::Protocol(format!(
                "bad HTTP status opening event stream: {status} {reason}"
            )));
        }

        let mut framer = ChunkedFramer::new();
        let initial_frames = framer.feed(&leftover);

        Ok(EventStream {
            conn,
            framer,
            pending: initial_frames.into(),
        })
    }

    /// Issue a restart request for `container_id` and wait for `204 No Content`.
    pub async fn restart(&self, container_id: &str) -> Result<()> {
        let (mut conn, hostname) = Connection::connect(&self.target).await?;
        let request =
            format!("POST /containers/{container_id}/restart?t=5 HTTP/1.1\nHost: {hostname}\n\n");
        conn.write_all(request.as_bytes()).await?;

        let (header, _) = read_http_header(&mut conn).await?;
        let (status, reason) = header_status(&header)?;
        if status != 204 {
            return Err(WatchdogError::Protocol(format!(
                "bad HTTP status restarting {container_id}: {status} {reason}"
            )));
        }
        debug!(container_id, "restart request acknowledged by engine");
        Ok(())
    }
}

/// A decoded stream of raw JSON event objects from the engine.
pub struct EventStream {
    conn: Connection,
    framer: ChunkedFramer,
    pending: std::collections::VecDeque<Vec<u8>>,
}

impl EventStream {
    /// Fetch the next decoded JSON event, blocking on socket reads as needed.
    /// Returns `Ok(None)` only if the stream cleanly terminated via a
    /// zero-length chunk; a closed socket surfaces as `StreamClosed`.
    pub async fn next_raw(&mut self) -> Result<Option<serde_json::Value>> {
        loop {
            if let Some(payload) = self.pending.pop_front() {
                match parse_payload(&payload) {
                    Ok(value) => return Ok(Some(value)),
                    Err(WatchdogError::MalformedEvent(_)) => continue,
                    Err(e) => return Err(e),
                }
            }

            if self.framer.is_finished() {
                return Ok(None);
            }

            let mut buf = [0u8; READ_BUF_SIZE];
            let n = self.conn.read(&mut buf).await?;
            if n == 0 {
                return Err(WatchdogError::StreamClosed);
            }

            let frames = self.framer.feed(&buf[..n]);
            self.pending.extend(frames);
        }
    }
}

fn parse_payload(payload: &[u8]) -> Result<serde_json::Value> {
    serde_json::from_slice(payload).map_err(|e| {
        warn!(error = %e, "dropping malformed event frame");
        WatchdogError::MalformedEvent(e.to_string())
    })
}

impl crate::policy::Restarter for EngineClient {
    async fn restart(&self, container_id: &str) -> Result<()> {
        EngineClient::restart(self, container_id).await
    }
}
