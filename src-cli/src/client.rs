//! IPC client for communicating with assistlens-service.

use assistlens_common::ipc::{
    get_socket_path, read_json, write_json, IpcError, Request, Response,
};
use assistlens_common::SERVICE_CHANNEL;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::exit_codes::ExitCode;

/// Error type for service client operations.
#[derive(Debug, Clone)]
pub enum ClientError {
    /// Service is not running or not connected
    NotConnected,
    /// Connection to service failed
    ConnectionFailed(String),
    /// Failed to send request
    SendFailed(String),
    /// Failed to receive response
    ReceiveFailed(String),
    /// Service returned an error
    RemoteError(String),
    /// Something else answered on the socket
    WrongService(String),
    /// Request timed out
    Timeout,
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::NotConnected => write!(f, "Not connected to service"),
            ClientError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            ClientError::SendFailed(msg) => write!(f, "Send failed: {}", msg),
            ClientError::ReceiveFailed(msg) => write!(f, "Receive failed: {}", msg),
            ClientError::RemoteError(msg) => write!(f, "Service error: {}", msg),
            ClientError::WrongService(channel) => {
                write!(f, "Socket is served by {:?}, not {}", channel, SERVICE_CHANNEL)
            }
            ClientError::Timeout => write!(f, "Request timed out"),
        }
    }
}

impl std::error::Error for ClientError {}

impl ClientError {
    /// Convert to an appropriate exit code.
    pub fn to_exit_code(&self) -> ExitCode {
        match self {
            ClientError::NotConnected
            | ClientError::ConnectionFailed(_)
            | ClientError::SendFailed(_)
            | ClientError::ReceiveFailed(_)
            | ClientError::WrongService(_)
            | ClientError::Timeout => ExitCode::ServiceConnectionFailed,
            ClientError::RemoteError(msg) if msg.starts_with("Invalid request") => {
                ExitCode::InvalidArguments
            }
            ClientError::RemoteError(_) => ExitCode::GeneralError,
        }
    }
}

#[cfg(unix)]
type Stream = tokio::net::UnixStream;

/// Client for communicating with the Assist Lens service.
pub struct ServiceClient {
    #[cfg(unix)]
    connection: Mutex<Option<Stream>>,
    socket_path: PathBuf,
}

impl ServiceClient {
    /// Create a new service client.
    pub fn new() -> Self {
        Self::with_socket_path(get_socket_path())
    }

    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self {
            #[cfg(unix)]
            connection: Mutex::new(None),
            socket_path,
        }
    }

    /// Connect to the service.
    #[cfg(unix)]
    pub async fn connect(&self) -> Result<(), ClientError> {
        let mut conn = self.connection.lock().await;

        // Already connected?
        if conn.is_some() {
            return Ok(());
        }

        let stream = Stream::connect(&self.socket_path).await.map_err(|e| {
            ClientError::ConnectionFailed(format!(
                "Failed to connect to {}: {}",
                self.socket_path.display(),
                e
            ))
        })?;

        *conn = Some(stream);
        Ok(())
    }

    #[cfg(not(unix))]
    pub async fn connect(&self) -> Result<(), ClientError> {
        Err(ClientError::ConnectionFailed(
            "IPC transport is not supported on this platform".to_string(),
        ))
    }

    /// Send a request to the service and wait for a response.
    ///
    /// Pushed events that arrive ahead of the response are skipped.
    #[cfg(unix)]
    pub async fn request(&self, request: Request) -> Result<Response, ClientError> {
        self.connect().await?;

        let mut conn = self.connection.lock().await;
        let stream = conn.as_mut().ok_or(ClientError::NotConnected)?;

        write_json(&mut *stream, &request)
            .await
            .map_err(|e| ClientError::SendFailed(e.to_string()))?;

        let response = tokio::time::timeout(Duration::from_secs(30), async {
            loop {
                match read_json::<_, Response>(&mut *stream).await {
                    Ok(Response::Event { .. }) => continue,
                    other => break other,
                }
            }
        })
        .await
        .map_err(|_| ClientError::Timeout)?
        .map_err(receive_error)?;

        // Check for service error
        if let Response::Error { message } = &response {
            return Err(ClientError::RemoteError(message.clone()));
        }

        Ok(response)
    }

    #[cfg(not(unix))]
    pub async fn request(&self, _request: Request) -> Result<Response, ClientError> {
        Err(ClientError::NotConnected)
    }

    /// Read the next message pushed by the service.
    #[cfg(unix)]
    pub async fn next_message(&self) -> Result<Response, ClientError> {
        let mut conn = self.connection.lock().await;
        let stream = conn.as_mut().ok_or(ClientError::NotConnected)?;
        read_json(stream).await.map_err(receive_error)
    }

    #[cfg(not(unix))]
    pub async fn next_message(&self) -> Result<Response, ClientError> {
        Err(ClientError::NotConnected)
    }

    /// Wait for the service to become available.
    pub async fn wait_for_service(&self, timeout: Duration) -> Result<(), ClientError> {
        let start = std::time::Instant::now();
        let poll_interval = Duration::from_millis(100);

        while start.elapsed() < timeout {
            if self.socket_path.exists() && self.connect().await.is_ok() {
                return Ok(());
            }
            tokio::time::sleep(poll_interval).await;
        }

        Err(ClientError::Timeout)
    }

    /// Ping the service and check that it answers on the voice command channel.
    pub async fn verify_service(&self) -> Result<(), ClientError> {
        match self.request(Request::Ping).await? {
            Response::Pong { channel } if channel == SERVICE_CHANNEL => Ok(()),
            Response::Pong { channel } => Err(ClientError::WrongService(channel)),
            other => Err(ClientError::WrongService(format!("{:?}", other))),
        }
    }

    /// Connect to the service, spawning it if necessary.
    pub async fn connect_or_spawn(&self) -> Result<(), ClientError> {
        // First try to just connect
        if self.connect().await.is_ok() {
            return self.verify_service().await;
        }

        // Connection failed, try to spawn the service
        let service_path = Self::find_service_binary().map_err(|e| {
            ClientError::ConnectionFailed(format!("Cannot find service binary: {}", e))
        })?;

        std::process::Command::new(&service_path)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map_err(|e| {
                ClientError::ConnectionFailed(format!("Failed to spawn service: {}", e))
            })?;

        // Wait for service to be ready
        self.wait_for_service(Duration::from_secs(10)).await?;
        self.verify_service().await
    }

    /// Find the service binary path.
    fn find_service_binary() -> Result<PathBuf, String> {
        #[cfg(windows)]
        const SERVICE_BINARY: &str = "assistlens-service.exe";
        #[cfg(not(windows))]
        const SERVICE_BINARY: &str = "assistlens-service";

        // 1. Sibling binary (development or bundled)
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(dir) = exe_path.parent() {
                let path = dir.join(SERVICE_BINARY);
                if path.exists() {
                    return Ok(path);
                }
            }
        }

        // 2. In PATH
        which::which(SERVICE_BINARY).map_err(|_| format!("{} binary not found", SERVICE_BINARY))
    }
}

impl Default for ServiceClient {
    fn default() -> Self {
        Self::new()
    }
}

fn receive_error(e: IpcError) -> ClientError {
    match e {
        IpcError::ConnectionClosed => ClientError::NotConnected,
        other => ClientError::ReceiveFailed(other.to_string()),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use assistlens_common::ipc::EventPayload;
    use tokio::net::UnixListener;

    #[tokio::test]
    async fn test_request_skips_pushed_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.sock");
        let listener = UnixListener::bind(&path).unwrap();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let _: Request = read_json(&mut stream).await.unwrap();
            let event = Response::Event {
                event: EventPayload::Success {
                    value: "hello".to_string(),
                },
            };
            write_json(&mut stream, &event).await.unwrap();
            write_json(&mut stream, &Response::pong()).await.unwrap();
        });

        let client = ServiceClient::with_socket_path(path);
        let response = client.request(Request::Ping).await.unwrap();
        assert!(matches!(response, Response::Pong { .. }));
    }

    /// Answer one ping with the given channel name.
    fn serve_pong(listener: UnixListener, channel: &'static str) {
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let _: Request = read_json(&mut stream).await.unwrap();
            let pong = Response::Pong {
                channel: channel.to_string(),
            };
            write_json(&mut stream, &pong).await.unwrap();
        });
    }

    #[tokio::test]
    async fn test_handshake_accepts_voice_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.sock");
        serve_pong(UnixListener::bind(&path).unwrap(), SERVICE_CHANNEL);

        let client = ServiceClient::with_socket_path(path);
        client.connect_or_spawn().await.unwrap();
    }

    #[tokio::test]
    async fn test_handshake_rejects_other_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.sock");
        serve_pong(UnixListener::bind(&path).unwrap(), "com.example/other");

        let client = ServiceClient::with_socket_path(path);
        let err = client.connect_or_spawn().await.unwrap_err();
        assert!(matches!(err, ClientError::WrongService(ref c) if c == "com.example/other"));
        assert_eq!(err.to_exit_code(), ExitCode::ServiceConnectionFailed);
    }

    #[tokio::test]
    async fn test_remote_error_is_surfaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.sock");
        let listener = UnixListener::bind(&path).unwrap();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let _: Request = read_json(&mut stream).await.unwrap();
            write_json(&mut stream, &Response::error("Invalid request: bad name"))
                .await
                .unwrap();
        });

        let client = ServiceClient::with_socket_path(path);
        let err = client.request(Request::method_call("x")).await.unwrap_err();
        assert!(matches!(err, ClientError::RemoteError(_)));
        assert_eq!(err.to_exit_code(), ExitCode::InvalidArguments);
    }

    #[tokio::test]
    async fn test_missing_socket_fails_to_connect() {
        let dir = tempfile::tempdir().unwrap();
        let client = ServiceClient::with_socket_path(dir.path().join("absent.sock"));
        let err = client.connect().await.unwrap_err();
        assert_eq!(err.to_exit_code(), ExitCode::ServiceConnectionFailed);
    }
}
