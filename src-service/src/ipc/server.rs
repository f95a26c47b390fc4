//! IPC server with secure socket setup.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use assistlens_common::ipc::{read_json, write_json, IpcError, Request, Response};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use super::handlers::{handle_request, ServiceContext, Subscription};
use crate::error::ServiceError;

/// Socket file permissions (owner read/write only)
#[cfg(unix)]
const SOCKET_MODE: u32 = 0o600;

/// Socket directory permissions (owner read/write/execute only)
#[cfg(unix)]
const DIRECTORY_MODE: u32 = 0o700;

/// How often the accept loop checks the shutdown flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Bound listener type for this platform.
#[cfg(unix)]
pub type Listener = tokio::net::UnixListener;

/// Placeholder listener; binding always fails on this platform.
#[cfg(not(unix))]
pub struct Listener(());

/// Create socket directory with secure permissions.
#[cfg(unix)]
fn create_secure_socket_dir(socket_path: &Path) -> std::io::Result<()> {
    if let Some(socket_dir) = socket_path.parent() {
        std::fs::create_dir_all(socket_dir)?;
        std::fs::set_permissions(socket_dir, std::fs::Permissions::from_mode(DIRECTORY_MODE))?;
    }

    // Remove stale socket if exists
    if socket_path.exists() {
        std::fs::remove_file(socket_path)?;
    }

    Ok(())
}

/// Set socket file permissions after binding.
#[cfg(unix)]
fn secure_socket_file(socket_path: &Path) -> std::io::Result<()> {
    std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(SOCKET_MODE))?;

    let actual = std::fs::metadata(socket_path)?.permissions().mode() & 0o777;
    if actual != SOCKET_MODE {
        warn!("Socket mode is {:o}, expected {:o}", actual, SOCKET_MODE);
    }

    Ok(())
}

/// Create the socket directory, bind, and lock down the socket file.
#[cfg(unix)]
pub fn bind(socket_path: &Path) -> Result<Listener, ServiceError> {
    let transport = |source| ServiceError::Transport {
        path: socket_path.to_path_buf(),
        source,
    };

    create_secure_socket_dir(socket_path).map_err(transport)?;
    let listener = Listener::bind(socket_path).map_err(transport)?;
    secure_socket_file(socket_path).map_err(transport)?;

    info!("IPC server listening on {:?}", socket_path);
    Ok(listener)
}

#[cfg(not(unix))]
pub fn bind(_socket_path: &Path) -> Result<Listener, ServiceError> {
    Err(ServiceError::UnsupportedPlatform)
}

/// Remove the socket file left behind by [`bind`].
pub fn remove_socket(socket_path: &Path) {
    if socket_path.exists() {
        if let Err(e) = std::fs::remove_file(socket_path) {
            warn!("Failed to remove socket file: {}", e);
        } else {
            info!("Removed socket file: {:?}", socket_path);
        }
    }
}

/// Accept connections until `shutdown` is set.
#[cfg(unix)]
pub async fn run_server(listener: Listener, ctx: ServiceContext, shutdown: Arc<AtomicBool>) {
    let mut next_client: u64 = 0;

    loop {
        if shutdown.load(Ordering::SeqCst) {
            info!("Shutdown requested, stopping IPC server");
            break;
        }

        // Use select to allow checking shutdown flag periodically
        let accept_result = tokio::select! {
            result = listener.accept() => Some(result),
            _ = tokio::time::sleep(ACCEPT_POLL_INTERVAL) => None,
        };

        let stream = match accept_result {
            Some(Ok((stream, _))) => stream,
            Some(Err(e)) => {
                error!("Accept error: {}", e);
                continue;
            }
            None => continue,
        };

        next_client += 1;
        let peer = format!("client-{}", next_client);
        tokio::spawn(handle_client(stream, ctx.clone(), peer));
    }
}

#[cfg(not(unix))]
pub async fn run_server(_listener: Listener, _ctx: ServiceContext, _shutdown: Arc<AtomicBool>) {}

/// Serve one connection.
///
/// Requests are read on a separate task so a partially read frame is never
/// dropped while an event is being written.
pub(crate) async fn handle_client<S>(stream: S, ctx: ServiceContext, peer: String)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    info!("Client connected: {}", peer);

    let (mut reader, mut writer) = tokio::io::split(stream);
    let (request_tx, mut request_rx) = mpsc::channel::<Result<Request, IpcError>>(8);

    let reader_task = tokio::spawn(async move {
        loop {
            let result = read_json::<_, Request>(&mut reader).await;
            let fatal = matches!(&result, Err(e) if !matches!(e, IpcError::ParseError(_)));
            if request_tx.send(result).await.is_err() || fatal {
                break;
            }
        }
    });

    let mut subscription = Subscription::default();

    loop {
        let response = tokio::select! {
            incoming = request_rx.recv() => match incoming {
                Some(Ok(request)) => match request.validate() {
                    Ok(()) => handle_request(&ctx, request, &mut subscription).await,
                    Err(e) => {
                        warn!("Invalid request from {}: {}", peer, e);
                        Response::error(format!("Invalid request: {}", e))
                    }
                },
                Some(Err(IpcError::ParseError(e))) => {
                    warn!("Malformed request from {}: {}", peer, e);
                    Response::error(format!("Malformed request: {}", e))
                }
                Some(Err(IpcError::ConnectionClosed)) | None => {
                    info!("Client disconnected: {}", peer);
                    break;
                }
                Some(Err(e)) => {
                    error!("Error reading request from {}: {}", peer, e);
                    break;
                }
            },
            event = subscription.next_event() => match event {
                Some(event) => Response::Event { event },
                None => {
                    debug!("Event stream for {} superseded by another listener", peer);
                    subscription.clear();
                    continue;
                }
            },
        };

        if let Err(e) = write_json(&mut writer, &response).await {
            error!("Error writing response to {}: {}", peer, e);
            break;
        }
    }

    subscription.release(&ctx.events);
    reader_task.abort();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{CommandBridge, EventBridge};
    use crate::controller::{ControllerHandle, ControllerTask, ListeningController};
    use crate::recognizer::testing::FakeProvider;
    use crate::recognizer::RecognizerCallback;
    use assistlens_common::ipc::EventPayload;
    use assistlens_common::{ErrorCode, LISTENING_STARTED};
    use tokio::io::DuplexStream;

    fn context(provider: &FakeProvider) -> ServiceContext {
        let events = EventBridge::new();
        let (callbacks_tx, callbacks_rx) = mpsc::unbounded_channel();
        let mut controller = ListeningController::new(events.clone());
        controller.initialize(provider, callbacks_tx);
        let (handle, control) = ControllerHandle::channel();
        ControllerTask::new(controller, control, callbacks_rx).spawn();
        ServiceContext {
            commands: CommandBridge::new(handle.clone()),
            events,
            controller: handle,
        }
    }

    fn connect(ctx: &ServiceContext) -> DuplexStream {
        let (client, server) = tokio::io::duplex(4096);
        tokio::spawn(handle_client(server, ctx.clone(), "test".to_string()));
        client
    }

    async fn roundtrip(client: &mut DuplexStream, request: &Request) -> Response {
        write_json(client, request).await.unwrap();
        read_json(client).await.unwrap()
    }

    #[tokio::test]
    async fn test_ping_and_invalid_method() {
        let provider = FakeProvider::default();
        let ctx = context(&provider);
        let mut client = connect(&ctx);

        assert!(matches!(roundtrip(&mut client, &Request::Ping).await, Response::Pong { .. }));

        let response = roundtrip(&mut client, &Request::method_call("not a method")).await;
        assert!(response.is_error());
    }

    #[tokio::test]
    async fn test_malformed_frame_keeps_connection() {
        let provider = FakeProvider::default();
        let ctx = context(&provider);
        let mut client = connect(&ctx);

        assistlens_common::ipc::write_message(&mut client, b"{not json")
            .await
            .unwrap();
        let response: Response = read_json(&mut client).await.unwrap();
        assert!(response.is_error());

        assert!(matches!(roundtrip(&mut client, &Request::Ping).await, Response::Pong { .. }));
    }

    #[tokio::test]
    async fn test_listen_streams_events() {
        let provider = FakeProvider::default();
        let ctx = context(&provider);
        let mut client = connect(&ctx);

        let response = roundtrip(&mut client, &Request::Listen).await;
        assert!(matches!(response, Response::Listening { .. }));

        let response = roundtrip(&mut client, &Request::method_call("startVoiceService")).await;
        assert!(matches!(response, Response::Success));

        provider.emit(RecognizerCallback::ReadyForSpeech);
        provider.emit(RecognizerCallback::Error { code: 7 });

        let event: Response = read_json(&mut client).await.unwrap();
        assert!(matches!(
            event,
            Response::Event { event: EventPayload::Success { ref value } }
                if value == LISTENING_STARTED
        ));

        let event: Response = read_json(&mut client).await.unwrap();
        assert!(matches!(
            event,
            Response::Event {
                event: EventPayload::Error {
                    code: ErrorCode::SpeechError,
                    details: Some(7),
                    ..
                }
            }
        ));
    }

    #[tokio::test]
    async fn test_disconnect_detaches_sink() {
        let provider = FakeProvider::default();
        let ctx = context(&provider);
        let mut client = connect(&ctx);

        roundtrip(&mut client, &Request::Listen).await;
        assert!(ctx.events.is_attached());

        drop(client);
        for _ in 0..50 {
            if !ctx.events.is_attached() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!ctx.events.is_attached());
    }
}
