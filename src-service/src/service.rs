//! Service lifecycle.
//!
//! Creation runs in a fixed order: foreground registration, transport,
//! bridges, then the listening controller. Only a transport failure is
//! fatal; a missing recognizer is reported to consumers as an event.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use assistlens_common::ipc::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::bridge::{CommandBridge, EventBridge};
use crate::config::ServiceConfig;
use crate::controller::{ControllerHandle, ControllerTask, ListeningController};
use crate::error::ServiceError;
use crate::foreground::{enter_foreground, leave_foreground, ForegroundHost};
use crate::ipc::{self, ServiceContext};
use crate::recognizer::RecognizerProvider;

/// How often [`Service::run_until_shutdown`] polls the shutdown flag.
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long `destroy` waits for the IPC server to notice shutdown.
const SERVER_STOP_TIMEOUT: Duration = Duration::from_secs(1);

/// A running voice service.
pub struct Service<H: ForegroundHost> {
    host: H,
    socket_path: PathBuf,
    events: EventBridge,
    controller: ControllerHandle,
    controller_task: JoinHandle<()>,
    server: JoinHandle<()>,
    shutdown: Arc<AtomicBool>,
}

impl<H: ForegroundHost> Service<H> {
    /// Bring the service up. Must be called from within a Tokio runtime.
    pub fn create(
        config: &ServiceConfig,
        mut host: H,
        provider: &dyn RecognizerProvider,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self, ServiceError> {
        enter_foreground(&mut host);

        let socket_path = config.socket_path();
        let listener = match ipc::bind(&socket_path) {
            Ok(listener) => listener,
            Err(e) => {
                leave_foreground(&mut host);
                return Err(e);
            }
        };

        let events = EventBridge::new();
        let (controller, control) = ControllerHandle::channel();
        let ctx = ServiceContext {
            commands: CommandBridge::new(controller.clone()),
            events: events.clone(),
            controller: controller.clone(),
        };
        let server = tokio::spawn(ipc::run_server(listener, ctx, shutdown.clone()));

        let (callbacks_tx, callbacks_rx) = mpsc::unbounded_channel();
        let mut listening = ListeningController::new(events.clone());
        listening.initialize(provider, callbacks_tx);
        let controller_task = ControllerTask::new(listening, control, callbacks_rx).spawn();

        info!("Voice service created");

        Ok(Self {
            host,
            socket_path,
            events,
            controller,
            controller_task,
            server,
            shutdown,
        })
    }

    /// Begin continuous listening, as if started by the platform.
    pub async fn on_start_command(&self) {
        if let Err(e) = self.controller.execute(Command::StartVoiceService).await {
            warn!("Could not start listening: {}", e);
        }
    }

    pub fn controller(&self) -> &ControllerHandle {
        &self.controller
    }

    /// Wait until the shutdown flag is raised.
    pub async fn run_until_shutdown(&self) {
        while !self.shutdown.load(Ordering::SeqCst) {
            tokio::time::sleep(SHUTDOWN_POLL_INTERVAL).await;
        }
    }

    /// Tear everything down: controller, transport, foreground.
    pub async fn destroy(mut self) {
        info!("Destroying voice service");

        self.controller.shutdown().await;
        if let Err(e) = (&mut self.controller_task).await {
            warn!("Controller task ended abnormally: {}", e);
        }
        // The controller detaches on destroy, unless its task panicked first
        self.events.detach();

        self.shutdown.store(true, Ordering::SeqCst);
        if tokio::time::timeout(SERVER_STOP_TIMEOUT, &mut self.server)
            .await
            .is_err()
        {
            warn!("IPC server did not stop in time, aborting");
            self.server.abort();
        }

        leave_foreground(&mut self.host);
        ipc::remove_socket(&self.socket_path);
        info!("Voice service destroyed");
    }
}
