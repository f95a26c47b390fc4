//! Actor that owns the listening controller.
//!
//! Commands from consumers and recognizer callbacks both funnel into one
//! task, so controller state is only ever touched from a single place.

use assistlens_common::ipc::Command;
use assistlens_common::ServiceState;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::ListeningController;
use crate::recognizer::CallbackReceiver;

/// Message sent to the controller task.
#[derive(Debug)]
pub enum ControlMessage {
    /// Run a command; the reply fires once it has been applied
    Execute {
        command: Command,
        reply: oneshot::Sender<()>,
    },
    /// Query the current state
    GetState { reply: oneshot::Sender<ServiceState> },
    /// Destroy the controller and end the task
    Shutdown { reply: oneshot::Sender<()> },
}

/// Receiving half of the control channel.
pub type ControlReceiver = mpsc::UnboundedReceiver<ControlMessage>;

/// The controller task has exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerGone;

impl std::fmt::Display for ControllerGone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Listening controller is no longer running")
    }
}

impl std::error::Error for ControllerGone {}

/// Cloneable front for the controller task.
#[derive(Clone)]
pub struct ControllerHandle {
    tx: mpsc::UnboundedSender<ControlMessage>,
}

impl ControllerHandle {
    /// Create a handle and the receiver a [`ControllerTask`] will drain.
    ///
    /// Messages sent before the task starts are queued.
    pub fn channel() -> (Self, ControlReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Apply a command and wait until the controller has acted on it.
    pub async fn execute(&self, command: Command) -> Result<(), ControllerGone> {
        let (reply, done) = oneshot::channel();
        self.tx
            .send(ControlMessage::Execute { command, reply })
            .map_err(|_| ControllerGone)?;
        done.await.map_err(|_| ControllerGone)
    }

    /// Current controller state; `Destroyed` once the task has exited.
    pub async fn state(&self) -> ServiceState {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(ControlMessage::GetState { reply }).is_err() {
            return ServiceState::Destroyed;
        }
        rx.await.unwrap_or(ServiceState::Destroyed)
    }

    /// Destroy the controller and wait for it to finish.
    pub async fn shutdown(&self) {
        let (reply, done) = oneshot::channel();
        if self.tx.send(ControlMessage::Shutdown { reply }).is_ok() {
            let _ = done.await;
        }
    }
}

/// Drives a [`ListeningController`] from control messages and callbacks.
pub struct ControllerTask {
    controller: ListeningController,
    control: ControlReceiver,
    callbacks: CallbackReceiver,
}

impl ControllerTask {
    pub fn new(
        controller: ListeningController,
        control: ControlReceiver,
        callbacks: CallbackReceiver,
    ) -> Self {
        Self {
            controller,
            control,
            callbacks,
        }
    }

    /// Spawn the task onto the current runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        debug!("Controller task running (state: {})", self.controller.state());
        loop {
            tokio::select! {
                message = self.control.recv() => match message {
                    Some(ControlMessage::Execute { command, reply }) => {
                        self.apply(command);
                        let _ = reply.send(());
                    }
                    Some(ControlMessage::GetState { reply }) => {
                        let _ = reply.send(self.controller.state());
                    }
                    Some(ControlMessage::Shutdown { reply }) => {
                        self.controller.destroy();
                        let _ = reply.send(());
                        break;
                    }
                    None => {
                        // Every handle dropped
                        self.controller.destroy();
                        break;
                    }
                },
                Some(callback) = self.callbacks.recv() => {
                    self.controller.handle_callback(callback);
                }
            }
        }
        info!("Controller task stopped");
    }

    fn apply(&mut self, command: Command) {
        info!("Command: {}", command.method_name());
        match command {
            Command::StartVoiceService => self.controller.start_listening(),
            Command::StopVoiceService => self.controller.stop_listening(),
        }
    }
}
