//! Command bridge: named method calls onto the listening controller.

use assistlens_common::ipc::Command;
use tracing::{debug, warn};

use crate::controller::ControllerHandle;

/// Outcome of a method call. Every call resolves to exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodResult {
    /// Command applied; there is no payload
    Success,
    /// The method name is not one the service handles
    NotImplemented,
}

/// Dispatches method calls to the controller.
#[derive(Clone)]
pub struct CommandBridge {
    controller: ControllerHandle,
}

impl CommandBridge {
    pub fn new(controller: ControllerHandle) -> Self {
        Self { controller }
    }

    /// Run the named method and wait for the controller to apply it.
    pub async fn dispatch(&self, method: &str) -> MethodResult {
        let Some(command) = Command::from_method(method) else {
            debug!("Method not implemented: {}", method);
            return MethodResult::NotImplemented;
        };

        // Commands are fire-and-forget controls: a controller that is
        // already gone still resolves the call.
        if let Err(e) = self.controller.execute(command).await {
            warn!("{} ignored: {}", method, e);
        }
        MethodResult::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::EventBridge;
    use crate::controller::{ControllerTask, ListeningController};
    use crate::recognizer::testing::{Call, FakeProvider};
    use assistlens_common::ServiceState;
    use tokio::sync::mpsc;

    fn bridge_with_controller() -> (CommandBridge, ControllerHandle, FakeProvider) {
        let provider = FakeProvider::default();
        let (callbacks_tx, callbacks_rx) = mpsc::unbounded_channel();
        let mut controller = ListeningController::new(EventBridge::new());
        controller.initialize(&provider, callbacks_tx);
        let (handle, control) = ControllerHandle::channel();
        ControllerTask::new(controller, control, callbacks_rx).spawn();
        (CommandBridge::new(handle.clone()), handle, provider)
    }

    #[tokio::test]
    async fn test_known_commands_succeed() {
        let (bridge, handle, provider) = bridge_with_controller();

        assert_eq!(bridge.dispatch("startVoiceService").await, MethodResult::Success);
        assert_eq!(handle.state().await, ServiceState::Listening);

        assert_eq!(bridge.dispatch("stopVoiceService").await, MethodResult::Success);
        assert_eq!(handle.state().await, ServiceState::Ready);
        assert_eq!(provider.log.count(Call::Start), 1);
    }

    #[tokio::test]
    async fn test_unknown_command_not_implemented() {
        let (bridge, handle, provider) = bridge_with_controller();

        assert_eq!(bridge.dispatch("pauseVoiceService").await, MethodResult::NotImplemented);
        assert_eq!(bridge.dispatch("").await, MethodResult::NotImplemented);
        assert_eq!(handle.state().await, ServiceState::Ready);
        assert!(provider.log.calls().is_empty());
    }

    #[tokio::test]
    async fn test_command_after_shutdown_still_resolves() {
        let (bridge, handle, _provider) = bridge_with_controller();
        handle.shutdown().await;

        assert_eq!(bridge.dispatch("startVoiceService").await, MethodResult::Success);
    }
}
