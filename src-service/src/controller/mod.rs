//! Listening controller.
//!
//! Owns the recognizer and keeps listening continuous: every terminal
//! callback (end of speech, final results, error) starts a fresh session
//! until listening is stopped by command or the controller is destroyed.
//!
//! ```text
//! Uninitialized ──available─▶ Ready ◀──stop──▶ Listening ──terminal cb──▶ Listening
//!       │                       │                  │
//!       └───────────────────────┴──── destroy ─────┴──▶ Destroyed
//! ```
//!
//! The controller does no I/O and never blocks; [`task::ControllerTask`]
//! drives it from a single task.

pub mod task;

use assistlens_common::{RecognitionConfig, RecognitionEvent, ServiceState, LISTENING_STARTED};
use tracing::{debug, error, info, warn};

use crate::bridge::EventBridge;
use crate::recognizer::{CallbackSender, RecognizerCallback, RecognizerProvider, SpeechRecognizer};

pub use task::{ControllerHandle, ControllerTask};

pub struct ListeningController {
    state: ServiceState,
    recognizer: Option<Box<dyn SpeechRecognizer>>,
    config: RecognitionConfig,
    events: EventBridge,
}

impl ListeningController {
    /// Create a controller publishing into `events`.
    pub fn new(events: EventBridge) -> Self {
        Self {
            state: ServiceState::Uninitialized,
            recognizer: None,
            config: RecognitionConfig::free_form(),
            events,
        }
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    /// Check for a recognizer and construct it.
    ///
    /// On a device without recognition the controller stays
    /// `Uninitialized` and reports `SPEECH_NOT_AVAILABLE` once.
    pub fn initialize(&mut self, provider: &dyn RecognizerProvider, callbacks: CallbackSender) {
        if self.state != ServiceState::Uninitialized {
            warn!("Recognizer already initialized (state: {})", self.state);
            return;
        }

        if !provider.is_recognition_available() {
            error!("Speech recognition not available on this device");
            self.events.publish(RecognitionEvent::not_available());
            return;
        }

        match provider.create_recognizer(callbacks) {
            Ok(recognizer) => {
                self.recognizer = Some(recognizer);
                self.state = ServiceState::Ready;
                info!("Speech recognizer initialized");
            }
            Err(e) => {
                error!("Failed to create speech recognizer: {}", e);
                self.events.publish(RecognitionEvent::not_available());
            }
        }
    }

    /// Start a fresh recognition session.
    ///
    /// Any in-flight session is stopped and cancelled first, so calling this
    /// while already listening never leaves two sessions running.
    pub fn start_listening(&mut self) {
        if self.state == ServiceState::Destroyed {
            debug!("Ignoring start: controller destroyed");
            return;
        }

        if self.recognizer.is_none() {
            error!("Speech recognizer is not initialized, cannot start listening");
            self.events.publish(RecognitionEvent::recognizer_null());
            return;
        }

        self.stop_listening();
        if let Some(recognizer) = self.recognizer.as_mut() {
            recognizer.start_listening(&self.config);
            self.state = ServiceState::Listening;
            debug!("Speech recognizer started listening");
        }
    }

    /// Stop and cancel the current session. The recognizer stays reusable.
    pub fn stop_listening(&mut self) {
        if let Some(recognizer) = self.recognizer.as_mut() {
            recognizer.stop_listening();
            recognizer.cancel();
            if self.state == ServiceState::Listening {
                self.state = ServiceState::Ready;
            }
            debug!("Speech recognizer stopped listening");
        }
    }

    /// React to a recognizer callback.
    pub fn handle_callback(&mut self, callback: RecognizerCallback) {
        if self.state == ServiceState::Destroyed {
            debug!("Dropping callback after destroy: {:?}", callback);
            return;
        }

        let restart = callback.is_terminal();

        match callback {
            RecognizerCallback::ReadyForSpeech => {
                debug!("onReadyForSpeech");
                self.events.success(LISTENING_STARTED);
            }
            RecognizerCallback::BeginningOfSpeech => debug!("onBeginningOfSpeech"),
            RecognizerCallback::RmsChanged { .. } | RecognizerCallback::BufferReceived { .. } => {}
            RecognizerCallback::EndOfSpeech => debug!("onEndOfSpeech"),
            RecognizerCallback::Error { code } => {
                let event = RecognitionEvent::speech_error(code);
                if let RecognitionEvent::Error { message, .. } = &event {
                    warn!("onError: {} ({})", message, code);
                }
                self.events.publish(event);
            }
            RecognizerCallback::Results { matches } => {
                if let Some(text) = matches.into_iter().next() {
                    info!("onResults: {}", text);
                    self.events.publish(RecognitionEvent::FinalText(text));
                }
            }
            RecognizerCallback::PartialResults { matches } => {
                if let Some(text) = matches.into_iter().next() {
                    debug!("onPartialResults: {}", text);
                    self.events.publish(RecognitionEvent::PartialText(text));
                }
            }
            RecognizerCallback::Event { event_type } => debug!("onEvent: {}", event_type),
        }

        if restart {
            self.start_listening();
        }
    }

    /// Final teardown: stop, release the recognizer, and detach the sink.
    pub fn destroy(&mut self) {
        if self.state == ServiceState::Destroyed {
            return;
        }
        self.stop_listening();
        if let Some(mut recognizer) = self.recognizer.take() {
            recognizer.destroy();
        }
        self.events.detach();
        self.state = ServiceState::Destroyed;
        info!("Listening controller destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::EventReceiver;
    use crate::recognizer::testing::{Call, FakeProvider};
    use assistlens_common::ipc::EventPayload;
    use assistlens_common::{ErrorCode, LanguageModel};
    use tokio::sync::mpsc;

    fn ready_controller() -> (ListeningController, FakeProvider, EventReceiver) {
        let events = EventBridge::new();
        let (sink, rx) = EventBridge::channel();
        events.attach(sink);

        let provider = FakeProvider::default();
        let (callbacks, _callbacks_rx) = mpsc::unbounded_channel();
        let mut controller = ListeningController::new(events);
        controller.initialize(&provider, callbacks);
        assert_eq!(controller.state(), ServiceState::Ready);
        (controller, provider, rx)
    }

    fn drain(rx: &mut EventReceiver) -> Vec<EventPayload> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    fn success(value: &str) -> EventPayload {
        EventPayload::Success {
            value: value.to_string(),
        }
    }

    #[test]
    fn test_start_resets_then_starts() {
        let (mut controller, provider, _rx) = ready_controller();

        controller.start_listening();
        assert_eq!(controller.state(), ServiceState::Listening);
        assert_eq!(provider.log.calls(), vec![Call::Stop, Call::Cancel, Call::Start]);
    }

    #[test]
    fn test_every_start_uses_free_form_config() {
        let (mut controller, provider, _rx) = ready_controller();

        controller.start_listening();
        controller.handle_callback(RecognizerCallback::EndOfSpeech);
        controller.handle_callback(RecognizerCallback::Error { code: 7 });

        let configs = provider.log.start_configs();
        assert_eq!(configs.len(), 3);
        for config in configs {
            assert_eq!(config.language_model, LanguageModel::FreeForm);
            assert!(config.partial_results);
            assert_eq!(config.max_results, 1);
            assert_eq!(config, RecognitionConfig::free_form());
        }
    }

    #[test]
    fn test_start_is_idempotent_while_listening() {
        let (mut controller, provider, _rx) = ready_controller();

        controller.start_listening();
        controller.start_listening();
        assert_eq!(controller.state(), ServiceState::Listening);
        assert_eq!(
            provider.log.calls(),
            vec![
                Call::Stop,
                Call::Cancel,
                Call::Start,
                Call::Stop,
                Call::Cancel,
                Call::Start
            ]
        );
    }

    #[test]
    fn test_each_terminal_callback_restarts_once() {
        let (mut controller, provider, _rx) = ready_controller();
        controller.start_listening();
        provider.log.clear();

        let sequence = vec![
            RecognizerCallback::EndOfSpeech,
            RecognizerCallback::Error { code: 7 },
            RecognizerCallback::Results {
                matches: vec!["hello".into()],
            },
            RecognizerCallback::Results { matches: vec![] },
            RecognizerCallback::Error { code: 99 },
        ];
        let terminal = sequence.len();
        for callback in sequence {
            controller.handle_callback(callback);
        }

        assert_eq!(provider.log.count(Call::Start), terminal);
        assert_eq!(controller.state(), ServiceState::Listening);
    }

    #[test]
    fn test_non_terminal_callbacks_do_not_restart() {
        let (mut controller, provider, _rx) = ready_controller();
        controller.start_listening();
        provider.log.clear();

        controller.handle_callback(RecognizerCallback::ReadyForSpeech);
        controller.handle_callback(RecognizerCallback::BeginningOfSpeech);
        controller.handle_callback(RecognizerCallback::RmsChanged { rms_db: 3.5 });
        controller.handle_callback(RecognizerCallback::BufferReceived { buffer: vec![1, 2] });
        controller.handle_callback(RecognizerCallback::PartialResults {
            matches: vec!["turn".into()],
        });
        controller.handle_callback(RecognizerCallback::Event { event_type: 12 });

        assert!(provider.log.calls().is_empty());
    }

    #[test]
    fn test_stop_leaves_ready_without_restart() {
        let (mut controller, provider, _rx) = ready_controller();
        controller.start_listening();
        controller.stop_listening();
        assert_eq!(controller.state(), ServiceState::Ready);

        provider.log.clear();
        controller.handle_callback(RecognizerCallback::ReadyForSpeech);
        assert_eq!(controller.state(), ServiceState::Ready);
        assert_eq!(provider.log.count(Call::Start), 0);
    }

    #[test]
    fn test_partial_then_final_restarts_after_final_only() {
        let (mut controller, provider, mut rx) = ready_controller();
        controller.start_listening();
        provider.log.clear();

        controller.handle_callback(RecognizerCallback::PartialResults {
            matches: vec!["turn on lights".into()],
        });
        assert_eq!(provider.log.count(Call::Start), 0);

        controller.handle_callback(RecognizerCallback::Results {
            matches: vec!["turn on lights".into(), "turn on light".into()],
        });
        assert_eq!(provider.log.count(Call::Start), 1);

        assert_eq!(
            drain(&mut rx),
            vec![success("turn on lights"), success("turn on lights")]
        );
    }

    #[test]
    fn test_network_timeout_reports_then_restarts() {
        let (mut controller, provider, mut rx) = ready_controller();
        controller.start_listening();
        provider.log.clear();

        controller.handle_callback(RecognizerCallback::Error { code: 1 });

        assert_eq!(
            drain(&mut rx),
            vec![EventPayload::Error {
                code: ErrorCode::SpeechError,
                message: "Network timeout".to_string(),
                details: Some(1),
            }]
        );
        assert_eq!(provider.log.calls(), vec![Call::Stop, Call::Cancel, Call::Start]);
    }

    #[test]
    fn test_ready_for_speech_emits_marker() {
        let (mut controller, _provider, mut rx) = ready_controller();
        controller.handle_callback(RecognizerCallback::ReadyForSpeech);
        assert_eq!(drain(&mut rx), vec![success(LISTENING_STARTED)]);
    }

    #[test]
    fn test_empty_results_emit_nothing_but_restart() {
        let (mut controller, provider, mut rx) = ready_controller();
        controller.handle_callback(RecognizerCallback::PartialResults { matches: vec![] });
        controller.handle_callback(RecognizerCallback::Results { matches: vec![] });
        assert!(drain(&mut rx).is_empty());
        assert_eq!(provider.log.count(Call::Start), 1);
    }

    #[test]
    fn test_unavailable_reports_and_never_restarts() {
        let events = EventBridge::new();
        let (sink, mut rx) = EventBridge::channel();
        events.attach(sink);

        let provider = FakeProvider::unavailable();
        let (callbacks, _callbacks_rx) = mpsc::unbounded_channel();
        let mut controller = ListeningController::new(events);
        controller.initialize(&provider, callbacks);
        assert_eq!(controller.state(), ServiceState::Uninitialized);

        controller.start_listening();
        controller.start_listening();
        assert_eq!(controller.state(), ServiceState::Uninitialized);

        let codes: Vec<ErrorCode> = drain(&mut rx)
            .into_iter()
            .map(|event| match event {
                EventPayload::Error { code, details, .. } => {
                    assert_eq!(details, None);
                    code
                }
                other => panic!("unexpected event {:?}", other),
            })
            .collect();
        assert_eq!(
            codes,
            vec![
                ErrorCode::SpeechNotAvailable,
                ErrorCode::SpeechRecognizerNull,
                ErrorCode::SpeechRecognizerNull
            ]
        );
        assert!(provider.log.calls().is_empty());
    }

    #[test]
    fn test_detached_sink_tolerated() {
        let (mut controller, provider, rx) = ready_controller();
        controller.events.detach();
        drop(rx);

        controller.start_listening();
        controller.handle_callback(RecognizerCallback::ReadyForSpeech);
        controller.handle_callback(RecognizerCallback::Results {
            matches: vec!["unheard".into()],
        });
        controller.handle_callback(RecognizerCallback::Error { code: 3 });

        assert_eq!(provider.log.count(Call::Start), 3);
    }

    #[test]
    fn test_destroy_is_absorbing() {
        let (mut controller, provider, _rx) = ready_controller();
        controller.start_listening();
        controller.destroy();

        assert_eq!(controller.state(), ServiceState::Destroyed);
        assert!(!controller.events.is_attached());
        assert_eq!(provider.log.count(Call::Destroy), 1);

        provider.log.clear();
        controller.start_listening();
        controller.handle_callback(RecognizerCallback::EndOfSpeech);
        controller.stop_listening();
        controller.destroy();
        assert!(provider.log.calls().is_empty());
        assert_eq!(controller.state(), ServiceState::Destroyed);
    }
}
