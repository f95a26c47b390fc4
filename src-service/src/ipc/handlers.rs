//! IPC request handlers.

use assistlens_common::ipc::{EventPayload, Request, Response};
use assistlens_common::EVENTS_CHANNEL;
use tracing::{debug, info};

use crate::bridge::{CommandBridge, EventBridge, EventReceiver, MethodResult, SinkId};
use crate::controller::ControllerHandle;

/// Everything a connection needs to serve requests.
#[derive(Clone)]
pub struct ServiceContext {
    pub commands: CommandBridge,
    pub events: EventBridge,
    pub controller: ControllerHandle,
}

/// A connection's attachment to the event bridge.
#[derive(Default)]
pub struct Subscription {
    active: Option<(SinkId, EventReceiver)>,
}

impl Subscription {
    /// Next event for this connection.
    ///
    /// Pends forever while not subscribed. Returns `None` once the bridge
    /// has dropped this sink (another consumer attached).
    pub async fn next_event(&mut self) -> Option<EventPayload> {
        match self.active.as_mut() {
            Some((_, rx)) => rx.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Forget the subscription without touching the bridge.
    pub fn clear(&mut self) {
        self.active = None;
    }

    /// Detach from the bridge if this connection is still the sink.
    pub fn release(&mut self, events: &EventBridge) {
        if let Some((id, _)) = self.active.take() {
            events.detach_sink(id);
        }
    }
}

/// Handle an IPC request and return a response.
pub async fn handle_request(
    ctx: &ServiceContext,
    request: Request,
    subscription: &mut Subscription,
) -> Response {
    debug!("Handling request: {:?}", request);

    match request {
        Request::MethodCall { method } => match ctx.commands.dispatch(&method).await {
            MethodResult::Success => Response::Success,
            MethodResult::NotImplemented => Response::NotImplemented { method },
        },
        Request::Listen => {
            subscription.release(&ctx.events);
            let (sink, rx) = EventBridge::channel();
            let id = ctx.events.attach(sink);
            subscription.active = Some((id, rx));
            info!("Event stream attached ({:?})", id);
            Response::Listening {
                channel: EVENTS_CHANNEL.to_string(),
            }
        }
        Request::Cancel => {
            subscription.release(&ctx.events);
            info!("Event stream cancelled");
            Response::Cancelled
        }
        Request::GetState => Response::State {
            state: ctx.controller.state().await,
        },
        Request::Ping => Response::pong(),
    }
}
