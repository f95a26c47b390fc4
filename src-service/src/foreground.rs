//! Foreground registration and the ongoing listening notification.
//!
//! The host keeps the service process alive and visibly active while it
//! listens. Channel registration and the explicit microphone foreground type
//! are only required from certain platform API levels.

use std::collections::HashSet;

use tracing::{debug, info};

/// Notification channel id for the service.
pub const NOTIFICATION_CHANNEL_ID: &str = "VoiceAssistantChannel";

/// Human-readable channel name.
pub const NOTIFICATION_CHANNEL_NAME: &str = "Voice Assistant Service Channel";

/// Id of the ongoing foreground notification.
pub const NOTIFICATION_ID: u32 = 101;

/// First API level that requires notification channels.
pub const API_LEVEL_NOTIFICATION_CHANNELS: u32 = 26;

/// First API level that requires an explicit foreground service type.
pub const API_LEVEL_FOREGROUND_SERVICE_TYPE: u32 = 29;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Importance {
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationChannel {
    pub id: String,
    pub name: String,
    pub importance: Importance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationCategory {
    Service,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub channel_id: String,
    pub title: String,
    pub text: String,
    /// Cannot be dismissed by the user
    pub ongoing: bool,
    pub category: NotificationCategory,
}

/// Declared category of foreground work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForegroundServiceType {
    Microphone,
}

/// OS notification and foreground-execution subsystem.
pub trait ForegroundHost: Send {
    /// Platform API level of the running OS.
    fn api_level(&self) -> u32;

    /// Register a notification channel. Registering an existing id is a no-op.
    fn create_notification_channel(&mut self, channel: &NotificationChannel);

    /// Enter the foreground with an ongoing notification.
    fn start_foreground(
        &mut self,
        id: u32,
        notification: &Notification,
        service_type: Option<ForegroundServiceType>,
    );

    /// Leave the foreground and remove the notification.
    fn stop_foreground(&mut self);
}

/// The service's notification channel.
pub fn service_channel() -> NotificationChannel {
    NotificationChannel {
        id: NOTIFICATION_CHANNEL_ID.to_string(),
        name: NOTIFICATION_CHANNEL_NAME.to_string(),
        importance: Importance::Low,
    }
}

/// The notification shown for as long as the service runs.
pub fn listening_notification() -> Notification {
    Notification {
        channel_id: NOTIFICATION_CHANNEL_ID.to_string(),
        title: "Assist Lens".to_string(),
        text: "Listening for commands...".to_string(),
        ongoing: true,
        category: NotificationCategory::Service,
    }
}

/// Register the channel (where required) and enter the foreground.
pub fn enter_foreground(host: &mut dyn ForegroundHost) {
    let api_level = host.api_level();

    if api_level >= API_LEVEL_NOTIFICATION_CHANNELS {
        host.create_notification_channel(&service_channel());
    }

    let service_type = if api_level >= API_LEVEL_FOREGROUND_SERVICE_TYPE {
        Some(ForegroundServiceType::Microphone)
    } else {
        None
    };
    host.start_foreground(NOTIFICATION_ID, &listening_notification(), service_type);
}

/// Leave the foreground.
pub fn leave_foreground(host: &mut dyn ForegroundHost) {
    host.stop_foreground();
}

/// Foreground host for desktop builds.
///
/// There is no system notification shade to post to, so registration is
/// tracked in-process and reported through the service log.
pub struct DesktopHost {
    api_level: u32,
    channels: HashSet<String>,
    active: Option<u32>,
}

impl DesktopHost {
    pub fn new(api_level: u32) -> Self {
        Self {
            api_level,
            channels: HashSet::new(),
            active: None,
        }
    }
}

impl ForegroundHost for DesktopHost {
    fn api_level(&self) -> u32 {
        self.api_level
    }

    fn create_notification_channel(&mut self, channel: &NotificationChannel) {
        if self.channels.insert(channel.id.clone()) {
            info!(
                "Notification channel {:?} ({}) registered, importance {:?}",
                channel.id, channel.name, channel.importance
            );
        } else {
            debug!("Notification channel {:?} already registered", channel.id);
        }
    }

    fn start_foreground(
        &mut self,
        id: u32,
        notification: &Notification,
        service_type: Option<ForegroundServiceType>,
    ) {
        self.active = Some(id);
        match service_type {
            Some(kind) => info!(
                "Foreground [{:?}] #{}: {} - {}",
                kind, id, notification.title, notification.text
            ),
            None => info!(
                "Foreground #{}: {} - {}",
                id, notification.title, notification.text
            ),
        }
    }

    fn stop_foreground(&mut self) {
        if let Some(id) = self.active.take() {
            info!("Foreground #{} removed", id);
        }
    }
}
