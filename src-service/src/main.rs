//! Assist Lens voice service
//!
//! Keeps a speech recognizer listening continuously and relays what it hears
//! to whichever client is attached over IPC.

mod bridge;
mod config;
mod controller;
mod error;
mod foreground;
mod ipc;
mod recognizer;
mod service;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use config::ServiceConfig;
use foreground::DesktopHost;
use recognizer::SidecarProvider;
use service::Service;

/// Global shutdown flag
static SHUTDOWN_FLAG: std::sync::OnceLock<Arc<AtomicBool>> = std::sync::OnceLock::new();

/// Get the global shutdown flag.
pub fn get_shutdown_flag() -> Arc<AtomicBool> {
    SHUTDOWN_FLAG
        .get_or_init(|| Arc::new(AtomicBool::new(false)))
        .clone()
}

/// Request service shutdown.
pub fn request_shutdown() {
    info!("Shutdown requested");
    get_shutdown_flag().store(true, Ordering::SeqCst);
}

/// Set up logging with `RUST_LOG` support, plus an optional daily log file.
///
/// The returned guard must live until exit so buffered file output is flushed.
fn init_logging(config: &ServiceConfig) -> Option<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = if config.log_to_file {
        match assistlens_common::logging::ensure_log_dir() {
            Ok(dir) => {
                let appender = tracing_appender::rolling::daily(
                    dir,
                    assistlens_common::logging::SERVICE_LOG_PREFIX,
                );
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let layer = fmt::layer().with_ansi(false).with_writer(writer);
                (Some(layer), Some(guard))
            }
            Err(e) => {
                eprintln!("Warning: could not create log directory: {}", e);
                (None, None)
            }
        }
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

fn main() {
    let (config, config_error) = match config::load_config() {
        Ok(config) => (config, None),
        Err(e) => (ServiceConfig::default(), Some(e)),
    };

    let _log_guard = init_logging(&config);

    info!("Assist Lens service starting (pid: {})...", std::process::id());
    if let Some(e) = config_error {
        warn!("Using default configuration: {}", e);
    }

    // Set up signal handlers for graceful shutdown
    setup_signal_handlers();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create Tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    let ok = runtime.block_on(async {
        let provider = SidecarProvider::new(config.recognizer.clone());
        let host = DesktopHost::new(config.api_level);

        let service = match Service::create(&config, host, &provider, get_shutdown_flag()) {
            Ok(service) => service,
            Err(e) => {
                error!("Service initialization failed: {}", e);
                return false;
            }
        };

        if config.auto_start {
            service.on_start_command().await;
        }

        service.run_until_shutdown().await;
        service.destroy().await;
        true
    });

    if !ok {
        std::process::exit(1);
    }
    info!("Assist Lens service stopped");
}

/// Set up signal handlers for graceful shutdown.
fn setup_signal_handlers() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        std::thread::spawn(|| {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    error!("Failed to create signal runtime: {}", e);
                    return;
                }
            };
            rt.block_on(async {
                let (mut sigterm, mut sigint, mut sighup) = match (
                    signal(SignalKind::terminate()),
                    signal(SignalKind::interrupt()),
                    signal(SignalKind::hangup()),
                ) {
                    (Ok(term), Ok(int), Ok(hup)) => (term, int, hup),
                    _ => {
                        error!("Failed to install signal handlers");
                        return;
                    }
                };

                tokio::select! {
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM");
                    }
                    _ = sigint.recv() => {
                        info!("Received SIGINT");
                    }
                    _ = sighup.recv() => {
                        info!("Received SIGHUP");
                    }
                }

                request_shutdown();
            });
        });
    }

    #[cfg(windows)]
    {
        // Windows uses Ctrl+C handler
        if let Err(e) = ctrlc::set_handler(|| {
            info!("Received Ctrl+C");
            request_shutdown();
        }) {
            error!("Error setting Ctrl+C handler: {}", e);
        }
    }
}
