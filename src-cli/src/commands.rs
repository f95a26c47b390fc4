//! CLI command implementations.

use crate::client::{ClientError, ServiceClient};
use crate::colors;
use crate::exit_codes::ExitCode;
use assistlens_common::ipc::{Command, EventPayload, Request, Response};

/// Connect, spawning the service if needed. Reports failures itself.
async fn connect(client: &ServiceClient, quiet: bool) -> Result<(), ExitCode> {
    client.connect_or_spawn().await.map_err(|e| {
        if !quiet {
            eprintln!("{}", colors::error(&e.to_string()));
        }
        e.to_exit_code()
    })
}

fn report_error(e: &ClientError, json: bool, quiet: bool) -> ExitCode {
    if json {
        println!("{}", serde_json::json!({ "error": e.to_string() }));
    } else if !quiet {
        eprintln!("{}", colors::error(&e.to_string()));
    }
    e.to_exit_code()
}

fn report_unexpected(response: &Response, quiet: bool) -> ExitCode {
    if !quiet {
        eprintln!(
            "{}",
            colors::error(&format!("Unexpected response: {:?}", response))
        );
    }
    ExitCode::GeneralError
}

/// Start continuous listening.
pub async fn start(json: bool, quiet: bool) -> ExitCode {
    call(Command::StartVoiceService.method_name(), json, quiet).await
}

/// Stop listening.
pub async fn stop(json: bool, quiet: bool) -> ExitCode {
    call(Command::StopVoiceService.method_name(), json, quiet).await
}

/// Invoke a method on the service's command channel.
pub async fn call(method: &str, json: bool, quiet: bool) -> ExitCode {
    let client = ServiceClient::new();
    if let Err(code) = connect(&client, quiet).await {
        return code;
    }

    match client.request(Request::method_call(method)).await {
        Ok(Response::Success) => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "status": "success", "method": method })
                );
            } else if !quiet {
                println!("{} {}", colors::success("ok:"), method);
            }
            ExitCode::Success
        }
        Ok(Response::NotImplemented { method }) => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "status": "not_implemented", "method": method })
                );
            } else if !quiet {
                eprintln!("{}", colors::warning(&format!("{}: not implemented", method)));
            }
            ExitCode::NotImplemented
        }
        Ok(other) => report_unexpected(&other, quiet),
        Err(e) => report_error(&e, json, quiet),
    }
}

/// Render a pushed event for humans.
fn format_event(event: &EventPayload) -> String {
    match event {
        event if event.is_listening_started() => colors::dim("(listening)"),
        EventPayload::Success { value } => colors::transcript(value),
        EventPayload::Error {
            code,
            message,
            details: Some(detail),
        } => colors::error(&format!("{}: {} ({})", code, message, detail)),
        EventPayload::Error {
            code,
            message,
            details: None,
        } => colors::error(&format!("{}: {}", code, message)),
    }
}

/// Subscribe to events and print them until interrupted.
pub async fn listen(json: bool, quiet: bool) -> ExitCode {
    let client = ServiceClient::new();
    if let Err(code) = connect(&client, quiet).await {
        return code;
    }

    match client.request(Request::Listen).await {
        Ok(Response::Listening { channel }) => {
            if !json && !quiet {
                println!("{} {}", colors::bold("Subscribed to"), channel);
                println!("{}", colors::dim("Press Ctrl+C to stop."));
            }
        }
        Ok(other) => return report_unexpected(&other, quiet),
        Err(e) => return report_error(&e, json, quiet),
    }

    loop {
        let message = tokio::select! {
            message = client.next_message() => message,
            _ = tokio::signal::ctrl_c() => {
                // Best effort; the service detaches on disconnect anyway
                let _ = client.request(Request::Cancel).await;
                return ExitCode::Success;
            }
        };

        match message {
            Ok(Response::Event { event }) => {
                if json {
                    match serde_json::to_string(&event) {
                        Ok(line) => println!("{}", line),
                        Err(e) => eprintln!("{}", colors::error(&e.to_string())),
                    }
                } else if !(quiet && event.is_listening_started()) {
                    println!("{}", format_event(&event));
                }
            }
            Ok(_) => {}
            Err(ClientError::NotConnected) => {
                if !quiet {
                    eprintln!("{}", colors::warning("Service closed the connection"));
                }
                return ExitCode::ServiceConnectionFailed;
            }
            Err(e) => return report_error(&e, json, quiet),
        }
    }
}

/// Show the listening controller state.
pub async fn status(json: bool) -> ExitCode {
    let client = ServiceClient::new();

    if let Err(e) = client.connect_or_spawn().await {
        if json {
            println!(
                "{}",
                serde_json::json!({ "status": "service_unavailable", "error": e.to_string() })
            );
        } else {
            eprintln!("{}", colors::error(&e.to_string()));
        }
        return e.to_exit_code();
    }

    match client.request(Request::GetState).await {
        Ok(Response::State { state }) => {
            if json {
                println!("{}", serde_json::json!({ "state": state }));
            } else {
                println!("{} {}", colors::bold("State:"), colors::state(state));
            }
            ExitCode::Success
        }
        Ok(other) => {
            if json {
                println!(r#"{{"error": "unexpected_response"}}"#);
                ExitCode::GeneralError
            } else {
                report_unexpected(&other, false)
            }
        }
        Err(e) => report_error(&e, json, false),
    }
}

/// Show version information.
pub fn version(json: bool) {
    let version = env!("CARGO_PKG_VERSION");
    if json {
        println!(r#"{{"version": "{}"}}"#, version);
    } else {
        println!("{} {}", colors::bold("assistlens"), version);
    }
}
