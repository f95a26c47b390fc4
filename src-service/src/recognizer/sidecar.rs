//! Recognizer backed by an external speech engine process.
//!
//! The engine is spawned once per recognizer and speaks newline-delimited
//! JSON: the service writes one [`EngineCommand`] per line to its stdin and
//! the engine writes one [`RecognizerCallback`] per line to its stdout.
//!
//! ```text
//! service -> engine   {"op":"start","config":{"language_model":"free_form",...}}
//!                     {"op":"stop"}
//!                     {"op":"cancel"}
//! engine -> service   {"callback":"ready_for_speech"}
//!                     {"callback":"partial_results","matches":["turn on"]}
//!                     {"callback":"results","matches":["turn on lights"]}
//! ```

use std::path::{Path, PathBuf};
use std::process::Stdio;

use assistlens_common::{RecognitionConfig, RecognizerErrorCode};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::{CallbackSender, RecognizerCallback, RecognizerProvider, SpeechRecognizer};
use crate::config::RecognizerConfig;
use crate::error::ServiceError;

/// Request written to the engine's stdin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EngineCommand {
    Start { config: RecognitionConfig },
    Stop,
    Cancel,
}

/// Creates [`SidecarRecognizer`]s from the configured engine command.
pub struct SidecarProvider {
    config: RecognizerConfig,
}

impl SidecarProvider {
    pub fn new(config: RecognizerConfig) -> Self {
        Self { config }
    }

    /// Resolve the engine executable.
    ///
    /// Commands containing a path separator are used as-is if the file
    /// exists; bare names are looked up in `PATH`.
    fn resolve_command(&self) -> Option<PathBuf> {
        let command = self.config.command.trim();
        if command.is_empty() {
            return None;
        }
        if command.contains(std::path::MAIN_SEPARATOR) || command.contains('/') {
            let path = Path::new(command);
            return path.is_file().then(|| path.to_path_buf());
        }
        which::which(command).ok()
    }
}

impl RecognizerProvider for SidecarProvider {
    fn is_recognition_available(&self) -> bool {
        let resolved = self.resolve_command();
        if resolved.is_none() {
            debug!("Recognizer engine {:?} not found", self.config.command);
        }
        resolved.is_some()
    }

    fn create_recognizer(
        &self,
        callbacks: CallbackSender,
    ) -> Result<Box<dyn SpeechRecognizer>, ServiceError> {
        let program = self
            .resolve_command()
            .ok_or_else(|| ServiceError::RecognizerUnavailable(self.config.command.clone()))?;

        let mut child = Command::new(&program)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(ServiceError::RecognizerSpawn)?;

        let stdin = child
            .stdin
            .take()
            .ok_or(ServiceError::RecognizerPipe("stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or(ServiceError::RecognizerPipe("stdout"))?;

        info!(
            "Recognizer engine started: {} (pid {:?})",
            program.display(),
            child.id()
        );

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        tokio::spawn(write_commands(stdin, command_rx));
        tokio::spawn(read_callbacks(stdout, callbacks));

        Ok(Box::new(SidecarRecognizer {
            commands: command_tx,
            child: Some(child),
        }))
    }
}

/// Handle to a running engine process.
pub struct SidecarRecognizer {
    commands: mpsc::UnboundedSender<EngineCommand>,
    child: Option<Child>,
}

impl SidecarRecognizer {
    fn send(&self, command: EngineCommand) {
        if self.commands.send(command).is_err() {
            warn!("Recognizer engine is gone; request dropped");
        }
    }
}

impl SpeechRecognizer for SidecarRecognizer {
    fn start_listening(&mut self, config: &RecognitionConfig) {
        self.send(EngineCommand::Start {
            config: config.clone(),
        });
    }

    fn stop_listening(&mut self) {
        self.send(EngineCommand::Stop);
    }

    fn cancel(&mut self) {
        self.send(EngineCommand::Cancel);
    }

    fn destroy(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.start_kill() {
                warn!("Failed to stop recognizer engine: {}", e);
            } else {
                info!("Recognizer engine stopped");
            }
        }
    }
}

impl Drop for SidecarRecognizer {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Forward queued commands to the engine, one JSON object per line.
async fn write_commands(
    mut stdin: ChildStdin,
    mut commands: mpsc::UnboundedReceiver<EngineCommand>,
) {
    while let Some(command) = commands.recv().await {
        let mut line = match serde_json::to_vec(&command) {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize engine command: {}", e);
                continue;
            }
        };
        line.push(b'\n');
        if let Err(e) = stdin.write_all(&line).await {
            warn!("Failed to write to recognizer engine: {}", e);
            break;
        }
        if let Err(e) = stdin.flush().await {
            warn!("Failed to flush recognizer engine input: {}", e);
            break;
        }
    }
}

/// Parse engine output into callbacks until the engine exits.
async fn read_callbacks(stdout: ChildStdout, callbacks: CallbackSender) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match parse_callback(&line) {
                    Some(callback) => {
                        if callbacks.send(callback).is_err() {
                            // Controller is gone
                            return;
                        }
                    }
                    None => warn!("Ignoring malformed engine output: {}", line),
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read recognizer engine output: {}", e);
                break;
            }
        }
    }

    warn!("Recognizer engine output closed");
    let _ = callbacks.send(RecognizerCallback::Error {
        code: RecognizerErrorCode::Client.code(),
    });
}

fn parse_callback(line: &str) -> Option<RecognizerCallback> {
    serde_json::from_str(line).ok()
}
