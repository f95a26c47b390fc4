//! Terminal color support for CLI output.
//!
//! Each helper checks the stream it will be printed to; when that stream is
//! piped the text is returned unstyled.

use assistlens_common::ServiceState;
use owo_colors::{OwoColorize, Style};
use std::io::IsTerminal;

#[derive(Clone, Copy)]
enum Target {
    Stdout,
    Stderr,
}

impl Target {
    fn colored(self) -> bool {
        match self {
            Target::Stdout => std::io::stdout().is_terminal(),
            Target::Stderr => std::io::stderr().is_terminal(),
        }
    }
}

fn paint(colored: bool, msg: &str, style: Style) -> String {
    if colored {
        msg.style(style).to_string()
    } else {
        msg.to_string()
    }
}

/// `label: msg`, with only the label styled.
fn labelled(colored: bool, label: &str, style: Style, msg: &str) -> String {
    format!("{} {}", paint(colored, &format!("{}:", label), style), msg)
}

fn state_style(state: ServiceState) -> Style {
    match state {
        ServiceState::Listening => Style::new().green().bold(),
        ServiceState::Ready => Style::new().cyan(),
        ServiceState::Destroyed => Style::new().red(),
        ServiceState::Uninitialized => Style::new().dimmed(),
    }
}

/// Error line for stderr.
pub fn error(msg: &str) -> String {
    labelled(Target::Stderr.colored(), "error", Style::new().red().bold(), msg)
}

/// Warning line for stderr.
pub fn warning(msg: &str) -> String {
    labelled(Target::Stderr.colored(), "warning", Style::new().yellow().bold(), msg)
}

pub fn success(msg: &str) -> String {
    paint(Target::Stdout.colored(), msg, Style::new().green())
}

pub fn dim(msg: &str) -> String {
    paint(Target::Stdout.colored(), msg, Style::new().dimmed())
}

pub fn bold(msg: &str) -> String {
    paint(Target::Stdout.colored(), msg, Style::new().bold())
}

/// A recognized utterance.
pub fn transcript(msg: &str) -> String {
    paint(Target::Stdout.colored(), msg, Style::new().cyan().bold())
}

/// Controller state, colored by how far it is from listening.
pub fn state(state: ServiceState) -> String {
    paint(Target::Stdout.colored(), state.as_str(), state_style(state))
}
