//! Rendering targets for an interaction

use serde::Serialize;
use std::io::Write;
use tokio::sync::mpsc;

/// Appended to a streaming response until it is complete
pub const CURSOR: &str = "▌";

/// Where the orchestrator renders an interaction
pub trait DisplaySurface: Send {
    fn user_message(&mut self, text: &str);

    /// `rendered` is the response so far followed by [`CURSOR`];
    /// `fragment` is the piece that just arrived
    fn assistant_partial(&mut self, rendered: &str, fragment: &str);

    fn assistant_final(&mut self, text: &str);

    fn warning(&mut self, message: &str);

    fn configuration_required(&mut self, message: &str);

    fn trace_link(&mut self, url: &str);
}

/// One rendering step, as sent to the browser
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DisplayEvent {
    User { text: String },
    Partial { text: String },
    Final { text: String },
    Warning { message: String },
    ConfigurationRequired { message: String },
    TraceLink { url: String },
    Error { message: String },
    Done,
}

/// Records every event, in order
#[derive(Debug, Default)]
pub struct EventLog {
    pub events: Vec<DisplayEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                DisplayEvent::Warning { message } => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl DisplaySurface for EventLog {
    fn user_message(&mut self, text: &str) {
        self.events.push(DisplayEvent::User { text: text.into() });
    }

    fn assistant_partial(&mut self, rendered: &str, _fragment: &str) {
        self.events.push(DisplayEvent::Partial {
            text: rendered.into(),
        });
    }

    fn assistant_final(&mut self, text: &str) {
        self.events.push(DisplayEvent::Final { text: text.into() });
    }

    fn warning(&mut self, message: &str) {
        self.events.push(DisplayEvent::Warning {
            message: message.into(),
        });
    }

    fn configuration_required(&mut self, message: &str) {
        self.events.push(DisplayEvent::ConfigurationRequired {
            message: message.into(),
        });
    }

    fn trace_link(&mut self, url: &str) {
        self.events.push(DisplayEvent::TraceLink { url: url.into() });
    }
}

/// Forwards events to a channel drained by the web host's event stream
pub struct ChannelSurface {
    tx: mpsc::UnboundedSender<DisplayEvent>,
}

impl ChannelSurface {
    pub fn new(tx: mpsc::UnboundedSender<DisplayEvent>) -> Self {
        Self { tx }
    }

    pub fn send(&self, event: DisplayEvent) {
        // A closed receiver means the client went away; the interaction still completes
        let _ = self.tx.send(event);
    }
}

impl DisplaySurface for ChannelSurface {
    fn user_message(&mut self, text: &str) {
        self.send(DisplayEvent::User { text: text.into() });
    }

    fn assistant_partial(&mut self, rendered: &str, _fragment: &str) {
        self.send(DisplayEvent::Partial {
            text: rendered.into(),
        });
    }

    fn assistant_final(&mut self, text: &str) {
        self.send(DisplayEvent::Final { text: text.into() });
    }

    fn warning(&mut self, message: &str) {
        self.send(DisplayEvent::Warning {
            message: message.into(),
        });
    }

    fn configuration_required(&mut self, message: &str) {
        self.send(DisplayEvent::ConfigurationRequired {
            message: message.into(),
        });
    }

    fn trace_link(&mut self, url: &str) {
        self.send(DisplayEvent::TraceLink { url: url.into() });
    }
}

/// Plain-text rendering for the CLI.
///
/// Fragments are printed as they arrive, so the cursor is never drawn.
pub struct TerminalSurface<W: Write + Send> {
    out: W,
    echo_user: bool,
}

impl TerminalSurface<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> TerminalSurface<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            echo_user: false,
        }
    }

    /// Also print the user's message (off for the REPL, where it was just typed)
    pub fn echo_user(mut self, echo: bool) -> Self {
        self.echo_user = echo;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, text: &str) {
        if let Err(e) = self.out.write_all(text.as_bytes()).and_then(|_| self.out.flush()) {
            tracing::debug!("Terminal write failed: {}", e);
        }
    }
}

impl<W: Write + Send> DisplaySurface for TerminalSurface<W> {
    fn user_message(&mut self, text: &str) {
        if self.echo_user {
            self.write(&format!("you: {}\n", text));
        }
    }

    fn assistant_partial(&mut self, _rendered: &str, fragment: &str) {
        self.write(fragment);
    }

    fn assistant_final(&mut self, _text: &str) {
        self.write("\n");
    }

    fn warning(&mut self, message: &str) {
        self.write(&format!("{}\n", message));
    }

    fn configuration_required(&mut self, message: &str) {
        self.write(&format!("{}\nRun `codify setup` to store a LangSmith key.\n", message));
    }

    fn trace_link(&mut self, url: &str) {
        self.write(&format!("Debug Last Call: 🛠️  {}\n", url));
    }
}
