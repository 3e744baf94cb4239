//! REPL interactive protocol (spec §6 "REPL interactive protocol"):
//! line-oriented, UTF-8 over an OS message port; message id is the
//! input-kind tag, response is a single byte (1 continue, 0 stop).
//!
//! The real message port is an external collaborator (out of scope, spec
//! §1). SPEC_FULL §6 supplies this `mpsc`-channel-backed stand-in so
//! dispatch logic can be exercised by a test without a real terminal
//! thread.

use std::sync::mpsc::{Receiver, Sender};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReplInputKind {
    Quit,
    Empty,
    Directive,
    Source,
}

#[derive(Clone, Debug)]
pub struct ReplInput {
    pub kind: ReplInputKind,
    pub line: String,
}

/// Single-byte response: 1 to continue, 0 to stop.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ReplContinue(pub bool);

impl ReplContinue {
    pub fn as_byte(self) -> u8 {
        if self.0 {
            1
        } else {
            0
        }
    }
}

/// One end of the in-process stand-in for the REPL's OS message port.
pub struct ReplPort {
    inputs: Receiver<ReplInput>,
    responses: Sender<ReplContinue>,
}

/// The test/harness-facing side that feeds lines in and reads back the
/// continue/stop byte.
pub struct ReplClient {
    inputs: Sender<ReplInput>,
    responses: Receiver<ReplContinue>,
}

pub fn channel() -> (ReplClient, ReplPort) {
    let (input_tx, input_rx) = std::sync::mpsc::channel();
    let (response_tx, response_rx) = std::sync::mpsc::channel();
    (ReplClient { inputs: input_tx, responses: response_rx }, ReplPort { inputs: input_rx, responses: response_tx })
}

impl ReplClient {
    pub fn send(&self, input: ReplInput) -> ReplContinue {
        self.inputs.send(input).expect("repl port dropped");
        self.responses.recv().expect("repl port dropped before responding")
    }
}

impl ReplPort {
    /// Blocks for the next input line, classifies it, and replies with
    /// whether the session should continue. `classify` mirrors the
    /// driver's directive/empty/quit recognition; `handle` runs the
    /// accepted source or directive and decides whether to keep going.
    pub fn serve_one(&self, classify: impl Fn(&str) -> ReplInputKind, handle: impl FnOnce(&ReplInput) -> bool) -> Option<()> {
        let line = self.inputs.recv().ok()?;
        debug_assert_eq!(line.kind, classify(&line.line));
        let keep_going = handle(&line);
        self.responses.send(ReplContinue(keep_going)).ok()?;
        Some(())
    }
}

pub fn classify_line(line: &str) -> ReplInputKind {
    if line.trim().is_empty() {
        ReplInputKind::Empty
    } else if line.trim() == ":quit" || line.trim() == ":q" {
        ReplInputKind::Quit
    } else if line.trim_start().starts_with(':') {
        ReplInputKind::Directive
    } else {
        ReplInputKind::Source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quit_line_stops_the_session() {
        let (client, port) = channel();
        let handle = std::thread::spawn(move || {
            port.serve_one(classify_line, |input| input.kind != ReplInputKind::Quit).unwrap();
        });
        let kind = classify_line(":quit");
        let response = client.send(ReplInput { kind, line: ":quit".to_string() });
        handle.join().unwrap();
        assert_eq!(response, ReplContinue(false));
    }

    #[test]
    fn source_line_continues_the_session() {
        let (client, port) = channel();
        let handle = std::thread::spawn(move || {
            port.serve_one(classify_line, |input| input.kind != ReplInputKind::Quit).unwrap();
        });
        let kind = classify_line("let x = 1");
        let response = client.send(ReplInput { kind, line: "let x = 1".to_string() });
        handle.join().unwrap();
        assert_eq!(response, ReplContinue(true));
    }
}
