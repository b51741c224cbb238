//! Terminal renderer
//!
//! Writes VT100 control sequences, echoed input and printed text to a session's
//! output channel.
//!
//! Two classes of output exist:
//!
//! - **echo**: typed characters and the CR LF line terminator. Sent only while
//!   echo is in force (always for local sessions, after `DO ECHO` for network
//!   sessions).
//! - **control**: cursor movement, erase-to-end-of-line, bell and the line
//!   content retransmitted around them. Sent unconditionally unless control
//!   gating is enabled, in which case it follows the echo policy too.
//!
//! Printed text and Telnet announcements are always sent.

use std::io::Write;

use tracing::warn;

use crate::core::channel::{ChannelHandle, OutputChannel};
use crate::core::session::ConnectionKind;
use crate::core::term::telnet::{self, control, vt100, TelnetOptions};
use crate::error::CliError;

pub struct Renderer {
    /// `None` once the session has released its output
    output: Option<Box<dyn OutputChannel>>,
    kind: ConnectionKind,
    negotiated: TelnetOptions,
    gate_control: bool,
}

impl Renderer {
    pub fn new(output: Box<dyn OutputChannel>, kind: ConnectionKind, gate_control: bool) -> Self {
        Self {
            output: Some(output),
            kind,
            negotiated: TelnetOptions::empty(),
            gate_control,
        }
    }

    /// Whether input must be echoed back to the user
    pub fn must_echo(&self) -> bool {
        match self.kind {
            ConnectionKind::Local => true,
            ConnectionKind::Network => self.negotiated.contains(TelnetOptions::ECHO),
        }
    }

    pub fn negotiated(&self) -> TelnetOptions {
        self.negotiated
    }

    pub(crate) fn set_negotiated(&mut self, option: TelnetOptions, enabled: bool) {
        self.negotiated.set(option, enabled);
    }

    pub fn output_handle(&self) -> Option<ChannelHandle> {
        self.output.as_ref().map(|o| o.handle())
    }

    pub(crate) fn take_output(&mut self) -> Option<Box<dyn OutputChannel>> {
        self.output.take()
    }

    /// Write bytes as they are
    pub fn send_bytes(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let Some(output) = self.output.as_mut() else {
            return;
        };
        let result = output.write_all(bytes).and_then(|_| output.flush());
        if let Err(source) = result {
            warn!("{}", CliError::Write { handle: output.handle(), source });
        }
    }

    /// Echo typed bytes if echo is in force
    pub fn echo_bytes(&mut self, bytes: &[u8]) {
        if self.must_echo() {
            self.send_bytes(bytes);
        }
    }

    /// Cursor movement, erase and line refresh output
    pub fn send_control(&mut self, bytes: &[u8]) {
        if !self.gate_control || self.must_echo() {
            self.send_bytes(bytes);
        }
    }

    pub fn cursor_left(&mut self, positions: usize) {
        if positions > 0 {
            let sequence = format!("\x1b[{}{}", positions, vt100::CURSOR_LEFT as char);
            self.send_control(sequence.as_bytes());
        }
    }

    pub fn cursor_right(&mut self, positions: usize) {
        if positions > 0 {
            let sequence = format!("\x1b[{}{}", positions, vt100::CURSOR_RIGHT as char);
            self.send_control(sequence.as_bytes());
        }
    }

    pub fn erase_to_end_of_line(&mut self) {
        self.send_control(&[
            control::ESC,
            vt100::LEFT_SQUARE_BRACKET,
            vt100::ERASE_TO_END_OF_LINE,
        ]);
    }

    pub fn bell(&mut self) {
        self.send_control(&[control::BELL]);
    }

    /// Announce `IAC WILL <option>`
    pub fn send_will(&mut self, option: u8) {
        self.send_bytes(&telnet::will(option));
    }

    /// Print a line of text
    pub fn print(&mut self, message: &str) {
        self.print_text(message, true);
    }

    /// Print text; raw terminals need `\r\n` wherever we echo
    pub fn print_text(&mut self, message: &str, add_newline: bool) {
        let mut text = String::with_capacity(message.len() + 2);
        text.push_str(message);
        if add_newline {
            text.push('\n');
        }
        if self.must_echo() {
            text = text.replace('\n', "\r\n");
        }
        self.send_bytes(text.as_bytes());
    }
}
