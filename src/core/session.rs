//! CLI session
//!
//! Ties one connection (or the local terminal) to the line editor, renderer,
//! decoder and command parser:
//!
//! ```text
//! scheduler -> Session::on_readable
//!                 ├── read chunk into InputBuffer
//!                 └── decode_next ... until empty / incomplete
//!                       ├── editor operation  -> Renderer
//!                       ├── telnet DO/DONT    -> negotiated options
//!                       └── end of line       -> parse_line -> action
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, info, warn};

use super::channel::{InputChannel, OutputChannel};
use super::editor::LineEditor;
use super::scheduler::{SchedulerHandle, SessionId};
use super::term::decoder::{decode_next, Decoded, InputBuffer, InputEvent};
use super::term::telnet::{option, TelnetOptions, TelnetVerb};
use crate::error::CliError;
use crate::grammar::{parse_line, GrammarNode, ParseMode, ParseOutcome};
use crate::history::HISTORY_LIMIT;
use crate::ui::Renderer;

/// Bytes requested from the input channel per readiness callback
pub const READ_CHUNK_SIZE: usize = 1024;

/// Where a session's bytes come from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionKind {
    /// The hosting process's own terminal; always echoes, never negotiates
    Local,
    /// A Telnet connection
    Network,
}

/// Supplies the name shown in the prompt and in session log lines
pub trait PromptContext {
    fn display_name(&self) -> &str;
}

impl PromptContext for String {
    fn display_name(&self) -> &str {
        self
    }
}

impl PromptContext for &'static str {
    fn display_name(&self) -> &str {
        self
    }
}

/// Channels and identity of a new session
pub struct Endpoint {
    pub kind: ConnectionKind,
    pub input: Box<dyn InputChannel>,
    pub output: Box<dyn OutputChannel>,
    /// `host:port` of the remote side, `local` for the terminal
    pub peer: String,
}

impl Endpoint {
    pub fn local(input: Box<dyn InputChannel>, output: Box<dyn OutputChannel>) -> Self {
        Self {
            kind: ConnectionKind::Local,
            input,
            output,
            peer: "local".to_string(),
        }
    }

    pub fn network(
        input: Box<dyn InputChannel>,
        output: Box<dyn OutputChannel>,
        peer: impl Into<String>,
    ) -> Self {
        Self {
            kind: ConnectionKind::Network,
            input,
            output,
            peer: peer.into(),
        }
    }
}

/// Objects owned outside the session
pub struct Collaborators<H> {
    pub grammar: Rc<GrammarNode<H>>,
    /// Shared with every other session of the process
    pub command_handler: Rc<RefCell<H>>,
    pub prompt: Rc<dyn PromptContext>,
    pub scheduler: SchedulerHandle,
}

/// Session tunables
pub struct SessionOptions {
    pub read_chunk_size: usize,
    pub history_limit: usize,
    /// Send cursor movement and erase sequences only while echo is in force
    pub gate_control_sequences: bool,
    /// Runs when a local session closes; exits the process unless replaced
    pub on_local_session_closed: Box<dyn FnMut()>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            read_chunk_size: READ_CHUNK_SIZE,
            history_limit: HISTORY_LIMIT,
            gate_control_sequences: false,
            on_local_session_closed: Box::new(|| std::process::exit(0)),
        }
    }
}

/// An interactive CLI session
pub struct Session<H> {
    id: SessionId,
    kind: ConnectionKind,
    peer: String,
    /// `None` once released
    input: Option<Box<dyn InputChannel>>,
    renderer: Renderer,
    input_buffer: InputBuffer,
    editor: LineEditor,
    grammar: Rc<GrammarNode<H>>,
    command_handler: Rc<RefCell<H>>,
    prompt: Rc<dyn PromptContext>,
    scheduler: SchedulerHandle,
    read_chunk_size: usize,
    on_local_session_closed: Box<dyn FnMut()>,
    closed: bool,
}

impl<H> Session<H> {
    /// Start a session: register for input, announce Telnet options and
    /// show the first prompt
    pub fn open(
        endpoint: Endpoint,
        collaborators: Collaborators<H>,
        options: SessionOptions,
    ) -> Self {
        let Endpoint {
            kind,
            input,
            output,
            peer,
        } = endpoint;
        let id = collaborators.scheduler.borrow_mut().allocate_id();
        let input_handle = input.handle();

        let mut session = Self {
            id,
            kind,
            peer,
            input: Some(input),
            renderer: Renderer::new(output, kind, options.gate_control_sequences),
            input_buffer: InputBuffer::new(),
            editor: LineEditor::new(options.history_limit),
            grammar: collaborators.grammar,
            command_handler: collaborators.command_handler,
            prompt: collaborators.prompt,
            scheduler: collaborators.scheduler,
            read_chunk_size: options.read_chunk_size.max(1),
            on_local_session_closed: options.on_local_session_closed,
            closed: false,
        };

        info!("[{}] {}: Open CLI session", session.node_name(), session.peer);
        if kind == ConnectionKind::Network {
            session.renderer.send_will(option::SUPPRESS_GO_AHEAD);
            session.renderer.send_will(option::ECHO);
        }
        session.scheduler.borrow_mut().register_handler(id, input_handle);
        session.print_prompt();
        session
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn kind(&self) -> ConnectionKind {
        self.kind
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Options the remote side has enabled with DO
    pub fn negotiated(&self) -> TelnetOptions {
        self.renderer.negotiated()
    }

    pub fn must_echo(&self) -> bool {
        self.renderer.must_echo()
    }

    pub fn editor(&self) -> &LineEditor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut LineEditor {
        &mut self.editor
    }

    pub fn prompt_context(&self) -> &Rc<dyn PromptContext> {
        &self.prompt
    }

    /// Switch prompt context, e.g. when entering another command mode
    pub fn set_prompt_context(&mut self, prompt: Rc<dyn PromptContext>) {
        self.prompt = prompt;
    }

    pub fn node_name(&self) -> &str {
        self.prompt.display_name()
    }

    /// Print a line of output to the user
    pub fn print(&mut self, message: &str) {
        self.renderer.print(message);
    }

    pub fn print_prompt(&mut self) {
        let prompt = format!("{}> ", self.node_name());
        self.renderer.print_text(&prompt, false);
    }

    /// Scheduler callback: the input channel has data
    pub fn on_readable(&mut self) {
        if self.closed {
            return;
        }
        let Some(input) = self.input.as_mut() else {
            return;
        };
        let mut chunk = vec![0u8; self.read_chunk_size];
        match input.read(&mut chunk) {
            Ok(0) => {
                debug!("[{}] {}: End of input", self.node_name(), self.peer);
                self.close();
            }
            Ok(n) => {
                self.input_buffer.extend(&chunk[..n]);
                self.process_input();
            }
            Err(source) => {
                let err = CliError::Read {
                    peer: self.peer.clone(),
                    source,
                };
                debug!("[{}] {}", self.node_name(), err);
                self.close();
            }
        }
    }

    /// Decode buffered bytes until none are left or a sequence is incomplete
    pub fn process_input(&mut self) {
        while !self.closed {
            match decode_next(&mut self.input_buffer) {
                None | Some(Decoded::Incomplete) => break,
                Some(Decoded::Discarded) => {}
                Some(Decoded::Event(event)) => self.handle_event(event),
            }
        }
    }

    fn handle_event(&mut self, event: InputEvent) {
        let editor = &mut self.editor;
        let out = &mut self.renderer;
        match event {
            InputEvent::EndOfLine => self.complete_line(),
            InputEvent::ContextHelp => self.context_help(),
            InputEvent::Telnet { verb, option: code } => self.negotiate(verb, code),
            InputEvent::CursorToStart => editor.move_to_start(out),
            InputEvent::CursorToEnd => editor.move_to_end(out),
            InputEvent::CursorLeft => editor.move_left(out),
            InputEvent::CursorRight => editor.move_right(out),
            InputEvent::HistoryPrevious => editor.history_previous(out),
            InputEvent::HistoryNext => editor.history_next(out),
            InputEvent::DeleteBeforeCursor => editor.delete_before_cursor(out),
            InputEvent::Insert(byte) => editor.insert(byte, out),
        }
    }

    /// Apply a DO / DONT from the remote side
    fn negotiate(&mut self, verb: TelnetVerb, code: u8) {
        let Some(flag) = TelnetOptions::from_option_code(code) else {
            return;
        };
        let enabled = match verb {
            TelnetVerb::Do => true,
            TelnetVerb::Dont => false,
            _ => return,
        };
        debug!(
            "[{}] {}: Telnet {:?} {:?}",
            self.node_name(),
            self.peer,
            verb,
            flag
        );
        self.renderer.set_negotiated(flag, enabled);
    }

    fn complete_line(&mut self) {
        self.renderer.echo_bytes(b"\r\n");
        let line = self.editor.take_line();
        match std::str::from_utf8(&line) {
            Ok(command) => {
                info!(
                    "[{}] {}: Execute CLI command \"{}\"",
                    self.node_name(),
                    self.peer,
                    command
                );
                self.execute(command, ParseMode::Execute);
            }
            Err(_) => self.print("UTF-8 decode of command failed"),
        }
        if self.closed {
            return;
        }
        self.print_prompt();
        self.editor.commit(line);
    }

    fn context_help(&mut self) {
        self.print("");
        match String::from_utf8(self.editor.buffer().to_vec()) {
            Ok(command) => self.execute(&command, ParseMode::Help),
            Err(_) => self.print("UTF-8 decode of command failed"),
        }
        self.print_prompt();
        self.editor.redraw(&mut self.renderer);
    }

    /// Parse `command` and run or describe it
    pub fn execute(&mut self, command: &str, mode: ParseMode) {
        let grammar = Rc::clone(&self.grammar);
        match parse_line(&grammar, command, mode) {
            Ok(ParseOutcome::Empty) => {}
            Ok(ParseOutcome::Help(lines)) => {
                for line in &lines {
                    self.print(line);
                }
            }
            Ok(ParseOutcome::Execute {
                action, parameters, ..
            }) => {
                let handler = Rc::clone(&self.command_handler);
                let result = match handler.try_borrow_mut() {
                    Ok(mut handler) => action(&mut *handler, self, &parameters),
                    Err(_) => Err(CliError::HandlerBusy.into()),
                };
                if let Err(e) = result {
                    warn!(
                        "[{}] {}: Command \"{}\" failed: {:#}",
                        self.node_name(),
                        self.peer,
                        command,
                        e
                    );
                    self.print(&format!("Command failed: {:#}", e));
                }
            }
            Err(e) => {
                self.print(&e.to_string());
                for line in e.details() {
                    self.print(line);
                }
            }
        }
    }

    /// End the session
    ///
    /// Network sessions release their channels and go inert; closing the local
    /// session runs `on_local_session_closed`, which exits the process by
    /// default.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        info!("[{}] {}: Close CLI session", self.node_name(), self.peer);
        self.closed = true;
        self.scheduler.borrow_mut().unregister_handler(self.id);

        match self.kind {
            ConnectionKind::Network => self.release_channels(),
            ConnectionKind::Local => (self.on_local_session_closed)(),
        }
    }

    fn release_channels(&mut self) {
        let input = self.input.take();
        let output = self.renderer.take_output();
        let input_handle = input.as_ref().map(|i| i.handle());

        if let Some(mut input) = input {
            if let Err(source) = input.release() {
                warn!("{}", CliError::Release { handle: input.handle(), source });
            }
        }
        if let Some(mut output) = output {
            if Some(output.handle()) != input_handle {
                if let Err(source) = output.release() {
                    warn!("{}", CliError::Release { handle: output.handle(), source });
                }
            }
        }
    }
}
