//! Single-line command editor
//!
//! Owns the command being typed, the cursor inside it and the session's
//! history. Every operation keeps the remote display in step through the
//! [`Renderer`]. Positions are byte offsets: no attempt is made to account for
//! multi-byte characters.

use std::mem;

use crate::history::{CommandHistory, HistoryStep};
use crate::ui::Renderer;

#[derive(Debug, Default)]
pub struct LineEditor {
    buffer: Vec<u8>,
    /// Always within `0..=buffer.len()`
    cursor: usize,
    history: CommandHistory,
}

impl LineEditor {
    pub fn new(history_limit: usize) -> Self {
        Self {
            buffer: Vec::new(),
            cursor: 0,
            history: CommandHistory::new(history_limit),
        }
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut CommandHistory {
        &mut self.history
    }

    /// Insert a byte at the cursor
    pub fn insert(&mut self, byte: u8, out: &mut Renderer) {
        self.history.stop_browsing();
        if self.cursor >= self.buffer.len() {
            out.echo_bytes(&[byte]);
            self.buffer.push(byte);
            self.cursor += 1;
        } else {
            self.buffer.insert(self.cursor, byte);
            self.refresh_from_cursor(out);
            self.cursor += 1;
            out.cursor_right(1);
        }
    }

    /// Backspace
    pub fn delete_before_cursor(&mut self, out: &mut Renderer) {
        if self.cursor == 0 {
            out.bell();
            return;
        }
        self.history.stop_browsing();
        self.cursor -= 1;
        self.buffer.remove(self.cursor);
        out.cursor_left(1);
        self.refresh_from_cursor(out);
    }

    pub fn move_left(&mut self, out: &mut Renderer) {
        if self.cursor > 0 {
            self.cursor -= 1;
            out.cursor_left(1);
        } else {
            out.bell();
        }
    }

    pub fn move_right(&mut self, out: &mut Renderer) {
        if self.cursor < self.buffer.len() {
            self.cursor += 1;
            out.cursor_right(1);
        } else {
            out.bell();
        }
    }

    pub fn move_to_start(&mut self, out: &mut Renderer) {
        out.cursor_left(self.cursor);
        self.cursor = 0;
    }

    pub fn move_to_end(&mut self, out: &mut Renderer) {
        out.cursor_right(self.buffer.len() - self.cursor);
        self.cursor = self.buffer.len();
    }

    /// Swap the whole line for `content`, leaving the cursor at its end
    pub fn replace_line(&mut self, content: Vec<u8>, out: &mut Renderer) {
        self.move_to_start(out);
        out.erase_to_end_of_line();
        self.buffer = content;
        out.send_control(&self.buffer);
        self.cursor = self.buffer.len();
    }

    pub fn history_previous(&mut self, out: &mut Renderer) {
        match self.history.previous(&self.buffer) {
            HistoryStep::Bell => out.bell(),
            HistoryStep::Recall(line) => self.replace_line(line, out),
        }
    }

    pub fn history_next(&mut self, out: &mut Renderer) {
        match self.history.next() {
            HistoryStep::Bell => out.bell(),
            HistoryStep::Recall(line) => self.replace_line(line, out),
        }
    }

    /// Take the finished line, leaving an empty buffer
    pub fn take_line(&mut self) -> Vec<u8> {
        self.cursor = 0;
        mem::take(&mut self.buffer)
    }

    /// Record a finished line; blank lines are not kept
    pub fn commit(&mut self, line: Vec<u8>) {
        if !line.is_empty() {
            self.history.add(line);
        }
    }

    /// Redraw the line after a fresh prompt, cursor back where it was
    pub fn redraw(&self, out: &mut Renderer) {
        out.send_bytes(&self.buffer);
        out.cursor_left(self.buffer.len() - self.cursor);
    }

    /// Erase from the cursor, retransmit the tail and step back over it
    fn refresh_from_cursor(&self, out: &mut Renderer) {
        let tail = &self.buffer[self.cursor..];
        out.erase_to_end_of_line();
        out.send_control(tail);
        out.cursor_left(tail.len());
    }
}
