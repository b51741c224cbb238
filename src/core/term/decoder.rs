//! Telnet/VT100 input decoder
//!
//! Classifies the bytes at the head of an [`InputBuffer`] into editor events.
//! Multi-byte sequences (CR LF, `ESC [ x`, `IAC <verb> <option>`) are only
//! consumed once every byte they need has arrived; until then the decoder
//! reports [`Decoded::Incomplete`] and leaves the buffer untouched, so the
//! next read resumes from the same position.

use super::telnet::{control, iac, vt100, TelnetVerb};

/// Compact the buffer once this many consumed bytes sit in front of the data
const COMPACT_THRESHOLD: usize = 4096;

/// Received but not yet decoded bytes
///
/// Bytes are appended at the tail and consumed by advancing a read offset.
/// The consumed prefix is dropped lazily.
#[derive(Debug, Default)]
pub struct InputBuffer {
    bytes: Vec<u8>,
    offset: usize,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append newly read bytes
    pub fn extend(&mut self, data: &[u8]) {
        self.compact();
        self.bytes.extend_from_slice(data);
    }

    /// Unconsumed bytes
    pub fn pending(&self) -> &[u8] {
        &self.bytes[self.offset..]
    }

    pub fn len(&self) -> usize {
        self.bytes.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mark `count` bytes at the head as consumed
    fn consume(&mut self, count: usize) {
        self.offset = (self.offset + count).min(self.bytes.len());
        if self.offset == self.bytes.len() {
            self.bytes.clear();
            self.offset = 0;
        }
    }

    fn compact(&mut self) {
        if self.offset >= COMPACT_THRESHOLD {
            self.bytes.drain(..self.offset);
            self.offset = 0;
        }
    }
}

/// Editor-level event decoded from the input stream
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    /// CR, LF or CR LF
    EndOfLine,
    CursorToStart,
    CursorToEnd,
    CursorLeft,
    CursorRight,
    HistoryPrevious,
    HistoryNext,
    DeleteBeforeCursor,
    ContextHelp,
    /// `IAC <verb> <option>`
    Telnet { verb: TelnetVerb, option: u8 },
    /// Literal byte for the command buffer
    Insert(u8),
}

/// Result of one decode step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decoded {
    Event(InputEvent),
    /// Bytes consumed without producing an event (NUL, unknown escapes)
    Discarded,
    /// The sequence at the head needs more bytes; nothing was consumed
    Incomplete,
}

/// Decode one step from the head of `buffer`
///
/// Returns `None` when the buffer is empty.
pub fn decode_next(buffer: &mut InputBuffer) -> Option<Decoded> {
    let pending = buffer.pending();
    let &byte = pending.first()?;

    let (consumed, decoded) = match byte {
        control::NUL => (1, Decoded::Discarded),
        control::LF => (1, Decoded::Event(InputEvent::EndOfLine)),
        control::CR => match pending.get(1) {
            None => (0, Decoded::Incomplete),
            Some(&control::LF) => (2, Decoded::Event(InputEvent::EndOfLine)),
            Some(_) => (1, Decoded::Event(InputEvent::EndOfLine)),
        },
        control::CTRL_A => (1, Decoded::Event(InputEvent::CursorToStart)),
        control::CTRL_E => (1, Decoded::Event(InputEvent::CursorToEnd)),
        control::CTRL_N => (1, Decoded::Event(InputEvent::HistoryNext)),
        control::CTRL_P => (1, Decoded::Event(InputEvent::HistoryPrevious)),
        iac::IAC => match pending {
            [_, verb, option, ..] => (
                3,
                Decoded::Event(InputEvent::Telnet {
                    verb: TelnetVerb::from(*verb),
                    option: *option,
                }),
            ),
            _ => (0, Decoded::Incomplete),
        },
        control::DEL => (1, Decoded::Event(InputEvent::DeleteBeforeCursor)),
        control::ESC => match pending {
            [_, first, second, ..] => (3, decode_escape(*first, *second)),
            _ => (0, Decoded::Incomplete),
        },
        control::QUESTION_MARK => (1, Decoded::Event(InputEvent::ContextHelp)),
        other => (1, Decoded::Event(InputEvent::Insert(other))),
    };

    buffer.consume(consumed);
    Some(decoded)
}

/// Only `ESC [ <letter>` is understood; anything else is swallowed
fn decode_escape(first: u8, second: u8) -> Decoded {
    if first != vt100::LEFT_SQUARE_BRACKET {
        tracing::trace!("Discarding escape sequence ESC {:#04x} {:#04x}", first, second);
        return Decoded::Discarded;
    }
    match second {
        vt100::CURSOR_LEFT => Decoded::Event(InputEvent::CursorLeft),
        vt100::CURSOR_RIGHT => Decoded::Event(InputEvent::CursorRight),
        vt100::CURSOR_UP => Decoded::Event(InputEvent::HistoryPrevious),
        vt100::CURSOR_DOWN => Decoded::Event(InputEvent::HistoryNext),
        _ => {
            tracing::trace!("Discarding escape sequence ESC [ {:#04x}", second);
            Decoded::Discarded
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(buffer: &mut InputBuffer) -> Vec<Decoded> {
        let mut out = Vec::new();
        while let Some(step) = decode_next(buffer) {
            out.push(step);
            if step == Decoded::Incomplete {
                break;
            }
        }
        out
    }

    #[test]
    fn test_literal_bytes() {
        let mut buffer = InputBuffer::new();
        buffer.extend(b"ab");
        assert_eq!(
            decode_all(&mut buffer),
            vec![
                Decoded::Event(InputEvent::Insert(b'a')),
                Decoded::Event(InputEvent::Insert(b'b')),
            ]
        );
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_escape_defers_until_complete() {
        let mut buffer = InputBuffer::new();
        buffer.extend(&[0x1B]);
        assert_eq!(decode_next(&mut buffer), Some(Decoded::Incomplete));
        assert_eq!(buffer.pending(), &[0x1B]);

        buffer.extend(b"[");
        assert_eq!(decode_next(&mut buffer), Some(Decoded::Incomplete));
        assert_eq!(buffer.pending(), b"\x1b[");

        buffer.extend(b"Dx");
        assert_eq!(
            decode_next(&mut buffer),
            Some(Decoded::Event(InputEvent::CursorLeft))
        );
        assert_eq!(
            decode_next(&mut buffer),
            Some(Decoded::Event(InputEvent::Insert(b'x')))
        );
        assert_eq!(decode_next(&mut buffer), None);
    }

    #[test]
    fn test_arrow_keys() {
        let mut buffer = InputBuffer::new();
        buffer.extend(b"\x1b[A\x1b[B\x1b[C\x1b[D\x1b[Z\x1bOA");
        assert_eq!(
            decode_all(&mut buffer),
            vec![
                Decoded::Event(InputEvent::HistoryPrevious),
                Decoded::Event(InputEvent::HistoryNext),
                Decoded::Event(InputEvent::CursorRight),
                Decoded::Event(InputEvent::CursorLeft),
                Decoded::Discarded,
                Decoded::Discarded,
            ]
        );
    }

    #[test]
    fn test_carriage_return() {
        let mut buffer = InputBuffer::new();
        buffer.extend(b"\r");
        assert_eq!(decode_next(&mut buffer), Some(Decoded::Incomplete));
        assert_eq!(buffer.len(), 1);

        buffer.extend(b"\n");
        assert_eq!(
            decode_next(&mut buffer),
            Some(Decoded::Event(InputEvent::EndOfLine))
        );
        assert!(buffer.is_empty());

        // CR followed by something else terminates the line on its own
        buffer.extend(b"\rx");
        assert_eq!(
            decode_all(&mut buffer),
            vec![
                Decoded::Event(InputEvent::EndOfLine),
                Decoded::Event(InputEvent::Insert(b'x')),
            ]
        );
    }

    #[test]
    fn test_telnet_command() {
        let mut buffer = InputBuffer::new();
        buffer.extend(&[255, 253]);
        assert_eq!(decode_next(&mut buffer), Some(Decoded::Incomplete));
        buffer.extend(&[1, 0, b'?']);
        assert_eq!(
            decode_all(&mut buffer),
            vec![
                Decoded::Event(InputEvent::Telnet {
                    verb: TelnetVerb::Do,
                    option: 1
                }),
                Decoded::Discarded,
                Decoded::Event(InputEvent::ContextHelp),
            ]
        );
    }

    #[test]
    fn test_control_characters() {
        let mut buffer = InputBuffer::new();
        buffer.extend(&[0x01, 0x05, 0x0E, 0x10, 0x7F, b'\n']);
        assert_eq!(
            decode_all(&mut buffer),
            vec![
                Decoded::Event(InputEvent::CursorToStart),
                Decoded::Event(InputEvent::CursorToEnd),
                Decoded::Event(InputEvent::HistoryNext),
                Decoded::Event(InputEvent::HistoryPrevious),
                Decoded::Event(InputEvent::DeleteBeforeCursor),
                Decoded::Event(InputEvent::EndOfLine),
            ]
        );
    }

    #[test]
    fn test_compaction_keeps_pending_bytes() {
        let mut buffer = InputBuffer::new();
        let mut data = vec![b'a'; COMPACT_THRESHOLD + 10];
        data.push(0x1B);
        buffer.extend(&data);
        for _ in 0..COMPACT_THRESHOLD + 10 {
            decode_next(&mut buffer);
        }
        assert_eq!(decode_next(&mut buffer), Some(Decoded::Incomplete));
        buffer.extend(b"[C");
        assert_eq!(buffer.pending(), b"\x1b[C");
        assert_eq!(
            decode_next(&mut buffer),
            Some(Decoded::Event(InputEvent::CursorRight))
        );
    }
}
