//! Telnet, VT100 and control byte definitions
//!
//! Only the subset the session engine reacts to or emits is defined here.

use bitflags::bitflags;

/// Control characters consumed from the input stream
pub mod control {
    pub const NUL: u8 = 0x00;
    pub const CTRL_A: u8 = 0x01;
    pub const CTRL_E: u8 = 0x05;
    pub const BELL: u8 = 0x07;
    pub const LF: u8 = 0x0A;
    pub const CR: u8 = 0x0D;
    pub const CTRL_N: u8 = 0x0E;
    pub const CTRL_P: u8 = 0x10;
    pub const ESC: u8 = 0x1B;
    pub const QUESTION_MARK: u8 = b'?';
    pub const DEL: u8 = 0x7F;
}

/// Telnet commands (RFC 854)
pub mod iac {
    pub const WILL: u8 = 251;
    pub const WONT: u8 = 252;
    pub const DO: u8 = 253;
    pub const DONT: u8 = 254;
    /// Interpret As Command
    pub const IAC: u8 = 255;
}

/// Telnet option codes
pub mod option {
    pub const ECHO: u8 = 1;
    pub const SUPPRESS_GO_AHEAD: u8 = 3;
}

/// VT100 bytes following `ESC [`
pub mod vt100 {
    pub const LEFT_SQUARE_BRACKET: u8 = b'[';
    pub const CURSOR_UP: u8 = b'A';
    pub const CURSOR_DOWN: u8 = b'B';
    pub const CURSOR_RIGHT: u8 = b'C';
    pub const CURSOR_LEFT: u8 = b'D';
    pub const ERASE_TO_END_OF_LINE: u8 = b'K';
}

bitflags! {
    /// Options the remote side has asked us to perform (via DO / DONT)
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct TelnetOptions: u8 {
        const ECHO              = 0b0001;
        const SUPPRESS_GO_AHEAD = 0b0010;
    }
}

impl TelnetOptions {
    /// Map a Telnet option code to the flag we track for it
    pub fn from_option_code(code: u8) -> Option<Self> {
        match code {
            option::ECHO => Some(Self::ECHO),
            option::SUPPRESS_GO_AHEAD => Some(Self::SUPPRESS_GO_AHEAD),
            _ => None,
        }
    }
}

/// Telnet negotiation verb carried by `IAC <verb> <option>`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TelnetVerb {
    Will,
    Wont,
    Do,
    Dont,
    Other(u8),
}

impl From<u8> for TelnetVerb {
    fn from(byte: u8) -> Self {
        match byte {
            iac::WILL => TelnetVerb::Will,
            iac::WONT => TelnetVerb::Wont,
            iac::DO => TelnetVerb::Do,
            iac::DONT => TelnetVerb::Dont,
            other => TelnetVerb::Other(other),
        }
    }
}

/// `IAC WILL <option>`
pub fn will(option: u8) -> [u8; 3] {
    [iac::IAC, iac::WILL, option]
}
