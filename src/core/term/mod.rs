//! Terminal input protocol: Telnet and VT100 constants and the input decoder.

pub mod decoder;
pub mod telnet;

pub use decoder::{decode_next, Decoded, InputBuffer, InputEvent};
pub use telnet::{TelnetOptions, TelnetVerb};
