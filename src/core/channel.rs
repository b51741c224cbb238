//! Input and output channels of a session
//!
//! A channel is a byte stream plus the handle the scheduler watches. The input
//! and output of a network session are usually the same socket, which is why
//! handles are compared before anything is released.

use std::io::{self, Read, Write};

/// Identifies the OS handle behind a channel (a file descriptor on Unix)
pub type ChannelHandle = i32;

/// Readable side of a session
pub trait InputChannel: Read {
    fn handle(&self) -> ChannelHandle;

    /// Release the underlying handle; called at most once
    fn release(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writable side of a session
pub trait OutputChannel: Write {
    fn handle(&self) -> ChannelHandle;

    /// Release the underlying handle; called at most once
    fn release(&mut self) -> io::Result<()> {
        Ok(())
    }
}
