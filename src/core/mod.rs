//! Core session engine components.
//!
//! - **term**: Telnet/VT100 byte constants and the resumable input decoder
//! - **channel**: Input/output channel traits with handle identity
//! - **editor**: Line editor with cursor and history navigation
//! - **scheduler**: Read-readiness registration (and a `poll(2)` loop on Unix)
//! - **session**: One CLI session tying the pieces together
//!
//! # Architecture
//!
//! ```text
//! Session
//! ├── InputChannel + InputBuffer (decoder)
//! ├── LineEditor
//! │   └── CommandHistory
//! ├── Renderer (OutputChannel + echo policy)
//! └── Collaborators (grammar, command handler, prompt, scheduler)
//! ```

pub mod channel;
pub mod editor;
pub mod scheduler;
pub mod session;
pub mod term;
