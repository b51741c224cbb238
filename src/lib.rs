//! rift-cli - An interactive command line session engine
//!
//! Serves a router-style CLI over Telnet connections and the local terminal.
//! Commands are described by a grammar tree; users may abbreviate keywords to
//! any unambiguous prefix and press `?` for context help.
//!
//! # Line Editing
//!
//! | Key | Action |
//! |-----|--------|
//! | Ctrl+A | Start of line |
//! | Ctrl+E | End of line |
//! | Left/Right | Move cursor |
//! | Up/Down, Ctrl+P/Ctrl+N | Browse history |
//! | Backspace | Delete before cursor |
//! | ? | Context help |
//!
//! # Example
//!
//! ```no_run
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use rift_cli::grammar::GrammarNode;
//!
//! let grammar: GrammarNode<u32> = GrammarNode::branch([(
//!     "count",
//!     GrammarNode::action(|count: &mut u32, session, _| {
//!         *count += 1;
//!         session.print(&format!("{}", count));
//!         Ok(())
//!     }),
//! )]);
//! let _shared = (Rc::new(grammar), Rc::new(RefCell::new(0u32)));
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod grammar;
pub mod history;
pub mod ui;

pub use crate::core::session::{
    Collaborators, ConnectionKind, Endpoint, PromptContext, Session, SessionOptions,
};
pub use crate::error::{CliError, Result};
pub use crate::grammar::{GrammarNode, Parameters, ParseMode};
