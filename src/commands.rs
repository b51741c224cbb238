//! Commands served by the rift-cli daemon

use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Instant;

use anyhow::Context;
use rift_cli::core::scheduler::SessionId;
use rift_cli::{ConnectionKind, GrammarNode, Parameters, Session};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Session known to the daemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub kind: ConnectionKind,
    pub peer: String,
}

/// Command handler shared by every session of the process
#[derive(Debug)]
pub struct Daemon {
    started: Instant,
    sessions: BTreeMap<SessionId, SessionInfo>,
}

impl Daemon {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            sessions: BTreeMap::new(),
        }
    }

    pub fn session_opened(&mut self, id: SessionId, kind: ConnectionKind, peer: &str) {
        self.sessions.insert(
            id,
            SessionInfo {
                kind,
                peer: peer.to_string(),
            },
        );
    }

    pub fn session_closed(&mut self, id: SessionId) {
        self.sessions.remove(&id);
    }

    pub fn sessions(&self) -> impl Iterator<Item = (&SessionId, &SessionInfo)> {
        self.sessions.iter()
    }

    fn show_version(
        &mut self,
        session: &mut Session<Daemon>,
        _: &Parameters,
    ) -> anyhow::Result<()> {
        session.print(&format!("rift-cli {}", VERSION));
        session.print(&format!("Uptime: {}s", self.started.elapsed().as_secs()));
        Ok(())
    }

    fn show_sessions(
        &mut self,
        session: &mut Session<Daemon>,
        _: &Parameters,
    ) -> anyhow::Result<()> {
        for (id, info) in self.sessions() {
            let marker = if *id == session.id() { "*" } else { " " };
            let kind = match info.kind {
                ConnectionKind::Local => "local",
                ConnectionKind::Network => "telnet",
            };
            session.print(&format!("{} {:<5} {:<7} {}", marker, id.to_string(), kind, info.peer));
        }
        Ok(())
    }
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

fn show_history(
    _: &mut Daemon,
    session: &mut Session<Daemon>,
    _: &Parameters,
) -> anyhow::Result<()> {
    let lines: Vec<String> = session
        .editor()
        .history()
        .entries()
        .enumerate()
        .map(|(i, entry)| format!("{:>4}  {}", i + 1, String::from_utf8_lossy(entry)))
        .collect();
    for line in &lines {
        session.print(line);
    }
    Ok(())
}

fn show_options(
    _: &mut Daemon,
    session: &mut Session<Daemon>,
    _: &Parameters,
) -> anyhow::Result<()> {
    let kind = match session.kind() {
        ConnectionKind::Local => "local",
        ConnectionKind::Network => "telnet",
    };
    let echo = if session.must_echo() { "on" } else { "off" };
    let negotiated = format!("{:?}", session.negotiated());
    session.print(&format!("Connection: {}", kind));
    session.print(&format!("Echo: {}", echo));
    session.print(&format!("Negotiated: {}", negotiated));
    Ok(())
}

fn set_name(
    _: &mut Daemon,
    session: &mut Session<Daemon>,
    params: &Parameters,
) -> anyhow::Result<()> {
    let name = params.get("name").context("no name given")?.to_string();
    session.print(&format!("Name set to {}", name));
    session.set_prompt_context(Rc::new(name));
    Ok(())
}

fn echo(_: &mut Daemon, session: &mut Session<Daemon>, params: &Parameters) -> anyhow::Result<()> {
    let text = params.get("text").context("no text given")?;
    session.print(text);
    Ok(())
}

fn exit(_: &mut Daemon, session: &mut Session<Daemon>, _: &Parameters) -> anyhow::Result<()> {
    session.close();
    Ok(())
}

fn clear_history(
    _: &mut Daemon,
    session: &mut Session<Daemon>,
    _: &Parameters,
) -> anyhow::Result<()> {
    session.editor_mut().history_mut().clear();
    session.print("History cleared");
    Ok(())
}

/// The daemon's command grammar
pub fn grammar() -> GrammarNode<Daemon> {
    GrammarNode::branch([
        (
            "show",
            GrammarNode::branch([
                ("version", GrammarNode::action(Daemon::show_version)),
                ("sessions", GrammarNode::action(Daemon::show_sessions)),
                ("history", GrammarNode::action(show_history)),
                ("options", GrammarNode::action(show_options)),
            ]),
        ),
        (
            "set",
            GrammarNode::branch([(
                "name",
                GrammarNode::branch([("$name", GrammarNode::action(set_name))]),
            )]),
        ),
        ("echo", GrammarNode::branch([("$text", GrammarNode::action(echo))])),
        ("exit", GrammarNode::action(exit)),
        ("clear", GrammarNode::branch([("history", GrammarNode::action(clear_history))])),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rift_cli::grammar::{parse_line, ParseOutcome};
    use rift_cli::ParseMode;

    #[test]
    fn test_command_listing() {
        let root = grammar();
        let err = parse_line(&root, "", ParseMode::Help).unwrap_err();
        assert_eq!(
            err.details(),
            &[
                "clear history",
                "echo text <text>",
                "exit",
                "set name name <name>",
                "show history",
                "show options",
                "show sessions",
                "show version",
            ]
        );
    }

    #[test]
    fn test_abbreviations() {
        let root = grammar();
        for (line, expected) in [
            ("sh ver", "show version"),
            ("sh se", "show sessions"),
            ("cl h", "clear history"),
            ("ec t hello", "echo hello"),
            ("ex", "exit"),
        ] {
            match parse_line(&root, line, ParseMode::Execute).unwrap() {
                ParseOutcome::Execute { normalized, .. } => assert_eq!(normalized, expected),
                other => panic!("{}: expected an action, got {:?}", line, other),
            }
        }
        // "e" alone could be echo or exit
        assert!(parse_line(&root, "e", ParseMode::Execute).is_err());
    }

    #[test]
    fn test_session_registry() {
        let mut daemon = Daemon::new();
        daemon.session_opened(SessionId(1), ConnectionKind::Local, "local");
        daemon.session_opened(SessionId(2), ConnectionKind::Network, "192.0.2.7:40000");
        daemon.session_closed(SessionId(1));
        let peers: Vec<&str> = daemon.sessions().map(|(_, info)| info.peer.as_str()).collect();
        assert_eq!(peers, vec!["192.0.2.7:40000"]);
    }
}
