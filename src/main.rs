//! rift-cli - A router-style command line daemon
//!
//! Serves the rift command set on the local terminal and, optionally, to
//! Telnet clients.
//!
//! # Quick Start
//!
//! ```text
//! rift-cli                              # Local session only
//! rift-cli -l 127.0.0.1:2323            # Local session plus Telnet
//! rift-cli --no-interactive -l :2323    # Telnet only
//! ```

mod commands;

use std::env;
use std::path::PathBuf;

use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use rift_cli::config::Config;

/// Command line overrides
#[derive(Debug, Default)]
struct Args {
    config_path: Option<PathBuf>,
    listen: Option<String>,
    name: Option<String>,
    no_interactive: bool,
}

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    eprintln!("rift-cli {}", VERSION);
}

fn print_help() {
    eprintln!("rift-cli {} - A router-style command line daemon", VERSION);
    eprintln!();
    eprintln!("Usage: rift-cli [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --config <PATH>   Config file (default: ~/.rift-cli/config.toml)");
    eprintln!("  -l, --listen <ADDR>   Accept Telnet sessions on host:port");
    eprintln!("  -n, --name <NAME>     Name shown in the prompt");
    eprintln!("  --no-interactive      Do not attach a session to this terminal");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Line editing:");
    eprintln!("  Ctrl+A / Ctrl+E       Start / end of line");
    eprintln!("  Left / Right          Move cursor");
    eprintln!("  Up / Down             Browse history (also Ctrl+P / Ctrl+N)");
    eprintln!("  Backspace             Delete before cursor");
    eprintln!("  ?                     Context help");
    eprintln!("  Abbreviate any keyword to a unique prefix, e.g. \"sh ver\"");
}

fn parse_args() -> Result<Args, String> {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args::default();
    let mut i = 1;

    let value = |i: &mut usize, flag: &str| -> Result<String, String> {
        *i += 1;
        args.get(*i)
            .cloned()
            .ok_or_else(|| format!("Missing argument for {}", flag))
    };

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-c" | "--config" => {
                parsed.config_path = Some(PathBuf::from(value(&mut i, "--config")?));
            }
            "-l" | "--listen" => {
                parsed.listen = Some(value(&mut i, "--listen")?);
            }
            "-n" | "--name" => {
                parsed.name = Some(value(&mut i, "--name")?);
            }
            "--no-interactive" => {
                parsed.no_interactive = true;
            }
            arg => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
        }
        i += 1;
    }

    Ok(parsed)
}

/// Config file plus command line overrides
fn load_config(args: Args) -> anyhow::Result<Config> {
    let mut config = match &args.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_else(|e| {
            eprintln!("Warning: {}, using defaults", e);
            Config::default()
        }),
    };
    if let Some(listen) = args.listen {
        config.listen = Some(listen);
    }
    if let Some(name) = args.name {
        config.name = name;
    }
    if args.no_interactive {
        config.interactive = false;
    }
    Ok(config)
}

/// Log to a file while the terminal hosts a session, to stderr otherwise
fn init_logging(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    if !config.interactive {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
        return;
    }

    let log_path = config.log_path();
    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() -> anyhow::Result<()> {
    let args = match parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    let config = load_config(args)?;
    init_logging(&config);
    info!("rift-cli {} starting as {}", VERSION, config.name);

    if !config.interactive && config.listen.is_none() {
        anyhow::bail!("Nothing to serve: --no-interactive needs --listen");
    }

    let result = daemon::run(config);
    if let Err(e) = &result {
        error!("rift-cli stopped: {:#}", e);
    }
    result
}

#[cfg(unix)]
mod daemon {
    //! Unix event loop: the local terminal and Telnet clients share one
    //! `poll(2)` scheduler and one command handler.

    use std::cell::{Cell, RefCell};
    use std::collections::BTreeMap;
    use std::io::{self, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::os::unix::io::AsRawFd;
    use std::rc::Rc;

    use anyhow::Context;
    use crossterm::terminal;
    use tracing::{info, warn};

    use rift_cli::config::Config;
    use rift_cli::core::channel::{ChannelHandle, InputChannel, OutputChannel};
    use rift_cli::core::scheduler::{PollScheduler, SchedulerHandle, SessionId};
    use rift_cli::{Collaborators, Endpoint, GrammarNode, PromptContext, Session};

    use crate::commands::{self, Daemon};

    const STDIN_HANDLE: ChannelHandle = 0;
    const STDOUT_HANDLE: ChannelHandle = 1;

    /// Terminal input in raw mode
    ///
    /// Reads the descriptor directly: buffered bytes would be invisible to
    /// `poll`. CR is turned into LF as the cooked line discipline would.
    struct LocalInput;

    impl Read for LocalInput {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = loop {
                let n = unsafe {
                    libc::read(STDIN_HANDLE, buf.as_mut_ptr() as *mut libc::c_void, buf.len())
                };
                if n >= 0 {
                    break n as usize;
                }
                let err = io::Error::last_os_error();
                if err.kind() != io::ErrorKind::Interrupted {
                    return Err(err);
                }
            };
            translate_carriage_returns(&mut buf[..n]);
            Ok(n)
        }
    }

    /// Raw mode delivers Enter as a lone CR; end such lines with LF instead
    ///
    /// A CR already followed by LF in the same chunk is left for the decoder,
    /// which treats CR LF as one terminator.
    fn translate_carriage_returns(bytes: &mut [u8]) {
        for i in 0..bytes.len() {
            if bytes[i] == b'\r' && bytes.get(i + 1) != Some(&b'\n') {
                bytes[i] = b'\n';
            }
        }
    }

    impl InputChannel for LocalInput {
        fn handle(&self) -> ChannelHandle {
            STDIN_HANDLE
        }
    }

    struct LocalOutput(io::Stdout);

    impl Write for LocalOutput {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.0.flush()
        }
    }

    impl OutputChannel for LocalOutput {
        fn handle(&self) -> ChannelHandle {
            STDOUT_HANDLE
        }
    }

    /// A Telnet connection; both directions share the socket
    #[derive(Clone)]
    struct TelnetStream(Rc<TcpStream>);

    impl TelnetStream {
        fn shutdown(&self) -> io::Result<()> {
            self.0.shutdown(std::net::Shutdown::Both)
        }
    }

    impl Read for TelnetStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            (&*self.0).read(buf)
        }
    }

    impl Write for TelnetStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            (&*self.0).write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            (&*self.0).flush()
        }
    }

    impl InputChannel for TelnetStream {
        fn handle(&self) -> ChannelHandle {
            self.0.as_raw_fd()
        }

        fn release(&mut self) -> io::Result<()> {
            self.shutdown()
        }
    }

    impl OutputChannel for TelnetStream {
        fn handle(&self) -> ChannelHandle {
            self.0.as_raw_fd()
        }

        fn release(&mut self) -> io::Result<()> {
            self.shutdown()
        }
    }

    /// Restores the terminal mode on drop
    struct RawModeGuard;

    impl RawModeGuard {
        fn enable() -> anyhow::Result<Self> {
            terminal::enable_raw_mode().context("Failed to enable raw mode")?;
            Ok(Self)
        }
    }

    impl Drop for RawModeGuard {
        fn drop(&mut self) {
            let _ = terminal::disable_raw_mode();
        }
    }

    struct Host {
        config: Config,
        grammar: Rc<GrammarNode<Daemon>>,
        handler: Rc<RefCell<Daemon>>,
        prompt: Rc<dyn PromptContext>,
        poll: Rc<RefCell<PollScheduler>>,
        sessions: BTreeMap<SessionId, Session<Daemon>>,
    }

    impl Host {
        fn collaborators(&self) -> Collaborators<Daemon> {
            let scheduler: SchedulerHandle = self.poll.clone();
            Collaborators {
                grammar: Rc::clone(&self.grammar),
                command_handler: Rc::clone(&self.handler),
                prompt: Rc::clone(&self.prompt),
                scheduler,
            }
        }

        fn open(&mut self, endpoint: Endpoint, quit: Option<Rc<Cell<bool>>>) {
            let mut options = self.config.session_options();
            if let Some(quit) = quit {
                options.on_local_session_closed = Box::new(move || quit.set(true));
            }
            let session = Session::open(endpoint, self.collaborators(), options);
            self.handler
                .borrow_mut()
                .session_opened(session.id(), session.kind(), session.peer());
            self.sessions.insert(session.id(), session);
        }

        fn accept(&mut self, listener: &TcpListener) {
            loop {
                match listener.accept() {
                    Ok((stream, addr)) => {
                        if let Err(e) = stream.set_nonblocking(false) {
                            warn!("Rejecting {}: {}", addr, e);
                            continue;
                        }
                        let stream = TelnetStream(Rc::new(stream));
                        let endpoint = Endpoint::network(
                            Box::new(stream.clone()),
                            Box::new(stream),
                            addr.to_string(),
                        );
                        self.open(endpoint, None);
                    }
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                    Err(e) => {
                        warn!("Failed to accept connection: {}", e);
                        break;
                    }
                }
            }
        }

        fn dispatch(&mut self, ready: &[SessionId]) {
            for id in ready {
                if let Some(session) = self.sessions.get_mut(id) {
                    session.on_readable();
                }
            }
            let closed: Vec<SessionId> = self
                .sessions
                .iter()
                .filter(|(_, session)| session.is_closed())
                .map(|(id, _)| *id)
                .collect();
            for id in closed {
                self.sessions.remove(&id);
                self.handler.borrow_mut().session_closed(id);
            }
        }
    }

    pub fn run(config: Config) -> anyhow::Result<()> {
        let listener = match &config.listen {
            Some(addr) => {
                let listener = TcpListener::bind(addr)
                    .with_context(|| format!("Failed to listen on {}", addr))?;
                listener.set_nonblocking(true)?;
                info!("Listening for Telnet sessions on {}", listener.local_addr()?);
                Some(listener)
            }
            None => None,
        };

        let mut host = Host {
            prompt: Rc::new(config.name.clone()),
            config,
            grammar: Rc::new(commands::grammar()),
            handler: Rc::new(RefCell::new(Daemon::new())),
            poll: Rc::new(RefCell::new(PollScheduler::new())),
            sessions: BTreeMap::new(),
        };

        let quit = Rc::new(Cell::new(false));
        let _raw_mode = if host.config.interactive {
            let guard = RawModeGuard::enable()?;
            let output = Box::new(LocalOutput(io::stdout()));
            let endpoint = Endpoint::local(Box::new(LocalInput), output);
            host.open(endpoint, Some(Rc::clone(&quit)));
            Some(guard)
        } else {
            None
        };

        let extra: Vec<ChannelHandle> = listener.iter().map(|l| l.as_raw_fd()).collect();
        while !quit.get() {
            let ready = host.poll.borrow().wait(&extra, -1)?;
            host.dispatch(&ready.sessions);
            if let Some(listener) = &listener {
                if !ready.extra.is_empty() {
                    host.accept(listener);
                }
            }
        }

        info!("Local session closed, shutting down");
        Ok(())
    }

}

#[cfg(not(unix))]
mod daemon {
    use rift_cli::config::Config;

    pub fn run(_config: Config) -> anyhow::Result<()> {
        anyhow::bail!("rift-cli currently only runs on Unix platforms")
    }
}
