//! Read-readiness scheduling
//!
//! Sessions do not read on their own: they register their input handle with a
//! [`Scheduler`] and are called back (`Session::on_readable`) whenever it has
//! data. The scheduler is handed to each session at construction and also
//! numbers the sessions it serves.

use std::cell::RefCell;
use std::rc::Rc;

use super::channel::ChannelHandle;

/// Identifies a session towards its scheduler
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Registry of sessions waiting for input
pub trait Scheduler {
    /// Identifier for a new session, unique within this scheduler
    fn allocate_id(&mut self) -> SessionId;
    fn register_handler(&mut self, session: SessionId, handle: ChannelHandle);
    fn unregister_handler(&mut self, session: SessionId);
}

/// Shared, single-threaded scheduler reference held by sessions
pub type SchedulerHandle = Rc<RefCell<dyn Scheduler>>;

#[cfg(unix)]
pub use self::poll::{PollScheduler, Readiness};

#[cfg(unix)]
mod poll {
    //! `poll(2)` based scheduler used by the daemon binary

    use std::collections::BTreeMap;
    use std::io;

    use tracing::trace;

    use super::{ChannelHandle, Scheduler, SessionId};

    /// Sessions and extra descriptors that became readable in one wait
    #[derive(Debug, Default)]
    pub struct Readiness {
        pub sessions: Vec<SessionId>,
        pub extra: Vec<ChannelHandle>,
    }

    #[derive(Debug, Default)]
    pub struct PollScheduler {
        handlers: BTreeMap<SessionId, ChannelHandle>,
        last_id: u64,
    }

    impl PollScheduler {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn is_registered(&self, session: SessionId) -> bool {
            self.handlers.contains_key(&session)
        }

        pub fn len(&self) -> usize {
            self.handlers.len()
        }

        pub fn is_empty(&self) -> bool {
            self.handlers.is_empty()
        }

        /// Block until a registered session or one of `extra` is readable
        ///
        /// Hang-ups and errors count as readable: the session's next read then
        /// observes the end of the stream and closes it.
        pub fn wait(&self, extra: &[ChannelHandle], timeout_ms: i32) -> io::Result<Readiness> {
            let sessions: Vec<(SessionId, ChannelHandle)> =
                self.handlers.iter().map(|(id, fd)| (*id, *fd)).collect();
            let mut fds: Vec<libc::pollfd> = sessions
                .iter()
                .map(|(_, fd)| *fd)
                .chain(extra.iter().copied())
                .map(|fd| libc::pollfd {
                    fd,
                    events: libc::POLLIN,
                    revents: 0,
                })
                .collect();

            let nfds = fds.len() as libc::nfds_t;
            let ready = unsafe { libc::poll(fds.as_mut_ptr(), nfds, timeout_ms) };
            if ready == -1 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    trace!("poll interrupted (EINTR)");
                    return Ok(Readiness::default());
                }
                return Err(err);
            }

            let readable = libc::POLLIN | libc::POLLHUP | libc::POLLERR | libc::POLLNVAL;
            let mut readiness = Readiness::default();
            for (index, pollfd) in fds.iter().enumerate() {
                if pollfd.revents & readable == 0 {
                    continue;
                }
                match sessions.get(index) {
                    Some((id, _)) => readiness.sessions.push(*id),
                    None => readiness.extra.push(pollfd.fd),
                }
            }
            trace!(
                "poll: {} sessions, {} extra descriptors ready",
                readiness.sessions.len(),
                readiness.extra.len()
            );
            Ok(readiness)
        }
    }

    impl Scheduler for PollScheduler {
        fn allocate_id(&mut self) -> SessionId {
            self.last_id += 1;
            SessionId(self.last_id)
        }

        fn register_handler(&mut self, session: SessionId, handle: ChannelHandle) {
            trace!("Register session {} on fd {}", session, handle);
            self.handlers.insert(session, handle);
        }

        fn unregister_handler(&mut self, session: SessionId) {
            trace!("Unregister session {}", session);
            self.handlers.remove(&session);
        }
    }

}
