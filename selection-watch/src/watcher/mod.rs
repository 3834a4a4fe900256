use std::os::unix::io::{AsRawFd, RawFd};

use log::{debug, trace};

use crate::config::WatchConfig;
use crate::error::{SetupError, TransportError, WatchError};
use crate::transport::{Atom, Cookie, Query, Reply, Request, Transport, Window};
use crate::transport::{XFIXES_NAME, XFIXES_SELECTION_NOTIFY, XFIXES_VERSION};

#[cfg(all(unix, feature = "x11"))]
use crate::transport::x11::XcbTransport;

mod driver;
mod fetch;
mod process;

/// Clipboard content that was written into the caller's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Content {
    /// Number of bytes written to the front of the buffer.
    pub len: usize,
    /// Type of the property the owner stored, usually the format it actually converted to.
    /// Use [`Watcher::atom_name`] to look up its name.
    pub format: Atom,
    /// The owner offered more than fit into the buffer; only a prefix was written.
    pub truncated: bool,
}

/// What a non-blocking [`Watcher::poll`] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// No new content yet. The buffer was not touched.
    Nothing,
    Received(Content),
}

/// Watches one selection and reads each new value in one target format.
///
/// The watcher owns its display server connection. The sink window and the XFIXES registration
/// live exactly as long as that connection, so dropping the watcher releases all of them.
///
/// After any [`WatchError`] the watcher should be dropped; there is no recovery.
pub struct Watcher<T: Transport> {
    transport: T,
    sink: Window,
    selection: Atom,
    target: Atom,
    ownership_event: u8,
}

#[cfg(all(unix, feature = "x11"))]
impl Watcher<XcbTransport> {
    /// Watch `CLIPBOARD` as `TEXT` on `$DISPLAY`.
    pub fn init() -> Result<Self, SetupError> {
        Self::init_with(&WatchConfig::default())
    }

    pub fn init_with(config: &WatchConfig) -> Result<Self, SetupError> {
        let transport = XcbTransport::connect(config.display.as_deref())?;
        Watcher::with_transport(transport, config)
    }
}

fn intern_reply<T: Transport>(transport: &mut T, cookie: Cookie, name: &str) -> Result<Atom, SetupError> {
    match transport.await_reply(cookie) {
        Ok(Reply::Atom(atom)) => Ok(atom),
        Ok(other) => Err(SetupError::Atom { name: name.to_owned(), source: TransportError::UnexpectedReply(other.kind()) }),
        Err(source) => Err(SetupError::Atom { name: name.to_owned(), source }),
    }
}

impl<T: Transport> Watcher<T> {
    /// Set up a watcher on an established connection.
    ///
    /// Either everything succeeds or the transport is dropped along with whatever was created on
    /// the server so far.
    pub fn with_transport(mut transport: T, config: &WatchConfig) -> Result<Watcher<T>, SetupError> {
        let extension = transport.submit(Query::Extension(XFIXES_NAME));

        let sink = transport.create_sink_window()?;

        let selection = transport.submit(Query::InternAtom(&config.selection));
        let target = transport.submit(Query::InternAtom(&config.target));

        let ownership_event = match transport.await_reply(extension)? {
            Reply::Extension { present: true, first_event } => first_event + XFIXES_SELECTION_NOTIFY,
            Reply::Extension { present: false, .. } => return Err(SetupError::XfixesMissing),
            other => return Err(TransportError::UnexpectedReply(other.kind()).into()),
        };
        // XFIXES must be told which version we speak before it accepts any other request
        let version = transport.submit(Query::XfixesVersion { major: XFIXES_VERSION.0, minor: XFIXES_VERSION.1 });

        let selection = intern_reply(&mut transport, selection, &config.selection)?;
        let target = intern_reply(&mut transport, target, &config.target)?;

        match transport.await_reply(version).map_err(SetupError::Version)? {
            Reply::Version { major, minor } => debug!("server speaks XFIXES {}.{}", major, minor),
            other => return Err(SetupError::Version(TransportError::UnexpectedReply(other.kind()))),
        }

        transport.send(Request::SelectOwnerChanges { window: sink, selection })?;
        transport.flush()?;
        debug!("watching selection {:?} ({}) as {:?} ({}) on window {:#x}",
               config.selection, selection, config.target, target, sink);

        Ok(Watcher { transport, sink, selection, target, ownership_event })
    }

    /// Close the connection, releasing every server-side resource at once.
    pub fn uninit(self) {}

    /// Whether the connection is still usable. Does not consume events.
    pub fn check_error(&self) -> Result<(), WatchError> {
        if self.transport.has_error() {
            Err(WatchError::ConnectionBroken)
        } else {
            Ok(())
        }
    }

    /// Look up the name of an atom, e.g. [`Content::format`]. This is a blocking round trip.
    pub fn atom_name(&mut self, atom: Atom) -> Result<String, WatchError> {
        let cookie = self.transport.submit(Query::AtomName(atom));
        match self.transport.await_reply(cookie)? {
            Reply::AtomName(name) => Ok(name),
            other => Err(TransportError::UnexpectedReply(other.kind()).into()),
        }
    }

    pub fn sink_window(&self) -> Window {
        self.sink
    }

    pub fn selection(&self) -> Atom {
        self.selection
    }

    pub fn target(&self) -> Atom {
        self.target
    }

    /// Event code of XFIXES selection owner notifications on this connection.
    pub fn ownership_event(&self) -> u8 {
        self.ownership_event
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: Transport> Drop for Watcher<T> {
    fn drop(&mut self) {
        trace!("closing selection watcher on window {:#x}", self.sink);
    }
}

impl<T: Transport + AsRawFd> AsRawFd for Watcher<T> {
    fn as_raw_fd(&self) -> RawFd {
        self.transport.as_raw_fd()
    }
}

#[cfg(test)]
pub(crate) fn test_watcher() -> (Watcher<crate::transport::mock::MockTransport>, crate::transport::mock::Handle) {
    let _ = env_logger::builder().is_test(true).try_init();
    let (transport, server) = crate::transport::mock::MockTransport::new();
    match Watcher::with_transport(transport, &WatchConfig::default()) {
        Ok(watcher) => (watcher, server),
        Err(e) => panic!("setup failed: {}", e),
    }
}
