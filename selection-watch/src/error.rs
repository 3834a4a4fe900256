use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[cfg(all(unix, feature = "x11"))]
    #[error("xcb error: {0}")]
    Xcb(#[from] xcb::Error),

    #[error("connection to the display server is gone")]
    Disconnected,

    #[error("request failed with X error code {code}")]
    Request { code: u8 },

    #[error("screen {0} does not exist")]
    NoScreen(i32),

    #[error("unexpected {0} reply")]
    UnexpectedReply(&'static str),

    #[error("cookie was not issued by this connection or was already awaited")]
    UnknownCookie,
}

#[cfg(all(unix, feature = "x11"))]
impl From<xcb::ConnError> for TransportError {
    fn from(e: xcb::ConnError) -> Self {
        TransportError::Xcb(xcb::Error::Connection(e))
    }
}

/// Failures while setting up a [`Watcher`](crate::Watcher). No watcher exists after any of these.
#[derive(Debug, Error)]
pub enum SetupError {
    #[cfg(all(unix, feature = "x11"))]
    #[error("failed to connect to the X server: {0}")]
    Connect(#[source] xcb::ConnError),

    #[error("the X server does not support the XFIXES extension")]
    XfixesMissing,

    #[error("failed to intern atom {name:?}: {source}")]
    Atom { name: String, source: TransportError },

    #[error("XFIXES version negotiation failed: {0}")]
    Version(#[source] TransportError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Failures of a running watcher. Callers should drop the watcher after any of these.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("received X error event (code {code})")]
    ErrorEvent { code: u8 },

    #[error("failed to fetch the selection property: {0}")]
    Fetch(#[source] TransportError),

    #[error("connection to the display server is broken")]
    ConnectionBroken,

    #[error("connection to the display server was closed")]
    ConnectionClosed,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}
