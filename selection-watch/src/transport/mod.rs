//! The boundary between the selection protocol and the display server connection.
//!
//! Requests either have no reply ([`Request`], sent with [`Transport::send`]) or one
//! ([`Query`]). Queries are split into [`Transport::submit`], which only queues the request and
//! hands out a [`Cookie`], and [`Transport::await_reply`], which blocks until the matching reply
//! is in. This keeps several round trips in flight at once during setup.

use crate::error::TransportError;

#[cfg(all(unix, feature = "x11"))]
pub mod x11;

#[cfg(test)]
pub(crate) mod mock;

pub type Atom = u32;
pub type Window = u32;
pub type Timestamp = u32;

/// The `None` atom; a selection notification carrying it means the conversion was refused.
pub const NONE: Atom = 0;

/// Core `SelectionNotify` event code.
pub const SELECTION_NOTIFY: u8 = 31;
/// XFIXES `SelectionNotify`, relative to the extension's first event.
pub const XFIXES_SELECTION_NOTIFY: u8 = 0;
/// Strips the "sent by SendEvent" flag from a response type.
pub const RESPONSE_TYPE_MASK: u8 = 0x7f;

pub const XFIXES_NAME: &str = "XFIXES";
pub const XFIXES_VERSION: (u32, u32) = (5, 0);

/// The parts of an event the selection protocol looks at.
///
/// `detail` is the error code for error events (`response_type` 0) and unused otherwise.
/// `timestamp` is the selection timestamp for owner notifications and the conversion time for
/// selection notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    pub response_type: u8,
    pub detail: u8,
    pub timestamp: Timestamp,
    pub property: Atom,
}

impl RawEvent {
    pub fn error(code: u8) -> RawEvent {
        RawEvent { response_type: 0, detail: code, timestamp: 0, property: NONE }
    }

    pub fn selection_notify(property: Atom, time: Timestamp) -> RawEvent {
        RawEvent { response_type: SELECTION_NOTIFY, detail: 0, timestamp: time, property }
    }

    pub fn owner_change(first_event: u8, selection_timestamp: Timestamp) -> RawEvent {
        RawEvent {
            response_type: first_event + XFIXES_SELECTION_NOTIFY,
            detail: 0,
            timestamp: selection_timestamp,
            property: NONE,
        }
    }

    /// Event code without the SendEvent flag.
    pub fn kind(&self) -> u8 {
        self.response_type & RESPONSE_TYPE_MASK
    }
}

/// Requests without a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    ConvertSelection {
        requestor: Window,
        selection: Atom,
        target: Atom,
        property: Atom,
        time: Timestamp,
    },
    /// XFIXES `SelectSelectionInput` with the `SetSelectionOwner` mask.
    SelectOwnerChanges { window: Window, selection: Atom },
}

/// Requests with a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query<'a> {
    InternAtom(&'a str),
    AtomName(Atom),
    Extension(&'a str),
    XfixesVersion { major: u32, minor: u32 },
    /// `GetProperty` with `delete` set and `long_offset` 0.
    Property { window: Window, property: Atom, long_length: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Atom(Atom),
    AtomName(String),
    Extension { present: bool, first_event: u8 },
    Version { major: u32, minor: u32 },
    Property(PropertyReply),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyReply {
    pub type_: Atom,
    /// Bytes still stored beyond what this reply carried.
    pub bytes_after: u32,
    pub value: Vec<u8>,
}

/// Token for a submitted [`Query`].
///
/// Cookies are only meaningful to the transport that issued them and can be awaited once.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Cookie(pub(crate) u64);

/// A connection to the display server, as far as the selection watcher is concerned.
pub trait Transport {
    /// Create the invisible window that receives converted selections.
    fn create_sink_window(&mut self) -> Result<Window, TransportError>;

    /// Queue a request. It is not guaranteed to reach the server before the next `flush`.
    fn send(&mut self, request: Request) -> Result<(), TransportError>;

    /// Queue a request whose reply is fetched later with `await_reply`.
    fn submit(&mut self, query: Query<'_>) -> Cookie;

    /// Block until the reply for `cookie` arrives.
    fn await_reply(&mut self, cookie: Cookie) -> Result<Reply, TransportError>;

    /// Next already-received event, without blocking.
    ///
    /// `None` means nothing is queued, or that the connection is gone.
    fn poll_event(&mut self) -> Option<RawEvent>;

    /// Next event, blocking until one arrives. `None` means the connection is gone.
    fn wait_event(&mut self) -> Option<RawEvent>;

    fn flush(&mut self) -> Result<(), TransportError>;

    /// Whether the connection has failed. A failed connection never recovers.
    fn has_error(&self) -> bool;
}

impl Reply {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Reply::Atom(_) => "InternAtom",
            Reply::AtomName(_) => "GetAtomName",
            Reply::Extension { .. } => "QueryExtension",
            Reply::Version { .. } => "XFixesQueryVersion",
            Reply::Property(_) => "GetProperty",
        }
    }
}
