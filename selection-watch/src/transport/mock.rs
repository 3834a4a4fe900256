//! A scripted in-memory display server for tests.
//!
//! Requests are queued until a flush (or an `await_reply`, which flushes like libxcb does) and
//! then processed in order. Selection owners answer conversions immediately.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::os::unix::io::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;
use std::rc::Rc;

use super::*;
use crate::error::TransportError;

pub(crate) const XFIXES_FIRST_EVENT: u8 = 87;

const BAD_WINDOW: u8 = 3;
const BAD_ATOM: u8 = 5;
const BAD_IMPLEMENTATION: u8 = 17;

enum Outgoing {
    Void(Request),
    Query(u64, OwnedQuery),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum OwnedQuery {
    InternAtom(String),
    AtomName(Atom),
    Extension(String),
    XfixesVersion { major: u32, minor: u32 },
    Property { window: Window, property: Atom, long_length: u32 },
}

impl<'a> From<Query<'a>> for OwnedQuery {
    fn from(q: Query<'a>) -> Self {
        match q {
            Query::InternAtom(name) => OwnedQuery::InternAtom(name.to_owned()),
            Query::AtomName(atom) => OwnedQuery::AtomName(atom),
            Query::Extension(name) => OwnedQuery::Extension(name.to_owned()),
            Query::XfixesVersion { major, minor } => OwnedQuery::XfixesVersion { major, minor },
            Query::Property { window, property, long_length } => OwnedQuery::Property { window, property, long_length },
        }
    }
}

/// Something an external client does while we are blocked in `wait_event`.
pub(crate) type Action = Box<dyn FnOnce(&mut MockServer)>;

pub(crate) struct MockServer {
    atoms: HashMap<String, Atom>,
    next_atom: Atom,
    next_window: Window,
    pub xfixes: bool,
    pub fail_atom: Option<String>,
    pub fail_version: bool,
    pub fail_property: bool,
    /// Drop the connection right after handing out an event of this kind.
    pub break_on: Option<u8>,
    broken: bool,
    time: Timestamp,
    outbox: Vec<Outgoing>,
    replies: HashMap<u64, Result<Reply, TransportError>>,
    next_cookie: u64,
    events: VecDeque<RawEvent>,
    /// Who wants XFIXES owner notifications for which selection.
    watching: Vec<(Window, Atom)>,
    /// Current owners' content per selection, `None` if the owner refuses conversion.
    owners: HashMap<Atom, Option<(Atom, Vec<u8>)>>,
    properties: HashMap<(Window, Atom), (Atom, Vec<u8>)>,
    on_wait: VecDeque<Action>,
    /// Stands in for the connection socket when registering with a reactor.
    pub fd: Option<UnixStream>,

    pub windows: Vec<Window>,
    pub sent: Vec<Request>,
    pub queries: Vec<OwnedQuery>,
    pub flushes: usize,
}

impl MockServer {
    fn new() -> MockServer {
        let atoms = [("PRIMARY", 1), ("SECONDARY", 2), ("ATOM", 4), ("STRING", 31)]
            .iter()
            .map(|&(name, atom)| (name.to_owned(), atom))
            .collect();

        MockServer {
            atoms,
            next_atom: 100,
            next_window: 0x0040_0001,
            xfixes: true,
            fail_atom: None,
            fail_version: false,
            fail_property: false,
            break_on: None,
            broken: false,
            time: 1000,
            outbox: Vec::new(),
            replies: HashMap::new(),
            next_cookie: 0,
            events: VecDeque::new(),
            watching: Vec::new(),
            owners: HashMap::new(),
            properties: HashMap::new(),
            on_wait: VecDeque::new(),
            fd: None,
            windows: Vec::new(),
            sent: Vec::new(),
            queries: Vec::new(),
            flushes: 0,
        }
    }

    pub fn intern(&mut self, name: &str) -> Atom {
        if let Some(&atom) = self.atoms.get(name) {
            return atom;
        }
        let atom = self.next_atom;
        self.next_atom += 1;
        self.atoms.insert(name.to_owned(), atom);
        atom
    }

    /// Another client takes ownership of `selection` and offers `content`.
    pub fn set_selection(&mut self, selection: &str, content: &[u8]) {
        let type_ = self.intern("UTF8_STRING");
        self.take_ownership(selection, Some((type_, content.to_vec())));
    }

    pub fn set_clipboard(&mut self, content: &[u8]) {
        self.set_selection("CLIPBOARD", content);
    }

    /// Another client takes ownership but refuses every conversion.
    pub fn set_clipboard_unconvertible(&mut self) {
        self.take_ownership("CLIPBOARD", None);
    }

    fn take_ownership(&mut self, selection: &str, content: Option<(Atom, Vec<u8>)>) {
        let selection = self.intern(selection);
        self.time += 1;
        self.owners.insert(selection, content);
        if self.watching.iter().any(|&(_, s)| s == selection) {
            self.events.push_back(RawEvent::owner_change(XFIXES_FIRST_EVENT, self.time));
        }
    }

    pub fn push_event(&mut self, event: RawEvent) {
        self.events.push_back(event);
    }

    pub fn on_wait(&mut self, action: impl FnOnce(&mut MockServer) + 'static) {
        self.on_wait.push_back(Box::new(action));
    }

    /// Kill the connection from the outside.
    pub fn disconnect(&mut self) {
        self.broken = true;
    }

    pub fn pop_event(&mut self) -> Option<RawEvent> {
        self.events.pop_front()
    }

    fn hand_out(&mut self) -> Option<RawEvent> {
        let event = self.events.pop_front()?;
        if self.break_on == Some(event.kind()) {
            self.broken = true;
        }
        Some(event)
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    pub fn property(&self, window: Window, property: Atom) -> Option<&(Atom, Vec<u8>)> {
        self.properties.get(&(window, property))
    }

    fn process(&mut self) {
        self.flushes += 1;
        for outgoing in std::mem::take(&mut self.outbox) {
            match outgoing {
                Outgoing::Void(request) => self.process_request(request),
                Outgoing::Query(id, query) => {
                    let reply = self.answer(&query);
                    self.queries.push(query);
                    self.replies.insert(id, reply);
                }
            }
        }
    }

    fn process_request(&mut self, request: Request) {
        self.sent.push(request);
        match request {
            Request::ConvertSelection { requestor, selection, property, time, .. } => {
                match self.owners.get(&selection).cloned().flatten() {
                    Some(content) => {
                        self.properties.insert((requestor, property), content);
                        self.events.push_back(RawEvent::selection_notify(property, time));
                    }
                    None => self.events.push_back(RawEvent::selection_notify(NONE, time)),
                }
            }
            Request::SelectOwnerChanges { window, selection } => {
                self.watching.push((window, selection));
            }
        }
    }

    fn answer(&mut self, query: &OwnedQuery) -> Result<Reply, TransportError> {
        match query {
            OwnedQuery::InternAtom(name) => {
                if self.fail_atom.as_deref() == Some(name.as_str()) {
                    return Err(TransportError::Request { code: BAD_ATOM });
                }
                Ok(Reply::Atom(self.intern(name)))
            }
            OwnedQuery::AtomName(atom) => self.atoms.iter()
                .find(|&(_, a)| a == atom)
                .map(|(name, _)| Reply::AtomName(name.clone()))
                .ok_or(TransportError::Request { code: BAD_ATOM }),
            OwnedQuery::Extension(name) => Ok(if name == XFIXES_NAME && self.xfixes {
                Reply::Extension { present: true, first_event: XFIXES_FIRST_EVENT }
            } else {
                Reply::Extension { present: false, first_event: 0 }
            }),
            OwnedQuery::XfixesVersion { major, minor } => {
                if self.fail_version {
                    return Err(TransportError::Request { code: BAD_IMPLEMENTATION });
                }
                Ok(Reply::Version { major: (*major).min(5), minor: if *major < 5 { *minor } else { 0 } })
            }
            OwnedQuery::Property { window, property, long_length } => {
                if self.fail_property || !self.windows.contains(window) {
                    return Err(TransportError::Request { code: BAD_WINDOW });
                }
                let key = (*window, *property);
                let (type_, stored) = match self.properties.get(&key) {
                    Some(p) => p.clone(),
                    None => return Ok(Reply::Property(PropertyReply { type_: NONE, bytes_after: 0, value: Vec::new() })),
                };
                let n = stored.len().min(*long_length as usize * 4);
                let bytes_after = (stored.len() - n) as u32;
                if bytes_after == 0 {
                    self.properties.remove(&key);
                }
                Ok(Reply::Property(PropertyReply { type_, bytes_after, value: stored[..n].to_vec() }))
            }
        }
    }
}

pub(crate) type Handle = Rc<RefCell<MockServer>>;

pub(crate) struct MockTransport {
    server: Handle,
}

impl MockTransport {
    pub fn new() -> (MockTransport, Handle) {
        let server = Rc::new(RefCell::new(MockServer::new()));
        (MockTransport { server: server.clone() }, server)
    }
}

impl Transport for MockTransport {
    fn create_sink_window(&mut self) -> Result<Window, TransportError> {
        let mut server = self.server.borrow_mut();
        if server.broken {
            return Err(TransportError::Disconnected);
        }
        let window = server.next_window;
        server.next_window += 1;
        server.windows.push(window);
        Ok(window)
    }

    fn send(&mut self, request: Request) -> Result<(), TransportError> {
        let mut server = self.server.borrow_mut();
        if server.broken {
            return Err(TransportError::Disconnected);
        }
        server.outbox.push(Outgoing::Void(request));
        Ok(())
    }

    fn submit(&mut self, query: Query<'_>) -> Cookie {
        let mut server = self.server.borrow_mut();
        server.next_cookie += 1;
        let id = server.next_cookie;
        server.outbox.push(Outgoing::Query(id, query.into()));
        Cookie(id)
    }

    fn await_reply(&mut self, cookie: Cookie) -> Result<Reply, TransportError> {
        let mut server = self.server.borrow_mut();
        if server.broken {
            return Err(TransportError::Disconnected);
        }
        server.process();
        server.replies.remove(&cookie.0).unwrap_or(Err(TransportError::UnknownCookie))
    }

    fn poll_event(&mut self) -> Option<RawEvent> {
        let mut server = self.server.borrow_mut();
        if server.broken {
            return None;
        }
        server.hand_out()
    }

    fn wait_event(&mut self) -> Option<RawEvent> {
        let mut server = self.server.borrow_mut();
        loop {
            if server.broken {
                return None;
            }
            if let Some(event) = server.hand_out() {
                return Some(event);
            }
            // nobody left to wake us up: the real thing would block forever
            match server.on_wait.pop_front() {
                Some(action) => action(&mut *server),
                None => server.broken = true,
            }
        }
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        let mut server = self.server.borrow_mut();
        if server.broken {
            return Err(TransportError::Disconnected);
        }
        server.process();
        Ok(())
    }

    fn has_error(&self) -> bool {
        self.server.borrow().broken
    }
}

impl AsRawFd for MockTransport {
    fn as_raw_fd(&self) -> RawFd {
        self.server.borrow().fd.as_ref().map(|s| s.as_raw_fd()).unwrap_or(-1)
    }
}
