//! [`Transport`] on top of an XCB connection.

use std::collections::HashMap;
use std::os::unix::io::{AsRawFd, RawFd};

use log::{debug, trace};
use xcb::{x, xfixes, Xid, XidNew};

use super::{Atom, Cookie, PropertyReply, Query, RawEvent, Reply, Request, Transport, Window, XFIXES_NAME};
use crate::error::{SetupError, TransportError};

/// Stand-in code for events the selection protocol never acts on. xcb hands us decoded events,
/// and the XFIXES selection notification is always below this since the extension owns two
/// consecutive event codes.
const OTHER_EVENT: u8 = 0x7f;

fn x_atom(id: Atom) -> x::Atom {
    x::Atom::new(id)
}

fn x_window(id: Window) -> x::Window {
    x::Window::new(id)
}

/// Events that stand in for a failure while reading events. Protocol errors keep their X error
/// code; a dead connection ends the event stream.
fn error_event(error: xcb::Error) -> Option<RawEvent> {
    match error {
        xcb::Error::Protocol(e) => {
            debug!("X error event: {:?}", e);
            // SAFETY: `e` owns the error for as long as it lives
            let code = unsafe { (*e.as_raw()).error_code };
            Some(RawEvent::error(code))
        }
        xcb::Error::Connection(e) => {
            debug!("XCB connection error while reading events: {:?}", e);
            None
        }
    }
}

enum Pending {
    Atom(x::InternAtomCookie),
    AtomName(x::GetAtomNameCookie),
    Extension { cookie: x::QueryExtensionCookie, xfixes: bool },
    Version(xfixes::QueryVersionCookie),
    Property(x::GetPropertyCookie),
}

pub struct XcbTransport {
    conn: xcb::Connection,
    screen_num: i32,
    next_cookie: u64,
    pending: HashMap<u64, Pending>,
    xfixes_first_event: Option<u8>,
}

impl XcbTransport {
    /// Connect to `display`, or to `$DISPLAY` if `None`.
    ///
    /// XFIXES is requested but not required here, so that a missing extension is reported by the
    /// watcher setup instead of as an opaque connection failure.
    pub fn connect(display: Option<&str>) -> Result<XcbTransport, SetupError> {
        let (conn, screen_num) = xcb::Connection::connect_with_extensions(display, &[], &[xcb::Extension::XFixes])
            .map_err(SetupError::Connect)?;
        debug!("connected to X display {:?}, screen {}", display, screen_num);

        Ok(XcbTransport {
            conn,
            screen_num,
            next_cookie: 0,
            pending: HashMap::new(),
            xfixes_first_event: None,
        })
    }

    pub fn connection(&self) -> &xcb::Connection {
        &self.conn
    }

    fn translate(&self, event: xcb::Event) -> RawEvent {
        match event {
            xcb::Event::X(x::Event::SelectionNotify(ev)) => {
                RawEvent::selection_notify(ev.property().resource_id(), ev.time())
            }
            xcb::Event::XFixes(xfixes::Event::SelectionNotify(ev)) => match self.xfixes_first_event {
                Some(first_event) => RawEvent::owner_change(first_event, ev.selection_timestamp()),
                None => {
                    debug!("XFIXES selection notification before the extension was queried");
                    RawEvent { response_type: OTHER_EVENT, ..RawEvent::error(0) }
                }
            },
            _ => {
                trace!("unhandled XCB event");
                RawEvent { response_type: OTHER_EVENT, ..RawEvent::error(0) }
            }
        }
    }
}

impl Transport for XcbTransport {
    fn create_sink_window(&mut self) -> Result<Window, TransportError> {
        let root = self.conn.get_setup().roots().nth(self.screen_num as usize)
            .ok_or(TransportError::NoScreen(self.screen_num))?
            .root();

        let wid: x::Window = self.conn.generate_id();
        self.conn.send_request(&x::CreateWindow {
            depth: 0, // CopyFromParent
            wid,
            parent: root,
            x: 0,
            y: 0,
            width: 1,
            height: 1,
            border_width: 0,
            class: x::WindowClass::InputOnly,
            visual: 0, // CopyFromParent
            value_list: &[],
        });
        trace!("created sink window {:#x}", wid.resource_id());

        Ok(wid.resource_id())
    }

    fn send(&mut self, request: Request) -> Result<(), TransportError> {
        match request {
            Request::ConvertSelection { requestor, selection, target, property, time } => {
                self.conn.send_request(&x::ConvertSelection {
                    requestor: x_window(requestor),
                    selection: x_atom(selection),
                    target: x_atom(target),
                    property: x_atom(property),
                    time,
                });
            }
            Request::SelectOwnerChanges { window, selection } => {
                self.conn.send_request(&xfixes::SelectSelectionInput {
                    window: x_window(window),
                    selection: x_atom(selection),
                    event_mask: xfixes::SelectionEventMask::SET_SELECTION_OWNER,
                });
            }
        }

        self.conn.has_error()?;
        Ok(())
    }

    fn submit(&mut self, query: Query<'_>) -> Cookie {
        let pending = match query {
            Query::InternAtom(name) => Pending::Atom(self.conn.send_request(&x::InternAtom {
                only_if_exists: false,
                name: name.as_bytes(),
            })),
            Query::AtomName(atom) => Pending::AtomName(self.conn.send_request(&x::GetAtomName {
                atom: x_atom(atom),
            })),
            Query::Extension(name) => Pending::Extension {
                cookie: self.conn.send_request(&x::QueryExtension { name: name.as_bytes() }),
                xfixes: name == XFIXES_NAME,
            },
            Query::XfixesVersion { major, minor } => Pending::Version(self.conn.send_request(&xfixes::QueryVersion {
                client_major_version: major,
                client_minor_version: minor,
            })),
            Query::Property { window, property, long_length } => Pending::Property(self.conn.send_request(&x::GetProperty {
                delete: true,
                window: x_window(window),
                property: x_atom(property),
                r#type: x::ATOM_ANY,
                long_offset: 0,
                long_length,
            })),
        };

        self.next_cookie += 1;
        self.pending.insert(self.next_cookie, pending);
        Cookie(self.next_cookie)
    }

    fn await_reply(&mut self, cookie: Cookie) -> Result<Reply, TransportError> {
        let pending = self.pending.remove(&cookie.0).ok_or(TransportError::UnknownCookie)?;

        Ok(match pending {
            Pending::Atom(cookie) => Reply::Atom(self.conn.wait_for_reply(cookie)?.atom().resource_id()),
            Pending::AtomName(cookie) => {
                let reply = self.conn.wait_for_reply(cookie)?;
                Reply::AtomName(reply.name().to_utf8().into_owned())
            }
            Pending::Extension { cookie, xfixes } => {
                let reply = self.conn.wait_for_reply(cookie)?;
                if xfixes && reply.present() {
                    self.xfixes_first_event = Some(reply.first_event());
                }
                Reply::Extension { present: reply.present(), first_event: reply.first_event() }
            }
            Pending::Version(cookie) => {
                let reply = self.conn.wait_for_reply(cookie)?;
                Reply::Version { major: reply.major_version(), minor: reply.minor_version() }
            }
            Pending::Property(cookie) => {
                let reply = self.conn.wait_for_reply(cookie)?;
                Reply::Property(PropertyReply {
                    type_: reply.r#type().resource_id(),
                    bytes_after: reply.bytes_after(),
                    value: property_bytes(&reply),
                })
            }
        })
    }

    fn poll_event(&mut self) -> Option<RawEvent> {
        match self.conn.poll_for_event() {
            Ok(Some(event)) => Some(self.translate(event)),
            Ok(None) => None,
            Err(e) => error_event(e),
        }
    }

    fn wait_event(&mut self) -> Option<RawEvent> {
        match self.conn.wait_for_event() {
            Ok(event) => Some(self.translate(event)),
            Err(e) => error_event(e),
        }
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        self.conn.flush()?;
        Ok(())
    }

    fn has_error(&self) -> bool {
        self.conn.has_error().is_err()
    }
}

impl AsRawFd for XcbTransport {
    fn as_raw_fd(&self) -> RawFd {
        self.conn.as_raw_fd()
    }
}

/// Property value as raw bytes in host order, whatever its element size.
fn property_bytes(reply: &x::GetPropertyReply) -> Vec<u8> {
    match reply.format() {
        8 => reply.value::<u8>().to_vec(),
        16 => reply.value::<u16>().iter().flat_map(|v| v.to_ne_bytes()).collect(),
        32 => reply.value::<u32>().iter().flat_map(|v| v.to_ne_bytes()).collect(),
        // format 0: the property does not exist
        _ => Vec::new(),
    }
}
