use log::{debug, warn};

use super::process::Outcome;
use super::{Change, Content, Watcher};
use crate::error::WatchError;
use crate::transport::{RawEvent, Transport};

impl<T: Transport> Watcher<T> {
    /// Handle everything the server has already sent, without blocking.
    ///
    /// Returns [`Change::Nothing`] once the event queue is drained without new content. A
    /// conversion that is still in flight is picked up by a later call.
    pub fn poll(&mut self, buf: &mut [u8]) -> Result<Change, WatchError> {
        loop {
            self.check_error()?;
            self.flush_requests()?;

            let event = match self.transport.poll_event() {
                Some(event) => event,
                None => {
                    self.check_error()?;
                    return Ok(Change::Nothing);
                }
            };

            if let Some(content) = self.dispatch(event, buf)? {
                return Ok(Change::Received(content));
            }
        }
    }

    /// Block until the selection owner changes and the new value has been read into `buf`.
    ///
    /// Owner changes whose conversion is refused are skipped. The only way out other than new
    /// content is an error, e.g. when the connection is closed from elsewhere.
    pub fn wait(&mut self, buf: &mut [u8]) -> Result<Content, WatchError> {
        loop {
            self.flush_requests()?;

            let event = match self.transport.wait_event() {
                Some(event) => event,
                None => {
                    warn!("display connection closed while waiting for the selection");
                    return Err(WatchError::ConnectionClosed);
                }
            };

            if let Some(content) = self.dispatch(event, buf)? {
                return Ok(content);
            }
        }
    }

    /// A broken connection wins over whatever the event says.
    fn dispatch(&mut self, event: RawEvent, buf: &mut [u8]) -> Result<Option<Content>, WatchError> {
        self.check_error()?;
        match self.process_event(event, buf)? {
            Outcome::NoOp => Ok(None),
            Outcome::DataReady(content) => {
                debug!("read {} bytes of selection content", content.len);
                Ok(Some(content))
            }
        }
    }

    fn flush_requests(&mut self) -> Result<(), WatchError> {
        match self.transport.flush() {
            Ok(()) => Ok(()),
            Err(_) if self.transport.has_error() => Err(WatchError::ConnectionBroken),
            Err(e) => Err(e.into()),
        }
    }
}
