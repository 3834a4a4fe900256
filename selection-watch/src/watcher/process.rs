use log::{debug, trace};

use super::{Content, Watcher};
use crate::error::WatchError;
use crate::transport::{RawEvent, Request, Transport, NONE, SELECTION_NOTIFY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Outcome {
    /// Irrelevant, or consumed without producing data.
    NoOp,
    DataReady(Content),
}

impl<T: Transport> Watcher<T> {
    /// Advance the selection protocol by one event.
    ///
    /// An owner change only queues a conversion request; it goes out with the next flush.
    pub(super) fn process_event(&mut self, event: RawEvent, buf: &mut [u8]) -> Result<Outcome, WatchError> {
        match event.kind() {
            0 => Err(WatchError::ErrorEvent { code: event.detail }),
            SELECTION_NOTIFY if event.property == NONE => {
                debug!("selection owner refused the conversion");
                Ok(Outcome::NoOp)
            }
            SELECTION_NOTIFY => self.fetch_selection(buf).map(Outcome::DataReady),
            kind if kind == self.ownership_event => {
                debug!("selection owner changed at {}, requesting conversion", event.timestamp);
                self.transport.send(Request::ConvertSelection {
                    requestor: self.sink,
                    selection: self.selection,
                    target: self.target,
                    property: self.selection,
                    time: event.timestamp,
                })?;
                Ok(Outcome::NoOp)
            }
            kind => {
                trace!("ignoring event {}", kind);
                Ok(Outcome::NoOp)
            }
        }
    }
}
