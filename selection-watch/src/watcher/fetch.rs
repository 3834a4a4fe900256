use log::debug;

use super::{Content, Watcher};
use crate::error::{TransportError, WatchError};
use crate::transport::{Query, Reply, Transport};

/// `GetProperty` lengths count 32-bit units. Round up so that a buffer that is not a multiple of
/// four can still be filled completely.
pub(crate) fn long_length(capacity: usize) -> u32 {
    u32::try_from(capacity.div_ceil(4)).unwrap_or(u32::MAX)
}

impl<T: Transport> Watcher<T> {
    /// Read the converted selection from the sink window into `buf`.
    ///
    /// Values that do not fit are clipped to `buf.len()`. That is not an error, but
    /// [`Content::truncated`] is set.
    pub(super) fn fetch_selection(&mut self, buf: &mut [u8]) -> Result<Content, WatchError> {
        let cookie = self.transport.submit(Query::Property {
            window: self.sink,
            property: self.selection,
            long_length: long_length(buf.len()),
        });
        let reply = match self.transport.await_reply(cookie).map_err(WatchError::Fetch)? {
            Reply::Property(reply) => reply,
            other => return Err(WatchError::Fetch(TransportError::UnexpectedReply(other.kind()))),
        };

        let len = reply.value.len().min(buf.len());
        buf[..len].copy_from_slice(&reply.value[..len]);

        let truncated = reply.bytes_after > 0 || reply.value.len() > buf.len();
        if truncated {
            debug!("selection truncated to {} bytes ({} more on the server)",
                   len, reply.value.len() - len + reply.bytes_after as usize);
        }

        Ok(Content { len, format: reply.type_, truncated })
    }
}
