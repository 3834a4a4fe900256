//! Waiting for clipboard changes on a tokio reactor.

use std::io;
use std::os::unix::io::AsRawFd;

use tokio::io::unix::AsyncFd;
use tokio::io::Interest;

use crate::error::WatchError;
use crate::transport::Transport;
use crate::watcher::{Change, Content, Watcher};

#[cfg(feature = "x11")]
use crate::transport::x11::XcbTransport;

/// A [`Watcher`] whose connection socket is registered with the tokio reactor.
///
/// Instead of blocking in [`Watcher::wait`], [`next`](AsyncWatcher::next) drains what the
/// server already sent and then sleeps until the socket becomes readable again.
pub struct AsyncWatcher<T: Transport + AsRawFd> {
    inner: AsyncFd<Watcher<T>>,
}

#[cfg(feature = "x11")]
impl AsyncWatcher<XcbTransport> {
    /// Must be called from within a tokio runtime with IO enabled.
    pub fn new(watcher: Watcher<XcbTransport>) -> Result<AsyncWatcher<XcbTransport>, WatchError> {
        // SAFETY: the connection owns its socket until it is dropped, and only the watcher
        // holds the connection
        unsafe { AsyncWatcher::from_watcher(watcher) }
    }
}

impl<T: Transport + AsRawFd> AsyncWatcher<T> {
    /// Register a watcher on any transport. Must be called from within a tokio runtime with IO
    /// enabled.
    ///
    /// # Safety
    ///
    /// The transport's file descriptor must stay open, and `as_raw_fd` must keep returning it,
    /// for as long as the `AsyncWatcher` exists.
    pub unsafe fn from_watcher(watcher: Watcher<T>) -> Result<AsyncWatcher<T>, WatchError> {
        let inner = AsyncFd::register_with_interest(watcher, Interest::READABLE).map_err(io::Error::from)?;
        Ok(AsyncWatcher { inner })
    }

    /// Resolves once new selection content was read into `buf`.
    pub async fn next(&mut self, buf: &mut [u8]) -> Result<Content, WatchError> {
        loop {
            // replies we blocked on may have pulled events off the socket already,
            // so look at the queue before trusting readiness
            if let Change::Received(content) = self.inner.get_mut().poll(buf)? {
                return Ok(content);
            }

            let mut guard = self.inner.readable_mut().await?;
            guard.clear_ready();
        }
    }

    pub fn get_ref(&self) -> &Watcher<T> {
        self.inner.get_ref()
    }

    pub fn get_mut(&mut self) -> &mut Watcher<T> {
        self.inner.get_mut()
    }

    /// Deregister from the reactor and hand the watcher back.
    pub fn into_inner(self) -> Watcher<T> {
        self.inner.into_inner()
    }
}
