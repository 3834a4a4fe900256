//! Watch the X11 clipboard for ownership changes and read what was copied.
//!
//! # How it works
//!
//! The watcher registers for XFIXES selection-owner notifications on a selection (usually
//! `CLIPBOARD`). Whenever another application takes ownership, we ask the new owner to convert
//! the selection into our target format and store it as a property on a tiny input-only window.
//! Once the owner tells us the property is ready, we read it into a buffer you provide.
//!
//! The buffer is never grown. Content larger than the buffer is clipped to fit, which
//! [`Content::truncated`] reports. Hand in a buffer generously larger than anything you expect.
//!
//! # Example
//!
//! ```no_run
//! use selection_watch::Watcher;
//!
//! let mut watcher = Watcher::init().unwrap();
//! let mut buf = vec![0; 4 * 1024 * 1024];
//! loop {
//!     let content = watcher.wait(&mut buf).unwrap();
//!     println!("saw: {}", String::from_utf8_lossy(&buf[..content.len]));
//! }
//! ```
//!
//! Everything runs on the calling thread. `poll` never blocks, `wait` blocks until new content
//! arrived or the connection died. With the `tokio` feature, [`AsyncWatcher`] turns the same
//! machinery into a future that waits for socket readiness instead.

pub mod config;
pub mod error;
pub mod transport;
mod watcher;

pub use config::WatchConfig;
pub use error::{ConfigError, SetupError, TransportError, WatchError};
pub use transport::{Atom, Timestamp, Transport, Window};
pub use watcher::{Change, Content, Watcher};

cfg_if::cfg_if! {
    if #[cfg(all(unix, feature = "tokio"))] {
        pub mod stream;
        pub use crate::stream::AsyncWatcher;
    }
}

#[cfg(all(unix, feature = "x11"))]
pub use transport::x11::XcbTransport;
