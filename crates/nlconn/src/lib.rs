//! Blocking netlink client for multicast kernel feeds.
//!
//! One [`Connection`] owns one raw netlink socket bound to a protocol
//! family and a multicast group mask. Incoming datagrams are framed by the
//! fixed 16-byte netlink header; everything behind the header reaches the
//! caller as opaque bytes. Interpreting those bytes (attribute parsing,
//! multi-part reassembly, NLMSG_ERROR decoding) is deliberately left to the
//! consumer.
//!
//! # Monitoring a feed
//!
//! ```ignore
//! use nlconn::{Connection, Protocol, rtnetlink_groups};
//!
//! let mut conn = Connection::new(Protocol::Route, rtnetlink_groups::RTMGRP_LINK);
//! conn.set_handler(|payload| {
//!     println!("link event, {} payload bytes", payload.len());
//!     Ok(())
//! });
//!
//! // Blocks until the first read or handler error.
//! conn.listen_and_serve()?;
//! ```
//!
//! # Request/response by hand
//!
//! ```ignore
//! use nlconn::{Connection, Protocol};
//!
//! let mut conn = Connection::new(Protocol::Route, 0);
//! conn.connect()?;
//! conn.write(&request)?;
//! let reply = conn.read()?;
//! conn.close()?;
//! ```
//!
//! # Concurrency
//!
//! Every operation blocks and takes `&mut self`: one `Connection` is one
//! single-threaded feed. For several feeds, run several connections, each
//! on its own thread (`Connection` is `Send`). There are no timeouts and no
//! cancellation; the loop in [`Connection::listen_and_serve`] stops only
//! when a read or the handler fails.
//!
//! # Platforms
//!
//! Netlink exists only on Linux. On other targets the same API compiles and
//! every operation except construction fails with
//! [`Error::UnsupportedPlatform`], so portable callers need no conditional
//! compilation.

pub mod error;
pub mod message;
pub mod protocol;

#[cfg(target_os = "linux")]
mod connection;
#[cfg(target_os = "linux")]
pub use connection::Connection;

#[cfg(not(target_os = "linux"))]
mod unsupported;
#[cfg(not(target_os = "linux"))]
pub use unsupported::Connection;

pub use error::{Error, Result};
pub use message::{NLMSG_HDRLEN, NetlinkMessage, NlMsgHdr};
pub use protocol::{Protocol, audit_groups, rtnetlink_groups};

/// Payload handler invoked by [`Connection::listen_and_serve`] for every
/// received message.
///
/// The handler sees the message payload with the netlink header already
/// stripped. Returning an error stops the serve loop and surfaces the error
/// to the caller.
pub type Handler = Box<dyn Fn(&[u8]) -> Result<()> + Send>;
