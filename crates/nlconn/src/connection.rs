//! Blocking netlink connection: lifecycle, framing, and the dispatch loop.
//!
//! # Example
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
//! // Blocks until a read or handler error.
//! conn.listen_and_serve()?;
//! ```

use std::fmt;
use std::io;
use std::os::unix::io::AsRawFd;

use bytes::BytesMut;
use netlink_sys::{Socket, SocketAddr};
use tracing::{error, warn};

use crate::Handler;
use crate::error::{Error, Result};
use crate::message::NetlinkMessage;
use crate::protocol::Protocol;

/// Fixed receive buffer size. Kernel netlink datagrams are capped well below
/// this, so the length a peer declares in a header never drives an
/// allocation.
const RECV_BUF_LEN: usize = 32768;

/// A blocking netlink connection bound to a set of multicast groups.
///
/// One `Connection` owns one raw netlink socket and is driven from a single
/// thread: every operation takes `&mut self`, so concurrent use of one
/// instance is rejected at compile time. For concurrent monitoring, run one
/// `Connection` per feed, each on its own thread (`Connection` is `Send`).
///
/// The socket is opened by [`connect`](Self::connect), or by
/// [`listen_and_serve`](Self::listen_and_serve) when not already open, and
/// released exactly once: by [`close`](Self::close), by the serve loop's
/// cleanup of a socket it opened itself, or by `Drop` as the final backstop.
pub struct Connection {
    /// Netlink family this socket talks to.
    protocol: Protocol,
    /// Multicast group mask applied at bind time.
    groups: u32,
    /// Open socket, absent until `connect` succeeds.
    socket: Option<Socket>,
    /// Sequence number stamped into the most recent outbound header.
    sequence: u32,
    /// Payload handler for the serve loop.
    handler: Option<Handler>,
}

impl Connection {
    /// Create an unconnected connection for the given protocol family and
    /// multicast group mask.
    ///
    /// Pure value construction: no socket exists until
    /// [`connect`](Self::connect). A `groups` mask of 0 joins no multicast
    /// group, which suits plain request/response use.
    pub fn new(protocol: Protocol, groups: u32) -> Self {
        Self {
            protocol,
            groups,
            socket: None,
            sequence: 0,
            handler: None,
        }
    }

    /// Netlink family this connection talks to.
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Multicast group mask applied at bind time.
    pub fn groups(&self) -> u32 {
        self.groups
    }

    /// Sequence number of the most recent outbound message, 0 before the
    /// first write.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Whether the socket is currently open.
    pub fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    /// Store the payload handler used by
    /// [`listen_and_serve`](Self::listen_and_serve).
    ///
    /// The handler sees each message's payload with the netlink header
    /// already stripped. Last write wins when called repeatedly.
    pub fn set_handler<F>(&mut self, handler: F)
    where
        F: Fn(&[u8]) -> Result<()> + Send + 'static,
    {
        self.handler = Some(Box::new(handler));
    }

    /// The stored payload handler, if any.
    pub fn handler(&self) -> Option<&(dyn Fn(&[u8]) -> Result<()> + Send)> {
        self.handler.as_deref()
    }

    /// Open the netlink socket and bind it to the connection's protocol
    /// family and group mask.
    ///
    /// The bind address carries pid 0, so the kernel assigns the local port.
    /// Failures are logged and returned; a bind failure releases the
    /// partially-created socket before returning. Not idempotent: calling
    /// `connect` on an open connection replaces, and thereby closes, the
    /// previous socket.
    pub fn connect(&mut self) -> Result<()> {
        let mut socket = match Socket::new(self.protocol.as_isize()) {
            Ok(socket) => socket,
            Err(e) => {
                error!(protocol = ?self.protocol, "cannot create netlink socket: {}", e);
                return Err(Error::SocketCreation(e));
            }
        };
        let addr = SocketAddr::new(0, self.groups);
        if let Err(e) = socket.bind(&addr) {
            error!(
                protocol = ?self.protocol,
                groups = self.groups,
                "cannot bind netlink socket: {}",
                e
            );
            // Dropping `socket` releases the half-made fd.
            return Err(Error::Bind(e));
        }
        self.socket = Some(socket);
        Ok(())
    }

    /// Read one message, blocking until a datagram arrives or the socket
    /// fails.
    ///
    /// Returns the payload of the datagram's leading message with the
    /// netlink header stripped. Datagrams too short to carry a header, and
    /// headers declaring no payload, yield an empty `Vec` with no error. A
    /// header declaring more payload than the datagram carries means the
    /// message is lost and the stream cannot be re-synchronized: the socket
    /// is closed and [`Error::Truncated`] returned. Without an open socket
    /// this fails with an [`io::ErrorKind::NotConnected`] error.
    pub fn read(&mut self) -> Result<Vec<u8>> {
        let socket = self.socket.as_ref().ok_or_else(Error::not_connected)?;
        let mut buf = BytesMut::with_capacity(RECV_BUF_LEN);
        socket.recv(&mut buf, 0)?;
        match NetlinkMessage::from_datagram(&buf) {
            Ok(message) => Ok(message.payload),
            Err(e) => {
                self.socket = None;
                Err(e)
            }
        }
    }

    /// Frame and send one message as a single datagram.
    ///
    /// The payload is prefixed with a netlink header carrying the next
    /// sequence number (starting at 1, wrapping at `u32::MAX`) and this
    /// process's id; message type and flags stay zero, so callers speaking a
    /// typed protocol put their own header inside `payload`. The datagram
    /// goes to the connection's bind address, i.e. the kernel plus the bound
    /// group mask. A send failure consumes the sequence number and leaves
    /// the connection open.
    pub fn write(&mut self, payload: &[u8]) -> Result<()> {
        let socket = self.socket.as_ref().ok_or_else(Error::not_connected)?;
        self.sequence = self.sequence.wrapping_add(1);
        let message = NetlinkMessage::outbound(self.sequence, payload);
        let addr = SocketAddr::new(0, self.groups);
        if let Err(e) = socket.send_to(&message.to_bytes(), &addr, 0) {
            error!("cannot send netlink message: {}", e);
            return Err(e.into());
        }
        Ok(())
    }

    /// Release the socket, reporting the close(2) result.
    ///
    /// Fails with an [`io::ErrorKind::NotConnected`] error when no socket is
    /// open, so a double close is visible to the caller. The connection can
    /// be reconnected afterwards.
    pub fn close(&mut self) -> Result<()> {
        let socket = self.socket.take().ok_or_else(Error::not_connected)?;
        let fd = socket.as_raw_fd();
        // Take the fd back from the wrapper so its Drop cannot close it a
        // second time; close(2)'s result stays observable to the caller.
        std::mem::forget(socket);
        // SAFETY: `fd` was owned by the wrapper we just forgot; nothing else
        // closes it.
        if unsafe { libc::close(fd) } < 0 {
            return Err(io::Error::last_os_error().into());
        }
        Ok(())
    }

    /// Run the blocking dispatch loop: read each message and hand its
    /// payload to the handler.
    ///
    /// Requires a handler (see [`set_handler`](Self::set_handler)) and fails
    /// with [`Error::HandlerNotSet`] before touching the socket otherwise.
    /// Opens the socket via [`connect`](Self::connect) when not already
    /// open; a socket opened here is closed when the loop exits, while a
    /// socket the caller opened stays the caller's to close.
    ///
    /// The loop has no normal termination: it returns the first read or
    /// handler error. A close failure during cleanup is logged and does not
    /// replace the loop's own error.
    pub fn listen_and_serve(&mut self) -> Result<()> {
        if self.handler.is_none() {
            return Err(Error::HandlerNotSet);
        }
        let opened_here = self.socket.is_none();
        if opened_here {
            self.connect()?;
        }
        let result = self.serve();
        // A socket opened for this call never outlives it. Truncation
        // already closed the socket, hence the is_connected check.
        if opened_here && self.is_connected() {
            if let Err(e) = self.close() {
                warn!("cannot close netlink socket after serve loop: {}", e);
            }
        }
        result
    }

    fn serve(&mut self) -> Result<()> {
        loop {
            let payload = self.read()?;
            match self.handler {
                Some(ref handler) => handler(&payload)?,
                // Checked by listen_and_serve; read() cannot unset it.
                None => return Err(Error::HandlerNotSet),
            }
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("protocol", &self.protocol)
            .field("groups", &format_args!("{:#x}", self.groups))
            .field("connected", &self.socket.is_some())
            .field("sequence", &self.sequence)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::NLMSG_HDRLEN;
    use std::os::unix::io::{FromRawFd, RawFd};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Connection whose socket is one end of a unix datagram socketpair; the
    /// returned fd is the peer end for tests to feed datagrams into.
    fn socketpair_connection() -> (Connection, RawFd) {
        let mut fds = [0 as libc::c_int; 2];
        // SAFETY: socketpair fills the two descriptors in `fds`.
        let rc = unsafe { libc::socketpair(libc::AF_UNIX, libc::SOCK_DGRAM, 0, fds.as_mut_ptr()) };
        assert_eq!(rc, 0, "socketpair: {}", io::Error::last_os_error());
        let mut conn = Connection::new(Protocol::Route, 0);
        // SAFETY: fds[0] is open and otherwise unowned; the wrapper takes
        // ownership.
        conn.socket = Some(unsafe { Socket::from_raw_fd(fds[0]) });
        (conn, fds[1])
    }

    fn feed(fd: RawFd, bytes: &[u8]) {
        // SAFETY: fd is the open peer end of the socketpair.
        let n = unsafe { libc::send(fd, bytes.as_ptr() as *const libc::c_void, bytes.len(), 0) };
        assert_eq!(
            n,
            bytes.len() as isize,
            "send: {}",
            io::Error::last_os_error()
        );
    }

    fn close_peer(fd: RawFd) {
        // SAFETY: fd came from socketpair_connection and is closed once.
        unsafe { libc::close(fd) };
    }

    /// Receive timeout on the connection's own fd, so a drained queue
    /// surfaces as an I/O error instead of blocking the test forever.
    fn set_recv_timeout(conn: &Connection, millis: libc::suseconds_t) {
        let fd = conn.socket.as_ref().unwrap().as_raw_fd();
        let tv = libc::timeval {
            tv_sec: 0,
            tv_usec: millis * 1000,
        };
        // SAFETY: fd is open and tv outlives the call.
        let rc = unsafe {
            libc::setsockopt(
                fd,
                libc::SOL_SOCKET,
                libc::SO_RCVTIMEO,
                &tv as *const libc::timeval as *const libc::c_void,
                std::mem::size_of::<libc::timeval>() as libc::socklen_t,
            )
        };
        assert_eq!(rc, 0, "setsockopt: {}", io::Error::last_os_error());
    }

    #[test]
    fn read_extracts_leading_payload() {
        let (mut conn, peer) = socketpair_connection();
        feed(peer, &NetlinkMessage::outbound(1, b"hello").to_bytes());
        assert_eq!(conn.read().unwrap(), b"hello");
        close_peer(peer);
    }

    #[test]
    fn read_short_datagram_yields_empty() {
        let (mut conn, peer) = socketpair_connection();
        feed(peer, &[0xFF; 8]);
        assert!(conn.read().unwrap().is_empty());
        assert!(conn.is_connected());
        close_peer(peer);
    }

    #[test]
    fn read_header_only_message_yields_empty() {
        let (mut conn, peer) = socketpair_connection();
        feed(peer, &NetlinkMessage::outbound(1, &[]).to_bytes());
        assert!(conn.read().unwrap().is_empty());
        close_peer(peer);
    }

    #[test]
    fn read_truncated_payload_closes_socket() {
        let (mut conn, peer) = socketpair_connection();
        let mut frame = NetlinkMessage::outbound(1, &[0u8; 32]).to_bytes();
        frame.truncate(NLMSG_HDRLEN + 4);
        feed(peer, &frame);
        let err = conn.read().unwrap_err();
        assert!(matches!(
            err,
            Error::Truncated {
                expected: 32,
                actual: 4
            }
        ));
        assert!(!conn.is_connected());
        close_peer(peer);
    }

    #[test]
    fn read_discards_bytes_past_declared_length() {
        let (mut conn, peer) = socketpair_connection();
        let mut datagram = NetlinkMessage::outbound(1, b"abc").to_bytes();
        datagram.extend_from_slice(&NetlinkMessage::outbound(2, b"def").to_bytes());
        feed(peer, &datagram);
        assert_eq!(conn.read().unwrap(), b"abc");
        close_peer(peer);
    }

    #[test]
    fn write_failure_leaves_connection_open() {
        let (mut conn, peer) = socketpair_connection();
        // The unix-domain stand-in rejects the netlink destination address,
        // which exercises the send-failure path.
        let err = conn.write(&[0x01]).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(conn.is_connected());
        assert_eq!(conn.sequence(), 1);
        close_peer(peer);
    }

    #[test]
    fn serve_loop_stops_on_handler_error() {
        let (mut conn, peer) = socketpair_connection();
        feed(peer, &NetlinkMessage::outbound(1, b"one").to_bytes());
        feed(peer, &NetlinkMessage::outbound(2, b"two").to_bytes());

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        conn.set_handler(move |payload| match seen.fetch_add(1, Ordering::SeqCst) {
            0 => {
                assert_eq!(payload, b"one");
                Ok(())
            }
            _ => Err(Error::handler("second message")),
        });

        let err = conn.listen_and_serve().unwrap_err();
        assert!(matches!(err, Error::Handler(msg) if msg == "second message"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        // The loop closes only sockets it opened itself; this one stays.
        assert!(conn.is_connected());
        conn.close().unwrap();
        close_peer(peer);
    }

    #[test]
    fn serve_loop_stops_on_read_error() {
        let (mut conn, peer) = socketpair_connection();
        set_recv_timeout(&conn, 50);
        feed(peer, &NetlinkMessage::outbound(1, b"solo").to_bytes());

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        conn.set_handler(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let err = conn.listen_and_serve().unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        close_peer(peer);
    }

    #[test]
    fn handler_last_write_wins() {
        let mut conn = Connection::new(Protocol::Route, 0);
        assert!(conn.handler().is_none());
        conn.set_handler(|_| Err(Error::handler("first")));
        conn.set_handler(|_| Ok(()));
        let handler = conn.handler().unwrap();
        assert!(handler(b"x").is_ok());
    }

    #[test]
    fn connection_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Connection>();
    }
}
