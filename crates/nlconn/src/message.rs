//! Netlink message framing: the fixed 16-byte header and the
//! header-plus-payload wire form.
//!
//! Every netlink datagram this crate reads or writes starts with a
//! [`NlMsgHdr`] in native byte order, immediately followed by the payload
//! bytes the header's length field accounts for. Payloads are opaque here;
//! interpreting them is the consumer's business.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::{Error, Result};

/// Netlink message header alignment.
pub const NLMSG_ALIGNTO: usize = 4;

/// Align a length to NLMSG_ALIGNTO boundary.
#[inline]
pub const fn nlmsg_align(len: usize) -> usize {
    (len + NLMSG_ALIGNTO - 1) & !(NLMSG_ALIGNTO - 1)
}

/// Size of the netlink message header.
pub const NLMSG_HDRLEN: usize = nlmsg_align(std::mem::size_of::<NlMsgHdr>());

/// Netlink message header (mirrors struct nlmsghdr).
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct NlMsgHdr {
    /// Length of message including header.
    pub nlmsg_len: u32,
    /// Message type.
    pub nlmsg_type: u16,
    /// Additional flags.
    pub nlmsg_flags: u16,
    /// Sequence number.
    pub nlmsg_seq: u32,
    /// Sending process port ID.
    pub nlmsg_pid: u32,
}

impl NlMsgHdr {
    /// Header for an outbound message carrying `payload_len` payload bytes.
    ///
    /// The length field covers header plus payload. Type and flags stay
    /// zero, and the sender pid is the current process id.
    pub fn outbound(seq: u32, payload_len: usize) -> Self {
        Self {
            nlmsg_len: (NLMSG_HDRLEN + payload_len) as u32,
            nlmsg_type: 0,
            nlmsg_flags: 0,
            nlmsg_seq: seq,
            nlmsg_pid: std::process::id(),
        }
    }

    /// Payload length declared by the header.
    ///
    /// A declared length smaller than the header itself counts as zero
    /// payload, so a malformed length field can never underflow here.
    pub fn payload_len(&self) -> usize {
        (self.nlmsg_len as usize).saturating_sub(NLMSG_HDRLEN)
    }

    /// Convert header to bytes.
    pub fn as_bytes(&self) -> &[u8] {
        <Self as IntoBytes>::as_bytes(self)
    }

    /// Parse header from bytes.
    ///
    /// Copies out of `data`, so the slice may sit at any alignment.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::read_from_prefix(data)
            .map(|(header, _)| header)
            .map_err(|_| Error::Truncated {
                expected: NLMSG_HDRLEN,
                actual: data.len(),
            })
    }
}

/// One netlink message: header plus opaque payload.
///
/// Transient wire form used when reading and writing datagrams; nothing in
/// this crate keeps messages around after delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetlinkMessage {
    /// Message header.
    pub header: NlMsgHdr,
    /// Opaque payload, `header.payload_len()` bytes on a parsed message.
    pub payload: Vec<u8>,
}

impl NetlinkMessage {
    /// Frame an outbound message around `payload`.
    pub fn outbound(seq: u32, payload: &[u8]) -> Self {
        Self {
            header: NlMsgHdr::outbound(seq, payload.len()),
            payload: payload.to_vec(),
        }
    }

    /// Serialize as header followed by payload, with no trailing padding.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(NLMSG_HDRLEN + self.payload.len());
        buf.extend_from_slice(self.header.as_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Extract the leading message from one received datagram.
    ///
    /// A datagram shorter than the header, or a header whose declared length
    /// does not exceed the header size, yields an empty payload with no
    /// error; the kernel's zero-payload messages and malformed length fields
    /// are deliberately indistinguishable to the caller. A header declaring
    /// more payload than the datagram carries is unrecoverable and yields
    /// [`Error::Truncated`]. Datagram bytes past the declared length are
    /// discarded.
    pub fn from_datagram(data: &[u8]) -> Result<Self> {
        if data.len() < NLMSG_HDRLEN {
            return Ok(Self {
                header: NlMsgHdr::default(),
                payload: Vec::new(),
            });
        }
        let header = NlMsgHdr::from_bytes(data)?;
        let expected = header.payload_len();
        let actual = data.len() - NLMSG_HDRLEN;
        if actual < expected {
            return Err(Error::Truncated { expected, actual });
        }
        Ok(Self {
            header,
            payload: data[NLMSG_HDRLEN..NLMSG_HDRLEN + expected].to_vec(),
        })
    }
}
