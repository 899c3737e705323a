//! Netlink protocol families and bind-time multicast group masks.

/// Netlink protocol families.
///
/// The family number selects which kernel subsystem a connection talks to;
/// it is passed straight to `socket(2)`. Only families whose feeds use the
/// standard netlink message header are listed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Routing and link state (links, addresses, routes, neighbours).
    Route,
    /// Kernel audit subsystem.
    Audit,
    /// Generic netlink.
    Generic,
    /// Netfilter subsystem.
    Netfilter,
    /// Kernel connector.
    Connector,
}

#[cfg(target_os = "linux")]
impl Protocol {
    /// Protocol number passed to `socket(2)`.
    pub(crate) fn as_isize(self) -> isize {
        use netlink_sys::protocols;

        match self {
            Protocol::Route => protocols::NETLINK_ROUTE,
            Protocol::Audit => protocols::NETLINK_AUDIT,
            Protocol::Generic => protocols::NETLINK_GENERIC,
            Protocol::Netfilter => protocols::NETLINK_NETFILTER,
            Protocol::Connector => protocols::NETLINK_CONNECTOR,
        }
    }
}

/// Bind-time multicast group masks for [`Protocol::Route`].
///
/// These are the legacy `RTMGRP_*` bitmask values from `linux/rtnetlink.h`.
/// Combine them with `|` and pass the result as the `groups` argument of
/// [`Connection::new`](crate::Connection::new); the kernel then copies every
/// event published to any of the selected groups into the socket's receive
/// queue.
pub mod rtnetlink_groups {
    pub const RTMGRP_LINK: u32 = 0x1;
    pub const RTMGRP_NOTIFY: u32 = 0x2;
    pub const RTMGRP_NEIGH: u32 = 0x4;
    pub const RTMGRP_TC: u32 = 0x8;
    pub const RTMGRP_IPV4_IFADDR: u32 = 0x10;
    pub const RTMGRP_IPV4_MROUTE: u32 = 0x20;
    pub const RTMGRP_IPV4_ROUTE: u32 = 0x40;
    pub const RTMGRP_IPV4_RULE: u32 = 0x80;
    pub const RTMGRP_IPV6_IFADDR: u32 = 0x100;
    pub const RTMGRP_IPV6_MROUTE: u32 = 0x200;
    pub const RTMGRP_IPV6_ROUTE: u32 = 0x400;
    pub const RTMGRP_IPV6_IFINFO: u32 = 0x800;
    pub const RTMGRP_IPV6_PREFIX: u32 = 0x20000;
}

/// Bind-time multicast group masks for [`Protocol::Audit`].
pub mod audit_groups {
    /// Read-only copy of the audit event log. Binding this group needs
    /// CAP_AUDIT_READ.
    pub const AUDIT_NLGRP_READLOG: u32 = 0x1;
}
