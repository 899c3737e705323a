//! Fallback connection for platforms without netlink.
//!
//! Netlink is a Linux kernel interface. So that portable callers need no
//! conditional compilation, this module mirrors the Linux API surface with
//! the same types and signatures: construction and accessors work, and
//! every socket operation fails with [`Error::UnsupportedPlatform`].

use crate::error::{Error, Result};
use crate::protocol::Protocol;

/// A netlink connection on a platform that has no netlink.
///
/// Construction is inert and every operation except the accessors returns
/// the fixed unsupported-platform error.
#[derive(Debug)]
pub struct Connection {
    protocol: Protocol,
    groups: u32,
}

impl Connection {
    /// Create an unconnected connection for the given protocol family and
    /// multicast group mask.
    pub fn new(protocol: Protocol, groups: u32) -> Self {
        Self { protocol, groups }
    }

    /// Netlink family this connection would talk to.
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Multicast group mask that would apply at bind time.
    pub fn groups(&self) -> u32 {
        self.groups
    }

    /// Always 0: nothing is ever written here.
    pub fn sequence(&self) -> u32 {
        0
    }

    /// Always false: no socket can exist here.
    pub fn is_connected(&self) -> bool {
        false
    }

    /// Accepted and discarded: the serve loop this would feed cannot run
    /// here.
    pub fn set_handler<F>(&mut self, _handler: F)
    where
        F: Fn(&[u8]) -> Result<()> + Send + 'static,
    {
    }

    /// Always `None`.
    pub fn handler(&self) -> Option<&(dyn Fn(&[u8]) -> Result<()> + Send)> {
        None
    }

    pub fn connect(&mut self) -> Result<()> {
        Err(Error::UnsupportedPlatform)
    }

    pub fn read(&mut self) -> Result<Vec<u8>> {
        Err(Error::UnsupportedPlatform)
    }

    pub fn write(&mut self, _payload: &[u8]) -> Result<()> {
        Err(Error::UnsupportedPlatform)
    }

    pub fn close(&mut self) -> Result<()> {
        Err(Error::UnsupportedPlatform)
    }

    pub fn listen_and_serve(&mut self) -> Result<()> {
        Err(Error::UnsupportedPlatform)
    }
}
