//! Monitor link and IPv4 address events from rtnetlink.
//!
//! Run with: cargo run -p nlconn --example link_monitor
//!
//! Toggle an interface (e.g. `ip link set <dev> down`) or add an address to
//! see events.

use nlconn::{Connection, Protocol, rtnetlink_groups};

fn main() -> nlconn::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let groups = rtnetlink_groups::RTMGRP_LINK | rtnetlink_groups::RTMGRP_IPV4_IFADDR;
    let mut conn = Connection::new(Protocol::Route, groups);

    conn.set_handler(|payload| {
        // The payload is the message body with the netlink header already
        // stripped; decoding rtnetlink attributes is up to the consumer, so
        // just show the size and a byte preview.
        let preview: Vec<String> = payload
            .iter()
            .take(16)
            .map(|b| format!("{:02x}", b))
            .collect();
        println!("event: {:4} payload bytes  [{} ..]", payload.len(), preview.join(" "));
        Ok(())
    });

    println!("Monitoring link and IPv4 address events...");
    println!("Press Ctrl+C to exit.\n");

    conn.listen_and_serve()
}
