//! Follow the kernel audit event feed.
//!
//! Binds the audit read-log multicast group, which needs CAP_AUDIT_READ.
//!
//! Run with: sudo cargo run -p nlconn --example audit_monitor
//!
//! Generate some activity (log in on another terminal, run `sudo -k sudo
//! true`) to see records.

use nlconn::{Connection, Protocol, audit_groups};

fn main() -> nlconn::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let mut conn = Connection::new(Protocol::Audit, audit_groups::AUDIT_NLGRP_READLOG);

    conn.set_handler(|payload| {
        // Audit records are mostly text; show them as such.
        println!("{}", String::from_utf8_lossy(payload).trim_end());
        Ok(())
    });

    println!("Following audit events (requires CAP_AUDIT_READ)...");
    println!("Press Ctrl+C to exit.\n");

    conn.listen_and_serve()
}
