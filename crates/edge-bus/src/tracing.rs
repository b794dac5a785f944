//! # Observability & Tracing
//!
//! Every module on the bus logs through the `tracing` crate with structured fields
//! (`module`, `operation`, `resource`, `id`) rather than interpolated strings, so a single
//! message can be followed from the queue that received it to the replies it produced.
//!
//! ## Usage
//!
//! ```bash
//! # Lifecycle and state changes only
//! RUST_LOG=info cargo run
//!
//! # Every routed message
//! RUST_LOG=debug cargo run
//!
//! # Engine internals only
//! RUST_LOG=metamanager=debug cargo run
//! ```
//!
//! With `RUST_LOG=debug` a connected point query looks like:
//!
//! ```text
//! DEBUG Received id="5b1d..." operation=query resource="ns/Pod/a" source="edged"
//! DEBUG Send module="websocket" id="9c3e..." operation=query resource="ns/Pod/a"
//! DEBUG Send module="metamanager" id="e07a..." operation=response resource="ns/Pod/a"
//! DEBUG Send module="edged" id="41f2..." operation=response resource="ns/Pod/a"
//! ```

/// Installs a compact formatter filtered by `RUST_LOG`.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
