//! Relay server core — framing, registry, routing, connection supervision.

pub mod codec;
pub mod command;
pub mod delegate;
pub mod frame;
pub mod presence;
pub mod registry;
pub mod router;
pub mod server;
