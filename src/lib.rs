//! Harbor — a TCP relay server for a desktop chat application.
//!
//! Clients exchange newline-delimited command frames; the relay learns
//! username→address bindings from traffic, forwards frames (broadcast or
//! unicast), announces presence counts, and mirrors chat/reaction activity
//! to an external account service.

pub mod relay;
