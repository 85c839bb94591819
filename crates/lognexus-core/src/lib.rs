//! Domain model for the alert lifecycle and job health monitoring engine.
//!
//! Pure types and state machines only: no I/O, no async. Services in
//! `lognexus-app` drive these through the port traits in `lognexus-ports`.

pub mod alert;
pub mod channel;
pub mod error;
pub mod events;
pub mod ids;
pub mod job;
pub mod log;
pub mod server;
